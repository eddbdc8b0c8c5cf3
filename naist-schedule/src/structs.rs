use chrono::{Datelike, NaiveDateTime};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::{CellError, CellId};

/// One class meeting as listed on the monthly schedule page.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Event {
    pub class: String,
    /// 0-based index into [`crate::PERIOD_STARTS`].
    pub period: u8,
    #[cfg_attr(feature = "serde", serde(with = "timestamp"))]
    pub starttime: NaiveDateTime,
    #[cfg_attr(feature = "serde", serde(with = "timestamp"))]
    pub endtime: NaiveDateTime,
    pub class_number: u32,
    pub classroom: String,
    pub teachers: Vec<String>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub note: String,
    #[cfg_attr(
        feature = "serde",
        serde(default, skip_serializing_if = "Option::is_none")
    )]
    pub nth: Option<String>,
}

/// Everything parsed out of one monthly page.
#[derive(Debug, Clone)]
pub struct Schedule {
    pub year: i32,
    pub month: u32,
    pub events: Vec<Event>,
    /// Cells that could not be turned into an event, in document order.
    pub rejected: Vec<CellError>,
}

impl Event {
    /// Identity of the table cell this event came from.
    #[must_use]
    pub fn cell_id(&self) -> CellId {
        CellId {
            day: self.starttime.day(),
            period: u32::from(self.period),
            sequence: self.class_number,
        }
    }

    /// Body text shown in the calendar entry: period label, occurrence
    /// marker, teacher list and the note.
    #[must_use]
    pub fn description(&self) -> String {
        let mut description = format!("{}限\n", self.period + 1);

        if let Some(nth) = &self.nth {
            description.push_str(nth);
            description.push('\n');
        }

        description.push_str("担当教員：\n");
        description.push_str(&self.teachers.join("\n"));

        if !self.note.is_empty() {
            description.push_str("\n\n");
            description.push_str(&self.note);
        }

        description
    }
}

#[cfg(feature = "serde")]
mod timestamp {
    use chrono::NaiveDateTime;
    use serde::{Deserialize, Deserializer, Serializer};

    const FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

    pub fn serialize<S: Serializer>(
        time: &NaiveDateTime,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        serializer.collect_str(&time.format(FORMAT))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<NaiveDateTime, D::Error> {
        let raw = String::deserialize(deserializer)?;
        NaiveDateTime::parse_from_str(&raw, FORMAT).map_err(serde::de::Error::custom)
    }
}
