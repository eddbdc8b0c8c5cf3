use std::collections::HashMap;

use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};
use log::{debug, warn};
use once_cell::sync::Lazy;
use scraper::{ElementRef, Html, Selector};

use crate::fragments::{classify, segment};
use crate::{CellError, CellId, CellKind, Event, ParseError, Schedule};

macro_rules! selector {
    ($query:expr) => {{
        static SELECTOR: Lazy<Selector> = Lazy::new(|| Selector::parse($query).unwrap());
        &SELECTOR
    }};
}

/// Start of each daily period, indexed by the period number of a cell id.
pub const PERIOD_STARTS: [(u32, u32); 6] = [
    (9, 20),
    (11, 0),
    (13, 30),
    (15, 10),
    (16, 50),
    (18, 30),
];

/// Every period lasts an hour and a half.
pub const CLASS_MINUTES: i64 = 90;

/// Parses a monthly schedule page, keeping only the cells that could be
/// read. Rejected cells are logged.
pub fn extract<S: AsRef<str>>(html: S, year: i32, month: u32) -> Result<Vec<Event>, ParseError> {
    let schedule = parse_schedule(html, year, month)?;
    Ok(schedule.events)
}

pub fn parse_schedule<S: AsRef<str>>(
    html: S,
    year: i32,
    month: u32,
) -> Result<Schedule, ParseError> {
    if NaiveDate::from_ymd_opt(year, month, 1).is_none() {
        return Err(ParseError::InvalidMonth { year, month });
    }

    let html = Html::parse_document(html.as_ref());
    let table = html
        .select(selector!("table.tbl_m_schedule"))
        .next()
        .ok_or(ParseError::MissingTable)?;

    let mut slots = Vec::new();
    let mut notes = HashMap::new();

    for cell in table.select(selector!("td[id]")) {
        let Some(raw_id) = cell.value().id() else {
            continue;
        };

        match CellKind::classify(raw_id) {
            Some(Ok(CellKind::Slot(id))) => slots.push(Ok((id, cell))),
            Some(Ok(CellKind::Note(id))) => {
                notes.insert(id, cell.text().collect::<String>().trim().to_string());
            }
            Some(Err(error)) => slots.push(Err(CellError {
                id: raw_id.to_string(),
                error,
            })),
            None => {}
        }
    }

    debug!(
        "found {} schedule cells and {} notes for {year}-{month:02}",
        slots.len(),
        notes.len()
    );

    let mut events = Vec::with_capacity(slots.len());
    let mut rejected = Vec::new();

    for slot in slots {
        let parsed = slot.and_then(|(id, cell)| {
            parse_event(id, cell, year, month, &notes).map_err(|error| CellError {
                id: id.to_string(),
                error,
            })
        });

        match parsed {
            Ok(event) => events.push(event),
            Err(error) => {
                warn!("skipping {error}");
                rejected.push(error);
            }
        }
    }

    Ok(Schedule {
        year,
        month,
        events,
        rejected,
    })
}

fn parse_event(
    id: CellId,
    cell: ElementRef,
    year: i32,
    month: u32,
    notes: &HashMap<CellId, String>,
) -> Result<Event, ParseError> {
    let (starttime, endtime) = period_span(year, month, id)?;
    let text = classify(&segment(cell.text()))?;

    Ok(Event {
        class: text.title,
        period: id.period as u8,
        starttime,
        endtime,
        class_number: id.sequence,
        classroom: text.classroom,
        teachers: text.teachers,
        note: notes.get(&id).cloned().unwrap_or_default(),
        nth: text.nth.filter(|nth| !nth.is_empty()),
    })
}

/// Start and end of the class held in the given cell.
fn period_span(
    year: i32,
    month: u32,
    id: CellId,
) -> Result<(NaiveDateTime, NaiveDateTime), ParseError> {
    let (hour, minute) = *PERIOD_STARTS
        .get(id.period as usize)
        .ok_or(ParseError::PeriodOutOfRange(id.period))?;

    let date = NaiveDate::from_ymd_opt(year, month, id.day).ok_or(ParseError::InvalidDate {
        year,
        month,
        day: id.day,
    })?;

    let time = NaiveTime::from_hms_opt(hour, minute, 0)
        .ok_or(ParseError::PeriodOutOfRange(id.period))?;
    let start = date.and_time(time);

    Ok((start, start + Duration::minutes(CLASS_MINUTES)))
}
