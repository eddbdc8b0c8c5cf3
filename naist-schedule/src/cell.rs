use std::fmt;
use std::str::FromStr;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::ParseError;

static CELL_ID: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(\d+)-(\d+)-(\d+)(_note)?$").unwrap());

/// `day-period-sequence` coordinates carried in a cell's `id` attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CellId {
    pub day: u32,
    pub period: u32,
    pub sequence: u32,
}

/// What a matching `id` attribute refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CellKind {
    Slot(CellId),
    Note(CellId),
}

impl CellKind {
    /// Classifies an `id` attribute. Returns `None` for ids that are not
    /// part of the schedule naming scheme at all.
    pub fn classify(id: &str) -> Option<Result<Self, ParseError>> {
        let captures = CELL_ID.captures(id)?;

        let parse = |idx: usize| captures[idx].parse::<u32>();

        let cell = match (parse(1), parse(2), parse(3)) {
            (Ok(day), Ok(period), Ok(sequence)) => CellId {
                day,
                period,
                sequence,
            },
            _ => return Some(Err(ParseError::InvalidCellId(id.to_string()))),
        };

        Some(Ok(if captures.get(4).is_some() {
            Self::Note(cell)
        } else {
            Self::Slot(cell)
        }))
    }
}

impl FromStr for CellId {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match CellKind::classify(s) {
            Some(Ok(CellKind::Slot(cell))) => Ok(cell),
            Some(Err(err)) => Err(err),
            _ => Err(ParseError::InvalidCellId(s.to_string())),
        }
    }
}

impl fmt::Display for CellId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}-{}", self.day, self.period, self.sequence)
    }
}
