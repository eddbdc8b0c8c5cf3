use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("page does not contain a schedule table (table.tbl_m_schedule)")]
    MissingTable,
    #[error("{year}-{month} is not a calendar month")]
    InvalidMonth { year: i32, month: u32 },
    #[error("malformed cell id {0:?}")]
    InvalidCellId(String),
    #[error("period {0} is outside the six daily periods")]
    PeriodOutOfRange(u32),
    #[error("day {day} does not exist in {year}-{month:02}")]
    InvalidDate { year: i32, month: u32, day: u32 },
    #[error("expected at least 3 text fragments, found {0}")]
    TooFewFragments(usize),
}

/// A schedule cell that was skipped, together with the reason.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("cell {id}: {error}")]
pub struct CellError {
    /// The cell's `id` attribute as written in the page.
    pub id: String,
    #[source]
    pub error: ParseError,
}
