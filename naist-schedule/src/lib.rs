mod cell;
mod error;
mod fragments;
mod parser;
mod structs;

#[cfg(feature = "ics")]
mod ics;

pub use cell::{CellId, CellKind};
pub use error::{CellError, ParseError};
pub use fragments::split_teachers;
pub use parser::{extract, parse_schedule, CLASS_MINUTES, PERIOD_STARTS};
pub use structs::{Event, Schedule};
