//! ICS feed parsing and export.
//!
//! Reading and writing follow RFC 5545 through the icalendar crate.

mod generate;
mod parse;

pub use generate::{EXPORT_PRODID, generate_export};
pub use parse::parse_calendar;
