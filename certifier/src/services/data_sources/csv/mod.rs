//! Delimited text exports of the sheet.
//!
//! The delimiter is either configured or guessed from the header line. Column
//! titles keep their exact text apart from a leading BOM.

mod read;

pub use read::{detect_delimiter, read_delimited};
