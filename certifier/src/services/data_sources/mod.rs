//! Reads the participants sheet.
//!
//! The sheet is either the organizer's workbook (`.xlsx`, `.xlsm`, `.xls`,
//! `.xlsb`, `.ods`) or a delimited text export of it. Both readers fill the
//! same [`Table`]: header titles plus text cells, every record tagged with the
//! spreadsheet line it came from so warnings can point at the right row.

pub mod csv;
pub mod xlsx;

use crate::config::SourceSettings;
use common::model::participant::Participant;
use std::path::{Path, PathBuf};
use thiserror::Error;

const WORKBOOK_EXTENSIONS: [&str; 5] = ["xlsx", "xlsm", "xls", "xlsb", "ods"];

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("data source '{0}' was not found, check the path")]
    NotFound(PathBuf),

    #[error("could not read '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("could not parse '{path}': {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: ::csv::Error,
    },

    #[error("could not read workbook '{path}': {source}")]
    Workbook {
        path: PathBuf,
        #[source]
        source: calamine::Error,
    },

    #[error("workbook '{0}' has no worksheet")]
    NoWorksheet(PathBuf),

    #[error("delimiter '{0}' must be a single ASCII character")]
    Delimiter(char),

    #[error("column(s) {missing:?} not found in the sheet; available columns: {available:?}")]
    MissingColumns {
        missing: Vec<String>,
        available: Vec<String>,
    },
}

/// One data row and the spreadsheet line it starts on (the header is line 1).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    pub line: usize,
    pub cells: Vec<String>,
}

/// Header titles and records of the sheet, cells kept as text.
#[derive(Debug, Clone, Default)]
pub struct Table {
    pub headers: Vec<String>,
    pub records: Vec<Record>,
}

impl Table {
    pub fn column(&self, title: &str) -> Option<usize> {
        self.headers.iter().position(|header| header == title)
    }

    /// Indices of `titles`, in the same order, or every missing title together
    /// with the titles the sheet actually has.
    pub fn require_columns(&self, titles: &[&str]) -> Result<Vec<usize>, SourceError> {
        let mut indices = Vec::with_capacity(titles.len());
        let mut missing = Vec::new();
        for title in titles {
            match self.column(title) {
                Some(index) => indices.push(index),
                None => missing.push(title.to_string()),
            }
        }

        if missing.is_empty() {
            Ok(indices)
        } else {
            Err(SourceError::MissingColumns {
                missing,
                available: self.headers.clone(),
            })
        }
    }

    /// One participant per record, in sheet order. Cells past the end of a
    /// short record read as blank.
    pub fn participants(&self, name_column: usize, email_column: Option<usize>) -> Vec<Participant> {
        self.records
            .iter()
            .map(|record| Participant {
                row: record.line,
                name: record.cell(name_column).to_string(),
                email: email_column
                    .map(|column| record.cell(column).trim().to_string())
                    .filter(|email| !email.is_empty()),
            })
            .collect()
    }
}

impl Record {
    pub fn cell(&self, column: usize) -> &str {
        self.cells.get(column).map(String::as_str).unwrap_or_default()
    }
}

fn is_workbook(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| {
            WORKBOOK_EXTENSIONS
                .iter()
                .any(|known| ext.eq_ignore_ascii_case(known))
        })
}

/// Loads the whole sheet described by `settings`, picking the reader from the
/// file extension. Anything that is not a workbook is read as delimited text.
pub fn read_table(settings: &SourceSettings) -> Result<Table, SourceError> {
    if !settings.path.exists() {
        return Err(SourceError::NotFound(settings.path.clone()));
    }
    if is_workbook(&settings.path) {
        xlsx::read_workbook(settings)
    } else {
        csv::read_delimited(settings)
    }
}
