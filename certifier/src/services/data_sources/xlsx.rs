//! Workbooks read with calamine.
//!
//! The first worksheet is used unless `source.sheet` names another one. The
//! first row of the used range holds the column titles. Rows with no value at
//! all are skipped, like blank lines in a delimited export.

use crate::config::SourceSettings;
use crate::services::data_sources::{Record, SourceError, Table};
use calamine::{open_workbook_auto, Data, Range, Reader};
use log::debug;

pub fn read_workbook(settings: &SourceSettings) -> Result<Table, SourceError> {
    let path = &settings.path;
    let workbook_error = |source: calamine::Error| SourceError::Workbook {
        path: path.clone(),
        source,
    };

    let mut workbook = open_workbook_auto(path).map_err(workbook_error)?;
    let range = match &settings.sheet {
        Some(sheet) => workbook.worksheet_range(sheet).map_err(workbook_error)?,
        None => workbook
            .worksheet_range_at(0)
            .ok_or_else(|| SourceError::NoWorksheet(path.clone()))?
            .map_err(workbook_error)?,
    };
    debug!(
        "Reading '{}' ({} row(s) in the used range)",
        path.display(),
        range.height()
    );

    Ok(table_from_range(&range))
}

fn table_from_range(range: &Range<Data>) -> Table {
    // 0-based index of the first used row
    let first_row = range.start().map_or(0, |(row, _)| row as usize);
    let mut rows = range.rows().enumerate();

    let headers = match rows.next() {
        Some((_, header)) => header.iter().map(cell_text).collect(),
        None => return Table::default(),
    };

    let records = rows
        .filter(|(_, cells)| cells.iter().any(|cell| !cell_text(cell).trim().is_empty()))
        .map(|(offset, cells)| Record {
            line: first_row + offset + 1,
            cells: cells.iter().map(cell_text).collect(),
        })
        .collect();

    Table { headers, records }
}

fn cell_text(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        other => other.to_string().replace('\u{00A0}', " "),
    }
}
