use crate::config::SourceSettings;
use crate::services::data_sources::{Record, SourceError, Table};
use log::debug;
use std::fs;

const BOM: &[u8] = b"\xef\xbb\xbf";

/// Picks the most frequent of `,` `;` tab `|` in the header line.
pub fn detect_delimiter(header_line: &str) -> char {
    [',', ';', '\t', '|']
        .iter()
        .copied()
        .rev()
        .max_by_key(|&d| header_line.matches(d).count())
        .unwrap_or(',')
}

fn normalize_cell(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).replace('\u{00A0}', " ")
}

/// Reads a delimited export. Blank lines are skipped and quoted cells may span
/// lines, so every record keeps the line it starts on.
pub fn read_delimited(settings: &SourceSettings) -> Result<Table, SourceError> {
    let path = &settings.path;
    let raw = fs::read(path).map_err(|source| SourceError::Io {
        path: path.clone(),
        source,
    })?;
    let bytes = raw.strip_prefix(BOM).unwrap_or(raw.as_slice());

    let delimiter = match settings.delimiter {
        Some(delimiter) => delimiter,
        None => {
            let header_line = normalize_cell(bytes.split(|&b| b == b'\n').next().unwrap_or_default());
            detect_delimiter(&header_line)
        }
    };
    if !delimiter.is_ascii() {
        return Err(SourceError::Delimiter(delimiter));
    }
    debug!("Reading '{}' with delimiter {:?}", path.display(), delimiter);

    let parse_error = |source: ::csv::Error| SourceError::Parse {
        path: path.clone(),
        source,
    };

    let mut reader = ::csv::ReaderBuilder::new()
        .delimiter(delimiter as u8)
        .flexible(true)
        .from_reader(bytes);

    let headers: Vec<String> = reader
        .byte_headers()
        .map_err(parse_error)?
        .iter()
        .map(normalize_cell)
        .collect();

    let mut records = Vec::new();
    for (index, record) in reader.byte_records().enumerate() {
        let record = record.map_err(parse_error)?;
        let line = record
            .position()
            .map(|position| record_line(bytes, position))
            // +2: 1-based lines and the header line
            .unwrap_or(index + 2);
        records.push(Record {
            line,
            cells: record.iter().map(normalize_cell).collect(),
        });
    }

    Ok(Table { headers, records })
}

/// Line of the first byte of a record. The reader's position is taken before
/// it skips blank lines, so those are counted here.
fn record_line(bytes: &[u8], position: &::csv::Position) -> usize {
    let start = usize::try_from(position.byte()).unwrap_or(usize::MAX);
    let blank_lines = bytes
        .get(start..)
        .unwrap_or_default()
        .iter()
        .take_while(|&&b| b == b'\n' || b == b'\r')
        .filter(|&&b| b == b'\n')
        .count();
    position.line() as usize + blank_lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::{Path, PathBuf};

    fn settings_for(path: &Path) -> SourceSettings {
        SourceSettings {
            path: path.to_path_buf(),
            ..SourceSettings::default()
        }
    }

    fn write_sheet(dir: &Path, contents: &str) -> PathBuf {
        let path = dir.join("participantes.csv");
        fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn detects_the_most_frequent_delimiter() {
        assert_eq!(detect_delimiter("Nome completo:;E-mail:;Cidade"), ';');
        assert_eq!(detect_delimiter("Nome completo:\tE-mail:"), '\t');
        assert_eq!(detect_delimiter("a|b|c,d"), '|');
        assert_eq!(detect_delimiter("Nome"), ',');
    }

    #[test]
    fn reads_headers_and_participants_in_sheet_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_sheet(
            dir.path(),
            "Nome completo:,E-mail:\nAna Silva,ana@example.com\n\"Bruno Costa,\",\n",
        );

        let table = read_delimited(&settings_for(&path)).unwrap();
        assert_eq!(table.headers, ["Nome completo:", "E-mail:"]);

        let columns = table.require_columns(&["Nome completo:", "E-mail:"]).unwrap();
        let participants = table.participants(columns[0], Some(columns[1]));
        assert_eq!(participants.len(), 2);
        assert_eq!(participants[0].row, 2);
        assert_eq!(participants[0].name, "Ana Silva");
        assert_eq!(participants[0].email.as_deref(), Some("ana@example.com"));
        assert_eq!(participants[1].row, 3);
        assert_eq!(participants[1].name, "Bruno Costa,");
        assert_eq!(participants[1].email, None);
    }

    #[test]
    fn rows_are_numbered_by_the_line_they_start_on() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_sheet(
            dir.path(),
            "Nome completo:,E-mail:\n\"Ana\nSilva\",ana@example.com\n\nBruno,\n",
        );

        let table = read_delimited(&settings_for(&path)).unwrap();
        let rows: Vec<(usize, String)> = table
            .participants(0, Some(1))
            .into_iter()
            .map(|participant| (participant.row, participant.name))
            .collect();
        assert_eq!(
            rows,
            [(2, "Ana\nSilva".to_string()), (5, "Bruno".to_string())]
        );
    }

    #[test]
    fn semicolon_sheets_with_bom_are_detected() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_sheet(
            dir.path(),
            "\u{feff}Nome completo:;E-mail:\r\nCarla Dias;carla@example.com\r\n",
        );

        let table = read_delimited(&settings_for(&path)).unwrap();
        assert_eq!(table.column("Nome completo:"), Some(0));
        assert_eq!(table.records[0].cells, ["Carla Dias", "carla@example.com"]);
    }

    #[test]
    fn short_records_read_as_blank() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_sheet(dir.path(), "Nome completo:,E-mail:\nDaniel\n");

        let table = read_delimited(&settings_for(&path)).unwrap();
        let participants = table.participants(0, Some(1));
        assert_eq!(participants[0].name, "Daniel");
        assert_eq!(participants[0].email, None);
    }

    #[test]
    fn missing_columns_name_the_csv_headers() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_sheet(dir.path(), "Nome,Email\nAna,ana@example.com\n");

        let table = read_delimited(&settings_for(&path)).unwrap();
        let err = table.require_columns(&["Nome completo:"]).unwrap_err();
        assert!(err.to_string().contains("\"Nome\", \"Email\""));
    }

    #[test]
    fn configured_delimiter_wins() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_sheet(dir.path(), "Nome completo:|E-mail:,extra\nAna|ana@example.com,x\n");
        let settings = SourceSettings {
            delimiter: Some('|'),
            ..settings_for(&path)
        };

        let table = read_delimited(&settings).unwrap();
        assert_eq!(table.headers, ["Nome completo:", "E-mail:,extra"]);
    }
}
