use std::io::Cursor;

use calamine::{open_workbook_auto_from_rs, Data, Reader};

use super::table::Table;
use super::{catch_parser_panic, Extractor, IngestError, Upload};

/// Read the first worksheet of an XLSX/XLS workbook. Its first row names the
/// columns; blank header cells are named `Unnamed: <index>`.
pub fn read_first_sheet(bytes: &[u8]) -> Result<Table, IngestError> {
    let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes.to_vec()))
        .map_err(|e| IngestError::Spreadsheet(e.to_string()))?;

    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| IngestError::Spreadsheet("workbook has no worksheets".to_string()))?
        .map_err(|e| IngestError::Spreadsheet(e.to_string()))?;

    let mut rows = range.rows();
    let header = rows.next().ok_or(IngestError::NoColumns)?;
    let columns = header
        .iter()
        .enumerate()
        .map(|(i, cell)| match cell_text(cell) {
            name if name.is_empty() => format!("Unnamed: {}", i),
            name => name,
        })
        .collect();

    let mut table = Table::new(columns);
    for row in rows {
        table.push_row(row.iter().map(cell_text).collect());
    }

    Ok(table)
}

fn cell_text(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        other => other.to_string(),
    }
}

pub struct SpreadsheetExtractor;

impl Extractor for SpreadsheetExtractor {
    fn extract(&self, upload: &Upload) -> Result<String, IngestError> {
        let bytes = upload.bytes();
        let table = catch_parser_panic(IngestError::Spreadsheet, || read_first_sheet(bytes))?;
        tracing::debug!(
            filename = upload.filename(),
            rows = table.row_count(),
            "Parsed first worksheet"
        );
        Ok(table.render())
    }
}
