use csv::ReaderBuilder;

use super::table::Table;
use super::{Extractor, IngestError, Upload};

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Parse comma-separated bytes whose first record names the columns.
///
/// Rows shorter than the header are padded with blank cells. A row with more
/// fields than the header is an error, since its extra values have no column.
pub fn read_table(bytes: &[u8]) -> Result<Table, IngestError> {
    let bytes = bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes);
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(bytes);

    let columns: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();
    if columns.is_empty() {
        return Err(IngestError::NoColumns);
    }

    let mut table = Table::new(columns);
    for record in reader.records() {
        let record = record?;
        if record.len() > table.columns().len() {
            return Err(IngestError::TooManyFields {
                line: record.position().map_or(0, |pos| pos.line()),
                expected: table.columns().len(),
                found: record.len(),
            });
        }
        table.push_row(record.iter().map(str::to_string).collect());
    }

    Ok(table)
}

pub struct CsvExtractor;

impl Extractor for CsvExtractor {
    fn extract(&self, upload: &Upload) -> Result<String, IngestError> {
        let table = read_table(upload.bytes())?;
        tracing::debug!(
            filename = upload.filename(),
            rows = table.row_count(),
            columns = table.columns().len(),
            "Parsed CSV"
        );
        Ok(table.render())
    }
}
