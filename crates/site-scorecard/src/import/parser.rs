use super::headers::{column_kind, normalize_header, ColumnKind};
use super::ImportError;
use crate::scorecard::records::WeeklyCounterRecord;
use serde_json::{Map, Number, Value};
use std::io::Read;

/// Parses weekly report rows. Empty cells are dropped so counters default to
/// zero and optional text stays absent; columns the record does not carry
/// are ignored.
pub(crate) fn parse_weekly_rows<R: Read>(reader: R) -> Result<Vec<WeeklyCounterRecord>, ImportError> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers: Vec<String> = csv_reader
        .headers()?
        .iter()
        .map(normalize_header)
        .collect();

    let mut records = Vec::new();
    for (index, row) in csv_reader.records().enumerate() {
        let row = row?;
        // header is line 1
        let line = index + 2;

        let mut fields = Map::new();
        for (header, cell) in headers.iter().zip(row.iter()) {
            if cell.is_empty() {
                continue;
            }
            let value = match column_kind(header) {
                None => continue,
                Some(ColumnKind::Text) => Value::String(cell.to_string()),
                Some(ColumnKind::WholeNumber) => {
                    let number = cell.parse::<i64>().map_err(|_| ImportError::InvalidNumber {
                        line,
                        column: header.clone(),
                        value: cell.to_string(),
                    })?;
                    Value::Number(Number::from(number))
                }
            };
            fields.insert(header.clone(), value);
        }

        let record: WeeklyCounterRecord = serde_json::from_value(Value::Object(fields))
            .map_err(|source| ImportError::InvalidRow { line, source })?;
        records.push(record);
    }

    Ok(records)
}
