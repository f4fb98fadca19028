//! Источник строк из CSV файла
//!
//! CSV не хранит типы, поэтому колонка считается числовой, когда все ее
//! непустые ячейки разбираются как числа. Числовые ячейки не становятся
//! сегментами.

use std::path::{Path, PathBuf};

use csv::ReaderBuilder;

use super::{CellValue, RowSource, Table};
use crate::error::{Result, StimuliError};

/// Источник строк из CSV файла
pub struct CsvRowSource {
    path: PathBuf,
}

impl CsvRowSource {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }
}

impl RowSource for CsvRowSource {
    fn read_table(&mut self) -> Result<Table> {
        if !self.path.is_file() {
            return Err(StimuliError::Input(format!(
                "Input file not found: {}",
                self.path.display()
            )));
        }

        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_path(&self.path)?;

        let headers: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();
        let mut raw: Vec<Vec<String>> = Vec::new();
        for record in reader.records() {
            let record = record?;
            raw.push(record.iter().map(str::to_string).collect());
        }

        let width = raw.iter().map(Vec::len).max().unwrap_or(0).max(headers.len());
        let numeric: Vec<bool> = (0..width).map(|col| is_numeric_column(&raw, col)).collect();

        let records = raw
            .into_iter()
            .map(|record| {
                record
                    .into_iter()
                    .enumerate()
                    .map(|(col, value)| to_cell(value, numeric[col]))
                    .collect()
            })
            .collect();

        log::debug!("Read CSV table with {} columns from {}", headers.len(), self.path.display());
        Ok(Table::new(headers, records))
    }
}

fn is_numeric_column(raw: &[Vec<String>], col: usize) -> bool {
    let mut values = raw
        .iter()
        .filter_map(|record| record.get(col))
        .map(|value| value.trim())
        .filter(|value| !value.is_empty())
        .peekable();

    values.peek().is_some() && values.all(|value| value.parse::<f64>().is_ok())
}

fn to_cell(value: String, numeric: bool) -> CellValue {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return CellValue::Empty;
    }
    if numeric {
        if let Ok(number) = trimmed.parse::<f64>() {
            return CellValue::Number(number);
        }
    }
    CellValue::Text(value)
}
