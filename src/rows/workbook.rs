//! Источник строк из рабочей книги Excel (.xlsx)

use std::path::{Path, PathBuf};

use calamine::{open_workbook, Data, Range, Reader, Xlsx};

use super::{CellValue, RowSource, Table};
use crate::error::{Result, StimuliError};

/// Источник строк из листа рабочей книги
pub struct XlsxRowSource {
    path: PathBuf,
    /// Имя листа; None означает первый лист
    sheet: Option<String>,
}

impl XlsxRowSource {
    pub fn new(path: impl AsRef<Path>, sheet: Option<String>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            sheet,
        }
    }
}

/// Имена листов рабочей книги в порядке следования
pub fn sheet_names(path: &Path) -> Result<Vec<String>> {
    let workbook: Xlsx<_> = open_workbook(path)
        .map_err(|e| StimuliError::Input(format!("Excel read fail for {}: {}", path.display(), e)))?;
    Ok(workbook.sheet_names())
}

impl RowSource for XlsxRowSource {
    fn read_table(&mut self) -> Result<Table> {
        let mut workbook: Xlsx<_> = open_workbook(&self.path)
            .map_err(|e| StimuliError::Input(format!("Excel read fail for {}: {}", self.path.display(), e)))?;

        let sheet = match &self.sheet {
            Some(name) => name.clone(),
            None => workbook
                .sheet_names()
                .first()
                .cloned()
                .ok_or_else(|| StimuliError::Input(format!("Workbook has no sheets: {}", self.path.display())))?,
        };

        if !workbook.sheet_names().contains(&sheet) {
            return Err(StimuliError::Input(format!(
                "Sheet '{}' not found in {}",
                sheet,
                self.path.display()
            )));
        }

        let range = workbook.worksheet_range(&sheet)?;
        let table = table_from_range(&range);

        log::debug!("Read sheet '{}' with {} columns from {}", sheet, table.headers.len(), self.path.display());
        Ok(table)
    }
}

/// Таблица из диапазона листа с адресацией от ячейки A1
///
/// Диапазон calamine начинается с первой непустой ячейки, поэтому ячейки
/// читаются по абсолютным координатам: заголовки всегда в строке 1, а
/// индекс колонки 7 всегда соответствует колонке H.
fn table_from_range(range: &Range<Data>) -> Table {
    let Some((_, (end_row, end_col))) = range.start().zip(range.end()) else {
        return Table::default();
    };
    let cell = |row: u32, col: u32| range.get_value((row, col)).map(to_cell).unwrap_or(CellValue::Empty);

    let headers = (0..=end_col).map(|col| cell(0, col).render()).collect();
    let records = (1..=end_row)
        .map(|row| (0..=end_col).map(|col| cell(row, col)).collect())
        .collect();
    Table::new(headers, records)
}

fn to_cell(cell: &Data) -> CellValue {
    match cell {
        Data::Empty | Data::Error(_) => CellValue::Empty,
        Data::String(text) => CellValue::Text(text.clone()),
        Data::Float(value) => CellValue::Number(*value),
        Data::Int(value) => CellValue::Number(*value as f64),
        Data::Bool(value) => CellValue::Other(if *value { "True" } else { "False" }.to_string()),
        Data::DateTime(value) => CellValue::Other(value.as_f64().to_string()),
        Data::DateTimeIso(value) | Data::DurationIso(value) => CellValue::Other(value.clone()),
        #[allow(unreachable_patterns)]
        _ => CellValue::Empty,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cell_conversion() {
        assert_eq!(to_cell(&Data::String("cat".into())), CellValue::Text("cat".into()));
        assert_eq!(to_cell(&Data::Int(7)), CellValue::Number(7.0));
        assert_eq!(to_cell(&Data::Empty), CellValue::Empty);
        assert_eq!(to_cell(&Data::Bool(true)).render(), "True");
    }

    #[test]
    fn test_cells_addressed_from_a1() {
        // Колонка A пустая, данные начинаются с B1, строка 2 пустая
        let mut range = Range::new((0, 1), (2, 8));
        range.set_value((0, 1), Data::String("Seg1".into()));
        range.set_value((0, 7), Data::String("ID".into()));
        range.set_value((0, 8), Data::String("Sentence".into()));
        range.set_value((2, 1), Data::String("Hello".into()));
        range.set_value((2, 7), Data::String("S7".into()));
        range.set_value((2, 8), Data::String("Hello there".into()));

        let table = table_from_range(&range);
        assert_eq!(table.headers.len(), 9);
        assert_eq!(table.headers[0], "");
        assert_eq!(table.headers[1], "Seg1");
        assert_eq!(table.records.len(), 2);

        let rows = table.stimulus_rows(None);
        assert!(rows[0].segments.is_empty());
        assert_eq!(rows[1].row_number, 2);
        assert_eq!(rows[1].segments, vec!["Hello"]);
        assert_eq!(rows[1].external_id.as_deref(), Some("S7"));
        assert_eq!(rows[1].reference.as_deref(), Some("Hello there"));
    }

    #[test]
    fn test_empty_sheet_gives_empty_table() {
        let table = table_from_range(&Range::<Data>::empty());
        assert!(table.headers.is_empty());
        assert!(table.records.is_empty());
    }

    #[test]
    fn test_missing_workbook_is_input_error() {
        let mut source = XlsxRowSource::new("/nonexistent/book.xlsx", None);
        assert!(matches!(source.read_table(), Err(StimuliError::Input(_))));
        assert!(matches!(sheet_names(Path::new("/nonexistent/book.xlsx")), Err(StimuliError::Input(_))));
    }
}
