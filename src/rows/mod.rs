//! Модуль источников строк
//!
//! Источник строк отдает таблицу (заголовки + ячейки), из которой строятся
//! стимулы: упорядоченные сегменты, идентификатор и эталонное предложение.

pub mod delimited;
pub mod workbook;

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Result, StimuliError};

/// Колонка с идентификатором строки (H)
pub const IDENTIFIER_COLUMN: usize = 7;
/// Колонка с полным эталонным предложением (I)
pub const REFERENCE_COLUMN: usize = 8;
/// Префикс заголовков колонок с сегментами
pub const SEGMENT_PREFIX: &str = "seg";
/// Псевдо-сегмент, который не синтезируется
pub const PAUSE_KEYWORD: &str = "PAUSE";

/// Значение ячейки таблицы
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Empty,
    Text(String),
    Number(f64),
    /// Булевы значения, даты и прочие нетекстовые значения
    Other(String),
}

impl CellValue {
    /// Текст ячейки, если это строковая ячейка
    pub fn as_text(&self) -> Option<&str> {
        match self {
            CellValue::Text(text) => Some(text),
            _ => None,
        }
    }

    /// Строковое представление ячейки (пусто для пустой ячейки)
    pub fn render(&self) -> String {
        match self {
            CellValue::Empty => String::new(),
            CellValue::Text(text) => text.clone(),
            CellValue::Number(n) if n.fract() == 0.0 && n.abs() < 1e15 => format!("{}", *n as i64),
            CellValue::Number(n) => n.to_string(),
            CellValue::Other(text) => text.clone(),
        }
    }

    fn is_empty(&self) -> bool {
        match self {
            CellValue::Empty => true,
            CellValue::Text(text) => text.trim().is_empty(),
            _ => false,
        }
    }
}

/// Таблица, прочитанная из источника
#[derive(Debug, Clone, Default)]
pub struct Table {
    /// Заголовки колонок в исходном порядке
    pub headers: Vec<String>,
    /// Строки данных (без строки заголовков) в порядке источника
    pub records: Vec<Vec<CellValue>>,
}

impl Table {
    /// Собрать таблицу, отбросив пустые строки в конце
    ///
    /// Пустые строки в середине остаются, чтобы номера строк совпадали с
    /// позициями в источнике.
    pub fn new(headers: Vec<String>, mut records: Vec<Vec<CellValue>>) -> Self {
        while records
            .last()
            .is_some_and(|record| record.iter().all(CellValue::is_empty))
        {
            records.pop();
        }
        Self { headers, records }
    }

    /// Индексы колонок с сегментами в порядке таблицы
    pub fn segment_columns(&self) -> Vec<usize> {
        self.headers
            .iter()
            .enumerate()
            .filter(|(_, name)| name.trim().to_lowercase().starts_with(SEGMENT_PREFIX))
            .map(|(i, _)| i)
            .collect()
    }

    /// Построить стимулы из таблицы с учетом ограничения на количество строк
    pub fn stimulus_rows(&self, max_rows: Option<usize>) -> Vec<StimulusRow> {
        let segment_columns = self.segment_columns();
        if segment_columns.is_empty() {
            log::warn!("No columns starting with '{}' found; every row will be empty", SEGMENT_PREFIX);
        }

        let limit = max_rows.unwrap_or(usize::MAX);
        self.records
            .iter()
            .take(limit)
            .enumerate()
            .map(|(i, record)| {
                let cell = |col: usize| record.get(col).cloned().unwrap_or(CellValue::Empty);

                let segments = segment_columns
                    .iter()
                    .filter_map(|&col| cell(col).as_text().map(|t| t.trim().to_string()))
                    .filter(|text| !text.is_empty() && !text.eq_ignore_ascii_case(PAUSE_KEYWORD))
                    .collect();

                StimulusRow {
                    row_number: i + 1,
                    segments,
                    external_id: non_blank(cell(IDENTIFIER_COLUMN).render()),
                    reference: non_blank(cell(REFERENCE_COLUMN).render()),
                }
            })
            .collect()
    }
}

fn non_blank(value: String) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Одна строка стимулов
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StimulusRow {
    /// Номер строки (с 1), стабилен в пределах запуска
    pub row_number: usize,
    /// Тексты сегментов в авторском порядке
    pub segments: Vec<String>,
    /// Идентификатор из колонки H
    pub external_id: Option<String>,
    /// Полное предложение из колонки I
    pub reference: Option<String>,
}

impl StimulusRow {
    /// Номер строки в исходной таблице (строка 1 занята заголовками)
    pub fn sheet_row(&self) -> usize {
        self.row_number + 1
    }
}

/// Источник строк
pub trait RowSource {
    /// Прочитать таблицу целиком
    fn read_table(&mut self) -> Result<Table>;
}

/// Открыть источник по расширению входного файла
pub fn open_source(path: &Path, sheet: Option<&str>) -> Result<Box<dyn RowSource>> {
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .unwrap_or("")
        .to_lowercase();

    match extension.as_str() {
        "csv" => Ok(Box::new(delimited::CsvRowSource::new(path))),
        "xlsx" => Ok(Box::new(workbook::XlsxRowSource::new(path, sheet.map(str::to_string)))),
        _ => Err(StimuliError::Input(format!(
            "Unsupported input file (expected .csv or .xlsx): {}",
            path.display()
        ))),
    }
}

/// Прочитать стимулы из файла
pub fn load_rows(path: &Path, sheet: Option<&str>, max_rows: Option<usize>) -> Result<Vec<StimulusRow>> {
    let mut source = open_source(path, sheet)?;
    let table = source.read_table().map_err(|e| match e {
        StimuliError::Input(_) => e,
        other => StimuliError::Input(format!("{}: {}", path.display(), other)),
    })?;
    let rows = table.stimulus_rows(max_rows);
    log::info!("Loaded {} rows from {}", rows.len(), path.display());
    Ok(rows)
}

/// Лист, из которого будут читаться строки
///
/// Для .xlsx без явного листа берется первый лист книги, для .csv листов нет.
pub fn resolve_sheet(path: &Path, sheet: Option<&str>) -> Result<Option<String>> {
    let is_workbook = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("xlsx"));

    match (is_workbook, sheet) {
        (false, _) => Ok(None),
        (true, Some(sheet)) if !sheet.is_empty() => Ok(Some(sheet.to_string())),
        (true, _) => Ok(workbook::sheet_names(path)?.into_iter().next()),
    }
}

/// Префикс выходной папки: имя файла, либо `{лист}-{имя файла}`
pub fn folder_prefix(path: &Path, sheet: Option<&str>) -> String {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| "stimuli".to_string());
    match sheet {
        Some(sheet) if !sheet.is_empty() => format!("{}-{}", sheet, stem),
        _ => stem,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(s: &str) -> CellValue {
        CellValue::Text(s.to_string())
    }

    fn table() -> Table {
        let headers = ["Seg1", "seg2", "Seg3", "Seg4", "Notes", "x", "y", "ID", "Sentence"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        Table::new(
            headers,
            vec![
                vec![
                    text(" The cat "),
                    text("PAUSE"),
                    text("sat"),
                    CellValue::Number(3.0),
                    text("ignored"),
                    CellValue::Empty,
                    CellValue::Empty,
                    text("S01 "),
                    text("The cat sat"),
                ],
                vec![CellValue::Empty; 9],
                vec![
                    text("Dogs"),
                    text("   "),
                    text("pause"),
                    text("bark"),
                    CellValue::Empty,
                    CellValue::Empty,
                    CellValue::Empty,
                    CellValue::Empty,
                ],
            ],
        )
    }

    #[test]
    fn test_segments_filtered_in_order() {
        let rows = table().stimulus_rows(None);
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].segments, vec!["The cat", "sat"]);
        assert_eq!(rows[0].external_id.as_deref(), Some("S01"));
        assert_eq!(rows[0].reference.as_deref(), Some("The cat sat"));
        assert_eq!(rows[2].segments, vec!["Dogs", "bark"]);
        assert_eq!(rows[2].external_id, None);
    }

    #[test]
    fn test_blank_middle_row_keeps_numbering() {
        let rows = table().stimulus_rows(None);
        assert_eq!(rows[1].row_number, 2);
        assert!(rows[1].segments.is_empty());
        assert_eq!(rows[2].row_number, 3);
        assert_eq!(rows[2].sheet_row(), 4);
    }

    #[test]
    fn test_trailing_blank_rows_dropped() {
        let mut records = table().records;
        records.push(vec![CellValue::Empty; 9]);
        records.push(vec![text("  ")]);
        let table = Table::new(table().headers, records);
        assert_eq!(table.records.len(), 3);
    }

    #[test]
    fn test_row_limit() {
        let rows = table().stimulus_rows(Some(1));
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].row_number, 1);
    }

    #[test]
    fn test_numeric_identifier_rendering() {
        assert_eq!(CellValue::Number(101.0).render(), "101");
        assert_eq!(CellValue::Number(1.5).render(), "1.5");
        assert_eq!(CellValue::Empty.render(), "");
    }

    #[test]
    fn test_folder_prefix() {
        let path = Path::new("/data/stimuli_set.xlsx");
        assert_eq!(folder_prefix(path, None), "stimuli_set");
        assert_eq!(folder_prefix(path, Some("Block2")), "Block2-stimuli_set");
    }

    #[test]
    fn test_resolve_sheet() {
        assert_eq!(resolve_sheet(Path::new("s.csv"), Some("Block2")).unwrap(), None);
        assert_eq!(
            resolve_sheet(Path::new("s.xlsx"), Some("Block2")).unwrap().as_deref(),
            Some("Block2")
        );
        // Первый лист ищется в самой книге, а ее нет
        assert!(matches!(
            resolve_sheet(Path::new("/nonexistent/s.xlsx"), None),
            Err(StimuliError::Input(_))
        ));
    }

    #[test]
    fn test_unsupported_extension_is_input_error() {
        let result = open_source(Path::new("stimuli.txt"), None);
        assert!(matches!(result, Err(StimuliError::Input(_))));
    }
}
