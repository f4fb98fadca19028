//! Файловые операции с контекстом пути в ошибках

use std::path::Path;

use lazy_static::lazy_static;
use regex::Regex;

use crate::error::{Result, StimuliError};

lazy_static! {
    static ref FORBIDDEN_CHARS: Regex = Regex::new(r#"[\\/:*?"<>|]"#).unwrap();
}

/// Максимальная длина текстовой части имени фрагмента
pub const MAX_FRAGMENT_STEM: usize = 30;

/// Сделать текст пригодным для имени файла: пробелы в `_`, без запрещенных символов
pub fn sanitize_file_stem(text: &str) -> String {
    FORBIDDEN_CHARS
        .replace_all(&text.replace(' ', "_"), "")
        .into_owned()
}

/// Санитизация с ограничением длины (в символах)
pub fn sanitize_bounded(text: &str, max_chars: usize) -> String {
    sanitize_file_stem(text).chars().take(max_chars).collect()
}

/// Создать директорию со всеми родителями
pub fn ensure_dir(path: &Path) -> Result<()> {
    std::fs::create_dir_all(path).map_err(|e| StimuliError::filesystem(path, e))
}

/// Записать файл целиком, перезаписывая существующий
pub fn write_file(path: &Path, contents: &[u8]) -> Result<()> {
    std::fs::write(path, contents).map_err(|e| StimuliError::filesystem(path, e))
}

/// Скопировать файл, перезаписывая назначение
pub fn copy_file(from: &Path, to: &Path) -> Result<()> {
    std::fs::copy(from, to)
        .map(|_| ())
        .map_err(|e| StimuliError::filesystem(to, e))
}
