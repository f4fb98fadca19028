//! Запись мастер-файлов
//!
//! Мастер строки пишется в папку строки под именем из колонки
//! идентификатора и копируется в общую папку `AllMasters`.

use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::audio::{format, AudioClip};
use crate::config::OutputFormat;
use crate::error::Result;
use crate::pause::PauseChoice;
use crate::rows::StimulusRow;
use crate::utils::fs::{copy_file, ensure_dir, sanitize_file_stem, write_file};

/// Общая папка мастер-файлов внутри выходной папки
pub const MASTERS_DIR: &str = "AllMasters";

/// Предупреждение о качестве данных: запуск продолжается
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DataQualityWarning {
    pub row_number: usize,
    pub sheet_row: usize,
    pub message: String,
}

/// Записанный мастер-файл
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MasterRecording {
    pub row_number: usize,
    pub name: String,
    pub path: PathBuf,
    pub copy_path: PathBuf,
    pub duration_ms: u64,
    pub pause: PauseChoice,
}

/// Имя мастер-файла строки без расширения
///
/// Идентификатор очищается от недопустимых символов; если он пуст,
/// используется `row_{строка таблицы}` и возвращается предупреждение.
pub fn master_name(row: &StimulusRow) -> (String, Option<DataQualityWarning>) {
    let sanitized = row
        .external_id
        .as_deref()
        .map(|id| sanitize_file_stem(id.trim()))
        .filter(|name| !name.is_empty());

    match sanitized {
        Some(name) => (name, None),
        None => {
            let fallback = format!("row_{}", row.sheet_row());
            let warning = DataQualityWarning {
                row_number: row.row_number,
                sheet_row: row.sheet_row(),
                message: format!("Missing identifier in column H, using {}", fallback),
            };
            (fallback, Some(warning))
        }
    }
}

/// Запись мастер-файлов
#[derive(Debug, Clone)]
pub struct MasterFileWriter {
    output_root: PathBuf,
    format: OutputFormat,
}

impl MasterFileWriter {
    pub fn new(output_root: impl Into<PathBuf>, format: OutputFormat) -> Self {
        Self {
            output_root: output_root.into(),
            format,
        }
    }

    pub fn masters_dir(&self) -> PathBuf {
        self.output_root.join(MASTERS_DIR)
    }

    /// Закодировать и записать мастер строки, затем скопировать в `AllMasters`
    ///
    /// Существующие файлы перезаписываются.
    pub fn write(
        &self,
        row: &StimulusRow,
        row_dir: &Path,
        clip: &AudioClip,
        pause: PauseChoice,
    ) -> Result<(MasterRecording, Option<DataQualityWarning>)> {
        let (name, warning) = master_name(row);
        if let Some(warning) = &warning {
            log::warn!("Row {}: {}", warning.sheet_row, warning.message);
        }

        let file_name = format!("{}.{}", name, self.format.extension());
        let path = row_dir.join(&file_name);
        let bytes = format::encode(clip, self.format)?;
        write_file(&path, &bytes)?;

        let masters_dir = self.masters_dir();
        ensure_dir(&masters_dir)?;
        let copy_path = masters_dir.join(&file_name);
        copy_file(&path, &copy_path)?;

        log::info!("Row {}: saved {}", row.row_number, path.display());
        Ok((
            MasterRecording {
                row_number: row.row_number,
                name,
                path,
                copy_path,
                duration_ms: clip.duration_ms(),
                pause,
            },
            warning,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(id: Option<&str>) -> StimulusRow {
        StimulusRow {
            row_number: 3,
            segments: vec!["A".into()],
            external_id: id.map(str::to_string),
            reference: None,
        }
    }

    #[test]
    fn test_master_name_from_identifier() {
        assert_eq!(master_name(&row(Some("item 12/a"))), ("item_12a".to_string(), None));
    }

    #[test]
    fn test_master_name_fallback_warns() {
        for id in [None, Some("   "), Some("???")] {
            let (name, warning) = master_name(&row(id));
            assert_eq!(name, "row_4");
            let warning = warning.unwrap();
            assert_eq!(warning.row_number, 3);
            assert_eq!(warning.sheet_row, 4);
        }
    }

    #[test]
    fn test_write_overwrites_and_copies() {
        let dir = tempfile::tempdir().unwrap();
        let row_dir = dir.path().join("3");
        std::fs::create_dir_all(&row_dir).unwrap();
        std::fs::write(row_dir.join("S3.pcm"), b"stale").unwrap();

        let writer = MasterFileWriter::new(dir.path(), OutputFormat::Pcm);
        let clip = AudioClip::silent(250, 16000, 1);
        let (master, warning) = writer
            .write(&row(Some("S3")), &row_dir, &clip, PauseChoice::NoPause)
            .unwrap();

        assert!(warning.is_none());
        assert_eq!(master.duration_ms, 250);
        assert_eq!(std::fs::read(&master.path).unwrap().len(), 8000);
        assert_eq!(master.copy_path, dir.path().join(MASTERS_DIR).join("S3.pcm"));
        assert_eq!(
            std::fs::read(&master.path).unwrap(),
            std::fs::read(&master.copy_path).unwrap()
        );
    }
}
