//! Модуль для повторного использования синтезированных фрагментов
//!
//! В каждой папке строки лежит `manifest.json` со списком записанных
//! фрагментов. Фрагмент используется повторно, если манифест знает его
//! (тот же индекс, текст, формат и голос) и файл на месте. Для папок без
//! манифеста (старые запуски) достаточно файла с ожидаемым именем.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::fragment_file_name;
use crate::config::{OutputFormat, PollyVoice};
use crate::error::{Result, StimuliError};
use crate::utils::fs::write_file;

/// Имя файла манифеста в папке строки
pub const MANIFEST_FILE: &str = "manifest.json";

/// Запись о фрагменте в манифесте
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FragmentRecord {
    pub index: usize,
    pub text: String,
    pub file_name: String,
}

/// Манифест строки
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RowManifest {
    pub row_number: usize,
    pub voice: PollyVoice,
    pub format: OutputFormat,
    /// Все сегменты строки синтезированы
    pub complete: bool,
    /// Фрагменты прошли обрезку тишины
    pub trimmed: bool,
    pub updated_at: DateTime<Utc>,
    pub fragments: Vec<FragmentRecord>,
}

impl RowManifest {
    /// Прочитать манифест; поврежденный манифест игнорируется
    pub fn load(row_dir: &Path) -> Result<Option<Self>> {
        let path = row_dir.join(MANIFEST_FILE);
        if !path.is_file() {
            return Ok(None);
        }
        let raw = std::fs::read_to_string(&path).map_err(|e| StimuliError::filesystem(&path, e))?;
        match serde_json::from_str(&raw) {
            Ok(manifest) => Ok(Some(manifest)),
            Err(e) => {
                log::warn!("Ignoring unreadable manifest {}: {}", path.display(), e);
                Ok(None)
            }
        }
    }

    /// Записать манифест в папку строки
    pub fn save(&self, row_dir: &Path) -> Result<()> {
        let json = serde_json::to_vec_pretty(self)?;
        write_file(&row_dir.join(MANIFEST_FILE), &json)
    }
}

/// Кэш фрагментов одной строки
pub struct FragmentCache {
    row_dir: PathBuf,
    row_number: usize,
    voice: PollyVoice,
    format: OutputFormat,
    previous: Option<RowManifest>,
    records: Vec<FragmentRecord>,
}

impl FragmentCache {
    /// Открыть кэш папки строки
    pub fn open(row_dir: &Path, row_number: usize, voice: PollyVoice, format: OutputFormat) -> Result<Self> {
        let previous = RowManifest::load(row_dir)?;
        if let Some(manifest) = &previous {
            if manifest.voice != voice || manifest.format != format {
                log::info!(
                    "Row {}: manifest was written for {}/{}; fragments will be synthesized again",
                    row_number,
                    manifest.voice,
                    manifest.format
                );
            }
        }

        Ok(Self {
            row_dir: row_dir.to_path_buf(),
            row_number,
            voice,
            format,
            previous,
            records: Vec::new(),
        })
    }

    /// Путь к ранее синтезированному фрагменту, если его можно использовать
    pub fn get_cached_fragment(&self, index: usize, text: &str) -> Option<PathBuf> {
        let file_name = fragment_file_name(index, text, self.format);
        let path = self.row_dir.join(&file_name);
        if !path.is_file() {
            return None;
        }

        match &self.previous {
            Some(manifest) => {
                let same_settings = manifest.voice == self.voice && manifest.format == self.format;
                let known = manifest
                    .fragments
                    .iter()
                    .any(|record| record.index == index && record.text == text && record.file_name == file_name);
                (same_settings && known).then_some(path)
            }
            None => Some(path),
        }
    }

    /// Отметить фрагмент как записанный
    pub fn add_fragment(&mut self, index: usize, text: &str, file_name: &str) {
        self.records.push(FragmentRecord {
            index,
            text: text.to_string(),
            file_name: file_name.to_string(),
        });
    }

    /// Записать манифест строки
    pub fn finish(mut self, complete: bool, trimmed: bool) -> Result<RowManifest> {
        self.records.sort_by_key(|record| record.index);
        let manifest = RowManifest {
            row_number: self.row_number,
            voice: self.voice,
            format: self.format,
            complete,
            trimmed,
            updated_at: Utc::now(),
            fragments: self.records,
        };
        manifest.save(&self.row_dir)?;
        Ok(manifest)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manifest_round_trip_enables_reuse() {
        let dir = tempfile::tempdir().unwrap();
        let name = fragment_file_name(1, "hello", OutputFormat::Pcm);
        std::fs::write(dir.path().join(&name), [0u8, 0]).unwrap();

        let mut cache = FragmentCache::open(dir.path(), 1, PollyVoice::Ivy, OutputFormat::Pcm).unwrap();
        cache.add_fragment(1, "hello", &name);
        let manifest = cache.finish(true, true).unwrap();
        assert!(manifest.complete);

        let cache = FragmentCache::open(dir.path(), 1, PollyVoice::Ivy, OutputFormat::Pcm).unwrap();
        assert_eq!(cache.get_cached_fragment(1, "hello"), Some(dir.path().join(&name)));
        assert_eq!(cache.get_cached_fragment(2, "world"), None);
    }

    #[test]
    fn test_voice_change_invalidates_fragments() {
        let dir = tempfile::tempdir().unwrap();
        let name = fragment_file_name(1, "hello", OutputFormat::Pcm);
        std::fs::write(dir.path().join(&name), [0u8, 0]).unwrap();

        let mut cache = FragmentCache::open(dir.path(), 1, PollyVoice::Ivy, OutputFormat::Pcm).unwrap();
        cache.add_fragment(1, "hello", &name);
        cache.finish(true, true).unwrap();

        let cache = FragmentCache::open(dir.path(), 1, PollyVoice::Kendra, OutputFormat::Pcm).unwrap();
        assert_eq!(cache.get_cached_fragment(1, "hello"), None);
    }

    #[test]
    fn test_legacy_folder_without_manifest() {
        let dir = tempfile::tempdir().unwrap();
        let name = fragment_file_name(1, "hello", OutputFormat::Mp3);
        std::fs::write(dir.path().join(&name), b"ID3").unwrap();

        let cache = FragmentCache::open(dir.path(), 1, PollyVoice::Matthew, OutputFormat::Mp3).unwrap();
        assert!(cache.get_cached_fragment(1, "hello").is_some());
        // Другой формат не подходит
        let cache = FragmentCache::open(dir.path(), 1, PollyVoice::Matthew, OutputFormat::Pcm).unwrap();
        assert!(cache.get_cached_fragment(1, "hello").is_none());
    }

    #[test]
    fn test_corrupted_manifest_ignored() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(MANIFEST_FILE), "{not json").unwrap();
        assert!(RowManifest::load(dir.path()).unwrap().is_none());
    }
}
