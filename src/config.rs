//! Модуль конфигурации библиотеки stimuli-tts
//!
//! Конфигурация собирается один раз (файл JSON и/или флаги командной строки)
//! и затем передается в каждый компонент как неизменяемое значение.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Result, StimuliError};

/// Голос Amazon Polly
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum PollyVoice {
    Joanna,
    #[default]
    Matthew,
    Ivy,
    Justin,
    Kendra,
}

impl PollyVoice {
    /// Все поддерживаемые голоса
    pub const ALL: [PollyVoice; 5] = [
        PollyVoice::Joanna,
        PollyVoice::Matthew,
        PollyVoice::Ivy,
        PollyVoice::Justin,
        PollyVoice::Kendra,
    ];

    /// Идентификатор голоса в API Polly
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Joanna => "Joanna",
            Self::Matthew => "Matthew",
            Self::Ivy => "Ivy",
            Self::Justin => "Justin",
            Self::Kendra => "Kendra",
        }
    }
}

impl fmt::Display for PollyVoice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PollyVoice {
    type Err = StimuliError;

    fn from_str(s: &str) -> Result<Self> {
        PollyVoice::ALL
            .iter()
            .copied()
            .find(|voice| voice.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| StimuliError::Configuration(format!("Unknown voice: {}", s)))
    }
}

/// Формат выходного аудио
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum OutputFormat {
    #[default]
    Mp3,
    OggVorbis,
    /// Сырые PCM семплы: signed 16-bit little-endian, моно
    Pcm,
}

impl OutputFormat {
    /// Все поддерживаемые форматы
    pub const ALL: [OutputFormat; 3] = [OutputFormat::Mp3, OutputFormat::OggVorbis, OutputFormat::Pcm];

    /// Имя формата в API Polly
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Mp3 => "mp3",
            Self::OggVorbis => "ogg_vorbis",
            Self::Pcm => "pcm",
        }
    }

    /// Расширение файлов этого формата
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Mp3 => "mp3",
            Self::OggVorbis => "ogg",
            Self::Pcm => "pcm",
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OutputFormat {
    type Err = StimuliError;

    fn from_str(s: &str) -> Result<Self> {
        let needle = s.trim().to_ascii_lowercase();
        OutputFormat::ALL
            .iter()
            .copied()
            .find(|format| format.as_str() == needle || format.extension() == needle)
            .ok_or_else(|| StimuliError::Configuration(format!("Unknown output format: {}", s)))
    }
}

/// Параметры обрезки тишины
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TrimSettings {
    /// Порог тишины в dBFS
    pub silence_thresh_db: f32,
    /// Минимальная длина тишины (мс)
    pub min_silence_len_ms: u32,
    /// Отступ, возвращаемый вокруг речи (мс)
    pub padding_ms: u32,
}

impl Default for TrimSettings {
    fn default() -> Self {
        Self {
            silence_thresh_db: -48.0,
            min_silence_len_ms: 40,
            padding_ms: 0,
        }
    }
}

/// Конфигурация запуска
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StimuliConfig {
    /// Голос TTS
    pub voice: PollyVoice,
    /// Формат фрагментов и мастер-файлов
    pub format: OutputFormat,
    /// Длительность вставляемой паузы (мс)
    pub pause_duration_ms: u32,
    /// Ограничение на количество строк (None = все строки)
    pub max_rows: Option<usize>,
    /// Только фрагменты: без выбора пауз и сборки
    pub fragment_only: bool,
    /// Обрезать тишину во фрагментах
    pub trim_silence: bool,
    /// Параметры обрезки
    pub trim: TrimSettings,
    /// Строк на страницу в редакторе пауз
    pub rows_per_page: usize,
    /// Лист рабочей книги (только для .xlsx)
    pub sheet: Option<String>,
    /// Регион AWS
    pub region: String,
    /// Частота дискретизации для формата pcm
    pub pcm_sample_rate: u32,
    /// Максимальное количество одновременных запросов в пределах строки
    pub max_concurrent_requests: usize,
    /// Родительская директория для результатов (по умолчанию рядом с входным файлом)
    pub output_dir: Option<PathBuf>,
}

impl Default for StimuliConfig {
    fn default() -> Self {
        Self {
            voice: PollyVoice::default(),
            format: OutputFormat::default(),
            pause_duration_ms: 500,
            max_rows: None,
            fragment_only: false,
            trim_silence: true,
            trim: TrimSettings::default(),
            rows_per_page: 10,
            sheet: None,
            region: "us-east-1".to_string(),
            pcm_sample_rate: 16000,
            max_concurrent_requests: 1,
            output_dir: None,
        }
    }
}

impl StimuliConfig {
    /// Загрузить конфигурацию из JSON файла
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| StimuliError::filesystem(path, e))?;
        let config: StimuliConfig = serde_json::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Проверить значения, которые нельзя выразить типами
    pub fn validate(&self) -> Result<()> {
        if self.rows_per_page == 0 {
            return Err(StimuliError::Configuration(
                "rows_per_page must be at least 1".to_string(),
            ));
        }
        if self.max_concurrent_requests == 0 {
            return Err(StimuliError::Configuration(
                "max_concurrent_requests must be at least 1".to_string(),
            ));
        }
        if self.max_rows == Some(0) {
            return Err(StimuliError::Configuration(
                "max_rows must be at least 1 when the row limit is enabled".to_string(),
            ));
        }
        if self.pcm_sample_rate == 0 {
            return Err(StimuliError::Configuration(
                "pcm_sample_rate must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_operator_dialog() {
        let config = StimuliConfig::default();
        assert_eq!(config.voice, PollyVoice::Matthew);
        assert_eq!(config.format, OutputFormat::Mp3);
        assert_eq!(config.pause_duration_ms, 500);
        assert_eq!(config.rows_per_page, 10);
        assert!(config.trim_silence);
        assert!(!config.fragment_only);
        assert_eq!(config.trim.silence_thresh_db, -48.0);
        assert_eq!(config.trim.padding_ms, 0);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_enums() {
        assert_eq!("ivy".parse::<PollyVoice>().unwrap(), PollyVoice::Ivy);
        assert_eq!("ogg_vorbis".parse::<OutputFormat>().unwrap(), OutputFormat::OggVorbis);
        assert_eq!("ogg".parse::<OutputFormat>().unwrap(), OutputFormat::OggVorbis);
        assert!("wav".parse::<OutputFormat>().is_err());
        assert!("Brian".parse::<PollyVoice>().is_err());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"voice": "Joanna", "format": "pcm", "pause_duration_ms": 750}"#).unwrap();

        let config = StimuliConfig::from_json_file(&path).unwrap();
        assert_eq!(config.voice, PollyVoice::Joanna);
        assert_eq!(config.format, OutputFormat::Pcm);
        assert_eq!(config.pause_duration_ms, 750);
        assert_eq!(config.rows_per_page, 10);
    }

    #[test]
    fn test_zero_page_size_rejected() {
        let config = StimuliConfig {
            rows_per_page: 0,
            ..StimuliConfig::default()
        };
        assert!(matches!(config.validate(), Err(StimuliError::Configuration(_))));
    }
}
