//! Модуль обработки ошибок библиотеки stimuli-tts
//!
//! Ошибки делятся на фатальные (вход и конфигурация прерывают весь запуск)
//! и локальные для строки (провайдер, файловая система, аудио), которые
//! попадают в отчет о запуске и не останавливают пакет.

use std::path::PathBuf;
use thiserror::Error;

/// Ошибки библиотеки stimuli-tts
#[derive(Debug, Error)]
pub enum StimuliError {
    /// Входной файл не читается или не поддерживается
    #[error("Input error: {0}")]
    Input(String),

    /// Провайдер не смог синтезировать сегмент
    #[error("Provider error (row {row}, segment {segment}): {message}")]
    Provider {
        row: usize,
        segment: usize,
        message: String,
    },

    /// Не удалось создать директорию или записать файл
    #[error("Filesystem error at {}: {source}", path.display())]
    Filesystem {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Ошибка обработки аудио
    #[error("Audio processing error: {0}")]
    AudioProcessing(String),

    /// Ошибка выбора паузы
    #[error("Pause selection error: {0}")]
    Selection(String),

    /// Ошибка конфигурации
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Оператор отменил запуск
    #[error("Canceled by operator")]
    Canceled,

    /// Ошибка ввода-вывода
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Ошибка сериализации/десериализации JSON
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Ошибка чтения CSV
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Ошибка чтения рабочей книги Excel
    #[error("Workbook error: {0}")]
    Workbook(#[from] calamine::XlsxError),

    /// Ошибка WAV-кодирования
    #[error("WAV error: {0}")]
    Wav(#[from] hound::Error),
}

impl StimuliError {
    /// Обернуть ошибку ввода-вывода с путем к файлу
    pub fn filesystem(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        StimuliError::Filesystem {
            path: path.into(),
            source,
        }
    }

    /// Прерывает ли ошибка весь запуск
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            StimuliError::Input(_)
                | StimuliError::Configuration(_)
                | StimuliError::Canceled
                | StimuliError::Csv(_)
                | StimuliError::Workbook(_)
        )
    }
}

/// Тип Result для библиотеки stimuli-tts
pub type Result<T> = std::result::Result<T, StimuliError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fatal_classification() {
        assert!(StimuliError::Input("bad".into()).is_fatal());
        assert!(StimuliError::Canceled.is_fatal());
        assert!(!StimuliError::AudioProcessing("x".into()).is_fatal());
        let err = StimuliError::filesystem(
            "/tmp/out/3",
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        );
        assert!(!err.is_fatal());
        assert!(err.to_string().contains("/tmp/out/3"));
    }

    #[test]
    fn test_provider_error_context() {
        let err = StimuliError::Provider {
            row: 4,
            segment: 2,
            message: "throttled".into(),
        };
        assert_eq!(
            err.to_string(),
            "Provider error (row 4, segment 2): throttled"
        );
    }
}
