//! Модуль для работы с TTS
//!
//! Провайдер речи, синтез фрагментов строк и манифест для повторного
//! использования уже синтезированных фрагментов.

pub mod cache;
pub mod polly;
pub mod synthesizer;

use std::path::PathBuf;

use async_trait::async_trait;
use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::config::{OutputFormat, PollyVoice};
use crate::utils::fs::{sanitize_bounded, MAX_FRAGMENT_STEM};

pub use polly::PollyProvider;
pub use synthesizer::{FragmentSynthesizer, RowFragments};

/// Провайдер синтеза речи
#[async_trait]
pub trait SpeechProvider: Send + Sync {
    /// Синтезировать текст в аудио указанного формата
    async fn synthesize(&self, text: &str, voice: PollyVoice, format: OutputFormat) -> Result<Bytes, String>;
}

/// Синтезированный фрагмент строки
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fragment {
    pub row_number: usize,
    /// Позиция сегмента в строке (с 1)
    pub index: usize,
    pub text: String,
    pub audio_path: PathBuf,
    pub format: OutputFormat,
}

/// Имя файла фрагмента: `{index}_frag_{текст}.{расширение}`
pub fn fragment_file_name(index: usize, text: &str, format: OutputFormat) -> String {
    format!(
        "{}_frag_{}.{}",
        index,
        sanitize_bounded(text, MAX_FRAGMENT_STEM),
        format.extension()
    )
}
