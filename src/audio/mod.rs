//! Модуль для работы с аудио
//!
//! Клипы в памяти, декодирование и кодирование форматов провайдера,
//! обрезка тишины и сборка мастер-записей.

pub mod assemble;
pub mod clip;
pub mod format;
pub mod trim;

pub use assemble::AudioAssembler;
pub use clip::AudioClip;
pub use format::DecodeOptions;
pub use trim::{SilenceTrimmer, TrimOutcome};
