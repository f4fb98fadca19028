//! Синтез фрагментов строки
//!
//! Для каждого сегмента строки: взять фрагмент из кэша или запросить
//! провайдера, обрезать тишину и записать файл в папку строки. Ошибка
//! провайдера для сегмента не останавливает строку, ошибка записи файла
//! делает строку неудачной.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use bytes::Bytes;
use futures::future::join_all;
use tokio::sync::Semaphore;

use super::cache::FragmentCache;
use super::{fragment_file_name, Fragment, SpeechProvider};
use crate::audio::{format, DecodeOptions, SilenceTrimmer, TrimOutcome};
use crate::config::{OutputFormat, PollyVoice, StimuliConfig};
use crate::error::{Result, StimuliError};
use crate::rows::StimulusRow;
use crate::utils::fs::ensure_dir;

/// Фрагменты одной строки после синтеза
#[derive(Debug, Clone)]
pub struct RowFragments {
    pub row: StimulusRow,
    pub row_dir: PathBuf,
    /// Доступные фрагменты в порядке сегментов
    pub fragments: Vec<Fragment>,
    /// Позиции сегментов (с 1), для которых синтез не удался
    pub failed_segments: Vec<usize>,
    /// Сколько фрагментов взято из кэша
    pub reused: usize,
}

impl RowFragments {
    /// Все сегменты строки имеют фрагменты
    pub fn is_complete(&self) -> bool {
        self.failed_segments.is_empty() && self.fragments.len() == self.row.segments.len()
    }
}

/// Параметры, общие для задач синтеза одной строки
#[derive(Clone)]
struct SegmentJob {
    provider: Arc<dyn SpeechProvider>,
    voice: PollyVoice,
    format: OutputFormat,
    trimmer: Option<SilenceTrimmer>,
    decode_options: DecodeOptions,
    row_dir: PathBuf,
    row_number: usize,
}

/// Синтезатор фрагментов
pub struct FragmentSynthesizer {
    provider: Arc<dyn SpeechProvider>,
    config: StimuliConfig,
    semaphore: Arc<Semaphore>,
}

impl FragmentSynthesizer {
    pub fn new(provider: Arc<dyn SpeechProvider>, config: StimuliConfig) -> Self {
        let permits = config.max_concurrent_requests.max(1);
        Self {
            provider,
            config,
            semaphore: Arc::new(Semaphore::new(permits)),
        }
    }

    /// Синтезировать фрагменты строки в `{output_root}/{row_number}`
    ///
    /// Ошибка возвращается, если не удалось записать папку строки, манифест
    /// или файл фрагмента; ошибки провайдера попадают в `failed_segments`.
    pub async fn synthesize_row(&self, row: &StimulusRow, output_root: &Path) -> Result<RowFragments> {
        let row_dir = output_root.join(row.row_number.to_string());
        ensure_dir(&row_dir)?;

        let mut cache = FragmentCache::open(&row_dir, row.row_number, self.config.voice, self.config.format)?;

        let job = SegmentJob {
            provider: self.provider.clone(),
            voice: self.config.voice,
            format: self.config.format,
            trimmer: self
                .config
                .trim_silence
                .then(|| SilenceTrimmer::new(self.config.trim)),
            decode_options: DecodeOptions {
                pcm_sample_rate: self.config.pcm_sample_rate,
            },
            row_dir: row_dir.clone(),
            row_number: row.row_number,
        };

        // Сначала кэш, затем задачи для недостающих сегментов
        let mut slots: Vec<Option<PathBuf>> = Vec::with_capacity(row.segments.len());
        let mut tasks = Vec::new();
        let mut reused = 0;

        for (i, text) in row.segments.iter().enumerate() {
            let index = i + 1;
            if let Some(path) = cache.get_cached_fragment(index, text) {
                log::debug!("Row {}: reusing fragment {}", row.row_number, path.display());
                reused += 1;
                slots.push(Some(path));
                continue;
            }
            slots.push(None);

            let job = job.clone();
            let semaphore = self.semaphore.clone();
            let text = text.clone();
            tasks.push(tokio::spawn(async move {
                let _permit = match semaphore.acquire_owned().await {
                    Ok(permit) => permit,
                    Err(e) => return (index, Err(StimuliError::AudioProcessing(e.to_string()))),
                };
                (index, job.run(index, &text).await)
            }));
        }

        if tasks.is_empty() {
            log::info!(
                "Row {}: all {} fragments already exist, skipping synthesis",
                row.row_number,
                row.segments.len()
            );
        } else {
            log::info!(
                "Row {}: synthesizing {} of {} fragments",
                row.row_number,
                tasks.len(),
                row.segments.len()
            );
        }

        let mut failed_segments = Vec::new();
        let mut write_error = None;
        for result in join_all(tasks).await {
            match result {
                Ok((index, Ok(path))) => slots[index - 1] = Some(path),
                Ok((_, Err(e @ StimuliError::Filesystem { .. }))) => {
                    if write_error.is_none() {
                        write_error = Some(e);
                    }
                }
                Ok((index, Err(e))) => {
                    match &e {
                        StimuliError::Provider { .. } => log::error!("{}", e),
                        _ => log::error!("Row {}, segment {}: {}", row.row_number, index, e),
                    }
                    failed_segments.push(index);
                }
                Err(e) => log::error!("Row {}: synthesis task failed: {}", row.row_number, e),
            }
        }

        let mut fragments = Vec::new();
        for (i, (text, slot)) in row.segments.iter().zip(slots).enumerate() {
            let index = i + 1;
            let Some(audio_path) = slot else {
                if !failed_segments.contains(&index) {
                    failed_segments.push(index);
                }
                continue;
            };
            let file_name = fragment_file_name(index, text, self.config.format);
            cache.add_fragment(index, text, &file_name);
            fragments.push(Fragment {
                row_number: row.row_number,
                index,
                text: text.clone(),
                audio_path,
                format: self.config.format,
            });
        }
        failed_segments.sort_unstable();

        if let Some(e) = write_error {
            cache.finish(false, self.config.trim_silence)?;
            return Err(e);
        }

        let result = RowFragments {
            row: row.clone(),
            row_dir,
            fragments,
            failed_segments,
            reused,
        };
        cache.finish(result.is_complete(), self.config.trim_silence)?;
        Ok(result)
    }
}

impl SegmentJob {
    /// Запросить, обработать и записать один фрагмент
    async fn run(&self, index: usize, text: &str) -> Result<PathBuf> {
        log::info!("Sending TTS request for row {} segment {}", self.row_number, index);
        let audio = self
            .provider
            .synthesize(text, self.voice, self.format)
            .await
            .map_err(|e| StimuliError::Provider {
                row: self.row_number,
                segment: index,
                message: e,
            })?;

        let bytes = self.trim(audio);
        let path = self.row_dir.join(fragment_file_name(index, text, self.format));
        tokio::fs::write(&path, &bytes)
            .await
            .map_err(|e| StimuliError::filesystem(&path, e))?;

        log::info!("Saved fragment {} for row {} to {}", index, self.row_number, path.display());
        Ok(path)
    }

    /// Обрезать тишину; без изменений сохраняются исходные байты провайдера
    fn trim(&self, audio: Bytes) -> Bytes {
        let Some(trimmer) = &self.trimmer else {
            return audio;
        };

        let clip = match format::decode(&audio, self.format, self.decode_options) {
            Ok(clip) => clip,
            Err(e) => {
                log::warn!(
                    "Row {}: could not decode provider audio for trimming, keeping it as is: {}",
                    self.row_number,
                    e
                );
                return audio;
            }
        };

        match trimmer.trim(&clip) {
            TrimOutcome::Unchanged => audio,
            TrimOutcome::Trimmed { clip, start_ms, end_ms } => match format::encode(&clip, self.format) {
                Ok(encoded) => {
                    log::debug!("Row {}: trimmed fragment to {}..{} ms", self.row_number, start_ms, end_ms);
                    Bytes::from(encoded)
                }
                Err(e) => {
                    log::warn!("Row {}: could not encode trimmed audio, keeping it as is: {}", self.row_number, e);
                    audio
                }
            },
        }
    }
}
