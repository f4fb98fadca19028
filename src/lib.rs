//! Основной файл библиотеки stimuli-tts
//!
//! Библиотека превращает сегменты строк таблицы стимулов в фрагменты речи,
//! дает оператору выбрать паузу внутри каждой строки и собирает мастер-файлы.
//! Ход запуска можно отслеживать через систему прогресса.

pub mod audio;
pub mod cli;
pub mod config;
pub mod error;
pub mod logger;
pub mod master;
pub mod notification;
pub mod pause;
pub mod progress;
pub mod rows;
pub mod tts;
pub mod utils;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Serialize;

use crate::audio::{format, AudioAssembler, AudioClip, DecodeOptions};
use crate::config::StimuliConfig;
use crate::error::{Result, StimuliError};
use crate::master::{DataQualityWarning, MasterFileWriter, MasterRecording};
use crate::pause::{ConfirmedSelections, PausePlacementSession, PauseSelector, SessionRow};
use crate::progress::{ProcessStep, ProgressObserver, ProgressReporter, ProgressTracker};
use crate::rows::StimulusRow;
use crate::tts::{FragmentSynthesizer, RowFragments, SpeechProvider};
use crate::utils::fs::ensure_dir;

/// Ошибка, затронувшая одну строку
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RowFailure {
    pub row_number: usize,
    pub path: Option<PathBuf>,
    pub message: String,
}

/// Итог запуска
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunReport {
    pub output_root: PathBuf,
    pub rows_loaded: usize,
    pub fragments_synthesized: usize,
    pub fragments_reused: usize,
    /// Пары (строка, сегмент), для которых синтез не удался
    pub failed_segments: Vec<(usize, usize)>,
    /// Строки без единого фрагмента: мастер не создается
    pub empty_rows: Vec<usize>,
    pub row_failures: Vec<RowFailure>,
    pub warnings: Vec<DataQualityWarning>,
    pub masters: Vec<MasterRecording>,
    /// Оператор вышел из выбора пауз без генерации
    pub selection_skipped: bool,
}

impl RunReport {
    /// Были ли ошибки на уровне строк или сегментов
    pub fn has_failures(&self) -> bool {
        !self.failed_segments.is_empty() || !self.row_failures.is_empty()
    }

    fn record_failure(&mut self, row_number: usize, error: &StimuliError) {
        let path = match error {
            StimuliError::Filesystem { path, .. } => Some(path.clone()),
            _ => None,
        };
        log::error!("Row {}: {}", row_number, error);
        self.row_failures.push(RowFailure {
            row_number,
            path,
            message: error.to_string(),
        });
    }
}

/// Выходная папка: `{output_dir}/{префикс}`, по умолчанию рядом с входным файлом
pub fn output_root(input: &Path, sheet: Option<&str>, config: &StimuliConfig) -> PathBuf {
    let base = config
        .output_dir
        .clone()
        .or_else(|| input.parent().map(Path::to_path_buf))
        .unwrap_or_default();
    base.join(rows::folder_prefix(input, sheet))
}

/// Конвейер: строки → фрагменты → выбор пауз → мастер-файлы
pub struct StimuliPipeline {
    config: StimuliConfig,
    provider: Arc<dyn SpeechProvider>,
    progress_tracker: Option<ProgressTracker>,
}

impl StimuliPipeline {
    /// Создать конвейер; конфигурация проверяется сразу
    pub fn new(config: StimuliConfig, provider: Arc<dyn SpeechProvider>) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            provider,
            progress_tracker: None,
        })
    }

    pub fn with_progress_reporter(
        config: StimuliConfig,
        provider: Arc<dyn SpeechProvider>,
        reporter: Box<dyn ProgressReporter>,
    ) -> Result<Self> {
        let mut pipeline = Self::new(config, provider)?;
        pipeline.progress_tracker = Some(ProgressTracker::with_reporter(reporter));
        Ok(pipeline)
    }

    pub fn config(&self) -> &StimuliConfig {
        &self.config
    }

    /// Добавить наблюдателя прогресса
    pub fn add_observer(&mut self, observer: Box<dyn ProgressObserver>) -> usize {
        self.progress_tracker
            .get_or_insert_with(ProgressTracker::new)
            .add_observer(observer)
    }

    fn set_step(&self, step: ProcessStep) {
        if let Some(t) = &self.progress_tracker {
            t.set_step(step);
        }
    }

    fn update_progress(&self, progress: f32, details: impl Into<String>) {
        if let Some(t) = &self.progress_tracker {
            t.update_step_progress(progress, Some(details.into()));
        }
    }

    /// Полный запуск
    ///
    /// Ошибки входа и конфигурации прерывают запуск; ошибки строк и
    /// сегментов собираются в отчет.
    pub async fn run(&self, input: &Path, selector: &mut dyn PauseSelector) -> Result<RunReport> {
        log::info!("Starting stimuli run for {}", input.display());
        self.log_configuration();

        self.set_step(ProcessStep::RowLoading);
        let sheet = rows::resolve_sheet(input, self.config.sheet.as_deref())?;
        let rows = rows::load_rows(input, sheet.as_deref(), self.config.max_rows)?;
        self.update_progress(100.0, format!("{} rows loaded", rows.len()));

        let output_root = output_root(input, sheet.as_deref(), &self.config);
        ensure_dir(&output_root)?;

        let mut report = RunReport {
            output_root: output_root.clone(),
            rows_loaded: rows.len(),
            ..RunReport::default()
        };

        let synthesized = self.synthesize_rows(&rows, &output_root, &mut report).await;

        if self.config.fragment_only {
            log::info!("Fragment-only mode: skipping pause selection and master files");
        } else {
            self.set_step(ProcessStep::PauseSelection);
            let session_rows = synthesized
                .iter()
                .map(|row| SessionRow {
                    row_number: row.row.row_number,
                    sheet_row: row.row.sheet_row(),
                    fragment_texts: row.fragments.iter().map(|f| f.text.clone()).collect(),
                })
                .collect();
            let session = PausePlacementSession::new(session_rows, self.config.rows_per_page)?;

            match selector.run(session)? {
                Some(selections) => {
                    self.update_progress(100.0, format!("{} selections confirmed", selections.len()));
                    self.write_masters(&synthesized, &selections, &output_root, &mut report);
                }
                None => {
                    log::warn!("Pause selection closed without confirmation; no master files written");
                    report.selection_skipped = true;
                }
            }
        }

        if let Some(t) = &self.progress_tracker {
            t.complete();
        }
        log::info!(
            "Run finished: {} masters, {} failed segments, {} row failures, {} warnings",
            report.masters.len(),
            report.failed_segments.len(),
            report.row_failures.len(),
            report.warnings.len()
        );
        Ok(report)
    }

    /// Синтезировать фрагменты всех строк по очереди
    ///
    /// Возвращает строки, у которых есть хотя бы один фрагмент.
    pub async fn synthesize_rows(
        &self,
        rows: &[StimulusRow],
        output_root: &Path,
        report: &mut RunReport,
    ) -> Vec<RowFragments> {
        self.set_step(ProcessStep::FragmentSynthesis);
        let synthesizer = FragmentSynthesizer::new(self.provider.clone(), self.config.clone());
        let mut synthesized = Vec::with_capacity(rows.len());

        for (i, row) in rows.iter().enumerate() {
            match synthesizer.synthesize_row(row, output_root).await {
                Ok(fragments) => {
                    report.fragments_reused += fragments.reused;
                    report.fragments_synthesized += fragments.fragments.len() - fragments.reused;
                    report
                        .failed_segments
                        .extend(fragments.failed_segments.iter().map(|&s| (row.row_number, s)));

                    if fragments.fragments.is_empty() {
                        log::warn!("Row {} has no fragments; no master will be written", row.row_number);
                        report.empty_rows.push(row.row_number);
                    } else {
                        synthesized.push(fragments);
                    }
                }
                Err(e) => report.record_failure(row.row_number, &e),
            }

            let progress = (i + 1) as f32 / rows.len() as f32 * 100.0;
            self.update_progress(progress, format!("Row {}/{}", i + 1, rows.len()));
        }

        log::info!(
            "Fragments done: {} synthesized, {} reused",
            report.fragments_synthesized,
            report.fragments_reused
        );
        synthesized
    }

    /// Собрать и записать мастер-файлы по подтвержденному выбору
    pub fn write_masters(
        &self,
        synthesized: &[RowFragments],
        selections: &ConfirmedSelections,
        output_root: &Path,
        report: &mut RunReport,
    ) {
        self.set_step(ProcessStep::MasterAssembly);
        let assembler = AudioAssembler::new(self.config.pause_duration_ms);
        let writer = MasterFileWriter::new(output_root, self.config.format);

        for (i, row) in synthesized.iter().enumerate() {
            let choice = selections.choice_for(row.row.row_number);
            let result = self
                .load_clips(row)
                .and_then(|clips| assembler.assemble(&clips, choice))
                .and_then(|clip| writer.write(&row.row, &row.row_dir, &clip, choice));

            match result {
                Ok((master, warning)) => {
                    report.warnings.extend(warning);
                    report.masters.push(master);
                }
                Err(e) => report.record_failure(row.row.row_number, &e),
            }

            let progress = (i + 1) as f32 / synthesized.len() as f32 * 100.0;
            self.update_progress(progress, format!("Master {}/{}", i + 1, synthesized.len()));
        }
    }

    fn load_clips(&self, row: &RowFragments) -> Result<Vec<AudioClip>> {
        let options = DecodeOptions {
            pcm_sample_rate: self.config.pcm_sample_rate,
        };
        row.fragments
            .iter()
            .map(|fragment| format::decode_file(&fragment.audio_path, fragment.format, options))
            .collect()
    }

    fn log_configuration(&self) {
        log::info!("Run configuration:");
        log::info!("  Voice: {}", self.config.voice);
        log::info!("  Format: {}", self.config.format);
        log::info!("  Pause: {} ms", self.config.pause_duration_ms);
        log::info!("  Trim silence: {}", self.config.trim_silence);
        log::info!("  Max concurrent requests: {}", self.config.max_concurrent_requests);
        if let Some(max_rows) = self.config.max_rows {
            log::info!("  Row limit: {}", max_rows);
        }
    }
}
