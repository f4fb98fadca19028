//! Интерфейс командной строки
//!
//! Флаги переопределяют значения из JSON конфигурации (`--config`),
//! а та в свою очередь переопределяет значения по умолчанию.

use std::io::{BufRead, Write};
use std::path::PathBuf;

use clap::{Parser, ValueEnum};

use crate::config::{OutputFormat, PollyVoice, StimuliConfig};
use crate::error::Result;

/// Количество строк при включенном ограничении без явного числа
pub const DEFAULT_ROW_LIMIT: usize = 5;

/// Synthesize spreadsheet stimuli into speech fragments and master recordings
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Stimuli file (.csv or .xlsx)
    pub input: PathBuf,

    /// JSON configuration file; flags override its values
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Polly voice (Joanna, Matthew, Ivy, Justin, Kendra)
    #[arg(short, long, value_parser = parse_voice)]
    pub voice: Option<PollyVoice>,

    /// Output format (mp3, ogg_vorbis, pcm)
    #[arg(short, long, value_parser = parse_format)]
    pub format: Option<OutputFormat>,

    /// Pause duration in milliseconds
    #[arg(long)]
    pub pause_ms: Option<u32>,

    /// Process only the first rows (5 unless --max-rows is given)
    #[arg(long)]
    pub limit: bool,

    /// Maximum number of rows to process
    #[arg(long)]
    pub max_rows: Option<usize>,

    /// Only synthesize fragments, skip pause selection and master files
    #[arg(long)]
    pub fragment_only: bool,

    /// Keep leading and trailing silence in fragments
    #[arg(long)]
    pub no_trim: bool,

    /// Silence threshold in dBFS used for trimming
    #[arg(long, allow_hyphen_values = true)]
    pub silence_thresh: Option<f32>,

    /// Rows per page in the pause selector
    #[arg(long)]
    pub rows_per_page: Option<usize>,

    /// Worksheet name (.xlsx only, defaults to the first sheet)
    #[arg(short, long)]
    pub sheet: Option<String>,

    /// AWS region for Polly
    #[arg(long)]
    pub region: Option<String>,

    /// Sample rate requested for pcm output
    #[arg(long)]
    pub pcm_sample_rate: Option<u32>,

    /// Maximum concurrent Polly requests within a row
    #[arg(long)]
    pub concurrency: Option<usize>,

    /// Parent directory for results (defaults to the input file's directory)
    #[arg(short, long)]
    pub output_dir: Option<PathBuf>,

    /// JSON file with pause choices ({"<row>": <after> | null}); skips the interactive selector
    #[arg(long, conflicts_with = "no_pauses")]
    pub pauses: Option<PathBuf>,

    /// Write all masters without pauses; skips the interactive selector
    #[arg(long)]
    pub no_pauses: bool,

    /// Print the sheet names of an .xlsx file and exit
    #[arg(long)]
    pub list_sheets: bool,

    /// Start without asking for confirmation
    #[arg(short, long)]
    pub yes: bool,

    /// Write the run report as JSON to this file
    #[arg(long)]
    pub report: Option<PathBuf>,

    /// Progress display
    #[arg(long, value_enum, default_value_t = ProgressMode::Bar)]
    pub progress: ProgressMode,
}

/// Вид отображения прогресса
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ProgressMode {
    Bar,
    Lines,
    Quiet,
}

fn parse_voice(s: &str) -> std::result::Result<PollyVoice, String> {
    s.parse().map_err(|e: crate::error::StimuliError| e.to_string())
}

fn parse_format(s: &str) -> std::result::Result<OutputFormat, String> {
    s.parse().map_err(|e: crate::error::StimuliError| e.to_string())
}

impl Cli {
    /// Собрать итоговую конфигурацию: файл, затем флаги
    pub fn to_config(&self) -> Result<StimuliConfig> {
        let mut config = match &self.config {
            Some(path) => StimuliConfig::from_json_file(path)?,
            None => StimuliConfig::default(),
        };

        if let Some(voice) = self.voice {
            config.voice = voice;
        }
        if let Some(format) = self.format {
            config.format = format;
        }
        if let Some(pause_ms) = self.pause_ms {
            config.pause_duration_ms = pause_ms;
        }
        if let Some(max_rows) = self.max_rows {
            config.max_rows = Some(max_rows);
        } else if self.limit {
            config.max_rows = Some(DEFAULT_ROW_LIMIT);
        }
        if self.fragment_only {
            config.fragment_only = true;
        }
        if self.no_trim {
            config.trim_silence = false;
        }
        if let Some(thresh) = self.silence_thresh {
            config.trim.silence_thresh_db = thresh;
        }
        if let Some(rows_per_page) = self.rows_per_page {
            config.rows_per_page = rows_per_page;
        }
        if let Some(sheet) = &self.sheet {
            config.sheet = Some(sheet.clone());
        }
        if let Some(region) = &self.region {
            config.region = region.clone();
        }
        if let Some(rate) = self.pcm_sample_rate {
            config.pcm_sample_rate = rate;
        }
        if let Some(concurrency) = self.concurrency {
            config.max_concurrent_requests = concurrency;
        }
        if let Some(output_dir) = &self.output_dir {
            config.output_dir = Some(output_dir.clone());
        }

        config.validate()?;
        Ok(config)
    }
}

/// Показать параметры запуска и спросить подтверждение
///
/// Пустой ответ и `y`/`yes` запускают обработку, остальное отменяет.
pub fn confirm_start<R: BufRead, W: Write>(
    config: &StimuliConfig,
    input_path: &std::path::Path,
    input: &mut R,
    output: &mut W,
) -> Result<bool> {
    writeln!(output, "Input:    {}", input_path.display())?;
    if let Some(sheet) = &config.sheet {
        writeln!(output, "Sheet:    {}", sheet)?;
    }
    writeln!(output, "Voice:    {}", config.voice)?;
    writeln!(output, "Format:   {}", config.format)?;
    writeln!(output, "Pause:    {} ms", config.pause_duration_ms)?;
    match config.max_rows {
        Some(max_rows) => writeln!(output, "Rows:     first {}", max_rows)?,
        None => writeln!(output, "Rows:     all")?,
    }
    writeln!(output, "Trim:     {}", if config.trim_silence { "on" } else { "off" })?;
    if config.fragment_only {
        writeln!(output, "Mode:     fragments only")?;
    }
    write!(output, "Start? [Y/n] ")?;
    output.flush()?;

    let mut answer = String::new();
    if input.read_line(&mut answer)? == 0 {
        return Ok(false);
    }
    let answer = answer.trim().to_ascii_lowercase();
    Ok(answer.is_empty() || answer == "y" || answer == "yes")
}
