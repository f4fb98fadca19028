use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;

use stimuli_tts::cli::{confirm_start, Cli, ProgressMode};
use stimuli_tts::config::OutputFormat;
use stimuli_tts::error::StimuliError;
use stimuli_tts::logger::init_logger;
use stimuli_tts::notification::{ConsoleProgressObserver, ProgressBarObserver};
use stimuli_tts::pause::{NoPauseSelector, PauseSelector, PresetSelector, TerminalSelector};
use stimuli_tts::rows::workbook::sheet_names;
use stimuli_tts::tts::PollyProvider;
use stimuli_tts::utils::ffmpeg::check_ffmpeg_installed;
use stimuli_tts::{RunReport, StimuliPipeline};

#[tokio::main]
async fn main() -> ExitCode {
    init_logger();
    let cli = Cli::parse();

    match run(cli).await {
        Ok(report) if report.has_failures() => ExitCode::from(2),
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            if matches!(e.downcast_ref::<StimuliError>(), Some(StimuliError::Canceled)) {
                eprintln!("canceled by operator");
            } else {
                log::error!("{:#}", e);
            }
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<RunReport> {
    if cli.list_sheets {
        for name in sheet_names(&cli.input)? {
            println!("{}", name);
        }
        return Ok(RunReport::default());
    }

    let config = cli.to_config().context("Invalid configuration")?;

    if config.format != OutputFormat::Pcm && !check_ffmpeg_installed() {
        log::warn!("FFmpeg not found; trimmed fragments and master files cannot be encoded as {}", config.format);
    }

    if !cli.yes {
        let mut stdin = std::io::stdin().lock();
        let mut stdout = std::io::stdout();
        if !confirm_start(&config, &cli.input, &mut stdin, &mut stdout)? {
            return Err(StimuliError::Canceled.into());
        }
    }

    let provider = Arc::new(PollyProvider::from_config(&config).await);
    let mut pipeline = StimuliPipeline::new(config, provider)?;
    match cli.progress {
        ProgressMode::Bar => {
            pipeline.add_observer(Box::new(ProgressBarObserver::default()));
        }
        ProgressMode::Lines => {
            pipeline.add_observer(Box::new(ConsoleProgressObserver::new()));
        }
        ProgressMode::Quiet => {}
    }

    let mut selector: Box<dyn PauseSelector> = match (&cli.pauses, cli.no_pauses) {
        (Some(path), _) => Box::new(PresetSelector::from_json_file(path)?),
        (None, true) => Box::new(NoPauseSelector),
        (None, false) => Box::new(TerminalSelector::stdio()),
    };

    let report = pipeline
        .run(&cli.input, selector.as_mut())
        .await
        .with_context(|| format!("Run failed for {}", cli.input.display()))?;

    if let Some(path) = &cli.report {
        let json = serde_json::to_vec_pretty(&report)?;
        std::fs::write(path, json).with_context(|| format!("Failed to write report to {}", path.display()))?;
    }
    print_summary(&report);
    Ok(report)
}

fn print_summary(report: &RunReport) {
    println!();
    println!("Output: {}", report.output_root.display());
    println!(
        "Rows: {} | fragments: {} new, {} reused | masters: {}",
        report.rows_loaded,
        report.fragments_synthesized,
        report.fragments_reused,
        report.masters.len()
    );
    for (row, segment) in &report.failed_segments {
        println!("  row {} segment {}: synthesis failed", row, segment);
    }
    for row in &report.empty_rows {
        println!("  row {}: no fragments, master skipped", row);
    }
    for failure in &report.row_failures {
        println!("  row {}: {}", failure.row_number, failure.message);
    }
    for warning in &report.warnings {
        println!("  row {} (sheet row {}): {}", warning.row_number, warning.sheet_row, warning.message);
    }
    if report.selection_skipped {
        println!("Pause selection was closed; no master files were written.");
    }
}
