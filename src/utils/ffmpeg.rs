//! Модуль для работы с FFmpeg
//!
//! FFmpeg нужен только для кодирования mp3 и ogg; формат pcm пишется напрямую.

use std::process::Command;

use crate::error::{Result, StimuliError};

/// Проверка наличия FFmpeg
pub fn check_ffmpeg_installed() -> bool {
    Command::new("ffmpeg")
        .arg("-version")
        .output()
        .map(|output| output.status.success())
        .unwrap_or(false)
}

/// Запуск команды FFmpeg
pub fn run_ffmpeg_command(args: &[&str]) -> Result<()> {
    log::debug!("Running ffmpeg {}", args.join(" "));
    let output = Command::new("ffmpeg").args(args).output().map_err(|e| {
        StimuliError::AudioProcessing(format!("Failed to start ffmpeg (is it installed?): {}", e))
    })?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(StimuliError::AudioProcessing(format!(
            "FFmpeg command failed with status {}: {}",
            output.status,
            stderr.trim()
        )));
    }

    Ok(())
}
