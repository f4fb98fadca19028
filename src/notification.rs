//! Наблюдатели прогресса
//!
//! Вывод в консоль построчно, прогресс-бар и запись истории в память.

use std::io::Write;
use std::sync::{Arc, Mutex};

use crate::progress::{ProgressInfo, ProgressObserver};

/// Построчный вывод прогресса в stderr
pub struct ConsoleProgressObserver {
    prefix: Option<String>,
}

impl ConsoleProgressObserver {
    pub fn new() -> Self {
        Self { prefix: None }
    }

    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        Self {
            prefix: Some(prefix.into()),
        }
    }

    fn format_line(&self, progress: &ProgressInfo) -> String {
        let mut line = format!(
            "{}[{:>5.1}%] {} ({:.0}%)",
            self.prefix.as_deref().unwrap_or(""),
            progress.total_progress,
            progress.step,
            progress.step_progress
        );
        if let Some(details) = progress.details.as_deref().filter(|d| !d.is_empty()) {
            line.push_str(": ");
            line.push_str(details);
        }
        line
    }
}

impl Default for ConsoleProgressObserver {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressObserver for ConsoleProgressObserver {
    fn on_progress_update(&self, progress: ProgressInfo) {
        eprintln!("{}", self.format_line(&progress));
    }
}

/// История обновлений в памяти
#[derive(Clone, Default)]
pub struct MemoryProgressObserver {
    history: Arc<Mutex<Vec<ProgressInfo>>>,
}

impl MemoryProgressObserver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn history(&self) -> Vec<ProgressInfo> {
        self.history.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn clear_history(&self) {
        self.history.lock().unwrap_or_else(|e| e.into_inner()).clear();
    }
}

impl ProgressObserver for MemoryProgressObserver {
    fn on_progress_update(&self, progress: ProgressInfo) {
        self.history
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(progress);
    }
}

/// Прогресс-бар в stderr, перерисовывается в одной строке
pub struct ProgressBarObserver {
    width: usize,
    last_progress: Mutex<f32>,
}

impl ProgressBarObserver {
    pub fn new(width: usize) -> Self {
        Self {
            width,
            // Отрицательное значение гарантирует первую отрисовку
            last_progress: Mutex::new(-1.0),
        }
    }

    fn render(&self, progress: &ProgressInfo) -> String {
        let filled = ((progress.total_progress / 100.0) * self.width as f32) as usize;
        let filled = filled.min(self.width);
        format!(
            "[{}{}] {:.1}% - {}",
            "=".repeat(filled),
            " ".repeat(self.width - filled),
            progress.total_progress,
            progress.step
        )
    }
}

impl Default for ProgressBarObserver {
    fn default() -> Self {
        Self::new(40)
    }
}

impl ProgressObserver for ProgressBarObserver {
    fn on_progress_update(&self, progress: ProgressInfo) {
        let mut last_progress = self.last_progress.lock().unwrap_or_else(|e| e.into_inner());

        // Перерисовка только при изменении хотя бы на 1%
        if (*last_progress - progress.total_progress).abs() < 1.0
            && *last_progress >= 0.0
            && progress.total_progress < 100.0
        {
            return;
        }
        *last_progress = progress.total_progress;

        let mut stderr = std::io::stderr();
        let _ = write!(stderr, "\r{}", self.render(&progress));
        if progress.total_progress >= 100.0 {
            let _ = writeln!(stderr);
        }
        let _ = stderr.flush();
    }
}
