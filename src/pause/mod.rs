//! Модуль выбора пауз
//!
//! Оператор выбирает для каждой строки не более одной границы между
//! соседними фрагментами, на которой будет вставлена пауза.

pub mod preset;
pub mod session;
pub mod terminal;

use serde::{Deserialize, Serialize};

use crate::error::Result;

pub use preset::{NoPauseSelector, PresetSelector};
pub use session::{ConfirmedSelections, PageView, PausePlacementSession, SessionRow};
pub use terminal::TerminalSelector;

/// Выбор паузы для строки
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PauseChoice {
    /// Без паузы
    #[default]
    NoPause,
    /// Пауза между фрагментами `after` и `after + 1` (позиции с 1)
    Boundary { after: usize },
}

/// Способ провести сессию выбора пауз до подтверждения
pub trait PauseSelector {
    /// Провести сессию; `None` означает выход без генерации мастер-файлов
    fn run(&mut self, session: PausePlacementSession) -> Result<Option<ConfirmedSelections>>;
}
