//! Выбор пауз без интерактивного интерфейса

use std::collections::BTreeMap;
use std::path::Path;

use super::{ConfirmedSelections, PauseChoice, PausePlacementSession, PauseSelector};
use crate::error::{Result, StimuliError};

/// Подтверждает сессию сразу: все строки без паузы
#[derive(Debug, Default)]
pub struct NoPauseSelector;

impl PauseSelector for NoPauseSelector {
    fn run(&mut self, session: PausePlacementSession) -> Result<Option<ConfirmedSelections>> {
        Ok(Some(session.confirm()))
    }
}

/// Применяет заранее заданный выбор и подтверждает сессию
#[derive(Debug, Clone, Default)]
pub struct PresetSelector {
    choices: BTreeMap<usize, PauseChoice>,
}

impl PresetSelector {
    pub fn new(choices: BTreeMap<usize, PauseChoice>) -> Self {
        Self { choices }
    }

    /// Загрузить выбор из JSON файла вида `{"3": 1, "4": null}`
    ///
    /// Ключ: номер строки, значение: позиция фрагмента, после которого
    /// вставляется пауза, либо `null` для строки без паузы.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| StimuliError::filesystem(path, e))?;
        let parsed: BTreeMap<String, Option<usize>> = serde_json::from_str(&raw)?;

        let mut choices = BTreeMap::new();
        for (key, after) in parsed {
            let row_number = key.trim().parse::<usize>().map_err(|_| {
                StimuliError::Configuration(format!("Invalid row number '{}' in {}", key, path.display()))
            })?;
            let choice = match after {
                Some(after) => PauseChoice::Boundary { after },
                None => PauseChoice::NoPause,
            };
            choices.insert(row_number, choice);
        }

        Ok(Self { choices })
    }
}

impl PauseSelector for PresetSelector {
    fn run(&mut self, mut session: PausePlacementSession) -> Result<Option<ConfirmedSelections>> {
        for (&row_number, &choice) in &self.choices {
            if let Err(e) = session.select(row_number, choice) {
                log::warn!("Ignoring preset pause for row {}: {}", row_number, e);
            }
        }
        Ok(Some(session.confirm()))
    }
}
