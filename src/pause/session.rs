//! Постраничный выбор пауз
//!
//! Сессия хранит только состояние выбора: текущую страницу и выбор по
//! каждой строке. Переходы: `next`, `previous`, `select`, `confirm`.
//! Сессия сериализуема и не зависит от интерфейса.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::PauseChoice;
use crate::error::{Result, StimuliError};

/// Подпись варианта без паузы
pub const NO_PAUSE_LABEL: &str = "No Pause";
/// Разделитель текстов соседних фрагментов в подписи границы
pub const LABEL_SEPARATOR: &str = " -> ";

/// Строка, доступная для выбора паузы
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionRow {
    pub row_number: usize,
    /// Номер строки в исходной таблице
    pub sheet_row: usize,
    /// Тексты фрагментов строки по порядку
    pub fragment_texts: Vec<String>,
}

impl SessionRow {
    /// Варианты выбора: "No Pause" и по одному на каждую пару соседних фрагментов
    pub fn options(&self) -> Vec<PauseOption> {
        let mut options = vec![PauseOption {
            label: NO_PAUSE_LABEL.to_string(),
            choice: PauseChoice::NoPause,
        }];
        options.extend(self.fragment_texts.windows(2).enumerate().map(|(i, pair)| PauseOption {
            label: format!("{}{}{}", pair[0], LABEL_SEPARATOR, pair[1]),
            choice: PauseChoice::Boundary { after: i + 1 },
        }));
        options
    }

    fn accepts(&self, choice: PauseChoice) -> bool {
        match choice {
            PauseChoice::NoPause => true,
            PauseChoice::Boundary { after } => after >= 1 && after < self.fragment_texts.len(),
        }
    }
}

/// Вариант выбора паузы
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PauseOption {
    pub label: String,
    pub choice: PauseChoice,
}

/// Строка на отображаемой странице
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RowView {
    pub row_number: usize,
    pub title: String,
    pub options: Vec<PauseOption>,
    pub selected: PauseChoice,
}

/// Отображаемая страница
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PageView {
    /// Номер страницы (с 0)
    pub page: usize,
    pub page_count: usize,
    pub rows: Vec<RowView>,
    pub has_previous: bool,
    pub has_next: bool,
}

/// Сессия выбора пауз
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PausePlacementSession {
    current_page: usize,
    page_size: usize,
    rows: Vec<SessionRow>,
    selections: BTreeMap<usize, PauseChoice>,
}

impl PausePlacementSession {
    /// Создать сессию; размер страницы должен быть положительным
    pub fn new(rows: Vec<SessionRow>, page_size: usize) -> Result<Self> {
        if page_size == 0 {
            return Err(StimuliError::Configuration(
                "rows per page must be at least 1".to_string(),
            ));
        }
        Ok(Self {
            current_page: 0,
            page_size,
            rows,
            selections: BTreeMap::new(),
        })
    }

    pub fn total_rows(&self) -> usize {
        self.rows.len()
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    /// Количество страниц: `ceil(total_rows / page_size)`
    pub fn page_count(&self) -> usize {
        self.rows.len().div_ceil(self.page_size)
    }

    pub fn current_page(&self) -> usize {
        self.current_page
    }

    pub fn has_next(&self) -> bool {
        self.current_page + 1 < self.page_count()
    }

    pub fn has_previous(&self) -> bool {
        self.current_page > 0
    }

    /// Перейти на следующую страницу; на последней странице ничего не делает
    pub fn next(&mut self) -> bool {
        if !self.has_next() {
            return false;
        }
        self.current_page += 1;
        true
    }

    /// Перейти на предыдущую страницу; на первой странице ничего не делает
    pub fn previous(&mut self) -> bool {
        if !self.has_previous() {
            return false;
        }
        self.current_page -= 1;
        true
    }

    /// Построить текущую страницу; строки без выбора получают "No Pause"
    pub fn render(&mut self) -> PageView {
        let start = (self.current_page * self.page_size).min(self.rows.len());
        let end = (start + self.page_size).min(self.rows.len());

        let mut views = Vec::with_capacity(end - start);
        for row in &self.rows[start..end] {
            let selected = *self.selections.entry(row.row_number).or_insert(PauseChoice::NoPause);
            views.push(RowView {
                row_number: row.row_number,
                title: format!("Sentence #{} (Row {})", row.row_number, row.sheet_row),
                options: row.options(),
                selected,
            });
        }

        PageView {
            page: self.current_page,
            page_count: self.page_count(),
            rows: views,
            has_previous: self.has_previous(),
            has_next: self.has_next(),
        }
    }

    /// Выбрать паузу для строки
    pub fn select(&mut self, row_number: usize, choice: PauseChoice) -> Result<()> {
        let row = self.row(row_number)?;
        if !row.accepts(choice) {
            return Err(StimuliError::Selection(format!(
                "Row {} has {} fragments; boundary {:?} does not exist",
                row_number,
                row.fragment_texts.len(),
                choice
            )));
        }
        self.selections.insert(row_number, choice);
        Ok(())
    }

    /// Выбрать паузу по подписи варианта
    ///
    /// Если у двух границ строки одинаковые подписи (повторяющийся текст
    /// фрагментов), выбирается первая подходящая граница.
    pub fn select_label(&mut self, row_number: usize, label: &str) -> Result<PauseChoice> {
        let choice = self
            .row(row_number)?
            .options()
            .into_iter()
            .find(|option| option.label == label)
            .map(|option| option.choice)
            .ok_or_else(|| {
                StimuliError::Selection(format!("Row {} has no option labeled '{}'", row_number, label))
            })?;
        self.selections.insert(row_number, choice);
        Ok(choice)
    }

    /// Текущий выбор для строки (None, если строка еще не отображалась и не выбиралась)
    pub fn selection(&self, row_number: usize) -> Option<PauseChoice> {
        self.selections.get(&row_number).copied()
    }

    /// Завершить выбор; строки без выбора получают "No Pause"
    pub fn confirm(self) -> ConfirmedSelections {
        let mut choices = self.selections;
        for row in &self.rows {
            choices.entry(row.row_number).or_insert(PauseChoice::NoPause);
        }
        ConfirmedSelections { choices }
    }

    fn row(&self, row_number: usize) -> Result<&SessionRow> {
        self.rows
            .iter()
            .find(|row| row.row_number == row_number)
            .ok_or_else(|| StimuliError::Selection(format!("Row {} is not part of this session", row_number)))
    }
}

/// Зафиксированный выбор пауз
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfirmedSelections {
    choices: BTreeMap<usize, PauseChoice>,
}

impl ConfirmedSelections {
    /// Выбор для строки ("No Pause" для неизвестных строк)
    pub fn choice_for(&self, row_number: usize) -> PauseChoice {
        self.choices.get(&row_number).copied().unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.choices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.choices.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rows(count: usize) -> Vec<SessionRow> {
        (1..=count)
            .map(|n| SessionRow {
                row_number: n,
                sheet_row: n + 1,
                fragment_texts: vec!["A".to_string(), "B".to_string(), "C".to_string()],
            })
            .collect()
    }

    #[test]
    fn test_page_count_is_ceiling() {
        assert_eq!(PausePlacementSession::new(rows(25), 10).unwrap().page_count(), 3);
        assert_eq!(PausePlacementSession::new(rows(20), 10).unwrap().page_count(), 2);
        assert_eq!(PausePlacementSession::new(rows(1), 10).unwrap().page_count(), 1);
        assert_eq!(PausePlacementSession::new(rows(0), 10).unwrap().page_count(), 0);
        assert!(PausePlacementSession::new(rows(3), 0).is_err());
    }

    #[test]
    fn test_navigation_edges_are_noops() {
        let mut session = PausePlacementSession::new(rows(15), 10).unwrap();
        assert!(!session.previous());
        assert_eq!(session.current_page(), 0);
        assert!(session.next());
        assert_eq!(session.current_page(), 1);
        assert!(!session.next());
        assert_eq!(session.current_page(), 1);
        assert!(session.previous());
        assert_eq!(session.current_page(), 0);
    }

    #[test]
    fn test_render_initializes_no_pause_and_labels() {
        let mut session = PausePlacementSession::new(rows(3), 2).unwrap();
        assert_eq!(session.selection(1), None);

        let page = session.render();
        assert_eq!(page.rows.len(), 2);
        assert!(page.has_next && !page.has_previous);
        assert_eq!(page.rows[0].title, "Sentence #1 (Row 2)");
        let labels: Vec<&str> = page.rows[0].options.iter().map(|o| o.label.as_str()).collect();
        assert_eq!(labels, vec!["No Pause", "A -> B", "B -> C"]);
        assert_eq!(session.selection(1), Some(PauseChoice::NoPause));
        assert_eq!(session.selection(3), None);
    }

    #[test]
    fn test_selection_survives_page_changes() {
        let mut session = PausePlacementSession::new(rows(4), 2).unwrap();
        session.render();
        session.select(2, PauseChoice::Boundary { after: 2 }).unwrap();
        session.next();
        session.render();
        session.previous();
        let page = session.render();
        assert_eq!(page.rows[1].selected, PauseChoice::Boundary { after: 2 });
    }

    #[test]
    fn test_confirm_covers_every_row() {
        let mut session = PausePlacementSession::new(rows(5), 2).unwrap();
        session.select(5, PauseChoice::Boundary { after: 1 }).unwrap();
        let confirmed = session.confirm();
        assert_eq!(confirmed.len(), 5);
        assert_eq!(confirmed.choice_for(1), PauseChoice::NoPause);
        assert_eq!(confirmed.choice_for(5), PauseChoice::Boundary { after: 1 });
    }

    #[test]
    fn test_select_validates_boundary_and_row() {
        let mut session = PausePlacementSession::new(rows(2), 2).unwrap();
        assert!(session.select(1, PauseChoice::Boundary { after: 3 }).is_err());
        assert!(session.select(1, PauseChoice::Boundary { after: 0 }).is_err());
        assert!(session.select(9, PauseChoice::NoPause).is_err());
    }

    #[test]
    fn test_duplicate_labels_pick_first_boundary() {
        let row = SessionRow {
            row_number: 1,
            sheet_row: 2,
            fragment_texts: ["go", "go", "go"].iter().map(|s| s.to_string()).collect(),
        };
        let mut session = PausePlacementSession::new(vec![row], 10).unwrap();
        let choice = session.select_label(1, "go -> go").unwrap();
        assert_eq!(choice, PauseChoice::Boundary { after: 1 });

        // Выбор по индексу различает одинаковые подписи
        session.select(1, PauseChoice::Boundary { after: 2 }).unwrap();
        assert_eq!(session.selection(1), Some(PauseChoice::Boundary { after: 2 }));
    }

    #[test]
    fn test_session_round_trips_through_json() {
        let mut session = PausePlacementSession::new(rows(3), 2).unwrap();
        session.next();
        session.select(3, PauseChoice::Boundary { after: 1 }).unwrap();

        let json = serde_json::to_string(&session).unwrap();
        let restored: PausePlacementSession = serde_json::from_str(&json).unwrap();
        assert_eq!(restored.current_page(), 1);
        assert_eq!(restored.selection(3), Some(PauseChoice::Boundary { after: 1 }));
    }
}
