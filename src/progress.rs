//! Модуль для отслеживания прогресса запуска
//!
//! Наблюдатели получают `ProgressInfo` при каждом изменении этапа или
//! прогресса внутри этапа. Общий прогресс считается по весам этапов.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, RwLock};

use serde::{Deserialize, Serialize};

/// Информация о прогрессе выполнения
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressInfo {
    /// Текущий этап
    pub step: String,
    /// Процент выполнения текущего этапа (0.0 - 100.0)
    pub step_progress: f32,
    /// Общий процент выполнения (0.0 - 100.0)
    pub total_progress: f32,
    /// Дополнительная информация о текущем этапе
    pub details: Option<String>,
}

impl ProgressInfo {
    pub fn new(step: impl Into<String>, step_progress: f32, total_progress: f32, details: Option<String>) -> Self {
        Self {
            step: step.into(),
            step_progress: step_progress.clamp(0.0, 100.0),
            total_progress: total_progress.clamp(0.0, 100.0),
            details,
        }
    }
}

/// Наблюдатель, получающий уведомления о прогрессе
pub trait ProgressObserver: Send + Sync {
    fn on_progress_update(&self, progress: ProgressInfo);
}

/// Объект, рассылающий уведомления о прогрессе
pub trait ProgressReporter: Send + Sync {
    /// Добавить наблюдателя, вернуть его идентификатор
    fn add_observer(&mut self, observer: Box<dyn ProgressObserver>) -> usize;

    /// Удалить наблюдателя по идентификатору
    fn remove_observer(&mut self, id: usize) -> Option<Box<dyn ProgressObserver>>;

    /// Уведомить всех наблюдателей
    fn notify_progress(&self, progress: ProgressInfo);
}

/// Синхронная рассылка по списку наблюдателей
pub struct DefaultProgressReporter {
    observers: RwLock<HashMap<usize, Box<dyn ProgressObserver>>>,
    next_id: AtomicUsize,
}

impl DefaultProgressReporter {
    pub fn new() -> Self {
        Self {
            observers: RwLock::new(HashMap::new()),
            next_id: AtomicUsize::new(0),
        }
    }
}

impl Default for DefaultProgressReporter {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressReporter for DefaultProgressReporter {
    fn add_observer(&mut self, observer: Box<dyn ProgressObserver>) -> usize {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        self.observers
            .get_mut()
            .unwrap_or_else(|e| e.into_inner())
            .insert(id, observer);
        id
    }

    fn remove_observer(&mut self, id: usize) -> Option<Box<dyn ProgressObserver>> {
        self.observers
            .get_mut()
            .unwrap_or_else(|e| e.into_inner())
            .remove(&id)
    }

    fn notify_progress(&self, progress: ProgressInfo) {
        let observers = self.observers.read().unwrap_or_else(|e| e.into_inner());
        for observer in observers.values() {
            observer.on_progress_update(progress.clone());
        }
    }
}

/// Этапы запуска
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProcessStep {
    /// Чтение строк из таблицы
    RowLoading,
    /// Синтез фрагментов
    FragmentSynthesis,
    /// Выбор пауз
    PauseSelection,
    /// Сборка и запись мастер-файлов
    MasterAssembly,
}

impl ProcessStep {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::RowLoading => "Loading rows",
            Self::FragmentSynthesis => "Synthesizing fragments",
            Self::PauseSelection => "Selecting pauses",
            Self::MasterAssembly => "Writing master files",
        }
    }

    /// Вес этапа в общем прогрессе (в процентах)
    pub fn weight(&self) -> f32 {
        match self {
            Self::RowLoading => 5.0,
            Self::FragmentSynthesis => 70.0,
            Self::PauseSelection => 5.0,
            Self::MasterAssembly => 20.0,
        }
    }
}

struct TrackerState {
    current_step: ProcessStep,
    step_progress: f32,
    total_progress: f32,
    completed_steps: HashMap<ProcessStep, f32>,
}

impl TrackerState {
    fn recompute_total(&mut self) {
        let mut total = 0.0;
        let mut total_weight = 0.0;
        for (step, progress) in &self.completed_steps {
            if *step != self.current_step {
                total += step.weight() * progress / 100.0;
                total_weight += step.weight();
            }
        }
        total += self.current_step.weight() * self.step_progress / 100.0;
        total_weight += self.current_step.weight();
        self.total_progress = (total / total_weight * 100.0).clamp(0.0, 100.0);
    }
}

/// Трекер прогресса запуска
pub struct ProgressTracker {
    reporter: Option<Box<dyn ProgressReporter>>,
    state: Mutex<TrackerState>,
}

impl ProgressTracker {
    pub fn new() -> Self {
        Self {
            reporter: None,
            state: Mutex::new(TrackerState {
                current_step: ProcessStep::RowLoading,
                step_progress: 0.0,
                total_progress: 0.0,
                completed_steps: HashMap::new(),
            }),
        }
    }

    pub fn with_reporter(reporter: Box<dyn ProgressReporter>) -> Self {
        let mut tracker = Self::new();
        tracker.reporter = Some(reporter);
        tracker
    }

    pub fn set_reporter(&mut self, reporter: Box<dyn ProgressReporter>) {
        self.reporter = Some(reporter);
    }

    /// Добавить наблюдателя; без репортера создается `DefaultProgressReporter`
    pub fn add_observer(&mut self, observer: Box<dyn ProgressObserver>) -> usize {
        self.reporter
            .get_or_insert_with(|| Box::new(DefaultProgressReporter::new()))
            .add_observer(observer)
    }

    fn state(&self) -> MutexGuard<'_, TrackerState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Перейти к этапу; предыдущий этап считается завершенным
    pub fn set_step(&self, step: ProcessStep) {
        let mut state = self.state();
        if state.current_step == step {
            return;
        }
        let previous = state.current_step;
        state.completed_steps.insert(previous, 100.0);
        state.current_step = step;
        state.step_progress = 0.0;
        state.recompute_total();
        self.report(&state, None);
    }

    /// Обновить прогресс текущего этапа
    pub fn update_step_progress(&self, progress: f32, details: Option<String>) {
        let mut state = self.state();
        state.step_progress = progress.clamp(0.0, 100.0);
        state.recompute_total();
        self.report(&state, details);
    }

    /// Отметить завершение запуска
    pub fn complete(&self) {
        let mut state = self.state();
        let current = state.current_step;
        state.completed_steps.insert(current, 100.0);
        state.step_progress = 100.0;
        state.total_progress = 100.0;
        self.report(&state, Some("Done".to_string()));
    }

    pub fn total_progress(&self) -> f32 {
        self.state().total_progress
    }

    fn report(&self, state: &TrackerState, details: Option<String>) {
        if let Some(reporter) = &self.reporter {
            reporter.notify_progress(ProgressInfo::new(
                state.current_step.as_str(),
                state.step_progress,
                state.total_progress,
                details,
            ));
        }
    }
}

impl Default for ProgressTracker {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    struct TestObserver {
        updates: Arc<Mutex<Vec<ProgressInfo>>>,
    }

    impl ProgressObserver for TestObserver {
        fn on_progress_update(&self, progress: ProgressInfo) {
            self.updates.lock().unwrap().push(progress);
        }
    }

    fn tracker() -> (ProgressTracker, Arc<Mutex<Vec<ProgressInfo>>>) {
        let updates = Arc::new(Mutex::new(Vec::new()));
        let mut tracker = ProgressTracker::new();
        tracker.add_observer(Box::new(TestObserver {
            updates: updates.clone(),
        }));
        (tracker, updates)
    }

    #[test]
    fn test_step_progress_is_weighted() {
        let (tracker, updates) = tracker();
        tracker.update_step_progress(50.0, None);
        tracker.set_step(ProcessStep::FragmentSynthesis);
        tracker.update_step_progress(50.0, Some("row 1".to_string()));

        let updates = updates.lock().unwrap();
        assert_eq!(updates.len(), 3);
        assert_eq!(updates[0].step, ProcessStep::RowLoading.as_str());
        assert_eq!(updates[0].total_progress, 50.0);
        // Загрузка завершена (5) + половина синтеза (35) из 75
        let expected = (5.0 + 35.0) / 75.0 * 100.0;
        assert!((updates[2].total_progress - expected).abs() < 0.01);
        assert_eq!(updates[2].details.as_deref(), Some("row 1"));
    }

    #[test]
    fn test_same_step_is_not_reported_twice() {
        let (tracker, updates) = tracker();
        tracker.set_step(ProcessStep::RowLoading);
        assert!(updates.lock().unwrap().is_empty());
    }

    #[test]
    fn test_complete() {
        let (tracker, updates) = tracker();
        tracker.set_step(ProcessStep::MasterAssembly);
        tracker.complete();
        assert_eq!(tracker.total_progress(), 100.0);
        assert_eq!(updates.lock().unwrap().last().unwrap().total_progress, 100.0);
    }
}
