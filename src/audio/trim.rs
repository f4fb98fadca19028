//! Обрезка тишины в начале и в конце фрагмента
//!
//! Поиск тишины идет окном длиной `min_silence_len_ms` с шагом 1 мс: окно
//! считается тихим, если его RMS не превышает порог. Соседние тихие окна
//! сливаются в интервалы тишины, остальное считается речью.

use super::clip::{db_to_amplitude, AudioClip};
use crate::config::TrimSettings;

/// Шаг поиска тишины (мс)
const SEEK_STEP_MS: u64 = 1;

/// Результат обрезки
#[derive(Debug, Clone, PartialEq)]
pub enum TrimOutcome {
    /// Клип не изменился (речь не найдена или занимает весь клип)
    Unchanged,
    /// Обрезанный клип и окно `[start_ms, end_ms)` исходного клипа
    Trimmed {
        clip: AudioClip,
        start_ms: u64,
        end_ms: u64,
    },
}

impl TrimOutcome {
    /// Итоговый клип с учетом исходного
    pub fn into_clip(self, original: AudioClip) -> AudioClip {
        match self {
            TrimOutcome::Unchanged => original,
            TrimOutcome::Trimmed { clip, .. } => clip,
        }
    }
}

/// Обрезка тишины
#[derive(Debug, Clone, Copy)]
pub struct SilenceTrimmer {
    settings: TrimSettings,
}

impl SilenceTrimmer {
    pub fn new(settings: TrimSettings) -> Self {
        Self { settings }
    }

    /// Обрезать тишину по краям клипа
    pub fn trim(&self, clip: &AudioClip) -> TrimOutcome {
        let nonsilent = detect_nonsilent(
            clip,
            self.settings.min_silence_len_ms as u64,
            self.settings.silence_thresh_db,
        );

        let (first, last) = match (nonsilent.first(), nonsilent.last()) {
            (Some(first), Some(last)) => (*first, *last),
            _ => {
                log::debug!("No speech above {} dBFS; fragment kept as is", self.settings.silence_thresh_db);
                return TrimOutcome::Unchanged;
            }
        };

        let length = clip.duration_ms();
        let padding = self.settings.padding_ms as u64;
        let start_ms = first.0.saturating_sub(padding);
        let end_ms = (last.1 + padding).min(length);

        if start_ms == 0 && end_ms == length {
            return TrimOutcome::Unchanged;
        }

        TrimOutcome::Trimmed {
            clip: clip.slice_ms(start_ms, end_ms),
            start_ms,
            end_ms,
        }
    }
}

/// Интервалы тишины `[start_ms, end_ms)`
pub fn detect_silence(clip: &AudioClip, min_silence_len_ms: u64, silence_thresh_db: f32) -> Vec<(u64, u64)> {
    let seg_len = clip.duration_ms();
    if seg_len < min_silence_len_ms {
        return Vec::new();
    }

    let threshold = db_to_amplitude(silence_thresh_db) as f64;
    let energy = EnergyIndex::new(clip);

    let last_slice_start = seg_len - min_silence_len_ms;
    let mut slice_starts: Vec<u64> = (0..=last_slice_start).step_by(SEEK_STEP_MS as usize).collect();
    if last_slice_start % SEEK_STEP_MS != 0 {
        slice_starts.push(last_slice_start);
    }

    let silence_starts: Vec<u64> = slice_starts
        .into_iter()
        .filter(|&start| {
            let from = clip.frame_at_ms(start);
            let to = clip.frame_at_ms(start + min_silence_len_ms);
            energy.rms(from, to) <= threshold
        })
        .collect();

    let mut starts = silence_starts.into_iter();
    let mut prev = match starts.next() {
        Some(first) => first,
        None => return Vec::new(),
    };

    let mut ranges = Vec::new();
    let mut range_start = prev;
    for start in starts {
        let continuous = start == prev + SEEK_STEP_MS;
        let has_gap = start > prev + min_silence_len_ms;
        if !continuous && has_gap {
            ranges.push((range_start, prev + min_silence_len_ms));
            range_start = start;
        }
        prev = start;
    }
    ranges.push((range_start, prev + min_silence_len_ms));
    ranges
}

/// Интервалы речи `[start_ms, end_ms)`
pub fn detect_nonsilent(clip: &AudioClip, min_silence_len_ms: u64, silence_thresh_db: f32) -> Vec<(u64, u64)> {
    let silent = detect_silence(clip, min_silence_len_ms, silence_thresh_db);
    let seg_len = clip.duration_ms();

    if silent.is_empty() {
        return vec![(0, seg_len)];
    }
    if silent[0] == (0, seg_len) {
        return Vec::new();
    }

    let mut ranges = Vec::new();
    let mut prev_end = 0;
    for &(start, end) in &silent {
        ranges.push((prev_end, start));
        prev_end = end;
    }
    if prev_end != seg_len {
        ranges.push((prev_end, seg_len));
    }
    if ranges.first() == Some(&(0, 0)) {
        ranges.remove(0);
    }
    ranges
}

/// Префиксные суммы квадратов по кадрам для RMS окна за O(1)
struct EnergyIndex {
    prefix: Vec<f64>,
    channels: usize,
}

impl EnergyIndex {
    fn new(clip: &AudioClip) -> Self {
        let channels = clip.channels() as usize;
        let mut prefix = Vec::with_capacity(clip.frames() + 1);
        prefix.push(0.0);
        let mut acc = 0.0f64;
        for frame in clip.samples().chunks(channels) {
            acc += frame.iter().map(|&s| (s as f64) * (s as f64)).sum::<f64>();
            prefix.push(acc);
        }
        Self { prefix, channels }
    }

    fn rms(&self, from: usize, to: usize) -> f64 {
        if to <= from {
            return 0.0;
        }
        let sum = (self.prefix[to] - self.prefix[from]).max(0.0);
        (sum / ((to - from) * self.channels) as f64).sqrt()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RATE: u32 = 16000;

    /// Тишина, затем постоянный сигнал, затем снова тишина
    fn speech_clip(lead_ms: u32, speech_ms: u32, tail_ms: u32) -> AudioClip {
        let frames = |ms: u32| (ms as usize) * RATE as usize / 1000;
        let mut samples = vec![0.0; frames(lead_ms)];
        samples.extend(std::iter::repeat(0.5).take(frames(speech_ms)));
        samples.extend(std::iter::repeat(0.0).take(frames(tail_ms)));
        AudioClip::new(samples, RATE, 1)
    }

    fn trimmer(padding_ms: u32) -> SilenceTrimmer {
        SilenceTrimmer::new(TrimSettings {
            silence_thresh_db: -48.0,
            min_silence_len_ms: 40,
            padding_ms,
        })
    }

    #[test]
    fn test_detect_nonsilent_span() {
        let clip = speech_clip(200, 300, 200);
        assert_eq!(detect_silence(&clip, 40, -48.0), vec![(0, 200), (500, 700)]);
        assert_eq!(detect_nonsilent(&clip, 40, -48.0), vec![(200, 500)]);
    }

    #[test]
    fn test_trim_exact_window() {
        let clip = speech_clip(200, 300, 200);
        match trimmer(0).trim(&clip) {
            TrimOutcome::Trimmed { clip: trimmed, start_ms, end_ms } => {
                assert_eq!((start_ms, end_ms), (200, 500));
                assert_eq!(trimmed, clip.slice_ms(200, 500));
                assert_eq!(trimmed.duration_ms(), 300);
            }
            other => panic!("expected trimmed clip, got {:?}", other),
        }
    }

    #[test]
    fn test_trim_padding_clamped_to_bounds() {
        let clip = speech_clip(20, 300, 200);
        match trimmer(50).trim(&clip) {
            TrimOutcome::Trimmed { start_ms, end_ms, clip: trimmed } => {
                // Начальная тишина короче окна, поэтому речь начинается с 0
                assert_eq!(start_ms, 0);
                assert_eq!(end_ms, 370);
                assert_eq!(trimmed, clip.slice_ms(0, 370));
            }
            other => panic!("expected trimmed clip, got {:?}", other),
        }
    }

    #[test]
    fn test_fully_silent_clip_is_unchanged() {
        let clip = AudioClip::silent(800, RATE, 1);
        assert!(detect_nonsilent(&clip, 40, -48.0).is_empty());
        assert_eq!(trimmer(0).trim(&clip), TrimOutcome::Unchanged);
    }

    #[test]
    fn test_near_silent_clip_is_unchanged() {
        // Равномерный шум ниже порога (-60 dBFS)
        let clip = AudioClip::new(vec![0.001; 16000], RATE, 1);
        let outcome = trimmer(5).trim(&clip);
        assert_eq!(outcome, TrimOutcome::Unchanged);
        assert_eq!(outcome.into_clip(clip.clone()), clip);
    }

    #[test]
    fn test_clip_shorter_than_window_is_all_speech() {
        let clip = AudioClip::silent(30, RATE, 1);
        assert_eq!(detect_nonsilent(&clip, 40, -48.0), vec![(0, 30)]);
        assert_eq!(trimmer(0).trim(&clip), TrimOutcome::Unchanged);
    }
}
