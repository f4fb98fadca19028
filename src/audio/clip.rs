//! Аудиоклип в памяти
//!
//! Семплы хранятся чередующимися по каналам (f32, диапазон [-1.0, 1.0]).
//! Позиции задаются в миллисекундах и переводятся в кадры как
//! `ms * sample_rate / 1000` с отбрасыванием дробной части.

use crate::error::{Result, StimuliError};

/// Аудиоклип
#[derive(Debug, Clone, PartialEq)]
pub struct AudioClip {
    samples: Vec<f32>,
    sample_rate: u32,
    channels: u16,
}

impl AudioClip {
    /// Создать клип из чередующихся семплов
    pub fn new(samples: Vec<f32>, sample_rate: u32, channels: u16) -> Self {
        let channels = channels.max(1);
        debug_assert!(samples.len() % channels as usize == 0);
        Self {
            samples,
            sample_rate,
            channels,
        }
    }

    /// Пустой клип
    pub fn empty(sample_rate: u32, channels: u16) -> Self {
        Self::new(Vec::new(), sample_rate, channels)
    }

    /// Тишина заданной длительности
    pub fn silent(duration_ms: u32, sample_rate: u32, channels: u16) -> Self {
        let frames = frames_for_ms(duration_ms as u64, sample_rate);
        Self::new(vec![0.0; frames * channels.max(1) as usize], sample_rate, channels)
    }

    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn channels(&self) -> u16 {
        self.channels
    }

    /// Количество кадров (семплов на канал)
    pub fn frames(&self) -> usize {
        self.samples.len() / self.channels as usize
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Длительность в миллисекундах (округленная)
    pub fn duration_ms(&self) -> u64 {
        if self.sample_rate == 0 {
            return 0;
        }
        ((self.frames() as f64 * 1000.0) / self.sample_rate as f64).round() as u64
    }

    /// Номер кадра, соответствующий позиции в миллисекундах
    pub fn frame_at_ms(&self, ms: u64) -> usize {
        frames_for_ms(ms, self.sample_rate).min(self.frames())
    }

    /// Подклип `[start_ms, end_ms)`
    pub fn slice_ms(&self, start_ms: u64, end_ms: u64) -> AudioClip {
        let start = self.frame_at_ms(start_ms);
        let end = self.frame_at_ms(end_ms).max(start);
        self.slice_frames(start, end)
    }

    /// Подклип по кадрам `[start, end)`
    pub fn slice_frames(&self, start: usize, end: usize) -> AudioClip {
        let channels = self.channels as usize;
        let end = end.min(self.frames());
        let start = start.min(end);
        AudioClip::new(
            self.samples[start * channels..end * channels].to_vec(),
            self.sample_rate,
            self.channels,
        )
    }

    /// Добавить другой клип в конец
    pub fn append(&mut self, other: &AudioClip) -> Result<()> {
        if other.sample_rate != self.sample_rate || other.channels != self.channels {
            return Err(StimuliError::AudioProcessing(format!(
                "Cannot join clips with different layouts: {} Hz/{} ch vs {} Hz/{} ch",
                self.sample_rate, self.channels, other.sample_rate, other.channels
            )));
        }
        self.samples.extend_from_slice(&other.samples);
        Ok(())
    }

    /// Среднеквадратичное значение всех семплов
    pub fn rms(&self) -> f32 {
        compute_rms(&self.samples)
    }
}

/// Кадры для длительности в миллисекундах
pub fn frames_for_ms(ms: u64, sample_rate: u32) -> usize {
    (ms * sample_rate as u64 / 1000) as usize
}

/// Среднеквадратичное значение (RMS) для массива семплов
pub fn compute_rms(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }

    let sum_squares: f64 = samples.iter().map(|&s| (s as f64) * (s as f64)).sum();
    (sum_squares / samples.len() as f64).sqrt() as f32
}

/// Перевод уровня в dBFS в линейную амплитуду
pub fn db_to_amplitude(db: f32) -> f32 {
    10f32.powf(db / 20.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_silent_clip_length() {
        let clip = AudioClip::silent(500, 16000, 1);
        assert_eq!(clip.frames(), 8000);
        assert_eq!(clip.duration_ms(), 500);
        assert_eq!(clip.rms(), 0.0);
    }

    #[test]
    fn test_slice_ms_stereo() {
        let samples: Vec<f32> = (0..2000).map(|i| i as f32 / 2000.0).collect();
        let clip = AudioClip::new(samples, 1000, 2);
        let part = clip.slice_ms(10, 20);
        assert_eq!(part.frames(), 10);
        assert_eq!(part.samples()[0], clip.samples()[20]);
        assert_eq!(clip.slice_ms(900, 5000).frames(), 100);
        assert!(clip.slice_ms(50, 10).is_empty());
    }

    #[test]
    fn test_append_rejects_layout_mismatch() {
        let mut a = AudioClip::silent(10, 16000, 1);
        let b = AudioClip::silent(10, 22050, 1);
        assert!(a.append(&b).is_err());
        let c = AudioClip::silent(10, 16000, 1);
        a.append(&c).unwrap();
        assert_eq!(a.duration_ms(), 20);
    }

    #[test]
    fn test_compute_rms() {
        let samples = vec![0.0, 0.5, -0.5, 1.0, -1.0];
        assert!((compute_rms(&samples) - 0.7071).abs() < 0.0001);
        assert_eq!(compute_rms(&[]), 0.0);
    }

    #[test]
    fn test_db_to_amplitude() {
        assert!((db_to_amplitude(0.0) - 1.0).abs() < 1e-6);
        assert!((db_to_amplitude(-20.0) - 0.1).abs() < 1e-6);
    }
}
