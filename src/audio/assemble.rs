//! Сборка мастер-записи строки из фрагментов

use super::clip::AudioClip;
use crate::error::{Result, StimuliError};
use crate::pause::PauseChoice;

/// Склеивает фрагменты строки и вставляет паузу на выбранной границе
#[derive(Debug, Clone, Copy)]
pub struct AudioAssembler {
    pause_duration_ms: u32,
}

impl AudioAssembler {
    pub fn new(pause_duration_ms: u32) -> Self {
        Self { pause_duration_ms }
    }

    /// Собрать клипы строки в один
    ///
    /// Клипы добавляются по порядку. Для `PauseChoice::Boundary { after }`
    /// тишина вставляется сразу после клипа с позицией `after` (с 1).
    pub fn assemble(&self, clips: &[AudioClip], choice: PauseChoice) -> Result<AudioClip> {
        let first = clips
            .first()
            .ok_or_else(|| StimuliError::AudioProcessing("Row has no fragments to assemble".to_string()))?;

        if let PauseChoice::Boundary { after } = choice {
            if after == 0 || after >= clips.len() {
                return Err(StimuliError::Selection(format!(
                    "Pause boundary {} -> {} is outside a row of {} fragments",
                    after,
                    after + 1,
                    clips.len()
                )));
            }
        }

        let mut combined = AudioClip::empty(first.sample_rate(), first.channels());
        for (i, clip) in clips.iter().enumerate() {
            combined.append(clip)?;
            if choice == (PauseChoice::Boundary { after: i + 1 }) {
                let silence = AudioClip::silent(self.pause_duration_ms, first.sample_rate(), first.channels());
                combined.append(&silence)?;
            }
        }

        Ok(combined)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RATE: u32 = 16000;

    fn tone(ms: u32, level: f32) -> AudioClip {
        AudioClip::new(vec![level; ms as usize * RATE as usize / 1000], RATE, 1)
    }

    #[test]
    fn test_no_pause_is_plain_concatenation() {
        let a = tone(300, 0.2);
        let b = tone(450, 0.4);
        let master = AudioAssembler::new(500).assemble(&[a.clone(), b.clone()], PauseChoice::NoPause).unwrap();
        assert_eq!(master.frames(), a.frames() + b.frames());
        assert_eq!(master.duration_ms(), 750);
    }

    #[test]
    fn test_pause_inserted_between_chosen_fragments() {
        let clips = vec![tone(100, 0.1), tone(200, 0.2), tone(300, 0.3)];
        let master = AudioAssembler::new(500)
            .assemble(&clips, PauseChoice::Boundary { after: 2 })
            .unwrap();

        assert_eq!(master.duration_ms(), 100 + 200 + 300 + 500);
        let frames = |ms: usize| ms * RATE as usize / 1000;
        let samples = master.samples();
        // Тишина ровно между вторым и третьим фрагментом
        assert_eq!(samples[frames(300) - 1], 0.2);
        assert!(samples[frames(300)..frames(800)].iter().all(|&s| s == 0.0));
        assert_eq!(samples[frames(800)], 0.3);
    }

    #[test]
    fn test_assembly_is_deterministic() {
        let clips = vec![tone(120, 0.5), tone(80, -0.5)];
        let assembler = AudioAssembler::new(250);
        let choice = PauseChoice::Boundary { after: 1 };
        assert_eq!(
            assembler.assemble(&clips, choice).unwrap(),
            assembler.assemble(&clips, choice).unwrap()
        );
    }

    #[test]
    fn test_invalid_boundary_rejected() {
        let clips = vec![tone(100, 0.1), tone(100, 0.1)];
        let assembler = AudioAssembler::new(500);
        assert!(assembler.assemble(&clips, PauseChoice::Boundary { after: 2 }).is_err());
        assert!(assembler.assemble(&clips, PauseChoice::Boundary { after: 0 }).is_err());
        assert!(assembler.assemble(&[], PauseChoice::NoPause).is_err());
    }
}
