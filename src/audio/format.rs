//! # Audio Format Handling
//!
//! Декодирование ответов провайдера и кодирование клипов в выходные форматы.
//!
//! - `pcm`: сырые семплы signed 16-bit little-endian, читаются и пишутся напрямую
//! - `mp3`, `ogg_vorbis`: декодирование через Symphonia, кодирование через
//!   промежуточный WAV (hound) и FFmpeg

use std::io::Cursor;
use std::path::Path;

use bytes::{Buf, BufMut, BytesMut};
use hound::{SampleFormat, WavSpec, WavWriter};
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

use super::clip::AudioClip;
use crate::config::OutputFormat;
use crate::error::{Result, StimuliError};
use crate::utils::ffmpeg;

/// Параметры декодирования, которые нельзя узнать из самих данных
#[derive(Debug, Clone, Copy)]
pub struct DecodeOptions {
    /// Частота дискретизации сырого pcm
    pub pcm_sample_rate: u32,
}

impl Default for DecodeOptions {
    fn default() -> Self {
        Self {
            pcm_sample_rate: 16000,
        }
    }
}

/// Декодировать байты аудио в клип
pub fn decode(data: &[u8], format: OutputFormat, options: DecodeOptions) -> Result<AudioClip> {
    match format {
        OutputFormat::Pcm => Ok(decode_pcm(data, options.pcm_sample_rate)),
        OutputFormat::Mp3 | OutputFormat::OggVorbis => decode_compressed(data, format.extension()),
    }
}

/// Прочитать и декодировать аудиофайл
pub fn decode_file(path: &Path, format: OutputFormat, options: DecodeOptions) -> Result<AudioClip> {
    let data = std::fs::read(path).map_err(|e| StimuliError::filesystem(path, e))?;
    decode(&data, format, options)
        .map_err(|e| StimuliError::AudioProcessing(format!("{}: {}", path.display(), e)))
}

/// Закодировать клип в байты выходного формата
pub fn encode(clip: &AudioClip, format: OutputFormat) -> Result<Vec<u8>> {
    match format {
        OutputFormat::Pcm => Ok(encode_pcm(clip)),
        OutputFormat::Mp3 | OutputFormat::OggVorbis => encode_compressed(clip, format),
    }
}

/// Декодирует сырые s16le семплы (моно)
pub fn decode_pcm(data: &[u8], sample_rate: u32) -> AudioClip {
    let mut buf = data;
    let mut samples = Vec::with_capacity(data.len() / 2);
    while buf.remaining() >= 2 {
        samples.push(buf.get_i16_le() as f32 / 32768.0);
    }
    AudioClip::new(samples, sample_rate, 1)
}

/// Кодирует клип в сырые s16le семплы
pub fn encode_pcm(clip: &AudioClip) -> Vec<u8> {
    let mut out = BytesMut::with_capacity(clip.samples().len() * 2);
    for &sample in clip.samples() {
        out.put_i16_le(to_i16(sample));
    }
    out.to_vec()
}

fn to_i16(sample: f32) -> i16 {
    (sample * 32768.0).round().clamp(i16::MIN as f32, i16::MAX as f32) as i16
}

fn decode_compressed(data: &[u8], extension: &str) -> Result<AudioClip> {
    let mss = MediaSourceStream::new(Box::new(Cursor::new(data.to_vec())), Default::default());

    let mut hint = Hint::new();
    hint.with_extension(extension);

    let format_opts = FormatOptions {
        enable_gapless: true,
        ..Default::default()
    };

    let probed = symphonia::default::get_probe()
        .format(&hint, mss, &format_opts, &MetadataOptions::default())
        .map_err(|e| StimuliError::AudioProcessing(format!("Failed to probe {} data: {}", extension, e)))?;

    let mut format = probed.format;
    let track = format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .ok_or_else(|| StimuliError::AudioProcessing("No audio track found".to_string()))?;

    let mut decoder = symphonia::default::get_codecs()
        .make(&track.codec_params, &DecoderOptions::default())
        .map_err(|e| StimuliError::AudioProcessing(format!("Failed to create decoder: {}", e)))?;

    let track_id = track.id;
    let mut sample_rate = track.codec_params.sample_rate.unwrap_or(0);
    let mut channels = track
        .codec_params
        .channels
        .map(|c| c.count() as u16)
        .unwrap_or(0);

    let mut samples = Vec::new();

    while let Ok(packet) = format.next_packet() {
        // Пропускаем пакеты других треков
        if packet.track_id() != track_id {
            continue;
        }

        match decoder.decode(&packet) {
            Ok(decoded) => {
                let spec = *decoded.spec();
                sample_rate = spec.rate;
                channels = spec.channels.count() as u16;

                let mut sample_buf = SampleBuffer::<f32>::new(decoded.capacity() as u64, spec);
                sample_buf.copy_interleaved_ref(decoded);
                samples.extend_from_slice(sample_buf.samples());
            }
            Err(e) => {
                log::warn!("Skipping undecodable {} packet: {}", extension, e);
                continue;
            }
        }
    }

    if sample_rate == 0 || channels == 0 {
        return Err(StimuliError::AudioProcessing(format!(
            "Could not determine the layout of the {} stream",
            extension
        )));
    }

    log::debug!("Decoded {} samples at {} Hz, {} ch", samples.len(), sample_rate, channels);
    Ok(AudioClip::new(samples, sample_rate, channels))
}

/// Записать клип в WAV (32-бит с плавающей точкой)
pub fn write_wav(clip: &AudioClip, path: &Path) -> Result<()> {
    let spec = WavSpec {
        channels: clip.channels(),
        sample_rate: clip.sample_rate(),
        bits_per_sample: 32,
        sample_format: SampleFormat::Float,
    };

    let mut writer = WavWriter::create(path, spec)?;
    for &sample in clip.samples() {
        writer.write_sample(sample)?;
    }
    writer.finalize()?;
    Ok(())
}

fn encode_compressed(clip: &AudioClip, format: OutputFormat) -> Result<Vec<u8>> {
    let temp_dir = tempfile::tempdir()?;
    let wav_path = temp_dir.path().join("clip.wav");
    let out_path = temp_dir.path().join(format!("clip.{}", format.extension()));

    write_wav(clip, &wav_path)?;

    let codec_args: [&str; 4] = match format {
        OutputFormat::Mp3 => ["-codec:a", "libmp3lame", "-q:a", "2"],
        OutputFormat::OggVorbis => ["-codec:a", "libvorbis", "-q:a", "5"],
        OutputFormat::Pcm => return Ok(encode_pcm(clip)),
    };

    let wav_arg = wav_path.to_string_lossy().to_string();
    let out_arg = out_path.to_string_lossy().to_string();
    let mut args = vec!["-hide_banner", "-loglevel", "error", "-y", "-i", wav_arg.as_str()];
    args.extend_from_slice(&codec_args);
    args.push(out_arg.as_str());

    ffmpeg::run_ffmpeg_command(&args)?;

    std::fs::read(&out_path).map_err(|e| StimuliError::filesystem(&out_path, e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pcm_bytes_survive_decode_encode() {
        let original: Vec<u8> = [0i16, 1, -1, 12000, -32768, 32767]
            .iter()
            .flat_map(|s| s.to_le_bytes())
            .collect();
        let clip = decode_pcm(&original, 16000);
        assert_eq!(clip.frames(), 6);
        assert_eq!(encode_pcm(&clip), original);
    }

    #[test]
    fn test_pcm_odd_trailing_byte_ignored() {
        let clip = decode_pcm(&[0, 0, 1], 16000);
        assert_eq!(clip.frames(), 1);
    }

    #[test]
    fn test_encode_pcm_clamps() {
        let clip = AudioClip::new(vec![2.0, -2.0], 16000, 1);
        let bytes = encode_pcm(&clip);
        assert_eq!(i16::from_le_bytes([bytes[0], bytes[1]]), i16::MAX);
        assert_eq!(i16::from_le_bytes([bytes[2], bytes[3]]), i16::MIN);
    }

    #[test]
    fn test_wav_written_with_layout() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("test.wav");
        let clip = AudioClip::silent(100, 22050, 1);
        write_wav(&clip, &path).unwrap();

        let reader = hound::WavReader::open(&path).unwrap();
        assert_eq!(reader.spec().sample_rate, 22050);
        assert_eq!(reader.len() as usize, clip.frames());
    }

    #[test]
    fn test_garbage_mp3_is_audio_error() {
        let result = decode(b"definitely not audio", OutputFormat::Mp3, DecodeOptions::default());
        assert!(matches!(result, Err(StimuliError::AudioProcessing(_))));
    }
}
