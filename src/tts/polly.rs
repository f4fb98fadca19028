//! Модуль для интеграции с Amazon Polly
//!
//! Учетные данные берутся из стандартной цепочки AWS: переменные окружения
//! `AWS_ACCESS_KEY_ID` / `AWS_SECRET_ACCESS_KEY`, файл `~/.aws/credentials`
//! или роль экземпляра.

use async_trait::async_trait;
use aws_config::{BehaviorVersion, Region};
use aws_sdk_polly::error::DisplayErrorContext;
use aws_sdk_polly::types::{OutputFormat as PollyOutputFormat, VoiceId};
use aws_sdk_polly::Client;
use bytes::Bytes;

use super::SpeechProvider;
use crate::config::{OutputFormat, PollyVoice, StimuliConfig};

/// Провайдер речи Amazon Polly
pub struct PollyProvider {
    client: Client,
    pcm_sample_rate: u32,
}

impl PollyProvider {
    /// Создать провайдер для региона и параметров из конфигурации
    pub async fn from_config(config: &StimuliConfig) -> Self {
        let sdk_config = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(config.region.clone()))
            .load()
            .await;

        log::info!("Polly client ready (region {})", config.region);
        Self {
            client: Client::new(&sdk_config),
            pcm_sample_rate: config.pcm_sample_rate,
        }
    }
}

#[async_trait]
impl SpeechProvider for PollyProvider {
    async fn synthesize(&self, text: &str, voice: PollyVoice, format: OutputFormat) -> Result<Bytes, String> {
        let mut request = self
            .client
            .synthesize_speech()
            .text(text)
            .voice_id(VoiceId::from(voice.as_str()))
            .output_format(PollyOutputFormat::from(format.as_str()));

        if format == OutputFormat::Pcm {
            request = request.sample_rate(self.pcm_sample_rate.to_string());
        }

        let response = request
            .send()
            .await
            .map_err(|e| format!("Polly request failed: {}", DisplayErrorContext(&e)))?;

        let audio = response
            .audio_stream
            .collect()
            .await
            .map_err(|e| format!("Failed to read Polly audio stream: {}", e))?
            .into_bytes();

        if audio.is_empty() {
            return Err("Polly returned an empty audio stream".to_string());
        }

        log::debug!("Polly returned {} bytes for {:?}", audio.len(), text);
        Ok(audio)
    }
}
