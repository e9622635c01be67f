//! TTS vendor boundary: a shared synthesis trait and the HTTP clients
//! behind it.
//!
//! Both vendors implement the same contract: non-empty trimmed text and
//! a voice id in, encoded audio bytes out. Authentication, request
//! construction, and response validation live here; nothing is retried,
//! and vendor failures surface as [`BatchError::Synthesis`].

use std::env;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;

use crate::audio::AudioFormat;
use crate::config::{SynthesisConfig, VoiceSettings};
use crate::error::BatchError;

/// Boundary to an external text-to-speech vendor.
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    /// Synthesize one segment. `text` is non-empty and already trimmed.
    async fn synthesize(&self, text: &str, voice_id: &str) -> Result<Vec<u8>, BatchError>;

    /// Encoding of the bytes returned by `synthesize`.
    fn audio_format(&self) -> AudioFormat;

    /// Vendor name for diagnostics.
    fn name(&self) -> &str;
}

/// Supported TTS vendors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    ElevenLabs,
    OpenAi,
}

impl Provider {
    /// Environment variable holding the vendor API key.
    pub fn api_key_env_var(&self) -> &'static str {
        match self {
            Provider::ElevenLabs => "ELEVENLABS_API_KEY",
            Provider::OpenAi => "OPENAI_API_KEY",
        }
    }

    /// Default API base URL for the vendor.
    pub fn default_base_url(&self) -> &'static str {
        match self {
            Provider::ElevenLabs => "https://api.elevenlabs.io/v1",
            Provider::OpenAi => "https://api.openai.com/v1",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Provider::ElevenLabs => "elevenlabs",
            Provider::OpenAi => "openai",
        }
    }

    /// Resolve the vendor API key from the environment.
    pub fn api_key_from_env(&self) -> Result<String, BatchError> {
        let key = match self {
            Provider::ElevenLabs => env::var("ELEVENLABS_API_KEY")
                .or_else(|_| env::var("ELEVEN_LABS_API_KEY")),
            Provider::OpenAi => env::var("OPENAI_API_KEY"),
        };
        key.map_err(|_| {
            BatchError::Config(format!(
                "{} is not set; the {} vendor needs an API key",
                self.api_key_env_var(),
                self.as_str()
            ))
        })
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Provider {
    type Err = BatchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "elevenlabs" | "eleven" | "eleven_labs" => Ok(Provider::ElevenLabs),
            "openai" | "open_ai" => Ok(Provider::OpenAi),
            _ => Err(BatchError::Config(format!(
                "Unknown provider: '{}'. Valid values: elevenlabs, openai",
                s
            ))),
        }
    }
}

/// Build the synthesizer for the configured provider, reading its API
/// key from the environment. The returned adapter is constructed once
/// and passed explicitly into the pipeline.
pub fn build_synthesizer(
    config: &SynthesisConfig,
) -> Result<Box<dyn SpeechSynthesizer>, BatchError> {
    let api_key = config.provider.api_key_from_env()?;
    match config.provider {
        Provider::ElevenLabs => Ok(Box::new(ElevenLabsSynthesizer::new(api_key, config)?)),
        Provider::OpenAi => Ok(Box::new(OpenAiSynthesizer::new(api_key, config)?)),
    }
}

fn http_client(timeout_secs: u64) -> Result<reqwest::Client, BatchError> {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .connect_timeout(Duration::from_secs(30))
        .build()
        .map_err(|e| BatchError::Config(format!("Failed to create HTTP client: {}", e)))
}

/// ElevenLabs text-to-speech client.
pub struct ElevenLabsSynthesizer {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
    model_id: String,
    output_format: String,
    voice_settings: VoiceSettings,
}

impl ElevenLabsSynthesizer {
    pub fn new(api_key: impl Into<String>, config: &SynthesisConfig) -> Result<Self, BatchError> {
        Ok(Self {
            http: http_client(config.request_timeout_secs)?,
            api_key: api_key.into(),
            base_url: Provider::ElevenLabs.default_base_url().to_string(),
            model_id: config.elevenlabs_model.clone(),
            output_format: config.elevenlabs_output_format.clone(),
            voice_settings: config.voice_settings,
        })
    }
}

#[async_trait]
impl SpeechSynthesizer for ElevenLabsSynthesizer {
    async fn synthesize(&self, text: &str, voice_id: &str) -> Result<Vec<u8>, BatchError> {
        let url = format!("{}/text-to-speech/{}", self.base_url, voice_id);
        let body = serde_json::json!({
            "text": text,
            "model_id": self.model_id,
            "voice_settings": {
                "stability": self.voice_settings.stability,
                "similarity_boost": self.voice_settings.similarity_boost,
            },
        });

        let response = self
            .http
            .post(&url)
            .header("xi-api-key", &self.api_key)
            .query(&[("output_format", self.output_format.as_str())])
            .json(&body)
            .send()
            .await
            .map_err(|e| BatchError::Synthesis(format!("ElevenLabs request failed: {}", e)))?;

        read_audio_response(response, "ElevenLabs").await
    }

    fn audio_format(&self) -> AudioFormat {
        AudioFormat::Mp3
    }

    fn name(&self) -> &str {
        "elevenlabs"
    }
}

/// OpenAI speech endpoint client.
pub struct OpenAiSynthesizer {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
}

impl OpenAiSynthesizer {
    pub fn new(api_key: impl Into<String>, config: &SynthesisConfig) -> Result<Self, BatchError> {
        Ok(Self {
            http: http_client(config.request_timeout_secs)?,
            api_key: api_key.into(),
            base_url: Provider::OpenAi.default_base_url().to_string(),
            model: config.openai_model.clone(),
        })
    }
}

#[async_trait]
impl SpeechSynthesizer for OpenAiSynthesizer {
    async fn synthesize(&self, text: &str, voice_id: &str) -> Result<Vec<u8>, BatchError> {
        let url = format!("{}/audio/speech", self.base_url);
        let body = serde_json::json!({
            "model": self.model,
            "input": text,
            "voice": voice_id,
            "response_format": "mp3",
        });

        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| BatchError::Synthesis(format!("OpenAI request failed: {}", e)))?;

        read_audio_response(response, "OpenAI").await
    }

    fn audio_format(&self) -> AudioFormat {
        AudioFormat::Mp3
    }

    fn name(&self) -> &str {
        "openai"
    }
}

async fn read_audio_response(
    response: reqwest::Response,
    vendor: &str,
) -> Result<Vec<u8>, BatchError> {
    let status = response.status();
    if !status.is_success() {
        let detail = response.text().await.unwrap_or_default();
        return Err(BatchError::Synthesis(format!(
            "{} returned {}: {}",
            vendor,
            status,
            detail.trim()
        )));
    }

    let bytes = response
        .bytes()
        .await
        .map_err(|e| BatchError::Synthesis(format!("{} response read failed: {}", vendor, e)))?;
    if bytes.is_empty() {
        return Err(BatchError::Synthesis(format!(
            "{} returned an empty audio body",
            vendor
        )));
    }
    Ok(bytes.to_vec())
}
