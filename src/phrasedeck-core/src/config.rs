//! Configuration module for loading TOML config files.

use serde::Deserialize;
use std::fs;
use std::path::Path;

use crate::error::BatchError;
use crate::tts::Provider;

/// Root configuration structure.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub synthesis: SynthesisConfig,
}

/// Vendor tuning for speech synthesis.
///
/// Everything here has a sensible default, so a config file only needs
/// the fields it wants to override.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SynthesisConfig {
    /// Vendor used when the CLI does not name one.
    pub provider: Provider,
    /// ElevenLabs model id.
    pub elevenlabs_model: String,
    /// ElevenLabs output format tag sent with each request.
    pub elevenlabs_output_format: String,
    /// OpenAI speech model.
    pub openai_model: String,
    pub voice_settings: VoiceSettings,
    /// Sample rate used for silence-only tracks, where no synthesized
    /// segment dictates one.
    pub sample_rate: u32,
    /// Bitrate for MP3 output files.
    pub mp3_bitrate_kbps: u32,
    /// Timeout for each vendor request.
    pub request_timeout_secs: u64,
}

impl Default for SynthesisConfig {
    fn default() -> Self {
        Self {
            provider: Provider::ElevenLabs,
            elevenlabs_model: "eleven_multilingual_v2".to_string(),
            elevenlabs_output_format: "mp3_22050_32".to_string(),
            openai_model: "tts-1".to_string(),
            voice_settings: VoiceSettings::default(),
            sample_rate: 22050,
            mp3_bitrate_kbps: 128,
            request_timeout_secs: 120,
        }
    }
}

/// Voice tuning passed through to vendors that support it.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct VoiceSettings {
    pub stability: f32,
    pub similarity_boost: f32,
}

impl Default for VoiceSettings {
    fn default() -> Self {
        Self {
            stability: 0.3,
            similarity_boost: 0.5,
        }
    }
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, BatchError> {
        let content = fs::read_to_string(path.as_ref())
            .map_err(|e| BatchError::Config(format!("Failed to read config: {}", e)))?;

        toml::from_str(&content)
            .map_err(|e| BatchError::Config(format!("Failed to parse config: {}", e)))
    }

    /// Load configuration from string content.
    pub fn from_str(content: &str) -> Result<Self, BatchError> {
        toml::from_str(content)
            .map_err(|e| BatchError::Config(format!("Failed to parse config: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.synthesis.provider, Provider::ElevenLabs);
        assert_eq!(config.synthesis.elevenlabs_output_format, "mp3_22050_32");
        assert_eq!(config.synthesis.sample_rate, 22050);
        assert_eq!(config.synthesis.mp3_bitrate_kbps, 128);
        assert!((config.synthesis.voice_settings.stability - 0.3).abs() < f32::EPSILON);
    }

    #[test]
    fn test_partial_override() {
        let config = Config::from_str(
            r#"
            [synthesis]
            provider = "openai"
            openai_model = "tts-1-hd"

            [synthesis.voice_settings]
            stability = 0.7
            "#,
        )
        .unwrap();

        assert_eq!(config.synthesis.provider, Provider::OpenAi);
        assert_eq!(config.synthesis.openai_model, "tts-1-hd");
        assert!((config.synthesis.voice_settings.stability - 0.7).abs() < f32::EPSILON);
        // Untouched fields keep their defaults.
        assert!((config.synthesis.voice_settings.similarity_boost - 0.5).abs() < f32::EPSILON);
        assert_eq!(config.synthesis.sample_rate, 22050);
    }

    #[test]
    fn test_invalid_toml() {
        let result = Config::from_str("[synthesis\nprovider = ");
        assert!(matches!(result, Err(BatchError::Config(_))));
    }

    #[test]
    fn test_unknown_provider_rejected() {
        let result = Config::from_str("[synthesis]\nprovider = \"polly\"\n");
        assert!(matches!(result, Err(BatchError::Config(_))));
    }
}
