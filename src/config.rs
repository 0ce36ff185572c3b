use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Top-level application configuration. Every field has a default, so a
/// partial file only overrides what it names.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Base URL of the Ollama server, without the `/api/...` path.
    pub endpoint: String,
    pub model: String,
    pub connect_timeout_secs: u64,
    /// File name of the ggml whisper model under the models directory.
    pub whisper_model: String,
    pub language: String,
    /// Overrides the platform speech command, e.g. `["espeak-ng", "-s", "160"]`.
    /// The response text is appended as the last argument.
    pub tts_command: Option<Vec<String>>,
    pub capture: CaptureConfig,
}

/// Utterance endpointing parameters for voice capture.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CaptureConfig {
    /// RMS level above which a frame counts as speech.
    pub silence_threshold: f32,
    /// Trailing silence that ends an utterance.
    pub silence_ms: u64,
    pub max_utterance_secs: u64,
    /// Give up if nobody speaks within this window.
    pub start_timeout_secs: u64,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            silence_threshold: 0.01,
            silence_ms: 1200,
            max_utterance_secs: 30,
            start_timeout_secs: 8,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:11434".into(),
            model: "deepseek-r1:1.5b".into(),
            connect_timeout_secs: 10,
            whisper_model: "ggml-base.en.bin".into(),
            language: "en".into(),
            tts_command: None,
            capture: CaptureConfig::default(),
        }
    }
}

impl Config {
    /// Directory: ~/.config/voice-chat/
    fn dir() -> PathBuf {
        let mut p = dirs::config_dir().unwrap_or_else(|| PathBuf::from("."));
        p.push("voice-chat");
        p
    }

    fn path() -> PathBuf {
        Self::dir().join("config.json")
    }

    /// Load from disk, returning defaults if file doesn't exist or is invalid.
    pub fn load() -> Self {
        Self::load_from(&Self::path())
    }

    pub fn load_from(path: &Path) -> Self {
        match fs::read_to_string(path) {
            Ok(data) => serde_json::from_str(&data).unwrap_or_else(|e| {
                log::warn!("Ignoring invalid config {}: {e}", path.display());
                Self::default()
            }),
            Err(_) => Self::default(),
        }
    }

    /// Full URL of the streaming generation endpoint.
    pub fn generate_url(&self) -> String {
        format!("{}/api/generate", self.endpoint.trim_end_matches('/'))
    }

    pub fn tags_url(&self) -> String {
        format!("{}/api/tags", self.endpoint.trim_end_matches('/'))
    }
}
