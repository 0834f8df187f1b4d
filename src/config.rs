use config::{Config, Environment, File};
use serde::Deserialize;

use crate::error::PetError;

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct Settings {
    pub capture: CaptureSettings,
    pub perception: PerceptionSettings,
    pub presentation: PresentationSettings,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CaptureSettings {
    /// 0 captures all displays composited, 1 and up pick individual displays.
    pub monitor_index: usize,
    pub interval_secs: u64,
    pub jpeg_quality: u8,
    pub debug_dir: Option<String>,
    /// Retention cap for debug snapshots. `None` keeps everything.
    pub debug_max_files: Option<usize>,
}

impl Default for CaptureSettings {
    fn default() -> Self {
        Self {
            monitor_index: 1,
            interval_secs: 5,
            jpeg_quality: 80,
            debug_dir: Some("debug_screenshots".to_string()),
            debug_max_files: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PerceptionSettings {
    pub api_base: String,
    pub model: String,
    pub timeout_secs: Option<u64>,
    pub max_completion_tokens: u64,
}

impl Default for PerceptionSettings {
    fn default() -> Self {
        Self {
            api_base: "https://api.openai.com/v1".to_string(),
            model: "gpt-4o".to_string(),
            timeout_secs: Some(30),
            max_completion_tokens: 2048,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PresentationSettings {
    pub idle_gif: String,
    pub engage_gif: String,
    pub comment_duration_secs: u64,
    pub greeting: String,
}

impl Default for PresentationSettings {
    fn default() -> Self {
        Self {
            idle_gif: "assets/idle.gif".to_string(),
            engage_gif: "assets/engage.gif".to_string(),
            comment_duration_secs: 8,
            greeting: "Let's win this game!".to_string(),
        }
    }
}

impl Settings {
    /// Layered load: optional `deskpet.toml`, then `DESKPET__*` env overrides.
    pub fn load() -> Result<Self, PetError> {
        let settings = Config::builder()
            .add_source(File::with_name("deskpet").required(false))
            .add_source(Environment::with_prefix("DESKPET").separator("__"))
            .build()?
            .try_deserialize::<Settings>()?;
        Ok(settings)
    }

    /// The inference API key comes from the environment only, never from a
    /// config file on disk.
    pub fn api_key() -> Option<String> {
        std::env::var("OPENAI_API_KEY")
            .ok()
            .filter(|k| !k.trim().is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_source_behavior() {
        let settings = Settings::default();
        assert_eq!(settings.capture.monitor_index, 1);
        assert_eq!(settings.capture.interval_secs, 5);
        assert_eq!(settings.capture.jpeg_quality, 80);
        assert_eq!(settings.presentation.comment_duration_secs, 8);
        assert_eq!(settings.perception.model, "gpt-4o");
    }

    #[test]
    fn empty_config_falls_back_to_defaults() {
        let settings = Config::builder()
            .build()
            .unwrap()
            .try_deserialize::<Settings>()
            .unwrap();
        assert_eq!(settings.capture.monitor_index, 1);
        assert!(settings.capture.debug_max_files.is_none());
    }
}
