use serde::Deserialize;
use std::time::Duration;

use crate::error::ConfigError;

/// Attribute names authors use to steer hover speech.
#[derive(Debug, Clone, Deserialize)]
pub struct Markers {
    /// Boolean attribute that silences an element and its whole subtree.
    #[serde(default = "default_opt_out")]
    pub opt_out: String,
    /// Boolean attribute that makes any element eligible as a speech root.
    #[serde(default = "default_opt_in")]
    pub opt_in: String,
    /// Attribute whose value replaces the spoken text.
    #[serde(default = "default_text_override")]
    pub text_override: String,
}

fn default_opt_out() -> String {
    "data-no-speech".to_string()
}

fn default_opt_in() -> String {
    "data-speech".to_string()
}

fn default_text_override() -> String {
    "data-speech-text".to_string()
}

impl Default for Markers {
    fn default() -> Self {
        Self {
            opt_out: default_opt_out(),
            opt_in: default_opt_in(),
            text_override: default_text_override(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SpeechConfig {
    #[serde(default = "default_voice_retry_limit")]
    pub voice_retry_limit: u32,
    #[serde(default = "default_voice_retry_interval_ms")]
    pub voice_retry_interval_ms: u64,
    #[serde(default = "default_stop_poll_interval_ms")]
    pub stop_poll_interval_ms: u64,
    #[serde(default = "default_rate")]
    pub default_rate: f32,
    #[serde(default = "default_min_text_chars")]
    pub min_text_chars: usize,
    #[serde(default)]
    pub markers: Markers,
}

fn default_voice_retry_limit() -> u32 {
    10
}

fn default_voice_retry_interval_ms() -> u64 {
    200
}

fn default_stop_poll_interval_ms() -> u64 {
    50
}

fn default_rate() -> f32 {
    1.25
}

fn default_min_text_chars() -> usize {
    2
}

impl Default for SpeechConfig {
    fn default() -> Self {
        Self {
            voice_retry_limit: default_voice_retry_limit(),
            voice_retry_interval_ms: default_voice_retry_interval_ms(),
            stop_poll_interval_ms: default_stop_poll_interval_ms(),
            default_rate: default_rate(),
            min_text_chars: default_min_text_chars(),
            markers: Markers::default(),
        }
    }
}

impl SpeechConfig {
    /// Build a config from `HOVER_SPEECH_*` environment variables, falling
    /// back to defaults for anything unset.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(v) = parsed::<u32>(&lookup, "HOVER_SPEECH_VOICE_RETRIES")? {
            config.voice_retry_limit = v;
        }
        if let Some(v) = parsed::<u64>(&lookup, "HOVER_SPEECH_VOICE_RETRY_MS")? {
            config.voice_retry_interval_ms = v;
        }
        if let Some(v) = parsed::<u64>(&lookup, "HOVER_SPEECH_STOP_POLL_MS")? {
            config.stop_poll_interval_ms = v;
        }
        if let Some(v) = parsed::<f32>(&lookup, "HOVER_SPEECH_RATE")? {
            if !(v.is_finite() && v > 0.0) {
                return Err(ConfigError::InvalidValue {
                    key: "HOVER_SPEECH_RATE",
                    value: v.to_string(),
                });
            }
            config.default_rate = v;
        }

        Ok(config)
    }

    pub fn voice_retry_interval(&self) -> Duration {
        Duration::from_millis(self.voice_retry_interval_ms)
    }

    pub fn stop_poll_interval(&self) -> Duration {
        Duration::from_millis(self.stop_poll_interval_ms)
    }
}

fn parsed<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &'static str,
) -> Result<Option<T>, ConfigError> {
    match lookup(key) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::InvalidValue { key, value: raw }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn defaults_match_overlay_constants() {
        let config = SpeechConfig::default();
        assert_eq!(config.voice_retry_limit, 10);
        assert_eq!(config.voice_retry_interval(), Duration::from_millis(200));
        assert_eq!(config.stop_poll_interval(), Duration::from_millis(50));
        assert_eq!(config.default_rate, 1.25);
        assert_eq!(config.min_text_chars, 2);
        assert_eq!(config.markers.opt_out, "data-no-speech");
    }

    #[test]
    fn env_overrides_defaults() {
        let config = SpeechConfig::from_lookup(lookup(&[
            ("HOVER_SPEECH_VOICE_RETRIES", "3"),
            ("HOVER_SPEECH_STOP_POLL_MS", " 10 "),
            ("HOVER_SPEECH_RATE", "0.9"),
        ]))
        .unwrap();
        assert_eq!(config.voice_retry_limit, 3);
        assert_eq!(config.stop_poll_interval_ms, 10);
        assert_eq!(config.default_rate, 0.9);
        assert_eq!(config.voice_retry_interval_ms, 200);
    }

    #[test]
    fn rejects_garbage() {
        let err = SpeechConfig::from_lookup(lookup(&[("HOVER_SPEECH_VOICE_RETRY_MS", "soon")]))
            .unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidValue { key: "HOVER_SPEECH_VOICE_RETRY_MS", .. }
        ));
    }

    #[test]
    fn rejects_non_positive_rate() {
        assert!(SpeechConfig::from_lookup(lookup(&[("HOVER_SPEECH_RATE", "0")])).is_err());
    }

    #[test]
    fn partial_json_fills_defaults() {
        let config: SpeechConfig =
            serde_json::from_str(r#"{"min_text_chars": 3, "markers": {"opt_out": "data-quiet"}}"#)
                .unwrap();
        assert_eq!(config.min_text_chars, 3);
        assert_eq!(config.markers.opt_out, "data-quiet");
        assert_eq!(config.markers.opt_in, "data-speech");
        assert_eq!(config.voice_retry_limit, 10);
    }
}
