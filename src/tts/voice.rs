use serde::{Deserialize, Serialize};

/// A voice offered by the platform speech capability.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Voice {
    pub name: String,
    /// BCP 47 language tag, e.g. `en-US`.
    pub lang: String,
}

impl Voice {
    pub fn new(name: impl Into<String>, lang: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            lang: lang.into(),
        }
    }
}

/// The selected voice and rate. Persisted under `selectedVoice` and
/// `selectedRate`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VoicePreference {
    pub voice_index: usize,
    pub rate: f32,
}

/// Pick the voice that best fits `locale`: an exact tag match, then the
/// first voice sharing the primary language subtag, then the first voice.
pub fn best_match_voice(voices: &[Voice], locale: &str) -> usize {
    let locale = locale.trim().to_lowercase();

    if let Some(i) = voices.iter().position(|v| v.lang.to_lowercase() == locale) {
        return i;
    }

    let primary = primary_subtag(&locale);
    if !primary.is_empty() {
        if let Some(i) = voices
            .iter()
            .position(|v| v.lang.to_lowercase().starts_with(primary))
        {
            return i;
        }
    }

    0
}

fn primary_subtag(locale: &str) -> &str {
    locale.split(['-', '_']).next().unwrap_or(locale)
}
