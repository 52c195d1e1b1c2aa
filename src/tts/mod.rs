pub mod capability;
pub mod store;
pub mod voice;

use std::sync::{Arc, Mutex, Weak};

use tracing::{debug, info, warn};

use crate::config::SpeechConfig;
use crate::error::StoreError;

pub use capability::{
    LogCapability, SpeechCapability, Utterance, UtteranceOutcome, VoicesChangedListener,
};
pub use store::{JsonFileStore, MemoryStore, PreferenceStore, RATE_KEY, VOICE_KEY};
pub use voice::{best_match_voice, Voice, VoicePreference};

/// Called when an utterance plays to the end. Not called on cancellation.
pub type EndCallback = Box<dyn FnOnce() + Send + 'static>;

const MIN_RATE: f32 = 0.1;
const MAX_RATE: f32 = 10.0;

#[derive(Debug, Clone, PartialEq)]
enum Voices {
    Uninitialized,
    Loading,
    Ready(Vec<Voice>),
    Unavailable,
}

#[derive(Debug)]
struct State {
    locale: String,
    voices: Voices,
    preference: VoicePreference,
    speaking: bool,
    /// Id of the utterance that currently owns the speaking mark.
    current_utterance: u64,
    /// Bumped by every enumeration pass; older passes stop when they see a
    /// newer value.
    epoch: u64,
}

struct Inner {
    capability: Option<Arc<dyn SpeechCapability>>,
    store: Arc<dyn PreferenceStore>,
    config: SpeechConfig,
    state: Mutex<State>,
}

/// Single point of contact with the platform speech engine. At most one
/// utterance is audible at a time: every `speak` preempts the previous one.
///
/// Cheap to clone; clones share state.
#[derive(Clone)]
pub struct SpeechOutputManager {
    inner: Arc<Inner>,
}

impl SpeechOutputManager {
    pub fn new(
        capability: Arc<dyn SpeechCapability>,
        store: Arc<dyn PreferenceStore>,
        config: SpeechConfig,
    ) -> Self {
        let manager = Self::build(Some(Arc::clone(&capability)), store, config);
        let weak = Arc::downgrade(&manager.inner);
        capability.subscribe_voices_changed(Box::new(move || {
            let Some(inner) = weak.upgrade() else {
                return;
            };
            let Ok(runtime) = tokio::runtime::Handle::try_current() else {
                warn!("Voices changed outside a tokio runtime, ignoring");
                return;
            };
            let manager = SpeechOutputManager { inner };
            runtime.spawn(async move { manager.voices_changed().await });
        }));
        manager
    }

    /// Manager for environments without speech support. Every operation is
    /// a no-op.
    pub fn unsupported(config: SpeechConfig) -> Self {
        Self::build(None, Arc::new(MemoryStore::new()), config)
    }

    fn build(
        capability: Option<Arc<dyn SpeechCapability>>,
        store: Arc<dyn PreferenceStore>,
        config: SpeechConfig,
    ) -> Self {
        let state = State {
            locale: String::new(),
            voices: Voices::Uninitialized,
            preference: VoicePreference {
                voice_index: 0,
                rate: config.default_rate,
            },
            speaking: false,
            current_utterance: 0,
            epoch: 0,
        };

        Self {
            inner: Arc::new(Inner {
                capability,
                store,
                config,
                state: Mutex::new(state),
            }),
        }
    }

    pub fn config(&self) -> &SpeechConfig {
        &self.inner.config
    }

    /// Enumerate voices for `locale`, retrying while the platform still
    /// reports none. Call again whenever the locale changes.
    pub async fn initialize(&self, locale: &str) {
        let Some(capability) = self.inner.capability.clone() else {
            debug!("Speech capability unavailable, skipping voice enumeration");
            return;
        };

        let epoch = {
            let mut state = self.inner.state.lock().unwrap();
            state.epoch += 1;
            state.locale = locale.to_string();
            if !matches!(state.voices, Voices::Ready(_)) {
                state.voices = Voices::Loading;
            }
            state.epoch
        };

        let limit = self.inner.config.voice_retry_limit;
        let interval = self.inner.config.voice_retry_interval();
        let mut retries = 0;

        loop {
            let voices = capability.voices();
            if !voices.is_empty() {
                self.apply_voices(epoch, locale, voices);
                return;
            }

            if retries >= limit {
                let mut state = self.inner.state.lock().unwrap();
                if state.epoch == epoch {
                    state.voices = Voices::Unavailable;
                    warn!(retries, "No speech voices available, speech disabled");
                }
                return;
            }

            retries += 1;
            debug!(retries, "Voice list empty, retrying in {:?}", interval);
            tokio::time::sleep(interval).await;

            if self.inner.state.lock().unwrap().epoch != epoch {
                debug!("Voice enumeration superseded");
                return;
            }
        }
    }

    /// Platform "voices changed" notification: enumerate again for the
    /// current locale.
    pub async fn voices_changed(&self) {
        let locale = {
            let state = self.inner.state.lock().unwrap();
            if state.voices == Voices::Uninitialized {
                debug!("Voices changed before initialize, ignoring");
                return;
            }
            state.locale.clone()
        };
        self.initialize(&locale).await;
    }

    fn apply_voices(&self, epoch: u64, locale: &str, voices: Vec<Voice>) {
        let stored_index = self.stored::<usize>(VOICE_KEY);
        let stored_rate = self.stored::<f32>(RATE_KEY).filter(|r| r.is_finite() && *r > 0.0);

        let mut state = self.inner.state.lock().unwrap();
        if state.epoch != epoch {
            return;
        }

        let voice_index = match stored_index {
            Some(i) if i < voices.len() => i,
            Some(i) => {
                warn!(index = i, voices = voices.len(), "Stored voice index out of range");
                best_match_voice(&voices, locale)
            }
            None => best_match_voice(&voices, locale),
        };
        let rate = stored_rate.unwrap_or(state.preference.rate);

        info!(
            count = voices.len(),
            voice = %voices[voice_index].name,
            rate,
            "Speech voices loaded for {}",
            locale
        );

        state.preference = VoicePreference { voice_index, rate };
        state.voices = Voices::Ready(voices);
    }

    fn stored<T: std::str::FromStr>(&self, key: &str) -> Option<T> {
        let raw = match self.inner.store.get(key) {
            Ok(raw) => raw?,
            Err(e) => {
                warn!("Failed to read {}: {}", key, e);
                return None;
            }
        };
        match raw.trim().parse() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!("Ignoring unparsable {} value {:?}", key, raw);
                None
            }
        }
    }

    /// Speak `text` with the selected voice and rate, replacing whatever is
    /// playing. Returns whether the utterance was handed to the platform.
    pub fn speak(&self, text: &str, on_end: Option<EndCallback>) -> bool {
        if text.trim().is_empty() {
            return false;
        }
        let Some(capability) = self.inner.capability.as_ref() else {
            return false;
        };

        let (utterance, id) = {
            let mut state = self.inner.state.lock().unwrap();
            let Voices::Ready(voices) = &state.voices else {
                debug!("Voices not ready, dropping utterance");
                return false;
            };
            let Some(voice) = voices
                .get(state.preference.voice_index)
                .or_else(|| voices.first())
                .cloned()
            else {
                return false;
            };
            let utterance = Utterance {
                text: text.to_string(),
                voice,
                rate: state.preference.rate,
            };
            state.current_utterance += 1;
            state.speaking = true;
            (utterance, state.current_utterance)
        };

        if capability.is_speaking() {
            capability.cancel();
        }

        debug!(id, "Submitting utterance: {:?}", utterance.text);
        let weak = Arc::downgrade(&self.inner);
        capability.speak(
            utterance,
            Box::new(move |outcome| finish_utterance(weak, id, outcome, on_end)),
        );
        true
    }

    /// Cancel the current utterance, if any.
    pub fn stop(&self) {
        let Some(capability) = self.inner.capability.as_ref() else {
            return;
        };
        if capability.is_speaking() {
            capability.cancel();
            self.inner.state.lock().unwrap().speaking = false;
        }
    }

    /// Cancel the current utterance and wait until the platform confirms it
    /// has gone quiet. Resolves at once when nothing is playing.
    pub async fn stop_and_await(&self) {
        let Some(capability) = self.inner.capability.clone() else {
            return;
        };
        if !capability.is_speaking() {
            return;
        }

        capability.cancel();
        let poll = self.inner.config.stop_poll_interval();
        while capability.is_speaking() {
            tokio::time::sleep(poll).await;
        }

        self.inner.state.lock().unwrap().speaking = false;
        debug!("Speech fully stopped");
    }

    /// Persist a voice choice and apply it to the next utterance.
    pub fn save_voice_preference(&self, voice_index: usize, rate: f32) {
        let rate = if rate.is_finite() {
            rate.clamp(MIN_RATE, MAX_RATE)
        } else {
            self.inner.config.default_rate
        };

        if let Err(e) = self.persist(voice_index, rate) {
            warn!("Failed to persist voice preference: {}", e);
        }

        self.inner.state.lock().unwrap().preference = VoicePreference { voice_index, rate };
    }

    fn persist(&self, voice_index: usize, rate: f32) -> Result<(), StoreError> {
        self.inner.store.set(VOICE_KEY, &voice_index.to_string())?;
        self.inner.store.set(RATE_KEY, &rate.to_string())?;
        Ok(())
    }

    pub fn preference(&self) -> VoicePreference {
        self.inner.state.lock().unwrap().preference
    }

    pub fn voices(&self) -> Vec<Voice> {
        match &self.inner.state.lock().unwrap().voices {
            Voices::Ready(voices) => voices.clone(),
            _ => Vec::new(),
        }
    }

    /// True once voices are loaded and speech can be produced.
    pub fn is_available(&self) -> bool {
        matches!(self.inner.state.lock().unwrap().voices, Voices::Ready(_))
    }

    pub fn is_speaking(&self) -> bool {
        self.inner.state.lock().unwrap().speaking
    }

    pub fn locale(&self) -> String {
        self.inner.state.lock().unwrap().locale.clone()
    }
}

fn finish_utterance(
    inner: Weak<Inner>,
    id: u64,
    outcome: UtteranceOutcome,
    on_end: Option<EndCallback>,
) {
    if let Some(inner) = inner.upgrade() {
        let mut state = inner.state.lock().unwrap();
        if state.current_utterance == id {
            state.speaking = false;
        }
    }

    debug!(id, ?outcome, "Utterance finished");
    if outcome == UtteranceOutcome::Completed {
        if let Some(on_end) = on_end {
            on_end();
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, Ordering};

    use super::capability::fake::FakeCapability;
    use super::*;

    fn fast_config() -> SpeechConfig {
        SpeechConfig {
            voice_retry_interval_ms: 1,
            stop_poll_interval_ms: 1,
            ..SpeechConfig::default()
        }
    }

    fn manager_with(fake: &FakeCapability, store: Arc<MemoryStore>) -> SpeechOutputManager {
        SpeechOutputManager::new(Arc::new(fake.clone()), store, fast_config())
    }

    async fn ready(fake: &FakeCapability) -> SpeechOutputManager {
        let manager = manager_with(fake, Arc::new(MemoryStore::new()));
        manager.initialize("en-US").await;
        manager
    }

    #[tokio::test]
    async fn speak_before_initialize_is_noop() {
        let fake = FakeCapability::english();
        let manager = manager_with(&fake, Arc::new(MemoryStore::new()));
        assert!(!manager.speak("Hello", None));
        assert!(fake.spoken().is_empty());
    }

    #[tokio::test]
    async fn initialize_picks_locale_match() {
        let fake = FakeCapability::english();
        let manager = manager_with(&fake, Arc::new(MemoryStore::new()));
        manager.initialize("en-GB").await;

        assert!(manager.is_available());
        assert_eq!(manager.preference().voice_index, 1);
        assert_eq!(manager.preference().rate, 1.25);
        assert_eq!(manager.locale(), "en-GB");
    }

    #[tokio::test]
    async fn initialize_restores_stored_preference() {
        let fake = FakeCapability::english();
        let store = Arc::new(MemoryStore::new());
        store.set(VOICE_KEY, "0").unwrap();
        store.set(RATE_KEY, "0.75").unwrap();

        let manager = manager_with(&fake, store);
        manager.initialize("en-US").await;

        assert_eq!(
            manager.preference(),
            VoicePreference {
                voice_index: 0,
                rate: 0.75
            }
        );
    }

    #[tokio::test]
    async fn out_of_range_stored_index_falls_back_to_locale() {
        let fake = FakeCapability::english();
        let store = Arc::new(MemoryStore::new());
        store.set(VOICE_KEY, "7").unwrap();
        store.set(RATE_KEY, "fast").unwrap();

        let manager = manager_with(&fake, store);
        manager.initialize("en-US").await;

        assert_eq!(manager.preference().voice_index, 1);
        assert_eq!(manager.preference().rate, 1.25);
    }

    #[tokio::test]
    async fn retries_until_voices_appear() {
        let fake = FakeCapability::english();
        fake.delay_voices(3);
        let manager = ready(&fake).await;

        assert!(manager.is_available());
        assert_eq!(fake.enumerations(), 4);
    }

    #[tokio::test]
    async fn gives_up_after_retry_limit_and_recovers_on_voices_changed() {
        let fake = FakeCapability::english();
        fake.delay_voices(usize::MAX);
        let manager = SpeechOutputManager::new(
            Arc::new(fake.clone()),
            Arc::new(MemoryStore::new()),
            SpeechConfig {
                voice_retry_limit: 2,
                ..fast_config()
            },
        );
        manager.initialize("en-US").await;

        assert_eq!(fake.enumerations(), 3);
        assert!(!manager.is_available());
        assert!(!manager.speak("Hello", None));

        fake.delay_voices(0);
        manager.voices_changed().await;
        assert!(manager.is_available());
        assert!(manager.speak("Hello", None));
        assert_eq!(fake.spoken_texts(), vec!["Hello"]);
    }

    #[tokio::test]
    async fn platform_notification_reloads_voices() {
        let fake = FakeCapability::with_voices(vec![Voice::new("Anna", "de-DE")]);
        let manager = ready(&fake).await;
        assert_eq!(manager.preference().voice_index, 0);

        fake.set_voices(vec![
            Voice::new("Anna", "de-DE"),
            Voice::new("Samantha", "en-US"),
        ]);
        fake.notify_voices_changed();
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;

        assert_eq!(manager.voices().len(), 2);
        assert_eq!(manager.preference().voice_index, 1);
        assert_eq!(fake.enumerations(), 2);
    }

    #[tokio::test]
    async fn notification_before_initialize_is_ignored() {
        let fake = FakeCapability::english();
        let manager = manager_with(&fake, Arc::new(MemoryStore::new()));

        manager.voices_changed().await;
        assert_eq!(fake.enumerations(), 0);
        assert!(!manager.is_available());
    }

    #[tokio::test]
    async fn newer_initialize_supersedes_pending_retries() {
        let fake = FakeCapability::english();
        fake.delay_voices(2);
        let manager = manager_with(&fake, Arc::new(MemoryStore::new()));

        tokio::join!(manager.initialize("de-DE"), manager.initialize("en-US"));

        assert_eq!(manager.locale(), "en-US");
        assert_eq!(manager.preference().voice_index, 1);
        assert_eq!(fake.enumerations(), 3);
    }

    #[tokio::test]
    async fn speak_uses_selected_voice_and_rate() {
        let fake = FakeCapability::english();
        let manager = ready(&fake).await;

        assert!(manager.speak("Hello", None));
        let spoken = fake.spoken();
        assert_eq!(spoken.len(), 1);
        assert_eq!(spoken[0].voice.name, "Samantha");
        assert_eq!(spoken[0].rate, 1.25);
        assert!(manager.is_speaking());
    }

    #[tokio::test]
    async fn speak_ignores_blank_text() {
        let fake = FakeCapability::english();
        let manager = ready(&fake).await;
        assert!(!manager.speak("   ", None));
        assert!(fake.spoken().is_empty());
    }

    #[tokio::test]
    async fn speak_preempts_current_utterance() {
        let fake = FakeCapability::english();
        let manager = ready(&fake).await;

        manager.speak("one", None);
        manager.speak("two", None);

        assert_eq!(fake.cancels(), 1);
        assert_eq!(fake.spoken_texts(), vec!["one", "two"]);
        assert!(manager.is_speaking());
    }

    #[tokio::test]
    async fn on_end_runs_only_on_completion() {
        let fake = FakeCapability::english();
        let manager = ready(&fake).await;

        let cancelled_end = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&cancelled_end);
        manager.speak(
            "first",
            Some(Box::new(move || flag.store(true, Ordering::SeqCst))),
        );

        let completed_end = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&completed_end);
        manager.speak(
            "second",
            Some(Box::new(move || flag.store(true, Ordering::SeqCst))),
        );
        fake.finish_current();

        assert!(!cancelled_end.load(Ordering::SeqCst));
        assert!(completed_end.load(Ordering::SeqCst));
        assert!(!manager.is_speaking());
    }

    #[tokio::test]
    async fn stop_is_idempotent() {
        let fake = FakeCapability::english();
        let manager = ready(&fake).await;

        manager.stop();
        assert_eq!(fake.cancels(), 0);

        manager.speak("Hello", None);
        manager.stop();
        manager.stop();
        assert_eq!(fake.cancels(), 1);
        assert!(!manager.is_speaking());
    }

    #[tokio::test]
    async fn stop_and_await_waits_for_silence() {
        let fake = FakeCapability::english();
        fake.set_cancel_lag(3);
        let manager = ready(&fake).await;

        manager.speak("A long paragraph", None);
        manager.stop_and_await().await;

        assert_eq!(fake.polls_while_winding_down(), 3);
        assert!(!fake.is_speaking());
        assert!(!manager.is_speaking());
    }

    #[tokio::test]
    async fn stop_and_await_returns_at_once_when_quiet() {
        let fake = FakeCapability::english();
        let manager = ready(&fake).await;

        manager.stop_and_await().await;
        assert_eq!(fake.cancels(), 0);
    }

    #[tokio::test]
    async fn save_preference_persists_and_applies() {
        let fake = FakeCapability::english();
        let store = Arc::new(MemoryStore::new());
        let manager = manager_with(&fake, Arc::clone(&store));
        manager.initialize("en-US").await;

        manager.save_voice_preference(0, 0.9);
        assert_eq!(store.get(VOICE_KEY).unwrap().as_deref(), Some("0"));
        assert_eq!(store.get(RATE_KEY).unwrap().as_deref(), Some("0.9"));

        manager.speak("Hallo", None);
        assert_eq!(fake.spoken()[0].voice.name, "Anna");
        assert_eq!(fake.spoken()[0].rate, 0.9);
    }

    #[tokio::test]
    async fn saved_preference_survives_new_manager() {
        let fake = FakeCapability::english();
        let store = Arc::new(MemoryStore::new());

        let first = manager_with(&fake, Arc::clone(&store));
        first.initialize("en-US").await;
        first.save_voice_preference(0, 2.0);

        let second = manager_with(&fake, store);
        second.initialize("en-US").await;
        assert_eq!(
            second.preference(),
            VoicePreference {
                voice_index: 0,
                rate: 2.0
            }
        );
    }

    #[tokio::test]
    async fn unsupported_manager_is_inert() {
        let manager = SpeechOutputManager::unsupported(fast_config());
        manager.initialize("en-US").await;
        assert!(!manager.is_available());
        assert!(!manager.speak("Hello", None));
        manager.stop();
        manager.stop_and_await().await;
        manager.save_voice_preference(1, 1.0);
        assert_eq!(manager.preference().voice_index, 1);
    }
}
