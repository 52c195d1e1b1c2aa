//! The platform speech-synthesis seam.
//!
//! The output manager never talks to a speech engine directly. It goes
//! through [`SpeechCapability`], which a browser binding, a desktop engine or
//! a test double can implement.

use tracing::info;

use super::voice::Voice;

/// One unit of speech submitted to the platform.
#[derive(Debug, Clone, PartialEq)]
pub struct Utterance {
    pub text: String,
    pub voice: Voice,
    pub rate: f32,
}

/// How an utterance left the platform queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UtteranceOutcome {
    /// Played to the end.
    Completed,
    /// Interrupted by `cancel` or replaced.
    Cancelled,
}

/// Invoked exactly once per submitted utterance.
pub type UtteranceCallback = Box<dyn FnOnce(UtteranceOutcome) + Send + 'static>;

/// Fired whenever the platform's voice list changes.
pub type VoicesChangedListener = Box<dyn Fn() + Send + Sync + 'static>;

/// Platform text-to-speech engine, consumed as a black box.
pub trait SpeechCapability: Send + Sync {
    /// Voices currently known to the platform. Often empty right after
    /// start-up, until the platform has finished loading them.
    fn voices(&self) -> Vec<Voice>;

    /// Queue `utterance` for playback. `on_done` fires when it completes or
    /// is cancelled. Implementations must not call `on_done` while holding
    /// locks the caller could need.
    fn speak(&self, utterance: Utterance, on_done: UtteranceCallback);

    /// Request cancellation of everything queued or playing. Completion may
    /// be asynchronous; watch [`SpeechCapability::is_speaking`].
    fn cancel(&self);

    fn is_speaking(&self) -> bool;

    /// Register for the platform's voices-changed notification.
    /// [`SpeechOutputManager::new`](super::SpeechOutputManager::new)
    /// subscribes once and re-enumerates on every notification. Engines
    /// without such a notification keep the default, which drops the
    /// listener; the manager then relies on its start-up retries alone.
    fn subscribe_voices_changed(&self, _listener: VoicesChangedListener) {}
}

/// Backend that logs utterances instead of playing them and completes each
/// one immediately.
#[derive(Debug, Clone, Default)]
pub struct LogCapability {
    voices: Vec<Voice>,
}

impl LogCapability {
    pub fn new(voices: Vec<Voice>) -> Self {
        Self { voices }
    }
}

impl SpeechCapability for LogCapability {
    fn voices(&self) -> Vec<Voice> {
        self.voices.clone()
    }

    fn speak(&self, utterance: Utterance, on_done: UtteranceCallback) {
        info!(
            voice = %utterance.voice.name,
            rate = utterance.rate,
            "Speaking: {:?}",
            utterance.text
        );
        on_done(UtteranceOutcome::Completed);
    }

    fn cancel(&self) {}

    fn is_speaking(&self) -> bool {
        false
    }
}
