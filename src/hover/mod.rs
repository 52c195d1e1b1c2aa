//! Hover speech routing.
//!
//! [`HoverSpeechRouter`] turns pointer-over and pointer-out events into at
//! most one utterance per logical hover. It resolves a speech root for the
//! hovered element, extracts its text, drops repeats of the last accepted
//! announcement, and forwards the rest to a [`SpeechOutputManager`].
//!
//! ## States
//!
//! - `Disabled`: events are ignored. Initial state, and the state after
//!   teardown.
//! - `Armed`: enabled with an empty session.
//! - `Speaking`: an announcement was accepted; a pointer-out or a newer
//!   accepted announcement leaves this state.
//!
//! The router reads an [`EnablementSignal`] on every event, so whoever owns
//! the accessibility profile can switch it on and off without holding the
//! router.

pub mod resolve;

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::debug;

use crate::config::SpeechConfig;
use crate::dom::Document;
use crate::error::DomError;
use crate::tts::SpeechOutputManager;

pub use resolve::{
    find_speech_root, get_text_to_convert_to_speech, normalize_text, should_read_tag_content,
};

/// Shared on/off switch for hover speech.
#[derive(Debug, Clone, Default)]
pub struct EnablementSignal(Arc<AtomicBool>);

impl EnablementSignal {
    pub fn new(enabled: bool) -> Self {
        Self(Arc::new(AtomicBool::new(enabled)))
    }

    pub fn set(&self, enabled: bool) {
        self.0.store(enabled, Ordering::SeqCst);
    }

    pub fn get(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Pointer events the router consumes, each carrying its target element.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerEvent<N> {
    Over(N),
    Out(N),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouterState {
    Disabled,
    Armed,
    Speaking,
}

/// What the router did with one event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HoverOutcome {
    /// Hover speech is off.
    Disabled,
    /// No element on the path qualified, or the document query failed.
    NoSpeechRoot,
    /// A root was found but it had nothing long enough to say.
    NoText,
    /// Same element or same text as the last announcement.
    Repeated,
    /// Forwarded to the output manager.
    Spoken(String),
    /// Pointer left; session cleared and speech stopped.
    Reset,
}

/// Identity of the last accepted announcement. All fields are cleared
/// together.
#[derive(Clone, PartialEq, Eq)]
pub struct HoverSpeechSession<N> {
    last_spoken_element: Option<N>,
    last_spoken_text: Option<String>,
    last_utterance_id: Option<String>,
}

impl<N> Default for HoverSpeechSession<N> {
    fn default() -> Self {
        Self {
            last_spoken_element: None,
            last_spoken_text: None,
            last_utterance_id: None,
        }
    }
}

impl<N: fmt::Debug> fmt::Debug for HoverSpeechSession<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HoverSpeechSession")
            .field("last_spoken_element", &self.last_spoken_element)
            .field("last_spoken_text", &self.last_spoken_text)
            .field("last_utterance_id", &self.last_utterance_id)
            .finish()
    }
}

impl<N: Copy + Eq> HoverSpeechSession<N> {
    pub fn last_spoken_element(&self) -> Option<N> {
        self.last_spoken_element
    }

    pub fn last_spoken_text(&self) -> Option<&str> {
        self.last_spoken_text.as_deref()
    }

    pub fn last_utterance_id(&self) -> Option<&str> {
        self.last_utterance_id.as_deref()
    }

    pub fn is_empty(&self) -> bool {
        self.last_spoken_element.is_none()
            && self.last_spoken_text.is_none()
            && self.last_utterance_id.is_none()
    }

    /// Any single match counts as a repeat.
    fn is_repeat(&self, element: N, text: &str, utterance_id: &str) -> bool {
        self.last_spoken_element == Some(element)
            || self.last_spoken_text.as_deref() == Some(text)
            || self.last_utterance_id.as_deref() == Some(utterance_id)
    }

    fn record(&mut self, element: N, text: String, utterance_id: String) {
        self.last_spoken_element = Some(element);
        self.last_spoken_text = Some(text);
        self.last_utterance_id = Some(utterance_id);
    }

    fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Composite key of an announcement: tag name plus text.
pub fn utterance_id(tag_name: &str, text: &str) -> String {
    format!("{}:{}", tag_name.to_ascii_lowercase(), text)
}

/// Per-document hover speech state machine.
pub struct HoverSpeechRouter<N: Copy + Eq + fmt::Debug> {
    manager: SpeechOutputManager,
    signal: EnablementSignal,
    session: HoverSpeechSession<N>,
    state: RouterState,
}

impl<N: Copy + Eq + fmt::Debug> fmt::Debug for HoverSpeechRouter<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HoverSpeechRouter")
            .field("state", &self.state)
            .field("session", &self.session)
            .finish_non_exhaustive()
    }
}

impl<N: Copy + Eq + fmt::Debug> HoverSpeechRouter<N> {
    pub fn new(manager: SpeechOutputManager, signal: EnablementSignal) -> Self {
        Self {
            manager,
            signal,
            session: HoverSpeechSession::default(),
            state: RouterState::Disabled,
        }
    }

    pub fn state(&self) -> RouterState {
        self.state
    }

    pub fn session(&self) -> &HoverSpeechSession<N> {
        &self.session
    }

    pub fn signal(&self) -> &EnablementSignal {
        &self.signal
    }

    pub fn handle<D>(&mut self, doc: &D, event: PointerEvent<N>) -> HoverOutcome
    where
        D: Document<Node = N>,
    {
        match event {
            PointerEvent::Over(target) => self.pointer_over(doc, target),
            PointerEvent::Out(_) => self.pointer_out(),
        }
    }

    pub fn pointer_over<D>(&mut self, doc: &D, target: N) -> HoverOutcome
    where
        D: Document<Node = N>,
    {
        if !self.sync_enablement() {
            return HoverOutcome::Disabled;
        }

        let config = self.manager.config();
        let (root, tag, text) = match resolve_announcement(doc, target, config) {
            Ok(Some(found)) => found,
            Ok(None) => return HoverOutcome::NoSpeechRoot,
            Err(e) => {
                debug!("Hover target unusable: {}", e);
                return HoverOutcome::NoSpeechRoot;
            }
        };

        let Some(text) = text.filter(|t| t.chars().count() >= config.min_text_chars) else {
            debug!(?root, "Speech root has no usable text");
            return HoverOutcome::NoText;
        };

        let id = utterance_id(&tag, &text);
        if self.session.is_repeat(root, &text, &id) {
            return HoverOutcome::Repeated;
        }

        debug!(?root, "Hover speech: {:?}", text);
        self.session.record(root, text.clone(), id);
        self.manager.speak(&text, None);
        self.state = RouterState::Speaking;
        HoverOutcome::Spoken(text)
    }

    /// Leaving any element clears the session and silences speech.
    pub fn pointer_out(&mut self) -> HoverOutcome {
        if !self.sync_enablement() {
            return HoverOutcome::Disabled;
        }
        self.session.reset();
        self.manager.stop();
        self.state = RouterState::Armed;
        HoverOutcome::Reset
    }

    /// Switch off: clear the session, stop speech and lower the signal.
    pub fn disable(&mut self) {
        self.signal.set(false);
        self.session.reset();
        self.manager.stop();
        self.state = RouterState::Disabled;
    }

    pub fn enable(&mut self) {
        self.signal.set(true);
        self.sync_enablement();
    }

    /// Follow the shared signal. Disabling through the signal clears the
    /// session but leaves speech alone, since the owner may be mid-way
    /// through its own announcement.
    fn sync_enablement(&mut self) -> bool {
        let enabled = self.signal.get();
        match (enabled, self.state) {
            (false, RouterState::Disabled) | (true, RouterState::Armed | RouterState::Speaking) => {}
            (false, _) => {
                self.session.reset();
                self.state = RouterState::Disabled;
            }
            (true, RouterState::Disabled) => {
                self.session.reset();
                self.state = RouterState::Armed;
            }
        }
        enabled
    }
}

impl<N: Copy + Eq + fmt::Debug> Drop for HoverSpeechRouter<N> {
    fn drop(&mut self) {
        if self.state != RouterState::Disabled {
            self.session.reset();
            self.manager.stop();
            self.state = RouterState::Disabled;
        }
    }
}

/// Speech root, its tag name and its extracted text, if any.
type Announcement<N> = (N, String, Option<String>);

fn resolve_announcement<D: Document>(
    doc: &D,
    target: D::Node,
    config: &SpeechConfig,
) -> Result<Option<Announcement<D::Node>>, DomError> {
    let Some(root) = find_speech_root(doc, target, config)? else {
        return Ok(None);
    };
    let tag = doc.tag_name(root)?.to_string();
    let text = get_text_to_convert_to_speech(doc, root, config)?;
    Ok(Some((root, tag, text)))
}
