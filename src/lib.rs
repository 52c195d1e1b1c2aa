//! Hover-driven text-to-speech for an accessibility overlay.
//!
//! Two pieces cooperate:
//!
//! - [`tts::SpeechOutputManager`] owns the platform speech engine: voice
//!   selection persisted across sessions, rate, and one-at-a-time playback
//!   with an awaitable stop.
//! - [`hover::HoverSpeechRouter`] watches pointer movement over a
//!   [`dom::Document`], picks one speech root per hover, extracts its text
//!   and hands new announcements to the manager.
//!
//! [`profile::AccessibilityOverlay`] switches the router on and off from the
//! selected accessibility profile.

pub mod config;
pub mod dom;
pub mod error;
pub mod hover;
pub mod profile;
pub mod tts;

pub use config::SpeechConfig;
pub use hover::{HoverOutcome, HoverSpeechRouter, PointerEvent};
pub use profile::{AccessibilityOverlay, AccessibilityProfile};
pub use tts::SpeechOutputManager;
