//! Accessibility profiles and the overlay controller that decides when
//! hover speech runs.

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::dom::Document;
use crate::hover::{EnablementSignal, HoverOutcome, HoverSpeechRouter, PointerEvent};
use crate::tts::SpeechOutputManager;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AccessibilityProfile {
    Blind,
    Elderly,
    #[serde(rename = "Motor Impaired")]
    MotorImpaired,
    #[serde(rename = "Visually Impaired")]
    VisuallyImpaired,
    #[serde(rename = "Color Blind")]
    ColorBlind,
    Dyslexia,
    #[serde(rename = "Cognitive & Learning")]
    CognitiveAndLearning,
    #[serde(rename = "Seizure & Epileptic")]
    SeizureAndEpileptic,
    #[serde(rename = "ADHD")]
    Adhd,
}

impl AccessibilityProfile {
    pub const ALL: [Self; 9] = [
        Self::Blind,
        Self::Elderly,
        Self::MotorImpaired,
        Self::VisuallyImpaired,
        Self::ColorBlind,
        Self::Dyslexia,
        Self::CognitiveAndLearning,
        Self::SeizureAndEpileptic,
        Self::Adhd,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Self::Blind => "Blind",
            Self::Elderly => "Elderly",
            Self::MotorImpaired => "Motor Impaired",
            Self::VisuallyImpaired => "Visually Impaired",
            Self::ColorBlind => "Color Blind",
            Self::Dyslexia => "Dyslexia",
            Self::CognitiveAndLearning => "Cognitive & Learning",
            Self::SeizureAndEpileptic => "Seizure & Epileptic",
            Self::Adhd => "ADHD",
        }
    }

    pub fn enables_hover_speech(self) -> bool {
        self == Self::Blind
    }
}

impl fmt::Display for AccessibilityProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Owns the active profile, the speech manager and the hover router for one
/// document.
pub struct AccessibilityOverlay<N: Copy + Eq + fmt::Debug> {
    manager: SpeechOutputManager,
    router: HoverSpeechRouter<N>,
    signal: EnablementSignal,
    active: Option<AccessibilityProfile>,
    announcement: String,
}

impl<N: Copy + Eq + fmt::Debug> fmt::Debug for AccessibilityOverlay<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccessibilityOverlay")
            .field("active", &self.active)
            .field("hover_speech", &self.signal.get())
            .field("router", &self.router)
            .finish_non_exhaustive()
    }
}

impl<N: Copy + Eq + fmt::Debug> AccessibilityOverlay<N> {
    /// `announcement` is read aloud when the Blind profile switches on.
    pub fn new(manager: SpeechOutputManager, announcement: impl Into<String>) -> Self {
        let signal = EnablementSignal::default();
        let router = HoverSpeechRouter::new(manager.clone(), signal.clone());
        Self {
            manager,
            router,
            signal,
            active: None,
            announcement: announcement.into(),
        }
    }

    pub fn active_profile(&self) -> Option<AccessibilityProfile> {
        self.active
    }

    pub fn hover_speech_enabled(&self) -> bool {
        self.signal.get()
    }

    pub fn manager(&self) -> &SpeechOutputManager {
        &self.manager
    }

    pub fn router(&self) -> &HoverSpeechRouter<N> {
        &self.router
    }

    /// Select `profile`, or clear it when it is already active.
    ///
    /// Turning on Blind waits for any current speech to fall silent, reads
    /// the announcement, and enables hover speech once the announcement has
    /// finished, so the two never overlap.
    pub async fn toggle_profile(&mut self, profile: AccessibilityProfile) {
        if self.active == Some(profile) {
            self.active = None;
            info!("Accessibility profile cleared: {}", profile);
            if profile.enables_hover_speech() {
                self.switch_off_hover_speech().await;
            }
            return;
        }

        let had_hover_speech = self.active.is_some_and(AccessibilityProfile::enables_hover_speech);
        self.active = Some(profile);
        info!("Accessibility profile selected: {}", profile);

        if profile.enables_hover_speech() {
            self.manager.stop_and_await().await;
            let signal = self.signal.clone();
            let submitted = self
                .manager
                .speak(&self.announcement, Some(Box::new(move || signal.set(true))));
            if !submitted {
                self.signal.set(true);
            }
        } else if had_hover_speech {
            self.switch_off_hover_speech().await;
        }
    }

    async fn switch_off_hover_speech(&mut self) {
        self.router.disable();
        self.manager.stop_and_await().await;
    }

    /// Re-select voices for a new UI locale.
    pub async fn change_locale(&self, locale: &str) {
        self.manager.initialize(locale).await;
    }

    pub fn handle<D>(&mut self, doc: &D, event: PointerEvent<N>) -> HoverOutcome
    where
        D: Document<Node = N>,
    {
        self.router.handle(doc, event)
    }
}
