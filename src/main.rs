use std::path::PathBuf;
use std::sync::Arc;

use serde::Deserialize;
use tracing_subscriber::EnvFilter;

use hover_speech::dom::{Document, DomTree, Element};
use hover_speech::error::DomError;
use hover_speech::tts::{JsonFileStore, LogCapability, Voice};
use hover_speech::{
    AccessibilityOverlay, AccessibilityProfile, PointerEvent, SpeechConfig, SpeechOutputManager,
};

/// One step of a hover trace, addressed by element `id`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "lowercase")]
enum TraceStep {
    Over(String),
    Out(String),
}

const DEFAULT_TRACE: &str = r#"[
    {"over": "nav-blog"},
    {"over": "nav-blog-label"},
    {"out": "nav-blog"},
    {"over": "title"},
    {"over": "intro-emphasis"},
    {"over": "intro"},
    {"over": "share-icon"},
    {"over": "sponsored"},
    {"over": "search"},
    {"out": "search"},
    {"over": "title"}
]"#;

#[tokio::main]
async fn main() {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // Configuration from environment
    let config = SpeechConfig::from_env().expect("Invalid speech configuration");
    let locale = std::env::var("HOVER_SPEECH_LOCALE").unwrap_or_else(|_| "en-US".to_string());
    let prefs_path = std::env::var("HOVER_SPEECH_PREFS")
        .unwrap_or_else(|_| "./speech-prefs.json".to_string());
    let announcement = std::env::var("HOVER_SPEECH_ANNOUNCEMENT")
        .unwrap_or_else(|_| "Screen reader enabled".to_string());
    let trace_json = match std::env::var("HOVER_SPEECH_TRACE") {
        Ok(path) => std::fs::read_to_string(&path).expect("Failed to read trace file"),
        Err(_) => DEFAULT_TRACE.to_string(),
    };
    let trace: Vec<TraceStep> = serde_json::from_str(&trace_json).expect("Invalid trace JSON");

    tracing::info!("Hover speech demo v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!("Locale: {}", locale);
    tracing::info!("Preferences: {}", prefs_path);

    let capability = Arc::new(LogCapability::new(vec![
        Voice::new("Daniel", "en-GB"),
        Voice::new("Samantha", "en-US"),
        Voice::new("Anna", "de-DE"),
        Voice::new("Zosia", "pl-PL"),
    ]));
    let store = Arc::new(JsonFileStore::new(PathBuf::from(prefs_path)));
    let manager = SpeechOutputManager::new(capability, store, config);
    manager.initialize(&locale).await;

    let doc = sample_article().expect("Failed to build sample document");

    let mut overlay = AccessibilityOverlay::new(manager, announcement);
    overlay.toggle_profile(AccessibilityProfile::Blind).await;

    for (step, entry) in trace.iter().enumerate() {
        let (dom_id, is_over) = match entry {
            TraceStep::Over(id) => (id.as_str(), true),
            TraceStep::Out(id) => (id.as_str(), false),
        };
        let Some(node) = doc.find_by_id(dom_id) else {
            tracing::warn!(step, "No element with id {:?}", dom_id);
            continue;
        };
        let event = if is_over {
            PointerEvent::Over(node)
        } else {
            PointerEvent::Out(node)
        };
        let outcome = overlay.handle(&doc, event);
        tracing::info!(step, element = dom_id, ?outcome, "Pointer event");
    }

    overlay.manager().stop_and_await().await;
}

/// A blog post page: navigation, an article, an opt-out ad slot and a
/// search box.
fn sample_article() -> Result<DomTree, DomError> {
    let mut doc = DomTree::new();
    let body = doc.append(doc.root(), Element::new("body"))?;

    let header = doc.append(body, Element::new("header"))?;
    let nav = doc.append(header, Element::new("nav"))?;
    let list = doc.append(nav, Element::new("ul"))?;
    for (id, label) in [("nav-home", "Home"), ("nav-blog", "Blog"), ("nav-about", "About")] {
        let item = doc.append(list, Element::new("li"))?;
        let link = doc.append(item, Element::new("a").attr("id", id).attr("href", "#"))?;
        doc.append(
            link,
            Element::new("span").attr("id", &format!("{}-label", id)).text(label),
        )?;
    }

    let main = doc.append(body, Element::new("main"))?;
    let article = doc.append(main, Element::new("article"))?;
    doc.append(
        article,
        Element::new("h1")
            .attr("id", "title")
            .text("Understanding ownership in practice"),
    )?;
    let intro = doc.append(
        article,
        Element::new("p")
            .attr("id", "intro")
            .text("Borrowing rules are easier than they look."),
    )?;
    doc.append(
        intro,
        Element::new("em")
            .attr("id", "intro-emphasis")
            .text("Really."),
    )?;

    let share = doc.append(
        article,
        Element::new("button")
            .attr("aria-label", "Share this post")
            .size(32.0, 32.0),
    )?;
    let icon = doc.append(share, Element::new("svg").size(24.0, 24.0))?;
    doc.append(icon, Element::new("path").attr("id", "share-icon"))?;

    let aside = doc.append(main, Element::new("aside").attr("data-no-speech", "true"))?;
    doc.append(
        aside,
        Element::new("p")
            .attr("id", "sponsored")
            .text("Sponsored content"),
    )?;

    let footer = doc.append(body, Element::new("footer"))?;
    doc.append(
        footer,
        Element::new("input")
            .attr("id", "search")
            .attr("type", "search")
            .attr("placeholder", "Search posts"),
    )?;

    Ok(doc)
}
