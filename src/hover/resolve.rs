//! Speech-root resolution and text extraction.
//!
//! From the element under the pointer, [`find_speech_root`] climbs toward the
//! document root and stops at the first element that
//! [`should_read_tag_content`] accepts. [`get_text_to_convert_to_speech`]
//! then picks that element's utterance from, in order:
//!
//! 1. the text override attribute,
//! 2. `aria-label`,
//! 3. `title`,
//! 4. the value or placeholder of a text input, or the value of a
//!    button-style input,
//! 5. rendered text, when the element is a link or holds only inline markup
//!    and textless elements such as icons and images.

use lazy_static::lazy_static;
use regex::Regex;

use crate::config::{Markers, SpeechConfig};
use crate::dom::{tags, Document};
use crate::error::DomError;

lazy_static! {
    static ref WHITESPACE: Regex = Regex::new(r"\s+").unwrap();
}

/// Collapse whitespace runs to single spaces and trim.
pub fn normalize_text(raw: &str) -> String {
    WHITESPACE.replace_all(raw.trim(), " ").into_owned()
}

/// Pick the element that anchors speech for a pointer over `target`.
///
/// The result is `target` or one of its ancestors, never the document root.
/// Entering an opt-out zone ends the search: nothing inside the zone, and
/// nothing above it, is chosen for this pointer position.
pub fn find_speech_root<D: Document>(
    doc: &D,
    target: D::Node,
    config: &SpeechConfig,
) -> Result<Option<D::Node>, DomError> {
    let root = doc.root();
    let mut current = Some(target);

    while let Some(node) = current {
        if node == root {
            break;
        }
        if has_flag(doc, node, &config.markers.opt_out)? {
            return Ok(None);
        }
        if should_read_tag_content(doc, node, config)? {
            return Ok(Some(node));
        }
        current = doc.parent(node)?;
    }

    Ok(None)
}

/// Whether `node` may serve as a speech root.
pub fn should_read_tag_content<D: Document>(
    doc: &D,
    node: D::Node,
    config: &SpeechConfig,
) -> Result<bool, DomError> {
    let markers = &config.markers;

    if doc.bounding_size(node)?.is_empty() || doc.is_visibility_hidden(node)? {
        return Ok(false);
    }
    if is_opted_out(doc, node, markers)? {
        return Ok(false);
    }

    let tag = doc.tag_name(node)?.to_ascii_lowercase();
    if tags::is_vector_graphics(&tag) {
        return Ok(false);
    }

    Ok(tags::is_speakable(&tag)
        || non_empty_attribute(doc, node, "aria-label")?.is_some()
        || non_empty_attribute(doc, node, "title")?.is_some()
        || has_role(doc, node, "button")?
        || has_flag(doc, node, &markers.opt_in)?)
}

/// The text to announce for a speech root, or `None` when it has nothing to
/// say. The returned text is whitespace-normalized but not length-checked.
pub fn get_text_to_convert_to_speech<D: Document>(
    doc: &D,
    node: D::Node,
    config: &SpeechConfig,
) -> Result<Option<String>, DomError> {
    let markers = &config.markers;

    for name in [markers.text_override.as_str(), "aria-label", "title"] {
        if let Some(text) = non_empty_attribute(doc, node, name)? {
            return Ok(Some(text));
        }
    }

    let tag = doc.tag_name(node)?.to_ascii_lowercase();
    let input_type = doc.attribute(node, "type")?;
    if tags::is_text_input(&tag, input_type) {
        let is_password = input_type.is_some_and(|t| t.trim().eq_ignore_ascii_case("password"));
        if !is_password {
            if let Some(value) = doc.value(node)?.map(|v| normalize_text(&v)) {
                if !value.is_empty() {
                    return Ok(Some(value));
                }
            }
        }
        return non_empty_attribute(doc, node, "placeholder");
    }
    if tags::is_button_input(&tag, input_type) {
        return Ok(doc
            .value(node)?
            .map(|v| normalize_text(&v))
            .filter(|v| !v.is_empty()));
    }

    let text = normalize_text(&doc.inner_text(node)?);
    if text.is_empty() {
        return Ok(None);
    }
    if tag == "a" || is_simple_container(doc, node)? {
        return Ok(Some(text));
    }

    Ok(None)
}

/// No element children, or only inline and textless ones.
fn is_simple_container<D: Document>(doc: &D, node: D::Node) -> Result<bool, DomError> {
    for child in doc.children(node)? {
        let tag = doc.tag_name(child)?.to_ascii_lowercase();
        if !tags::is_inline(&tag) && !tags::is_textless(&tag) {
            return Ok(false);
        }
    }
    Ok(true)
}

fn is_opted_out<D: Document>(doc: &D, node: D::Node, markers: &Markers) -> Result<bool, DomError> {
    let mut current = Some(node);
    while let Some(n) = current {
        if has_flag(doc, n, &markers.opt_out)? {
            return Ok(true);
        }
        current = doc.parent(n)?;
    }
    Ok(false)
}

/// Boolean attribute semantics: present and not literally `"false"`.
fn has_flag<D: Document>(doc: &D, node: D::Node, name: &str) -> Result<bool, DomError> {
    Ok(doc
        .attribute(node, name)?
        .is_some_and(|v| !v.trim().eq_ignore_ascii_case("false")))
}

fn has_role<D: Document>(doc: &D, node: D::Node, role: &str) -> Result<bool, DomError> {
    Ok(doc
        .attribute(node, "role")?
        .is_some_and(|r| r.split_whitespace().any(|r| r.eq_ignore_ascii_case(role))))
}

fn non_empty_attribute<D: Document>(
    doc: &D,
    node: D::Node,
    name: &str,
) -> Result<Option<String>, DomError> {
    Ok(doc
        .attribute(node, name)?
        .map(normalize_text)
        .filter(|v| !v.is_empty()))
}
