//! In-memory element tree with generational node ids.
//!
//! Removing a node frees its slot and bumps the slot generation, so stale
//! [`NodeId`]s held elsewhere (for example by a hover session) fail with
//! [`DomError::Detached`] instead of aliasing a new node.

use super::{BoxSize, Document};
use crate::error::DomError;

/// Identifier for a node in the tree (slot, generation).
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct NodeId(u32, u32);

impl NodeId {
    const fn new(idx: usize, generation: u32) -> Self {
        Self(idx as u32, generation)
    }

    const fn idx(self) -> usize {
        self.0 as usize
    }
}

const DEFAULT_SIZE: BoxSize = BoxSize::new(120.0, 24.0);

/// Element data plus a small builder for assembling documents.
#[derive(Clone, Debug)]
pub struct Element {
    tag: String,
    attributes: Vec<(String, String)>,
    text: String,
    value: Option<String>,
    size: BoxSize,
    hidden: bool,
}

impl Element {
    pub fn new(tag: &str) -> Self {
        Self {
            tag: tag.to_ascii_lowercase(),
            attributes: Vec::new(),
            text: String::new(),
            value: None,
            size: DEFAULT_SIZE,
            hidden: false,
        }
    }

    pub fn attr(mut self, name: &str, value: &str) -> Self {
        self.set_attr(name, value);
        self
    }

    /// Text rendered directly inside the element, ahead of its children.
    pub fn text(mut self, text: &str) -> Self {
        self.text = text.to_string();
        self
    }

    pub fn value(mut self, value: &str) -> Self {
        self.value = Some(value.to_string());
        self
    }

    pub fn size(mut self, width: f64, height: f64) -> Self {
        self.size = BoxSize::new(width, height);
        self
    }

    /// `visibility: hidden`.
    pub fn hidden(mut self) -> Self {
        self.hidden = true;
        self
    }

    fn set_attr(&mut self, name: &str, value: &str) {
        let name = name.to_ascii_lowercase();
        match self.attributes.iter_mut().find(|(k, _)| *k == name) {
            Some((_, v)) => *v = value.to_string(),
            None => self.attributes.push((name, value.to_string())),
        }
    }

    fn get_attr(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

#[derive(Clone, Debug)]
struct Node {
    generation: u32,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    element: Element,
}

/// Arena-backed document. Slot 0 holds the `<html>` root.
#[derive(Clone, Debug)]
pub struct DomTree {
    nodes: Vec<Option<Node>>,
    generations: Vec<u32>,
    free_list: Vec<usize>,
    root: NodeId,
}

impl Default for DomTree {
    fn default() -> Self {
        Self::new()
    }
}

impl DomTree {
    pub fn new() -> Self {
        let root = Node {
            generation: 1,
            parent: None,
            children: Vec::new(),
            element: Element::new("html"),
        };
        Self {
            nodes: vec![Some(root)],
            generations: vec![1],
            free_list: Vec::new(),
            root: NodeId::new(0, 1),
        }
    }

    /// Append `element` as the last child of `parent`.
    pub fn append(&mut self, parent: NodeId, element: Element) -> Result<NodeId, DomError> {
        self.node(parent)?;

        let idx = match self.free_list.pop() {
            Some(idx) => idx,
            None => {
                self.nodes.push(None);
                self.generations.push(0);
                self.nodes.len() - 1
            }
        };
        let generation = self.generations[idx] + 1;
        self.generations[idx] = generation;

        let id = NodeId::new(idx, generation);
        self.nodes[idx] = Some(Node {
            generation,
            parent: Some(parent),
            children: Vec::new(),
            element,
        });
        self.node_mut(parent)?.children.push(id);
        Ok(id)
    }

    /// Remove `id` and its whole subtree. The root cannot be removed.
    pub fn remove(&mut self, id: NodeId) -> Result<(), DomError> {
        if id == self.root {
            return Err(DomError::Detached(format!("{:?} is the document root", id)));
        }
        let parent = self.node(id)?.parent;
        if let Some(parent) = parent {
            self.node_mut(parent)?.children.retain(|c| *c != id);
        }

        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            if let Some(node) = self.nodes[current.idx()].take() {
                stack.extend(node.children);
                self.free_list.push(current.idx());
            }
        }
        Ok(())
    }

    pub fn set_attribute(&mut self, id: NodeId, name: &str, value: &str) -> Result<(), DomError> {
        self.node_mut(id)?.element.set_attr(name, value);
        Ok(())
    }

    pub fn set_value(&mut self, id: NodeId, value: &str) -> Result<(), DomError> {
        self.node_mut(id)?.element.value = Some(value.to_string());
        Ok(())
    }

    pub fn is_alive(&self, id: NodeId) -> bool {
        self.node(id).is_ok()
    }

    /// `id` and all of its descendants, depth-first in document order.
    pub fn descendants(&self, id: NodeId) -> Result<Vec<NodeId>, DomError> {
        let mut out = Vec::new();
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            let node = self.node(current)?;
            out.push(current);
            stack.extend(node.children.iter().rev().copied());
        }
        Ok(out)
    }

    /// First element in document order whose `id` attribute equals `dom_id`.
    pub fn find_by_id(&self, dom_id: &str) -> Option<NodeId> {
        self.descendants(self.root)
            .ok()?
            .into_iter()
            .find(|n| matches!(self.attribute(*n, "id"), Ok(Some(v)) if v == dom_id))
    }

    fn node(&self, id: NodeId) -> Result<&Node, DomError> {
        self.nodes
            .get(id.idx())
            .and_then(Option::as_ref)
            .filter(|n| n.generation == id.1)
            .ok_or_else(|| DomError::Detached(format!("{:?}", id)))
    }

    fn node_mut(&mut self, id: NodeId) -> Result<&mut Node, DomError> {
        self.nodes
            .get_mut(id.idx())
            .and_then(Option::as_mut)
            .filter(|n| n.generation == id.1)
            .ok_or_else(|| DomError::Detached(format!("{:?}", id)))
    }

    fn collect_text(&self, id: NodeId, out: &mut Vec<String>) -> Result<(), DomError> {
        let node = self.node(id)?;
        if node.element.hidden || node.element.size.is_empty() {
            return Ok(());
        }
        if !node.element.text.trim().is_empty() {
            out.push(node.element.text.clone());
        }
        for child in &node.children {
            self.collect_text(*child, out)?;
        }
        Ok(())
    }
}

impl Document for DomTree {
    type Node = NodeId;

    fn root(&self) -> NodeId {
        self.root
    }

    fn parent(&self, node: NodeId) -> Result<Option<NodeId>, DomError> {
        Ok(self.node(node)?.parent)
    }

    fn children(&self, node: NodeId) -> Result<Vec<NodeId>, DomError> {
        Ok(self.node(node)?.children.clone())
    }

    fn tag_name(&self, node: NodeId) -> Result<&str, DomError> {
        Ok(self.node(node)?.element.tag.as_str())
    }

    fn attribute(&self, node: NodeId, name: &str) -> Result<Option<&str>, DomError> {
        Ok(self.node(node)?.element.get_attr(name))
    }

    fn bounding_size(&self, node: NodeId) -> Result<BoxSize, DomError> {
        Ok(self.node(node)?.element.size)
    }

    fn is_visibility_hidden(&self, node: NodeId) -> Result<bool, DomError> {
        let mut current = Some(node);
        while let Some(id) = current {
            let n = self.node(id)?;
            if n.element.hidden {
                return Ok(true);
            }
            current = n.parent;
        }
        Ok(false)
    }

    fn inner_text(&self, node: NodeId) -> Result<String, DomError> {
        let mut pieces = Vec::new();
        self.collect_text(node, &mut pieces)?;
        Ok(pieces.join(" "))
    }

    fn value(&self, node: NodeId) -> Result<Option<String>, DomError> {
        let element = &self.node(node)?.element;
        Ok(element
            .value
            .clone()
            .or_else(|| element.get_attr("value").map(str::to_string)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> (DomTree, NodeId, NodeId, NodeId) {
        let mut doc = DomTree::new();
        let body = doc.append(doc.root(), Element::new("BODY")).unwrap();
        let p = doc
            .append(body, Element::new("p").text("Hello").attr("ID", "greeting"))
            .unwrap();
        let em = doc.append(p, Element::new("em").text("there")).unwrap();
        (doc, body, p, em)
    }

    #[test]
    fn tags_and_attributes_are_case_insensitive() {
        let (doc, body, p, _) = sample();
        assert_eq!(doc.tag_name(body).unwrap(), "body");
        assert_eq!(doc.attribute(p, "id").unwrap(), Some("greeting"));
        assert_eq!(doc.attribute(p, "Id").unwrap(), Some("greeting"));
        assert_eq!(doc.attribute(p, "title").unwrap(), None);
    }

    #[test]
    fn parent_and_children() {
        let (doc, body, p, em) = sample();
        assert_eq!(doc.parent(em).unwrap(), Some(p));
        assert_eq!(doc.parent(body).unwrap(), Some(doc.root()));
        assert_eq!(doc.parent(doc.root()).unwrap(), None);
        assert_eq!(doc.children(p).unwrap(), vec![em]);
    }

    #[test]
    fn inner_text_concatenates_visible_descendants() {
        let (mut doc, _, p, _) = sample();
        doc.append(p, Element::new("span").text("secret").hidden())
            .unwrap();
        doc.append(p, Element::new("span").text("collapsed").size(0.0, 0.0))
            .unwrap();
        assert_eq!(doc.inner_text(p).unwrap(), "Hello there");
    }

    #[test]
    fn visibility_is_inherited() {
        let mut doc = DomTree::new();
        let hidden = doc
            .append(doc.root(), Element::new("div").hidden())
            .unwrap();
        let child = doc.append(hidden, Element::new("p").text("x")).unwrap();
        assert!(doc.is_visibility_hidden(child).unwrap());
        assert!(!doc.is_visibility_hidden(doc.root()).unwrap());
    }

    #[test]
    fn removed_nodes_are_detached() {
        let (mut doc, body, p, em) = sample();
        doc.remove(p).unwrap();
        assert!(!doc.is_alive(p));
        assert!(!doc.is_alive(em));
        assert!(matches!(doc.tag_name(em), Err(DomError::Detached(_))));
        assert!(doc.children(body).unwrap().is_empty());
    }

    #[test]
    fn recycled_slots_do_not_alias_stale_ids() {
        let (mut doc, body, p, _) = sample();
        doc.remove(p).unwrap();
        let fresh = doc.append(body, Element::new("h1")).unwrap();
        assert_ne!(fresh, p);
        assert!(doc.tag_name(p).is_err());
        assert_eq!(doc.tag_name(fresh).unwrap(), "h1");
    }

    #[test]
    fn root_cannot_be_removed() {
        let mut doc = DomTree::new();
        let root = doc.root();
        assert!(doc.remove(root).is_err());
    }

    #[test]
    fn value_prefers_live_value_over_attribute() {
        let mut doc = DomTree::new();
        let input = doc
            .append(doc.root(), Element::new("input").attr("value", "initial"))
            .unwrap();
        assert_eq!(doc.value(input).unwrap().as_deref(), Some("initial"));
        doc.set_value(input, "typed").unwrap();
        assert_eq!(doc.value(input).unwrap().as_deref(), Some("typed"));
    }

    #[test]
    fn lookup_by_id_and_descendant_order() {
        let (doc, body, p, em) = sample();
        assert_eq!(doc.find_by_id("greeting"), Some(p));
        assert_eq!(doc.find_by_id("nope"), None);
        assert_eq!(
            doc.descendants(doc.root()).unwrap(),
            vec![doc.root(), body, p, em]
        );
    }
}
