//! Read-only view of a rendered document, as far as hover speech needs it.
//!
//! A browser binding implements [`Document`] over live DOM nodes; [`DomTree`]
//! is an in-memory implementation for tests and offline replay.

pub mod tags;
pub mod tree;

use std::fmt;

use crate::error::DomError;

pub use tree::{DomTree, Element, NodeId};

/// Rendered border-box size of an element.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct BoxSize {
    pub width: f64,
    pub height: f64,
}

impl BoxSize {
    pub const ZERO: Self = Self {
        width: 0.0,
        height: 0.0,
    };

    pub const fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    /// True when either side collapses to nothing.
    pub fn is_empty(&self) -> bool {
        self.width <= 0.0 || self.height <= 0.0
    }
}

/// Queries over element nodes. Every query fails with
/// [`DomError::Detached`] once a node has left the document.
pub trait Document {
    /// Node handle. Equality is node identity; handles never keep a node
    /// alive.
    type Node: Copy + Eq + fmt::Debug;

    fn root(&self) -> Self::Node;

    fn parent(&self, node: Self::Node) -> Result<Option<Self::Node>, DomError>;

    /// Element children in document order.
    fn children(&self, node: Self::Node) -> Result<Vec<Self::Node>, DomError>;

    fn tag_name(&self, node: Self::Node) -> Result<&str, DomError>;

    fn attribute(&self, node: Self::Node, name: &str) -> Result<Option<&str>, DomError>;

    fn bounding_size(&self, node: Self::Node) -> Result<BoxSize, DomError>;

    /// Computed `visibility: hidden`. Whether a descendant can override a
    /// hidden ancestor is up to the implementation; [`DomTree`] treats
    /// hidden as inherited by the whole subtree.
    fn is_visibility_hidden(&self, node: Self::Node) -> Result<bool, DomError>;

    /// Rendered text of the element and its visible descendants.
    fn inner_text(&self, node: Self::Node) -> Result<String, DomError>;

    /// Current value of a form control.
    fn value(&self, node: Self::Node) -> Result<Option<String>, DomError>;
}
