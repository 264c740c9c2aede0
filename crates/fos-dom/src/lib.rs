//! fOS DOM - Document Object Model
//!
//! Arena-based DOM tree with the pieces custom elements build on:
//! attributes and class lists, selector queries, bubbling events,
//! the custom element registry and the intersection observation primitive.

mod node;
mod tree;
mod document;
mod classlist;
mod element;
mod dom_events;
mod custom_elements;
mod geometry;
mod observer;

pub use node::{Attribute, ElementData, Node, NodeData};
pub use tree::DomTree;
pub use document::Document;
pub use classlist::DOMTokenList;
pub use element::{ElementQuery, Selector};
pub use dom_events::{DomEvent, EventDetail, EventDispatcher, EventListener};
pub use custom_elements::{
    CustomElementDefinition, CustomElementError, CustomElementRegistry,
    LifecycleCallback, LifecycleCallbackInfo,
};
pub use geometry::DOMRect;
pub use observer::{
    IntersectionObserver, IntersectionObserverEntry, IntersectionObserverInit,
    IntersectionObserverManager, IntersectionObserverStats, MarginValue, ObserverId, RootMargin,
};

/// Node identifier (index into arena)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) u32);

impl NodeId {
    /// Document node ID
    pub const ROOT: NodeId = NodeId(0);
    /// Sentinel for "no node"
    pub const NONE: NodeId = NodeId(u32::MAX);

    #[inline]
    pub fn is_valid(self) -> bool {
        self != Self::NONE
    }

    /// Raw arena index
    #[inline]
    pub fn index(self) -> u32 {
        self.0
    }
}

/// DOM errors
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DomError {
    #[error("'{0}' is not a valid selector")]
    InvalidSelector(String),

    #[error("Node {0:?} does not exist")]
    NotFound(NodeId),

    #[error("Node {0:?} is not an element")]
    NotAnElement(NodeId),

    #[error("The new child element contains the parent")]
    HierarchyRequest,

    #[error("Node {child:?} is not a child of {parent:?}")]
    NotAChild { parent: NodeId, child: NodeId },

    #[error("Failed to parse rootMargin '{0}': must be specified in pixels or percent")]
    InvalidRootMargin(String),

    #[error("Threshold values must be numbers between 0 and 1, got {0}")]
    ThresholdOutOfRange(f64),

    #[error("Intersection observer {0:?} does not exist")]
    UnknownObserver(ObserverId),
}
