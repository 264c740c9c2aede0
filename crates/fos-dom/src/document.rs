//! Document - High-level document API
//!
//! Wraps the tree with everything that has document scope: the custom
//! element registry and its pending lifecycle reactions, event listeners
//! and the intersection observers.

use crate::dom_events::EventListeners;
use crate::{
    CustomElementRegistry, DOMTokenList, DomError, DomEvent, DomTree, ElementQuery,
    EventDispatcher, IntersectionObserverManager, LifecycleCallback, LifecycleCallbackInfo,
    NodeId,
};
use std::rc::Rc;

/// HTML Document
#[derive(Debug)]
pub struct Document {
    /// The DOM tree
    pub tree: DomTree,
    /// Cached reference to <html> element
    html_element: NodeId,
    /// Cached reference to <head> element
    head_element: NodeId,
    /// Cached reference to <body> element
    body_element: NodeId,
    custom_elements: CustomElementRegistry,
    reactions: Vec<LifecycleCallbackInfo>,
    listeners: EventListeners,
    observers: IntersectionObserverManager,
}

impl Document {
    /// Create a new document with html/head/body
    pub fn new() -> Self {
        let mut doc = Self::empty();
        let tree = &mut doc.tree;

        let html = tree.create_element("html");
        let head = tree.create_element("head");
        let body = tree.create_element("body");

        // Fresh detached nodes under valid parents; cannot fail
        let _ = tree.append_child(NodeId::ROOT, html);
        let _ = tree.append_child(html, head);
        let _ = tree.append_child(html, body);

        doc.html_element = html;
        doc.head_element = head;
        doc.body_element = body;
        doc
    }

    /// Create an empty document (no structure)
    pub fn empty() -> Self {
        Self {
            tree: DomTree::new(),
            html_element: NodeId::NONE,
            head_element: NodeId::NONE,
            body_element: NodeId::NONE,
            custom_elements: CustomElementRegistry::new(),
            reactions: Vec::new(),
            listeners: EventListeners::default(),
            observers: IntersectionObserverManager::new(),
        }
    }

    /// Locate html/head/body after the tree was built externally
    pub fn finalize(&mut self) {
        let find = |tree: &DomTree, parent: NodeId, tag: &str| {
            tree.children(parent)
                .find(|(_, n)| n.as_element().is_some_and(|e| e.tag_name == tag))
                .map(|(id, _)| id)
                .unwrap_or(NodeId::NONE)
        };
        self.html_element = find(&self.tree, NodeId::ROOT, "html");
        self.head_element = find(&self.tree, self.html_element, "head");
        self.body_element = find(&self.tree, self.html_element, "body");
    }

    /// Get <html> element
    pub fn document_element(&self) -> NodeId {
        self.html_element
    }

    /// Get <head> element
    pub fn head(&self) -> NodeId {
        self.head_element
    }

    /// Get <body> element
    pub fn body(&self) -> NodeId {
        self.body_element
    }

    /// Access the DOM tree
    pub fn tree(&self) -> &DomTree {
        &self.tree
    }

    /// Access the DOM tree mutably
    pub fn tree_mut(&mut self) -> &mut DomTree {
        &mut self.tree
    }

    /// Get element by ID
    pub fn get_element_by_id(&self, id: &str) -> Option<NodeId> {
        self.tree
            .descendants(NodeId::ROOT)
            .into_iter()
            .find(|&node| self.tree.element(node).and_then(|e| e.id()) == Some(id))
    }

    pub fn is_connected(&self, node: NodeId) -> bool {
        self.tree.is_connected(node)
    }

    // ------------------------------------------------------------------
    // Tree mutation with custom element reactions
    // ------------------------------------------------------------------

    pub fn create_element(&mut self, tag_name: &str) -> NodeId {
        self.tree.create_element(tag_name)
    }

    pub fn create_text(&mut self, content: &str) -> NodeId {
        self.tree.create_text(content)
    }

    /// Append a child, queueing disconnected/connected reactions for
    /// defined custom elements whose connectedness changes
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) -> Result<(), DomError> {
        let was_connected = self.tree.is_connected(child);
        self.tree.append_child(parent, child)?;
        if was_connected {
            self.queue_reactions(child, LifecycleCallback::Disconnected);
        }
        if self.tree.is_connected(child) {
            self.queue_reactions(child, LifecycleCallback::Connected);
        }
        Ok(())
    }

    /// Remove a child, queueing disconnected reactions
    pub fn remove_child(&mut self, parent: NodeId, child: NodeId) -> Result<(), DomError> {
        let was_connected = self.tree.is_connected(child);
        self.tree.remove_child(parent, child)?;
        if was_connected {
            self.queue_reactions(child, LifecycleCallback::Disconnected);
        }
        Ok(())
    }

    fn queue_reactions(&mut self, subtree: NodeId, callback: LifecycleCallback) {
        let nodes = std::iter::once(subtree).chain(self.tree.descendants(subtree));
        for element in nodes {
            let Some(data) = self.tree.element(element) else { continue };
            if self.custom_elements.is_defined(&data.tag_name) {
                self.reactions.push(LifecycleCallbackInfo {
                    callback,
                    element,
                    name: data.tag_name.clone(),
                });
            }
        }
    }

    /// Drain queued lifecycle reactions in the order they happened
    pub fn take_reactions(&mut self) -> Vec<LifecycleCallbackInfo> {
        std::mem::take(&mut self.reactions)
    }

    pub fn custom_elements(&self) -> &CustomElementRegistry {
        &self.custom_elements
    }

    pub fn custom_elements_mut(&mut self) -> &mut CustomElementRegistry {
        &mut self.custom_elements
    }

    // ------------------------------------------------------------------
    // Attributes and classes
    // ------------------------------------------------------------------

    pub fn get_attribute(&self, element: NodeId, name: &str) -> Option<&str> {
        self.tree.element(element)?.get_attr(name)
    }

    pub fn set_attribute(&mut self, element: NodeId, name: &str, value: &str) -> Result<(), DomError> {
        self.element_data_mut(element)?.set_attr(name, value);
        Ok(())
    }

    pub fn class_list(&self, element: NodeId) -> Option<DOMTokenList> {
        self.tree.element(element).map(|e| e.class_list())
    }

    /// classList.toggle(token, force)
    pub fn toggle_class(&mut self, element: NodeId, token: &str, force: Option<bool>) -> Result<bool, DomError> {
        let data = self.element_data_mut(element)?;
        let mut list = data.class_list();
        let state = list.toggle(token, force);
        data.set_class_list(&list);
        Ok(state)
    }

    fn element_data_mut(&mut self, element: NodeId) -> Result<&mut crate::ElementData, DomError> {
        match self.tree.get_mut(element) {
            Some(node) => node.as_element_mut().ok_or(DomError::NotAnElement(element)),
            None => Err(DomError::NotFound(element)),
        }
    }

    pub fn query_selector(&self, root: NodeId, selector: &str) -> Result<Option<NodeId>, DomError> {
        self.tree.query_selector(root, selector)
    }

    pub fn query_selector_all(&self, root: NodeId, selector: &str) -> Result<Vec<NodeId>, DomError> {
        self.tree.query_selector_all(root, selector)
    }

    // ------------------------------------------------------------------
    // Events and observers
    // ------------------------------------------------------------------

    pub fn add_event_listener<F>(&mut self, target: NodeId, event_type: &str, listener: F)
    where
        F: Fn(&mut DomEvent) + 'static,
    {
        self.listeners.add(target, event_type, Rc::new(listener));
    }

    pub fn observers(&self) -> &IntersectionObserverManager {
        &self.observers
    }

    pub fn observers_mut(&mut self) -> &mut IntersectionObserverManager {
        &mut self.observers
    }
}

impl EventDispatcher for Document {
    fn dispatch_event(&mut self, mut event: DomEvent) -> bool {
        self.listeners.dispatch(&self.tree, &mut event)
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}
