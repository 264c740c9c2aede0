//! Hosting context
//!
//! [`IntObsHost`] owns what a page would: the document, the observer pool,
//! the upgraded `<int-obs>` instances and the callbacks of observers created
//! from code. It runs custom element reactions after tree mutations and
//! delivers queued intersection records to the right callback.

use crate::{translate, IntObs, IntObsError, ObservationConfig, ObserverPool, Threshold, TAG_NAME};
use fos_dom::{
    Document, DomEvent, IntersectionObserverEntry, IntersectionObserverInit, LifecycleCallback,
    NodeId, ObserverId,
};
use std::collections::HashMap;

/// Callback of an observer created with [`IntObsHost::create_observer`]
pub type ExternalCallback = Box<dyn FnMut(&[IntersectionObserverEntry])>;

pub struct IntObsHost {
    document: Document,
    pool: ObserverPool,
    elements: HashMap<NodeId, IntObs>,
    external: HashMap<ObserverId, ExternalCallback>,
}

impl IntObsHost {
    /// Empty html/head/body document, `<int-obs>` not yet defined
    pub fn new() -> Self {
        Self::with_document(Document::default())
    }

    pub fn with_document(document: Document) -> Self {
        Self {
            document,
            pool: ObserverPool::new(),
            elements: HashMap::new(),
            external: HashMap::new(),
        }
    }

    /// Parse markup and define `<int-obs>`, upgrading every instance in it.
    ///
    /// Instances with a rejected configuration are logged and left as plain
    /// elements; only a parse failure is an error.
    pub fn from_html(html: &str) -> Result<Self, IntObsError> {
        let mut host = Self::with_document(fos_html::parse(html)?);
        if let Err(err) = host.define() {
            tracing::debug!("Markup kept un-upgraded <{}> elements: {}", TAG_NAME, err);
        }
        Ok(host)
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn document_mut(&mut self) -> &mut Document {
        &mut self.document
    }

    pub fn pool(&self) -> &ObserverPool {
        &self.pool
    }

    pub fn is_defined(&self) -> bool {
        self.document.custom_elements().get(TAG_NAME).is_some()
    }

    /// Register `<int-obs>` and upgrade connected instances in document order.
    /// Returns false if it was already registered.
    ///
    /// An instance whose configuration is rejected stays un-upgraded without
    /// holding up the rest; the first such error is returned at the end.
    pub fn define(&mut self) -> Result<bool, IntObsError> {
        if self.is_defined() {
            return Ok(false);
        }
        self.document.custom_elements_mut().define(TAG_NAME)?;

        let tree = self.document.tree();
        let existing: Vec<NodeId> = tree
            .descendants(NodeId::ROOT)
            .into_iter()
            .filter(|&node| tree.element(node).is_some_and(|e| e.tag_name == TAG_NAME))
            .collect();
        let mut first_error = None;
        for node in existing {
            if let Err(err) = self.upgrade(node) {
                first_error.get_or_insert(err);
            }
        }
        match first_error {
            Some(err) => Err(err),
            None => Ok(true),
        }
    }

    fn upgrade(&mut self, node: NodeId) -> Result<(), IntObsError> {
        if self.elements.contains_key(&node) {
            return Ok(());
        }
        let mut element = match IntObs::new(node, &mut self.document, &mut self.pool) {
            Ok(element) => element,
            Err(err) => {
                tracing::warn!("Failed to upgrade <{}> {:?}: {}", TAG_NAME, node, err);
                return Err(err);
            }
        };
        if self.document.is_connected(node) {
            element.connected_callback(&mut self.document);
        }
        tracing::debug!("Upgraded <{}> {:?}", TAG_NAME, node);
        self.elements.insert(node, element);
        Ok(())
    }

    /// Create a detached `<int-obs>` whose attributes are in place before it
    /// is constructed, defining the element first if needed
    pub fn create_int_obs(&mut self, attributes: &[(&str, &str)]) -> Result<NodeId, IntObsError> {
        // Other instances failing to upgrade don't concern this one
        if let Err(err) = self.define() {
            tracing::debug!("Defined <{}> with rejected instances: {}", TAG_NAME, err);
        }
        let node = self.document.create_element(TAG_NAME);
        for (name, value) in attributes {
            self.document.set_attribute(node, name, value)?;
        }
        self.upgrade(node)?;
        Ok(node)
    }

    pub fn create_element(&mut self, tag_name: &str) -> NodeId {
        self.document.create_element(tag_name)
    }

    pub fn set_attribute(&mut self, element: NodeId, name: &str, value: &str) -> Result<(), IntObsError> {
        Ok(self.document.set_attribute(element, name, value)?)
    }

    pub fn append_child(&mut self, parent: NodeId, child: NodeId) -> Result<(), IntObsError> {
        self.document.append_child(parent, child)?;
        self.run_reactions()
    }

    pub fn remove_child(&mut self, parent: NodeId, child: NodeId) -> Result<(), IntObsError> {
        self.document.remove_child(parent, child)?;
        self.run_reactions()
    }

    /// Run every queued reaction, even after one fails; returns the first failure
    fn run_reactions(&mut self) -> Result<(), IntObsError> {
        let mut first_error = None;
        for reaction in self.document.take_reactions() {
            let node = reaction.element;
            let Some(element) = self.elements.get_mut(&node) else {
                // Created through the document after define: upgrade on insertion
                if reaction.callback == LifecycleCallback::Connected {
                    if let Err(err) = self.upgrade(node) {
                        first_error.get_or_insert(err);
                    }
                }
                continue;
            };
            match reaction.callback {
                LifecycleCallback::Connected => element.connected_callback(&mut self.document),
                LifecycleCallback::Disconnected => element.disconnected_callback(&mut self.document),
            }
        }
        match first_error {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    pub fn element(&self, node: NodeId) -> Option<&IntObs> {
        self.elements.get(&node)
    }

    /// Imperative handle on an upgraded element
    pub fn int_obs(&mut self, node: NodeId) -> Result<IntObsMut<'_>, IntObsError> {
        let element = self.elements.get_mut(&node).ok_or(IntObsError::NotUpgraded(node))?;
        Ok(IntObsMut {
            element,
            document: &mut self.document,
            pool: &mut self.pool,
        })
    }

    /// Create an observer outside the pool, with its own callback
    pub fn create_observer<F>(&mut self, init: &IntersectionObserverInit, callback: F) -> Result<ObserverId, IntObsError>
    where
        F: FnMut(&[IntersectionObserverEntry]) + 'static,
    {
        let id = self.document.observers_mut().create(init)?;
        self.external.insert(id, Box::new(callback));
        Ok(id)
    }

    /// Queue a record on every observer watching its target; returns how many
    pub fn report_intersection(&mut self, entry: IntersectionObserverEntry) -> usize {
        self.document.observers_mut().notify(&entry)
    }

    /// Deliver queued records, one batch per observer.
    ///
    /// A failing batch does not hold up the others; the first error is
    /// returned once every batch has run.
    pub fn flush_intersections(&mut self) -> Result<usize, IntObsError> {
        let mut delivered = 0;
        let mut first_error = None;

        for (id, entries) in self.document.observers_mut().take_pending() {
            delivered += entries.len();
            if self.pool.contains_observer(id) {
                if let Err(err) = translate(&mut self.document, &mut self.elements, &entries) {
                    tracing::warn!("Intersection callback for {:?} failed: {}", id, err);
                    first_error.get_or_insert(err);
                }
            } else if let Some(callback) = self.external.get_mut(&id) {
                callback(&entries);
            } else {
                tracing::trace!("Dropping {} records for {:?}: no callback", entries.len(), id);
            }
        }

        match first_error {
            Some(err) => Err(err),
            None => Ok(delivered),
        }
    }

    pub fn add_event_listener<F>(&mut self, target: NodeId, event_type: &str, listener: F)
    where
        F: Fn(&mut DomEvent) + 'static,
    {
        self.document.add_event_listener(target, event_type, listener);
    }
}

impl Default for IntObsHost {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for IntObsHost {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IntObsHost")
            .field("elements", &self.elements.len())
            .field("pooled", &self.pool.len())
            .field("external", &self.external.len())
            .finish()
    }
}

/// Borrowed view of one `<int-obs>` with the context its methods need
pub struct IntObsMut<'a> {
    element: &'a mut IntObs,
    document: &'a mut Document,
    pool: &'a mut ObserverPool,
}

impl IntObsMut<'_> {
    pub fn node(&self) -> NodeId {
        self.element.node()
    }

    pub fn is_initialized(&self) -> bool {
        self.element.is_initialized()
    }

    pub fn is_observing(&self) -> bool {
        self.element.is_observing()
    }

    pub fn observer(&self) -> Option<ObserverId> {
        self.element.observer()
    }

    pub fn set_observer(&mut self, observer: Option<ObserverId>) -> Result<(), IntObsError> {
        self.element.set_observer(self.document, observer)
    }

    pub fn set_callback<F>(&mut self, callback: F)
    where
        F: FnMut(&IntersectionObserverEntry) + 'static,
    {
        self.element.set_callback(callback);
    }

    pub fn clear_callback(&mut self) {
        self.element.clear_callback();
    }

    pub fn options(&self) -> ObservationConfig {
        self.element.options(self.document)
    }

    pub fn root(&self) -> Option<NodeId> {
        self.element.root(self.document)
    }

    pub fn set_root(&mut self, root: Option<NodeId>) {
        self.element.set_root(self.document, root);
    }

    pub fn root_margin(&self) -> Option<String> {
        self.element.root_margin(self.document)
    }

    pub fn set_root_margin(&mut self, root_margin: Option<&str>) {
        self.element.set_root_margin(root_margin);
    }

    pub fn threshold(&self) -> Option<Threshold> {
        self.element.threshold(self.document)
    }

    pub fn set_threshold(&mut self, threshold: Option<Threshold>) {
        self.element.set_threshold(threshold);
    }

    pub fn initialize(&mut self) -> Result<(), IntObsError> {
        self.element.initialize(self.document, self.pool)
    }

    pub fn observe(&mut self) {
        self.element.observe(self.document);
    }

    pub fn unobserve(&mut self) {
        self.element.unobserve(self.document);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fos_dom::DomError;

    #[test]
    fn test_define_is_idempotent() {
        let mut host = IntObsHost::new();
        assert!(host.define().unwrap());
        assert!(!host.define().unwrap());
        assert!(host.is_defined());
    }

    #[test]
    fn test_create_int_obs_defines() {
        let mut host = IntObsHost::new();
        let node = host.create_int_obs(&[]).unwrap();
        assert!(host.is_defined());
        let element = host.element(node).unwrap();
        assert!(element.is_initialized());
        assert!(!element.is_observing());
    }

    #[test]
    fn test_append_runs_connected_reaction() {
        let mut host = IntObsHost::new();
        let node = host.create_int_obs(&[]).unwrap();
        let body = host.document().body();

        host.append_child(body, node).unwrap();
        assert!(host.element(node).unwrap().is_observing());

        host.remove_child(body, node).unwrap();
        assert!(!host.element(node).unwrap().is_observing());
    }

    #[test]
    fn test_document_created_element_upgrades_on_insert() {
        let mut host = IntObsHost::new();
        host.define().unwrap();
        let node = host.document_mut().create_element("int-obs");
        assert!(host.element(node).is_none());

        let body = host.document().body();
        host.append_child(body, node).unwrap();
        assert!(host.element(node).unwrap().is_observing());
    }

    #[test]
    fn test_define_upgrades_past_rejected_instance() {
        let mut document = Document::default();
        let body = document.body();
        let bad = document.create_element("int-obs");
        document.set_attribute(bad, "threshold", "[1.5]").unwrap();
        let good = document.create_element("int-obs");
        document.append_child(body, bad).unwrap();
        document.append_child(body, good).unwrap();

        let mut host = IntObsHost::with_document(document);
        let err = host.define().unwrap_err();
        assert!(matches!(err, IntObsError::Dom(DomError::ThresholdOutOfRange(_))));

        assert!(host.is_defined());
        assert!(host.element(bad).is_none());
        assert!(host.element(good).unwrap().is_observing());
    }

    #[test]
    fn test_int_obs_requires_upgrade() {
        let mut host = IntObsHost::new();
        let div = host.create_element("div");
        assert!(matches!(host.int_obs(div), Err(IntObsError::NotUpgraded(n)) if n == div));
    }

    #[test]
    fn test_unknown_observer_records_dropped() {
        let mut host = IntObsHost::new();
        let node = host.create_int_obs(&[]).unwrap();
        let body = host.document().body();
        host.append_child(body, node).unwrap();

        // Observer made straight on the manager has no callback registered
        let bare = host.document_mut().observers_mut().create(&IntersectionObserverInit::default()).unwrap();
        host.document_mut().observers_mut().get_mut(bare).unwrap().observe(node);

        assert_eq!(host.report_intersection(IntersectionObserverEntry::new(node, true, 1.0)), 2);
        assert_eq!(host.flush_intersections().unwrap(), 2);
        assert_eq!(host.document().get_attribute(node, "intersecting"), Some("true"));
    }
}
