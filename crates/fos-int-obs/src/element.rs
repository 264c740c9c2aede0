//! The `<int-obs>` element instance
//!
//! Per-element state: whether it has been initialized, whether it is
//! registered with its observer, the observer itself and the property-side
//! configuration. Methods take the document (and pool) explicitly so the
//! element can be driven without a host.

use crate::config::{resolve, AttributeSource, PropertySource};
use crate::{IntObsError, ObservationConfig, ObserverPool, Threshold, INIT_ATTR};
use fos_dom::{Document, DomError, IntersectionObserverEntry, NodeId, ObserverId};

/// Per-element callback, run after the built-in side effects
pub type IntersectionCallback = Box<dyn FnMut(&IntersectionObserverEntry)>;

pub struct IntObs {
    node: NodeId,
    observer: Option<ObserverId>,
    callback: Option<IntersectionCallback>,
    properties: PropertySource,
    initialized: bool,
    observing: bool,
}

impl IntObs {
    /// Construct the element for `node`, initializing right away unless the
    /// markup says `init="false"`.
    pub fn new(node: NodeId, document: &mut Document, pool: &mut ObserverPool) -> Result<Self, IntObsError> {
        if document.tree().element(node).is_none() {
            return Err(DomError::NotAnElement(node).into());
        }

        let mut element = Self {
            node,
            observer: None,
            callback: None,
            properties: PropertySource::default(),
            initialized: false,
            observing: false,
        };

        if document.get_attribute(node, INIT_ATTR) != Some("false") {
            element.initialize(document, pool)?;
        } else {
            tracing::trace!("Deferring initialization of {:?}", node);
        }
        Ok(element)
    }

    pub fn node(&self) -> NodeId {
        self.node
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    pub fn is_observing(&self) -> bool {
        self.observing
    }

    pub fn observer(&self) -> Option<ObserverId> {
        self.observer
    }

    fn frozen(&self, what: &str) -> bool {
        if self.observer.is_some() {
            tracing::trace!("Ignoring {} change on {:?}: observer attached", what, self.node);
        }
        self.observer.is_some()
    }

    /// Effective configuration: the live observer's values once attached,
    /// otherwise attributes merged over properties.
    pub fn options(&self, document: &Document) -> ObservationConfig {
        match self.observer.and_then(|id| document.observers().get(id)) {
            Some(observer) => ObservationConfig::from_observer(observer),
            None => resolve(&AttributeSource::read(document, self.node), &self.properties),
        }
    }

    pub fn root(&self, document: &Document) -> Option<NodeId> {
        self.options(document).root
    }

    /// Assign the root; anything but an element or the document clears it
    pub fn set_root(&mut self, document: &Document, root: Option<NodeId>) {
        if self.frozen("root") {
            return;
        }
        self.properties.root = root.filter(|&id| {
            document.tree().get(id).is_some_and(|n| n.is_element() || n.is_document())
        });
    }

    pub fn root_margin(&self, document: &Document) -> Option<String> {
        self.options(document).root_margin
    }

    pub fn set_root_margin(&mut self, root_margin: Option<&str>) {
        if self.frozen("rootMargin") {
            return;
        }
        self.properties.root_margin = root_margin.map(|m| m.trim().to_string());
    }

    pub fn threshold(&self, document: &Document) -> Option<Threshold> {
        self.options(document).threshold
    }

    pub fn set_threshold(&mut self, threshold: Option<Threshold>) {
        if self.frozen("threshold") {
            return;
        }
        self.properties.threshold = threshold;
    }

    /// Adopt an observer directly, bypassing the pool.
    ///
    /// An element that is currently observing moves its registration over.
    pub fn set_observer(&mut self, document: &mut Document, observer: Option<ObserverId>) -> Result<(), IntObsError> {
        if let Some(id) = observer {
            if document.observers().get(id).is_none() {
                return Err(DomError::UnknownObserver(id).into());
            }
        }

        let was_observing = self.observing;
        if was_observing {
            self.unobserve(document);
        }
        self.observer = observer;
        if was_observing {
            self.observe(document);
        }
        Ok(())
    }

    pub fn set_callback<F>(&mut self, callback: F)
    where
        F: FnMut(&IntersectionObserverEntry) + 'static,
    {
        self.callback = Some(Box::new(callback));
    }

    pub fn clear_callback(&mut self) {
        self.callback = None;
    }

    pub(crate) fn invoke_callback(&mut self, entry: &IntersectionObserverEntry) {
        if let Some(callback) = self.callback.as_mut() {
            callback(entry);
        }
    }

    /// One-time setup: pick up a pooled observer unless one was assigned,
    /// then start observing if connected. Later calls do nothing.
    pub fn initialize(&mut self, document: &mut Document, pool: &mut ObserverPool) -> Result<(), IntObsError> {
        if self.initialized {
            return Ok(());
        }

        if self.observer.is_none() {
            let config = self.options(document);
            self.observer = Some(pool.get_or_create(&config, document.observers_mut())?);
        }

        self.initialized = true;
        tracing::debug!("Initialized {:?} with observer {:?}", self.node, self.observer);

        if document.is_connected(self.node) {
            self.observe(document);
        }
        Ok(())
    }

    /// Register with the observer; no-op while already observing
    pub fn observe(&mut self, document: &mut Document) {
        if self.observing {
            return;
        }
        self.observing = true;
        let Some(id) = self.observer else { return };
        if let Some(observer) = document.observers_mut().get_mut(id) {
            observer.observe(self.node);
            tracing::trace!("{:?} observing via {:?}", self.node, id);
        }
    }

    /// Unregister; safe to call any number of times
    pub fn unobserve(&mut self, document: &mut Document) {
        if let Some(id) = self.observer {
            if let Some(observer) = document.observers_mut().get_mut(id) {
                observer.unobserve(self.node);
            }
        }
        self.observing = false;
    }

    pub fn connected_callback(&mut self, document: &mut Document) {
        if self.initialized {
            self.observe(document);
        }
    }

    pub fn disconnected_callback(&mut self, document: &mut Document) {
        self.unobserve(document);
    }
}

impl std::fmt::Debug for IntObs {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IntObs")
            .field("node", &self.node)
            .field("observer", &self.observer)
            .field("has_callback", &self.callback.is_some())
            .field("properties", &self.properties)
            .field("initialized", &self.initialized)
            .field("observing", &self.observing)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fos_dom::IntersectionObserverInit;

    fn connected(document: &mut Document, attrs: &[(&str, &str)]) -> NodeId {
        let node = document.create_element("int-obs");
        for (name, value) in attrs {
            document.set_attribute(node, name, value).unwrap();
        }
        document.append_child(document.body(), node).unwrap();
        node
    }

    fn registrations(document: &Document, element: &IntObs) -> u32 {
        document.observers().get(element.observer().unwrap()).unwrap().stats().registrations
    }

    #[test]
    fn test_auto_initialize_observes_when_connected() {
        let mut doc = Document::default();
        let mut pool = ObserverPool::new();
        let node = connected(&mut doc, &[]);

        let element = IntObs::new(node, &mut doc, &mut pool).unwrap();
        assert!(element.is_initialized());
        assert!(element.is_observing());
        assert!(doc.observers().get(element.observer().unwrap()).unwrap().is_observing(node));
    }

    #[test]
    fn test_detached_initializes_without_observing() {
        let mut doc = Document::default();
        let mut pool = ObserverPool::new();
        let node = doc.create_element("int-obs");

        let element = IntObs::new(node, &mut doc, &mut pool).unwrap();
        assert!(element.is_initialized());
        assert!(!element.is_observing());
    }

    #[test]
    fn test_init_false_defers() {
        let mut doc = Document::default();
        let mut pool = ObserverPool::new();
        let node = connected(&mut doc, &[("init", "false")]);

        let mut element = IntObs::new(node, &mut doc, &mut pool).unwrap();
        assert!(!element.is_initialized());
        assert_eq!(element.observer(), None);

        // connectedCallback before initialize does nothing
        element.connected_callback(&mut doc);
        assert!(!element.is_observing());

        element.initialize(&mut doc, &mut pool).unwrap();
        assert!(element.is_observing());
    }

    #[test]
    fn test_initialize_is_idempotent() {
        let mut doc = Document::default();
        let mut pool = ObserverPool::new();
        let node = connected(&mut doc, &[]);
        let mut element = IntObs::new(node, &mut doc, &mut pool).unwrap();
        let first = element.observer();

        element.initialize(&mut doc, &mut pool).unwrap();
        assert_eq!(element.observer(), first);
        assert_eq!(doc.observers().len(), 1);
    }

    #[test]
    fn test_double_observe_registers_once() {
        let mut doc = Document::default();
        let mut pool = ObserverPool::new();
        let node = connected(&mut doc, &[]);
        let mut element = IntObs::new(node, &mut doc, &mut pool).unwrap();

        element.observe(&mut doc);
        element.observe(&mut doc);
        let stats = doc.observers().get(element.observer().unwrap()).unwrap().stats();
        assert_eq!(stats.observe_calls, 1);
        assert_eq!(registrations(&doc, &element), 1);
    }

    #[test]
    fn test_disconnect_connect_cycles() {
        let mut doc = Document::default();
        let mut pool = ObserverPool::new();
        let node = connected(&mut doc, &[]);
        let mut element = IntObs::new(node, &mut doc, &mut pool).unwrap();

        for _ in 0..3 {
            element.disconnected_callback(&mut doc);
            element.disconnected_callback(&mut doc);
            assert!(!element.is_observing());
            element.connected_callback(&mut doc);
            assert!(element.is_observing());
        }
        assert!(doc.observers().get(element.observer().unwrap()).unwrap().is_observing(node));
    }

    #[test]
    fn test_frozen_after_observer_attached() {
        let mut doc = Document::default();
        let mut pool = ObserverPool::new();
        let node = connected(&mut doc, &[("root-margin", "10px")]);
        let mut element = IntObs::new(node, &mut doc, &mut pool).unwrap();

        element.set_root_margin(Some("99px"));
        element.set_threshold(Some(Threshold::Single(1.0)));
        element.set_root(&doc, Some(doc.body()));

        assert_eq!(element.root_margin(&doc).as_deref(), Some("10px 10px 10px 10px"));
        assert_eq!(element.threshold(&doc), Some(Threshold::List(vec![0.0])));
        assert_eq!(element.root(&doc), None);
    }

    #[test]
    fn test_properties_before_initialize() {
        let mut doc = Document::default();
        let mut pool = ObserverPool::new();
        let node = connected(&mut doc, &[("init", "false")]);
        let mut element = IntObs::new(node, &mut doc, &mut pool).unwrap();

        element.set_root_margin(Some(" 5px "));
        element.set_threshold(Some(vec![0.5, 1.0].into()));
        let body = doc.body();
        element.set_root(&doc, Some(body));
        assert_eq!(element.root_margin(&doc).as_deref(), Some("5px"));

        element.initialize(&mut doc, &mut pool).unwrap();
        assert_eq!(element.root(&doc), Some(body));
        assert_eq!(element.threshold(&doc), Some(Threshold::List(vec![0.5, 1.0])));
    }

    #[test]
    fn test_set_root_rejects_text_nodes() {
        let mut doc = Document::default();
        let mut pool = ObserverPool::new();
        let node = connected(&mut doc, &[("init", "false")]);
        let text = doc.create_text("x");
        let mut element = IntObs::new(node, &mut doc, &mut pool).unwrap();

        element.set_root(&doc, Some(NodeId::ROOT));
        assert_eq!(element.root(&doc), Some(NodeId::ROOT));
        element.set_root(&doc, Some(text));
        assert_eq!(element.root(&doc), None);
    }

    #[test]
    fn test_explicit_observer_bypasses_pool() {
        let mut doc = Document::default();
        let mut pool = ObserverPool::new();
        let node = connected(&mut doc, &[("init", "false")]);
        let mut element = IntObs::new(node, &mut doc, &mut pool).unwrap();

        let external = doc.observers_mut().create(&IntersectionObserverInit {
            root_margin: Some("10% 0px 100px 0px".into()),
            threshold: vec![0.0, 0.25, 0.75, 1.0],
            ..Default::default()
        }).unwrap();
        element.set_observer(&mut doc, Some(external)).unwrap();
        element.initialize(&mut doc, &mut pool).unwrap();

        assert!(pool.is_empty());
        assert_eq!(element.observer(), Some(external));
        assert!(doc.observers().get(external).unwrap().is_observing(node));
        assert_eq!(element.root_margin(&doc).as_deref(), Some("10% 0px 100px 0px"));
    }

    #[test]
    fn test_set_observer_moves_registration() {
        let mut doc = Document::default();
        let mut pool = ObserverPool::new();
        let node = connected(&mut doc, &[]);
        let mut element = IntObs::new(node, &mut doc, &mut pool).unwrap();
        let pooled = element.observer().unwrap();
        let other = doc.observers_mut().create(&IntersectionObserverInit::default()).unwrap();

        element.set_observer(&mut doc, Some(other)).unwrap();
        assert!(!doc.observers().get(pooled).unwrap().is_observing(node));
        assert!(doc.observers().get(other).unwrap().is_observing(node));
    }

    #[test]
    fn test_set_unknown_observer_fails() {
        let mut doc = Document::default();
        let mut pool = ObserverPool::new();
        let node = connected(&mut doc, &[("init", "false")]);
        let mut element = IntObs::new(node, &mut doc, &mut pool).unwrap();

        // Created by another document's manager
        let mut other = Document::default();
        let unknown = other.observers_mut().create(&IntersectionObserverInit::default()).unwrap();

        let err = element.set_observer(&mut doc, Some(unknown)).unwrap_err();
        assert!(matches!(err, IntObsError::Dom(DomError::UnknownObserver(_))));
    }

    #[test]
    fn test_invalid_root_margin_fails_construction() {
        let mut doc = Document::default();
        let mut pool = ObserverPool::new();
        let node = connected(&mut doc, &[("root-margin", "lots")]);
        let err = IntObs::new(node, &mut doc, &mut pool).unwrap_err();
        assert!(matches!(err, IntObsError::Dom(DomError::InvalidRootMargin(_))));
    }
}
