//! DOM Events
//!
//! Event objects, listener storage and bubbling dispatch.

use crate::{DomTree, IntersectionObserverEntry, NodeId};
use std::collections::HashMap;
use std::rc::Rc;

/// Payload carried by a custom event
#[derive(Debug, Clone, PartialEq, Default)]
pub enum EventDetail {
    #[default]
    None,
    Intersection(IntersectionObserverEntry),
}

/// DOM event
#[derive(Debug, Clone)]
pub struct DomEvent {
    pub event_type: String,
    pub target: NodeId,
    pub current_target: Option<NodeId>,
    pub detail: EventDetail,
    pub bubbles: bool,
    pub cancelable: bool,
    default_prevented: bool,
    propagation_stopped: bool,
}

impl DomEvent {
    /// Plain, non-bubbling event
    pub fn new(event_type: &str, target: NodeId) -> Self {
        Self {
            event_type: event_type.to_string(),
            target,
            current_target: None,
            detail: EventDetail::None,
            bubbles: false,
            cancelable: false,
            default_prevented: false,
            propagation_stopped: false,
        }
    }

    /// CustomEvent with a detail payload
    pub fn custom(event_type: &str, target: NodeId, detail: EventDetail, bubbles: bool) -> Self {
        Self {
            detail,
            bubbles,
            ..Self::new(event_type, target)
        }
    }

    /// Prevent default action
    pub fn prevent_default(&mut self) {
        if self.cancelable {
            self.default_prevented = true;
        }
    }

    /// Stop propagation
    pub fn stop_propagation(&mut self) {
        self.propagation_stopped = true;
    }

    pub fn is_default_prevented(&self) -> bool {
        self.default_prevented
    }

    pub fn is_propagation_stopped(&self) -> bool {
        self.propagation_stopped
    }
}

/// Event listener callback
pub type EventListener = Rc<dyn Fn(&mut DomEvent)>;

/// Listeners keyed by node and event type
#[derive(Default)]
pub(crate) struct EventListeners {
    by_target: HashMap<(NodeId, String), Vec<EventListener>>,
}

impl EventListeners {
    pub(crate) fn add(&mut self, target: NodeId, event_type: &str, listener: EventListener) {
        self.by_target
            .entry((target, event_type.to_string()))
            .or_default()
            .push(listener);
    }

    /// Run the target phase, then bubble through ancestors if the event bubbles.
    /// Returns false if the default action was prevented.
    pub(crate) fn dispatch(&self, tree: &DomTree, event: &mut DomEvent) -> bool {
        let mut path = vec![event.target];
        if event.bubbles {
            path.extend(tree.ancestors(event.target));
        }

        for node in path {
            // Clone out so listeners can't observe a half-updated list
            let listeners: Vec<EventListener> = self
                .by_target
                .get(&(node, event.event_type.clone()))
                .map(|ls| ls.iter().map(Rc::clone).collect())
                .unwrap_or_default();
            if listeners.is_empty() {
                continue;
            }
            event.current_target = Some(node);
            for listener in listeners {
                listener(event);
            }
            if event.propagation_stopped {
                break;
            }
        }
        event.current_target = None;
        !event.default_prevented
    }
}

impl std::fmt::Debug for EventListeners {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventListeners")
            .field("targets", &self.by_target.len())
            .finish()
    }
}

/// Event dispatcher trait
pub trait EventDispatcher {
    fn dispatch_event(&mut self, event: DomEvent) -> bool;
}
