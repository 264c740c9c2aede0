//! Event translator
//!
//! Turns a batch of intersection records into DOM side effects, record by
//! record: the `intersecting` attribute, `class:in`/`class:out` toggles, a
//! bubbling `intersectionchange` event and finally the element's callback.

use crate::{
    IntObs, IntObsError, CLASS_IN_ATTR, CLASS_OUT_ATTR, CLASS_TARGETS_ATTR, CLASS_TARGET_ATTR,
    INTERSECTING_ATTR, INTERSECTION_EVENT,
};
use fos_dom::{Document, DomEvent, EventDetail, EventDispatcher, IntersectionObserverEntry, NodeId};
use std::collections::HashMap;

/// Apply a batch in order. An invalid `class:target(s)` selector stops the
/// batch and is returned; records before it keep their effects.
pub fn translate(
    document: &mut Document,
    elements: &mut HashMap<NodeId, IntObs>,
    entries: &[IntersectionObserverEntry],
) -> Result<(), IntObsError> {
    for entry in entries {
        apply(document, elements.get_mut(&entry.target), entry)?;
    }
    Ok(())
}

fn apply(
    document: &mut Document,
    element: Option<&mut IntObs>,
    entry: &IntersectionObserverEntry,
) -> Result<(), IntObsError> {
    let target = entry.target;
    let intersecting = entry.is_intersecting;
    tracing::trace!("{:?} intersecting={} ratio={}", target, intersecting, entry.intersection_ratio);

    document.set_attribute(target, INTERSECTING_ATTR, if intersecting { "true" } else { "false" })?;

    let class_in = declared(document, target, CLASS_IN_ATTR);
    let class_out = declared(document, target, CLASS_OUT_ATTR);
    if class_in.is_some() || class_out.is_some() {
        for recipient in class_recipients(document, target)? {
            if let Some(class) = &class_in {
                document.toggle_class(recipient, class, Some(intersecting))?;
            }
            if let Some(class) = &class_out {
                document.toggle_class(recipient, class, Some(!intersecting))?;
            }
        }
    }

    document.dispatch_event(DomEvent::custom(
        INTERSECTION_EVENT,
        target,
        EventDetail::Intersection(entry.clone()),
        true,
    ));

    if let Some(element) = element {
        element.invoke_callback(entry);
    }
    Ok(())
}

/// Elements receiving class toggles for `target`.
///
/// `class:target` names one descendant, falling back to `target` itself when
/// nothing matches; `class:targets` adds every matching descendant. With
/// neither declared, `target` alone receives the classes.
pub fn class_recipients(document: &Document, target: NodeId) -> Result<Vec<NodeId>, IntObsError> {
    let single = declared(document, target, CLASS_TARGET_ATTR);
    let multiple = declared(document, target, CLASS_TARGETS_ATTR);

    let mut recipients = Vec::new();
    match &single {
        Some(selector) => recipients.push(document.query_selector(target, selector)?.unwrap_or(target)),
        None if multiple.is_none() => recipients.push(target),
        None => {}
    }
    if let Some(selector) = &multiple {
        for node in document.query_selector_all(target, selector)? {
            if !recipients.contains(&node) {
                recipients.push(node);
            }
        }
    }
    Ok(recipients)
}

/// Attribute value, treating empty as absent
fn declared(document: &Document, element: NodeId, name: &str) -> Option<String> {
    document
        .get_attribute(element, name)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}
