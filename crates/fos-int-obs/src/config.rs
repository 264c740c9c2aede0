//! Observation configuration
//!
//! Two sources feed an `<int-obs>` configuration: attributes written in
//! markup and properties assigned from code. Attributes win. The resolved
//! [`ObservationConfig`] serializes to the key the observer pool dedups on.

use crate::{ROOT_MARGIN_ATTR, THRESHOLD_ATTR};
use fos_dom::{Document, IntersectionObserver, IntersectionObserverInit, NodeId};
use serde::{Deserialize, Serialize};

/// A single ratio or an ordered list of ratios
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Threshold {
    Single(f64),
    List(Vec<f64>),
}

impl Threshold {
    /// Parse the JSON form used by the `threshold` attribute.
    /// Anything but a number or an array of numbers yields None.
    pub fn from_json(raw: &str) -> Option<Self> {
        match serde_json::from_str(raw) {
            Ok(threshold) => Some(threshold),
            Err(err) => {
                tracing::debug!("Ignoring threshold attribute {:?}: {}", raw, err);
                None
            }
        }
    }

    pub fn to_vec(&self) -> Vec<f64> {
        match self {
            Threshold::Single(t) => vec![*t],
            Threshold::List(ts) => ts.clone(),
        }
    }
}

impl From<f64> for Threshold {
    fn from(value: f64) -> Self {
        Threshold::Single(value)
    }
}

impl From<Vec<f64>> for Threshold {
    fn from(value: Vec<f64>) -> Self {
        Threshold::List(value)
    }
}

/// Resolved `{root, rootMargin, threshold}`; unset fields take platform defaults
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ObservationConfig {
    pub root: Option<NodeId>,
    pub root_margin: Option<String>,
    pub threshold: Option<Threshold>,
}

/// Serialized shape of a pool key. Field order is fixed; unset fields are omitted.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PoolKey<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    root: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    root_margin: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    threshold: Option<&'a Threshold>,
}

impl ObservationConfig {
    /// Canonical serialization; equal configs give byte-identical keys.
    /// `root` takes part by node identity.
    pub fn pool_key(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(&PoolKey {
            root: self.root.map(NodeId::index),
            root_margin: self.root_margin.as_deref(),
            threshold: self.threshold.as_ref(),
        })
    }

    /// Constructor options for the observation primitive
    pub fn to_init(&self) -> IntersectionObserverInit {
        IntersectionObserverInit {
            root: self.root,
            root_margin: self.root_margin.clone(),
            threshold: self.threshold.as_ref().map(Threshold::to_vec).unwrap_or_default(),
        }
    }

    /// Live values of an existing observer
    pub fn from_observer(observer: &IntersectionObserver) -> Self {
        Self {
            root: observer.root(),
            root_margin: Some(observer.root_margin()),
            threshold: Some(Threshold::List(observer.thresholds().to_vec())),
        }
    }
}

/// Raw attribute values, as found on the element
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AttributeSource {
    pub root_margin: Option<String>,
    pub threshold: Option<String>,
}

impl AttributeSource {
    pub fn read(document: &Document, element: NodeId) -> Self {
        let attr = |name| document.get_attribute(element, name).map(str::to_string);
        Self {
            root_margin: attr(ROOT_MARGIN_ATTR),
            threshold: attr(THRESHOLD_ATTR),
        }
    }
}

/// Values assigned through the imperative API
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PropertySource {
    pub root: Option<NodeId>,
    pub root_margin: Option<String>,
    pub threshold: Option<Threshold>,
}

/// Merge both sources; a non-empty attribute beats the property.
///
/// A present but malformed `threshold` attribute leaves the threshold unset
/// rather than falling back to the property.
pub fn resolve(attributes: &AttributeSource, properties: &PropertySource) -> ObservationConfig {
    let declared = |value: &Option<String>| {
        value.as_deref().map(str::trim).filter(|v| !v.is_empty()).map(str::to_string)
    };

    let root_margin = declared(&attributes.root_margin)
        .or_else(|| declared(&properties.root_margin));

    let threshold = match declared(&attributes.threshold) {
        Some(raw) => Threshold::from_json(&raw),
        None => properties.threshold.clone(),
    };

    ObservationConfig {
        root: properties.root,
        root_margin,
        threshold,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn attrs(root_margin: Option<&str>, threshold: Option<&str>) -> AttributeSource {
        AttributeSource {
            root_margin: root_margin.map(str::to_string),
            threshold: threshold.map(str::to_string),
        }
    }

    #[test]
    fn test_empty_sources_resolve_unset() {
        let config = resolve(&AttributeSource::default(), &PropertySource::default());
        assert_eq!(config, ObservationConfig::default());
        assert_eq!(config.pool_key().unwrap(), "{}");
    }

    #[test]
    fn test_attribute_beats_property() {
        let props = PropertySource {
            root: None,
            root_margin: Some("5px".into()),
            threshold: Some(Threshold::Single(0.1)),
        };
        let config = resolve(&attrs(Some("  20px 0px "), Some("[0, 0.5]")), &props);
        assert_eq!(config.root_margin.as_deref(), Some("20px 0px"));
        assert_eq!(config.threshold, Some(Threshold::List(vec![0.0, 0.5])));
    }

    #[test]
    fn test_property_used_without_attribute() {
        let props = PropertySource {
            root: Some(NodeId::ROOT),
            root_margin: Some("5px".into()),
            threshold: Some(Threshold::Single(1.0)),
        };
        let config = resolve(&attrs(None, Some("   ")), &props);
        assert_eq!(config.root, Some(NodeId::ROOT));
        assert_eq!(config.root_margin.as_deref(), Some("5px"));
        assert_eq!(config.threshold, Some(Threshold::Single(1.0)));
    }

    #[test]
    fn test_malformed_threshold_is_unset() {
        let props = PropertySource { threshold: Some(Threshold::Single(0.3)), ..Default::default() };
        for raw in ["[0,", "\"half\"", "{}", "null", "[0, \"a\"]"] {
            let config = resolve(&attrs(None, Some(raw)), &props);
            assert_eq!(config.threshold, None, "{raw}");
        }
    }

    #[test]
    fn test_pool_key_is_order_stable() {
        let a = resolve(&attrs(Some("10px"), Some("0.5")), &PropertySource::default());
        let b = resolve(&attrs(Some(" 10px"), Some("0.5 ")), &PropertySource::default());
        assert_eq!(a.pool_key().unwrap(), b.pool_key().unwrap());
        assert_eq!(a.pool_key().unwrap(), r#"{"rootMargin":"10px","threshold":0.5}"#);
    }

    #[test]
    fn test_pool_key_distinguishes_roots() {
        let mut a = ObservationConfig::default();
        let mut b = ObservationConfig::default();
        a.root = Some(NodeId::ROOT);
        assert_ne!(a.pool_key().unwrap(), b.pool_key().unwrap());
        b.root = Some(NodeId::ROOT);
        assert_eq!(a.pool_key().unwrap(), b.pool_key().unwrap());
    }

    #[test]
    fn test_to_init() {
        let config = ObservationConfig {
            root: None,
            root_margin: Some("1px".into()),
            threshold: Some(Threshold::Single(0.5)),
        };
        let init = config.to_init();
        assert_eq!(init.threshold, vec![0.5]);
        assert_eq!(init.root_margin.as_deref(), Some("1px"));
        assert!(ObservationConfig::default().to_init().threshold.is_empty());
    }
}
