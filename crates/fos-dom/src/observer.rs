//! Intersection Observer
//!
//! The observation primitive: a set of observed targets, a normalized
//! configuration, and a queue of records waiting for delivery. Computing
//! visibility is the layout engine's job; it hands finished records to
//! [`IntersectionObserverManager::notify`].

use crate::geometry::DOMRect;
use crate::{DomError, NodeId};

/// Observer identifier, unique per manager
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObserverId(u64);

/// Intersection observer options, as passed to the constructor
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IntersectionObserverInit {
    /// Root element or document (None = viewport)
    pub root: Option<NodeId>,
    /// CSS margin shorthand; None means "0px"
    pub root_margin: Option<String>,
    /// Ratios to notify at; empty means `[0]`
    pub threshold: Vec<f64>,
}

/// Root margin, always four sides after parsing
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RootMargin {
    pub top: MarginValue,
    pub right: MarginValue,
    pub bottom: MarginValue,
    pub left: MarginValue,
}

impl RootMargin {
    /// Parse 1-4 whitespace separated px/% values, CSS shorthand style
    pub fn parse(margin: &str) -> Result<Self, DomError> {
        let invalid = || DomError::InvalidRootMargin(margin.to_string());
        let values = margin
            .split_whitespace()
            .map(|part| MarginValue::parse(part).ok_or_else(invalid))
            .collect::<Result<Vec<_>, _>>()?;

        match values[..] {
            [] => Ok(Self::default()),
            [all] => Ok(Self { top: all, right: all, bottom: all, left: all }),
            [vertical, horizontal] => Ok(Self {
                top: vertical,
                right: horizontal,
                bottom: vertical,
                left: horizontal,
            }),
            [top, horizontal, bottom] => Ok(Self { top, right: horizontal, bottom, left: horizontal }),
            [top, right, bottom, left] => Ok(Self { top, right, bottom, left }),
            _ => Err(invalid()),
        }
    }
}

impl std::fmt::Display for RootMargin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {} {} {}", self.top, self.right, self.bottom, self.left)
    }
}

/// Margin value (pixels or percentage)
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MarginValue {
    Pixels(f64),
    Percentage(f64),
}

impl MarginValue {
    fn parse(value: &str) -> Option<Self> {
        let number = |s: &str| s.parse::<f64>().ok().filter(|n| n.is_finite());
        if let Some(pct) = value.strip_suffix('%') {
            number(pct).map(MarginValue::Percentage)
        } else if let Some(px) = value.strip_suffix("px") {
            number(px).map(MarginValue::Pixels)
        } else {
            None
        }
    }
}

impl Default for MarginValue {
    fn default() -> Self {
        MarginValue::Pixels(0.0)
    }
}

impl std::fmt::Display for MarginValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MarginValue::Pixels(px) => write!(f, "{}px", px),
            MarginValue::Percentage(pct) => write!(f, "{}%", pct),
        }
    }
}

/// Intersection observer entry
#[derive(Debug, Clone, PartialEq)]
pub struct IntersectionObserverEntry {
    pub target: NodeId,
    pub time: f64,
    pub root_bounds: Option<DOMRect>,
    pub bounding_client_rect: DOMRect,
    pub intersection_rect: DOMRect,
    pub is_intersecting: bool,
    pub intersection_ratio: f64,
}

impl IntersectionObserverEntry {
    /// Record with only the state fields filled in
    pub fn new(target: NodeId, is_intersecting: bool, intersection_ratio: f64) -> Self {
        Self {
            target,
            time: 0.0,
            root_bounds: None,
            bounding_client_rect: DOMRect::default(),
            intersection_rect: DOMRect::default(),
            is_intersecting,
            intersection_ratio,
        }
    }

    /// Record derived from a target's box and the (margin-adjusted) root bounds
    pub fn from_rects(target: NodeId, bounding: DOMRect, root_bounds: DOMRect, time: f64) -> Self {
        let overlap = bounding.intersection(&root_bounds);
        let ratio = match overlap {
            Some(rect) if bounding.area() > 0.0 => rect.area() / bounding.area(),
            Some(_) => 1.0,
            None => 0.0,
        };
        Self {
            target,
            time,
            root_bounds: Some(root_bounds),
            bounding_client_rect: bounding,
            intersection_rect: overlap.unwrap_or_default(),
            is_intersecting: overlap.is_some(),
            intersection_ratio: ratio,
        }
    }
}

/// Counters for one observer
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IntersectionObserverStats {
    /// Calls to `observe`, including repeats
    pub observe_calls: u32,
    /// Targets actually added
    pub registrations: u32,
    pub unobserve_calls: u32,
    pub records_queued: u32,
}

/// Intersection observer
#[derive(Debug)]
pub struct IntersectionObserver {
    id: ObserverId,
    root: Option<NodeId>,
    root_margin: RootMargin,
    thresholds: Vec<f64>,
    targets: Vec<NodeId>,
    pending: Vec<IntersectionObserverEntry>,
    stats: IntersectionObserverStats,
}

impl IntersectionObserver {
    fn new(id: ObserverId, init: &IntersectionObserverInit) -> Result<Self, DomError> {
        let root_margin = match &init.root_margin {
            Some(margin) => RootMargin::parse(margin)?,
            None => RootMargin::default(),
        };

        let mut thresholds = init.threshold.clone();
        if let Some(&bad) = thresholds.iter().find(|t| !(0.0..=1.0).contains(*t)) {
            return Err(DomError::ThresholdOutOfRange(bad));
        }
        if thresholds.is_empty() {
            thresholds.push(0.0);
        }
        thresholds.sort_by(f64::total_cmp);

        Ok(Self {
            id,
            root: init.root,
            root_margin,
            thresholds,
            targets: Vec::new(),
            pending: Vec::new(),
            stats: IntersectionObserverStats::default(),
        })
    }

    pub fn id(&self) -> ObserverId {
        self.id
    }

    pub fn root(&self) -> Option<NodeId> {
        self.root
    }

    /// Normalized four-value margin, e.g. "10px 10px 10px 10px"
    pub fn root_margin(&self) -> String {
        self.root_margin.to_string()
    }

    pub fn thresholds(&self) -> &[f64] {
        &self.thresholds
    }

    pub fn targets(&self) -> &[NodeId] {
        &self.targets
    }

    pub fn is_observing(&self, target: NodeId) -> bool {
        self.targets.contains(&target)
    }

    pub fn stats(&self) -> IntersectionObserverStats {
        self.stats
    }

    /// Observe a target; repeats are no-ops
    pub fn observe(&mut self, target: NodeId) {
        self.stats.observe_calls += 1;
        if !self.targets.contains(&target) {
            self.targets.push(target);
            self.stats.registrations += 1;
        }
    }

    /// Stop observing; safe for targets never observed
    pub fn unobserve(&mut self, target: NodeId) {
        self.stats.unobserve_calls += 1;
        self.targets.retain(|&t| t != target);
    }

    /// Stop observing all targets
    pub fn disconnect(&mut self) {
        self.targets.clear();
    }

    /// Queue a record; dropped unless its target is observed
    pub fn queue_entry(&mut self, entry: IntersectionObserverEntry) -> bool {
        if !self.is_observing(entry.target) {
            return false;
        }
        self.stats.records_queued += 1;
        self.pending.push(entry);
        true
    }

    /// Take pending records without delivering them
    pub fn take_records(&mut self) -> Vec<IntersectionObserverEntry> {
        std::mem::take(&mut self.pending)
    }

    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }
}

/// Owns every intersection observer of a document
#[derive(Debug, Default)]
pub struct IntersectionObserverManager {
    next_id: u64,
    observers: Vec<IntersectionObserver>,
}

impl IntersectionObserverManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create observer
    pub fn create(&mut self, init: &IntersectionObserverInit) -> Result<ObserverId, DomError> {
        let id = ObserverId(self.next_id + 1);
        let observer = IntersectionObserver::new(id, init)?;
        self.next_id += 1;
        tracing::trace!(
            "Created intersection observer {:?} (margin {}, thresholds {:?})",
            id, observer.root_margin(), observer.thresholds()
        );
        self.observers.push(observer);
        Ok(id)
    }

    pub fn get(&self, id: ObserverId) -> Option<&IntersectionObserver> {
        self.observers.iter().find(|o| o.id == id)
    }

    pub fn get_mut(&mut self, id: ObserverId) -> Option<&mut IntersectionObserver> {
        self.observers.iter_mut().find(|o| o.id == id)
    }

    pub fn len(&self) -> usize {
        self.observers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observers.is_empty()
    }

    /// Hand a record to every observer watching its target.
    /// Returns how many observers queued it.
    pub fn notify(&mut self, entry: &IntersectionObserverEntry) -> usize {
        self.observers
            .iter_mut()
            .map(|o| o.queue_entry(entry.clone()))
            .filter(|&queued| queued)
            .count()
    }

    /// Drain pending records, one batch per observer in creation order
    pub fn take_pending(&mut self) -> Vec<(ObserverId, Vec<IntersectionObserverEntry>)> {
        self.observers
            .iter_mut()
            .filter(|o| o.has_pending())
            .map(|o| (o.id, o.take_records()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_root_margin_shorthand() {
        assert_eq!(RootMargin::parse("10px").unwrap().to_string(), "10px 10px 10px 10px");
        assert_eq!(RootMargin::parse("1px 2%").unwrap().to_string(), "1px 2% 1px 2%");
        assert_eq!(RootMargin::parse("1px 2px 3px").unwrap().to_string(), "1px 2px 3px 2px");
        assert_eq!(
            RootMargin::parse("10% 0px 100px 0px").unwrap().to_string(),
            "10% 0px 100px 0px"
        );
        assert_eq!(RootMargin::parse("").unwrap().to_string(), "0px 0px 0px 0px");
    }

    #[test]
    fn test_root_margin_rejects() {
        for bad in ["10", "10em", "px", "1px 2px 3px 4px 5px", "abc%"] {
            assert_eq!(RootMargin::parse(bad), Err(DomError::InvalidRootMargin(bad.to_string())));
        }
    }

    #[test]
    fn test_thresholds_normalized() {
        let mut manager = IntersectionObserverManager::new();
        let id = manager.create(&IntersectionObserverInit {
            threshold: vec![1.0, 0.25, 0.5],
            ..Default::default()
        }).unwrap();
        assert_eq!(manager.get(id).unwrap().thresholds(), &[0.25, 0.5, 1.0]);

        let default = manager.create(&IntersectionObserverInit::default()).unwrap();
        assert_eq!(manager.get(default).unwrap().thresholds(), &[0.0]);
        assert_eq!(manager.get(default).unwrap().root_margin(), "0px 0px 0px 0px");
    }

    #[test]
    fn test_threshold_out_of_range() {
        let mut manager = IntersectionObserverManager::new();
        let err = manager.create(&IntersectionObserverInit {
            threshold: vec![0.5, 1.5],
            ..Default::default()
        });
        assert_eq!(err, Err(DomError::ThresholdOutOfRange(1.5)));
        assert!(manager.is_empty());
    }

    #[test]
    fn test_observe_is_idempotent() {
        let mut manager = IntersectionObserverManager::new();
        let id = manager.create(&IntersectionObserverInit::default()).unwrap();
        let observer = manager.get_mut(id).unwrap();

        observer.observe(NodeId(3));
        observer.observe(NodeId(3));
        assert_eq!(observer.targets(), &[NodeId(3)]);
        assert_eq!(observer.stats().registrations, 1);
        assert_eq!(observer.stats().observe_calls, 2);

        observer.unobserve(NodeId(3));
        observer.unobserve(NodeId(3));
        assert!(observer.targets().is_empty());
    }

    #[test]
    fn test_notify_only_reaches_observing() {
        let mut manager = IntersectionObserverManager::new();
        let a = manager.create(&IntersectionObserverInit::default()).unwrap();
        let b = manager.create(&IntersectionObserverInit::default()).unwrap();
        manager.get_mut(a).unwrap().observe(NodeId(1));
        manager.get_mut(b).unwrap().observe(NodeId(2));

        assert_eq!(manager.notify(&IntersectionObserverEntry::new(NodeId(1), true, 1.0)), 1);
        assert_eq!(manager.notify(&IntersectionObserverEntry::new(NodeId(9), true, 1.0)), 0);

        let pending = manager.take_pending();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].0, a);
        assert!(manager.take_pending().is_empty());
    }

    #[test]
    fn test_entry_from_rects() {
        let root = DOMRect::from_xywh(0.0, 0.0, 100.0, 100.0);
        let half = IntersectionObserverEntry::from_rects(
            NodeId(1), DOMRect::from_xywh(0.0, 50.0, 100.0, 100.0), root, 16.0,
        );
        assert!(half.is_intersecting);
        assert_eq!(half.intersection_ratio, 0.5);

        let outside = IntersectionObserverEntry::from_rects(
            NodeId(1), DOMRect::from_xywh(0.0, 300.0, 10.0, 10.0), root, 16.0,
        );
        assert!(!outside.is_intersecting);
        assert_eq!(outside.intersection_ratio, 0.0);
    }
}
