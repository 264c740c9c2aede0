//! fOS `<int-obs>` - declarative intersection observation
//!
//! Markup authors attach visibility-driven behavior to a subtree by wrapping
//! it in `<int-obs>`:
//!
//! ```html
//! <int-obs class:in="visible" class:out="hidden" class:targets=".card"
//!          root-margin="0px 0px -10% 0px" threshold="[0, 0.5, 1]">
//!   <div class="card">...</div>
//! </int-obs>
//! ```
//!
//! Elements with the same resolved configuration share one pooled
//! intersection observer. Each record the observer delivers sets the
//! `intersecting` attribute, toggles the declared classes, dispatches a
//! bubbling `intersectionchange` event and then runs the element's callback.
//!
//! [`IntObsHost`] ties the pieces to a document; [`IntObs`],
//! [`ObserverPool`] and [`translate`] can also be driven directly.

mod config;
mod pool;
mod element;
mod translator;
mod host;

pub use config::{resolve, AttributeSource, ObservationConfig, PropertySource, Threshold};
pub use pool::ObserverPool;
pub use element::{IntObs, IntersectionCallback};
pub use translator::{class_recipients, translate};
pub use host::{ExternalCallback, IntObsHost, IntObsMut};

use fos_dom::{CustomElementError, DomError, NodeId};

/// Tag name the element registers under
pub const TAG_NAME: &str = "int-obs";
/// Type of the custom event dispatched per record
pub const INTERSECTION_EVENT: &str = "intersectionchange";

/// `init="false"` suppresses auto-initialization
pub const INIT_ATTR: &str = "init";
/// CSS margin shorthand around the root
pub const ROOT_MARGIN_ATTR: &str = "root-margin";
/// JSON number or array of numbers in [0, 1]
pub const THRESHOLD_ATTR: &str = "threshold";
/// Class added while intersecting
pub const CLASS_IN_ATTR: &str = "class:in";
/// Class added while not intersecting
pub const CLASS_OUT_ATTR: &str = "class:out";
/// Selector for the one descendant receiving the classes
pub const CLASS_TARGET_ATTR: &str = "class:target";
/// Selector for every descendant receiving the classes
pub const CLASS_TARGETS_ATTR: &str = "class:targets";
/// Output-only state mirror
pub const INTERSECTING_ATTR: &str = "intersecting";

/// Errors surfaced by `<int-obs>`
#[derive(Debug, thiserror::Error)]
pub enum IntObsError {
    #[error(transparent)]
    Dom(#[from] DomError),

    #[error(transparent)]
    CustomElement(#[from] CustomElementError),

    #[error(transparent)]
    Parse(#[from] fos_html::ParseError),

    #[error("Failed to serialize observer configuration: {0}")]
    PoolKey(#[from] serde_json::Error),

    #[error("Node {0:?} is not an upgraded <int-obs> element")]
    NotUpgraded(NodeId),
}
