//! Ports to the browser-level substrate.
//!
//! Every ambient capability the utilities touch — the DOM tree, pointer
//! events, scroll geometry, the cookie string, the key/value store, the
//! connectivity flag — is reached through one of these traits, never through
//! a global. [`memory`] provides a complete in-process implementation for
//! tests and non-browser contexts.

use std::rc::Rc;

use parse_display::Display;
use thiserror::Error;

use crate::Subscription;

pub mod memory;


/// Identity of a node in the host tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(pub u64);

/// An event delivered by an [`EventTarget`].
#[derive(Debug, Clone)]
pub struct DomEvent {
    pub name: String,
    pub target: NodeId,
}

/// A document-level pointer-down hit.
#[derive(Debug, Clone, Copy)]
pub struct PointerHit {
    pub target: NodeId,
}

/// Scroll geometry of a container, as reported by the host.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ScrollMetrics {
    pub scroll_top: f64,
    pub scroll_left: f64,
    pub scroll_height: f64,
    pub scroll_width: f64,
    pub client_height: f64,
    pub client_width: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[display(style = "lowercase")]
pub enum ScrollBehavior {
    Auto,
    Smooth,
}

/// A node that can deliver named events.
pub trait EventTarget: 'static {
    /// Attach `handler` for `event`. The listener stays attached until the
    /// returned [`Subscription`] is dropped.
    fn add_listener(&self, event: &str, handler: Rc<dyn Fn(&DomEvent)>) -> Subscription;
}

/// A node with an identity and a subtree.
pub trait Region: 'static {
    fn node_id(&self) -> NodeId;
    /// Whether `node` is this node or one of its descendants.
    fn contains(&self, node: NodeId) -> bool;
}

/// A scrollable container.
pub trait ScrollArea: 'static {
    fn scroll_metrics(&self) -> ScrollMetrics;
    fn scroll_to(&self, x: f64, y: f64, behavior: ScrollBehavior);
}

/// Document-level pointer-down stream.
pub trait PointerHost: 'static {
    fn on_pointer_down(&self, handler: Rc<dyn Fn(&PointerHit)>) -> Subscription;
}

/// The host's connectivity flag and its change events.
pub trait ConnectivityHost: 'static {
    /// Current flag, or `None` where it cannot be read (non-browser context).
    fn is_online(&self) -> Option<bool>;
    fn on_change(&self, handler: Rc<dyn Fn(bool)>) -> Subscription;
}

/// The `document.cookie` pair: a read of the full jar string and a
/// single-attribute-string assignment.
pub trait CookieJar: 'static {
    /// The full `k=v; k2=v2` jar string.
    fn read(&self) -> String;
    /// One assignment, browser semantics: replace-or-append the named entry;
    /// an `expires` attribute in the past removes it.
    fn write(&self, attribute: &str);
}

/// Failure modes of an [`EntryStore`].
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store unavailable: {0}")]
    Unavailable(String),
    #[error("storage quota exceeded")]
    QuotaExceeded,
}

/// A keyed store of textual entries.
///
/// The store is not reactive; accessors layered on top are responsible for
/// re-reading after their own writes.
pub trait EntryStore: 'static {
    fn read_entry(&self, key: &str) -> Result<Option<String>, StoreError>;
    /// Every entry, in the order the store reports them.
    fn read_all(&self) -> Result<Vec<(String, String)>, StoreError>;
    fn write_entry(&self, key: &str, value: &str) -> Result<(), StoreError>;
    fn remove_entry(&self, key: &str) -> Result<(), StoreError>;
}
