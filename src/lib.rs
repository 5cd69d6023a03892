//! Reusable UI state utilities that bind browser-style primitives — outside
//! clicks, cookies, DOM events, key/value storage, connectivity, scroll
//! position — to a small reactive runtime.
//!
//! Each utility follows the same contract: it subscribes to an external
//! source through an injected [`platform`] port, reflects the latest
//! observation into [`State`], and guarantees release of the subscription on
//! every exit path. [`core::Runtime::update`] drives the whole thing.

mod click_outside;
pub mod core;
mod effect_fn;
mod kv;
mod listen;
mod node_ref;
mod online;
pub mod platform;
mod scroll;
mod state;
mod subscription;
#[cfg(test)]
mod test_helpers;
mod timer;

pub use crate::core::{spawn_action, ActionContext, SignalContext};
pub use click_outside::ClickOutside;
pub use effect_fn::effect;
pub use kv::{CookieEntryStore, StoredValue};
pub use listen::bind_event;
pub use node_ref::NodeRef;
pub use online::{OnlineWatcher, RECONNECT_WINDOW};
pub use scroll::{ScrollEdge, ScrollOffset, ScrollTarget, ScrollTracker};
pub use state::{State, StateRefMut};
pub use subscription::Subscription;
pub use timer::{timer, timer_at, Timer};
