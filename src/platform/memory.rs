//! In-process implementation of the platform ports.
//!
//! Stands in for the browser substrate in tests and non-browser contexts:
//! elements form a tree and deliver events synchronously, the cookie jar
//! honors `document.cookie` assignment semantics, and the storage can be
//! given a quota to exercise failure paths.

use std::{
    cell::{Cell, RefCell},
    rc::Rc,
};

use slabmap::SlabMap;

use super::{
    ConnectivityHost, CookieJar, DomEvent, EntryStore, EventTarget, NodeId, PointerHit,
    PointerHost, Region, ScrollArea, ScrollBehavior, ScrollMetrics, StoreError,
};
use crate::Subscription;

type Listeners<T> = Rc<RefCell<SlabMap<T>>>;

fn remove_listener<T: 'static>(listeners: &Listeners<T>, id: usize) -> Subscription {
    let listeners = Rc::downgrade(listeners);
    Subscription::from_fn(move || {
        if let Some(listeners) = listeners.upgrade() {
            listeners.borrow_mut().remove(id);
        }
    })
}

fn snapshot<T: Clone>(listeners: &Listeners<T>) -> Vec<T> {
    listeners.borrow().values().cloned().collect()
}

/// Document: node identity allocator, pointer-down dispatch, cookie jar.
pub struct MemoryDocument {
    next_id: Cell<u64>,
    pointer_listeners: Listeners<Rc<dyn Fn(&PointerHit)>>,
    cookies: RefCell<Vec<(String, String)>>,
}

impl MemoryDocument {
    pub fn new() -> Rc<Self> {
        Rc::new(Self {
            next_id: Cell::new(0),
            pointer_listeners: Rc::new(RefCell::new(SlabMap::new())),
            cookies: RefCell::new(Vec::new()),
        })
    }

    /// Create a detached element owned by this document.
    pub fn create_element(&self) -> Rc<MemoryElement> {
        let id = self.next_id.get();
        self.next_id.set(id + 1);
        Rc::new(MemoryElement {
            id: NodeId(id),
            children: RefCell::new(Vec::new()),
            listeners: Rc::new(RefCell::new(SlabMap::new())),
            metrics: Cell::new(ScrollMetrics::default()),
        })
    }

    /// Deliver a pointer-down hit on `target` to every document-level listener.
    pub fn pointer_down(&self, target: &MemoryElement) {
        let hit = PointerHit {
            target: target.node_id(),
        };
        for handler in snapshot(&self.pointer_listeners) {
            handler(&hit);
        }
    }
}

impl PointerHost for MemoryDocument {
    fn on_pointer_down(&self, handler: Rc<dyn Fn(&PointerHit)>) -> Subscription {
        let id = self.pointer_listeners.borrow_mut().insert(handler);
        remove_listener(&self.pointer_listeners, id)
    }
}

impl CookieJar for MemoryDocument {
    fn read(&self) -> String {
        self.cookies
            .borrow()
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect::<Vec<_>>()
            .join("; ")
    }

    fn write(&self, attribute: &str) {
        let mut parts = attribute.split(';');
        let Some(pair) = parts.next() else {
            return;
        };
        let Some((key, value)) = pair.split_once('=') else {
            return;
        };
        let key = key.trim();
        // Session cookies written through this crate never carry an
        // `expires` attribute; its presence is the removal form.
        let expired = parts.any(|p| p.trim_start().starts_with("expires="));
        let mut cookies = self.cookies.borrow_mut();
        if expired {
            cookies.retain(|(k, _)| k != key);
        } else if let Some(entry) = cookies.iter_mut().find(|(k, _)| k == key) {
            entry.1 = value.to_string();
        } else {
            cookies.push((key.to_string(), value.to_string()));
        }
    }
}

/// Element: event target, region, scroll container.
pub struct MemoryElement {
    id: NodeId,
    children: RefCell<Vec<Rc<MemoryElement>>>,
    listeners: Listeners<(String, Rc<dyn Fn(&DomEvent)>)>,
    metrics: Cell<ScrollMetrics>,
}

impl MemoryElement {
    pub fn append_child(&self, child: &Rc<MemoryElement>) {
        self.children.borrow_mut().push(child.clone());
    }

    /// Fire `event` on this element.
    pub fn emit(&self, event: &str) {
        let ev = DomEvent {
            name: event.to_string(),
            target: self.id,
        };
        for (name, handler) in snapshot(&self.listeners) {
            if name == event {
                handler(&ev);
            }
        }
    }

    /// Set the scrollable and visible extents, leaving offsets unchanged.
    pub fn set_scroll_extent(&self, scroll_width: f64, scroll_height: f64) {
        let mut m = self.metrics.get();
        m.scroll_width = scroll_width;
        m.scroll_height = scroll_height;
        self.metrics.set(m);
    }

    pub fn set_client_size(&self, client_width: f64, client_height: f64) {
        let mut m = self.metrics.get();
        m.client_width = client_width;
        m.client_height = client_height;
        self.metrics.set(m);
    }
}

impl EventTarget for MemoryElement {
    fn add_listener(&self, event: &str, handler: Rc<dyn Fn(&DomEvent)>) -> Subscription {
        let id = self
            .listeners
            .borrow_mut()
            .insert((event.to_string(), handler));
        remove_listener(&self.listeners, id)
    }
}

impl Region for MemoryElement {
    fn node_id(&self) -> NodeId {
        self.id
    }
    fn contains(&self, node: NodeId) -> bool {
        self.id == node || self.children.borrow().iter().any(|c| c.contains(node))
    }
}

impl ScrollArea for MemoryElement {
    fn scroll_metrics(&self) -> ScrollMetrics {
        self.metrics.get()
    }

    fn scroll_to(&self, x: f64, y: f64, _behavior: ScrollBehavior) {
        let mut m = self.metrics.get();
        m.scroll_left = x.clamp(0.0, (m.scroll_width - m.client_width).max(0.0));
        m.scroll_top = y.clamp(0.0, (m.scroll_height - m.client_height).max(0.0));
        self.metrics.set(m);
        self.emit("scroll");
    }
}

/// Connectivity flag with change events.
pub struct MemoryConnectivity {
    online: Cell<Option<bool>>,
    listeners: Listeners<Rc<dyn Fn(bool)>>,
}

impl MemoryConnectivity {
    pub fn new(online: Option<bool>) -> Rc<Self> {
        Rc::new(Self {
            online: Cell::new(online),
            listeners: Rc::new(RefCell::new(SlabMap::new())),
        })
    }

    /// Flip the flag and fire a change event.
    pub fn set_online(&self, online: bool) {
        self.online.set(Some(online));
        for handler in snapshot(&self.listeners) {
            handler(online);
        }
    }
}

impl ConnectivityHost for MemoryConnectivity {
    fn is_online(&self) -> Option<bool> {
        self.online.get()
    }
    fn on_change(&self, handler: Rc<dyn Fn(bool)>) -> Subscription {
        let id = self.listeners.borrow_mut().insert(handler);
        remove_listener(&self.listeners, id)
    }
}

/// Insertion-ordered key/value store with an optional byte quota.
pub struct MemoryStorage {
    entries: RefCell<Vec<(String, String)>>,
    quota: Option<usize>,
}

impl MemoryStorage {
    pub fn new() -> Rc<Self> {
        Rc::new(Self {
            entries: RefCell::new(Vec::new()),
            quota: None,
        })
    }

    /// A store that fails with [`StoreError::QuotaExceeded`] once the total
    /// stored bytes would exceed `bytes`.
    pub fn with_quota(bytes: usize) -> Rc<Self> {
        Rc::new(Self {
            entries: RefCell::new(Vec::new()),
            quota: Some(bytes),
        })
    }

    fn used_bytes_without(&self, key: &str) -> usize {
        self.entries
            .borrow()
            .iter()
            .filter(|(k, _)| k != key)
            .map(|(k, v)| k.len() + v.len())
            .sum()
    }
}

impl EntryStore for MemoryStorage {
    fn read_entry(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self
            .entries
            .borrow()
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.clone()))
    }

    fn read_all(&self) -> Result<Vec<(String, String)>, StoreError> {
        Ok(self.entries.borrow().clone())
    }

    fn write_entry(&self, key: &str, value: &str) -> Result<(), StoreError> {
        if let Some(quota) = self.quota {
            if self.used_bytes_without(key) + key.len() + value.len() > quota {
                return Err(StoreError::QuotaExceeded);
            }
        }
        let mut entries = self.entries.borrow_mut();
        if let Some(entry) = entries.iter_mut().find(|(k, _)| k == key) {
            entry.1 = value.to_string();
        } else {
            entries.push((key.to_string(), value.to_string()));
        }
        Ok(())
    }

    fn remove_entry(&self, key: &str) -> Result<(), StoreError> {
        self.entries.borrow_mut().retain(|(k, _)| k != key);
        Ok(())
    }
}
