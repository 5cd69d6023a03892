use std::{marker::PhantomData, rc::Rc};

use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use tracing::warn;

use crate::{
    core::ActionContext,
    platform::{CookieJar, EntryStore, StoreError},
    SignalContext, State,
};

#[cfg(test)]
mod tests;

/// A value stored under a fixed key in an [`EntryStore`], JSON-encoded.
///
/// The store itself is not reactive, so every mutation bumps an internal
/// revision; readers that went through a tracking [`SignalContext`] observe
/// the new state on the next update.
///
/// No store or serialization failure ever reaches the caller: errors are
/// logged as warnings and surface as `None` (reads) or a no-op (writes).
/// Concurrent accessors for the same key are not coordinated; the last write
/// wins.
pub struct StoredValue<T, S: ?Sized = dyn EntryStore> {
    store: Rc<S>,
    key: String,
    revision: State<u64>,
    _value: PhantomData<fn() -> T>,
}

impl<T, S> StoredValue<T, S>
where
    T: Serialize + DeserializeOwned,
    S: EntryStore + ?Sized,
{
    pub fn new(store: Rc<S>, key: impl Into<String>) -> Self {
        Self {
            store,
            key: key.into(),
            revision: State::new(0),
            _value: PhantomData,
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// JSON-encode `value` and write it under the key.
    pub fn set(&self, value: &T, ac: &mut ActionContext) {
        let text = match serde_json::to_string(value) {
            Ok(text) => text,
            Err(err) => {
                warn!(key = %self.key, error = %err, "failed to encode stored value");
                return;
            }
        };
        if let Err(err) = self.store.write_entry(&self.key, &text) {
            warn!(key = %self.key, error = %err, "failed to write stored value");
            return;
        }
        self.bump(ac);
    }

    /// The current value under the key, or `None` if absent or unreadable.
    pub fn get(&self, sc: &mut SignalContext) -> Option<T> {
        self.revision.get(sc);
        let text = match self.store.read_entry(&self.key) {
            Ok(text) => text?,
            Err(err) => {
                warn!(key = %self.key, error = %err, "failed to read stored value");
                return None;
            }
        };
        match serde_json::from_str(&text) {
            Ok(value) => Some(value),
            Err(err) => {
                warn!(key = %self.key, error = %err, "failed to decode stored value");
                None
            }
        }
    }

    /// Every entry in the backing store, in store order, with JSON-decoded
    /// values. Entries whose text does not decode are dropped with a warning.
    pub fn entries(&self, sc: &mut SignalContext) -> Vec<(String, Value)> {
        self.revision.get(sc);
        let entries = match self.store.read_all() {
            Ok(entries) => entries,
            Err(err) => {
                warn!(error = %err, "failed to list stored values");
                return Vec::new();
            }
        };
        entries
            .into_iter()
            .filter_map(|(key, text)| match serde_json::from_str(&text) {
                Ok(value) => Some((key, value)),
                Err(err) => {
                    warn!(key = %key, error = %err, "skipping undecodable stored value");
                    None
                }
            })
            .collect()
    }

    /// Remove the entry under the key.
    pub fn remove(&self, ac: &mut ActionContext) {
        if let Err(err) = self.store.remove_entry(&self.key) {
            warn!(key = %self.key, error = %err, "failed to remove stored value");
            return;
        }
        self.bump(ac);
    }

    fn bump(&self, ac: &mut ActionContext) {
        *self.revision.borrow_mut(ac) += 1;
    }
}

impl<T> StoredValue<T, dyn EntryStore>
where
    T: Serialize + DeserializeOwned,
{
    /// A session-cookie-backed accessor for `key`.
    pub fn cookie<J: CookieJar>(jar: &Rc<J>, key: impl Into<String>) -> StoredValue<T> {
        StoredValue::new(
            Rc::new(CookieEntryStore::new(jar.clone())) as Rc<dyn EntryStore>,
            key,
        )
    }
}

/// Adapts a [`CookieJar`] to the [`EntryStore`] port.
///
/// Entries are written as a single `key=<json>` assignment with no expiry
/// (session-scoped); removal writes the past-epoch expiry form. Reads parse
/// the semicolon-delimited jar string linearly.
pub struct CookieEntryStore<J: ?Sized = dyn CookieJar> {
    jar: Rc<J>,
}

impl<J: CookieJar + ?Sized> CookieEntryStore<J> {
    pub fn new(jar: Rc<J>) -> Self {
        Self { jar }
    }

    fn parse(text: &str) -> Vec<(String, String)> {
        text.split(';')
            .filter_map(|cookie| {
                let (key, value) = cookie.split_once('=')?;
                let key = key.trim();
                if key.is_empty() {
                    None
                } else {
                    Some((key.to_string(), value.to_string()))
                }
            })
            .collect()
    }
}

impl<J: CookieJar + ?Sized> EntryStore for CookieEntryStore<J> {
    fn read_entry(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(Self::parse(&self.jar.read())
            .into_iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v))
    }

    fn read_all(&self) -> Result<Vec<(String, String)>, StoreError> {
        Ok(Self::parse(&self.jar.read()))
    }

    fn write_entry(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.jar.write(&format!("{key}={value}"));
        Ok(())
    }

    fn remove_entry(&self, key: &str) -> Result<(), StoreError> {
        self.jar
            .write(&format!("{key}=; expires=Thu, 01 Jan 1970 00:00:00 GMT"));
        Ok(())
    }
}
