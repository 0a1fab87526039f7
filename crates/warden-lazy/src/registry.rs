//! One lazy handle per resource key.

use crate::handle::LazyHandle;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;
use std::sync::Arc;

/// Lazy handles keyed by resource identity.
///
/// Each key gets its own [`LazyHandle`], created on first request, so
/// resources behind different keys are built, fail and retry independently.
pub struct HandleRegistry<K, R> {
    handles: RwLock<HashMap<K, Arc<LazyHandle<R>>>>,
}

impl<K, R> HandleRegistry<K, R>
where
    K: Eq + Hash + Clone + fmt::Display,
{
    pub fn new() -> Self {
        Self {
            handles: RwLock::new(HashMap::new()),
        }
    }

    /// The handle for `key`, creating an uninitialized one if needed.
    pub fn handle(&self, key: &K) -> Arc<LazyHandle<R>> {
        if let Some(handle) = self.handles.read().get(key) {
            return Arc::clone(handle);
        }

        let mut handles = self.handles.write();
        let handle = handles
            .entry(key.clone())
            .or_insert_with(|| Arc::new(LazyHandle::labeled(key.to_string())));
        Arc::clone(handle)
    }

    /// The handle for `key`, initialized with `factory` if it was not ready.
    ///
    /// On success the returned handle is ready and [`LazyHandle::get`]
    /// returns the resource.
    pub fn get_or_init<F, E>(&self, key: &K, factory: F) -> Result<Arc<LazyHandle<R>>, E>
    where
        F: FnOnce() -> Result<R, E>,
        E: fmt::Display,
    {
        let handle = self.handle(key);
        handle.get_or_init(factory)?;
        Ok(handle)
    }

    /// Drop the handle for `key`. Holders of the `Arc` keep the resource.
    pub fn remove(&self, key: &K) -> Option<Arc<LazyHandle<R>>> {
        self.handles.write().remove(key)
    }

    pub fn contains(&self, key: &K) -> bool {
        self.handles.read().contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.handles.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.read().is_empty()
    }

    pub fn keys(&self) -> Vec<K> {
        self.handles.read().keys().cloned().collect()
    }

    /// Number of handles whose resource has been built.
    pub fn ready_count(&self) -> usize {
        self.handles.read().values().filter(|h| h.is_ready()).count()
    }
}

impl<K, R> Default for HandleRegistry<K, R>
where
    K: Eq + Hash + Clone + fmt::Display,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, R> fmt::Debug for HandleRegistry<K, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandleRegistry")
            .field("handles", &self.handles.read().len())
            .finish()
    }
}
