//! Named instance registry
//!
//! Maps a case-insensitive protocol name to exactly one live instance. The
//! registry is an ordinary value: callers create it, share it behind an
//! `Arc` and tear it down explicitly.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::RwLock;

use crate::RegistryError;

/// Name → instance map with one-time binding
pub struct Registry<T: ?Sized> {
    instances: RwLock<HashMap<String, Arc<T>>>,
    suppress_errors: AtomicBool,
}

impl<T: ?Sized> Registry<T> {
    /// Create an empty registry
    pub fn new() -> Self {
        Self {
            instances: RwLock::new(HashMap::new()),
            suppress_errors: AtomicBool::new(false),
        }
    }

    /// Normalize a name for lookup; `None` when blank
    fn key(name: &str) -> Option<String> {
        let trimmed = name.trim();
        (!trimmed.is_empty()).then(|| trimmed.to_lowercase())
    }

    /// Bind `name` to `instance`
    ///
    /// Fails with [`RegistryError::Duplicate`] if the name is already bound.
    pub fn register(&self, name: &str, instance: Arc<T>) -> Result<(), RegistryError> {
        let key = Self::key(name).ok_or(RegistryError::EmptyName)?;
        let mut instances = self.instances.write();
        if instances.contains_key(&key) {
            return Err(RegistryError::Duplicate { name: key });
        }
        instances.insert(key, instance);
        Ok(())
    }

    /// Get an instance if one is bound
    pub fn get(&self, name: &str) -> Option<Arc<T>> {
        let key = Self::key(name)?;
        self.instances.read().get(&key).cloned()
    }

    /// Get an instance or fail with [`RegistryError::Unknown`]
    pub fn lookup(&self, name: &str) -> Result<Arc<T>, RegistryError> {
        self.get(name).ok_or_else(|| RegistryError::Unknown {
            name: name.trim().to_lowercase(),
        })
    }

    /// Whether `name` is bound. Blank names never exist.
    pub fn exists(&self, name: &str) -> bool {
        Self::key(name).is_some_and(|key| self.instances.read().contains_key(&key))
    }

    /// Unbind and return an instance
    pub fn remove(&self, name: &str) -> Option<Arc<T>> {
        let key = Self::key(name)?;
        self.instances.write().remove(&key)
    }

    /// Registered names, sorted
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.instances.read().keys().cloned().collect();
        names.sort();
        names
    }

    /// Unbind everything, returning the instances for teardown
    pub fn drain(&self) -> Vec<(String, Arc<T>)> {
        let mut drained: Vec<_> = self.instances.write().drain().collect();
        drained.sort_by(|a, b| a.0.cmp(&b.0));
        drained
    }

    pub fn len(&self) -> usize {
        self.instances.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.instances.read().is_empty()
    }

    /// Whether aggregate delivery errors should be swallowed
    #[inline]
    pub fn suppress_errors(&self) -> bool {
        self.suppress_errors.load(Ordering::Relaxed)
    }

    pub fn set_suppress_errors(&self, suppress: bool) {
        self.suppress_errors.store(suppress, Ordering::Relaxed);
    }
}

impl<T: ?Sized> Default for Registry<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: ?Sized> fmt::Debug for Registry<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("names", &self.names())
            .field("suppress_errors", &self.suppress_errors())
            .finish()
    }
}
