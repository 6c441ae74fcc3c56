//! Durable storage of the single session bearer token.

use crate::Error;
use std::sync::{Arc, RwLock};

/// Holds at most one bearer token. Setting a new one overwrites the old,
/// clearing removes it entirely. No expiry is tracked.
///
/// Readers must treat a missing token as absence: another process may clear
/// the store at any time.
pub trait TokenStore: Send + Sync {
    fn get(&self) -> Option<String>;

    /// # Errors
    /// Returns an error if the token cannot be persisted.
    fn set(&self, token: &str) -> Result<(), Error>;

    fn clear(&self);

    fn has(&self) -> bool {
        self.get().is_some()
    }
}

impl<T: TokenStore + ?Sized> TokenStore for Arc<T> {
    fn get(&self) -> Option<String> {
        (**self).get()
    }

    fn set(&self, token: &str) -> Result<(), Error> {
        (**self).set(token)
    }

    fn clear(&self) {
        (**self).clear();
    }

    fn has(&self) -> bool {
        (**self).has()
    }
}

/// Process-local store; lost when the process exits.
#[derive(Debug, Clone, Default)]
pub struct MemoryTokenStore {
    token: Arc<RwLock<Option<String>>>,
}

impl MemoryTokenStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_token(token: impl Into<String>) -> Self {
        Self {
            token: Arc::new(RwLock::new(Some(token.into()))),
        }
    }
}

impl TokenStore for MemoryTokenStore {
    fn get(&self) -> Option<String> {
        self.token.read().ok().and_then(|guard| guard.clone())
    }

    fn set(&self, token: &str) -> Result<(), Error> {
        let mut guard = self
            .token
            .write()
            .map_err(|_| Error::Storage("token lock poisoned".to_string()))?;
        *guard = Some(token.to_string());
        Ok(())
    }

    fn clear(&self) {
        if let Ok(mut guard) = self.token.write() {
            *guard = None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_overwrites_and_clear_removes() {
        let store = MemoryTokenStore::new();
        assert!(!store.has());

        store.set("first").unwrap();
        store.set("second").unwrap();
        assert_eq!(store.get().as_deref(), Some("second"));

        store.clear();
        assert_eq!(store.get(), None);
        assert!(!store.has());
    }

    #[test]
    fn clones_share_the_same_slot() {
        let store = MemoryTokenStore::with_token("abc");
        let other = store.clone();
        other.clear();
        assert!(!store.has());
    }
}
