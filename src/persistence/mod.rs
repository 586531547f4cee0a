//! Key-value persistence backends
//!
//! Settings and highscores are stored as JSON strings under string keys:
//! - `MemoryBackend` for native runs and tests
//! - `LocalStorageBackend` in the browser (wasm32 only)

use std::cell::RefCell;
use std::collections::BTreeMap;

use thiserror::Error;

/// Failure talking to a backend
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum BackendError {
    /// Storage cannot be reached (private mode, no window)
    #[error("storage unavailable: {0}")]
    Unavailable(String),
    /// Storage refused the write (quota, permissions)
    #[error("storage rejected write to {key}: {message}")]
    Rejected { key: String, message: String },
}

/// String key-value store
pub trait KvBackend {
    fn get(&self, key: &str) -> Result<Option<String>, BackendError>;
    fn set(&self, key: &str, value: &str) -> Result<(), BackendError>;
    fn remove(&self, key: &str) -> Result<(), BackendError>;
    /// All keys starting with `prefix`, sorted
    fn keys_with_prefix(&self, prefix: &str) -> Result<Vec<String>, BackendError>;
}

/// In-process map
#[derive(Debug, Default)]
pub struct MemoryBackend {
    entries: RefCell<BTreeMap<String, String>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }
}

impl KvBackend for MemoryBackend {
    fn get(&self, key: &str) -> Result<Option<String>, BackendError> {
        Ok(self.entries.borrow().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), BackendError> {
        self.entries
            .borrow_mut()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), BackendError> {
        self.entries.borrow_mut().remove(key);
        Ok(())
    }

    fn keys_with_prefix(&self, prefix: &str) -> Result<Vec<String>, BackendError> {
        Ok(self
            .entries
            .borrow()
            .keys()
            .filter(|k| k.starts_with(prefix))
            .cloned()
            .collect())
    }
}

/// Backend that reads fine but refuses every write
#[cfg(test)]
#[derive(Debug, Default)]
pub struct ReadOnlyBackend {
    inner: MemoryBackend,
}

#[cfg(test)]
impl ReadOnlyBackend {
    pub fn new() -> Self {
        Self::default()
    }
}

#[cfg(test)]
impl KvBackend for ReadOnlyBackend {
    fn get(&self, key: &str) -> Result<Option<String>, BackendError> {
        self.inner.get(key)
    }

    fn set(&self, key: &str, _value: &str) -> Result<(), BackendError> {
        Err(BackendError::Rejected {
            key: key.to_string(),
            message: "read-only".to_string(),
        })
    }

    fn remove(&self, key: &str) -> Result<(), BackendError> {
        self.set(key, "")
    }

    fn keys_with_prefix(&self, prefix: &str) -> Result<Vec<String>, BackendError> {
        self.inner.keys_with_prefix(prefix)
    }
}

#[cfg(target_arch = "wasm32")]
pub use local_storage::LocalStorageBackend;

#[cfg(target_arch = "wasm32")]
mod local_storage {
    use super::{BackendError, KvBackend};

    /// `window.localStorage`
    pub struct LocalStorageBackend {
        storage: web_sys::Storage,
    }

    impl LocalStorageBackend {
        pub fn open() -> Result<Self, BackendError> {
            let storage = web_sys::window()
                .ok_or_else(|| BackendError::Unavailable("no window".into()))?
                .local_storage()
                .map_err(|e| BackendError::Unavailable(format!("{e:?}")))?
                .ok_or_else(|| BackendError::Unavailable("localStorage disabled".into()))?;
            Ok(Self { storage })
        }
    }

    impl KvBackend for LocalStorageBackend {
        fn get(&self, key: &str) -> Result<Option<String>, BackendError> {
            self.storage
                .get_item(key)
                .map_err(|e| BackendError::Unavailable(format!("{e:?}")))
        }

        fn set(&self, key: &str, value: &str) -> Result<(), BackendError> {
            self.storage
                .set_item(key, value)
                .map_err(|e| BackendError::Rejected {
                    key: key.to_string(),
                    message: format!("{e:?}"),
                })
        }

        fn remove(&self, key: &str) -> Result<(), BackendError> {
            self.storage
                .remove_item(key)
                .map_err(|e| BackendError::Rejected {
                    key: key.to_string(),
                    message: format!("{e:?}"),
                })
        }

        fn keys_with_prefix(&self, prefix: &str) -> Result<Vec<String>, BackendError> {
            let len = self
                .storage
                .length()
                .map_err(|e| BackendError::Unavailable(format!("{e:?}")))?;
            let mut keys = Vec::new();
            for i in 0..len {
                if let Ok(Some(key)) = self.storage.key(i) {
                    if key.starts_with(prefix) {
                        keys.push(key);
                    }
                }
            }
            keys.sort();
            Ok(keys)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_backend_roundtrip() {
        let kv = MemoryBackend::new();
        assert_eq!(kv.get("a").unwrap(), None);
        kv.set("a", "1").unwrap();
        assert_eq!(kv.get("a").unwrap().as_deref(), Some("1"));
        kv.remove("a").unwrap();
        assert!(kv.is_empty());
    }

    #[test]
    fn test_keys_with_prefix() {
        let kv = MemoryBackend::new();
        kv.set("hs:dodge:b", "x").unwrap();
        kv.set("hs:dodge:a", "x").unwrap();
        kv.set("hs:merge:a", "x").unwrap();
        kv.set("settings", "x").unwrap();
        assert_eq!(
            kv.keys_with_prefix("hs:dodge:").unwrap(),
            vec!["hs:dodge:a".to_string(), "hs:dodge:b".to_string()]
        );
    }

    #[test]
    fn test_read_only_rejects_writes() {
        let kv = ReadOnlyBackend::new();
        assert!(matches!(kv.set("k", "v"), Err(BackendError::Rejected { .. })));
        assert_eq!(kv.get("k").unwrap(), None);
    }
}
