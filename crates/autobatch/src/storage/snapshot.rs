//! Persisted copy of the Active bucket.
//!
//! The snapshot lets a restarted client show in-flight jobs before the
//! first full fetch completes. It is never authoritative.

use std::sync::{Arc, Mutex, MutexGuard};

use super::LocalStore;
use crate::error::StorageError;
use crate::job::Job;

/// What the store is known to hold under the snapshot key.
#[derive(Debug, Clone, PartialEq)]
enum Stored {
    Unknown,
    Absent,
    Written(String),
}

pub struct ActiveJobSnapshot {
    store: Arc<dyn LocalStore>,
    key: String,
    stored: Mutex<Stored>,
}

impl ActiveJobSnapshot {
    pub fn new(store: Arc<dyn LocalStore>, key: impl Into<String>) -> Self {
        Self {
            store,
            key: key.into(),
            stored: Mutex::new(Stored::Unknown),
        }
    }

    fn stored(&self) -> MutexGuard<'_, Stored> {
        match self.stored.lock() {
            Ok(g) => g,
            Err(poisoned) => {
                log::warn!("Snapshot state lock was poisoned, recovering");
                poisoned.into_inner()
            }
        }
    }

    /// Writes the Active bucket, or removes the key when it is empty.
    ///
    /// Returns `true` when storage was touched; an unchanged bucket is not rewritten.
    pub fn sync(&self, active: &[Job]) -> Result<bool, StorageError> {
        let mut stored = self.stored();

        if active.is_empty() {
            if *stored == Stored::Absent {
                return Ok(false);
            }
            self.store.remove(&self.key)?;
            *stored = Stored::Absent;
            log::debug!("Active bucket empty, cleared snapshot '{}'", self.key);
            return Ok(true);
        }

        let json = serde_json::to_string(active)?;
        if matches!(&*stored, Stored::Written(prev) if *prev == json) {
            return Ok(false);
        }
        self.store.set(&self.key, &json)?;
        log::debug!(
            "Persisted {} active job(s) under '{}'",
            active.len(),
            self.key
        );
        *stored = Stored::Written(json);
        Ok(true)
    }

    /// Reads the last persisted Active bucket.
    ///
    /// A snapshot that no longer parses is discarded and treated as empty.
    pub fn load(&self) -> Result<Vec<Job>, StorageError> {
        let mut stored = self.stored();
        let Some(raw) = self.store.get(&self.key)? else {
            *stored = Stored::Absent;
            return Ok(Vec::new());
        };

        match serde_json::from_str::<Vec<Job>>(&raw) {
            Ok(jobs) => {
                *stored = Stored::Written(raw);
                Ok(jobs)
            }
            Err(e) => {
                log::warn!("Discarding unreadable snapshot '{}': {}", self.key, e);
                self.store.remove(&self.key)?;
                *stored = Stored::Absent;
                Ok(Vec::new())
            }
        }
    }
}
