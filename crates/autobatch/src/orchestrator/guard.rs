//! Per-target in-flight markers for lifecycle operations.

use std::collections::HashSet;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::error::{OrchestratorError, Result};

/// What a lifecycle operation mutates.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(crate) enum OperationTarget {
    /// A job that does not exist yet, keyed by its folder.
    NewJob(String),
    Job(String),
}

impl fmt::Display for OperationTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OperationTarget::NewJob(folder) => write!(f, "new job in {}", folder),
            OperationTarget::Job(id) => write!(f, "job {}", id),
        }
    }
}

#[derive(Clone, Default)]
pub(crate) struct InFlight {
    targets: Arc<Mutex<HashSet<OperationTarget>>>,
}

impl InFlight {
    fn lock(&self) -> MutexGuard<'_, HashSet<OperationTarget>> {
        match self.targets.lock() {
            Ok(g) => g,
            Err(poisoned) => {
                log::warn!("In-flight set lock was poisoned, recovering");
                poisoned.into_inner()
            }
        }
    }

    /// Marks the target busy until the returned guard drops.
    pub fn acquire(&self, target: OperationTarget) -> Result<OperationGuard> {
        let mut targets = self.lock();
        if !targets.insert(target.clone()) {
            return Err(OrchestratorError::OperationInProgress(target.to_string()));
        }
        Ok(OperationGuard {
            in_flight: self.clone(),
            target,
        })
    }

    pub fn job_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self
            .lock()
            .iter()
            .filter_map(|t| match t {
                OperationTarget::Job(id) => Some(id.clone()),
                OperationTarget::NewJob(_) => None,
            })
            .collect();
        ids.sort();
        ids
    }
}

pub(crate) struct OperationGuard {
    in_flight: InFlight,
    target: OperationTarget,
}

impl Drop for OperationGuard {
    fn drop(&mut self) {
        self.in_flight.lock().remove(&self.target);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_acquire_is_rejected() {
        let in_flight = InFlight::default();
        let _guard = in_flight
            .acquire(OperationTarget::Job("j1".to_string()))
            .unwrap();

        let err = in_flight
            .acquire(OperationTarget::Job("j1".to_string()))
            .err()
            .unwrap();
        assert!(matches!(err, OrchestratorError::OperationInProgress(_)));
    }

    #[test]
    fn test_distinct_targets_are_independent() {
        let in_flight = InFlight::default();
        let _a = in_flight
            .acquire(OperationTarget::Job("a".to_string()))
            .unwrap();
        let _b = in_flight
            .acquire(OperationTarget::Job("b".to_string()))
            .unwrap();
        let _new = in_flight
            .acquire(OperationTarget::NewJob("/scans".to_string()))
            .unwrap();

        assert_eq!(in_flight.job_ids(), vec!["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn test_drop_releases_target() {
        let in_flight = InFlight::default();
        {
            let _guard = in_flight
                .acquire(OperationTarget::Job("j1".to_string()))
                .unwrap();
            assert_eq!(in_flight.job_ids().len(), 1);
        }
        assert!(in_flight.job_ids().is_empty());
        assert!(in_flight
            .acquire(OperationTarget::Job("j1".to_string()))
            .is_ok());
    }
}
