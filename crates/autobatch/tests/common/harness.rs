//! Test harness for orchestrator integration tests.
//!
//! The `TestHarness` wires an `Orchestrator` around a `FakeBackend`, an
//! in-memory SQLite store and a notification broadcaster whose output the
//! test can drain. Tests run on a paused tokio clock, so poll intervals
//! elapse instantly.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;

use autobatch::{
    LocalStore, NewJob, Notification, NotificationBroadcaster, NotificationKind, Orchestrator,
    OrchestratorOptions, PollSettings, ProcessType, SqliteStore,
};

use super::fake_backend::FakeBackend;

pub const OWNER: &str = "user-1";

pub struct TestHarness {
    pub backend: Arc<FakeBackend>,
    pub store: Arc<SqliteStore>,
    pub orchestrator: Orchestrator,
    notifications: broadcast::Receiver<Notification>,
    seen: Vec<Notification>,
}

impl TestHarness {
    /// Harness with a session owner and default poll settings.
    pub fn new() -> Self {
        Self::with_store(Arc::new(SqliteStore::open_in_memory().unwrap()))
    }

    pub fn with_store(store: Arc<SqliteStore>) -> Self {
        Self::build(Arc::new(FakeBackend::new()), store, Some(OWNER))
    }

    /// Harness whose orchestrator has no session owner.
    pub fn anonymous() -> Self {
        Self::build(
            Arc::new(FakeBackend::new()),
            Arc::new(SqliteStore::open_in_memory().unwrap()),
            None,
        )
    }

    fn build(backend: Arc<FakeBackend>, store: Arc<SqliteStore>, owner: Option<&str>) -> Self {
        let broadcaster = NotificationBroadcaster::new(256);
        let notifications = broadcaster.subscribe();
        let store_dyn: Arc<dyn LocalStore> = store.clone();
        let orchestrator = Orchestrator::new(
            backend.clone(),
            store_dyn,
            Arc::new(broadcaster),
            OrchestratorOptions {
                owner_id: owner.map(str::to_string),
                ..OrchestratorOptions::default()
            },
        );
        Self {
            backend,
            store,
            orchestrator,
            notifications,
            seen: Vec::new(),
        }
    }

    pub fn poll_settings(&self) -> PollSettings {
        self.orchestrator.poll_settings()
    }

    /// Lets spawned tasks run without advancing past the next poll.
    pub async fn settle(&self) {
        tokio::time::sleep(Duration::from_millis(1)).await;
    }

    /// Advances the clock by `n` poll intervals.
    pub async fn advance_polls(&self, n: u32) {
        tokio::time::sleep(self.poll_settings().interval * n).await;
    }

    /// Every notification emitted so far.
    pub fn notifications(&mut self) -> &[Notification] {
        while let Ok(notification) = self.notifications.try_recv() {
            self.seen.push(notification);
        }
        &self.seen
    }

    pub fn count(&mut self, kind: NotificationKind) -> usize {
        self.notifications()
            .iter()
            .filter(|n| n.kind == kind)
            .count()
    }

    /// A valid categorization job for the harness owner.
    pub fn new_job(&self, title: &str) -> NewJob {
        NewJob {
            title: title.to_string(),
            folder_path: format!("/documents/{}", title.to_lowercase()),
            process_type: ProcessType::Categorization,
            owner_id: OWNER.to_string(),
            selected_prompts: Vec::new(),
            selected_categories: vec!["Invoices".to_string()],
        }
    }
}
