//! Application state
//!
//! One explicit state object handed to the UI layer by reference. Fields are
//! private; the setters below are the only way to change them.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

use generation::{CrystalProfile, ModelSummary};

/// How many generations the history keeps
pub const MAX_HISTORY: usize = 50;

/// Shared state type used by the front end
pub type SharedAppState = Arc<RwLock<AppState>>;

/// Last known state of the Ollama daemon
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionStatus {
    pub connected: bool,
    pub version: Option<String>,
    pub models: Vec<String>,
    pub last_error: Option<String>,
}

/// One finished generation
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    pub id: Uuid,
    pub description: String,
    pub component_name: Option<String>,
    pub code: String,
    pub created_at: DateTime<Utc>,
    /// Failure message of the preview, if it failed
    pub error: Option<String>,
}

impl HistoryEntry {
    pub fn new(
        description: impl Into<String>,
        code: impl Into<String>,
        component_name: Option<String>,
        error: Option<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            description: description.into(),
            component_name,
            code: code.into(),
            created_at: Utc::now(),
            error,
        }
    }
}

#[derive(Debug, Default)]
pub struct AppState {
    connection: ConnectionStatus,
    crystal: CrystalProfile,
    history: VecDeque<HistoryEntry>,
    generating: bool,
}

impl AppState {
    pub fn new(crystal: CrystalProfile) -> Self {
        Self {
            crystal,
            ..Self::default()
        }
    }

    pub fn shared(self) -> SharedAppState {
        Arc::new(RwLock::new(self))
    }

    // Connection -------------------------------------------------------------

    pub fn connection(&self) -> &ConnectionStatus {
        &self.connection
    }

    pub fn set_connected(&mut self, version: Option<String>, models: &[ModelSummary]) {
        self.connection = ConnectionStatus {
            connected: true,
            version,
            models: models.iter().map(|m| m.name.clone()).collect(),
            last_error: None,
        };
    }

    /// Keeps the last known model list for display
    pub fn set_disconnected(&mut self, error: impl Into<String>) {
        self.connection.connected = false;
        self.connection.last_error = Some(error.into());
    }

    // Crystal ----------------------------------------------------------------

    pub fn crystal(&self) -> &CrystalProfile {
        &self.crystal
    }

    pub fn set_crystal(&mut self, crystal: CrystalProfile) {
        log::info!("Active crystal is now {}", crystal.name);
        self.crystal = crystal;
    }

    // Generation -------------------------------------------------------------

    pub fn is_generating(&self) -> bool {
        self.generating
    }

    pub fn set_generating(&mut self, generating: bool) {
        self.generating = generating;
    }

    /// History, newest first
    pub fn history(&self) -> impl Iterator<Item = &HistoryEntry> {
        self.history.iter()
    }

    pub fn history_len(&self) -> usize {
        self.history.len()
    }

    pub fn record(&mut self, entry: HistoryEntry) -> Uuid {
        let id = entry.id;
        self.history.push_front(entry);
        self.history.truncate(MAX_HISTORY);
        id
    }

    pub fn find(&self, id: Uuid) -> Option<&HistoryEntry> {
        self.history.iter().find(|entry| entry.id == id)
    }

    pub fn remove(&mut self, id: Uuid) -> Option<HistoryEntry> {
        let index = self.history.iter().position(|entry| entry.id == id)?;
        self.history.remove(index)
    }

    pub fn clear_history(&mut self) {
        self.history.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_history_is_bounded_and_newest_first() {
        let mut state = AppState::default();
        let mut ids = Vec::new();
        for i in 0..(MAX_HISTORY + 5) {
            ids.push(state.record(HistoryEntry::new(format!("d{}", i), "code", None, None)));
        }
        assert_eq!(state.history_len(), MAX_HISTORY);
        assert_eq!(state.history().next().unwrap().description, format!("d{}", MAX_HISTORY + 4));
        assert!(state.find(ids[0]).is_none());

        let newest = *ids.last().unwrap();
        assert!(state.remove(newest).is_some());
        assert!(state.find(newest).is_none());
        state.clear_history();
        assert_eq!(state.history_len(), 0);
    }

    #[test]
    fn test_connection_transitions() {
        let mut state = AppState::new(CrystalProfile::amethyst());
        assert!(!state.connection().connected);

        let models = vec![ModelSummary {
            name: "llama3".into(),
            size: None,
            digest: None,
            modified_at: None,
        }];
        state.set_connected(Some("0.5.1".into()), &models);
        assert!(state.connection().connected);
        assert_eq!(state.connection().models, vec!["llama3"]);

        state.set_disconnected("connection refused");
        assert!(!state.connection().connected);
        assert_eq!(state.connection().models, vec!["llama3"]);
        assert_eq!(state.connection().last_error.as_deref(), Some("connection refused"));
    }

    #[tokio::test]
    async fn test_shared_state() {
        let shared = AppState::default().shared();
        shared.write().await.set_generating(true);
        assert!(shared.read().await.is_generating());
        assert_eq!(shared.read().await.crystal().name, "Amethyst");
    }
}
