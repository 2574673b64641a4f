//! Join phase types and shared session state handle.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::Mutex;

/// Phase of one meeting-join session, in transition order. `Completed`,
/// `AdmissionTimeout` and `Failed` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JoinPhase {
    Init,
    EnvironmentReady,
    BrowserReady,
    LinkOpened,
    PermissionsGranted,
    DevicesConfigured,
    NameEntered,
    AdmissionRequested,
    Admitted,
    CaptionsEnabled,
    Capturing,
    Completed,
    AdmissionTimeout,
    Failed,
}

impl JoinPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Init => "init",
            Self::EnvironmentReady => "environment_ready",
            Self::BrowserReady => "browser_ready",
            Self::LinkOpened => "link_opened",
            Self::PermissionsGranted => "permissions_granted",
            Self::DevicesConfigured => "devices_configured",
            Self::NameEntered => "name_entered",
            Self::AdmissionRequested => "admission_requested",
            Self::Admitted => "admitted",
            Self::CaptionsEnabled => "captions_enabled",
            Self::Capturing => "capturing",
            Self::Completed => "completed",
            Self::AdmissionTimeout => "admission_timeout",
            Self::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Completed | Self::AdmissionTimeout | Self::Failed
        )
    }
}

/// Current session state, readable by API handlers.
#[derive(Debug, Clone)]
pub struct SessionState {
    pub phase: JoinPhase,
    pub meeting_link: Option<String>,
    pub started_at: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
}

impl Default for SessionState {
    fn default() -> Self {
        Self {
            phase: JoinPhase::Init,
            meeting_link: None,
            started_at: None,
            last_error: None,
        }
    }
}

/// Thread-safe handle shared between a session task and API handlers.
#[derive(Clone, Default)]
pub struct SessionStatusHandle {
    inner: Arc<Mutex<SessionState>>,
}

impl SessionStatusHandle {
    pub async fn get(&self) -> SessionState {
        self.inner.lock().await.clone()
    }

    pub async fn begin(&self, meeting_link: String) {
        let mut state = self.inner.lock().await;
        state.phase = JoinPhase::Init;
        state.meeting_link = Some(meeting_link);
        state.started_at = Some(Utc::now());
        state.last_error = None;
    }

    pub async fn set_phase(&self, phase: JoinPhase) {
        let mut state = self.inner.lock().await;
        state.phase = phase;
    }

    pub async fn fail(&self, error: String) {
        let mut state = self.inner.lock().await;
        state.phase = JoinPhase::Failed;
        state.last_error = Some(error);
    }
}

/// Live view of every in-flight session, keyed by meeting row id. Sessions
/// share nothing else; the registry only exists so the API can report
/// phases.
#[derive(Clone, Default)]
pub struct SessionRegistry {
    inner: Arc<Mutex<std::collections::HashMap<i64, SessionStatusHandle>>>,
}

impl SessionRegistry {
    pub async fn register(&self, id: i64, handle: SessionStatusHandle) {
        self.inner.lock().await.insert(id, handle);
    }

    pub async fn remove(&self, id: i64) {
        self.inner.lock().await.remove(&id);
    }

    pub async fn snapshot(&self) -> Vec<(i64, SessionState)> {
        let handles: Vec<(i64, SessionStatusHandle)> = {
            let guard = self.inner.lock().await;
            guard.iter().map(|(id, h)| (*id, h.clone())).collect()
        };
        let mut states = Vec::with_capacity(handles.len());
        for (id, handle) in handles {
            states.push((id, handle.get().await));
        }
        states.sort_by_key(|(id, _)| *id);
        states
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phase_as_str() {
        assert_eq!(JoinPhase::Init.as_str(), "init");
        assert_eq!(JoinPhase::AdmissionRequested.as_str(), "admission_requested");
        assert_eq!(JoinPhase::AdmissionTimeout.as_str(), "admission_timeout");
        assert_eq!(JoinPhase::Capturing.as_str(), "capturing");
    }

    #[test]
    fn test_terminal_phases() {
        assert!(JoinPhase::Completed.is_terminal());
        assert!(JoinPhase::AdmissionTimeout.is_terminal());
        assert!(JoinPhase::Failed.is_terminal());
        assert!(!JoinPhase::Capturing.is_terminal());
        assert!(!JoinPhase::Init.is_terminal());
    }

    #[test]
    fn test_phase_serialization() {
        let json = serde_json::to_string(&JoinPhase::CaptionsEnabled).unwrap();
        assert_eq!(json, "\"captions_enabled\"");

        let parsed: JoinPhase = serde_json::from_str("\"admission_timeout\"").unwrap();
        assert_eq!(parsed, JoinPhase::AdmissionTimeout);
    }

    #[tokio::test]
    async fn test_status_handle_begin_and_phase() {
        let handle = SessionStatusHandle::default();
        handle.begin("https://meet.example.com/abc".to_string()).await;

        let state = handle.get().await;
        assert_eq!(state.phase, JoinPhase::Init);
        assert_eq!(
            state.meeting_link.as_deref(),
            Some("https://meet.example.com/abc")
        );
        assert!(state.started_at.is_some());

        handle.set_phase(JoinPhase::Capturing).await;
        assert_eq!(handle.get().await.phase, JoinPhase::Capturing);
    }

    #[tokio::test]
    async fn test_registry_snapshot_sorted() {
        let registry = SessionRegistry::default();
        let a = SessionStatusHandle::default();
        a.set_phase(JoinPhase::Capturing).await;
        let b = SessionStatusHandle::default();

        registry.register(7, a).await;
        registry.register(3, b).await;

        let snapshot = registry.snapshot().await;
        assert_eq!(snapshot.len(), 2);
        assert_eq!(snapshot[0].0, 3);
        assert_eq!(snapshot[1].0, 7);
        assert_eq!(snapshot[1].1.phase, JoinPhase::Capturing);

        registry.remove(7).await;
        assert_eq!(registry.snapshot().await.len(), 1);
    }

    #[tokio::test]
    async fn test_status_handle_fail() {
        let handle = SessionStatusHandle::default();
        handle.fail("browser crashed".to_string()).await;

        let state = handle.get().await;
        assert_eq!(state.phase, JoinPhase::Failed);
        assert_eq!(state.last_error.as_deref(), Some("browser crashed"));
    }
}
