//! # Collaboration Dispatcher
//!
//! Session-scoped entry point for requesting a named paradigm of multi-agent
//! work. Provider failures come back as structured results, never as raised
//! faults; only broken preconditions raise.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio_util::sync::CancellationToken;

use super::provider::{CollaborationProvider, SessionRequest};

/// Structured result of a collaboration session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionResult {
    pub success: bool,
    /// Paradigm label, echoed verbatim
    pub paradigm: String,
    /// Task description, echoed verbatim
    pub task: String,
    /// Participating agent ids, echoed in order
    pub agents: Vec<String>,
    /// Completion label ("ok" on success)
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub synthesis: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Broken preconditions on a collaboration request
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("session id must be non-empty")]
    EmptySessionId,
    #[error("agent list must be non-empty")]
    NoAgents,
}

/// Dispatches collaboration sessions to a provider
///
/// Owned by the caller's orchestration context; the session map is the only
/// shared state and is mutated behind a lock, so concurrent `collaborate`
/// calls can be fanned out and joined freely.
pub struct CollabDispatcher {
    provider: Arc<dyn CollaborationProvider>,
    sessions: Mutex<HashMap<String, String>>,
    cancel: CancellationToken,
}

impl CollabDispatcher {
    pub fn new(provider: Arc<dyn CollaborationProvider>) -> Self {
        Self {
            provider,
            sessions: Mutex::new(HashMap::new()),
            cancel: CancellationToken::new(),
        }
    }

    /// Attach a cancellation token observed while awaiting the provider
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Request a named paradigm of multi-agent work on a task.
    ///
    /// `session_id` is an opaque correlation token and `paradigm` an
    /// uninterpreted label; both are forwarded verbatim. The session is
    /// recorded (`session_id` → `task`) before dispatch. Provider failures
    /// and cancellation surface as a result with `success: false`.
    pub async fn collaborate(
        &self,
        session_id: &str,
        paradigm: &str,
        task: &str,
        agents: &[String],
        context: Option<Value>,
    ) -> Result<SessionResult, DispatchError> {
        if session_id.is_empty() {
            return Err(DispatchError::EmptySessionId);
        }
        if agents.is_empty() {
            return Err(DispatchError::NoAgents);
        }

        self.sessions
            .lock()
            .insert(session_id.to_owned(), task.to_owned());

        let request = SessionRequest {
            session_id: session_id.to_owned(),
            paradigm: paradigm.to_owned(),
            task: task.to_owned(),
            agents: agents.to_vec(),
            context,
        };

        if self.cancel.is_cancelled() {
            return Ok(failure(request, "cancelled".to_string()));
        }

        let reply = tokio::select! {
            _ = self.cancel.cancelled() => None,
            reply = self.provider.collaborate(&request) => Some(reply),
        };

        Ok(match reply {
            None => failure(request, "cancelled".to_string()),
            Some(Ok(reply)) => SessionResult {
                success: true,
                paradigm: request.paradigm,
                task: request.task,
                agents: request.agents,
                status: reply.status,
                synthesis: reply.synthesis,
                error: None,
            },
            Some(Err(err)) => {
                tracing::warn!(
                    session = %request.session_id,
                    error = %err,
                    "collaboration provider failed"
                );
                failure(request, err.to_string())
            }
        })
    }

    /// Number of sessions recorded so far
    pub fn session_count(&self) -> usize {
        self.sessions.lock().len()
    }

    /// Snapshot of the session id → task map
    pub fn sessions(&self) -> HashMap<String, String> {
        self.sessions.lock().clone()
    }

    /// Task recorded for a session, if any
    pub fn recorded_task(&self, session_id: &str) -> Option<String> {
        self.sessions.lock().get(session_id).cloned()
    }
}

fn failure(request: SessionRequest, error: String) -> SessionResult {
    SessionResult {
        success: false,
        paradigm: request.paradigm,
        task: request.task,
        agents: request.agents,
        status: "failed".to_string(),
        synthesis: None,
        error: Some(error),
    }
}
