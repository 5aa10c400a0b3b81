//! # Iteration Supervisor
//!
//! Bounded, retry-free loop over a single collaboration entry point. Each
//! round is independent and disposable; the failure policy decides whether a
//! failed round ends the run or merely leaves a gap in the performance
//! history.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::collab::{CollabDispatcher, DispatchError, SessionResult};

use super::events::{LifecycleEvent, LifecycleEventKind};

/// How the supervisor treats a failed round
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Surface the failure to the caller immediately
    Propagate,
    /// Skip the round and keep iterating
    Suppress,
    /// Skip the round, keep iterating, and log the failure
    #[default]
    SuppressWithLog,
}

/// One iteration's collaboration result plus derived summaries
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PerformanceRecord {
    pub result: SessionResult,
    pub feedback: String,
    pub optimization: String,
}

/// A failure inside a single supervised round
#[derive(Debug, thiserror::Error)]
pub enum RoundError {
    #[error(transparent)]
    Dispatch(#[from] DispatchError),
    #[error("collaboration failed: {0}")]
    Collaboration(String),
    #[error("round cancelled")]
    Cancelled,
}

/// Errors surfaced by a propagating supervisor run
#[derive(Debug, thiserror::Error)]
pub enum SupervisorError {
    #[error("iteration {iteration} failed")]
    Round {
        iteration: u32,
        #[source]
        source: RoundError,
    },
}

/// Repeatedly enters a collaboration mode for a fixed number of rounds
pub struct IterationSupervisor {
    dispatcher: Arc<CollabDispatcher>,
    paradigm: String,
    session_id: String,
    policy: FailurePolicy,
    history: Vec<PerformanceRecord>,
    events: Vec<LifecycleEvent>,
    event_tx: Option<mpsc::Sender<LifecycleEvent>>,
    cancel: CancellationToken,
}

impl IterationSupervisor {
    pub fn new(dispatcher: Arc<CollabDispatcher>, policy: FailurePolicy) -> Self {
        Self {
            dispatcher,
            paradigm: "self-directed".to_string(),
            session_id: "sd".to_string(),
            policy,
            history: Vec::new(),
            events: Vec::new(),
            event_tx: None,
            cancel: CancellationToken::new(),
        }
    }

    /// Override the paradigm entered each round
    pub fn with_paradigm(mut self, paradigm: impl Into<String>) -> Self {
        self.paradigm = paradigm.into();
        self
    }

    /// Override the correlation token reused across rounds
    pub fn with_session_id(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = session_id.into();
        self
    }

    /// Set event channel for streaming progress
    pub fn with_event_channel(mut self, tx: mpsc::Sender<LifecycleEvent>) -> Self {
        self.event_tx = Some(tx);
        self
    }

    /// Attach a cancellation token; cancellation counts as a round failure
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn policy(&self) -> FailurePolicy {
        self.policy
    }

    /// Performance entries recorded so far, one per completed round
    pub fn performance_history(&self) -> &[PerformanceRecord] {
        &self.history
    }

    /// Events collected so far
    pub fn events(&self) -> &[LifecycleEvent] {
        &self.events
    }

    /// Run `iterations` rounds of the configured paradigm.
    ///
    /// Under `Suppress`/`SuppressWithLog` the loop always completes; a failed
    /// round leaves a gap in the history. Under `Propagate` the first failure
    /// returns [`SupervisorError::Round`]. `delay` is awaited between rounds,
    /// racing the cancellation token.
    pub async fn run(
        &mut self,
        task: &str,
        agents: &[String],
        iterations: u32,
        delay: Duration,
    ) -> Result<&[PerformanceRecord], SupervisorError> {
        for iteration in 0..iterations {
            self.emit(
                LifecycleEvent::new(LifecycleEventKind::RoundStarted, "supervisor")
                    .with_data(json!({ "iteration": iteration })),
            )
            .await;

            let round = self.enter_mode(task, agents).await;
            match round {
                Ok(record) => {
                    self.history.push(record);
                    self.emit(
                        LifecycleEvent::new(LifecycleEventKind::RoundCompleted, "supervisor")
                            .with_data(json!({
                                "iteration": iteration,
                                "summary": format!("completed {task} with {}", agents.join(", ")),
                            })),
                    )
                    .await;
                }
                Err(source) => {
                    self.emit(
                        LifecycleEvent::new(LifecycleEventKind::RoundFailed, "supervisor")
                            .with_data(json!({
                                "iteration": iteration,
                                "error": source.to_string(),
                            })),
                    )
                    .await;
                    match self.policy {
                        FailurePolicy::Propagate => {
                            return Err(SupervisorError::Round { iteration, source });
                        }
                        FailurePolicy::Suppress => {}
                        FailurePolicy::SuppressWithLog => {
                            tracing::warn!(
                                iteration,
                                error = %source,
                                "round failed; continuing"
                            );
                        }
                    }
                }
            }

            if !delay.is_zero() && iteration + 1 < iterations {
                tokio::select! {
                    _ = self.cancel.cancelled() => {}
                    _ = tokio::time::sleep(delay) => {}
                }
            }
        }

        Ok(&self.history)
    }

    /// Enter one round of the collaboration mode.
    async fn enter_mode(
        &self,
        task: &str,
        agents: &[String],
    ) -> Result<PerformanceRecord, RoundError> {
        if self.cancel.is_cancelled() {
            return Err(RoundError::Cancelled);
        }

        let result = self
            .dispatcher
            .collaborate(&self.session_id, &self.paradigm, task, agents, None)
            .await?;

        if !result.success {
            return Err(RoundError::Collaboration(
                result
                    .error
                    .unwrap_or_else(|| "collaboration failed".to_string()),
            ));
        }

        Ok(PerformanceRecord {
            result,
            feedback: format!("feedback for {task}"),
            optimization: format!("optimization for {task}"),
        })
    }

    async fn emit(&mut self, event: LifecycleEvent) {
        self.events.push(event.clone());
        if let Some(tx) = &self.event_tx {
            let _ = tx.send(event).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collab::provider::{
        CollaborationProvider, ProviderError, ProviderReply, SessionRequest,
    };
    use crate::collab::InProcessProvider;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicU32, Ordering};

    /// Fails the nth call (1-based); every other call succeeds
    struct FlakyProvider {
        fail_on: u32,
        calls: AtomicU32,
    }

    impl FlakyProvider {
        fn new(fail_on: u32) -> Self {
            Self {
                fail_on,
                calls: AtomicU32::new(0),
            }
        }
    }

    #[async_trait]
    impl CollaborationProvider for FlakyProvider {
        async fn collaborate(
            &self,
            _request: &SessionRequest,
        ) -> Result<ProviderReply, ProviderError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            if call == self.fail_on {
                Err(ProviderError::Unavailable {
                    reason: "backend offline".to_string(),
                })
            } else {
                Ok(ProviderReply::ok())
            }
        }
    }

    fn agents() -> Vec<String> {
        vec!["analyst".to_string(), "builder".to_string()]
    }

    #[tokio::test]
    async fn test_iteration_resilience() {
        let dispatcher = Arc::new(CollabDispatcher::new(Arc::new(FlakyProvider::new(2))));
        let mut supervisor = IterationSupervisor::new(dispatcher, FailurePolicy::Suppress);

        let history = supervisor
            .run("resilient task", &agents(), 3, Duration::ZERO)
            .await
            .unwrap();

        // round 2 failed; the loop still completed all 3 rounds
        assert_eq!(history.len(), 2);
    }

    #[tokio::test]
    async fn test_propagate_policy_raises() {
        let dispatcher = Arc::new(CollabDispatcher::new(Arc::new(FlakyProvider::new(2))));
        let mut supervisor = IterationSupervisor::new(dispatcher, FailurePolicy::Propagate);

        let err = supervisor
            .run("fragile task", &agents(), 3, Duration::ZERO)
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            SupervisorError::Round {
                iteration: 1,
                source: RoundError::Collaboration(_),
            }
        ));
        assert_eq!(supervisor.performance_history().len(), 1);
    }

    #[tokio::test]
    async fn test_performance_history_shape() {
        let dispatcher = Arc::new(CollabDispatcher::new(Arc::new(InProcessProvider::default())));
        let mut supervisor = IterationSupervisor::new(dispatcher, FailurePolicy::SuppressWithLog);

        let task = "Test task for integrated loops";
        let history = supervisor.run(task, &agents(), 2, Duration::ZERO).await.unwrap();

        assert_eq!(history.len(), 2);
        for record in history {
            assert!(record.result.success);
            assert_eq!(record.feedback, format!("feedback for {task}"));
            assert_eq!(record.optimization, format!("optimization for {task}"));
            assert!(!record.feedback.is_empty());
            assert!(!record.optimization.is_empty());
        }
    }

    #[tokio::test]
    async fn test_cancelled_rounds_are_suppressed() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        let dispatcher = Arc::new(CollabDispatcher::new(Arc::new(InProcessProvider::default())));
        let mut supervisor = IterationSupervisor::new(dispatcher, FailurePolicy::Suppress)
            .with_cancellation(cancel);

        let history = supervisor
            .run("cancelled task", &agents(), 3, Duration::ZERO)
            .await
            .unwrap();
        assert!(history.is_empty());

        let failed = supervisor
            .events()
            .iter()
            .filter(|e| e.kind == LifecycleEventKind::RoundFailed)
            .count();
        assert_eq!(failed, 3);
    }

    #[tokio::test]
    async fn test_round_reuses_session_id() {
        let dispatcher = Arc::new(CollabDispatcher::new(Arc::new(InProcessProvider::default())));
        let mut supervisor =
            IterationSupervisor::new(Arc::clone(&dispatcher), FailurePolicy::Suppress);

        supervisor
            .run("same session", &agents(), 3, Duration::ZERO)
            .await
            .unwrap();

        // the correlation token is constant across rounds
        assert_eq!(dispatcher.session_count(), 1);
        assert_eq!(dispatcher.recorded_task("sd").as_deref(), Some("same session"));
    }
}
