//! # Lifecycle Events
//!
//! Progress events emitted while a pipeline or supervisor runs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Kind of lifecycle event
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleEventKind {
    /// Pipeline run started
    PipelineStarted,
    /// A stage began collaborating
    StageStarted,
    /// A stage appended its history entry
    StageCompleted,
    /// A stage failed; the run halts
    StageFailed,
    /// All eight stages completed
    PipelineCompleted,
    /// The run halted before completion
    PipelineFailed,
    /// A supervised round started
    RoundStarted,
    /// A supervised round recorded its performance entry
    RoundCompleted,
    /// A supervised round failed
    RoundFailed,
}

/// An event in a pipeline or supervisor run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LifecycleEvent {
    /// Unique event id
    pub id: String,
    pub timestamp: DateTime<Utc>,
    pub kind: LifecycleEventKind,
    /// Component that produced the event
    pub source: String,
    /// Related stage name, if any
    #[serde(default)]
    pub stage: Option<String>,
    /// Associated data (JSON)
    #[serde(default)]
    pub data: Option<serde_json::Value>,
}

impl LifecycleEvent {
    pub fn new(kind: LifecycleEventKind, source: &str) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
            kind,
            source: source.to_string(),
            stage: None,
            data: None,
        }
    }

    pub fn with_stage(mut self, stage: &str) -> Self {
        self.stage = Some(stage.to_string());
        self
    }

    pub fn with_data(mut self, data: serde_json::Value) -> Self {
        self.data = Some(data);
        self
    }
}
