//! # Delivery Lifecycle
//!
//! Sequencing layers over the collaboration dispatcher.
//!
//! ```text
//! requirements → architecture → code → test → review → deploy → monitor → feedback
//! ```
//!
//! The pipeline runner treats every stage as a required link (fail-fast); the
//! iteration supervisor treats every round as disposable (policy-driven).

pub mod events;
pub mod runner;
pub mod stage;
pub mod supervisor;

pub use events::{LifecycleEvent, LifecycleEventKind};
pub use runner::{PipelineError, PipelineRunner, StageRecord};
pub use stage::PipelineStage;
pub use supervisor::{
    FailurePolicy, IterationSupervisor, PerformanceRecord, RoundError, SupervisorError,
};
