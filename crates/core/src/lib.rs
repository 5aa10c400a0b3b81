//! # Conclave Core
//!
//! Coordination layer for autonomous agents: a peer-mesh message-passing
//! layer, a session-scoped collaboration dispatcher, and the sequencing
//! components built on top of it.
//!
//! ## Architecture
//!
//! - `mesh/` - agent registry, full-mesh peer wiring, best-effort delivery
//! - `collab/` - collaboration dispatch over an external provider
//! - `lifecycle/` - eight-stage delivery pipeline and iteration supervisor
//!
//! ## Usage
//!
//! ```rust,ignore
//! use conclave_core::collab::{CollabDispatcher, InProcessProvider};
//! use conclave_core::lifecycle::PipelineRunner;
//!
//! let dispatcher = Arc::new(CollabDispatcher::new(Arc::new(InProcessProvider::default())));
//! let mut runner = PipelineRunner::new(dispatcher, vec!["analyst".into(), "builder".into()]);
//! let history = runner.run_pipeline("Build a stock tracker").await?;
//! ```

pub mod collab;
pub mod lifecycle;
pub mod mesh;
