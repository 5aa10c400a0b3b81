//! # Agent Mesh
//!
//! Peer-mesh message passing: a registry of named agents with full-mesh
//! connectivity and a best-effort point-to-point router.

pub mod agent;
pub mod message;
pub mod router;

pub use agent::{Agent, AgentCapability, Mailbox, MeshError, MessageHandler, NullHandler};
pub use message::{DeliveryStatus, MeshMessage, MessageKind, Payload};
pub use router::{MeshRegistry, MessageRouter};
