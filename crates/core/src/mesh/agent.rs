//! # Mesh Agents
//!
//! Named participants with capability sets. An agent becomes reachable (and
//! able to send) once registered with a [`MessageRouter`](super::router::MessageRouter).

use std::collections::BTreeSet;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use super::message::{DeliveryStatus, MeshMessage, MessageKind, Payload};
use super::router::MessageRouter;

/// A declared capability of an agent
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentCapability {
    /// Capability name (e.g. "code_generation")
    pub name: String,
    /// Free-text description
    pub description: String,
    /// Declared input labels
    pub inputs: Vec<String>,
    /// Declared output labels
    pub outputs: Vec<String>,
    /// Reliability score in [0, 1]
    pub reliability: f64,
    /// Tools the capability relies on
    #[serde(default)]
    pub tools: Vec<String>,
}

impl AgentCapability {
    /// Create a capability; reliability is clamped to [0, 1]
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        inputs: Vec<String>,
        outputs: Vec<String>,
        reliability: f64,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            inputs,
            outputs,
            reliability: reliability.clamp(0.0, 1.0),
            tools: Vec::new(),
        }
    }

    /// Attach a tool list
    pub fn with_tools(mut self, tools: Vec<String>) -> Self {
        self.tools = tools;
        self
    }
}

/// Errors surfaced by mesh operations
#[derive(Debug, thiserror::Error)]
pub enum MeshError {
    /// The agent attempted to send before being registered with a router
    #[error("agent `{agent}` is not registered with a router")]
    Unregistered { agent: String },
}

/// Message-handling entry point of an agent
///
/// The router invokes this exactly once per delivered message.
#[async_trait]
pub trait MessageHandler: Send + Sync {
    async fn on_message(&self, message: MeshMessage);
}

/// Handler that discards every message
#[derive(Debug, Default)]
pub struct NullHandler;

#[async_trait]
impl MessageHandler for NullHandler {
    async fn on_message(&self, _message: MeshMessage) {}
}

/// Handler that forwards delivered messages into an mpsc channel
pub struct Mailbox {
    tx: mpsc::Sender<MeshMessage>,
}

impl Mailbox {
    /// Create a mailbox handler and the receiving end of its channel
    pub fn channel(capacity: usize) -> (Arc<Self>, mpsc::Receiver<MeshMessage>) {
        let (tx, rx) = mpsc::channel(capacity);
        (Arc::new(Self { tx }), rx)
    }
}

#[async_trait]
impl MessageHandler for Mailbox {
    async fn on_message(&self, message: MeshMessage) {
        if self.tx.send(message).await.is_err() {
            tracing::debug!("mailbox receiver dropped; message discarded");
        }
    }
}

/// A named participant in the mesh
///
/// The id is immutable after construction. The peer set is mutated only by
/// the registry; the router link is attached on registration.
pub struct Agent {
    id: String,
    name: String,
    capabilities: Vec<AgentCapability>,
    peers: RwLock<BTreeSet<String>>,
    router: RwLock<Option<MessageRouter>>,
    handler: Arc<dyn MessageHandler>,
}

impl Agent {
    /// Create an unregistered agent with no capabilities and a discarding handler
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            capabilities: Vec::new(),
            peers: RwLock::new(BTreeSet::new()),
            router: RwLock::new(None),
            handler: Arc::new(NullHandler),
        }
    }

    /// Add a capability
    pub fn with_capability(mut self, capability: AgentCapability) -> Self {
        self.capabilities.push(capability);
        self
    }

    /// Replace the message handler
    pub fn with_handler(mut self, handler: Arc<dyn MessageHandler>) -> Self {
        self.handler = handler;
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn capabilities(&self) -> &[AgentCapability] {
        &self.capabilities
    }

    /// Snapshot of the agent ids currently reachable as peers
    pub fn peers(&self) -> BTreeSet<String> {
        self.peers.read().clone()
    }

    /// Send a point-to-point message through the attached router.
    ///
    /// Fails with [`MeshError::Unregistered`] when the agent has not been
    /// registered; otherwise returns the router's delivery status.
    pub async fn send(
        &self,
        receiver: &str,
        kind: MessageKind,
        payload: Payload,
    ) -> Result<DeliveryStatus, MeshError> {
        let router = self
            .router
            .read()
            .clone()
            .ok_or_else(|| MeshError::Unregistered {
                agent: self.id.clone(),
            })?;
        let message = MeshMessage {
            sender: self.id.clone(),
            receiver: receiver.to_owned(),
            kind,
            payload,
        };
        Ok(router.deliver(message).await)
    }

    pub(super) fn attach_router(&self, router: MessageRouter) {
        *self.router.write() = Some(router);
    }

    pub(super) fn add_peer(&self, id: &str) {
        self.peers.write().insert(id.to_owned());
    }

    pub(super) async fn handle(&self, message: MeshMessage) {
        self.handler.on_message(message).await;
    }
}

impl std::fmt::Debug for Agent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Agent")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("capabilities", &self.capabilities.len())
            .field("peers", &self.peers.read().len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reliability_clamped() {
        let high = AgentCapability::new("a", "b", vec![], vec![], 1.5);
        assert_eq!(high.reliability, 1.0);
        let low = AgentCapability::new("a", "b", vec![], vec![], -0.2);
        assert_eq!(low.reliability, 0.0);
    }

    #[test]
    fn test_capability_tools() {
        let cap = AgentCapability::new(
            "code_generation",
            "Generate code",
            vec!["requirements".to_string()],
            vec!["code".to_string()],
            0.9,
        )
        .with_tools(vec!["rustc".to_string()]);
        assert_eq!(cap.tools, vec!["rustc".to_string()]);
    }

    #[test]
    fn test_unregistered_send_fails() {
        let agent = Agent::new("loner", "Loner");
        let err = tokio_test::block_on(agent.send("anyone", MessageKind::Request, Payload::new()))
            .unwrap_err();
        assert!(matches!(err, MeshError::Unregistered { agent } if agent == "loner"));
    }
}
