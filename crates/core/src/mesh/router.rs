//! # Mesh Registry & Message Router
//!
//! The registry owns the id → agent map and maintains full-mesh peer
//! connectivity incrementally on every registration. The router is a cheap
//! clone-able handle that delivers messages through the registry,
//! best-effort: unknown receivers drop the message instead of failing.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;

use super::agent::Agent;
use super::message::{DeliveryStatus, MeshMessage};

/// Registry of agents reachable through the mesh
///
/// One registry per orchestration context, owned by the caller. Agents are
/// added, never removed.
#[derive(Default)]
pub struct MeshRegistry {
    agents: RwLock<HashMap<String, Arc<Agent>>>,
}

impl MeshRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up an agent by id
    pub fn get(&self, id: &str) -> Option<Arc<Agent>> {
        self.agents.read().get(id).cloned()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.agents.read().contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.agents.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.agents.read().is_empty()
    }

    /// Ids of all registered agents, sorted
    pub fn agent_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.agents.read().keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Snapshot of all registered agents
    pub fn agents(&self) -> Vec<Arc<Agent>> {
        self.agents.read().values().cloned().collect()
    }

    fn insert(&self, agent: Arc<Agent>) {
        let mut agents = self.agents.write();
        for other in agents.values() {
            if other.id() != agent.id() {
                other.add_peer(agent.id());
                agent.add_peer(other.id());
            }
        }
        agents.insert(agent.id().to_owned(), agent);
    }
}

/// Routes point-to-point messages through a shared registry
#[derive(Clone)]
pub struct MessageRouter {
    registry: Arc<MeshRegistry>,
}

impl MessageRouter {
    pub fn new(registry: Arc<MeshRegistry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &MeshRegistry {
        &self.registry
    }

    /// Register an agent with the mesh.
    ///
    /// Attaches this router to the agent, then makes the newcomer and every
    /// existing agent mutual peers. Registering an id that is already present
    /// replaces the stored agent; peer symmetry survives the replacement, and
    /// the replaced handle keeps a now-stale router link.
    pub fn register(&self, agent: Agent) -> Arc<Agent> {
        let agent = Arc::new(agent);
        agent.attach_router(self.clone());
        self.registry.insert(Arc::clone(&agent));
        tracing::debug!(agent = agent.id(), "registered with mesh");
        agent
    }

    /// Deliver a message to its receiver, best-effort.
    ///
    /// Invokes the receiver's handler exactly once when the receiver is
    /// registered; otherwise the message is dropped and the caller observes
    /// it through the returned status. No queueing, no retry; delivery order
    /// equals invocation order.
    pub async fn deliver(&self, message: MeshMessage) -> DeliveryStatus {
        match self.registry.get(&message.receiver) {
            Some(agent) => {
                agent.handle(message).await;
                DeliveryStatus::Delivered
            }
            None => {
                tracing::debug!(
                    receiver = %message.receiver,
                    sender = %message.sender,
                    "dropping message for unknown receiver"
                );
                DeliveryStatus::Dropped
            }
        }
    }
}
