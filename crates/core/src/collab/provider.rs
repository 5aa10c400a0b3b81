//! # Collaboration Provider
//!
//! Capability abstraction over the external collaboration backend. The core
//! treats backend names as opaque string keys in a registry; which backends a
//! deployment wires in is configuration, not core behavior.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// A collaboration request forwarded to a provider
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionRequest {
    /// Caller-chosen correlation token
    pub session_id: String,
    /// Uninterpreted strategy label
    pub paradigm: String,
    /// Task description
    pub task: String,
    /// Participating agent ids, in order
    pub agents: Vec<String>,
    /// State forwarded from a prior stage
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<Value>,
}

/// Provider-side reply to a collaboration request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderReply {
    /// Completion label (e.g. "ok")
    pub status: String,
    /// Provider-specific synthesis payload
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub synthesis: Option<Value>,
}

impl ProviderReply {
    pub fn ok() -> Self {
        Self {
            status: "ok".to_string(),
            synthesis: None,
        }
    }

    pub fn with_synthesis(mut self, synthesis: Value) -> Self {
        self.synthesis = Some(synthesis);
        self
    }
}

/// Failures a provider can signal
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("collaboration provider unavailable: {reason}")]
    Unavailable { reason: String },
    #[error("provider rejected paradigm `{paradigm}`: {reason}")]
    Rejected { paradigm: String, reason: String },
}

/// External collaboration capability
///
/// Paradigm validation, if any, happens here; the core never branches on the
/// paradigm value.
#[async_trait]
pub trait CollaborationProvider: Send + Sync {
    async fn collaborate(&self, request: &SessionRequest) -> Result<ProviderReply, ProviderError>;
}

/// Configuration for a single named backend
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BackendConfig {
    /// Optional endpoint override
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
}

/// Registry of named collaboration backends
///
/// Names are deployment configuration; the default set is a placeholder.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendRegistry {
    pub backends: BTreeMap<String, BackendConfig>,
}

impl Default for BackendRegistry {
    fn default() -> Self {
        let mut backends = BTreeMap::new();
        for name in ["alpha", "beta", "gamma", "delta"] {
            backends.insert(name.to_string(), BackendConfig::default());
        }
        Self { backends }
    }
}

impl BackendRegistry {
    pub fn empty() -> Self {
        Self {
            backends: BTreeMap::new(),
        }
    }

    pub fn with_backend(mut self, name: impl Into<String>, config: BackendConfig) -> Self {
        self.backends.insert(name.into(), config);
        self
    }

    /// Backend names in sorted order
    pub fn names(&self) -> Vec<&str> {
        self.backends.keys().map(String::as_str).collect()
    }

    pub fn len(&self) -> usize {
        self.backends.len()
    }

    pub fn is_empty(&self) -> bool {
        self.backends.is_empty()
    }
}

/// Default in-process provider
///
/// Echoes every request as completed and stands in for a deployment's real
/// backend fan-out. Also carries the bridge-enhancement surface: an
/// initialization flag plus canned code generation.
pub struct InProcessProvider {
    backends: BackendRegistry,
    bridge_initialized: AtomicBool,
}

impl Default for InProcessProvider {
    fn default() -> Self {
        Self::new(BackendRegistry::default())
    }
}

impl InProcessProvider {
    pub fn new(backends: BackendRegistry) -> Self {
        Self {
            backends,
            bridge_initialized: AtomicBool::new(false),
        }
    }

    pub fn backends(&self) -> &BackendRegistry {
        &self.backends
    }

    /// Initialize bridge services for enhanced generation
    pub fn initialize_bridges(&self) -> bool {
        self.bridge_initialized.store(true, Ordering::SeqCst);
        true
    }

    pub fn bridge_initialized(&self) -> bool {
        self.bridge_initialized.load(Ordering::SeqCst)
    }

    /// Generate code through the bridge services
    pub fn generate_code(&self, prompt: &str, language: &str, paradigm: &str) -> Value {
        json!({
            "success": true,
            "language": language,
            "paradigm": paradigm,
            "code": format!("// code for {prompt}"),
        })
    }
}

#[async_trait]
impl CollaborationProvider for InProcessProvider {
    async fn collaborate(&self, request: &SessionRequest) -> Result<ProviderReply, ProviderError> {
        if self.backends.is_empty() {
            return Err(ProviderError::Unavailable {
                reason: "no backends configured".to_string(),
            });
        }
        tracing::debug!(
            session = %request.session_id,
            paradigm = %request.paradigm,
            backends = self.backends.len(),
            "collaboration handled in-process"
        );
        tokio::task::yield_now().await;
        Ok(ProviderReply::ok())
    }
}
