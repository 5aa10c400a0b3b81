//! # Collaboration Layer
//!
//! Session-scoped dispatch over an external collaboration provider. Paradigm
//! labels are opaque pass-through strings; the provider decides what they
//! mean.

pub mod dispatcher;
pub mod provider;

pub use dispatcher::{CollabDispatcher, DispatchError, SessionResult};
pub use provider::{
    BackendConfig, BackendRegistry, CollaborationProvider, InProcessProvider, ProviderError,
    ProviderReply, SessionRequest,
};
