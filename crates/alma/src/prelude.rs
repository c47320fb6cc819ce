//! Prelude module for convenient imports
//!
//! Import everything you need with:
//! ```rust
//! use alma::prelude::*;
//! ```

pub use crate::{
    Ack, SessionBuilder, SessionError, SessionOrchestrator, StaticModelFactory, ModelFactory,
    TurnStatus, BroadcastChannel,
    LanguageModel, ModelRequest, StreamEvent,
    PermissionConfig, PermissionGate, ToolCatalog, ToolExecutor, ToolResult, ToolsConfig,
    WorkspaceSandbox,
    InMemoryPersistenceClient, PersistenceClient,
    ApprovalDecision, Message, Part, Provider, ProviderKind, ServerFrame, SessionConfig, Thread,
    ToolCallState,
};
