//! # Alma
//!
//! Orchestration core for interactive AI chat sessions.
//!
//! A turn streams model output into a persisted assistant message, routes
//! every model-requested tool call through an approval gate and runs the
//! approved ones inside a sandboxed workspace. Each change to the
//! assistant message is pushed to the thread's subscriber.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use alma::prelude::*;
//! use alma::mock::EchoModel;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let sandbox = Arc::new(WorkspaceSandbox::new());
//!     sandbox.ensure_active_workspace("default", "./workspace")?;
//!
//!     let catalog = Arc::new(ToolCatalog::with_builtins(&ToolsConfig::default())?);
//!     let gate = Arc::new(PermissionGate::default());
//!     let executor = Arc::new(ToolExecutor::new(catalog, gate, sandbox));
//!
//!     let store = Arc::new(InMemoryPersistenceClient::new());
//!     store.upsert_provider(Provider::new("local", "Local", ProviderKind::OpenAI)).await?;
//!     let thread = store.create_thread(Thread::new("Hello")).await?;
//!
//!     let session = SessionBuilder::new()
//!         .store(store)
//!         .executor(executor)
//!         .model_factory(Arc::new(StaticModelFactory::new(Arc::new(EchoModel))))
//!         .build()?;
//!
//!     let mut updates = session.channel().register(thread.id.clone());
//!     let ack = session.send_message(&thread.id, "hi there", "local/echo").await?;
//!     println!("turn finished: {:?}", ack.status);
//!
//!     while let Ok(frame) = updates.rx.try_recv() {
//!         println!("{}", serde_json::to_string(&frame)?);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! - **`alma-llm`**: provider-agnostic model capability and stream units
//! - **`alma-types`**: threads, messages, parts, permission and wire types
//! - **`alma-persist`**: store interface and in-memory implementation
//! - **`alma-tools`**: workspace sandbox, built-in tools, permission gate, executor
//! - **`alma-session`**: turn orchestrator and per-thread push channel
//!
//! ## License
//!
//! MIT

pub mod prelude;

pub use alma_session::{
    Ack, BroadcastChannel, ModelFactory, PendingTurn, SessionBuilder, SessionError,
    SessionOrchestrator, StaticModelFactory, Subscription, TurnStatus,
};

pub use alma_llm::{
    mock, LanguageModel, ModelOptions, ModelRequest, ModelStream, StreamEvent,
};

pub use alma_tools::{
    CommandBlocklist, PermissionConfig, PermissionEvent, PermissionGate, SandboxError, Tool,
    ToolCatalog, ToolCategory, ToolContext, ToolError, ToolExecutor, ToolResult, ToolsConfig,
    WorkspaceSandbox,
};

pub use alma_persist::{InMemoryPersistenceClient, PersistError, PersistenceClient};

pub use alma_types::{
    ApprovalDecision, ClientFrame, Message, MessageRole, ModelRef, Part, PermissionRequest,
    PermissionStatus, Provider, ProviderKind, ServerFrame, SessionConfig, Thread, ThreadUpdate,
    ToolCallState, Workspace,
};
