pub mod config;
pub mod frames;
pub mod history;
pub mod message;
pub mod permission;
pub mod provider;
pub mod thread;
pub mod workspace;

pub use config::SessionConfig;
pub use frames::{ClientFrame, ServerFrame};
pub use history::to_model_messages;
pub use message::{Message, MessageRole, Part, ToolCallState};
pub use permission::{ApprovalDecision, PermissionRequest, PermissionStatus};
pub use provider::{ModelRef, ModelRefError, Provider, ProviderKind};
pub use thread::{Thread, ThreadUpdate};
pub use workspace::Workspace;
