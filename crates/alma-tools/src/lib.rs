pub mod blocklist;
pub mod builtins;
pub mod catalog;
pub mod error;
pub mod executor;
pub mod permission;
pub mod result;
pub mod sandbox;

pub use blocklist::CommandBlocklist;
pub use catalog::{Tool, ToolCatalog, ToolCategory, ToolContext, ToolsConfig};
pub use error::{SandboxError, ToolError};
pub use executor::{PreparedCall, ToolExecutor};
pub use permission::{PermissionConfig, PermissionEvent, PermissionGate};
pub use result::ToolResult;
pub use sandbox::WorkspaceSandbox;
