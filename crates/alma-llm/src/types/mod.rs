pub mod message;
pub mod tool;

pub use message::Message;
pub use tool::{FunctionDefinition, Tool, ToolCall};
