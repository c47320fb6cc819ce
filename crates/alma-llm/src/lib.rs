pub mod types;
pub mod traits;
pub mod streaming;
pub mod mock;

pub use traits::{LanguageModel, ModelOptions, ModelRequest};
pub use streaming::{ModelStream, StreamEvent};
pub use types::{FunctionDefinition, Message, Tool, ToolCall};
