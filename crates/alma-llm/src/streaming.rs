use std::pin::Pin;
use anyhow::Result;
use futures::Stream;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One unit produced by a model stream
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamEvent {
    /// Incremental assistant text
    Text {
        content: String,
    },

    /// Fully assembled tool invocation request
    ToolCall {
        id: String,
        name: String,
        arguments: Value,
    },

    /// Model finished this generation step
    Done {
        #[serde(skip_serializing_if = "Option::is_none")]
        finish_reason: Option<String>,
    },
}

impl StreamEvent {
    pub fn text(content: impl Into<String>) -> Self {
        Self::Text {
            content: content.into(),
        }
    }

    pub fn tool_call(id: impl Into<String>, name: impl Into<String>, arguments: Value) -> Self {
        Self::ToolCall {
            id: id.into(),
            name: name.into(),
            arguments,
        }
    }

    pub fn done() -> Self {
        Self::Done { finish_reason: None }
    }

    pub fn is_done(&self) -> bool {
        matches!(self, Self::Done { .. })
    }
}

pub type ModelStream = Pin<Box<dyn Stream<Item = Result<StreamEvent>> + Send>>;
