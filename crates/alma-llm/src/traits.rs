use crate::streaming::ModelStream;
use crate::types::{Message, Tool};
use anyhow::Result;
use async_trait::async_trait;

/// Opaque language model capability.
///
/// Concrete provider clients live outside this workspace; the session only
/// needs a stream of text and tool-call units for a given request.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Open a streaming generation for the request
    async fn stream(&self, request: ModelRequest) -> Result<ModelStream>;
}

#[derive(Debug, Clone)]
pub struct ModelRequest {
    pub model: String,
    pub messages: Vec<Message>,
    pub options: ModelOptions,
}

impl ModelRequest {
    pub fn new(model: impl Into<String>, messages: Vec<Message>) -> Self {
        Self {
            model: model.into(),
            messages,
            options: ModelOptions::default(),
        }
    }

    pub fn with_options(mut self, options: ModelOptions) -> Self {
        self.options = options;
        self
    }
}

#[derive(Debug, Clone, Default)]
pub struct ModelOptions {
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
    pub tools: Vec<Tool>,
}

impl ModelOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn temperature(mut self, temp: f32) -> Self {
        self.temperature = Some(temp);
        self
    }

    pub fn max_tokens(mut self, tokens: u32) -> Self {
        self.max_tokens = Some(tokens);
        self
    }

    pub fn tools(mut self, tools: Vec<Tool>) -> Self {
        self.tools = tools;
        self
    }
}
