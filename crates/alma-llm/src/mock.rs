//! Deterministic models for tests and local development.

use crate::streaming::{ModelStream, StreamEvent};
use crate::traits::{LanguageModel, ModelRequest};
use crate::types::Message;
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

/// One element of a scripted generation
#[derive(Debug, Clone)]
pub enum ScriptedUnit {
    Event(StreamEvent),
    /// Stream yields an error at this point
    Fail(String),
    /// Pause before the next unit
    Delay(Duration),
}

impl ScriptedUnit {
    pub fn text(content: impl Into<String>) -> Self {
        Self::Event(StreamEvent::text(content))
    }

    pub fn tool_call(id: impl Into<String>, name: impl Into<String>, arguments: serde_json::Value) -> Self {
        Self::Event(StreamEvent::tool_call(id, name, arguments))
    }
}

/// One model invocation worth of behaviour
#[derive(Debug, Clone)]
pub enum ScriptStep {
    Stream(Vec<ScriptedUnit>),
    /// `stream()` itself returns an error
    FailOpen(String),
}

/// Model that replays a fixed script, one step per invocation.
///
/// Once the script is exhausted every call yields an empty stream ending in
/// `Done`. Requests are recorded for later inspection.
#[derive(Debug, Default)]
pub struct ScriptedModel {
    steps: Mutex<VecDeque<ScriptStep>>,
    requests: Mutex<Vec<ModelRequest>>,
}

impl ScriptedModel {
    pub fn new(steps: Vec<ScriptStep>) -> Self {
        Self {
            steps: Mutex::new(steps.into()),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Shorthand for a script made only of successful streams
    pub fn from_turns(turns: Vec<Vec<ScriptedUnit>>) -> Self {
        Self::new(turns.into_iter().map(ScriptStep::Stream).collect())
    }

    pub fn requests(&self) -> Vec<ModelRequest> {
        self.requests
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    fn next_step(&self) -> Option<ScriptStep> {
        self.steps.lock().unwrap_or_else(|e| e.into_inner()).pop_front()
    }
}

#[async_trait]
impl LanguageModel for ScriptedModel {
    async fn stream(&self, request: ModelRequest) -> Result<ModelStream> {
        self.requests
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(request);

        let units = match self.next_step() {
            Some(ScriptStep::FailOpen(message)) => return Err(anyhow!(message)),
            Some(ScriptStep::Stream(units)) => units,
            None => Vec::new(),
        };

        let stream = async_stream::stream! {
            for unit in units {
                match unit {
                    ScriptedUnit::Event(event) => yield Ok(event),
                    ScriptedUnit::Fail(message) => {
                        yield Err(anyhow!(message));
                        return;
                    }
                    ScriptedUnit::Delay(duration) => tokio::time::sleep(duration).await,
                }
            }
            yield Ok(StreamEvent::done());
        };

        Ok(Box::pin(stream))
    }
}

/// Model that streams back the last user message word by word
#[derive(Debug, Default, Clone)]
pub struct EchoModel;

#[async_trait]
impl LanguageModel for EchoModel {
    async fn stream(&self, request: ModelRequest) -> Result<ModelStream> {
        let last_user = request
            .messages
            .iter()
            .rev()
            .find_map(|m| match m {
                Message::Human { content } => Some(content.clone()),
                _ => None,
            })
            .unwrap_or_default();

        let words: Vec<String> = last_user
            .split_inclusive(' ')
            .map(str::to_string)
            .collect();

        let stream = async_stream::stream! {
            for word in words {
                yield Ok(StreamEvent::text(word));
            }
            yield Ok(StreamEvent::Done { finish_reason: Some("stop".to_string()) });
        };

        Ok(Box::pin(stream))
    }
}
