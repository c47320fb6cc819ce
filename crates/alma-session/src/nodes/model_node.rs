use crate::error::{Result, SessionError};
use crate::node::{Node, NodeType};
use crate::turn::{TurnPhase, TurnPublisher, TurnState};
use alma_llm::{LanguageModel, Message, ModelOptions, ModelRequest, StreamEvent, ToolCall};
use async_trait::async_trait;
use futures::StreamExt;
use std::sync::Arc;
use tracing::{debug, info};

/// Streams one model generation into the turn
pub struct ModelNode {
    model: Arc<dyn LanguageModel>,
    options: ModelOptions,
}

impl ModelNode {
    pub fn new(model: Arc<dyn LanguageModel>, options: ModelOptions) -> Self {
        Self { model, options }
    }
}

#[async_trait]
impl Node for ModelNode {
    async fn execute(&self, turn: &mut TurnState, publisher: &TurnPublisher) -> Result<()> {
        turn.steps += 1;
        turn.phase = TurnPhase::AwaitingModel;
        turn.pending_calls.clear();

        info!(
            thread_id = %turn.thread_id,
            model = %turn.model_name,
            step = turn.steps,
            messages = turn.messages.len(),
            "Opening model stream"
        );

        let request = ModelRequest::new(turn.model_name.clone(), turn.messages.clone())
            .with_options(self.options.clone());
        let cancel = turn.cancel.clone();

        let mut stream = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                turn.cancelled = true;
                return Ok(());
            }
            opened = self.model.stream(request) => opened.map_err(SessionError::Model)?,
        };

        let mut text = String::new();
        let mut calls: Vec<ToolCall> = Vec::new();

        loop {
            let next = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    turn.cancelled = true;
                    break;
                }
                next = stream.next() => next,
            };

            match next {
                None => break,
                Some(Err(e)) => return Err(SessionError::Model(e)),
                Some(Ok(StreamEvent::Text { content })) => {
                    // No change to publish
                    if content.is_empty() {
                        continue;
                    }
                    turn.phase = TurnPhase::StreamingText;
                    turn.append_text(&content);
                    text.push_str(&content);
                    publisher.publish(turn).await?;
                }
                Some(Ok(StreamEvent::ToolCall { id, name, arguments })) => {
                    debug!(thread_id = %turn.thread_id, tool = %name, call_id = %id, "Model requested tool");
                    let call = ToolCall::new(id, name, arguments);
                    turn.push_tool_call(&call);
                    calls.push(call);
                    publisher.publish(turn).await?;
                }
                Some(Ok(StreamEvent::Done { finish_reason })) => {
                    debug!(thread_id = %turn.thread_id, finish_reason = ?finish_reason, "Model stream done");
                    break;
                }
            }
        }

        if turn.cancelled {
            // Calls from a cancelled generation never run
            return Ok(());
        }

        if !text.is_empty() || !calls.is_empty() {
            turn.messages
                .push(Message::ai_with_tools(Some(text), calls.clone()));
        }
        turn.pending_calls = calls;

        Ok(())
    }

    fn node_type(&self) -> NodeType {
        NodeType::Model
    }
}
