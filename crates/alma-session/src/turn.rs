use crate::broadcast::BroadcastChannel;
use crate::error::Result;
use alma_llm::{Message as ModelMessage, ToolCall};
use alma_persist::PersistenceClient;
use alma_types::{Message, Part, ServerFrame, ToolCallState};
use serde_json::Value;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Where the turn loop currently is
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnPhase {
    AwaitingModel,
    StreamingText,
    AwaitingPermission,
    ExecutingTool,
    Done,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnStatus {
    Completed,
    /// Step bound reached; partial output kept
    StepLimitExceeded,
    Cancelled,
}

impl TurnStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Completed => "completed",
            Self::StepLimitExceeded => "step-limit-exceeded",
            Self::Cancelled => "cancelled",
        }
    }
}

/// Result of a finished turn
#[derive(Debug, Clone, PartialEq)]
pub struct Ack {
    pub user_message_id: String,
    pub assistant_message_id: Option<String>,
    pub status: TurnStatus,
    /// Model invocations made
    pub steps: usize,
}

/// Mutable state of one in-flight turn
pub struct TurnState {
    pub thread_id: String,
    pub model_name: String,
    pub user_message_id: String,
    /// Model input, grown as the turn proceeds
    pub messages: Vec<ModelMessage>,
    /// Assistant row content
    pub parts: Vec<Part>,
    pub assistant_message_id: Option<String>,
    pub pending_calls: Vec<ToolCall>,
    pub steps: usize,
    pub phase: TurnPhase,
    pub cancel: CancellationToken,
    pub cancelled: bool,
}

impl TurnState {
    pub fn new(
        thread_id: impl Into<String>,
        model_name: impl Into<String>,
        user_message_id: impl Into<String>,
        messages: Vec<ModelMessage>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            thread_id: thread_id.into(),
            model_name: model_name.into(),
            user_message_id: user_message_id.into(),
            messages,
            parts: Vec::new(),
            assistant_message_id: None,
            pending_calls: Vec::new(),
            steps: 0,
            phase: TurnPhase::AwaitingModel,
            cancel,
            cancelled: false,
        }
    }

    pub fn has_pending_tool_calls(&self) -> bool {
        !self.pending_calls.is_empty()
    }

    /// True once the cancellation token fired; latches `cancelled`
    pub fn check_cancelled(&mut self) -> bool {
        if self.cancel.is_cancelled() {
            self.cancelled = true;
        }
        self.cancelled
    }

    /// Extend the trailing text part, or start a new one after a tool call
    pub fn append_text(&mut self, content: &str) {
        match self.parts.last_mut() {
            Some(Part::Text { content: existing }) => existing.push_str(content),
            _ => self.parts.push(Part::text(content)),
        }
    }

    pub fn push_tool_call(&mut self, call: &ToolCall) {
        self.parts
            .push(Part::tool_call(call.id.clone(), call.name.clone(), call.arguments.clone()));
    }

    pub fn tool_call_state(&self, call_id: &str) -> Option<ToolCallState> {
        self.parts.iter().find_map(|p| match p {
            Part::ToolCall { call_id: id, state, .. } if id == call_id => Some(*state),
            _ => None,
        })
    }

    pub fn set_tool_state(&mut self, call_id: &str, new_state: ToolCallState) {
        if let Some(Part::ToolCall { state, .. }) = self.find_call_mut(call_id) {
            *state = new_state;
        }
    }

    pub fn finish_tool_call(
        &mut self,
        call_id: &str,
        final_state: ToolCallState,
        result: Value,
        error: Option<String>,
    ) {
        if let Some(Part::ToolCall {
            state,
            result: stored,
            error_text,
            ..
        }) = self.find_call_mut(call_id)
        {
            *state = final_state;
            *stored = Some(result);
            *error_text = error;
        }
    }

    /// Mark every unfinished call failed; returns how many changed
    pub fn fail_open_calls(&mut self, reason: &str) -> usize {
        let mut changed = 0;
        for part in &mut self.parts {
            if let Part::ToolCall {
                state, error_text, ..
            } = part
            {
                if !state.is_terminal() {
                    *state = ToolCallState::Failed;
                    *error_text = Some(reason.to_string());
                    changed += 1;
                }
            }
        }
        changed
    }

    fn find_call_mut(&mut self, call_id: &str) -> Option<&mut Part> {
        self.parts
            .iter_mut()
            .find(|p| p.call_id() == Some(call_id))
    }
}

/// Persists the assistant row and pushes the matching frame.
///
/// The row is inserted on the first publish and updated in place after
/// that; each publish sends exactly one `message_update`.
#[derive(Clone)]
pub struct TurnPublisher {
    store: Arc<dyn PersistenceClient>,
    channel: Arc<BroadcastChannel>,
}

impl TurnPublisher {
    pub fn new(store: Arc<dyn PersistenceClient>, channel: Arc<BroadcastChannel>) -> Self {
        Self { store, channel }
    }

    pub async fn publish(&self, turn: &mut TurnState) -> Result<()> {
        let message_id = self.persist(turn).await?;
        let frame = ServerFrame::message_update(message_id, turn.thread_id.clone(), turn.parts.clone());
        self.channel.send(&turn.thread_id, frame);
        Ok(())
    }

    /// Write the current parts without broadcasting
    pub async fn persist(&self, turn: &mut TurnState) -> Result<String> {
        match &turn.assistant_message_id {
            Some(id) => {
                self.store
                    .update_message_parts(id, turn.parts.clone())
                    .await?;
                Ok(id.clone())
            }
            None => {
                let message = Message::assistant(turn.thread_id.clone(), turn.parts.clone())
                    .with_parent(turn.user_message_id.clone());
                let id = message.id.clone();
                self.store.insert_message(message).await?;
                turn.assistant_message_id = Some(id.clone());
                Ok(id)
            }
        }
    }
}
