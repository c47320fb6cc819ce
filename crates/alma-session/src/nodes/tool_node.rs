use crate::error::Result;
use crate::node::{Node, NodeType};
use crate::turn::{TurnPhase, TurnPublisher, TurnState};
use alma_llm::{Message, ToolCall};
use alma_tools::{ToolError, ToolExecutor, ToolResult};
use alma_types::ToolCallState;
use async_trait::async_trait;
use serde_json::json;
use std::sync::Arc;
use tracing::{info, warn};

/// Runs the tool calls of the last generation, strictly in order
pub struct ToolNode {
    executor: Arc<ToolExecutor>,
}

enum CallOutcome {
    Finished { result: ToolResult, denied: bool },
    Cancelled,
}

impl ToolNode {
    pub fn new(executor: Arc<ToolExecutor>) -> Self {
        Self { executor }
    }

    async fn run_call(
        &self,
        turn: &mut TurnState,
        publisher: &TurnPublisher,
        call: &ToolCall,
    ) -> Result<CallOutcome> {
        let prepared = match self.executor.prepare(&call.name, call.arguments.clone()) {
            Ok(prepared) => prepared,
            Err(result) => {
                return Ok(CallOutcome::Finished {
                    result,
                    denied: false,
                })
            }
        };

        if self.executor.needs_prompt(&prepared) {
            turn.phase = TurnPhase::AwaitingPermission;
            turn.set_tool_state(&call.id, ToolCallState::AwaitingApproval);
            publisher.publish(turn).await?;

            let cancel = turn.cancel.clone();
            let approved = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Ok(CallOutcome::Cancelled),
                approved = self.executor.authorize(&prepared) => approved,
            };

            if !approved {
                info!(thread_id = %turn.thread_id, tool = %call.name, "Tool call denied");
                return Ok(CallOutcome::Finished {
                    result: ToolResult::from_error(&ToolError::PermissionDenied),
                    denied: true,
                });
            }

            turn.set_tool_state(&call.id, ToolCallState::Approved);
            publisher.publish(turn).await?;
        }

        if turn.check_cancelled() {
            return Ok(CallOutcome::Cancelled);
        }

        turn.phase = TurnPhase::ExecutingTool;
        turn.set_tool_state(&call.id, ToolCallState::Executing);
        publisher.publish(turn).await?;

        Ok(CallOutcome::Finished {
            result: self.executor.run(prepared).await,
            denied: false,
        })
    }
}

#[async_trait]
impl Node for ToolNode {
    async fn execute(&self, turn: &mut TurnState, publisher: &TurnPublisher) -> Result<()> {
        let calls = std::mem::take(&mut turn.pending_calls);

        for call in &calls {
            if turn.check_cancelled() {
                break;
            }

            let (result, denied) = match self.run_call(turn, publisher, call).await? {
                CallOutcome::Finished { result, denied } => (result, denied),
                CallOutcome::Cancelled => {
                    turn.cancelled = true;
                    break;
                }
            };

            let state = if denied {
                ToolCallState::Denied
            } else if result.success {
                ToolCallState::Done
            } else {
                ToolCallState::Failed
            };
            if !result.success {
                warn!(
                    thread_id = %turn.thread_id,
                    tool = %call.name,
                    error = result.error.as_deref().unwrap_or(""),
                    "Tool call failed"
                );
            }

            let stored = serde_json::to_value(&result)
                .unwrap_or_else(|_| json!({ "success": result.success }));
            turn.finish_tool_call(&call.id, state, stored, result.error.clone());
            publisher.publish(turn).await?;

            turn.messages
                .push(Message::tool_result(call.id.clone(), result.to_model_content()));
        }

        Ok(())
    }

    fn node_type(&self) -> NodeType {
        NodeType::Tool
    }
}
