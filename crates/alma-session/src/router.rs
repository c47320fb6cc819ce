use crate::node::NodeType;
use crate::turn::TurnState;

/// Decides which node runs next
pub trait Router: Send + Sync {
    fn next(&self, turn: &TurnState, current: NodeType) -> NextNode;
}

#[derive(Debug, Clone, PartialEq)]
pub enum NextNode {
    Model,
    Tool,
    End,
}

/// Model -> Tool (if the model asked for tools) -> Model -> End
pub struct SimpleRouter;

impl Router for SimpleRouter {
    fn next(&self, turn: &TurnState, current: NodeType) -> NextNode {
        if turn.cancelled {
            return NextNode::End;
        }
        match current {
            NodeType::Model => {
                if turn.has_pending_tool_calls() {
                    NextNode::Tool
                } else {
                    NextNode::End
                }
            }
            NodeType::Tool => NextNode::Model,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alma_llm::ToolCall;
    use serde_json::json;
    use tokio_util::sync::CancellationToken;

    fn turn() -> TurnState {
        TurnState::new("t1", "m", "u1", vec![], CancellationToken::new())
    }

    #[test]
    fn test_model_without_calls_ends() {
        assert_eq!(SimpleRouter.next(&turn(), NodeType::Model), NextNode::End);
    }

    #[test]
    fn test_model_with_calls_goes_to_tool() {
        let mut t = turn();
        t.pending_calls.push(ToolCall::new("c1", "glob", json!({"pattern": "*"})));
        assert_eq!(SimpleRouter.next(&t, NodeType::Model), NextNode::Tool);
    }

    #[test]
    fn test_tool_returns_to_model() {
        assert_eq!(SimpleRouter.next(&turn(), NodeType::Tool), NextNode::Model);
    }

    #[test]
    fn test_cancelled_turn_ends() {
        let mut t = turn();
        t.cancelled = true;
        assert_eq!(SimpleRouter.next(&t, NodeType::Tool), NextNode::End);
    }
}
