use crate::error::Result;
use crate::turn::{TurnPublisher, TurnState};
use async_trait::async_trait;

/// One unit of work in the turn loop
#[async_trait]
pub trait Node: Send + Sync {
    /// Advance the turn, publishing every change to the assistant row
    async fn execute(&self, turn: &mut TurnState, publisher: &TurnPublisher) -> Result<()>;

    fn node_type(&self) -> NodeType;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeType {
    Model,
    Tool,
}
