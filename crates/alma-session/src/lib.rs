pub mod broadcast;
pub mod builder;
pub mod client_factory;
pub mod error;
pub mod node;
pub mod nodes;
pub mod router;
pub mod session;
pub mod turn;

pub use broadcast::{BroadcastChannel, Subscription};
pub use builder::SessionBuilder;
pub use client_factory::{ModelFactory, StaticModelFactory};
pub use error::{Result, SessionError};
pub use node::{Node, NodeType};
pub use router::{NextNode, Router, SimpleRouter};
pub use session::{PendingTurn, SessionOrchestrator};
pub use turn::{Ack, TurnPhase, TurnPublisher, TurnState, TurnStatus};
