use crate::broadcast::BroadcastChannel;
use crate::client_factory::ModelFactory;
use crate::error::{Result, SessionError};
use crate::node::{Node, NodeType};
use crate::nodes::{ModelNode, ToolNode};
use crate::router::{NextNode, Router, SimpleRouter};
use crate::turn::{Ack, TurnPhase, TurnPublisher, TurnState, TurnStatus};
use alma_llm::{LanguageModel, ModelOptions};
use alma_persist::PersistenceClient;
use alma_tools::ToolExecutor;
use alma_types::{to_model_messages, Message, ModelRef, ServerFrame, SessionConfig, ThreadUpdate};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

type ActiveTurns = Arc<Mutex<HashMap<String, CancellationToken>>>;

fn lock(active: &ActiveTurns) -> MutexGuard<'_, HashMap<String, CancellationToken>> {
    active.lock().unwrap_or_else(|e| e.into_inner())
}

/// Drives chat turns for any number of threads, one turn per thread at a time.
///
/// Collaborators are injected; cloning shares them.
#[derive(Clone)]
pub struct SessionOrchestrator {
    store: Arc<dyn PersistenceClient>,
    channel: Arc<BroadcastChannel>,
    executor: Arc<ToolExecutor>,
    factory: Arc<dyn ModelFactory>,
    config: SessionConfig,
    active: ActiveTurns,
}

impl std::fmt::Debug for SessionOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionOrchestrator").finish_non_exhaustive()
    }
}

/// Marks a thread as busy until dropped
struct ActiveTurn {
    active: ActiveTurns,
    thread_id: String,
}

impl Drop for ActiveTurn {
    fn drop(&mut self) {
        lock(&self.active).remove(&self.thread_id);
    }
}

/// A turn that passed its preconditions and holds the thread's slot
pub struct PendingTurn {
    session: SessionOrchestrator,
    thread_id: String,
    text: String,
    model: ModelRef,
    cancel: CancellationToken,
    slot: ActiveTurn,
}

impl PendingTurn {
    pub fn thread_id(&self) -> &str {
        &self.thread_id
    }

    /// Run the turn to completion.
    ///
    /// Every exit clears the generation flag. Success ends with a `done`
    /// frame, failure with an `error` frame and the error returned.
    pub async fn run(self) -> Result<Ack> {
        let PendingTurn {
            session,
            thread_id,
            text,
            model,
            cancel,
            slot,
        } = self;
        let started = Instant::now();

        let outcome = session.run_turn(&thread_id, &text, &model, cancel).await;

        let outcome = match outcome {
            Ok(ack) => session
                .store
                .update_thread(&thread_id, ThreadUpdate::generating(false))
                .await
                .map(|_| ack)
                .map_err(SessionError::from),
            Err(e) => {
                if let Err(clear) = session
                    .store
                    .update_thread(&thread_id, ThreadUpdate::generating(false))
                    .await
                {
                    warn!(thread_id = %thread_id, error = %clear, "Failed to clear generating flag");
                }
                Err(e)
            }
        };
        drop(slot);

        match outcome {
            Ok(ack) => {
                session.channel.send(&thread_id, ServerFrame::Done);
                info!(
                    thread_id = %thread_id,
                    status = ack.status.as_str(),
                    steps = ack.steps,
                    duration_ms = started.elapsed().as_millis() as u64,
                    "Turn finished"
                );
                Ok(ack)
            }
            Err(e) => {
                error!(thread_id = %thread_id, error = %e, "Turn failed");
                session
                    .channel
                    .send(&thread_id, ServerFrame::error(e.to_string()));
                Err(e)
            }
        }
    }
}

impl SessionOrchestrator {
    pub fn new(
        store: Arc<dyn PersistenceClient>,
        channel: Arc<BroadcastChannel>,
        executor: Arc<ToolExecutor>,
        factory: Arc<dyn ModelFactory>,
        config: SessionConfig,
    ) -> Self {
        Self {
            store,
            channel,
            executor,
            factory,
            config,
            active: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Create a builder for fluent construction
    pub fn builder() -> crate::builder::SessionBuilder {
        crate::builder::SessionBuilder::new()
    }

    pub fn store(&self) -> &Arc<dyn PersistenceClient> {
        &self.store
    }

    pub fn channel(&self) -> &Arc<BroadcastChannel> {
        &self.channel
    }

    pub fn executor(&self) -> &Arc<ToolExecutor> {
        &self.executor
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Run one turn: persist the user text, stream the model, run its tool
    /// calls and keep the assistant row and subscriber up to date.
    pub async fn send_message(&self, thread_id: &str, text: &str, model: &str) -> Result<Ack> {
        self.begin_turn(thread_id, text, model).await?.run().await
    }

    /// Check preconditions and claim the thread without side effects.
    ///
    /// Fails with `ThreadNotFound`, `InvalidModelRef` or `ThreadBusy`;
    /// nothing is persisted or broadcast in that case.
    pub async fn begin_turn(&self, thread_id: &str, text: &str, model: &str) -> Result<PendingTurn> {
        if self.store.get_thread(thread_id).await?.is_none() {
            return Err(SessionError::ThreadNotFound(thread_id.to_string()));
        }
        let model: ModelRef = model
            .parse()
            .map_err(|_| SessionError::InvalidModelRef(model.to_string()))?;

        let cancel = CancellationToken::new();
        {
            let mut active = lock(&self.active);
            if active.contains_key(thread_id) {
                return Err(SessionError::ThreadBusy(thread_id.to_string()));
            }
            active.insert(thread_id.to_string(), cancel.clone());
        }

        Ok(PendingTurn {
            session: self.clone(),
            thread_id: thread_id.to_string(),
            text: text.to_string(),
            model,
            cancel,
            slot: ActiveTurn {
                active: Arc::clone(&self.active),
                thread_id: thread_id.to_string(),
            },
        })
    }

    /// Cancel the thread's in-flight turn; false if there is none
    pub fn stop(&self, thread_id: &str) -> bool {
        match lock(&self.active).get(thread_id) {
            Some(token) => {
                info!(thread_id = %thread_id, "Stopping turn");
                token.cancel();
                true
            }
            None => false,
        }
    }

    /// Whether a turn for the thread is running in this process
    pub fn is_generating(&self, thread_id: &str) -> bool {
        lock(&self.active).contains_key(thread_id)
    }

    async fn run_turn(
        &self,
        thread_id: &str,
        text: &str,
        model: &ModelRef,
        cancel: CancellationToken,
    ) -> Result<Ack> {
        let user = Message::user(thread_id, text);
        let user_message_id = user.id.clone();
        self.store.insert_message(user).await?;
        self.store
            .update_thread(
                thread_id,
                ThreadUpdate {
                    model: Some(model.to_string()),
                    is_generating: Some(true),
                    ..Default::default()
                },
            )
            .await?;

        let provider = self
            .store
            .get_provider(&model.provider_id)
            .await?
            .ok_or_else(|| SessionError::ProviderNotFound(model.provider_id.clone()))?;
        if !provider.enabled {
            return Err(SessionError::ProviderDisabled(provider.id));
        }
        let llm = self
            .factory
            .create(&provider, &model.model_name)
            .map_err(SessionError::Model)?;

        let history = self.store.get_messages(thread_id).await?;
        let messages = to_model_messages(&history, self.config.system_prompt.as_deref());

        let mut turn = TurnState::new(
            thread_id,
            model.model_name.clone(),
            user_message_id,
            messages,
            cancel,
        );
        let publisher = TurnPublisher::new(Arc::clone(&self.store), Arc::clone(&self.channel));

        let driven = self.drive(&mut turn, &publisher, llm).await;
        let finished = self.finalize(&mut turn, &publisher, driven.is_ok()).await;

        let status = driven?;
        finished?;

        Ok(Ack {
            user_message_id: turn.user_message_id,
            assistant_message_id: turn.assistant_message_id,
            status,
            steps: turn.steps,
        })
    }

    /// Alternate model and tool nodes until the router ends the turn
    async fn drive(
        &self,
        turn: &mut TurnState,
        publisher: &TurnPublisher,
        llm: Arc<dyn LanguageModel>,
    ) -> Result<TurnStatus> {
        let model_node = ModelNode::new(llm, self.model_options());
        let tool_node = ToolNode::new(Arc::clone(&self.executor));
        let router = SimpleRouter;

        let mut current = NodeType::Model;

        loop {
            if turn.check_cancelled() {
                return Ok(TurnStatus::Cancelled);
            }

            // Guardrail: max model invocations
            if current == NodeType::Model && turn.steps >= self.config.max_steps {
                warn!(
                    thread_id = %turn.thread_id,
                    max_steps = self.config.max_steps,
                    "Step limit reached"
                );
                return Ok(TurnStatus::StepLimitExceeded);
            }

            match current {
                NodeType::Model => model_node.execute(turn, publisher).await?,
                NodeType::Tool => tool_node.execute(turn, publisher).await?,
            }

            match router.next(turn, current) {
                NextNode::End => break,
                NextNode::Model => current = model_node.node_type(),
                NextNode::Tool => current = tool_node.node_type(),
            }
        }

        Ok(if turn.cancelled {
            TurnStatus::Cancelled
        } else {
            TurnStatus::Completed
        })
    }

    /// Close out unfinished tool calls and write the final row.
    async fn finalize(
        &self,
        turn: &mut TurnState,
        publisher: &TurnPublisher,
        succeeded: bool,
    ) -> Result<()> {
        turn.phase = if succeeded {
            TurnPhase::Done
        } else {
            TurnPhase::Failed
        };

        let reason = if turn.check_cancelled() {
            "cancelled"
        } else {
            "turn aborted"
        };
        let changed = turn.fail_open_calls(reason);

        if turn.assistant_message_id.is_none() && turn.parts.is_empty() {
            return Ok(());
        }

        // Subscribers still show interrupted calls as running
        let written = if changed > 0 && succeeded {
            publisher.publish(turn).await
        } else {
            publisher.persist(turn).await.map(|_| ())
        };

        match written {
            Err(e) if !succeeded => {
                warn!(thread_id = %turn.thread_id, error = %e, "Final write of aborted turn failed");
                Ok(())
            }
            other => other,
        }
    }

    fn model_options(&self) -> ModelOptions {
        let mut options = ModelOptions::new().tools(self.executor.catalog().model_tools());
        if let Some(temp) = self.config.temperature {
            options = options.temperature(temp);
        }
        if let Some(tokens) = self.config.max_tokens {
            options = options.max_tokens(tokens);
        }
        options
    }
}
