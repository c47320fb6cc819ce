use std::sync::Arc;
use anyhow::{anyhow, Result};

use alma_persist::PersistenceClient;
use alma_tools::ToolExecutor;
use alma_types::SessionConfig;

use crate::broadcast::BroadcastChannel;
use crate::client_factory::ModelFactory;
use crate::session::SessionOrchestrator;

/// Builder for constructing a SessionOrchestrator
pub struct SessionBuilder {
    store: Option<Arc<dyn PersistenceClient>>,
    channel: Option<Arc<BroadcastChannel>>,
    executor: Option<Arc<ToolExecutor>>,
    factory: Option<Arc<dyn ModelFactory>>,
    config: SessionConfig,
}

impl SessionBuilder {
    pub fn new() -> Self {
        Self {
            store: None,
            channel: None,
            executor: None,
            factory: None,
            config: SessionConfig::default(),
        }
    }

    pub fn store(mut self, store: Arc<dyn PersistenceClient>) -> Self {
        self.store = Some(store);
        self
    }

    /// Defaults to a fresh channel when unset
    pub fn channel(mut self, channel: Arc<BroadcastChannel>) -> Self {
        self.channel = Some(channel);
        self
    }

    pub fn executor(mut self, executor: Arc<ToolExecutor>) -> Self {
        self.executor = Some(executor);
        self
    }

    pub fn model_factory(mut self, factory: Arc<dyn ModelFactory>) -> Self {
        self.factory = Some(factory);
        self
    }

    pub fn config(mut self, config: SessionConfig) -> Self {
        self.config = config;
        self
    }

    pub fn build(self) -> Result<SessionOrchestrator> {
        let store = self.store
            .ok_or_else(|| anyhow!("Persistence client is required"))?;
        let executor = self.executor
            .ok_or_else(|| anyhow!("Tool executor is required"))?;
        let factory = self.factory
            .ok_or_else(|| anyhow!("Model factory is required"))?;
        if self.config.max_steps == 0 {
            return Err(anyhow!("max_steps must be at least 1"));
        }

        Ok(SessionOrchestrator::new(
            store,
            self.channel.unwrap_or_default(),
            executor,
            factory,
            self.config,
        ))
    }
}

impl Default for SessionBuilder {
    fn default() -> Self {
        Self::new()
    }
}
