use crate::error::{PersistError, Result};
use crate::trait_client::PersistenceClient;
use alma_types::{Message, Part, Provider, Thread, ThreadUpdate};
use async_trait::async_trait;
use chrono::Utc;
use serde_json::{Map, Value};
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::debug;

#[derive(Default)]
struct Store {
    threads: HashMap<String, Thread>,
    messages: HashMap<String, Message>,
    /// Message ids per thread, insertion order
    thread_messages: HashMap<String, Vec<String>>,
    providers: HashMap<String, Provider>,
    settings: Map<String, Value>,
}

/// Process-local store, used by the dev server and tests
#[derive(Default)]
pub struct InMemoryPersistenceClient {
    store: RwLock<Store>,
}

impl InMemoryPersistenceClient {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PersistenceClient for InMemoryPersistenceClient {
    async fn create_thread(&self, thread: Thread) -> Result<Thread> {
        let mut store = self.store.write().await;
        store.thread_messages.entry(thread.id.clone()).or_default();
        store.threads.insert(thread.id.clone(), thread.clone());
        debug!(thread_id = %thread.id, "Created thread");
        Ok(thread)
    }

    async fn get_thread(&self, thread_id: &str) -> Result<Option<Thread>> {
        Ok(self.store.read().await.threads.get(thread_id).cloned())
    }

    async fn list_threads(&self, limit: Option<usize>) -> Result<Vec<Thread>> {
        let store = self.store.read().await;
        let mut threads: Vec<Thread> = store.threads.values().cloned().collect();
        threads.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        if let Some(limit) = limit {
            threads.truncate(limit);
        }
        Ok(threads)
    }

    async fn update_thread(&self, thread_id: &str, update: ThreadUpdate) -> Result<Thread> {
        let mut store = self.store.write().await;
        let thread = store
            .threads
            .get_mut(thread_id)
            .ok_or_else(|| PersistError::ThreadNotFound(thread_id.to_string()))?;
        thread.apply(update);
        Ok(thread.clone())
    }

    async fn delete_thread(&self, thread_id: &str) -> Result<()> {
        let mut store = self.store.write().await;
        if store.threads.remove(thread_id).is_none() {
            return Err(PersistError::ThreadNotFound(thread_id.to_string()));
        }
        if let Some(ids) = store.thread_messages.remove(thread_id) {
            for id in ids {
                store.messages.remove(&id);
            }
        }
        debug!(thread_id = %thread_id, "Deleted thread");
        Ok(())
    }

    async fn insert_message(&self, message: Message) -> Result<()> {
        let mut store = self.store.write().await;
        if !store.threads.contains_key(&message.thread_id) {
            return Err(PersistError::ThreadNotFound(message.thread_id.clone()));
        }
        if store.messages.contains_key(&message.id) {
            return Err(PersistError::Internal(format!(
                "duplicate message id: {}",
                message.id
            )));
        }
        store
            .thread_messages
            .entry(message.thread_id.clone())
            .or_default()
            .push(message.id.clone());
        store.messages.insert(message.id.clone(), message);
        Ok(())
    }

    async fn update_message_parts(&self, message_id: &str, parts: Vec<Part>) -> Result<()> {
        let mut store = self.store.write().await;
        let message = store
            .messages
            .get_mut(message_id)
            .ok_or_else(|| PersistError::MessageNotFound(message_id.to_string()))?;
        message.parts = parts;
        message.updated_at = Utc::now();
        Ok(())
    }

    async fn get_messages(&self, thread_id: &str) -> Result<Vec<Message>> {
        let store = self.store.read().await;
        let messages = store
            .thread_messages
            .get(thread_id)
            .map(|ids| {
                ids.iter()
                    .filter_map(|id| store.messages.get(id).cloned())
                    .collect()
            })
            .unwrap_or_default();
        Ok(messages)
    }

    async fn get_provider(&self, provider_id: &str) -> Result<Option<Provider>> {
        Ok(self.store.read().await.providers.get(provider_id).cloned())
    }

    async fn list_providers(&self) -> Result<Vec<Provider>> {
        let store = self.store.read().await;
        let mut providers: Vec<Provider> = store.providers.values().cloned().collect();
        providers.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(providers)
    }

    async fn upsert_provider(&self, mut provider: Provider) -> Result<Provider> {
        let mut store = self.store.write().await;
        if let Some(existing) = store.providers.get(&provider.id) {
            provider.created_at = existing.created_at;
        }
        provider.updated_at = Utc::now();
        store.providers.insert(provider.id.clone(), provider.clone());
        Ok(provider)
    }

    async fn delete_provider(&self, provider_id: &str) -> Result<()> {
        let mut store = self.store.write().await;
        store
            .providers
            .remove(provider_id)
            .map(|_| ())
            .ok_or_else(|| PersistError::ProviderNotFound(provider_id.to_string()))
    }

    async fn get_settings(&self) -> Result<Map<String, Value>> {
        Ok(self.store.read().await.settings.clone())
    }

    async fn update_settings(&self, settings: Map<String, Value>) -> Result<Map<String, Value>> {
        let mut store = self.store.write().await;
        store.settings = settings;
        debug!(keys = store.settings.len(), "Updated settings");
        Ok(store.settings.clone())
    }
}
