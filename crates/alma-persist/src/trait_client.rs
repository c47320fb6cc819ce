use crate::error::Result;
use alma_types::{Message, Part, Provider, Thread, ThreadUpdate};
use async_trait::async_trait;
use serde_json::{Map, Value};

/// Store operations the session core depends on.
///
/// Implementations own the schema; callers only see these operations.
#[async_trait]
pub trait PersistenceClient: Send + Sync {
    /// Create a new thread
    async fn create_thread(&self, thread: Thread) -> Result<Thread>;

    /// Get a thread by ID
    async fn get_thread(&self, thread_id: &str) -> Result<Option<Thread>>;

    /// List threads, most recently updated first
    async fn list_threads(&self, limit: Option<usize>) -> Result<Vec<Thread>>;

    /// Apply a partial update; fails with `ThreadNotFound` for unknown ids
    async fn update_thread(&self, thread_id: &str, update: ThreadUpdate) -> Result<Thread>;

    /// Delete a thread and its messages
    async fn delete_thread(&self, thread_id: &str) -> Result<()>;

    /// Insert a message row
    async fn insert_message(&self, message: Message) -> Result<()>;

    /// Replace the parts of an existing message in place
    async fn update_message_parts(&self, message_id: &str, parts: Vec<Part>) -> Result<()>;

    /// Get all messages for a thread in insertion order
    async fn get_messages(&self, thread_id: &str) -> Result<Vec<Message>>;

    async fn get_provider(&self, provider_id: &str) -> Result<Option<Provider>>;

    async fn list_providers(&self) -> Result<Vec<Provider>>;

    /// Insert or replace a provider keyed by id
    async fn upsert_provider(&self, provider: Provider) -> Result<Provider>;

    async fn delete_provider(&self, provider_id: &str) -> Result<()>;

    /// Application settings document; empty until first written
    async fn get_settings(&self) -> Result<Map<String, Value>>;

    /// Replace the whole settings document
    async fn update_settings(&self, settings: Map<String, Value>) -> Result<Map<String, Value>>;
}
