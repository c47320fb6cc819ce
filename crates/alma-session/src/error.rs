use alma_persist::PersistError;
use thiserror::Error;

/// Turn-level failures; each one aborts the turn
#[derive(Error, Debug)]
pub enum SessionError {
    #[error("Thread not found: {0}")]
    ThreadNotFound(String),

    #[error("Invalid model reference: {0}")]
    InvalidModelRef(String),

    #[error("Provider not found: {0}")]
    ProviderNotFound(String),

    #[error("Provider disabled: {0}")]
    ProviderDisabled(String),

    #[error("Thread {0} already has a turn in progress")]
    ThreadBusy(String),

    #[error("Model error: {0}")]
    Model(anyhow::Error),

    #[error(transparent)]
    Persist(#[from] PersistError),
}

pub type Result<T> = std::result::Result<T, SessionError>;
