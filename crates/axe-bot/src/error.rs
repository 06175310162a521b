//! Application error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Namespace {0} is held by a live run")]
    NamespaceHeld(String),

    #[error("Core error: {0}")]
    Core(#[from] axe_core::CoreError),

    #[error("Engine error: {0}")]
    Engine(#[from] axe_engine::EngineError),

    #[error("Persistence error: {0}")]
    Persistence(#[from] axe_persistence::PersistenceError),
}

pub type AppResult<T> = Result<T, AppError>;
