use thiserror::Error;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error(transparent)]
    Storage(#[from] reaper_store::StoreError),

    #[error(transparent)]
    Transport(#[from] reaper_client::Error),

    #[error(transparent)]
    Validation(#[from] entity::EventError),

    #[error(transparent)]
    Config(#[from] reaper_config::ConfigError),

    #[error("task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl EngineError {
    pub fn is_storage(&self) -> bool {
        matches!(self, EngineError::Storage(_))
    }

    pub fn is_config(&self) -> bool {
        matches!(self, EngineError::Config(_))
    }
}

pub type Result<T> = std::result::Result<T, EngineError>;
