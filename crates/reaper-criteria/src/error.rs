use thiserror::Error;

#[derive(Error, Debug)]
pub enum CriteriaError {
    #[error(transparent)]
    Config(#[from] reaper_config::ConfigError),

    #[error(transparent)]
    Transport(#[from] reaper_client::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, CriteriaError>;
