use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    #[error("Search failed: {0}")]
    SearchError(String),

    #[error("Failed to resolve download url for track {id}: {reason}")]
    ResolutionError { id: String, reason: String },

    #[error("Download failed: {0}")]
    DownloadError(String),

    #[error("Failed to read selection input: {0}")]
    PromptError(String),
}

pub type Result<T> = std::result::Result<T, Error>;
