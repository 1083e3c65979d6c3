use domain::{ProviderError, SourceError};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("Unsupported source: {0}")]
    UnsupportedSource(String),
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),
}

impl From<SourceError> for AppError {
    fn from(err: SourceError) -> Self {
        match err {
            SourceError::Unknown(tag) => AppError::UnsupportedSource(tag),
        }
    }
}
