use thiserror::Error;

use crate::error::{AppError, ErrorKind};

pub type BrowserResult<T> = Result<T, BrowserError>;

#[derive(Debug, Error)]
pub enum BrowserError {
    #[error("chromium launch failed: {0}")]
    Launch(String),
    #[error("cdp error: {0}")]
    Cdp(#[from] chromiumoxide::error::CdpError),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("timeout waiting for {0}")]
    Timeout(String),
    #[error("configuration error: {0}")]
    Configuration(String),
    #[error("element not found: {0}")]
    ElementNotFound(String),
    #[error("empty response from {0}")]
    EmptyResponse(String),
    #[error("browser session cancelled")]
    Cancelled,
}

impl From<BrowserError> for AppError {
    fn from(err: BrowserError) -> Self {
        match err {
            BrowserError::Cancelled => AppError::cancelled(),
            other => AppError::wrap(other, ErrorKind::Api, "browser automation failed"),
        }
    }
}
