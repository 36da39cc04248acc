use std::io;
use thiserror::Error;

/// Main error type for the server
#[derive(Error, Debug)]
pub enum ServerError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// Protocol violation on the wire, mapped to a 400 response.
    #[error("bad request: {0}")]
    BadRequest(String),

    /// Failure raised by a request handler, mapped to a 500 response.
    #[error("handler error: {0}")]
    Handler(String),

    #[error("metrics error: {0}")]
    Metrics(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type ServerResult<T> = Result<T, ServerError>;
