use thiserror::Error;

pub type Result<T> = std::result::Result<T, StoreError>;

/// Store failures are upstream problems worth retrying; a bundle that simply
/// is not there yet is `Ok(None)` on `get`, never an error.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("HTTP transport error: {0}")]
    Http(#[from] hyper::Error),

    #[error("Invalid request: {0}")]
    Request(#[from] hyper::http::Error),

    #[error("Object store returned {status} for {uri}")]
    UpstreamStatus { status: u16, uri: String },
}
