use thiserror::Error;

pub type Result<T> = std::result::Result<T, RunbookError>;

#[derive(Error, Debug)]
pub enum RunbookError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
