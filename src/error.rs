//! Error taxonomy for the keeper
//!
//! Fatal errors stop the process with a non-zero exit; everything else is
//! logged and absorbed by the reconciliation loop.

use std::path::PathBuf;

pub type KeeperResult<T> = Result<T, KeeperError>;

/// Failure of a single HTTP exchange with the board service
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum RequestError {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("unexpected status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("decode error: {0}")]
    Decode(String),
}

#[derive(thiserror::Error, Debug)]
pub enum KeeperError {
    #[error("failed to load image {}: {source}", path.display())]
    ImageLoad {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("authentication error: {0}")]
    Authentication(String),

    #[error(transparent)]
    Request(#[from] RequestError),

    #[error("invalid board data: {0}")]
    BoardShape(String),

    #[error("board unavailable after {attempts} attempts")]
    BoardUnavailable { attempts: u32 },

    #[error("board palette is empty")]
    EmptyPalette,

    #[error("configuration error: {0}")]
    Config(String),
}

impl KeeperError {
    pub fn authentication(msg: impl Into<String>) -> Self {
        Self::Authentication(msg.into())
    }

    pub fn board_shape(msg: impl Into<String>) -> Self {
        Self::BoardShape(msg.into())
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Whether forward progress is impossible after this error
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Self::Request(_) | Self::BoardShape(_))
    }
}
