use std::io;
use thiserror::Error;

use crate::bytes_util::is_link_error_message;

/// The primary error type for the `dxlink` protocol layer.
#[derive(Error, Debug)]
pub enum LinkError {
    #[error("Invalid length: expected {expected} bytes, got {actual}")]
    InvalidLength { expected: usize, actual: usize },

    #[error("Value out of range for {field}: {value}")]
    OutOfRange { field: &'static str, value: i64 },

    #[error("Peer is not connected")]
    NotConnected,

    #[error("Link failure: {0}")]
    Link(String),

    #[error("Peer error: {0}")]
    Peer(#[source] PeerError),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("A transport is already connected; disconnect it first")]
    AlreadyConnected,

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Base64 decode error: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("Hex decode error: {0}")]
    Hex(#[from] hex::FromHexError),
}

impl LinkError {
    /// Errors caused by the link itself rather than by the data or the caller.
    pub fn is_link_error(&self) -> bool {
        matches!(self, LinkError::NotConnected | LinkError::Link(_))
    }

    /// Wrong frame length or an unencodable value: a logic bug, never transient.
    pub fn is_structural(&self) -> bool {
        matches!(self, LinkError::InvalidLength { .. } | LinkError::OutOfRange { .. })
    }
}

/// An error raised by a peer backend while reading, writing or subscribing.
///
/// Backends report failures as free-form messages (plus an optional native
/// error code); whether a failure is a link error is decided by the message
/// signature.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct PeerError {
    message: String,
    code: Option<i32>,
}

impl PeerError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            code: None,
        }
    }

    pub fn with_code(mut self, code: i32) -> Self {
        self.code = Some(code);
        self
    }

    pub fn not_connected() -> Self {
        Self::new("Device is not connected")
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn code(&self) -> Option<i32> {
        self.code
    }

    pub fn is_link_error(&self) -> bool {
        is_link_error_message(&self.message)
    }
}

impl From<PeerError> for LinkError {
    fn from(err: PeerError) -> Self {
        if err.is_link_error() {
            LinkError::Link(err.message)
        } else {
            LinkError::Peer(err)
        }
    }
}

pub type Result<T> = std::result::Result<T, LinkError>;
