//! Error types for netcopy-core.

use thiserror::Error;

/// Main error type for netcopy operations.
#[derive(Debug, Error)]
pub enum Error {
    /// I/O error from underlying system calls.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Underlying stream failed (peer closed, timeout, reset).
    #[error("transport error: {message}")]
    Transport { message: String },

    /// Malformed frame, unknown message kind, underflow, or a message kind
    /// that is illegal in the current state.
    #[error("protocol error: {message}")]
    Protocol { message: String },

    /// Encryption or decryption failure. The message is deliberately opaque:
    /// tag mismatch and malformed ciphertext are not distinguishable.
    #[error("crypto error: {message}")]
    Crypto { message: String },

    /// Per-file failure reported in-band via FileResponse/FileAck. Does not
    /// terminate the session on the server side.
    #[error("file error: {message}")]
    File { message: String },

    /// Client-local argument problem; never reaches the wire.
    #[error("invalid argument: {message}")]
    InvalidArgument { message: String },

    /// Configuration file problem.
    #[error("config error: {message}")]
    Config { message: String },
}

impl Error {
    pub fn transport(message: impl Into<String>) -> Self {
        Error::Transport {
            message: message.into(),
        }
    }

    pub fn protocol(message: impl Into<String>) -> Self {
        Error::Protocol {
            message: message.into(),
        }
    }

    pub fn crypto(message: impl Into<String>) -> Self {
        Error::Crypto {
            message: message.into(),
        }
    }

    pub fn file(message: impl Into<String>) -> Self {
        Error::File {
            message: message.into(),
        }
    }

    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Error::InvalidArgument {
            message: message.into(),
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        Error::Config {
            message: message.into(),
        }
    }

    /// Returns true if this error must terminate the session.
    ///
    /// File errors travel in-band (a failing FileResponse or FileAck) and the
    /// session stays alive to accept the next request; everything else is
    /// fatal to the connection.
    pub fn is_session_fatal(&self) -> bool {
        !matches!(self, Error::File { .. } | Error::InvalidArgument { .. })
    }
}

/// Convenience result type for netcopy operations.
pub type Result<T> = std::result::Result<T, Error>;
