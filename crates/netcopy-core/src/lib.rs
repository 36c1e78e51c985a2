//! netcopy-core: Shared library for the netcopy secure file transfer protocol.
//!
//! This crate provides:
//! - Protocol message definitions and the wire format codec
//! - The pluggable cipher suite (ChaCha20-Poly1305, AES-256-GCM, AES-256-CTR, XOR)
//! - The secure channel (handshake + encrypted framing)
//! - Server-side path authorization and wire/native path conversion
//! - Chunked file I/O and per-chunk LZ4 compression
//! - Configuration files, logging, and bandwidth pacing

pub mod channel;
pub mod config;
pub mod constants;
pub mod crypto;
pub mod error;
pub mod file;
pub mod logging;
pub mod path_policy;
pub mod protocol;
pub mod throttle;

pub use error::{Error, Result};
pub use logging::{init_logging, LogFormat};
