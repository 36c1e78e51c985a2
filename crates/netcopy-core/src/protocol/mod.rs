//! Protocol message definitions and wire format codec.
//!
//! This module provides:
//! - The typed message set exchanged between client and server
//! - A strict little-endian codec (16-byte header + typed body)
//! - Length-prefixed frame I/O over any async stream

pub mod codec;
pub mod message;

#[cfg(test)]
mod proptest;

pub use codec::{decode, encode, read_frame, write_frame};
pub use message::{
    ErrorMessage, FileAck, FileData, FileRequest, FileResponse, HandshakeRequest,
    HandshakeResponse, Message,
};
