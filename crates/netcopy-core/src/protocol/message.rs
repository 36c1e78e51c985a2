//! Typed protocol messages.
//!
//! Every message kind has a fixed serialization (see the codec). Messages
//! are immutable once constructed; the sequence number lives in the frame
//! header, not in the payload types.

use crate::crypto::SecurityLevel;

/// Wire type codes. Codes 7 and 8 belonged to a retired resume exchange and
/// must decode as unknown-type errors.
pub mod msg_type {
    pub const HANDSHAKE_REQUEST: u32 = 1;
    pub const HANDSHAKE_RESPONSE: u32 = 2;
    pub const FILE_REQUEST: u32 = 3;
    pub const FILE_RESPONSE: u32 = 4;
    pub const FILE_DATA: u32 = 5;
    pub const FILE_ACK: u32 = 6;
    pub const ERROR_MESSAGE: u32 = 9;
}

/// Client hello, sent in cleartext as the first frame of a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandshakeRequest {
    pub client_version: String,
    /// 16 random bytes. Transmitted for wire compatibility; not mixed into
    /// any key or MAC.
    pub client_nonce: Vec<u8>,
    pub security_level: SecurityLevel,
}

/// Server reply to the hello, also cleartext. All subsequent frames are
/// encrypted with the accepted cipher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandshakeResponse {
    pub server_version: String,
    /// 16 random bytes; see `HandshakeRequest::client_nonce`.
    pub server_nonce: Vec<u8>,
    pub auth_required: bool,
    pub accepted_security_level: SecurityLevel,
}

/// Opens a per-file transfer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileRequest {
    pub source_path: String,
    /// Destination in wire form (always `/`-separated).
    pub destination_path: String,
    pub recursive: bool,
    /// Resume FLAG, not an offset: 0 means fresh transfer (truncate), any
    /// non-zero value asks the server to report its partial size. The
    /// authoritative offset comes back in `FileResponse::resume_offset`,
    /// which avoids racing on the client's stale view of the partial file.
    pub resume_offset: u64,
}

/// Server verdict on a `FileRequest`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileResponse {
    pub success: bool,
    pub error: String,
    pub file_size: u64,
    /// Byte offset the client must start sending from (current size of the
    /// server's partial file, 0 for a fresh transfer).
    pub resume_offset: u64,
}

/// One chunk of file content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileData {
    /// Plaintext file offset of this chunk, regardless of compression.
    pub offset: u64,
    /// Chunk body. When `compressed` is set this is an LZ4 block with the
    /// uncompressed length prepended, so the receiver can size its output.
    pub data: Vec<u8>,
    pub is_last_chunk: bool,
    pub compressed: bool,
}

/// Per-chunk acknowledgement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileAck {
    /// On success: chunk offset + uncompressed chunk length.
    pub bytes_received: u64,
    pub success: bool,
    pub error: String,
}

/// Fatal error report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorMessage {
    pub code: u32,
    pub description: String,
}

/// Tagged variant over the message kinds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    HandshakeRequest(HandshakeRequest),
    HandshakeResponse(HandshakeResponse),
    FileRequest(FileRequest),
    FileResponse(FileResponse),
    FileData(FileData),
    FileAck(FileAck),
    Error(ErrorMessage),
}

impl Message {
    /// Wire type code for the frame header.
    pub fn message_type(&self) -> u32 {
        match self {
            Message::HandshakeRequest(_) => msg_type::HANDSHAKE_REQUEST,
            Message::HandshakeResponse(_) => msg_type::HANDSHAKE_RESPONSE,
            Message::FileRequest(_) => msg_type::FILE_REQUEST,
            Message::FileResponse(_) => msg_type::FILE_RESPONSE,
            Message::FileData(_) => msg_type::FILE_DATA,
            Message::FileAck(_) => msg_type::FILE_ACK,
            Message::Error(_) => msg_type::ERROR_MESSAGE,
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Message::HandshakeRequest(_) => "HandshakeRequest",
            Message::HandshakeResponse(_) => "HandshakeResponse",
            Message::FileRequest(_) => "FileRequest",
            Message::FileResponse(_) => "FileResponse",
            Message::FileData(_) => "FileData",
            Message::FileAck(_) => "FileAck",
            Message::Error(_) => "ErrorMessage",
        }
    }

    /// True for the two cleartext handshake kinds.
    pub fn is_handshake(&self) -> bool {
        matches!(
            self,
            Message::HandshakeRequest(_) | Message::HandshakeResponse(_)
        )
    }
}

impl FileResponse {
    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: error.into(),
            file_size: 0,
            resume_offset: 0,
        }
    }
}

impl FileAck {
    pub fn success(bytes_received: u64) -> Self {
        Self {
            bytes_received,
            success: true,
            error: String::new(),
        }
    }

    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            bytes_received: 0,
            success: false,
            error: error.into(),
        }
    }
}
