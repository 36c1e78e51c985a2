//! Protocol and configuration constants for netcopy.

/// Version string exchanged during the handshake.
pub const VERSION_STRING: &str = concat!("netcopy v", env!("CARGO_PKG_VERSION"));

/// Default TCP port for the server.
pub const DEFAULT_PORT: u16 = 1245;

/// Size of the serialized message header in bytes.
pub const HEADER_SIZE: usize = 16;

/// Maximum accepted frame payload (16 MiB). Caps memory per frame read.
pub const MAX_FRAME_SIZE: usize = 16 * 1024 * 1024;

/// Pre-shared key length in bytes.
pub const KEY_LEN: usize = 32;

/// Handshake nonce length in bytes.
pub const HANDSHAKE_NONCE_LEN: usize = 16;

/// Default chunk size for file data.
pub const DEFAULT_BUFFER_SIZE: usize = 65536;

/// Filename the client sends to request creation of an empty directory.
/// The server creates the parent directory and never persists this file.
pub const EMPTY_DIR_MARKER: &str = ".netcopy_empty_dir";

/// Default socket timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Default cap on a single destination file (1 GiB).
pub const DEFAULT_MAX_FILE_SIZE: u64 = 1_073_741_824;
