//! Per-connection session: handshake, message loop, and the server side of
//! the file transfer engine.
//!
//! One session owns one connection and runs fully sequentially: receive a
//! frame, act, send the reply. Per-file failures are reported in-band and
//! leave the session ready for the next request; transport, protocol, and
//! crypto errors tear the session down.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::io::{AsyncRead, AsyncWrite};
use tracing::{debug, error, info, warn};

use netcopy_core::channel::SecureChannel;
use netcopy_core::config::ServerConfig;
use netcopy_core::constants::{EMPTY_DIR_MARKER, MAX_FRAME_SIZE};
use netcopy_core::crypto::SecretKey;
use netcopy_core::error::Result;
use netcopy_core::file::{self, compress};
use netcopy_core::path_policy::{self, PathPolicy};
use netcopy_core::protocol::{FileAck, FileData, FileRequest, FileResponse, Message};

/// Server-side state for one in-flight file.
#[derive(Debug)]
struct TransferContext {
    destination: PathBuf,
    /// True iff the destination filename is the empty-directory marker; the
    /// marker file itself is never persisted.
    is_marker: bool,
    expected_next_offset: u64,
}

/// Handles one accepted connection for its whole lifetime.
pub struct Session<S> {
    channel: SecureChannel<S>,
    config: Arc<ServerConfig>,
    policy: Arc<PathPolicy>,
    peer: String,
    transfer: Option<TransferContext>,
}

impl<S> Session<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    pub fn new(
        channel: SecureChannel<S>,
        config: Arc<ServerConfig>,
        policy: Arc<PathPolicy>,
        peer: String,
    ) -> Self {
        Self {
            channel,
            config,
            policy,
            peer,
            transfer: None,
        }
    }

    /// Run the session to completion. Returns Ok on graceful peer close.
    pub async fn run(&mut self, key: &SecretKey) -> Result<()> {
        let request = self
            .channel
            .handshake_respond(self.config.require_auth, key)
            .await?;
        info!(
            peer = %self.peer,
            client_version = %request.client_version,
            level = %request.security_level,
            "session established"
        );

        loop {
            let message = match self.channel.recv().await {
                Ok(message) => message,
                Err(e) => {
                    // A closed peer is the normal end of a session.
                    if let netcopy_core::Error::Io(io) = &e {
                        if io.kind() == std::io::ErrorKind::UnexpectedEof {
                            debug!(peer = %self.peer, "peer closed connection");
                            return Ok(());
                        }
                    }
                    error!(peer = %self.peer, error = %e, "session error");
                    return Err(e);
                }
            };

            match message {
                Message::FileRequest(request) => {
                    let response = self.handle_file_request(&request).await;
                    self.channel.send(&Message::FileResponse(response)).await?;
                }
                Message::FileData(data) => {
                    let (ack, completed) = self.handle_file_data(&data).await;
                    self.channel.send(&Message::FileAck(ack)).await?;
                    if completed {
                        self.transfer = None;
                    }
                }
                other => {
                    // Unknown kinds already fail in the codec; a known kind
                    // that is illegal here is logged and ignored.
                    warn!(
                        peer = %self.peer,
                        kind = other.type_name(),
                        "ignoring unexpected message"
                    );
                }
            }
        }
    }

    /// Validate and resolve a file request. Errors become a failing
    /// response; the session stays alive either way.
    async fn handle_file_request(&mut self, request: &FileRequest) -> FileResponse {
        self.transfer = None;

        let native = path_policy::to_native(&request.destination_path);
        debug!(
            peer = %self.peer,
            destination = %request.destination_path,
            native = %native,
            resume = request.resume_offset != 0,
            "file request"
        );

        if !path_policy::is_absolute_path(&native) {
            return FileResponse::failure(format!(
                "relative paths are not allowed: {}",
                request.destination_path
            ));
        }

        let mut resolved = path_policy::lexical_normalize(Path::new(&native));

        if !self.policy.is_allowed(&resolved) {
            warn!(peer = %self.peer, path = %resolved.display(), "path denied by policy");
            return FileResponse::failure(format!(
                "Access denied to path: {}",
                request.destination_path
            ));
        }

        // A destination that is an existing directory receives the source's
        // basename.
        if resolved.is_dir() || native.ends_with('/') || native.ends_with('\\') {
            match wire_basename(&request.source_path) {
                Some(name) => resolved.push(name),
                None => {
                    return FileResponse::failure(format!(
                        "cannot derive a filename from source path: {}",
                        request.source_path
                    ));
                }
            }
        }

        // The request's resume_offset is only a flag; the authoritative
        // offset is our current partial size.
        let resume_offset = if request.resume_offset != 0 {
            file::partial_size(&resolved).await
        } else {
            0
        };

        if let Err(e) = file::ensure_parent_dir(&resolved).await {
            return FileResponse::failure(e.to_string());
        }

        let is_marker = resolved
            .file_name()
            .map(|name| name == EMPTY_DIR_MARKER)
            .unwrap_or(false);

        debug!(
            peer = %self.peer,
            destination = %resolved.display(),
            resume_offset,
            is_marker,
            "transfer opened"
        );

        self.transfer = Some(TransferContext {
            destination: resolved,
            is_marker,
            expected_next_offset: resume_offset,
        });

        FileResponse {
            success: true,
            error: String::new(),
            file_size: 0,
            resume_offset,
        }
    }

    /// Apply one chunk to the open transfer. Returns the ack and whether
    /// the transfer just completed.
    async fn handle_file_data(&mut self, data: &FileData) -> (FileAck, bool) {
        let Some(transfer) = self.transfer.as_mut() else {
            return (FileAck::failure("no transfer in progress"), false);
        };

        let payload = if data.compressed {
            match compress::decompress_chunk(&data.data, MAX_FRAME_SIZE) {
                Ok(payload) => payload,
                Err(e) => return (FileAck::failure(e.to_string()), false),
            }
        } else {
            data.data.clone()
        };
        let raw_len = payload.len() as u64;

        if transfer.is_marker {
            // The marker only requests the directory; the file itself is
            // never written.
            if let Some(parent) = transfer.destination.parent() {
                if let Err(e) = tokio::fs::create_dir_all(parent).await {
                    return (
                        FileAck::failure(format!(
                            "failed to create directory {}: {}",
                            parent.display(),
                            e
                        )),
                        false,
                    );
                }
            }
            debug!(
                peer = %self.peer,
                directory = %transfer.destination.parent().unwrap_or(Path::new("")).display(),
                "empty directory created from marker"
            );
            return (FileAck::success(data.offset + raw_len), data.is_last_chunk);
        }

        let end = data.offset.saturating_add(raw_len);
        if end > self.config.max_file_size {
            return (
                FileAck::failure(format!(
                    "file exceeds maximum allowed size of {} bytes",
                    self.config.max_file_size
                )),
                false,
            );
        }

        if data.offset != transfer.expected_next_offset {
            debug!(
                peer = %self.peer,
                offset = data.offset,
                expected = transfer.expected_next_offset,
                "chunk offset differs from expected"
            );
        }

        if let Err(e) = file::write_chunk(&transfer.destination, data.offset, &payload).await {
            error!(peer = %self.peer, error = %e, "chunk write failed");
            return (FileAck::failure(e.to_string()), false);
        }

        transfer.expected_next_offset = end;
        (FileAck::success(end), data.is_last_chunk)
    }
}

/// Final path component of a wire or native path string.
fn wire_basename(path: &str) -> Option<&str> {
    let trimmed = path.trim_end_matches(['/', '\\']);
    let name = trimmed
        .rsplit(['/', '\\'])
        .next()
        .filter(|s| !s.is_empty())?;
    // Strip a Windows drive prefix that survived the split ("C:file").
    let name = name.rsplit(':').next().unwrap_or(name);
    if name.is_empty() {
        None
    } else {
        Some(name)
    }
}
