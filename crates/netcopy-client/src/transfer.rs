//! Client-side transfer engine.
//!
//! Drives the per-file sub-protocol over an established secure channel:
//! `FileRequest -> FileResponse -> FileData* -> FileAck*`, strictly
//! request/response with one outstanding chunk. Directory transfers walk
//! the source tree, map every file to
//! `destination / source_basename / relative_path` (wire separators), and
//! create markers for directories that end up with no files beneath them.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::io::{AsyncRead, AsyncWrite};
use tracing::{debug, info};

use netcopy_core::channel::SecureChannel;
use netcopy_core::constants::EMPTY_DIR_MARKER;
use netcopy_core::error::{Error, Result};
use netcopy_core::file::{self, compress};
use netcopy_core::path_policy;
use netcopy_core::protocol::{FileAck, FileData, FileRequest, FileResponse, Message};
use netcopy_core::throttle::Throttle;

use crate::progress::{NoProgress, ProgressCallback, ProgressEvent};

/// Knobs for one transfer run.
#[derive(Debug, Clone)]
pub struct TransferOptions {
    pub recursive: bool,
    pub resume: bool,
    pub create_empty_directories: bool,
    pub buffer_size: usize,
    pub throttle: Throttle,
}

impl Default for TransferOptions {
    fn default() -> Self {
        Self {
            recursive: false,
            resume: false,
            create_empty_directories: true,
            buffer_size: netcopy_core::constants::DEFAULT_BUFFER_SIZE,
            throttle: Throttle::from_percent(100),
        }
    }
}

/// Counters for a completed run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TransferStats {
    pub files_transferred: u64,
    pub bytes_sent: u64,
    pub directories_created: u64,
}

/// Drives transfers over one session.
pub struct TransferEngine<S> {
    channel: SecureChannel<S>,
    options: TransferOptions,
    progress: Arc<dyn ProgressCallback>,
}

impl<S> TransferEngine<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// The channel must already have completed its handshake.
    pub fn new(channel: SecureChannel<S>, options: TransferOptions) -> Self {
        Self {
            channel,
            options,
            progress: Arc::new(NoProgress),
        }
    }

    pub fn with_progress(mut self, progress: Arc<dyn ProgressCallback>) -> Self {
        self.progress = progress;
        self
    }

    /// Transfer a file or (with `recursive`) a directory tree.
    pub async fn transfer(&mut self, source: &Path, destination: &str) -> Result<TransferStats> {
        let metadata = tokio::fs::metadata(source)
            .await
            .map_err(|e| Error::file(format!("source {} does not exist: {}", source.display(), e)))?;

        if metadata.is_dir() {
            if !self.options.recursive {
                return Err(Error::invalid_argument(format!(
                    "{} is a directory; use --recursive to transfer directories",
                    source.display()
                )));
            }
            self.transfer_directory(source, destination).await
        } else {
            let bytes = self.transfer_single_file(source, destination.to_string()).await?;
            Ok(TransferStats {
                files_transferred: 1,
                bytes_sent: bytes,
                directories_created: 0,
            })
        }
    }

    async fn transfer_directory(
        &mut self,
        source: &Path,
        destination: &str,
    ) -> Result<TransferStats> {
        let scan = file::scan_source(source).await?;
        let total_bytes: u64 = scan.files.iter().map(|f| f.size).sum();
        self.progress.on_event(ProgressEvent::ScanCompleted {
            file_count: scan.files.len(),
            total_bytes,
        });

        let source_name = source
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| {
                Error::invalid_argument(format!(
                    "cannot derive a directory name from {}",
                    source.display()
                ))
            })?;
        let base = join_wire(destination, source_name);

        let mut stats = TransferStats::default();

        for entry in &scan.files {
            let remote = join_wire(&base, &relative_wire(&entry.relative));
            debug!(local = %entry.path.display(), remote = %remote, "transferring file");
            stats.bytes_sent += self
                .transfer_single_file(&entry.path, remote)
                .await?;
            stats.files_transferred += 1;
        }

        if self.options.create_empty_directories {
            for dir in uncovered_directories(&scan.directories, &scan.files) {
                let remote_dir = join_wire(&base, &relative_wire(&dir));
                debug!(remote = %remote_dir, "creating empty directory");
                self.create_empty_directory(&remote_dir).await?;
                stats.directories_created += 1;
            }
        }

        Ok(stats)
    }

    /// Run the single-file state machine. Returns the bytes sent (resumed
    /// bytes are not re-sent and not counted).
    async fn transfer_single_file(&mut self, local: &Path, remote: String) -> Result<u64> {
        let file_size = tokio::fs::metadata(local)
            .await
            .map_err(|e| Error::file(format!("failed to stat {}: {}", local.display(), e)))?
            .len();

        let response = self
            .open_transfer(local, &remote, self.options.resume)
            .await?;

        let name = local
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| local.display().to_string());
        self.progress.on_event(ProgressEvent::FileStarted {
            name: name.clone(),
            total_bytes: file_size,
        });

        // The response carries the authoritative starting offset.
        let mut offset = response.resume_offset;
        if offset > 0 {
            info!(file = %name, offset, "resuming transfer");
        }

        if file_size == 0 {
            self.send_chunk(0, Vec::new(), true, false).await?;
            self.progress.on_event(ProgressEvent::FileCompleted { name, bytes: 0 });
            return Ok(0);
        }

        let compressible = compress::is_compressible(local);
        let mut bytes_sent = 0u64;

        while offset < file_size {
            let chunk = file::read_chunk(local, offset, self.options.buffer_size).await?;
            if chunk.is_empty() {
                return Err(Error::file(format!(
                    "{} shrank during transfer",
                    local.display()
                )));
            }
            let raw_len = chunk.len() as u64;
            let is_last = offset + raw_len >= file_size;

            let (payload, compressed) = if compressible {
                (compress::compress_chunk(&chunk), true)
            } else {
                (chunk, false)
            };

            let ack = self.send_chunk(offset, payload, is_last, compressed).await?;
            if ack.bytes_received != offset + raw_len {
                debug!(
                    expected = offset + raw_len,
                    acked = ack.bytes_received,
                    "ack reports unexpected byte count"
                );
            }

            offset += raw_len;
            bytes_sent += raw_len;
            self.progress.on_event(ProgressEvent::FileProgress {
                name: name.clone(),
                bytes_transferred: offset,
                total_bytes: file_size,
            });

            self.options.throttle.pace().await;
        }

        self.progress.on_event(ProgressEvent::FileCompleted {
            name,
            bytes: bytes_sent,
        });
        Ok(bytes_sent)
    }

    /// Ask the server to create a directory by transferring the marker.
    async fn create_empty_directory(&mut self, remote_dir: &str) -> Result<()> {
        let marker = join_wire(remote_dir, EMPTY_DIR_MARKER);

        let request = FileRequest {
            source_path: EMPTY_DIR_MARKER.to_string(),
            destination_path: marker,
            recursive: false,
            resume_offset: 0,
        };
        self.channel.send(&Message::FileRequest(request)).await?;
        let response = self.expect_file_response().await?;
        if !response.success {
            return Err(Error::file(format!(
                "failed to create directory: {}",
                response.error
            )));
        }

        self.send_chunk(0, Vec::new(), true, false).await?;
        Ok(())
    }

    async fn open_transfer(
        &mut self,
        local: &Path,
        remote: &str,
        resume: bool,
    ) -> Result<FileResponse> {
        let request = FileRequest {
            source_path: path_policy::to_wire(&local.display().to_string()),
            destination_path: remote.to_string(),
            recursive: false,
            // A flag, not an offset: non-zero asks the server to report its
            // partial size in the response.
            resume_offset: if resume { 1 } else { 0 },
        };
        self.channel.send(&Message::FileRequest(request)).await?;

        let response = self.expect_file_response().await?;
        if !response.success {
            return Err(Error::file(format!("server error: {}", response.error)));
        }
        Ok(response)
    }

    async fn send_chunk(
        &mut self,
        offset: u64,
        data: Vec<u8>,
        is_last_chunk: bool,
        compressed: bool,
    ) -> Result<FileAck> {
        self.channel
            .send(&Message::FileData(FileData {
                offset,
                data,
                is_last_chunk,
                compressed,
            }))
            .await?;

        let ack = self.expect_file_ack().await?;
        if !ack.success {
            return Err(Error::file(format!("transfer failed: {}", ack.error)));
        }
        Ok(ack)
    }

    async fn expect_file_response(&mut self) -> Result<FileResponse> {
        match self.channel.recv().await? {
            Message::FileResponse(response) => Ok(response),
            other => Err(Error::protocol(format!(
                "expected FileResponse, got {}",
                other.type_name()
            ))),
        }
    }

    async fn expect_file_ack(&mut self) -> Result<FileAck> {
        match self.channel.recv().await? {
            Message::FileAck(ack) => Ok(ack),
            other => Err(Error::protocol(format!(
                "expected FileAck, got {}",
                other.type_name()
            ))),
        }
    }
}

/// Join two wire-form path segments with a single `/`.
fn join_wire(base: &str, tail: &str) -> String {
    let base = base.trim_end_matches('/');
    let tail = tail.trim_start_matches('/');
    if base.is_empty() {
        format!("/{}", tail)
    } else {
        format!("{}/{}", base, tail)
    }
}

/// Relative path in wire form.
fn relative_wire(relative: &Path) -> String {
    path_policy::to_wire(&relative.display().to_string())
}

/// Directories that no transferred file lies beneath; these need explicit
/// markers on the server.
fn uncovered_directories(
    directories: &[PathBuf],
    files: &[file::FileEntry],
) -> Vec<PathBuf> {
    let mut covered: HashSet<PathBuf> = HashSet::new();
    for entry in files {
        let mut ancestor = entry.relative.parent();
        while let Some(dir) = ancestor {
            if dir.as_os_str().is_empty() {
                break;
            }
            covered.insert(dir.to_path_buf());
            ancestor = dir.parent();
        }
    }

    directories
        .iter()
        .filter(|dir| !covered.contains(*dir))
        .cloned()
        .collect()
}
