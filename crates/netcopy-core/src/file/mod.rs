//! Chunked file I/O and source-tree enumeration.

pub mod compress;

use std::io::SeekFrom;
use std::path::{Path, PathBuf};

use tokio::fs::{self, File, OpenOptions};
use tokio::io::{AsyncReadExt, AsyncSeekExt, AsyncWriteExt};

use crate::error::{Error, Result};

/// One regular file found under a transfer source.
#[derive(Debug, Clone)]
pub struct FileEntry {
    /// Absolute (or as-given) local path.
    pub path: PathBuf,
    /// Path relative to the scanned base.
    pub relative: PathBuf,
    pub size: u64,
}

/// Result of scanning a source directory.
#[derive(Debug, Default)]
pub struct ScanResult {
    /// Regular files in sorted relative-path order.
    pub files: Vec<FileEntry>,
    /// Every directory under the base, relative to it, sorted.
    pub directories: Vec<PathBuf>,
}

/// Recursively enumerate a source directory.
pub async fn scan_source(base: &Path) -> Result<ScanResult> {
    let mut result = ScanResult::default();
    let mut stack = vec![base.to_path_buf()];

    while let Some(dir) = stack.pop() {
        let mut entries = fs::read_dir(&dir).await.map_err(|e| {
            Error::file(format!("failed to read directory {}: {}", dir.display(), e))
        })?;

        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| Error::file(format!("failed to read directory entry: {}", e)))?
        {
            let path = entry.path();
            let metadata = entry.metadata().await.map_err(|e| {
                Error::file(format!("failed to stat {}: {}", path.display(), e))
            })?;

            let relative = path
                .strip_prefix(base)
                .map_err(|_| Error::file("failed to compute relative path"))?
                .to_path_buf();

            if metadata.is_dir() {
                result.directories.push(relative);
                stack.push(path);
            } else if metadata.is_file() {
                result.files.push(FileEntry {
                    path,
                    relative,
                    size: metadata.len(),
                });
            }
            // Symlinks and special files are skipped.
        }
    }

    result.files.sort_by(|a, b| a.relative.cmp(&b.relative));
    result.directories.sort();
    Ok(result)
}

/// Read up to `len` bytes at `offset`. Returns fewer bytes only at EOF.
pub async fn read_chunk(path: &Path, offset: u64, len: usize) -> Result<Vec<u8>> {
    let mut file = File::open(path)
        .await
        .map_err(|e| Error::file(format!("failed to open {}: {}", path.display(), e)))?;
    file.seek(SeekFrom::Start(offset))
        .await
        .map_err(|e| Error::file(format!("failed to seek in {}: {}", path.display(), e)))?;

    let mut buffer = vec![0u8; len];
    let mut filled = 0;
    while filled < len {
        let n = file
            .read(&mut buffer[filled..])
            .await
            .map_err(|e| Error::file(format!("failed to read {}: {}", path.display(), e)))?;
        if n == 0 {
            break;
        }
        filled += n;
    }
    buffer.truncate(filled);
    Ok(buffer)
}

/// Write a chunk at `offset`, creating parent directories as needed.
///
/// Offset 0 truncates (or creates) the destination; any other offset opens
/// the existing file and writes in place, extending it if necessary.
pub async fn write_chunk(path: &Path, offset: u64, data: &[u8]) -> Result<()> {
    ensure_parent_dir(path).await?;

    let mut file = if offset == 0 {
        OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)
            .await
            .map_err(|e| Error::file(format!("failed to create {}: {}", path.display(), e)))?
    } else {
        OpenOptions::new()
            .write(true)
            .create(true)
            .open(path)
            .await
            .map_err(|e| Error::file(format!("failed to open {}: {}", path.display(), e)))?
    };

    file.seek(SeekFrom::Start(offset))
        .await
        .map_err(|e| Error::file(format!("failed to seek in {}: {}", path.display(), e)))?;
    file.write_all(data)
        .await
        .map_err(|e| Error::file(format!("failed to write {}: {}", path.display(), e)))?;
    file.flush()
        .await
        .map_err(|e| Error::file(format!("failed to flush {}: {}", path.display(), e)))?;
    Ok(())
}

/// Current size of a partial destination file; 0 if it does not exist.
pub async fn partial_size(path: &Path) -> u64 {
    match fs::metadata(path).await {
        Ok(metadata) if metadata.is_file() => metadata.len(),
        _ => 0,
    }
}

/// Create the parent directory chain for a destination file.
pub async fn ensure_parent_dir(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).await.map_err(|e| {
                Error::file(format!(
                    "failed to create directory {}: {}",
                    parent.display(),
                    e
                ))
            })?;
        }
    }
    Ok(())
}
