//! Transfer progress reporting.

use std::io::Write;
use std::sync::Mutex;

use netcopy_core::throttle::{human_size, RateMeter};

/// Progress events emitted by the transfer engine.
#[derive(Debug, Clone)]
pub enum ProgressEvent {
    /// A source directory scan finished.
    ScanCompleted { file_count: usize, total_bytes: u64 },
    /// A file transfer started.
    FileStarted { name: String, total_bytes: u64 },
    /// Bytes were acknowledged for the current file.
    FileProgress {
        name: String,
        bytes_transferred: u64,
        total_bytes: u64,
    },
    /// A file transfer finished.
    FileCompleted { name: String, bytes: u64 },
}

/// Callback for progress events.
pub trait ProgressCallback: Send + Sync {
    fn on_event(&self, event: ProgressEvent);
}

/// Discards all events.
pub struct NoProgress;

impl ProgressCallback for NoProgress {
    fn on_event(&self, _event: ProgressEvent) {}
}

/// Renders a single-line console progress display with the transfer rate.
pub struct ConsoleProgress {
    meter: Mutex<ProgressState>,
}

struct ProgressState {
    meter: RateMeter,
    last_reported: u64,
}

impl ConsoleProgress {
    pub fn new() -> Self {
        Self {
            meter: Mutex::new(ProgressState {
                meter: RateMeter::new(),
                last_reported: 0,
            }),
        }
    }
}

impl Default for ConsoleProgress {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressCallback for ConsoleProgress {
    fn on_event(&self, event: ProgressEvent) {
        match event {
            ProgressEvent::ScanCompleted {
                file_count,
                total_bytes,
            } => {
                println!("{} files, {}", file_count, human_size(total_bytes));
            }
            ProgressEvent::FileStarted { name, .. } => {
                let mut state = self.meter.lock().unwrap();
                state.last_reported = 0;
                print!("{}: 0.0%", name);
                let _ = std::io::stdout().flush();
            }
            ProgressEvent::FileProgress {
                name,
                bytes_transferred,
                total_bytes,
            } => {
                let mut state = self.meter.lock().unwrap();
                let new_bytes = bytes_transferred.saturating_sub(state.last_reported);
                state.last_reported = bytes_transferred;
                state.meter.record(new_bytes);

                let percent = if total_bytes > 0 {
                    bytes_transferred as f64 / total_bytes as f64 * 100.0
                } else {
                    100.0
                };
                print!(
                    "\r{}: {:.1}% ({}/{}) at {}",
                    name,
                    percent,
                    human_size(bytes_transferred),
                    human_size(total_bytes),
                    state.meter.rate_string()
                );
                let _ = std::io::stdout().flush();
            }
            ProgressEvent::FileCompleted { name, bytes } => {
                println!("\r{}: done ({})", name, human_size(bytes));
            }
        }
    }
}
