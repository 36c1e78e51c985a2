//! Bandwidth pacing and transfer-rate measurement.
//!
//! Pacing sleeps between chunks; it has no protocol-visible effect. The
//! rate meter backs the client's progress display.

use std::time::{Duration, Instant};

/// Inter-chunk pacing derived from the configured bandwidth percentage.
#[derive(Debug, Clone, Copy)]
pub struct Throttle {
    delay: Option<Duration>,
}

impl Throttle {
    /// `max_bandwidth_percent` of 100 (or more, or zero) disables pacing.
    pub fn from_percent(max_bandwidth_percent: u32) -> Self {
        let delay = if max_bandwidth_percent == 0 || max_bandwidth_percent >= 100 {
            None
        } else {
            // Sleep long enough that active time is roughly the configured
            // share of wall time, assuming ~10ms of work per chunk.
            let ms = (100.0 / max_bandwidth_percent as f64 - 1.0) * 10.0;
            Some(Duration::from_millis(ms as u64))
        };
        Self { delay }
    }

    pub fn is_enabled(&self) -> bool {
        self.delay.is_some()
    }

    /// Sleep between chunks if pacing is enabled.
    pub async fn pace(&self) {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
    }
}

/// Simple byte-rate meter over the lifetime of a transfer.
#[derive(Debug)]
pub struct RateMeter {
    started: Instant,
    bytes: u64,
}

impl RateMeter {
    pub fn new() -> Self {
        Self {
            started: Instant::now(),
            bytes: 0,
        }
    }

    pub fn record(&mut self, bytes: u64) {
        self.bytes += bytes;
    }

    /// Bytes per second since the meter was created.
    pub fn rate_bps(&self) -> f64 {
        let elapsed = self.started.elapsed().as_secs_f64();
        if elapsed > 0.0 {
            self.bytes as f64 / elapsed
        } else {
            0.0
        }
    }

    /// Human-readable rate, e.g. "12.4 MB/s".
    pub fn rate_string(&self) -> String {
        format!("{}/s", human_size(self.rate_bps() as u64))
    }
}

impl Default for RateMeter {
    fn default() -> Self {
        Self::new()
    }
}

/// Format a byte count with binary-ish units ("1.5 MB", "312 B").
pub fn human_size(bytes: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];
    let mut size = bytes as f64;
    let mut unit = 0;
    while size >= 1024.0 && unit < UNITS.len() - 1 {
        size /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{} {}", bytes, UNITS[unit])
    } else {
        format!("{:.1} {}", size, UNITS[unit])
    }
}
