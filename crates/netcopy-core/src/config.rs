//! INI-style configuration files for the server and client binaries.
//!
//! Format: `[section]` headers, `key = value` pairs, `#`/`;` comments,
//! optional single or double quotes around values. A key repeated within a
//! section appends with a comma, so list-valued keys can be written either
//! as one comma-separated line or as repeated lines.

use std::collections::BTreeMap;
use std::path::Path;

use crate::constants::{
    DEFAULT_BUFFER_SIZE, DEFAULT_MAX_FILE_SIZE, DEFAULT_PORT, DEFAULT_TIMEOUT_SECS,
};
use crate::error::{Error, Result};

/// Parsed INI data: section -> key -> raw value.
#[derive(Debug, Default)]
pub struct IniFile {
    sections: BTreeMap<String, BTreeMap<String, String>>,
}

impl IniFile {
    /// Load and parse a configuration file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::config(format!("failed to read {}: {}", path.display(), e))
        })?;
        Ok(Self::parse(&content))
    }

    /// Parse configuration text.
    pub fn parse(content: &str) -> Self {
        let mut sections: BTreeMap<String, BTreeMap<String, String>> = BTreeMap::new();
        let mut current = String::new();

        for raw_line in content.lines() {
            let line = raw_line.trim();
            if line.is_empty() || line.starts_with('#') || line.starts_with(';') {
                continue;
            }

            if line.starts_with('[') && line.ends_with(']') {
                current = line[1..line.len() - 1].trim().to_string();
                continue;
            }

            if let Some((key, value)) = line.split_once('=') {
                let key = key.trim().to_string();
                let mut value = value.trim().to_string();

                if value.len() >= 2
                    && ((value.starts_with('"') && value.ends_with('"'))
                        || (value.starts_with('\'') && value.ends_with('\'')))
                {
                    value = value[1..value.len() - 1].to_string();
                }

                let section = sections.entry(current.clone()).or_default();
                match section.get_mut(&key) {
                    Some(existing) if !existing.is_empty() => {
                        existing.push(',');
                        existing.push_str(&value);
                    }
                    _ => {
                        section.insert(key, value);
                    }
                }
            }
        }

        Self { sections }
    }

    pub fn get_str(&self, section: &str, key: &str) -> Option<&str> {
        self.sections
            .get(section)
            .and_then(|s| s.get(key))
            .map(String::as_str)
    }

    pub fn get_string(&self, section: &str, key: &str, default: &str) -> String {
        self.get_str(section, key).unwrap_or(default).to_string()
    }

    pub fn get_u16(&self, section: &str, key: &str, default: u16) -> u16 {
        self.get_str(section, key)
            .and_then(|v| v.parse().ok())
            .unwrap_or(default)
    }

    pub fn get_u32(&self, section: &str, key: &str, default: u32) -> u32 {
        self.get_str(section, key)
            .and_then(|v| v.parse().ok())
            .unwrap_or(default)
    }

    pub fn get_u64(&self, section: &str, key: &str, default: u64) -> u64 {
        self.get_str(section, key)
            .and_then(|v| v.parse().ok())
            .unwrap_or(default)
    }

    pub fn get_usize(&self, section: &str, key: &str, default: usize) -> usize {
        self.get_str(section, key)
            .and_then(|v| v.parse().ok())
            .unwrap_or(default)
    }

    pub fn get_bool(&self, section: &str, key: &str, default: bool) -> bool {
        match self.get_str(section, key) {
            Some(v) => matches!(
                v.to_ascii_lowercase().as_str(),
                "true" | "yes" | "1" | "on"
            ),
            None => default,
        }
    }

    /// Comma-separated list value; empty entries are dropped.
    pub fn get_list(&self, section: &str, key: &str) -> Option<Vec<String>> {
        self.get_str(section, key).map(|v| {
            v.split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from)
                .collect()
        })
    }
}

/// Server configuration (`server.conf`).
#[derive(Debug, Clone)]
pub struct ServerConfig {
    // [network]
    pub listen_address: String,
    pub listen_port: u16,
    pub max_connections: u32,
    /// Socket timeout in seconds. Zero disables the timeout.
    pub timeout_secs: u64,

    // [security]
    /// Hex-encoded pre-shared key (64 chars, optional 0x prefix).
    pub secret_key: String,
    pub require_auth: bool,
    pub max_file_size: u64,

    // [performance]
    pub buffer_size: usize,
    pub max_bandwidth_percent: u32,
    pub thread_pool_size: usize,

    // [logging]
    pub log_level: String,
    pub log_file: String,
    pub console_output: bool,

    // [daemon]
    pub run_as_daemon: bool,
    pub pid_file: String,

    // [paths]
    pub allowed_paths: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_address: "0.0.0.0".to_string(),
            listen_port: DEFAULT_PORT,
            max_connections: 10,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            secret_key: String::new(),
            require_auth: true,
            max_file_size: DEFAULT_MAX_FILE_SIZE,
            buffer_size: DEFAULT_BUFFER_SIZE,
            max_bandwidth_percent: 40,
            thread_pool_size: 4,
            log_level: "INFO".to_string(),
            log_file: "server.log".to_string(),
            console_output: true,
            run_as_daemon: false,
            pid_file: "/var/run/netcopy-server.pid".to_string(),
            allowed_paths: vec!["/var/lib/netcopy".to_string()],
        }
    }
}

impl ServerConfig {
    /// Load from an INI file, filling unset keys with defaults.
    pub fn load(path: &Path) -> Result<Self> {
        let ini = IniFile::load(path)?;
        let d = Self::default();

        Ok(Self {
            listen_address: ini.get_string("network", "listen_address", &d.listen_address),
            listen_port: ini.get_u16("network", "listen_port", d.listen_port),
            max_connections: ini.get_u32("network", "max_connections", d.max_connections),
            timeout_secs: ini.get_u64("network", "timeout", d.timeout_secs),
            secret_key: ini.get_string("security", "secret_key", &d.secret_key),
            require_auth: ini.get_bool("security", "require_auth", d.require_auth),
            max_file_size: ini.get_u64("security", "max_file_size", d.max_file_size),
            buffer_size: ini.get_usize("performance", "buffer_size", d.buffer_size),
            max_bandwidth_percent: ini.get_u32(
                "performance",
                "max_bandwidth_percent",
                d.max_bandwidth_percent,
            ),
            thread_pool_size: ini.get_usize("performance", "thread_pool_size", d.thread_pool_size),
            log_level: ini.get_string("logging", "log_level", &d.log_level),
            log_file: ini.get_string("logging", "log_file", &d.log_file),
            console_output: ini.get_bool("logging", "console_output", d.console_output),
            run_as_daemon: ini.get_bool("daemon", "run_as_daemon", d.run_as_daemon),
            pid_file: ini.get_string("daemon", "pid_file", &d.pid_file),
            allowed_paths: ini
                .get_list("paths", "allowed_paths")
                .unwrap_or(d.allowed_paths),
        })
    }
}

/// Client configuration (`client.conf`).
#[derive(Debug, Clone)]
pub struct ClientConfig {
    // [security]
    pub secret_key: String,

    // [performance]
    pub buffer_size: usize,
    pub max_bandwidth_percent: u32,
    pub retry_attempts: u32,
    pub retry_delay_secs: u64,

    // [logging]
    pub log_level: String,
    pub log_file: String,
    pub console_output: bool,

    // [connection]
    pub timeout_secs: u64,
    pub keep_alive: bool,

    // [transfer]
    pub create_empty_directories: bool,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            secret_key: String::new(),
            buffer_size: DEFAULT_BUFFER_SIZE,
            max_bandwidth_percent: 40,
            retry_attempts: 3,
            retry_delay_secs: 5,
            log_level: "INFO".to_string(),
            log_file: "client.log".to_string(),
            console_output: true,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            keep_alive: true,
            create_empty_directories: true,
        }
    }
}

impl ClientConfig {
    /// Load from an INI file, filling unset keys with defaults.
    pub fn load(path: &Path) -> Result<Self> {
        let ini = IniFile::load(path)?;
        let d = Self::default();

        Ok(Self {
            secret_key: ini.get_string("security", "secret_key", &d.secret_key),
            buffer_size: ini.get_usize("performance", "buffer_size", d.buffer_size),
            max_bandwidth_percent: ini.get_u32(
                "performance",
                "max_bandwidth_percent",
                d.max_bandwidth_percent,
            ),
            retry_attempts: ini.get_u32("performance", "retry_attempts", d.retry_attempts),
            retry_delay_secs: ini.get_u64("performance", "retry_delay", d.retry_delay_secs),
            log_level: ini.get_string("logging", "log_level", &d.log_level),
            log_file: ini.get_string("logging", "log_file", &d.log_file),
            console_output: ini.get_bool("logging", "console_output", d.console_output),
            timeout_secs: ini.get_u64("connection", "timeout", d.timeout_secs),
            keep_alive: ini.get_bool("connection", "keep_alive", d.keep_alive),
            create_empty_directories: ini.get_bool(
                "transfer",
                "create_empty_directories",
                d.create_empty_directories,
            ),
        })
    }
}
