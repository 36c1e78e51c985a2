//! Client CLI implementation.
//!
//! The destination argument accepts three shapes:
//!
//! - `host`                  - default port and path
//! - `host:path`             - default port (`host:/remote/dir`, `host:C:\dir`)
//! - `host:port/path`        - explicit port
//!
//! Windows drive-letter paths after the colon are tolerated, so
//! `127.0.0.1:D:\Work\` parses as host `127.0.0.1`, path `D:\Work\`.

use std::path::PathBuf;

use clap::{ArgAction, Parser, ValueEnum};

use netcopy_core::constants::DEFAULT_PORT;
use netcopy_core::crypto::SecurityLevel;
use netcopy_core::error::{Error, Result};
use netcopy_core::path_policy;

/// Security level argument for the CLI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum SecurityArg {
    /// ChaCha20-Poly1305 (authenticated)
    #[default]
    High,
    /// Rolling XOR keystream (benchmark only, unauthenticated)
    Fast,
    /// AES-256-CTR (unauthenticated)
    Aes,
    /// AES-256-GCM (authenticated)
    #[value(name = "aes-256-gcm")]
    Aes256Gcm,
}

impl From<SecurityArg> for SecurityLevel {
    fn from(arg: SecurityArg) -> Self {
        match arg {
            SecurityArg::High => SecurityLevel::High,
            SecurityArg::Fast => SecurityLevel::Fast,
            SecurityArg::Aes => SecurityLevel::Aes,
            SecurityArg::Aes256Gcm => SecurityLevel::Aes256Gcm,
        }
    }
}

/// netcopy - secure file transfer client.
#[derive(Debug, Parser)]
#[command(
    name = "netcopy",
    version,
    about = "netcopy - secure file transfer client",
    after_help = "Destination formats:\n  \
        server:port/path    e.g. 192.168.1.100:1245/srv/data/\n  \
        server:/path        e.g. 192.168.1.100:/srv/data/ (default port)\n  \
        server:D:\\path      e.g. 192.168.1.100:D:\\Work\\ (Windows path)\n  \
        server              e.g. 192.168.1.100 (default port and path)"
)]
pub struct Cli {
    /// Local file or directory to send
    pub source: PathBuf,

    /// Destination: host, host:path, or host:port/path
    pub destination: String,

    /// Use the specified configuration file
    #[arg(short = 'c', long = "config", value_name = "FILE")]
    pub config_file: Option<PathBuf>,

    /// Server port (overrides the port in the destination)
    #[arg(short = 'p', long = "port", value_name = "PORT")]
    pub port: Option<u16>,

    /// Transfer directories recursively
    #[arg(short = 'R', long = "recursive")]
    pub recursive: bool,

    /// Resume an interrupted transfer
    #[arg(long = "resume")]
    pub resume: bool,

    /// Don't create empty directories on the server
    #[arg(long = "no-empty-dirs")]
    pub no_empty_dirs: bool,

    /// Security level for the session
    #[arg(short = 's', long = "security", default_value = "high")]
    pub security: SecurityArg,

    /// Increase verbosity (can be repeated: -v, -vv)
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count)]
    pub verbose: u8,
}

/// Parsed destination argument.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Destination {
    pub host: String,
    pub port: u16,
    /// Remote path in wire form (`/` separators).
    pub path: String,
}

impl Destination {
    /// Parse a destination string. `port_override` (from `-p`) wins over a
    /// port embedded in the destination.
    pub fn parse(destination: &str, port_override: Option<u16>) -> Result<Self> {
        let (host, after_colon) = match destination.split_once(':') {
            None => (destination, None),
            Some((host, rest)) => (host, Some(rest)),
        };

        if host.is_empty() {
            return Err(Error::invalid_argument("missing server address"));
        }

        let mut port = port_override;
        let mut path = String::from("/");

        if let Some(rest) = after_colon {
            if rest.is_empty() {
                // "host:" - defaults for both.
            } else if rest.starts_with('/')
                || rest.starts_with('\\')
                || rest.as_bytes().get(1) == Some(&b':')
            {
                // "host:/path", "host:\path", "host:C:\path"
                path = rest.to_string();
            } else {
                // Either "host:port[/path]" or "host:path".
                let slash = rest.find(['/', '\\']);
                let head = match slash {
                    Some(idx) => &rest[..idx],
                    None => rest,
                };

                if head.contains(':') {
                    return Err(Error::invalid_argument(
                        "invalid destination format: multiple colons; \
                         use server:port/path or server:path",
                    ));
                }

                match head.parse::<u16>() {
                    Ok(parsed) if parsed > 0 => {
                        if port.is_none() {
                            port = Some(parsed);
                        }
                        if let Some(idx) = slash {
                            path = rest[idx..].to_string();
                        }
                    }
                    _ => path = rest.to_string(),
                }
            }
        }

        // Normalize the path to wire form; relative paths get a leading
        // slash so the server-side absoluteness check reads them uniformly.
        if path != "/" {
            path = path_policy::to_wire(&path);
            if !path_policy::is_absolute_path(&path) {
                path.insert(0, '/');
            }
        }

        Ok(Self {
            host: host.to_string(),
            port: port.unwrap_or(DEFAULT_PORT),
            path,
        })
    }
}
