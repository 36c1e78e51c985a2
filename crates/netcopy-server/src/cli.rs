//! Server CLI implementation.

use std::path::PathBuf;

use clap::{ArgAction, Parser, ValueEnum};

use netcopy_core::config::ServerConfig;
use netcopy_core::error::Result;
use netcopy_core::LogFormat;

/// Log output format for CLI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum CliLogFormat {
    /// Human-readable text output.
    #[default]
    Text,
    /// Structured JSON output.
    Json,
}

impl From<CliLogFormat> for LogFormat {
    fn from(fmt: CliLogFormat) -> Self {
        match fmt {
            CliLogFormat::Text => LogFormat::Text,
            CliLogFormat::Json => LogFormat::Json,
        }
    }
}

/// netcopy server - receives files over the encrypted transfer protocol.
#[derive(Debug, Parser)]
#[command(
    name = "netcopy-server",
    version,
    about = "netcopy server - receives files over the encrypted transfer protocol"
)]
pub struct Cli {
    /// Address to listen on
    #[arg(short = 'b', long = "bind", value_name = "ADDR")]
    pub bind_addr: Option<String>,

    /// Port to listen on
    #[arg(short = 'p', long = "port", value_name = "PORT")]
    pub port: Option<u16>,

    /// Allow writes under this directory (repeatable; overrides the config list)
    #[arg(short = 'a', long = "allow", action = ArgAction::Append, value_name = "DIR")]
    pub allowed_paths: Vec<String>,

    /// Use the specified configuration file
    #[arg(short = 'c', long = "config", value_name = "FILE")]
    pub config_file: Option<PathBuf>,

    /// Run as a background service (writes the pid file)
    #[arg(short = 'd', long = "daemon")]
    pub daemon: bool,

    /// PID file location
    #[arg(long = "pid-file", value_name = "PATH")]
    pub pid_file: Option<PathBuf>,

    /// Increase verbosity (can be repeated: -v, -vv, -vvv)
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count)]
    pub verbose: u8,

    /// Log to file instead of stderr
    #[arg(long = "log-file", value_name = "PATH")]
    pub log_file: Option<PathBuf>,

    /// Log output format
    #[arg(long = "log-format", default_value = "text")]
    pub log_format: CliLogFormat,
}

impl Cli {
    /// Load the config file (when present) and apply command-line overrides.
    pub fn resolve_config(&self) -> Result<ServerConfig> {
        let mut config = match &self.config_file {
            Some(path) => ServerConfig::load(path)?,
            None => {
                let default_path = PathBuf::from("server.conf");
                if default_path.exists() {
                    ServerConfig::load(&default_path)?
                } else {
                    ServerConfig::default()
                }
            }
        };

        if let Some(addr) = &self.bind_addr {
            config.listen_address = addr.clone();
        }
        if let Some(port) = self.port {
            config.listen_port = port;
        }
        if !self.allowed_paths.is_empty() {
            config.allowed_paths = self.allowed_paths.clone();
        }
        if self.daemon {
            config.run_as_daemon = true;
        }
        if let Some(pid_file) = &self.pid_file {
            config.pid_file = pid_file.display().to_string();
        }

        Ok(config)
    }

    /// Effective logging verbosity: explicit -v flags win over the config
    /// level string.
    pub fn verbosity(&self, config: &ServerConfig) -> u8 {
        if self.verbose > 0 {
            self.verbose.saturating_add(1)
        } else {
            netcopy_core::logging::verbosity_from_level(&config.log_level)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn verify_cli() {
        Cli::command().debug_assert();
    }

    #[test]
    fn default_values() {
        let cli = Cli::try_parse_from(["netcopy-server"]).unwrap();
        assert!(cli.bind_addr.is_none());
        assert!(cli.port.is_none());
        assert!(cli.allowed_paths.is_empty());
        assert!(!cli.daemon);
        assert_eq!(cli.verbose, 0);
        assert_eq!(cli.log_format, CliLogFormat::Text);
    }

    #[test]
    fn parse_bind_and_port() {
        let cli =
            Cli::try_parse_from(["netcopy-server", "-b", "127.0.0.1", "-p", "2245"]).unwrap();
        assert_eq!(cli.bind_addr.as_deref(), Some("127.0.0.1"));
        assert_eq!(cli.port, Some(2245));
    }

    #[test]
    fn parse_repeated_allow() {
        let cli = Cli::try_parse_from([
            "netcopy-server",
            "--allow",
            "/srv/data",
            "--allow",
            "/var/backups",
        ])
        .unwrap();
        assert_eq!(cli.allowed_paths, vec!["/srv/data", "/var/backups"]);
    }

    #[test]
    fn parse_verbosity_count() {
        let cli = Cli::try_parse_from(["netcopy-server", "-vvv"]).unwrap();
        assert_eq!(cli.verbose, 3);
    }

    #[test]
    fn parse_log_format() {
        let cli = Cli::try_parse_from(["netcopy-server", "--log-format", "json"]).unwrap();
        assert_eq!(cli.log_format, CliLogFormat::Json);
    }

    #[test]
    fn cli_overrides_win_over_defaults() {
        let cli = Cli::try_parse_from([
            "netcopy-server",
            "-b",
            "10.0.0.1",
            "-p",
            "9999",
            "--allow",
            "/srv/x",
            "--daemon",
        ])
        .unwrap();

        let config = cli.resolve_config().unwrap();
        assert_eq!(config.listen_address, "10.0.0.1");
        assert_eq!(config.listen_port, 9999);
        assert_eq!(config.allowed_paths, vec!["/srv/x"]);
        assert!(config.run_as_daemon);
    }

    #[test]
    fn verbosity_prefers_flags_over_config() {
        let cli = Cli::try_parse_from(["netcopy-server", "-vv"]).unwrap();
        let config = ServerConfig::default();
        assert_eq!(cli.verbosity(&config), 3);

        let quiet = Cli::try_parse_from(["netcopy-server"]).unwrap();
        assert_eq!(quiet.verbosity(&config), 2); // config default is INFO
    }
}
