//! netcopy client binary entry point.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tokio::net::TcpStream;
use tracing::{debug, info};

use netcopy_client::progress::ConsoleProgress;
use netcopy_client::{Cli, Destination, TransferEngine, TransferOptions};
use netcopy_core::channel::SecureChannel;
use netcopy_core::config::ClientConfig;
use netcopy_core::crypto::{kdf, SecretKey};
use netcopy_core::throttle::Throttle;
use netcopy_core::LogFormat;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = load_config(&cli).context("failed to load configuration")?;

    // -v flags drive console logging; otherwise the console stays quiet
    // (errors only) and the configured log file is honored when console
    // output is disabled.
    let (verbosity, log_file) = if cli.verbose > 0 {
        (cli.verbose.saturating_add(1), None)
    } else if !config.console_output && !config.log_file.is_empty() {
        (
            netcopy_core::logging::verbosity_from_level(&config.log_level),
            Some(PathBuf::from(&config.log_file)),
        )
    } else {
        (0, None)
    };
    netcopy_core::init_logging(verbosity, log_file.as_deref(), LogFormat::Text)
        .context("failed to initialize logging")?;

    let key = resolve_key(&config)?;
    let destination =
        Destination::parse(&cli.destination, cli.port).context("invalid destination")?;

    debug!(
        host = %destination.host,
        port = destination.port,
        path = %destination.path,
        "connecting"
    );

    let stream = connect_with_retry(&destination, &config).await?;
    stream.set_nodelay(true).ok();

    let mut channel =
        SecureChannel::with_timeout(stream, Duration::from_secs(config.timeout_secs));
    let response = channel
        .handshake_initiate(cli.security.into(), &key)
        .await
        .context("handshake failed")?;
    info!(
        server_version = %response.server_version,
        level = %response.accepted_security_level,
        "connected"
    );

    let options = TransferOptions {
        recursive: cli.recursive,
        resume: cli.resume,
        create_empty_directories: !cli.no_empty_dirs && config.create_empty_directories,
        buffer_size: config.buffer_size,
        throttle: Throttle::from_percent(config.max_bandwidth_percent),
    };

    let mut engine =
        TransferEngine::new(channel, options).with_progress(Arc::new(ConsoleProgress::new()));

    let stats = engine
        .transfer(&cli.source, &destination.path)
        .await
        .context("transfer failed")?;

    println!(
        "Transfer completed: {} file(s), {} sent",
        stats.files_transferred,
        netcopy_core::throttle::human_size(stats.bytes_sent)
    );
    Ok(())
}

/// Connect to the server, retrying per the configured attempt count and
/// delay.
async fn connect_with_retry(
    destination: &Destination,
    config: &ClientConfig,
) -> anyhow::Result<TcpStream> {
    let timeout = Duration::from_secs(config.timeout_secs);
    let mut attempt = 0u32;

    loop {
        let connect = TcpStream::connect((destination.host.as_str(), destination.port));
        let result = match tokio::time::timeout(timeout, connect).await {
            Ok(Ok(stream)) => return Ok(stream),
            Ok(Err(e)) => Err(anyhow::Error::from(e)),
            Err(_) => Err(anyhow::anyhow!("connection timed out")),
        };

        attempt += 1;
        if attempt > config.retry_attempts {
            return result.with_context(|| {
                format!(
                    "failed to connect to {}:{} after {} attempt(s)",
                    destination.host, destination.port, attempt
                )
            });
        }

        tracing::warn!(
            host = %destination.host,
            port = destination.port,
            attempt,
            "connection failed, retrying"
        );
        tokio::time::sleep(Duration::from_secs(config.retry_delay_secs)).await;
    }
}

/// Load the client config: explicit flag, `client.conf` beside the binary's
/// working directory, or defaults.
fn load_config(cli: &Cli) -> anyhow::Result<ClientConfig> {
    match &cli.config_file {
        Some(path) => Ok(ClientConfig::load(path)?),
        None => {
            let local = PathBuf::from("client.conf");
            if local.exists() {
                Ok(ClientConfig::load(&local)?)
            } else {
                Ok(ClientConfig::default())
            }
        }
    }
}

/// Key from config, or derived from an interactively prompted master
/// password when the config carries none.
fn resolve_key(config: &ClientConfig) -> anyhow::Result<SecretKey> {
    if !config.secret_key.is_empty() {
        return Ok(SecretKey::from_hex(&config.secret_key)?);
    }

    eprint!("Enter master password: ");
    let password = rpassword::read_password().context("failed to read password")?;
    if password.is_empty() {
        anyhow::bail!("password cannot be empty");
    }

    let derived = kdf::derive_key(&password);
    Ok(SecretKey::from_bytes(*derived))
}
