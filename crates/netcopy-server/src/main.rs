//! netcopy server binary entry point.

use std::path::Path;

use anyhow::Context;
use clap::Parser;
use tracing::info;

use netcopy_server::daemon::{shutdown_signal, PidFile};
use netcopy_server::{Cli, Server};

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = cli.resolve_config().context("failed to load configuration")?;

    let verbosity = cli.verbosity(&config);
    // Without an explicit flag, daemons and console_output=false setups log
    // to the configured file.
    let log_file = cli.log_file.clone().or_else(|| {
        ((config.run_as_daemon || !config.console_output) && !config.log_file.is_empty())
            .then(|| config.log_file.clone().into())
    });
    netcopy_core::init_logging(verbosity, log_file.as_deref(), cli.log_format.into())
        .context("failed to initialize logging")?;

    info!(version = env!("CARGO_PKG_VERSION"), "netcopy-server starting");

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(config.thread_pool_size.max(1))
        .enable_all()
        .build()
        .context("failed to build runtime")?;

    runtime.block_on(async move {
        let _pid_file = if config.run_as_daemon {
            Some(PidFile::create(Path::new(&config.pid_file))?)
        } else {
            None
        };

        let server = Server::bind(config).await.context("failed to start server")?;

        tokio::select! {
            result = server.serve() => result.context("server failed"),
            _ = shutdown_signal() => {
                info!("shutdown signal received");
                Ok(())
            }
        }
    })
}
