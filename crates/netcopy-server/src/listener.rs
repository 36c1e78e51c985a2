//! TCP listener and session spawning.
//!
//! One tokio task per accepted connection. Workers share nothing mutable:
//! the config, path policy, and pre-shared key are immutable and reference
//! counted. `max_connections` bounds concurrent sessions with a semaphore.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Semaphore;
use tracing::{debug, info, warn};

use netcopy_core::channel::SecureChannel;
use netcopy_core::config::ServerConfig;
use netcopy_core::crypto::SecretKey;
use netcopy_core::error::{Error, Result};
use netcopy_core::path_policy::PathPolicy;

use crate::session::Session;

/// The accept loop and its shared state.
#[derive(Debug)]
pub struct Server {
    listener: TcpListener,
    config: Arc<ServerConfig>,
    policy: Arc<PathPolicy>,
    key: Arc<SecretKey>,
}

impl Server {
    /// Validate the configuration and bind the listening socket.
    pub async fn bind(config: ServerConfig) -> Result<Self> {
        if config.secret_key.is_empty() {
            return Err(Error::config(
                "no secret_key configured; generate one with netcopy-keygen",
            ));
        }
        let key = SecretKey::from_hex(&config.secret_key)?;

        if config.allowed_paths.is_empty() {
            warn!("no allowed paths configured; every file request will be denied");
        }
        let policy = PathPolicy::new(config.allowed_paths.clone());

        let addr = format!("{}:{}", config.listen_address, config.listen_port);
        let listener = TcpListener::bind(&addr)
            .await
            .map_err(|e| Error::transport(format!("failed to bind {}: {}", addr, e)))?;

        info!(
            addr = %listener.local_addr()?,
            max_connections = config.max_connections,
            "listening"
        );
        for root in policy.roots() {
            info!(root = %root.display(), "allowed path");
        }

        Ok(Self {
            listener,
            config: Arc::new(config),
            policy: Arc::new(policy),
            key: Arc::new(key),
        })
    }

    /// The actual bound address (useful with port 0).
    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Accept connections until the future is dropped or the listener fails.
    pub async fn serve(self) -> Result<()> {
        let permits = Arc::new(Semaphore::new(self.config.max_connections.max(1) as usize));

        loop {
            let (stream, peer) = match self.listener.accept().await {
                Ok(accepted) => accepted,
                Err(e) => {
                    warn!(error = %e, "accept failed");
                    continue;
                }
            };

            let permit = match Arc::clone(&permits).acquire_owned().await {
                Ok(permit) => permit,
                Err(_) => return Ok(()),
            };

            let config = Arc::clone(&self.config);
            let policy = Arc::clone(&self.policy);
            let key = Arc::clone(&self.key);

            tokio::spawn(async move {
                let _permit = permit;
                handle_connection(stream, peer, config, policy, key).await;
            });
        }
    }
}

async fn handle_connection(
    stream: TcpStream,
    peer: SocketAddr,
    config: Arc<ServerConfig>,
    policy: Arc<PathPolicy>,
    key: Arc<SecretKey>,
) {
    debug!(peer = %peer, "connection accepted");
    if let Err(e) = stream.set_nodelay(true) {
        debug!(peer = %peer, error = %e, "failed to set TCP_NODELAY");
    }

    let channel =
        SecureChannel::with_timeout(stream, Duration::from_secs(config.timeout_secs));
    let mut session = Session::new(channel, config, policy, peer.to_string());

    match session.run(&key).await {
        Ok(()) => info!(peer = %peer, "session closed"),
        Err(e) => warn!(peer = %peer, error = %e, "session terminated"),
    }
}
