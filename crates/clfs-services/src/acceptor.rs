//! Listening socket and accept loop.
//!
//! Each accepted connection gets its own task. Connections never share
//! anything beyond the object store and the lock table, and a failure in
//! one never reaches the listener or its siblings.

use std::net::SocketAddr;
use std::time::Duration;

use anyhow::{Context, Result};
use socket2::{Domain, Protocol, Socket, Type};
use tokio::net::TcpListener;
use tokio::sync::broadcast;

use crate::handler::ConnectionHandler;

/// Pause after a failed `accept()` so a persistent error such as EMFILE does
/// not spin the loop.
const ACCEPT_BACKOFF: Duration = Duration::from_millis(100);

/// Build a reusable, non-blocking TCP listener with an explicit backlog.
pub fn bind_listener(addr: SocketAddr, backlog: i32) -> Result<TcpListener> {
    let socket = Socket::new(Domain::for_address(addr), Type::STREAM, Some(Protocol::TCP))
        .context("socket()")?;
    socket.set_reuse_address(true).context("SO_REUSEADDR")?;
    socket.set_nonblocking(true).context("set_nonblocking")?;
    socket
        .bind(&addr.into())
        .with_context(|| format!("bind({addr})"))?;
    socket.listen(backlog).context("listen()")?;

    let listener: std::net::TcpListener = socket.into();
    TcpListener::from_std(listener).context("failed to convert to tokio TcpListener")
}

pub struct Acceptor {
    listener: TcpListener,
    handler: ConnectionHandler,
    shutdown: broadcast::Receiver<()>,
}

impl Acceptor {
    pub fn new(
        listener: TcpListener,
        handler: ConnectionHandler,
        shutdown: broadcast::Receiver<()>,
    ) -> Self {
        Self {
            listener,
            handler,
            shutdown,
        }
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        self.listener.local_addr().context("local_addr()")
    }

    /// Accept until shutdown. In-flight connections keep running.
    pub async fn run(mut self) -> Result<()> {
        tracing::info!(addr = %self.local_addr()?, "accepting connections");

        loop {
            tokio::select! {
                _ = self.shutdown.recv() => {
                    tracing::info!("acceptor shutting down");
                    return Ok(());
                }

                result = self.listener.accept() => {
                    let (stream, peer) = match result {
                        Ok(r) => r,
                        Err(e) => {
                            tracing::warn!(error = %e, "accept failed");
                            tokio::time::sleep(ACCEPT_BACKOFF).await;
                            continue;
                        }
                    };
                    tracing::debug!(%peer, "client connected");

                    let handler = self.handler.clone();
                    tokio::spawn(async move {
                        handler.handle(stream, peer.to_string()).await;
                    });
                }
            }
        }
    }
}
