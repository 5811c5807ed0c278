//! libclfs — async client for a clfs object server.
//!
//! Each call opens its own connection, issues one request and closes it,
//! matching the server's one-request-per-connection protocol. The
//! stream-level functions in [`proto`] run the same exchanges over any
//! duplex stream.

pub mod proto;

use std::time::Duration;

use bytes::Bytes;
use tokio::net::{TcpStream, ToSocketAddrs};

use clfs_core::framing::FrameError;
use clfs_core::wire::IO_TIMEOUT_SECS;
use clfs_core::{Outcome, Status, WireError};

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("failed to connect: {0}")]
    Connect(#[source] std::io::Error),

    #[error(transparent)]
    Frame(#[from] FrameError),

    #[error(transparent)]
    Wire(#[from] WireError),

    #[error("object of {0} bytes exceeds the 32-bit length field")]
    TooLarge(usize),

    #[error("server refused the request: {0}")]
    Rejected(Outcome),

    #[error("unexpected status from server: {0}")]
    UnexpectedStatus(Status),

    #[error("object length mismatch: expected {expected} bytes, received {received}")]
    LengthMismatch { expected: u64, received: u64 },
}

/// Connection settings for one server.
#[derive(Debug, Clone)]
pub struct Client<A> {
    addr: A,
    io_timeout: Duration,
}

impl<A> Client<A>
where
    A: ToSocketAddrs + Clone,
{
    pub fn new(addr: A) -> Self {
        Self {
            addr,
            io_timeout: Duration::from_secs(IO_TIMEOUT_SECS),
        }
    }

    pub fn with_timeout(mut self, io_timeout: Duration) -> Self {
        self.io_timeout = io_timeout;
        self
    }

    async fn connect(&self) -> Result<TcpStream, ClientError> {
        let stream = TcpStream::connect(self.addr.clone())
            .await
            .map_err(ClientError::Connect)?;
        stream.set_nodelay(true).map_err(ClientError::Connect)?;
        Ok(stream)
    }

    /// Store `data` under `object_id`.
    pub async fn put(&self, object_id: u32, data: &[u8]) -> Result<Outcome, ClientError> {
        let mut stream = self.connect().await?;
        proto::put(&mut stream, object_id, data, self.io_timeout).await
    }

    /// Fetch an object of known length and acknowledge it, which consumes it
    /// on the server.
    pub async fn get(&self, object_id: u32, expected_len: u32) -> Result<Bytes, ClientError> {
        let mut stream = self.connect().await?;
        proto::get(&mut stream, object_id, expected_len, true, self.io_timeout).await
    }

    /// Fetch an object but leave it on the server.
    pub async fn get_without_ack(
        &self,
        object_id: u32,
        expected_len: u32,
    ) -> Result<Bytes, ClientError> {
        let mut stream = self.connect().await?;
        proto::get(&mut stream, object_id, expected_len, false, self.io_timeout).await
    }

    /// Discard an object.
    pub async fn remove(&self, object_id: u32) -> Result<Outcome, ClientError> {
        let mut stream = self.connect().await?;
        proto::remove(&mut stream, object_id, self.io_timeout).await
    }
}
