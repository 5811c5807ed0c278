//! Async framing helpers shared by the server and the client.
//!
//! Every read is bounded by an idle timeout; a peer that stops sending
//! mid-frame surfaces as [`FrameError::TimedOut`] instead of pinning a task
//! forever. A peer that closes mid-frame surfaces as [`FrameError::Closed`].

use std::io::ErrorKind;
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use zerocopy::AsBytes;

use crate::page::Page;
use crate::status::Status;
use crate::wire::{Request, WireError, REQUEST_SIZE, STATUS_SIZE};

#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    #[error("peer closed the connection mid-frame")]
    Closed,

    #[error("no data from peer for {}s", .0.as_secs())]
    TimedOut(Duration),

    #[error("stream I/O failed: {0}")]
    Io(#[source] std::io::Error),

    #[error(transparent)]
    Wire(#[from] WireError),
}

async fn read_exact_timeout<R>(
    reader: &mut R,
    buf: &mut [u8],
    timeout: Duration,
) -> Result<(), FrameError>
where
    R: AsyncRead + Unpin,
{
    match tokio::time::timeout(timeout, reader.read_exact(buf)).await {
        Ok(Ok(_)) => Ok(()),
        Ok(Err(e)) if e.kind() == ErrorKind::UnexpectedEof => Err(FrameError::Closed),
        Ok(Err(e)) => Err(FrameError::Io(e)),
        Err(_) => Err(FrameError::TimedOut(timeout)),
    }
}

/// Read and validate one request header.
pub async fn read_request<R>(reader: &mut R, timeout: Duration) -> Result<Request, FrameError>
where
    R: AsyncRead + Unpin,
{
    let mut buf = [0u8; REQUEST_SIZE];
    read_exact_timeout(reader, &mut buf, timeout).await?;
    Ok(Request::decode(&buf)?)
}

pub async fn write_request<W>(writer: &mut W, request: &Request) -> Result<(), FrameError>
where
    W: AsyncWrite + Unpin,
{
    writer
        .write_all(&request.encode())
        .await
        .map_err(FrameError::Io)
}

pub async fn read_status<R>(reader: &mut R, timeout: Duration) -> Result<Status, FrameError>
where
    R: AsyncRead + Unpin,
{
    let mut buf = [0u8; STATUS_SIZE];
    read_exact_timeout(reader, &mut buf, timeout).await?;
    Ok(Status::decode(buf)?)
}

pub async fn write_status<W>(writer: &mut W, status: Status) -> Result<(), FrameError>
where
    W: AsyncWrite + Unpin,
{
    writer
        .write_all(&status.encode())
        .await
        .map_err(FrameError::Io)
}

/// Fill `page` with the next full frame from the stream.
pub async fn read_page<R>(reader: &mut R, page: &mut Page, timeout: Duration) -> Result<(), FrameError>
where
    R: AsyncRead + Unpin,
{
    read_exact_timeout(reader, page.as_bytes_mut(), timeout).await
}

pub async fn write_page<W>(writer: &mut W, page: &Page) -> Result<(), FrameError>
where
    W: AsyncWrite + Unpin,
{
    writer.write_all(page.as_bytes()).await.map_err(FrameError::Io)
}
