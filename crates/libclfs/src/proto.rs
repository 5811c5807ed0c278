//! Client side of each exchange, over any duplex stream.

use std::time::Duration;

use bytes::{Bytes, BytesMut};
use tokio::io::{AsyncRead, AsyncWrite};

use clfs_core::framing::{
    read_page, read_status, write_page, write_request, write_status, FrameError,
};
use clfs_core::wire::PAGE_SIZE;
use clfs_core::{Outcome, Page, PagePayload, Request, Status, TransferAck};

use crate::ClientError;

/// How long the sender must stay silent after an all-zero page before that
/// page is taken as the empty terminator.
const TERMINATOR_GRACE: Duration = Duration::from_millis(250);

fn is_blank(bytes: &[u8]) -> bool {
    bytes.iter().all(|&b| b == 0)
}

/// Read a status that must be a terminal result.
async fn read_outcome<S>(stream: &mut S, timeout: Duration) -> Result<Outcome, ClientError>
where
    S: AsyncRead + Unpin,
{
    let status = read_status(stream, timeout).await?;
    Outcome::from_status(status).ok_or(ClientError::UnexpectedStatus(status))
}

/// PUT: header, then one page per 4 KiB with an ack after each, then the
/// server's verdict. The last page always carries a non-zero final length,
/// including when `data` is an exact multiple of the page size.
pub async fn put<S>(
    stream: &mut S,
    object_id: u32,
    data: &[u8],
    timeout: Duration,
) -> Result<Outcome, ClientError>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let length = u32::try_from(data.len()).map_err(|_| ClientError::TooLarge(data.len()))?;
    write_request(stream, &Request::put(object_id, length)).await?;

    let accepted = read_outcome(stream, timeout).await?;
    if !accepted.is_ok() || data.is_empty() {
        return Ok(accepted);
    }

    let count = data.chunks(PAGE_SIZE).count();
    for (i, chunk) in data.chunks(PAGE_SIZE).enumerate() {
        let last = i + 1 == count;
        let page = match <&[u8; PAGE_SIZE]>::try_from(chunk) {
            Ok(full) if !last => Page::continuation(full),
            _ => Page::last(chunk)?,
        };
        write_page(stream, &page).await?;

        let status = read_status(stream, timeout).await?;
        match TransferAck::from_status(status) {
            Some(TransferAck::More) if !last => {}
            Some(TransferAck::Done) => break,
            Some(TransferAck::More) => return Err(ClientError::UnexpectedStatus(status)),
            // The server aborted mid-transfer with a terminal result.
            None => return Outcome::from_status(status).ok_or(ClientError::UnexpectedStatus(status)),
        }
    }

    read_outcome(stream, timeout).await
}

/// GET: header, then pages until the last one, then optionally `OK` to let
/// the server consume the object.
///
/// `expected_len` disambiguates the empty terminal page the server sends
/// after an exact multiple of the page size. That page has a zero final
/// length and an all-zero payload. One arriving exactly at `expected_len`
/// ends the read. One arriving earlier is held until either another page
/// follows (it was data) or the sender goes quiet (it was the terminator).
///
/// Any other received length, short or long, is answered with `ERROR` so the
/// object stays on the server. Reading stops as soon as the object is known
/// to be longer than `expected_len`.
pub async fn get<S>(
    stream: &mut S,
    object_id: u32,
    expected_len: u32,
    acknowledge: bool,
    timeout: Duration,
) -> Result<Bytes, ClientError>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    write_request(stream, &Request::get(object_id)).await?;

    let accepted = read_outcome(stream, timeout).await?;
    if !accepted.is_ok() {
        return Err(ClientError::Rejected(accepted));
    }

    let expected = expected_len as usize;
    let mut data = BytesMut::with_capacity(expected);
    let mut page = Page::empty();
    let mut held_blank = false;
    loop {
        let wait = if held_blank { timeout.min(TERMINATOR_GRACE) } else { timeout };
        match read_page(stream, &mut page, wait).await {
            Ok(()) => {}
            Err(FrameError::TimedOut(_)) if held_blank => break,
            Err(e) => return Err(e.into()),
        }
        if held_blank {
            data.extend_from_slice(&[0u8; PAGE_SIZE]);
            held_blank = false;
        }

        match page.payload()? {
            // Exactly at the expected end, or a blank page that could not
            // fit anyway: either way the length check below decides.
            PagePayload::More(bytes) if is_blank(bytes) && data.len() + PAGE_SIZE > expected => {
                break
            }
            PagePayload::More(bytes) if is_blank(bytes) => held_blank = true,
            PagePayload::More(bytes) => data.extend_from_slice(bytes),
            PagePayload::Last(bytes) => {
                data.extend_from_slice(bytes);
                break;
            }
        }

        if data.len() > expected {
            break;
        }
    }

    if data.len() != expected {
        let _ = write_status(stream, Status::Error).await;
        return Err(ClientError::LengthMismatch {
            expected: expected as u64,
            received: data.len() as u64,
        });
    }

    let closing = if acknowledge { Status::Ok } else { Status::Error };
    write_status(stream, closing).await?;
    tracing::debug!(object_id, bytes = data.len(), acknowledged = acknowledge, "object fetched");
    Ok(data.freeze())
}

/// RM: header, then a single result.
pub async fn remove<S>(stream: &mut S, object_id: u32, timeout: Duration) -> Result<Outcome, ClientError>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    write_request(stream, &Request::rm(object_id)).await?;
    read_outcome(stream, timeout).await
}
