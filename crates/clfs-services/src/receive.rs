//! PUT data phase — pages in, object bytes out, one ack per page.

use std::time::Duration;

use tokio::io::{AsyncRead, AsyncWrite};

use clfs_core::framing::{read_page, write_status};
use clfs_core::{Outcome, Page, PagePayload, TransferAck};

use crate::store::ObjectWriter;

/// What the receiver accomplished before it stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReceiveReport {
    pub outcome: Outcome,
    /// Pages written and acknowledged.
    pub pages: u64,
    /// Bytes written to the object.
    pub bytes: u64,
}

/// Receive pages into `writer` until the client sends its last page or the
/// declared `length` has arrived.
///
/// Every accepted page is answered with `NEXT` or `END`. A short write to
/// the object aborts at once with `IoFault` and no ack for that page. The
/// final outcome is `Ok` when the object holds at least `length` bytes;
/// surplus bytes in a final page are accepted.
pub async fn receive_object<S>(
    stream: &mut S,
    writer: &mut ObjectWriter,
    length: u32,
    io_timeout: Duration,
) -> ReceiveReport
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let object_id = writer.id();
    let mut page = Page::empty();
    let mut report = ReceiveReport {
        outcome: Outcome::Protocol,
        pages: 0,
        bytes: 0,
    };

    loop {
        if let Err(e) = read_page(stream, &mut page, io_timeout).await {
            tracing::warn!(object_id, pages = report.pages, error = %e, "page read failed");
            return report;
        }

        let (bytes, last) = match page.payload() {
            Ok(PagePayload::More(b)) => (b, false),
            Ok(PagePayload::Last(b)) => (b, true),
            Err(e) => {
                tracing::warn!(object_id, pages = report.pages, error = %e, "malformed page");
                return report;
            }
        };

        match writer.write(bytes).await {
            Ok(n) if n == bytes.len() => {}
            Ok(n) => {
                tracing::error!(object_id, expected = bytes.len(), written = n, "short write to object");
                report.outcome = Outcome::IoFault;
                return report;
            }
            Err(e) => {
                tracing::error!(object_id, error = %e, "object write failed");
                report.outcome = Outcome::IoFault;
                return report;
            }
        }
        report.pages += 1;
        report.bytes += bytes.len() as u64;

        let ack = if last || report.bytes >= u64::from(length) {
            TransferAck::Done
        } else {
            TransferAck::More
        };
        tracing::trace!(object_id, page = report.pages, len = bytes.len(), ?ack, "page stored");

        if let Err(e) = write_status(stream, ack.into()).await {
            tracing::warn!(object_id, pages = report.pages, error = %e, "failed to acknowledge page");
            return report;
        }
        if ack == TransferAck::Done {
            break;
        }
    }

    report.outcome = match writer.size().await {
        Ok(size) if size >= u64::from(length) => Outcome::Ok,
        Ok(size) => {
            tracing::warn!(object_id, size, declared = length, "object shorter than declared");
            Outcome::Protocol
        }
        Err(e) => {
            tracing::error!(object_id, error = %e, "failed to stat object");
            Outcome::IoFault
        }
    };
    report
}
