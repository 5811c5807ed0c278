//! GET data phase — object bytes out as pages, no per-page ack.
//!
//! The client acknowledges once, after the last page; reading that
//! acknowledgment is the connection handler's job.

use tokio::io::AsyncWrite;

use clfs_core::framing::{write_page, FrameError};
use clfs_core::wire::{WireError, PAGE_SIZE};
use clfs_core::{Outcome, Page};

use crate::store::{ObjectReader, StoreError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SendReport {
    pub pages: u64,
    pub bytes: u64,
}

#[derive(Debug, thiserror::Error)]
pub enum SendError {
    #[error("reading object failed: {0}")]
    Store(#[from] StoreError),

    #[error("sending page failed: {0}")]
    Frame(#[from] FrameError),

    #[error(transparent)]
    Wire(#[from] WireError),
}

impl SendError {
    pub fn outcome(&self) -> Outcome {
        match self {
            SendError::Store(_) => Outcome::IoFault,
            SendError::Frame(_) | SendError::Wire(_) => Outcome::Protocol,
        }
    }
}

/// Stream the whole object as pages.
///
/// A read that fills the page is sent as a full page and the loop continues.
/// A shorter read, including an empty one at end of object, is sent as the
/// final page carrying exactly that many bytes.
pub async fn send_object<S>(stream: &mut S, reader: &mut ObjectReader) -> Result<SendReport, SendError>
where
    S: AsyncWrite + Unpin,
{
    let object_id = reader.id();
    let mut page = Page::empty();
    let mut report = SendReport { pages: 0, bytes: 0 };

    loop {
        let n = reader.read(page.data_mut()).await?;
        let last = n < PAGE_SIZE;
        if last {
            page.set_last(n)?;
        } else {
            page.set_continuation();
        }

        write_page(stream, &page).await?;
        report.pages += 1;
        report.bytes += n as u64;
        tracing::trace!(object_id, page = report.pages, len = n, last, "page sent");

        if last {
            return Ok(report);
        }
    }
}
