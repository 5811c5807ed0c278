//! Per-connection request handling.
//!
//! One connection carries exactly one request:
//!
//! ```text
//! header ─┬─ PUT ─ OK ─ pages/acks ─ outcome ─┐
//!         ├─ GET ─ OK ─ pages ─ client status ┼─ close
//!         ├─ RM ── OK | INVAL ────────────────┘
//!         └─ bad header ─ ERROR ──────────────┘
//! ```
//!
//! A GET deletes the object only when the client's closing status is `OK`.

use std::time::Duration;

use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tracing::Instrument;

use clfs_core::framing::{read_request, read_status, write_status};
use clfs_core::{Operation, Outcome, Request, Status};

use crate::locks::ObjectLocks;
use crate::receive::receive_object;
use crate::send::send_object;
use crate::store::{ObjectStore, StoreError};

#[derive(Clone)]
pub struct ConnectionHandler {
    store: ObjectStore,
    locks: ObjectLocks,
    io_timeout: Duration,
}

impl ConnectionHandler {
    pub fn new(store: ObjectStore, locks: ObjectLocks, io_timeout: Duration) -> Self {
        Self {
            store,
            locks,
            io_timeout,
        }
    }

    pub fn store(&self) -> &ObjectStore {
        &self.store
    }

    /// Serve one request on `stream`, then close it.
    pub async fn handle<S>(&self, mut stream: S, peer: String)
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        let span = tracing::info_span!("conn", %peer);
        async {
            self.serve(&mut stream).await;
            let _ = stream.shutdown().await;
        }
        .instrument(span)
        .await
    }

    async fn serve<S>(&self, stream: &mut S)
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        let request = match read_request(stream, self.io_timeout).await {
            Ok(r) => r,
            Err(e) => {
                tracing::warn!(error = %e, "rejecting request header");
                reply(stream, Status::Error).await;
                return;
            }
        };

        let Request {
            operation,
            object_id,
            length,
        } = request;
        tracing::info!(op = %operation, object_id, length, "request received");

        let _guard = self.locks.lock(object_id).await;
        match operation {
            Operation::Put => self.put(stream, object_id, length).await,
            Operation::Get => self.get(stream, object_id).await,
            Operation::Rm => self.rm(stream, object_id).await,
        }
    }

    async fn put<S>(&self, stream: &mut S, object_id: u32, length: u32)
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        let mut writer = match self.store.create(object_id).await {
            Ok(w) => w,
            Err(e) => {
                tracing::error!(object_id, error = %e, "cannot create object");
                reply(stream, Outcome::IoFault.into()).await;
                return;
            }
        };

        // Nothing follows a zero-length header; the ack is the whole exchange.
        if length == 0 {
            let outcome = match writer.commit().await {
                Ok(()) => Outcome::Ok,
                Err(e) => {
                    tracing::error!(object_id, error = %e, "cannot commit empty object");
                    Outcome::IoFault
                }
            };
            reply(stream, outcome.into()).await;
            return;
        }

        if !reply(stream, Status::Ok).await {
            writer.discard().await;
            return;
        }

        let report = receive_object(stream, &mut writer, length, self.io_timeout).await;
        let outcome = if report.outcome.is_ok() {
            match writer.commit().await {
                Ok(()) => Outcome::Ok,
                Err(e) => {
                    tracing::error!(object_id, error = %e, "cannot commit object");
                    Outcome::IoFault
                }
            }
        } else {
            writer.discard().await;
            report.outcome
        };

        tracing::info!(
            object_id,
            pages = report.pages,
            bytes = report.bytes,
            status = %outcome,
            "PUT finished"
        );
        reply(stream, outcome.into()).await;
    }

    async fn get<S>(&self, stream: &mut S, object_id: u32)
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        let mut reader = match self.store.open(object_id).await {
            Ok(r) => r,
            Err(StoreError::NotFound(_)) => {
                tracing::info!(object_id, "GET for missing object");
                reply(stream, Outcome::NotFound.into()).await;
                return;
            }
            Err(e) => {
                tracing::error!(object_id, error = %e, "cannot open object");
                reply(stream, Outcome::NotFound.into()).await;
                return;
            }
        };

        if !reply(stream, Status::Ok).await {
            return;
        }

        let report = match send_object(stream, &mut reader).await {
            Ok(r) => r,
            Err(e) => {
                tracing::warn!(object_id, error = %e, status = %e.outcome(), "GET aborted");
                return;
            }
        };
        drop(reader);

        let ack = match read_status(stream, self.io_timeout).await {
            Ok(status) => Outcome::from_status(status),
            Err(e) => {
                tracing::warn!(object_id, error = %e, "no closing status from client");
                None
            }
        };

        if ack != Some(Outcome::Ok) {
            tracing::info!(
                object_id,
                pages = report.pages,
                bytes = report.bytes,
                ?ack,
                "GET not acknowledged, object retained"
            );
            return;
        }

        match self.store.remove(object_id).await {
            Ok(()) => tracing::info!(
                object_id,
                pages = report.pages,
                bytes = report.bytes,
                "GET acknowledged, object consumed"
            ),
            Err(e) => tracing::error!(object_id, error = %e, "failed to consume object"),
        }
    }

    async fn rm<S>(&self, stream: &mut S, object_id: u32)
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        let outcome = match self.store.remove(object_id).await {
            Ok(()) => Outcome::Ok,
            Err(StoreError::NotFound(_)) => Outcome::NotFound,
            Err(e) => {
                tracing::error!(object_id, error = %e, "cannot remove object");
                Outcome::IoFault
            }
        };
        tracing::info!(object_id, status = %outcome, "RM finished");
        reply(stream, outcome.into()).await;
    }
}

/// Send a status word. Returns false if the peer is gone.
async fn reply<S>(stream: &mut S, status: Status) -> bool
where
    S: AsyncWrite + Unpin,
{
    match write_status(stream, status).await {
        Ok(()) => true,
        Err(e) => {
            tracing::debug!(%status, error = %e, "failed to send status");
            false
        }
    }
}
