//! clfs-core — wire format, status vocabulary, and configuration.
//! The server, client library and CLI all depend on this one.

pub mod config;
pub mod framing;
pub mod page;
pub mod status;
pub mod wire;

pub use page::{Page, PagePayload};
pub use status::{Outcome, Status, TransferAck};
pub use wire::{Operation, Request, WireError};
