//! clfs wire format — the fixed request header and shared protocol constants.
//!
//! Every connection begins with exactly one 12-byte request header sent by
//! the client. The layout below IS the protocol; changing a field width or
//! its order breaks every deployed cache client.
//!
//! ```text
//! +----------------+----------------+----------------+
//! | operation (u32)| object_id (u32)|  length (u32)  |
//! +----------------+----------------+----------------+
//!        4 bytes          4 bytes          4 bytes
//! ```
//!
//! All integers are little-endian. The first deployed server wrote host
//! order; little-endian keeps those clients working on the hosts they run on
//! while making the format independent of the server's own architecture.

use static_assertions::assert_eq_size;
use zerocopy::byteorder::{LittleEndian, U32};
use zerocopy::{AsBytes, FromBytes, FromZeroes};

// ── Constants ─────────────────────────────────────────────────────────────────

/// Size of the request header on the wire.
pub const REQUEST_SIZE: usize = 12;

/// Capacity of one data page.
pub const PAGE_SIZE: usize = 4096;

/// Size of one page on the wire: data plus the 4-byte final-length marker.
pub const PAGE_FRAME_SIZE: usize = PAGE_SIZE + 4;

/// Size of a status word on the wire.
pub const STATUS_SIZE: usize = 4;

/// Default TCP port the daemon listens on.
pub const DEFAULT_PORT: u16 = 8888;

/// Default idle timeout for header, page and status reads, in seconds.
pub const IO_TIMEOUT_SECS: u64 = 30;

// ── Operation ─────────────────────────────────────────────────────────────────

/// The three request kinds a client may issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum Operation {
    /// Store a blob, replacing any previous object with the same id.
    Put = 0,
    /// Fetch a blob; deleted once the client acknowledges it.
    Get = 1,
    /// Discard a blob.
    Rm = 2,
}

impl Operation {
    pub fn name(self) -> &'static str {
        match self {
            Operation::Put => "PUT",
            Operation::Get => "GET",
            Operation::Rm => "RM",
        }
    }
}

impl TryFrom<u32> for Operation {
    type Error = WireError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Operation::Put),
            1 => Ok(Operation::Get),
            2 => Ok(Operation::Rm),
            other => Err(WireError::UnknownOperation(other)),
        }
    }
}

impl From<Operation> for u32 {
    fn from(op: Operation) -> u32 {
        op as u32
    }
}

impl std::fmt::Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

// ── Request Header ────────────────────────────────────────────────────────────

/// On-wire request header. Use [`Request`] for the validated form.
///
/// Wire size: 12 bytes.
#[derive(Debug, Clone, AsBytes, FromBytes, FromZeroes)]
#[repr(C)]
pub struct RequestHeader {
    /// Raw operation code. Anything outside 0..=2 is a framing error.
    pub operation: U32<LittleEndian>,
    /// Object id ("inode") chosen by the client.
    pub object_id: U32<LittleEndian>,
    /// Declared blob length in bytes. Only meaningful for PUT.
    pub length: U32<LittleEndian>,
}

// Compile-time size guard. If this fails, the wire format has silently changed.
assert_eq_size!(RequestHeader, [u8; REQUEST_SIZE]);

/// A decoded, validated request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Request {
    pub operation: Operation,
    pub object_id: u32,
    pub length: u32,
}

impl Request {
    pub fn new(operation: Operation, object_id: u32, length: u32) -> Self {
        Self {
            operation,
            object_id,
            length,
        }
    }

    pub fn put(object_id: u32, length: u32) -> Self {
        Self::new(Operation::Put, object_id, length)
    }

    pub fn get(object_id: u32) -> Self {
        Self::new(Operation::Get, object_id, 0)
    }

    pub fn rm(object_id: u32) -> Self {
        Self::new(Operation::Rm, object_id, 0)
    }

    /// Encode into the 12-byte wire layout.
    pub fn encode(&self) -> [u8; REQUEST_SIZE] {
        let header = RequestHeader {
            operation: U32::new(self.operation.into()),
            object_id: U32::new(self.object_id),
            length: U32::new(self.length),
        };
        let mut out = [0u8; REQUEST_SIZE];
        out.copy_from_slice(header.as_bytes());
        out
    }

    /// Decode a request from exactly one header's worth of bytes.
    ///
    /// Fewer than 12 bytes is a short header; an operation code outside the
    /// known set is rejected. Trailing bytes beyond the header are ignored.
    pub fn decode(bytes: &[u8]) -> Result<Self, WireError> {
        let header = RequestHeader::read_from_prefix(bytes)
            .ok_or(WireError::ShortHeader(bytes.len()))?;
        Ok(Self {
            operation: Operation::try_from(header.operation.get())?,
            object_id: header.object_id.get(),
            length: header.length.get(),
        })
    }
}

// ── Errors ────────────────────────────────────────────────────────────────────

/// Errors that can arise when interpreting wire-format data.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WireError {
    #[error("request header too short: {0} of {} bytes", REQUEST_SIZE)]
    ShortHeader(usize),

    #[error("unknown operation code: {0}")]
    UnknownOperation(u32),

    #[error("unknown status code: {0}")]
    UnknownStatus(i32),

    #[error("page final length {0} exceeds page size {}", PAGE_SIZE)]
    FinalLengthOutOfRange(u32),

    #[error("page payload of {0} bytes does not fit in one page")]
    PayloadTooLarge(usize),
}

// ── Tests ─────────────────────────────────────────────────────────────────────
