//! Status codes exchanged after the request header and after every page.
//!
//! On the wire a single 4-byte signed word carries both terminal results and
//! per-page flow control. Inside the crate these are two separate types:
//! [`Outcome`] for how a request ended, [`TransferAck`] for pacing a PUT.
//! Both convert into [`Status`], which owns the numeric codes.

use crate::wire::{WireError, STATUS_SIZE};

/// Every status word a peer may send.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum Status {
    /// Success.
    Ok = 0,
    /// A read or write moved fewer bytes than required.
    Access = 13,
    /// Framing fault or declared-size mismatch.
    Error = 14,
    /// Page accepted, send the next one.
    Next = 15,
    /// Final page accepted.
    End = 16,
    /// Object absent or unopenable.
    Inval = 22,
}

static_assertions::assert_eq_size!(i32, [u8; STATUS_SIZE]);

impl Status {
    pub fn code(self) -> i32 {
        self as i32
    }

    pub fn encode(self) -> [u8; STATUS_SIZE] {
        self.code().to_le_bytes()
    }

    pub fn decode(bytes: [u8; STATUS_SIZE]) -> Result<Self, WireError> {
        Status::try_from(i32::from_le_bytes(bytes))
    }

    pub fn name(self) -> &'static str {
        match self {
            Status::Ok => "OK",
            Status::Access => "ACCESS",
            Status::Error => "ERROR",
            Status::Next => "NEXT",
            Status::End => "END",
            Status::Inval => "INVAL",
        }
    }
}

impl TryFrom<i32> for Status {
    type Error = WireError;

    fn try_from(value: i32) -> Result<Self, WireError> {
        match value {
            0 => Ok(Status::Ok),
            13 => Ok(Status::Access),
            14 => Ok(Status::Error),
            15 => Ok(Status::Next),
            16 => Ok(Status::End),
            22 => Ok(Status::Inval),
            other => Err(WireError::UnknownStatus(other)),
        }
    }
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}({})", self.name(), self.code())
    }
}

// ── Flow control ──────────────────────────────────────────────────────────────

/// Per-page acknowledgment sent by the receiving side of a PUT.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferAck {
    /// More pages are expected.
    More,
    /// The transfer is complete.
    Done,
}

impl TransferAck {
    pub fn from_status(status: Status) -> Option<Self> {
        match status {
            Status::Next => Some(TransferAck::More),
            Status::End => Some(TransferAck::Done),
            _ => None,
        }
    }
}

impl From<TransferAck> for Status {
    fn from(ack: TransferAck) -> Status {
        match ack {
            TransferAck::More => Status::Next,
            TransferAck::Done => Status::End,
        }
    }
}

// ── Terminal results ──────────────────────────────────────────────────────────

/// How a request, or one phase of it, ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The request completed.
    Ok,
    /// The object does not exist or could not be opened.
    NotFound,
    /// Storage moved fewer bytes than required.
    IoFault,
    /// Bad framing, a dropped peer, or a size mismatch.
    Protocol,
}

impl Outcome {
    /// Interpret a status word as a terminal result. Flow-control codes are
    /// not results and map to `None`.
    pub fn from_status(status: Status) -> Option<Self> {
        match status {
            Status::Ok => Some(Outcome::Ok),
            Status::Inval => Some(Outcome::NotFound),
            Status::Access => Some(Outcome::IoFault),
            Status::Error => Some(Outcome::Protocol),
            Status::Next | Status::End => None,
        }
    }

    pub fn is_ok(self) -> bool {
        self == Outcome::Ok
    }
}

impl From<Outcome> for Status {
    fn from(outcome: Outcome) -> Status {
        match outcome {
            Outcome::Ok => Status::Ok,
            Outcome::NotFound => Status::Inval,
            Outcome::IoFault => Status::Access,
            Outcome::Protocol => Status::Error,
        }
    }
}

impl std::fmt::Display for Outcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", Status::from(*self))
    }
}
