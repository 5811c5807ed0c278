//! Page codec — one fixed-capacity chunk of a data transfer.
//!
//! ```text
//! +----------------------------------+---------------------+
//! | data (4096 bytes)                | final_length (u32)  |
//! +----------------------------------+---------------------+
//! ```
//!
//! `final_length == 0` marks a full page with more to follow.
//! `final_length == n > 0` marks the last page, carrying `n` valid bytes.
//!
//! The GET side also terminates a transfer whose length is an exact multiple
//! of the page size with an empty page whose `final_length` is 0, which is
//! indistinguishable from a full page on the wire. Readers must know the
//! expected length to tell the two apart.

use static_assertions::assert_eq_size;
use zerocopy::byteorder::{LittleEndian, U32};
use zerocopy::{AsBytes, FromBytes, FromZeroes};

use crate::wire::{WireError, PAGE_FRAME_SIZE, PAGE_SIZE};

/// One page exactly as it travels on the wire.
///
/// Wire size: 4100 bytes.
#[derive(Clone, AsBytes, FromBytes, FromZeroes)]
#[repr(C)]
pub struct Page {
    data: [u8; PAGE_SIZE],
    final_length: U32<LittleEndian>,
}

assert_eq_size!(Page, [u8; PAGE_FRAME_SIZE]);

/// The valid bytes of a decoded page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PagePayload<'a> {
    /// A full page; more pages follow.
    More(&'a [u8]),
    /// The last page of the transfer.
    Last(&'a [u8]),
}

impl PagePayload<'_> {
    pub fn bytes(&self) -> &[u8] {
        match self {
            PagePayload::More(b) | PagePayload::Last(b) => b,
        }
    }

    pub fn is_last(&self) -> bool {
        matches!(self, PagePayload::Last(_))
    }
}

impl Page {
    /// A zeroed page, ready to be filled from a stream or a container.
    pub fn empty() -> Self {
        Self::new_zeroed()
    }

    /// A full, non-final page.
    pub fn continuation(bytes: &[u8; PAGE_SIZE]) -> Self {
        let mut page = Self::empty();
        page.data.copy_from_slice(bytes);
        page
    }

    /// The final page of a transfer, carrying `bytes.len()` valid bytes.
    pub fn last(bytes: &[u8]) -> Result<Self, WireError> {
        if bytes.len() > PAGE_SIZE {
            return Err(WireError::PayloadTooLarge(bytes.len()));
        }
        let mut page = Self::empty();
        page.data[..bytes.len()].copy_from_slice(bytes);
        page.final_length = U32::new(bytes.len() as u32);
        Ok(page)
    }

    /// Raw data area, for filling in place.
    pub fn data_mut(&mut self) -> &mut [u8; PAGE_SIZE] {
        &mut self.data
    }

    /// Mark this page as full with more to follow.
    pub fn set_continuation(&mut self) {
        self.final_length = U32::new(0);
    }

    /// Mark this page as the last one, holding `len` valid bytes.
    /// Bytes past `len` are zeroed so nothing stale leaves the process.
    pub fn set_last(&mut self, len: usize) -> Result<(), WireError> {
        if len > PAGE_SIZE {
            return Err(WireError::PayloadTooLarge(len));
        }
        self.data[len..].fill(0);
        self.final_length = U32::new(len as u32);
        Ok(())
    }

    pub fn final_length(&self) -> u32 {
        self.final_length.get()
    }

    /// Interpret the final-length marker.
    pub fn payload(&self) -> Result<PagePayload<'_>, WireError> {
        match self.final_length.get() {
            0 => Ok(PagePayload::More(&self.data[..])),
            n if n as usize <= PAGE_SIZE => Ok(PagePayload::Last(&self.data[..n as usize])),
            n => Err(WireError::FinalLengthOutOfRange(n)),
        }
    }
}

impl Default for Page {
    fn default() -> Self {
        Self::empty()
    }
}

impl std::fmt::Debug for Page {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Page")
            .field("final_length", &self.final_length.get())
            .finish_non_exhaustive()
    }
}
