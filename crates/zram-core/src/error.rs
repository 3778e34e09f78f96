use std::result;

use thiserror::Error;

pub type Result<T, E = Error> = result::Result<T, E>;

/// Error types for zram-core operations.
#[derive(Debug, Error)]
pub enum Error {
    #[error("block range [{start}, {start_plus_count}) is out of bounds for {block_count} blocks")]
    BadRange {
        start: u64,
        start_plus_count: u64,
        block_count: u64,
    },

    #[error("page range [{start}, {start_plus_count}) is out of bounds for {page_count} pages")]
    BadPageRange {
        start: u64,
        start_plus_count: u64,
        page_count: u64,
    },

    #[error("stored page data failed to decompress: {reason}")]
    Corrupt { reason: String },

    #[error("write_blocks_hint: orig did not match current page contents")]
    HintMismatch,

    #[error("allocator failed to satisfy a request of {requested} bytes")]
    AllocFailed { requested: usize },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

impl Error {
    /// Numeric error code matching the `Ok = 0, BadRange = -1, Corrupt = <backend-specific>`
    /// convention of the system this crate reimplements.
    pub fn code(&self) -> i32 {
        match self {
            Error::BadRange { .. } | Error::BadPageRange { .. } => -1,
            Error::Corrupt { .. } => -2,
            Error::HintMismatch => -3,
            Error::AllocFailed { .. } => -4,
            Error::InvalidConfig(_) => -5,
        }
    }
}
