use std::collections::TryReserveError;

use thiserror::Error;

/// Errors that can occur when modifying a [`BucketStorage`][crate::BucketStorage].
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// The caller tried to erase through the end position, which does not address any slot.
    #[error("the end position does not refer to an element and cannot be erased")]
    InvalidPosition,

    /// The caller tried to erase an element that has already been erased.
    #[error("slot {index} was already erased")]
    DoubleErase {
        /// Index of the slot within its block.
        index: usize,
    },

    /// The position was issued by a different storage, or by this storage before it was
    /// compacted via `shrink_to_fit()`.
    #[error("the position does not refer to a slot owned by this storage")]
    ForeignPosition,

    /// Memory for a new block or for the block directory could not be reserved.
    ///
    /// Nothing is committed when this happens; the storage is left as it was before the call.
    #[error("failed to allocate a new block: {0}")]
    AllocationFailure(#[from] TryReserveError),

    /// No empty slot was found even after growing the block directory.
    ///
    /// This indicates broken internal bookkeeping and is not expected to ever be returned.
    #[error("no empty slot found after growing the block directory")]
    InsertExhausted,
}

/// A specialized `Result` type for storage operations, returning the crate's
/// [`Error`] type as the error value.
pub type Result<T> = std::result::Result<T, Error>;
