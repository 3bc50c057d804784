//! A block-partitioned container with stable positions.
//!
//! This crate provides [`BucketStorage`], a growable container that keeps its elements in
//! fixed-capacity blocks. Elements never move once inserted, so the [`Position`] returned by an
//! insertion keeps addressing the same element until that element is erased, no matter how many
//! other elements come and go in the meantime.
//!
//! # Key Features
//!
//! - **Stable positions**: Inserting never invalidates existing positions
//! - **Gap reuse**: New elements fill the first empty slot left behind by earlier removals
//! - **Block release**: A block is freed as soon as its last element is erased
//! - **Bidirectional traversal**: Step forward and backward through positions without borrowing
//! - **Borrowing iteration**: [`Iter`] and [`IterMut`] for the usual iterator adapters
//! - **Checked misuse**: Erasing twice or using another storage's position is reported, not
//!   undefined behavior
//! - **Compaction**: [`BucketStorage::shrink_to_fit()`] packs the elements into as few blocks as
//!   possible
//! - **Flexible drop policies**: Configure behavior when the storage is dropped with remaining
//!   elements
//!
//! # Traversal order
//!
//! Blocks are visited in the order they were allocated, and slots within a block in index order,
//! skipping empty slots. Because insertion fills the first gap, traversal order is not insertion
//! order once elements have been erased.
//!
//! # Examples
//!
//! ## Basic usage
//!
//! ```rust
//! use bucket_storage::BucketStorage;
//!
//! let mut storage = BucketStorage::<String>::new();
//!
//! let alice = storage.insert("Alice".to_string())?;
//! let bob = storage.insert("Bob".to_string())?;
//!
//! assert_eq!(storage[alice], "Alice");
//! assert_eq!(storage.len(), 2);
//!
//! storage.erase(bob)?;
//!
//! // Positions of other elements are unaffected by the removal.
//! assert_eq!(storage[alice], "Alice");
//! assert_eq!(storage.get(bob), None);
//! # Ok::<(), bucket_storage::Error>(())
//! ```
//!
//! ## Erasing while traversing
//!
//! ```rust
//! use bucket_storage::BucketStorage;
//!
//! let mut storage = BucketStorage::<u32>::new();
//!
//! for value in 0..10 {
//!     storage.insert(value)?;
//! }
//!
//! let mut position = storage.begin();
//!
//! while !position.is_end() {
//!     let next = storage.step_forward(position);
//!
//!     if storage[position] % 2 == 1 {
//!         storage.erase(position)?;
//!     }
//!
//!     position = next;
//! }
//!
//! assert_eq!(storage.iter().copied().collect::<Vec<_>>(), vec![0, 2, 4, 6, 8]);
//! # Ok::<(), bucket_storage::Error>(())
//! ```
//!
//! ## Custom block capacity
//!
//! ```rust
//! use std::num::NonZero;
//!
//! use bucket_storage::BucketStorage;
//!
//! let mut storage = BucketStorage::<u64>::builder()
//!     .block_capacity(NonZero::new(4).unwrap())
//!     .build();
//!
//! for value in 0..5 {
//!     storage.insert(value)?;
//! }
//!
//! assert_eq!(storage.block_count(), 2);
//! assert_eq!(storage.capacity(), 8);
//! # Ok::<(), bucket_storage::Error>(())
//! ```

mod bucket_storage;
mod builder;
mod drop_policy;
mod error;
mod iter;
mod position;
mod slot_block;

pub use bucket_storage::{BucketStorage, DEFAULT_BLOCK_CAPACITY};
pub use builder::*;
pub use drop_policy::*;
pub use error::{Error, Result};
pub use iter::{Iter, IterMut};
pub use position::Position;
pub(crate) use slot_block::*;
