use std::cmp::Ordering;

/// A stable handle to one slot of a [`BucketStorage`][crate::BucketStorage], or to its end.
///
/// Positions are returned by [`insert()`][1], [`erase()`][2], [`begin()`][3], [`end()`][4] and the
/// stepping methods of the storage. They do not borrow the storage, so you can hold on to them
/// across insertions and removals and use them later to access, step from or erase the element.
///
/// # Validity
///
/// A position stays valid while the element it addresses is alive. Inserting elements never
/// invalidates a position. Erasing an element invalidates only positions addressing that same
/// slot, unless the erase leaves its block empty, in which case the block is released and every
/// position into that block becomes invalid. `clear()` and `shrink_to_fit()` invalidate all
/// positions.
///
/// Using an invalid position is never memory-unsafe: accessors return `None`, `erase()` returns
/// an error and the stepping methods panic.
///
/// # Ordering
///
/// Positions of the same storage are ordered by the directory order of their blocks and then by
/// slot index, with the end position after all others. Positions of different storages are not
/// comparable.
///
/// # Example
///
/// ```rust
/// use bucket_storage::BucketStorage;
///
/// let mut storage = BucketStorage::<&str>::new();
///
/// let first = storage.insert("first")?;
/// let second = storage.insert("second")?;
///
/// assert!(first < second);
/// assert!(second < storage.end());
/// assert_eq!(storage.step_forward(first), second);
/// # Ok::<(), bucket_storage::Error>(())
/// ```
///
/// [1]: crate::BucketStorage::insert
/// [2]: crate::BucketStorage::erase
/// [3]: crate::BucketStorage::begin
/// [4]: crate::BucketStorage::end
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct Position {
    storage_id: u64,

    /// `None` marks the end position.
    block_serial: Option<u64>,

    index: usize,
}

impl Position {
    #[must_use]
    pub(crate) fn new(storage_id: u64, block_serial: u64, index: usize) -> Self {
        Self {
            storage_id,
            block_serial: Some(block_serial),
            index,
        }
    }

    #[must_use]
    pub(crate) fn end(storage_id: u64) -> Self {
        Self {
            storage_id,
            block_serial: None,
            index: 0,
        }
    }

    /// Whether this is the end position of its storage, which does not address any element.
    ///
    /// # Example
    ///
    /// ```rust
    /// use bucket_storage::BucketStorage;
    ///
    /// let mut storage = BucketStorage::<u32>::new();
    /// assert!(storage.begin().is_end());
    ///
    /// let position = storage.insert(42)?;
    /// assert!(!position.is_end());
    /// # Ok::<(), bucket_storage::Error>(())
    /// ```
    #[must_use]
    pub fn is_end(&self) -> bool {
        self.block_serial.is_none()
    }

    #[must_use]
    pub(crate) fn storage_id(&self) -> u64 {
        self.storage_id
    }

    #[must_use]
    pub(crate) fn block_serial(&self) -> Option<u64> {
        self.block_serial
    }

    #[must_use]
    pub(crate) fn index(&self) -> usize {
        self.index
    }
}

impl PartialOrd for Position {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        if self.storage_id != other.storage_id {
            return None;
        }

        Some(match (self.block_serial, other.block_serial) {
            (None, None) => Ordering::Equal,
            (None, Some(_)) => Ordering::Greater,
            (Some(_), None) => Ordering::Less,
            (Some(ours), Some(theirs)) => (ours, self.index).cmp(&(theirs, other.index)),
        })
    }
}

#[cfg(test)]
mod tests {
    use std::fmt::Debug;
    use std::hash::Hash;

    use static_assertions::assert_impl_all;

    use super::*;

    assert_impl_all!(Position: Copy, Debug, Eq, Hash, Send, Sync);

    #[test]
    fn end_is_end() {
        assert!(Position::end(1).is_end());
        assert!(!Position::new(1, 0, 0).is_end());
    }

    #[test]
    fn equality_requires_all_parts() {
        let position = Position::new(1, 2, 3);

        assert_eq!(position, Position::new(1, 2, 3));
        assert_ne!(position, Position::new(9, 2, 3));
        assert_ne!(position, Position::new(1, 9, 3));
        assert_ne!(position, Position::new(1, 2, 9));
        assert_eq!(Position::end(1), Position::end(1));
        assert_ne!(Position::end(1), Position::end(2));
    }

    #[test]
    fn orders_by_block_then_index() {
        let a = Position::new(1, 0, 5);
        let b = Position::new(1, 1, 0);
        let c = Position::new(1, 1, 3);

        assert!(a < b);
        assert!(b < c);
        assert!(a < c);
        assert!(c > a);
        assert!(a <= Position::new(1, 0, 5));
        assert!(a >= Position::new(1, 0, 5));
    }

    #[test]
    fn end_orders_last() {
        let end = Position::end(1);

        assert!(Position::new(1, u64::MAX, usize::MAX) < end);
        assert!(end > Position::new(1, 0, 0));
        assert_eq!(end.partial_cmp(&Position::end(1)), Some(Ordering::Equal));
    }

    #[test]
    fn different_storages_are_incomparable() {
        assert_eq!(Position::new(1, 0, 0).partial_cmp(&Position::new(2, 0, 0)), None);
        assert_eq!(Position::end(1).partial_cmp(&Position::end(2)), None);
    }
}
