use std::any::type_name;
use std::fmt;
use std::marker::PhantomData;
use std::num::NonZero;

use crate::{BucketStorage, DEFAULT_BLOCK_CAPACITY, DropPolicy};

/// Builder for creating an instance of [`BucketStorage`].
///
/// You only need to use this builder if you want to customize the storage configuration.
/// The default configuration used by [`BucketStorage::new()`][1] is sufficient for most use cases.
///
/// # Examples
///
/// ```
/// use std::num::NonZero;
///
/// use bucket_storage::{BucketStorage, DropPolicy};
///
/// let storage = BucketStorage::<u32>::builder()
///     .block_capacity(NonZero::new(16).unwrap())
///     .drop_policy(DropPolicy::MayDropItems)
///     .build();
///
/// assert_eq!(storage.block_capacity(), 16);
/// ```
///
/// [1]: BucketStorage::new
#[must_use]
pub struct BucketStorageBuilder<T> {
    block_capacity: NonZero<usize>,
    drop_policy: DropPolicy,

    _item: PhantomData<T>,
}

impl<T> fmt::Debug for BucketStorageBuilder<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BucketStorageBuilder")
            .field("item_type", &format_args!("{}", type_name::<T>()))
            .field("block_capacity", &self.block_capacity)
            .field("drop_policy", &self.drop_policy)
            .finish()
    }
}

impl<T> BucketStorageBuilder<T> {
    pub(crate) fn new() -> Self {
        Self {
            block_capacity: DEFAULT_BLOCK_CAPACITY,
            drop_policy: DropPolicy::default(),
            _item: PhantomData,
        }
    }

    /// Sets the number of slots in each block. This is fixed for the lifetime of the storage.
    ///
    /// Larger blocks mean fewer allocations but a coarser granularity of memory release, as a
    /// block is only released once every element in it has been erased. The default is 64.
    ///
    /// # Examples
    ///
    /// ```
    /// use std::num::NonZero;
    ///
    /// use bucket_storage::BucketStorage;
    ///
    /// let mut storage = BucketStorage::<u32>::builder()
    ///     .block_capacity(NonZero::new(2).unwrap())
    ///     .build();
    ///
    /// storage.insert(1)?;
    /// assert_eq!(storage.capacity(), 2);
    /// # Ok::<(), bucket_storage::Error>(())
    /// ```
    pub fn block_capacity(mut self, block_capacity: NonZero<usize>) -> Self {
        self.block_capacity = block_capacity;
        self
    }

    /// Sets the [drop policy][DropPolicy] for the storage. This governs how
    /// to treat remaining elements when the storage is dropped.
    ///
    /// # Examples
    ///
    /// ```
    /// use bucket_storage::{BucketStorage, DropPolicy};
    ///
    /// let storage = BucketStorage::<u32>::builder()
    ///     .drop_policy(DropPolicy::MustNotDropItems)
    ///     .build();
    /// ```
    pub fn drop_policy(mut self, policy: DropPolicy) -> Self {
        self.drop_policy = policy;
        self
    }

    /// Builds the storage with the specified configuration.
    ///
    /// No blocks are allocated until the first element is inserted.
    ///
    /// # Examples
    ///
    /// ```
    /// use bucket_storage::BucketStorage;
    ///
    /// let storage = BucketStorage::<u32>::builder().build();
    ///
    /// assert_eq!(storage.capacity(), 0);
    /// ```
    #[must_use]
    pub fn build(self) -> BucketStorage<T> {
        BucketStorage::new_inner(self.block_capacity, self.drop_policy)
    }
}
