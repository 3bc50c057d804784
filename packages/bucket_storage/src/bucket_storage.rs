use std::any::type_name;
use std::num::NonZero;
use std::ops::{Index, IndexMut};
use std::sync::atomic::{AtomicU64, Ordering};
use std::{mem, thread};

use tracing::{debug, trace};

use crate::{BucketStorageBuilder, DropPolicy, Error, Iter, IterMut, Position, Result, SlotBlock};

/// Number of slots per block used by [`BucketStorage::new()`] and the builder defaults.
pub const DEFAULT_BLOCK_CAPACITY: NonZero<usize> =
    NonZero::new(64).expect("64 is a non-zero literal");

/// Source of storage identities. Every storage that hands out positions gets its own value, so a
/// position can always tell which storage issued it.
static NEXT_STORAGE_ID: AtomicU64 = AtomicU64::new(0);

fn next_storage_id() -> u64 {
    // Only uniqueness matters here, there is no other memory to synchronize with.
    NEXT_STORAGE_ID.fetch_add(1, Ordering::Relaxed)
}

/// A container of unbounded size that stores its elements in fixed-capacity blocks and hands out
/// [`Position`]s that stay valid across insertions and most removals.
///
/// Unlike a `Vec`, the storage never moves existing elements to make room for new ones. When all
/// slots are occupied, a new block is appended to the block directory. When an erase leaves a
/// block without elements, that block is released immediately.
///
/// # Placement
///
/// [`insert()`][Self::insert] always puts the new element into the first empty slot found by
/// scanning blocks in directory order and slots in index order. Gaps left behind by erased
/// elements are therefore filled before the newest block is, and the traversal position of a new
/// element depends on where those gaps are. The scan starts from the first block on every call,
/// so insertion cost grows with the number of occupied slots in front of the first gap.
///
/// # Traversal
///
/// [`begin()`][Self::begin], [`end()`][Self::end], [`step_forward()`][Self::step_forward],
/// [`step_backward()`][Self::step_backward] and [`get_to_distance()`][Self::get_to_distance]
/// provide bidirectional position-based traversal that does not borrow the storage, so the
/// storage can be modified in between steps. For plain borrowing iteration, use
/// [`iter()`][Self::iter] or [`iter_mut()`][Self::iter_mut].
///
/// # Thread safety
///
/// The storage has no internal synchronization. It follows the usual Rust rules: it is `Send`
/// and `Sync` when `T` is and any sharing across threads requires external synchronization for
/// mutation.
///
/// # Example
///
/// ```rust
/// use std::num::NonZero;
///
/// use bucket_storage::BucketStorage;
///
/// let mut storage = BucketStorage::with_block_capacity(NonZero::new(2).unwrap());
///
/// let a = storage.insert('A')?;
/// let b = storage.insert('B')?;
/// let c = storage.insert('C')?;
///
/// assert_eq!(storage.len(), 3);
/// assert_eq!(storage.capacity(), 4);
///
/// storage.erase(b)?;
///
/// // The next insert fills the gap left behind by 'B'.
/// let d = storage.insert('D')?;
/// assert!(a < d && d < c);
///
/// assert_eq!(storage.iter().collect::<String>(), "ADC");
/// # Ok::<(), bucket_storage::Error>(())
/// ```
#[derive(Debug)]
pub struct BucketStorage<T> {
    /// The block directory, in traversal order. Blocks are only ever appended, so their serials
    /// are strictly increasing along the directory and we can binary search by serial.
    blocks: Vec<SlotBlock<T>>,

    /// Number of live elements across all blocks.
    len: usize,

    block_capacity: NonZero<usize>,

    storage_id: u64,

    /// Serial to assign to the next allocated block. Serials are never reused by a storage, which
    /// lets us tell a released block apart from one that was never ours.
    next_block_serial: u64,

    drop_policy: DropPolicy,
}

impl<T> BucketStorage<T> {
    #[must_use]
    pub(crate) fn new_inner(block_capacity: NonZero<usize>, drop_policy: DropPolicy) -> Self {
        Self {
            blocks: Vec::new(),
            len: 0,
            block_capacity,
            storage_id: next_storage_id(),
            next_block_serial: 0,
            drop_policy,
        }
    }

    /// Creates a new, empty [`BucketStorage`] with the default configuration.
    ///
    /// No memory is allocated until the first element is inserted. Each block holds
    /// [`DEFAULT_BLOCK_CAPACITY`] elements.
    ///
    /// # Example
    ///
    /// ```rust
    /// use bucket_storage::BucketStorage;
    ///
    /// let storage = BucketStorage::<String>::new();
    ///
    /// assert!(storage.is_empty());
    /// assert_eq!(storage.capacity(), 0);
    /// ```
    #[must_use]
    pub fn new() -> Self {
        Self::builder().build()
    }

    /// Creates a new, empty [`BucketStorage`] whose blocks each hold `block_capacity` elements.
    ///
    /// # Example
    ///
    /// ```rust
    /// use std::num::NonZero;
    ///
    /// use bucket_storage::BucketStorage;
    ///
    /// let storage = BucketStorage::<u8>::with_block_capacity(NonZero::new(8).unwrap());
    ///
    /// assert_eq!(storage.block_capacity(), 8);
    /// ```
    #[must_use]
    pub fn with_block_capacity(block_capacity: NonZero<usize>) -> Self {
        Self::builder().block_capacity(block_capacity).build()
    }

    /// Starts building a new [`BucketStorage`].
    ///
    /// Use this when you want to customize the storage configuration beyond the defaults.
    pub fn builder() -> BucketStorageBuilder<T> {
        BucketStorageBuilder::new()
    }

    /// The number of elements in the storage.
    #[must_use]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether the storage holds no elements.
    ///
    /// An empty storage may still hold reserved capacity.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// The number of elements the storage can hold without allocating another block.
    ///
    /// This is always a multiple of [`block_capacity()`][Self::block_capacity].
    ///
    /// # Example
    ///
    /// ```rust
    /// use std::num::NonZero;
    ///
    /// use bucket_storage::BucketStorage;
    ///
    /// let mut storage = BucketStorage::with_block_capacity(NonZero::new(4).unwrap());
    /// assert_eq!(storage.capacity(), 0);
    ///
    /// storage.insert(1)?;
    /// assert_eq!(storage.capacity(), 4);
    /// # Ok::<(), bucket_storage::Error>(())
    /// ```
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.blocks
            .len()
            .checked_mul(self.block_capacity.get())
            .expect("overflow here would mean the storage holds more slots than virtual memory can fit, which makes no sense - it would never grow that big")
    }

    /// The number of slots in each block, fixed when the storage was created.
    #[must_use]
    pub fn block_capacity(&self) -> usize {
        self.block_capacity.get()
    }

    /// The number of blocks currently in the block directory.
    #[must_use]
    pub fn block_count(&self) -> usize {
        self.blocks.len()
    }

    /// The drop policy the storage was created with.
    #[must_use]
    pub fn drop_policy(&self) -> DropPolicy {
        self.drop_policy
    }

    /// Inserts an element into the first empty slot and returns its position.
    ///
    /// If every slot is occupied, a new block is appended first. Otherwise the element fills the
    /// earliest gap in traversal order, which may be far in front of the most recently inserted
    /// element.
    ///
    /// # Errors
    ///
    /// Returns [`Error::AllocationFailure`] if a new block was needed but could not be allocated.
    /// The storage is left unchanged and `value` is dropped.
    ///
    /// # Example
    ///
    /// ```rust
    /// use bucket_storage::BucketStorage;
    ///
    /// let mut storage = BucketStorage::<String>::new();
    ///
    /// let position = storage.insert("Hello".to_string())?;
    ///
    /// assert_eq!(storage[position], "Hello");
    /// # Ok::<(), bucket_storage::Error>(())
    /// ```
    pub fn insert(&mut self, value: T) -> Result<Position> {
        #[cfg(debug_assertions)]
        self.integrity_check();

        if self.len == self.capacity() {
            self.allocate_block()?;
        }

        let Some((block_index, index)) = self
            .blocks
            .iter()
            .enumerate()
            .find_map(|(block_index, block)| block.first_empty().map(|index| (block_index, index)))
        else {
            return Err(Error::InsertExhausted);
        };

        let block = self
            .blocks
            .get_mut(block_index)
            .expect("index came from enumerating the block directory");

        block.place(index, value);
        let block_serial = block.serial();

        self.len = self
            .len
            .checked_add(1)
            .expect("guarded by there being an empty slot, so len is below capacity");

        trace!(
            storage_id = self.storage_id,
            block_serial,
            index,
            "inserted element"
        );

        Ok(Position::new(self.storage_id, block_serial, index))
    }

    /// Erases the element at `position` and returns a position to continue from.
    ///
    /// If the erase leaves the element's block without elements, the block is released and the
    /// end position is returned. Otherwise the returned position is the next occupied slot after
    /// the erased one *within the same block*, or the end position if there is none. The search
    /// does not continue into later blocks, even if they hold elements; use
    /// [`step_forward()`][Self::step_forward] before erasing if you need the true successor.
    ///
    /// Erasing invalidates `position`. If the block is released, every position into that block
    /// is invalidated as well.
    ///
    /// # Errors
    ///
    /// * [`Error::InvalidPosition`] if `position` is the end position.
    /// * [`Error::DoubleErase`] if the element at `position` was already erased.
    /// * [`Error::ForeignPosition`] if `position` was not issued by this storage.
    ///
    /// # Example
    ///
    /// ```rust
    /// use bucket_storage::BucketStorage;
    ///
    /// let mut storage = BucketStorage::<u32>::new();
    ///
    /// let first = storage.insert(1)?;
    /// let second = storage.insert(2)?;
    ///
    /// assert_eq!(storage.erase(first)?, second);
    /// assert!(storage.erase(first).is_err());
    /// # Ok::<(), bucket_storage::Error>(())
    /// ```
    pub fn erase(&mut self, position: Position) -> Result<Position> {
        #[cfg(debug_assertions)]
        self.integrity_check();

        if position.storage_id() != self.storage_id {
            return Err(Error::ForeignPosition);
        }

        let Some(block_serial) = position.block_serial() else {
            return Err(Error::InvalidPosition);
        };

        let index = position.index();
        let end = self.end();

        let Some(block_index) = self.find_block(block_serial) else {
            // Serials are never reused, so a serial we issued that is no longer in the directory
            // belongs to a released block, all of whose slots were erased.
            return Err(if block_serial < self.next_block_serial {
                Error::DoubleErase { index }
            } else {
                Error::ForeignPosition
            });
        };

        if index >= self.block_capacity.get() {
            return Err(Error::ForeignPosition);
        }

        let block = self
            .blocks
            .get_mut(block_index)
            .expect("index came from searching the block directory");

        let Some(erased) = block.vacate(index) else {
            return Err(Error::DoubleErase { index });
        };

        self.len = self
            .len
            .checked_sub(1)
            .expect("we just vacated an occupied slot, so len must be non-zero");

        trace!(
            storage_id = self.storage_id,
            block_serial,
            index,
            "erased element"
        );

        let next = if block.is_empty() {
            self.release_block(block_index);
            end
        } else {
            index
                .checked_add(1)
                .and_then(|from| block.first_occupied_from(from))
                .map_or(end, |next_index| {
                    Position::new(self.storage_id, block_serial, next_index)
                })
        };

        // Bookkeeping must be complete before the element's destructor runs.
        drop(erased);

        Ok(next)
    }

    /// Drops every element and releases every block.
    ///
    /// The storage remains usable afterwards, with the same block capacity. All positions issued
    /// before the call are invalidated.
    ///
    /// This is permitted regardless of the [drop policy][DropPolicy].
    ///
    /// # Example
    ///
    /// ```rust
    /// use bucket_storage::BucketStorage;
    ///
    /// let mut storage = BucketStorage::<u32>::new();
    /// storage.insert(1)?;
    ///
    /// storage.clear();
    ///
    /// assert!(storage.is_empty());
    /// assert_eq!(storage.capacity(), 0);
    /// # Ok::<(), bucket_storage::Error>(())
    /// ```
    pub fn clear(&mut self) {
        let blocks = mem::take(&mut self.blocks);
        let dropped_elements = mem::replace(&mut self.len, 0);

        debug!(
            storage_id = self.storage_id,
            released_blocks = blocks.len(),
            dropped_elements,
            "cleared storage"
        );

        drop(blocks);
    }

    /// Reserves capacity for at least `additional` more elements.
    ///
    /// Reserved blocks are appended empty to the end of the directory. They are filled by later
    /// insertions in the usual first-gap order.
    ///
    /// # Errors
    ///
    /// Returns [`Error::AllocationFailure`] if a block could not be allocated. Blocks allocated
    /// before the failure are kept.
    ///
    /// # Panics
    ///
    /// Panics if `len() + additional` overflows `usize`. This is a capacity overflow, not an
    /// allocation failure, so it is not reported through the error.
    ///
    /// # Example
    ///
    /// ```rust
    /// use std::num::NonZero;
    ///
    /// use bucket_storage::BucketStorage;
    ///
    /// let mut storage = BucketStorage::<u32>::with_block_capacity(NonZero::new(4).unwrap());
    ///
    /// storage.reserve(10)?;
    ///
    /// assert_eq!(storage.capacity(), 12);
    /// # Ok::<(), bucket_storage::Error>(())
    /// ```
    #[cfg_attr(test, mutants::skip)] // Can be mutated to infinitely growing memory use.
    pub fn reserve(&mut self, additional: usize) -> Result<()> {
        let required_capacity = self
            .len
            .checked_add(additional)
            .expect("capacity overflow: requested capacity exceeds maximum possible value");

        let required_blocks = required_capacity.div_ceil(self.block_capacity.get());

        while self.blocks.len() < required_blocks {
            self.allocate_block()?;
        }

        Ok(())
    }

    /// Moves every element into as few blocks as possible and releases the rest.
    ///
    /// Elements are re-inserted in traversal order into a fresh set of blocks, so afterwards
    /// they occupy the leading slots of the directory with no gaps. All positions issued before
    /// the call are invalidated (using them with this storage is reported as foreign).
    ///
    /// # Example
    ///
    /// ```rust
    /// use std::num::NonZero;
    ///
    /// use bucket_storage::BucketStorage;
    ///
    /// let mut storage = BucketStorage::with_block_capacity(NonZero::new(2).unwrap());
    ///
    /// let positions = (0..6)
    ///     .map(|value| storage.insert(value))
    ///     .collect::<Result<Vec<_>, _>>()?;
    ///
    /// storage.erase(positions[1])?;
    /// storage.erase(positions[3])?;
    /// storage.erase(positions[5])?;
    /// assert_eq!(storage.capacity(), 6);
    ///
    /// storage.shrink_to_fit();
    ///
    /// assert_eq!(storage.capacity(), 4);
    /// assert_eq!(storage.iter().copied().collect::<Vec<_>>(), vec![0, 2, 4]);
    /// # Ok::<(), bucket_storage::Error>(())
    /// ```
    ///
    /// # Panics
    ///
    /// Panics if the memory for the compacted blocks cannot be allocated.
    pub fn shrink_to_fit(&mut self) {
        let mut compacted = Self::new_inner(self.block_capacity, self.drop_policy);

        compacted
            .reserve(self.len)
            .expect("we do not intend to handle allocation failure as a real possibility - OOM is panic");

        for block in &mut self.blocks {
            for value in block.drain() {
                compacted
                    .insert(value)
                    .expect("capacity for every element was reserved up front");
            }
        }

        self.len = 0;

        debug!(
            old_storage_id = self.storage_id,
            new_storage_id = compacted.storage_id,
            old_blocks = self.blocks.len(),
            new_blocks = compacted.blocks.len(),
            "compacted storage"
        );

        // What remains in `compacted` afterwards is the drained husk of our old blocks.
        self.swap(&mut compacted);
    }

    /// Exchanges the entire contents of two storages, including their block capacity and drop
    /// policy.
    ///
    /// Positions follow their elements: a position issued by `self` before the swap addresses the
    /// same element in `other` afterwards.
    pub fn swap(&mut self, other: &mut Self) {
        mem::swap(self, other);
    }

    /// Moves the contents out of this storage into a new one, leaving this storage empty.
    ///
    /// The returned storage takes over the identity of this one, so existing positions remain
    /// valid for it. This storage keeps its block capacity and drop policy, has zero capacity and
    /// can be used again right away.
    ///
    /// # Example
    ///
    /// ```rust
    /// use bucket_storage::BucketStorage;
    ///
    /// let mut storage = BucketStorage::<u32>::new();
    /// let position = storage.insert(42)?;
    ///
    /// let taken = storage.take();
    ///
    /// assert_eq!(taken[position], 42);
    /// assert!(storage.is_empty());
    /// assert_eq!(storage.capacity(), 0);
    /// # Ok::<(), bucket_storage::Error>(())
    /// ```
    #[must_use]
    pub fn take(&mut self) -> Self {
        let fresh = Self::new_inner(self.block_capacity, self.drop_policy);
        mem::replace(self, fresh)
    }

    /// Replaces the contents of this storage with the contents of `source`, leaving `source`
    /// empty.
    ///
    /// Elements previously held by this storage are dropped, as if by [`clear()`][Self::clear].
    pub fn move_from(&mut self, source: &mut Self) {
        let mut previous = source.take();
        self.swap(&mut previous);
        previous.clear();
    }

    /// The position of the first element in traversal order, or the end position if the storage
    /// is empty.
    #[must_use]
    pub fn begin(&self) -> Position {
        self.blocks
            .iter()
            .find_map(|block| {
                block
                    .first_occupied_from(0)
                    .map(|index| Position::new(self.storage_id, block.serial(), index))
            })
            .unwrap_or_else(|| self.end())
    }

    /// The end position, which follows the last element and does not address any element.
    #[must_use]
    pub fn end(&self) -> Position {
        Position::end(self.storage_id)
    }

    /// The position of the next element in traversal order after `position`, crossing into later
    /// blocks as needed. Stepping forward from the end position yields the end position.
    ///
    /// `position` itself does not need to address a live element, only a block that still exists.
    ///
    /// # Panics
    ///
    /// Panics if `position` was not issued by this storage or refers to a released block.
    ///
    /// # Example
    ///
    /// ```rust
    /// use bucket_storage::BucketStorage;
    ///
    /// let mut storage = BucketStorage::<u32>::new();
    /// let first = storage.insert(1)?;
    /// let second = storage.insert(2)?;
    ///
    /// assert_eq!(storage.step_forward(first), second);
    /// assert_eq!(storage.step_forward(second), storage.end());
    /// # Ok::<(), bucket_storage::Error>(())
    /// ```
    #[must_use]
    pub fn step_forward(&self, position: Position) -> Position {
        let Some(mut block_index) = self.directory_index(position) else {
            return self.end();
        };

        let mut from = position
            .index()
            .checked_add(1)
            .expect("slot indexes are bounded by the block capacity, so this cannot overflow");

        while let Some(block) = self.blocks.get(block_index) {
            if let Some(index) = block.first_occupied_from(from) {
                return Position::new(self.storage_id, block.serial(), index);
            }

            block_index = block_index
                .checked_add(1)
                .expect("bounded by the directory length, so this cannot overflow");
            from = 0;
        }

        self.end()
    }

    /// The position of the previous element in traversal order before `position`, crossing into
    /// earlier blocks as needed. Stepping backward from the end position yields the last element.
    ///
    /// There is no element before the first one; stepping backward from [`begin()`][Self::begin]
    /// currently yields the end position but callers must not rely on that.
    ///
    /// # Panics
    ///
    /// Panics if `position` was not issued by this storage or refers to a released block.
    ///
    /// # Example
    ///
    /// ```rust
    /// use bucket_storage::BucketStorage;
    ///
    /// let mut storage = BucketStorage::<u32>::new();
    /// let first = storage.insert(1)?;
    /// let second = storage.insert(2)?;
    ///
    /// assert_eq!(storage.step_backward(storage.end()), second);
    /// assert_eq!(storage.step_backward(second), first);
    /// # Ok::<(), bucket_storage::Error>(())
    /// ```
    #[must_use]
    pub fn step_backward(&self, position: Position) -> Position {
        let block_capacity = self.block_capacity.get();

        let (mut block_index, mut before) = match self.directory_index(position) {
            Some(block_index) => (block_index, position.index()),
            None => {
                // From the end, start just past the last slot of the last block with elements.
                let Some(block_index) = self.blocks.iter().rposition(|block| !block.is_empty())
                else {
                    return self.end();
                };

                (block_index, block_capacity)
            }
        };

        loop {
            let block = self
                .blocks
                .get(block_index)
                .expect("we only ever walk between existing directory entries");

            if let Some(index) = block.last_occupied_before(before) {
                return Position::new(self.storage_id, block.serial(), index);
            }

            let Some(previous_block_index) = block_index.checked_sub(1) else {
                return self.end();
            };

            block_index = previous_block_index;
            before = block_capacity;
        }
    }

    /// Steps `distance` elements forward (if positive) or backward (if negative) from `position`.
    ///
    /// This takes one step at a time, so the cost is linear in `distance`.
    ///
    /// # Panics
    ///
    /// Panics under the same conditions as [`step_forward()`][Self::step_forward] and
    /// [`step_backward()`][Self::step_backward].
    ///
    /// # Example
    ///
    /// ```rust
    /// use bucket_storage::BucketStorage;
    ///
    /// let mut storage = BucketStorage::<u32>::new();
    /// let positions = (0..5)
    ///     .map(|value| storage.insert(value))
    ///     .collect::<Result<Vec<_>, _>>()?;
    ///
    /// assert_eq!(storage.get_to_distance(positions[1], 3), positions[4]);
    /// assert_eq!(storage.get_to_distance(positions[4], -2), positions[2]);
    /// assert_eq!(storage.get_to_distance(positions[2], 0), positions[2]);
    /// # Ok::<(), bucket_storage::Error>(())
    /// ```
    #[must_use]
    pub fn get_to_distance(&self, position: Position, distance: isize) -> Position {
        let step: fn(&Self, Position) -> Position = if distance >= 0 {
            Self::step_forward
        } else {
            Self::step_backward
        };

        (0..distance.unsigned_abs()).fold(position, |current, _| step(self, current))
    }

    /// Gets a shared reference to the element at `position`.
    ///
    /// Returns `None` if `position` is the end position, was issued by another storage or no
    /// longer addresses a live element.
    #[must_use]
    pub fn get(&self, position: Position) -> Option<&T> {
        let block_index = self.lookup(position)?;

        self.blocks.get(block_index)?.get(position.index())
    }

    /// Gets an exclusive reference to the element at `position`.
    ///
    /// Returns `None` if `position` is the end position, was issued by another storage or no
    /// longer addresses a live element.
    ///
    /// # Example
    ///
    /// ```rust
    /// use bucket_storage::BucketStorage;
    ///
    /// let mut storage = BucketStorage::<String>::new();
    /// let position = storage.insert("Hello".to_string())?;
    ///
    /// if let Some(value) = storage.get_mut(position) {
    ///     value.push_str(", World!");
    /// }
    ///
    /// assert_eq!(storage[position], "Hello, World!");
    /// # Ok::<(), bucket_storage::Error>(())
    /// ```
    #[must_use]
    pub fn get_mut(&mut self, position: Position) -> Option<&mut T> {
        let block_index = self.lookup(position)?;

        self.blocks.get_mut(block_index)?.get_mut(position.index())
    }

    /// Iterates over shared references to the elements in traversal order.
    pub fn iter(&self) -> Iter<'_, T> {
        Iter::new(&self.blocks, self.len)
    }

    /// Iterates over exclusive references to the elements in traversal order.
    pub fn iter_mut(&mut self) -> IterMut<'_, T> {
        IterMut::new(&mut self.blocks, self.len)
    }

    fn allocate_block(&mut self) -> Result<()> {
        let block_serial = self.next_block_serial;
        let block = SlotBlock::try_new(block_serial, self.block_capacity.get())?;

        // If the directory cannot grow, the new block is dropped on return and nothing changes.
        self.blocks.try_reserve(1)?;
        self.blocks.push(block);

        self.next_block_serial = self
            .next_block_serial
            .checked_add(1)
            .expect("a storage cannot allocate 2^64 blocks in any realistic lifetime");

        debug!(
            storage_id = self.storage_id,
            block_serial,
            blocks = self.blocks.len(),
            "allocated block"
        );

        Ok(())
    }

    fn release_block(&mut self, block_index: usize) {
        let block = self.blocks.remove(block_index);

        debug_assert!(block.is_empty(), "released a block that still holds elements");

        debug!(
            storage_id = self.storage_id,
            block_serial = block.serial(),
            blocks = self.blocks.len(),
            "released empty block"
        );
    }

    /// Directory index of the block with the given serial, if it has not been released.
    fn find_block(&self, block_serial: u64) -> Option<usize> {
        self.blocks
            .binary_search_by_key(&block_serial, SlotBlock::serial)
            .ok()
    }

    /// Directory index of the block `position` refers to, or `None` if the position does not
    /// refer to a block of this storage that still exists.
    fn lookup(&self, position: Position) -> Option<usize> {
        if position.storage_id() != self.storage_id {
            return None;
        }

        self.find_block(position.block_serial()?)
    }

    /// Directory index of the block `position` refers to, or `None` for the end position.
    ///
    /// # Panics
    ///
    /// Panics if the position is foreign or refers to a released block.
    fn directory_index(&self, position: Position) -> Option<usize> {
        assert!(
            position.storage_id() == self.storage_id,
            "position was not issued by this storage of {}",
            type_name::<T>()
        );

        let block_serial = position.block_serial()?;

        let Some(block_index) = self.find_block(block_serial) else {
            panic!(
                "position refers to block {block_serial} which has been released from storage of {}",
                type_name::<T>()
            );
        };

        Some(block_index)
    }

    #[cfg_attr(test, mutants::skip)] // This is essentially test logic, mutation is meaningless.
    #[cfg(debug_assertions)]
    pub(crate) fn integrity_check(&self) {
        let mut observed_len: usize = 0;

        for block in &self.blocks {
            block.integrity_check();

            assert!(
                block.capacity() == self.block_capacity.get(),
                "block {} has capacity {} but storage of {} uses blocks of {}",
                block.serial(),
                block.capacity(),
                type_name::<T>(),
                self.block_capacity
            );

            assert!(
                block.serial() < self.next_block_serial,
                "block {} has a serial that was never issued by storage of {}",
                block.serial(),
                type_name::<T>()
            );

            observed_len = observed_len
                .checked_add(block.active_count())
                .expect("element count cannot exceed the slot count, which fits in memory");
        }

        assert!(
            self.blocks
                .is_sorted_by(|earlier, later| earlier.serial() < later.serial()),
            "block serials are not strictly increasing along the directory of storage of {}",
            type_name::<T>()
        );

        assert!(
            self.len == observed_len,
            "self.len {} does not match the observed element count {} in storage of {}",
            self.len,
            observed_len,
            type_name::<T>()
        );
    }
}

impl<T> Default for BucketStorage<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Clone> Clone for BucketStorage<T> {
    /// Creates an independent deep copy with the same block layout, slot for slot.
    ///
    /// The copy has its own identity, so positions issued by `self` are foreign to it, even
    /// though the same element sits at the equivalent slot.
    fn clone(&self) -> Self {
        Self {
            blocks: self.blocks.clone(),
            len: self.len,
            block_capacity: self.block_capacity,
            storage_id: next_storage_id(),
            next_block_serial: self.next_block_serial,
            drop_policy: self.drop_policy,
        }
    }

    /// Replaces the contents of `self` with a deep copy of `source`.
    ///
    /// The copy is fully built before `self` is touched, so if cloning an element panics, `self`
    /// is left unchanged.
    fn clone_from(&mut self, source: &Self) {
        let mut previous = source.clone();
        self.swap(&mut previous);
        previous.clear();
    }
}

impl<T> Drop for BucketStorage<T> {
    fn drop(&mut self) {
        let remaining = self.len;

        self.blocks.clear();

        // We check at the end so the memory is released first. If we are already panicking,
        // we do not want to panic again because that would obscure the original panic.
        if self.drop_policy == DropPolicy::MustNotDropItems && !thread::panicking() {
            assert!(
                remaining == 0,
                "dropped a storage of {} holding {remaining} elements with a policy that says it must be empty when dropped",
                type_name::<T>()
            );
        }
    }
}

impl<T> Index<Position> for BucketStorage<T> {
    type Output = T;

    fn index(&self, position: Position) -> &Self::Output {
        self.get(position)
            .expect("position was not associated with an element in the storage")
    }
}

impl<T> IndexMut<Position> for BucketStorage<T> {
    fn index_mut(&mut self, position: Position) -> &mut Self::Output {
        self.get_mut(position)
            .expect("position was not associated with an element in the storage")
    }
}

impl<'s, T> IntoIterator for &'s BucketStorage<T> {
    type Item = &'s T;
    type IntoIter = Iter<'s, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<'s, T> IntoIterator for &'s mut BucketStorage<T> {
    type Item = &'s mut T;
    type IntoIter = IterMut<'s, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter_mut()
    }
}
