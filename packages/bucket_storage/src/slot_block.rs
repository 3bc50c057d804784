use std::any::type_name;
use std::collections::TryReserveError;
use std::mem;

/// A fixed-capacity chunk of element slots, the unit of allocation of a `BucketStorage`.
///
/// Every slot is either occupied by a live element or empty. The block keeps a count of its
/// occupied slots so the owning storage can tell when the block holds no live data and can be
/// released. The block itself never decides where an element goes - the storage drives all
/// occupancy changes through [`place()`][Self::place] and [`vacate()`][Self::vacate].
///
/// Dropping the block drops every element still inside it.
#[derive(Clone, Debug)]
pub(crate) struct SlotBlock<T> {
    /// Identifies the block within its storage. Serials grow strictly with allocation order,
    /// which for a storage that only appends blocks means serial order is directory order.
    serial: u64,

    slots: Box<[Slot<T>]>,

    /// Number of slots in `slots` that are `Occupied`.
    active_count: usize,
}

/// One element-sized storage location within a block.
#[derive(Clone, Debug)]
pub(crate) enum Slot<T> {
    Occupied { value: T },

    Empty,
}

impl<T> Slot<T> {
    fn is_occupied(&self) -> bool {
        matches!(self, Self::Occupied { .. })
    }

    pub(crate) fn value(&self) -> Option<&T> {
        match self {
            Self::Occupied { value } => Some(value),
            Self::Empty => None,
        }
    }

    pub(crate) fn value_mut(&mut self) -> Option<&mut T> {
        match self {
            Self::Occupied { value } => Some(value),
            Self::Empty => None,
        }
    }

    fn take(&mut self) -> Option<T> {
        match mem::replace(self, Self::Empty) {
            Self::Occupied { value } => Some(value),
            Self::Empty => None,
        }
    }
}

impl<T> SlotBlock<T> {
    /// Creates a block with `capacity` empty slots.
    ///
    /// Returns an error instead of aborting if the slot array cannot be allocated, so the caller
    /// can surface the failure without having committed any change.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero.
    pub(crate) fn try_new(serial: u64, capacity: usize) -> Result<Self, TryReserveError> {
        assert!(capacity > 0, "SlotBlock must have non-zero capacity");

        let mut slots = Vec::new();
        slots.try_reserve_exact(capacity)?;
        slots.resize_with(capacity, || Slot::Empty);

        Ok(Self {
            serial,
            slots: slots.into_boxed_slice(),
            active_count: 0,
        })
    }

    #[must_use]
    pub(crate) fn serial(&self) -> u64 {
        self.serial
    }

    #[must_use]
    #[cfg(any(test, debug_assertions))]
    pub(crate) fn capacity(&self) -> usize {
        self.slots.len()
    }

    #[must_use]
    #[cfg(any(test, debug_assertions))]
    pub(crate) fn active_count(&self) -> usize {
        self.active_count
    }

    #[must_use]
    pub(crate) fn is_empty(&self) -> bool {
        self.active_count == 0
    }

    #[must_use]
    #[cfg(test)]
    pub(crate) fn is_occupied(&self, index: usize) -> bool {
        self.slots.get(index).is_some_and(Slot::is_occupied)
    }

    /// Index of the first empty slot, scanning from the start of the block.
    #[must_use]
    pub(crate) fn first_empty(&self) -> Option<usize> {
        self.slots.iter().position(|slot| !slot.is_occupied())
    }

    /// Index of the first occupied slot at or after `from`.
    #[must_use]
    pub(crate) fn first_occupied_from(&self, from: usize) -> Option<usize> {
        let candidates = self.slots.get(from..)?;

        candidates
            .iter()
            .position(Slot::is_occupied)
            .map(|offset| {
                from.checked_add(offset)
                    .expect("offset is bounded by the slot count, so this cannot overflow")
            })
    }

    /// Index of the last occupied slot before `before`.
    #[must_use]
    pub(crate) fn last_occupied_before(&self, before: usize) -> Option<usize> {
        let candidates = self.slots.get(..before.min(self.slots.len()))?;

        candidates.iter().rposition(Slot::is_occupied)
    }

    #[must_use]
    pub(crate) fn get(&self, index: usize) -> Option<&T> {
        self.slots.get(index).and_then(Slot::value)
    }

    #[must_use]
    pub(crate) fn get_mut(&mut self, index: usize) -> Option<&mut T> {
        self.slots.get_mut(index).and_then(Slot::value_mut)
    }

    /// Moves `value` into the empty slot at `index` and marks it occupied.
    ///
    /// # Panics
    ///
    /// Panics if the index is out of bounds or the slot is already occupied.
    pub(crate) fn place(&mut self, index: usize, value: T) -> &mut T {
        let Some(slot) = self.slots.get_mut(index) else {
            panic!(
                "place({index}) index out of bounds in block of {}",
                type_name::<T>()
            );
        };

        assert!(
            !slot.is_occupied(),
            "place({index}) slot was already occupied in block of {}",
            type_name::<T>()
        );

        *slot = Slot::Occupied { value };

        self.active_count = self
            .active_count
            .checked_add(1)
            .expect("guarded by the slot being empty, so the count is below capacity");

        slot.value_mut()
            .expect("we just placed a value into this slot")
    }

    /// Marks the slot at `index` empty and hands back the element it held, leaving the
    /// decision of when to drop it to the caller.
    ///
    /// Returns `None` without changing anything if the slot is already empty or out of bounds.
    pub(crate) fn vacate(&mut self, index: usize) -> Option<T> {
        let value = self.slots.get_mut(index)?.take()?;

        self.active_count = self
            .active_count
            .checked_sub(1)
            .expect("the slot was occupied, so the count must be non-zero");

        Some(value)
    }

    /// Moves every element out of the block in slot order, leaving all slots empty.
    ///
    /// The returned iterator must be consumed to the end, otherwise the untaken elements are
    /// left in place while the block already counts itself as empty.
    pub(crate) fn drain(&mut self) -> impl Iterator<Item = T> + '_ {
        self.active_count = 0;

        self.slots.iter_mut().filter_map(Slot::take)
    }

    pub(crate) fn slots(&self) -> &[Slot<T>] {
        &self.slots
    }

    pub(crate) fn slots_mut(&mut self) -> &mut [Slot<T>] {
        &mut self.slots
    }

    #[cfg_attr(test, mutants::skip)] // This is essentially test logic, mutation is meaningless.
    #[cfg(debug_assertions)]
    pub(crate) fn integrity_check(&self) {
        let observed_occupied_count = self.slots.iter().filter(|slot| slot.is_occupied()).count();

        assert!(
            self.active_count == observed_occupied_count,
            "block {} active_count {} does not match the observed occupied count {} in block of {}",
            self.serial,
            self.active_count,
            observed_occupied_count,
            type_name::<T>()
        );
    }
}

#[cfg(test)]
mod tests {
    #![allow(
        clippy::arithmetic_side_effects,
        clippy::indexing_slicing,
        reason = "we do not need to worry about these things when writing test code"
    )]

    use std::cell::Cell;
    use std::rc::Rc;

    use super::*;

    fn block<T>(capacity: usize) -> SlotBlock<T> {
        SlotBlock::try_new(0, capacity).expect("tiny blocks always fit in memory")
    }

    #[test]
    fn new_block_is_all_empty() {
        let block = block::<u32>(4);

        assert_eq!(block.capacity(), 4);
        assert_eq!(block.active_count(), 0);
        assert!(block.is_empty());
        assert_eq!(block.first_empty(), Some(0));
        assert_eq!(block.first_occupied_from(0), None);

        for index in 0..4 {
            assert!(!block.is_occupied(index));
            assert!(block.get(index).is_none());
        }
    }

    #[test]
    fn place_and_vacate_track_active_count() {
        let mut block = block::<u32>(3);

        *block.place(0, 10) += 1;
        _ = block.place(2, 30);

        assert_eq!(block.active_count(), 2);
        assert_eq!(block.get(0), Some(&11));
        assert_eq!(block.get(2), Some(&30));
        assert_eq!(block.first_empty(), Some(1));

        assert_eq!(block.vacate(0), Some(11));
        assert_eq!(block.active_count(), 1);
        assert_eq!(block.first_empty(), Some(0));

        // A second vacate of the same slot is a no-op.
        assert_eq!(block.vacate(0), None);
        assert_eq!(block.active_count(), 1);

        #[cfg(debug_assertions)]
        block.integrity_check();
    }

    #[test]
    fn full_block_has_no_empty_slot() {
        let mut block = block::<u32>(2);

        _ = block.place(0, 1);
        _ = block.place(1, 2);

        assert_eq!(block.first_empty(), None);
    }

    #[test]
    fn occupied_scans_respect_bounds() {
        let mut block = block::<char>(5);

        _ = block.place(1, 'a');
        _ = block.place(3, 'b');

        assert_eq!(block.first_occupied_from(0), Some(1));
        assert_eq!(block.first_occupied_from(2), Some(3));
        assert_eq!(block.first_occupied_from(4), None);
        assert_eq!(block.first_occupied_from(99), None);

        assert_eq!(block.last_occupied_before(5), Some(3));
        assert_eq!(block.last_occupied_before(3), Some(1));
        assert_eq!(block.last_occupied_before(1), None);
        assert_eq!(block.last_occupied_before(99), Some(3));
    }

    #[test]
    fn drain_yields_in_slot_order_and_empties() {
        let mut block = block::<u32>(4);

        _ = block.place(3, 3);
        _ = block.place(1, 1);

        let drained: Vec<_> = block.drain().collect();

        assert_eq!(drained, vec![1, 3]);
        assert!(block.is_empty());
        assert_eq!(block.first_occupied_from(0), None);

        #[cfg(debug_assertions)]
        block.integrity_check();
    }

    #[test]
    fn slots_expose_occupancy_layout() {
        let mut block = block::<u32>(4);

        _ = block.place(0, 5);
        _ = block.place(2, 7);

        let layout: Vec<_> = block.slots().iter().map(|slot| slot.value().copied()).collect();
        assert_eq!(layout, vec![Some(5), None, Some(7), None]);

        for value in block.slots_mut().iter_mut().filter_map(Slot::value_mut) {
            *value *= 10;
        }

        assert_eq!(block.get(0), Some(&50));
        assert_eq!(block.get(2), Some(&70));
    }

    #[test]
    fn clone_copies_layout_slot_for_slot() {
        let mut original = block::<String>(3);

        _ = original.place(1, "middle".to_string());

        let mut copy = original.clone();
        copy.get_mut(1).unwrap().push('!');

        assert_eq!(copy.serial(), original.serial());
        assert_eq!(copy.active_count(), 1);
        assert!(!copy.is_occupied(0));
        assert_eq!(copy.get(1).map(String::as_str), Some("middle!"));
        assert_eq!(original.get(1).map(String::as_str), Some("middle"));
    }

    #[test]
    fn drop_releases_remaining_elements() {
        struct Droppable {
            drops: Rc<Cell<usize>>,
        }

        impl Drop for Droppable {
            fn drop(&mut self) {
                self.drops.set(self.drops.get() + 1);
            }
        }

        let drops = Rc::new(Cell::new(0));
        let mut block = block::<Droppable>(3);

        _ = block.place(
            0,
            Droppable {
                drops: Rc::clone(&drops),
            },
        );
        _ = block.place(
            2,
            Droppable {
                drops: Rc::clone(&drops),
            },
        );

        drop(block);

        assert_eq!(drops.get(), 2);
    }

    #[test]
    #[should_panic]
    fn place_into_occupied_panics() {
        let mut block = block::<u32>(2);

        _ = block.place(0, 1);
        _ = block.place(0, 2);
    }

    #[test]
    #[should_panic]
    fn place_out_of_bounds_panics() {
        let mut block = block::<u32>(2);

        _ = block.place(2, 1);
    }

    #[test]
    #[should_panic]
    fn zero_capacity_is_panic() {
        drop(SlotBlock::<u32>::try_new(0, 0));
    }

    #[test]
    fn huge_capacity_is_allocation_error() {
        let result = SlotBlock::<u64>::try_new(0, usize::MAX);

        assert!(result.is_err());
    }
}
