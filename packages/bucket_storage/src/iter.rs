use std::iter::FusedIterator;
use std::{mem, slice};

use crate::{Slot, SlotBlock};

/// Iterator over shared references to the elements of a [`BucketStorage`][crate::BucketStorage].
///
/// Elements are yielded in traversal order: blocks in directory order, slots in index order,
/// skipping empty slots. This is the same order in which stepping forward from `begin()`
/// visits them.
///
/// Created by [`BucketStorage::iter()`][crate::BucketStorage::iter].
///
/// # Example
///
/// ```rust
/// use bucket_storage::BucketStorage;
///
/// let mut storage = BucketStorage::<u32>::new();
/// storage.insert(1)?;
/// storage.insert(2)?;
///
/// let sum: u32 = storage.iter().sum();
/// assert_eq!(sum, 3);
/// # Ok::<(), bucket_storage::Error>(())
/// ```
#[derive(Debug)]
pub struct Iter<'s, T> {
    blocks: slice::Iter<'s, SlotBlock<T>>,

    // Slots of the block currently consumed from the front.
    front: slice::Iter<'s, Slot<T>>,

    // Slots of the block currently consumed from the back.
    back: slice::Iter<'s, Slot<T>>,

    // Number of occupied slots not yet yielded from either end.
    remaining: usize,
}

impl<'s, T> Iter<'s, T> {
    pub(crate) fn new(blocks: &'s [SlotBlock<T>], len: usize) -> Self {
        Self {
            blocks: blocks.iter(),
            front: slice::Iter::default(),
            back: slice::Iter::default(),
            remaining: len,
        }
    }
}

impl<'s, T> Iterator for Iter<'s, T> {
    type Item = &'s T;

    fn next(&mut self) -> Option<Self::Item> {
        while self.remaining > 0 {
            if let Some(slot) = self.front.next() {
                if let Some(value) = slot.value() {
                    // Will not wrap because the loop condition guarantees remaining > 0.
                    self.remaining = self.remaining.wrapping_sub(1);
                    return Some(value);
                }

                continue;
            }

            self.front = match self.blocks.next() {
                Some(block) => block.slots().iter(),
                None if !self.back.as_slice().is_empty() => mem::take(&mut self.back),
                None => return None,
            };
        }

        None
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<T> DoubleEndedIterator for Iter<'_, T> {
    fn next_back(&mut self) -> Option<Self::Item> {
        while self.remaining > 0 {
            if let Some(slot) = self.back.next_back() {
                if let Some(value) = slot.value() {
                    // Will not wrap because the loop condition guarantees remaining > 0.
                    self.remaining = self.remaining.wrapping_sub(1);
                    return Some(value);
                }

                continue;
            }

            self.back = match self.blocks.next_back() {
                Some(block) => block.slots().iter(),
                None if !self.front.as_slice().is_empty() => mem::take(&mut self.front),
                None => return None,
            };
        }

        None
    }
}

impl<T> ExactSizeIterator for Iter<'_, T> {
    fn len(&self) -> usize {
        self.remaining
    }
}

// Once we return None, we will keep returning None.
impl<T> FusedIterator for Iter<'_, T> {}

/// Iterator over exclusive references to the elements of a
/// [`BucketStorage`][crate::BucketStorage].
///
/// Elements are yielded in the same order as by [`Iter`].
///
/// Created by [`BucketStorage::iter_mut()`][crate::BucketStorage::iter_mut].
///
/// # Example
///
/// ```rust
/// use bucket_storage::BucketStorage;
///
/// let mut storage = BucketStorage::<u32>::new();
/// let position = storage.insert(1)?;
///
/// for value in storage.iter_mut() {
///     *value += 10;
/// }
///
/// assert_eq!(storage.get(position), Some(&11));
/// # Ok::<(), bucket_storage::Error>(())
/// ```
#[derive(Debug)]
pub struct IterMut<'s, T> {
    blocks: slice::IterMut<'s, SlotBlock<T>>,
    front: slice::IterMut<'s, Slot<T>>,
    back: slice::IterMut<'s, Slot<T>>,
    remaining: usize,
}

impl<'s, T> IterMut<'s, T> {
    pub(crate) fn new(blocks: &'s mut [SlotBlock<T>], len: usize) -> Self {
        Self {
            blocks: blocks.iter_mut(),
            front: slice::IterMut::default(),
            back: slice::IterMut::default(),
            remaining: len,
        }
    }
}

impl<'s, T> Iterator for IterMut<'s, T> {
    type Item = &'s mut T;

    fn next(&mut self) -> Option<Self::Item> {
        while self.remaining > 0 {
            if let Some(slot) = self.front.next() {
                if let Some(value) = slot.value_mut() {
                    // Will not wrap because the loop condition guarantees remaining > 0.
                    self.remaining = self.remaining.wrapping_sub(1);
                    return Some(value);
                }

                continue;
            }

            self.front = match self.blocks.next() {
                Some(block) => block.slots_mut().iter_mut(),
                None if !self.back.as_slice().is_empty() => mem::take(&mut self.back),
                None => return None,
            };
        }

        None
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<T> DoubleEndedIterator for IterMut<'_, T> {
    fn next_back(&mut self) -> Option<Self::Item> {
        while self.remaining > 0 {
            if let Some(slot) = self.back.next_back() {
                if let Some(value) = slot.value_mut() {
                    // Will not wrap because the loop condition guarantees remaining > 0.
                    self.remaining = self.remaining.wrapping_sub(1);
                    return Some(value);
                }

                continue;
            }

            self.back = match self.blocks.next_back() {
                Some(block) => block.slots_mut().iter_mut(),
                None if !self.front.as_slice().is_empty() => mem::take(&mut self.front),
                None => return None,
            };
        }

        None
    }
}

impl<T> ExactSizeIterator for IterMut<'_, T> {
    fn len(&self) -> usize {
        self.remaining
    }
}

impl<T> FusedIterator for IterMut<'_, T> {}
