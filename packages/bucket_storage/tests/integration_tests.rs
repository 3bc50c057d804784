//! Integration tests for the `bucket_storage` package.
//!
//! These tests exercise `BucketStorage` purely through its public API, including traversal while
//! mutating, moving storages between threads and behavior after whole-container operations.

use std::collections::BTreeMap;
use std::num::NonZero;
use std::sync::{Arc, Mutex};
use std::thread;

use bucket_storage::{BucketStorage, DropPolicy, Error, Position};

fn storage<T>(block_capacity: usize) -> BucketStorage<T> {
    BucketStorage::with_block_capacity(NonZero::new(block_capacity).unwrap())
}

#[test]
fn insert_then_traverse_in_order_without_erasures() {
    let mut storage = storage::<u32>(4);

    for value in 0..17 {
        storage.insert(value).unwrap();
    }

    assert_eq!(storage.len(), 17);
    assert_eq!(storage.capacity(), 20);
    assert_eq!(storage.iter().copied().collect::<Vec<_>>(), (0..17).collect::<Vec<_>>());
}

#[test]
fn erase_while_stepping_removes_selected_elements() {
    let mut storage = storage::<u32>(3);

    for value in 0..20 {
        storage.insert(value).unwrap();
    }

    let mut position = storage.begin();

    while !position.is_end() {
        let next = storage.step_forward(position);

        if storage[position] % 3 != 0 {
            storage.erase(position).unwrap();
        }

        position = next;
    }

    assert_eq!(
        storage.iter().copied().collect::<Vec<_>>(),
        vec![0, 3, 6, 9, 12, 15, 18]
    );
    assert_eq!(storage.len(), 7);

    // Every block still holds exactly its multiple of three, nothing was released.
    assert_eq!(storage.block_count(), 7);
}

#[test]
fn erase_all_releases_every_block() {
    let mut storage = storage::<String>(2);

    let positions: Vec<_> = (0..9)
        .map(|value| storage.insert(value.to_string()).unwrap())
        .collect();

    for position in positions {
        storage.erase(position).unwrap();
    }

    assert!(storage.is_empty());
    assert_eq!(storage.capacity(), 0);
    assert_eq!(storage.block_count(), 0);
    assert_eq!(storage.begin(), storage.end());
}

#[test]
fn positions_survive_unrelated_churn() {
    let mut storage = storage::<u64>(5);
    let mut expected = BTreeMap::new();

    for value in 0..100_u64 {
        let position = storage.insert(value).unwrap();

        // Hold on to every seventh element, let the rest come and go.
        if value % 7 == 0 {
            expected.insert(value, position);
        } else if value % 2 == 0 {
            storage.erase(position).unwrap();
        }
    }

    for (value, position) in &expected {
        assert_eq!(storage.get(*position), Some(value));
    }
}

#[test]
fn matches_reference_model_under_mixed_operations() {
    let mut storage = storage::<u32>(4);

    // Model: position -> value, ordered by position within this storage.
    let mut model: Vec<(Position, u32)> = Vec::new();

    for step in 0..300_u32 {
        if step % 5 == 3 && !model.is_empty() {
            let victim = (usize::try_from(step).unwrap() * 31) % model.len();
            let (position, _) = model.remove(victim);
            storage.erase(position).unwrap();
        } else {
            let position = storage.insert(step).unwrap();
            model.push((position, step));
        }

        if step % 50 == 0 {
            storage.shrink_to_fit();

            // All positions moved, so rebuild the model from traversal.
            model.clear();
            let mut position = storage.begin();
            while !position.is_end() {
                model.push((position, storage[position]));
                position = storage.step_forward(position);
            }
        }
    }

    model.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap());

    let from_model: Vec<_> = model.iter().map(|(_, value)| *value).collect();
    let from_storage: Vec<_> = storage.iter().copied().collect();

    assert_eq!(from_storage, from_model);
    assert_eq!(storage.len(), model.len());
    assert!(storage.len() <= storage.capacity());
}

#[test]
fn error_reporting_through_public_api() {
    let mut storage = storage::<u32>(2);
    let mut other = crate::storage::<u32>(2);

    let position = storage.insert(1).unwrap();
    _ = storage.insert(2).unwrap();
    let foreign = other.insert(3).unwrap();

    let end = storage.end();
    assert!(matches!(storage.erase(end), Err(Error::InvalidPosition)));
    assert!(matches!(storage.erase(foreign), Err(Error::ForeignPosition)));

    storage.erase(position).unwrap();

    let error = storage.erase(position).unwrap_err();
    assert!(matches!(error, Error::DoubleErase { index: 0 }));
    assert_eq!(error.to_string(), "slot 0 was already erased");
}

#[test]
fn storage_can_be_moved_between_threads() {
    let mut storage = storage::<String>(4);
    let position = storage.insert("moved".to_string()).unwrap();

    let handle = thread::spawn(move || {
        let extra = storage.insert("extra".to_string()).unwrap();
        assert_eq!(storage[position], "moved");
        assert_eq!(storage[extra], "extra");
        storage
    });

    let storage = handle.join().unwrap();

    assert_eq!(storage.len(), 2);
    assert_eq!(storage[position], "moved");
}

#[test]
fn storage_can_be_shared_behind_mutex() {
    let storage = Arc::new(Mutex::new(storage::<usize>(8)));

    let handles: Vec<_> = (0..4)
        .map(|thread_index| {
            let storage = Arc::clone(&storage);
            thread::spawn(move || {
                for value in 0..25 {
                    storage
                        .lock()
                        .unwrap()
                        .insert(thread_index * 100 + value)
                        .unwrap();
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }

    let storage = storage.lock().unwrap();
    assert_eq!(storage.len(), 100);
    assert_eq!(storage.iter().count(), 100);
}

#[test]
fn take_and_move_from_transfer_contents() {
    let mut first = storage::<u32>(2);
    let position = first.insert(7).unwrap();

    let mut second = first.take();
    assert_eq!(second[position], 7);
    assert!(first.is_empty());

    first.move_from(&mut second);
    assert_eq!(first[position], 7);
    assert!(second.is_empty());
    assert_eq!(second.capacity(), 0);

    // Both remain usable.
    _ = second.insert(1).unwrap();
    _ = first.insert(2).unwrap();
    assert_eq!(first.len(), 2);
    assert_eq!(second.len(), 1);
}

#[test]
fn clone_is_deep_and_independent() {
    let mut original = storage::<Vec<u8>>(3);
    let position = original.insert(vec![1, 2, 3]).unwrap();

    let mut copy = original.clone();

    for bytes in &mut copy {
        bytes.push(4);
    }

    assert_eq!(original[position], vec![1, 2, 3]);
    assert_eq!(copy.iter().next(), Some(&vec![1, 2, 3, 4]));
}

#[test]
fn must_not_drop_policy_is_satisfied_by_erasing_everything() {
    let mut storage = BucketStorage::<u32>::builder()
        .block_capacity(NonZero::new(2).unwrap())
        .drop_policy(DropPolicy::MustNotDropItems)
        .build();

    let positions: Vec<_> = (0..5).map(|value| storage.insert(value).unwrap()).collect();

    for position in positions {
        storage.erase(position).unwrap();
    }

    drop(storage);
}

#[test]
fn reverse_stepping_visits_everything() {
    let mut storage = storage::<u32>(3);

    let positions: Vec<_> = (0..10).map(|value| storage.insert(value).unwrap()).collect();
    storage.erase(positions[0]).unwrap();
    storage.erase(positions[9]).unwrap();

    let mut visited = Vec::new();
    let mut position = storage.end();

    loop {
        position = storage.step_backward(position);
        if position.is_end() {
            break;
        }
        visited.push(storage[position]);
    }

    assert_eq!(visited, (1..9).rev().collect::<Vec<_>>());
}
