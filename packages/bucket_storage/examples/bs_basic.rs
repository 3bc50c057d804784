//! Basic usage of the `bucket_storage` crate:
//!
//! * Creating a storage.
//! * Adding elements.
//! * Retrieving elements.
//! * Stepping through elements while removing some of them.
//! * Compacting the storage.

use std::num::NonZero;

use bucket_storage::BucketStorage;

fn main() -> Result<(), bucket_storage::Error> {
    let mut storage = BucketStorage::<String>::with_block_capacity(NonZero::new(4).unwrap());

    // Inserting an element gives you a position that you can later use to look up the element.
    let alice = storage.insert("Alice".to_string())?;
    let bob = storage.insert("Bob".to_string())?;
    let charlie = storage.insert("Charlie".to_string())?;

    for name in ["Dave", "Eve", "Frank", "Grace"] {
        storage.insert(name.to_string())?;
    }

    println!(
        "Storage contains {} elements in {} blocks, with a capacity of {}",
        storage.len(),
        storage.block_count(),
        storage.capacity()
    );

    println!("Retrieved element: {}", storage[alice]);

    storage.erase(bob)?;

    // Other positions are unaffected by the removal.
    println!("Retrieved element after removal: {}", storage[charlie]);

    // The next insert fills the gap that 'Bob' left behind.
    let heidi = storage.insert("Heidi".to_string())?;
    println!(
        "Heidi comes right after Alice: {}",
        storage.step_forward(alice) == heidi
    );

    // Positions do not borrow the storage, so we can erase while stepping through it.
    let mut position = storage.begin();
    while !position.is_end() {
        let next = storage.step_forward(position);

        if storage[position].len() <= 3 {
            println!("Removing {}", storage[position]);
            storage.erase(position)?;
        }

        position = next;
    }

    storage.shrink_to_fit();

    println!(
        "After compaction: {} elements in {} blocks: {}",
        storage.len(),
        storage.block_count(),
        storage.iter().map(String::as_str).collect::<Vec<_>>().join(", ")
    );

    Ok(())
}
