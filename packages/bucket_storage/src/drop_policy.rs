/// Determines how a [`BucketStorage`][crate::BucketStorage] treats its remaining elements
/// when the storage itself is dropped.
///
/// By default, the storage will drop its elements when it is dropped.
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
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
#[non_exhaustive]
pub enum DropPolicy {
    /// The storage will drop its elements when the storage is dropped. This is the default.
    #[default]
    MayDropItems,

    /// The storage will panic if it still contains elements when it is dropped.
    ///
    /// Emptying the storage explicitly via `clear()` is always permitted. This policy is meant
    /// for callers whose elements must be released through some external protocol before the
    /// storage goes away, where an implicit drop would indicate a bug.
    MustNotDropItems,
}
