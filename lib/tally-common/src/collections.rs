//! Collection types backed by the fast hasher.

use crate::hash::FastBuildHasher;

/// A concurrent hash map based on `papaya` ([`HashMap`][papaya::HashMap]) using
/// [`FastHasher`][crate::hash::FastHasher].
pub type FastConcurrentHashMap<K, V> = papaya::HashMap<K, V, FastBuildHasher>;

/// A hash map with stable insertion order based on `indexmap` ([`IndexMap`][indexmap::IndexMap]) using
/// [`FastHasher`][crate::hash::FastHasher].
///
/// Re-inserting an existing key replaces its value but keeps the position of the first insertion.
pub type FastIndexMap<K, V> = indexmap::IndexMap<K, V, FastBuildHasher>;
