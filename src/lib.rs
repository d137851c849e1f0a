//! chain-hashmap: a single-threaded hash map built on separate chaining,
//! with cached per-entry hashes and stop-the-world doubling resize.
//!
//! Internal Design:
//!
//! Summary
//! - Storage: a `Vec` of buckets; each bucket is a `Vec` of entries
//!   `(key, hash, value)`. An entry lives in bucket `hash % capacity`.
//! - Lookup: hash the query once, reduce it to a bucket index, then scan
//!   the bucket comparing cached hashes first and keys second.
//! - Growth: before inserting a new key, if `(len + 1) / capacity` would
//!   exceed 3/4, the bucket array doubles and every entry migrates by its
//!   cached hash. Overwrites of existing keys never grow the table.
//!
//! Constraints
//! - Single-threaded: the map is `!Send`/`!Sync`.
//! - Keys need only `Hash + Eq`; queries may use any `Borrow` form.
//! - Capacity is always at least 1; zero is rejected at construction.
//! - Load factor is fixed at 3/4 and compared with integer arithmetic.
//!
//! Hasher and rehashing invariants
//! - `K: Hash` runs exactly once per inserted key, and once per lookup.
//!   Resize never calls into user code.
//! - `Hash` and `Eq` run before any structural change, so a panicking key
//!   impl leaves the map as it was.
//!
//! Reentrancy policy
//! - Each operation enters a debug-only reentrancy section. A key whose
//!   `Eq`/`Hash` reaches back into the same map panics in debug builds.
//! - Removed entries are dropped after the section ends; destructors of
//!   keys and values may use the map freely.
//!
//! Iteration
//! - `keys`, `values`, `items` walk buckets in index order through an
//!   explicit cursor. Order is a layout artifact and changes across
//!   resizes and removals. Iterators borrow the map, so mutation during
//!   iteration is rejected at compile time.
//!
//! Logging
//! - Resizes emit a `tracing` debug event; `clear` emits a trace event.
//!   The crate never installs a subscriber.
//!
//! Notes and non-goals
//! - No shrinking; `clear` keeps the current capacity.
//! - No incremental rehash; a resize is O(n) but amortized O(1).
//! - No serialization.

mod chain_map;
#[cfg(test)]
mod chain_map_proptest;
pub mod error;
pub mod iter;
mod reentrancy;

// Public surface
pub use chain_map::{ChainHashMap, DEFAULT_CAPACITY};
pub use error::{MapError, Result};
