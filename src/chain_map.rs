//! ChainHashMap: separate-chaining table with cached hashes and doubling resize.

use core::borrow::Borrow;
use core::fmt;
use core::hash::{BuildHasher, Hash};
use core::mem;
use core::ops::Index;

use hashbrown::hash_map::DefaultHashBuilder;

use crate::error::{MapError, Result};
use crate::iter::{IntoIter, Iter, IterMut, Keys, Values, ValuesMut};
use crate::reentrancy::ReentrancyCheck;

/// Bucket count used by [`ChainHashMap::new`] and [`ChainHashMap::with_hasher`].
pub const DEFAULT_CAPACITY: usize = 8;

// Maximum fill ratio len / capacity, kept as a fraction so the check is exact.
const LOAD_FACTOR_NUM: usize = 3;
const LOAD_FACTOR_DEN: usize = 4;

#[derive(Clone, Debug)]
pub(crate) struct Entry<K, V> {
    pub(crate) key: K,
    pub(crate) hash: u64,
    pub(crate) value: V,
}

/// Chain of entries whose hashes reduce to the same index.
pub(crate) type Bucket<K, V> = Vec<Entry<K, V>>;

fn empty_buckets<K, V>(capacity: usize) -> Vec<Bucket<K, V>> {
    core::iter::repeat_with(Vec::new).take(capacity).collect()
}

/// Bucket storage plus the live entry count. Never calls into `K: Hash`;
/// placement always uses the hash cached in each entry.
#[derive(Clone)]
struct Table<K, V> {
    buckets: Vec<Bucket<K, V>>,
    len: usize,
}

impl<K, V> Table<K, V> {
    fn with_capacity(capacity: usize) -> Self {
        debug_assert!(capacity > 0);
        Self {
            buckets: empty_buckets(capacity),
            len: 0,
        }
    }

    /// `None` when the bucket array cannot be allocated at all.
    fn try_with_capacity(capacity: usize) -> Option<Self> {
        let mut buckets = Vec::new();
        buckets.try_reserve_exact(capacity).ok()?;
        buckets.resize_with(capacity, Vec::new);
        Some(Self { buckets, len: 0 })
    }

    #[inline]
    fn capacity(&self) -> usize {
        self.buckets.len()
    }

    #[inline]
    fn index_of(&self, hash: u64) -> usize {
        (hash % self.capacity() as u64) as usize
    }

    /// Bucket index and position within the bucket of the entry equal to `q`.
    fn locate<Q>(&self, hash: u64, q: &Q) -> Option<(usize, usize)>
    where
        K: Borrow<Q>,
        Q: ?Sized + Eq,
    {
        let b = self.index_of(hash);
        self.buckets[b]
            .iter()
            .position(|e| e.hash == hash && e.key.borrow() == q)
            .map(|p| (b, p))
    }

    /// True when one more entry would push len / capacity past 3/4.
    #[inline]
    fn needs_grow(&self) -> bool {
        (self.len + 1) * LOAD_FACTOR_DEN > self.capacity() * LOAD_FACTOR_NUM
    }

    /// Append without a duplicate check; callers have already probed.
    fn push(&mut self, entry: Entry<K, V>) {
        let b = self.index_of(entry.hash);
        self.buckets[b].push(entry);
        self.len += 1;
    }

    fn take(&mut self, bucket: usize, pos: usize) -> Entry<K, V> {
        self.len -= 1;
        self.buckets[bucket].swap_remove(pos)
    }

    /// Double the bucket count and migrate every entry by its cached hash.
    fn grow(&mut self) {
        let old_capacity = self.capacity();
        let new_capacity = old_capacity * 2;
        let old = mem::replace(&mut self.buckets, empty_buckets(new_capacity));
        self.len = 0;
        for entry in old.into_iter().flatten() {
            self.push(entry);
        }
        tracing::debug!(old_capacity, new_capacity, len = self.len, "chain map resized");
    }
}

/// A mutable map from `K` to `V` using separate chaining.
///
/// Each bucket is a `Vec` of entries; an entry stores its key, value and
/// the key's hash computed once at insertion. The table doubles before an
/// insertion of a new key would raise `len / capacity` above 3/4.
///
/// Keys need only `Hash + Eq`. Lookups accept any borrowed form of the key,
/// so a `ChainHashMap<String, _>` can be queried with `&str`.
///
/// Iteration order follows bucket layout and is not stable across resizes
/// or removals.
pub struct ChainHashMap<K, V, S = DefaultHashBuilder> {
    hasher: S,
    table: Table<K, V>,
    reentrancy: ReentrancyCheck,
}

impl<K, V> ChainHashMap<K, V>
where
    K: Eq + Hash,
{
    /// Empty map with [`DEFAULT_CAPACITY`] buckets.
    pub fn new() -> Self {
        Self::with_hasher(Default::default())
    }

    /// Empty map with `capacity` buckets.
    ///
    /// Fails with [`MapError::InvalidCapacity`] when `capacity` is zero or
    /// too large to allocate.
    pub fn with_capacity(capacity: usize) -> Result<Self> {
        Self::with_capacity_and_hasher(capacity, Default::default())
    }
}

impl<K, V, S> Default for ChainHashMap<K, V, S>
where
    K: Eq + Hash,
    S: BuildHasher + Default,
{
    fn default() -> Self {
        Self::with_hasher(S::default())
    }
}

impl<K, V, S> ChainHashMap<K, V, S>
where
    K: Eq + Hash,
    S: BuildHasher,
{
    pub fn with_hasher(hasher: S) -> Self {
        Self {
            hasher,
            table: Table::with_capacity(DEFAULT_CAPACITY),
            reentrancy: ReentrancyCheck::new(),
        }
    }

    /// Fails with [`MapError::InvalidCapacity`] when `capacity` is zero or
    /// the bucket array for it cannot be allocated.
    pub fn with_capacity_and_hasher(capacity: usize, hasher: S) -> Result<Self> {
        let invalid = MapError::InvalidCapacity {
            requested: capacity,
        };
        if capacity == 0 {
            return Err(invalid);
        }
        let table = Table::try_with_capacity(capacity).ok_or(invalid)?;
        Ok(Self {
            hasher,
            table,
            reentrancy: ReentrancyCheck::new(),
        })
    }

    fn make_hash<Q>(&self, q: &Q) -> u64
    where
        Q: ?Sized + Hash,
    {
        self.hasher.hash_one(q)
    }

    /// Number of live entries.
    pub fn len(&self) -> usize {
        self.table.len
    }

    pub fn is_empty(&self) -> bool {
        self.table.len == 0
    }

    /// Current number of buckets.
    pub fn capacity(&self) -> usize {
        self.table.capacity()
    }

    /// Insert or overwrite. Returns the previous value when `key` was
    /// already present; its stored key and hash are left untouched.
    ///
    /// A new key may first trigger a resize that rehashes every entry.
    /// `Hash` and `Eq` run before any mutation, so a panic there leaves the
    /// map unchanged.
    pub fn set(&mut self, key: K, value: V) -> Option<V> {
        let _g = self.reentrancy.enter();
        let hash = self.make_hash(&key);
        if let Some((b, p)) = self.table.locate(hash, &key) {
            let slot = &mut self.table.buckets[b][p].value;
            return Some(mem::replace(slot, value));
        }
        if self.table.needs_grow() {
            self.table.grow();
        }
        self.table.push(Entry { key, hash, value });
        None
    }

    pub fn get<Q>(&self, q: &Q) -> Result<&V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        let _g = self.reentrancy.enter();
        let hash = self.make_hash(q);
        self.table
            .locate(hash, q)
            .map(|(b, p)| &self.table.buckets[b][p].value)
            .ok_or(MapError::KeyNotFound)
    }

    pub fn get_mut<Q>(&mut self, q: &Q) -> Result<&mut V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        let _g = self.reentrancy.enter();
        let hash = self.make_hash(q);
        match self.table.locate(hash, q) {
            Some((b, p)) => Ok(&mut self.table.buckets[b][p].value),
            None => Err(MapError::KeyNotFound),
        }
    }

    pub fn contains<Q>(&self, q: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        let _g = self.reentrancy.enter();
        let hash = self.make_hash(q);
        self.table.locate(hash, q).is_some()
    }

    /// Alias of [`contains`](Self::contains) under the std name.
    #[inline]
    pub fn contains_key<Q>(&self, q: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        self.contains(q)
    }

    // The removed entry is handed back so its Drop runs after the guard is
    // released; a value's destructor may legitimately touch this map.
    fn take_entry<Q>(&mut self, q: &Q) -> Option<Entry<K, V>>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        let _g = self.reentrancy.enter();
        let hash = self.make_hash(q);
        let (b, p) = self.table.locate(hash, q)?;
        Some(self.table.take(b, p))
    }

    /// Remove the entry for `q`, failing with [`MapError::KeyNotFound`] if
    /// there is none.
    pub fn delete<Q>(&mut self, q: &Q) -> Result<()>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        self.take_entry(q)
            .map(drop)
            .ok_or(MapError::KeyNotFound)
    }

    /// Remove the entry for `q` and return its value.
    ///
    /// When the key is absent, `default` is returned if it is `Some`;
    /// otherwise the call fails with [`MapError::KeyNotFound`].
    pub fn pop<Q>(&mut self, q: &Q, default: Option<V>) -> Result<V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        match self.take_entry(q) {
            Some(entry) => Ok(entry.value),
            None => default.ok_or(MapError::KeyNotFound),
        }
    }

    /// Std-style removal: `Some(value)` if the key was present.
    pub fn remove<Q>(&mut self, q: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        self.take_entry(q).map(|e| e.value)
    }

    /// Drop every entry. Capacity is kept.
    pub fn clear(&mut self) {
        let old = {
            let _g = self.reentrancy.enter();
            let capacity = self.table.capacity();
            let old = mem::replace(&mut self.table, Table::with_capacity(capacity));
            tracing::trace!(capacity, dropped = old.len, "chain map cleared");
            old
        };
        drop(old);
    }

    /// `set` every pair produced by `other`, in its order.
    pub fn update<I>(&mut self, other: I)
    where
        I: IntoIterator<Item = (K, V)>,
    {
        for (k, v) in other {
            self.set(k, v);
        }
    }
}

impl<K, V, S> ChainHashMap<K, V, S> {
    /// `(key, value)` pairs in bucket order.
    pub fn items(&self) -> Iter<'_, K, V> {
        Iter::new(&self.table.buckets, self.table.len)
    }

    /// Same as [`items`](Self::items).
    pub fn iter(&self) -> Iter<'_, K, V> {
        self.items()
    }

    pub fn iter_mut(&mut self) -> IterMut<'_, K, V> {
        IterMut::new(&mut self.table.buckets, self.table.len)
    }

    pub fn keys(&self) -> Keys<'_, K, V> {
        Keys {
            inner: self.items(),
        }
    }

    pub fn values(&self) -> Values<'_, K, V> {
        Values {
            inner: self.items(),
        }
    }

    pub fn values_mut(&mut self) -> ValuesMut<'_, K, V> {
        ValuesMut {
            inner: self.iter_mut(),
        }
    }
}

impl<K, V, S> Clone for ChainHashMap<K, V, S>
where
    K: Clone,
    V: Clone,
    S: Clone,
{
    fn clone(&self) -> Self {
        Self {
            hasher: self.hasher.clone(),
            table: self.table.clone(),
            reentrancy: ReentrancyCheck::new(),
        }
    }
}

impl<K, V, S> fmt::Debug for ChainHashMap<K, V, S>
where
    K: fmt::Debug,
    V: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.items()).finish()
    }
}

// Layout-independent: two maps are equal when they hold the same pairs.
impl<K, V, S> PartialEq for ChainHashMap<K, V, S>
where
    K: Eq + Hash,
    V: PartialEq,
    S: BuildHasher,
{
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len()
            && self
                .items()
                .all(|(k, v)| other.get(k).map_or(false, |ov| v == ov))
    }
}

impl<K, V, S> Eq for ChainHashMap<K, V, S>
where
    K: Eq + Hash,
    V: Eq,
    S: BuildHasher,
{
}

impl<K, Q, V, S> Index<&Q> for ChainHashMap<K, V, S>
where
    K: Eq + Hash + Borrow<Q>,
    Q: ?Sized + Hash + Eq,
    S: BuildHasher,
{
    type Output = V;

    /// Panics if the key is not present.
    fn index(&self, key: &Q) -> &V {
        match self.get(key) {
            Ok(v) => v,
            Err(e) => panic!("{e}"),
        }
    }
}

impl<K, V, S> Extend<(K, V)> for ChainHashMap<K, V, S>
where
    K: Eq + Hash,
    S: BuildHasher,
{
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        self.update(iter);
    }
}

impl<K, V, S> FromIterator<(K, V)> for ChainHashMap<K, V, S>
where
    K: Eq + Hash,
    S: BuildHasher + Default,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut map = Self::with_hasher(S::default());
        map.update(iter);
        map
    }
}

impl<K, V, S> IntoIterator for ChainHashMap<K, V, S> {
    type Item = (K, V);
    type IntoIter = IntoIter<K, V>;

    fn into_iter(self) -> IntoIter<K, V> {
        IntoIter::new(self.table.buckets, self.table.len)
    }
}

impl<'a, K, V, S> IntoIterator for &'a ChainHashMap<K, V, S> {
    type Item = (&'a K, &'a V);
    type IntoIter = Iter<'a, K, V>;

    fn into_iter(self) -> Iter<'a, K, V> {
        self.items()
    }
}

impl<'a, K, V, S> IntoIterator for &'a mut ChainHashMap<K, V, S> {
    type Item = (&'a K, &'a mut V);
    type IntoIter = IterMut<'a, K, V>;

    fn into_iter(self) -> IterMut<'a, K, V> {
        self.iter_mut()
    }
}

#[cfg(test)]
impl<K, V, S> ChainHashMap<K, V, S>
where
    K: Eq + Hash,
    S: BuildHasher,
{
    /// Structural checks: placement by cached hash, cached hash matches a
    /// fresh one, unique keys, len equals the sum of bucket lengths, and
    /// the fill ratio is at most 3/4.
    pub(crate) fn assert_invariants(&self) {
        let cap = self.table.capacity();
        assert!(cap > 0, "capacity must stay positive");
        let mut total = 0;
        for (i, bucket) in self.table.buckets.iter().enumerate() {
            for (p, e) in bucket.iter().enumerate() {
                assert_eq!(e.hash, self.make_hash(&e.key), "stale cached hash");
                assert_eq!(self.table.index_of(e.hash), i, "entry in wrong bucket");
                assert!(
                    bucket[p + 1..].iter().all(|o| o.key != e.key),
                    "duplicate key within bucket"
                );
            }
            total += bucket.len();
        }
        assert_eq!(self.table.len, total, "len out of sync with buckets");
        assert!(
            self.table.len * LOAD_FACTOR_DEN <= cap * LOAD_FACTOR_NUM,
            "load factor exceeded: {} / {}",
            self.table.len,
            cap
        );
    }

    /// Bucket index currently holding `q`, if present.
    pub(crate) fn bucket_of<Q>(&self, q: &Q) -> Option<usize>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        let hash = self.make_hash(q);
        self.table.locate(hash, q).map(|(b, _)| b)
    }
}
