// Property tests for ChainHashMap kept inside the crate so they can check
// bucket layout directly through `assert_invariants`.

use crate::{ChainHashMap, MapError};
use proptest::prelude::*;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::hash::{BuildHasher, Hasher};

// Key newtype with Borrow<str> to exercise borrowed lookup.
#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
struct Key(String);
impl fmt::Debug for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}
impl std::borrow::Borrow<str> for Key {
    fn borrow(&self) -> &str {
        &self.0
    }
}

// Pool-indexed operations: indices shrink toward earlier keys, the pool
// shrinks, and op lists shrink in length.
#[derive(Clone, Debug)]
enum Op {
    Set(usize, i32),
    Get(usize),
    Contains(String),
    Delete(usize),
    Pop(usize, Option<i32>),
    Mutate(usize, i32),
    Update(Vec<(usize, i32)>),
    Clear,
    Iterate,
}

fn key_from(pool: &[String], i: usize) -> Key {
    Key(pool[i].clone())
}

fn arb_scenario() -> impl Strategy<Value = (usize, Vec<String>, Vec<Op>)> {
    let pool = proptest::collection::vec("[a-z]{0,4}", 1..=40);
    (1usize..=16, pool).prop_flat_map(|(capacity, pool)| {
        let idx = 0..pool.len();
        let contains_pool = proptest::sample::select(pool.clone());
        let op = prop_oneof![
            4 => (idx.clone(), any::<i32>()).prop_map(|(i, v)| Op::Set(i, v)),
            2 => idx.clone().prop_map(Op::Get),
            1 => prop_oneof![contains_pool, "[a-z]{0,4}"].prop_map(Op::Contains),
            2 => idx.clone().prop_map(Op::Delete),
            2 => (idx.clone(), proptest::option::of(any::<i32>()))
                .prop_map(|(i, d)| Op::Pop(i, d)),
            1 => (idx.clone(), any::<i32>()).prop_map(|(i, d)| Op::Mutate(i, d)),
            1 => proptest::collection::vec((idx.clone(), any::<i32>()), 0..8)
                .prop_map(Op::Update),
            1 => Just(Op::Clear),
            1 => Just(Op::Iterate),
        ];
        proptest::collection::vec(op, 1..120).prop_map(move |ops| (capacity, pool.clone(), ops))
    })
}

// Drive one op against both the map under test and a std HashMap model.
fn apply<S: BuildHasher>(
    sut: &mut ChainHashMap<Key, i32, S>,
    model: &mut HashMap<Key, i32>,
    pool: &[String],
    op: Op,
) -> Result<(), TestCaseError> {
    match op {
        Op::Set(i, v) => {
            let k = key_from(pool, i);
            let before = sut.len();
            let prev = sut.set(k.clone(), v);
            prop_assert_eq!(prev, model.insert(k, v));
            let grew_by = if prev.is_some() { 0 } else { 1 };
            prop_assert_eq!(sut.len(), before + grew_by);
        }
        Op::Get(i) => {
            let k = key_from(pool, i);
            match model.get(&k) {
                Some(v) => {
                    prop_assert_eq!(sut.get(&k), Ok(v));
                }
                None => {
                    prop_assert_eq!(sut.get(&k), Err(MapError::KeyNotFound));
                }
            }
        }
        Op::Contains(s) => {
            let has_model = model.keys().any(|k| k.0 == s);
            prop_assert_eq!(sut.contains(s.as_str()), has_model);
        }
        Op::Delete(i) => {
            let k = key_from(pool, i);
            let expected = match model.remove(&k) {
                Some(_) => Ok(()),
                None => Err(MapError::KeyNotFound),
            };
            prop_assert_eq!(sut.delete(&k), expected);
            prop_assert_eq!(sut.get(&k), Err(MapError::KeyNotFound));
        }
        Op::Pop(i, default) => {
            let k = key_from(pool, i);
            let expected = match model.remove(&k) {
                Some(v) => Ok(v),
                None => default.ok_or(MapError::KeyNotFound),
            };
            prop_assert_eq!(sut.pop(&k, default), expected);
        }
        Op::Mutate(i, d) => {
            let k = key_from(pool, i);
            match (sut.get_mut(&k), model.get_mut(&k)) {
                (Ok(v), Some(mv)) => {
                    *v = v.wrapping_add(d);
                    *mv = mv.wrapping_add(d);
                }
                (Err(MapError::KeyNotFound), None) => {}
                (s, m) => {
                    prop_assert!(false, "get_mut mismatch: {:?} vs {:?}", s, m);
                }
            }
        }
        Op::Update(pairs) => {
            let pairs: Vec<(Key, i32)> = pairs
                .into_iter()
                .map(|(i, v)| (key_from(pool, i), v))
                .collect();
            model.extend(pairs.iter().cloned());
            sut.update(pairs);
        }
        Op::Clear => {
            let cap = sut.capacity();
            sut.clear();
            model.clear();
            prop_assert_eq!(sut.capacity(), cap);
        }
        Op::Iterate => {
            let s_items: BTreeMap<_, _> = sut.items().map(|(k, v)| (k.clone(), *v)).collect();
            let m_items: BTreeMap<_, _> = model.iter().map(|(k, v)| (k.clone(), *v)).collect();
            prop_assert_eq!(sut.items().count(), sut.len());
            prop_assert_eq!(s_items, m_items);
        }
    }
    Ok(())
}

// Property: state-machine equivalence against std::collections::HashMap.
// After every op:
// - placement, cached hashes, key uniqueness, len == sum of bucket lengths
//   and len / capacity <= 3/4 hold (`assert_invariants`);
// - len/is_empty match the model;
// - capacity never shrinks and is a power-of-two multiple of the initial one.
proptest! {
    #![proptest_config(ProptestConfig { cases: 64, .. ProptestConfig::default() })]
    #[test]
    fn prop_state_machine((capacity, pool, ops) in arb_scenario()) {
        let mut sut: ChainHashMap<Key, i32> = ChainHashMap::with_capacity(capacity).unwrap();
        let mut model: HashMap<Key, i32> = HashMap::new();
        let mut last_cap = capacity;

        for op in ops {
            apply(&mut sut, &mut model, &pool, op)?;

            sut.assert_invariants();
            prop_assert_eq!(sut.len(), model.len());
            prop_assert_eq!(sut.is_empty(), model.is_empty());
            prop_assert!(sut.capacity() >= last_cap);
            let ratio = sut.capacity() / capacity;
            prop_assert_eq!(sut.capacity() % capacity, 0);
            prop_assert!(ratio.is_power_of_two());
            last_cap = sut.capacity();
        }
    }
}

// Collision variant using a constant hasher: every entry shares one bucket,
// so only equality separates keys.
#[derive(Clone, Default)]
struct ConstBuildHasher;
struct ConstHasher;
impl BuildHasher for ConstBuildHasher {
    type Hasher = ConstHasher;
    fn build_hasher(&self) -> Self::Hasher {
        ConstHasher
    }
}
impl Hasher for ConstHasher {
    fn write(&mut self, _bytes: &[u8]) {}
    fn finish(&self) -> u64 {
        0
    }
}

proptest! {
    #![proptest_config(ProptestConfig { cases: 64, .. ProptestConfig::default() })]
    #[test]
    fn prop_state_machine_with_collisions((capacity, pool, ops) in arb_scenario()) {
        let mut sut: ChainHashMap<Key, i32, ConstBuildHasher> =
            ChainHashMap::with_capacity_and_hasher(capacity, ConstBuildHasher).unwrap();
        let mut model: HashMap<Key, i32> = HashMap::new();

        for op in ops {
            apply(&mut sut, &mut model, &pool, op)?;
            sut.assert_invariants();
            prop_assert_eq!(sut.len(), model.len());
        }
    }
}

// Property: distinct keys set once are all retrievable after growth, and
// the number of doublings matches the 3/4 rule exactly.
proptest! {
    #[test]
    fn prop_growth_keeps_every_key(n in 0usize..400) {
        let mut m: ChainHashMap<usize, usize> = ChainHashMap::new();
        let mut expected_cap = crate::DEFAULT_CAPACITY;
        for i in 0..n {
            if (i + 1) * 4 > expected_cap * 3 {
                expected_cap *= 2;
            }
            m.set(i, i.wrapping_mul(31));
            prop_assert_eq!(m.capacity(), expected_cap);
        }
        for i in 0..n {
            let want = i.wrapping_mul(31);
            prop_assert_eq!(m.get(&i), Ok(&want));
        }
        prop_assert_eq!(m.len(), n);
        m.assert_invariants();
    }
}
