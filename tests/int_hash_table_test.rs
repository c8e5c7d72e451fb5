// SPDX-License-Identifier: Apache-2.0

//! Random add/remove sequences against a `HashSet` model.

use std::collections::{HashMap, HashSet};

use rand::{Rng, SeedableRng};
use rand_pcg::Pcg64Mcg;
use test_case::test_case;
use xlsynth_beta::int_hash_map::IntToTextMap;
use xlsynth_beta::int_hash_table::{IntHashError, IntHashTable};

#[derive(Debug, Clone, Copy)]
enum KeyShape {
    Dense,
    Sparse,
    /// Keys that are all multiples of a large power of two.
    Strided,
}

fn draw_key(rng: &mut Pcg64Mcg, shape: KeyShape) -> i32 {
    match shape {
        KeyShape::Dense => rng.gen_range(-200..200),
        KeyShape::Sparse => rng.gen_range(i32::MIN..=i32::MAX),
        KeyShape::Strided => rng.gen_range(-64i32..64) << 20,
    }
}

#[test_case(1, KeyShape::Dense; "dense")]
#[test_case(2, KeyShape::Sparse; "sparse")]
#[test_case(3, KeyShape::Strided; "strided")]
fn test_table_matches_set_model(seed: u64, shape: KeyShape) {
    let mut rng = Pcg64Mcg::seed_from_u64(seed);
    let mut table = IntHashTable::new();
    let mut model: HashSet<i32> = HashSet::new();
    let mut sparse_keys: Vec<i32> = Vec::new();
    for _ in 0..20_000 {
        let key = match shape {
            // Reuse earlier keys so removals hit.
            KeyShape::Sparse if !sparse_keys.is_empty() && rng.gen_bool(0.5) => {
                sparse_keys[rng.gen_range(0..sparse_keys.len())]
            }
            _ => draw_key(&mut rng, shape),
        };
        if rng.gen_bool(0.6) {
            let result = table.add(key);
            if model.insert(key) {
                let pos = result.unwrap();
                assert_eq!(table.key_at(pos), Some(key));
                sparse_keys.push(key);
            } else {
                assert_eq!(result, Err(IntHashError::DuplicateKey(key)));
            }
        } else {
            let result = table.remove(key);
            if model.remove(&key) {
                assert!(result.is_ok());
            } else {
                assert_eq!(result, Err(IntHashError::MissingKey(key)));
            }
        }
        assert_eq!(table.count(), model.len());
    }
    table.check_invariants();
    assert!(table.count() <= table.size());
    for key in &model {
        assert!(table.contains(*key), "lost key {}", key);
        assert!(table.get_pos(*key) < table.size());
    }
    let mut keys: Vec<i32> = table.keys().collect();
    keys.sort();
    let mut want: Vec<i32> = model.into_iter().collect();
    want.sort();
    assert_eq!(keys, want);
}

#[test]
fn test_keys_survive_every_resize() {
    let mut table = IntHashTable::new();
    let mut size = table.size();
    let mut resizes = 0;
    for key in 0..50_000 {
        table.add(key * 31).unwrap();
        if table.size() != size {
            resizes += 1;
            size = table.size();
            for earlier in 0..=key {
                assert!(table.contains(earlier * 31));
            }
        }
    }
    assert!(resizes > 5);
    table.check_invariants();
}

#[test]
fn test_text_map_capture_on_remove() {
    let mut map = IntToTextMap::new();
    let mut model: HashMap<i32, String> = HashMap::new();
    for key in -50..50 {
        let text = format!("node{}", key);
        map.insert(key, text.clone()).unwrap();
        model.insert(key, text);
    }
    for key in (-50..50).step_by(3) {
        let mut captured = String::new();
        map.remove_into(key, Some(&mut captured)).unwrap();
        assert_eq!(Some(captured), model.remove(&key));
    }
    assert_eq!(map.count(), model.len());
    for (key, text) in &model {
        assert_eq!(map.get(*key), Some(text));
    }
}
