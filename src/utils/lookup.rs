//! Lookup-with-fallback helpers
//!
//! Holdout records name nodes that the factorization may never have seen.
//! Those lookups fall back to a default value instead of failing.

use std::borrow::Borrow;
use std::collections::HashMap;
use std::hash::{BuildHasher, Hash};

/// Value stored under `key`, or `default` when absent.
pub fn lookup_or_default<K, Q, V, S>(map: &HashMap<K, V, S>, key: &Q, default: V) -> V
where
    K: Borrow<Q> + Eq + Hash,
    Q: Eq + Hash + ?Sized,
    V: Copy,
    S: BuildHasher,
{
    map.get(key).copied().unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rustc_hash::FxHashMap;

    #[test]
    fn test_lookup_hit_and_miss() {
        let mut map: FxHashMap<String, usize> = FxHashMap::default();
        map.insert("Apis_mellifera".to_string(), 4);

        assert_eq!(lookup_or_default(&map, "Apis_mellifera", usize::MAX), 4);
        assert_eq!(lookup_or_default(&map, "Bombus_terrestris", usize::MAX), usize::MAX);
    }

    #[test]
    fn test_lookup_with_std_hasher() {
        let map: HashMap<&str, f64> = [("Echium", 0.25)].into_iter().collect();
        assert_eq!(lookup_or_default(&map, "Echium", 0.0), 0.25);
        assert_eq!(lookup_or_default(&map, "Lotus", 0.0), 0.0);
    }
}
