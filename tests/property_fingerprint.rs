// tests/property_fingerprint.rs

//! Property tests for the content fingerprint.

use std::collections::BTreeMap;

use proptest::prelude::*;

use provrun::cache::process_fingerprint;
use provrun::data::{DataNode, DataValue};
use provrun::graph::{GraphStore, MemoryGraphStore, MemoryRepository};

fn fingerprint_of(label: &str, version: &str, values: &[(String, i64)]) -> String {
    let store = MemoryGraphStore::new();
    let repository = MemoryRepository::new();

    let inputs: BTreeMap<String, DataNode> = values
        .iter()
        .map(|(name, value)| {
            let node = store
                .create_data(DataValue::Int(*value))
                .expect("create data node");
            (name.clone(), node)
        })
        .collect();

    process_fingerprint(label, version, &inputs, &repository).expect("fingerprint")
}

proptest! {
    /// Equal process type and equal inputs always give equal fingerprints,
    /// independent of node identities and binding order.
    #[test]
    fn equal_inputs_equal_fingerprints(values in proptest::collection::btree_map("[a-z]{1,8}", any::<i64>(), 0..6)) {
        let pairs: Vec<(String, i64)> = values.into_iter().collect();
        let mut shuffled = pairs.clone();
        shuffled.reverse();

        let first = fingerprint_of("f", "0", &pairs);
        let second = fingerprint_of("f", "0", &shuffled);
        prop_assert_eq!(first, second);
    }

    /// Changing any single input value changes the fingerprint.
    #[test]
    fn changed_input_changes_fingerprint(
        values in proptest::collection::btree_map("[a-z]{1,8}", any::<i64>(), 1..6),
        delta in 1..1000i64,
    ) {
        let pairs: Vec<(String, i64)> = values.into_iter().collect();
        let mut changed = pairs.clone();
        changed[0].1 = changed[0].1.wrapping_add(delta);

        let original = fingerprint_of("f", "0", &pairs);
        let modified = fingerprint_of("f", "0", &changed);
        prop_assert_ne!(original, modified);
    }

    /// Process identity and version tag are part of the fingerprint.
    #[test]
    fn identity_is_part_of_the_fingerprint(value in any::<i64>()) {
        let inputs = vec![("data".to_string(), value)];

        let f0 = fingerprint_of("f", "0", &inputs);
        let g0 = fingerprint_of("g", "0", &inputs);
        let f1 = fingerprint_of("f", "1", &inputs);
        prop_assert_ne!(&f0, &g0);
        prop_assert_ne!(&f0, &f1);
    }
}
