// tests/diff_properties.rs

use std::collections::{BTreeMap, BTreeSet};
use std::time::{Duration, UNIX_EPOCH};

use proptest::prelude::*;
use reloadwatch::monitor::{diff, FileEntry, Snapshot};

// A tree is a map from a small path alphabet to (size, mtime seconds), so
// generated pairs share plenty of paths.
fn tree_strategy() -> impl Strategy<Value = BTreeMap<String, (u64, u64)>> {
    proptest::collection::btree_map("[a-d](/[a-d]){0,2}\\.res", (0..4u64, 0..4u64), 0..12)
}

fn snapshot_of(tree: &BTreeMap<String, (u64, u64)>) -> Snapshot {
    Snapshot::from_entries(tree.iter().map(|(path, (size, secs))| FileEntry {
        path: path.clone(),
        size: *size,
        modified: UNIX_EPOCH + Duration::from_secs(*secs),
    }))
}

proptest! {
    #[test]
    fn diff_partitions_changes_exactly(old in tree_strategy(), new in tree_strategy()) {
        let changes = diff(&snapshot_of(&old), &snapshot_of(&new));

        let old_keys: BTreeSet<String> = old.keys().cloned().collect();
        let new_keys: BTreeSet<String> = new.keys().cloned().collect();

        let created: BTreeSet<String> = new_keys.difference(&old_keys).cloned().collect();
        let deleted: BTreeSet<String> = old_keys.difference(&new_keys).cloned().collect();
        let modified: BTreeSet<String> = old_keys
            .intersection(&new_keys)
            .filter(|k| old[*k] != new[*k])
            .cloned()
            .collect();

        prop_assert_eq!(&changes.created, &created);
        prop_assert_eq!(&changes.deleted, &deleted);
        prop_assert_eq!(&changes.modified, &modified);

        // The three sets are pairwise disjoint.
        prop_assert!(changes.created.is_disjoint(&changes.modified));
        prop_assert!(changes.created.is_disjoint(&changes.deleted));
        prop_assert!(changes.modified.is_disjoint(&changes.deleted));
    }

    #[test]
    fn diff_against_self_is_empty(tree in tree_strategy()) {
        let snapshot = snapshot_of(&tree);
        prop_assert!(diff(&snapshot, &snapshot).is_empty());
    }

    #[test]
    fn diff_from_empty_reports_everything_created(tree in tree_strategy()) {
        let changes = diff(&Snapshot::default(), &snapshot_of(&tree));
        prop_assert_eq!(changes.created.len(), tree.len());
        prop_assert!(changes.modified.is_empty());
        prop_assert!(changes.deleted.is_empty());
    }
}
