use proptest::prelude::*;
use std::collections::BTreeMap;
use std::path::Path;
use trovilo::domain::models::ConfigEntry;
use trovilo::services::{paths_for, FileRegistrar};

fn key() -> impl Strategy<Value = String> {
    "[a-z0-9][a-z0-9._-]{0,12}"
}

fn entry() -> impl Strategy<Value = ConfigEntry> {
    (
        "[a-z][a-z0-9-]{0,10}",
        "[a-z][a-z0-9-]{0,10}",
        prop::collection::btree_map(key(), "[ -~]{0,40}", 1..6),
    )
        .prop_map(|(namespace, name, data): (String, String, BTreeMap<String, String>)| {
            ConfigEntry::new(namespace, name, data)
        })
}

proptest! {
    /// Property: paths depend only on the entry, the target and the layout
    ///
    /// One path per data key, each directly inside the directory the layout
    /// selects, and the same answer every time.
    #[test]
    fn prop_paths_for_is_pure(entry in entry(), flatten in any::<bool>()) {
        let target = Path::new("/srv/trovilo");

        let paths = paths_for(&entry, target, flatten);

        prop_assert_eq!(&paths, &paths_for(&entry, target, flatten));
        prop_assert_eq!(paths.len(), entry.data.len());

        let expected_dir = if flatten {
            target.to_path_buf()
        } else {
            target.join(&entry.namespace).join(&entry.name)
        };
        for path in &paths {
            prop_assert_eq!(path.parent(), Some(expected_dir.as_path()));
            let file_name = path.file_name().and_then(|name| name.to_str()).unwrap();
            prop_assert!(entry.data.contains_key(file_name));
        }
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    /// Property: register writes exactly the computed paths, remove undoes it
    #[test]
    fn prop_register_then_remove(entry in entry(), flatten in any::<bool>()) {
        let temp = tempfile::tempdir().unwrap();
        let target = temp.path().join("target");
        let registrar = FileRegistrar::new(&target, flatten);

        let mut written = registrar.register(&entry).unwrap();
        written.sort();
        let expected: Vec<_> = registrar.paths_for(&entry).into_iter().collect();
        prop_assert_eq!(&written, &expected);

        for path in &expected {
            let key = path.file_name().and_then(|name| name.to_str()).unwrap();
            prop_assert_eq!(&std::fs::read_to_string(path).unwrap(), &entry.data[key]);
        }
        prop_assert!(registrar.is_registered(&entry));

        registrar.remove(&entry).unwrap();

        prop_assert!(!registrar.is_registered(&entry));
        prop_assert!(target.is_dir(), "target directory is never removed");
        prop_assert_eq!(std::fs::read_dir(&target).unwrap().count(), 0);
    }
}
