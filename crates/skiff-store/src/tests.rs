//! Contract tests exercised against both backends.

use skiff_types::{Clock, Entry, Hash, key_hash, root_hash};
use tempfile::TempDir;

use crate::{EntryStore, FileStore, MemoryStore, StoreError};

const T0: u64 = 1262349296;
const T1: u64 = 1273062896;
const T2: u64 = 1281270896;

/// Run a test against the file backend (tempdir) and the memory backend,
/// each wired to a fresh scripted clock starting at `T0`.
fn with_both_backends(test: impl Fn(&dyn EntryStore, &Clock)) {
    let dir = TempDir::new().unwrap();
    let clock = Clock::fixed(T0);
    let file = FileStore::with_clock(dir.path(), clock.clone()).unwrap();
    test(&file, &clock);

    let clock = Clock::fixed(T0);
    let memory = MemoryStore::with_clock(clock.clone());
    test(&memory, &clock);
}

fn leaf(account: &Hash, path: &str, parent_path: &str, data: &[u8]) -> (Hash, Hash, Entry) {
    let key = key_hash(account, path);
    let parent = key_hash(account, parent_path);
    let entry = Entry::new(key, Some(parent), data.to_vec(), Vec::new());
    (key, parent, entry)
}

#[test]
fn test_bootstrap_creates_exactly_the_root() {
    with_both_backends(|store, _clock| {
        let account = Hash::from_data(b"foo!");
        store.open_db(&account).unwrap();

        let root = store.get_entry(&account, &root_hash(&account)).unwrap();
        assert_eq!(
            root.key.to_string(),
            "94723340d93b27ca21384fa64db760e10ee2382a3ded94f1e4243bacc24825e6"
        );
        assert_eq!(root.parent, None);
        assert_eq!(root.timestamp, T0);
        assert!(root.entries.is_empty());

        // Nothing else exists yet.
        assert!(store.has_entry(&account, &root_hash(&account)));
        assert!(!store.has_entry(&account, &key_hash(&account, "/something")));
    });
}

#[test]
fn test_account_isolation() {
    with_both_backends(|store, _clock| {
        let acc1 = Hash::from_data(b"foo!");
        let acc2 = Hash::from_data(b"bar!");
        store.open_db(&acc1).unwrap();

        // Another account's root key is not visible through acc1's tree.
        assert!(!store.has_entry(&acc1, &root_hash(&acc2)));

        let (key, parent, entry) = leaf(&acc1, "/contacts", "/", b"contact list");
        store.set_entry(&acc1, &key, Some(&parent), entry).unwrap();
        assert!(!store.has_entry(&acc2, &key));
    });
}

#[test]
fn test_create_child_links_into_root() {
    with_both_backends(|store, _clock| {
        let account = Hash::from_data(b"foo!");
        let (key, parent, entry) = leaf(&account, "/contacts", "/", b"contact list");
        store.set_entry(&account, &key, Some(&parent), entry).unwrap();

        let stored = store.get_entry(&account, &key).unwrap();
        assert_eq!(
            stored.key.to_string(),
            "9f198242afd0a2660077b05c90c4aad8807b381f8e1af89e556c9a0e0e66331d"
        );
        assert_eq!(
            stored.parent.unwrap().to_string(),
            "94723340d93b27ca21384fa64db760e10ee2382a3ded94f1e4243bacc24825e6"
        );
        assert_eq!(stored.data, b"contact list");
        assert_eq!(stored.timestamp, T0);

        let root = store.get_entry(&account, &root_hash(&account)).unwrap();
        assert_eq!(root.entries, vec![key]);
        assert_eq!(root.timestamp, T0);
    });
}

#[test]
fn test_set_entry_missing_parent_fails_without_mutation() {
    with_both_backends(|store, _clock| {
        let account = Hash::from_data(b"foo!");
        store.open_db(&account).unwrap();

        let parent = key_hash(&account, "/path/not/exist");
        let key = key_hash(&account, "/path/not/exist/item");
        let entry = Entry::new(key, Some(parent), b"orphan".to_vec(), Vec::new());
        let err = store.set_entry(&account, &key, Some(&parent), entry).unwrap_err();
        assert!(matches!(err, StoreError::ParentNotFound));

        assert!(!store.has_entry(&account, &key));
        let root = store.get_entry(&account, &root_hash(&account)).unwrap();
        assert!(root.entries.is_empty());
        assert_eq!(root.timestamp, T0);
    });
}

#[test]
fn test_set_entry_key_field_mismatch() {
    with_both_backends(|store, _clock| {
        let account = Hash::from_data(b"foo!");
        store.open_db(&account).unwrap();
        let root = root_hash(&account);
        let key = key_hash(&account, "/contacts");

        // entry.key disagrees with the key argument.
        let wrong_key = Entry::new(key_hash(&account, "/other"), Some(root), vec![], Vec::new());
        let err = store.set_entry(&account, &key, Some(&root), wrong_key).unwrap_err();
        assert!(matches!(err, StoreError::KeyFieldMismatch));

        // entry.parent disagrees with the parent argument.
        let wrong_parent = Entry::new(key, Some(key), vec![], Vec::new());
        let err = store.set_entry(&account, &key, Some(&root), wrong_parent).unwrap_err();
        assert!(matches!(err, StoreError::KeyFieldMismatch));

        assert!(!store.has_entry(&account, &key));
    });
}

#[test]
fn test_set_entry_nil_parent_only_for_root() {
    with_both_backends(|store, _clock| {
        let account = Hash::from_data(b"foo!");
        store.open_db(&account).unwrap();

        let key = key_hash(&account, "/contacts");
        let entry = Entry::new(key, None, b"no parent".to_vec(), Vec::new());
        let err = store.set_entry(&account, &key, None, entry).unwrap_err();
        assert!(matches!(err, StoreError::ParentNotFound));

        // The root itself may be rewritten with a nil parent.
        let root = root_hash(&account);
        let entry = Entry::new(root, None, b"root data".to_vec(), Vec::new());
        store.set_entry(&account, &root, None, entry).unwrap();
        assert_eq!(store.get_entry(&account, &root).unwrap().data, b"root data");
    });
}

#[test]
fn test_timestamp_propagation_on_new_write() {
    with_both_backends(|store, clock| {
        let account = Hash::from_data(b"foo!");
        let (key, parent, entry) = leaf(&account, "/contacts", "/", b"contact list");
        store.set_entry(&account, &key, Some(&parent), entry).unwrap();

        for (path, data) in [
            ("/contacts/1", "john doe"),
            ("/contacts/2", "foo bar"),
            ("/contacts/3", "jane austin"),
        ] {
            let (key, parent, entry) = leaf(&account, path, "/contacts", data.as_bytes());
            store.set_entry(&account, &key, Some(&parent), entry).unwrap();
        }

        let contacts = store.get_entry(&account, &key_hash(&account, "/contacts")).unwrap();
        assert_eq!(contacts.entries.len(), 3);
        assert_eq!(contacts.timestamp, T0);

        // A later insert bumps the new leaf and every ancestor, leaving
        // siblings untouched.
        clock.set(T1);
        let (key7, parent, entry) = leaf(&account, "/contacts/7", "/contacts", b"latest entry");
        store.set_entry(&account, &key7, Some(&parent), entry).unwrap();

        let get_ts = |path: &str| {
            store
                .get_entry(&account, &key_hash(&account, path))
                .unwrap()
                .timestamp
        };
        assert_eq!(get_ts("/contacts/1"), T0);
        assert_eq!(get_ts("/contacts/2"), T0);
        assert_eq!(get_ts("/contacts/7"), T1);
        assert_eq!(get_ts("/contacts"), T1);
        assert_eq!(get_ts("/"), T1);

        let contacts = store.get_entry(&account, &key_hash(&account, "/contacts")).unwrap();
        assert_eq!(contacts.entries.len(), 4);
    });
}

#[test]
fn test_timestamp_propagation_on_update() {
    with_both_backends(|store, clock| {
        let account = Hash::from_data(b"foo!");
        let (key, parent, entry) = leaf(&account, "/contacts", "/", b"contact list");
        store.set_entry(&account, &key, Some(&parent), entry).unwrap();
        for i in 1..=3 {
            let (key, parent, entry) =
                leaf(&account, &format!("/contacts/{i}"), "/contacts", b"v1");
            store.set_entry(&account, &key, Some(&parent), entry).unwrap();
        }

        clock.set(T2);
        let (key2, parent, entry) = leaf(&account, "/contacts/2", "/contacts", b"update entry");
        store.set_entry(&account, &key2, Some(&parent), entry).unwrap();

        let get = |path: &str| store.get_entry(&account, &key_hash(&account, path)).unwrap();
        assert_eq!(get("/contacts/2").data, b"update entry");
        assert_eq!(get("/contacts/2").timestamp, T2);
        assert_eq!(get("/contacts/1").timestamp, T0);
        assert_eq!(get("/contacts/3").timestamp, T0);
        assert_eq!(get("/contacts").timestamp, T2);
        assert_eq!(get("/").timestamp, T2);

        // An update never duplicates the child link.
        assert_eq!(get("/contacts").entries.len(), 3);
    });
}

#[test]
fn test_update_preserves_child_list() {
    with_both_backends(|store, clock| {
        let account = Hash::from_data(b"foo!");
        let (key, parent, entry) = leaf(&account, "/contacts", "/", b"contact list");
        store.set_entry(&account, &key, Some(&parent), entry).unwrap();
        let (child, parent, entry) = leaf(&account, "/contacts/1", "/contacts", b"john doe");
        store.set_entry(&account, &child, Some(&parent), entry).unwrap();

        clock.set(T1);
        let (key, parent, entry) = leaf(&account, "/contacts", "/", b"renamed list");
        store.set_entry(&account, &key, Some(&parent), entry).unwrap();

        let contacts = store.get_entry(&account, &key).unwrap();
        assert_eq!(contacts.data, b"renamed list");
        assert_eq!(contacts.entries, vec![child]);
    });
}

#[test]
fn test_remove_refuses_collections() {
    with_both_backends(|store, clock| {
        let account = Hash::from_data(b"foo!");
        let (key, parent, entry) = leaf(&account, "/contacts", "/", b"contact list");
        store.set_entry(&account, &key, Some(&parent), entry).unwrap();
        let (child, parent, entry) = leaf(&account, "/contacts/1", "/contacts", b"john doe");
        store.set_entry(&account, &child, Some(&parent), entry).unwrap();

        clock.set(T2);
        for recursive in [false, true] {
            let err = store
                .remove_entry(&account, &key_hash(&account, "/contacts"), recursive)
                .unwrap_err();
            assert!(matches!(err, StoreError::CannotRemoveCollection));
            let err = store
                .remove_entry(&account, &root_hash(&account), recursive)
                .unwrap_err();
            assert!(matches!(err, StoreError::CannotRemoveCollection));
        }

        // Refusal must not touch the tree, including timestamps.
        let get = |path: &str| store.get_entry(&account, &key_hash(&account, path)).unwrap();
        assert_eq!(get("/").timestamp, T0);
        assert_eq!(get("/contacts").timestamp, T0);
        assert_eq!(get("/contacts").entries, vec![child]);
    });
}

#[test]
fn test_remove_leaf_unlinks_and_propagates() {
    with_both_backends(|store, clock| {
        let account = Hash::from_data(b"foo!");
        let (key, parent, entry) = leaf(&account, "/contacts", "/", b"contact list");
        store.set_entry(&account, &key, Some(&parent), entry).unwrap();
        for i in 1..=3 {
            let (key, parent, entry) =
                leaf(&account, &format!("/contacts/{i}"), "/contacts", b"v1");
            store.set_entry(&account, &key, Some(&parent), entry).unwrap();
        }

        clock.set(T2);
        let key2 = key_hash(&account, "/contacts/2");
        store.remove_entry(&account, &key2, true).unwrap();

        assert!(!store.has_entry(&account, &key2));
        assert!(matches!(
            store.get_entry(&account, &key2).unwrap_err(),
            StoreError::NotFound
        ));

        // Remaining siblings keep their original insertion order.
        let contacts = store.get_entry(&account, &key_hash(&account, "/contacts")).unwrap();
        assert_eq!(
            contacts.entries,
            vec![
                key_hash(&account, "/contacts/1"),
                key_hash(&account, "/contacts/3"),
            ]
        );

        let get = |path: &str| store.get_entry(&account, &key_hash(&account, path)).unwrap();
        assert_eq!(get("/contacts/1").timestamp, T0);
        assert_eq!(get("/contacts/3").timestamp, T0);
        assert_eq!(get("/contacts").timestamp, T2);
        assert_eq!(get("/").timestamp, T2);
    });
}

#[test]
fn test_remove_missing_key_is_not_found() {
    with_both_backends(|store, _clock| {
        let account = Hash::from_data(b"foo!");
        store.open_db(&account).unwrap();
        let err = store
            .remove_entry(&account, &key_hash(&account, "/ghost"), false)
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound));
    });
}

#[test]
fn test_has_entry_agrees_with_get_entry() {
    with_both_backends(|store, _clock| {
        let account = Hash::from_data(b"foo!");
        let (key, parent, entry) = leaf(&account, "/contacts", "/", b"contact list");

        assert!(!store.has_entry(&account, &key));
        assert!(store.get_entry(&account, &key).is_err());

        store.set_entry(&account, &key, Some(&parent), entry).unwrap();
        assert!(store.has_entry(&account, &key));
        assert!(store.get_entry(&account, &key).is_ok());
    });
}

#[test]
fn test_deep_tree_propagation() {
    with_both_backends(|store, clock| {
        let account = Hash::from_data(b"foo!");
        let (key, parent, entry) = leaf(&account, "/a", "/", b"a");
        store.set_entry(&account, &key, Some(&parent), entry).unwrap();
        let (key, parent, entry) = leaf(&account, "/a/b", "/a", b"b");
        store.set_entry(&account, &key, Some(&parent), entry).unwrap();

        clock.set(T1);
        let (key, parent, entry) = leaf(&account, "/a/b/c", "/a/b", b"c");
        store.set_entry(&account, &key, Some(&parent), entry).unwrap();

        let get = |path: &str| store.get_entry(&account, &key_hash(&account, path)).unwrap();
        assert_eq!(get("/a/b/c").timestamp, T1);
        assert_eq!(get("/a/b").timestamp, T1);
        assert_eq!(get("/a").timestamp, T1);
        assert_eq!(get("/").timestamp, T1);

        // Reciprocal links at every level.
        assert_eq!(get("/").entries, vec![key_hash(&account, "/a")]);
        assert_eq!(get("/a").entries, vec![key_hash(&account, "/a/b")]);
        assert_eq!(get("/a/b").entries, vec![key_hash(&account, "/a/b/c")]);
    });
}
