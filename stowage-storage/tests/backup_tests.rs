use pretty_assertions::assert_eq;
use std::collections::BTreeMap;
use std::fs;
use stowage_storage::{BackupStore, Encoding, EntryMap, InBandStore, StorageError, IN_BAND_TAG};
use tempfile::TempDir;

const DOC: &str = r#"{"revision":1,"singletons":[],"components":{}}"#;

fn store(compress: bool) -> (TempDir, BackupStore) {
    let dir = tempfile::tempdir().unwrap();
    let store = BackupStore::new(dir.path(), Encoding::for_compression(compress));
    (dir, store)
}

// ── Paths ────────────────────────────────────────────────────────

#[test]
fn path_layout_is_root_mode_name_suffix() {
    let (dir, store) = store(false);
    assert_eq!(
        store.path("Campaign", "slot1", Encoding::Json).unwrap(),
        dir.path().join("Campaign").join("slot1.json")
    );
    assert_eq!(
        store.path("Campaign", "slot1", Encoding::Gzip).unwrap(),
        dir.path().join("Campaign").join("slot1.stow")
    );
}

#[test]
fn names_that_escape_the_root_are_rejected() {
    let (_dir, store) = store(false);
    for bad in ["", "..", "a/b", "a\\b", "."] {
        assert!(
            matches!(store.path("Campaign", bad, Encoding::Json), Err(StorageError::InvalidName(_))),
            "{bad:?} accepted"
        );
        assert!(matches!(store.path(bad, "slot", Encoding::Json), Err(StorageError::InvalidName(_))));
    }
}

#[test]
fn encoding_helpers() {
    assert_eq!(Encoding::for_compression(true), Encoding::Gzip);
    assert_eq!(Encoding::Json.other(), Encoding::Gzip);
    assert_eq!(Encoding::Gzip.to_string(), "gzip");
}

// ── Write and read ───────────────────────────────────────────────

#[test]
fn json_backup_round_trips() {
    let (_dir, store) = store(false);
    let path = store.write("Campaign", "slot1", DOC).unwrap();

    assert_eq!(fs::read_to_string(&path).unwrap(), DOC);
    let loaded = store.read("Campaign", "slot1").unwrap().unwrap();
    assert_eq!(loaded.document, DOC);
    assert_eq!(loaded.encoding, Encoding::Json);
    assert_eq!(loaded.path, path);
}

#[test]
fn gzip_backup_round_trips_and_is_compressed() {
    let (_dir, store) = store(true);
    let path = store.write("Campaign", "slot1", DOC).unwrap();

    let raw = fs::read(&path).unwrap();
    assert_eq!(&raw[..2], &[0x1f, 0x8b]);
    let loaded = store.read("Campaign", "slot1").unwrap().unwrap();
    assert_eq!(loaded.document, DOC);
    assert_eq!(loaded.encoding, Encoding::Gzip);
}

#[test]
fn missing_backup_reads_as_none() {
    let (_dir, store) = store(true);
    assert_eq!(store.read("Campaign", "never-saved").unwrap(), None);
    assert!(!store.exists("Campaign", "never-saved"));
}

#[test]
fn preferred_encoding_is_read_first() {
    let (dir, mut store) = store(false);
    store.write("Campaign", "slot1", "json copy").unwrap();
    store.set_preferred(Encoding::Gzip);
    store.write("Campaign", "slot1", "gzip copy").unwrap();

    assert_eq!(store.read("Campaign", "slot1").unwrap().unwrap().document, "gzip copy");
    let json_first = BackupStore::new(dir.path(), Encoding::Json);
    assert_eq!(json_first.read("Campaign", "slot1").unwrap().unwrap().document, "json copy");
}

#[test]
fn falls_back_to_the_other_encoding() {
    let (dir, store) = store(false);
    BackupStore::new(dir.path(), Encoding::Gzip)
        .write("Campaign", "slot1", DOC)
        .unwrap();

    let loaded = store.read("Campaign", "slot1").unwrap().unwrap();
    assert_eq!(loaded.encoding, Encoding::Gzip);
    assert!(store.exists("Campaign", "slot1"));
}

#[test]
fn corrupt_preferred_file_falls_through_to_the_other() {
    let (_dir, store) = store(true);
    let gz = store.path("Campaign", "slot1", Encoding::Gzip).unwrap();
    fs::create_dir_all(gz.parent().unwrap()).unwrap();
    fs::write(&gz, b"not gzip at all").unwrap();
    fs::write(store.path("Campaign", "slot1", Encoding::Json).unwrap(), DOC).unwrap();

    assert_eq!(store.read("Campaign", "slot1").unwrap().unwrap().encoding, Encoding::Json);
}

#[test]
fn corrupt_only_file_is_an_error() {
    let (_dir, store) = store(true);
    let gz = store.path("Campaign", "slot1", Encoding::Gzip).unwrap();
    fs::create_dir_all(gz.parent().unwrap()).unwrap();
    fs::write(&gz, b"not gzip at all").unwrap();

    assert!(matches!(store.read("Campaign", "slot1"), Err(StorageError::Io(_))));
}

#[test]
fn non_utf8_json_file_is_invalid_data() {
    let (_dir, store) = store(false);
    let json = store.path("Campaign", "slot1", Encoding::Json).unwrap();
    fs::create_dir_all(json.parent().unwrap()).unwrap();
    fs::write(&json, [0xff, 0xfe, 0x00]).unwrap();

    assert!(matches!(
        store.read("Campaign", "slot1"),
        Err(StorageError::InvalidData { .. })
    ));
}

// ── In-band entries ──────────────────────────────────────────────

#[test]
fn entry_map_stores_documents_by_tag() {
    let mut entries = EntryMap::new();
    assert_eq!(entries.read_entry(IN_BAND_TAG).unwrap(), None);

    entries.write_entry(IN_BAND_TAG, DOC.to_string()).unwrap();
    assert_eq!(entries.read_entry(IN_BAND_TAG).unwrap().as_deref(), Some(DOC));
    assert_eq!(entries.get(IN_BAND_TAG), Some(DOC));
    assert_eq!(entries.len(), 1);
}

#[test]
fn read_only_entry_map_refuses_writes() {
    let mut entries = EntryMap::read_only(BTreeMap::from([(IN_BAND_TAG.to_string(), DOC.to_string())]));
    assert!(matches!(
        entries.write_entry(IN_BAND_TAG, "{}".into()),
        Err(StorageError::InBand(_))
    ));
    assert_eq!(entries.get(IN_BAND_TAG), Some(DOC));
}
