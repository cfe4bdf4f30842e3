use super::*;

#[test]
fn values_survive_reopen() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("session.json");

    let mut storage = FileStorage::open(&path);
    storage.set("sessionId", "s-1");
    storage.set("loginTime", "1735689600000");

    let reopened = FileStorage::open(&path);
    assert_eq!(reopened.get("sessionId").as_deref(), Some("s-1"));
    assert_eq!(reopened.get("loginTime").as_deref(), Some("1735689600000"));
}

#[test]
fn removing_last_key_deletes_file() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("session.json");

    let mut storage = FileStorage::open(&path);
    storage.set("adminToken", "a.b.c");
    assert!(path.exists());
    storage.remove("adminToken");
    assert!(!path.exists());
    assert_eq!(storage.get("adminToken"), None);
}

#[test]
fn corrupt_file_starts_empty() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("session.json");
    fs::write(&path, "{not json").expect("write");

    let storage = FileStorage::open(&path);
    assert_eq!(storage.get("adminToken"), None);
}

#[test]
fn creates_parent_directories() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("nested").join("session.json");

    let mut storage = FileStorage::open(&path);
    storage.set("adminToken", "a.b.c");
    assert!(path.exists());
    assert_eq!(storage.path(), path.as_path());
}
