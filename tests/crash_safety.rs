use json_store::{crash::run_guarded, with_store, Error, Store, WriteMode};
use serde_json::json;

fn temp_path(name: &str) -> std::path::PathBuf {
    std::env::temp_dir().join(format!("json_store_test_{}.json", name))
}

// ---- load -------------------------------------------------------------------

#[test]
fn open_missing_file_creates_empty() {
    let path = temp_path("missing");
    let _ = std::fs::remove_file(&path);
    let db = Store::open(&path).unwrap();
    assert!(db.is_empty());
    assert!(path.exists());
    assert_eq!(std::fs::metadata(&path).unwrap().len(), 0);
    let _ = std::fs::remove_file(&path);
}

#[test]
fn empty_file_loads_and_dumps_empty_object() {
    let path = temp_path("empty_file");
    std::fs::write(&path, b"").unwrap();
    let db = Store::open(&path).unwrap();
    assert!(db.is_empty());
    db.dump().unwrap();
    let raw = std::fs::read_to_string(&path).unwrap();
    assert_eq!(serde_json::from_str::<serde_json::Value>(&raw).unwrap(), json!({}));
    let _ = std::fs::remove_file(&path);
}

#[test]
fn invalid_json_is_corrupt_store() {
    let path = temp_path("corrupt");
    std::fs::write(&path, b"{\"a\": 1,").unwrap();
    assert!(matches!(Store::open(&path), Err(Error::CorruptStore(_))));
    let _ = std::fs::remove_file(&path);
}

#[test]
fn non_object_top_level_is_corrupt_store() {
    let path = temp_path("corrupt_array");
    std::fs::write(&path, b"[1, 2, 3]").unwrap();
    match Store::open(&path) {
        Err(Error::CorruptStore(msg)) => assert!(msg.contains("array")),
        other => panic!("expected corrupt store, got {other:?}"),
    }
    let _ = std::fs::remove_file(&path);
}

#[test]
fn path_accessor() {
    let path = temp_path("path_acc");
    let _ = std::fs::remove_file(&path);
    let db = Store::open(&path).unwrap();
    assert_eq!(db.path(), path.as_path());
    let _ = std::fs::remove_file(&path);
}

// ---- dump / reload ----------------------------------------------------------

#[test]
fn persist_and_reload_roundtrip() {
    let path = temp_path("roundtrip");
    let _ = std::fs::remove_file(&path);
    let doc = json!({
        "null": null,
        "bool": true,
        "int": -3,
        "float": 2.5,
        "str": "héllo",
        "arr": [1, [2, 3], {"x": null}],
        "obj": {"nested": {"deep": [true, false]}}
    });
    {
        let db = Store::open(&path).unwrap();
        for (k, v) in doc.as_object().unwrap() {
            db.set(k.clone(), v.clone()).unwrap();
        }
        db.set_hashed("pw", "secret", "sha256").unwrap();
        db.dump().unwrap();
    }
    let db = Store::open(&path).unwrap();
    for (k, v) in doc.as_object().unwrap() {
        assert_eq!(db.get(k).as_ref(), Some(v));
    }
    assert_eq!(
        db.get("pw"),
        Some(json!(
            "2bb80d537b1da3e38bd30361aa855686bde0eacd7162fef6a25fe97bf527a25b"
        ))
    );
    assert_eq!(db.len(), doc.as_object().unwrap().len() + 1);
    let _ = std::fs::remove_file(&path);
}

#[test]
fn dump_fully_replaces_previous_contents() {
    let path = temp_path("replace");
    let _ = std::fs::remove_file(&path);
    let db = Store::open(&path).unwrap();
    db.set("long_key_with_a_long_value", "x".repeat(256)).unwrap();
    db.dump().unwrap();
    db.clear().unwrap();
    db.set("a", 1).unwrap();
    db.dump().unwrap();

    let raw = std::fs::read_to_string(&path).unwrap();
    assert_eq!(serde_json::from_str::<serde_json::Value>(&raw).unwrap(), json!({"a": 1}));
    let _ = std::fs::remove_file(&path);
}

#[test]
fn dump_to_other_path() {
    let path = temp_path("dump_src");
    let other = temp_path("dump_dst");
    let _ = std::fs::remove_file(&path);
    let _ = std::fs::remove_file(&other);
    let db = Store::open(&path).unwrap();
    db.set("k", "v").unwrap();
    db.dump_to(&other).unwrap();

    assert_eq!(std::fs::metadata(&path).unwrap().len(), 0);
    let copy = Store::open(&other).unwrap();
    assert_eq!(copy.get("k"), Some(json!("v")));
    let _ = std::fs::remove_file(&path);
    let _ = std::fs::remove_file(&other);
}

#[test]
fn dump_writes_sorted_keys() {
    let path = temp_path("sorted");
    let _ = std::fs::remove_file(&path);
    let db = Store::builder(&path).pretty(false).build().unwrap();
    db.set("b", 2).unwrap();
    db.set("c", 3).unwrap();
    db.set("a", 1).unwrap();
    db.dump().unwrap();
    assert_eq!(std::fs::read_to_string(&path).unwrap(), r#"{"a":1,"b":2,"c":3}"#);
    let _ = std::fs::remove_file(&path);
}

#[test]
fn pretty_dump_uses_four_space_indent() {
    let path = temp_path("pretty");
    let _ = std::fs::remove_file(&path);
    let db = Store::open(&path).unwrap();
    db.set("hello", 1).unwrap();
    db.dump().unwrap();
    assert_eq!(
        std::fs::read_to_string(&path).unwrap(),
        "{\n    \"hello\": 1\n}"
    );
    let _ = std::fs::remove_file(&path);
}

#[test]
fn atomic_rename_leaves_no_temp_file() {
    let path = temp_path("atomic");
    let _ = std::fs::remove_file(&path);
    let db = Store::builder(&path)
        .write_mode(WriteMode::AtomicRename)
        .build()
        .unwrap();
    db.set("k", 1).unwrap();
    db.dump().unwrap();

    let tmp = path.with_extension("json.tmp");
    assert!(!tmp.exists());
    let db2 = Store::open(&path).unwrap();
    assert_eq!(db2.get("k"), Some(json!(1)));
    let _ = std::fs::remove_file(&path);
}

#[test]
fn close_dumps() {
    let path = temp_path("close");
    let _ = std::fs::remove_file(&path);
    let db = Store::open(&path).unwrap();
    db.set("k", "v").unwrap();
    db.close().unwrap();
    let db = Store::open(&path).unwrap();
    assert_eq!(db.get("k"), Some(json!("v")));
    let _ = std::fs::remove_file(&path);
}

// ---- scoped acquisition -----------------------------------------------------

#[test]
fn scope_dumps_on_normal_exit() {
    let path = temp_path("scope_ok");
    let _ = std::fs::remove_file(&path);
    let db = Store::open(&path).unwrap();
    {
        let s = db.scope();
        s.set("k", 1).unwrap();
    }
    let reloaded = Store::open(&path).unwrap();
    assert_eq!(reloaded.get("k"), Some(json!(1)));
    let _ = std::fs::remove_file(&path);
}

#[test]
fn scope_dumps_while_unwinding() {
    let path = temp_path("scope_panic");
    let _ = std::fs::remove_file(&path);
    let db = Store::open(&path).unwrap();
    let res = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
        let s = db.scope();
        s.set("k", "before panic").unwrap();
        panic!("caller code failed");
    }));
    assert!(res.is_err());
    let reloaded = Store::open(&path).unwrap();
    assert_eq!(reloaded.get("k"), Some(json!("before panic")));
    let _ = std::fs::remove_file(&path);
}

#[test]
fn with_store_dumps_on_error_exit() {
    let path = temp_path("with_store_err");
    let _ = std::fs::remove_file(&path);
    let res: json_store::Result<()> = with_store(&path, |db| {
        db.set("k", 1)?;
        db.remove("missing")?;
        Ok(())
    });
    assert_eq!(res, Err(Error::KeyNotFound("missing".into())));
    let db = Store::open(&path).unwrap();
    assert_eq!(db.get("k"), Some(json!(1)));
    let _ = std::fs::remove_file(&path);
}

#[test]
fn with_store_returns_value() {
    let path = temp_path("with_store_ok");
    let _ = std::fs::remove_file(&path);
    let n = with_store(&path, |db| {
        db.set("a", 1)?;
        db.set("b", 2)?;
        Ok(db.len())
    })
    .unwrap();
    assert_eq!(n, 2);
    let db = Store::open(&path).unwrap();
    assert_eq!(db.len(), 2);
    let _ = std::fs::remove_file(&path);
}

// ---- crash boundary ---------------------------------------------------------

#[test]
fn guarded_panic_propagates_and_keeps_last_dump() {
    let path = temp_path("guarded");
    let _ = std::fs::remove_file(&path);
    let db = Store::open(&path).unwrap();
    db.set("committed", true).unwrap();
    db.dump().unwrap();

    let res = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
        run_guarded(&db, |s| {
            s.set("uncommitted", true).unwrap();
            panic!("boom");
        })
    }));
    let payload = res.unwrap_err();
    assert_eq!(payload.downcast_ref::<&str>(), Some(&"boom"));

    let reloaded = Store::open(&path).unwrap();
    assert_eq!(reloaded.get("committed"), Some(json!(true)));
    assert!(!reloaded.exists("uncommitted"));
    let _ = std::fs::remove_file(&path);
}
