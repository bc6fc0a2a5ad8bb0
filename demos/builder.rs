use json_store::{DumpPolicy, Store, WriteMode};

fn main() -> Result<(), json_store::Error> {
    let path = std::env::temp_dir().join("json_store_demo_builder.json");

    // compact JSON, dumped after every mutation through a temp file + rename
    let db = Store::builder(&path)
        .pretty(false)
        .policy(DumpPolicy::Immediate)
        .write_mode(WriteMode::AtomicRename)
        .build()?;

    db.set("name", "json-store")?;
    db.set("version", "0.1.0")?;

    let contents = std::fs::read_to_string(db.path())?;
    println!("On-disk JSON: {contents}");
    println!("Debug output: {db:?}");

    // scoped form: dumps when `scope` goes out of scope, even on panic
    {
        let scope = db.scope();
        scope.set("status", "scoped")?;
    }

    let _ = std::fs::remove_file(&path);
    Ok(())
}
