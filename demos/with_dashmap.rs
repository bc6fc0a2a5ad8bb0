use dashmap::DashMap;
use json_store::Store;
use serde_json::Value;

fn main() -> Result<(), json_store::Error> {
    let path = std::env::temp_dir().join("json_store_demo_dashmap.json");

    let db = Store::builder(&path)
        .backend::<DashMap<String, Value>>()
        .build()?;

    db.set("counter", 0)?;
    for _ in 0..10 {
        let n = db.get_as::<u64>("counter")?.unwrap_or(0);
        db.set("counter", n + 1)?;
    }
    println!("counter = {:?}", db.get("counter"));
    println!("keys = {:?}", db.keys());

    db.dump()?;
    let _ = std::fs::remove_file(&path);
    Ok(())
}
