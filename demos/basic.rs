use json_store::{crash::run_guarded, Store};
use serde_json::json;

fn main() -> Result<(), json_store::Error> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "json_store=debug".into()),
        )
        .init();

    let path = std::env::temp_dir().join("json_store_demo_basic.json");
    let db = Store::open(&path)?;

    run_guarded(&db, |db| -> Result<(), json_store::Error> {
        // set / get / remove
        db.set("apples", 3)?;
        db.set("bananas", 5)?;
        println!("apples  = {:?}", db.get("apples"));
        println!("pears   = {}", db.get_or("pears", 0));

        // hashed on write
        db.set_hashed("password", "hunter2", "sha256")?;
        println!("password = {:?}", db.get("password"));

        // merge, nested merge, rename
        db.update(vec![("cherries".to_string(), json!(12))])?;
        db.set("meta", json!({"owner": "demo"}))?;
        db.update_at("meta", vec![("version".to_string(), json!(2))])?;
        db.rename("bananas", "plantains")?;

        // query
        let many = db.filter(|_, v| v.as_i64().map_or(false, |n| n > 4));
        println!("more than four = {many:?}");
        println!("len = {}, meta len = {}", db.len(), db.len_of("meta")?);

        db.dump()
    })?;

    println!("on disk:\n{}", std::fs::read_to_string(db.path())?);
    db.clear()?;
    db.close()?;

    let _ = std::fs::remove_file(&path);
    Ok(())
}
