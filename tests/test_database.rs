//! Integration tests for the Database facade against the real engine.

use serde_json::json;
use turnstile::{Database, NamedParams, SelectOptions};

async fn setup() -> Database {
    let db = Database::open_in_memory().unwrap();
    db.execute(
        "CREATE TABLE users (id INTEGER PRIMARY KEY, name TEXT, age INTEGER, status TEXT)",
        NamedParams::new(),
    )
    .await
    .unwrap();
    db
}

#[tokio::test]
async fn test_insert_and_select_with_filter() {
    let db = setup().await;
    db.insert("users", &json!({"name": "ada", "age": 36, "status": "active"}))
        .unwrap()
        .await
        .unwrap();
    db.insert("users", &json!({"name": "bob", "age": 17, "status": "active"}))
        .unwrap()
        .await
        .unwrap();

    let adults = db
        .select(
            "users",
            &SelectOptions::default()
                .filter(json!({"age": {"operator": ">=", "value": 18}, "status": "active"})),
        )
        .unwrap()
        .await
        .unwrap();
    assert_eq!(adults.len(), 1);
    assert_eq!(adults[0]["name"], json!("ada"));
}

#[tokio::test]
async fn test_select_with_or_list() {
    let db = setup().await;
    for (name, age) in [("ada", 36), ("bob", 17), ("cyd", 64)] {
        db.insert("users", &json!({"name": name, "age": age}))
            .unwrap()
            .await
            .unwrap();
    }
    let rows = db
        .select(
            "users",
            &SelectOptions::default()
                .filter(json!({"OR": [{"age": {"operator": "<", "value": 18}},
                                      {"age": {"operator": ">", "value": 60}}]}))
                .order_by("age"),
        )
        .unwrap()
        .await
        .unwrap();
    let names: Vec<&str> = rows.iter().map(|r| r["name"].as_str().unwrap()).collect();
    assert_eq!(names, vec!["bob", "cyd"]);
}

#[tokio::test]
async fn test_update_and_delete() {
    let db = setup().await;
    for age in [10, 20, 30] {
        db.insert("users", &json!({"name": "u", "age": age, "status": "new"}))
            .unwrap()
            .await
            .unwrap();
    }

    let updated = db
        .update(
            "users",
            &json!({"status": "adult"}),
            Some(&json!({"age": {"operator": ">=", "value": 18}})),
        )
        .unwrap()
        .await
        .unwrap();
    assert_eq!(updated, 2);

    let deleted = db
        .delete("users", Some(&json!({"status": "new"})))
        .unwrap()
        .await
        .unwrap();
    assert_eq!(deleted, 1);

    let remaining = db.count("users", None).unwrap().await.unwrap();
    assert_eq!(remaining, 2);
}

#[tokio::test]
async fn test_exists_and_count() {
    let db = setup().await;
    assert!(!db.exists("users", None).unwrap().await.unwrap());

    db.insert("users", &json!({"name": "ada", "status": "active"}))
        .unwrap()
        .await
        .unwrap();

    assert!(db
        .exists("users", Some(&json!({"status": "active"})))
        .unwrap()
        .await
        .unwrap());
    assert!(!db
        .exists("users", Some(&json!({"status": "banned"})))
        .unwrap()
        .await
        .unwrap());
    assert_eq!(db.count("users", None).unwrap().await.unwrap(), 1);
}

#[tokio::test]
async fn test_fire_without_awaiting_preserves_order() {
    let db = setup().await;
    let mut queued = Vec::new();
    for i in 0..10 {
        queued.push(
            db.insert("users", &json!({"name": format!("user{i}"), "age": i}))
                .unwrap(),
        );
    }
    // Await only the last one; FIFO means everything before it has settled.
    let last = queued.pop().unwrap().await.unwrap();
    assert_eq!(last, 10);

    let rows = db
        .select("users", &SelectOptions::default().order_by("id"))
        .unwrap()
        .await
        .unwrap();
    let names: Vec<&str> = rows.iter().map(|r| r["name"].as_str().unwrap()).collect();
    let expected: Vec<String> = (0..10).map(|i| format!("user{i}")).collect();
    assert_eq!(names, expected.iter().map(String::as_str).collect::<Vec<_>>());
}

#[tokio::test]
async fn test_execution_error_does_not_block_queue() {
    let db = setup().await;
    let ok1 = db.insert("users", &json!({"name": "first"})).unwrap();
    let bad = db.insert("missing_table", &json!({"name": "x"})).unwrap();
    let ok2 = db.insert("users", &json!({"name": "second"})).unwrap();

    assert_eq!(ok1.await.unwrap(), 1);
    assert!(bad.await.is_err());
    assert_eq!(ok2.await.unwrap(), 2);
    assert_eq!(db.count("users", None).unwrap().await.unwrap(), 2);
}

#[tokio::test]
async fn test_shape_error_surfaces_before_queueing() {
    let db = setup().await;
    // Bare array value is malformed; nothing should reach the queue.
    assert!(db
        .select(
            "users",
            &SelectOptions::default().filter(json!({"age": [18, 21]})),
        )
        .is_err());
    assert!(db.insert("users", &json!("not an object")).is_err());
}

#[tokio::test]
async fn test_empty_filter_matches_all() {
    let db = setup().await;
    db.insert("users", &json!({"name": "ada"})).unwrap().await.unwrap();

    let all = db.select("users", &SelectOptions::default()).unwrap().await.unwrap();
    let all_empty_filter = db
        .select("users", &SelectOptions::default().filter(json!({})))
        .unwrap()
        .await
        .unwrap();
    assert_eq!(all, all_empty_filter);
}

#[tokio::test]
async fn test_insert_many_is_one_operation() {
    let db = setup().await;
    let rowids = db
        .insert_many(
            "users",
            &[
                json!({"name": "ada"}),
                json!({"name": "bob"}),
                json!({"name": "cyd"}),
            ],
        )
        .unwrap()
        .await
        .unwrap();
    assert_eq!(rowids, vec![1, 2, 3]);
}

#[tokio::test]
async fn test_compound_values_store_as_json_text() {
    let db = setup().await;
    db.execute("CREATE TABLE docs (id INTEGER PRIMARY KEY, body TEXT)", NamedParams::new())
        .await
        .unwrap();
    db.insert("docs", &json!({"body": {"k": [1, 2]}}))
        .unwrap()
        .await
        .unwrap();
    let row = db
        .get("docs", &SelectOptions::default())
        .unwrap()
        .await
        .unwrap()
        .unwrap();
    assert_eq!(row["body"], json!(r#"{"k":[1,2]}"#));
}

#[tokio::test]
async fn test_script_file_execution() {
    use std::io::Write;

    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("test.sqlite");
    let db = Database::open(&db_path).unwrap();

    let script_path = dir.path().join("schema.sql");
    let mut file = std::fs::File::create(&script_path).unwrap();
    writeln!(
        file,
        "CREATE TABLE a (id INTEGER PRIMARY KEY);\nCREATE TABLE b (id INTEGER PRIMARY KEY);\nINSERT INTO a DEFAULT VALUES;"
    )
    .unwrap();

    db.execute_script_file(&script_path).unwrap().await.unwrap();
    assert_eq!(db.count("a", None).unwrap().await.unwrap(), 1);
    assert_eq!(db.count("b", None).unwrap().await.unwrap(), 0);

    // Missing file fails synchronously, before anything queues.
    assert!(db.execute_script_file(dir.path().join("missing.sql")).is_err());
}

#[tokio::test]
async fn test_close_stops_admission() {
    let db = setup().await;
    db.insert("users", &json!({"name": "ada"})).unwrap().await.unwrap();
    db.close();
    let late = db.insert("users", &json!({"name": "late"})).unwrap();
    assert!(matches!(
        late.await,
        Err(turnstile::DatabaseError::SchedulerClosed)
    ));
}
