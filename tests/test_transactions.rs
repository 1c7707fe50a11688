//! Integration tests for transaction sequencing against the real engine.

use std::time::Duration;

use serde_json::json;
use turnstile::{Database, DatabaseError, NamedParams, SelectOptions};

async fn setup() -> Database {
    let db = Database::open_in_memory().unwrap();
    db.execute(
        "CREATE TABLE log (id INTEGER PRIMARY KEY, tag TEXT)",
        NamedParams::new(),
    )
    .await
    .unwrap();
    db
}

#[tokio::test]
async fn test_transactions_run_in_creation_order() {
    let db = setup().await;
    let t1 = db.transaction();
    let t2 = db.transaction();
    t1.start();
    t2.start();

    let a = t1.insert("log", &json!({"tag": "t1"})).unwrap();
    let b = t2.insert("log", &json!({"tag": "t2"})).unwrap();

    a.await.unwrap();
    tokio::time::sleep(Duration::from_millis(30)).await;

    // t1 has not ended, so t2's statement must not have executed yet.
    let t2_rows = db
        .count("log", Some(&json!({"tag": "t2"})))
        .unwrap()
        .await
        .unwrap();
    assert_eq!(t2_rows, 0);

    t1.end();
    b.await.unwrap();
    t2.end();

    let rows = db
        .select("log", &SelectOptions::default().order_by("id"))
        .unwrap()
        .await
        .unwrap();
    let tags: Vec<&str> = rows.iter().map(|r| r["tag"].as_str().unwrap()).collect();
    assert_eq!(tags, vec!["t1", "t2"]);
}

#[tokio::test]
async fn test_statements_before_start_wait_for_start() {
    let db = setup().await;
    let tx = db.transaction();

    let queued = tx.insert("log", &json!({"tag": "early"})).unwrap();
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert_eq!(db.count("log", None).unwrap().await.unwrap(), 0);

    tx.start();
    queued.await.unwrap();
    assert_eq!(db.count("log", None).unwrap().await.unwrap(), 1);
    tx.end();
}

#[tokio::test]
async fn test_statements_within_transaction_keep_order() {
    let db = setup().await;
    let tx = db.transaction();
    tx.start();
    let mut queued = Vec::new();
    for i in 0..5 {
        queued.push(tx.insert("log", &json!({"tag": format!("op{i}")})).unwrap());
    }
    for q in queued {
        q.await.unwrap();
    }
    tx.end();

    let rows = db
        .select("log", &SelectOptions::default().order_by("id"))
        .unwrap()
        .await
        .unwrap();
    let tags: Vec<&str> = rows.iter().map(|r| r["tag"].as_str().unwrap()).collect();
    assert_eq!(tags, vec!["op0", "op1", "op2", "op3", "op4"]);
}

#[tokio::test]
async fn test_end_before_settle_cancels_nothing() {
    let db = setup().await;
    let tx = db.transaction();
    tx.start();
    let queued = tx.insert("log", &json!({"tag": "kept"})).unwrap();
    tx.end();
    queued.await.unwrap();
    assert_eq!(db.count("log", None).unwrap().await.unwrap(), 1);
}

#[tokio::test]
async fn test_statement_after_end_fails_fast() {
    let db = setup().await;
    let tx = db.transaction();
    tx.start();
    tx.end();
    let late = tx.insert("log", &json!({"tag": "late"})).unwrap();
    assert!(matches!(late.await, Err(DatabaseError::SchedulerClosed)));
    assert_eq!(db.count("log", None).unwrap().await.unwrap(), 0);
}

#[tokio::test]
async fn test_begin_commit_wraps_engine_transaction() {
    let db = setup().await;
    let tx = db.transaction();
    tx.start();
    tx.begin().await.unwrap();
    tx.insert("log", &json!({"tag": "a"})).unwrap().await.unwrap();
    tx.insert("log", &json!({"tag": "b"})).unwrap().await.unwrap();
    tx.commit().await.unwrap();
    tx.end();

    assert_eq!(db.count("log", None).unwrap().await.unwrap(), 2);
}

#[tokio::test]
async fn test_rollback_discards_writes() {
    let db = setup().await;
    let tx = db.transaction();
    tx.start();
    tx.begin().await.unwrap();
    tx.insert("log", &json!({"tag": "doomed"})).unwrap().await.unwrap();
    tx.rollback().await.unwrap();
    tx.end();

    assert_eq!(db.count("log", None).unwrap().await.unwrap(), 0);
}

#[tokio::test]
async fn test_dropped_transaction_releases_its_slot() {
    let db = setup().await;
    {
        let _abandoned = db.transaction();
        // Never started; dropping must not wedge the FIFO.
    }
    let tx = db.transaction();
    tx.start();
    tx.insert("log", &json!({"tag": "after"})).unwrap().await.unwrap();
    tx.end();
    assert_eq!(db.count("log", None).unwrap().await.unwrap(), 1);
}

#[tokio::test]
async fn test_idempotent_start_and_end() {
    let db = setup().await;
    let tx = db.transaction();
    tx.start();
    tx.start();
    tx.insert("log", &json!({"tag": "once"})).unwrap().await.unwrap();
    tx.end();
    tx.end();
    assert_eq!(db.count("log", None).unwrap().await.unwrap(), 1);
}
