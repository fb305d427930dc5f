use std::path::PathBuf;

use jiff::{SignedDuration, Timestamp};
use redis_replica::{
    key_value_store::{DataType, KeyValueStore, Value},
    rdb::{dump_rdb, load_rdb_file},
};

fn test_directory(name: &str) -> PathBuf {
    std::env::temp_dir().join(format!("redis-replica-{}-{}", name, std::process::id()))
}

async fn write_rdb_file(name: &str, contents: &[u8]) -> String {
    let directory = test_directory(name);
    tokio::fs::create_dir_all(&directory).await.unwrap();
    tokio::fs::write(directory.join("dump.rdb"), contents)
        .await
        .unwrap();

    directory.to_string_lossy().to_string()
}

#[tokio::test]
async fn test_load_rdb_file_written_by_dump() {
    let expiration = Timestamp::now() + SignedDuration::from_secs(3600);

    let mut store = KeyValueStore::new();
    store.insert("grape".to_string(), Value::string("mango"));
    store.insert(
        "raspberry".to_string(),
        Value {
            data: DataType::String("pear".to_string()),
            expiration: Some(expiration),
        },
    );

    let directory = write_rdb_file("dump", &dump_rdb(&store)).await;

    let mut loaded = KeyValueStore::new();
    let loaded_keys = load_rdb_file(&directory, "dump.rdb", &mut loaded)
        .await
        .unwrap();

    assert_eq!(loaded_keys, 2);
    assert_eq!(loaded.get("grape"), Some(&Value::string("mango")));

    let raspberry = loaded.get("raspberry").expect("key should be loaded");
    assert_eq!(raspberry.data, DataType::String("pear".to_string()));
    assert_eq!(
        raspberry.expiration.map(|expiration| expiration.as_millisecond()),
        Some(expiration.as_millisecond())
    );

    tokio::fs::remove_dir_all(&directory).await.unwrap();
}

#[tokio::test]
async fn test_load_rdb_file_expired_keys_are_invisible() {
    let mut store = KeyValueStore::new();
    store.insert("grape".to_string(), Value::string("mango"));
    store.insert(
        "raspberry".to_string(),
        Value {
            data: DataType::String("pear".to_string()),
            expiration: Some(Timestamp::now() + SignedDuration::from_millis(20)),
        },
    );

    let payload = dump_rdb(&store);
    tokio::time::sleep(std::time::Duration::from_millis(50)).await;

    let directory = write_rdb_file("expired", &payload).await;

    let mut loaded = KeyValueStore::new();
    load_rdb_file(&directory, "dump.rdb", &mut loaded)
        .await
        .unwrap();

    assert_eq!(loaded.get("grape"), Some(&Value::string("mango")));
    assert_eq!(loaded.get("raspberry"), None);

    tokio::fs::remove_dir_all(&directory).await.unwrap();
}

#[tokio::test]
async fn test_load_rdb_file_missing() {
    let mut store = KeyValueStore::new();
    store.insert("grape".to_string(), Value::string("mango"));

    let directory = test_directory("missing");
    let loaded_keys = load_rdb_file(&directory.to_string_lossy(), "dump.rdb", &mut store)
        .await
        .unwrap();

    assert_eq!(loaded_keys, 0);
    assert_eq!(store.get("grape"), Some(&Value::string("mango")));
}

#[tokio::test]
async fn test_load_rdb_file_truncated() {
    let payload = dump_rdb(&KeyValueStore::new());
    let directory = write_rdb_file("truncated", &payload[..payload.len() - 12]).await;

    let mut store = KeyValueStore::new();
    let result = load_rdb_file(&directory, "dump.rdb", &mut store).await;

    assert!(result.is_err());

    tokio::fs::remove_dir_all(&directory).await.unwrap();
}
