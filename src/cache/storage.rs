// Storage backends for the cache store

use rusqlite::{params, Connection, OptionalExtension};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Mutex;

/// Durable (or test-volatile) key/value medium behind the cache store.
///
/// Implementations only move strings; freshness and (de)serialization live
/// in [`super::CacheStore`].
pub trait CacheStorage: Send + Sync {
    fn read(&self, key: &str) -> Option<String>;
    fn write(&self, key: &str, value: &str) -> Result<(), String>;
    fn delete(&self, key: &str) -> Result<(), String>;
}

/// SQLite-backed storage: one `cache_entries` key/value table.
pub struct SqliteStorage {
    conn: Mutex<Connection>,
}

impl SqliteStorage {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, String> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| format!("failed to create cache directory: {}", e))?;
            }
        }
        let conn = Connection::open(path)
            .map_err(|e| format!("failed to open cache database: {}", e))?;
        Self::from_connection(conn)
    }

    pub fn open_in_memory() -> Result<Self, String> {
        let conn = Connection::open_in_memory()
            .map_err(|e| format!("failed to open in-memory database: {}", e))?;
        Self::from_connection(conn)
    }

    fn from_connection(conn: Connection) -> Result<Self, String> {
        conn.execute(
            "CREATE TABLE IF NOT EXISTS cache_entries (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            )",
            [],
        )
        .map_err(|e| format!("failed to create cache table: {}", e))?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// All stored keys, for maintenance tooling.
    pub fn keys(&self) -> Vec<String> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = match conn.prepare("SELECT key FROM cache_entries ORDER BY key") {
            Ok(stmt) => stmt,
            Err(_) => return Vec::new(),
        };
        stmt.query_map([], |row| row.get::<_, String>(0))
            .map(|rows| rows.filter_map(|r| r.ok()).collect())
            .unwrap_or_default()
    }
}

impl CacheStorage for SqliteStorage {
    fn read(&self, key: &str) -> Option<String> {
        let conn = self.conn.lock().unwrap();
        conn.query_row(
            "SELECT value FROM cache_entries WHERE key = ?1",
            params![key],
            |row| row.get(0),
        )
        .optional()
        .ok()
        .flatten()
    }

    fn write(&self, key: &str, value: &str) -> Result<(), String> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT OR REPLACE INTO cache_entries (key, value) VALUES (?1, ?2)",
            params![key, value],
        )
        .map_err(|e| format!("cache write failed: {}", e))?;
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<(), String> {
        let conn = self.conn.lock().unwrap();
        conn.execute("DELETE FROM cache_entries WHERE key = ?1", params![key])
            .map_err(|e| format!("cache delete failed: {}", e))?;
        Ok(())
    }
}

/// In-memory storage for tests and ephemeral runs.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    data: Mutex<HashMap<String, String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.data.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl CacheStorage for MemoryStorage {
    fn read(&self, key: &str) -> Option<String> {
        self.data.lock().unwrap().get(key).cloned()
    }

    fn write(&self, key: &str, value: &str) -> Result<(), String> {
        self.data
            .lock()
            .unwrap()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<(), String> {
        self.data.lock().unwrap().remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn sqlite_roundtrip() {
        let dir = TempDir::new().unwrap();
        let storage = SqliteStorage::open(dir.path().join("cache.db")).unwrap();

        assert!(storage.read("missing").is_none());

        storage.write("markets:usd:1", "[1,2,3]").unwrap();
        assert_eq!(storage.read("markets:usd:1").as_deref(), Some("[1,2,3]"));

        // Overwrite keeps the latest value
        storage.write("markets:usd:1", "[4]").unwrap();
        assert_eq!(storage.read("markets:usd:1").as_deref(), Some("[4]"));

        storage.delete("markets:usd:1").unwrap();
        assert!(storage.read("markets:usd:1").is_none());
    }

    #[test]
    fn sqlite_persists_across_reopen() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("cache.db");

        {
            let storage = SqliteStorage::open(&path).unwrap();
            storage.write("token:eth:0xabc", "{\"price\":1.0}").unwrap();
        }

        let storage = SqliteStorage::open(&path).unwrap();
        assert_eq!(
            storage.read("token:eth:0xabc").as_deref(),
            Some("{\"price\":1.0}")
        );
    }

    #[test]
    fn sqlite_lists_keys() {
        let storage = SqliteStorage::open_in_memory().unwrap();
        storage.write("b", "2").unwrap();
        storage.write("a", "1").unwrap();
        assert_eq!(storage.keys(), vec!["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn memory_roundtrip() {
        let storage = MemoryStorage::new();
        storage.write("k", "v").unwrap();
        assert_eq!(storage.read("k").as_deref(), Some("v"));
        storage.delete("k").unwrap();
        assert!(storage.read("k").is_none());
        assert!(storage.is_empty());
    }
}
