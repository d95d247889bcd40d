//! SQLite-backed task state.
//!
//! Each successful task run records a blake3 fingerprint per input file.
//! A task whose inputs all match their recorded fingerprints (and whose
//! targets exist) is up to date and skipped on the next run.

use crate::error::Result;
use rusqlite::{Connection, params};
use std::collections::HashMap;
use std::fs::File;
use std::path::Path;

/// Default file name for the state database, inside the data directory.
pub const STATE_DB_FILE: &str = ".basis-state.sqlite";

/// SQLite store of per-task input fingerprints.
#[derive(Debug)]
pub struct StateDb {
    conn: Connection,
}

impl StateDb {
    /// Open (or create) the state database at `path`.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let conn = Connection::open(path)?;
        let db = Self { conn };
        db.initialize_schema()?;
        Ok(db)
    }

    /// Create an in-memory state database (useful for testing).
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let db = Self { conn };
        db.initialize_schema()?;
        Ok(db)
    }

    fn initialize_schema(&self) -> Result<()> {
        self.conn.execute(
            "CREATE TABLE IF NOT EXISTS task_inputs (
                task TEXT NOT NULL,
                path TEXT NOT NULL,
                fingerprint TEXT NOT NULL,
                PRIMARY KEY (task, path)
            )",
            [],
        )?;
        Ok(())
    }

    /// Recorded input fingerprints for a task, keyed by path.
    pub fn fingerprints(&self, task: &str) -> Result<HashMap<String, String>> {
        let mut stmt = self
            .conn
            .prepare("SELECT path, fingerprint FROM task_inputs WHERE task = ?1")?;
        let rows = stmt.query_map(params![task], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?;

        let mut out = HashMap::new();
        for row in rows {
            let (path, fingerprint) = row?;
            out.insert(path, fingerprint);
        }
        Ok(out)
    }

    /// Replace the recorded fingerprints for a task.
    pub fn record(&mut self, task: &str, inputs: &[(String, String)]) -> Result<()> {
        let tx = self.conn.transaction()?;
        tx.execute("DELETE FROM task_inputs WHERE task = ?1", params![task])?;
        for (path, fingerprint) in inputs {
            tx.execute(
                "INSERT INTO task_inputs (task, path, fingerprint) VALUES (?1, ?2, ?3)",
                params![task, path, fingerprint],
            )?;
        }
        tx.commit()?;
        Ok(())
    }

    /// Forget a task's recorded state.
    pub fn clear(&self, task: &str) -> Result<()> {
        self.conn
            .execute("DELETE FROM task_inputs WHERE task = ?1", params![task])?;
        Ok(())
    }
}

/// Blake3 fingerprint of a file, or `None` if it does not exist.
pub fn fingerprint_file(path: &Path) -> Result<Option<String>> {
    let mut file = match File::open(path) {
        Ok(file) => file,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(err) => return Err(err.into()),
    };
    let mut hasher = blake3::Hasher::new();
    std::io::copy(&mut file, &mut hasher)?;
    Ok(Some(hasher.finalize().to_hex().to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_and_read_back() {
        let mut db = StateDb::in_memory().unwrap();
        db.record(
            "calc",
            &[
                ("a.parquet".to_string(), "fp-a".to_string()),
                ("b.parquet".to_string(), "fp-b".to_string()),
            ],
        )
        .unwrap();

        let fps = db.fingerprints("calc").unwrap();
        assert_eq!(fps.len(), 2);
        assert_eq!(fps.get("a.parquet").map(String::as_str), Some("fp-a"));
        assert!(db.fingerprints("other").unwrap().is_empty());
    }

    #[test]
    fn record_replaces_previous_state() {
        let mut db = StateDb::in_memory().unwrap();
        db.record("calc", &[("a".to_string(), "fp-1".to_string())])
            .unwrap();
        db.record("calc", &[("b".to_string(), "fp-2".to_string())])
            .unwrap();

        let fps = db.fingerprints("calc").unwrap();
        assert_eq!(fps.len(), 1);
        assert_eq!(fps.get("b").map(String::as_str), Some("fp-2"));
    }

    #[test]
    fn clear_forgets_a_task() {
        let mut db = StateDb::in_memory().unwrap();
        db.record("calc", &[("a".to_string(), "fp".to_string())])
            .unwrap();
        db.clear("calc").unwrap();
        assert!(db.fingerprints("calc").unwrap().is_empty());
    }

    #[test]
    fn fingerprint_of_missing_file_is_none() {
        let path = std::env::temp_dir().join("basis-state-no-such-file");
        assert!(fingerprint_file(&path).unwrap().is_none());
    }

    #[test]
    fn fingerprint_changes_with_content() {
        let dir = std::env::temp_dir();
        let path = dir.join(format!("basis-state-fp-{}", std::process::id()));

        std::fs::write(&path, b"one").unwrap();
        let first = fingerprint_file(&path).unwrap().unwrap();
        std::fs::write(&path, b"two").unwrap();
        let second = fingerprint_file(&path).unwrap().unwrap();
        assert_ne!(first, second);

        std::fs::remove_file(&path).unwrap();
    }
}
