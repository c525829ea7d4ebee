use rusqlite::Connection;

use stagehand_core::{Command, CommandOp, Component, ids::EntityId};

use crate::error::StorageError;
use crate::traits::{ComponentSource, ComponentStore, RowDigest};

/// Convert Vec<u8> to fixed-size array with proper error handling.
fn to_array<const N: usize>(v: Vec<u8>, label: &str) -> Result<[u8; N], StorageError> {
    v.try_into()
        .map_err(|_| StorageError::Serialization(format!("invalid {label} length")))
}

pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    pub fn open(path: &str) -> Result<Self, StorageError> {
        let conn = Connection::open(path)?;
        crate::schema::init_schema(&conn)?;
        Ok(Self { conn })
    }

    pub fn open_in_memory() -> Result<Self, StorageError> {
        let conn = Connection::open_in_memory()?;
        crate::schema::init_schema(&conn)?;
        Ok(Self { conn })
    }

    pub fn conn(&self) -> &Connection {
        &self.conn
    }
}

fn apply_one(tx: &rusqlite::Transaction, command: &Command) -> Result<(), StorageError> {
    let entity_blob = command.entity.as_bytes().as_slice();
    match &command.op {
        CommandOp::Add(bytes) => {
            let result = tx.execute(
                "INSERT INTO components (component, entity_id, value) VALUES (?1, ?2, ?3)",
                rusqlite::params![command.component, entity_blob, bytes],
            );
            match result {
                Ok(_) => {}
                Err(rusqlite::Error::SqliteFailure(err, _))
                    if err.code == rusqlite::ErrorCode::ConstraintViolation =>
                {
                    return Err(StorageError::ConstraintViolation(format!(
                        "{} already present on {}",
                        command.component, command.entity
                    )));
                }
                Err(e) => return Err(StorageError::Sqlite(e)),
            }
        }
        CommandOp::Set(bytes) => {
            let changed = tx.execute(
                "UPDATE components SET value = ?3 WHERE component = ?1 AND entity_id = ?2",
                rusqlite::params![command.component, entity_blob, bytes],
            )?;
            if changed == 0 {
                return Err(StorageError::NotFound(format!(
                    "{} on {}",
                    command.component, command.entity
                )));
            }
        }
        CommandOp::Remove => {
            let changed = tx.execute(
                "DELETE FROM components WHERE component = ?1 AND entity_id = ?2",
                rusqlite::params![command.component, entity_blob],
            )?;
            if changed == 0 {
                return Err(StorageError::NotFound(format!(
                    "{} on {}",
                    command.component, command.entity
                )));
            }
        }
    }
    Ok(())
}

impl ComponentStore for SqliteStore {
    fn get_raw(&self, component: &str, entity: EntityId) -> Result<Option<Vec<u8>>, StorageError> {
        let mut stmt = self
            .conn
            .prepare_cached("SELECT value FROM components WHERE component = ?1 AND entity_id = ?2")?;
        let mut rows = stmt.query_map(
            rusqlite::params![component, entity.as_bytes().as_slice()],
            |row| {
                let val_bytes: Vec<u8> = row.get(0)?;
                Ok(val_bytes)
            },
        )?;

        match rows.next() {
            Some(Ok(val_bytes)) => Ok(Some(val_bytes)),
            Some(Err(e)) => Err(StorageError::Sqlite(e)),
            None => Ok(None),
        }
    }

    /// All-or-nothing: the batch runs in one transaction.
    fn apply(&mut self, commands: &[Command]) -> Result<(), StorageError> {
        let tx = self.conn.transaction()?;
        for command in commands {
            apply_one(&tx, command)?;
        }
        tx.commit()?;
        Ok(())
    }

    fn row_count(&self) -> Result<u64, StorageError> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM components", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    fn digest(&self) -> Result<[u8; 32], StorageError> {
        let mut stmt = self.conn.prepare(
            "SELECT component, entity_id, value FROM components ORDER BY component, entity_id",
        )?;
        let rows = stmt.query_map([], |row| {
            let component: String = row.get(0)?;
            let entity_bytes: Vec<u8> = row.get(1)?;
            let value: Vec<u8> = row.get(2)?;
            Ok((component, entity_bytes, value))
        })?;

        let mut digest = RowDigest::new();
        for row in rows {
            let (component, entity_bytes, value) = row?;
            let entity = EntityId::from_bytes(to_array::<16>(entity_bytes, "entity_id")?);
            digest.update(&component, entity, &value);
        }
        Ok(digest.finalize())
    }
}

impl<T: Component> ComponentSource<T> for SqliteStore {
    fn contains(&self, entity: EntityId) -> Result<bool, StorageError> {
        self.contains_raw(T::NAME, entity)
    }

    fn get(&self, entity: EntityId) -> Result<Option<T>, StorageError> {
        self.read::<T>(entity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryStore;
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Health(u32);

    impl Component for Health {
        const NAME: &'static str = "health";
    }

    #[test]
    fn insert_read_remove() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        let entity = EntityId::new();
        store.insert(entity, &Health(3)).unwrap();
        assert_eq!(store.read::<Health>(entity).unwrap(), Some(Health(3)));

        store.apply(&[Command::remove::<Health>(entity)]).unwrap();
        assert_eq!(store.read::<Health>(entity).unwrap(), None);
        assert_eq!(store.row_count().unwrap(), 0);
    }

    #[test]
    fn failed_apply_rolls_back() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        let entity = EntityId::new();
        store.insert(entity, &Health(1)).unwrap();

        let result = store.apply(&[
            Command::set(entity, &Health(2)).unwrap(),
            Command::add(entity, &Health(3)).unwrap(),
        ]);
        assert!(matches!(result, Err(StorageError::ConstraintViolation(_))));
        assert_eq!(store.read::<Health>(entity).unwrap(), Some(Health(1)));
    }

    #[test]
    fn digest_matches_memory_store() {
        let mut sqlite = SqliteStore::open_in_memory().unwrap();
        let mut memory = MemoryStore::new();
        for n in 0..5 {
            let entity = EntityId::new();
            sqlite.insert(entity, &Health(n)).unwrap();
            memory.insert(entity, &Health(n)).unwrap();
        }
        assert_eq!(sqlite.digest().unwrap(), memory.digest().unwrap());
    }

    #[test]
    fn schema_version_recorded() {
        let store = SqliteStore::open_in_memory().unwrap();
        let version: i32 = store
            .conn()
            .query_row("SELECT MAX(version) FROM schema_version", [], |row| row.get(0))
            .unwrap();
        assert_eq!(version, crate::schema::SCHEMA_VERSION);
    }

    #[test]
    fn reopen_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("world.db");
        let path = path.to_str().unwrap();
        let entity = EntityId::new();
        {
            let mut store = SqliteStore::open(path).unwrap();
            store.insert(entity, &Health(9)).unwrap();
        }
        let store = SqliteStore::open(path).unwrap();
        assert_eq!(store.read::<Health>(entity).unwrap(), Some(Health(9)));
    }
}
