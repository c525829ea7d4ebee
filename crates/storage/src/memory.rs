use std::collections::HashMap;

use stagehand_core::{Command, CommandOp, Component, ids::EntityId};

use crate::error::StorageError;
use crate::traits::{ComponentSource, ComponentStore, RowDigest};

/// Heap-backed store: one row table per component name.
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    tables: HashMap<&'static str, HashMap<EntityId, Vec<u8>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replay `commands` against presence alone and report the first one
    /// that would fail, without touching any row.
    fn check(&self, commands: &[Command]) -> Result<(), StorageError> {
        let mut presence: HashMap<(&str, EntityId), bool> = HashMap::new();
        for command in commands {
            let key = (command.component, command.entity);
            let present = match presence.get(&key) {
                Some(&present) => present,
                None => self.contains_raw(command.component, command.entity)?,
            };
            match (&command.op, present) {
                (CommandOp::Add(_), true) => {
                    return Err(StorageError::ConstraintViolation(format!(
                        "{} already present on {}",
                        command.component, command.entity
                    )));
                }
                (CommandOp::Set(_) | CommandOp::Remove, false) => {
                    return Err(StorageError::NotFound(format!(
                        "{} on {}",
                        command.component, command.entity
                    )));
                }
                _ => {}
            }
            presence.insert(key, !matches!(command.op, CommandOp::Remove));
        }
        Ok(())
    }

    fn apply_checked(&mut self, command: &Command) {
        let table = self.tables.entry(command.component).or_default();
        match &command.op {
            CommandOp::Add(bytes) | CommandOp::Set(bytes) => {
                table.insert(command.entity, bytes.clone());
            }
            CommandOp::Remove => {
                table.remove(&command.entity);
            }
        }
    }
}

impl ComponentStore for MemoryStore {
    fn get_raw(&self, component: &str, entity: EntityId) -> Result<Option<Vec<u8>>, StorageError> {
        Ok(self
            .tables
            .get(component)
            .and_then(|table| table.get(&entity))
            .cloned())
    }

    fn contains_raw(&self, component: &str, entity: EntityId) -> Result<bool, StorageError> {
        Ok(self
            .tables
            .get(component)
            .is_some_and(|table| table.contains_key(&entity)))
    }

    /// All-or-nothing: every command is checked before any row changes.
    fn apply(&mut self, commands: &[Command]) -> Result<(), StorageError> {
        self.check(commands)?;
        for command in commands {
            self.apply_checked(command);
        }
        Ok(())
    }

    fn row_count(&self) -> Result<u64, StorageError> {
        Ok(self.tables.values().map(|t| t.len() as u64).sum())
    }

    fn digest(&self) -> Result<[u8; 32], StorageError> {
        let mut rows: Vec<(&str, EntityId, &[u8])> = self
            .tables
            .iter()
            .flat_map(|(name, table)| {
                table
                    .iter()
                    .map(move |(entity, value)| (*name, *entity, value.as_slice()))
            })
            .collect();
        rows.sort_by(|a, b| (a.0, a.1).cmp(&(b.0, b.1)));

        let mut digest = RowDigest::new();
        for (name, entity, value) in rows {
            digest.update(name, entity, value);
        }
        Ok(digest.finalize())
    }
}

impl<T: Component> ComponentSource<T> for MemoryStore {
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
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Health(u32);

    impl Component for Health {
        const NAME: &'static str = "health";
    }

    #[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
    struct Frozen;

    impl Component for Frozen {
        const NAME: &'static str = "frozen";
    }

    #[test]
    fn insert_then_read() {
        let mut store = MemoryStore::new();
        let entity = EntityId::new();
        store.insert(entity, &Health(10)).unwrap();

        assert_eq!(store.read::<Health>(entity).unwrap(), Some(Health(10)));
        assert!(ComponentSource::<Health>::contains(&store, entity).unwrap());
        assert!(!ComponentSource::<Frozen>::contains(&store, entity).unwrap());
        assert_eq!(store.row_count().unwrap(), 1);
    }

    #[test]
    fn strict_application() {
        let mut store = MemoryStore::new();
        let entity = EntityId::new();
        store.insert(entity, &Health(1)).unwrap();

        let dup = store.insert(entity, &Health(2));
        assert!(matches!(dup, Err(StorageError::ConstraintViolation(_))));

        let missing = EntityId::new();
        let set = store.apply(&[Command::set(missing, &Health(3)).unwrap()]);
        assert!(matches!(set, Err(StorageError::NotFound(_))));
        let remove = store.apply(&[Command::remove::<Health>(missing)]);
        assert!(matches!(remove, Err(StorageError::NotFound(_))));

        assert_eq!(store.read::<Health>(entity).unwrap(), Some(Health(1)));
    }

    #[test]
    fn failed_apply_rolls_back() {
        let mut store = MemoryStore::new();
        let entity = EntityId::new();
        store.insert(entity, &Health(1)).unwrap();
        let before = store.digest().unwrap();

        let result = store.apply(&[
            Command::set(entity, &Health(2)).unwrap(),
            Command::add(entity, &Health(3)).unwrap(),
        ]);
        assert!(matches!(result, Err(StorageError::ConstraintViolation(_))));
        assert_eq!(store.read::<Health>(entity).unwrap(), Some(Health(1)));
        assert_eq!(store.digest().unwrap(), before);
    }

    #[test]
    fn check_follows_earlier_commands_in_the_batch() {
        let mut store = MemoryStore::new();
        let entity = EntityId::new();

        store
            .apply(&[
                Command::add(entity, &Health(1)).unwrap(),
                Command::set(entity, &Health(2)).unwrap(),
                Command::remove::<Health>(entity),
                Command::add(entity, &Health(3)).unwrap(),
            ])
            .unwrap();
        assert_eq!(store.read::<Health>(entity).unwrap(), Some(Health(3)));

        let twice = store.apply(&[
            Command::remove::<Health>(entity),
            Command::remove::<Health>(entity),
        ]);
        assert!(matches!(twice, Err(StorageError::NotFound(_))));
        assert_eq!(store.read::<Health>(entity).unwrap(), Some(Health(3)));
    }

    #[test]
    fn digest_ignores_insertion_order() {
        let a = EntityId::new();
        let b = EntityId::new();

        let mut first = MemoryStore::new();
        first.insert(a, &Health(1)).unwrap();
        first.insert(b, &Frozen).unwrap();

        let mut second = MemoryStore::new();
        second.insert(b, &Frozen).unwrap();
        second.insert(a, &Health(1)).unwrap();

        assert_eq!(first.digest().unwrap(), second.digest().unwrap());

        second.apply(&[Command::set(a, &Health(2)).unwrap()]).unwrap();
        assert_ne!(first.digest().unwrap(), second.digest().unwrap());
    }
}
