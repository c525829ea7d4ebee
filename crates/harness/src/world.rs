use stagehand_core::{Component, ids::EntityId};
use stagehand_engine::{BatchController, BatchReport, BatchSystem};
use stagehand_storage::{CommandBuffer, ComponentStore, MemoryStore, SqliteStore, StorageError};

/// A backing store plus the command buffer that feeds it.
///
/// `step` runs one batch against the store as a frozen snapshot, then
/// commits whatever the batch forwarded.
pub struct TestWorld<S: ComponentStore> {
    pub store: S,
    pub buffer: CommandBuffer,
}

impl Default for TestWorld<MemoryStore> {
    fn default() -> Self {
        Self::new()
    }
}

impl TestWorld<MemoryStore> {
    pub fn new() -> Self {
        Self::with_store(MemoryStore::new())
    }
}

impl TestWorld<SqliteStore> {
    pub fn sqlite_in_memory() -> Result<Self, StorageError> {
        Ok(Self::with_store(SqliteStore::open_in_memory()?))
    }

    pub fn sqlite_file(path: &str) -> Result<Self, StorageError> {
        Ok(Self::with_store(SqliteStore::open(path)?))
    }
}

impl<S: ComponentStore> TestWorld<S> {
    pub fn with_store(store: S) -> Self {
        Self {
            store,
            buffer: CommandBuffer::new(),
        }
    }

    /// Create an entity carrying `value`.
    pub fn spawn_with<T: Component>(&mut self, value: &T) -> Result<EntityId, StorageError> {
        let entity = EntityId::new();
        self.store.insert(entity, value)?;
        Ok(entity)
    }

    pub fn insert<T: Component>(&mut self, entity: EntityId, value: &T) -> Result<(), StorageError> {
        self.store.insert(entity, value)
    }

    pub fn read<T: Component>(&self, entity: EntityId) -> Result<Option<T>, StorageError> {
        self.store.read::<T>(entity)
    }

    /// Run one batch and commit its commands.
    pub fn step<Sys>(
        &mut self,
        controller: &mut BatchController<Sys, S>,
    ) -> Result<BatchReport, Box<dyn std::error::Error>>
    where
        Sys: BatchSystem<S>,
        S: 'static,
    {
        let report = controller.run(&self.buffer, &self.store)?;
        self.buffer.commit(&mut self.store)?;
        Ok(report)
    }

    pub fn digest(&self) -> Result<[u8; 32], StorageError> {
        self.store.digest()
    }
}
