use stagehand_core::{Command, Component, component, ids::EntityId};

use crate::error::StorageError;

/// Read-only point lookups for one component type.
///
/// Implementations must present a stable view for the duration of a batch.
pub trait ComponentSource<T: Component> {
    fn contains(&self, entity: EntityId) -> Result<bool, StorageError>;

    fn get(&self, entity: EntityId) -> Result<Option<T>, StorageError>;
}

/// Write-only, append-only destination for deferred commands.
///
/// Takes `&self` so every overlay of a batch can share one sink.
pub trait CommandSink {
    fn push(&self, command: Command) -> Result<(), StorageError>;
}

/// The authoritative entity/component rows.
///
/// `apply` is strict: adding a component the entity already has is a
/// `ConstraintViolation`; setting or removing one it lacks is `NotFound`.
pub trait ComponentStore {
    fn get_raw(&self, component: &str, entity: EntityId) -> Result<Option<Vec<u8>>, StorageError>;

    fn contains_raw(&self, component: &str, entity: EntityId) -> Result<bool, StorageError> {
        Ok(self.get_raw(component, entity)?.is_some())
    }

    fn apply(&mut self, commands: &[Command]) -> Result<(), StorageError>;

    fn row_count(&self) -> Result<u64, StorageError>;

    /// BLAKE3 over every row in (component, entity) order.
    fn digest(&self) -> Result<[u8; 32], StorageError>;

    fn read<T: Component>(&self, entity: EntityId) -> Result<Option<T>, StorageError>
    where
        Self: Sized,
    {
        match self.get_raw(T::NAME, entity)? {
            Some(bytes) => Ok(Some(component::decode(&bytes)?)),
            None => Ok(None),
        }
    }

    /// Attach a component outside any batch, e.g. to seed a world.
    fn insert<T: Component>(&mut self, entity: EntityId, value: &T) -> Result<(), StorageError>
    where
        Self: Sized,
    {
        self.apply(&[Command::add(entity, value)?])
    }
}

/// Feeds rows into a BLAKE3 hasher with unambiguous framing.
pub(crate) struct RowDigest(blake3::Hasher);

impl RowDigest {
    pub(crate) fn new() -> Self {
        Self(blake3::Hasher::new())
    }

    pub(crate) fn update(&mut self, component: &str, entity: EntityId, value: &[u8]) {
        self.0.update(&(component.len() as u64).to_le_bytes());
        self.0.update(component.as_bytes());
        self.0.update(entity.as_bytes());
        self.0.update(&(value.len() as u64).to_le_bytes());
        self.0.update(value);
    }

    pub(crate) fn finalize(self) -> [u8; 32] {
        *self.0.finalize().as_bytes()
    }
}
