use std::collections::HashMap;
use std::ops::AddAssign;

use stagehand_core::{Command, CommandKind, Component, ids::EntityId};
use stagehand_storage::{CommandSink, ComponentSource};
use tracing::{debug, trace};

use crate::config::OverlayConfig;
use crate::error::EngineError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PendingStatus {
    Removed,
    Set,
}

/// Net effect of this batch's operations on one entity's component.
#[derive(Debug, Clone, PartialEq)]
pub enum Pending<T> {
    Removed,
    Set(T),
}

impl<T> Pending<T> {
    pub fn status(&self) -> PendingStatus {
        match self {
            Self::Removed => PendingStatus::Removed,
            Self::Set(_) => PendingStatus::Set,
        }
    }

    pub fn value(&self) -> Option<&T> {
        match self {
            Self::Removed => None,
            Self::Set(value) => Some(value),
        }
    }
}

/// Per-batch command counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchStats {
    pub adds: u64,
    pub sets: u64,
    pub removes: u64,
    /// Calls that forwarded nothing.
    pub elided: u64,
}

impl BatchStats {
    pub fn forwarded(&self) -> u64 {
        self.adds + self.sets + self.removes
    }

    fn record(&mut self, kind: CommandKind) {
        match kind {
            CommandKind::Add => self.adds += 1,
            CommandKind::Set => self.sets += 1,
            CommandKind::Remove => self.removes += 1,
        }
    }
}

impl AddAssign for BatchStats {
    fn add_assign(&mut self, rhs: Self) {
        self.adds += rhs.adds;
        self.sets += rhs.sets;
        self.removes += rhs.removes;
        self.elided += rhs.elided;
    }
}

/// Reconciliation cache for one component type.
///
/// Lives as long as the owning harness; its pending map is wiped by every
/// [`begin`](Self::begin). Operations are only reachable through the
/// [`Staged`] view `begin` returns, so nothing can touch the overlay outside
/// a batch, and [`dispose`](Self::dispose) consumes it.
///
/// Not thread-safe: one batch, one thread.
///
/// ```
/// # use serde::{Deserialize, Serialize};
/// # use stagehand_core::{Component, EntityId};
/// # use stagehand_engine::StagingOverlay;
/// # use stagehand_storage::{CommandBuffer, MemoryStore};
/// # #[derive(Clone, Serialize, Deserialize)]
/// # struct Health(u32);
/// # impl Component for Health { const NAME: &'static str = "health"; }
/// let buffer = CommandBuffer::new();
/// let store = MemoryStore::new();
/// let mut overlay = StagingOverlay::<Health>::new();
///
/// let mut staged = overlay.begin(&buffer, &store);
/// staged.add_or_set(EntityId::new(), Health(1))?;
///
/// overlay.dispose();
/// # Ok::<(), stagehand_engine::EngineError>(())
/// ```
///
/// Operations do not exist on the overlay itself, only on the bound view:
///
/// ```compile_fail
/// # use serde::{Deserialize, Serialize};
/// # use stagehand_core::{Component, EntityId};
/// # use stagehand_engine::StagingOverlay;
/// # #[derive(Clone, Serialize, Deserialize)]
/// # struct Health(u32);
/// # impl Component for Health { const NAME: &'static str = "health"; }
/// let mut overlay = StagingOverlay::<Health>::new();
/// overlay.add_or_set(EntityId::new(), Health(1));
/// ```
///
/// A disposed overlay cannot start another batch:
///
/// ```compile_fail
/// # use serde::{Deserialize, Serialize};
/// # use stagehand_core::Component;
/// # use stagehand_engine::StagingOverlay;
/// # use stagehand_storage::{CommandBuffer, MemoryStore};
/// # #[derive(Clone, Serialize, Deserialize)]
/// # struct Health(u32);
/// # impl Component for Health { const NAME: &'static str = "health"; }
/// let buffer = CommandBuffer::new();
/// let store = MemoryStore::new();
/// let mut overlay = StagingOverlay::<Health>::new();
/// overlay.dispose();
/// overlay.begin(&buffer, &store);
/// ```
#[derive(Debug)]
pub struct StagingOverlay<T: Component> {
    pending: HashMap<EntityId, Pending<T>>,
    stats: BatchStats,
    config: OverlayConfig,
}

impl<T: Component> Default for StagingOverlay<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Component> StagingOverlay<T> {
    pub fn new() -> Self {
        Self::with_config(OverlayConfig::default())
    }

    pub fn with_config(config: OverlayConfig) -> Self {
        Self {
            pending: HashMap::with_capacity(config.initial_capacity),
            stats: BatchStats::default(),
            config,
        }
    }

    /// Start a batch against `sink` and the frozen `source` snapshot.
    pub fn begin<'a>(
        &'a mut self,
        sink: &'a dyn CommandSink,
        source: &'a dyn ComponentSource<T>,
    ) -> Staged<'a, T> {
        let stale = self.pending.len();
        self.pending.clear();
        if self.pending.capacity() > self.config.max_retained_capacity {
            self.pending.shrink_to(self.config.initial_capacity);
        }
        self.stats = BatchStats::default();
        debug!(component = T::NAME, stale, "overlay begin");

        Staged {
            overlay: self,
            sink,
            source,
        }
    }

    /// Counters from the most recent batch.
    pub fn last_stats(&self) -> BatchStats {
        self.stats
    }

    /// Entities touched by the most recent batch.
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    pub fn config(&self) -> &OverlayConfig {
        &self.config
    }

    pub fn dispose(self) {
        debug!(
            component = T::NAME,
            capacity = self.pending.capacity(),
            "overlay disposed"
        );
    }
}

/// A [`StagingOverlay`] bound to one batch's sink and snapshot.
///
/// Reads see this batch's own writes first and fall through to the snapshot
/// for untouched entities. Every mutating call forwards at most one command.
pub struct Staged<'a, T: Component> {
    overlay: &'a mut StagingOverlay<T>,
    sink: &'a dyn CommandSink,
    source: &'a dyn ComponentSource<T>,
}

impl<T: Component> Staged<'_, T> {
    pub fn try_read(&self, entity: EntityId) -> Result<Option<T>, EngineError> {
        match self.overlay.pending.get(&entity) {
            Some(Pending::Removed) => Ok(None),
            Some(Pending::Set(value)) => Ok(Some(value.clone())),
            None => Ok(self.source.get(entity)?),
        }
    }

    /// Presence as this batch currently sees it.
    pub fn contains(&self, entity: EntityId) -> Result<bool, EngineError> {
        match self.overlay.pending.get(&entity) {
            Some(pending) => Ok(pending.status() == PendingStatus::Set),
            None => Ok(self.source.contains(entity)?),
        }
    }

    /// Remove the component. Removing an absent component is a silent no-op.
    pub fn remove(&mut self, entity: EntityId) -> Result<Option<CommandKind>, EngineError> {
        if !self.contains(entity)? {
            self.elide(entity, "remove");
            return Ok(None);
        }

        self.forward(Command::remove::<T>(entity))?;
        self.overlay.pending.insert(entity, Pending::Removed);
        Ok(Some(CommandKind::Remove))
    }

    /// Add the component if absent, otherwise overwrite it.
    ///
    /// Overwriting a zero-sized component forwards nothing; adding one
    /// always forwards `Add`, since the store needs the row.
    pub fn add_or_set(&mut self, entity: EntityId, value: T) -> Result<Option<CommandKind>, EngineError> {
        let kind = if !self.contains(entity)? {
            self.forward(Command::add(entity, &value)?)?;
            Some(CommandKind::Add)
        } else if T::ZERO_SIZED {
            self.elide(entity, "set");
            None
        } else {
            self.forward(Command::set(entity, &value)?)?;
            Some(CommandKind::Set)
        };

        self.overlay.pending.insert(entity, Pending::Set(value));
        Ok(kind)
    }

    /// `add_or_set` with the default value, for tag components.
    pub fn set_flag(&mut self, entity: EntityId) -> Result<Option<CommandKind>, EngineError>
    where
        T: Default,
    {
        self.add_or_set(entity, T::default())
    }

    pub fn status(&self, entity: EntityId) -> Option<PendingStatus> {
        self.overlay.pending.get(&entity).map(Pending::status)
    }

    pub fn pending_len(&self) -> usize {
        self.overlay.pending.len()
    }

    /// Net state of every entity touched so far, in no particular order.
    /// `None` means the component ends the batch removed.
    pub fn changes(&self) -> impl Iterator<Item = (EntityId, Option<&T>)> + '_ {
        self.overlay
            .pending
            .iter()
            .map(|(entity, pending)| (*entity, pending.value()))
    }

    pub fn stats(&self) -> BatchStats {
        self.overlay.stats
    }

    fn forward(&mut self, command: Command) -> Result<(), EngineError> {
        let kind = command.kind();
        trace!(
            component = T::NAME,
            entity = %command.entity,
            kind = kind.as_str(),
            "forward"
        );
        self.sink.push(command)?;
        self.overlay.stats.record(kind);
        Ok(())
    }

    fn elide(&mut self, entity: EntityId, op: &'static str) {
        trace!(component = T::NAME, %entity, op, "elided");
        self.overlay.stats.elided += 1;
    }
}
