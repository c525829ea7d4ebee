use std::marker::PhantomData;

use stagehand_core::{BatchId, Component};
use stagehand_storage::{CommandSink, ComponentSource};
use tracing::{debug, info_span, warn};

use crate::config::OverlayConfig;
use crate::error::EngineError;
use crate::overlay::{BatchStats, Staged, StagingOverlay};

/// A set of component types staged together in one batch, read from a
/// snapshot of type `R`.
///
/// Implemented for tuples of one to eight [`Component`] types.
pub trait TrackedComponents<R: 'static>: 'static {
    /// One [`StagingOverlay`] per tracked type.
    type Overlays: 'static;

    /// One [`Staged`] view per tracked type.
    type Batch<'a>
    where
        Self: 'a,
        R: 'a;

    const NAMES: &'static [&'static str];

    fn create(config: &OverlayConfig) -> Self::Overlays;

    fn begin<'a>(
        overlays: &'a mut Self::Overlays,
        sink: &'a dyn CommandSink,
        source: &'a R,
    ) -> Self::Batch<'a>;

    /// Sum of every overlay's counters from the most recent batch.
    fn last_stats(overlays: &Self::Overlays) -> BatchStats;

    fn dispose(overlays: Self::Overlays);
}

macro_rules! impl_tracked {
    ($($t:ident => $idx:tt),+) => {
        impl<R: 'static, $($t: Component),+> TrackedComponents<R> for ($($t,)+)
        where
            $(R: ComponentSource<$t>,)+
        {
            type Overlays = ($(StagingOverlay<$t>,)+);

            type Batch<'a> = ($(Staged<'a, $t>,)+)
            where
                Self: 'a,
                R: 'a;

            const NAMES: &'static [&'static str] = &[$($t::NAME),+];

            fn create(config: &OverlayConfig) -> Self::Overlays {
                ($(StagingOverlay::<$t>::with_config(*config),)+)
            }

            fn begin<'a>(
                overlays: &'a mut Self::Overlays,
                sink: &'a dyn CommandSink,
                source: &'a R,
            ) -> Self::Batch<'a> {
                ($(overlays.$idx.begin(sink, source),)+)
            }

            fn last_stats(overlays: &Self::Overlays) -> BatchStats {
                let mut total = BatchStats::default();
                $(total += overlays.$idx.last_stats();)+
                total
            }

            fn dispose(overlays: Self::Overlays) {
                $(overlays.$idx.dispose();)+
            }
        }
    };
}

impl_tracked!(A => 0);
impl_tracked!(A => 0, B => 1);
impl_tracked!(A => 0, B => 1, C => 2);
impl_tracked!(A => 0, B => 1, C => 2, D => 3);
impl_tracked!(A => 0, B => 1, C => 2, D => 3, E => 4);
impl_tracked!(A => 0, B => 1, C => 2, D => 3, E => 4, F => 5);
impl_tracked!(A => 0, B => 1, C => 2, D => 3, E => 4, F => 5, G => 6);
impl_tracked!(A => 0, B => 1, C => 2, D => 3, E => 4, F => 5, G => 6, H => 7);

/// Shorthand for the tuple of [`Staged`] views a system receives.
pub type BatchOf<'a, C, R> = <C as TrackedComponents<R>>::Batch<'a>;

/// User logic run once per batch.
///
/// ```ignore
/// impl BatchSystem<MemoryStore> for Regen {
///     type Components = (Health, Frozen);
///
///     fn on_batch(&mut self, (mut health, frozen): (Staged<'_, Health>, Staged<'_, Frozen>)) -> Result<(), EngineError> {
///         for &entity in &self.targets {
///             if !frozen.contains(entity)? {
///                 if let Some(Health(hp)) = health.try_read(entity)? {
///                     health.add_or_set(entity, Health(hp + 1))?;
///                 }
///             }
///         }
///         Ok(())
///     }
/// }
/// ```
pub trait BatchSystem<R: 'static> {
    type Components: TrackedComponents<R>;

    fn on_batch(&mut self, batch: BatchOf<'_, Self::Components, R>) -> Result<(), EngineError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchReport {
    pub batch_id: BatchId,
    pub stats: BatchStats,
}

/// Owns one overlay per tracked type for the lifetime of a system and runs
/// the system against a fresh set of bound overlays each batch.
pub struct BatchController<S, R>
where
    S: BatchSystem<R>,
    R: 'static,
{
    system: S,
    overlays: <S::Components as TrackedComponents<R>>::Overlays,
    config: OverlayConfig,
    batches_run: u64,
    _source: PhantomData<fn(&R)>,
}

impl<S, R> BatchController<S, R>
where
    S: BatchSystem<R>,
    R: 'static,
{
    pub fn new(system: S) -> Self {
        Self::with_config(system, OverlayConfig::default())
    }

    pub fn with_config(system: S, config: OverlayConfig) -> Self {
        let names = <S::Components as TrackedComponents<R>>::NAMES;
        debug!(components = ?names, "batch controller created");
        Self {
            system,
            overlays: <S::Components as TrackedComponents<R>>::create(&config),
            config,
            batches_run: 0,
            _source: PhantomData,
        }
    }

    /// Run one batch: reset and bind every overlay, then hand them to the system.
    ///
    /// Commands land in `sink`; nothing is applied to `source`.
    pub fn run(&mut self, sink: &dyn CommandSink, source: &R) -> Result<BatchReport, EngineError> {
        let batch_id = BatchId::new();
        let names = <S::Components as TrackedComponents<R>>::NAMES;
        let span = info_span!("batch", id = %batch_id, components = ?names);
        let _enter = span.enter();

        let batch = <S::Components as TrackedComponents<R>>::begin(&mut self.overlays, sink, source);
        if let Err(e) = self.system.on_batch(batch) {
            warn!(error = %e, "batch logic failed");
            return Err(e);
        }
        self.batches_run += 1;

        let stats = <S::Components as TrackedComponents<R>>::last_stats(&self.overlays);
        debug!(
            adds = stats.adds,
            sets = stats.sets,
            removes = stats.removes,
            elided = stats.elided,
            "batch complete"
        );
        Ok(BatchReport { batch_id, stats })
    }

    pub fn batches_run(&self) -> u64 {
        self.batches_run
    }

    pub fn config(&self) -> &OverlayConfig {
        &self.config
    }

    pub fn system(&self) -> &S {
        &self.system
    }

    pub fn system_mut(&mut self) -> &mut S {
        &mut self.system
    }

    pub fn overlays(&self) -> &<S::Components as TrackedComponents<R>>::Overlays {
        &self.overlays
    }

    /// Dispose every overlay and hand the system back.
    pub fn dispose(self) -> S {
        <S::Components as TrackedComponents<R>>::dispose(self.overlays);
        debug!(batches_run = self.batches_run, "batch controller disposed");
        self.system
    }
}
