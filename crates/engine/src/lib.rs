pub mod config;
pub mod controller;
pub mod error;
pub mod overlay;

pub use config::OverlayConfig;
pub use controller::{BatchController, BatchOf, BatchReport, BatchSystem, TrackedComponents};
pub use error::EngineError;
pub use overlay::{BatchStats, Pending, PendingStatus, Staged, StagingOverlay};
