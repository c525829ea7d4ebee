use serde::{Deserialize, Serialize};

const DEFAULT_INITIAL_CAPACITY: usize = 64;
const DEFAULT_MAX_RETAINED_CAPACITY: usize = 4096;

/// Sizing for the per-overlay pending map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OverlayConfig {
    /// Entries reserved when the overlay is created.
    pub initial_capacity: usize,
    /// Above this, `begin` shrinks the map back to `initial_capacity`.
    pub max_retained_capacity: usize,
}

impl Default for OverlayConfig {
    fn default() -> Self {
        Self {
            initial_capacity: DEFAULT_INITIAL_CAPACITY,
            max_retained_capacity: DEFAULT_MAX_RETAINED_CAPACITY,
        }
    }
}
