use crate::buffers::HeatmapBuffers;
use crate::data_types::HeatmapConfig;
use crate::model::HeatmapModel;
use parking_lot::RwLock;
use std::sync::Arc;

/// Immutable view of one layer: model state plus the buffers built from it.
#[derive(Clone, Debug)]
pub struct HeatmapSnapshot {
    /// Increases by one with every publication.
    pub generation: u64,
    pub model: HeatmapModel,
    pub config: Arc<HeatmapConfig>,
    pub buffers: Option<Arc<HeatmapBuffers>>,
}

impl HeatmapSnapshot {
    pub fn empty(model: HeatmapModel, config: Arc<HeatmapConfig>) -> Self {
        Self {
            generation: 0,
            model,
            config,
            buffers: None,
        }
    }
}

/// Holds the latest published snapshot. Readers clone the `Arc` and never
/// observe a half-updated model.
#[derive(Debug)]
pub struct SnapshotCell {
    current: RwLock<Arc<HeatmapSnapshot>>,
}

impl SnapshotCell {
    pub fn new(initial: HeatmapSnapshot) -> Self {
        Self {
            current: RwLock::new(Arc::new(initial)),
        }
    }

    pub fn load(&self) -> Arc<HeatmapSnapshot> {
        self.current.read().clone()
    }

    /// Swaps in `next`, stamping it with the following generation.
    pub fn publish(&self, mut next: HeatmapSnapshot) -> u64 {
        let mut slot = self.current.write();
        next.generation = slot.generation + 1;
        let generation = next.generation;
        *slot = Arc::new(next);
        generation
    }
}
