use crate::join::Frame;
use crate::storage::Storage;
use dashmap::DashMap;
use std::sync::Arc;

/// Enriched partitions keyed by their position in the transaction stream.
pub struct PartitionStore {
    partitions: Arc<DashMap<usize, Frame>>
}

impl PartitionStore {
    pub fn new() -> Self {
        Self {
            partitions: Arc::new(DashMap::new())
        }
    }

    pub fn len(&self) -> usize {
        self.partitions.len()
    }

    /// Total rows held across every stored partition.
    pub fn rows(&self) -> usize {
        self.partitions.iter().map(|partition| partition.height()).sum()
    }
}

impl Storage for PartitionStore {
    fn take(&self, index: usize) -> Option<Frame> {
        self.partitions.remove(&index).map(|(_, frame)| frame)
    }

    fn save(&self, index: usize, frame: Frame) {
        self.partitions.insert(index, frame);
    }
}
