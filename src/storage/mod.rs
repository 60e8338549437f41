mod partition_store;

use crate::join::Frame;

pub use partition_store::PartitionStore;

pub trait Storage: Send + Sync + 'static {
    fn take(&self, index: usize) -> Option<Frame>;
    fn save(&self, index: usize, frame: Frame);
}
