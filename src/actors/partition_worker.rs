use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::spawn_blocking;
use tracing::debug;

use crate::join::{BatchJoiner, Frame, JoinPipeline, JoinPlan};
use crate::storage::Storage;

pub struct PartitionWorker;

impl PartitionWorker {
    /// Joins one partition on the blocking pool and saves it under its index.
    /// Completion is signalled by dropping `guard_sender`.
    pub fn spawn<S: Storage>(index: usize, mut frame: Frame, plan: Arc<JoinPlan>, storage: Arc<S>, guard_sender: mpsc::Sender<()>) {
        spawn_blocking(move || {
            BatchJoiner::new(&plan).apply(&mut frame);

            debug!("Partition [{index}] enriched {} rows", frame.height());

            storage.save(index, frame);

            drop(guard_sender);
        });
    }
}
