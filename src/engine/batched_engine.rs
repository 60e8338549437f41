use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use anyhow::anyhow;
use tokio::sync::mpsc;
use tokio::task::spawn_blocking;
use tracing::{debug, info};

use crate::actors::PartitionWorker;
use crate::config::MergeConfig;
use crate::engine::{open_transactions, MergeSummary};
use crate::join::{Frame, JoinPlan};
use crate::output::{output_columns, OutputError, OutputWriter};
use crate::sources::ReferenceData;
use crate::storage::{PartitionStore, Storage};
use crate::types::Record;

/// Whole-table merge: the transaction table is split into column-major partitions that are
/// hash-joined concurrently against the shared plan, then written back in source order.
pub struct BatchedEngine {
    partitions: usize
}

impl BatchedEngine {
    pub fn new(partitions: usize) -> Self {
        Self {
            partitions: partitions.max(1)
        }
    }

    pub async fn run(&self, config: &MergeConfig) -> anyhow::Result<MergeSummary> {
        let timer = Instant::now();

        let source = open_transactions(&config.sources.transactions, config.sample_rows).await?;
        let (table, reference) = tokio::try_join!(
            async move { Ok::<_, anyhow::Error>(spawn_blocking(move || source.into_table()).await??) },
            ReferenceData::load(&config.sources)
        )?;

        info!("Loaded {} transactions and reference data in {:?}", table.len(), timer.elapsed());

        let plan = Arc::new(JoinPlan::build(table.columns(), reference));
        let storage = Arc::new(PartitionStore::new());
        let partitions = self.spawn_workers(table.into_rows(), &plan, &storage).await;

        debug!("All {partitions} partitions joined, {} stored holding {} rows", storage.len(), storage.rows());

        let frames = (0..partitions)
            .map(|index| storage.take(index).ok_or_else(|| anyhow!("Partition [{index}] was not stored by its worker")))
            .collect::<anyhow::Result<Vec<Frame>>>()?;

        let seed = plan.column_names();
        let destination = config.output.clone();
        let (rows, columns, output) = spawn_blocking(move || materialize(frames, &seed, &destination)).await??;

        Ok(MergeSummary {
            rows,
            columns,
            output,
            elapsed: timer.elapsed(),
            stages: plan.report()
        })
    }

    /// Spawns one worker per partition and waits until every worker has released its guard.
    async fn spawn_workers(&self, rows: Vec<Record>, plan: &Arc<JoinPlan>, storage: &Arc<PartitionStore>) -> usize {
        let chunk_size = rows.len().div_ceil(self.partitions).max(1);
        let (guard_sender, mut guard_receiver) = mpsc::channel::<()>(1);
        let mut rows = rows.into_iter();
        let mut partitions = 0;

        loop {
            let chunk: Vec<Record> = rows.by_ref().take(chunk_size).collect();

            if chunk.is_empty() {
                break;
            }

            PartitionWorker::spawn(partitions, Frame::from_records(chunk), plan.clone(), storage.clone(), guard_sender.clone());
            partitions += 1;
        }

        //NOTE: The receiver yields None once the last worker drops its guard
        drop(guard_sender);
        let _ = guard_receiver.recv().await;

        partitions
    }
}

fn materialize(frames: Vec<Frame>, seed: &[String], destination: &Path) -> Result<(usize, usize, Option<PathBuf>), OutputError> {
    let records: Vec<Record> = frames.into_iter().flat_map(Frame::into_records).collect();
    let columns = output_columns(seed, &records);
    let column_count = columns.len();

    let mut writer = OutputWriter::create(destination, columns)?;

    for record in &records {
        writer.write(record)?;
    }

    let rows = writer.rows();

    Ok((rows, column_count, writer.finish()?))
}
