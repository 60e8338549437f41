mod batched_engine;
mod sequential_engine;
mod summary;

use std::path::Path;

use tokio::task::spawn_blocking;

use crate::config::{ExecutionMode, MergeConfig};
use crate::sources::TransactionSource;

pub use batched_engine::BatchedEngine;
pub use sequential_engine::SequentialEngine;
pub use summary::MergeSummary;

/// Runs one merge with the engine selected by the configuration.
pub async fn run(config: &MergeConfig) -> anyhow::Result<MergeSummary> {
    match config.mode {
        ExecutionMode::Sequential => SequentialEngine::new().run(config).await,
        ExecutionMode::Batched => BatchedEngine::new(config.partitions).run(config).await
    }
}

async fn open_transactions(path: &Path, sample_rows: usize) -> anyhow::Result<TransactionSource> {
    let path = path.to_path_buf();
    let source = spawn_blocking(move || TransactionSource::open(&path, sample_rows)).await??;

    Ok(source)
}
