use std::path::PathBuf;
use std::time::Duration;

use tracing::info;

use crate::join::{StageOutcome, StageReport};

/// What a merge run produced.
#[derive(Debug, Clone)]
pub struct MergeSummary {
    pub rows: usize,
    pub columns: usize,
    pub output: Option<PathBuf>,
    pub elapsed: Duration,
    pub stages: Vec<StageReport>
}

impl MergeSummary {
    pub fn log(&self) {
        info!("Merged {} rows into {} columns in {:?}", self.rows, self.columns, self.elapsed);

        for stage in &self.stages {
            match stage.outcome {
                StageOutcome::Joined { matched, coercion } => info!("{} join matched {matched} rows using {coercion}", stage.name),
                StageOutcome::Skipped(reason) => info!("{} join skipped: {reason}", stage.name)
            }
        }

        match &self.output {
            Some(path) => info!("Unified dataset written to {path:?}"),
            None => info!("No unified dataset written")
        }
    }
}
