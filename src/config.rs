use std::num::NonZeroUsize;
use std::path::PathBuf;
use std::thread::available_parallelism;

use clap::{Parser, ValueEnum};

use crate::sources::SourcePaths;

pub const DEFAULT_SAMPLE_ROWS: usize = 100;

/// How the join pipeline is scheduled. Both modes produce the same output file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ExecutionMode {
    /// Stream transactions one at a time through the joins and straight to the output.
    Sequential,
    /// Load every transaction, then hash-join column-major partitions on worker threads.
    Batched
}

#[derive(Debug, Parser)]
#[command(
    name = "unified-financial-dataset",
    version,
    about = "Merge transactions with card, user, fraud-label and merchant-category data into one CSV"
)]
pub struct Cli {
    /// Directory holding the input files.
    #[arg(long, value_name = "DIR", default_value = "archive")]
    pub data_dir: PathBuf,

    /// Transaction CSV, relative to the data directory unless absolute.
    #[arg(long, value_name = "FILE", default_value = "transactions_data.csv")]
    pub transactions: PathBuf,

    #[arg(long, value_name = "FILE", default_value = "cards_data.csv")]
    pub cards: PathBuf,

    #[arg(long, value_name = "FILE", default_value = "users_data.csv")]
    pub users: PathBuf,

    /// Fraud labels, JSON in any supported shape or CSV.
    #[arg(long, value_name = "FILE", default_value = "train_fraud_labels.json")]
    pub fraud: PathBuf,

    /// Merchant-category codes, JSON.
    #[arg(long, value_name = "FILE", default_value = "mcc_codes.json")]
    pub mcc: PathBuf,

    /// Destination of the unified CSV. Its directory is created when missing.
    #[arg(long, value_name = "FILE", default_value = "unified/unified_financial_dataset.csv")]
    pub output: PathBuf,

    #[arg(long, value_enum, default_value = "sequential")]
    pub mode: ExecutionMode,

    /// Number of partitions in batched mode (defaults to the available parallelism).
    #[arg(long)]
    pub partitions: Option<NonZeroUsize>,

    /// Transaction rows sampled to infer the column types of the join keys.
    #[arg(long, default_value_t = DEFAULT_SAMPLE_ROWS)]
    pub infer_schema_rows: usize,

    /// error, warn, info, debug or trace.
    #[arg(long, default_value = "info")]
    pub log_level: String
}

/// The resolved settings of a single merge run.
#[derive(Debug, Clone)]
pub struct MergeConfig {
    pub sources: SourcePaths,
    pub output: PathBuf,
    pub mode: ExecutionMode,
    pub partitions: usize,
    pub sample_rows: usize
}

impl MergeConfig {
    pub fn from_cli(cli: &Cli) -> Self {
        let resolve = |file: &PathBuf| cli.data_dir.join(file);

        Self {
            sources: SourcePaths {
                transactions: resolve(&cli.transactions),
                cards: resolve(&cli.cards),
                users: resolve(&cli.users),
                fraud: resolve(&cli.fraud),
                mcc: resolve(&cli.mcc)
            },
            output: cli.output.clone(),
            mode: cli.mode,
            partitions: cli.partitions
                .or_else(|| available_parallelism().ok())
                .map_or(1, NonZeroUsize::get),
            sample_rows: cli.infer_schema_rows
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{Cli, ExecutionMode, MergeConfig, DEFAULT_SAMPLE_ROWS};
    use anyhow::Result;
    use clap::Parser;
    use std::path::PathBuf;

    #[test]
    fn test_defaults_resolve_sources_under_the_data_directory() -> Result<()> {
        let cli = Cli::try_parse_from(["unified-financial-dataset"])?;
        let config = MergeConfig::from_cli(&cli);

        assert_eq!(config.sources.cards, PathBuf::from("archive").join("cards_data.csv"));
        assert_eq!(config.sources.fraud, PathBuf::from("archive").join("train_fraud_labels.json"));
        assert_eq!(config.output, PathBuf::from("unified/unified_financial_dataset.csv"));
        assert_eq!(config.mode, ExecutionMode::Sequential);
        assert_eq!(config.sample_rows, DEFAULT_SAMPLE_ROWS);
        assert!(config.partitions >= 1);

        Ok(())
    }

    #[test]
    fn test_overrides_and_absolute_paths() -> Result<()> {
        let cli = Cli::try_parse_from([
            "unified-financial-dataset",
            "--data-dir", "data",
            "--users", "/srv/users.csv",
            "--mode", "batched",
            "--partitions", "3"
        ])?;
        let config = MergeConfig::from_cli(&cli);

        assert_eq!(config.sources.users, PathBuf::from("/srv/users.csv"));
        assert_eq!(config.sources.transactions, PathBuf::from("data").join("transactions_data.csv"));
        assert_eq!(config.mode, ExecutionMode::Batched);
        assert_eq!(config.partitions, 3);

        Ok(())
    }

    #[test]
    fn test_zero_partitions_are_rejected() {
        assert!(Cli::try_parse_from(["unified-financial-dataset", "--partitions", "0"]).is_err());
    }
}
