pub(crate) mod errors;
mod fraud;
mod mcc;
mod table;
mod transactions;

use std::path::{Path, PathBuf};

use tokio::task::spawn_blocking;
use tracing::{error, info};

pub use fraud::{FraudLabels, TRANSACTION_ID};
pub use mcc::{load_mcc_table, MCC};
pub use table::{load_csv_table, Column, Table};
pub use transactions::TransactionSource;

/// Locations of the primary stream and the four reference sources.
#[derive(Debug, Clone)]
pub struct SourcePaths {
    pub transactions: PathBuf,
    pub cards: PathBuf,
    pub users: PathBuf,
    pub fraud: PathBuf,
    pub mcc: PathBuf
}

/// The reference datasets, fully loaded before any transaction is processed.
#[derive(Debug, Clone)]
pub struct ReferenceData {
    pub fraud: FraudLabels,
    pub cards: Table,
    pub users: Table,
    pub mcc: Table
}

impl ReferenceData {
    /// Loads the four sources concurrently on the blocking pool. Missing or unreadable
    /// sources degrade to empty tables; only a failed loader task is an error.
    pub async fn load(paths: &SourcePaths) -> anyhow::Result<Self> {
        let fraud_path = paths.fraud.clone();
        let cards_path = paths.cards.clone();
        let users_path = paths.users.clone();
        let mcc_path = paths.mcc.clone();

        let (fraud, cards, users, mcc) = tokio::try_join!(
            spawn_blocking(move || FraudLabels::load(&fraud_path)),
            spawn_blocking(move || load_reference_table("cards", &cards_path)),
            spawn_blocking(move || load_reference_table("users", &users_path)),
            spawn_blocking(move || load_mcc_table(&mcc_path))
        )?;

        Ok(Self { fraud, cards, users, mcc })
    }
}

fn load_reference_table(name: &str, path: &Path) -> Table {
    match load_csv_table(path) {
        Ok(Some(table)) => {
            info!("Loaded {} {name} from {path:?}", table.len());
            table
        }
        Ok(None) => {
            info!("Reference source {path:?} not found, {name} join disabled");
            Table::empty()
        }
        Err(error) => {
            error!("Reference source for {name} is unreadable, {name} join disabled: {error}");
            Table::empty()
        }
    }
}
