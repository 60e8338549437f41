use super::PartitionWorker;
use crate::join::{Frame, JoinPlan};
use crate::sources::{FraudLabels, ReferenceData, Table};
use crate::storage::{PartitionStore, Storage};
use crate::types::{Record, Value};
use anyhow::{anyhow, Result};
use std::sync::Arc;
use tokio::sync::mpsc;

fn create_transaction(id: i64, card_id: i64) -> Record {
    [("id", Value::Integer(id)), ("card_id", Value::Integer(card_id))].into_iter().collect()
}

fn create_plan(transactions: &Table) -> Arc<JoinPlan> {
    let card = [("id", Value::Integer(1)), ("card_brand", Value::Text("Visa".to_string()))].into_iter().collect();

    let reference = ReferenceData {
        fraud: FraudLabels::Unavailable("not under test".to_string()),
        cards: Table::from_records(vec![card]),
        users: Table::empty(),
        mcc: Table::empty()
    };

    Arc::new(JoinPlan::build(transactions.columns(), reference))
}

#[tokio::test]
async fn test_workers_save_their_partitions_and_release_guards() -> Result<()> {
    let transactions = Table::from_records(vec![create_transaction(1, 1), create_transaction(2, 5), create_transaction(3, 1)]);
    let plan = create_plan(&transactions);
    let storage = Arc::new(PartitionStore::new());
    let (guard_sender, mut guard_receiver) = mpsc::channel::<()>(1);

    let rows = transactions.into_rows();
    PartitionWorker::spawn(0, Frame::from_records(rows[..2].to_vec()), plan.clone(), storage.clone(), guard_sender.clone());
    PartitionWorker::spawn(1, Frame::from_records(rows[2..].to_vec()), plan.clone(), storage.clone(), guard_sender);

    assert!(guard_receiver.recv().await.is_none());
    assert_eq!(storage.len(), 2);

    let first = storage.take(0).ok_or_else(|| anyhow!("Partition 0 missing from storage"))?.into_records();
    let second = storage.take(1).ok_or_else(|| anyhow!("Partition 1 missing from storage"))?.into_records();

    assert_eq!(first[0].get("card_brand"), Some(&Value::Text("Visa".to_string())));
    assert_eq!(first[1].get("card_brand"), Some(&Value::Null));
    assert_eq!(second[0].get("card_brand"), Some(&Value::Text("Visa".to_string())));
    assert_eq!(plan.card().active().map(|stage| stage.matched()), Some(2));

    Ok(())
}
