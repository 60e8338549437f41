use std::fmt;
use std::fmt::{Display, Formatter};
use std::sync::atomic::{AtomicUsize, Ordering};

use tracing::{info, warn};

use crate::join::lookup::Lookup;
use crate::join::normalizer::Coercion;
use crate::sources::{Column, ReferenceData, Table, MCC, TRANSACTION_ID};
use crate::types::{JoinKey, Record, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageName {
    Fraud,
    Card,
    User,
    Mcc
}

impl Display for StageName {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        let name = match self {
            StageName::Fraud => "fraud",
            StageName::Card => "card",
            StageName::User => "user",
            StageName::Mcc => "mcc"
        };

        formatter.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// The reference source is missing, empty, or has no usable keys.
    EmptySource,
    /// The accumulated transaction schema lacks the left key.
    MissingLeftKey,
    /// The reference source lacks its key column.
    MissingRightKey
}

impl Display for SkipReason {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        let reason = match self {
            SkipReason::EmptySource => "reference source is empty",
            SkipReason::MissingLeftKey => "transaction key column is absent",
            SkipReason::MissingRightKey => "reference key column is absent"
        };

        formatter.write_str(reason)
    }
}

/// One left-outer join against a reference lookup.
#[derive(Debug)]
pub struct JoinStage {
    pub name: StageName,
    pub left_key: &'static str,
    pub right_key: &'static str,
    pub coercion: Coercion,
    pub contributes: Vec<String>,
    lookup: Lookup,
    matched: AtomicUsize
}

impl JoinStage {
    pub fn probe(&self, key: &Value) -> Option<&Record> {
        self.coercion.key(key).and_then(|key: JoinKey| self.lookup.get(&key))
    }

    pub fn matched(&self) -> usize {
        self.matched.load(Ordering::Relaxed)
    }

    pub(crate) fn record_matches(&self, count: usize) {
        self.matched.fetch_add(count, Ordering::Relaxed);
    }
}

#[derive(Debug)]
pub enum StagePlan {
    Active(JoinStage),
    Skipped {
        name: StageName,
        reason: SkipReason
    }
}

impl StagePlan {
    pub fn name(&self) -> StageName {
        match self {
            StagePlan::Active(stage) => stage.name,
            StagePlan::Skipped { name, .. } => *name
        }
    }

    pub fn active(&self) -> Option<&JoinStage> {
        match self {
            StagePlan::Active(stage) => Some(stage),
            StagePlan::Skipped { .. } => None
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageOutcome {
    Joined {
        matched: usize,
        coercion: Coercion
    },
    Skipped(SkipReason)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StageReport {
    pub name: StageName,
    pub outcome: StageOutcome
}

/// The four join stages in their fixed order, resolved against the transaction schema.
///
/// Each stage sees the schema accumulated by the stages before it, which is how the user
/// stage finds the `user_id` column contributed by the card stage.
#[derive(Debug)]
pub struct JoinPlan {
    stages: [StagePlan; 4],
    columns: Vec<Column>
}

impl JoinPlan {
    pub fn build(transaction_columns: &[Column], reference: ReferenceData) -> Self {
        let mut columns = transaction_columns.to_vec();

        let fraud = plan_stage(StageName::Fraud, "id", TRANSACTION_ID, reference.fraud.into_table(), &mut columns);
        let card = plan_stage(StageName::Card, "card_id", "id", reference.cards, &mut columns);
        let user = plan_stage(StageName::User, "user_id", "id", reference.users, &mut columns);
        let mcc = plan_stage(StageName::Mcc, MCC, MCC, reference.mcc, &mut columns);

        Self { stages: [fraud, card, user, mcc], columns }
    }

    pub fn fraud(&self) -> &StagePlan {
        &self.stages[0]
    }

    pub fn card(&self) -> &StagePlan {
        &self.stages[1]
    }

    pub fn user(&self) -> &StagePlan {
        &self.stages[2]
    }

    pub fn mcc(&self) -> &StagePlan {
        &self.stages[3]
    }

    /// The output header seed: transaction columns followed by every active stage's contributions.
    pub fn column_names(&self) -> Vec<String> {
        self.columns.iter().map(|column| column.name.clone()).collect()
    }

    pub fn report(&self) -> Vec<StageReport> {
        self.stages.iter()
            .map(|plan| StageReport {
                name: plan.name(),
                outcome: match plan {
                    StagePlan::Active(stage) => StageOutcome::Joined { matched: stage.matched(), coercion: stage.coercion },
                    StagePlan::Skipped { reason, .. } => StageOutcome::Skipped(*reason)
                }
            })
            .collect()
    }
}

fn plan_stage(name: StageName, left_key: &'static str, right_key: &'static str, table: Table, columns: &mut Vec<Column>) -> StagePlan {
    let skipped = |reason: SkipReason| {
        info!("Skipping {name} join: {reason}");
        StagePlan::Skipped { name, reason }
    };

    if table.is_empty() {
        return skipped(SkipReason::EmptySource);
    }

    if !table.has_column(right_key) {
        return skipped(SkipReason::MissingRightKey);
    }

    let Some(left_type) = columns.iter().find(|column| column.name == left_key).map(|column| column.column_type) else {
        return skipped(SkipReason::MissingLeftKey);
    };

    let coercion = Coercion::harmonize(left_type, table.rows().iter().filter_map(|row| row.get(right_key)));

    if coercion == Coercion::Canonical {
        warn!("Keys of the {name} source do not fit the [{left_key}] column type, comparing as strings");
    }

    let contributed: Vec<Column> = table.columns().iter()
        .filter(|column| column.name != right_key)
        .cloned()
        .collect();

    let lookup = Lookup::build(table, right_key, coercion);

    if lookup.is_empty() {
        return skipped(SkipReason::EmptySource);
    }

    info!("Planned {name} join [{left_key}] = [{right_key}] over {} keys using {coercion}", lookup.len());

    for column in &contributed {
        match columns.iter_mut().find(|existing| existing.name == column.name) {
            Some(existing) => existing.column_type = existing.column_type.widen(column.column_type),
            None => columns.push(column.clone())
        }
    }

    StagePlan::Active(JoinStage {
        name,
        left_key,
        right_key,
        coercion,
        contributes: contributed.into_iter().map(|column| column.name).collect(),
        lookup,
        matched: AtomicUsize::new(0)
    })
}
