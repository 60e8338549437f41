use tracing::trace;

use crate::join::frame::Frame;
use crate::join::stage::{JoinPlan, StagePlan};
use crate::types::Record;

/// The four join stages applied in their fixed order.
///
/// Implementations decide what a unit of work is: a single record enriched in place, or a
/// whole batch joined column by column. Both must leave every unit with the same fields.
pub trait JoinPipeline {
    type Unit;

    fn join_fraud(&self, unit: &mut Self::Unit);
    fn join_card(&self, unit: &mut Self::Unit);
    fn join_user(&self, unit: &mut Self::Unit);
    fn join_mcc(&self, unit: &mut Self::Unit);

    /// Runs fraud, card, user, then mcc. The user stage depends on the card stage's `user_id`.
    fn apply(&self, unit: &mut Self::Unit) {
        self.join_fraud(unit);
        self.join_card(unit);
        self.join_user(unit);
        self.join_mcc(unit);
    }
}

/// Row-at-a-time joins: one hash probe per stage, matched fields merged into the record.
pub struct RowJoiner<'a> {
    plan: &'a JoinPlan
}

impl<'a> RowJoiner<'a> {
    pub fn new(plan: &'a JoinPlan) -> Self {
        Self { plan }
    }

    fn join(&self, plan: &StagePlan, record: &mut Record) {
        let Some(stage) = plan.active() else {
            return;
        };

        let Some(matched) = record.get(stage.left_key).and_then(|key| stage.probe(key)) else {
            return;
        };

        for name in &stage.contributes {
            record.insert(name.as_str(), matched.get(name).cloned().unwrap_or_default());
        }

        stage.record_matches(1);
    }
}

impl JoinPipeline for RowJoiner<'_> {
    type Unit = Record;

    fn join_fraud(&self, unit: &mut Record) {
        self.join(self.plan.fraud(), unit);
    }

    fn join_card(&self, unit: &mut Record) {
        self.join(self.plan.card(), unit);
    }

    fn join_user(&self, unit: &mut Record) {
        self.join(self.plan.user(), unit);
    }

    fn join_mcc(&self, unit: &mut Record) {
        self.join(self.plan.mcc(), unit);
    }
}

/// Whole-batch hash joins over a column-major frame.
pub struct BatchJoiner<'a> {
    plan: &'a JoinPlan
}

impl<'a> BatchJoiner<'a> {
    pub fn new(plan: &'a JoinPlan) -> Self {
        Self { plan }
    }

    fn join(&self, plan: &StagePlan, frame: &mut Frame) {
        let Some(stage) = plan.active() else {
            return;
        };

        let Some(keys) = frame.column(stage.left_key) else {
            return;
        };

        let matches: Vec<Option<&Record>> = keys.iter().map(|key| stage.probe(key)).collect();
        let matched = matches.iter().flatten().count();

        trace!("{} join [{}] = [{}] matched {matched} of {} rows in batch", stage.name, stage.left_key, stage.right_key, frame.height());

        if matched == 0 {
            return;
        }

        for name in &stage.contributes {
            let mut values = frame.take_column(name);

            for (value, reference) in values.iter_mut().zip(&matches) {
                if let Some(reference) = reference {
                    *value = reference.get(name).cloned().unwrap_or_default();
                }
            }

            frame.set_column(name, values);
        }

        stage.record_matches(matched);
    }
}

impl JoinPipeline for BatchJoiner<'_> {
    type Unit = Frame;

    fn join_fraud(&self, unit: &mut Frame) {
        self.join(self.plan.fraud(), unit);
    }

    fn join_card(&self, unit: &mut Frame) {
        self.join(self.plan.card(), unit);
    }

    fn join_user(&self, unit: &mut Frame) {
        self.join(self.plan.user(), unit);
    }

    fn join_mcc(&self, unit: &mut Frame) {
        self.join(self.plan.mcc(), unit);
    }
}
