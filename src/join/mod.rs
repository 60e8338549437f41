mod frame;
mod lookup;
mod normalizer;
mod pipeline;
pub(crate) mod stage;
#[cfg(test)]
mod tests;

pub use frame::Frame;
pub use pipeline::{BatchJoiner, JoinPipeline, RowJoiner};
pub use stage::{JoinPlan, StageOutcome, StageReport};
