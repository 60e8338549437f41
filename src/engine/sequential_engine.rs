use std::path::PathBuf;
use std::time::Instant;

use tokio::sync::mpsc;
use tokio::task::{spawn_blocking, JoinError, JoinHandle};
use tracing::{error, info};

use crate::config::MergeConfig;
use crate::engine::{open_transactions, MergeSummary};
use crate::join::{JoinPipeline, JoinPlan, RowJoiner};
use crate::output::{OutputError, OutputWriter};
use crate::sources::errors::SourceError;
use crate::sources::{ReferenceData, TransactionSource};
use crate::types::Record;

/// Row-at-a-time merge: every transaction is enriched and written as soon as it is read.
pub struct SequentialEngine {
    backpressure: usize
}

impl SequentialEngine {
    pub fn new() -> Self {
        Self {
            backpressure: 256
        }
    }

    /// Orchestrates the read, join and write stages for one run.
    pub async fn run(&self, config: &MergeConfig) -> anyhow::Result<MergeSummary> {
        let timer = Instant::now();

        let source = open_transactions(&config.sources.transactions, config.sample_rows).await?;
        let reference = ReferenceData::load(&config.sources).await?;

        info!("Loaded reference data in {:?}", timer.elapsed());

        let plan = JoinPlan::build(source.columns(), reference);
        let columns = plan.column_names();
        let column_count = columns.len();

        let writer = OutputWriter::create(&config.output, columns)?;

        let (record_sender, record_receiver) = mpsc::channel::<Record>(self.backpressure);
        let (output_sender, output_receiver) = mpsc::channel::<Record>(self.backpressure);

        let reader_handle = self.spawn_csv_reader(source, record_sender);
        let writer_handle = self.spawn_csv_writer(writer, output_receiver);

        self.process_transactions(&plan, record_receiver, output_sender).await;

        let ingestion = reader_handle.await;
        let writer = writer_handle.await??;
        let (rows, output) = publish(ingestion, writer).await?;

        Ok(MergeSummary {
            rows,
            columns: column_count,
            output,
            elapsed: timer.elapsed(),
            stages: plan.report()
        })
    }

    fn spawn_csv_reader(&self, source: TransactionSource, sender: mpsc::Sender<Record>) -> JoinHandle<Result<(), SourceError>> {
        spawn_blocking(move || {
            for result in source.into_records() {
                let record = result.inspect_err(|error| error!("CSV ingestion failed: {error}"))?;

                if sender.blocking_send(record).is_err() {
                    break;
                }
            }

            Ok(())
        })
    }

    /// Writes every enriched record and hands the unfinished writer back, so the file is only
    /// published once the whole stream has been read.
    fn spawn_csv_writer(&self, mut writer: OutputWriter, mut receiver: mpsc::Receiver<Record>) -> JoinHandle<Result<OutputWriter, OutputError>> {
        spawn_blocking(move || {
            while let Some(record) = receiver.blocking_recv() {
                writer.write(&record)?;
            }

            Ok(writer)
        })
    }

    async fn process_transactions(&self, plan: &JoinPlan, mut receiver: mpsc::Receiver<Record>, sender: mpsc::Sender<Record>) {
        let joiner = RowJoiner::new(plan);

        while let Some(mut record) = receiver.recv().await {
            joiner.apply(&mut record);

            //NOTE: The writer only hangs up after a failed write, its error is reported when the handle is awaited
            if sender.send(record).await.is_err() {
                break;
            }
        }
    }
}

/// Publishes the output only when the reader consumed the whole stream. On a failed read
/// the writer is dropped, which discards the partial file.
pub(super) async fn publish(ingestion: Result<Result<(), SourceError>, JoinError>, writer: OutputWriter) -> anyhow::Result<(usize, Option<PathBuf>)> {
    ingestion??;

    let rows = writer.rows();
    let output = spawn_blocking(move || writer.finish()).await??;

    Ok((rows, output))
}
