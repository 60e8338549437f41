mod partition_worker;
#[cfg(test)]
mod tests;

pub use partition_worker::PartitionWorker;
