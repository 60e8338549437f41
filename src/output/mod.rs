mod errors;
mod materializer;

pub use errors::OutputError;
pub use materializer::{output_columns, OutputWriter};
