mod ingest;
mod parse;

pub use ingest::{Ingested, ingest};
pub use parse::parse_dataset;
