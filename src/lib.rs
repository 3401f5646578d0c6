// Library interface for txgraph
// The binary and the integration tests both go through these modules

pub mod config;
pub mod edge;
pub mod window;
pub mod degree;
pub mod graph;
pub mod ingest;
pub mod metrics;
pub mod pipeline;

pub use edge::Edge;
pub use degree::{DegreeIndex, Median};
pub use window::{EntryKey, WindowedEdgeSet};
pub use graph::{Admission, AdmitReport, TransactionGraph, WindowSize};
pub use ingest::{parse_bytes, parse_line, IngestError, Payment};
pub use pipeline::{LineOutcome, Pipeline, RunStats};
