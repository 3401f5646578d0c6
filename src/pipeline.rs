//! Drives the graph from a payment log and writes one median per admitted line.

use anyhow::{Context, Result};
use std::io::{BufRead, Write};
use std::sync::atomic::{AtomicBool, Ordering};

use crate::config::Config;
use crate::degree::Median;
use crate::graph::{Admission, TransactionGraph, WindowSize};
use crate::ingest::{self, IngestError};
use crate::metrics::Metrics;

static QUIET: AtomicBool = AtomicBool::new(false);
/// Toggle routine per-line logging. Warnings still print.
pub fn set_quiet_logging(quiet: bool) {
    QUIET.store(quiet, Ordering::Relaxed);
}

// stdout carries the medians, so all logging goes to stderr
macro_rules! graph_log {
    ($($arg:tt)*) => {
        if !QUIET.load(Ordering::Relaxed) {
            eprintln!($($arg)*);
        }
    };
}

#[derive(Debug)]
pub enum LineOutcome {
    Blank,
    Malformed(IngestError),
    Admitted(Median),
    /// Carries the unchanged current median.
    Rejected(Option<Median>),
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RunStats {
    pub lines: u64,
    pub blank: u64,
    pub malformed: u64,
    pub admitted: u64,
    pub rejected: u64,
    pub replaced: u64,
    pub evicted: u64,
}

pub struct Pipeline {
    graph: TransactionGraph,
    stats: RunStats,
    emit_on_reject: bool,
    metrics: Option<Metrics>,
}

impl Pipeline {
    pub fn new(window: WindowSize) -> Self {
        Pipeline {
            graph: TransactionGraph::new(window),
            stats: RunStats::default(),
            emit_on_reject: false,
            metrics: None,
        }
    }

    pub fn from_config(cfg: &Config) -> Result<Self> {
        Ok(Self::new(cfg.window_size()?).emit_on_reject(cfg.output.emit_on_reject))
    }

    pub fn emit_on_reject(mut self, on: bool) -> Self {
        self.emit_on_reject = on;
        self
    }

    pub fn with_metrics(mut self, metrics: Metrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn graph(&self) -> &TransactionGraph {
        &self.graph
    }

    pub fn stats(&self) -> &RunStats {
        &self.stats
    }

    pub fn handle_line(&mut self, line: &str) -> LineOutcome {
        self.stats.lines += 1;
        self.handle_parsed(ingest::parse_line(line))
    }

    /// Like `handle_line`, for raw input bytes that may not be UTF-8.
    pub fn handle_bytes(&mut self, line: &[u8]) -> LineOutcome {
        self.stats.lines += 1;
        self.handle_parsed(ingest::parse_bytes(line))
    }

    fn handle_parsed(&mut self, parsed: Result<Option<ingest::Payment>, IngestError>) -> LineOutcome {
        let payment = match parsed {
            Ok(Some(p)) => p,
            Ok(None) => {
                self.stats.blank += 1;
                return LineOutcome::Blank;
            }
            Err(e) => {
                self.stats.malformed += 1;
                if let Some(m) = &self.metrics {
                    m.malformed.inc();
                }
                eprintln!("⚠️  Skipping line {}: {}", self.stats.lines, e);
                return LineOutcome::Malformed(e);
            }
        };

        let admission = self.graph.process_edge(payment.timestamp, &payment.actor, &payment.target);
        if let Some(m) = &self.metrics {
            m.observe(&admission, &self.graph);
        }

        match admission {
            Admission::Admitted(report) => {
                self.stats.admitted += 1;
                self.stats.evicted += report.evicted as u64;
                if report.replaced {
                    self.stats.replaced += 1;
                }
                graph_log!(
                    "➕ {} -> {} @{} | median {} (edges {}, evicted {})",
                    payment.actor, payment.target, payment.timestamp,
                    report.median, self.graph.edge_count(), report.evicted
                );
                LineOutcome::Admitted(report.median)
            }
            Admission::Rejected => {
                self.stats.rejected += 1;
                graph_log!(
                    "⏪ Dropped {} -> {} @{}: outside window of newest {:?}",
                    payment.actor, payment.target, payment.timestamp, self.graph.max_timestamp()
                );
                LineOutcome::Rejected(self.graph.median())
            }
        }
    }

    /// The line to emit for `outcome`, if any.
    pub fn output_for(&self, outcome: &LineOutcome) -> Option<Median> {
        match outcome {
            LineOutcome::Admitted(m) => Some(*m),
            LineOutcome::Rejected(m) if self.emit_on_reject => *m,
            _ => None,
        }
    }

    /// Processes every line of `reader`, writing medians to `writer`.
    ///
    /// Lines are split on raw bytes; a line that is not UTF-8 is skipped as
    /// malformed like any other bad record.
    pub fn run<R: BufRead, W: Write>(&mut self, mut reader: R, mut writer: W) -> Result<RunStats> {
        let mut buf = Vec::new();
        loop {
            buf.clear();
            let read = reader
                .read_until(b'\n', &mut buf)
                .with_context(|| format!("failed to read input line {}", self.stats.lines + 1))?;
            if read == 0 {
                break;
            }
            let outcome = self.handle_bytes(&buf);
            if let Some(median) = self.output_for(&outcome) {
                writeln!(writer, "{}", median).context("failed to write median")?;
            }
        }
        writer.flush().context("failed to flush output")?;
        Ok(self.stats.clone())
    }
}

impl RunStats {
    pub fn summary(&self) -> String {
        format!(
            "{} lines: {} admitted, {} rejected, {} malformed, {} blank; {} replaced, {} evicted",
            self.lines, self.admitted, self.rejected, self.malformed, self.blank, self.replaced, self.evicted
        )
    }
}
