use anyhow::Result;
use prometheus::{Encoder, IntCounter, IntGauge, Registry, TextEncoder};
use std::thread;

use crate::graph::{Admission, TransactionGraph};

/// Counters for one pipeline run, prefixed `txgraph_`.
#[derive(Clone)]
pub struct Metrics {
    registry: Registry,
    pub admitted: IntCounter,
    pub rejected: IntCounter,
    pub malformed: IntCounter,
    pub evicted: IntCounter,
    pub replaced: IntCounter,
    pub nodes: IntGauge,
    pub edges: IntGauge,
}

impl Metrics {
    pub fn new() -> Result<Self> {
        let registry = Registry::new();
        let admitted = IntCounter::new("txgraph_admitted_total", "Payments admitted into the window")?;
        let rejected = IntCounter::new("txgraph_rejected_total", "Payments older than the window")?;
        let malformed = IntCounter::new("txgraph_malformed_total", "Input lines that failed to parse")?;
        let evicted = IntCounter::new("txgraph_evicted_total", "Edges evicted as the window advanced")?;
        let replaced = IntCounter::new("txgraph_replaced_total", "Edges superseded by a newer payment between the same users")?;
        let nodes = IntGauge::new("txgraph_nodes", "Users with at least one edge in the window")?;
        let edges = IntGauge::new("txgraph_edges", "Edges currently in the window")?;

        registry.register(Box::new(admitted.clone()))?;
        registry.register(Box::new(rejected.clone()))?;
        registry.register(Box::new(malformed.clone()))?;
        registry.register(Box::new(evicted.clone()))?;
        registry.register(Box::new(replaced.clone()))?;
        registry.register(Box::new(nodes.clone()))?;
        registry.register(Box::new(edges.clone()))?;

        Ok(Metrics { registry, admitted, rejected, malformed, evicted, replaced, nodes, edges })
    }

    pub fn observe(&self, admission: &Admission, graph: &TransactionGraph) {
        match admission {
            Admission::Admitted(report) => {
                self.admitted.inc();
                self.evicted.inc_by(report.evicted as u64);
                if report.replaced {
                    self.replaced.inc();
                }
            }
            Admission::Rejected => self.rejected.inc(),
        }
        self.nodes.set(graph.node_count() as i64);
        self.edges.set(graph.edge_count() as i64);
    }

    /// Text exposition of every registered metric.
    pub fn render(&self) -> Result<Vec<u8>> {
        let mut buffer = vec![];
        TextEncoder::new().encode(&self.registry.gather(), &mut buffer)?;
        Ok(buffer)
    }
}

pub fn serve(bind: &str, metrics: Metrics) -> Result<()> {
    let server = tiny_http::Server::http(bind)
        .map_err(|e| anyhow::anyhow!("could not start metrics server on {}: {}", bind, e))?;
    let content_type: tiny_http::Header = "Content-Type: text/plain; version=0.0.4; charset=utf-8"
        .parse()
        .map_err(|_| anyhow::anyhow!("bad metrics content type header"))?;

    thread::spawn(move || {
        for request in server.incoming_requests() {
            let buffer = match metrics.render() {
                Ok(b) => b,
                Err(e) => {
                    eprintln!("🔥 Could not encode metrics: {}", e);
                    continue;
                }
            };
            let response = tiny_http::Response::from_data(buffer).with_header(content_type.clone());
            let _ = request.respond(response);
        }
    });

    Ok(())
}
