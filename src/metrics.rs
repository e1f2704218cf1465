//! Per-run engine metrics: node run/completion counts, edge queue depths,
//! and wall-clock time, collectible after [`crate::graph::Graph::run`].
//!
//! Ambient per the system prompt and spec.md §9's design notes (the crate
//! carries observability the way the rest of the corpus does, even though
//! spec.md §1(f) places *time-profiling utilities* for a back-end adapter
//! out of scope -- this module profiles the kernel's own engines, not a
//! `Runnable`).
//!
//! Grounded on the teacher's `src/metrics.rs` (`Metric` trait,
//! `MetricsCollector`, JSON export via `serde_json`), retargeted from
//! per-pipeline-collection stats to per-graph-run stats: [`snapshot`]
//! walks a constructed [`crate::graph::Graph`]'s node/edge arenas instead
//! of a `PCollection`'s element counts.

use crate::graph::Graph;
use serde_json::{json, Value};
use std::any::Any;
use std::collections::HashMap;
use std::fs::File;
use std::io::{self, Write};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

/// Interface for a custom metric. Built-in metrics ([`CounterMetric`],
/// [`GaugeMetric`]) implement this; application code can register its own.
pub trait Metric: Send + Sync + Any {
    /// The name this metric is registered and reported under.
    fn name(&self) -> &str;

    /// The current value, as JSON (so heterogeneous metrics can share one
    /// report).
    fn value(&self) -> Value;

    /// Optional human-readable description, included in `print`/`to_json`.
    fn description(&self) -> Option<&str> {
        None
    }

    /// Downcast support for callers that need to read back a specific
    /// concrete metric type (e.g. to increment a counter in place).
    fn as_any(&self) -> &dyn Any;
}

struct Inner {
    metrics: HashMap<String, Box<dyn Metric>>,
    start_time: Option<Instant>,
    end_time: Option<Instant>,
}

/// Thread-safe collector of named metrics for one graph run.
///
/// Cheap to clone -- clones share the same underlying table, so a
/// collector can be handed to [`Graph::run_with_metrics`] and then read
/// back by the caller that created it.
#[derive(Clone)]
pub struct MetricsCollector {
    inner: Arc<Mutex<Inner>>,
}

impl MetricsCollector {
    /// A fresh collector with no metrics and no recorded timing.
    #[must_use]
    pub fn new() -> Self {
        Self { inner: Arc::new(Mutex::new(Inner { metrics: HashMap::new(), start_time: None, end_time: None })) }
    }

    /// Register a metric, replacing any existing one under the same name.
    pub fn register(&self, metric: Box<dyn Metric>) {
        self.inner.lock().unwrap().metrics.insert(metric.name().to_string(), metric);
    }

    pub(crate) fn record_start(&self) {
        self.inner.lock().unwrap().start_time = Some(Instant::now());
    }

    pub(crate) fn record_end(&self) {
        self.inner.lock().unwrap().end_time = Some(Instant::now());
    }

    /// Wall-clock duration between the last `record_start`/`record_end`
    /// pair, if both have happened.
    #[must_use]
    pub fn elapsed(&self) -> Option<Duration> {
        let inner = self.inner.lock().unwrap();
        match (inner.start_time, inner.end_time) {
            (Some(start), Some(end)) => Some(end.duration_since(start)),
            _ => None,
        }
    }

    /// Set (or replace) a named counter to an exact value.
    pub fn set_counter(&self, name: &str, value: u64) {
        self.inner.lock().unwrap().metrics.insert(name.to_string(), Box::new(CounterMetric::with_value(name, value)));
    }

    /// Set (or replace) a named gauge to an exact value.
    pub fn set_gauge(&self, name: &str, value: f64) {
        self.inner.lock().unwrap().metrics.insert(name.to_string(), Box::new(GaugeMetric::new(name, value)));
    }

    /// All metrics, as one JSON object, plus `execution_time_ms` if timing
    /// was recorded.
    #[must_use]
    pub fn to_json(&self) -> Value {
        let inner = self.inner.lock().unwrap();
        let mut out = serde_json::Map::new();
        for (name, metric) in &inner.metrics {
            let mut obj = serde_json::Map::new();
            obj.insert("value".to_string(), metric.value());
            if let Some(desc) = metric.description() {
                obj.insert("description".to_string(), json!(desc));
            }
            out.insert(name.clone(), Value::Object(obj));
        }
        if let (Some(start), Some(end)) = (inner.start_time, inner.end_time) {
            out.insert("execution_time_ms".to_string(), json!(end.duration_since(start).as_millis()));
        }
        Value::Object(out)
    }

    /// A flat name -> value snapshot, without descriptions or timing.
    #[must_use]
    pub fn snapshot(&self) -> HashMap<String, Value> {
        let inner = self.inner.lock().unwrap();
        inner.metrics.iter().map(|(name, metric)| (name.clone(), metric.value())).collect()
    }

    /// Write the `to_json()` report, pretty-printed, to `path`.
    pub fn save_to_file(&self, path: &str) -> io::Result<()> {
        let mut file = File::create(path)?;
        let formatted = serde_json::to_string_pretty(&self.to_json())?;
        file.write_all(formatted.as_bytes())
    }

    /// Print the report to stdout in a human-readable format.
    pub fn print(&self) {
        println!("\n========== Graph Run Metrics ==========");
        if let Some(elapsed) = self.elapsed() {
            println!("Execution Time: {:.3}s ({} ms)", elapsed.as_secs_f64(), elapsed.as_millis());
            println!("----------------------------------------");
        }
        let inner = self.inner.lock().unwrap();
        let mut sorted: Vec<_> = inner.metrics.iter().collect();
        sorted.sort_by_key(|(name, _)| (*name).clone());
        for (name, metric) in sorted {
            match metric.description() {
                Some(desc) => println!("{name}: {} ({desc})", metric.value()),
                None => println!("{name}: {}", metric.value()),
            }
        }
        println!("========================================\n");
    }
}

impl Default for MetricsCollector {
    fn default() -> Self {
        Self::new()
    }
}

/// A named integer counter.
pub struct CounterMetric {
    name: String,
    count: u64,
}

impl CounterMetric {
    /// A counter starting at `count`.
    #[must_use]
    pub fn with_value(name: impl Into<String>, count: u64) -> Self {
        Self { name: name.into(), count }
    }
}

impl Metric for CounterMetric {
    fn name(&self) -> &str {
        &self.name
    }
    fn value(&self) -> Value {
        json!(self.count)
    }
    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// A named floating-point gauge.
pub struct GaugeMetric {
    name: String,
    value: f64,
}

impl GaugeMetric {
    #[must_use]
    pub fn new(name: impl Into<String>, value: f64) -> Self {
        Self { name: name.into(), value }
    }
}

impl Metric for GaugeMetric {
    fn name(&self) -> &str {
        &self.name
    }
    fn value(&self) -> Value {
        json!(self.value)
    }
    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Snapshots per-node `run_size`/`completed_size` counters and per-edge
/// queue depths from a constructed graph into a fresh [`MetricsCollector`].
///
/// Meant to be called after [`Graph::run`] (or, for the pipeline engine,
/// after [`Graph::synchronize`]) so the counters reflect a completed pass.
#[must_use]
pub fn snapshot(graph: &Graph) -> MetricsCollector {
    let collector = MetricsCollector::new();
    for (_, entry) in graph.entries() {
        collector.set_counter(&format!("node.{}.run_size", entry.name()), entry.run_size() as u64);
        collector.set_counter(&format!("node.{}.completed_size", entry.name()), entry.completed_size() as u64);
    }
    for edge in graph.all_edges() {
        collector.set_gauge(&format!("edge.{}.queue_len", edge.name()), edge.queue_len() as f64);
    }
    collector
}

impl Graph {
    /// Runs the graph once (as [`Graph::run`]), recording wall-clock start
    /// and end time into `collector`. Node/edge counters are not captured
    /// automatically -- call [`snapshot`] afterward for those, since the
    /// pipeline engine's `run()` returns before its workers have actually
    /// finished the frame it just started (see `synchronize`).
    pub fn run_with_metrics(&self, collector: &MetricsCollector) -> crate::error::Result<()> {
        collector.record_start();
        let result = self.run();
        collector.record_end();
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mode::ParallelMode;
    use crate::node::Node;

    struct Noop;
    impl Node for Noop {
        fn run(&mut self) -> crate::error::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn snapshot_reports_run_and_completed_counts() {
        let g = Graph::new("m");
        g.set_parallel_type(ParallelMode::Sequential);
        g.create_node("a", Noop, vec![], vec![]).unwrap();
        g.init().unwrap();
        g.run().unwrap();
        g.deinit().unwrap();

        let snap = snapshot(&g);
        let values = snap.snapshot();
        assert_eq!(values["node.a.run_size"], json!(1));
        assert_eq!(values["node.a.completed_size"], json!(1));
    }

    #[test]
    fn snapshot_reports_edge_queue_depth() {
        let g = Graph::new("m-edge");
        g.set_parallel_type(ParallelMode::Sequential);
        let e = g.create_edge("e").unwrap();
        g.create_node("a", Noop, vec![], vec![e]).unwrap();
        g.init().unwrap();
        g.deinit().unwrap();

        let snap = snapshot(&g);
        let values = snap.snapshot();
        assert_eq!(values["edge.e.queue_len"], json!(0.0));
    }

    #[test]
    fn run_with_metrics_records_timing() {
        let g = Graph::new("m2");
        g.set_parallel_type(ParallelMode::Sequential);
        g.create_node("a", Noop, vec![], vec![]).unwrap();
        g.init().unwrap();

        let collector = MetricsCollector::new();
        g.run_with_metrics(&collector).unwrap();
        g.deinit().unwrap();

        assert!(collector.elapsed().is_some());
    }

    #[test]
    fn to_json_includes_counters_and_timing() {
        let collector = MetricsCollector::new();
        collector.set_counter("frames", 3);
        collector.record_start();
        collector.record_end();
        let value = collector.to_json();
        assert_eq!(value["frames"]["value"], json!(3));
        assert!(value.get("execution_time_ms").is_some());
    }
}
