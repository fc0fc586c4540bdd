//! End-to-end tracker tests against a canned explorer.
//!
//! Fetch → parse → graph → clusters/end receivers/blacklist → anomalies,
//! with no network access.

use serde_json::{json, Value};
use std::cell::RefCell;
use std::collections::HashMap;
use txtrack_core::{
    anomaly::{OutlierModel, Prediction},
    cluster::BlacklistCandidate,
    config::TrackerConfig,
    error::{TrackerError, TrackerResult},
    fetcher::Upstream,
    tracker::Tracker,
};
use uuid::Uuid;

const EXPLORER: &str = "https://blockchain.info";
const HASKOIN: &str = "https://api.blockchain.info/haskoin-store/btc";

/// Serves canned documents by URL; anything else is a 503.
#[derive(Default)]
struct FakeExplorer {
    docs:  HashMap<String, Value>,
    calls: RefCell<Vec<String>>,
}

impl FakeExplorer {
    fn with(mut self, url: String, doc: Value) -> Self {
        self.docs.insert(url, doc);
        self
    }

    fn with_tx(self, txid: &str, doc: Value) -> Self {
        self.with(format!("{EXPLORER}/rawtx/{txid}"), doc)
    }

    fn with_history(self, address: &str, doc: Value) -> Self {
        self.with(format!("{EXPLORER}/rawaddr/{address}"), doc)
    }

    fn calls_to(&self, url: &str) -> usize {
        self.calls.borrow().iter().filter(|u| *u == url).count()
    }
}

impl Upstream for FakeExplorer {
    fn get_json(&self, url: &str) -> TrackerResult<Value> {
        self.calls.borrow_mut().push(url.to_string());
        self.docs
            .get(url)
            .cloned()
            .ok_or_else(|| TrackerError::UpstreamStatus { url: url.to_string(), status: 503 })
    }
}

struct NeverOutlier;

impl OutlierModel for NeverOutlier {
    fn fit_predict(&mut self, features: &[f64], _contamination: f64) -> Vec<Prediction> {
        vec![Prediction::Inlier; features.len()]
    }
}

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// A, B -> R1 (1.0 BTC), R2 (0.5 BTC)
fn root_tx() -> Value {
    json!({
        "hash": "root",
        "time": 1700000000,
        "inputs": [
            {"prev_out": {"addr": "A", "value": 100000000}},
            {"prev_out": {"addr": "B", "value": 60000000}}
        ],
        "out": [
            {"addr": "R1", "value": 100000000},
            {"addr": "R2", "value": 50000000}
        ]
    })
}

fn history(receiver: &str, funders: &[&str]) -> Value {
    let inputs: Vec<Value> = funders
        .iter()
        .map(|f| json!({"prev_out": {"addr": f, "value": 1000}}))
        .collect();
    json!({
        "address": receiver,
        "txs": [{"inputs": inputs, "out": [{"addr": receiver, "value": 900}]}]
    })
}

fn tracker(explorer: FakeExplorer) -> Tracker<FakeExplorer> {
    Tracker::with_upstream(explorer, TrackerConfig::default_test())
        .expect("valid config")
        .with_model(Box::new(NeverOutlier))
}

#[test]
fn trace_runs_the_full_pipeline() {
    init_logging();
    let explorer = FakeExplorer::default()
        .with_tx("root", root_tx())
        .with_history("R1", history("R1", &["H", "S"]))
        .with_history("R2", history("R2", &["H", "T"]));
    let mut tracker = tracker(explorer);

    let report = tracker.trace("root").expect("trace");

    assert_eq!(report.transfers.len(), 4, "2 inputs x 2 outputs");
    assert_eq!(report.graph.nodes.len(), 4);
    assert_eq!(report.graph.links.len(), 4);
    assert_eq!(report.cluster_count, 1);
    assert_eq!(report.largest_cluster.members, vec!["A", "R1", "R2", "B"]);
    assert_eq!(report.end_receivers, vec!["R1", "R2"]);
    assert_eq!(
        report.blacklist,
        vec![BlacklistCandidate { address: "H".into(), occurrences: 2 }]
    );
    assert!(report.anomalies.is_empty());
    assert!(Uuid::parse_str(&report.report_id).is_ok());
}

#[test]
fn unavailable_receiver_history_is_skipped() {
    init_logging();
    let explorer = FakeExplorer::default()
        .with_tx("root", root_tx())
        .with_history("R1", history("R1", &["H", "H"]));
    let mut tracker = tracker(explorer);

    let report = tracker.trace("root").expect("trace");

    assert_eq!(report.blacklist.len(), 1);
    assert_eq!(report.blacklist[0].address, "H");

    let retries = tracker.config().api.retries as usize;
    let upstream = tracker.fetcher().upstream();
    assert_eq!(upstream.calls_to(&format!("{EXPLORER}/rawaddr/R2")), retries);
    assert_eq!(upstream.calls_to(&format!("{EXPLORER}/rawaddr/R1")), 1);
}

/// A bad config is rejected before the explorer is touched.
#[test]
fn invalid_contamination_fails_before_any_fetch() {
    let mut config = TrackerConfig::default_test();
    config.anomaly.contamination = 0.9;
    let explorer = FakeExplorer::default()
        .with_tx("root", root_tx())
        .with_history("R1", history("R1", &["H"]));

    let result = Tracker::with_upstream(explorer, config);
    assert!(matches!(
        result,
        Err(TrackerError::InvalidContamination { value }) if value == 0.9
    ));
}

#[test]
fn trace_fails_when_root_is_unavailable() {
    let mut tracker = tracker(FakeExplorer::default());
    assert!(matches!(
        tracker.trace("missing"),
        Err(TrackerError::UpstreamStatus { status: 503, .. })
    ));
}

#[test]
fn transaction_without_inputs_or_outputs_yields_empty_analysis() {
    let explorer = FakeExplorer::default().with_tx("empty", json!({"hash": "empty"}));
    let mut tracker = tracker(explorer);

    let report = tracker.trace("empty").expect("trace");

    assert!(report.transfers.is_empty());
    assert!(report.graph.nodes.is_empty());
    assert_eq!(report.cluster_count, 0);
    assert!(report.largest_cluster.is_empty());
    assert!(report.end_receivers.is_empty());
    assert!(report.blacklist.is_empty());
    assert!(report.anomalies.is_empty());
}

/// Coinbase-style inputs have no prev_out; they trace as "unknown".
#[test]
fn missing_addresses_become_unknown_nodes() {
    let explorer = FakeExplorer::default().with_tx(
        "coinbase",
        json!({
            "inputs": [{}],
            "out": [{"addr": "M", "value": 625000000}, {"value": 0}]
        }),
    );
    let mut tracker = tracker(explorer);

    let report = tracker.trace("coinbase").expect("trace");

    let ids: Vec<&str> = report.graph.nodes.iter().map(|n| n.id.as_str()).collect();
    assert_eq!(ids, vec!["unknown", "M"]);
    assert_eq!(report.transfers[0].amount, 6.25);
    // unknown -> unknown is a self-loop, so only M is terminal.
    assert_eq!(report.end_receivers, vec!["M"]);
}

#[test]
fn transaction_graph_emits_presentation_shape() {
    let explorer = FakeExplorer::default().with_tx("root", root_tx());
    let tracker = tracker(explorer);

    let data = tracker.transaction_graph("root").expect("graph");
    let json = serde_json::to_value(&data).expect("serialize");

    assert_eq!(json["nodes"][0]["id"], "A");
    assert_eq!(json["links"][0]["source"], "A");
    assert_eq!(json["links"][0]["target"], "R1");
    assert_eq!(json["links"][0]["value"], 1.0);
    assert_eq!(json["links"][1]["value"], 0.5);
}

#[test]
fn wallet_graph_skips_unfetchable_details() {
    let listing = format!("{HASKOIN}/address/W/transactions?limit=20&offset=0");
    let explorer = FakeExplorer::default()
        .with_tx("root", root_tx())
        .with(listing, json!([{"txid": "root", "block": {"mempool": 10}}, {"txid": "gone"}]));
    let tracker = tracker(explorer);

    let data = tracker.wallet_graph("W", None);
    assert_eq!(data.nodes.len(), 4);
    assert_eq!(data.links.len(), 4);

    let later = tracker.wallet_graph("W", Some(10));
    assert!(later.nodes.is_empty());
}

#[test]
fn report_serializes() {
    let explorer = FakeExplorer::default().with_tx("root", root_tx());
    let mut tracker = tracker(explorer);

    let report = tracker.trace("root").expect("trace");
    let json = serde_json::to_value(&report).expect("serialize");

    assert_eq!(json["txid"], "root");
    assert!(json["generated_at"].is_string());
    assert_eq!(json["transfers"][0]["from_wallet"], "A");
    assert_eq!(json["transfers"][0]["time"], 1700000000);
}
