//! The tracker — wires fetcher, parser, graph and analysis together.
//!
//! PIPELINE ORDER (fixed):
//!   1. Fetch the root transaction
//!   2. Parse it into transfer records
//!   3. Build the transaction graph
//!   4. Cluster, pick the largest cluster, find end receivers
//!   5. Re-fetch each end receiver's history, collect blacklist candidates
//!   6. Flag anomalous transfers by amount
//!
//! RULES:
//!   - Steps run sequentially on the calling thread.
//!   - Config is validated when the tracker is built, before any fetch.
//!   - Only step 1 may fail a run. Step 5 treats unavailable
//!     histories as empty.
//!   - Nothing is cached between runs.

use crate::{
    anomaly::{self, FlaggedTransfer, IsolationForest, OutlierModel},
    cluster::{self, BlacklistCandidate, Cluster},
    config::TrackerConfig,
    error::TrackerResult,
    fetcher::{Fetcher, HttpUpstream, Upstream},
    graph::{GraphData, TransactionGraph},
    parser::{self, TransferRecord},
    types::{Timestamp, Txid, WalletAddress},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Everything one trace run produces.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TraceReport {
    pub report_id:       String,
    pub txid:            Txid,
    pub generated_at:    DateTime<Utc>,
    pub transfers:       Vec<TransferRecord>,
    pub graph:           GraphData,
    pub cluster_count:   usize,
    pub largest_cluster: Cluster,
    pub end_receivers:   Vec<WalletAddress>,
    pub blacklist:       Vec<BlacklistCandidate>,
    pub anomalies:       Vec<FlaggedTransfer>,
}

pub struct Tracker<U: Upstream> {
    fetcher: Fetcher<U>,
    config:  TrackerConfig,
    model:   Box<dyn OutlierModel>,
}

impl Tracker<HttpUpstream> {
    /// Build a tracker against the live explorer.
    pub fn build(config: TrackerConfig) -> TrackerResult<Self> {
        let upstream = HttpUpstream::new(config.api.request_timeout())?;
        Self::with_upstream(upstream, config)
    }
}

impl<U: Upstream> Tracker<U> {
    /// Wire a tracker over any upstream, using the configured forest.
    /// Fails on an invalid config.
    pub fn with_upstream(upstream: U, config: TrackerConfig) -> TrackerResult<Self> {
        config.validate()?;
        let forest = IsolationForest::new(
            config.anomaly.n_trees,
            config.anomaly.sample_size,
            config.anomaly.seed,
        );
        Ok(Self {
            fetcher: Fetcher::new(upstream, config.api.clone()),
            config,
            model: Box::new(forest),
        })
    }

    /// Swap the outlier model.
    pub fn with_model(mut self, model: Box<dyn OutlierModel>) -> Self {
        self.model = model;
        self
    }

    pub fn fetcher(&self) -> &Fetcher<U> {
        &self.fetcher
    }

    pub fn config(&self) -> &TrackerConfig {
        &self.config
    }

    /// Graph of a single transaction's transfers.
    pub fn transaction_graph(&self, txid: &str) -> TrackerResult<GraphData> {
        let raw = self.fetcher.fetch_transaction(txid)?;
        let records = parser::parse(&raw);
        Ok(TransactionGraph::build(&records).to_graph_data())
    }

    /// Graph of every transaction listed for `address`.
    /// Transactions whose details cannot be fetched are skipped.
    pub fn wallet_graph(&self, address: &str, after_timestamp: Option<Timestamp>) -> GraphData {
        let refs = self.fetcher.fetch_wallet_transactions(address, after_timestamp);
        log::info!("Wallet {address}: {} listed transactions", refs.len());

        let mut records = Vec::new();
        for tx_ref in &refs {
            // Failures are logged by the fetcher.
            if let Ok(raw) = self.fetcher.fetch_transaction(&tx_ref.txid) {
                records.extend(parser::parse(&raw));
            }
        }
        TransactionGraph::build(&records).to_graph_data()
    }

    /// Further history of one wallet as transfer records.
    /// `None` when the explorer could not provide it.
    pub fn wallet_history_transfers(&self, address: &str) -> Option<Vec<TransferRecord>> {
        let policy = self.config.api.retry_policy();
        self.fetcher
            .fetch_wallet_history_with(address, policy)
            .map(|history| parser::parse_history(&history))
    }

    /// Run the full pipeline for one transaction.
    pub fn trace(&mut self, txid: &str) -> TrackerResult<TraceReport> {
        log::info!("Tracing transaction {txid}");

        let raw = self.fetcher.fetch_transaction(txid)?;
        let transfers = parser::parse(&raw);
        let graph = TransactionGraph::build(&transfers);

        let clusters = cluster::weakly_connected_components(&graph);
        let largest_cluster = cluster::largest(&clusters).cloned().unwrap_or_default();
        let end_receivers = cluster::end_receivers(&graph, &largest_cluster);
        log::info!(
            "{} clusters, largest has {} wallets, {} end receivers",
            clusters.len(),
            largest_cluster.len(),
            end_receivers.len()
        );

        let blacklist = cluster::blacklist(&end_receivers, |receiver| {
            self.wallet_history_transfers(receiver)
        });
        if !blacklist.is_empty() {
            log::info!("{} blacklist candidates", blacklist.len());
        }

        let anomalies = anomaly::flag(
            &transfers,
            self.config.anomaly.contamination,
            self.model.as_mut(),
        )?;

        Ok(TraceReport {
            report_id: Uuid::new_v4().to_string(),
            txid: txid.to_string(),
            generated_at: Utc::now(),
            graph: graph.to_graph_data(),
            cluster_count: clusters.len(),
            largest_cluster,
            end_receivers,
            blacklist,
            anomalies,
            transfers,
        })
    }
}
