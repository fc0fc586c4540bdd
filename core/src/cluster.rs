//! Cluster & end-receiver analysis.
//!
//! This module:
//!   1. Partitions the graph into weakly connected clusters
//!   2. Picks the largest cluster (first one wins ties)
//!   3. Finds end receivers: cluster members with no outgoing edge
//!   4. Flags blacklist candidates: wallets funding end receivers'
//!      further histories more than once
//!
//! Everything here is a pure function over already-fetched data.
//! Fetching for the blacklist pass is injected by the caller.

use crate::{graph::TransactionGraph, parser::TransferRecord, types::WalletAddress};
use petgraph::{unionfind::UnionFind, visit::EdgeRef};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A weakly connected set of wallets, in node insertion order.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Cluster {
    pub members: Vec<WalletAddress>,
}

impl Cluster {
    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn contains(&self, wallet: &str) -> bool {
        self.members.iter().any(|m| m == wallet)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BlacklistCandidate {
    pub address:     WalletAddress,
    /// Times seen as `from_wallet`; always >= 2.
    pub occurrences: usize,
}

/// Weakly connected components, ordered by their first member.
/// Every node lands in exactly one cluster.
pub fn weakly_connected_components(graph: &TransactionGraph) -> Vec<Cluster> {
    let inner = graph.inner();
    let mut sets = UnionFind::<usize>::new(inner.node_count());
    for edge in inner.edge_references() {
        sets.union(edge.source().index(), edge.target().index());
    }

    let mut slot_of_root: HashMap<usize, usize> = HashMap::new();
    let mut clusters: Vec<Cluster> = Vec::new();
    for idx in inner.node_indices() {
        let root = sets.find_mut(idx.index());
        let slot = *slot_of_root.entry(root).or_insert_with(|| {
            clusters.push(Cluster::default());
            clusters.len() - 1
        });
        clusters[slot].members.push(inner[idx].clone());
    }

    log::debug!("Found {} weakly connected clusters", clusters.len());
    clusters
}

/// The cluster with the most members; the earliest one on ties.
pub fn largest(clusters: &[Cluster]) -> Option<&Cluster> {
    clusters
        .iter()
        .fold(None, |best: Option<&Cluster>, c| match best {
            Some(b) if b.len() >= c.len() => Some(b),
            _ => Some(c),
        })
}

/// Members of `cluster` with out-degree 0 in `graph`, in member order.
pub fn end_receivers(graph: &TransactionGraph, cluster: &Cluster) -> Vec<WalletAddress> {
    cluster
        .members
        .iter()
        .filter(|m| graph.index_of(m).is_some() && graph.out_degree(m) == 0)
        .cloned()
        .collect()
}

/// Addresses appearing as `from_wallet` at least twice across the
/// further histories of all end receivers, in first-seen order.
///
/// `fetch_and_parse` returns `None` when a receiver's history is
/// unavailable; that receiver contributes nothing.
pub fn blacklist<F>(end_receivers: &[WalletAddress], mut fetch_and_parse: F) -> Vec<BlacklistCandidate>
where
    F: FnMut(&str) -> Option<Vec<TransferRecord>>,
{
    let mut order: Vec<WalletAddress> = Vec::new();
    let mut counts: HashMap<WalletAddress, usize> = HashMap::new();

    for receiver in end_receivers {
        let Some(records) = fetch_and_parse(receiver.as_str()) else {
            log::debug!("No history for end receiver {receiver}, skipping");
            continue;
        };
        for record in records {
            let count = counts.entry(record.from_wallet.clone()).or_insert(0);
            if *count == 0 {
                order.push(record.from_wallet);
            }
            *count += 1;
        }
    }

    order
        .into_iter()
        .filter_map(|address| {
            let occurrences = counts.get(&address).copied().unwrap_or(0);
            (occurrences > 1).then_some(BlacklistCandidate { address, occurrences })
        })
        .collect()
}
