//! Transaction graph — wallet nodes, amount-weighted directed edges.
//!
//! EDGE POLICY: accumulate.
//! At most one edge exists per ordered (from, to) pair. A repeated
//! transfer on the same pair adds its amount to the edge and bumps the
//! transfer count. Nodes and edges keep first-insertion order, which
//! makes every downstream iteration deterministic.

use crate::{parser::TransferRecord, types::WalletAddress};
use petgraph::{
    graph::{DiGraph, NodeIndex},
    visit::EdgeRef,
    Direction,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TransferEdge {
    /// Sum of all transfer amounts on this ordered pair.
    pub amount:    f64,
    pub transfers: u32,
}

#[derive(Debug, Clone, Default)]
pub struct TransactionGraph {
    graph:    DiGraph<WalletAddress, TransferEdge>,
    node_map: HashMap<WalletAddress, NodeIndex>,
}

impl TransactionGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold a sequence of transfer records into a graph.
    pub fn build(records: &[TransferRecord]) -> Self {
        let mut graph = Self::new();
        for record in records {
            graph.add_transfer(&record.from_wallet, &record.to_wallet, record.amount);
        }
        log::debug!(
            "Built graph: {} nodes, {} edges from {} transfers",
            graph.node_count(),
            graph.edge_count(),
            records.len()
        );
        graph
    }

    fn get_or_add_node(&mut self, wallet: &str) -> NodeIndex {
        if let Some(&idx) = self.node_map.get(wallet) {
            return idx;
        }
        let idx = self.graph.add_node(wallet.to_string());
        self.node_map.insert(wallet.to_string(), idx);
        idx
    }

    /// Add one transfer, accumulating onto an existing edge.
    pub fn add_transfer(&mut self, from: &str, to: &str, amount: f64) {
        let from_idx = self.get_or_add_node(from);
        let to_idx = self.get_or_add_node(to);

        match self.graph.find_edge(from_idx, to_idx) {
            Some(edge) => {
                let weight = &mut self.graph[edge];
                weight.amount += amount;
                weight.transfers += 1;
            }
            None => {
                self.graph.add_edge(from_idx, to_idx, TransferEdge { amount, transfers: 1 });
            }
        }
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn is_empty(&self) -> bool {
        self.graph.node_count() == 0
    }

    pub fn contains(&self, wallet: &str) -> bool {
        self.node_map.contains_key(wallet)
    }

    /// Distinct outgoing edges; a self-loop counts. 0 for unknown wallets.
    pub fn out_degree(&self, wallet: &str) -> usize {
        self.degree(wallet, Direction::Outgoing)
    }

    pub fn in_degree(&self, wallet: &str) -> usize {
        self.degree(wallet, Direction::Incoming)
    }

    fn degree(&self, wallet: &str, dir: Direction) -> usize {
        self.node_map
            .get(wallet)
            .map(|&idx| self.graph.edges_directed(idx, dir).count())
            .unwrap_or(0)
    }

    pub fn edge(&self, from: &str, to: &str) -> Option<&TransferEdge> {
        let from_idx = *self.node_map.get(from)?;
        let to_idx = *self.node_map.get(to)?;
        self.graph
            .find_edge(from_idx, to_idx)
            .map(|e| &self.graph[e])
    }

    /// Wallets in first-insertion order.
    pub fn nodes(&self) -> impl Iterator<Item = &str> + '_ {
        self.graph.node_indices().map(move |idx| self.graph[idx].as_str())
    }

    /// (from, to, edge) in first-insertion order.
    pub fn edges(&self) -> impl Iterator<Item = (&str, &str, &TransferEdge)> + '_ {
        self.graph.edge_references().map(move |e| {
            (
                self.graph[e.source()].as_str(),
                self.graph[e.target()].as_str(),
                e.weight(),
            )
        })
    }

    /// Underlying petgraph, for analysis passes.
    pub(crate) fn inner(&self) -> &DiGraph<WalletAddress, TransferEdge> {
        &self.graph
    }

    pub(crate) fn index_of(&self, wallet: &str) -> Option<NodeIndex> {
        self.node_map.get(wallet).copied()
    }

    /// Node/link shape for graph-visualization front ends.
    pub fn to_graph_data(&self) -> GraphData {
        GraphData {
            nodes: self
                .nodes()
                .map(|id| GraphNode { id: id.to_string() })
                .collect(),
            links: self
                .edges()
                .map(|(source, target, edge)| GraphLink {
                    source: source.to_string(),
                    target: target.to_string(),
                    value:  edge.amount,
                })
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct GraphData {
    pub nodes: Vec<GraphNode>,
    pub links: Vec<GraphLink>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GraphNode {
    pub id: WalletAddress,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GraphLink {
    pub source: WalletAddress,
    pub target: WalletAddress,
    pub value:  f64,
}
