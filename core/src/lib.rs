//! txtrack-core: fetch Bitcoin transactions from a public explorer,
//! fold them into a wallet-to-wallet transfer graph, and run light
//! analysis (clusters, end receivers, blacklist candidates, anomalies).

pub mod anomaly;
pub mod cluster;
pub mod config;
pub mod error;
pub mod fetcher;
pub mod graph;
pub mod parser;
pub mod payload;
pub mod rng;
pub mod tracker;
pub mod types;
