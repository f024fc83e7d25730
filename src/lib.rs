//! # finsync
//!
//! Authenticated incremental sync of personal financial data. A sync command
//! authorizes the requester against the provider (with an interactive
//! one-time code when the provider demands one), then runs a fixed chain of
//! executors that fetch records newer than each kind's watermark and replace
//! them atomically in storage. The run produces a line-per-executor report.

pub mod auth;
pub mod code;
pub mod config;
pub mod credentials;
pub mod db;
pub mod error;
pub mod executors;
pub mod models;
pub mod orchestrator;
pub mod provider;
pub mod report;
pub mod storage;
pub mod telemetry;
pub use migration;
