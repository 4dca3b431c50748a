//! `aerorecon` — Air-cargo freight invoice tariff reconciliation engine.
//!
//! Pure engine crate: receives pre-loaded shipment lines and tariff
//! catalogs, returns reconciled records plus portfolio KPIs. The CSV
//! loaders operate on in-memory data; file IO lives in the CLI.

pub mod aggregate;
pub mod alias;
pub mod catalog;
pub mod classify;
pub mod config;
pub mod cost;
pub mod engine;
pub mod error;
pub mod matcher;
pub mod model;
pub mod service;

pub use config::ReconConfig;
pub use engine::run;
pub use error::ReconError;
pub use model::{ReconInput, ReconcileResult, ShipmentLine, Status};
