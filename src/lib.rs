pub mod aneel;
pub mod api;
pub mod config;
pub mod coordinator;
pub mod domain;
pub mod error;
pub mod repo;
pub mod telemetry;
pub mod valuation;
