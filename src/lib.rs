//! Air Quality Verdict API Library
//!
//! This library provides the environmental decision engine: it turns a
//! location and a health profile into a GO / CAUTION / NO-GO verdict for
//! outdoor activity, using live weather and air-quality data plus an external
//! reasoning service, with a deterministic AQI-only fallback.
//!
//! # Modules
//!
//! - `api`: HTTP routes.
//! - `aggregator`: Weather + air-quality merge and synthetic snapshots.
//! - `config`: Configuration management.
//! - `errors`: Error handling types.
//! - `fallback`: AQI-only decision policy.
//! - `handlers`: HTTP request handlers.
//! - `models`: Core data models.
//! - `orchestrator`: End-to-end analysis.
//! - `parser`: Reasoning response validation.
//! - `prompt`: Reasoning request composition.
//! - `reasoning_client`: Reasoning service client.
//! - `resolver`: Location to coordinates.
//! - `services`: Weather and air-quality clients.
//! - `upstream_models`: External payload models.

pub mod api;

// Re-export primary modules for shared use in tests and other binaries
pub mod aggregator;
pub mod config;
pub mod errors;
pub mod fallback;
pub mod handlers;
pub mod models;
pub mod orchestrator;
pub mod parser;
pub mod prompt;
pub mod reasoning_client;
pub mod resolver;
pub mod services;
pub mod upstream_models;
