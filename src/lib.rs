//! Core library for the `weather-etl` pipeline.
//!
//! This crate defines:
//! - Configuration loading from the environment
//! - The retrying weather API client and URL construction
//! - Payload normalization into the canonical record shape
//! - The idempotent upsert writer and schema management
//! - The run orchestrator wiring fetch → transform → upsert
//!
//! The `weather-etl` binary drives one run; the library is also usable from
//! integration tests and other binaries.

pub mod api;
pub mod config;
pub mod error;
pub mod etl;
pub mod models;
pub mod retry;
pub mod schema;
pub mod store;

pub use api::{ApiClient, UrlBuilder, WeatherSource};
pub use config::Config;
pub use error::EtlError;
pub use models::{RecordKind, WeatherRecord};
pub use store::{PgStore, RecordSink, UpsertOutcome};
