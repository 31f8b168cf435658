//! Tansu contract event service
//!
//! Ingests Soroban contract events into the event store and serves them over
//! a small HTTP API. The `tansu-events` binary wires these pieces together.

pub mod api;
pub mod config;
pub mod ingest;

pub use api::{AppState, create_router, serve};
pub use ingest::{
    IngestOptions, IngestReport, LEDGER_LOOKBACK, ValueMode, events_to_db, fetch_events,
    run_ingestion, to_new_event,
};
