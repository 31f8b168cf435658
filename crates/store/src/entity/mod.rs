//! Sea-ORM entities for the event store

pub mod event;
pub mod latest_ledger;
