//! Soroban RPC access for contract event polling
//!
//! Only the two calls the ingestion job needs are implemented:
//! `getLatestLedger` and `getEvents` filtered by contract id. Both sit behind
//! [`LedgerSource`] so ingestion can run against any source of events.

mod client;
mod error;
mod types;

use async_trait::async_trait;

pub use client::{DEFAULT_RPC_URL, SorobanClient, SorobanClientConfig};
pub use error::{Result, SorobanError};
pub use types::{ContractEvent, ContractEvents, GetEventsResponse, LatestLedger};

/// A remote ledger that can be polled for contract events
#[async_trait]
pub trait LedgerSource: Send + Sync {
    /// Sequence number of the newest ledger
    async fn latest_ledger(&self) -> Result<u32>;

    /// All events emitted by `contract_id` from `start_ledger` onwards
    async fn contract_events(&self, contract_id: &str, start_ledger: u32) -> Result<ContractEvents>;
}
