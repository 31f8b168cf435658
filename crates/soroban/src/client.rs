//! HTTP JSON-RPC client for a Soroban RPC endpoint

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tracing::{debug, info};

use crate::LedgerSource;
use crate::error::{Result, SorobanError};
use crate::types::{
    ContractEvents, EventFilter, GetEventsParams, GetEventsResponse, LatestLedger, Pagination,
    RpcRequest, RpcResponse,
};

pub const DEFAULT_RPC_URL: &str = "https://soroban-testnet.stellar.org";
const DEFAULT_TIMEOUT_SECS: u64 = 30;
const DEFAULT_PAGE_LIMIT: u32 = 100;

/// Configuration for the Soroban RPC client
#[derive(Debug, Clone)]
pub struct SorobanClientConfig {
    /// RPC endpoint URL
    pub url: String,
    /// HTTP request timeout in seconds
    pub timeout_secs: u64,
    /// Maximum events requested per `getEvents` page
    pub page_limit: u32,
}

impl Default for SorobanClientConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_RPC_URL.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            page_limit: DEFAULT_PAGE_LIMIT,
        }
    }
}

impl SorobanClientConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Self::default()
        }
    }

    pub fn with_timeout(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = timeout_secs;
        self
    }

    pub fn with_page_limit(mut self, page_limit: u32) -> Self {
        self.page_limit = page_limit;
        self
    }
}

pub struct SorobanClient {
    http: Client,
    config: SorobanClientConfig,
    next_id: AtomicU64,
}

impl SorobanClient {
    pub fn new(config: SorobanClientConfig) -> Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        info!("Soroban RPC client configured for {}", config.url);

        Ok(Self {
            http,
            config,
            next_id: AtomicU64::new(1),
        })
    }

    pub fn config(&self) -> &SorobanClientConfig {
        &self.config
    }

    async fn call<P, R>(&self, method: &str, params: Option<P>) -> Result<R>
    where
        P: Serialize,
        R: DeserializeOwned,
    {
        let request = RpcRequest {
            jsonrpc: "2.0",
            id: self.next_id.fetch_add(1, Ordering::Relaxed),
            method,
            params,
        };

        let response: RpcResponse<R> = self
            .http
            .post(&self.config.url)
            .json(&request)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        if let Some(err) = response.error {
            return Err(SorobanError::Rpc {
                code: err.code,
                message: err.message,
            });
        }

        response
            .result
            .ok_or_else(|| SorobanError::MissingResult(method.to_string()))
    }

    pub async fn get_latest_ledger(&self) -> Result<LatestLedger> {
        self.call::<(), LatestLedger>("getLatestLedger", None).await
    }

    /// Fetch a single `getEvents` page, either from `start_ledger` or from `cursor`
    pub async fn get_events_page(
        &self,
        contract_id: &str,
        start_ledger: Option<u32>,
        cursor: Option<String>,
    ) -> Result<GetEventsResponse> {
        let params = GetEventsParams {
            // the RPC rejects startLedger together with a cursor
            start_ledger: if cursor.is_some() { None } else { start_ledger },
            filters: vec![EventFilter {
                event_type: "contract",
                contract_ids: vec![contract_id],
            }],
            pagination: Pagination {
                cursor,
                limit: self.config.page_limit,
            },
        };

        self.call("getEvents", Some(params)).await
    }
}

#[async_trait]
impl LedgerSource for SorobanClient {
    async fn latest_ledger(&self) -> Result<u32> {
        Ok(self.get_latest_ledger().await?.sequence)
    }

    async fn contract_events(&self, contract_id: &str, start_ledger: u32) -> Result<ContractEvents> {
        let mut collected = ContractEvents::default();
        let mut cursor: Option<String> = None;
        let mut pages = 0usize;

        loop {
            let page = self
                .get_events_page(contract_id, Some(start_ledger), cursor.take())
                .await?;
            pages += 1;

            let page_len = page.events.len();
            collected.latest_ledger = collected.latest_ledger.max(page.latest_ledger);
            collected.events.extend(page.events);

            debug!(
                "getEvents page {} for {}: {} events (latest ledger {})",
                pages, contract_id, page_len, page.latest_ledger
            );

            match page.cursor {
                Some(next) if page_len > 0 && page_len as u32 >= self.config.page_limit => {
                    cursor = Some(next);
                }
                _ => break,
            }
        }

        info!(
            "Fetched {} events for contract {} from ledger {} in {} page(s)",
            collected.events.len(),
            contract_id,
            start_ledger,
            pages
        );

        Ok(collected)
    }
}
