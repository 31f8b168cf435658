//! Wire types for the subset of the Soroban JSON-RPC API we use

use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize)]
pub(crate) struct RpcRequest<'a, P> {
    pub jsonrpc: &'static str,
    pub id: u64,
    pub method: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<P>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RpcResponse<R> {
    pub result: Option<R>,
    pub error: Option<RpcErrorObject>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RpcErrorObject {
    pub code: i64,
    pub message: String,
}

/// Result of `getLatestLedger`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LatestLedger {
    pub id: String,
    pub protocol_version: u32,
    pub sequence: u32,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct GetEventsParams<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_ledger: Option<u32>,
    pub filters: Vec<EventFilter<'a>>,
    pub pagination: Pagination,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct EventFilter<'a> {
    #[serde(rename = "type")]
    pub event_type: &'static str,
    pub contract_ids: Vec<&'a str>,
}

#[derive(Debug, Serialize)]
pub(crate) struct Pagination {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cursor: Option<String>,
    pub limit: u32,
}

/// One page returned by `getEvents`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetEventsResponse {
    #[serde(default)]
    pub events: Vec<ContractEvent>,
    pub latest_ledger: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cursor: Option<String>,
}

/// A contract event as returned by the RPC. Topics and value are base64 XDR `ScVal`s.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContractEvent {
    #[serde(rename = "type")]
    pub event_type: String,
    pub ledger: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ledger_closed_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contract_id: Option<String>,
    pub id: String,
    #[serde(default)]
    pub topic: Vec<String>,
    pub value: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tx_hash: Option<String>,
}

/// All events collected across pages, plus the newest ledger the RPC knows about
#[derive(Debug, Clone, Default)]
pub struct ContractEvents {
    pub events: Vec<ContractEvent>,
    pub latest_ledger: u32,
}
