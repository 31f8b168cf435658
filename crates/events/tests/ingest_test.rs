use anyhow::Result;
use async_trait::async_trait;
use axum::body::{Body, to_bytes};
use axum::http::{Method, Request, header};
use events::api::{AppState, DEFAULT_CORS_ORIGINS, create_router};
use events::ingest::{
    IngestOptions, LEDGER_LOOKBACK, ValueMode, events_to_db, fetch_events, run_ingestion,
};
use scval::xdr::{Limits, ScBytes, ScString, ScSymbol, ScVal, ScVec, WriteXdr};
use serde_json::{Value, json};
use soroban::{ContractEvent, ContractEvents, LedgerSource};
use std::sync::{Arc, Mutex};
use store::{EventQuery, EventStore, SeaOrmStore};
use tower::ServiceExt;

const CONTRACT_ID: &str = "CBXKUSLQPVF35FYURR5C42BPYA5UOVDXX2ELKIM2CAJMCI6HXG2BHGZA";
const PROJECT_KEY: [u8; 4] = [0x37, 0xae, 0x83, 0xc0];

fn encode(val: ScVal) -> Result<String> {
    Ok(val.to_xdr_base64(Limits::none())?)
}

fn symbol(name: &str) -> Result<String> {
    encode(ScVal::Symbol(ScSymbol(name.try_into()?)))
}

fn key_bytes(key: &[u8]) -> Result<String> {
    encode(ScVal::Bytes(ScBytes(key.to_vec().try_into()?)))
}

fn contract_event(ledger: u32, action: &str, value: ScVal) -> Result<ContractEvent> {
    Ok(ContractEvent {
        event_type: "contract".to_string(),
        ledger,
        ledger_closed_at: None,
        contract_id: Some(CONTRACT_ID.to_string()),
        id: format!("{:019}-0000000001", ledger),
        topic: vec![symbol(action)?, key_bytes(&PROJECT_KEY)?],
        value: encode(value)?,
        tx_hash: None,
    })
}

/// In-memory ledger that records the start ledger of every request
struct FakeLedger {
    latest: u32,
    events: Vec<ContractEvent>,
    requested: Mutex<Vec<u32>>,
}

impl FakeLedger {
    fn new(latest: u32, events: Vec<ContractEvent>) -> Self {
        Self {
            latest,
            events,
            requested: Mutex::new(Vec::new()),
        }
    }

    fn requested(&self) -> Vec<u32> {
        self.requested.lock().unwrap().clone()
    }
}

#[async_trait]
impl LedgerSource for FakeLedger {
    async fn latest_ledger(&self) -> soroban::Result<u32> {
        Ok(self.latest)
    }

    async fn contract_events(&self, contract_id: &str, start_ledger: u32) -> soroban::Result<ContractEvents> {
        assert_eq!(contract_id, CONTRACT_ID);
        self.requested.lock().unwrap().push(start_ledger);
        Ok(ContractEvents {
            events: self
                .events
                .iter()
                .filter(|e| e.ledger >= start_ledger)
                .cloned()
                .collect(),
            latest_ledger: self.latest,
        })
    }
}

fn sample_events() -> Result<Vec<ContractEvent>> {
    Ok(vec![
        contract_event(40_001, "register", ScVal::U32(10_000))?,
        contract_event(40_002, "commit", ScVal::U32(5_000))?,
        contract_event(40_003, "transfer", ScVal::U32(1))?,
        contract_event(40_004, "project_registered", ScVal::Void)?,
    ])
}

async fn memory_store() -> Result<SeaOrmStore> {
    let store = SeaOrmStore::connect("sqlite::memory:").await?;
    store.create_schema().await?;
    Ok(store)
}

fn options(start_ledger: Option<u32>, value_mode: ValueMode) -> IngestOptions {
    IngestOptions {
        contract_id: CONTRACT_ID.to_string(),
        start_ledger,
        value_mode,
    }
}

#[tokio::test]
async fn test_fetch_defaults_to_lookback_window() -> Result<()> {
    let ledger = FakeLedger::new(50_000, sample_events()?);

    let (_, latest) = fetch_events(&ledger, CONTRACT_ID, None, ValueMode::Raw).await?;

    assert_eq!(latest, 50_000);
    assert_eq!(ledger.requested(), vec![50_000 - LEDGER_LOOKBACK]);
    Ok(())
}

#[tokio::test]
async fn test_fetch_classifies_actions() -> Result<()> {
    let ledger = FakeLedger::new(50_000, sample_events()?);

    let (records, _) = fetch_events(&ledger, CONTRACT_ID, Some(40_000), ValueMode::Raw).await?;

    let actions: Vec<&str> = records.iter().map(|r| r.action.as_str()).collect();
    // "transfer" is not tracked, "project_registered" counts as a registration
    assert_eq!(actions, vec!["register", "commit", "register"]);
    assert!(records.iter().all(|r| r.project_key == hex::encode(PROJECT_KEY)));
    assert_eq!(ledger.requested(), vec![40_000]);
    Ok(())
}

#[tokio::test]
async fn test_value_modes() -> Result<()> {
    let ledger = FakeLedger::new(50_000, sample_events()?);

    let (raw, _) = fetch_events(&ledger, CONTRACT_ID, Some(40_002), ValueMode::Raw).await?;
    assert_eq!(raw[0].value, encode(ScVal::U32(5_000))?);

    let (decoded, _) = fetch_events(&ledger, CONTRACT_ID, Some(40_002), ValueMode::Decoded).await?;
    assert_eq!(decoded[0].value, "5000");
    assert_eq!(decoded[1].value, "null");
    Ok(())
}

#[tokio::test]
async fn test_event_without_project_key_is_skipped() -> Result<()> {
    let mut event = contract_event(40_001, "commit", ScVal::U32(1))?;
    event.topic.truncate(1);
    let ledger = FakeLedger::new(50_000, vec![event]);

    let (records, _) = fetch_events(&ledger, CONTRACT_ID, Some(1), ValueMode::Raw).await?;
    assert!(records.is_empty());
    Ok(())
}

#[tokio::test]
async fn test_events_to_db_reports_duplicates() -> Result<()> {
    let store = memory_store().await?;
    let ledger = FakeLedger::new(50_000, sample_events()?);
    let (records, _) = fetch_events(&ledger, CONTRACT_ID, Some(1), ValueMode::Raw).await?;

    let first = events_to_db(&store, &records).await?;
    assert_eq!(first.inserted, 3);

    let second = events_to_db(&store, &records).await?;
    assert_eq!(second.inserted, 0);
    assert_eq!(second.skipped, 3);
    Ok(())
}

#[tokio::test]
async fn test_run_ingestion_uses_lookback_then_watermark() -> Result<()> {
    let store = memory_store().await?;
    let ledger = FakeLedger::new(50_000, sample_events()?);

    let report = run_ingestion(&ledger, &store, &options(None, ValueMode::Raw)).await?;
    assert_eq!(report.start_ledger, None);
    assert_eq!(report.inserted, 3);
    assert_eq!(report.latest_ledger, 50_000);
    assert_eq!(store.latest_ledger().await?, Some(50_000));

    // second run resumes after the watermark and finds nothing new
    let report = run_ingestion(&ledger, &store, &options(None, ValueMode::Raw)).await?;
    assert_eq!(report.start_ledger, Some(50_001));
    assert_eq!(report.inserted, 0);
    assert_eq!(ledger.requested(), vec![50_000 - LEDGER_LOOKBACK, 50_001]);
    Ok(())
}

#[tokio::test]
async fn test_explicit_start_ledger_overrides_watermark() -> Result<()> {
    let store = memory_store().await?;
    store.record_latest_ledger(45_000).await?;
    let ledger = FakeLedger::new(50_000, sample_events()?);

    let report = run_ingestion(&ledger, &store, &options(Some(40_002), ValueMode::Raw)).await?;
    assert_eq!(report.start_ledger, Some(40_002));
    assert_eq!(report.inserted, 2);
    assert_eq!(ledger.requested(), vec![40_002]);

    let stored = store
        .query_events(&EventQuery::new(hex::encode(PROJECT_KEY)))
        .await?;
    let ledgers: Vec<i64> = stored.iter().map(|e| e.ledger).collect();
    assert_eq!(ledgers, vec![40_002, 40_004]);
    Ok(())
}

#[tokio::test]
async fn test_rerun_over_same_range_is_idempotent() -> Result<()> {
    let store = memory_store().await?;
    let ledger = FakeLedger::new(50_000, sample_events()?);

    run_ingestion(&ledger, &store, &options(Some(1), ValueMode::Decoded)).await?;
    let report = run_ingestion(&ledger, &store, &options(Some(1), ValueMode::Decoded)).await?;
    assert_eq!(report.fetched, 3);
    assert_eq!(report.inserted, 0);
    assert_eq!(report.skipped, 3);

    let stored = store
        .query_events(&EventQuery::new(hex::encode(PROJECT_KEY)))
        .await?;
    let values: Vec<&str> = stored.iter().map(|e| e.value.as_str()).collect();
    assert_eq!(values, vec!["10000", "5000", "null"]);
    Ok(())
}

async fn api_events(store: SeaOrmStore) -> Result<Value> {
    let origins: Vec<String> = DEFAULT_CORS_ORIGINS.iter().map(|o| o.to_string()).collect();
    let response = create_router(AppState::new(Arc::new(store)), &origins)
        .oneshot(
            Request::builder()
                .method(Method::POST)
                .uri("/events")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json!({"project_key": hex::encode(PROJECT_KEY)}).to_string()))?,
        )
        .await?;
    let bytes = to_bytes(response.into_body(), usize::MAX).await?;
    Ok(serde_json::from_slice(&bytes)?)
}

#[tokio::test]
async fn test_value_modes_serve_identical_json() -> Result<()> {
    let events = vec![
        contract_event(40_001, "register", ScVal::U32(10_000))?,
        contract_event(40_002, "commit", ScVal::Bool(true))?,
        contract_event(
            40_003,
            "commit",
            ScVal::Vec(Some(ScVec(
                vec![ScVal::U32(1), ScVal::Symbol(ScSymbol("a".try_into()?))].try_into()?,
            ))),
        )?,
        contract_event(40_004, "commit", ScVal::String(ScString("v1.2.0".try_into()?)))?,
        contract_event(40_005, "commit", ScVal::Void)?,
    ];
    let ledger = FakeLedger::new(50_000, events);

    let raw_store = memory_store().await?;
    run_ingestion(&ledger, &raw_store, &options(Some(1), ValueMode::Raw)).await?;
    let decoded_store = memory_store().await?;
    run_ingestion(&ledger, &decoded_store, &options(Some(1), ValueMode::Decoded)).await?;

    let raw = api_events(raw_store).await?;
    let decoded = api_events(decoded_store).await?;

    let values: Vec<Value> = raw
        .as_array()
        .map(|events| events.iter().map(|e| e["value"].clone()).collect())
        .unwrap_or_default();
    assert_eq!(
        values,
        vec![json!(10000), json!(true), json!([1, "a"]), json!("v1.2.0"), json!(null)]
    );
    assert_eq!(raw, decoded);
    Ok(())
}
