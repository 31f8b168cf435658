//! Contract event ingestion
//!
//! `fetch_events` pulls events from a [`LedgerSource`] and maps them into
//! store records, `events_to_db` writes a batch in one transaction, and
//! `run_ingestion` ties both together with the latest-ledger watermark.

use anyhow::{Context, Result};
use clap::ValueEnum;
use scval::NativeValue;
use soroban::{ContractEvent, LedgerSource};
use store::{EventAction, EventStore, InsertOutcome, NewEvent};
use tracing::{debug, info};

/// Ledgers to look back when no start ledger is known: about 20h at 6s per ledger
pub const LEDGER_LOOKBACK: u32 = 3600 / 6 * 20;

/// How the event payload is written to the `value` column
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum ValueMode {
    /// Base64 XDR exactly as returned by the RPC
    #[default]
    Raw,
    /// Decoded value as JSON text, the raw XDR as a JSON string when decoding fails
    Decoded,
}

#[derive(Debug, Clone)]
pub struct IngestOptions {
    pub contract_id: String,
    /// Overrides the stored watermark when set
    pub start_ledger: Option<u32>,
    pub value_mode: ValueMode,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IngestReport {
    /// `None` when the lookback default was used
    pub start_ledger: Option<u32>,
    pub fetched: usize,
    pub inserted: usize,
    pub skipped: usize,
    pub latest_ledger: u32,
}

pub fn default_start_ledger(latest_ledger: u32) -> u32 {
    latest_ledger.saturating_sub(LEDGER_LOOKBACK).max(1)
}

/// Fetch contract events since `start_ledger` (or the lookback window) and map them to records.
///
/// Returns the records together with the latest ledger reported by the RPC.
pub async fn fetch_events<S>(
    source: &S,
    contract_id: &str,
    start_ledger: Option<u32>,
    mode: ValueMode,
) -> Result<(Vec<NewEvent>, u32)>
where
    S: LedgerSource + ?Sized,
{
    let start_ledger = match start_ledger {
        Some(ledger) => ledger,
        None => {
            let latest = source
                .latest_ledger()
                .await
                .context("Failed to fetch latest ledger")?;
            let start = default_start_ledger(latest);
            info!(
                "No start ledger given, looking back {} ledgers from {} to {}",
                LEDGER_LOOKBACK, latest, start
            );
            start
        }
    };

    let fetched = source
        .contract_events(contract_id, start_ledger)
        .await
        .with_context(|| {
            format!(
                "Failed to fetch events for contract {} from ledger {}",
                contract_id, start_ledger
            )
        })?;

    let records: Vec<NewEvent> = fetched
        .events
        .iter()
        .filter_map(|event| to_new_event(event, mode))
        .collect();

    info!(
        "Mapped {} of {} events for contract {} (latest ledger {})",
        records.len(),
        fetched.events.len(),
        contract_id,
        fetched.latest_ledger
    );

    Ok((records, fetched.latest_ledger))
}

/// Map one RPC event into a store record.
///
/// Topic 0 carries the action symbol and topic 1 the project key bytes.
/// Events for other actions, or without a readable project key, are skipped.
pub fn to_new_event(event: &ContractEvent, mode: ValueMode) -> Option<NewEvent> {
    let action = match event.topic.first().map(|topic| scval::decode(topic)) {
        Some(Ok(NativeValue::String(symbol))) => EventAction::from_topic(&symbol),
        _ => None,
    };
    let Some(action) = action else {
        debug!("Skipping event {}: not a tracked action", event.id);
        return None;
    };

    // Tansu emits the key as Bytes; a String key is taken verbatim, so a string
    // spelling out the same hex would collide with it
    let project_key = match event.topic.get(1).map(|topic| scval::decode(topic)) {
        Some(Ok(key @ (NativeValue::Bytes(_) | NativeValue::String(_)))) => key.to_string(),
        _ => {
            debug!("Skipping {} event {}: no project key topic", action, event.id);
            return None;
        }
    };

    let value = match mode {
        ValueMode::Raw => event.value.clone(),
        ValueMode::Decoded => scval::decode_or_raw(&event.value).to_json().to_string(),
    };

    Some(NewEvent {
        ledger: i64::from(event.ledger),
        action: action.as_str().to_string(),
        project_key,
        value,
    })
}

/// Insert a batch in a single transaction. The whole batch fails on any database error.
pub async fn events_to_db<St>(store: &St, events: &[NewEvent]) -> Result<InsertOutcome>
where
    St: EventStore + ?Sized,
{
    let outcome = store
        .insert_events(events)
        .await
        .with_context(|| format!("Failed to insert batch of {} events", events.len()))?;

    info!(
        "Stored {} new events, {} already present",
        outcome.inserted, outcome.skipped
    );
    Ok(outcome)
}

/// One ingestion pass: resolve the start ledger, fetch, insert, advance the watermark.
///
/// The start ledger is the explicit option, else the ledger after the stored
/// watermark, else the lookback default.
pub async fn run_ingestion<S, St>(source: &S, store: &St, options: &IngestOptions) -> Result<IngestReport>
where
    S: LedgerSource + ?Sized,
    St: EventStore + ?Sized,
{
    let start_ledger = match options.start_ledger {
        Some(ledger) => Some(ledger),
        None => match store
            .latest_ledger()
            .await
            .context("Failed to read latest ledger watermark")?
        {
            Some(watermark) => Some(
                u32::try_from(watermark.saturating_add(1))
                    .with_context(|| format!("Stored watermark {} is not a valid ledger", watermark))?,
            ),
            None => None,
        },
    };

    info!(
        "Starting ingestion for contract {} from {} ({:?} values)",
        options.contract_id,
        start_ledger.map_or_else(|| "lookback window".to_string(), |l| format!("ledger {}", l)),
        options.value_mode
    );

    let (records, latest_ledger) =
        fetch_events(source, &options.contract_id, start_ledger, options.value_mode).await?;
    let outcome = events_to_db(store, &records).await?;

    store
        .record_latest_ledger(i64::from(latest_ledger))
        .await
        .context("Failed to record latest ledger watermark")?;

    Ok(IngestReport {
        start_ledger,
        fetched: records.len(),
        inserted: outcome.inserted,
        skipped: outcome.skipped,
        latest_ledger,
    })
}
