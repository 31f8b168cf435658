//! Sea-ORM implementation of the event store

use async_trait::async_trait;
use sea_orm::sea_query::OnConflict;
use sea_orm::{
    ColumnTrait, ConnectOptions, Database, DatabaseConnection, EntityTrait, QueryFilter,
    QueryOrder, QuerySelect, TransactionTrait,
};
use std::time::{Duration, Instant};
use tracing::{debug, error, info};

use crate::entity::{event, latest_ledger};
use crate::notifier::InsertNotifier;
use crate::{EventQuery, EventStore, InsertOutcome, MAX_QUERY_LIMIT, NewEvent, Result, schema};

pub struct SeaOrmStore {
    connection: DatabaseConnection,
    notifier: Option<InsertNotifier>,
}

impl SeaOrmStore {
    /// Connect with pooled settings. No retry: an unreachable database fails immediately.
    pub async fn connect(database_url: &str) -> Result<Self> {
        info!("Connecting to event database...");

        let connection = Database::connect(connect_options(database_url)).await?;

        info!("Successfully connected to event database");
        Ok(Self::from_connection(connection))
    }

    pub fn from_connection(connection: DatabaseConnection) -> Self {
        Self {
            connection,
            notifier: None,
        }
    }

    /// Publish every inserted row to `notifier` after its batch commits
    pub fn with_notifier(mut self, notifier: InsertNotifier) -> Self {
        self.notifier = Some(notifier);
        self
    }

    pub fn connection(&self) -> &DatabaseConnection {
        &self.connection
    }

    /// Create missing tables and indexes
    pub async fn create_schema(&self) -> Result<()> {
        schema::create_schema(&self.connection).await?;
        Ok(())
    }

    /// Drop and recreate all tables. Administrative use only.
    pub async fn reset_schema(&self) -> Result<()> {
        schema::reset_schema(&self.connection).await?;
        Ok(())
    }
}

fn connect_options(database_url: &str) -> ConnectOptions {
    let mut opt = ConnectOptions::new(database_url.to_string());

    if database_url.contains(":memory:") {
        // every pooled connection to an in-memory SQLite database would see a different database
        opt.max_connections(1).min_connections(1);
    } else {
        opt.max_connections(20)
            .min_connections(2)
            .connect_timeout(Duration::from_secs(10))
            .acquire_timeout(Duration::from_secs(30))
            .idle_timeout(Duration::from_secs(300))
            .max_lifetime(Duration::from_secs(2000));
    }

    opt.sqlx_logging(true)
        .sqlx_logging_level(tracing::log::LevelFilter::Debug)
        .sqlx_slow_statements_logging_settings(
            tracing::log::LevelFilter::Warn,
            Duration::from_millis(500),
        );
    opt
}

#[async_trait]
impl EventStore for SeaOrmStore {
    async fn insert_events(&self, events: &[NewEvent]) -> Result<InsertOutcome> {
        if events.is_empty() {
            return Ok(InsertOutcome::default());
        }

        let start_time = Instant::now();
        debug!("Inserting batch of {} events", events.len());

        let txn = self.connection.begin().await?;
        let mut inserted = Vec::with_capacity(events.len());

        for new_event in events {
            let result = event::Entity::insert(event::ActiveModel::from(new_event))
                .on_conflict(
                    OnConflict::columns([
                        event::Column::Action,
                        event::Column::ProjectKey,
                        event::Column::ValueHash,
                    ])
                    .do_nothing()
                    .to_owned(),
                )
                .exec_without_returning(&txn)
                .await;

            match result {
                Ok(rows) if rows > 0 => inserted.push(new_event),
                Ok(_) => debug!(
                    "Skipping duplicate event {} :: {} at ledger {}",
                    new_event.project_key, new_event.action, new_event.ledger
                ),
                Err(e) => {
                    // dropping the transaction rolls the whole batch back
                    error!("Failed to insert event batch: {}", e);
                    return Err(e.into());
                }
            }
        }

        txn.commit().await?;

        let outcome = InsertOutcome {
            inserted: inserted.len(),
            skipped: events.len() - inserted.len(),
        };

        debug!(
            "Inserted {} events ({} duplicates skipped) in {}ms",
            outcome.inserted,
            outcome.skipped,
            start_time.elapsed().as_millis()
        );

        if let Some(notifier) = &self.notifier {
            for new_event in inserted {
                notifier.publish(new_event);
            }
        }

        Ok(outcome)
    }

    async fn query_events(&self, query: &EventQuery) -> Result<Vec<event::Model>> {
        let mut select =
            event::Entity::find().filter(event::Column::ProjectKey.eq(query.project_key.as_str()));

        if let Some(action) = query.action {
            select = select.filter(event::Column::Action.eq(action.as_str()));
        }

        let events = select
            .order_by_asc(event::Column::Id)
            .limit(query.limit.min(MAX_QUERY_LIMIT))
            .all(&self.connection)
            .await?;

        debug!(
            "Query for project {} (action {:?}, limit {}) returned {} events",
            query.project_key,
            query.action,
            query.limit,
            events.len()
        );

        Ok(events)
    }

    async fn latest_ledger(&self) -> Result<Option<i64>> {
        let latest = latest_ledger::Entity::find()
            .order_by_desc(latest_ledger::Column::Ledger)
            .one(&self.connection)
            .await?;

        Ok(latest.map(|row| row.ledger))
    }

    async fn record_latest_ledger(&self, ledger: i64) -> Result<()> {
        let row = latest_ledger::ActiveModel {
            ledger: sea_orm::Set(ledger),
        };

        latest_ledger::Entity::insert(row)
            .on_conflict(
                OnConflict::column(latest_ledger::Column::Ledger)
                    .do_nothing()
                    .to_owned(),
            )
            .exec_without_returning(&self.connection)
            .await?;

        debug!("Recorded latest ledger {}", ledger);
        Ok(())
    }
}
