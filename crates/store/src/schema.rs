//! Table and index DDL derived from the entities

use sea_orm::sea_query::{Index, IndexCreateStatement, Table};
use sea_orm::{ConnectionTrait, DatabaseConnection, DbErr, EntityTrait, Schema};
use tracing::info;

use crate::entity::{event, latest_ledger};

/// Name of the unique index backing duplicate detection
pub const UNIQUE_EVENT_INDEX: &str = "uq_event_action_project_value";

fn unique_event_index() -> IndexCreateStatement {
    Index::create()
        .name(UNIQUE_EVENT_INDEX)
        .table(event::Entity)
        .col(event::Column::Action)
        .col(event::Column::ProjectKey)
        .col(event::Column::ValueHash)
        .unique()
        .if_not_exists()
        .to_owned()
}

async fn create_entity_table<E>(db: &DatabaseConnection, schema: &Schema, entity: E) -> Result<(), DbErr>
where
    E: EntityTrait + Copy,
{
    let backend = db.get_database_backend();

    let mut table = schema.create_table_from_entity(entity);
    table.if_not_exists();
    db.execute(backend.build(&table)).await?;

    for mut index in schema.create_index_from_entity(entity) {
        index.if_not_exists();
        db.execute(backend.build(&index)).await?;
    }

    Ok(())
}

/// Create the `event` and `latest_ledger` tables if they do not exist
pub async fn create_schema(db: &DatabaseConnection) -> Result<(), DbErr> {
    let backend = db.get_database_backend();
    let schema = Schema::new(backend);

    create_entity_table(db, &schema, event::Entity).await?;
    db.execute(backend.build(&unique_event_index())).await?;
    create_entity_table(db, &schema, latest_ledger::Entity).await?;

    info!("Event store schema is ready ({:?})", backend);
    Ok(())
}

/// Drop both tables and recreate them empty
pub async fn reset_schema(db: &DatabaseConnection) -> Result<(), DbErr> {
    let backend = db.get_database_backend();

    info!("Dropping event store tables");
    for drop in [
        Table::drop().table(event::Entity).if_exists().to_owned(),
        Table::drop().table(latest_ledger::Entity).if_exists().to_owned(),
    ] {
        db.execute(backend.build(&drop)).await?;
    }

    create_schema(db).await
}
