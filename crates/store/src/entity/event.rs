//! event entity
//! One row per contract event, unique over (action, project_key, value_hash)

use sea_orm::entity::prelude::*;
use sea_orm::{NotSet, Set};

use crate::{NewEvent, value_digest};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
#[sea_orm(table_name = "event")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub ledger: i64,
    #[sea_orm(indexed)]
    pub action: String,
    #[sea_orm(indexed)]
    pub project_key: String,
    // raw base64 XDR or its decoded text form
    #[sea_orm(column_type = "Text")]
    pub value: String,
    // hex SHA-256 of value, part of the unique key
    pub value_hash: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl From<&NewEvent> for ActiveModel {
    fn from(event: &NewEvent) -> Self {
        Self {
            id: NotSet,
            ledger: Set(event.ledger),
            action: Set(event.action.clone()),
            project_key: Set(event.project_key.clone()),
            value: Set(event.value.clone()),
            value_hash: Set(value_digest(&event.value)),
        }
    }
}
