//! latest_ledger entity
//! Append-only watermark table; the current watermark is the highest ledger

use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
#[sea_orm(table_name = "latest_ledger")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub ledger: i64,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
