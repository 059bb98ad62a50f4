//! Weight entry entity - append-only weigh-in history.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Weight entry database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "weight_entries")]
pub struct Model {
    /// Unique identifier for the entry
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Owner of the entry
    pub user_id: String,
    /// Weight in kg
    pub weight_kg: f64,
    /// Day of the weigh-in
    pub entry_date: Date,
    /// Optional note
    pub note: Option<String>,
    /// When the entry was recorded
    pub created_at: DateTimeUtc,
}

/// Weight entries have no enforced relationships
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
