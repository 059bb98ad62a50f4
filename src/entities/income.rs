//! Income entity - a pay-in and the three pool ceilings derived from it.
//!
//! The ceilings are whole currency units computed once when the income is
//! created or edited; see [`crate::core::pools::compute_pools`].

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Income database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "incomes")]
pub struct Model {
    /// Unique identifier for the income
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Owner of the income
    pub user_id: String,
    /// Where the money came from (e.g., "Salary")
    pub source: Option<String>,
    /// Amount received, two fraction digits
    pub amount: f64,
    /// Ceiling for discretionary spending
    pub burn_pool: i64,
    /// Ceiling for investments
    pub invest_pool: i64,
    /// Ceiling for fixed commitments
    pub commit_pool: i64,
    /// Date the income was received; decides which cycle it funds
    pub income_date: Date,
    /// Bumped by every pool admission in this income's cycle
    pub revision: i64,
    /// When the income was recorded
    pub created_at: DateTimeUtc,
}

/// Defines relationships between Income and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each income belongs to one user
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::UserId",
        to = "super::user::Column::Id"
    )]
    User,
    /// One income funds many line items
    #[sea_orm(has_many = "super::line_item::Entity")]
    LineItems,
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl Related<super::line_item::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::LineItems.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
