//! Line item entity - one Burn, Invest or Commitment spend.
//!
//! All three spend variants share the same shape, so they live in a single
//! table discriminated by [`Pool`]. A line item belongs to an income, never
//! directly to a user; ownership is resolved through `income_id`.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;

/// The budget pool a line item draws from.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::None)")]
#[serde(rename_all = "snake_case")]
pub enum Pool {
    /// Discretionary spending
    #[sea_orm(string_value = "burn")]
    Burn,
    /// Investments
    #[sea_orm(string_value = "invest")]
    Invest,
    /// Fixed commitments
    #[sea_orm(string_value = "commit")]
    Commit,
}

impl Pool {
    /// Lowercase label used in messages and storage folders.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Burn => "burn",
            Self::Invest => "invest",
            Self::Commit => "commit",
        }
    }

    /// Category labels accepted for this pool. `None` means free-form.
    #[must_use]
    pub const fn allowed_categories(self) -> Option<&'static [&'static str]> {
        match self {
            Self::Burn => Some(&["Stupid", "Health", "Therapeutic", "Tech"]),
            Self::Invest => Some(&["High Risks", "Med Risks", "Low Risks"]),
            Self::Commit => None,
        }
    }
}

impl fmt::Display for Pool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Line item database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "line_items")]
pub struct Model {
    /// Unique identifier for the line item
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Income whose pool funds this item
    pub income_id: i64,
    /// Which pool the item draws from
    pub pool: Pool,
    /// Category label (validated per pool)
    pub category: String,
    /// Amount spent, two fraction digits
    pub amount: f64,
    /// Optional free text
    pub description: Option<String>,
    /// Relative path of the attached photo, if any
    pub photo_path: Option<String>,
    /// Whether the item has been settled
    pub is_done: bool,
    /// Whether the item repeats every cycle
    pub is_recurring: bool,
    /// Date of the spend; decides which cycle it counts against
    pub item_date: Date,
    /// When the item was recorded
    pub created_at: DateTimeUtc,
}

/// Defines relationships between `LineItem` and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each line item belongs to one income
    #[sea_orm(
        belongs_to = "super::income::Entity",
        from = "Column::IncomeId",
        to = "super::income::Column::Id"
    )]
    Income,
}

impl Related<super::income::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Income.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
