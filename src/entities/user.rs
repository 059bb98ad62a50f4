//! User entity - the owner of incomes, meals and weight records.
//!
//! The primary key is the external identifier of the person (the Discord user
//! ID when driven by the bot), so no surrogate key is generated.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// User database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "users")]
pub struct Model {
    /// External user identifier
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    /// Optional display name
    pub name: Option<String>,
    /// Daily burn spending limit, whole units
    pub daily_limit_burn: Option<i32>,
    /// Daily burn amount set aside, whole units
    pub daily_supply_burn: Option<i32>,
    /// When the user was first seen
    pub created_at: DateTimeUtc,
}

/// Defines relationships between User and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// One user has many incomes
    #[sea_orm(has_many = "super::income::Entity")]
    Incomes,
}

impl Related<super::income::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Incomes.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
