//! Weight goal entity - a user's weight-loss plan and the targets of the phase
//! they are in. At most one row per user.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Named stage of the weight-loss plan.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::None)")]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    /// Metabolic priming
    #[sea_orm(string_value = "priming")]
    Priming,
    /// Sustained fat loss
    #[sea_orm(string_value = "fat_loss")]
    FatLoss,
    /// Maintenance break
    #[sea_orm(string_value = "diet_break")]
    DietBreak,
    /// Last stretch to the goal weight
    #[sea_orm(string_value = "final_push")]
    FinalPush,
}

impl Phase {
    /// Storage label of the phase.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Priming => "priming",
            Self::FatLoss => "fat_loss",
            Self::DietBreak => "diet_break",
            Self::FinalPush => "final_push",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Weight goal database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "weight_goals")]
pub struct Model {
    /// Unique identifier for the goal
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Owner of the goal
    #[sea_orm(unique)]
    pub user_id: String,
    /// Weight in kg when the plan started
    pub starting_weight: f64,
    /// Most recently logged weight in kg
    pub current_weight: f64,
    /// Target weight in kg
    pub goal_weight: f64,
    /// Height in cm
    pub height_cm: i32,
    /// Date the goal weight should be reached
    pub target_date: Date,
    /// Phase the user is currently in
    pub current_phase: Phase,
    /// Day the current phase began
    pub phase_start_date: Date,
    /// Daily energy target in kcal
    pub daily_calorie_target: i32,
    /// Daily protein target in grams
    pub daily_protein_target: i32,
    /// Daily carbohydrate target in grams
    pub daily_carbs_target: i32,
    /// Daily fat target in grams
    pub daily_fat_target: i32,
    /// When the goal was set up
    pub created_at: DateTimeUtc,
    /// When the goal was last modified
    pub updated_at: DateTimeUtc,
}

/// Weight goals have no enforced relationships
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
