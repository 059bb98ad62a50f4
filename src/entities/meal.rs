//! Meal entity - one logged meal with its macros.
//!
//! `line_item_id` is a soft reference to a Burn or Commitment that paid for the
//! meal. It is not a foreign key: removing the meal removes the linked item
//! explicitly in [`crate::core::meal::delete_meal`].

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// When in the day a meal was eaten.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::None)")]
#[serde(rename_all = "snake_case")]
pub enum MealType {
    /// Breakfast
    #[sea_orm(string_value = "breakfast")]
    Breakfast,
    /// Lunch
    #[sea_orm(string_value = "lunch")]
    Lunch,
    /// Dinner
    #[sea_orm(string_value = "dinner")]
    Dinner,
    /// Snack
    #[sea_orm(string_value = "snack")]
    Snack,
}

/// Meal database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "meals")]
pub struct Model {
    /// Unique identifier for the meal
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Owner of the meal
    pub user_id: String,
    /// Breakfast, lunch, dinner or snack
    pub meal_type: MealType,
    /// Optional free text
    pub description: Option<String>,
    /// Energy in kcal
    pub calories: i32,
    /// Protein in grams
    pub protein: f64,
    /// Fat in grams
    pub fat: f64,
    /// Carbohydrates in grams
    pub carbs: f64,
    /// Day the meal counts towards
    pub meal_date: Date,
    /// Time of day the meal was eaten, used for eating-window analysis
    pub meal_time: Option<Time>,
    /// Relative path of the attached photo, if any
    pub photo_path: Option<String>,
    /// Burn or Commitment that paid for this meal
    pub line_item_id: Option<i64>,
    /// When the meal was recorded
    pub created_at: DateTimeUtc,
}

/// Meals have no enforced relationships
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
