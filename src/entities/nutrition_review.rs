//! Nutrition review entity - the scored summary of one day of meals.
//!
//! Unique per `(user_id, review_date)`; recomputing a day overwrites the row.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Nutrition review database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "nutrition_reviews")]
pub struct Model {
    /// Unique identifier for the review
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Owner of the review
    pub user_id: String,
    /// Day being reviewed
    pub review_date: Date,
    /// Sum of meal calories
    pub total_calories: i64,
    /// Sum of meal protein in grams
    pub total_protein: f64,
    /// Sum of meal carbohydrates in grams
    pub total_carbs: f64,
    /// Sum of meal fat in grams
    pub total_fat: f64,
    /// Calorie target in effect that day
    pub calorie_target: i32,
    /// Protein target in effect that day
    pub protein_target: i32,
    /// Carbohydrate target in effect that day
    pub carbs_target: i32,
    /// Fat target in effect that day
    pub fat_target: i32,
    /// Adherence score, 0-100
    pub adherence_score: i32,
    /// Letter grade derived from the score
    pub grade: String,
    /// Free-text feedback
    pub feedback: String,
    /// When the review was first computed
    pub created_at: DateTimeUtc,
    /// When the review was last recomputed
    pub updated_at: DateTimeUtc,
}

/// Nutrition reviews have no enforced relationships
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
