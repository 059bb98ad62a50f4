//! Shared test utilities for pool-buddy.
//!
//! Helpers for an in-memory database, seeded rows with sensible defaults, and
//! in-process stand-ins for the photo store and the nutrition coach.

use crate::{
    core::{
        coach::{FeedbackContext, NutritionCoach, NutritionEstimate},
        income::{NewIncome, create_income},
        photos::PhotoStore,
        user::ensure_user,
    },
    entities::{MealType, Phase, Pool, income, line_item, meal, user, weight_entry, weight_goal},
    errors::{Error, Result},
};
use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use sea_orm::{ActiveModelTrait, DatabaseConnection, Set};
use std::{
    collections::HashMap,
    sync::{Mutex, PoisonError},
};

/// Creates an in-memory `SQLite` database with all tables initialized.
/// This is the standard setup for all integration tests.
pub async fn setup_test_db() -> Result<DatabaseConnection> {
    let db = sea_orm::Database::connect("sqlite::memory:").await?;
    crate::config::database::create_tables(&db).await?;
    Ok(db)
}

/// Shorthand for a calendar date. Panics on an invalid date.
#[allow(clippy::unwrap_used)]
pub fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).unwrap()
}

/// Creates a user with no display name.
pub async fn create_test_user(db: &DatabaseConnection, user_id: &str) -> Result<user::Model> {
    ensure_user(db, user_id, None).await
}

/// Records an income through the normal creation path.
///
/// # Defaults
/// * `source`: `"Salary"`
pub async fn create_test_income(
    db: &DatabaseConnection,
    user_id: &str,
    amount: f64,
    income_date: NaiveDate,
) -> Result<income::Model> {
    create_income(
        db,
        user_id,
        NewIncome {
            source: Some("Salary".to_string()),
            amount,
            income_date,
        },
    )
    .await
}

/// Inserts a line item directly, bypassing admission control.
/// Use this to seed spend that would otherwise be rejected or that falls
/// outside the current cycle.
pub async fn insert_test_item(
    db: &DatabaseConnection,
    income_id: i64,
    pool: Pool,
    amount: f64,
    item_date: NaiveDate,
) -> Result<line_item::Model> {
    let category = pool
        .allowed_categories()
        .and_then(|categories| categories.first().copied())
        .unwrap_or("Rent");
    Ok(line_item::ActiveModel {
        income_id: Set(income_id),
        pool: Set(pool),
        category: Set(category.to_string()),
        amount: Set(amount),
        description: Set(None),
        photo_path: Set(None),
        is_done: Set(false),
        is_recurring: Set(false),
        item_date: Set(item_date),
        created_at: Set(Utc::now()),
        ..Default::default()
    }
    .insert(db)
    .await?)
}

/// Inserts a 500 kcal lunch, optionally linked to a line item.
pub async fn insert_test_meal(
    db: &DatabaseConnection,
    user_id: &str,
    meal_date: NaiveDate,
    line_item_id: Option<i64>,
) -> Result<meal::Model> {
    insert_meal(db, user_id, meal_date, 500, 30.0, line_item_id).await
}

/// Inserts an untimed lunch with the given calories and protein.
pub async fn insert_test_meal_with(
    db: &DatabaseConnection,
    user_id: &str,
    meal_date: NaiveDate,
    calories: i32,
    protein: f64,
) -> Result<meal::Model> {
    insert_meal(db, user_id, meal_date, calories, protein, None).await
}

async fn insert_meal(
    db: &DatabaseConnection,
    user_id: &str,
    meal_date: NaiveDate,
    calories: i32,
    protein: f64,
    line_item_id: Option<i64>,
) -> Result<meal::Model> {
    Ok(meal::ActiveModel {
        user_id: Set(user_id.to_string()),
        meal_type: Set(MealType::Lunch),
        description: Set(None),
        calories: Set(calories),
        protein: Set(protein),
        fat: Set(0.0),
        carbs: Set(0.0),
        meal_date: Set(meal_date),
        meal_time: Set(None),
        photo_path: Set(None),
        line_item_id: Set(line_item_id),
        created_at: Set(Utc::now()),
        ..Default::default()
    }
    .insert(db)
    .await?)
}

/// An unsaved goal for a 100 kg user aiming at 80 kg, in priming since
/// 2025-03-01 with the priming default targets.
pub fn sample_goal(user_id: &str) -> weight_goal::Model {
    weight_goal::Model {
        id: 1,
        user_id: user_id.to_string(),
        starting_weight: 100.0,
        current_weight: 100.0,
        goal_weight: 80.0,
        height_cm: 180,
        target_date: date(2026, 6, 1),
        current_phase: Phase::Priming,
        phase_start_date: date(2025, 3, 1),
        daily_calorie_target: 2350,
        daily_protein_target: 165,
        daily_carbs_target: 250,
        daily_fat_target: 70,
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
}

/// An unsaved weight entry.
pub fn sample_entry(user_id: &str, weight_kg: f64, entry_date: NaiveDate) -> weight_entry::Model {
    weight_entry::Model {
        id: 0,
        user_id: user_id.to_string(),
        weight_kg,
        entry_date,
        note: None,
        created_at: Utc::now(),
    }
}

/// Photo store kept in memory. Can be told to fail every key with a prefix.
#[derive(Debug, Default)]
pub struct MemoryPhotoStore {
    files: Mutex<HashMap<String, Vec<u8>>>,
    fail_prefix: Option<String>,
}

impl MemoryPhotoStore {
    /// A store whose `put` fails for keys starting with `prefix`.
    pub fn failing_on(prefix: &str) -> Self {
        Self {
            fail_prefix: Some(prefix.to_string()),
            ..Self::default()
        }
    }

    /// Whether `key` is stored.
    pub fn contains(&self, key: &str) -> bool {
        self.files
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(key)
    }

    /// Bytes stored under `key`.
    pub fn get(&self, key: &str) -> Option<Vec<u8>> {
        self.files
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
    }

    /// Whether nothing is stored.
    pub fn is_empty(&self) -> bool {
        self.files
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_empty()
    }
}

#[async_trait]
impl PhotoStore for MemoryPhotoStore {
    async fn put(&self, key: &str, bytes: &[u8]) -> Result<()> {
        if self
            .fail_prefix
            .as_deref()
            .is_some_and(|prefix| key.starts_with(prefix))
        {
            return Err(Error::Photo {
                message: format!("refusing to write {key}"),
            });
        }
        self.files
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.to_string(), bytes.to_vec());
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.files
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(key);
        Ok(())
    }
}

/// Coach that fails every call.
#[derive(Debug, Clone, Copy, Default)]
pub struct FailingCoach;

#[async_trait]
impl NutritionCoach for FailingCoach {
    async fn describe_image(&self, _bytes: &[u8]) -> Result<NutritionEstimate> {
        Err(Error::Coach {
            message: "vision service unavailable".to_string(),
        })
    }

    async fn generate_feedback(&self, _context: &FeedbackContext) -> Result<String> {
        Err(Error::Coach {
            message: "feedback service unavailable".to_string(),
        })
    }
}
