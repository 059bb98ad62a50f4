//! Database configuration module for `PoolBuddy`.
//!
//! This module handles `SQLite` database connection and table creation using `SeaORM`.
//! Tables are generated from the entity definitions with
//! `Schema::create_table_from_entity`, so the schema always matches the Rust structs.
//! Creation is idempotent; the bot calls [`create_tables`] on every start.

use crate::entities::{
    Income, LineItem, Meal, Note, NutritionReview, User, WeightEntry, WeightGoal,
    nutrition_review,
};
use crate::errors::Result;
use sea_orm::sea_query::{Index, TableCreateStatement};
use sea_orm::{ConnectionTrait, Database, DatabaseConnection, Schema};

const DEFAULT_DATABASE_URL: &str = "sqlite://data/pool_buddy.sqlite?mode=rwc";

/// Gets the database URL from environment variable or returns default `SQLite` path.
#[must_use]
pub fn get_database_url() -> String {
    std::env::var("DATABASE_URL").unwrap_or_else(|_| DEFAULT_DATABASE_URL.to_string())
}

/// Establishes a connection to the `SQLite` database using the `DATABASE_URL` environment variable.
///
/// Falls back to a default local `SQLite` file if no environment variable is set.
pub async fn create_connection() -> Result<DatabaseConnection> {
    let database_url = get_database_url();
    tracing::info!("Connecting to database at {database_url}");
    Database::connect(&database_url).await.map_err(Into::into)
}

/// Creates all necessary database tables using `SeaORM`'s schema generation from entity definitions.
///
/// Also creates the unique `(user_id, review_date)` index that gives nutrition
/// reviews their upsert semantics.
pub async fn create_tables(db: &DatabaseConnection) -> Result<()> {
    let builder = db.get_database_backend();
    let schema = Schema::new(builder);

    let mut tables: Vec<TableCreateStatement> = vec![
        schema.create_table_from_entity(User),
        schema.create_table_from_entity(Income),
        schema.create_table_from_entity(LineItem),
        schema.create_table_from_entity(Meal),
        schema.create_table_from_entity(WeightGoal),
        schema.create_table_from_entity(WeightEntry),
        schema.create_table_from_entity(NutritionReview),
        schema.create_table_from_entity(Note),
    ];

    for table in &mut tables {
        table.if_not_exists();
        db.execute(builder.build(&*table)).await?;
    }

    let review_index = Index::create()
        .name("idx_nutrition_reviews_user_date")
        .table(NutritionReview)
        .col(nutrition_review::Column::UserId)
        .col(nutrition_review::Column::ReviewDate)
        .unique()
        .if_not_exists()
        .to_owned();
    db.execute(builder.build(&review_index)).await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::{
        IncomeModel, LineItemModel, MealModel, NoteModel, NutritionReviewModel, UserModel,
        WeightEntryModel, WeightGoalModel,
    };
    use sea_orm::{EntityTrait, QuerySelect};

    #[tokio::test]
    async fn test_create_tables() -> Result<()> {
        let db = Database::connect("sqlite::memory:").await?;
        create_tables(&db).await?;

        // Test that tables exist by querying them
        let _: Vec<UserModel> = User::find().limit(1).all(&db).await?;
        let _: Vec<IncomeModel> = Income::find().limit(1).all(&db).await?;
        let _: Vec<LineItemModel> = LineItem::find().limit(1).all(&db).await?;
        let _: Vec<MealModel> = Meal::find().limit(1).all(&db).await?;
        let _: Vec<WeightGoalModel> = WeightGoal::find().limit(1).all(&db).await?;
        let _: Vec<WeightEntryModel> = WeightEntry::find().limit(1).all(&db).await?;
        let _: Vec<NutritionReviewModel> = NutritionReview::find().limit(1).all(&db).await?;
        let _: Vec<NoteModel> = Note::find().limit(1).all(&db).await?;

        Ok(())
    }

    #[tokio::test]
    async fn test_create_tables_is_idempotent() -> Result<()> {
        let db = Database::connect("sqlite::memory:").await?;
        create_tables(&db).await?;
        create_tables(&db).await?;
        Ok(())
    }
}
