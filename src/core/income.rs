//! Income business logic - recording pay-ins and deriving their pool ceilings.
//!
//! An income's ceilings are computed once with [`compute_pools`] on create and
//! recomputed whenever its amount changes. Deleting an income removes its line
//! items explicitly, including their photos, and detaches any meals that
//! pointed at those items.

use crate::{
    core::{
        cycle::{Cycle, resolve_cycle},
        notes,
        photos::{self, PhotoStore},
        pools::{compute_pools, to_cents},
        user::get_user,
    },
    entities::{Income, LineItem, Meal, income, line_item, meal},
    errors::{Error, Result},
};
use chrono::NaiveDate;
use sea_orm::{QueryOrder, Set, TransactionTrait, Value, prelude::*, sea_query::Expr};

/// Input for a new income.
#[derive(Debug, Clone)]
pub struct NewIncome {
    /// Where the money came from
    pub source: Option<String>,
    /// Amount received
    pub amount: f64,
    /// Date received
    pub income_date: NaiveDate,
}

/// Partial update for an income. `None` leaves a field unchanged.
#[derive(Debug, Clone, Default)]
pub struct IncomeUpdate {
    /// New source label
    pub source: Option<String>,
    /// New amount; ceilings are recomputed
    pub amount: Option<f64>,
    /// New date; must stay in the same cycle while line items are attached
    pub income_date: Option<NaiveDate>,
}

pub(crate) fn validate_amount(amount: f64) -> Result<()> {
    if !amount.is_finite() || to_cents(amount) <= 0 {
        return Err(Error::InvalidAmount { amount });
    }
    Ok(())
}

/// Records a new income and its pool ceilings.
pub async fn create_income(
    db: &DatabaseConnection,
    user_id: &str,
    new: NewIncome,
) -> Result<income::Model> {
    validate_amount(new.amount)?;
    get_user(db, user_id).await?;

    let split = compute_pools(new.amount);
    let model = income::ActiveModel {
        user_id: Set(user_id.to_string()),
        source: Set(new.source.filter(|s| !s.trim().is_empty())),
        amount: Set(new.amount),
        burn_pool: Set(split.burn),
        invest_pool: Set(split.invest),
        commit_pool: Set(split.commit),
        income_date: Set(new.income_date),
        revision: Set(0),
        created_at: Set(chrono::Utc::now()),
        ..Default::default()
    };

    let created = model.insert(db).await?;
    tracing::info!(
        "Recorded income {} of {:.2} for {user_id}: burn {} / invest {} / commit {}",
        created.id,
        created.amount,
        created.burn_pool,
        created.invest_pool,
        created.commit_pool
    );
    Ok(created)
}

/// Retrieves an income owned by `user_id`.
pub async fn get_income<C>(db: &C, user_id: &str, income_id: i64) -> Result<income::Model>
where
    C: ConnectionTrait,
{
    Income::find_by_id(income_id)
        .filter(income::Column::UserId.eq(user_id))
        .one(db)
        .await?
        .ok_or_else(|| Error::not_found("income", income_id))
}

/// Lists a user's incomes dated within `range`, newest first.
pub async fn list_incomes_in_range(
    db: &DatabaseConnection,
    user_id: &str,
    range: Cycle,
) -> Result<Vec<income::Model>> {
    Income::find()
        .filter(income::Column::UserId.eq(user_id))
        .filter(income::Column::IncomeDate.between(range.start, range.end))
        .order_by_desc(income::Column::IncomeDate)
        .order_by_desc(income::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Applies a partial update to an income and recomputes its ceilings.
pub async fn update_income(
    db: &DatabaseConnection,
    user_id: &str,
    income_id: i64,
    update: IncomeUpdate,
) -> Result<income::Model> {
    if let Some(amount) = update.amount {
        validate_amount(amount)?;
    }

    let txn = db.begin().await?;
    let existing = get_income(&txn, user_id, income_id).await?;

    if let Some(new_date) = update.income_date {
        let old_cycle = resolve_cycle(existing.income_date);
        let has_items = LineItem::find()
            .filter(line_item::Column::IncomeId.eq(income_id))
            .one(&txn)
            .await?
            .is_some();
        if has_items && resolve_cycle(new_date) != old_cycle {
            return Err(Error::validation(format!(
                "Income {income_id} funds line items in cycle {old_cycle}; \
                 its date cannot move to {new_date}"
            )));
        }
    }

    let mut active: income::ActiveModel = existing.into();
    if let Some(source) = update.source {
        active.source = Set(Some(source).filter(|s| !s.trim().is_empty()));
    }
    if let Some(amount) = update.amount {
        let split = compute_pools(amount);
        active.amount = Set(amount);
        active.burn_pool = Set(split.burn);
        active.invest_pool = Set(split.invest);
        active.commit_pool = Set(split.commit);
    }
    if let Some(income_date) = update.income_date {
        active.income_date = Set(income_date);
    }

    let updated = active.update(&txn).await?;
    txn.commit().await?;

    tracing::info!("Updated income {income_id} for {user_id}");
    Ok(updated)
}

/// Deletes an income together with its line items and their photos.
///
/// Meals that referenced a removed line item keep existing with the link
/// cleared. Returns the number of line items removed.
pub async fn delete_income(
    db: &DatabaseConnection,
    photos: &dyn PhotoStore,
    user_id: &str,
    income_id: i64,
) -> Result<usize> {
    let txn = db.begin().await?;
    let income = get_income(&txn, user_id, income_id).await?;

    let items = LineItem::find()
        .filter(line_item::Column::IncomeId.eq(income.id))
        .all(&txn)
        .await?;
    let item_ids: Vec<i64> = items.iter().map(|item| item.id).collect();

    if !item_ids.is_empty() {
        Meal::update_many()
            .col_expr(meal::Column::LineItemId, Expr::value(Value::BigInt(None)))
            .filter(meal::Column::LineItemId.is_in(item_ids.clone()))
            .exec(&txn)
            .await?;
        notes::unlink_line_items(&txn, &item_ids).await?;
        LineItem::delete_many()
            .filter(line_item::Column::Id.is_in(item_ids))
            .exec(&txn)
            .await?;
    }

    income.delete(&txn).await?;
    txn.commit().await?;

    let photo_keys: Vec<String> = items
        .iter()
        .filter_map(|item| item.photo_path.clone())
        .collect();
    photos::delete_quietly(photos, &photo_keys).await;

    tracing::info!(
        "Deleted income {income_id} for {user_id} with {} line items",
        items.len()
    );
    Ok(items.len())
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::float_cmp)]
    use super::*;
    use crate::entities::Pool;
    use crate::test_utils::*;
    use sea_orm::{DatabaseBackend, MockDatabase};

    #[tokio::test]
    async fn test_create_income_validation() -> Result<()> {
        let db = MockDatabase::new(DatabaseBackend::Sqlite).into_connection();
        let new = |amount| NewIncome {
            source: None,
            amount,
            income_date: date(2025, 3, 1),
        };

        for amount in [0.0, -5.0, f64::NAN, f64::INFINITY, 0.004] {
            let result = create_income(&db, "u1", new(amount)).await;
            assert!(matches!(result, Err(Error::InvalidAmount { .. })));
        }
        Ok(())
    }

    #[tokio::test]
    async fn test_create_income_requires_user() -> Result<()> {
        let db = setup_test_db().await?;
        let result = create_income(
            &db,
            "ghost",
            NewIncome {
                source: None,
                amount: 100.0,
                income_date: date(2025, 3, 1),
            },
        )
        .await;
        assert!(matches!(result, Err(Error::NotFound { entity: "user", .. })));
        Ok(())
    }

    #[tokio::test]
    async fn test_create_income_stores_split() -> Result<()> {
        let db = setup_test_db().await?;
        create_test_user(&db, "u1").await?;

        let income = create_income(
            &db,
            "u1",
            NewIncome {
                source: Some("Salary".to_string()),
                amount: 3001.75,
                income_date: date(2025, 3, 1),
            },
        )
        .await?;

        assert_eq!(income.burn_pool, 600);
        assert_eq!(income.invest_pool, 900);
        assert_eq!(income.commit_pool, 1502);
        assert_eq!(
            income.burn_pool + income.invest_pool + income.commit_pool,
            3002
        );
        assert_eq!(income.source.as_deref(), Some("Salary"));
        assert_eq!(income.revision, 0);
        Ok(())
    }

    #[tokio::test]
    async fn test_update_income_recomputes_split() -> Result<()> {
        let db = setup_test_db().await?;
        create_test_user(&db, "u1").await?;
        let income = create_test_income(&db, "u1", 100.0, date(2025, 3, 1)).await?;

        let updated = update_income(
            &db,
            "u1",
            income.id,
            IncomeUpdate {
                amount: Some(101.0),
                ..Default::default()
            },
        )
        .await?;
        assert_eq!(updated.amount, 101.0);
        assert_eq!(updated.commit_pool, 51);

        // Other users cannot see it
        let err = update_income(&db, "u2", income.id, IncomeUpdate::default())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NotFound { entity: "income", .. }));
        Ok(())
    }

    #[tokio::test]
    async fn test_update_income_date_cannot_orphan_items() -> Result<()> {
        let db = setup_test_db().await?;
        create_test_user(&db, "u1").await?;
        let income = create_test_income(&db, "u1", 100.0, date(2025, 3, 1)).await?;
        insert_test_item(&db, income.id, Pool::Burn, 5.0, date(2025, 3, 2)).await?;

        let moved_within = update_income(
            &db,
            "u1",
            income.id,
            IncomeUpdate {
                income_date: Some(date(2025, 3, 20)),
                ..Default::default()
            },
        )
        .await?;
        assert_eq!(moved_within.income_date, date(2025, 3, 20));

        let result = update_income(
            &db,
            "u1",
            income.id,
            IncomeUpdate {
                income_date: Some(date(2025, 4, 1)),
                ..Default::default()
            },
        )
        .await;
        assert!(matches!(result, Err(Error::Validation { .. })));
        Ok(())
    }

    #[tokio::test]
    async fn test_delete_income_cascades_to_items_and_photos() -> Result<()> {
        let db = setup_test_db().await?;
        let store = MemoryPhotoStore::default();
        create_test_user(&db, "u1").await?;
        let income = create_test_income(&db, "u1", 100.0, date(2025, 3, 1)).await?;
        let item = insert_test_item(&db, income.id, Pool::Burn, 5.0, date(2025, 3, 2)).await?;

        store.put("burn/1.jpg", b"x").await?;
        let mut active: line_item::ActiveModel = item.clone().into();
        active.photo_path = Set(Some("burn/1.jpg".to_string()));
        active.update(&db).await?;
        let meal = insert_test_meal(&db, "u1", date(2025, 3, 2), Some(item.id)).await?;

        let removed = delete_income(&db, &store, "u1", income.id).await?;
        assert_eq!(removed, 1);
        assert!(Income::find_by_id(income.id).one(&db).await?.is_none());
        assert!(LineItem::find_by_id(item.id).one(&db).await?.is_none());
        assert!(!store.contains("burn/1.jpg"));

        let meal = Meal::find_by_id(meal.id).one(&db).await?.unwrap();
        assert_eq!(meal.line_item_id, None);
        Ok(())
    }
}
