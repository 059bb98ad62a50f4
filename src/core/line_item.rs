//! Line item business logic - Burn, Invest and Commitment spends.
//!
//! Every write that can raise a pool's spend goes through the same sequence in
//! one database transaction: bump the revision of the funding incomes as the
//! first statement (taking the write lock), re-read the remaining allowance, run
//! [`validate_and_apply`](crate::core::pools::validate_and_apply), then insert
//! or update. Two concurrent writers on the same pool are serialised by the
//! lock, so they cannot jointly overshoot its ceiling.

use crate::{
    core::{
        cycle::{Cycle, resolve_cycle},
        income::validate_amount,
        notes,
        photos::{self, PhotoStore, PhotoUpload},
        pools::{available_in, lock_cycle, lock_item_income, to_cents, validate_and_apply},
        user::get_user,
    },
    entities::{Income, LineItem, Meal, Pool, income, line_item, meal},
    errors::{Error, Result},
};
use chrono::NaiveDate;
use sea_orm::{Set, TransactionTrait, Value, prelude::*, sea_query::Expr};
use std::str::FromStr;

/// Longest accepted free-form Commitment label.
const MAX_CATEGORY_LEN: usize = 100;

impl FromStr for Pool {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "burn" => Ok(Self::Burn),
            "invest" => Ok(Self::Invest),
            "commit" | "commitment" => Ok(Self::Commit),
            other => Err(Error::validation(format!(
                "Invalid pool '{other}', expected one of burn, invest, commit"
            ))),
        }
    }
}

/// Input for a new line item.
#[derive(Debug, Clone)]
pub struct NewLineItem {
    /// Pool to draw from
    pub pool: Pool,
    /// Category label
    pub category: String,
    /// Amount spent
    pub amount: f64,
    /// Optional free text
    pub description: Option<String>,
    /// Date of the spend; defaults to today
    pub item_date: Option<NaiveDate>,
    /// Already settled
    pub is_done: bool,
    /// Repeats every cycle
    pub is_recurring: bool,
    /// Optional receipt photo
    pub photo: Option<PhotoUpload>,
}

/// Partial update for a line item. `None` leaves a field unchanged.
#[derive(Debug, Clone, Default)]
pub struct LineItemUpdate {
    /// New category label
    pub category: Option<String>,
    /// New amount
    pub amount: Option<f64>,
    /// New description
    pub description: Option<String>,
    /// New date; must stay in the funding income's cycle
    pub item_date: Option<NaiveDate>,
    /// Settled flag
    pub is_done: Option<bool>,
    /// Recurring flag
    pub is_recurring: Option<bool>,
}

/// Checks a category label against the pool's allowed set and returns its
/// canonical spelling. Burn and Invest labels match case-insensitively;
/// Commitment labels are free-form but must not be blank.
pub fn validate_category(pool: Pool, category: &str) -> Result<String> {
    let trimmed = category.trim();
    match pool.allowed_categories() {
        Some(allowed) => allowed
            .iter()
            .find(|label| label.eq_ignore_ascii_case(trimmed))
            .map(|label| (*label).to_string())
            .ok_or_else(|| {
                Error::validation(format!(
                    "Invalid {pool} category '{trimmed}', expected one of: {}",
                    allowed.join(", ")
                ))
            }),
        None if trimmed.is_empty() => Err(Error::validation("Category is required")),
        None if trimmed.len() > MAX_CATEGORY_LEN => Err(Error::validation(format!(
            "Category must be at most {MAX_CATEGORY_LEN} characters"
        ))),
        None => Ok(trimmed.to_string()),
    }
}

/// Records a spend against the most recent income of the current cycle.
///
/// Fails with [`Error::NoIncomeInCycle`] when no income exists in the cycle and
/// with [`Error::InsufficientPool`] when the pool cannot cover the amount.
pub async fn create_line_item(
    db: &DatabaseConnection,
    photos: &dyn PhotoStore,
    user_id: &str,
    new: NewLineItem,
    today: NaiveDate,
) -> Result<line_item::Model> {
    validate_amount(new.amount)?;
    let category = validate_category(new.pool, &new.category)?;

    let cycle = resolve_cycle(today);
    let item_date = new.item_date.unwrap_or(today);
    if !cycle.contains(item_date) {
        return Err(Error::validation(format!(
            "Date {item_date} is outside the current cycle {cycle}"
        )));
    }

    let txn = db.begin().await?;
    if lock_cycle(&txn, user_id, cycle).await? == 0 {
        get_user(&txn, user_id).await?;
        return Err(Error::NoIncomeInCycle {
            start: cycle.start,
            end: cycle.end,
        });
    }

    let availability = available_in(&txn, user_id, new.pool, cycle)
        .await?
        .ok_or(Error::NoIncomeInCycle {
            start: cycle.start,
            end: cycle.end,
        })?;
    let left = validate_and_apply(new.pool, new.amount, availability.remaining, 0.0)?;

    let model = line_item::ActiveModel {
        income_id: Set(availability.income.id),
        pool: Set(new.pool),
        category: Set(category),
        amount: Set(new.amount),
        description: Set(new.description.filter(|d| !d.trim().is_empty())),
        photo_path: Set(None),
        is_done: Set(new.is_done),
        is_recurring: Set(new.is_recurring),
        item_date: Set(item_date),
        created_at: Set(chrono::Utc::now()),
        ..Default::default()
    };
    let mut created = model.insert(&txn).await?;

    let mut written = Vec::new();
    if let Some(upload) = &new.photo {
        let key = upload.key_for(new.pool.as_str(), created.id);
        photos.put(&key, &upload.bytes).await?;
        written.push(key.clone());

        let mut active: line_item::ActiveModel = created.into();
        active.photo_path = Set(Some(key));
        created = match active.update(&txn).await {
            Ok(updated) => updated,
            Err(e) => {
                photos::delete_quietly(photos, &written).await;
                return Err(e.into());
            }
        };
    }

    if let Err(e) = txn.commit().await {
        photos::delete_quietly(photos, &written).await;
        return Err(e.into());
    }

    tracing::info!(
        "Added {} {:.2} ({}) for {user_id}, {left:.2} left",
        created.pool,
        created.amount,
        created.category
    );
    Ok(created)
}

/// Retrieves a line item owned (through its income) by `user_id`.
pub async fn get_line_item<C>(db: &C, user_id: &str, item_id: i64) -> Result<line_item::Model>
where
    C: ConnectionTrait,
{
    find_owned(db, user_id, item_id).await.map(|(item, _)| item)
}

/// Applies a partial update to a line item.
///
/// Amount increases are admitted against the pool of the cycle the item's
/// income funds, with the item's current amount added back to the allowance.
/// Decreases and non-amount edits never hit the gate.
pub async fn update_line_item(
    db: &DatabaseConnection,
    user_id: &str,
    item_id: i64,
    update: LineItemUpdate,
) -> Result<line_item::Model> {
    if let Some(amount) = update.amount {
        validate_amount(amount)?;
    }

    let txn = db.begin().await?;
    if update.amount.is_some() {
        lock_item_income(&txn, item_id).await?;
    }
    let (item, funding) = find_owned(&txn, user_id, item_id).await?;
    let funding_cycle = resolve_cycle(funding.income_date);

    let category = update
        .category
        .as_deref()
        .map(|label| validate_category(item.pool, label))
        .transpose()?;

    if let Some(new_date) = update.item_date {
        ensure_in_cycle(new_date, funding_cycle)?;
    }

    if let Some(new_amount) = update.amount {
        if to_cents(new_amount) > to_cents(item.amount) {
            let availability = available_in(&txn, user_id, item.pool, funding_cycle)
                .await?
                .ok_or(Error::NoIncomeInCycle {
                    start: funding_cycle.start,
                    end: funding_cycle.end,
                })?;
            validate_and_apply(item.pool, new_amount, availability.remaining, item.amount)?;
        }
    }

    let mut active: line_item::ActiveModel = item.into();
    if let Some(category) = category {
        active.category = Set(category);
    }
    if let Some(amount) = update.amount {
        active.amount = Set(amount);
    }
    if let Some(description) = update.description {
        active.description = Set(Some(description).filter(|d| !d.trim().is_empty()));
    }
    if let Some(item_date) = update.item_date {
        active.item_date = Set(item_date);
    }
    if let Some(is_done) = update.is_done {
        active.is_done = Set(is_done);
    }
    if let Some(is_recurring) = update.is_recurring {
        active.is_recurring = Set(is_recurring);
    }

    let updated = active.update(&txn).await?;
    txn.commit().await?;

    tracing::info!("Updated {} item {item_id} for {user_id}", updated.pool);
    Ok(updated)
}

/// Deletes a line item and its photo. Meals linked to it keep existing with
/// the link cleared.
pub async fn delete_line_item(
    db: &DatabaseConnection,
    photos: &dyn PhotoStore,
    user_id: &str,
    item_id: i64,
) -> Result<line_item::Model> {
    let txn = db.begin().await?;
    let (item, _) = find_owned(&txn, user_id, item_id).await?;

    Meal::update_many()
        .col_expr(meal::Column::LineItemId, Expr::value(Value::BigInt(None)))
        .filter(meal::Column::LineItemId.eq(item.id))
        .exec(&txn)
        .await?;
    notes::unlink_line_items(&txn, &[item.id]).await?;
    LineItem::delete_by_id(item.id).exec(&txn).await?;
    txn.commit().await?;

    if let Some(key) = &item.photo_path {
        photos::delete_quietly(photos, std::slice::from_ref(key)).await;
    }

    tracing::info!("Deleted {} item {item_id} for {user_id}", item.pool);
    Ok(item)
}

fn ensure_in_cycle(date: NaiveDate, cycle: Cycle) -> Result<()> {
    if cycle.contains(date) {
        Ok(())
    } else {
        Err(Error::validation(format!(
            "Date {date} is outside the funding cycle {cycle}"
        )))
    }
}

pub(crate) async fn find_owned<C>(
    db: &C,
    user_id: &str,
    item_id: i64,
) -> Result<(line_item::Model, income::Model)>
where
    C: ConnectionTrait,
{
    match LineItem::find_by_id(item_id)
        .find_also_related(Income)
        .one(db)
        .await?
    {
        Some((item, Some(funding))) if funding.user_id == user_id => Ok((item, funding)),
        _ => Err(Error::not_found("line item", item_id)),
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::float_cmp)]
    use super::*;
    use crate::core::pools::available;
    use crate::errors::ErrorKind;
    use crate::test_utils::*;
    use std::sync::Arc;

    fn burn(amount: f64) -> NewLineItem {
        NewLineItem {
            pool: Pool::Burn,
            category: "Health".to_string(),
            amount,
            description: None,
            item_date: None,
            is_done: false,
            is_recurring: false,
            photo: None,
        }
    }

    #[test]
    fn test_parse_pool() {
        assert_eq!("Burn".parse::<Pool>().unwrap(), Pool::Burn);
        assert_eq!("commitment".parse::<Pool>().unwrap(), Pool::Commit);
        assert!(matches!(
            "savings".parse::<Pool>(),
            Err(Error::Validation { .. })
        ));
    }

    #[test]
    fn test_validate_category() {
        assert_eq!(validate_category(Pool::Burn, "tech").unwrap(), "Tech");
        assert_eq!(
            validate_category(Pool::Invest, " med risks ").unwrap(),
            "Med Risks"
        );
        assert!(validate_category(Pool::Burn, "High Risks").is_err());
        assert!(validate_category(Pool::Invest, "Stupid").is_err());
        assert_eq!(validate_category(Pool::Commit, "Rent").unwrap(), "Rent");
        assert!(validate_category(Pool::Commit, "   ").is_err());
        assert!(validate_category(Pool::Commit, &"x".repeat(101)).is_err());
    }

    #[tokio::test]
    async fn test_burn_admission_against_remaining() -> Result<()> {
        let db = setup_test_db().await?;
        let store = MemoryPhotoStore::default();
        create_test_user(&db, "u1").await?;
        let today = date(2025, 3, 10);

        // burn_pool = 20
        let income = create_test_income(&db, "u1", 100.0, date(2025, 3, 1)).await?;
        assert_eq!(income.burn_pool, 20);
        create_line_item(&db, &store, "u1", burn(10.0), today).await?;
        create_line_item(&db, &store, "u1", burn(5.0), today).await?;

        let avail = available(&db, "u1", Pool::Burn, today).await?.unwrap();
        assert_eq!(avail.remaining, 5.0);

        let err = create_line_item(&db, &store, "u1", burn(6.0), today)
            .await
            .unwrap_err();
        match err {
            Error::InsufficientPool {
                pool, remaining, ..
            } => {
                assert_eq!(pool, Pool::Burn);
                assert_eq!(remaining, 5.0);
            }
            other => panic!("expected InsufficientPool, got {other:?}"),
        }

        create_line_item(&db, &store, "u1", burn(5.0), today).await?;
        let avail = available(&db, "u1", Pool::Burn, today).await?.unwrap();
        assert_eq!(avail.remaining, 0.0);
        Ok(())
    }

    #[tokio::test]
    async fn test_create_without_income_is_rejected() -> Result<()> {
        let db = setup_test_db().await?;
        let store = MemoryPhotoStore::default();
        create_test_user(&db, "u1").await?;
        // Income belongs to the previous cycle
        create_test_income(&db, "u1", 100.0, date(2025, 2, 20)).await?;

        let err = create_line_item(&db, &store, "u1", burn(1.0), date(2025, 3, 10))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NoIncomeInCycle { .. }));
        assert!(LineItem::find().all(&db).await?.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_create_rejects_date_outside_cycle() -> Result<()> {
        let db = setup_test_db().await?;
        let store = MemoryPhotoStore::default();
        create_test_user(&db, "u1").await?;
        create_test_income(&db, "u1", 100.0, date(2025, 3, 1)).await?;

        let mut new = burn(1.0);
        new.item_date = Some(date(2025, 3, 25));
        let err = create_line_item(&db, &store, "u1", new, date(2025, 3, 10))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Validation { .. }));
        Ok(())
    }

    #[tokio::test]
    async fn test_edit_adds_back_previous_amount() -> Result<()> {
        let db = setup_test_db().await?;
        let store = MemoryPhotoStore::default();
        create_test_user(&db, "u1").await?;
        let today = date(2025, 3, 10);
        create_test_income(&db, "u1", 100.0, date(2025, 3, 1)).await?;

        let only = create_line_item(&db, &store, "u1", burn(5.0), today).await?;
        let edited = update_line_item(
            &db,
            "u1",
            only.id,
            LineItemUpdate {
                amount: Some(8.0),
                ..Default::default()
            },
        )
        .await?;
        assert_eq!(edited.amount, 8.0);

        // Fill the pool: 8 + 12 = 20
        create_line_item(&db, &store, "u1", burn(12.0), today).await?;

        let err = update_line_item(
            &db,
            "u1",
            only.id,
            LineItemUpdate {
                amount: Some(9.0),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(
            err,
            Error::InsufficientPool { remaining, .. } if remaining == 8.0
        ));

        // Decreases always pass
        let lowered = update_line_item(
            &db,
            "u1",
            only.id,
            LineItemUpdate {
                amount: Some(2.0),
                description: Some("coffee".to_string()),
                ..Default::default()
            },
        )
        .await?;
        assert_eq!(lowered.amount, 2.0);
        assert_eq!(lowered.description.as_deref(), Some("coffee"));
        Ok(())
    }

    #[tokio::test]
    async fn test_update_validates_category_and_owner() -> Result<()> {
        let db = setup_test_db().await?;
        let store = MemoryPhotoStore::default();
        create_test_user(&db, "u1").await?;
        create_test_user(&db, "u2").await?;
        let today = date(2025, 3, 10);
        create_test_income(&db, "u1", 100.0, date(2025, 3, 1)).await?;
        let item = create_line_item(&db, &store, "u1", burn(1.0), today).await?;

        let err = update_line_item(
            &db,
            "u1",
            item.id,
            LineItemUpdate {
                category: Some("Rent".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, Error::Validation { .. }));

        let err = update_line_item(&db, "u2", item.id, LineItemUpdate::default())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NotFound { .. }));

        let err = update_line_item(
            &db,
            "u1",
            item.id,
            LineItemUpdate {
                item_date: Some(date(2025, 4, 2)),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, Error::Validation { .. }));
        Ok(())
    }

    #[tokio::test]
    async fn test_photo_is_stored_and_removed_with_item() -> Result<()> {
        let db = setup_test_db().await?;
        let store = MemoryPhotoStore::default();
        create_test_user(&db, "u1").await?;
        let today = date(2025, 3, 10);
        create_test_income(&db, "u1", 1000.0, date(2025, 3, 1)).await?;

        let mut new = burn(3.0);
        new.pool = Pool::Commit;
        new.category = "Groceries".to_string();
        new.photo = Some(PhotoUpload::new(vec![9, 9], "jpg")?);
        let item = create_line_item(&db, &store, "u1", new, today).await?;

        let key = format!("commit/{}.jpg", item.id);
        assert_eq!(item.photo_path.as_deref(), Some(key.as_str()));
        assert!(store.contains(&key));

        let meal = insert_test_meal(&db, "u1", today, Some(item.id)).await?;
        delete_line_item(&db, &store, "u1", item.id).await?;
        assert!(!store.contains(&key));
        let meal = Meal::find_by_id(meal.id).one(&db).await?.unwrap();
        assert_eq!(meal.line_item_id, None);
        Ok(())
    }

    #[tokio::test]
    async fn test_failed_photo_write_rolls_back_insert() -> Result<()> {
        let db = setup_test_db().await?;
        let store = MemoryPhotoStore::failing_on("burn/");
        create_test_user(&db, "u1").await?;
        create_test_income(&db, "u1", 100.0, date(2025, 3, 1)).await?;

        let mut new = burn(3.0);
        new.photo = Some(PhotoUpload::new(vec![1], "png")?);
        let result = create_line_item(&db, &store, "u1", new, date(2025, 3, 10)).await;
        assert!(matches!(result, Err(Error::Photo { .. })));
        assert!(LineItem::find().all(&db).await?.is_empty());
        Ok(())
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_concurrent_writers_cannot_overshoot() -> Result<()> {
        // A file database, so each writer runs on its own pooled connection
        let path = std::env::temp_dir().join(format!(
            "pool-buddy-admission-{}.sqlite",
            std::process::id()
        ));
        std::fs::remove_file(&path).ok();
        let db = sea_orm::Database::connect(format!("sqlite://{}?mode=rwc", path.display())).await?;
        crate::config::database::create_tables(&db).await?;
        let store = Arc::new(MemoryPhotoStore::default());
        let today = date(2025, 3, 10);

        for round in 0..20 {
            let user_id = format!("u{round}");
            create_test_user(&db, &user_id).await?;
            // burn_pool = 10
            create_test_income(&db, &user_id, 50.0, date(2025, 3, 1)).await?;

            let writers: Vec<_> = (0..2)
                .map(|_| {
                    let db = sea_orm::SqlxSqliteConnector::from_sqlx_sqlite_pool(
                        db.get_sqlite_connection_pool().clone(),
                    );
                    let (store, user_id) = (Arc::clone(&store), user_id.clone());
                    tokio::spawn(async move {
                        create_line_item(&db, store.as_ref(), &user_id, burn(6.0), today).await
                    })
                })
                .collect();

            let mut admitted = 0;
            for writer in writers {
                match writer.await.unwrap() {
                    Ok(_) => admitted += 1,
                    Err(e) => {
                        assert_eq!(e.kind(), ErrorKind::InsufficientPool, "round {round}: {e}");
                    }
                }
            }
            assert_eq!(admitted, 1, "round {round}");

            let avail = available(&db, &user_id, Pool::Burn, today).await?.unwrap();
            assert_eq!(avail.remaining, 4.0, "round {round}");
        }

        db.close().await?;
        std::fs::remove_file(&path).ok();
        Ok(())
    }
}
