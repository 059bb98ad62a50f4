//! Meal business logic - logging meals, linking them to spends, and the
//! explicit cascade on delete.
//!
//! A meal may reference one Burn or Commitment that paid for it. The reference
//! is not ownership, yet deleting the meal deletes the linked item too; that
//! cascade is carried out here step by step rather than by a foreign key.

use crate::{
    core::{
        line_item::find_owned,
        notes,
        photos::{self, PhotoStore, PhotoUpload},
        user::get_user,
    },
    entities::{LineItem, Meal, MealType, Pool, line_item, meal},
    errors::{Error, Result},
};
use chrono::{NaiveDate, NaiveTime};
use sea_orm::{QueryOrder, Set, TransactionTrait, Value, prelude::*, sea_query::Expr};
use std::str::FromStr;

/// Folder meal photos are stored under.
const MEAL_PHOTO_FOLDER: &str = "meals";

impl FromStr for MealType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "breakfast" => Ok(Self::Breakfast),
            "lunch" => Ok(Self::Lunch),
            "dinner" => Ok(Self::Dinner),
            "snack" => Ok(Self::Snack),
            other => Err(Error::validation(format!(
                "Invalid meal type '{other}', expected one of breakfast, lunch, dinner, snack"
            ))),
        }
    }
}

/// Input for a new meal.
#[derive(Debug, Clone)]
pub struct NewMeal {
    /// Breakfast, lunch, dinner or snack
    pub meal_type: MealType,
    /// Optional free text
    pub description: Option<String>,
    /// kcal
    pub calories: i32,
    /// grams
    pub protein: f64,
    /// grams
    pub fat: f64,
    /// grams
    pub carbs: f64,
    /// Day the meal counts towards
    pub meal_date: NaiveDate,
    /// Time of day eaten
    pub meal_time: Option<NaiveTime>,
    /// Burn or Commitment that paid for the meal
    pub line_item_id: Option<i64>,
    /// Optional photo, stored for the meal and the linked item alike
    pub photo: Option<PhotoUpload>,
}

fn validate_macros(new: &NewMeal) -> Result<()> {
    if new.calories < 0 {
        return Err(Error::validation(format!(
            "Calories cannot be negative, got {}",
            new.calories
        )));
    }
    for (name, value) in [
        ("protein", new.protein),
        ("fat", new.fat),
        ("carbs", new.carbs),
    ] {
        if !value.is_finite() || value < 0.0 {
            return Err(Error::validation(format!(
                "{name} must be a non-negative number, got {value}"
            )));
        }
    }
    Ok(())
}

/// Logs a meal, optionally linked to a Burn or Commitment.
///
/// When a photo is given it is written for the meal and, if linked, for the
/// item as one fan-out: either every copy is stored and both rows point at
/// theirs, or nothing is persisted.
pub async fn create_meal(
    db: &DatabaseConnection,
    photos: &dyn PhotoStore,
    user_id: &str,
    new: NewMeal,
) -> Result<meal::Model> {
    validate_macros(&new)?;

    let txn = db.begin().await?;
    get_user(&txn, user_id).await?;

    let linked = match new.line_item_id {
        Some(item_id) => {
            let (item, _) = find_owned(&txn, user_id, item_id).await?;
            if item.pool == Pool::Invest {
                return Err(Error::validation(
                    "Meals can only be linked to a burn or a commitment",
                ));
            }
            Some(item)
        }
        None => None,
    };

    let mut created = meal::ActiveModel {
        user_id: Set(user_id.to_string()),
        meal_type: Set(new.meal_type),
        description: Set(new.description.filter(|d| !d.trim().is_empty())),
        calories: Set(new.calories),
        protein: Set(new.protein),
        fat: Set(new.fat),
        carbs: Set(new.carbs),
        meal_date: Set(new.meal_date),
        meal_time: Set(new.meal_time),
        photo_path: Set(None),
        line_item_id: Set(linked.as_ref().map(|item| item.id)),
        created_at: Set(chrono::Utc::now()),
        ..Default::default()
    }
    .insert(&txn)
    .await?;

    let mut written: Vec<String> = Vec::new();
    let mut replaced: Option<String> = None;
    if let Some(upload) = &new.photo {
        let meal_key = upload.key_for(MEAL_PHOTO_FOLDER, created.id);
        // A fresh key, so the item's current photo stays intact until commit
        let item_key = linked
            .as_ref()
            .map(|item| upload.meal_copy_key_for(item.pool.as_str(), item.id, created.id));

        let keys: Vec<String> = item_key
            .clone()
            .into_iter()
            .chain(std::iter::once(meal_key.clone()))
            .collect();
        photos::write_fan_out(photos, &keys, &upload.bytes).await?;
        written = keys;

        let persisted = attach_photos(&txn, created, meal_key, linked.as_ref(), item_key).await;
        match persisted {
            Ok((updated, old_item_key)) => {
                created = updated;
                replaced = old_item_key;
            }
            Err(e) => {
                photos::delete_quietly(photos, &written).await;
                return Err(e);
            }
        }
    }

    if let Err(e) = txn.commit().await {
        photos::delete_quietly(photos, &written).await;
        return Err(e.into());
    }

    if let Some(old) = replaced.filter(|old| !written.contains(old)) {
        photos::delete_quietly(photos, &[old]).await;
    }

    tracing::info!(
        "Logged {:?} meal {} ({} kcal) for {user_id}",
        created.meal_type,
        created.id,
        created.calories
    );
    Ok(created)
}

// Returns the updated meal and the linked item's previous photo key, if any.
async fn attach_photos<C>(
    db: &C,
    created: meal::Model,
    meal_key: String,
    linked: Option<&line_item::Model>,
    item_key: Option<String>,
) -> Result<(meal::Model, Option<String>)>
where
    C: ConnectionTrait,
{
    let mut active: meal::ActiveModel = created.into();
    active.photo_path = Set(Some(meal_key));
    let updated = active.update(db).await?;

    let mut previous = None;
    if let (Some(item), Some(key)) = (linked, item_key) {
        previous.clone_from(&item.photo_path);
        let mut active: line_item::ActiveModel = item.clone().into();
        active.photo_path = Set(Some(key));
        active.update(db).await?;
    }
    Ok((updated, previous))
}

/// Retrieves a meal owned by `user_id`.
pub async fn get_meal<C>(db: &C, user_id: &str, meal_id: i64) -> Result<meal::Model>
where
    C: ConnectionTrait,
{
    Meal::find_by_id(meal_id)
        .filter(meal::Column::UserId.eq(user_id))
        .one(db)
        .await?
        .ok_or_else(|| Error::not_found("meal", meal_id))
}

/// What [`delete_meal`] removed.
#[derive(Debug, Clone)]
pub struct DeletedMeal {
    /// The meal row
    pub meal: meal::Model,
    /// The linked Burn or Commitment, if it still existed
    pub linked_item: Option<line_item::Model>,
}

/// Deletes a meal, its linked Burn or Commitment, and both photos.
///
/// Rows go in one transaction; photos are removed after commit and a failed
/// photo removal is only logged.
pub async fn delete_meal(
    db: &DatabaseConnection,
    photos: &dyn PhotoStore,
    user_id: &str,
    meal_id: i64,
) -> Result<DeletedMeal> {
    let txn = db.begin().await?;
    let meal = get_meal(&txn, user_id, meal_id).await?;

    let linked_item = match meal.line_item_id {
        Some(item_id) => LineItem::find_by_id(item_id).one(&txn).await?,
        None => None,
    };

    if let Some(item) = &linked_item {
        Meal::update_many()
            .col_expr(meal::Column::LineItemId, Expr::value(Value::BigInt(None)))
            .filter(meal::Column::LineItemId.eq(item.id))
            .filter(meal::Column::Id.ne(meal.id))
            .exec(&txn)
            .await?;
        notes::unlink_line_items(&txn, &[item.id]).await?;
        LineItem::delete_by_id(item.id).exec(&txn).await?;
    }
    Meal::delete_by_id(meal.id).exec(&txn).await?;
    txn.commit().await?;

    let keys: Vec<String> = meal
        .photo_path
        .iter()
        .chain(linked_item.iter().filter_map(|item| item.photo_path.as_ref()))
        .cloned()
        .collect();
    photos::delete_quietly(photos, &keys).await;

    tracing::info!(
        "Deleted meal {meal_id} for {user_id}{}",
        linked_item
            .as_ref()
            .map(|item| format!(" and linked {} item {}", item.pool, item.id))
            .unwrap_or_default()
    );
    Ok(DeletedMeal { meal, linked_item })
}

/// Meals of one day, in the order they were eaten.
///
/// Meals without a time of day sort after timed ones, by creation time.
pub async fn list_meals_for_day(
    db: &DatabaseConnection,
    user_id: &str,
    day: NaiveDate,
) -> Result<Vec<meal::Model>> {
    list_meals_between(db, user_id, day, day).await
}

/// Meals dated from `start` to `end` inclusive, oldest day first.
pub async fn list_meals_between(
    db: &DatabaseConnection,
    user_id: &str,
    start: NaiveDate,
    end: NaiveDate,
) -> Result<Vec<meal::Model>> {
    let mut meals = Meal::find()
        .filter(meal::Column::UserId.eq(user_id))
        .filter(meal::Column::MealDate.between(start, end))
        .order_by_asc(meal::Column::MealDate)
        .order_by_asc(meal::Column::CreatedAt)
        .all(db)
        .await?;

    meals.sort_by(|a, b| {
        a.meal_date
            .cmp(&b.meal_date)
            .then_with(|| match (a.meal_time, b.meal_time) {
                (Some(x), Some(y)) => x.cmp(&y),
                (Some(_), None) => std::cmp::Ordering::Less,
                (None, Some(_)) => std::cmp::Ordering::Greater,
                (None, None) => std::cmp::Ordering::Equal,
            })
            .then_with(|| a.created_at.cmp(&b.created_at))
    });
    Ok(meals)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::core::line_item::{NewLineItem, create_line_item};
    use crate::test_utils::*;

    fn lunch(line_item_id: Option<i64>, photo: Option<PhotoUpload>) -> NewMeal {
        NewMeal {
            meal_type: MealType::Lunch,
            description: Some("chicken rice".to_string()),
            calories: 650,
            protein: 35.0,
            fat: 20.0,
            carbs: 80.0,
            meal_date: date(2025, 3, 10),
            meal_time: NaiveTime::from_hms_opt(12, 30, 0),
            line_item_id,
            photo,
        }
    }

    async fn burn_item(
        db: &DatabaseConnection,
        store: &MemoryPhotoStore,
        photo: Option<PhotoUpload>,
    ) -> Result<line_item::Model> {
        create_line_item(
            db,
            store,
            "u1",
            NewLineItem {
                pool: Pool::Burn,
                category: "Health".to_string(),
                amount: 12.5,
                description: None,
                item_date: None,
                is_done: true,
                is_recurring: false,
                photo,
            },
            date(2025, 3, 10),
        )
        .await
    }

    #[test]
    fn test_parse_meal_type() {
        assert_eq!("Dinner".parse::<MealType>().unwrap(), MealType::Dinner);
        assert!("brunch".parse::<MealType>().is_err());
    }

    #[tokio::test]
    async fn test_create_meal_validation() -> Result<()> {
        let db = setup_test_db().await?;
        let store = MemoryPhotoStore::default();
        create_test_user(&db, "u1").await?;

        let mut bad = lunch(None, None);
        bad.protein = -1.0;
        assert!(matches!(
            create_meal(&db, &store, "u1", bad).await,
            Err(Error::Validation { .. })
        ));

        let missing = create_meal(&db, &store, "u1", lunch(Some(404), None)).await;
        assert!(matches!(missing, Err(Error::NotFound { .. })));
        Ok(())
    }

    #[tokio::test]
    async fn test_photo_fans_out_to_meal_and_linked_item() -> Result<()> {
        let db = setup_test_db().await?;
        let store = MemoryPhotoStore::default();
        create_test_user(&db, "u1").await?;
        create_test_income(&db, "u1", 1000.0, date(2025, 3, 1)).await?;
        let item = burn_item(&db, &store, None).await?;

        let photo = PhotoUpload::new(vec![1, 2, 3], "jpg")?;
        let meal = create_meal(&db, &store, "u1", lunch(Some(item.id), Some(photo))).await?;

        let meal_key = format!("meals/{}.jpg", meal.id);
        let item_key = format!("burn/{}-meal{}.jpg", item.id, meal.id);
        assert_eq!(meal.photo_path.as_deref(), Some(meal_key.as_str()));
        assert_eq!(meal.line_item_id, Some(item.id));
        assert!(store.contains(&meal_key));
        assert!(store.contains(&item_key));

        let item = LineItem::find_by_id(item.id).one(&db).await?.unwrap();
        assert_eq!(item.photo_path.as_deref(), Some(item_key.as_str()));
        Ok(())
    }

    #[tokio::test]
    async fn test_failed_fan_out_persists_nothing() -> Result<()> {
        let db = setup_test_db().await?;
        let store = MemoryPhotoStore::failing_on("burn/");
        create_test_user(&db, "u1").await?;
        create_test_income(&db, "u1", 1000.0, date(2025, 3, 1)).await?;
        let item = burn_item(&db, &MemoryPhotoStore::default(), None).await?;

        let photo = PhotoUpload::new(vec![1, 2, 3], "jpg")?;
        let result = create_meal(&db, &store, "u1", lunch(Some(item.id), Some(photo))).await;
        assert!(matches!(result, Err(Error::Photo { .. })));

        assert!(Meal::find().all(&db).await?.is_empty());
        assert!(store.is_empty());
        let item = LineItem::find_by_id(item.id).one(&db).await?.unwrap();
        assert_eq!(item.photo_path, None);
        Ok(())
    }

    #[tokio::test]
    async fn test_failed_meal_photo_keeps_item_photo() -> Result<()> {
        let db = setup_test_db().await?;
        let store = MemoryPhotoStore::failing_on("meals/");
        create_test_user(&db, "u1").await?;
        create_test_income(&db, "u1", 1000.0, date(2025, 3, 1)).await?;
        let receipt = PhotoUpload::new(vec![9, 9], "jpg")?;
        let item = burn_item(&db, &store, Some(receipt)).await?;
        let receipt_key = format!("burn/{}.jpg", item.id);
        assert_eq!(item.photo_path.as_deref(), Some(receipt_key.as_str()));

        // The item copy is written first, then the meal write fails
        let photo = PhotoUpload::new(vec![1, 2, 3], "jpg")?;
        let result = create_meal(&db, &store, "u1", lunch(Some(item.id), Some(photo))).await;
        assert!(matches!(result, Err(Error::Photo { .. })));

        assert!(Meal::find().all(&db).await?.is_empty());
        assert_eq!(store.get(&receipt_key), Some(vec![9, 9]));
        let item = LineItem::find_by_id(item.id).one(&db).await?.unwrap();
        assert_eq!(item.photo_path.as_deref(), Some(receipt_key.as_str()));
        Ok(())
    }

    #[tokio::test]
    async fn test_meal_photo_replaces_item_photo_after_commit() -> Result<()> {
        let db = setup_test_db().await?;
        let store = MemoryPhotoStore::default();
        create_test_user(&db, "u1").await?;
        create_test_income(&db, "u1", 1000.0, date(2025, 3, 1)).await?;
        let receipt = PhotoUpload::new(vec![9, 9], "jpg")?;
        let item = burn_item(&db, &store, Some(receipt)).await?;
        let receipt_key = format!("burn/{}.jpg", item.id);

        let photo = PhotoUpload::new(vec![1, 2, 3], "jpg")?;
        let meal = create_meal(&db, &store, "u1", lunch(Some(item.id), Some(photo))).await?;

        let copy_key = format!("burn/{}-meal{}.jpg", item.id, meal.id);
        assert!(!store.contains(&receipt_key));
        assert_eq!(store.get(&copy_key), Some(vec![1, 2, 3]));
        let item = LineItem::find_by_id(item.id).one(&db).await?.unwrap();
        assert_eq!(item.photo_path.as_deref(), Some(copy_key.as_str()));
        Ok(())
    }

    #[tokio::test]
    async fn test_invest_items_cannot_be_linked() -> Result<()> {
        let db = setup_test_db().await?;
        let store = MemoryPhotoStore::default();
        create_test_user(&db, "u1").await?;
        let income = create_test_income(&db, "u1", 1000.0, date(2025, 3, 1)).await?;
        let invest = insert_test_item(&db, income.id, Pool::Invest, 10.0, date(2025, 3, 2)).await?;

        let result = create_meal(&db, &store, "u1", lunch(Some(invest.id), None)).await;
        assert!(matches!(result, Err(Error::Validation { .. })));
        Ok(())
    }

    #[tokio::test]
    async fn test_delete_meal_cascades_to_linked_item() -> Result<()> {
        let db = setup_test_db().await?;
        let store = MemoryPhotoStore::default();
        create_test_user(&db, "u1").await?;
        create_test_income(&db, "u1", 1000.0, date(2025, 3, 1)).await?;
        let item = burn_item(&db, &store, None).await?;

        let photo = PhotoUpload::new(vec![7], "png")?;
        let meal = create_meal(&db, &store, "u1", lunch(Some(item.id), Some(photo))).await?;
        let sibling = create_meal(&db, &store, "u1", lunch(Some(item.id), None)).await?;

        let deleted = delete_meal(&db, &store, "u1", meal.id).await?;
        assert_eq!(deleted.linked_item.map(|i| i.id), Some(item.id));
        assert!(Meal::find_by_id(meal.id).one(&db).await?.is_none());
        assert!(LineItem::find_by_id(item.id).one(&db).await?.is_none());
        assert!(store.is_empty());

        let sibling = Meal::find_by_id(sibling.id).one(&db).await?.unwrap();
        assert_eq!(sibling.line_item_id, None);

        let err = delete_meal(&db, &store, "u1", meal.id).await.unwrap_err();
        assert!(matches!(err, Error::NotFound { entity: "meal", .. }));
        Ok(())
    }

    #[tokio::test]
    async fn test_meals_for_day_ordered_by_time() -> Result<()> {
        let db = setup_test_db().await?;
        let store = MemoryPhotoStore::default();
        create_test_user(&db, "u1").await?;

        let mut dinner = lunch(None, None);
        dinner.meal_type = MealType::Dinner;
        dinner.meal_time = NaiveTime::from_hms_opt(19, 0, 0);
        let mut untimed = lunch(None, None);
        untimed.meal_type = MealType::Snack;
        untimed.meal_time = None;

        create_meal(&db, &store, "u1", dinner).await?;
        create_meal(&db, &store, "u1", untimed).await?;
        create_meal(&db, &store, "u1", lunch(None, None)).await?;

        let meals = list_meals_for_day(&db, "u1", date(2025, 3, 10)).await?;
        let kinds: Vec<MealType> = meals.iter().map(|m| m.meal_type).collect();
        assert_eq!(
            kinds,
            vec![MealType::Lunch, MealType::Dinner, MealType::Snack]
        );
        assert!(list_meals_for_day(&db, "u1", date(2025, 3, 11)).await?.is_empty());
        Ok(())
    }
}
