//! User business logic - registration on first contact, lookups and the
//! per-user burn settings.

use crate::{
    entities::{User, user},
    errors::{Error, Result},
};
use sea_orm::{Set, prelude::*};
use serde::Serialize;

/// Daily burn settings stored on a user.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BurnSettings {
    /// Daily burn spending limit
    pub daily_limit_burn: Option<i32>,
    /// Daily burn amount set aside
    pub daily_supply_burn: Option<i32>,
}

impl From<&user::Model> for BurnSettings {
    fn from(user: &user::Model) -> Self {
        Self {
            daily_limit_burn: user.daily_limit_burn,
            daily_supply_burn: user.daily_supply_burn,
        }
    }
}

/// Partial update of the burn settings; `None` leaves a value unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct BurnSettingsUpdate {
    /// New daily limit
    pub daily_limit_burn: Option<i32>,
    /// New daily supply
    pub daily_supply_burn: Option<i32>,
}

/// Returns the user, creating it on first contact.
///
/// An existing user keeps its stored name unless a new non-empty one is given.
pub async fn ensure_user(
    db: &DatabaseConnection,
    user_id: &str,
    name: Option<String>,
) -> Result<user::Model> {
    if user_id.trim().is_empty() {
        return Err(Error::validation("user_id is required"));
    }

    if let Some(existing) = User::find_by_id(user_id.to_string()).one(db).await? {
        return match name.filter(|n| !n.trim().is_empty()) {
            Some(new_name) if existing.name.as_deref() != Some(new_name.as_str()) => {
                let mut active: user::ActiveModel = existing.into();
                active.name = Set(Some(new_name));
                active.update(db).await.map_err(Into::into)
            }
            _ => Ok(existing),
        };
    }

    let model = user::ActiveModel {
        id: Set(user_id.to_string()),
        name: Set(name),
        daily_limit_burn: Set(None),
        daily_supply_burn: Set(None),
        created_at: Set(chrono::Utc::now()),
    };
    let created = model.insert(db).await?;
    tracing::info!("Registered user {user_id}");
    Ok(created)
}

/// Retrieves a user, failing with `NotFound` if it does not exist.
pub async fn get_user<C>(db: &C, user_id: &str) -> Result<user::Model>
where
    C: ConnectionTrait,
{
    User::find_by_id(user_id.to_string())
        .one(db)
        .await?
        .ok_or_else(|| Error::not_found("user", user_id))
}

/// Reads a user's burn settings.
pub async fn get_burn_settings<C>(db: &C, user_id: &str) -> Result<BurnSettings>
where
    C: ConnectionTrait,
{
    get_user(db, user_id).await.map(|user| BurnSettings::from(&user))
}

/// Updates a user's burn settings and returns the values now stored.
///
/// Values must not be negative.
pub async fn update_burn_settings(
    db: &DatabaseConnection,
    user_id: &str,
    update: BurnSettingsUpdate,
) -> Result<BurnSettings> {
    for (field, value) in [
        ("daily_limit_burn", update.daily_limit_burn),
        ("daily_supply_burn", update.daily_supply_burn),
    ] {
        if value.is_some_and(|value| value < 0) {
            return Err(Error::validation(format!("{field} must not be negative")));
        }
    }

    let user = get_user(db, user_id).await?;
    let mut active: user::ActiveModel = user.into();
    if let Some(limit) = update.daily_limit_burn {
        active.daily_limit_burn = Set(Some(limit));
    }
    if let Some(supply) = update.daily_supply_burn {
        active.daily_supply_burn = Set(Some(supply));
    }
    let updated = active.update(db).await?;

    tracing::info!("Updated burn settings for {user_id}");
    Ok(BurnSettings::from(&updated))
}
