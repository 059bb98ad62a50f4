//! Autocomplete handlers for Discord slash command parameters.
//!
//! Suggestions come from the fixed vocabularies the core accepts, so a picked
//! suggestion always parses.

use crate::{bot::Context, entities::Pool};

const POOLS: [&str; 3] = ["burn", "invest", "commit"];
const MEAL_TYPES: [&str; 4] = ["breakfast", "lunch", "dinner", "snack"];
const PHASES: [&str; 4] = ["priming", "fat_loss", "diet_break", "final_push"];
const SEXES: [&str; 2] = ["male", "female"];
const ACTIVITY_LEVELS: [&str; 5] = ["sedentary", "light", "moderate", "active", "very_active"];
const NOTE_TYPES: [&str; 2] = ["one-time", "recurring"];
const NOTIFICATION_TYPES: [&str; 2] = ["specific", "relative"];

/// Case-insensitive substring filter, capped at Discord's 25 suggestions.
fn matching(options: &[&str], partial: &str) -> Vec<String> {
    let partial_lower = partial.to_lowercase();
    options
        .iter()
        .filter(|option| option.to_lowercase().contains(&partial_lower))
        .map(|&option| option.to_string())
        .take(25)
        .collect()
}

/// Suggests pool names.
#[allow(clippy::unused_async)]
pub async fn autocomplete_pool(_ctx: Context<'_>, partial: &str) -> Vec<String> {
    matching(&POOLS, partial)
}

/// Suggests the fixed Burn categories.
#[allow(clippy::unused_async)]
pub async fn autocomplete_burn_category(_ctx: Context<'_>, partial: &str) -> Vec<String> {
    matching(Pool::Burn.allowed_categories().unwrap_or_default(), partial)
}

/// Suggests the fixed Invest categories.
#[allow(clippy::unused_async)]
pub async fn autocomplete_invest_category(_ctx: Context<'_>, partial: &str) -> Vec<String> {
    matching(Pool::Invest.allowed_categories().unwrap_or_default(), partial)
}

/// Suggests meal types.
#[allow(clippy::unused_async)]
pub async fn autocomplete_meal_type(_ctx: Context<'_>, partial: &str) -> Vec<String> {
    matching(&MEAL_TYPES, partial)
}

/// Suggests phase names.
#[allow(clippy::unused_async)]
pub async fn autocomplete_phase(_ctx: Context<'_>, partial: &str) -> Vec<String> {
    matching(&PHASES, partial)
}

/// Suggests the sexes the BMR equation knows.
#[allow(clippy::unused_async)]
pub async fn autocomplete_sex(_ctx: Context<'_>, partial: &str) -> Vec<String> {
    matching(&SEXES, partial)
}

/// Suggests activity levels.
#[allow(clippy::unused_async)]
pub async fn autocomplete_activity(_ctx: Context<'_>, partial: &str) -> Vec<String> {
    matching(&ACTIVITY_LEVELS, partial)
}

/// Suggests note types.
#[allow(clippy::unused_async)]
pub async fn autocomplete_note_type(_ctx: Context<'_>, partial: &str) -> Vec<String> {
    matching(&NOTE_TYPES, partial)
}

/// Suggests notification types.
#[allow(clippy::unused_async)]
pub async fn autocomplete_notification_type(_ctx: Context<'_>, partial: &str) -> Vec<String> {
    matching(&NOTIFICATION_TYPES, partial)
}
