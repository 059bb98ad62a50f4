//! Plateau detection.
//!
//! A deliberately coarse two-point check: the first and last weigh-ins of the
//! look-back window are compared, and the number of entries stands in for how
//! long the weight has been flat.

use crate::{core::weight::entries_since, entities::weight_entry, errors::Result};
use chrono::{Days, NaiveDate};
use sea_orm::DatabaseConnection;
use serde::Serialize;

/// Change below which the window counts as a plateau, kg.
const PLATEAU_THRESHOLD_KG: f64 = 0.5;

const REASSURANCE: &str =
    "Plateaus are expected and manageable. You're not failing - your body is adapting.";

/// What to do about a plateau.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PlateauAction {
    /// Four or more weeks flat
    DietBreak,
    /// Three weeks flat
    ActivityIncrease,
    /// Shorter stalls
    Monitor,
}

impl PlateauAction {
    /// Tier for a number of weeks at the same weight.
    #[must_use]
    pub const fn for_weeks(weeks: usize) -> Self {
        match weeks {
            4.. => Self::DietBreak,
            3 => Self::ActivityIncrease,
            _ => Self::Monitor,
        }
    }

    /// Suggested next steps.
    #[must_use]
    pub const fn recommendations(self) -> &'static [&'static str] {
        match self {
            Self::DietBreak => &[
                "Take a 1-week diet break at maintenance calories (2,400-2,500)",
                "Increase daily steps by 2,000",
                "Focus on strength gains in the gym",
                "Check body measurements - you may still be losing fat",
                "Consider if you're at a known sticking point from earlier attempts",
            ],
            Self::ActivityIncrease => &[
                "Increase NEAT (add 2,000 steps daily)",
                "Add one more cardio session this week",
                "Check food tracking accuracy",
                "Take progress photos and measurements",
                "Be patient - plateaus are normal",
            ],
            Self::Monitor => &[
                "Continue current plan",
                "Weight fluctuates normally",
                "Focus on non-scale victories",
                "Check again next week if no change",
            ],
        }
    }
}

/// Outcome of a plateau check.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlateauReport {
    /// Whether the weight has been flat
    pub is_plateau: bool,
    /// Estimated weeks at the same weight; 0 when not a plateau.
    ///
    /// Counts whole weeks of weigh-ins (entries in the window / 7), so a flat
    /// window with fewer than seven entries reports 0 weeks.
    pub weeks_at_same_weight: usize,
    /// Latest weight in the window, if any
    pub current_weight: Option<f64>,
    /// Human readable summary
    pub message: String,
    /// Suggested tier, set only for plateaus
    pub action: Option<PlateauAction>,
    /// Steps for the chosen tier
    pub recommendations: Vec<&'static str>,
    /// Encouragement, set only for plateaus
    pub reassurance: Option<&'static str>,
}

/// Pure plateau assessment over entries sorted oldest first.
#[must_use]
pub fn assess_plateau(entries: &[weight_entry::Model]) -> PlateauReport {
    let (first, last) = match entries {
        [first, .., last] => (first, last),
        _ => {
            return PlateauReport {
                is_plateau: false,
                weeks_at_same_weight: 0,
                current_weight: entries.last().map(|entry| entry.weight_kg),
                message: "Not enough data to determine plateau".to_string(),
                action: None,
                recommendations: Vec::new(),
                reassurance: None,
            };
        }
    };

    let change = (last.weight_kg - first.weight_kg).abs();
    if change >= PLATEAU_THRESHOLD_KG {
        return PlateauReport {
            is_plateau: false,
            weeks_at_same_weight: 0,
            current_weight: Some(last.weight_kg),
            message: "Weight is trending down normally. Keep going!".to_string(),
            action: None,
            recommendations: Vec::new(),
            reassurance: None,
        };
    }

    let weeks = entries.len() / 7;
    let action = PlateauAction::for_weeks(weeks);
    PlateauReport {
        is_plateau: true,
        weeks_at_same_weight: weeks,
        current_weight: Some(last.weight_kg),
        message: format!(
            "You've been at {}kg for {weeks} weeks.",
            last.weight_kg
        ),
        action: Some(action),
        recommendations: action.recommendations().to_vec(),
        reassurance: Some(REASSURANCE),
    }
}

/// Checks the last `weeks_threshold` weeks of weigh-ins for a plateau.
pub async fn check_plateau(
    db: &DatabaseConnection,
    user_id: &str,
    weeks_threshold: u32,
    today: NaiveDate,
) -> Result<PlateauReport> {
    let since = today
        .checked_sub_days(Days::new(u64::from(weeks_threshold) * 7))
        .unwrap_or(NaiveDate::MIN);
    let entries = entries_since(db, user_id, since).await?;
    let report = assess_plateau(&entries);

    if report.is_plateau {
        tracing::info!(
            "Plateau detected for {user_id}: {} entries since {since}",
            entries.len()
        );
    }
    Ok(report)
}
