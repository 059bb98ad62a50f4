//! Weight goal and weigh-in business logic.
//!
//! A user has at most one goal. It is created once by [`setup_goal`], its
//! `current_weight` follows every [`log_weight`], and its phase and targets
//! change only through [`transition_phase`].

use crate::{
    core::{
        adherence::Targets,
        cycle::Cycle,
        phase::{PhaseInfo, PlannedPhase, calculate_phases, get_current_phase_info},
        user::get_user,
    },
    entities::{Phase, WeightEntry, WeightGoal, weight_entry, weight_goal},
    errors::{Error, Result},
};
use chrono::{Days, NaiveDate};
use sea_orm::{QueryOrder, QuerySelect, Set, TransactionTrait, prelude::*};
use serde::Serialize;

/// Default number of entries returned by [`list_weight_entries`].
pub const DEFAULT_ENTRY_LIMIT: u64 = 30;

/// Weight change, in kg, below which the trend is reported as stable.
const TREND_THRESHOLD_KG: f64 = 0.5;

/// Input for [`setup_goal`].
#[derive(Debug, Clone, Copy)]
pub struct GoalSetup {
    /// Weight today, kg
    pub starting_weight: f64,
    /// Target weight, kg
    pub goal_weight: f64,
    /// Height, cm
    pub height_cm: i32,
    /// Date the goal weight should be reached
    pub target_date: NaiveDate,
}

/// A freshly created goal with its forward plan.
#[derive(Debug, Clone, Serialize)]
pub struct GoalPlan {
    /// Stored goal, in the priming phase
    pub goal: weight_goal::Model,
    /// Full four-phase schedule
    pub phases: Vec<PlannedPhase>,
}

/// Replacement targets for a phase transition. `None` keeps the current value.
#[derive(Debug, Clone, Copy, Default)]
pub struct TargetUpdate {
    /// kcal
    pub calories: Option<i32>,
    /// grams
    pub protein: Option<i32>,
    /// grams
    pub carbs: Option<i32>,
    /// grams
    pub fat: Option<i32>,
}

fn validate_weight(value: f64, field: &str) -> Result<()> {
    if !value.is_finite() || value <= 0.0 || value > 700.0 {
        return Err(Error::validation(format!(
            "{field} must be between 0 and 700 kg, got {value}"
        )));
    }
    Ok(())
}

fn opening_targets(phases: &[PlannedPhase]) -> Result<Targets> {
    phases
        .first()
        .map(|phase| phase.targets)
        .ok_or_else(|| Error::validation("Phase plan has no phases"))
}

/// Creates a user's weight goal in the priming phase.
///
/// Fails with `Conflict` if the user already has a goal.
pub async fn setup_goal(
    db: &DatabaseConnection,
    user_id: &str,
    setup: GoalSetup,
    today: NaiveDate,
) -> Result<GoalPlan> {
    validate_weight(setup.starting_weight, "starting_weight")?;
    validate_weight(setup.goal_weight, "goal_weight")?;
    if !(50..=272).contains(&setup.height_cm) {
        return Err(Error::validation(format!(
            "height_cm must be between 50 and 272, got {}",
            setup.height_cm
        )));
    }
    if setup.target_date <= today {
        return Err(Error::validation(format!(
            "Target date {} must be after {today}",
            setup.target_date
        )));
    }

    let phases = calculate_phases(
        setup.starting_weight,
        setup.goal_weight,
        setup.target_date,
        today,
    )?;
    let first = opening_targets(&phases)?;

    let txn = db.begin().await?;
    get_user(&txn, user_id).await?;
    if find_goal(&txn, user_id).await?.is_some() {
        return Err(Error::Conflict {
            message: format!("Weight goal already exists for {user_id}"),
        });
    }

    let now = chrono::Utc::now();
    let model = weight_goal::ActiveModel {
        user_id: Set(user_id.to_string()),
        starting_weight: Set(setup.starting_weight),
        current_weight: Set(setup.starting_weight),
        goal_weight: Set(setup.goal_weight),
        height_cm: Set(setup.height_cm),
        target_date: Set(setup.target_date),
        current_phase: Set(Phase::Priming),
        phase_start_date: Set(today),
        daily_calorie_target: Set(first.calories),
        daily_protein_target: Set(first.protein),
        daily_carbs_target: Set(first.carbs),
        daily_fat_target: Set(first.fat),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    };
    let goal = model.insert(&txn).await?;
    txn.commit().await?;

    tracing::info!(
        "Set up weight goal for {user_id}: {} -> {} kg by {}",
        goal.starting_weight,
        goal.goal_weight,
        goal.target_date
    );
    Ok(GoalPlan { goal, phases })
}

pub(crate) async fn find_goal<C>(db: &C, user_id: &str) -> Result<Option<weight_goal::Model>>
where
    C: ConnectionTrait,
{
    WeightGoal::find()
        .filter(weight_goal::Column::UserId.eq(user_id))
        .one(db)
        .await
        .map_err(Into::into)
}

/// Retrieves a user's goal, failing with `NotFound` if none was set up.
pub async fn get_goal<C>(db: &C, user_id: &str) -> Result<weight_goal::Model>
where
    C: ConnectionTrait,
{
    find_goal(db, user_id)
        .await?
        .ok_or_else(|| Error::not_found("weight goal", user_id))
}

/// Moves a goal to `new_phase`, stamping today as the phase start and
/// replacing any targets provided.
pub async fn transition_phase(
    db: &DatabaseConnection,
    user_id: &str,
    new_phase: Phase,
    targets: TargetUpdate,
    today: NaiveDate,
) -> Result<weight_goal::Model> {
    for value in [targets.calories, targets.protein, targets.carbs, targets.fat]
        .into_iter()
        .flatten()
    {
        if value <= 0 {
            return Err(Error::validation(format!(
                "Targets must be positive, got {value}"
            )));
        }
    }

    let goal = get_goal(db, user_id).await?;
    let previous = goal.current_phase;

    let mut active: weight_goal::ActiveModel = goal.into();
    active.current_phase = Set(new_phase);
    active.phase_start_date = Set(today);
    if let Some(calories) = targets.calories {
        active.daily_calorie_target = Set(calories);
    }
    if let Some(protein) = targets.protein {
        active.daily_protein_target = Set(protein);
    }
    if let Some(carbs) = targets.carbs {
        active.daily_carbs_target = Set(carbs);
    }
    if let Some(fat) = targets.fat {
        active.daily_fat_target = Set(fat);
    }
    active.updated_at = Set(chrono::Utc::now());

    let updated = active.update(db).await?;
    tracing::info!("Moved {user_id} from {previous} to {new_phase} on {today}");
    Ok(updated)
}

/// Phase progress plus targets and weight progress.
#[derive(Debug, Clone, Serialize)]
pub struct PhaseStatus {
    /// Position within the current phase
    pub info: PhaseInfo,
    /// Targets in effect
    pub targets: Targets,
    /// Latest weight, kg
    pub current_weight: f64,
    /// Goal weight, kg
    pub goal_weight: f64,
    /// `starting - current`, one decimal
    pub weight_lost: f64,
    /// `current - goal`, one decimal
    pub weight_remaining: f64,
}

/// Current phase and progress for a user.
pub async fn phase_status(
    db: &DatabaseConnection,
    user_id: &str,
    today: NaiveDate,
) -> Result<PhaseStatus> {
    let goal = get_goal(db, user_id).await?;
    Ok(PhaseStatus {
        info: get_current_phase_info(&goal, today),
        targets: Targets::from(&goal),
        current_weight: goal.current_weight,
        goal_weight: goal.goal_weight,
        weight_lost: round1(goal.starting_weight - goal.current_weight),
        weight_remaining: round1(goal.current_weight - goal.goal_weight),
    })
}

/// Records a weigh-in and, if the user has a goal, makes it the goal's
/// current weight in the same transaction.
pub async fn log_weight(
    db: &DatabaseConnection,
    user_id: &str,
    weight_kg: f64,
    entry_date: NaiveDate,
    note: Option<String>,
) -> Result<weight_entry::Model> {
    validate_weight(weight_kg, "weight_kg")?;

    let txn = db.begin().await?;
    get_user(&txn, user_id).await?;

    let entry = weight_entry::ActiveModel {
        user_id: Set(user_id.to_string()),
        weight_kg: Set(weight_kg),
        entry_date: Set(entry_date),
        note: Set(note.filter(|n| !n.trim().is_empty())),
        created_at: Set(chrono::Utc::now()),
        ..Default::default()
    }
    .insert(&txn)
    .await?;

    if let Some(goal) = find_goal(&txn, user_id).await? {
        let mut active: weight_goal::ActiveModel = goal.into();
        active.current_weight = Set(weight_kg);
        active.updated_at = Set(chrono::Utc::now());
        active.update(&txn).await?;
    }

    txn.commit().await?;
    tracing::info!("Logged {weight_kg} kg for {user_id} on {entry_date}");
    Ok(entry)
}

/// Lists weigh-ins newest first, optionally bounded by a date range.
pub async fn list_weight_entries(
    db: &DatabaseConnection,
    user_id: &str,
    range: Option<Cycle>,
    limit: Option<u64>,
) -> Result<Vec<weight_entry::Model>> {
    let mut query = WeightEntry::find().filter(weight_entry::Column::UserId.eq(user_id));
    if let Some(range) = range {
        query = query.filter(weight_entry::Column::EntryDate.between(range.start, range.end));
    }

    query
        .order_by_desc(weight_entry::Column::EntryDate)
        .order_by_desc(weight_entry::Column::Id)
        .limit(limit.unwrap_or(DEFAULT_ENTRY_LIMIT))
        .all(db)
        .await
        .map_err(Into::into)
}

/// Entries dated on or after `since`, oldest first.
pub(crate) async fn entries_since<C>(
    db: &C,
    user_id: &str,
    since: NaiveDate,
) -> Result<Vec<weight_entry::Model>>
where
    C: ConnectionTrait,
{
    WeightEntry::find()
        .filter(weight_entry::Column::UserId.eq(user_id))
        .filter(weight_entry::Column::EntryDate.gte(since))
        .order_by_asc(weight_entry::Column::EntryDate)
        .order_by_asc(weight_entry::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Direction of weight change over a window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TrendDirection {
    /// Lost more than 0.5 kg
    Decreasing,
    /// Gained more than 0.5 kg
    Increasing,
    /// Within 0.5 kg either way
    Stable,
    /// No entries in the window
    NoData,
}

/// Weight movement over a look-back window.
#[derive(Debug, Clone, Serialize)]
pub struct WeightTrend {
    /// `(date, kg)` oldest first
    pub entries: Vec<(NaiveDate, f64)>,
    /// Overall direction
    pub trend: TrendDirection,
    /// `last - first`, two decimals; negative means loss
    pub total_change: f64,
    /// `total_change` per week of span (at least one week), two decimals
    pub avg_weekly_change: f64,
}

/// Pure trend calculation over entries sorted oldest first.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn compute_trend(entries: &[weight_entry::Model]) -> WeightTrend {
    let (Some(first), Some(last)) = (entries.first(), entries.last()) else {
        return WeightTrend {
            entries: Vec::new(),
            trend: TrendDirection::NoData,
            total_change: 0.0,
            avg_weekly_change: 0.0,
        };
    };

    let total_change = last.weight_kg - first.weight_kg;
    let days_span = (last.entry_date - first.entry_date).num_days();
    let weeks = (days_span as f64 / 7.0).max(1.0);

    let trend = if total_change < -TREND_THRESHOLD_KG {
        TrendDirection::Decreasing
    } else if total_change > TREND_THRESHOLD_KG {
        TrendDirection::Increasing
    } else {
        TrendDirection::Stable
    };

    WeightTrend {
        entries: entries
            .iter()
            .map(|entry| (entry.entry_date, entry.weight_kg))
            .collect(),
        trend,
        total_change: round2(total_change),
        avg_weekly_change: round2(total_change / weeks),
    }
}

/// Weight trend over the last `days` days.
pub async fn weight_trend(
    db: &DatabaseConnection,
    user_id: &str,
    days: u32,
    today: NaiveDate,
) -> Result<WeightTrend> {
    let since = today
        .checked_sub_days(Days::new(u64::from(days)))
        .unwrap_or(NaiveDate::MIN);
    let entries = entries_since(db, user_id, since).await?;
    Ok(compute_trend(&entries))
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
