//! Weight-loss phase plan and phase status.
//!
//! A plan is a fixed sequence: metabolic priming, fat loss, a diet break and a
//! final push to the target date. [`calculate_phases`] only produces the plan;
//! the stored goal changes phase solely through
//! [`transition_phase`](crate::core::weight::transition_phase).

use crate::{
    core::adherence::Targets,
    entities::{Phase, weight_goal},
    errors::{Error, Result},
};
use chrono::{Days, Months, NaiveDate};
use serde::Serialize;
use std::str::FromStr;

/// Fixed parameters of one phase.
#[derive(Debug, Clone, Copy)]
pub struct PhaseProfile {
    /// Display name
    pub name: &'static str,
    /// Description shown in the forward plan
    pub plan_description: &'static str,
    /// Description shown while the phase is active
    pub status_description: &'static str,
    /// Expected change while the phase is active
    pub expected_change: &'static str,
    /// Expected total loss over the phase, in kg
    pub expected_loss_kg: &'static str,
    /// Fixed duration; `None` runs until the target date
    pub duration_days: Option<i64>,
    /// Default daily energy target, kcal
    pub calories: i32,
    /// Protein grams per kg of starting weight
    pub protein_per_kg: f64,
    /// Default daily carbohydrate target, g
    pub carbs: i32,
    /// Default daily fat target, g
    pub fat: i32,
}

const PRIMING: PhaseProfile = PhaseProfile {
    name: "Month 1 - Metabolic Priming",
    plan_description: "Restore metabolic function before dieting",
    status_description: "Restoring metabolism, building sustainable habits",
    expected_change: "-0.5 to -1kg this month",
    expected_loss_kg: "0.5-1",
    duration_days: Some(30),
    calories: 2350,
    protein_per_kg: 1.65,
    carbs: 250,
    fat: 70,
};

const FAT_LOSS: PhaseProfile = PhaseProfile {
    name: "Phase 1 - Fat Loss",
    plan_description: "Sustainable fat loss with muscle preservation",
    status_description: "Active fat loss with muscle preservation",
    expected_change: "-2 to -3kg per month",
    expected_loss_kg: "18-20",
    duration_days: Some(270),
    calories: 2050,
    protein_per_kg: 1.75,
    carbs: 200,
    fat: 65,
};

const DIET_BREAK: PhaseProfile = PhaseProfile {
    name: "Diet Break",
    plan_description: "Restore hormones and take psychological break",
    status_description: "Maintenance phase to restore hormones",
    expected_change: "Maintain current weight",
    expected_loss_kg: "0",
    duration_days: Some(14),
    calories: 2400,
    protein_per_kg: 1.65,
    carbs: 300,
    fat: 70,
};

const FINAL_PUSH: PhaseProfile = PhaseProfile {
    name: "Phase 3 - Final Push",
    plan_description: "Final push to goal weight",
    status_description: "Final phase to reach goal weight",
    expected_change: "-1.5 to -2kg per month",
    expected_loss_kg: "6-8",
    duration_days: None,
    calories: 1950,
    protein_per_kg: 1.80,
    carbs: 180,
    fat: 60,
};

impl Phase {
    /// Fixed parameters of this phase.
    #[must_use]
    pub const fn profile(self) -> &'static PhaseProfile {
        match self {
            Self::Priming => &PRIMING,
            Self::FatLoss => &FAT_LOSS,
            Self::DietBreak => &DIET_BREAK,
            Self::FinalPush => &FINAL_PUSH,
        }
    }

    /// Default targets for a user of `starting_weight` kg.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn default_targets(self, starting_weight: f64) -> Targets {
        let profile = self.profile();
        Targets {
            calories: profile.calories,
            protein: (starting_weight * profile.protein_per_kg) as i32,
            carbs: profile.carbs,
            fat: profile.fat,
        }
    }
}

impl FromStr for Phase {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "priming" => Ok(Self::Priming),
            "fat_loss" => Ok(Self::FatLoss),
            "diet_break" => Ok(Self::DietBreak),
            "final_push" => Ok(Self::FinalPush),
            other => Err(Error::validation(format!(
                "Invalid phase '{other}', expected one of priming, fat_loss, diet_break, final_push"
            ))),
        }
    }
}

/// One step of a forward plan.
#[derive(Debug, Clone, Serialize)]
pub struct PlannedPhase {
    /// Phase identifier
    pub phase: Phase,
    /// Display name
    pub name: &'static str,
    /// First day
    pub start_date: NaiveDate,
    /// Last day
    pub end_date: NaiveDate,
    /// Nominal length in days
    pub duration_days: i64,
    /// Default daily targets
    pub targets: Targets,
    /// Expected loss over the phase, in kg
    pub expected_loss_kg: &'static str,
    /// What the phase is for
    pub description: &'static str,
}

fn add_months(date: NaiveDate, months: u32) -> Result<NaiveDate> {
    date.checked_add_months(Months::new(months))
        .ok_or_else(|| Error::validation(format!("Date {date} plus {months} months is out of range")))
}

fn add_days(date: NaiveDate, days: u64) -> Result<NaiveDate> {
    date.checked_add_days(Days::new(days))
        .ok_or_else(|| Error::validation(format!("Date {date} plus {days} days is out of range")))
}

/// Lays out the four-phase plan starting on `start_date`.
///
/// Priming and fat loss advance by calendar months (1 and 9) while reporting
/// nominal 30 and 270 day durations; the diet break is 14 days; the final push
/// runs to `target_date`. When the first three phases already pass the target
/// date, the final push is reported with zero days.
pub fn calculate_phases(
    starting_weight: f64,
    _goal_weight: f64,
    target_date: NaiveDate,
    start_date: NaiveDate,
) -> Result<Vec<PlannedPhase>> {
    let planned = |phase: Phase, start: NaiveDate, end: NaiveDate, duration_days: i64| {
        let profile = phase.profile();
        PlannedPhase {
            phase,
            name: profile.name,
            start_date: start,
            end_date: end,
            duration_days,
            targets: phase.default_targets(starting_weight),
            expected_loss_kg: profile.expected_loss_kg,
            description: profile.plan_description,
        }
    };

    let priming_start = start_date;
    let fat_loss_start = add_months(priming_start, 1)?;
    let diet_break_start = add_months(fat_loss_start, 9)?;
    let final_push_start = add_days(diet_break_start, 14)?;
    let final_push_days = (target_date - final_push_start).num_days().max(0);

    Ok(vec![
        planned(Phase::Priming, priming_start, fat_loss_start, 30),
        planned(Phase::FatLoss, fat_loss_start, diet_break_start, 270),
        planned(Phase::DietBreak, diet_break_start, final_push_start, 14),
        planned(
            Phase::FinalPush,
            final_push_start,
            target_date.max(final_push_start),
            final_push_days,
        ),
    ])
}

/// Where a user stands within their current phase.
#[derive(Debug, Clone, Serialize)]
pub struct PhaseInfo {
    /// Current phase
    pub phase: Phase,
    /// Display name
    pub phase_name: &'static str,
    /// What the phase is doing
    pub phase_description: &'static str,
    /// Days since the phase started; 0 on the start day
    pub day_in_phase: i64,
    /// Phase length; for the final push, days left until the target date
    pub total_days: i64,
    /// `max(0, total_days - day_in_phase)`
    pub days_remaining: i64,
    /// Expected weight change while in this phase
    pub expected_change: &'static str,
}

/// Phase progress for a goal as of `today`.
#[must_use]
pub fn get_current_phase_info(goal: &weight_goal::Model, today: NaiveDate) -> PhaseInfo {
    let profile = goal.current_phase.profile();
    let day_in_phase = (today - goal.phase_start_date).num_days();
    let total_days = profile
        .duration_days
        .unwrap_or_else(|| (goal.target_date - today).num_days());

    PhaseInfo {
        phase: goal.current_phase,
        phase_name: profile.name,
        phase_description: profile.status_description,
        day_in_phase,
        total_days,
        days_remaining: (total_days - day_in_phase).max(0),
        expected_change: profile.expected_change,
    }
}

/// Biological sex used by the BMR equation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sex {
    /// +5 kcal constant
    Male,
    /// -161 kcal constant
    Female,
}

impl FromStr for Sex {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "male" | "m" => Ok(Self::Male),
            "female" | "f" => Ok(Self::Female),
            other => Err(Error::validation(format!(
                "Invalid sex '{other}', expected male or female"
            ))),
        }
    }
}

/// Activity level multiplier applied to BMR.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ActivityLevel {
    /// x1.2
    #[default]
    Sedentary,
    /// x1.375
    Light,
    /// x1.55
    Moderate,
    /// x1.725
    Active,
    /// x1.9
    VeryActive,
}

impl ActivityLevel {
    /// TDEE multiplier.
    #[must_use]
    pub const fn multiplier(self) -> f64 {
        match self {
            Self::Sedentary => 1.2,
            Self::Light => 1.375,
            Self::Moderate => 1.55,
            Self::Active => 1.725,
            Self::VeryActive => 1.9,
        }
    }
}

impl FromStr for ActivityLevel {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sedentary" => Ok(Self::Sedentary),
            "light" => Ok(Self::Light),
            "moderate" => Ok(Self::Moderate),
            "active" => Ok(Self::Active),
            "very_active" => Ok(Self::VeryActive),
            other => Err(Error::validation(format!(
                "Invalid activity level '{other}', expected one of sedentary, light, moderate, active, very_active"
            ))),
        }
    }
}

/// Resting and total daily energy expenditure, kcal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct EnergyEstimate {
    /// Basal metabolic rate
    pub bmr: i32,
    /// Total daily energy expenditure
    pub tdee: i32,
}

/// Mifflin-St Jeor BMR and activity-scaled TDEE, both truncated.
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub fn estimate_energy(
    weight_kg: f64,
    height_cm: f64,
    age: u32,
    sex: Sex,
    activity: ActivityLevel,
) -> EnergyEstimate {
    let constant = match sex {
        Sex::Male => 5.0,
        Sex::Female => -161.0,
    };
    let bmr = 10.0 * weight_kg + 6.25 * height_cm - 5.0 * f64::from(age) + constant;
    let tdee = bmr * activity.multiplier();

    EnergyEstimate {
        bmr: bmr as i32,
        tdee: tdee as i32,
    }
}
