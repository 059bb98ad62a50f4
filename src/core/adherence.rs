//! Adherence scoring - how closely a day's intake matches its targets.
//!
//! The score weights calories 40%, protein 40% and macro balance 20%. Macro
//! balance is a constant full-marks term for now.

use crate::entities::{meal, weight_goal};
use serde::Serialize;
use std::fmt;

/// Summed intake for one day.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct DayTotals {
    /// kcal
    pub calories: i64,
    /// grams
    pub protein: f64,
    /// grams
    pub carbs: f64,
    /// grams
    pub fat: f64,
}

impl DayTotals {
    /// Sums the macros of a set of meals.
    #[must_use]
    pub fn from_meals(meals: &[meal::Model]) -> Self {
        meals.iter().fold(Self::default(), |acc, meal| Self {
            calories: acc.calories + i64::from(meal.calories),
            protein: acc.protein + meal.protein,
            carbs: acc.carbs + meal.carbs,
            fat: acc.fat + meal.fat,
        })
    }
}

/// Daily targets in effect for a user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Targets {
    /// kcal
    pub calories: i32,
    /// grams
    pub protein: i32,
    /// grams
    pub carbs: i32,
    /// grams
    pub fat: i32,
}

impl From<&weight_goal::Model> for Targets {
    fn from(goal: &weight_goal::Model) -> Self {
        Self {
            calories: goal.daily_calorie_target,
            protein: goal.daily_protein_target,
            carbs: goal.daily_carbs_target,
            fat: goal.daily_fat_target,
        }
    }
}

/// Letter grade for an adherence score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub enum Grade {
    /// 90 and above
    A,
    /// 80 to 89
    B,
    /// 70 to 79
    C,
    /// 60 to 69
    D,
    /// Below 60
    F,
}

impl Grade {
    /// Single-letter label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::A => "A",
            Self::B => "B",
            Self::C => "C",
            Self::D => "D",
            Self::F => "F",
        }
    }
}

impl fmt::Display for Grade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Maps a score onto a letter grade.
#[must_use]
pub const fn grade(score: i32) -> Grade {
    match score {
        90.. => Grade::A,
        80..=89 => Grade::B,
        70..=79 => Grade::C,
        60..=69 => Grade::D,
        _ => Grade::F,
    }
}

/// `actual` as a percentage of `target`. A non-positive target yields 0.
#[must_use]
pub fn percentage(actual: f64, target: i32) -> f64 {
    if target <= 0 {
        0.0
    } else {
        actual / f64::from(target) * 100.0
    }
}

fn calorie_score(pct: f64) -> f64 {
    if (90.0..=110.0).contains(&pct) {
        100.0
    } else if (80.0..90.0).contains(&pct) || (pct > 110.0 && pct <= 120.0) {
        80.0
    } else {
        (100.0 - (100.0 - pct).abs()).max(0.0)
    }
}

// Below 80% the raw percentage is the score.
fn protein_score(pct: f64) -> f64 {
    if pct >= 95.0 {
        100.0
    } else if pct >= 80.0 {
        80.0
    } else {
        pct
    }
}

/// Scores a day's intake against its targets, 0 to 100.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
pub fn score(totals: &DayTotals, targets: &Targets) -> i32 {
    let calories = calorie_score(percentage(totals.calories as f64, targets.calories));
    let protein = protein_score(percentage(totals.protein, targets.protein));
    let macro_balance = 100.0;

    (calories * 0.4 + protein * 0.4 + macro_balance * 0.2) as i32
}

/// Whole-number percentages of each target reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Percentages {
    /// Calories vs target
    pub calories: i64,
    /// Protein vs target
    pub protein: i64,
    /// Carbohydrates vs target
    pub carbs: i64,
    /// Fat vs target
    pub fat: i64,
}

impl Percentages {
    /// Truncated percentages; a zero target reports 0.
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
    pub fn of(totals: &DayTotals, targets: &Targets) -> Self {
        Self {
            calories: percentage(totals.calories as f64, targets.calories) as i64,
            protein: percentage(totals.protein, targets.protein) as i64,
            carbs: percentage(totals.carbs, targets.carbs) as i64,
            fat: percentage(totals.fat, targets.fat) as i64,
        }
    }
}
