//! Meal timing analysis against a target eating window.

use crate::{
    config::NutritionConfig,
    core::meal::list_meals_between,
    entities::{MealType, meal},
    errors::Result,
};
use chrono::{Days, NaiveDate, NaiveTime, Timelike};
use sea_orm::DatabaseConnection;
use serde::Serialize;
use std::collections::BTreeMap;

/// Target eating window in whole hours of a 24h clock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct EatingWindow {
    /// Earliest hour a first meal counts as inside the window
    pub start_hour: u32,
    /// Latest hour a last meal counts as inside the window
    pub end_hour: u32,
}

impl Default for EatingWindow {
    fn default() -> Self {
        Self {
            start_hour: 12,
            end_hour: 20,
        }
    }
}

impl From<&NutritionConfig> for EatingWindow {
    fn from(config: &NutritionConfig) -> Self {
        Self {
            start_hour: config.eating_window_start_hour,
            end_hour: config.eating_window_end_hour,
        }
    }
}

/// One day's first and last meal.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DayWindow {
    /// Day analysed
    pub date: NaiveDate,
    /// Earliest meal of the day
    pub first_meal: NaiveTime,
    /// Latest meal of the day
    pub last_meal: NaiveTime,
    /// Hours between first and last meal, 2 decimals
    pub window_hours: f64,
    /// Whether both meals fell inside the target window
    pub within_target: bool,
}

/// Averages for one meal type.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MealTypeStats {
    /// Meal type
    pub meal_type: MealType,
    /// Average time of day the meal is eaten
    pub average_time: NaiveTime,
    /// Average kcal
    pub average_calories: i64,
    /// Meals of this type in the period
    pub count: usize,
}

/// Result of [`analyze`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimingReport {
    /// Look-back requested by the caller
    pub days_analyzed: u32,
    /// Window compared against
    pub window: EatingWindow,
    /// Mean first-meal time
    pub average_first_meal: NaiveTime,
    /// Mean last-meal time
    pub average_last_meal: NaiveTime,
    /// Hours between the two means, 2 decimals
    pub average_window_hours: f64,
    /// Days whose meals all fell in the window
    pub days_within_window: usize,
    /// Days with at least one meal
    pub total_days: usize,
    /// `days_within_window` as a truncated percentage
    pub compliance_percentage: i64,
    /// Per meal type, in breakfast/lunch/snack/dinner order
    pub distribution: Vec<MealTypeStats>,
    /// Per day, oldest first
    pub daily: Vec<DayWindow>,
    /// Advice lines
    pub recommendations: Vec<String>,
}

/// Time of day a meal counts as eaten: its `meal_time`, or the time it was
/// recorded when none was given.
#[must_use]
pub fn effective_time(meal: &meal::Model) -> NaiveTime {
    meal.meal_time.unwrap_or_else(|| meal.created_at.time())
}

fn minutes_of(time: NaiveTime) -> u32 {
    time.hour() * 60 + time.minute()
}

fn time_from_minutes(minutes: u32) -> NaiveTime {
    NaiveTime::from_hms_opt((minutes / 60) % 24, minutes % 60, 0).unwrap_or(NaiveTime::MIN)
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

fn hours_between(first: u32, last: u32) -> f64 {
    round2((f64::from(last) - f64::from(first)) / 60.0)
}

/// Analyses meals against `window`. Returns `None` when there are no meals.
#[must_use]
pub fn analyze(
    meals: &[meal::Model],
    window: EatingWindow,
    days_analyzed: u32,
) -> Option<TimingReport> {
    if meals.is_empty() {
        return None;
    }

    let mut by_day: BTreeMap<NaiveDate, Vec<NaiveTime>> = BTreeMap::new();
    for meal in meals {
        by_day.entry(meal.meal_date).or_default().push(effective_time(meal));
    }

    let start = f64::from(window.start_hour);
    let end = f64::from(window.end_hour);
    let mut daily = Vec::with_capacity(by_day.len());
    let (mut first_total, mut last_total) = (0_u32, 0_u32);

    for (date, times) in by_day {
        let (Some(first), Some(last)) = (times.iter().min(), times.iter().max()) else {
            continue;
        };
        let (first_minutes, last_minutes) = (minutes_of(*first), minutes_of(*last));
        first_total += first_minutes;
        last_total += last_minutes;

        let within_target = f64::from(first_minutes) / 60.0 >= start
            && f64::from(last_minutes) / 60.0 <= end;
        daily.push(DayWindow {
            date,
            first_meal: *first,
            last_meal: *last,
            window_hours: hours_between(first_minutes, last_minutes),
            within_target,
        });
    }

    let total_days = daily.len();
    let day_count = u32::try_from(total_days).unwrap_or(u32::MAX).max(1);
    let avg_first = first_total / day_count;
    let avg_last = last_total / day_count;
    let average_first_meal = time_from_minutes(avg_first);
    let average_last_meal = time_from_minutes(avg_last);
    let average_window_hours = hours_between(avg_first, avg_last);

    let days_within_window = daily.iter().filter(|d| d.within_target).count();
    let compliance_percentage =
        i64::try_from(days_within_window * 100 / total_days.max(1)).unwrap_or(0);

    let distribution = [
        MealType::Breakfast,
        MealType::Lunch,
        MealType::Snack,
        MealType::Dinner,
    ]
    .into_iter()
    .filter_map(|meal_type| {
        let of_type: Vec<&meal::Model> =
            meals.iter().filter(|m| m.meal_type == meal_type).collect();
        let count = of_type.len();
        if count == 0 {
            return None;
        }
        let n = u32::try_from(count).unwrap_or(u32::MAX);
        let minutes: u32 = of_type.iter().map(|m| minutes_of(effective_time(m))).sum();
        let calories: i64 = of_type.iter().map(|m| i64::from(m.calories)).sum();
        Some(MealTypeStats {
            meal_type,
            average_time: time_from_minutes(minutes / n),
            average_calories: calories / i64::from(n),
            count,
        })
    })
    .collect();

    let mut recommendations = Vec::new();
    if compliance_percentage >= 85 {
        recommendations.push(format!(
            "Great job staying within eating window {days_within_window}/{total_days} days!"
        ));
    } else if compliance_percentage >= 70 {
        recommendations.push(format!(
            "Good progress on eating window - {days_within_window}/{total_days} days compliant"
        ));
    } else {
        recommendations.push(format!(
            "Try to improve eating window compliance - currently {days_within_window}/{total_days} days"
        ));
    }

    let last_label = average_last_meal.format("%I:%M %p");
    if average_last_meal.hour() < window.end_hour {
        recommendations.push(format!(
            "Average last meal at {last_label} is perfect (before {}:00 cutoff)",
            window.end_hour
        ));
    } else {
        recommendations.push(format!(
            "Try to finish last meal before {}:00 - currently averaging {last_label}",
            window.end_hour
        ));
    }

    if average_window_hours <= 8.0 {
        recommendations
            .push("Meal timing supports good intermittent fasting compliance".to_string());
    } else {
        recommendations.push(format!(
            "Consider shortening eating window - currently {average_window_hours} hours"
        ));
    }

    Some(TimingReport {
        days_analyzed,
        window,
        average_first_meal,
        average_last_meal,
        average_window_hours,
        days_within_window,
        total_days,
        compliance_percentage,
        distribution,
        daily,
        recommendations,
    })
}

/// Analyses the meals of the last `days` days up to and including `today`.
pub async fn analyze_meal_timing(
    db: &DatabaseConnection,
    user_id: &str,
    days: u32,
    window: EatingWindow,
    today: NaiveDate,
) -> Result<Option<TimingReport>> {
    let start = today
        .checked_sub_days(Days::new(u64::from(days)))
        .unwrap_or(NaiveDate::MIN);
    let meals = list_meals_between(db, user_id, start, today).await?;
    tracing::debug!(
        "Analysing {} meals for {user_id} from {start} to {today}",
        meals.len()
    );
    Ok(analyze(&meals, window, days))
}
