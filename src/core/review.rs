//! Daily nutrition reviews and weekly summaries.
//!
//! A review is derived entirely from the day's meals and the goal's current
//! targets, and is stored once per `(user, date)`: recomputing a day replaces
//! the stored row.

use crate::{
    core::{
        adherence::{DayTotals, Grade, Percentages, Targets, grade, score},
        coach::{FeedbackContext, NutritionCoach, feedback_or_fallback},
        meal::list_meals_for_day,
        phase::get_current_phase_info,
        weight::get_goal,
    },
    entities::{NutritionReview, Phase, nutrition_review},
    errors::{Error, Result},
};
use chrono::{Datelike, Days, NaiveDate};
use sea_orm::{QueryOrder, QuerySelect, Set, TransactionTrait, prelude::*};
use serde::Serialize;

/// Default number of reviews returned by [`list_reviews`].
pub const DEFAULT_REVIEW_LIMIT: u64 = 30;

/// Result of reviewing one day.
#[derive(Debug, Clone, Serialize)]
pub struct DailyReview {
    /// Stored review row
    pub review: nutrition_review::Model,
    /// Day's intake
    pub totals: DayTotals,
    /// Targets in effect
    pub targets: Targets,
    /// Whole-number percentages of each target
    pub percentages: Percentages,
    /// Letter grade
    pub grade: Grade,
    /// Phase the user was in
    pub phase: Phase,
    /// Short actionable notes
    pub recommendations: Vec<String>,
}

/// Recommendation lines for a day's percentages.
#[must_use]
pub fn recommendations(percentages: &Percentages, targets: &Targets) -> Vec<String> {
    let mut notes = Vec::new();

    if percentages.protein >= 95 {
        notes.push("Protein intake is perfect - keep this up!".to_string());
    } else if percentages.protein < 80 {
        notes.push(format!(
            "Try to increase protein to at least {}g",
            targets.protein
        ));
    }

    match percentages.calories {
        90..=110 => notes.push("Calorie intake is right on target!".to_string()),
        ..90 => notes.push("Calories are a bit low - make sure you're eating enough".to_string()),
        121.. => {
            notes.push("Calories are above target - try to reduce portions tomorrow".to_string());
        }
        _ => {}
    }

    if notes.is_empty() {
        notes.push("Overall adherence is excellent".to_string());
    }
    notes
}

/// Scores `review_date` from its meals and stores the review.
///
/// Fails with `NotFound` when the user has no goal or logged no meals that day.
pub async fn review_day(
    db: &DatabaseConnection,
    coach: &dyn NutritionCoach,
    user_id: &str,
    review_date: NaiveDate,
    today: NaiveDate,
) -> Result<DailyReview> {
    let goal = get_goal(db, user_id).await?;
    let meals = list_meals_for_day(db, user_id, review_date).await?;
    if meals.is_empty() {
        return Err(Error::not_found("meals", review_date));
    }

    let totals = DayTotals::from_meals(&meals);
    let targets = Targets::from(&goal);
    let adherence_score = score(&totals, &targets);
    let day_grade = grade(adherence_score);
    let percentages = Percentages::of(&totals, &targets);

    let feedback = feedback_or_fallback(
        coach,
        &FeedbackContext {
            totals,
            targets,
            phase: get_current_phase_info(&goal, today),
            current_weight: goal.current_weight,
            height_cm: goal.height_cm,
            grade: day_grade,
        },
    )
    .await;

    let txn = db.begin().await?;
    let existing = NutritionReview::find()
        .filter(nutrition_review::Column::UserId.eq(user_id))
        .filter(nutrition_review::Column::ReviewDate.eq(review_date))
        .one(&txn)
        .await?;

    let now = chrono::Utc::now();
    let is_new = existing.is_none();
    let mut active: nutrition_review::ActiveModel = match existing {
        Some(model) => model.into(),
        None => nutrition_review::ActiveModel {
            user_id: Set(user_id.to_string()),
            review_date: Set(review_date),
            created_at: Set(now),
            ..Default::default()
        },
    };
    active.total_calories = Set(totals.calories);
    active.total_protein = Set(totals.protein);
    active.total_carbs = Set(totals.carbs);
    active.total_fat = Set(totals.fat);
    active.calorie_target = Set(targets.calories);
    active.protein_target = Set(targets.protein);
    active.carbs_target = Set(targets.carbs);
    active.fat_target = Set(targets.fat);
    active.adherence_score = Set(adherence_score);
    active.grade = Set(day_grade.to_string());
    active.feedback = Set(feedback);
    active.updated_at = Set(now);

    let review = if is_new {
        active.insert(&txn).await?
    } else {
        active.update(&txn).await?
    };
    txn.commit().await?;

    tracing::info!(
        "Reviewed {review_date} for {user_id}: score {adherence_score} ({day_grade})"
    );
    Ok(DailyReview {
        review,
        totals,
        targets,
        percentages,
        grade: day_grade,
        phase: goal.current_phase,
        recommendations: recommendations(&percentages, &targets),
    })
}

/// Stored reviews, newest first.
pub async fn list_reviews(
    db: &DatabaseConnection,
    user_id: &str,
    limit: Option<u64>,
) -> Result<Vec<nutrition_review::Model>> {
    NutritionReview::find()
        .filter(nutrition_review::Column::UserId.eq(user_id))
        .order_by_desc(nutrition_review::Column::ReviewDate)
        .limit(limit.unwrap_or(DEFAULT_REVIEW_LIMIT))
        .all(db)
        .await
        .map_err(Into::into)
}

/// Overall label for a week's average score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WeekTrend {
    /// 90 and above
    Excellent,
    /// 80 to 89
    Consistent,
    /// 70 to 79
    Improving,
    /// Below 70
    NeedsAttention,
}

impl WeekTrend {
    /// Label for an average score.
    #[must_use]
    pub const fn for_score(average: i64) -> Self {
        match average {
            90.. => Self::Excellent,
            80..=89 => Self::Consistent,
            70..=79 => Self::Improving,
            _ => Self::NeedsAttention,
        }
    }
}

/// Aggregates over the reviewed days of a week.
#[derive(Debug, Clone, Serialize)]
pub struct WeekStats {
    /// Mean calories, truncated
    pub avg_calories: i64,
    /// Mean protein, one decimal
    pub avg_protein: f64,
    /// Mean carbohydrates, one decimal
    pub avg_carbs: f64,
    /// Mean fat, one decimal
    pub avg_fat: f64,
    /// Current targets
    pub targets: Targets,
    /// Mean calories as a whole percentage of target
    pub calorie_adherence: i64,
    /// Days at 95% of the protein target or more
    pub protein_days_hit: usize,
    /// Days scoring 80 or more
    pub days_on_track: usize,
    /// Grade of the mean score
    pub grade: Grade,
    /// Label of the mean score
    pub trend: WeekTrend,
    /// One-paragraph recap
    pub summary: String,
}

/// Seven-day window starting `week_start`.
#[derive(Debug, Clone, Serialize)]
pub struct WeeklySummary {
    /// First day
    pub week_start: NaiveDate,
    /// Last day, `week_start + 6`
    pub week_end: NaiveDate,
    /// Number of reviewed days
    pub days_tracked: usize,
    /// `None` when no day was reviewed
    pub stats: Option<WeekStats>,
}

/// Monday of the week containing `date`.
#[must_use]
pub fn monday_of(date: NaiveDate) -> NaiveDate {
    date.checked_sub_days(Days::new(u64::from(date.weekday().num_days_from_monday())))
        .unwrap_or(date)
}

/// Summarises the reviews of the week starting `week_start` (default: the
/// Monday of `today`'s week).
#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_possible_wrap,
    clippy::cast_precision_loss
)]
pub async fn weekly_summary(
    db: &DatabaseConnection,
    user_id: &str,
    week_start: Option<NaiveDate>,
    today: NaiveDate,
) -> Result<WeeklySummary> {
    let week_start = week_start.unwrap_or_else(|| monday_of(today));
    let week_end = week_start
        .checked_add_days(Days::new(6))
        .ok_or_else(|| Error::validation(format!("Week starting {week_start} is out of range")))?;

    let goal = get_goal(db, user_id).await?;
    let reviews = NutritionReview::find()
        .filter(nutrition_review::Column::UserId.eq(user_id))
        .filter(nutrition_review::Column::ReviewDate.between(week_start, week_end))
        .order_by_asc(nutrition_review::Column::ReviewDate)
        .all(db)
        .await?;

    let days = reviews.len();
    if days == 0 {
        return Ok(WeeklySummary {
            week_start,
            week_end,
            days_tracked: 0,
            stats: None,
        });
    }

    let n = days as f64;
    let round1 = |value: f64| (value * 10.0).round() / 10.0;
    let targets = Targets::from(&goal);

    let avg_calories = reviews.iter().map(|r| r.total_calories).sum::<i64>() / days as i64;
    let avg_protein = round1(reviews.iter().map(|r| r.total_protein).sum::<f64>() / n);
    let avg_carbs = round1(reviews.iter().map(|r| r.total_carbs).sum::<f64>() / n);
    let avg_fat = round1(reviews.iter().map(|r| r.total_fat).sum::<f64>() / n);

    let calorie_adherence = if targets.calories > 0 {
        (avg_calories as f64 / f64::from(targets.calories) * 100.0) as i64
    } else {
        0
    };
    let protein_days_hit = reviews
        .iter()
        .filter(|r| r.total_protein >= f64::from(targets.protein) * 0.95)
        .count();
    let days_on_track = reviews.iter().filter(|r| r.adherence_score >= 80).count();

    let avg_score =
        reviews.iter().map(|r| i64::from(r.adherence_score)).sum::<i64>() / days as i64;
    let week_grade = grade(i32::try_from(avg_score).unwrap_or(0));
    let summary = format!(
        "You tracked {days} out of 7 days and maintained {calorie_adherence}% calorie adherence. \
         You hit protein targets {protein_days_hit} out of {days} days."
    );

    Ok(WeeklySummary {
        week_start,
        week_end,
        days_tracked: days,
        stats: Some(WeekStats {
            avg_calories,
            avg_protein,
            avg_carbs,
            avg_fat,
            targets,
            calorie_adherence,
            protein_days_hit,
            days_on_track,
            grade: week_grade,
            trend: WeekTrend::for_score(avg_score),
            summary,
        }),
    })
}
