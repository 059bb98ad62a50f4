//! Progress analytics - the goal dashboard, monthly summaries and daily
//! intake totals.
//!
//! Everything here is read-only and derived from stored goals, weigh-ins,
//! reviews and meals.

use crate::{
    core::{
        adherence::{DayTotals, Percentages, Targets},
        meal::list_meals_for_day,
        user::get_user,
        weight::{entries_since, find_goal, get_goal},
    },
    entities::{NutritionReview, Phase, WeightEntry, nutrition_review, weight_entry},
    errors::{Error, Result},
};
use chrono::{Datelike, Days, Months, NaiveDate};
use sea_orm::{QueryOrder, prelude::*};
use serde::Serialize;

/// Weekly loss beyond this counts as on track, gain beyond it as gaining.
const TREND_BAND_KG: f64 = 0.2;
/// Milestones are multiples of this many kg.
const MILESTONE_STEP_KG: i64 = 5;
/// Estimate used when the last month shows no loss.
const MILESTONE_FALLBACK_DAYS: i64 = 90;
/// Reviews scoring at least this count as on track.
const ON_TRACK_SCORE: i32 = 80;

/// Seven-day weight direction shown on the dashboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ProgressTrend {
    /// Lost more than 0.2 kg
    OnTrack,
    /// Gained more than 0.2 kg
    Gaining,
    /// Within 0.2 kg either way
    Maintaining,
}

impl ProgressTrend {
    /// Classifies a seven-day change in kg.
    #[must_use]
    pub fn from_change(change_kg: f64) -> Self {
        if change_kg < -TREND_BAND_KG {
            Self::OnTrack
        } else if change_kg > TREND_BAND_KG {
            Self::Gaining
        } else {
            Self::Maintaining
        }
    }
}

/// Where the goal stands overall.
#[derive(Debug, Clone, Serialize)]
pub struct Overview {
    /// kg at setup
    pub starting_weight: f64,
    /// Latest kg
    pub current_weight: f64,
    /// Target kg
    pub goal_weight: f64,
    /// kg lost so far, one decimal
    pub weight_lost: f64,
    /// kg still to lose, one decimal
    pub weight_remaining: f64,
    /// Share of the planned loss achieved, one decimal
    pub percentage_complete: f64,
    /// Days since the goal was set up
    pub days_elapsed: i64,
    /// Days until the target date, never negative
    pub days_remaining: i64,
    /// Current phase
    pub current_phase: Phase,
}

/// Review averages over the last seven days.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct RecentNutrition {
    /// Mean calories, truncated
    pub avg_daily_calories: i64,
    /// Mean protein, truncated
    pub avg_protein: i64,
    /// Reviews scoring 80 or more
    pub days_on_track: usize,
    /// Mean adherence score, truncated
    pub adherence_score: i64,
}

/// Weight change over the last 7 and 30 days.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TrendSummary {
    /// Change over 7 days, two decimals
    pub last_7_days: f64,
    /// Change over 30 days, two decimals
    pub last_30_days: f64,
    /// Direction of the 7-day change
    pub trend: ProgressTrend,
}

/// Next round-number weight and when it may be reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Milestone {
    /// Next multiple of 5 kg below the current weight
    pub target_weight: i64,
    /// Estimated day of reaching it
    pub estimated_date: NaiveDate,
    /// Days from today to `estimated_date`
    pub days_away: i64,
}

/// Everything the progress dashboard shows.
#[derive(Debug, Clone, Serialize)]
pub struct ProgressDashboard {
    /// Goal progress
    pub overview: Overview,
    /// Last seven days of reviews
    pub weekly_stats: RecentNutrition,
    /// Recent weight movement
    pub weight_trend: TrendSummary,
    /// Next milestone
    pub next_milestone: Milestone,
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// `last - first` over entries sorted oldest first; 0 with fewer than two.
fn weight_change(entries: &[weight_entry::Model]) -> f64 {
    match entries {
        [first, .., last] => last.weight_kg - first.weight_kg,
        _ => 0.0,
    }
}

/// The next multiple of 5 kg strictly below the whole-kg current weight,
/// dated by extrapolating the last 30 days of loss.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
pub fn next_milestone(
    current_weight: f64,
    last_30_days_change: f64,
    today: NaiveDate,
) -> Milestone {
    let whole_kg = current_weight.trunc() as i64;
    let mut target_weight = whole_kg.div_euclid(MILESTONE_STEP_KG) * MILESTONE_STEP_KG;
    if target_weight >= whole_kg {
        target_weight -= MILESTONE_STEP_KG;
    }

    let days_away = if last_30_days_change < 0.0 {
        let kg_per_month = last_30_days_change.abs();
        let months = (current_weight - target_weight as f64) / kg_per_month;
        (months * 30.0) as i64
    } else {
        MILESTONE_FALLBACK_DAYS
    };

    Milestone {
        target_weight,
        estimated_date: today
            .checked_add_days(Days::new(u64::try_from(days_away).unwrap_or(0)))
            .unwrap_or(today),
        days_away,
    }
}

fn days_before(today: NaiveDate, days: u64) -> NaiveDate {
    today.checked_sub_days(Days::new(days)).unwrap_or(NaiveDate::MIN)
}

/// Reviews dated from `from` on, up to `to` when given.
async fn reviews_between(
    db: &DatabaseConnection,
    user_id: &str,
    from: NaiveDate,
    to: Option<NaiveDate>,
) -> Result<Vec<nutrition_review::Model>> {
    let mut query = NutritionReview::find()
        .filter(nutrition_review::Column::UserId.eq(user_id))
        .filter(nutrition_review::Column::ReviewDate.gte(from));
    if let Some(to) = to {
        query = query.filter(nutrition_review::Column::ReviewDate.lte(to));
    }
    query
        .order_by_asc(nutrition_review::Column::ReviewDate)
        .all(db)
        .await
        .map_err(Into::into)
}

#[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
fn recent_nutrition(reviews: &[nutrition_review::Model]) -> RecentNutrition {
    if reviews.is_empty() {
        return RecentNutrition::default();
    }
    let n = reviews.len() as f64;
    RecentNutrition {
        avg_daily_calories: reviews.iter().map(|r| r.total_calories).sum::<i64>()
            / reviews.len() as i64,
        avg_protein: (reviews.iter().map(|r| r.total_protein).sum::<f64>() / n) as i64,
        days_on_track: reviews
            .iter()
            .filter(|r| r.adherence_score >= ON_TRACK_SCORE)
            .count(),
        adherence_score: reviews
            .iter()
            .map(|r| i64::from(r.adherence_score))
            .sum::<i64>()
            / reviews.len() as i64,
    }
}

/// Builds the progress dashboard for a user's goal.
///
/// Fails with `NotFound` when no goal was set up.
pub async fn progress_dashboard(
    db: &DatabaseConnection,
    user_id: &str,
    today: NaiveDate,
) -> Result<ProgressDashboard> {
    let goal = get_goal(db, user_id).await?;

    let weight_lost = goal.starting_weight - goal.current_weight;
    let total_to_lose = goal.starting_weight - goal.goal_weight;
    let percentage_complete = if total_to_lose > 0.0 {
        weight_lost / total_to_lose * 100.0
    } else {
        0.0
    };

    let week_ago = days_before(today, 7);
    let month_ago = days_before(today, 30);
    let reviews = reviews_between(db, user_id, week_ago, None).await?;
    let last_7_days = weight_change(&entries_since(db, user_id, week_ago).await?);
    let last_30_days = weight_change(&entries_since(db, user_id, month_ago).await?);

    Ok(ProgressDashboard {
        overview: Overview {
            starting_weight: goal.starting_weight,
            current_weight: goal.current_weight,
            goal_weight: goal.goal_weight,
            weight_lost: round1(weight_lost),
            weight_remaining: round1(goal.current_weight - goal.goal_weight),
            percentage_complete: round1(percentage_complete),
            days_elapsed: (today - goal.created_at.date_naive()).num_days(),
            days_remaining: (goal.target_date - today).num_days().max(0),
            current_phase: goal.current_phase,
        },
        weekly_stats: recent_nutrition(&reviews),
        weight_trend: TrendSummary {
            last_7_days: round2(last_7_days),
            last_30_days: round2(last_30_days),
            trend: ProgressTrend::from_change(last_7_days),
        },
        next_milestone: next_milestone(goal.current_weight, last_30_days, today),
    })
}

/// Review averages for a month.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct MonthNutrition {
    /// Mean calories, truncated
    pub avg_calories: i64,
    /// Mean protein, one decimal
    pub avg_protein: f64,
    /// Mean adherence score, truncated
    pub avg_adherence: i64,
    /// Reviews scoring 80 or more
    pub days_on_track: usize,
}

/// Weigh-ins of a month.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct MonthWeight {
    /// Number of weigh-ins
    pub entries_count: usize,
    /// Last minus first, one decimal
    pub weight_change: f64,
    /// First weigh-in of the month
    pub start_weight: Option<f64>,
    /// Last weigh-in of the month
    pub end_weight: Option<f64>,
}

/// Nutrition and weight over one calendar month.
#[derive(Debug, Clone, Serialize)]
pub struct MonthlySummary {
    /// `YYYY-MM`
    pub month: String,
    /// e.g. `March 2025`
    pub month_name: String,
    /// Calendar days in the month
    pub days_in_month: i64,
    /// Reviewed days
    pub days_tracked: usize,
    /// Review averages
    pub nutrition: MonthNutrition,
    /// Weigh-ins
    pub weight: MonthWeight,
}

/// Summarises the calendar month containing `month`.
#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_possible_wrap,
    clippy::cast_precision_loss
)]
pub async fn monthly_summary(
    db: &DatabaseConnection,
    user_id: &str,
    month: NaiveDate,
) -> Result<MonthlySummary> {
    get_user(db, user_id).await?;

    let start = month.with_day0(0).unwrap_or(month);
    let end = start
        .checked_add_months(Months::new(1))
        .and_then(|next| next.pred_opt())
        .ok_or_else(|| Error::validation(format!("Month of {start} is out of range")))?;

    let reviews = reviews_between(db, user_id, start, Some(end)).await?;
    let entries = WeightEntry::find()
        .filter(weight_entry::Column::UserId.eq(user_id))
        .filter(weight_entry::Column::EntryDate.between(start, end))
        .order_by_asc(weight_entry::Column::EntryDate)
        .order_by_asc(weight_entry::Column::Id)
        .all(db)
        .await?;

    let days_tracked = reviews.len();
    let nutrition = if days_tracked == 0 {
        MonthNutrition::default()
    } else {
        let days = days_tracked as i64;
        MonthNutrition {
            avg_calories: reviews.iter().map(|r| r.total_calories).sum::<i64>() / days,
            avg_protein: round1(
                reviews.iter().map(|r| r.total_protein).sum::<f64>() / days_tracked as f64,
            ),
            avg_adherence: reviews
                .iter()
                .map(|r| i64::from(r.adherence_score))
                .sum::<i64>()
                / days,
            days_on_track: reviews
                .iter()
                .filter(|r| r.adherence_score >= ON_TRACK_SCORE)
                .count(),
        }
    };

    Ok(MonthlySummary {
        month: start.format("%Y-%m").to_string(),
        month_name: start.format("%B %Y").to_string(),
        days_in_month: (end - start).num_days() + 1,
        days_tracked,
        nutrition,
        weight: MonthWeight {
            entries_count: entries.len(),
            weight_change: round1(weight_change(&entries)),
            start_weight: entries.first().map(|entry| entry.weight_kg),
            end_weight: entries.last().map(|entry| entry.weight_kg),
        },
    })
}

/// Intake for one day, with targets when a goal exists.
#[derive(Debug, Clone, Serialize)]
pub struct DailyTotals {
    /// Day summed
    pub date: NaiveDate,
    /// Summed intake; macros to one decimal
    pub totals: DayTotals,
    /// Goal targets, if a goal exists
    pub targets: Option<Targets>,
    /// Percentages of the targets, if a goal exists
    pub percentages: Option<Percentages>,
    /// Meals logged that day
    pub meal_count: usize,
}

/// Sums the meals of `day` and compares them with the goal's targets.
pub async fn daily_totals(
    db: &DatabaseConnection,
    user_id: &str,
    day: NaiveDate,
) -> Result<DailyTotals> {
    get_user(db, user_id).await?;
    let meals = list_meals_for_day(db, user_id, day).await?;
    let totals = DayTotals::from_meals(&meals);
    let targets = find_goal(db, user_id).await?.as_ref().map(Targets::from);

    Ok(DailyTotals {
        date: day,
        totals: DayTotals {
            calories: totals.calories,
            protein: round1(totals.protein),
            carbs: round1(totals.carbs),
            fat: round1(totals.fat),
        },
        targets,
        percentages: targets.map(|targets| Percentages::of(&totals, &targets)),
        meal_count: meals.len(),
    })
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::float_cmp)]
    use super::*;
    use crate::core::weight::{GoalSetup, log_weight, setup_goal};
    use crate::test_utils::*;
    use chrono::Utc;
    use sea_orm::{ActiveModelTrait, Set};

    async fn insert_review(
        db: &DatabaseConnection,
        user_id: &str,
        review_date: NaiveDate,
        calories: i64,
        protein: f64,
        score: i32,
    ) -> Result<()> {
        nutrition_review::ActiveModel {
            user_id: Set(user_id.to_string()),
            review_date: Set(review_date),
            total_calories: Set(calories),
            total_protein: Set(protein),
            total_carbs: Set(0.0),
            total_fat: Set(0.0),
            calorie_target: Set(2000),
            protein_target: Set(150),
            carbs_target: Set(200),
            fat_target: Set(60),
            adherence_score: Set(score),
            grade: Set("B".to_string()),
            feedback: Set(String::new()),
            created_at: Set(Utc::now()),
            updated_at: Set(Utc::now()),
            ..Default::default()
        }
        .insert(db)
        .await?;
        Ok(())
    }

    #[test]
    fn test_progress_trend_bands() {
        assert_eq!(ProgressTrend::from_change(-0.5), ProgressTrend::OnTrack);
        assert_eq!(ProgressTrend::from_change(0.3), ProgressTrend::Gaining);
        assert_eq!(ProgressTrend::from_change(-0.2), ProgressTrend::Maintaining);
        assert_eq!(ProgressTrend::from_change(0.0), ProgressTrend::Maintaining);
    }

    #[test]
    fn test_next_milestone() {
        let today = date(2025, 3, 10);

        // 83.4 kg losing 2 kg a month: 3.4 kg to 80 takes 1.7 months
        let steady = next_milestone(83.4, -2.0, today);
        assert_eq!(steady.target_weight, 80);
        assert_eq!(steady.days_away, 51);
        assert_eq!(steady.estimated_date, date(2025, 4, 30));

        // Sitting on a multiple of five aims for the one below
        assert_eq!(next_milestone(80.7, -1.0, today).target_weight, 75);

        let stalled = next_milestone(83.4, 0.4, today);
        assert_eq!(stalled.days_away, 90);
        assert_eq!(stalled.estimated_date, date(2025, 6, 8));
    }

    #[tokio::test]
    async fn test_progress_dashboard() -> Result<()> {
        let db = setup_test_db().await?;
        create_test_user(&db, "u1").await?;
        let today = Utc::now().date_naive();
        let day = |back: u64| today.checked_sub_days(Days::new(back)).unwrap();

        let setup = GoalSetup {
            starting_weight: 100.0,
            goal_weight: 80.0,
            height_cm: 180,
            target_date: today.checked_add_days(Days::new(200)).unwrap(),
        };
        setup_goal(&db, "u1", setup, today).await?;

        log_weight(&db, "u1", 97.0, day(25), None).await?;
        log_weight(&db, "u1", 95.0, day(6), None).await?;
        log_weight(&db, "u1", 94.5, day(0), None).await?;

        insert_review(&db, "u1", day(2), 2100, 140.5, 85).await?;
        insert_review(&db, "u1", day(1), 1900, 150.0, 70).await?;
        // Outside the seven-day window
        insert_review(&db, "u1", day(20), 4000, 10.0, 10).await?;

        let dashboard = progress_dashboard(&db, "u1", today).await?;
        let overview = &dashboard.overview;
        assert_eq!(overview.current_weight, 94.5);
        assert_eq!(overview.weight_lost, 5.5);
        assert_eq!(overview.weight_remaining, 14.5);
        assert_eq!(overview.percentage_complete, 27.5);
        assert_eq!(overview.days_elapsed, 0);
        assert_eq!(overview.days_remaining, 200);
        assert_eq!(overview.current_phase, Phase::Priming);

        assert_eq!(
            dashboard.weekly_stats,
            RecentNutrition {
                avg_daily_calories: 2000,
                avg_protein: 145,
                days_on_track: 1,
                adherence_score: 77,
            }
        );

        assert_eq!(dashboard.weight_trend.last_7_days, -0.5);
        assert_eq!(dashboard.weight_trend.last_30_days, -2.5);
        assert_eq!(dashboard.weight_trend.trend, ProgressTrend::OnTrack);

        // 94.5 -> 90 at 2.5 kg a month: 1.8 months
        assert_eq!(dashboard.next_milestone.target_weight, 90);
        assert_eq!(dashboard.next_milestone.days_away, 54);
        Ok(())
    }

    #[tokio::test]
    async fn test_dashboard_requires_goal() -> Result<()> {
        let db = setup_test_db().await?;
        create_test_user(&db, "u1").await?;
        let err = progress_dashboard(&db, "u1", date(2025, 3, 10))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NotFound { .. }));
        Ok(())
    }

    #[tokio::test]
    async fn test_monthly_summary() -> Result<()> {
        let db = setup_test_db().await?;
        create_test_user(&db, "u1").await?;

        insert_review(&db, "u1", date(2025, 2, 1), 2000, 150.0, 90).await?;
        insert_review(&db, "u1", date(2025, 2, 28), 1801, 120.25, 75).await?;
        insert_review(&db, "u1", date(2025, 3, 1), 5000, 0.0, 0).await?;
        log_weight(&db, "u1", 90.0, date(2025, 2, 3), None).await?;
        log_weight(&db, "u1", 88.75, date(2025, 2, 27), None).await?;
        log_weight(&db, "u1", 80.0, date(2025, 3, 2), None).await?;

        let summary = monthly_summary(&db, "u1", date(2025, 2, 14)).await?;
        assert_eq!(summary.month, "2025-02");
        assert_eq!(summary.month_name, "February 2025");
        assert_eq!(summary.days_in_month, 28);
        assert_eq!(summary.days_tracked, 2);
        assert_eq!(
            summary.nutrition,
            MonthNutrition {
                avg_calories: 1900,
                avg_protein: 135.1,
                avg_adherence: 82,
                days_on_track: 1,
            }
        );
        assert_eq!(summary.weight.entries_count, 2);
        assert_eq!(summary.weight.weight_change, -1.3);
        assert_eq!(summary.weight.start_weight, Some(90.0));
        assert_eq!(summary.weight.end_weight, Some(88.75));

        let december = monthly_summary(&db, "u1", date(2024, 12, 1)).await?;
        assert_eq!(december.days_in_month, 31);
        assert_eq!(december.days_tracked, 0);
        assert_eq!(december.weight, MonthWeight::default());
        Ok(())
    }

    #[tokio::test]
    async fn test_daily_totals_with_and_without_goal() -> Result<()> {
        let db = setup_test_db().await?;
        create_test_user(&db, "u1").await?;
        let today = date(2025, 3, 10);
        insert_test_meal_with(&db, "u1", today, 700, 40.25).await?;
        insert_test_meal_with(&db, "u1", today, 480, 30.0).await?;
        insert_test_meal_with(&db, "u1", date(2025, 3, 11), 900, 50.0).await?;

        let bare = daily_totals(&db, "u1", today).await?;
        assert_eq!(bare.meal_count, 2);
        assert_eq!(bare.totals.calories, 1180);
        assert_eq!(bare.totals.protein, 70.3);
        assert!(bare.targets.is_none());
        assert!(bare.percentages.is_none());

        let setup = GoalSetup {
            starting_weight: 100.0,
            goal_weight: 80.0,
            height_cm: 180,
            target_date: date(2026, 3, 1),
        };
        let plan = setup_goal(&db, "u1", setup, today).await?;
        let targets = Targets::from(&plan.goal);

        let with_goal = daily_totals(&db, "u1", today).await?;
        assert_eq!(with_goal.targets, Some(targets));
        let percentages = with_goal.percentages.unwrap();
        assert_eq!(
            percentages.calories,
            1180 * 100 / i64::from(targets.calories)
        );
        Ok(())
    }
}
