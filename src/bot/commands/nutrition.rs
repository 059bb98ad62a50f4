//! Nutrition Discord commands - meals, daily reviews and timing analysis.

// Inner module to suppress missing_docs warnings for poise macro-generated code
mod inner {
    #![allow(missing_docs)]

    use crate::{
        bot::{Context, caller, handlers::autocomplete, today},
        core::{
            cycle::{parse_optional_date, parse_time},
            meal::{NewMeal, create_meal, delete_meal as remove_meal},
            photos::PhotoUpload,
            review::{list_reviews, review_day, weekly_summary},
            timing::{EatingWindow, analyze_meal_timing},
        },
        entities::MealType,
        errors::{Error, Result},
    };
    use poise::serenity_prelude as serenity;
    use std::fmt::Write as _;

    /// Look-back used by `/timing` when none is given.
    const DEFAULT_TIMING_DAYS: u32 = 7;

    /// Logs a meal. Without calories, an attached photo is estimated by the coach.
    #[poise::command(slash_command)]
    #[allow(clippy::too_many_arguments)]
    pub async fn meal(
        ctx: Context<'_>,
        #[description = "breakfast, lunch, dinner or snack"]
        #[autocomplete = "autocomplete::autocomplete_meal_type"]
        meal_type: String,
        #[description = "kcal"] calories: Option<i32>,
        #[description = "Protein, g"] protein: Option<f64>,
        #[description = "Carbohydrates, g"] carbs: Option<f64>,
        #[description = "Fat, g"] fat: Option<f64>,
        #[description = "What you ate"] description: Option<String>,
        #[description = "Date (YYYY-MM-DD), defaults to today"] date: Option<String>,
        #[description = "Time eaten (HH:MM)"] time: Option<String>,
        #[description = "Burn or commitment that paid for it"] item_id: Option<i64>,
        #[description = "Meal photo"] photo: Option<serenity::Attachment>,
    ) -> Result<()> {
        let user_id = caller(ctx).await?;
        let meal_type: MealType = meal_type.parse()?;
        let meal_date = parse_optional_date(date.as_deref())?.unwrap_or_else(today);
        let meal_time = time.as_deref().map(parse_time).transpose()?;
        let data = ctx.data();

        let photo = match photo {
            Some(attachment) => {
                let bytes = attachment.download().await?;
                Some(PhotoUpload::from_filename(bytes, &attachment.filename)?)
            }
            None => None,
        };

        let (calories, protein, carbs, fat, description) = match (calories, &photo) {
            (Some(calories), _) => (
                calories,
                protein.unwrap_or_default(),
                carbs.unwrap_or_default(),
                fat.unwrap_or_default(),
                description,
            ),
            (None, Some(upload)) => match data.coach.describe_image(&upload.bytes).await {
                Ok(estimate) => (
                    estimate.calories,
                    estimate.protein,
                    estimate.carbs,
                    estimate.fat,
                    description.or(Some(estimate.description)),
                ),
                Err(e) => {
                    tracing::warn!("Photo estimate failed for {user_id}: {e}");
                    ctx.say("❌ Could not estimate this photo, please enter the calories and macros.")
                        .await?;
                    return Ok(());
                }
            },
            (None, None) => {
                return Err(Error::validation(
                    "Calories are required unless a photo is attached",
                ));
            }
        };

        let meal = create_meal(
            &data.database,
            &*data.photos,
            &user_id,
            NewMeal {
                meal_type,
                description,
                calories,
                protein,
                fat,
                carbs,
                meal_date,
                meal_time,
                line_item_id: item_id,
                photo,
            },
        )
        .await?;

        let mut reply = format!(
            "🍽️ Logged {:?} on {} (ID {}): {} kcal, P {:.1}g / C {:.1}g / F {:.1}g",
            meal.meal_type,
            meal.meal_date,
            meal.id,
            meal.calories,
            meal.protein,
            meal.carbs,
            meal.fat
        );
        if let Some(item_id) = meal.line_item_id {
            write!(reply, ", paid by item {item_id}")?;
        }
        ctx.say(reply).await?;
        Ok(())
    }

    /// Deletes a meal, its linked spend and their photos.
    #[poise::command(slash_command, prefix_command)]
    pub async fn delete_meal(
        ctx: Context<'_>,
        #[description = "Meal ID"] id: i64,
    ) -> Result<()> {
        let user_id = caller(ctx).await?;
        let data = ctx.data();
        let deleted = remove_meal(&data.database, &*data.photos, &user_id, id).await?;

        let mut reply = format!("🗑️ Deleted meal {id}");
        if let Some(item) = deleted.linked_item {
            write!(reply, " and {} item {} (${:.2})", item.pool, item.id, item.amount)?;
        }
        reply.push('.');
        ctx.say(reply).await?;
        Ok(())
    }

    /// Scores a day's meals against your targets.
    #[poise::command(slash_command, prefix_command)]
    pub async fn review(
        ctx: Context<'_>,
        #[description = "Day to review (YYYY-MM-DD), defaults to today"] date: Option<String>,
    ) -> Result<()> {
        let user_id = caller(ctx).await?;
        let today = today();
        let review_date = parse_optional_date(date.as_deref())?.unwrap_or(today);
        let data = ctx.data();

        let daily = review_day(&data.database, &*data.coach, &user_id, review_date, today).await?;
        let (totals, targets, pct) = (&daily.totals, &daily.targets, &daily.percentages);

        let mut reply = format!(
            "📊 **Review {review_date}** - grade **{}** ({}/100)\n",
            daily.grade, daily.review.adherence_score
        );
        writeln!(
            reply,
            "Calories: {} / {} ({}%)",
            totals.calories, targets.calories, pct.calories
        )?;
        writeln!(
            reply,
            "Protein: {:.1}g / {}g ({}%)",
            totals.protein, targets.protein, pct.protein
        )?;
        writeln!(
            reply,
            "Carbs: {:.1}g / {}g ({}%) | Fat: {:.1}g / {}g ({}%)",
            totals.carbs, targets.carbs, pct.carbs, totals.fat, targets.fat, pct.fat
        )?;
        writeln!(reply, "\n{}", daily.review.feedback)?;
        for line in &daily.recommendations {
            writeln!(reply, "• {line}")?;
        }
        ctx.say(reply).await?;
        Ok(())
    }

    /// Lists your most recent daily reviews.
    #[poise::command(slash_command, prefix_command)]
    pub async fn reviews(
        ctx: Context<'_>,
        #[description = "How many to show"] limit: Option<u64>,
    ) -> Result<()> {
        let user_id = caller(ctx).await?;
        let history = list_reviews(&ctx.data().database, &user_id, limit).await?;
        if history.is_empty() {
            ctx.say("No reviews yet. Use `/review` to score a day.").await?;
            return Ok(());
        }

        let mut reply = String::from("📅 **Recent reviews**\n");
        for review in history {
            writeln!(
                reply,
                "• {} - {} ({}/100), {} kcal",
                review.review_date, review.grade, review.adherence_score, review.total_calories
            )?;
        }
        ctx.say(reply).await?;
        Ok(())
    }

    /// Summarises a week of daily reviews.
    #[poise::command(slash_command, prefix_command)]
    pub async fn week(
        ctx: Context<'_>,
        #[description = "First day (YYYY-MM-DD), defaults to this Monday"] start: Option<String>,
    ) -> Result<()> {
        let user_id = caller(ctx).await?;
        let week_start = parse_optional_date(start.as_deref())?;
        let summary = weekly_summary(&ctx.data().database, &user_id, week_start, today()).await?;

        let Some(stats) = summary.stats else {
            ctx.say(format!(
                "No reviews between {} and {}.",
                summary.week_start, summary.week_end
            ))
            .await?;
            return Ok(());
        };

        let mut reply = format!(
            "🗓️ **Week {} to {}** - grade **{}**, {} day(s) tracked\n",
            summary.week_start, summary.week_end, stats.grade, summary.days_tracked
        );
        writeln!(
            reply,
            "Avg: {} kcal ({}% of target), P {:.1}g, C {:.1}g, F {:.1}g",
            stats.avg_calories,
            stats.calorie_adherence,
            stats.avg_protein,
            stats.avg_carbs,
            stats.avg_fat
        )?;
        writeln!(
            reply,
            "Protein target hit {} day(s), on track {} day(s)",
            stats.protein_days_hit, stats.days_on_track
        )?;
        writeln!(reply, "\n{}", stats.summary)?;
        ctx.say(reply).await?;
        Ok(())
    }

    /// Analyses when you eat against the configured eating window.
    #[poise::command(slash_command, prefix_command)]
    pub async fn timing(
        ctx: Context<'_>,
        #[description = "Days to look back, default 7"] days: Option<u32>,
    ) -> Result<()> {
        let user_id = caller(ctx).await?;
        let data = ctx.data();
        let days = days.unwrap_or(DEFAULT_TIMING_DAYS);
        let window = EatingWindow::from(&data.config.nutrition);

        let report = analyze_meal_timing(&data.database, &user_id, days, window, today()).await?;
        let Some(report) = report else {
            ctx.say(format!("No meal data available for the last {days} days."))
                .await?;
            return Ok(());
        };

        let mut reply = format!(
            "⏰ **Eating window, last {days} days** (target {}:00-{}:00)\n",
            window.start_hour, window.end_hour
        );
        writeln!(
            reply,
            "Avg first meal {} | avg last meal {} | {:.2} h",
            report.average_first_meal.format("%I:%M %p"),
            report.average_last_meal.format("%I:%M %p"),
            report.average_window_hours
        )?;
        writeln!(
            reply,
            "In window {}/{} days ({}%)",
            report.days_within_window, report.total_days, report.compliance_percentage
        )?;
        for stats in &report.distribution {
            writeln!(
                reply,
                "• {:?}: {}x around {}, {} kcal avg",
                stats.meal_type,
                stats.count,
                stats.average_time.format("%I:%M %p"),
                stats.average_calories
            )?;
        }
        for line in &report.recommendations {
            writeln!(reply, "💡 {line}")?;
        }
        ctx.say(reply).await?;
        Ok(())
    }
}

// Re-export all commands
pub use inner::*;
