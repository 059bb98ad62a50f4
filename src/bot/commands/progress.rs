//! Progress Discord commands - the goal dashboard, monthly summaries and
//! daily intake totals.

// Inner module to suppress missing_docs warnings for poise macro-generated code
mod inner {
    #![allow(missing_docs)]

    use crate::{
        bot::{Context, caller, today},
        core::{
            analytics::{
                DailyTotals, MonthlySummary, ProgressDashboard, daily_totals, monthly_summary,
                progress_dashboard,
            },
            cycle::{parse_month, parse_optional_date},
        },
        errors::Result,
    };
    use std::fmt::Write as _;

    fn render_dashboard(dashboard: &ProgressDashboard) -> Result<String> {
        let overview = &dashboard.overview;
        let mut reply = format!(
            "📊 **Progress** - {} phase, day {} ({} day(s) left)\n",
            overview.current_phase, overview.days_elapsed, overview.days_remaining
        );
        writeln!(
            reply,
            "{:.1} kg → {:.1} kg → {:.1} kg: lost {:.1} kg, {:.1} kg to go ({:.1}%)",
            overview.starting_weight,
            overview.current_weight,
            overview.goal_weight,
            overview.weight_lost,
            overview.weight_remaining,
            overview.percentage_complete
        )?;

        let week = &dashboard.weekly_stats;
        writeln!(
            reply,
            "Last 7 days: {} kcal, {}g protein, {} day(s) on track, adherence {}",
            week.avg_daily_calories, week.avg_protein, week.days_on_track, week.adherence_score
        )?;

        let trend = &dashboard.weight_trend;
        writeln!(
            reply,
            "Weight: {:+.2} kg this week, {:+.2} kg this month ({:?})",
            trend.last_7_days, trend.last_30_days, trend.trend
        )?;

        let milestone = &dashboard.next_milestone;
        writeln!(
            reply,
            "🏅 Next: {} kg around {} ({} day(s))",
            milestone.target_weight, milestone.estimated_date, milestone.days_away
        )?;
        Ok(reply)
    }

    fn render_month(summary: &MonthlySummary) -> Result<String> {
        let mut reply = format!(
            "🗓️ **{}** - {} of {} day(s) reviewed\n",
            summary.month_name, summary.days_tracked, summary.days_in_month
        );
        let nutrition = &summary.nutrition;
        writeln!(
            reply,
            "Avg {} kcal, {:.1}g protein, adherence {}, {} day(s) on track",
            nutrition.avg_calories,
            nutrition.avg_protein,
            nutrition.avg_adherence,
            nutrition.days_on_track
        )?;

        let weight = &summary.weight;
        match (weight.start_weight, weight.end_weight) {
            (Some(start), Some(end)) => writeln!(
                reply,
                "Weight {start:.1} → {end:.1} kg ({:+.1} kg over {} weigh-in(s))",
                weight.weight_change, weight.entries_count
            )?,
            _ => reply.push_str("No weigh-ins this month.\n"),
        }
        Ok(reply)
    }

    fn render_totals(totals: &DailyTotals) -> Result<String> {
        let sums = &totals.totals;
        let mut reply = format!(
            "🍽️ **{}** - {} meal(s): {} kcal, P {:.1}g, C {:.1}g, F {:.1}g\n",
            totals.date, totals.meal_count, sums.calories, sums.protein, sums.carbs, sums.fat
        );
        if let (Some(targets), Some(pct)) = (totals.targets, totals.percentages) {
            writeln!(
                reply,
                "Targets: {} kcal ({}%), P {}g ({}%), C {}g ({}%), F {}g ({}%)",
                targets.calories,
                pct.calories,
                targets.protein,
                pct.protein,
                targets.carbs,
                pct.carbs,
                targets.fat,
                pct.fat
            )?;
        }
        Ok(reply)
    }

    /// Shows goal progress, the last week and your next milestone.
    #[poise::command(slash_command, prefix_command)]
    pub async fn dashboard(ctx: Context<'_>) -> Result<()> {
        let user_id = caller(ctx).await?;
        let dashboard = progress_dashboard(&ctx.data().database, &user_id, today()).await?;
        ctx.say(render_dashboard(&dashboard)?).await?;
        Ok(())
    }

    /// Summarises a calendar month of reviews and weigh-ins.
    #[poise::command(slash_command, prefix_command)]
    pub async fn month(
        ctx: Context<'_>,
        #[description = "Month (YYYY-MM), defaults to this month"] month: Option<String>,
    ) -> Result<()> {
        let user_id = caller(ctx).await?;
        let month = match month.as_deref() {
            Some(value) => parse_month(value)?,
            None => today(),
        };
        let summary = monthly_summary(&ctx.data().database, &user_id, month).await?;
        ctx.say(render_month(&summary)?).await?;
        Ok(())
    }

    /// Shows a day's intake against your targets.
    #[poise::command(slash_command, prefix_command)]
    pub async fn totals(
        ctx: Context<'_>,
        #[description = "Date (YYYY-MM-DD), defaults to today"] date: Option<String>,
    ) -> Result<()> {
        let user_id = caller(ctx).await?;
        let day = parse_optional_date(date.as_deref())?.unwrap_or_else(today);
        let totals = daily_totals(&ctx.data().database, &user_id, day).await?;
        ctx.say(render_totals(&totals)?).await?;
        Ok(())
    }

}

// Re-export all commands
pub use inner::*;
