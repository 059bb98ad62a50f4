//! Weight Discord commands - goal setup, phases, weigh-ins and progress checks.

// Inner module to suppress missing_docs warnings for poise macro-generated code
mod inner {
    #![allow(missing_docs)]

    use crate::{
        bot::{Context, caller, handlers::autocomplete, today},
        core::{
            cycle::{parse_date, parse_optional_date},
            phase::{ActivityLevel, Sex, estimate_energy},
            plateau::check_plateau,
            weight::{
                GoalSetup, TargetUpdate, log_weight, phase_status, setup_goal, transition_phase,
                weight_trend,
            },
        },
        entities::Phase,
        errors::Result,
    };
    use std::fmt::Write as _;

    /// Look-back used by `/trend` when none is given.
    const DEFAULT_TREND_DAYS: u32 = 30;

    /// Sets up your weight goal and shows the phased plan.
    #[poise::command(slash_command, prefix_command)]
    pub async fn goal(
        ctx: Context<'_>,
        #[description = "Current weight, kg"] starting_weight: f64,
        #[description = "Goal weight, kg"] goal_weight: f64,
        #[description = "Height, cm"] height_cm: i32,
        #[description = "Target date (YYYY-MM-DD)"] target_date: String,
    ) -> Result<()> {
        let user_id = caller(ctx).await?;
        let plan = setup_goal(
            &ctx.data().database,
            &user_id,
            GoalSetup {
                starting_weight,
                goal_weight,
                height_cm,
                target_date: parse_date(&target_date)?,
            },
            today(),
        )
        .await?;

        let mut reply = format!(
            "🎯 Goal set: {:.1} kg → {:.1} kg by {}\n",
            plan.goal.starting_weight, plan.goal.goal_weight, plan.goal.target_date
        );
        for phase in &plan.phases {
            writeln!(
                reply,
                "• **{}** {} to {} ({} days): {} kcal, {}g protein, expect {}",
                phase.name,
                phase.start_date,
                phase.end_date,
                phase.duration_days,
                phase.targets.calories,
                phase.targets.protein,
                phase.expected_loss_kg
            )?;
        }
        ctx.say(reply).await?;
        Ok(())
    }

    /// Shows your current phase, targets and progress.
    #[poise::command(slash_command, prefix_command)]
    pub async fn phase(ctx: Context<'_>) -> Result<()> {
        let user_id = caller(ctx).await?;
        let status = phase_status(&ctx.data().database, &user_id, today()).await?;
        let info = &status.info;

        let mut reply = format!(
            "🏁 **{}** - day {} of {}, {} day(s) left\n{}\nExpected: {}\n",
            info.phase_name,
            info.day_in_phase,
            info.total_days,
            info.days_remaining,
            info.phase_description,
            info.expected_change
        );
        writeln!(
            reply,
            "Targets: {} kcal, P {}g, C {}g, F {}g",
            status.targets.calories,
            status.targets.protein,
            status.targets.carbs,
            status.targets.fat
        )?;
        writeln!(
            reply,
            "Weight: {:.1} kg, lost {:.1} kg, {:.1} kg to go to {:.1} kg",
            status.current_weight, status.weight_lost, status.weight_remaining, status.goal_weight
        )?;
        ctx.say(reply).await?;
        Ok(())
    }

    /// Moves to another phase, optionally replacing your daily targets.
    #[poise::command(slash_command, prefix_command)]
    pub async fn set_phase(
        ctx: Context<'_>,
        #[description = "priming, fat_loss, diet_break or final_push"]
        #[autocomplete = "autocomplete::autocomplete_phase"]
        phase: String,
        #[description = "Daily kcal"] calories: Option<i32>,
        #[description = "Daily protein, g"] protein: Option<i32>,
        #[description = "Daily carbs, g"] carbs: Option<i32>,
        #[description = "Daily fat, g"] fat: Option<i32>,
    ) -> Result<()> {
        let user_id = caller(ctx).await?;
        let phase: Phase = phase.parse()?;
        let goal = transition_phase(
            &ctx.data().database,
            &user_id,
            phase,
            TargetUpdate {
                calories,
                protein,
                carbs,
                fat,
            },
            today(),
        )
        .await?;

        ctx.say(format!(
            "✅ Now in {} since {}. Targets: {} kcal, P {}g, C {}g, F {}g",
            goal.current_phase,
            goal.phase_start_date,
            goal.daily_calorie_target,
            goal.daily_protein_target,
            goal.daily_carbs_target,
            goal.daily_fat_target
        ))
        .await?;
        Ok(())
    }

    /// Logs a weigh-in.
    #[poise::command(slash_command, prefix_command)]
    pub async fn weigh(
        ctx: Context<'_>,
        #[description = "Weight, kg"] kg: f64,
        #[description = "Date (YYYY-MM-DD), defaults to today"] date: Option<String>,
        #[description = "Note"] note: Option<String>,
    ) -> Result<()> {
        let user_id = caller(ctx).await?;
        let entry_date = parse_optional_date(date.as_deref())?.unwrap_or_else(today);
        let entry = log_weight(&ctx.data().database, &user_id, kg, entry_date, note).await?;
        ctx.say(format!(
            "⚖️ Logged {:.1} kg on {} (ID {}).",
            entry.weight_kg, entry.entry_date, entry.id
        ))
        .await?;
        Ok(())
    }

    /// Checks whether your weight has stalled.
    #[poise::command(slash_command, prefix_command)]
    pub async fn plateau(
        ctx: Context<'_>,
        #[description = "Weeks to look back"] weeks: Option<u32>,
    ) -> Result<()> {
        let user_id = caller(ctx).await?;
        let data = ctx.data();
        let weeks = weeks.unwrap_or(data.config.nutrition.plateau_weeks);
        let report = check_plateau(&data.database, &user_id, weeks, today()).await?;

        let mut reply = format!("📉 {}\n", report.message);
        for line in &report.recommendations {
            writeln!(reply, "• {line}")?;
        }
        if let Some(reassurance) = report.reassurance {
            writeln!(reply, "\n{reassurance}")?;
        }
        ctx.say(reply).await?;
        Ok(())
    }

    /// Shows your weight trend.
    #[poise::command(slash_command, prefix_command)]
    pub async fn trend(
        ctx: Context<'_>,
        #[description = "Days to look back, default 30"] days: Option<u32>,
    ) -> Result<()> {
        let user_id = caller(ctx).await?;
        let days = days.unwrap_or(DEFAULT_TREND_DAYS);
        let trend = weight_trend(&ctx.data().database, &user_id, days, today()).await?;

        if trend.entries.is_empty() {
            ctx.say(format!("No weigh-ins in the last {days} days.")).await?;
            return Ok(());
        }
        ctx.say(format!(
            "📈 Last {days} days: {:?}, {:+.2} kg total, {:+.2} kg/week over {} weigh-in(s).",
            trend.trend,
            trend.total_change,
            trend.avg_weekly_change,
            trend.entries.len()
        ))
        .await?;
        Ok(())
    }

    /// Estimates resting and total daily energy expenditure.
    #[poise::command(slash_command, prefix_command)]
    pub async fn energy(
        ctx: Context<'_>,
        #[description = "Weight, kg"] weight_kg: f64,
        #[description = "Height, cm"] height_cm: f64,
        #[description = "Age, years"] age: u32,
        #[description = "male or female"]
        #[autocomplete = "autocomplete::autocomplete_sex"]
        sex: String,
        #[description = "sedentary, light, moderate, active or very_active"]
        #[autocomplete = "autocomplete::autocomplete_activity"]
        activity: Option<String>,
    ) -> Result<()> {
        let sex: Sex = sex.parse()?;
        let activity: ActivityLevel = activity
            .as_deref()
            .map(str::parse)
            .transpose()?
            .unwrap_or_default();
        let estimate = estimate_energy(weight_kg, height_cm, age, sex, activity);
        ctx.say(format!(
            "🔥 BMR {} kcal, TDEE {} kcal ({activity:?}).",
            estimate.bmr, estimate.tdee
        ))
        .await?;
        Ok(())
    }
}

// Re-export all commands
pub use inner::*;
