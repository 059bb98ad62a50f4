//! Nutrition coach collaborator.
//!
//! Image estimation and feedback text come from an injected [`NutritionCoach`].
//! Scores and grades never depend on it: when it fails, the review falls back
//! to [`FALLBACK_FEEDBACK`].

use crate::{
    core::{
        adherence::{DayTotals, Grade, Targets},
        phase::PhaseInfo,
    },
    errors::{Error, Result},
};
use async_trait::async_trait;
use serde::Serialize;
use std::fmt::Write as _;

/// Feedback used whenever the coach cannot produce any.
pub const FALLBACK_FEEDBACK: &str =
    "Great effort today! Keep tracking your meals and staying consistent with your targets.";

/// Macros estimated from a meal photo.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NutritionEstimate {
    /// Short description of what was recognised
    pub description: String,
    /// kcal
    pub calories: i32,
    /// grams
    pub protein: f64,
    /// grams
    pub fat: f64,
    /// grams
    pub carbs: f64,
}

/// Everything a coach may look at when writing daily feedback.
#[derive(Debug, Clone)]
pub struct FeedbackContext {
    /// Day's intake
    pub totals: DayTotals,
    /// Targets in effect
    pub targets: Targets,
    /// Current phase progress
    pub phase: PhaseInfo,
    /// Latest weight, kg
    pub current_weight: f64,
    /// Height, cm
    pub height_cm: i32,
    /// Grade the day earned
    pub grade: Grade,
}

/// Source of meal estimates and feedback prose.
#[async_trait]
pub trait NutritionCoach: Send + Sync {
    /// Estimates the macros of a meal photo.
    async fn describe_image(&self, bytes: &[u8]) -> Result<NutritionEstimate>;

    /// Writes a short review of a day's intake.
    async fn generate_feedback(&self, context: &FeedbackContext) -> Result<String>;
}

/// Feedback from the coach, or the fixed fallback when it fails.
pub async fn feedback_or_fallback(
    coach: &dyn NutritionCoach,
    context: &FeedbackContext,
) -> String {
    match coach.generate_feedback(context).await {
        Ok(text) if !text.trim().is_empty() => text.trim().to_string(),
        Ok(_) => FALLBACK_FEEDBACK.to_string(),
        Err(e) => {
            tracing::warn!("Nutrition coach failed, using fallback feedback: {e}");
            FALLBACK_FEEDBACK.to_string()
        }
    }
}

/// Deterministic coach built from fixed rules. It cannot read images.
#[derive(Debug, Clone, Copy, Default)]
pub struct RuleBasedCoach;

#[async_trait]
impl NutritionCoach for RuleBasedCoach {
    async fn describe_image(&self, _bytes: &[u8]) -> Result<NutritionEstimate> {
        Err(Error::Coach {
            message: "Photo estimation is not available; enter the macros manually".to_string(),
        })
    }

    #[allow(clippy::cast_precision_loss)]
    async fn generate_feedback(&self, context: &FeedbackContext) -> Result<String> {
        let totals = &context.totals;
        let targets = &context.targets;
        let mut parts: Vec<String> = Vec::new();

        let calorie_variance = totals.calories - i64::from(targets.calories);
        if calorie_variance.abs() <= 50 {
            parts.push("Excellent calorie control!".to_string());
        } else if calorie_variance > 0 {
            parts.push(format!("You're {calorie_variance} kcal over target."));
        } else {
            parts.push(format!("You're {} kcal under target.", -calorie_variance));
        }

        let protein_variance = totals.protein - f64::from(targets.protein);
        if protein_variance.abs() <= 10.0 {
            parts.push("Protein intake is spot on!".to_string());
        } else if protein_variance < -20.0 {
            parts.push(format!(
                "Increase protein by {:.0}g tomorrow.",
                protein_variance.abs()
            ));
        } else if protein_variance > 0.0 {
            parts.push("Great protein intake!".to_string());
        }

        if totals.calories > 0 {
            let carb_percent = totals.carbs * 4.0 / totals.calories as f64 * 100.0;
            if carb_percent > 50.0 {
                parts.push("Consider reducing carbs and increasing protein/fat.".to_string());
            }
        }

        parts.push(
            match context.grade {
                Grade::A | Grade::B => "Keep up the great work!",
                Grade::C => "You're close to target, small adjustments will help!",
                Grade::D | Grade::F => "Let's refocus tomorrow and hit those targets!",
            }
            .to_string(),
        );

        let mut feedback = parts.join(" ");
        if context.phase.days_remaining > 0 {
            write!(
                feedback,
                " {} days left in {}.",
                context.phase.days_remaining, context.phase.phase_name
            )?;
        }
        Ok(feedback)
    }
}
