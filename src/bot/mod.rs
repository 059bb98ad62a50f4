//! Bot layer - Discord-specific interface and command handlers
//!
//! This module provides the Discord interface for pool-buddy: every slash
//! command parses its arguments, calls one core operation and formats the
//! result. Core errors are rendered by [`on_error`].

/// Discord command implementations (finance, nutrition, weight, general)
pub mod commands;
/// Discord interaction handlers (autocomplete, etc.)
pub mod handlers;

use crate::{
    config::AppConfig,
    core::{coach::NutritionCoach, photos::PhotoStore, user::ensure_user},
    errors::{Error, ErrorKind, Result},
};
use chrono::NaiveDate;
use poise::serenity_prelude as serenity;
use sea_orm::DatabaseConnection;
use std::sync::Arc;
use tracing::{error, info};

/// Shared data available to all bot commands.
pub struct BotData {
    /// Database connection for all database operations
    pub database: DatabaseConnection,
    /// Where meal and line item photos are written
    pub photos: Arc<dyn PhotoStore>,
    /// Feedback writer for daily reviews
    pub coach: Arc<dyn NutritionCoach>,
    /// Settings loaded at startup
    pub config: AppConfig,
}

impl BotData {
    /// Creates a new `BotData` instance.
    #[must_use]
    pub fn new(
        database: DatabaseConnection,
        photos: Arc<dyn PhotoStore>,
        coach: Arc<dyn NutritionCoach>,
        config: AppConfig,
    ) -> Self {
        Self {
            database,
            photos,
            coach,
            config,
        }
    }
}

/// Poise context used by every command.
pub type Context<'a> = poise::Context<'a, BotData, Error>;

/// Registers the command author on first contact and returns their user id.
pub async fn caller(ctx: Context<'_>) -> Result<String> {
    let author = ctx.author();
    let user_id = author.id.to_string();
    ensure_user(&ctx.data().database, &user_id, Some(author.name.clone())).await?;
    Ok(user_id)
}

/// The reference date for "current cycle" and "today" queries.
#[must_use]
pub fn today() -> NaiveDate {
    chrono::Local::now().date_naive()
}

/// Renders a failed command as a reply. Caller mistakes are shown as-is;
/// anything else is logged and answered with a generic message.
pub fn error_reply(error: &Error) -> String {
    let payload = error.payload();
    match payload.kind {
        ErrorKind::InsufficientPool => format!(
            "❌ {} (remaining: ${:.2})",
            payload.message,
            payload.remaining.unwrap_or_default()
        ),
        ErrorKind::NotFound | ErrorKind::Validation | ErrorKind::Conflict => {
            format!("❌ {}", payload.message)
        }
        ErrorKind::Internal => "❌ Something went wrong, please try again later.".to_string(),
    }
}

async fn on_error(error: poise::FrameworkError<'_, BotData, Error>) {
    match error {
        poise::FrameworkError::Setup { error, .. } => {
            error!("Failed to start bot: {error}");
        }
        poise::FrameworkError::Command { error, ctx, .. } => {
            if error.kind() == ErrorKind::Internal {
                error!("Error in command `{}`: {error:?}", ctx.command().name);
            } else {
                info!("Command `{}` rejected: {error}", ctx.command().name);
            }
            if let Err(e) = ctx.say(error_reply(&error)).await {
                error!("Failed to send error message: {e}");
            }
        }
        error => {
            if let Err(e) = poise::builtins::on_error(error).await {
                error!("Error while handling error: {e}");
            }
        }
    }
}

/// Builds the poise framework and runs the Discord client until it stops.
pub async fn run_bot(token: String, data: BotData) -> Result<()> {
    let framework = poise::Framework::builder()
        .options(poise::FrameworkOptions {
            commands: vec![
                commands::ping(),
                commands::help(),
                commands::income(),
                commands::delete_income(),
                commands::pools(),
                commands::burn(),
                commands::invest(),
                commands::commit(),
                commands::statement(),
                commands::edit_item(),
                commands::delete_item(),
                commands::burn_settings(),
                commands::meal(),
                commands::delete_meal(),
                commands::review(),
                commands::reviews(),
                commands::week(),
                commands::timing(),
                commands::goal(),
                commands::phase(),
                commands::set_phase(),
                commands::weigh(),
                commands::plateau(),
                commands::trend(),
                commands::energy(),
                commands::dashboard(),
                commands::month(),
                commands::totals(),
                commands::add_note(),
                commands::notes(),
                commands::note_done(),
                commands::edit_note(),
                commands::delete_note(),
            ],
            on_error: |error| Box::pin(on_error(error)),
            ..Default::default()
        })
        .setup(|ctx, ready, framework| {
            Box::pin(async move {
                info!("Logged in as {}", ready.user.name);
                poise::builtins::register_globally(ctx, &framework.options().commands).await?;
                info!("Registered {} commands", framework.options().commands.len());
                Ok(data)
            })
        })
        .build();

    let intents = serenity::GatewayIntents::non_privileged();

    info!("Setting up Serenity client for Poise framework...");
    let mut client = serenity::Client::builder(&token, intents)
        .framework(framework)
        .await?;

    info!("Starting bot client...");
    client.start().await?;
    Ok(())
}
