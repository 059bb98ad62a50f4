//! General Discord commands - ping and help.
//! These commands don't touch the database.

// Inner module to suppress missing_docs warnings for poise macro-generated code
mod inner {
    #![allow(missing_docs)]

    use crate::{bot::Context, errors::Result};

    /// Responds with "Pong!" to test bot connectivity.
    #[poise::command(slash_command, prefix_command)]
    pub async fn ping(ctx: Context<'_>) -> Result<()> {
        ctx.say("Pong!").await?;
        Ok(())
    }

    /// Displays help information about available commands.
    #[poise::command(slash_command, prefix_command)]
    pub async fn help(ctx: Context<'_>) -> Result<()> {
        let help_text = "**PoolBuddy Help**\n\
        Income is split 20/30/50 into Burn, Invest and Commitment pools for each \
        25th-to-24th salary cycle. Dates use `YYYY-MM-DD`.\n\n\
        **Finance**\n\
        • `/income <amount> [date] [source]` - Records income and shows its pool split.\n\
        • `/delete_income <id>` - Deletes an income with its line items.\n\
        • `/pools` - Shows this cycle's ceilings and what is left of each pool.\n\
        • `/burn`, `/invest`, `/commit` - Records a spend against a pool.\n\
        • `/statement <pool> [start] [end]` - Lists a pool's spends for a cycle or range.\n\
        • `/edit_item <id> ...` - Edits a line item.\n\
        • `/delete_item <id>` - Deletes a line item.\n\
        • `/burn_settings [daily_limit] [daily_supply]` - Shows or sets daily burn settings.\n\n\
        **Nutrition**\n\
        • `/meal <type> ...` - Logs a meal, optionally linked to a burn or commitment.\n\
        • `/delete_meal <id>` - Deletes a meal and its linked spend.\n\
        • `/review [date]` - Scores a day against your targets.\n\
        • `/week [start]` - Summarises a week of reviews.\n\
        • `/timing [days]` - Analyses your eating window.\n\n\
        **Weight**\n\
        • `/goal <start> <goal> <height> <target_date>` - Sets up your phased plan.\n\
        • `/phase` - Shows your current phase and progress.\n\
        • `/set_phase <phase> ...` - Moves to another phase.\n\
        • `/weigh <kg> [date] [note]` - Logs a weigh-in.\n\
        • `/plateau [weeks]`, `/trend [days]`, `/energy ...` - Progress checks.\n\n\
        **Progress**\n\
        • `/dashboard` - Goal progress, the last week and your next milestone.\n\
        • `/month [YYYY-MM]` - Summarises a month of reviews and weigh-ins.\n\
        • `/totals [date]` - A day's intake against your targets.\n\n\
        **Notes**\n\
        • `/add_note <title> <content> ...` - Adds a one-time or recurring note.\n\
        • `/notes [category] [start end]` - Lists pending notes, a category or a range.\n\
        • `/note_done <id> [done]` - Checks a note off or back on.\n\
        • `/edit_note <id> ...`, `/delete_note <id>` - Changes or removes a note.\n\n\
        **Utility**\n\
        • `/ping` - Checks if the bot is responsive.\n\
        • `/help` - Shows this help message.";

        ctx.say(help_text).await?;
        Ok(())
    }
}

// Re-export all commands
pub use inner::*;
