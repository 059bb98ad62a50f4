//! Finance Discord commands - income, pools, spends and statements.
//!
//! Every spend command goes through the same admission gate in
//! [`crate::core::line_item`]; a rejection is rendered with the exact remaining
//! allowance by the bot's error handler.

// Inner module to suppress missing_docs warnings for poise macro-generated code
mod inner {
    #![allow(missing_docs)]

    use crate::{
        bot::{Context, caller, handlers::autocomplete, today},
        core::{
            cycle::{Cycle, parse_optional_date},
            income::{NewIncome, create_income, delete_income as remove_income},
            line_item::{
                LineItemUpdate, NewLineItem, create_line_item, delete_line_item, update_line_item,
            },
            photos::PhotoUpload,
            pools::{
                PoolStatement, available, income_pools, list_by_explicit_range, total_for_cycle,
            },
            user::{BurnSettingsUpdate, get_burn_settings, update_burn_settings},
        },
        entities::Pool,
        errors::{Error, Result},
    };
    use poise::serenity_prelude as serenity;
    use std::fmt::Write as _;

    /// Longest statement listing sent in one message.
    const MAX_LISTED_ITEMS: usize = 20;

    async fn download_photo(photo: Option<serenity::Attachment>) -> Result<Option<PhotoUpload>> {
        match photo {
            Some(attachment) => {
                let bytes = attachment.download().await?;
                Ok(Some(PhotoUpload::from_filename(bytes, &attachment.filename)?))
            }
            None => Ok(None),
        }
    }

    #[allow(clippy::too_many_arguments)]
    async fn record_spend(
        ctx: Context<'_>,
        pool: Pool,
        category: String,
        amount: f64,
        description: Option<String>,
        date: Option<String>,
        is_recurring: bool,
        photo: Option<serenity::Attachment>,
    ) -> Result<()> {
        let user_id = caller(ctx).await?;
        let item_date = parse_optional_date(date.as_deref())?;
        let photo = download_photo(photo).await?;
        let data = ctx.data();
        let today = today();

        let item = create_line_item(
            &data.database,
            &*data.photos,
            &user_id,
            NewLineItem {
                pool,
                category,
                amount,
                description,
                item_date,
                is_done: true,
                is_recurring,
                photo,
            },
            today,
        )
        .await?;

        let remaining = available(&data.database, &user_id, pool, today)
            .await?
            .map_or(0.0, |a| a.remaining);
        ctx.say(format!(
            "✅ Recorded {} ${:.2} ({}) on {} - ID {}. ${remaining:.2} left in {pool} this cycle.",
            pool, item.amount, item.category, item.item_date, item.id
        ))
        .await?;
        Ok(())
    }

    /// Records income and shows how it was split across the pools.
    #[poise::command(slash_command, prefix_command)]
    pub async fn income(
        ctx: Context<'_>,
        #[description = "Amount received"] amount: f64,
        #[description = "Date received (YYYY-MM-DD), defaults to today"] date: Option<String>,
        #[description = "Where it came from"] source: Option<String>,
    ) -> Result<()> {
        let user_id = caller(ctx).await?;
        let income_date = parse_optional_date(date.as_deref())?.unwrap_or_else(today);

        let income = create_income(
            &ctx.data().database,
            &user_id,
            NewIncome {
                source,
                amount,
                income_date,
            },
        )
        .await?;

        ctx.say(format!(
            "✅ Income ${:.2} recorded on {} (ID {}).\nBurn: ${} | Invest: ${} | Commit: ${}",
            income.amount,
            income.income_date,
            income.id,
            income.burn_pool,
            income.invest_pool,
            income.commit_pool
        ))
        .await?;
        Ok(())
    }

    /// Deletes an income together with its line items and their photos.
    #[poise::command(slash_command, prefix_command)]
    pub async fn delete_income(
        ctx: Context<'_>,
        #[description = "Income ID"] id: i64,
    ) -> Result<()> {
        let user_id = caller(ctx).await?;
        let data = ctx.data();
        let removed_items = remove_income(&data.database, &*data.photos, &user_id, id).await?;
        ctx.say(format!(
            "🗑️ Deleted income {id} and {removed_items} line item(s)."
        ))
        .await?;
        Ok(())
    }

    /// Shows this cycle's pool ceilings and what is left of each.
    #[poise::command(slash_command, prefix_command)]
    pub async fn pools(ctx: Context<'_>) -> Result<()> {
        let user_id = caller(ctx).await?;
        let db = &ctx.data().database;
        let today = today();
        let summary = income_pools(db, &user_id, today).await?;

        let mut reply = format!(
            "💰 **Cycle {}**\nIncome: ${:.2} from {} payment(s)\n",
            summary.cycle, summary.income, summary.income_count
        );
        for pool in [Pool::Burn, Pool::Invest, Pool::Commit] {
            let remaining = available(db, &user_id, pool, today)
                .await?
                .map_or(0.0, |a| a.remaining);
            writeln!(
                reply,
                "• {pool}: ${} ceiling, ${remaining:.2} left",
                summary.pools.ceiling(pool)
            )?;
        }
        ctx.say(reply).await?;
        Ok(())
    }

    /// Records a Burn spend.
    #[poise::command(slash_command)]
    pub async fn burn(
        ctx: Context<'_>,
        #[description = "Stupid, Health, Therapeutic or Tech"]
        #[autocomplete = "autocomplete::autocomplete_burn_category"]
        category: String,
        #[description = "Amount spent"] amount: f64,
        #[description = "What it was"] description: Option<String>,
        #[description = "Date (YYYY-MM-DD), defaults to today"] date: Option<String>,
        #[description = "Receipt or meal photo"] photo: Option<serenity::Attachment>,
    ) -> Result<()> {
        record_spend(ctx, Pool::Burn, category, amount, description, date, false, photo).await
    }

    /// Records an Invest spend.
    #[poise::command(slash_command)]
    pub async fn invest(
        ctx: Context<'_>,
        #[description = "High Risks, Med Risks or Low Risks"]
        #[autocomplete = "autocomplete::autocomplete_invest_category"]
        category: String,
        #[description = "Amount invested"] amount: f64,
        #[description = "What it was"] description: Option<String>,
        #[description = "Date (YYYY-MM-DD), defaults to today"] date: Option<String>,
        #[description = "Receipt photo"] photo: Option<serenity::Attachment>,
    ) -> Result<()> {
        record_spend(ctx, Pool::Invest, category, amount, description, date, false, photo).await
    }

    /// Records a Commitment, e.g. rent or a subscription.
    #[poise::command(slash_command)]
    pub async fn commit(
        ctx: Context<'_>,
        #[description = "Any label, e.g. Rent"] label: String,
        #[description = "Amount committed"] amount: f64,
        #[description = "Details"] description: Option<String>,
        #[description = "Date (YYYY-MM-DD), defaults to today"] date: Option<String>,
        #[description = "Repeats every cycle"] recurring: Option<bool>,
        #[description = "Receipt photo"] photo: Option<serenity::Attachment>,
    ) -> Result<()> {
        record_spend(
            ctx,
            Pool::Commit,
            label,
            amount,
            description,
            date,
            recurring.unwrap_or(false),
            photo,
        )
        .await
    }

    fn render_statement(statement: &PoolStatement) -> Result<String> {
        let mut reply = format!(
            "📒 **{} statement, {}**\nCeiling: ${} | Spent: ${:.2} | Remaining: ${:.2}\n",
            statement.pool,
            statement.range,
            statement.pool_ceiling,
            statement.spent,
            statement.remaining
        );
        if statement.items.is_empty() {
            reply.push_str("No line items.");
            return Ok(reply);
        }
        for item in statement.items.iter().take(MAX_LISTED_ITEMS) {
            write!(
                reply,
                "• #{} {} {} ${:.2}",
                item.id, item.item_date, item.category, item.amount
            )?;
            if let Some(description) = &item.description {
                write!(reply, " - {description}")?;
            }
            if item.photo_path.is_some() {
                reply.push_str(" 📷");
            }
            reply.push('\n');
        }
        if statement.items.len() > MAX_LISTED_ITEMS {
            writeln!(
                reply,
                "…and {} more",
                statement.items.len() - MAX_LISTED_ITEMS
            )?;
        }
        Ok(reply)
    }

    /// Lists a pool's line items for the current cycle or an explicit range.
    #[poise::command(slash_command, prefix_command)]
    pub async fn statement(
        ctx: Context<'_>,
        #[description = "burn, invest or commit"]
        #[autocomplete = "autocomplete::autocomplete_pool"]
        pool: String,
        #[description = "Range start (YYYY-MM-DD)"] start: Option<String>,
        #[description = "Range end (YYYY-MM-DD)"] end: Option<String>,
    ) -> Result<()> {
        let user_id = caller(ctx).await?;
        let pool: Pool = pool.parse()?;
        let db = &ctx.data().database;

        let statement = match (
            parse_optional_date(start.as_deref())?,
            parse_optional_date(end.as_deref())?,
        ) {
            (Some(start), Some(end)) => {
                list_by_explicit_range(db, &user_id, pool, Cycle::new(start, end)?).await?
            }
            (None, None) => total_for_cycle(db, &user_id, pool, today()).await?,
            _ => {
                return Err(Error::validation(
                    "Give both start and end, or neither for the current cycle",
                ));
            }
        };

        ctx.say(render_statement(&statement)?).await?;
        Ok(())
    }

    /// Edits a line item. Raising the amount is checked against the pool.
    #[poise::command(slash_command, prefix_command)]
    #[allow(clippy::too_many_arguments)]
    pub async fn edit_item(
        ctx: Context<'_>,
        #[description = "Line item ID"] id: i64,
        #[description = "New amount"] amount: Option<f64>,
        #[description = "New category"] category: Option<String>,
        #[description = "New description"] description: Option<String>,
        #[description = "New date (YYYY-MM-DD)"] date: Option<String>,
        #[description = "Settled"] done: Option<bool>,
        #[description = "Repeats every cycle"] recurring: Option<bool>,
    ) -> Result<()> {
        let user_id = caller(ctx).await?;
        let item = update_line_item(
            &ctx.data().database,
            &user_id,
            id,
            LineItemUpdate {
                category,
                amount,
                description,
                item_date: parse_optional_date(date.as_deref())?,
                is_done: done,
                is_recurring: recurring,
            },
        )
        .await?;

        ctx.say(format!(
            "✏️ Updated {} item {}: ${:.2} ({}) on {}",
            item.pool, item.id, item.amount, item.category, item.item_date
        ))
        .await?;
        Ok(())
    }

    /// Deletes a line item and its photo.
    #[poise::command(slash_command, prefix_command)]
    pub async fn delete_item(
        ctx: Context<'_>,
        #[description = "Line item ID"] id: i64,
    ) -> Result<()> {
        let user_id = caller(ctx).await?;
        let data = ctx.data();
        let item = delete_line_item(&data.database, &*data.photos, &user_id, id).await?;
        ctx.say(format!(
            "🗑️ Deleted {} item {} (${:.2} {}).",
            item.pool, item.id, item.amount, item.category
        ))
        .await?;
        Ok(())
    }

    /// Shows your daily burn limit and supply, updating whichever is given.
    #[poise::command(slash_command, prefix_command)]
    pub async fn burn_settings(
        ctx: Context<'_>,
        #[description = "Daily burn limit"] daily_limit: Option<i32>,
        #[description = "Daily burn supply"] daily_supply: Option<i32>,
    ) -> Result<()> {
        let user_id = caller(ctx).await?;
        let db = &ctx.data().database;
        let settings = if daily_limit.is_none() && daily_supply.is_none() {
            get_burn_settings(db, &user_id).await?
        } else {
            let update = BurnSettingsUpdate {
                daily_limit_burn: daily_limit,
                daily_supply_burn: daily_supply,
            };
            update_burn_settings(db, &user_id, update).await?
        };

        let show = |value: Option<i32>| {
            value.map_or_else(|| "not set".to_string(), |value| value.to_string())
        };
        ctx.say(format!(
            "🔥 Daily burn limit: {} | daily burn supply: {}",
            show(settings.daily_limit_burn),
            show(settings.daily_supply_burn)
        ))
        .await?;
        Ok(())
    }

}

// Re-export all commands
pub use inner::*;
