//! Note Discord commands - reminders, recurring checklists and their
//! notification settings.
//!
//! Listing notes first brings back any recurring note that has come due.

// Inner module to suppress missing_docs warnings for poise macro-generated code
mod inner {
    #![allow(missing_docs)]

    use crate::{
        bot::{Context, caller, handlers::autocomplete, today},
        core::{
            cycle::{Cycle, parse_date, parse_datetime},
            notes::{
                NewNote, NoteUpdate, Notification, NotificationUpdate, create_note,
                delete_note as remove_note, list_notes_by_category, list_notes_in_range,
                list_pending_notes, reset_due_notes, set_note_done, update_note,
            },
        },
        entities::{NoteType, NotificationType, note},
        errors::Result,
    };
    use std::fmt::Write as _;

    /// Longest note listing sent in one message.
    const MAX_LISTED_NOTES: usize = 20;

    fn render_note(note: &note::Model) -> Result<String> {
        let mark = if note.is_done { "☑️" } else { "⬜" };
        let mut line = format!("{mark} #{} **{}**", note.id, note.title);
        if let Some(category) = &note.category {
            write!(line, " [{category}]")?;
        }
        if let (NoteType::Recurring, Some(days)) = (note.note_type, note.recurrence_interval_days)
        {
            write!(line, " every {days}d")?;
        }
        if let Some(due) = note.next_due_date {
            write!(line, ", due {due}")?;
        }
        if let Some(item) = note.line_item_id {
            write!(line, ", item #{item}")?;
        }
        if note.notification_enabled {
            line.push_str(" 🔔");
        }
        Ok(line)
    }

    fn render_notes(heading: &str, notes: &[note::Model]) -> Result<String> {
        let mut reply = format!("📝 **{heading}**\n");
        if notes.is_empty() {
            reply.push_str("No notes.");
            return Ok(reply);
        }
        for note in notes.iter().take(MAX_LISTED_NOTES) {
            writeln!(reply, "{}", render_note(note)?)?;
        }
        if notes.len() > MAX_LISTED_NOTES {
            writeln!(reply, "…and {} more", notes.len() - MAX_LISTED_NOTES)?;
        }
        Ok(reply)
    }

    /// Builds a notification from command options; any option turns it on.
    fn notification_from(
        kind: Option<&str>,
        at: Option<&str>,
        minutes_before: Option<i32>,
    ) -> Result<Notification> {
        let kind: Option<NotificationType> = kind.map(str::parse).transpose()?;
        let at = at.map(parse_datetime).transpose()?;
        Ok(Notification {
            enabled: kind.is_some() || at.is_some() || minutes_before.is_some(),
            kind,
            at,
            minutes_before,
        })
    }

    /// Adds a one-time or recurring note.
    #[poise::command(slash_command, prefix_command)]
    pub async fn add_note(
        ctx: Context<'_>,
        #[description = "Title"] title: String,
        #[description = "Text"] content: String,
        #[description = "one-time or recurring, default one-time"]
        #[autocomplete = "autocomplete::autocomplete_note_type"]
        note_type: Option<String>,
        #[description = "Days between occurrences for recurring notes"] every_days: Option<i32>,
        #[description = "Category"] category: Option<String>,
        #[description = "Line item this note is about"] item_id: Option<i64>,
        #[description = "Notify: specific or relative"]
        #[autocomplete = "autocomplete::autocomplete_notification_type"]
        notify: Option<String>,
        #[description = "Notify at (YYYY-MM-DD HH:MM, UTC)"] notify_at: Option<String>,
        #[description = "Minutes before the due date"] minutes_before: Option<i32>,
    ) -> Result<()> {
        let user_id = caller(ctx).await?;
        let note_type: NoteType = note_type
            .as_deref()
            .map(str::parse)
            .transpose()?
            .unwrap_or(NoteType::OneTime);
        let notification =
            notification_from(notify.as_deref(), notify_at.as_deref(), minutes_before)?;

        let note = create_note(
            &ctx.data().database,
            &user_id,
            NewNote {
                title,
                content,
                category,
                note_type,
                recurrence_interval_days: every_days,
                line_item_id: item_id,
                notification,
            },
            today(),
        )
        .await?;
        ctx.say(format!("✅ Added note\n{}", render_note(&note)?))
            .await?;
        Ok(())
    }

    /// Lists pending notes, or every note in a category or date range.
    #[poise::command(slash_command, prefix_command)]
    pub async fn notes(
        ctx: Context<'_>,
        #[description = "Only this category"] category: Option<String>,
        #[description = "Created from (YYYY-MM-DD)"] start: Option<String>,
        #[description = "Created to (YYYY-MM-DD)"] end: Option<String>,
    ) -> Result<()> {
        let user_id = caller(ctx).await?;
        let db = &ctx.data().database;
        reset_due_notes(db, &user_id, today()).await?;

        let reply = match (category, start, end) {
            (Some(category), _, _) => {
                let notes = list_notes_by_category(db, &user_id, &category).await?;
                render_notes(&format!("Notes in {category}"), &notes)?
            }
            (None, Some(start), Some(end)) => {
                let range = Cycle::new(parse_date(&start)?, parse_date(&end)?)?;
                let notes = list_notes_in_range(db, &user_id, range).await?;
                render_notes(&format!("Notes, {range}"), &notes)?
            }
            _ => {
                let notes = list_pending_notes(db, &user_id).await?;
                render_notes("Pending notes", &notes)?
            }
        };
        ctx.say(reply).await?;
        Ok(())
    }

    /// Checks a note off, or back on with `done: false`.
    #[poise::command(slash_command, prefix_command)]
    pub async fn note_done(
        ctx: Context<'_>,
        #[description = "Note ID"] id: i64,
        #[description = "Done, default true"] done: Option<bool>,
    ) -> Result<()> {
        let user_id = caller(ctx).await?;
        let note = set_note_done(&ctx.data().database, &user_id, id, done.unwrap_or(true)).await?;
        ctx.say(render_note(&note)?).await?;
        Ok(())
    }

    /// Edits a note; only the given fields change.
    #[poise::command(slash_command, prefix_command)]
    pub async fn edit_note(
        ctx: Context<'_>,
        #[description = "Note ID"] id: i64,
        #[description = "New title"] title: Option<String>,
        #[description = "New text"] content: Option<String>,
        #[description = "New category, blank clears it"] category: Option<String>,
        #[description = "one-time or recurring"]
        #[autocomplete = "autocomplete::autocomplete_note_type"]
        note_type: Option<String>,
        #[description = "Days between occurrences"] every_days: Option<i32>,
        #[description = "Line item ID, 0 clears the link"] item_id: Option<i64>,
        #[description = "Turn notifications on or off"] notify_enabled: Option<bool>,
        #[description = "Notify: specific or relative"]
        #[autocomplete = "autocomplete::autocomplete_notification_type"]
        notify: Option<String>,
        #[description = "Notify at (YYYY-MM-DD HH:MM, UTC)"] notify_at: Option<String>,
        #[description = "Minutes before the due date"] minutes_before: Option<i32>,
    ) -> Result<()> {
        let user_id = caller(ctx).await?;
        let notification_kind: Option<NotificationType> =
            notify.as_deref().map(str::parse).transpose()?;
        let notification_at = notify_at.as_deref().map(parse_datetime).transpose()?;
        let notification = (notify_enabled.is_some()
            || notification_kind.is_some()
            || notification_at.is_some()
            || minutes_before.is_some())
        .then_some(NotificationUpdate {
            enabled: notify_enabled,
            kind: notification_kind,
            at: notification_at,
            minutes_before,
        });

        let update = NoteUpdate {
            title,
            content,
            category,
            note_type: note_type.as_deref().map(str::parse).transpose()?,
            recurrence_interval_days: every_days,
            line_item_id: item_id.map(|id| (id != 0).then_some(id)),
            notification,
        };
        let note = update_note(&ctx.data().database, &user_id, id, update, today()).await?;
        ctx.say(format!("✏️ Updated note\n{}", render_note(&note)?))
            .await?;
        Ok(())
    }

    /// Deletes a note.
    #[poise::command(slash_command, prefix_command)]
    pub async fn delete_note(ctx: Context<'_>, #[description = "Note ID"] id: i64) -> Result<()> {
        let user_id = caller(ctx).await?;
        let note = remove_note(&ctx.data().database, &user_id, id).await?;
        ctx.say(format!("🗑️ Deleted note #{} {}", note.id, note.title))
            .await?;
        Ok(())
    }

}

// Re-export all commands
pub use inner::*;
