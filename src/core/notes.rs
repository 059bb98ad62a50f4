//! Notes and reminders - one-time and recurring notes, their reset schedule
//! and notification settings.
//!
//! A recurring note is due `recurrence_interval_days` after it was created or
//! last reset. Checking it off does not reschedule it; [`reset_due_notes`]
//! brings back every done note whose due date has arrived.

use crate::{
    core::{cycle::Cycle, line_item::find_owned, user::get_user},
    entities::{Note, NoteType, NotificationType, note},
    errors::{Error, Result},
};
use chrono::{DateTime, Days, NaiveDate, Utc};
use sea_orm::{Select, Set, TransactionTrait, Value, prelude::*, sea_query::Expr};
use std::{cmp::Ordering, str::FromStr};

const TITLE_MAX_CHARS: usize = 200;
const CATEGORY_MAX_CHARS: usize = 50;

impl FromStr for NoteType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "one-time" | "onetime" | "once" => Ok(Self::OneTime),
            "recurring" => Ok(Self::Recurring),
            other => Err(Error::validation(format!(
                "Invalid note type '{other}', expected one-time or recurring"
            ))),
        }
    }
}

impl FromStr for NotificationType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "specific" => Ok(Self::Specific),
            "relative" => Ok(Self::Relative),
            other => Err(Error::validation(format!(
                "Invalid notification type '{other}', expected specific or relative"
            ))),
        }
    }
}

/// The day `interval_days` after `from`, or `None` without a positive interval.
#[must_use]
pub fn next_due_date(from: NaiveDate, interval_days: Option<i32>) -> Option<NaiveDate> {
    let days = u64::try_from(interval_days?).ok().filter(|days| *days >= 1)?;
    from.checked_add_days(Days::new(days))
}

/// Notification settings of a note.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Notification {
    /// Whether a notification is wanted
    pub enabled: bool,
    /// Specific moment or lead time before the due date
    pub kind: Option<NotificationType>,
    /// Moment for `specific` notifications
    pub at: Option<DateTime<Utc>>,
    /// Lead time for `relative` notifications
    pub minutes_before: Option<i32>,
}

impl From<&note::Model> for Notification {
    fn from(note: &note::Model) -> Self {
        Self {
            enabled: note.notification_enabled,
            kind: note.notification_type,
            at: note.notification_at,
            minutes_before: note.notification_minutes_before,
        }
    }
}

/// Partial change to a note's notification; unset fields keep their value.
#[derive(Debug, Clone, Copy, Default)]
pub struct NotificationUpdate {
    /// Turn notifications on or off
    pub enabled: Option<bool>,
    /// New kind
    pub kind: Option<NotificationType>,
    /// New moment
    pub at: Option<DateTime<Utc>>,
    /// New lead time
    pub minutes_before: Option<i32>,
}

impl NotificationUpdate {
    fn apply_to(self, current: Notification) -> Notification {
        Notification {
            enabled: self.enabled.unwrap_or(current.enabled),
            kind: self.kind.or(current.kind),
            at: self.at.or(current.at),
            minutes_before: self.minutes_before.or(current.minutes_before),
        }
    }
}

/// Checks a notification against the note's due date and keeps only the
/// fields its kind uses. A disabled notification clears every field.
pub fn validate_notification(
    requested: &Notification,
    next_due: Option<NaiveDate>,
) -> Result<Notification> {
    if !requested.enabled {
        return Ok(Notification::default());
    }

    match requested.kind {
        None => Err(Error::validation(
            "notification_type must be either 'specific' or 'relative' when notifications are enabled",
        )),
        Some(NotificationType::Specific) => {
            let at = requested.at.ok_or_else(|| {
                Error::validation(
                    "notification_datetime is required when notification_type is 'specific'",
                )
            })?;
            Ok(Notification {
                enabled: true,
                kind: Some(NotificationType::Specific),
                at: Some(at),
                minutes_before: None,
            })
        }
        Some(NotificationType::Relative) => {
            let minutes = requested.minutes_before.ok_or_else(|| {
                Error::validation(
                    "notification_minutes_before is required when notification_type is 'relative'",
                )
            })?;
            if minutes <= 0 {
                return Err(Error::validation(
                    "notification_minutes_before must be greater than 0",
                ));
            }
            if next_due.is_none() {
                return Err(Error::validation(
                    "Cannot set relative notification without a due date",
                ));
            }
            Ok(Notification {
                enabled: true,
                kind: Some(NotificationType::Relative),
                at: None,
                minutes_before: Some(minutes),
            })
        }
    }
}

/// Input for a new note.
#[derive(Debug, Clone)]
pub struct NewNote {
    /// Short title
    pub title: String,
    /// Body text
    pub content: String,
    /// Optional grouping label
    pub category: Option<String>,
    /// One-time or recurring
    pub note_type: NoteType,
    /// Days between occurrences, required for recurring notes
    pub recurrence_interval_days: Option<i32>,
    /// Line item the note is about
    pub line_item_id: Option<i64>,
    /// Notification settings
    pub notification: Notification,
}

/// Partial update of a note; `None` fields are left unchanged.
#[derive(Debug, Clone, Default)]
pub struct NoteUpdate {
    /// New title
    pub title: Option<String>,
    /// New body text
    pub content: Option<String>,
    /// New category; blank clears it
    pub category: Option<String>,
    /// New note type
    pub note_type: Option<NoteType>,
    /// New recurrence interval
    pub recurrence_interval_days: Option<i32>,
    /// `Some(None)` clears the link
    pub line_item_id: Option<Option<i64>>,
    /// Notification changes
    pub notification: Option<NotificationUpdate>,
}

fn validate_title(title: &str) -> Result<String> {
    let title = title.trim();
    if title.is_empty() || title.chars().count() > TITLE_MAX_CHARS {
        return Err(Error::validation(format!(
            "Title must be 1 to {TITLE_MAX_CHARS} characters"
        )));
    }
    Ok(title.to_string())
}

fn validate_content(content: &str) -> Result<String> {
    if content.trim().is_empty() {
        return Err(Error::validation("Content is required"));
    }
    Ok(content.trim().to_string())
}

fn validate_category(category: Option<&str>) -> Result<Option<String>> {
    match category.map(str::trim).filter(|c| !c.is_empty()) {
        Some(label) if label.chars().count() > CATEGORY_MAX_CHARS => Err(Error::validation(
            format!("Category must be at most {CATEGORY_MAX_CHARS} characters"),
        )),
        label => Ok(label.map(str::to_string)),
    }
}

fn recurrence_interval(note_type: NoteType, interval_days: Option<i32>) -> Result<Option<i32>> {
    match note_type {
        NoteType::OneTime => Ok(None),
        NoteType::Recurring => match interval_days {
            Some(days) if days >= 1 => Ok(Some(days)),
            _ => Err(Error::validation(
                "recurrence_interval_days must be at least 1 for recurring notes",
            )),
        },
    }
}

/// Creates a note. A recurring note is first due one interval after `today`.
pub async fn create_note(
    db: &DatabaseConnection,
    user_id: &str,
    new: NewNote,
    today: NaiveDate,
) -> Result<note::Model> {
    let title = validate_title(&new.title)?;
    let content = validate_content(&new.content)?;
    let category = validate_category(new.category.as_deref())?;
    let interval = recurrence_interval(new.note_type, new.recurrence_interval_days)?;
    let next_due = next_due_date(today, interval);
    let notification = validate_notification(&new.notification, next_due)?;

    let txn = db.begin().await?;
    get_user(&txn, user_id).await?;
    if let Some(item_id) = new.line_item_id {
        find_owned(&txn, user_id, item_id).await?;
    }

    let now = Utc::now();
    let created = note::ActiveModel {
        user_id: Set(user_id.to_string()),
        title: Set(title),
        content: Set(content),
        category: Set(category),
        note_type: Set(new.note_type),
        recurrence_interval_days: Set(interval),
        last_reset_date: Set(None),
        next_due_date: Set(next_due),
        is_done: Set(false),
        done_at: Set(None),
        line_item_id: Set(new.line_item_id),
        notification_enabled: Set(notification.enabled),
        notification_type: Set(notification.kind),
        notification_at: Set(notification.at),
        notification_minutes_before: Set(notification.minutes_before),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(&txn)
    .await?;
    txn.commit().await?;

    tracing::info!("Created note {} for {user_id}", created.id);
    Ok(created)
}

/// Retrieves a note owned by `user_id`.
pub async fn get_note<C>(db: &C, user_id: &str, note_id: i64) -> Result<note::Model>
where
    C: ConnectionTrait,
{
    Note::find_by_id(note_id)
        .filter(note::Column::UserId.eq(user_id))
        .one(db)
        .await?
        .ok_or_else(|| Error::not_found("note", note_id))
}

// Due notes first, soonest first, undated last; newest first within a tie.
fn due_order(a: &note::Model, b: &note::Model) -> Ordering {
    match (a.next_due_date, b.next_due_date) {
        (Some(x), Some(y)) => x.cmp(&y),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
    .then_with(|| b.created_at.cmp(&a.created_at))
}

async fn fetch_sorted(
    db: &DatabaseConnection,
    user_id: &str,
    query: Select<Note>,
) -> Result<Vec<note::Model>> {
    get_user(db, user_id).await?;
    let mut notes = query
        .filter(note::Column::UserId.eq(user_id))
        .all(db)
        .await?;
    notes.sort_by(due_order);
    Ok(notes)
}

/// Every note of a user.
pub async fn list_notes(db: &DatabaseConnection, user_id: &str) -> Result<Vec<note::Model>> {
    fetch_sorted(db, user_id, Note::find()).await
}

/// Notes not yet checked off.
pub async fn list_pending_notes(
    db: &DatabaseConnection,
    user_id: &str,
) -> Result<Vec<note::Model>> {
    fetch_sorted(db, user_id, Note::find().filter(note::Column::IsDone.eq(false))).await
}

/// Notes with the given category.
pub async fn list_notes_by_category(
    db: &DatabaseConnection,
    user_id: &str,
    category: &str,
) -> Result<Vec<note::Model>> {
    let query = Note::find().filter(note::Column::Category.eq(category.trim()));
    fetch_sorted(db, user_id, query).await
}

/// Notes created on a day inside `range`, both ends included.
pub async fn list_notes_in_range(
    db: &DatabaseConnection,
    user_id: &str,
    range: Cycle,
) -> Result<Vec<note::Model>> {
    let from = range.start.and_time(chrono::NaiveTime::MIN).and_utc();
    let until = range
        .end
        .succ_opt()
        .unwrap_or(range.end)
        .and_time(chrono::NaiveTime::MIN)
        .and_utc();
    let query = Note::find()
        .filter(note::Column::CreatedAt.gte(from))
        .filter(note::Column::CreatedAt.lt(until));
    fetch_sorted(db, user_id, query).await
}

/// Applies a partial update to a note.
///
/// Changing the type or the interval reschedules the note from its last reset
/// (or `today` if it was never reset). The notification is re-validated
/// against the resulting due date.
pub async fn update_note(
    db: &DatabaseConnection,
    user_id: &str,
    note_id: i64,
    update: NoteUpdate,
    today: NaiveDate,
) -> Result<note::Model> {
    let txn = db.begin().await?;
    let note = get_note(&txn, user_id, note_id).await?;

    let note_type = update.note_type.unwrap_or(note.note_type);
    let (interval, next_due) =
        if update.recurrence_interval_days.is_some() || note_type != note.note_type {
            let interval = recurrence_interval(
                note_type,
                update
                    .recurrence_interval_days
                    .or(note.recurrence_interval_days),
            )?;
            let from = note.last_reset_date.unwrap_or(today);
            (interval, next_due_date(from, interval))
        } else {
            (note.recurrence_interval_days, note.next_due_date)
        };

    let current = Notification::from(&note);
    let requested = update
        .notification
        .map_or(current, |change| change.apply_to(current));
    let notification = validate_notification(&requested, next_due)?;

    if let Some(Some(item_id)) = update.line_item_id {
        find_owned(&txn, user_id, item_id).await?;
    }

    let mut active: note::ActiveModel = note.into();
    if let Some(title) = &update.title {
        active.title = Set(validate_title(title)?);
    }
    if let Some(content) = &update.content {
        active.content = Set(validate_content(content)?);
    }
    if let Some(category) = &update.category {
        active.category = Set(validate_category(Some(category))?);
    }
    if let Some(link) = update.line_item_id {
        active.line_item_id = Set(link);
    }
    active.note_type = Set(note_type);
    active.recurrence_interval_days = Set(interval);
    active.next_due_date = Set(next_due);
    active.notification_enabled = Set(notification.enabled);
    active.notification_type = Set(notification.kind);
    active.notification_at = Set(notification.at);
    active.notification_minutes_before = Set(notification.minutes_before);
    active.updated_at = Set(Utc::now());

    let updated = active.update(&txn).await?;
    txn.commit().await?;

    tracing::info!("Updated note {note_id} for {user_id}");
    Ok(updated)
}

/// Checks a note off, or back on when `done` is false.
pub async fn set_note_done(
    db: &DatabaseConnection,
    user_id: &str,
    note_id: i64,
    done: bool,
) -> Result<note::Model> {
    let note = get_note(db, user_id, note_id).await?;
    let mut active: note::ActiveModel = note.into();
    let now = Utc::now();
    active.is_done = Set(done);
    active.done_at = Set(done.then_some(now));
    active.updated_at = Set(now);
    Ok(active.update(db).await?)
}

/// Brings back every done recurring note whose due date is `today` or
/// earlier, and schedules its next occurrence one interval after `today`.
///
/// Returns the notes that were reset.
pub async fn reset_due_notes(
    db: &DatabaseConnection,
    user_id: &str,
    today: NaiveDate,
) -> Result<Vec<note::Model>> {
    let txn = db.begin().await?;
    get_user(&txn, user_id).await?;

    let due = Note::find()
        .filter(note::Column::UserId.eq(user_id))
        .filter(note::Column::NoteType.eq(NoteType::Recurring))
        .filter(note::Column::IsDone.eq(true))
        .filter(note::Column::NextDueDate.lte(today))
        .all(&txn)
        .await?;

    let mut reset = Vec::with_capacity(due.len());
    for note in due {
        let interval = note.recurrence_interval_days;
        let mut active: note::ActiveModel = note.into();
        active.is_done = Set(false);
        active.done_at = Set(None);
        active.last_reset_date = Set(Some(today));
        if interval.is_some() {
            active.next_due_date = Set(next_due_date(today, interval));
        }
        active.updated_at = Set(Utc::now());
        reset.push(active.update(&txn).await?);
    }
    txn.commit().await?;

    if !reset.is_empty() {
        tracing::info!("Reset {} recurring notes for {user_id}", reset.len());
    }
    Ok(reset)
}

/// Deletes a note.
pub async fn delete_note(
    db: &DatabaseConnection,
    user_id: &str,
    note_id: i64,
) -> Result<note::Model> {
    let note = get_note(db, user_id, note_id).await?;
    Note::delete_by_id(note.id).exec(db).await?;
    tracing::info!("Deleted note {note_id} for {user_id}");
    Ok(note)
}

/// Clears note links to line items that are being removed.
pub(crate) async fn unlink_line_items<C>(db: &C, item_ids: &[i64]) -> Result<()>
where
    C: ConnectionTrait,
{
    if item_ids.is_empty() {
        return Ok(());
    }
    Note::update_many()
        .col_expr(note::Column::LineItemId, Expr::value(Value::BigInt(None)))
        .filter(note::Column::LineItemId.is_in(item_ids.iter().copied()))
        .exec(db)
        .await?;
    Ok(())
}
