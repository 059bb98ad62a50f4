//! Note entity - a one-time or recurring reminder.
//!
//! Recurring notes come back after `recurrence_interval_days`: once a done
//! note's `next_due_date` is reached, [`crate::core::notes::reset_due_notes`]
//! clears it and schedules the next occurrence. A note may point at one line
//! item; the link is cleared when the item goes away.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Whether a note happens once or repeats.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::None)")]
#[serde(rename_all = "kebab-case")]
pub enum NoteType {
    /// Done once, never comes back
    #[sea_orm(string_value = "one-time")]
    OneTime,
    /// Comes back every `recurrence_interval_days`
    #[sea_orm(string_value = "recurring")]
    Recurring,
}

/// How a note's notification time is expressed.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::None)")]
#[serde(rename_all = "snake_case")]
pub enum NotificationType {
    /// At a fixed moment
    #[sea_orm(string_value = "specific")]
    Specific,
    /// A number of minutes before the due date
    #[sea_orm(string_value = "relative")]
    Relative,
}

/// Note database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "notes")]
pub struct Model {
    /// Unique identifier for the note
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Owner of the note
    pub user_id: String,
    /// Short title, at most 200 characters
    pub title: String,
    /// Body text
    pub content: String,
    /// Optional grouping label, at most 50 characters
    pub category: Option<String>,
    /// One-time or recurring
    pub note_type: NoteType,
    /// Days between occurrences; set only for recurring notes
    pub recurrence_interval_days: Option<i32>,
    /// Day the note was last brought back by a reset
    pub last_reset_date: Option<Date>,
    /// Day the next occurrence is due; set only for recurring notes
    pub next_due_date: Option<Date>,
    /// Whether the current occurrence is done
    pub is_done: bool,
    /// When the current occurrence was marked done
    pub done_at: Option<DateTimeUtc>,
    /// Optional line item the note is about
    pub line_item_id: Option<i64>,
    /// Whether a notification is wanted
    pub notification_enabled: bool,
    /// How the notification time is given; set only when enabled
    pub notification_type: Option<NotificationType>,
    /// Fixed notification moment for `specific` notifications
    pub notification_at: Option<DateTimeUtc>,
    /// Lead time for `relative` notifications
    pub notification_minutes_before: Option<i32>,
    /// When the note was created
    pub created_at: DateTimeUtc,
    /// When the note was last changed
    pub updated_at: DateTimeUtc,
}

/// Notes have no enforced relationships
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
