//! Core business logic - framework-agnostic finance and nutrition operations.
//!
//! Every operation takes the database connection and, where the current salary
//! cycle or "today" matters, an explicit reference date.

/// Daily adherence scoring and grading
pub mod adherence;
/// Progress dashboard, monthly summaries and daily totals
pub mod analytics;
/// Injected nutrition coach and the rule-based default
pub mod coach;
/// 25th-to-24th salary cycle resolution and date parsing
pub mod cycle;
/// Income CRUD and pool ceilings
pub mod income;
/// Burn, Invest and Commitment line items
pub mod line_item;
/// Meal logging with spend links
pub mod meal;
/// One-time and recurring notes with notifications
pub mod notes;
/// Weight-loss phase plan and energy estimates
pub mod phase;
/// Photo storage for meals and line items
pub mod photos;
/// Weight plateau detection
pub mod plateau;
/// Pool split, availability and statements
pub mod pools;
/// Daily nutrition reviews and weekly summaries
pub mod review;
/// Meal timing against an eating window
pub mod timing;
/// User records
pub mod user;
/// Weight goals, entries and trends
pub mod weight;
