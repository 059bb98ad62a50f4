//! Discord command implementations organized by category.

#![allow(clippy::too_long_first_doc_paragraph)]

/// Income, pool and line item commands
pub mod finance;

/// General utility commands
pub mod general;

/// Reminder and recurring note commands
pub mod notes;

/// Meal, review and timing commands
pub mod nutrition;

/// Dashboard, monthly summary and daily totals commands
pub mod progress;

/// Weight goal, phase and weigh-in commands
pub mod weight;

// Export commands
pub use finance::*;
pub use general::*;
pub use notes::*;
pub use nutrition::*;
pub use progress::*;
pub use weight::*;
