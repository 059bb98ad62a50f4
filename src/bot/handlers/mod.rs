//! Discord interaction handlers
//!
//! This module provides handlers for Discord interactions such as autocomplete.

/// Autocomplete handlers for pools, categories, meal types and phases
pub mod autocomplete;
