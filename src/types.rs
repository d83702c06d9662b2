//! Common types used throughout tubefeed
//!
//! This module contains the shared domain model and small utility types
//! used across multiple modules.

use serde::{Deserialize, Serialize};

// ============================================================================
// Domain Model
// ============================================================================

/// A single video entry as it appears in a feed (history, playlist)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Video {
    /// Stable video identifier; the identity used when comparing entries
    /// across feeds
    pub id: String,
    /// Display title
    pub title: String,
    /// Description snippet as rendered in the feed (often truncated)
    #[serde(default)]
    pub description: String,
}

impl Video {
    /// Create a video entry
    pub fn new(
        id: impl Into<String>,
        title: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            description: description.into(),
        }
    }
}

// ============================================================================
// Backoff Type
// ============================================================================

/// How the delay between retry attempts grows
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackoffType {
    /// Same delay every attempt
    Constant,
    /// Delay grows by the initial step each attempt
    Linear,
    /// Delay doubles each attempt
    #[default]
    Exponential,
}

// ============================================================================
// Utilities
// ============================================================================

/// Treat empty strings as absent values
pub trait OptionStringExt {
    /// `None` when the string is empty, `Some` otherwise
    fn none_if_empty(self) -> Option<String>;
}

impl OptionStringExt for Option<String> {
    fn none_if_empty(self) -> Option<String> {
        self.filter(|s| !s.is_empty())
    }
}

impl OptionStringExt for String {
    fn none_if_empty(self) -> Option<String> {
        if self.is_empty() {
            None
        } else {
            Some(self)
        }
    }
}
