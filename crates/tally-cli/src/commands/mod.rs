//! CLI command implementations
//!
//! Commands are organized by domain:
//! - `accounts` - Account listing and summary statistics
//! - `apply` - Tag application and time-bucket tagging
//! - `core` - Core commands (init, status) and shared utilities (open_db, resolve_account)
//! - `history` - Tagging history display
//! - `tags` - Tag definition management

pub mod accounts;
pub mod apply;
pub mod core;
pub mod history;
pub mod tags;

// Re-export command functions for main.rs
pub use accounts::*;
pub use apply::*;
pub use core::*;
pub use history::*;
pub use tags::*;

/// Truncate a string to a maximum length in bytes, adding "..." if truncated.
/// Labels and expressions can hold multibyte text, so the cut backs up to the
/// nearest char boundary.
pub fn truncate(s: &str, max: usize) -> String {
    if s.len() <= max {
        return s.to_string();
    }

    let mut end = max.saturating_sub(3);
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &s[..end])
}
