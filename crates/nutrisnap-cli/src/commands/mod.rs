//! CLI command implementations
//!
//! Commands are organized by domain:
//! - `analyze` - Photo analysis, table edits and table output
//! - `health` - Backend health check
//! - `prompts` - Prompt library management commands
//! - `recalc` - Name-based calorie lookup
//! - `serve` - Proxy server command

pub mod analyze;
pub mod health;
pub mod prompts;
pub mod recalc;
pub mod serve;

// Re-export command functions for main.rs
pub use analyze::*;
pub use health::*;
pub use prompts::*;
pub use recalc::*;
pub use serve::*;

use anyhow::{Context, Result};
use nutrisnap_core::AIClient;

/// Pick the AI backend from the environment
pub fn open_backend() -> Result<AIClient> {
    AIClient::from_env().context(
        "AI backend not configured. Set GEMINI_API_KEY when AI_BACKEND=gemini, \
         or use AI_BACKEND=proxy (default) with NUTRISNAP_PROXY_URL",
    )
}

/// Truncate a string to a maximum number of characters, adding "..." if truncated
pub fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}
