//! CLI argument definitions

use std::fmt::Display;
use std::path::PathBuf;
use std::str::FromStr;

use clap::{Parser, Subcommand};
use nutrisnap_core::{Language, Metric};

#[derive(Parser)]
#[command(name = "nutrisnap")]
#[command(about = "Estimate calories and macros from food photos", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Enable verbose (debug) logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Language for food names, labels and prompts (ko or en)
    #[arg(short, long, global = true, default_value = "ko")]
    pub lang: Language,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the proxy server
    ///
    /// Holds GEMINI_API_KEY and relays analyze/recalculate requests so the key
    /// never reaches a client.
    Serve {
        /// Port to listen on
        #[arg(short, long, default_value = "8788")]
        port: u16,

        /// Host to bind to
        #[arg(long, default_value = "127.0.0.1")]
        host: String,

        /// Directory containing the web UI to serve (e.g., ui/dist)
        #[arg(long)]
        static_dir: Option<PathBuf>,
    },

    /// Analyze food photos and print the nutrition table
    ///
    /// Rows are numbered from 1 in the printed table. Edits are applied in
    /// order: added rows, weights, then renames (which re-estimate calories).
    Analyze {
        /// Photo to analyze (repeat for several photos)
        #[arg(short, long = "image")]
        images: Vec<PathBuf>,

        /// Metric to display (calories, carbs, protein, fat)
        #[arg(short, long)]
        metric: Option<Metric>,

        /// Set a row's weight, e.g. --weight 1=120
        #[arg(short, long = "weight", value_parser = parse_row_value::<f64>)]
        weights: Vec<(usize, f64)>,

        /// Rename a row and re-estimate its calories, e.g. --rename "2=brown rice"
        #[arg(short, long = "rename", value_parser = parse_row_value::<String>)]
        renames: Vec<(usize, String)>,

        /// Append empty rows for manual entry
        #[arg(long, default_value = "0")]
        add_row: usize,

        /// Print the result as JSON
        #[arg(long)]
        json: bool,
    },

    /// Estimate calories for a food name and weight
    Recalc {
        /// Food name (any language)
        #[arg(short, long)]
        name: String,

        /// Weight in grams
        #[arg(short, long, default_value = "100")]
        weight: f64,
    },

    /// Check the configured AI backend
    Health,

    /// Manage prompt templates
    Prompts {
        #[command(subcommand)]
        action: Option<PromptsAction>,
    },
}

#[derive(Subcommand)]
pub enum PromptsAction {
    /// List all available prompts and their override status
    List,

    /// Show the content of a specific prompt
    Show {
        /// Prompt ID (e.g., analyze_foods, calories_per_100)
        prompt_id: String,
    },

    /// Show the path where prompt overrides should be placed
    Path,
}

/// Parse `ROW=VALUE` where ROW is a 1-based table position
pub fn parse_row_value<T>(s: &str) -> Result<(usize, T), String>
where
    T: FromStr,
    T::Err: Display,
{
    let (row, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected ROW=VALUE, got `{}`", s))?;

    let row: usize = row
        .trim()
        .parse()
        .map_err(|_| format!("invalid row number `{}`", row.trim()))?;
    if row == 0 {
        return Err("rows are numbered from 1".to_string());
    }

    let value = value
        .trim()
        .parse::<T>()
        .map_err(|e| format!("invalid value `{}`: {}", value.trim(), e))?;

    Ok((row, value))
}
