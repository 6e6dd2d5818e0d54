//! NutriSnap CLI - Food photo nutrition analyzer
//!
//! Usage:
//!   nutrisnap serve --port 8788                 Start the proxy server
//!   nutrisnap analyze -i lunch.jpg              Analyze a photo
//!   nutrisnap analyze -i lunch.jpg -w 1=120     Analyze, then edit row 1's weight
//!   nutrisnap recalc --name 고구마 --weight 150  Estimate calories by name

mod cli;
mod commands;


use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use cli::*;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up logging
    // Priority: RUST_LOG env var > --verbose flag > default (info)
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).compact())
        .init();

    match cli.command {
        Commands::Serve {
            port,
            host,
            static_dir,
        } => commands::cmd_serve(&host, port, static_dir.as_deref()).await,
        Commands::Analyze {
            images,
            metric,
            weights,
            renames,
            add_row,
            json,
        } => {
            let edits = commands::TableEdits {
                metric,
                add_rows: add_row,
                weights,
                renames,
            };
            commands::cmd_analyze(&images, cli.lang, &edits, json).await
        }
        Commands::Recalc { name, weight } => commands::cmd_recalc(&name, weight, cli.lang).await,
        Commands::Health => commands::cmd_health().await,
        Commands::Prompts { action } => match action {
            None | Some(PromptsAction::List) => commands::cmd_prompts_list(),
            Some(PromptsAction::Show { prompt_id }) => commands::cmd_prompts_show(&prompt_id),
            Some(PromptsAction::Path) => commands::cmd_prompts_path(),
        },
    }
}
