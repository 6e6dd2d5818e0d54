//! Server command implementation

use std::path::Path;

use anyhow::{Context, Result};

pub async fn cmd_serve(host: &str, port: u16, static_dir: Option<&Path>) -> Result<()> {
    println!("🚀 Starting NutriSnap proxy server...");
    println!("   Listening: http://{}:{}", host, port);
    if let Some(dir) = static_dir {
        println!("   Static files: {}", dir.display());
    }

    let config = nutrisnap_server::ServerConfig::from_env();
    if !config.allowed_origins.is_empty() {
        println!(
            "   🌐 Allowed origins: {} (NUTRISNAP_ALLOWED_ORIGINS)",
            config.allowed_origins.join(", ")
        );
    }
    if std::env::var("GEMINI_API_KEY").map_or(true, |k| k.trim().is_empty()) {
        println!();
        println!("   ⚠️  GEMINI_API_KEY not set - analyze/recalculate will answer 500");
    }
    println!();
    println!("   Press Ctrl+C to stop");

    let static_dir_str = static_dir
        .map(|p| p.to_str().context("static_dir path must be valid UTF-8"))
        .transpose()?;
    nutrisnap_server::serve_with_config(host, port, static_dir_str, config).await?;

    Ok(())
}
