//! Backend health command

use anyhow::Result;

use nutrisnap_core::AIBackend;

use super::open_backend;

pub async fn cmd_health() -> Result<()> {
    let backend = open_backend()?;

    println!("AI backend:");
    println!("   Host:  {}", backend.host());
    println!("   Model: {}", backend.model());

    if backend.health_check().await {
        println!("   ✅ Healthy");
    } else {
        println!("   ❌ Not responding (or upstream key missing on the proxy)");
        println!();
        println!("Analysis will fall back to simulated results until this is fixed.");
    }

    Ok(())
}
