//! Prompt template commands

use anyhow::{anyhow, Result};
use nutrisnap_core::prompts::{default_prompts_dir, PromptId, PromptLibrary};

pub fn cmd_prompts_list() -> Result<()> {
    let mut library = PromptLibrary::new();

    println!("📝 Prompt templates");
    println!();
    for info in library.list() {
        let source = match info.override_path {
            Some(ref path) if info.has_override => format!("override at {}", path.display()),
            _ => "built-in".to_string(),
        };
        println!("  {} (v{}, {})", info.id, info.version, info.task_type);
        println!("     {}", source);
    }

    println!();
    match default_prompts_dir() {
        Some(dir) => println!(
            "Drop <id>.md into {} to replace a template (keep the --- frontmatter).",
            dir.display()
        ),
        None => println!("No data directory on this system; only built-in templates are used."),
    }

    Ok(())
}

/// Print one template, split into its system and user parts
pub fn cmd_prompts_show(prompt_id: &str) -> Result<()> {
    let id: PromptId = prompt_id.parse().map_err(|_| {
        let known: Vec<&str> = PromptId::all().iter().map(PromptId::as_str).collect();
        anyhow!(
            "Unknown prompt `{}` (known: {})",
            prompt_id,
            known.join(", ")
        )
    })?;

    let mut library = PromptLibrary::new();
    let prompt = library.get(id)?;

    println!(
        "📝 {} v{} [{}]{}",
        prompt.metadata.id,
        prompt.metadata.version,
        prompt.metadata.task_type,
        if prompt.is_override { " (override)" } else { "" }
    );

    match (prompt.system_section(), prompt.user_section()) {
        (system, Some(user)) => {
            if let Some(system) = system {
                println!();
                println!("[system]");
                println!("{}", system.trim());
            }
            println!();
            println!("[user]");
            println!("{}", user.trim());
        }
        _ => {
            println!();
            println!("{}", prompt.content.trim());
        }
    }

    Ok(())
}

pub fn cmd_prompts_path() -> Result<()> {
    let dir = default_prompts_dir()
        .ok_or_else(|| anyhow!("No data directory available for prompt overrides"))?;

    println!("{}", dir.display());
    if !dir.exists() {
        eprintln!("(not created yet)");
    }
    Ok(())
}
