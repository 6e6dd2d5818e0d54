//! Prompt library
//!
//! Prompts resolve in two layers:
//! 1. An override file in the data dir (`~/.local/share/nutrisnap/prompts/overrides/<id>.md`)
//! 2. The default compiled into the binary
//!
//! Each prompt is markdown with YAML frontmatter (`id`, `version`, `task_type`)
//! and `# System` / `# User` sections. Templates use `{{var}}` substitution and
//! `{{#if var}}...{{/if}}` blocks.

use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;

use serde::Deserialize;

use crate::error::{Error, Result};

mod defaults {
    pub const ANALYZE_FOODS: &str = include_str!("../../../prompts/analyze_foods.md");
    pub const CALORIES_PER_100: &str = include_str!("../../../prompts/calories_per_100.md");
    pub const CALORIES_PER_100_BILINGUAL: &str =
        include_str!("../../../prompts/calories_per_100_bilingual.md");
}

/// Known prompt IDs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PromptId {
    /// Photo analysis returning `{foods, brands}`
    AnalyzeFoods,
    /// Name lookup returning a bare calories-per-100 number
    CaloriesPer100,
    /// Name lookup returning `{nameKo, nameEn, caloriesPer100g}`
    CaloriesPer100Bilingual,
}

impl PromptId {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AnalyzeFoods => "analyze_foods",
            Self::CaloriesPer100 => "calories_per_100",
            Self::CaloriesPer100Bilingual => "calories_per_100_bilingual",
        }
    }

    pub fn all() -> &'static [PromptId] {
        &[
            Self::AnalyzeFoods,
            Self::CaloriesPer100,
            Self::CaloriesPer100Bilingual,
        ]
    }

    fn default_content(&self) -> &'static str {
        match self {
            Self::AnalyzeFoods => defaults::ANALYZE_FOODS,
            Self::CaloriesPer100 => defaults::CALORIES_PER_100,
            Self::CaloriesPer100Bilingual => defaults::CALORIES_PER_100_BILINGUAL,
        }
    }
}

impl std::str::FromStr for PromptId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::all()
            .iter()
            .copied()
            .find(|id| id.as_str() == s)
            .ok_or_else(|| Error::NotFound(format!("Unknown prompt: {}", s)))
    }
}

/// Prompt frontmatter metadata
#[derive(Debug, Clone, Deserialize)]
pub struct PromptMetadata {
    pub id: String,
    pub version: u32,
    pub task_type: String,
}

/// A loaded prompt with metadata and content
#[derive(Debug, Clone)]
pub struct Prompt {
    pub metadata: PromptMetadata,
    /// Body after the frontmatter (system + user sections)
    pub content: String,
    pub is_override: bool,
    pub override_path: Option<PathBuf>,
}

impl Prompt {
    pub fn system_section(&self) -> Option<&str> {
        extract_section(&self.content, "# System")
    }

    pub fn user_section(&self) -> Option<&str> {
        extract_section(&self.content, "# User")
    }

    /// Render the whole body with variables substituted
    pub fn render(&self, vars: &HashMap<&str, &str>) -> String {
        render_template(&self.content, vars)
    }

    /// Render the user section, or the whole body if it has none
    pub fn render_user(&self, vars: &HashMap<&str, &str>) -> String {
        match self.user_section() {
            Some(user) => render_template(user, vars),
            None => self.render(vars),
        }
    }
}

/// Prompt library with a per-id cache
pub struct PromptLibrary {
    override_dir: Option<PathBuf>,
    cache: HashMap<PromptId, Prompt>,
}

impl PromptLibrary {
    /// Library using the default override directory
    pub fn new() -> Self {
        Self {
            override_dir: default_prompts_dir(),
            cache: HashMap::new(),
        }
    }

    pub fn with_override_dir(path: PathBuf) -> Self {
        Self {
            override_dir: Some(path),
            cache: HashMap::new(),
        }
    }

    /// Library that ignores overrides
    pub fn embedded_only() -> Self {
        Self {
            override_dir: None,
            cache: HashMap::new(),
        }
    }

    /// Get a prompt, loading it on first use
    pub fn get(&mut self, id: PromptId) -> Result<&Prompt> {
        if !self.cache.contains_key(&id) {
            let prompt = self.load(id)?;
            self.cache.insert(id, prompt);
        }
        self.cache
            .get(&id)
            .ok_or_else(|| Error::NotFound(format!("Prompt {} not cached", id.as_str())))
    }

    fn load(&self, id: PromptId) -> Result<Prompt> {
        if let Some(override_path) = self.override_path(id).filter(|p| p.exists()) {
            let content = fs::read_to_string(&override_path).map_err(|e| {
                Error::InvalidData(format!("Failed to read prompt override: {}", e))
            })?;
            let (metadata, body) = parse_prompt(&content)?;
            return Ok(Prompt {
                metadata,
                content: body,
                is_override: true,
                override_path: Some(override_path),
            });
        }

        let (metadata, body) = parse_prompt(id.default_content())?;
        Ok(Prompt {
            metadata,
            content: body,
            is_override: false,
            override_path: None,
        })
    }

    /// List all prompts with their override status
    pub fn list(&mut self) -> Vec<PromptInfo> {
        PromptId::all()
            .iter()
            .map(|&id| {
                let has_override = self.has_override(id);
                let override_path = if has_override {
                    self.override_path(id)
                } else {
                    None
                };
                let prompt = self.get(id).ok();
                PromptInfo {
                    id: id.as_str().to_string(),
                    version: prompt.map(|p| p.metadata.version).unwrap_or(0),
                    task_type: prompt
                        .map(|p| p.metadata.task_type.clone())
                        .unwrap_or_default(),
                    has_override,
                    override_path,
                }
            })
            .collect()
    }

    pub fn has_override(&self, id: PromptId) -> bool {
        self.override_path(id).is_some_and(|p| p.exists())
    }

    fn override_path(&self, id: PromptId) -> Option<PathBuf> {
        self.override_dir
            .as_ref()
            .map(|dir| dir.join(format!("{}.md", id.as_str())))
    }

    pub fn override_dir(&self) -> Option<&PathBuf> {
        self.override_dir.as_ref()
    }

    /// Drop cached prompts so edited overrides are picked up
    pub fn clear_cache(&mut self) {
        self.cache.clear();
    }
}

impl Default for PromptLibrary {
    fn default() -> Self {
        Self::new()
    }
}

/// Prompt summary for listing
#[derive(Debug, Clone)]
pub struct PromptInfo {
    pub id: String,
    pub version: u32,
    pub task_type: String,
    pub has_override: bool,
    pub override_path: Option<PathBuf>,
}

/// Default prompts override directory
pub fn default_prompts_dir() -> Option<PathBuf> {
    dirs::data_local_dir().map(|d| d.join("nutrisnap").join("prompts").join("overrides"))
}

fn parse_prompt(content: &str) -> Result<(PromptMetadata, String)> {
    let content = content.trim();

    let rest = content.strip_prefix("---").ok_or_else(|| {
        Error::InvalidData("Prompt must start with YAML frontmatter (---)".into())
    })?;
    let end = rest.find("---").ok_or_else(|| {
        Error::InvalidData("Prompt frontmatter not closed (missing second ---)".into())
    })?;

    let frontmatter = rest[..end].trim();
    let body = rest[end + 3..].trim();

    let metadata: PromptMetadata = serde_yaml::from_str(frontmatter)
        .map_err(|e| Error::InvalidData(format!("Invalid prompt frontmatter: {}", e)))?;

    Ok((metadata, body.to_string()))
}

fn extract_section<'a>(content: &'a str, header: &str) -> Option<&'a str> {
    let start = content.find(header)?;
    let after_header = &content[start + header.len()..];
    let end = after_header.find("\n# ").unwrap_or(after_header.len());
    Some(after_header[..end].trim())
}

fn render_template(template: &str, vars: &HashMap<&str, &str>) -> String {
    let mut result = template.to_string();
    for (key, value) in vars {
        let pattern = format!("{{{{{}}}}}", key);
        result = result.replace(&pattern, value);
    }
    resolve_conditionals(&result, vars)
}

/// Keep `{{#if var}}` blocks whose variable is non-empty, drop the rest
fn resolve_conditionals(content: &str, vars: &HashMap<&str, &str>) -> String {
    let mut result = content.to_string();

    while let Some(if_start) = result.find("{{#if ") {
        let var_start = if_start + 6;
        let Some(var_end) = result[var_start..].find("}}") else {
            break;
        };
        let var_name = result[var_start..var_start + var_end].trim().to_string();
        let block_start = var_start + var_end + 2;
        let Some(endif_pos) = result[block_start..].find("{{/if}}") else {
            break;
        };
        let block_end = block_start + endif_pos;
        let full_end = block_end + 7;

        let keep = vars.get(var_name.as_str()).is_some_and(|v| !v.is_empty());
        let replacement = if keep {
            result[block_start..block_end].to_string()
        } else {
            String::new()
        };
        result = format!("{}{}{}", &result[..if_start], replacement, &result[full_end..]);
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_prompt() {
        let content = r#"---
id: test_prompt
version: 2
task_type: vision
---

# System
Test system prompt.

# User
Test user prompt with {{variable}}.
"#;

        let (metadata, body) = parse_prompt(content).unwrap();
        assert_eq!(metadata.id, "test_prompt");
        assert_eq!(metadata.version, 2);
        assert_eq!(metadata.task_type, "vision");
        assert!(body.starts_with("# System"));
        assert_eq!(extract_section(&body, "# User"), Some("Test user prompt with {{variable}}."));
    }

    #[test]
    fn test_parse_prompt_requires_frontmatter() {
        assert!(parse_prompt("# User\nhello").is_err());
        assert!(parse_prompt("---\nid: x\n# User\nhello").is_err());
    }

    #[test]
    fn test_conditional_blocks() {
        let content = "Start{{#if unit}} per {{unit}}{{/if}}\nEnd";

        let mut vars = HashMap::new();
        vars.insert("unit", "ml");
        assert_eq!(render_template(content, &vars), "Start per ml\nEnd");

        let empty: HashMap<&str, &str> = HashMap::new();
        assert_eq!(render_template(content, &empty), "Start\nEnd");
    }

    #[test]
    fn test_embedded_prompts_parse_with_matching_ids() {
        let mut lib = PromptLibrary::embedded_only();
        for id in PromptId::all() {
            let prompt = lib.get(*id).unwrap();
            assert_eq!(prompt.metadata.id, id.as_str());
            assert!(!prompt.is_override);
            assert!(prompt.user_section().is_some(), "{} has no user section", id.as_str());
        }
    }

    #[test]
    fn test_render_recalculation_prompt() {
        let mut lib = PromptLibrary::embedded_only();
        let prompt = lib.get(PromptId::CaloriesPer100).unwrap();
        let mut vars = HashMap::new();
        vars.insert("name", "현미밥");
        let text = prompt.render_user(&vars);
        assert!(text.contains("100g of the food \"현미밥\""));
        assert!(!text.contains("{{"));
    }

    #[test]
    fn test_override_wins() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("calories_per_100.md"),
            "---\nid: calories_per_100\nversion: 9\ntask_type: custom\n---\n# User\nHow many kcal in {{name}}?",
        )
        .unwrap();

        let mut lib = PromptLibrary::with_override_dir(dir.path().to_path_buf());
        assert!(lib.has_override(PromptId::CaloriesPer100));
        assert!(!lib.has_override(PromptId::AnalyzeFoods));

        let prompt = lib.get(PromptId::CaloriesPer100).unwrap();
        assert!(prompt.is_override);
        assert_eq!(prompt.metadata.version, 9);

        let listed = lib.list();
        assert_eq!(listed.len(), 3);
        let entry = listed.iter().find(|p| p.id == "calories_per_100").unwrap();
        assert!(entry.has_override);
        assert!(entry.override_path.is_some());
    }

    #[test]
    fn test_prompt_id_from_str() {
        assert_eq!(
            "analyze_foods".parse::<PromptId>().unwrap(),
            PromptId::AnalyzeFoods
        );
        assert!("classify_merchant".parse::<PromptId>().is_err());
    }
}
