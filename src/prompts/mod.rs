use std::collections::HashMap;
use std::path::Path;

use anyhow::{Context, Result};
use tracing::debug;

use crate::error::ConfigError;

/// Template names every agent run depends on.
pub const SUPERVISOR: &str = "supervisor";
pub const AB_TEST: &str = "ab_test";
pub const SEGMENTATION: &str = "segmentation";
pub const GENERAL: &str = "general";

const REQUIRED: &[&str] = &[SUPERVISOR, AB_TEST, SEGMENTATION, GENERAL];

/// Store of named markdown prompt templates with `{name}` substitution.
///
/// All required templates are read once at startup; a missing file is a
/// fatal configuration error, never discovered mid-turn.
#[derive(Debug)]
pub struct PromptStore {
    templates: HashMap<String, String>,
}

impl PromptStore {
    /// Load every required template from `dir` (as `<name>.md`).
    pub fn load(dir: &Path) -> Result<Self, ConfigError> {
        let mut templates = HashMap::new();
        for name in REQUIRED {
            let path = dir.join(format!("{name}.md"));
            if !path.exists() {
                return Err(ConfigError::MissingTemplate(path));
            }
            let text = std::fs::read_to_string(&path)
                .map_err(|source| ConfigError::TemplateRead { path, source })?;
            templates.insert(name.to_string(), text);
        }
        debug!(count = templates.len(), dir = %dir.display(), "loaded prompt templates");
        Ok(Self { templates })
    }

    /// Render a template, substituting each `{key}` placeholder.
    ///
    /// Only the provided keys are substituted; any other braces in the
    /// template (JSON examples and the like) pass through untouched.
    pub fn render(&self, name: &str, vars: &[(&str, &str)]) -> Result<String> {
        let template = self
            .templates
            .get(name)
            .with_context(|| format!("unknown prompt template: {name}"))?;

        let mut rendered = template.clone();
        for (key, value) in vars {
            rendered = rendered.replace(&format!("{{{key}}}"), value);
        }
        Ok(rendered)
    }
}
