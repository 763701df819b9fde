//! Prompt Loader
//!
//! Loads prompt templates from files or falls back to embedded defaults.

use std::path::{Path, PathBuf};

use eyre::{Result, eyre};
use handlebars::Handlebars;
use serde::Serialize;
use tracing::{debug, info};

use super::embedded;

/// Context for rendering a stage worker's system prompt
#[derive(Debug, Clone, Default, Serialize)]
pub struct StageContext {
    /// The requirement the stage is working on
    pub requirement: String,
    /// Grounding text from earlier stages (absent for the solution stage)
    pub context: Option<String>,
    /// A substantive follow-up question asked after the last analysis
    pub follow_up: Option<String>,
}

/// One label with its meaning, listed in the classification prompt
#[derive(Debug, Clone, Serialize)]
pub struct DecisionHint {
    pub label: &'static str,
    pub meaning: &'static str,
}

/// Context for rendering the classification prompt
#[derive(Debug, Clone, Serialize)]
pub struct ClassifyContext {
    pub decisions: Vec<DecisionHint>,
}

/// Loads and renders prompt templates
pub struct PromptLoader {
    /// Handlebars template engine
    hbs: Handlebars<'static>,
    /// User override directory (e.g., `.archpilot/prompts/`)
    user_dir: Option<PathBuf>,
    /// Repo default directory (e.g., `prompts/`)
    repo_dir: Option<PathBuf>,
}

impl PromptLoader {
    /// Create a new prompt loader rooted at `root`
    ///
    /// Looks for `.archpilot/prompts/` and `prompts/` under `root`.
    pub fn new(root: impl AsRef<Path>) -> Self {
        let root = root.as_ref();
        debug!(root = %root.display(), "PromptLoader::new: called");
        let user_dir = root.join(".archpilot/prompts");
        let repo_dir = root.join("prompts");

        Self {
            hbs: Self::engine(),
            user_dir: if user_dir.exists() { Some(user_dir) } else { None },
            repo_dir: if repo_dir.exists() { Some(repo_dir) } else { None },
        }
    }

    /// Create a loader that only uses embedded prompts
    pub fn embedded_only() -> Self {
        debug!("PromptLoader::embedded_only: called");
        Self {
            hbs: Self::engine(),
            user_dir: None,
            repo_dir: None,
        }
    }

    /// Prompts are plain text for an LLM, never HTML
    fn engine() -> Handlebars<'static> {
        let mut hbs = Handlebars::new();
        hbs.register_escape_fn(handlebars::no_escape);
        hbs
    }

    /// Load a template by name
    ///
    /// Checks in order:
    /// 1. User override: `.archpilot/prompts/{name}.pmt`
    /// 2. Repo default: `prompts/{name}.pmt`
    /// 3. Embedded fallback
    pub fn load_template(&self, name: &str) -> Result<String> {
        debug!(%name, "PromptLoader::load_template: called");
        for dir in [&self.user_dir, &self.repo_dir].into_iter().flatten() {
            let path = dir.join(format!("{}.pmt", name));
            if path.exists() {
                debug!("Loading prompt from override: {:?}", path);
                return std::fs::read_to_string(&path)
                    .map_err(|e| eyre!("Failed to read prompt {}: {}", path.display(), e));
            }
        }

        if let Some(content) = embedded::get_embedded(name) {
            debug!("Using embedded prompt: {}", name);
            return Ok(content.to_string());
        }

        Err(eyre!("Prompt template not found: {}", name))
    }

    /// Render a template with the given context
    pub fn render<T: Serialize>(&self, template_name: &str, context: &T) -> Result<String> {
        let template = self.load_template(template_name)?;
        info!("Rendering template '{}'", template_name);

        self.hbs
            .render_template(&template, context)
            .map_err(|e| eyre!("Failed to render template {}: {}", template_name, e))
    }
}
