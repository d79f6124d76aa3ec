//! Named prompt templates
//!
//! A template is a block of instruction text prepended to the user's
//! prompt. Built-ins ship in the binary; `~/.chorus/templates/*.md`
//! adds or shadows them by file stem.

use std::path::{Path, PathBuf};
use tracing::warn;

const BUILTIN_TEMPLATES: &[(&str, &str)] = &[
    ("explain", include_str!("../templates/explain.md")),
    ("summarize", include_str!("../templates/summarize.md")),
    ("critique", include_str!("../templates/critique.md")),
];

/// Lookup of prompt template text by name
pub struct TemplateStore {
    user_dir: Option<PathBuf>,
}

impl TemplateStore {
    /// Store rooted at `~/.chorus/templates/`
    pub fn new() -> Self {
        let user_dir = dirs::home_dir().map(|home| home.join(".chorus").join("templates"));
        Self { user_dir }
    }

    /// Store with an explicit user directory instead of the home default
    pub fn with_user_dir<P: AsRef<Path>>(dir: P) -> Self {
        Self {
            user_dir: Some(dir.as_ref().to_path_buf()),
        }
    }

    /// Template text for `name`, user file first, then built-ins
    pub fn resolve(&self, name: &str) -> Option<String> {
        if let Some(dir) = self.user_dir.as_ref() {
            let path = dir.join(format!("{name}.md"));
            if path.is_file() {
                match std::fs::read_to_string(&path) {
                    Ok(text) => return Some(text.trim().to_string()),
                    Err(e) => {
                        warn!("Failed to read template {}: {e}", path.display());
                    }
                }
            }
        }

        BUILTIN_TEMPLATES
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, text)| text.trim().to_string())
    }

    /// Template names, built-ins and user files merged, sorted
    pub fn list(&self) -> Vec<String> {
        let mut names: Vec<String> = BUILTIN_TEMPLATES
            .iter()
            .map(|(n, _)| n.to_string())
            .collect();

        if let Some(dir) = self.user_dir.as_ref() {
            if let Ok(entries) = std::fs::read_dir(dir) {
                for entry in entries.flatten() {
                    let path = entry.path();
                    if path.extension().and_then(|e| e.to_str()) == Some("md") {
                        if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                            names.push(stem.to_string());
                        }
                    }
                }
            }
        }

        names.sort();
        names.dedup();
        names
    }

    /// Prepend the named template to `prompt`, separated by a blank line
    pub fn apply(&self, name: &str, prompt: &str) -> Option<String> {
        self.resolve(name)
            .map(|template| format!("{template}\n\n{prompt}"))
    }
}

impl Default for TemplateStore {
    fn default() -> Self {
        Self::new()
    }
}
