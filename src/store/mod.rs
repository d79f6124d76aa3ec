//! Pipeline definition storage
//!
//! Built-in pipelines ship embedded in the binary; users drop JSON or YAML
//! files into `~/.chorus/pipelines/` to add their own or shadow a built-in
//! of the same name.

use crate::core::{PipelineKind, PipelineSpec};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

const BUILTIN_PIPELINES: &[&str] = &[
    include_str!("../../pipelines/code_review.json"),
    include_str!("../../pipelines/multi_expert.json"),
    include_str!("../../pipelines/best_of_three.json"),
    include_str!("../../pipelines/brainstorm.json"),
];

/// Where a pipeline definition came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineSource {
    Builtin,
    User,
}

impl std::fmt::Display for PipelineSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PipelineSource::Builtin => write!(f, "builtin"),
            PipelineSource::User => write!(f, "user"),
        }
    }
}

/// Listing entry for `chorus list`
#[derive(Debug, Clone)]
pub struct PipelineSummary {
    pub name: String,
    pub description: Option<String>,
    pub kind: PipelineKind,
    pub source: PipelineSource,
}

/// Source of pipeline definitions, keyed by name
pub trait PipelineStore: Send + Sync {
    /// Look a pipeline up by name; user definitions shadow built-ins
    fn resolve(&self, name: &str) -> Option<PipelineSpec>;

    /// All known pipelines, sorted by name
    fn list(&self) -> Vec<PipelineSummary>;
}

/// The default store: embedded built-ins plus an optional user directory
pub struct FilePipelineStore {
    builtins: BTreeMap<String, PipelineSpec>,
    user_dir: Option<PathBuf>,
}

impl FilePipelineStore {
    /// Store rooted at `~/.chorus/pipelines/`
    pub fn new() -> Self {
        let user_dir = dirs::home_dir().map(|home| home.join(".chorus").join("pipelines"));
        Self {
            builtins: load_builtins(),
            user_dir,
        }
    }

    /// Store with an explicit user directory instead of the home default
    pub fn with_user_dir<P: AsRef<Path>>(dir: P) -> Self {
        Self {
            builtins: load_builtins(),
            user_dir: Some(dir.as_ref().to_path_buf()),
        }
    }

    /// Built-ins only, no filesystem lookups
    pub fn builtin_only() -> Self {
        Self {
            builtins: load_builtins(),
            user_dir: None,
        }
    }

    fn resolve_user(&self, name: &str) -> Option<PipelineSpec> {
        let dir = self.user_dir.as_ref()?;
        for ext in ["json", "yaml", "yml"] {
            let path = dir.join(format!("{name}.{ext}"));
            if !path.is_file() {
                continue;
            }
            match PipelineSpec::from_file(&path) {
                Ok(spec) => {
                    debug!("Resolved pipeline '{}' from {}", name, path.display());
                    return Some(spec);
                }
                Err(e) => {
                    warn!("Skipping unreadable pipeline file {}: {e}", path.display());
                }
            }
        }
        None
    }

    fn user_specs(&self) -> Vec<PipelineSpec> {
        let Some(dir) = self.user_dir.as_ref() else {
            return Vec::new();
        };
        let entries = match std::fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(_) => return Vec::new(),
        };

        let mut specs = Vec::new();
        for entry in entries.flatten() {
            let path = entry.path();
            let is_def = matches!(
                path.extension().and_then(|e| e.to_str()),
                Some("json") | Some("yaml") | Some("yml")
            );
            if !path.is_file() || !is_def {
                continue;
            }
            match PipelineSpec::from_file(&path) {
                Ok(spec) => specs.push(spec),
                Err(e) => {
                    warn!("Skipping unreadable pipeline file {}: {e}", path.display());
                }
            }
        }
        specs
    }
}

impl Default for FilePipelineStore {
    fn default() -> Self {
        Self::new()
    }
}

impl PipelineStore for FilePipelineStore {
    fn resolve(&self, name: &str) -> Option<PipelineSpec> {
        self.resolve_user(name)
            .or_else(|| self.builtins.get(name).cloned())
    }

    fn list(&self) -> Vec<PipelineSummary> {
        let mut merged: BTreeMap<String, PipelineSummary> = self
            .builtins
            .values()
            .map(|spec| (spec.name.clone(), summarize(spec, PipelineSource::Builtin)))
            .collect();

        for spec in self.user_specs() {
            merged.insert(spec.name.clone(), summarize(&spec, PipelineSource::User));
        }

        merged.into_values().collect()
    }
}

/// Fixed set of pipelines held in memory, mainly for embedding and tests
#[derive(Default)]
pub struct InMemoryStore {
    pipelines: BTreeMap<String, PipelineSpec>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, spec: PipelineSpec) {
        self.pipelines.insert(spec.name.clone(), spec);
    }
}

impl PipelineStore for InMemoryStore {
    fn resolve(&self, name: &str) -> Option<PipelineSpec> {
        self.pipelines.get(name).cloned()
    }

    fn list(&self) -> Vec<PipelineSummary> {
        self.pipelines
            .values()
            .map(|spec| summarize(spec, PipelineSource::User))
            .collect()
    }
}

fn summarize(spec: &PipelineSpec, source: PipelineSource) -> PipelineSummary {
    PipelineSummary {
        name: spec.name.clone(),
        description: spec.description.clone(),
        kind: spec.kind,
        source,
    }
}

fn load_builtins() -> BTreeMap<String, PipelineSpec> {
    let mut builtins = BTreeMap::new();
    for json in BUILTIN_PIPELINES {
        match PipelineSpec::from_json(json) {
            Ok(spec) => {
                builtins.insert(spec.name.clone(), spec);
            }
            Err(e) => {
                // Embedded definitions are fixed at build time; a parse
                // failure here means a broken release artifact.
                warn!("Ignoring malformed built-in pipeline: {e}");
            }
        }
    }
    builtins
}
