//! Tool safety gate
//!
//! Every step that wants tool access must clear this gate before the engine
//! contacts the model. The engine never bypasses it: YOLO mode skips the
//! confirmation prompt but forbidden patterns still deny.

use async_trait::async_trait;
use regex::Regex;
use tracing::warn;

/// Execution mode for tool-capable steps, owned by the caller and threaded
/// through `run()` rather than read from process-wide state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ToolMode {
    /// Ask the caller before every non-whitelisted action
    #[default]
    Confirm,
    /// Auto-approve anything that is not forbidden
    Yolo,
    /// Tool use is disabled outright
    Forbidden,
}

/// Gate verdict for one requested action
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateDecision {
    Allow,
    Deny(String),
    /// Suspend the step until the caller confirms or refuses
    Ask,
}

/// Trait for the safety-decision component guarding tool actions
pub trait ToolGate: Send + Sync {
    fn decide(&self, action: &str, args: &str, mode: ToolMode) -> GateDecision;
}

/// Caller-supplied confirmation for ASK verdicts
///
/// The engine suspends the asking step on this call; sibling parallel
/// branches keep running.
#[async_trait]
pub trait Confirmer: Send + Sync {
    async fn confirm(&self, action: &str, args: &str) -> bool;
}

/// Confirmer that approves everything, for non-interactive callers
pub struct AutoApprove;

#[async_trait]
impl Confirmer for AutoApprove {
    async fn confirm(&self, _action: &str, _args: &str) -> bool {
        true
    }
}

/// Confirmer that refuses everything
pub struct AutoRefuse;

#[async_trait]
impl Confirmer for AutoRefuse {
    async fn confirm(&self, _action: &str, _args: &str) -> bool {
        false
    }
}

/// Shell-command safety gate with a denylist of patterns and a whitelist of
/// command prefixes
pub struct ShellGate {
    forbidden: Vec<Regex>,
    whitelist: Vec<String>,
}

/// Patterns that are never allowed, regardless of mode
const DEFAULT_FORBIDDEN: &[&str] = &[
    r"rm\s+(-[a-z]*[rf][a-z]*\s+)+/(\s|$)",
    r"mkfs(\.\w+)?\s",
    r"dd\s+if=.*of=/dev/",
    r">\s*/dev/sd[a-z]",
    r"chmod\s+(-R\s+)?777\s+/(\s|$)",
    r":\(\)\s*\{.*\};\s*:",
];

impl ShellGate {
    pub fn new() -> Self {
        let forbidden = DEFAULT_FORBIDDEN
            .iter()
            .filter_map(|p| match Regex::new(p) {
                Ok(re) => Some(re),
                Err(e) => {
                    warn!("Ignoring unparseable forbidden pattern {}: {}", p, e);
                    None
                }
            })
            .collect();

        Self {
            forbidden,
            whitelist: Vec::new(),
        }
    }

    /// Replace the forbidden pattern set
    pub fn with_forbidden(mut self, patterns: &[&str]) -> Self {
        self.forbidden = patterns
            .iter()
            .filter_map(|p| Regex::new(p).ok())
            .collect();
        self
    }

    /// Whitelisted command prefixes skip confirmation in Confirm mode
    pub fn with_whitelist(mut self, commands: Vec<String>) -> Self {
        self.whitelist = commands;
        self
    }

    fn is_forbidden(&self, args: &str) -> Option<&Regex> {
        self.forbidden.iter().find(|re| re.is_match(args))
    }

    fn is_whitelisted(&self, args: &str) -> bool {
        let first_word = args.split_whitespace().next().unwrap_or("");
        self.whitelist
            .iter()
            .any(|w| w == args || w == first_word)
    }
}

impl Default for ShellGate {
    fn default() -> Self {
        Self::new()
    }
}

impl ToolGate for ShellGate {
    fn decide(&self, action: &str, args: &str, mode: ToolMode) -> GateDecision {
        if let Some(pattern) = self.is_forbidden(args) {
            return GateDecision::Deny(format!(
                "{} matches forbidden pattern '{}'",
                action,
                pattern.as_str()
            ));
        }

        match mode {
            ToolMode::Forbidden => GateDecision::Deny("tool use disabled".to_string()),
            ToolMode::Yolo => GateDecision::Allow,
            ToolMode::Confirm => {
                if self.is_whitelisted(args) {
                    GateDecision::Allow
                } else {
                    GateDecision::Ask
                }
            }
        }
    }
}
