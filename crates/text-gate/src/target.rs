//! Target references and execution target selection

use crate::collaborators::TargetManager;
use crate::environment::RunConfiguration;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;

/// Stable, serializable pointer to another run configuration
///
/// A reference without a name is unset; every attempt to execute it fails.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TargetReference {
    /// Configuration type id
    pub config_type: Option<String>,
    /// Configuration name
    pub config_name: Option<String>,
    /// Preferred execution target id
    pub execution_target_id: Option<String>,
}

impl TargetReference {
    /// Reference a configuration by type and name
    pub fn new(config_type: impl Into<String>, config_name: impl Into<String>) -> Self {
        Self {
            config_type: Some(config_type.into()),
            config_name: Some(config_name.into()),
            execution_target_id: None,
        }
    }

    /// Pin an execution target
    pub fn with_target(mut self, target_id: impl Into<String>) -> Self {
        self.execution_target_id = Some(target_id.into());
        self
    }

    /// Whether no configuration is referenced
    pub fn is_unset(&self) -> bool {
        self.config_name.is_none()
    }

    /// Type id and name, when both are present
    pub fn key(&self) -> Option<(&str, &str)> {
        Some((self.config_type.as_deref()?, self.config_name.as_deref()?))
    }

    /// Whether this reference names the given configuration
    pub fn names(&self, configuration: &RunConfiguration) -> bool {
        self.key()
            .is_some_and(|(type_id, name)| configuration.is(type_id, name))
    }
}

impl fmt::Display for TargetReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.config_type, &self.config_name) {
            (_, None) => f.write_str("<unset>"),
            (Some(type_id), Some(name)) => write!(f, "{} ({})", name, type_id),
            (None, Some(name)) => f.write_str(name),
        }
    }
}

/// A place a configuration can run on
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ExecutionTarget {
    /// Target id
    pub id: String,
    /// Whether the target can accept a launch right now
    pub ready: bool,
}

impl ExecutionTarget {
    /// A target that is ready
    pub fn ready(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ready: true,
        }
    }

    /// A target that exists but is not ready
    pub fn not_ready(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ready: false,
        }
    }
}

impl fmt::Display for ExecutionTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.id)
    }
}

/// Pick the execution target for a prerequisite configuration
///
/// Precedence: the explicitly referenced target if it is valid for the
/// configuration, then the requesting environment's target if it can run the
/// configuration, then the first ready target, then the first target at all.
pub fn resolve_execution_target(
    targets: &dyn TargetManager,
    configuration: &RunConfiguration,
    explicit: Option<&str>,
    requesting: Option<&ExecutionTarget>,
) -> Option<ExecutionTarget> {
    if let Some(target) = explicit.and_then(|id| targets.find_target(configuration, id)) {
        debug!(target = %target, "using explicitly referenced target");
        return Some(target);
    }

    if let Some(target) = requesting.filter(|t| targets.can_run(configuration, t)) {
        debug!(target = %target, "reusing requesting environment's target");
        return Some(target.clone());
    }

    let available = targets.targets_for(configuration);
    let chosen = available
        .iter()
        .find(|t| t.ready)
        .or_else(|| available.first())
        .cloned();
    debug!(
        configuration = %configuration,
        candidates = available.len(),
        chosen = ?chosen.as_ref().map(|t| t.id.as_str()),
        "selected target from available targets"
    );
    chosen
}
