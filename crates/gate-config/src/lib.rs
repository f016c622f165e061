//! # Launch Gate Configuration
//!
//! YAML configuration parser for launch-gate.
//!
//! A configuration file declares execution targets and run configurations,
//! each with the before-launch tasks that gate it. This crate parses and
//! validates such files and turns them into the in-memory registry and target
//! manager used by `text-gate`.

#![warn(missing_docs)]

use indexmap::IndexMap;
use process_launcher::CommandLine;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

pub mod convert;
pub mod parser;
pub mod resolver;

pub use convert::{Workspace, build_workspace};
pub use parser::{parse_file, parse_str};
pub use resolver::{Resolution, ResolutionContext};

/// The only supported configuration version
pub const CONFIG_VERSION: &str = "1";

/// Configuration type id of dependent run configurations
pub const DEPENDENT_TYPE: &str = "dependent";

/// Task kind of text-condition before-launch tasks
pub const TEXT_CONDITION_KIND: &str = "text-condition";

/// Configuration error types
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read configuration file
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    /// Failed to parse YAML
    #[error("Failed to parse YAML: {0}")]
    YamlError(#[from] serde_yaml::Error),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    ValidationError(String),

    /// Environment variable not found
    #[error("Environment variable not found: {0}")]
    EnvVarNotFound(String),
}

/// Result type for configuration operations
pub type Result<T> = std::result::Result<T, ConfigError>;

/// Root configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Configuration version
    pub version: String,

    /// Optional project name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Optional description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Global settings
    #[serde(default, skip_serializing_if = "Settings::is_default")]
    pub settings: Settings,

    /// Execution targets, in enumeration order
    #[serde(default)]
    pub targets: Vec<TargetSpec>,

    /// Run configurations by name, in declaration order
    pub configurations: IndexMap<String, ConfigurationSpec>,
}

/// Global settings
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct Settings {
    /// Default log level
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_level: Option<String>,

    /// Default executor for launches
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub executor: Option<String>,
}

impl Settings {
    /// Check if settings are default (all None)
    fn is_default(&self) -> bool {
        self == &Settings::default()
    }
}

/// Execution target definition
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TargetSpec {
    /// Target id
    pub id: String,
    /// Whether the target accepts launches right now
    #[serde(default = "default_ready")]
    pub ready: bool,
}

/// Run configuration definition
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigurationSpec {
    /// Configuration type id
    #[serde(rename = "type")]
    pub type_id: String,

    /// What to start
    #[serde(default)]
    pub command: CommandLine,

    /// Allowed target ids; all targets when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub targets: Option<Vec<String>>,

    /// Supported executors; only `run` when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub executors: Option<Vec<String>>,

    /// Start under the run executor when used as a prerequisite
    #[serde(default)]
    pub use_run_executor: bool,

    /// Before-launch tasks, in execution order
    #[serde(default)]
    pub before_launch: Vec<TaskSpec>,

    /// Prerequisite of a dependent configuration, as task attributes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub depends_on: Option<BTreeMap<String, String>>,
}

impl ConfigurationSpec {
    /// Whether this is a dependent run configuration
    pub fn is_dependent(&self) -> bool {
        self.type_id == DEPENDENT_TYPE
    }
}

/// Before-launch task definition: a kind plus the task's persisted attributes
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TaskSpec {
    /// Task kind
    pub kind: String,

    /// Flat task attributes
    #[serde(flatten)]
    pub attributes: BTreeMap<String, String>,
}

fn default_ready() -> bool {
    true
}
