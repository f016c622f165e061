//! Environment variable resolver
//!
//! This module handles resolution of environment variables in command lines:
//! `${VAR}` and `${VAR:-default}`.

use crate::{Config, ConfigError, Result};
use process_launcher::CommandLine;
use regex::{Captures, Regex};
use std::collections::{BTreeSet, HashMap};
use std::path::PathBuf;
use std::sync::LazyLock;

static VAR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$\{([^}]+)\}").expect("variable pattern is valid"));

/// What to do with variables that are neither set nor defaulted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Resolution {
    /// Fail with [`ConfigError::EnvVarNotFound`]
    #[default]
    Strict,
    /// Substitute an empty string
    Lenient,
}

/// Context for resolving variables
#[derive(Debug, Clone, Default)]
pub struct ResolutionContext {
    /// Variables consulted before the process environment
    pub env_vars: HashMap<String, String>,
    /// Whether the process environment is consulted at all
    pub use_process_env: bool,
}

impl ResolutionContext {
    /// A context backed by the process environment
    pub fn new() -> Self {
        Self {
            env_vars: HashMap::new(),
            use_process_env: true,
        }
    }

    /// A context that only knows explicitly set variables
    pub fn isolated() -> Self {
        Self::default()
    }

    /// Add or update a variable
    pub fn set_env(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.env_vars.insert(key.into(), value.into());
    }

    fn lookup(&self, name: &str) -> Option<String> {
        self.env_vars.get(name).cloned().or_else(|| {
            self.use_process_env
                .then(|| std::env::var(name).ok())
                .flatten()
        })
    }
}

/// Split `VAR:-default` into name and default
fn split_default(expr: &str) -> (&str, Option<&str>) {
    match expr.find(":-") {
        Some(pos) => (&expr[..pos], Some(&expr[pos + 2..])),
        None => (expr, None),
    }
}

/// Resolve all variables in a string
pub fn resolve_string(
    input: &str,
    context: &ResolutionContext,
    mode: Resolution,
) -> Result<String> {
    let mut missing = Vec::new();
    let resolved = VAR_RE.replace_all(input, |cap: &Captures<'_>| {
        let (name, default) = split_default(&cap[1]);
        match context.lookup(name).or_else(|| default.map(str::to_string)) {
            Some(value) => value,
            None => {
                missing.push(name.to_string());
                String::new()
            }
        }
    });

    if mode == Resolution::Strict && !missing.is_empty() {
        return Err(ConfigError::EnvVarNotFound(missing.join(", ")));
    }
    Ok(resolved.into_owned())
}

/// Resolve variables in a command's program, arguments, environment values
/// and working directory
pub fn resolve_command(
    command: &CommandLine,
    context: &ResolutionContext,
    mode: Resolution,
) -> Result<CommandLine> {
    let resolve = |s: &str| resolve_string(s, context, mode);

    let mut resolved = CommandLine::new(resolve(&command.program)?);
    for arg in &command.args {
        resolved.args.push(resolve(arg)?);
    }
    for (key, value) in &command.env {
        resolved.env.insert(key.clone(), resolve(value)?);
    }
    if let Some(dir) = &command.working_dir {
        resolved.working_dir = Some(PathBuf::from(resolve(&dir.to_string_lossy())?));
    }
    Ok(resolved)
}

/// Every `${...}` reference in the configuration's commands, as
/// `(variable, default)` pairs
fn command_references(config: &Config) -> Vec<(String, Option<String>)> {
    let mut references = Vec::new();
    for spec in config.configurations.values() {
        let command = &spec.command;
        let dir = command
            .working_dir
            .as_ref()
            .map(|d| d.to_string_lossy().into_owned());
        let values = std::iter::once(command.program.as_str())
            .chain(command.args.iter().map(String::as_str))
            .chain(command.env.values().map(String::as_str))
            .chain(dir.as_deref());
        for value in values {
            for cap in VAR_RE.captures_iter(value) {
                let (var, default) = split_default(&cap[1]);
                references.push((var.to_string(), default.map(str::to_string)));
            }
        }
    }
    references
}

/// Names of every variable referenced by the configuration's commands
pub fn find_all_references(config: &Config) -> BTreeSet<String> {
    command_references(config)
        .into_iter()
        .map(|(name, _)| name)
        .collect()
}

/// Referenced variables that are unset and have no default
pub fn missing_variables(config: &Config, context: &ResolutionContext) -> Vec<String> {
    let references = command_references(config);
    let names: BTreeSet<&str> = references.iter().map(|(name, _)| name.as_str()).collect();
    names
        .into_iter()
        .filter(|name| context.lookup(name).is_none())
        .filter(|name| !has_default_everywhere(&references, name))
        .map(str::to_string)
        .collect()
}

/// Whether every use of `name` carries a `:-` default
fn has_default_everywhere(references: &[(String, Option<String>)], name: &str) -> bool {
    references
        .iter()
        .filter(|(var, _)| var == name)
        .all(|(_, default)| default.is_some())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn context() -> ResolutionContext {
        let mut context = ResolutionContext::isolated();
        context.set_env("TEST_VAR", "test_value");
        context.set_env("PORT", "8080");
        context
    }

    #[test]
    fn test_resolve_env_vars() {
        let ctx = context();
        let resolve = |s| resolve_string(s, &ctx, Resolution::Strict).unwrap();

        assert_eq!(resolve("${TEST_VAR}"), "test_value");
        assert_eq!(resolve("http://localhost:${PORT}"), "http://localhost:8080");
        assert_eq!(resolve("${MISSING:-default}"), "default");
        assert_eq!(resolve("${TEST_VAR:-ignored}"), "test_value");
        assert_eq!(resolve("${PORT}-${PORT}"), "8080-8080");
        assert_eq!(resolve("${MISSING:-}"), "");
    }

    #[test]
    fn test_strict_and_lenient() {
        let ctx = context();
        match resolve_string("${A}/${B}", &ctx, Resolution::Strict) {
            Err(ConfigError::EnvVarNotFound(names)) => assert_eq!(names, "A, B"),
            other => panic!("unexpected: {other:?}"),
        }
        assert_eq!(
            resolve_string("x${A}y", &ctx, Resolution::Lenient).unwrap(),
            "xy"
        );
    }

    #[test]
    fn test_process_env_is_consulted() {
        if let Ok(path) = std::env::var("PATH") {
            let result = resolve_string("${PATH}", &ResolutionContext::new(), Resolution::Strict);
            assert_eq!(result.unwrap(), path);
        }
        assert!(
            resolve_string("${PATH}", &ResolutionContext::isolated(), Resolution::Strict).is_err()
        );
    }

    #[test]
    fn test_resolve_command() {
        let command = CommandLine::new("${TEST_VAR}")
            .arg("--port=${PORT}")
            .env("URL", "http://localhost:${PORT}")
            .working_dir("/srv/${TEST_VAR}");

        let resolved = resolve_command(&command, &context(), Resolution::Strict).unwrap();
        assert_eq!(resolved.program, "test_value");
        assert_eq!(resolved.args, vec!["--port=8080"]);
        assert_eq!(
            resolved.env.get("URL").map(String::as_str),
            Some("http://localhost:8080")
        );
        assert_eq!(
            resolved.working_dir,
            Some(PathBuf::from("/srv/test_value"))
        );
    }

    #[test]
    fn test_find_all_references() {
        let yaml = r#"
version: "1"
configurations:
  api:
    type: command
    command:
      program: "${API_BIN}"
      args: ["--db", "${DB_URL:-postgres://localhost}"]
      env:
        LOG: "${LOG_LEVEL}"
"#;
        let config: Config = serde_yaml::from_str(yaml).unwrap();
        let names = find_all_references(&config);
        assert!(names.contains("API_BIN"));
        assert!(names.contains("DB_URL"));
        assert!(names.contains("LOG_LEVEL"));

        let mut ctx = ResolutionContext::isolated();
        ctx.set_env("API_BIN", "/bin/api");
        assert_eq!(missing_variables(&config, &ctx), vec!["LOG_LEVEL"]);
    }

    #[test]
    fn test_defaulted_working_dir_is_not_missing() {
        let yaml = r#"
version: "1"
configurations:
  api:
    type: command
    command:
      program: api
      working_dir: "${API_HOME:-/srv/api}"
  worker:
    type: command
    command:
      program: worker
      working_dir: "${WORKER_HOME}"
"#;
        let config: Config = serde_yaml::from_str(yaml).unwrap();
        let names = find_all_references(&config);
        assert!(names.contains("API_HOME"));
        assert!(names.contains("WORKER_HOME"));

        let missing = missing_variables(&config, &ResolutionContext::isolated());
        assert_eq!(missing, vec!["WORKER_HOME"]);
    }

    #[test]
    fn test_default_must_be_present_at_every_use() {
        let yaml = r#"
version: "1"
configurations:
  api:
    type: command
    command:
      program: "${BIN:-api}"
      working_dir: "${BIN}"
"#;
        let config: Config = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(
            missing_variables(&config, &ResolutionContext::isolated()),
            vec!["BIN"]
        );
    }
}
