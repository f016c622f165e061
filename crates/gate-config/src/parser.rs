//! Configuration parser and validation

use crate::{CONFIG_VERSION, Config, ConfigError, ConfigurationSpec, Result, TEXT_CONDITION_KIND};
use std::collections::{BTreeMap, HashSet};
use std::path::Path;
use text_gate::{Executor, MatchMode, task};
use tracing::{debug, warn};

/// Parse a YAML configuration file
pub fn parse_file(path: impl AsRef<Path>) -> Result<Config> {
    let path = path.as_ref();
    debug!(path = %path.display(), "reading configuration");
    let content = std::fs::read_to_string(path)?;
    parse_str(&content)
}

/// Parse YAML configuration from a string
///
/// Hard errors fail the parse; warnings are logged.
pub fn parse_str(content: &str) -> Result<Config> {
    let config: Config = serde_yaml::from_str(content)?;
    for warning in validate(&config)? {
        warn!("{warning}");
    }
    Ok(config)
}

/// Validate a parsed configuration
///
/// Returns the warnings for problems that only matter at launch time, such as
/// a before-launch task naming a configuration that is not declared.
pub fn validate(config: &Config) -> Result<Vec<String>> {
    let mut warnings = Vec::new();

    if config.version != CONFIG_VERSION {
        return invalid(format!(
            "Unsupported version: {}, expected {}",
            config.version, CONFIG_VERSION
        ));
    }

    let mut target_ids = HashSet::new();
    for target in &config.targets {
        if !target_ids.insert(target.id.as_str()) {
            return invalid(format!("Duplicate target id '{}'", target.id));
        }
    }

    if let Some(executor) = &config.settings.executor {
        check_executor("settings", executor)?;
    }

    for (name, spec) in &config.configurations {
        if spec.command.program.trim().is_empty() {
            return invalid(format!("Configuration '{name}' has an empty program"));
        }

        for id in spec.targets.iter().flatten() {
            if !target_ids.contains(id.as_str()) {
                return invalid(format!(
                    "Configuration '{name}' references unknown target '{id}'"
                ));
            }
        }

        for executor in spec.executors.iter().flatten() {
            check_executor(name, executor)?;
        }

        match (&spec.depends_on, spec.is_dependent()) {
            (None, true) => {
                return invalid(format!(
                    "Dependent configuration '{name}' has no depends_on"
                ));
            }
            (Some(_), false) => {
                return invalid(format!(
                    "Configuration '{name}' of type '{}' cannot use depends_on",
                    spec.type_id
                ));
            }
            _ => {}
        }

        if let Some(attributes) = &spec.depends_on {
            check_task(config, name, spec, "depends_on", attributes, &mut warnings)?;
        }

        for (index, task) in spec.before_launch.iter().enumerate() {
            if task.kind != TEXT_CONDITION_KIND {
                return invalid(format!(
                    "Configuration '{name}' before_launch[{index}] has unknown kind '{}'",
                    task.kind
                ));
            }
            let location = format!("before_launch[{index}]");
            check_task(config, name, spec, &location, &task.attributes, &mut warnings)?;
        }
    }

    Ok(warnings)
}

fn invalid<T>(message: String) -> Result<T> {
    Err(ConfigError::ValidationError(message))
}

fn check_executor(owner: &str, executor: &str) -> Result<()> {
    if [Executor::RUN, Executor::DEBUG].contains(&executor) {
        Ok(())
    } else {
        invalid(format!("'{owner}' names unknown executor '{executor}'"))
    }
}

fn check_task(
    config: &Config,
    name: &str,
    spec: &ConfigurationSpec,
    location: &str,
    attributes: &BTreeMap<String, String>,
    warnings: &mut Vec<String>,
) -> Result<()> {
    let referenced_type = attributes.get(task::ATTR_TYPE);
    let referenced_name = attributes.get(task::ATTR_NAME);

    match (referenced_type, referenced_name) {
        (Some(type_id), Some(target)) => {
            if type_id == &spec.type_id && target == name {
                return invalid(format!(
                    "Configuration '{name}' {location} references itself"
                ));
            }
            let declared = config
                .configurations
                .get(target)
                .is_some_and(|other| &other.type_id == type_id);
            if !declared {
                warnings.push(format!(
                    "Configuration '{name}' {location} references unknown configuration '{target}' ({type_id})"
                ));
            }
        }
        _ => warnings.push(format!(
            "Configuration '{name}' {location} does not name a configuration"
        )),
    }

    let unknown_target = attributes
        .get(task::ATTR_TARGET)
        .filter(|id| !config.targets.iter().any(|t| &t.id == *id));
    if let Some(target_id) = unknown_target {
        warnings.push(format!(
            "Configuration '{name}' {location} prefers unknown target '{target_id}'"
        ));
    }

    match attributes.get(task::ATTR_CONDITION) {
        Some(tag) if MatchMode::from_tag(tag).is_none() => warnings.push(format!(
            "Configuration '{name}' {location} has unknown trigger condition '{tag}'"
        )),
        None => warnings.push(format!(
            "Configuration '{name}' {location} has no trigger condition and will never match"
        )),
        _ => {}
    }

    Ok(())
}
