//! Before-launch text condition tasks and their persisted form

use crate::collaborators::{ConfigurationRegistry, ProgramRunner};
use crate::environment::{Executor, RunConfiguration};
use crate::matcher::MatchMode;
use crate::target::{ExecutionTarget, TargetReference};
use crate::trigger::TriggerSpec;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, Mutex, Weak};
use tracing::warn;

/// Flat string attributes a task is persisted as
pub type Attributes = BTreeMap<String, String>;

/// Attribute holding the referenced configuration's type id
pub const ATTR_TYPE: &str = "run_configuration_type";
/// Attribute holding the referenced configuration's name
pub const ATTR_NAME: &str = "run_configuration_name";
/// Attribute holding the preferred execution target id
pub const ATTR_TARGET: &str = "run_configuration_target";
/// Attribute holding the match mode tag
pub const ATTR_CONDITION: &str = "trigger_condition";
/// Attribute holding the trigger text
pub const ATTR_TEXT: &str = "trigger_text";

/// What to do when the referenced configuration cannot be found
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum MissingTargetPolicy {
    /// Fail the task, stopping the launch sequence
    #[default]
    Abort,
    /// Treat the task as passed so a stale reference does not block launches
    Skip,
}

/// "Launch another configuration and wait for its output" step
pub struct TextConditionTask {
    reference: TargetReference,
    trigger: TriggerSpec,
    policy: MissingTargetPolicy,
    resolved: Mutex<Option<Weak<RunConfiguration>>>,
}

impl TextConditionTask {
    /// A task for the referenced configuration
    pub fn new(reference: TargetReference, trigger: TriggerSpec) -> Self {
        Self {
            reference,
            trigger,
            policy: MissingTargetPolicy::Abort,
            resolved: Mutex::new(None),
        }
    }

    /// Set the missing-target policy
    pub fn with_policy(mut self, policy: MissingTargetPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Load a task from its persisted attributes
    ///
    /// Absent attributes stay unset. An unrecognised condition tag is kept as
    /// "no mode", which never matches.
    pub fn from_attributes(attributes: &Attributes) -> Self {
        let get = |key: &str| attributes.get(key).cloned();
        let reference = TargetReference {
            config_type: get(ATTR_TYPE),
            config_name: get(ATTR_NAME),
            execution_target_id: get(ATTR_TARGET),
        };

        let mode = attributes.get(ATTR_CONDITION).and_then(|tag| {
            let mode = MatchMode::from_tag(tag);
            if mode.is_none() {
                warn!(tag = %tag, "ignoring unknown trigger condition");
            }
            mode
        });
        let trigger = TriggerSpec {
            mode,
            text: get(ATTR_TEXT).unwrap_or_default(),
        };
        Self::new(reference, trigger)
    }

    /// Persist the task; unset fields are omitted, the text always written
    pub fn to_attributes(&self) -> Attributes {
        let mut attributes = Attributes::new();
        let reference = &self.reference;
        for (key, value) in [
            (ATTR_TYPE, &reference.config_type),
            (ATTR_NAME, &reference.config_name),
            (ATTR_TARGET, &reference.execution_target_id),
        ] {
            if let Some(value) = value {
                attributes.insert(key.to_string(), value.clone());
            }
        }
        if let Some(mode) = self.trigger.mode {
            attributes.insert(ATTR_CONDITION.to_string(), mode.tag().to_string());
        }
        attributes.insert(ATTR_TEXT.to_string(), self.trigger.text.clone());
        attributes
    }

    /// The persisted reference
    pub fn reference(&self) -> &TargetReference {
        &self.reference
    }

    /// The trigger
    pub fn trigger(&self) -> &TriggerSpec {
        &self.trigger
    }

    /// The missing-target policy
    pub fn policy(&self) -> MissingTargetPolicy {
        self.policy
    }

    /// Resolve the referenced configuration
    ///
    /// The result is cached weakly: once the configuration is dropped from
    /// the registry the next call looks it up again, and a configuration that
    /// appears later is picked up.
    pub fn resolve(&self, registry: &dyn ConfigurationRegistry) -> Option<Arc<RunConfiguration>> {
        let mut resolved = self.resolved.lock().unwrap();
        if let Some(configuration) = resolved.as_ref().and_then(Weak::upgrade) {
            return Some(configuration);
        }
        let (type_id, name) = self.reference.key()?;
        let configuration = registry.find(type_id, name)?;
        *resolved = Some(Arc::downgrade(&configuration));
        Some(configuration)
    }

    /// Point the task at a configuration, or clear it with `None`
    pub fn set_target(
        &mut self,
        configuration: Option<&Arc<RunConfiguration>>,
        target: Option<&ExecutionTarget>,
    ) {
        let resolved = self.resolved.get_mut().unwrap();
        match configuration {
            Some(configuration) => {
                self.reference = TargetReference {
                    config_type: Some(configuration.type_id.clone()),
                    config_name: Some(configuration.name.clone()),
                    execution_target_id: target.map(|t| t.id.clone()),
                };
                *resolved = Some(Arc::downgrade(configuration));
            }
            None => {
                self.reference = TargetReference::default();
                *resolved = None;
            }
        }
    }

    /// Whether the task refers to the configuration, without a registry lookup
    pub fn refers_to(&self, configuration: &Arc<RunConfiguration>) -> bool {
        let bound = self.resolved.lock().unwrap().as_ref().and_then(Weak::upgrade);
        match bound {
            Some(bound) => Arc::ptr_eq(&bound, configuration),
            None => self.reference.names(configuration),
        }
    }

    /// Short text for task lists
    pub fn describe(&self, registry: &dyn ConfigurationRegistry) -> String {
        if self.reference.is_unset() {
            return "Run another configuration".to_string();
        }
        match self.resolve(registry) {
            None => "Configuration not found".to_string(),
            Some(configuration) => match &self.reference.execution_target_id {
                Some(target) => format!("Run {} on {}", configuration.name, target),
                None => format!("Run {}", configuration.name),
            },
        }
    }

    /// Whether the task could run: the configuration resolves and is runnable
    /// with the run executor
    pub fn can_execute(
        &self,
        registry: &dyn ConfigurationRegistry,
        runner: &dyn ProgramRunner,
    ) -> bool {
        self.resolve(registry)
            .is_some_and(|configuration| runner.can_run(&Executor::run(), &configuration))
    }
}

impl Default for TextConditionTask {
    fn default() -> Self {
        Self::new(TargetReference::default(), TriggerSpec::default())
    }
}

impl Clone for TextConditionTask {
    fn clone(&self) -> Self {
        Self {
            reference: self.reference.clone(),
            trigger: self.trigger.clone(),
            policy: self.policy,
            resolved: Mutex::new(self.resolved.lock().unwrap().clone()),
        }
    }
}

impl fmt::Debug for TextConditionTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TextConditionTask")
            .field("reference", &self.reference)
            .field("trigger", &self.trigger)
            .field("policy", &self.policy)
            .finish()
    }
}

/// Configurations a task could be pointed at
///
/// Every registered configuration other than `exclude` that the runner can
/// start with the run executor, in registration order.
pub fn available_configurations(
    registry: &dyn ConfigurationRegistry,
    runner: &dyn ProgramRunner,
    exclude: Option<&RunConfiguration>,
) -> Vec<Arc<RunConfiguration>> {
    let run = Executor::run();
    registry
        .all()
        .into_iter()
        .filter(|c| !exclude.is_some_and(|e| c.is(&e.type_id, &e.name)))
        .filter(|c| runner.can_run(&run, c))
        .collect()
}
