//!
//! Pre-flight validation of a (state, event, charm spec, controller version)
//! request. Every check always runs; their diagnostics are collected and
//! raised together so a caller sees every problem in one go.
//!

use crate::{
    log,
    log::Topic,
    model::{
        CharmSpec, Event, JujuVersion, State,
        event::normalize_name,
        state::ConfigValue,
    },
};
use std::{
    collections::BTreeSet,
    panic::{AssertUnwindSafe, catch_unwind},
};
use thiserror::Error as ThisError;

///
/// InconsistentState
///

#[derive(Debug, ThisError)]
#[error("inconsistent scenario: {}", .diagnostics.join("; "))]
pub struct InconsistentState {
    diagnostics: Vec<String>,
}

impl InconsistentState {
    #[must_use]
    pub fn diagnostics(&self) -> &[String] {
        &self.diagnostics
    }
}

///
/// ConfigKind
/// the option types a `config.yaml` may declare
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ConfigKind {
    Boolean,
    Integer,
    Number,
    String,
    /// Declared upstream but without a defined conversion; never accepted.
    Attrs,
}

impl ConfigKind {
    #[must_use]
    pub fn parse(kind: &str) -> Option<Self> {
        match kind {
            "string" => Some(Self::String),
            "int" | "integer" => Some(Self::Integer),
            "number" => Some(Self::Number),
            "boolean" => Some(Self::Boolean),
            "attrs" => Some(Self::Attrs),
            _ => None,
        }
    }

    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Boolean => "boolean",
            Self::Integer => "integer",
            Self::Number => "number",
            Self::String => "string",
            Self::Attrs => "attrs",
        }
    }

    /// Strict: no coercion between kinds.
    #[must_use]
    pub const fn accepts(self, value: &ConfigValue) -> bool {
        matches!(
            (self, value),
            (Self::Boolean, ConfigValue::Bool(_))
                | (Self::Integer, ConfigValue::Int(_))
                | (Self::Number, ConfigValue::Float(_))
                | (Self::String, ConfigValue::String(_))
        )
    }
}

///
/// ConsistencyChecker
///

pub struct ConsistencyChecker<'a, C> {
    state: &'a State,
    event: &'a Event,
    spec: &'a CharmSpec<C>,
    juju_version: &'a str,
}

impl<'a, C> ConsistencyChecker<'a, C> {
    #[must_use]
    pub const fn new(
        state: &'a State,
        event: &'a Event,
        spec: &'a CharmSpec<C>,
        juju_version: &'a str,
    ) -> Self {
        Self {
            state,
            event,
            spec,
            juju_version,
        }
    }

    pub fn run(&self) -> Result<(), InconsistentState> {
        let diagnostics = self.diagnostics();

        if diagnostics.is_empty() {
            return Ok(());
        }

        log!(
            Topic::Consistency,
            Error,
            "inconsistent scenario, the following errors were found: {}",
            diagnostics.join("\n")
        );

        Err(InconsistentState { diagnostics })
    }

    /// Run every check and collect what they report.
    #[must_use]
    pub fn diagnostics(&self) -> Vec<String> {
        let checks: [(&str, fn(&Self) -> Result<Vec<String>, String>); 4] = [
            ("containers", Self::check_containers),
            ("config", Self::check_config),
            ("event", Self::check_event),
            ("secrets", Self::check_secrets),
        ];

        let mut diagnostics = Vec::new();
        for (name, check) in checks {
            match catch_unwind(AssertUnwindSafe(|| check(self))) {
                Ok(Ok(found)) => diagnostics.extend(found),
                Ok(Err(err)) => {
                    log!(Topic::Consistency, Error, "check '{name}' failed: {err}");
                    diagnostics.push(format!(
                        "an unexpected error occurred processing check '{name}' ({err}); see the logs"
                    ));
                }
                Err(_) => {
                    log!(Topic::Consistency, Error, "check '{name}' panicked");
                    diagnostics.push(format!(
                        "an unexpected error occurred processing check '{name}'; see the logs"
                    ));
                }
            }
        }

        diagnostics
    }

    fn check_event(&self) -> Result<Vec<String>, String> {
        let event = self.event;
        let mut errors = Vec::new();

        if event.is_relation_event() {
            match &event.relation {
                None => errors.push(
                    "cannot construct a relation event without the relation instance; please pass one"
                        .to_string(),
                ),
                Some(relation) if !event.name.starts_with(&normalize_name(&relation.endpoint)) => {
                    errors.push(format!(
                        "relation event should start with relation endpoint name: '{}' does not start with '{}'",
                        event.name, relation.endpoint
                    ));
                }
                Some(_) => {}
            }
        }

        if let Some(workload) = event.workload_name() {
            match &event.container {
                None => errors.push(
                    "cannot construct a workload event without the container instance; please pass one"
                        .to_string(),
                ),
                Some(container) if normalize_name(&container.name) != workload => {
                    errors.push(format!(
                        "workload event should start with container name: '{}' does not start with '{}'",
                        event.name, container.name
                    ));
                }
                Some(_) => {}
            }
        }

        Ok(errors)
    }

    fn check_config(&self) -> Result<Vec<String>, String> {
        let options = self.spec.config_options();
        let mut errors = Vec::new();

        for (key, value) in &self.state.config {
            let Some(option) = options.get(key) else {
                errors.push(format!(
                    "config option '{key}' in state.config but not specified in config.yaml"
                ));
                continue;
            };

            let Some(declared) = option.kind.as_deref() else {
                errors.push(format!("config.yaml invalid; option '{key}' has no 'type'"));
                continue;
            };

            match ConfigKind::parse(declared) {
                None => errors.push(format!(
                    "config.yaml invalid; option '{key}' has unknown type '{declared}'"
                )),
                Some(ConfigKind::Attrs) => errors.push(format!(
                    "config option '{key}' is declared as 'attrs', which is not supported"
                )),
                Some(kind) if !kind.accepts(value) => errors.push(format!(
                    "config invalid; option '{key}' should be of type {} but is of type {}",
                    kind.name(),
                    value.kind_name()
                )),
                Some(_) => {}
            }
        }

        Ok(errors)
    }

    fn check_secrets(&self) -> Result<Vec<String>, String> {
        let is_secret_event = self.event.is_secret_event();
        let mut errors = Vec::new();

        if is_secret_event && self.state.secrets.is_empty() {
            errors.push(
                "the event being processed is a secret event, but the state has no secrets"
                    .to_string(),
            );
        }

        if is_secret_event || !self.state.secrets.is_empty() {
            let version = JujuVersion::parse(self.juju_version).map_err(|e| e.to_string())?;
            if !version.supports_secrets() {
                errors.push(format!(
                    "secrets are not supported in the specified juju version {version}; should be at least 3.0"
                ));
            }
        }

        Ok(errors)
    }

    fn check_containers(&self) -> Result<Vec<String>, String> {
        let meta_containers: BTreeSet<&str> = self
            .spec
            .meta
            .containers
            .keys()
            .map(String::as_str)
            .collect();
        let mut errors = Vec::new();

        // declared-but-absent containers are fine, a workload event needs both
        if let Some(workload) = self.event.workload_name() {
            if !meta_containers
                .iter()
                .any(|name| normalize_name(name) == workload)
            {
                errors.push(format!(
                    "the event being processed concerns container '{workload}', but a container with that name is not declared in the charm metadata"
                ));
            }
            if !self
                .state
                .containers
                .iter()
                .any(|c| normalize_name(&c.name) == workload)
            {
                errors.push(format!(
                    "the event being processed concerns container '{workload}', but a container with that name is not present in the state"
                ));
            }
        }

        let missing: Vec<&str> = self
            .state
            .containers
            .iter()
            .map(|c| c.name.as_str())
            .filter(|name| !meta_containers.contains(name))
            .collect();
        if !missing.is_empty() {
            errors.push(format!(
                "some containers declared in the state are not specified in metadata; missing from metadata: {}",
                missing.join(", ")
            ));
        }

        Ok(errors)
    }
}

///
/// TESTS
///
