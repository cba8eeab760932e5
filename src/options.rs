//! Container-wide options.
//!
//! Options are fixed when the container is built. They can be assembled in code,
//! read from environment variables, or (with the `config` feature) parsed from JSON.

use std::env;

#[cfg(feature = "config")]
use serde::{Deserialize, Serialize};

use crate::error::{DiError, DiResult};

/// Environment variable overriding [`ContainerOptions::max_resolve_depth`].
pub const ENV_MAX_RESOLVE_DEPTH: &str = "FERROUS_SCOPES_MAX_RESOLVE_DEPTH";
/// Environment variable overriding [`ContainerOptions::circular_dependency_check`].
pub const ENV_CIRCULAR_CHECK: &str = "FERROUS_SCOPES_CIRCULAR_CHECK";
/// Environment variable overriding [`ContainerOptions::start_on_activate`].
pub const ENV_START_ON_ACTIVATE: &str = "FERROUS_SCOPES_START_ON_ACTIVATE";

/// Default nesting limit of a single resolve operation.
pub const DEFAULT_MAX_RESOLVE_DEPTH: usize = 50;

/// Whether resolve requests are checked for circular dependencies.
///
/// Disabling the check removes the request-start guard from every pipeline,
/// which also removes the depth limit. A genuine cycle then recurses until the
/// thread's stack is exhausted, or blocks forever when the cycle passes through
/// a shared instance that is still being created. Only disable it for graphs
/// that are known to be acyclic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "config", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "config", serde(rename_all = "lowercase"))]
pub enum CircularDependencyCheck {
    #[default]
    Enabled,
    Disabled,
}

/// Options shared by every scope of a container.
///
/// # Examples
///
/// ```rust
/// use ferrous_scopes::{CircularDependencyCheck, ContainerOptions};
///
/// let options = ContainerOptions::default()
///     .with_max_resolve_depth(100)
///     .with_start_on_activate(true);
///
/// assert_eq!(options.max_resolve_depth, 100);
/// assert_eq!(options.circular_dependency_check, CircularDependencyCheck::Enabled);
/// assert!(options.start_on_activate);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "config", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "config", serde(default))]
pub struct ContainerOptions {
    /// Maximum nesting of requests within one resolve operation
    pub max_resolve_depth: usize,
    pub circular_dependency_check: CircularDependencyCheck,
    /// Run [`Startable::start`](crate::Startable::start) for startable registrations
    /// when they are first activated
    pub start_on_activate: bool,
}

impl Default for ContainerOptions {
    fn default() -> Self {
        Self {
            max_resolve_depth: DEFAULT_MAX_RESOLVE_DEPTH,
            circular_dependency_check: CircularDependencyCheck::Enabled,
            start_on_activate: false,
        }
    }
}

impl ContainerOptions {
    pub fn with_max_resolve_depth(mut self, depth: usize) -> Self {
        self.max_resolve_depth = depth;
        self
    }

    pub fn with_circular_dependency_check(mut self, check: CircularDependencyCheck) -> Self {
        self.circular_dependency_check = check;
        self
    }

    pub fn with_start_on_activate(mut self, enabled: bool) -> Self {
        self.start_on_activate = enabled;
        self
    }

    /// Defaults overridden by the `FERROUS_SCOPES_*` environment variables.
    ///
    /// Unset variables keep their defaults; malformed values are rejected with
    /// [`DiError::Configuration`] naming the variable.
    pub fn from_env() -> DiResult<Self> {
        let mut options = Self::default();

        if let Some(raw) = read_var(ENV_MAX_RESOLVE_DEPTH)? {
            options.max_resolve_depth = raw.trim().parse().map_err(|_| DiError::Configuration {
                key: ENV_MAX_RESOLVE_DEPTH.to_string(),
                message: format!("expected a positive integer, got '{}'", raw),
            })?;
            if options.max_resolve_depth == 0 {
                return Err(DiError::Configuration {
                    key: ENV_MAX_RESOLVE_DEPTH.to_string(),
                    message: "depth must be at least 1".to_string(),
                });
            }
        }

        if let Some(raw) = read_var(ENV_CIRCULAR_CHECK)? {
            options.circular_dependency_check = match raw.trim().to_ascii_lowercase().as_str() {
                "enabled" | "true" | "1" => CircularDependencyCheck::Enabled,
                "disabled" | "false" | "0" => CircularDependencyCheck::Disabled,
                _ => {
                    return Err(DiError::Configuration {
                        key: ENV_CIRCULAR_CHECK.to_string(),
                        message: format!("expected 'enabled' or 'disabled', got '{}'", raw),
                    })
                }
            };
        }

        if let Some(raw) = read_var(ENV_START_ON_ACTIVATE)? {
            options.start_on_activate = parse_bool(ENV_START_ON_ACTIVATE, &raw)?;
        }

        Ok(options)
    }

    /// Parses options from JSON; missing fields keep their defaults.
    ///
    /// ```rust
    /// use ferrous_scopes::{CircularDependencyCheck, ContainerOptions};
    ///
    /// let options = ContainerOptions::from_json_str(
    ///     r#"{ "max_resolve_depth": 20, "circular_dependency_check": "disabled" }"#,
    /// ).unwrap();
    /// assert_eq!(options.max_resolve_depth, 20);
    /// assert_eq!(options.circular_dependency_check, CircularDependencyCheck::Disabled);
    /// assert!(!options.start_on_activate);
    /// ```
    #[cfg(feature = "config")]
    pub fn from_json_str(json: &str) -> DiResult<Self> {
        serde_json::from_str(json).map_err(|e| DiError::Configuration {
            key: "json".to_string(),
            message: e.to_string(),
        })
    }
}

fn read_var(key: &str) -> DiResult<Option<String>> {
    match env::var(key) {
        Ok(value) => Ok(Some(value)),
        Err(env::VarError::NotPresent) => Ok(None),
        Err(env::VarError::NotUnicode(_)) => Err(DiError::Configuration {
            key: key.to_string(),
            message: "value is not valid unicode".to_string(),
        }),
    }
}

fn parse_bool(key: &str, raw: &str) -> DiResult<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        _ => Err(DiError::Configuration {
            key: key.to_string(),
            message: format!("expected a boolean, got '{}'", raw),
        }),
    }
}
