//! Router configuration.

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::macros::MacroSyntax;
use crate::naming::NamingConfig;
use crate::path::ExtensionPolicy;

/// Settings fixed when an [`ActionRegistry`](crate::ActionRegistry) is created.
///
/// # Example
///
/// ```
/// use oxide_actions::{ExtensionPolicy, MacroSyntax, RouterConfig};
///
/// let config = RouterConfig::from_toml_str(r#"
///     macro_syntax = "regex"
///     extension_policy = "keep_then_strip"
///
///     [naming]
///     root_packages = ["app"]
/// "#).unwrap();
///
/// assert_eq!(config.macro_syntax, MacroSyntax::Regex);
/// assert_eq!(config.extension_policy, ExtensionPolicy::KeepThenStrip);
/// assert_eq!(config.naming.root_packages, vec!["app".to_string()]);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RouterConfig {
    /// Accepted macro declarations.
    pub macro_syntax: MacroSyntax,
    /// Treatment of a trailing `.ext` on request paths.
    pub extension_policy: ExtensionPolicy,
    /// Refuse to start if any registration was rejected as a duplicate.
    pub abort_on_conflict: bool,
    /// Naming convention for derived action paths.
    pub naming: NamingConfig,
}

impl RouterConfig {
    /// Creates the default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses a TOML document.
    pub fn from_toml_str(s: &str) -> Result<Self> {
        Ok(toml::from_str(s)?)
    }

    /// Sets the macro syntax.
    #[must_use]
    pub fn with_macro_syntax(mut self, syntax: MacroSyntax) -> Self {
        self.macro_syntax = syntax;
        self
    }

    /// Sets the extension policy.
    #[must_use]
    pub fn with_extension_policy(mut self, policy: ExtensionPolicy) -> Self {
        self.extension_policy = policy;
        self
    }

    /// Sets whether conflicting registrations abort startup.
    #[must_use]
    pub fn with_abort_on_conflict(mut self, abort: bool) -> Self {
        self.abort_on_conflict = abort;
        self
    }

    /// Sets the naming convention.
    #[must_use]
    pub fn with_naming(mut self, naming: NamingConfig) -> Self {
        self.naming = naming;
        self
    }
}
