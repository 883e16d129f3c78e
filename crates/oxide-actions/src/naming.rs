//! Pattern derivation from action naming conventions.
//!
//! This is a registration-time convenience and knows nothing about the
//! trie: it turns an [`ActionDef`] (package, type name, method name and
//! optional overrides) into an [`ActionRoute`] that can be registered.
//!
//! ```
//! use oxide_actions::{ActionDef, ActionNaming, NamingConfig};
//!
//! let naming = ActionNaming::new(NamingConfig::default().root_package("app"));
//!
//! let route = naming.route(&ActionDef::new("app.blog", "PostAction", "list"));
//! assert_eq!(route.pattern, "/blog/post.list");
//!
//! let route = naming.route(&ActionDef::new("app.blog", "PostAction", "view"));
//! assert_eq!(route.pattern, "/blog/post");
//! ```

use serde::{Deserialize, Serialize};

use crate::request::Method;

/// Naming convention settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NamingConfig {
    /// Packages whose sub-packages map to path prefixes.
    pub root_packages: Vec<String>,
    /// Method names that contribute no path part.
    pub default_methods: Vec<String>,
    /// Suffix removed from type names.
    pub type_suffix: String,
    /// Extension appended when the definition declares none.
    pub default_extension: Option<String>,
}

impl Default for NamingConfig {
    fn default() -> Self {
        Self {
            root_packages: Vec::new(),
            default_methods: vec!["view".to_string(), "execute".to_string()],
            type_suffix: "Action".to_string(),
            default_extension: None,
        }
    }
}

impl NamingConfig {
    /// Adds a root package.
    #[must_use]
    pub fn root_package(mut self, package: impl Into<String>) -> Self {
        self.root_packages.push(package.into());
        self
    }
}

/// Where the method part of the path comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
enum MethodPart {
    Derived,
    Named(String),
    Omitted,
    Absolute(String),
}

/// Description of one action as declared by its author.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionDef {
    package: String,
    type_name: String,
    method_name: String,
    package_path: Option<String>,
    type_path: Option<String>,
    method: MethodPart,
    extension: Option<String>,
    http_method: Option<Method>,
    alias: Option<String>,
}

impl ActionDef {
    /// Creates a definition for `package::TypeName#method`.
    pub fn new(
        package: impl Into<String>,
        type_name: impl Into<String>,
        method_name: impl Into<String>,
    ) -> Self {
        Self {
            package: package.into(),
            type_name: type_name.into(),
            method_name: method_name.into(),
            package_path: None,
            type_path: None,
            method: MethodPart::Derived,
            extension: None,
            http_method: None,
            alias: None,
        }
    }

    /// Overrides the package part. A leading `/` makes it absolute.
    #[must_use]
    pub fn package_path(mut self, path: impl Into<String>) -> Self {
        self.package_path = Some(path.into());
        self
    }

    /// Overrides the type part.
    ///
    /// A leading `/` drops the package part; a trailing `/` joins the
    /// method part with `/` instead of `.`.
    #[must_use]
    pub fn type_path(mut self, path: impl Into<String>) -> Self {
        self.type_path = Some(path.into());
        self
    }

    /// Overrides the method part. A leading `/` makes it the whole path.
    #[must_use]
    pub fn method_path(mut self, path: impl Into<String>) -> Self {
        let path = path.into();
        self.method = if path.starts_with('/') {
            MethodPart::Absolute(path)
        } else {
            MethodPart::Named(path)
        };
        self
    }

    /// Leaves the method out of the path.
    #[must_use]
    pub fn omit_method(mut self) -> Self {
        self.method = MethodPart::Omitted;
        self
    }

    /// Appends `.extension` to the path.
    #[must_use]
    pub fn extension(mut self, extension: impl Into<String>) -> Self {
        self.extension = Some(extension.into());
        self
    }

    /// Restricts the action to an HTTP method.
    #[must_use]
    pub fn http_method(mut self, method: Method) -> Self {
        self.http_method = Some(method);
        self
    }

    /// Binds an alias to the action.
    #[must_use]
    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }

    /// Returns the `package.Type#method` identity.
    pub fn identity(&self) -> String {
        if self.package.is_empty() {
            format!("{}#{}", self.type_name, self.method_name)
        } else {
            format!("{}.{}#{}", self.package, self.type_name, self.method_name)
        }
    }
}

/// A derived route, ready to register.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionRoute {
    /// The derived path pattern.
    pub pattern: String,
    /// HTTP method, `None` for any.
    pub method: Option<Method>,
    /// Optional alias.
    pub alias: Option<String>,
}

/// Applies a [`NamingConfig`] to action definitions.
#[derive(Debug, Clone, Default)]
pub struct ActionNaming {
    config: NamingConfig,
}

impl ActionNaming {
    /// Creates a naming convention.
    pub fn new(config: NamingConfig) -> Self {
        Self { config }
    }

    /// Returns the configuration.
    pub fn config(&self) -> &NamingConfig {
        &self.config
    }

    /// Derives the route for a definition.
    pub fn route(&self, def: &ActionDef) -> ActionRoute {
        ActionRoute {
            pattern: self.pattern(def),
            method: def.http_method.clone(),
            alias: def.alias.clone(),
        }
    }

    fn pattern(&self, def: &ActionDef) -> String {
        let extension = def
            .extension
            .as_deref()
            .or(self.config.default_extension.as_deref());

        let mut path = match &def.method {
            MethodPart::Absolute(path) => path.clone(),
            method => {
                let type_part = def
                    .type_path
                    .clone()
                    .unwrap_or_else(|| self.type_part(&def.type_name));
                let method_part = match method {
                    MethodPart::Named(name) => Some(name.as_str()),
                    MethodPart::Derived if !self.is_default_method(&def.method_name) => {
                        Some(def.method_name.as_str())
                    }
                    _ => None,
                };

                let mut path = String::from("/");
                if let Some(stripped) = type_part.strip_prefix('/') {
                    path.push_str(stripped);
                } else {
                    let package_part = self.package_part(def);
                    if !package_part.is_empty() {
                        path.push_str(&package_part);
                        path.push('/');
                    }
                    path.push_str(&type_part);
                }

                match method_part {
                    Some(method) if path.ends_with('/') => path.push_str(method),
                    Some(method) => {
                        path.push('.');
                        path.push_str(method);
                    }
                    None if path.len() > 1 && path.ends_with('/') => {
                        path.pop();
                    }
                    None => {}
                }
                path
            }
        };

        if let Some(extension) = extension {
            path.push('.');
            path.push_str(extension);
        }
        path
    }

    fn is_default_method(&self, name: &str) -> bool {
        self.config.default_methods.iter().any(|m| m == name)
    }

    fn type_part(&self, type_name: &str) -> String {
        let base = type_name
            .strip_suffix(self.config.type_suffix.as_str())
            .filter(|base| !base.is_empty())
            .unwrap_or(type_name);
        uncapitalize(base)
    }

    fn package_part(&self, def: &ActionDef) -> String {
        if let Some(path) = &def.package_path {
            return path.trim_matches('/').to_string();
        }
        self.config
            .root_packages
            .iter()
            .filter_map(|root| relative_package(&def.package, root))
            .min_by_key(|relative| relative.len())
            .map(|relative| relative.replace('.', "/"))
            .unwrap_or_default()
    }
}

/// Returns `package` relative to `root`, or `None` if it is outside.
fn relative_package<'p>(package: &'p str, root: &str) -> Option<&'p str> {
    if package == root {
        return Some("");
    }
    package.strip_prefix(root)?.strip_prefix('.')
}

fn uncapitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_lowercase().chain(chars).collect(),
        None => String::new(),
    }
}
