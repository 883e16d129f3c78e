//! The action registry: method-aware registration and lookup.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use tracing::{debug, info, trace, warn};

use crate::config::RouterConfig;
use crate::error::{Result, RouterError};
use crate::naming::{ActionDef, ActionNaming, ActionRoute};
use crate::path::{PathPattern, split_path};
use crate::request::{Method, PathParams};
use crate::trie::{NodeRef, RouteTrie};

/// A registered handler and how it was declared.
#[derive(Debug, Clone)]
pub struct HandlerDescriptor<H> {
    target: H,
    pattern: PathPattern,
    method: Option<Method>,
    alias: Option<String>,
}

impl<H> HandlerDescriptor<H> {
    /// Returns the registered target.
    pub fn target(&self) -> &H {
        &self.target
    }

    /// Returns the parsed pattern.
    pub fn pattern(&self) -> &PathPattern {
        &self.pattern
    }

    /// Returns the pattern string as declared.
    pub fn action_path(&self) -> &str {
        self.pattern.as_str()
    }

    /// Returns the HTTP method, `None` for method-agnostic actions.
    pub fn method(&self) -> Option<&Method> {
        self.method.as_ref()
    }

    /// Returns the alias, if any.
    pub fn alias(&self) -> Option<&str> {
        self.alias.as_deref()
    }
}

/// A successful lookup.
#[derive(Debug)]
pub struct ResolvedMatch<'r, H> {
    handler: &'r HandlerDescriptor<H>,
    variables: PathParams,
    leaf: NodeRef<'r, HandlerDescriptor<H>>,
}

impl<'r, H> ResolvedMatch<'r, H> {
    /// Returns the matched handler.
    pub fn handler(&self) -> &'r HandlerDescriptor<H> {
        self.handler
    }

    /// Returns the variables bound by macro segments.
    pub fn variables(&self) -> &PathParams {
        &self.variables
    }

    /// Consumes the match, returning the variables.
    pub fn into_variables(self) -> PathParams {
        self.variables
    }

    /// Returns the node of the last consumed segment.
    pub fn leaf(&self) -> NodeRef<'r, HandlerDescriptor<H>> {
        self.leaf
    }

    /// Iterates over the matched nodes from leaf to root.
    pub fn chain(&self) -> impl Iterator<Item = NodeRef<'r, HandlerDescriptor<H>>> {
        self.leaf.ancestors()
    }

    /// Rebuilds the canonical pattern from the matched nodes.
    pub fn canonical_pattern(&self) -> String {
        self.leaf.pattern()
    }
}

/// Lifecycle of a registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistryState {
    /// Accepting registrations.
    Building,
    /// Serving lookups; registrations are refused.
    Started,
}

impl fmt::Display for RegistryState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Building => f.write_str("building"),
            Self::Started => f.write_str("started"),
        }
    }
}

/// Maps `(method, path)` to registered handlers.
///
/// Registration takes `&mut self` and is only allowed while the registry is
/// [`RegistryState::Building`]. After [`start`](Self::start) the registry
/// is read-only and can be shared across threads for lock-free lookups.
///
/// # Example
///
/// ```
/// use oxide_actions::{ActionRegistry, Method, RouterConfig};
///
/// let mut registry = ActionRegistry::new(RouterConfig::default());
/// registry.register(Some(Method::Get), "/re/user/{id}/macro", "macro", None).unwrap();
/// registry.start().unwrap();
///
/// let found = registry.lookup(Method::Get, "/re/user/173/macro").unwrap();
/// assert_eq!(*found.handler().target(), "macro");
/// assert_eq!(found.variables().get("id"), Some("173"));
/// ```
#[derive(Debug)]
pub struct ActionRegistry<H> {
    config: RouterConfig,
    naming: ActionNaming,
    trie: RouteTrie<HandlerDescriptor<H>>,
    aliases: HashMap<String, PathPattern>,
    count: usize,
    conflicts: usize,
    state: RegistryState,
}

impl<H> Default for ActionRegistry<H> {
    fn default() -> Self {
        Self::new(RouterConfig::default())
    }
}

impl<H> ActionRegistry<H> {
    /// Creates an empty registry.
    pub fn new(config: RouterConfig) -> Self {
        Self {
            naming: ActionNaming::new(config.naming.clone()),
            config,
            trie: RouteTrie::new(),
            aliases: HashMap::new(),
            count: 0,
            conflicts: 0,
            state: RegistryState::Building,
        }
    }

    /// Returns the configuration.
    pub fn config(&self) -> &RouterConfig {
        &self.config
    }

    /// Returns the naming convention built from the configuration.
    pub fn naming(&self) -> &ActionNaming {
        &self.naming
    }

    /// Returns the current state.
    pub fn state(&self) -> RegistryState {
        self.state
    }

    /// Returns whether the registry has started serving.
    pub fn is_started(&self) -> bool {
        self.state == RegistryState::Started
    }

    /// Registers a handler.
    ///
    /// `method = None` registers a method-agnostic handler that serves any
    /// method without a more specific registration at the same pattern.
    pub fn register(
        &mut self,
        method: Option<Method>,
        pattern: &str,
        target: H,
        alias: Option<&str>,
    ) -> Result<&HandlerDescriptor<H>> {
        if self.is_started() {
            return Err(RouterError::RegistryClosed);
        }

        let pattern = PathPattern::parse(pattern, self.config.macro_syntax)?;
        let method_label = method.as_ref().map_or("*", Method::as_str).to_string();

        if let Some(alias) = alias {
            if let Some(existing) = self.aliases.get(alias) {
                self.conflicts += 1;
                warn!(alias, pattern = existing.as_str(), "alias already bound");
                return Err(RouterError::DuplicateAlias {
                    alias: alias.to_string(),
                    pattern: existing.as_str().to_string(),
                });
            }
        }

        let node = self.trie.node_for(pattern.segments());
        let descriptor = HandlerDescriptor {
            target,
            pattern,
            method: method.clone(),
            alias: alias.map(str::to_string),
        };

        match self.trie.attach(node, method, descriptor) {
            Ok(descriptor) => {
                if let Some(alias) = &descriptor.alias {
                    self.aliases.insert(alias.clone(), descriptor.pattern.clone());
                }
                self.count += 1;
                debug!(
                    method = %method_label,
                    pattern = descriptor.action_path(),
                    alias = descriptor.alias(),
                    "registered action"
                );
                Ok(descriptor)
            }
            Err(rejected) => {
                self.conflicts += 1;
                warn!(
                    method = %method_label,
                    pattern = rejected.action_path(),
                    "duplicate route"
                );
                Err(RouterError::DuplicateRoute {
                    method: method_label,
                    pattern: rejected.pattern.as_str().to_string(),
                })
            }
        }
    }

    /// Registers a route derived by [`ActionNaming`].
    pub fn register_route(&mut self, route: &ActionRoute, target: H) -> Result<&HandlerDescriptor<H>> {
        self.register(
            route.method.clone(),
            &route.pattern,
            target,
            route.alias.as_deref(),
        )
    }

    /// Derives the route for `def` with the configured naming and registers it.
    pub fn register_action(&mut self, def: &ActionDef, target: H) -> Result<&HandlerDescriptor<H>> {
        let route = self.naming.route(def);
        trace!(action = %def.identity(), pattern = %route.pattern, "derived action path");
        self.register_route(&route, target)
    }

    /// Closes registration. Calling it again is a no-op.
    ///
    /// Fails with [`RouterError::StartupAborted`] when `abort_on_conflict`
    /// is set and a registration was rejected; the registry then stays in
    /// the building state.
    pub fn start(&mut self) -> Result<()> {
        if self.is_started() {
            return Ok(());
        }
        if self.config.abort_on_conflict && self.conflicts > 0 {
            return Err(RouterError::StartupAborted {
                conflicts: self.conflicts,
            });
        }
        self.state = RegistryState::Started;
        info!(
            actions = self.count,
            nodes = self.trie.node_count(),
            "action registry started"
        );
        Ok(())
    }

    /// Starts the registry and wraps it for sharing between threads.
    pub fn into_shared(mut self) -> Result<Arc<Self>> {
        self.start()?;
        Ok(Arc::new(self))
    }

    /// Looks up a request path.
    ///
    /// The path is split on `/` and the configured extension policy decides
    /// whether a trailing `.ext` is matched literally, stripped, or both.
    pub fn lookup(&self, method: Method, path: &str) -> Option<ResolvedMatch<'_, H>> {
        let found = self
            .config
            .extension_policy
            .candidates(split_path(path))
            .into_iter()
            .find_map(|segments| self.resolve_segments(&method, &segments));
        if found.is_none() {
            trace!(method = %method, path, "no action matched");
        }
        found
    }

    /// Looks up a request given its method name.
    ///
    /// Names outside the standard set are only served by method-agnostic
    /// actions or actions registered for that exact name. A string that is
    /// not a method token never matches.
    pub fn lookup_str(&self, method: &str, path: &str) -> Option<ResolvedMatch<'_, H>> {
        self.lookup(method.parse().ok()?, path)
    }

    /// Looks up already split segments, matching them literally.
    pub fn lookup_segments(&self, method: Method, segments: &[&str]) -> Option<ResolvedMatch<'_, H>> {
        self.resolve_segments(&method, segments)
    }

    fn resolve_segments(&self, method: &Method, segments: &[&str]) -> Option<ResolvedMatch<'_, H>> {
        let resolution = self.trie.resolve(segments, method)?;
        let variables: PathParams = resolution
            .captures
            .iter()
            .map(|(m, value)| (m.name(), *value))
            .collect();
        Some(ResolvedMatch {
            handler: resolution.value,
            variables,
            leaf: resolution.node,
        })
    }

    /// Returns the pattern bound to an alias.
    pub fn lookup_path_alias(&self, alias: &str) -> Option<&str> {
        self.aliases.get(alias).map(PathPattern::as_str)
    }

    /// Builds a concrete path for an aliased pattern.
    pub fn url_for(&self, alias: &str, params: &PathParams) -> Option<String> {
        self.aliases.get(alias)?.reverse(params)
    }

    /// Returns the number of registered handlers.
    pub fn count(&self) -> usize {
        self.count
    }

    /// Returns the number of trie nodes, root included.
    pub fn node_count(&self) -> usize {
        self.trie.node_count()
    }

    /// Iterates over all registered handlers, in no particular order.
    pub fn descriptors(&self) -> impl Iterator<Item = &HandlerDescriptor<H>> {
        self.trie.values()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::macros::MacroSyntax;
    use crate::path::ExtensionPolicy;

    fn registry() -> ActionRegistry<&'static str> {
        ActionRegistry::new(RouterConfig::default())
    }

    #[test]
    fn test_literal_lookup_has_no_variables() {
        let mut reg = registry();
        reg.register(Some(Method::Get), "/users/list", "list", None)
            .unwrap();
        let found = reg.lookup(Method::Get, "/users/list").unwrap();
        assert_eq!(*found.handler().target(), "list");
        assert!(found.variables().is_empty());
    }

    #[test]
    fn test_duplicate_route() {
        let mut reg = registry();
        reg.register(Some(Method::Get), "/a/{id}", "first", None)
            .unwrap();
        let err = reg
            .register(Some(Method::Get), "/a/{id}", "second", None)
            .unwrap_err();
        assert!(matches!(err, RouterError::DuplicateRoute { ref method, .. } if method == "GET"));
        assert_eq!(reg.count(), 1);

        // Still usable: other methods and patterns are accepted.
        reg.register(Some(Method::Post), "/a/{id}", "post", None)
            .unwrap();
        reg.register(None, "/a/{id}", "any", None).unwrap();
        let err = reg.register(None, "/a/{id}", "any2", None).unwrap_err();
        assert!(matches!(err, RouterError::DuplicateRoute { ref method, .. } if method == "*"));
        assert_eq!(reg.count(), 3);
    }

    #[test]
    fn test_malformed_pattern_leaves_registry_untouched() {
        let mut reg = registry();
        let err = reg
            .register(Some(Method::Get), "/re/{id", "bad", None)
            .unwrap_err();
        assert!(matches!(err, RouterError::MalformedPattern { .. }));
        assert_eq!(reg.count(), 0);
        assert_eq!(reg.node_count(), 1);
    }

    #[test]
    fn test_aliases() {
        let mut reg = registry();
        reg.register(Some(Method::Post), "/xxx.html", "foo5", Some("dude"))
            .unwrap();
        assert_eq!(reg.lookup_path_alias("dude"), Some("/xxx.html"));
        assert_eq!(reg.lookup_path_alias("missing"), None);

        let err = reg
            .register(Some(Method::Get), "/yyy", "other", Some("dude"))
            .unwrap_err();
        assert!(matches!(err, RouterError::DuplicateAlias { ref pattern, .. } if pattern == "/xxx.html"));
        // The rejected registration did not land in the trie.
        assert!(reg.lookup(Method::Get, "/yyy").is_none());
        assert_eq!(reg.count(), 1);
    }

    #[test]
    fn test_url_for() {
        let mut reg = registry();
        reg.register(Some(Method::Get), "/re/user/{id}/macro", "macro", Some("user_macro"))
            .unwrap();
        let params: PathParams = [("id", "42")].into_iter().collect();
        assert_eq!(
            reg.url_for("user_macro", &params),
            Some("/re/user/42/macro".to_string())
        );
        assert_eq!(reg.url_for("user_macro", &PathParams::new()), None);
    }

    #[test]
    fn test_registry_closed() {
        let mut reg = registry();
        reg.register(Some(Method::Get), "/a", "a", None).unwrap();
        assert_eq!(reg.state(), RegistryState::Building);
        reg.start().unwrap();
        reg.start().unwrap();
        assert_eq!(reg.state(), RegistryState::Started);

        let err = reg.register(Some(Method::Get), "/b", "b", None).unwrap_err();
        assert!(matches!(err, RouterError::RegistryClosed));
        assert!(reg.lookup(Method::Get, "/a").is_some());
    }

    #[test]
    fn test_abort_on_conflict() {
        let mut reg = ActionRegistry::new(RouterConfig::new().with_abort_on_conflict(true));
        reg.register(Some(Method::Get), "/a", "a", None).unwrap();
        assert!(reg.register(Some(Method::Get), "/a", "again", None).is_err());
        let err = reg.start().unwrap_err();
        assert!(matches!(err, RouterError::StartupAborted { conflicts: 1 }));
        assert!(!reg.is_started());
    }

    #[test]
    fn test_lookup_str() {
        let mut reg = registry();
        reg.register(Some(Method::Delete), "/xxx", "foo41", None)
            .unwrap();
        assert!(reg.lookup_str("delete", "/xxx").is_some());
        assert!(reg.lookup_str("GET", "/xxx").is_none());
        assert!(reg.lookup_str("BREW", "/xxx").is_none());
    }

    #[test]
    fn test_extension_policies() {
        let pattern = "/re/user/{id}/macro";
        for (policy, expected) in [
            (ExtensionPolicy::Keep, None),
            (ExtensionPolicy::Strip, Some("173")),
            (ExtensionPolicy::KeepThenStrip, Some("173")),
        ] {
            let mut reg = ActionRegistry::new(RouterConfig::new().with_extension_policy(policy));
            reg.register(Some(Method::Get), pattern, "macro", None)
                .unwrap();
            let found = reg.lookup(Method::Get, "/re/user/173/macro.html");
            assert_eq!(
                found.as_ref().and_then(|m| m.variables().get("id")),
                expected,
                "{policy:?}"
            );
        }
    }

    #[test]
    fn test_suffix_folded_into_pattern() {
        let mut reg = registry();
        reg.register(Some(Method::Get), "/re/user/{id}/macro.html", "macro", None)
            .unwrap();
        let found = reg.lookup(Method::Get, "/re/user/173/macro.html").unwrap();
        assert_eq!(found.variables().get("id"), Some("173"));
    }

    #[test]
    fn test_strip_policy_cannot_match_suffixed_pattern() {
        let mut reg =
            ActionRegistry::new(RouterConfig::new().with_extension_policy(ExtensionPolicy::Strip));
        reg.register(Some(Method::Get), "/config/dba.delete_multi.do", "zqq", None)
            .unwrap();
        assert!(reg.lookup(Method::Get, "/config/dba.delete_multi.do").is_none());
    }

    #[test]
    fn test_regex_syntax_from_config() {
        let mut reg = ActionRegistry::new(RouterConfig::new().with_macro_syntax(MacroSyntax::Regex));
        reg.register(Some(Method::Get), "/n/{id:[0-9]+}", "num", None)
            .unwrap();
        assert!(reg.lookup(Method::Get, "/n/12").is_some());
        assert!(reg.lookup(Method::Get, "/n/ab").is_none());

        let mut plain = registry();
        assert!(plain
            .register(Some(Method::Get), "/n/{id:[0-9]+}", "num", None)
            .is_err());
    }

    #[test]
    fn test_register_action_uses_naming() {
        let mut reg = ActionRegistry::new(RouterConfig::new().with_naming(
            crate::naming::NamingConfig::default().root_package("app"),
        ));
        let def = ActionDef::new("app.shop", "CartAction", "add").http_method(Method::Post);
        let descriptor = reg.register_action(&def, "cart_add").unwrap();
        assert_eq!(descriptor.action_path(), "/shop/cart.add");
        assert!(reg.lookup(Method::Post, "/shop/cart.add").is_some());
    }

    #[test]
    fn test_descriptors() {
        let mut reg = registry();
        reg.register(Some(Method::Get), "/a", "a", None).unwrap();
        reg.register(Some(Method::Post), "/a", "b", None).unwrap();
        reg.register(None, "/c/{x}", "c", None).unwrap();
        let mut targets: Vec<_> = reg.descriptors().map(|d| *d.target()).collect();
        targets.sort_unstable();
        assert_eq!(targets, vec!["a", "b", "c"]);
    }
}
