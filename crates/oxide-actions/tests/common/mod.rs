#![allow(dead_code)]

use oxide_actions::{ActionRegistry, ExtensionPolicy, MacroSyntax, Method, RouterConfig};

pub fn registry(syntax: MacroSyntax, policy: ExtensionPolicy) -> ActionRegistry<&'static str> {
    ActionRegistry::new(
        RouterConfig::new()
            .with_macro_syntax(syntax)
            .with_extension_policy(policy),
    )
}

/// Registers every `(method, pattern, target)` and starts the registry.
pub fn started(
    config: RouterConfig,
    routes: &[(Option<Method>, &str, &'static str)],
) -> ActionRegistry<&'static str> {
    let mut registry = ActionRegistry::new(config);
    for (method, pattern, target) in routes {
        registry
            .register(method.clone(), pattern, *target, None)
            .unwrap_or_else(|e| panic!("Failed to register {pattern}: {e}"));
    }
    registry.start().expect("start");
    registry
}

pub fn target(registry: &ActionRegistry<&'static str>, method: Method, path: &str) -> Option<&'static str> {
    registry
        .lookup(method, path)
        .map(|found| *found.handler().target())
}

pub fn variable(
    registry: &ActionRegistry<&'static str>,
    method: Method,
    path: &str,
    name: &str,
) -> Option<String> {
    registry
        .lookup(method, path)
        .and_then(|found| found.variables().get(name).map(str::to_string))
}
