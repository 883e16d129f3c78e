//! # oxide-actions
//!
//! An action router: resolves `(method, path)` to a single registered
//! handler and extracts named path variables.
//!
//! This crate provides:
//! - Literal, macro (`{id}`) and embedded macro (`wild{id}cat`) segments
//! - Regex-constrained macros (`{id:^[0-9]+}`) behind [`MacroSyntax::Regex`]
//! - Deterministic precedence: literal before macro, earlier macro first
//! - Method-specific and method-agnostic registrations
//! - Aliases with reverse URL generation
//! - A dispatcher sequencing decorators, enrichers, the action and extractors
//!
//! ## Quick Start
//!
//! ```
//! use oxide_actions::{ActionRegistry, Method, RouterConfig};
//!
//! let mut registry = ActionRegistry::new(RouterConfig::default());
//! registry.register(Some(Method::Get), "/re/wild{id}cat", "cat", None).unwrap();
//! registry.register(Some(Method::Post), "/re/wild{id}dog", "dog", None).unwrap();
//! let registry = registry.into_shared().unwrap();
//!
//! let found = registry.lookup(Method::Get, "/re/wild123cat").unwrap();
//! assert_eq!(*found.handler().target(), "cat");
//! assert_eq!(found.variables().get("id"), Some("123"));
//!
//! assert!(registry.lookup(Method::Get, "/re/wild123dog").is_none());
//! ```
//!
//! ## Precedence
//!
//! Resolution is a depth-first walk over the segment trie. At every level
//! the literal child is tried first, then macro children in registration
//! order. The first path that consumes every segment and ends on a node
//! with a handler for the method (or a method-agnostic one) wins.
//!
//! ```
//! use oxide_actions::{ActionRegistry, MacroSyntax, Method, RouterConfig};
//!
//! let config = RouterConfig::new().with_macro_syntax(MacroSyntax::Regex);
//! let mut registry = ActionRegistry::new(config);
//! registry.register(Some(Method::Get), "/re/duplo/{id:^[0-9]+}", "numeric", None).unwrap();
//! registry.register(Some(Method::Get), "/re/duplo/{sid}", "any", None).unwrap();
//!
//! assert_eq!(*registry.lookup(Method::Get, "/re/duplo/123").unwrap().handler().target(), "numeric");
//! assert_eq!(*registry.lookup(Method::Get, "/re/duplo/aaa").unwrap().handler().target(), "any");
//! ```
//!
//! ## Extensions
//!
//! A trailing `.ext` is literal text by default. [`ExtensionPolicy`]
//! can strip it, or retry without it when the literal path misses.

mod config;
mod dispatch;
mod error;
mod macros;
mod naming;
mod path;
mod registry;
mod request;
mod scope;
mod trie;

pub use config::RouterConfig;
pub use dispatch::{
    Action, ActionRequest, BoxError, Dispatcher, Enricher, Extractor, FnAction, Outcome,
    RequestDecorator, action_fn,
};
pub use error::{Result, RouterError};
pub use macros::{MacroKind, MacroSegment, MacroSyntax, SegmentPattern};
pub use naming::{ActionDef, ActionNaming, ActionRoute, NamingConfig};
pub use path::{ExtensionPolicy, PathPattern, split_path};
pub use registry::{ActionRegistry, HandlerDescriptor, RegistryState, ResolvedMatch};
pub use request::{Method, PathParams, Request, UnknownMethod};
pub use scope::{
    AttributeEnricher, AttributeExtractor, CookieEnricher, CookieExtractor, FormDecorator,
    PathVariableEnricher, RequestBodyEnricher, ScopeStore, ScopeType, StoreEnricher,
    StoreExtractor,
};
pub use trie::{NodeId, NodeRef, Resolution, RouteTrie};
