//! Action invocation lifecycle.
//!
//! For a resolved match the [`Dispatcher`] runs, in order: request
//! decorators whose predicate holds, every [`Enricher`], the [`Action`]
//! itself, then every [`Extractor`]. The first failure aborts the
//! remaining steps and is returned unchanged.
//!
//! ```ignore
//! let dispatcher = Dispatcher::new()
//!     .decorator(FormDecorator)
//!     .enricher(PathVariableEnricher)
//!     .enricher(RequestBodyEnricher)
//!     .extractor(AttributeExtractor);
//!
//! if let Some(outcome) = dispatcher.handle(&registry, request).await? {
//!     println!("{}", outcome.result);
//! }
//! ```

use std::sync::Arc;

use futures::FutureExt;
use futures::future::{self, BoxFuture};
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::registry::{ActionRegistry, ResolvedMatch};
use crate::request::{PathParams, Request};
use crate::scope::{
    AttributeEnricher, AttributeExtractor, CookieEnricher, CookieExtractor, PathVariableEnricher,
    RequestBodyEnricher, ScopeStore, StoreEnricher, StoreExtractor,
};

/// Error type produced by actions and collaborators.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// The request as seen by enrichers, the action and extractors.
#[derive(Debug, Clone)]
pub struct ActionRequest {
    /// The (possibly decorated) request.
    pub request: Request,
    /// Variables bound by the route.
    pub variables: PathParams,
    /// Inputs bound for the action, filled by enrichers.
    pub inputs: Map<String, Value>,
    /// The pattern of the matched action.
    pub action_path: String,
    /// Cookies to send back, filled by extractors.
    pub set_cookies: Vec<(String, String)>,
}

impl ActionRequest {
    /// Creates an action request with no inputs.
    pub fn new(request: Request, variables: PathParams, action_path: impl Into<String>) -> Self {
        Self {
            request,
            variables,
            inputs: Map::new(),
            action_path: action_path.into(),
            set_cookies: Vec::new(),
        }
    }

    /// Gets a bound input.
    pub fn input(&self, key: &str) -> Option<&Value> {
        self.inputs.get(key)
    }
}

/// The result of a dispatched action.
#[derive(Debug, Clone)]
pub struct Outcome {
    /// The value returned by the action.
    pub result: Value,
    /// The request after extraction.
    pub request: ActionRequest,
}

/// A routable action.
pub trait Action: Send + Sync {
    /// Runs the action.
    fn invoke<'a>(&'a self, request: &'a ActionRequest) -> BoxFuture<'a, Result<Value, BoxError>>;
}

impl<A: Action + ?Sized> Action for Arc<A> {
    fn invoke<'a>(&'a self, request: &'a ActionRequest) -> BoxFuture<'a, Result<Value, BoxError>> {
        (**self).invoke(request)
    }
}

impl<A: Action + ?Sized> Action for Box<A> {
    fn invoke<'a>(&'a self, request: &'a ActionRequest) -> BoxFuture<'a, Result<Value, BoxError>> {
        (**self).invoke(request)
    }
}

/// An [`Action`] backed by a synchronous function.
pub struct FnAction<F>(F);

impl<F> Action for FnAction<F>
where
    F: Fn(&ActionRequest) -> Result<Value, BoxError> + Send + Sync,
{
    fn invoke<'a>(&'a self, request: &'a ActionRequest) -> BoxFuture<'a, Result<Value, BoxError>> {
        future::ready((self.0)(request)).boxed()
    }
}

/// Wraps a function as an [`Action`].
pub fn action_fn<F>(f: F) -> FnAction<F>
where
    F: Fn(&ActionRequest) -> Result<Value, BoxError> + Send + Sync,
{
    FnAction(f)
}

/// Replaces the incoming request before enrichment.
pub trait RequestDecorator: Send + Sync {
    /// Returns whether this decorator applies.
    fn should_decorate(&self, request: &Request) -> bool;

    /// Builds the decorated request.
    fn decorate(&self, request: Request) -> BoxFuture<'_, Result<Request, BoxError>>;
}

/// Binds action inputs before invocation.
pub trait Enricher: Send + Sync {
    /// Name used in logs.
    fn name(&self) -> &str;

    /// Writes inputs into the action request.
    fn enrich<'a>(&'a self, request: &'a mut ActionRequest) -> BoxFuture<'a, Result<(), BoxError>>;
}

/// Writes action outputs somewhere after invocation.
pub trait Extractor: Send + Sync {
    /// Name used in logs.
    fn name(&self) -> &str;

    /// Reads the action result and stores selected parts of it.
    fn extract<'a>(
        &'a self,
        request: &'a mut ActionRequest,
        result: &'a Value,
    ) -> BoxFuture<'a, Result<(), BoxError>>;
}

/// Sequences decorators, enrichers, the action and extractors.
#[derive(Clone, Default)]
pub struct Dispatcher {
    decorators: Vec<Arc<dyn RequestDecorator>>,
    enrichers: Vec<Arc<dyn Enricher>>,
    extractors: Vec<Arc<dyn Extractor>>,
}

impl Dispatcher {
    /// Creates a dispatcher with no collaborators.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a dispatcher with the built-in collaborators.
    ///
    /// Enrichment order: application, session, request attributes, path
    /// variables, cookies, body. Extraction order: cookies, application,
    /// session, request attributes.
    pub fn standard(application: Arc<ScopeStore>, session: Arc<ScopeStore>) -> Self {
        Self::new()
            .decorator(crate::scope::FormDecorator)
            .enricher(StoreEnricher::new(application.clone()))
            .enricher(StoreEnricher::new(session.clone()))
            .enricher(AttributeEnricher)
            .enricher(PathVariableEnricher)
            .enricher(CookieEnricher)
            .enricher(RequestBodyEnricher)
            .extractor(CookieExtractor)
            .extractor(StoreExtractor::new(application))
            .extractor(StoreExtractor::new(session))
            .extractor(AttributeExtractor)
    }

    /// Adds a request decorator.
    #[must_use]
    pub fn decorator(mut self, decorator: impl RequestDecorator + 'static) -> Self {
        self.decorators.push(Arc::new(decorator));
        self
    }

    /// Appends an enricher.
    #[must_use]
    pub fn enricher(mut self, enricher: impl Enricher + 'static) -> Self {
        self.enrichers.push(Arc::new(enricher));
        self
    }

    /// Appends an extractor.
    #[must_use]
    pub fn extractor(mut self, extractor: impl Extractor + 'static) -> Self {
        self.extractors.push(Arc::new(extractor));
        self
    }

    /// Returns the enricher names in execution order.
    pub fn enricher_names(&self) -> Vec<&str> {
        self.enrichers.iter().map(|e| e.name()).collect()
    }

    /// Returns the extractor names in execution order.
    pub fn extractor_names(&self) -> Vec<&str> {
        self.extractors.iter().map(|e| e.name()).collect()
    }

    /// Runs the lifecycle for a resolved match.
    pub async fn dispatch<H: Action>(
        &self,
        resolved: ResolvedMatch<'_, H>,
        request: Request,
    ) -> Result<Outcome, BoxError> {
        let handler = resolved.handler();
        let mut request = request;

        for decorator in &self.decorators {
            if decorator.should_decorate(&request) {
                request = decorator.decorate(request).await?;
            }
        }

        let mut action_request =
            ActionRequest::new(request, resolved.into_variables(), handler.action_path());

        for enricher in &self.enrichers {
            enricher
                .enrich(&mut action_request)
                .await
                .inspect_err(|e| warn!(step = enricher.name(), error = %e, "enrichment failed"))?;
        }

        debug!(action = handler.action_path(), "invoking action");
        let result = handler
            .target()
            .invoke(&action_request)
            .await
            .inspect_err(|e| warn!(action = handler.action_path(), error = %e, "action failed"))?;

        for extractor in &self.extractors {
            extractor
                .extract(&mut action_request, &result)
                .await
                .inspect_err(|e| warn!(step = extractor.name(), error = %e, "extraction failed"))?;
        }

        Ok(Outcome {
            result,
            request: action_request,
        })
    }

    /// Looks the request up and dispatches it.
    ///
    /// Returns `Ok(None)` when no action matches.
    pub async fn handle<H: Action>(
        &self,
        registry: &ActionRegistry<H>,
        request: Request,
    ) -> Result<Option<Outcome>, BoxError> {
        let Some(resolved) = registry.lookup(request.method.clone(), &request.path) else {
            return Ok(None);
        };
        self.dispatch(resolved, request).await.map(Some)
    }
}
