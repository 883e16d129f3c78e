//! Built-in collaborators backed by scoped stores.
//!
//! Enrichers copy values into [`ActionRequest::inputs`]; later enrichers
//! overwrite keys set by earlier ones. Extractors read the sub-object of
//! the action result named after their scope, e.g. a result of
//! `{"session": {"user": "john"}}` stores `user` in the session store.

use std::fmt;
use std::sync::Arc;

use dashmap::DashMap;
use futures::FutureExt;
use futures::future::{self, BoxFuture};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::dispatch::{ActionRequest, BoxError, Enricher, Extractor, RequestDecorator};
use crate::request::Request;

const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";
const JSON_CONTENT_TYPE: &str = "application/json";

/// Where a value lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScopeType {
    /// Shared by every request.
    Application,
    /// Shared by the requests of one client session.
    Session,
    /// Attributes of a single request.
    Request,
    /// Cookies sent with and back to the client.
    Cookie,
}

impl ScopeType {
    /// Returns the key used in logs and action results.
    pub fn key(&self) -> &'static str {
        match self {
            Self::Application => "application",
            Self::Session => "session",
            Self::Request => "request",
            Self::Cookie => "cookie",
        }
    }
}

impl fmt::Display for ScopeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// A concurrent key/value store for one scope.
#[derive(Debug)]
pub struct ScopeStore {
    scope: ScopeType,
    values: DashMap<String, Value>,
}

impl ScopeStore {
    /// Creates an empty store.
    pub fn new(scope: ScopeType) -> Self {
        Self {
            scope,
            values: DashMap::new(),
        }
    }

    /// Returns the scope of this store.
    pub fn scope(&self) -> ScopeType {
        self.scope
    }

    /// Gets a value.
    pub fn get(&self, key: &str) -> Option<Value> {
        self.values.get(key).map(|v| v.value().clone())
    }

    /// Sets a value, returning the previous one.
    pub fn insert(&self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.values.insert(key.into(), value.into())
    }

    /// Removes a value.
    pub fn remove(&self, key: &str) -> Option<Value> {
        self.values.remove(key).map(|(_, v)| v)
    }

    /// Returns the number of values.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns whether the store is empty.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Copies all values out of the store.
    pub fn snapshot(&self) -> Map<String, Value> {
        self.values
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().clone()))
            .collect()
    }
}

fn done<'a>(result: Result<(), BoxError>) -> BoxFuture<'a, Result<(), BoxError>> {
    future::ready(result).boxed()
}

/// Entries of `result[scope]`, if it is an object.
fn scoped_outputs(result: &Value, scope: ScopeType) -> impl Iterator<Item = (&String, &Value)> {
    result
        .get(scope.key())
        .and_then(Value::as_object)
        .into_iter()
        .flatten()
}

/// Binds every value of a store.
#[derive(Debug, Clone)]
pub struct StoreEnricher {
    store: Arc<ScopeStore>,
}

impl StoreEnricher {
    /// Creates an enricher reading `store`.
    pub fn new(store: Arc<ScopeStore>) -> Self {
        Self { store }
    }
}

impl Enricher for StoreEnricher {
    fn name(&self) -> &str {
        self.store.scope().key()
    }

    fn enrich<'a>(&'a self, request: &'a mut ActionRequest) -> BoxFuture<'a, Result<(), BoxError>> {
        request.inputs.extend(self.store.snapshot());
        done(Ok(()))
    }
}

/// Writes `result[scope]` into a store.
#[derive(Debug, Clone)]
pub struct StoreExtractor {
    store: Arc<ScopeStore>,
}

impl StoreExtractor {
    /// Creates an extractor writing into `store`.
    pub fn new(store: Arc<ScopeStore>) -> Self {
        Self { store }
    }
}

impl Extractor for StoreExtractor {
    fn name(&self) -> &str {
        self.store.scope().key()
    }

    fn extract<'a>(
        &'a self,
        _request: &'a mut ActionRequest,
        result: &'a Value,
    ) -> BoxFuture<'a, Result<(), BoxError>> {
        for (key, value) in scoped_outputs(result, self.store.scope()) {
            self.store.insert(key.clone(), value.clone());
        }
        done(Ok(()))
    }
}

/// Binds the request attributes.
#[derive(Debug, Clone, Copy, Default)]
pub struct AttributeEnricher;

impl Enricher for AttributeEnricher {
    fn name(&self) -> &str {
        ScopeType::Request.key()
    }

    fn enrich<'a>(&'a self, request: &'a mut ActionRequest) -> BoxFuture<'a, Result<(), BoxError>> {
        let attributes: Vec<_> = request
            .request
            .attributes
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        request.inputs.extend(attributes);
        done(Ok(()))
    }
}

/// Writes `result["request"]` into the request attributes.
#[derive(Debug, Clone, Copy, Default)]
pub struct AttributeExtractor;

impl Extractor for AttributeExtractor {
    fn name(&self) -> &str {
        ScopeType::Request.key()
    }

    fn extract<'a>(
        &'a self,
        request: &'a mut ActionRequest,
        result: &'a Value,
    ) -> BoxFuture<'a, Result<(), BoxError>> {
        for (key, value) in scoped_outputs(result, ScopeType::Request) {
            request.request.attributes.insert(key.clone(), value.clone());
        }
        done(Ok(()))
    }
}

/// Binds the variables of the matched route as strings.
#[derive(Debug, Clone, Copy, Default)]
pub struct PathVariableEnricher;

impl Enricher for PathVariableEnricher {
    fn name(&self) -> &str {
        "path"
    }

    fn enrich<'a>(&'a self, request: &'a mut ActionRequest) -> BoxFuture<'a, Result<(), BoxError>> {
        let variables: Vec<_> = request
            .variables
            .iter()
            .map(|(k, v)| (k.to_string(), Value::String(v.to_string())))
            .collect();
        request.inputs.extend(variables);
        done(Ok(()))
    }
}

/// Binds the cookies sent with the request as strings.
#[derive(Debug, Clone, Copy, Default)]
pub struct CookieEnricher;

impl Enricher for CookieEnricher {
    fn name(&self) -> &str {
        ScopeType::Cookie.key()
    }

    fn enrich<'a>(&'a self, request: &'a mut ActionRequest) -> BoxFuture<'a, Result<(), BoxError>> {
        let cookies: Vec<_> = request
            .request
            .cookies()
            .into_iter()
            .map(|(k, v)| (k.to_string(), Value::String(v.to_string())))
            .collect();
        request.inputs.extend(cookies);
        done(Ok(()))
    }
}

/// Queues `result["cookie"]` entries as cookies to send back.
#[derive(Debug, Clone, Copy, Default)]
pub struct CookieExtractor;

impl Extractor for CookieExtractor {
    fn name(&self) -> &str {
        ScopeType::Cookie.key()
    }

    fn extract<'a>(
        &'a self,
        request: &'a mut ActionRequest,
        result: &'a Value,
    ) -> BoxFuture<'a, Result<(), BoxError>> {
        for (name, value) in scoped_outputs(result, ScopeType::Cookie) {
            let value = match value {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            request.set_cookies.push((name.clone(), value));
        }
        done(Ok(()))
    }
}

/// Binds the fields of a JSON object body, or of decoded form fields.
///
/// A JSON body that is not an object fails the dispatch.
#[derive(Debug, Clone, Copy, Default)]
pub struct RequestBodyEnricher;

impl RequestBodyEnricher {
    fn fields(request: &Request) -> Result<Map<String, Value>, BoxError> {
        if request.content_type().as_deref() == Some(JSON_CONTENT_TYPE) && !request.body.is_empty()
        {
            return match request.json::<Value>()? {
                Value::Object(fields) => Ok(fields),
                other => Err(format!("expected a JSON object body, got {other}").into()),
            };
        }
        Ok(request
            .form
            .iter()
            .map(|(k, v)| (k.clone(), Value::String(v.clone())))
            .collect())
    }
}

impl Enricher for RequestBodyEnricher {
    fn name(&self) -> &str {
        "body"
    }

    fn enrich<'a>(&'a self, request: &'a mut ActionRequest) -> BoxFuture<'a, Result<(), BoxError>> {
        let result = Self::fields(&request.request).map(|fields| request.inputs.extend(fields));
        done(result)
    }
}

/// Decodes `application/x-www-form-urlencoded` bodies into [`Request::form`].
#[derive(Debug, Clone, Copy, Default)]
pub struct FormDecorator;

impl RequestDecorator for FormDecorator {
    fn should_decorate(&self, request: &Request) -> bool {
        request.content_type().as_deref() == Some(FORM_CONTENT_TYPE)
    }

    fn decorate(&self, mut request: Request) -> BoxFuture<'_, Result<Request, BoxError>> {
        let form = match std::str::from_utf8(&request.body) {
            Ok(data) => Request::parse_form(data),
            Err(e) => return future::ready(Err(e.into())).boxed(),
        };
        request.form.extend(form);
        future::ready(Ok(request)).boxed()
    }
}
