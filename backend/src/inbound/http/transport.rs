//! Framework-neutral request/response and routing contracts.
//!
//! Controllers see only [`HttpContext`] and register through [`Router`];
//! adapters translate a concrete framework into these.

use std::fmt;
use std::sync::Arc;

use futures_util::future::LocalBoxFuture;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use thiserror::Error;

use crate::observability::RequestContext;

/// HTTP verbs a route can be registered for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    /// `GET`
    Get,
    /// `POST`
    Post,
    /// `PUT`
    Put,
    /// `PATCH`
    Patch,
    /// `DELETE`
    Delete,
}

impl Method {
    /// Upper-case verb.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Patch => "PATCH",
            Self::Delete => "DELETE",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a request could not be bound into a DTO.
#[derive(Debug, Error)]
pub enum BindError {
    /// The body is not well-formed JSON.
    #[error("invalid JSON syntax: {source}")]
    JsonSyntax {
        /// Parser error.
        #[source]
        source: serde_json::Error,
    },
    /// The body is JSON of the wrong shape.
    #[error("invalid JSON type: {source}")]
    JsonType {
        /// Parser error.
        #[source]
        source: serde_json::Error,
    },
    /// A query or path parameter is missing.
    #[error("missing parameter: {message}")]
    MissingField {
        /// Which parameter.
        message: String,
    },
    /// A query or path parameter is malformed.
    #[error("invalid parameters: {message}")]
    InvalidParams {
        /// What was wrong.
        message: String,
    },
}

impl BindError {
    /// A malformed parameter.
    pub fn invalid_params(message: impl Into<String>) -> Self {
        Self::InvalidParams {
            message: message.into(),
        }
    }

    fn from_body(source: serde_json::Error) -> Self {
        use serde_json::error::Category;
        match source.classify() {
            Category::Data => Self::JsonType { source },
            Category::Syntax | Category::Eof | Category::Io => Self::JsonSyntax { source },
        }
    }

    fn from_params(source: &serde_json::Error) -> Self {
        let message = source.to_string();
        if message.starts_with("missing field") {
            Self::MissingField { message }
        } else {
            Self::InvalidParams { message }
        }
    }
}

/// What a handler sees of one HTTP exchange.
pub trait HttpContext {
    /// Request verb.
    fn method(&self) -> &str;

    /// Request path.
    fn path(&self) -> &str;

    /// Named path parameters captured by the route pattern.
    fn path_params(&self) -> Vec<(String, String)>;

    /// Decoded query pairs in request order.
    fn query_pairs(&self) -> Vec<(String, String)>;

    /// Raw request body.
    fn body(&self) -> &[u8];

    /// First value of header `name`, if present and valid UTF-8.
    fn header(&self, name: &str) -> Option<&str>;

    /// Request-scoped deadline, cancellation and span.
    fn request_context(&self) -> &RequestContext;

    /// Set a response header.
    fn set_header(&mut self, name: &str, value: &str);

    /// Set the response status and JSON body.
    fn write_json(&mut self, status: u16, body: Value);
}

fn pairs_to_object(pairs: Vec<(String, String)>) -> Value {
    let mut object = Map::new();
    for (key, value) in pairs {
        object.entry(key).or_insert(Value::String(value));
    }
    Value::Object(object)
}

/// Typed binding on top of any [`HttpContext`].
pub trait BindExt: HttpContext {
    /// Deserialize the JSON body.
    ///
    /// # Errors
    ///
    /// [`BindError::JsonSyntax`] for malformed JSON, [`BindError::JsonType`]
    /// for JSON of the wrong shape.
    fn bind_json<T: DeserializeOwned>(&self) -> Result<T, BindError> {
        serde_json::from_slice(self.body()).map_err(BindError::from_body)
    }

    /// Deserialize query parameters; every value arrives as a string and the
    /// first occurrence of a key wins.
    ///
    /// # Errors
    ///
    /// [`BindError::MissingField`] or [`BindError::InvalidParams`].
    fn bind_query<T: DeserializeOwned>(&self) -> Result<T, BindError> {
        serde_json::from_value(pairs_to_object(self.query_pairs()))
            .map_err(|err| BindError::from_params(&err))
    }

    /// Deserialize path parameters; every value arrives as a string.
    ///
    /// # Errors
    ///
    /// [`BindError::MissingField`] or [`BindError::InvalidParams`].
    fn bind_path<T: DeserializeOwned>(&self) -> Result<T, BindError> {
        serde_json::from_value(pairs_to_object(self.path_params()))
            .map_err(|err| BindError::from_params(&err))
    }
}

impl<C: HttpContext + ?Sized> BindExt for C {}

/// A framework-neutral request handler.
pub type Handler =
    Arc<dyn for<'a> Fn(&'a mut dyn HttpContext) -> LocalBoxFuture<'a, ()> + Send + Sync>;

/// Box a closure as a [`Handler`].
pub fn handler<F>(f: F) -> Handler
where
    F: for<'a> Fn(&'a mut dyn HttpContext) -> LocalBoxFuture<'a, ()> + Send + Sync + 'static,
{
    Arc::new(f)
}

/// Route registration, relative to the group the router was created for.
///
/// Paths use `:name` for parameters.
pub trait Router {
    /// Register `handler` for `method` on `path`.
    fn handle(&mut self, method: Method, path: &str, handler: Handler);

    /// Register a `GET` route.
    fn get(&mut self, path: &str, handler: Handler) {
        self.handle(Method::Get, path, handler);
    }

    /// Register a `POST` route.
    fn post(&mut self, path: &str, handler: Handler) {
        self.handle(Method::Post, path, handler);
    }

    /// Register a `PUT` route.
    fn put(&mut self, path: &str, handler: Handler) {
        self.handle(Method::Put, path, handler);
    }

    /// Register a `PATCH` route.
    fn patch(&mut self, path: &str, handler: Handler) {
        self.handle(Method::Patch, path, handler);
    }

    /// Register a `DELETE` route.
    fn delete(&mut self, path: &str, handler: Handler) {
        self.handle(Method::Delete, path, handler);
    }
}
