//! actix-web implementation of the transport contracts.
//!
//! An [`ActixRouter`] collects routes for one group and is applied to an
//! actix `ServiceConfig` afterwards. Each request gets a fresh
//! [`RequestContext`] bounded by the configured request timeout.

use std::sync::Arc;
use std::time::Duration;

use actix_web::http::StatusCode;
use actix_web::http::header::{HeaderName, HeaderValue};
use actix_web::{HttpRequest, HttpResponse, web};
use serde_json::Value;

use crate::observability::RequestContext;

use super::transport::{Handler, HttpContext, Method, Router};

/// [`HttpContext`] over an actix request.
pub struct ActixContext<'r> {
    request: &'r HttpRequest,
    body: web::Bytes,
    context: RequestContext,
    status: StatusCode,
    headers: Vec<(HeaderName, HeaderValue)>,
    json: Option<Value>,
}

impl<'r> ActixContext<'r> {
    /// Wrap `request` with a context expiring after `timeout`.
    #[must_use]
    pub fn new(request: &'r HttpRequest, body: web::Bytes, timeout: Duration) -> Self {
        Self {
            request,
            body,
            context: RequestContext::background().with_timeout(timeout),
            status: StatusCode::OK,
            headers: Vec::new(),
            json: None,
        }
    }

    /// Build the actix response from what the handler wrote.
    #[must_use]
    pub fn into_response(self) -> HttpResponse {
        let mut builder = HttpResponse::build(self.status);
        for header in self.headers {
            builder.insert_header(header);
        }
        match self.json {
            Some(body) => builder.json(body),
            None => builder.finish(),
        }
    }
}

impl HttpContext for ActixContext<'_> {
    fn method(&self) -> &str {
        self.request.method().as_str()
    }

    fn path(&self) -> &str {
        self.request.path()
    }

    fn path_params(&self) -> Vec<(String, String)> {
        self.request
            .match_info()
            .iter()
            .map(|(name, value)| (name.to_owned(), value.to_owned()))
            .collect()
    }

    fn query_pairs(&self) -> Vec<(String, String)> {
        url::form_urlencoded::parse(self.request.query_string().as_bytes())
            .into_owned()
            .collect()
    }

    fn body(&self) -> &[u8] {
        &self.body
    }

    fn header(&self, name: &str) -> Option<&str> {
        self.request
            .headers()
            .get(name)
            .and_then(|value| value.to_str().ok())
    }

    fn request_context(&self) -> &RequestContext {
        &self.context
    }

    fn set_header(&mut self, name: &str, value: &str) {
        match (
            HeaderName::try_from(name),
            HeaderValue::try_from(value),
        ) {
            (Ok(name), Ok(value)) => self.headers.push((name, value)),
            _ => tracing::debug!(header = name, "dropping invalid response header"),
        }
    }

    fn write_json(&mut self, status: u16, body: Value) {
        self.status = StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        self.json = Some(body);
    }
}

/// Convert `:name` segments to actix `{name}` segments. The group root `/`
/// becomes the empty pattern so `/members` matches without a trailing slash.
fn actix_pattern(path: &str) -> String {
    if path == "/" || path.is_empty() {
        return String::new();
    }
    path.split('/')
        .map(|segment| match segment.strip_prefix(':') {
            Some(name) => format!("{{{name}}}"),
            None => segment.to_owned(),
        })
        .collect::<Vec<_>>()
        .join("/")
}

fn actix_method(method: Method) -> actix_web::http::Method {
    use actix_web::http::Method as M;
    match method {
        Method::Get => M::GET,
        Method::Post => M::POST,
        Method::Put => M::PUT,
        Method::Patch => M::PATCH,
        Method::Delete => M::DELETE,
    }
}

/// Route group backed by an actix scope.
pub struct ActixRouter {
    prefix: String,
    request_timeout: Duration,
    resources: Vec<(String, Vec<(Method, Handler)>)>,
}

impl ActixRouter {
    /// Group rooted at `prefix`.
    #[must_use]
    pub fn group(prefix: impl Into<String>, request_timeout: Duration) -> Self {
        Self {
            prefix: prefix.into(),
            request_timeout,
            resources: Vec::new(),
        }
    }

    /// Registered `(method, pattern)` pairs in registration order.
    #[must_use]
    pub fn routes(&self) -> Vec<(Method, String)> {
        self.resources
            .iter()
            .flat_map(|(pattern, handlers)| {
                handlers
                    .iter()
                    .map(move |(method, _)| (*method, format!("{}{pattern}", self.prefix)))
            })
            .collect()
    }

    /// Mount the group on `cfg`.
    pub fn configure(self, cfg: &mut web::ServiceConfig) {
        let timeout = self.request_timeout;
        let mut scope = web::scope(&self.prefix);
        for (pattern, handlers) in self.resources {
            let mut resource = web::resource(pattern.as_str());
            for (method, handler) in handlers {
                resource = resource.route(web::method(actix_method(method)).to(
                    move |request: HttpRequest, body: web::Bytes| {
                        let handler = Arc::clone(&handler);
                        async move {
                            let mut ctx = ActixContext::new(&request, body, timeout);
                            handler(&mut ctx).await;
                            ctx.into_response()
                        }
                    },
                ));
            }
            scope = scope.service(resource);
        }
        cfg.service(scope);
    }
}

impl Router for ActixRouter {
    fn handle(&mut self, method: Method, path: &str, handler: Handler) {
        let pattern = actix_pattern(path);
        match self
            .resources
            .iter_mut()
            .find(|(existing, _)| *existing == pattern)
        {
            Some((_, handlers)) => handlers.push((method, handler)),
            None => self.resources.push((pattern, vec![(method, handler)])),
        }
    }
}

#[cfg(test)]
mod tests {
    use actix_web::{App, test as actix_test};
    use futures_util::FutureExt as _;
    use rstest::rstest;
    use serde_json::json;

    use super::*;
    use crate::inbound::http::transport::{BindExt as _, handler};

    #[rstest]
    #[case("/", "")]
    #[case("/:id", "/{id}")]
    #[case("/:id/email", "/{id}/email")]
    #[case("/email/:email", "/email/{email}")]
    fn patterns_are_translated(#[case] path: &str, #[case] expected: &str) {
        assert_eq!(actix_pattern(path), expected);
    }

    fn echo() -> Handler {
        handler(|ctx| {
            async move {
                let params = ctx.path_params();
                let query = ctx.query_pairs();
                let body = json!({
                    "method": ctx.method(),
                    "params": params,
                    "query": query,
                    "has_deadline": ctx.request_context().deadline().is_some(),
                });
                ctx.set_header("x-echo", "1");
                ctx.write_json(201, body);
            }
            .boxed_local()
        })
    }

    #[actix_web::test]
    async fn routes_are_served_under_the_group() {
        let mut router = ActixRouter::group("/things", Duration::from_secs(5));
        router.get("/", echo());
        router.patch("/:id", echo());
        let app = actix_test::init_service(App::new().configure(|cfg| router.configure(cfg))).await;

        let request = actix_test::TestRequest::patch()
            .uri("/things/7?x=1")
            .to_request();
        let response = actix_test::call_service(&app, request).await;

        assert_eq!(response.status(), StatusCode::CREATED);
        assert!(response.headers().contains_key("x-echo"));
        let body: Value = actix_test::read_body_json(response).await;
        assert_eq!(body["method"], "PATCH");
        assert_eq!(body["params"], json!([["id", "7"]]));
        assert_eq!(body["query"], json!([["x", "1"]]));
        assert_eq!(body["has_deadline"], true);
    }

    #[actix_web::test]
    async fn group_root_matches_without_trailing_slash() {
        let mut router = ActixRouter::group("/things", Duration::from_secs(5));
        router.get("/", echo());
        let app = actix_test::init_service(App::new().configure(|cfg| router.configure(cfg))).await;

        let response = actix_test::call_service(
            &app,
            actix_test::TestRequest::get().uri("/things").to_request(),
        )
        .await;

        assert_eq!(response.status(), StatusCode::CREATED);
    }

    #[actix_web::test]
    async fn body_is_available_for_binding() {
        let mut router = ActixRouter::group("/things", Duration::from_secs(5));
        router.post(
            "/",
            handler(|ctx| {
                async move {
                    let body = ctx.bind_json::<Value>().unwrap_or(Value::Null);
                    ctx.write_json(200, body);
                }
                .boxed_local()
            }),
        );
        let app = actix_test::init_service(App::new().configure(|cfg| router.configure(cfg))).await;

        let request = actix_test::TestRequest::post()
            .uri("/things")
            .set_json(json!({"name": "A"}))
            .to_request();
        let body: Value = actix_test::call_and_read_body_json(&app, request).await;

        assert_eq!(body, json!({"name": "A"}));
    }

    #[rstest]
    fn routes_list_every_method_per_pattern() {
        let mut router = ActixRouter::group("/things", Duration::from_secs(1));
        router.get("/:id", echo());
        router.delete("/:id", echo());

        assert_eq!(
            router.routes(),
            vec![
                (Method::Get, "/things/{id}".to_owned()),
                (Method::Delete, "/things/{id}".to_owned()),
            ]
        );
    }
}
