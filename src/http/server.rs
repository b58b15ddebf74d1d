//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Turn function definitions into a route table at startup
//! - Mount every (method, pattern) binding on an Axum router
//! - Wire up middleware (preflight, CORS, body limit, request ID, tracing)
//! - Run the init hook before the listener starts
//! - Serve until `GET /__quit` or Ctrl-C, then drain gracefully
//!
//! # Design Decisions
//! - Bindings are mounted by router shape with positional placeholders, so
//!   `users/{id}` and `users/{userId}` share one route; each binding renames
//!   the captured values with its own parameter names
//! - Within a shape the first declared binding for a method is served
//! - Shapes are checked against a scratch `matchit` router before being
//!   mounted so a route the Axum router would refuse is skipped and logged
//! - `ANY` bindings become the method fallback of their path, explicit
//!   methods on the same path take precedence
//! - Each mounted method gets its own handler state holding the binding;
//!   there is no shared state beyond the handler registry

use std::collections::btree_map::Entry;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;

use axum::{
    body::Bytes,
    extract::{rejection::RawPathParamsRejection, DefaultBodyLimit, Query, RawPathParams, State},
    handler::Handler,
    http::{HeaderMap, Method},
    middleware,
    response::{IntoResponse, Response},
    routing::{get, MethodFilter, MethodRouter},
    Json, Router,
};
use serde_json::json;
use tokio::net::TcpListener;
use tower_http::{
    limit::RequestBodyLimitLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};

use crate::config::schema::{FunctionDefinition, GatewayConfig};
use crate::http::cors;
use crate::http::request::{decode_json_body, request_id};
use crate::http::response::render;
use crate::integration::selector::select;
use crate::invoke::dispatcher::Dispatcher;
use crate::invoke::event::{build_event, fold_query};
use crate::invoke::registry::HandlerRegistry;
use crate::lifecycle::{shutdown_signal, Shutdown};
use crate::observability::metrics;
use crate::routing::path::{normalize_prefix, parameter_index, translate, RouteResolutionError};
use crate::routing::table::{RouteBinding, RouteTable, ANY_METHOD};

/// Fixed route that stops the listener.
pub const QUIT_PATH: &str = "/__quit";

/// Served functions by name.
pub type HandlerMap = BTreeMap<String, Arc<FunctionDefinition>>;

/// Hook run after all endpoints are mounted and before the listener starts.
/// It may add routes or layers and returns the router to serve.
pub type InitHook = Box<dyn FnOnce(Router, &RouteTable, &HandlerMap) -> Router + Send>;

/// The API gateway simulator: route table, handlers and shutdown coordinator.
pub struct Gateway {
    config: GatewayConfig,
    dispatcher: Dispatcher,
    routes: RouteTable,
    handlers: HandlerMap,
    shutdown: Shutdown,
    init_hook: Option<InitHook>,
}

impl Gateway {
    /// Build the route table for `config`. Endpoints that cannot be routed
    /// and functions whose runtime has no loader are skipped.
    pub fn new(config: GatewayConfig, registry: HandlerRegistry) -> Self {
        let (routes, handlers) = register(&config, &registry);
        Self {
            config,
            dispatcher: Dispatcher::new(Arc::new(registry)),
            routes,
            handlers,
            shutdown: Shutdown::new(),
            init_hook: None,
        }
    }

    pub fn with_init_hook<F>(mut self, hook: F) -> Self
    where
        F: FnOnce(Router, &RouteTable, &HandlerMap) -> Router + Send + 'static,
    {
        self.init_hook = Some(Box::new(hook));
        self
    }

    pub fn routes(&self) -> &RouteTable {
        &self.routes
    }

    pub fn handlers(&self) -> &HandlerMap {
        &self.handlers
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    /// A handle that stops the server when triggered.
    pub fn shutdown_handle(&self) -> Shutdown {
        self.shutdown.clone()
    }

    /// Build the Axum router with all middleware layers.
    pub fn into_router(self) -> Router {
        let shutdown = self.shutdown.clone();
        let mut router = Router::new().route(
            QUIT_PATH,
            get(move || async move {
                tracing::info!("Quit request received, quitting");
                shutdown.trigger();
                Json(json!({ "ok": true }))
            }),
        );

        let mut mounted = matchit::Router::new();
        let _ = mounted.insert(QUIT_PATH, ());

        let mut count = 0;
        for (path, bindings) in group_by_shape(&self.routes) {
            match mount(&path, &bindings, &self.dispatcher, &mut mounted) {
                Ok(method_router) => {
                    router = router.route(&path, method_router);
                    count += bindings.len();
                }
                Err(e) => {
                    tracing::warn!(path = %path, error = %e, "Skipping endpoint");
                }
            }
        }
        metrics::record_routes(count);

        if let Some(hook) = self.init_hook {
            router = hook(router, &self.routes, &self.handlers);
        }

        router
            .layer(middleware::from_fn(cors::preflight))
            .layer(DefaultBodyLimit::disable())
            .layer(RequestBodyLimitLayer::new(self.config.server.max_body_bytes))
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(TraceLayer::new_for_http())
            .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
            .layer(cors::allow_origin_layer())
    }

    /// Run the server, accepting connections on the given listener.
    pub async fn run(self, listener: TcpListener) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        let shutdown = self.shutdown.clone();
        let app = self.into_router();

        tracing::info!(
            address = %addr,
            "Serverless API Gateway simulator listening on http://{}",
            addr
        );

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal(shutdown))
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// Compile function definitions into the route table and handler map.
fn register(config: &GatewayConfig, registry: &HandlerRegistry) -> (RouteTable, HandlerMap) {
    let prefix = normalize_prefix(&config.server.prefix);
    let variables = config.template_variables();
    let mut routes = RouteTable::new();
    let mut handlers = HandlerMap::new();

    for function in &config.functions {
        if !registry.supports(&function.runtime) {
            tracing::warn!(
                function = %function.name,
                runtime = %function.runtime,
                "Skipping function with unsupported runtime"
            );
            continue;
        }

        let function = Arc::new(function.clone());
        handlers.insert(function.name.clone(), function.clone());

        for endpoint in &function.endpoints {
            let pattern = match translate(&prefix, &endpoint.path) {
                Ok(pattern) => pattern,
                Err(e) => {
                    tracing::warn!(
                        function = %function.name,
                        path = %endpoint.path,
                        error = %e,
                        "Skipping endpoint"
                    );
                    continue;
                }
            };

            let responses = match &variables {
                Some(vars) => endpoint.responses.populate(vars),
                None => endpoint.responses.clone(),
            };

            let binding = RouteBinding::new(function.clone(), &endpoint.method, pattern, responses);
            tracing::debug!(
                function = %function.name,
                "Route: {} {}",
                binding.method,
                binding.pattern
            );
            routes.bind(binding);
        }
    }

    (routes, handlers)
}

/// Group bindings by router shape, in declaration order. Within a shape the
/// first binding declared for a method wins.
fn group_by_shape(routes: &RouteTable) -> Vec<(String, BTreeMap<String, Arc<RouteBinding>>)> {
    let mut groups: Vec<(String, BTreeMap<String, Arc<RouteBinding>>)> = Vec::new();

    for binding in routes.bindings() {
        let shape = match binding.pattern.to_router_shape() {
            Ok(shape) => shape,
            Err(e) => {
                tracing::warn!(pattern = %binding.pattern, error = %e, "Skipping endpoint");
                continue;
            }
        };

        let index = match groups.iter().position(|(path, _)| *path == shape) {
            Some(index) => index,
            None => {
                groups.push((shape, BTreeMap::new()));
                groups.len() - 1
            }
        };

        match groups[index].1.entry(binding.method.clone()) {
            Entry::Occupied(kept) => tracing::warn!(
                method = %binding.method,
                pattern = %binding.pattern,
                served = %kept.get().pattern,
                function = %binding.function.name,
                "Endpoint shadowed by an earlier route"
            ),
            Entry::Vacant(slot) => {
                slot.insert(binding.clone());
            }
        }
    }

    groups
}

/// Build the method router for one shape and reserve its path.
fn mount(
    path: &str,
    bindings: &BTreeMap<String, Arc<RouteBinding>>,
    dispatcher: &Dispatcher,
    mounted: &mut matchit::Router<()>,
) -> Result<MethodRouter, RouteResolutionError> {
    let mut method_router = MethodRouter::new();
    let mut any = None;
    let mut served = 0;
    for (method, binding) in bindings {
        if method == ANY_METHOD {
            any = Some(binding.clone());
            continue;
        }
        match method_filter(method) {
            Ok(filter) => {
                let state = EndpointState {
                    binding: binding.clone(),
                    dispatcher: dispatcher.clone(),
                };
                method_router = method_router.on_service(filter, serve.with_state(state));
                served += 1;
            }
            Err(e) => {
                tracing::warn!(pattern = %binding.pattern, error = %e, "Skipping endpoint");
            }
        }
    }
    if let Some(binding) = any {
        let state = EndpointState {
            binding,
            dispatcher: dispatcher.clone(),
        };
        method_router = method_router.fallback_service(serve.with_state(state));
        served += 1;
    }
    if served == 0 {
        return Err(RouteResolutionError::UnsupportedMethod(
            bindings.keys().cloned().collect::<Vec<_>>().join(","),
        ));
    }

    mounted
        .insert(path, ())
        .map_err(|e| RouteResolutionError::Rejected {
            path: path.to_string(),
            reason: e.to_string(),
        })?;

    Ok(method_router)
}

fn method_filter(method: &str) -> Result<MethodFilter, RouteResolutionError> {
    let unsupported = || RouteResolutionError::UnsupportedMethod(method.to_string());
    let method = Method::from_bytes(method.as_bytes()).map_err(|_| unsupported())?;
    MethodFilter::try_from(method).map_err(|_| unsupported())
}

/// Per-route state: the binding served and the dispatcher to run it.
#[derive(Clone)]
struct EndpointState {
    binding: Arc<RouteBinding>,
    dispatcher: Dispatcher,
}

async fn serve(
    State(EndpointState { binding, dispatcher }): State<EndpointState>,
    method: Method,
    params: Result<RawPathParams, RawPathParamsRejection>,
    Query(query): Query<Vec<(String, String)>>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let start = Instant::now();
    let function = &binding.function;

    let names = binding.pattern.parameters();
    let params: Vec<(String, String)> = match params {
        Ok(params) => params
            .iter()
            .filter_map(|(placeholder, value)| {
                let name = names.get(parameter_index(placeholder)?)?;
                Some((name.clone(), value.to_string()))
            })
            .collect(),
        Err(RawPathParamsRejection::MissingPathParams(_)) => Vec::new(),
        Err(rejection) => return rejection.into_response(),
    };

    let body = match decode_json_body(&headers, &body) {
        Ok(body) => body,
        Err(rejection) => return rejection.into_response(),
    };

    let request_id = request_id(&headers);
    tracing::info!(
        request_id = %request_id,
        function = %function.name,
        "Serving: {} {}",
        method,
        binding.pattern
    );

    let event = build_event(body, params, fold_query(query));
    let result = dispatcher.dispatch(function, event, request_id.clone()).await;
    let selected = select(&binding.responses, &result);

    let response = match render(selected.rule, result) {
        Ok(response) => response,
        Err(e) => {
            tracing::error!(
                request_id = %request_id,
                function = %function.name,
                rule = selected.name,
                error = %e,
                "Failed to build response"
            );
            e.into_response()
        }
    };

    metrics::record_invocation(&function.name, selected.name, response.status().as_u16(), start);
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::{Endpoint, RuntimeKind};
    use crate::integration::rules::{ResponseRule, ResponseRules};
    use crate::invoke::handler::direct;
    use crate::invoke::native::NativeModules;
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use serde_json::Value;
    use tower::ServiceExt;

    fn endpoint_def(method: &str, path: &str, responses: ResponseRules) -> Endpoint {
        Endpoint {
            method: method.into(),
            path: path.into(),
            responses,
        }
    }

    fn user_rules() -> ResponseRules {
        ResponseRules::new(vec![
            ("default".to_string(), ResponseRule::new(200)),
            (
                "notFound".to_string(),
                ResponseRule::new(404).with_pattern("NotFound:.*"),
            ),
        ])
        .unwrap()
    }

    fn gateway(endpoints: Vec<Endpoint>) -> Gateway {
        gateway_with_prefix(endpoints, "")
    }

    fn gateway_with_prefix(endpoints: Vec<Endpoint>, prefix: &str) -> Gateway {
        let modules = NativeModules::new().export(
            "users",
            "get",
            direct(|event, _| async move {
                let id = event.get("id").and_then(Value::as_str).map(str::to_string);
                match id.as_deref() {
                    Some("42") => Ok(json!({"name": "Ann"})),
                    Some(_) => Err(json!("NotFound: no such user")),
                    None => Ok(Value::Object(event)),
                }
            }),
        );
        let registry = HandlerRegistry::new().with_loader(RuntimeKind::Native, modules);
        let mut config = GatewayConfig {
            functions: vec![FunctionDefinition {
                name: "getUser".into(),
                handler: "users.get".parse().unwrap(),
                runtime: RuntimeKind::Native,
                endpoints,
            }],
            ..Default::default()
        };
        config.server.prefix = prefix.to_string();
        Gateway::new(config, registry)
    }

    async fn call(router: Router, method: &str, uri: &str) -> (StatusCode, HeaderMap, Bytes) {
        let response = router
            .oneshot(Request::builder().method(method).uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, headers, body)
    }

    #[tokio::test]
    async fn test_success_and_selected_error() {
        let router = gateway(vec![endpoint_def("get", "users/{id}", user_rules())]).into_router();

        let (status, headers, body) = call(router.clone(), "GET", "/users/42").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(headers["access-control-allow-origin"], "*");
        assert!(headers.contains_key("x-request-id"));
        assert_eq!(serde_json::from_slice::<Value>(&body).unwrap(), json!({"name": "Ann"}));

        let (status, _, body) = call(router, "GET", "/users/7").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(
            serde_json::from_slice::<Value>(&body).unwrap(),
            json!({"errorMessage": "NotFound: no such user"})
        );
    }

    #[tokio::test]
    async fn test_preflight() {
        let router = gateway(vec![endpoint_def("get", "users/{id}", user_rules())]).into_router();

        let (status, headers, body) = call(router, "OPTIONS", "/users/42").await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.is_empty());
        assert_eq!(headers["access-control-allow-methods"], cors::ALLOW_METHODS);
        assert_eq!(headers["access-control-allow-headers"], cors::ALLOW_HEADERS);
        assert_eq!(headers["access-control-allow-origin"], "*");
    }

    #[tokio::test]
    async fn test_any_method_and_prefix() {
        let router = gateway_with_prefix(
            vec![endpoint_def("ANY", "echo", ResponseRules::default())],
            "api",
        )
        .into_router();

        let (status, _, body) = call(router.clone(), "DELETE", "/api/echo?tag=a&tag=b").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            serde_json::from_slice::<Value>(&body).unwrap(),
            json!({"tag": ["a", "b"]})
        );

        let (status, _, _) = call(router, "GET", "/echo").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_unroutable_endpoints_are_skipped() {
        let gateway = gateway(vec![
            endpoint_def("GET", "users/{id}", user_rules()),
            endpoint_def("GET", "users/{name}", user_rules()),
            endpoint_def("GET", "files/{path+}/meta", ResponseRules::default()),
            endpoint_def("PURGE", "cache", ResponseRules::default()),
        ]);
        assert_eq!(gateway.routes().len(), 3);
        let router = gateway.into_router();

        let (status, _, _) = call(router.clone(), "GET", "/users/42").await;
        assert_eq!(status, StatusCode::OK);
        let (status, _, _) = call(router, "PURGE", "/cache").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_parameter_names_share_a_route() {
        let gateway = gateway(vec![
            endpoint_def("GET", "users/{userId}", user_rules()),
            endpoint_def("DELETE", "users/{id}", user_rules()),
        ]);
        assert_eq!(gateway.routes().len(), 2);
        let router = gateway.into_router();

        let (status, _, body) = call(router.clone(), "GET", "/users/7").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(serde_json::from_slice::<Value>(&body).unwrap(), json!({"userId": "7"}));

        let (status, _, body) = call(router, "DELETE", "/users/42").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(serde_json::from_slice::<Value>(&body).unwrap(), json!({"name": "Ann"}));
    }

    #[tokio::test]
    async fn test_first_declared_wins_within_shape() {
        let router = gateway(vec![
            endpoint_def("GET", "items/{name}/tags/{tag}", ResponseRules::default()),
            endpoint_def("GET", "items/{id}/tags/{label}", ResponseRules::default()),
        ])
        .into_router();

        let (status, _, body) = call(router, "GET", "/items/42/tags/red").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            serde_json::from_slice::<Value>(&body).unwrap(),
            json!({"name": "42", "tag": "red"})
        );
    }

    #[tokio::test]
    async fn test_init_hook_and_quit() {
        let gateway = gateway(vec![endpoint_def("get", "users/{id}", user_rules())])
            .with_init_hook(|router, routes, handlers| {
                let summary = json!({ "routes": routes.len(), "functions": handlers.len() });
                router.route("/__routes", get(move || async move { Json(summary) }))
            });
        let shutdown = gateway.shutdown_handle();
        let router = gateway.into_router();

        let (status, headers, body) = call(router.clone(), "GET", "/__routes").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(headers["access-control-allow-origin"], "*");
        assert_eq!(
            serde_json::from_slice::<Value>(&body).unwrap(),
            json!({"routes": 1, "functions": 1})
        );

        assert!(!shutdown.is_triggered());
        let (_, _, body) = call(router, "GET", QUIT_PATH).await;
        assert_eq!(serde_json::from_slice::<Value>(&body).unwrap(), json!({"ok": true}));
        assert!(shutdown.is_triggered());
    }

    #[tokio::test]
    async fn test_malformed_json_body() {
        let router = gateway(vec![endpoint_def("post", "users", ResponseRules::default())]).into_router();
        let response = router
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/users")
                    .header("content-type", "application/json")
                    .body(Body::from("{nope"))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
