//! Shared utilities for integration tests.

use std::net::SocketAddr;
use std::time::Duration;

use serde_json::{json, Value};
use serverless_serve::config::{Endpoint, FunctionDefinition, GatewayConfig, RuntimeKind};
use serverless_serve::integration::{ResponseRule, ResponseRules};
use serverless_serve::invoke::{callback, direct, Completion};
use serverless_serve::{Gateway, HandlerRegistry, NativeModules, Shutdown};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

/// A running gateway bound to an ephemeral port.
#[allow(dead_code)]
pub struct TestGateway {
    pub addr: SocketAddr,
    pub shutdown: Shutdown,
    pub handle: JoinHandle<Result<(), std::io::Error>>,
}

#[allow(dead_code)]
impl TestGateway {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }
}

/// Start `gateway` on 127.0.0.1 with an OS-assigned port.
pub async fn start_gateway(gateway: Gateway) -> TestGateway {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let shutdown = gateway.shutdown_handle();
    let handle = tokio::spawn(gateway.run(listener));

    tokio::time::sleep(Duration::from_millis(50)).await;
    TestGateway {
        addr,
        shutdown,
        handle,
    }
}

/// A client that never reuses connections.
pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .no_proxy()
        .build()
        .unwrap()
}

/// `default` → 200, `NotFound:` errors → 404.
#[allow(dead_code)]
pub fn user_rules() -> ResponseRules {
    ResponseRules::new(vec![
        ("default".to_string(), ResponseRule::new(200)),
        (
            "notFound".to_string(),
            ResponseRule::new(404).with_pattern("NotFound:.*"),
        ),
    ])
    .unwrap()
}

#[allow(dead_code)]
pub fn endpoint(method: &str, path: &str, responses: ResponseRules) -> Endpoint {
    Endpoint {
        method: method.to_string(),
        path: path.to_string(),
        responses,
    }
}

#[allow(dead_code)]
pub fn function(name: &str, handler: &str, endpoints: Vec<Endpoint>) -> FunctionDefinition {
    FunctionDefinition {
        name: name.to_string(),
        handler: handler.parse().unwrap(),
        runtime: RuntimeKind::Native,
        endpoints,
    }
}

/// Native handlers used across tests.
///
/// - `users.get`: `{name: "Ann"}` for id 42, `NotFound: no such user` otherwise
/// - `echo.handler`: returns the event it received
/// - `twice.handler`: reports success then failure
#[allow(dead_code)]
pub fn modules() -> NativeModules {
    NativeModules::new()
        .export(
            "users",
            "get",
            direct(|event, _| async move {
                if event.get("id") == Some(&json!("42")) {
                    Ok(json!({"name": "Ann"}))
                } else {
                    Err(json!("NotFound: no such user"))
                }
            }),
        )
        .export(
            "echo",
            "handler",
            direct(|event, _| async move { Ok::<Value, Value>(Value::Object(event)) }),
        )
        .export(
            "twice",
            "handler",
            callback(|_, _, completion: Completion| async move {
                completion.succeed(json!("first"));
                completion.fail("second");
            }),
        )
}

/// Build a gateway over native handlers.
#[allow(dead_code)]
pub fn native_gateway(config: GatewayConfig) -> Gateway {
    let registry = HandlerRegistry::new().with_loader(RuntimeKind::Native, modules());
    Gateway::new(config, registry)
}
