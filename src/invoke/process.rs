//! External executable handlers.
//!
//! # Data Flow
//! ```text
//! event ──JSON──▶ child stdin (closed after one document)
//! child stdout ──lines──▶ outcome line?  ──yes──▶ Completion
//!                                          └─no──▶ tracing (handler output)
//! child exit without outcome ──▶ stderr (non-zero) or completion dropped
//! ```
//!
//! # Design Decisions
//! - One process per invocation; nothing is pooled or kept warm
//! - The export name is the first argument so one executable can serve
//!   several exports
//! - Every outcome line is forwarded; the completion keeps only the first

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::process::Stdio;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::process::Command;

use crate::config::schema::{HandlerLocator, HandlersConfig};
use crate::invoke::event::InvocationEvent;
use crate::invoke::handler::{Completion, Invocable, InvocationContext};
use crate::invoke::registry::{HandlerLoadError, HandlerLoader};

/// Environment variable carrying the function name.
pub const FUNCTION_NAME_ENV: &str = "SERVE_FUNCTION_NAME";
/// Environment variable carrying the request id.
pub const REQUEST_ID_ENV: &str = "SERVE_REQUEST_ID";

/// A line a handler process writes to report its outcome.
#[derive(Debug, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
enum Outcome {
    Success {
        #[serde(default)]
        response: Value,
    },
    Error {
        #[serde(default)]
        error: Value,
    },
}

/// Resolves `process` runtime locators to executables under a root directory.
#[derive(Debug, Clone)]
pub struct ProcessLoader {
    root: PathBuf,
    environment: Arc<BTreeMap<String, String>>,
}

impl ProcessLoader {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            environment: Arc::new(BTreeMap::new()),
        }
    }

    pub fn from_config(config: &HandlersConfig) -> Self {
        Self::new(config.root.clone()).with_environment(config.environment.clone())
    }

    pub fn with_environment(mut self, environment: BTreeMap<String, String>) -> Self {
        self.environment = Arc::new(environment);
        self
    }
}

impl HandlerLoader for ProcessLoader {
    fn load(&self, locator: &HandlerLocator) -> Result<Arc<dyn Invocable>, HandlerLoadError> {
        let program = self.root.join(&locator.module);
        if !program.is_file() {
            return Err(HandlerLoadError::ModuleNotFound {
                module: locator.module.clone(),
            });
        }

        Ok(Arc::new(ProcessHandler {
            program,
            export: locator.export.clone(),
            environment: self.environment.clone(),
        }))
    }
}

/// One executable + export pair.
#[derive(Debug)]
pub struct ProcessHandler {
    program: PathBuf,
    export: String,
    environment: Arc<BTreeMap<String, String>>,
}

#[async_trait]
impl Invocable for ProcessHandler {
    async fn invoke(&self, event: InvocationEvent, context: InvocationContext, completion: Completion) {
        let spawned = Command::new(&self.program)
            .arg(&self.export)
            .envs(self.environment.iter())
            .env(FUNCTION_NAME_ENV, &context.function_name)
            .env(REQUEST_ID_ENV, &context.request_id)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn();

        let mut child = match spawned {
            Ok(child) => child,
            Err(e) => {
                tracing::error!(program = %self.program.display(), error = %e, "Failed to start handler");
                completion.fail(format!("Failed to start handler: {}", e));
                return;
            }
        };

        if let Some(mut stdin) = child.stdin.take() {
            let input = format!("{}\n", Value::Object(event));
            tokio::spawn(async move {
                if let Err(e) = stdin.write_all(input.as_bytes()).await {
                    tracing::debug!(error = %e, "Handler closed stdin early");
                }
            });
        }

        let stderr_task = child.stderr.take().map(|mut stderr| {
            tokio::spawn(async move {
                let mut buf = String::new();
                let _ = stderr.read_to_string(&mut buf).await;
                buf
            })
        });

        let mut reported = false;
        if let Some(stdout) = child.stdout.take() {
            let mut lines = BufReader::new(stdout).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                match serde_json::from_str::<Outcome>(&line) {
                    Ok(Outcome::Success { response }) => {
                        reported = true;
                        completion.succeed(response);
                    }
                    Ok(Outcome::Error { error }) => {
                        reported = true;
                        completion.fail(error);
                    }
                    Err(_) => {
                        tracing::info!(
                            function = %context.function_name,
                            request_id = %context.request_id,
                            "{}",
                            line
                        );
                    }
                }
            }
        }

        let status = child.wait().await;
        let stderr = match stderr_task {
            Some(task) => task.await.unwrap_or_default(),
            None => String::new(),
        };

        if reported {
            return;
        }

        match status {
            Ok(status) if !status.success() => {
                tracing::warn!(function = %context.function_name, %status, "Handler exited with failure");
                let message = stderr.trim();
                if message.is_empty() {
                    completion.fail(format!("Process exited with {}", status));
                } else {
                    completion.fail(message.to_string());
                }
            }
            Ok(_) => {}
            Err(e) => completion.fail(format!("Failed to wait for handler: {}", e)),
        }
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::invoke::handler::InvocationResult;
    use serde_json::json;
    use std::os::unix::fs::PermissionsExt;

    fn handler_root(name: &str) -> PathBuf {
        let root = std::env::temp_dir().join(format!("serve-process-{}-{}", std::process::id(), name));
        std::fs::create_dir_all(&root).unwrap();
        root
    }

    fn script(root: &PathBuf, name: &str, body: &str) {
        let path = root.join(name);
        std::fs::write(&path, format!("#!/bin/sh\n{}\n", body)).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
    }

    fn context() -> InvocationContext {
        InvocationContext {
            function_name: "getUser".into(),
            request_id: "req-1".into(),
        }
    }

    async fn run(loader: &ProcessLoader, handler: &str, event: Value) -> Vec<InvocationResult> {
        let invocable = loader.load(&handler.parse().unwrap()).unwrap();
        let (completion, mut rx) = Completion::channel();
        let event = match event {
            Value::Object(map) => map,
            _ => InvocationEvent::new(),
        };
        invocable.invoke(event, context(), completion).await;

        let mut results = Vec::new();
        while let Some(result) = rx.recv().await {
            results.push(result);
        }
        results
    }

    #[tokio::test]
    async fn test_echoes_event_and_environment() {
        let root = handler_root("echo");
        script(
            &root,
            "echo",
            r#"read event
echo "starting $1"
echo "{\"status\":\"success\",\"response\":{\"export\":\"$1\",\"fn\":\"$SERVE_FUNCTION_NAME\",\"table\":\"$TABLE\",\"event\":$event}}""#,
        );
        let loader = ProcessLoader::new(&root)
            .with_environment(BTreeMap::from([("TABLE".to_string(), "users".to_string())]));

        let results = run(&loader, "echo.handler", json!({"id": "42"})).await;
        assert_eq!(
            results,
            vec![InvocationResult::Success(json!({
                "export": "handler",
                "fn": "getUser",
                "table": "users",
                "event": {"id": "42"}
            }))]
        );
    }

    #[tokio::test]
    async fn test_reports_error_outcome() {
        let root = handler_root("error");
        script(&root, "fail", r#"echo '{"status":"error","error":"NotFound: no such user"}'"#);

        let results = run(&ProcessLoader::new(&root), "fail.handler", json!({})).await;
        assert_eq!(results[0], InvocationResult::Failure(json!("NotFound: no such user")));
    }

    #[tokio::test]
    async fn test_nonzero_exit_uses_stderr() {
        let root = handler_root("crash");
        script(&root, "crash", "echo 'TypeError: boom' >&2\nexit 3");

        let results = run(&ProcessLoader::new(&root), "crash.handler", json!({})).await;
        assert_eq!(results, vec![InvocationResult::Failure(json!("TypeError: boom"))]);
    }

    #[tokio::test]
    async fn test_clean_exit_without_outcome_reports_nothing() {
        let root = handler_root("silent");
        script(&root, "silent", "echo 'just logging'");

        let results = run(&ProcessLoader::new(&root), "silent.handler", json!({})).await;
        assert!(results.is_empty());
    }

    #[test]
    fn test_missing_module() {
        let loader = ProcessLoader::new(handler_root("missing"));
        assert_eq!(
            loader.load(&"nope.handler".parse().unwrap()).err(),
            Some(HandlerLoadError::ModuleNotFound {
                module: "nope".into()
            })
        );
    }
}
