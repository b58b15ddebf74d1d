//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the gateway
//! simulator. All types derive Serde traits for deserialization from config
//! files.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::integration::rules::ResponseRules;

/// Root configuration for the gateway simulator.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct GatewayConfig {
    /// Listener settings (host, port, prefix, body limit).
    pub server: ServerConfig,

    /// Where `process` handlers live and what they inherit.
    pub handlers: HandlersConfig,

    /// Stage used to populate response rule templates.
    pub stage: Option<String>,

    /// Region used to populate response rule templates.
    pub region: Option<String>,

    /// Extra `${name}` values for response rule templates.
    pub variables: HashMap<String, String>,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    /// Function definitions.
    pub functions: Vec<FunctionDefinition>,
}

impl GatewayConfig {
    /// Template variables, or `None` unless both stage and region are set.
    pub fn template_variables(&self) -> Option<HashMap<String, String>> {
        let (stage, region) = (self.stage.as_ref()?, self.region.as_ref()?);
        let mut vars = self.variables.clone();
        vars.insert("stage".to_string(), stage.clone());
        vars.insert("region".to_string(), region.clone());
        Some(vars)
    }
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Interface to bind.
    pub host: String,

    /// TCP port.
    pub port: u16,

    /// Prefix added in front of every endpoint path.
    pub prefix: String,

    /// Maximum accepted JSON body size in bytes.
    pub max_body_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 1465,
            prefix: String::new(),
            max_body_bytes: 5 * 1024 * 1024, // 5MB
        }
    }
}

impl ServerConfig {
    /// `host:port` for binding.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Settings for `process` runtime handlers.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct HandlersConfig {
    /// Directory module paths are resolved against.
    pub root: PathBuf,

    /// Environment variables set on every handler process.
    pub environment: BTreeMap<String, String>,
}

impl Default for HandlersConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("."),
            environment: BTreeMap::new(),
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable the Prometheus endpoint.
    pub metrics_enabled: bool,

    /// Prometheus endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "127.0.0.1:9465".to_string(),
        }
    }
}

/// One deployable function and the endpoints that front it.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct FunctionDefinition {
    /// Function identifier for logging/metrics.
    pub name: String,

    /// `module.export` locator.
    pub handler: HandlerLocator,

    /// Runtime used to load the handler.
    #[serde(default)]
    pub runtime: RuntimeKind,

    /// HTTP endpoints bound to this function.
    #[serde(default)]
    pub endpoints: Vec<Endpoint>,
}

/// An HTTP method + path template bound to a function.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Endpoint {
    /// HTTP method, any case; `ANY` binds all methods.
    pub method: String,

    /// Path template such as `users/{id}`.
    pub path: String,

    /// Ordered response rules.
    #[serde(default)]
    pub responses: ResponseRules,
}

/// Module reference plus exported symbol.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize, Serialize)]
#[serde(try_from = "String", into = "String")]
pub struct HandlerLocator {
    pub module: String,
    pub export: String,
}

impl FromStr for HandlerLocator {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.rsplit_once('.') {
            Some((module, export)) if !module.is_empty() && !export.is_empty() => Ok(Self {
                module: module.to_string(),
                export: export.to_string(),
            }),
            _ => Err(format!(
                "invalid handler '{s}': expected '<module>.<export>'"
            )),
        }
    }
}

impl TryFrom<String> for HandlerLocator {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<HandlerLocator> for String {
    fn from(locator: HandlerLocator) -> Self {
        locator.to_string()
    }
}

impl fmt::Display for HandlerLocator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.module, self.export)
    }
}

/// How a function's handler is loaded.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Deserialize, Serialize)]
#[serde(from = "String", into = "String")]
pub enum RuntimeKind {
    /// Registered in-process through the library API.
    Native,
    /// External executable speaking JSON over stdio.
    #[default]
    Process,
    /// Anything else; such functions are not served.
    Other(String),
}

impl From<String> for RuntimeKind {
    fn from(value: String) -> Self {
        match value.to_ascii_lowercase().as_str() {
            "native" => Self::Native,
            "process" => Self::Process,
            _ => Self::Other(value),
        }
    }
}

impl From<RuntimeKind> for String {
    fn from(kind: RuntimeKind) -> Self {
        kind.to_string()
    }
}

impl fmt::Display for RuntimeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Native => f.write_str("native"),
            Self::Process => f.write_str("process"),
            Self::Other(name) => f.write_str(name),
        }
    }
}
