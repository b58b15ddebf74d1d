//! Configuration loading from disk.

use std::fs;
use std::path::Path;

use crate::config::schema::GatewayConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Parse(toml::de::Error),
    Json(serde_json::Error),
    Validation(Vec<ValidationError>),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "IO error: {}", e),
            ConfigError::Parse(e) => write!(f, "Parse error: {}", e),
            ConfigError::Json(e) => write!(f, "Parse error: {}", e),
            ConfigError::Validation(errors) => {
                write!(f, "Validation failed: ")?;
                for (i, err) in errors.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", err)?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for ConfigError {}

/// Load and validate configuration. `.json` files are read as JSON, anything else as TOML.
pub fn load_config(path: &Path) -> Result<GatewayConfig, ConfigError> {
    let content = fs::read_to_string(path).map_err(ConfigError::Io)?;
    let is_json = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));

    let config = if is_json {
        parse_json(&content)?
    } else {
        parse_toml(&content)?
    };

    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

/// Parse a TOML document without validating it.
pub fn parse_toml(content: &str) -> Result<GatewayConfig, ConfigError> {
    toml::from_str(content).map_err(ConfigError::Parse)
}

/// Parse a JSON document without validating it.
pub fn parse_json(content: &str) -> Result<GatewayConfig, ConfigError> {
    serde_json::from_str(content).map_err(ConfigError::Json)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::RuntimeKind;
    use std::path::PathBuf;

    const TOML: &str = r#"
stage = "dev"
region = "us-east-1"

[server]
port = 3000
prefix = "api"

[handlers]
root = "functions"
environment = { TABLE = "users" }

[[functions]]
name = "getUser"
handler = "users/index.get"

[[functions.endpoints]]
method = "get"
path = "users/{id}"

[functions.endpoints.responses.default]
statusCode = 200

[functions.endpoints.responses.notFound]
statusCode = "404"
selectionPattern = "NotFound.*"

[[functions]]
name = "legacy"
handler = "legacy.main"
runtime = "python2.7"
"#;

    fn temp_file(name: &str, content: &str) -> PathBuf {
        let path = std::env::temp_dir().join(format!("{}-{}", std::process::id(), name));
        fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_parse_toml() {
        let config = parse_toml(TOML).unwrap();
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.prefix, "api");
        assert_eq!(config.handlers.environment["TABLE"], "users");
        assert_eq!(config.functions.len(), 2);

        let get_user = &config.functions[0];
        assert_eq!(get_user.runtime, RuntimeKind::Process);
        assert_eq!(get_user.handler.module, "users/index");
        let endpoint = &get_user.endpoints[0];
        assert_eq!(endpoint.method, "get");
        let names: Vec<_> = endpoint.responses.iter().map(|(n, _)| n).collect();
        assert_eq!(names, vec!["default", "notFound"]);

        assert_eq!(
            config.functions[1].runtime,
            RuntimeKind::Other("python2.7".into())
        );
    }

    #[test]
    fn test_load_json_by_extension() {
        let path = temp_file(
            "gateway.json",
            r#"{"functions": [{"name": "hello", "handler": "hello.handler", "runtime": "native",
                "endpoints": [{"method": "POST", "path": "hello"}]}]}"#,
        );
        let config = load_config(&path).unwrap();
        fs::remove_file(&path).ok();

        assert_eq!(config.functions[0].runtime, RuntimeKind::Native);
        assert_eq!(config.functions[0].endpoints[0].responses.len(), 1);
    }

    #[test]
    fn test_load_rejects_invalid() {
        let path = temp_file(
            "invalid.toml",
            "[server]\nmax_body_bytes = 0\n",
        );
        let err = load_config(&path).unwrap_err();
        fs::remove_file(&path).ok();

        assert!(matches!(err, ConfigError::Validation(_)));
        assert!(err.to_string().contains("max_body_bytes"));
    }

    #[test]
    fn test_missing_file() {
        let err = load_config(Path::new("/definitely/not/here.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }

    #[test]
    fn test_bad_handler_locator() {
        let err = parse_toml("[[functions]]\nname = \"x\"\nhandler = \"nodot\"\n").unwrap_err();
        assert!(err.to_string().contains("nodot"));
    }
}
