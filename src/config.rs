//! Pod configuration.
//!
//! Sources, lowest to highest priority:
//!
//! 1. built-in defaults
//! 2. a JSON file named by `SQLPOD_CONFIG`
//! 3. `SQLPOD_NAMESPACE`, `SQLPOD_DEFAULT_TARGET`, `SQLPOD_MAX_ENVELOPE_SIZE`
//!
//! ```json
//! { "namespace": "pod.sqlpod", "default_target": "/var/lib/app.db" }
//! ```

use std::path::Path;

use serde::Deserialize;

use crate::error::{PodError, Result};
use crate::handler::DEFAULT_NAMESPACE;
use crate::protocol::DEFAULT_MAX_ENVELOPE_SIZE;

/// Environment variable naming the JSON config file.
pub const ENV_CONFIG: &str = "SQLPOD_CONFIG";
pub const ENV_NAMESPACE: &str = "SQLPOD_NAMESPACE";
pub const ENV_DEFAULT_TARGET: &str = "SQLPOD_DEFAULT_TARGET";
pub const ENV_MAX_ENVELOPE_SIZE: &str = "SQLPOD_MAX_ENVELOPE_SIZE";

/// Runtime configuration of the pod.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PodConfig {
    /// Namespace the vars are advertised under.
    pub namespace: String,
    /// Target used when a request names none. Empty means in-memory.
    pub default_target: String,
    /// Largest envelope accepted from the host, in bytes.
    pub max_envelope_size: usize,
}

impl Default for PodConfig {
    fn default() -> Self {
        Self {
            namespace: DEFAULT_NAMESPACE.to_string(),
            default_target: String::new(),
            max_envelope_size: DEFAULT_MAX_ENVELOPE_SIZE,
        }
    }
}

impl PodConfig {
    /// Load from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::load_with(|key| std::env::var(key).ok())
    }

    /// Load using `lookup` in place of the process environment.
    pub fn load_with<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = match lookup(ENV_CONFIG).filter(|p| !p.is_empty()) {
            Some(path) => Self::from_json_file(path)?,
            None => Self::default(),
        };
        config.apply_overrides(lookup)?;
        config.validate()?;
        Ok(config)
    }

    /// Read a JSON config file. Missing keys keep their defaults.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| PodError::Config(format!("cannot read {}: {e}", path.display())))?;
        Self::from_json_str(&text)
            .map_err(|e| PodError::Config(format!("{}: {e}", path.display())))
    }

    pub fn from_json_str(text: &str) -> Result<Self> {
        serde_json::from_str(text).map_err(|e| PodError::Config(e.to_string()))
    }

    fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(namespace) = lookup(ENV_NAMESPACE) {
            self.namespace = namespace;
        }
        if let Some(target) = lookup(ENV_DEFAULT_TARGET) {
            self.default_target = target;
        }
        if let Some(size) = lookup(ENV_MAX_ENVELOPE_SIZE) {
            self.max_envelope_size = size.trim().parse().map_err(|_| {
                PodError::Config(format!("{ENV_MAX_ENVELOPE_SIZE} must be a byte count, got {size:?}"))
            })?;
        }
        Ok(())
    }

    /// Reject values the pod cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.namespace.is_empty() {
            return Err(PodError::Config("namespace must not be empty".into()));
        }
        if self.namespace.contains('/') {
            return Err(PodError::Config(format!(
                "namespace {:?} must not contain '/'",
                self.namespace
            )));
        }
        if self.max_envelope_size == 0 {
            return Err(PodError::Config("max_envelope_size must be positive".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = PodConfig::load_with(lookup(&[])).unwrap();
        assert_eq!(config, PodConfig::default());
        assert_eq!(config.namespace, "pod.sqlpod");
        assert_eq!(config.max_envelope_size, 64 * 1024 * 1024);
    }

    #[test]
    fn test_env_overrides() {
        let config = PodConfig::load_with(lookup(&[
            (ENV_NAMESPACE, "my.db"),
            (ENV_DEFAULT_TARGET, "/tmp/x.db"),
            (ENV_MAX_ENVELOPE_SIZE, "1024"),
        ]))
        .unwrap();
        assert_eq!(config.namespace, "my.db");
        assert_eq!(config.default_target, "/tmp/x.db");
        assert_eq!(config.max_envelope_size, 1024);
    }

    #[test]
    fn test_bad_size() {
        let err = PodConfig::load_with(lookup(&[(ENV_MAX_ENVELOPE_SIZE, "lots")])).unwrap_err();
        assert_eq!(err.kind(), "config");
        assert!(PodConfig::load_with(lookup(&[(ENV_MAX_ENVELOPE_SIZE, "0")])).is_err());
    }

    #[test]
    fn test_bad_namespace() {
        assert!(PodConfig::load_with(lookup(&[(ENV_NAMESPACE, "")])).is_err());
        assert!(PodConfig::load_with(lookup(&[(ENV_NAMESPACE, "a/b")])).is_err());
    }

    #[test]
    fn test_json_partial() {
        let config = PodConfig::from_json_str(r#"{"default_target": "app.db"}"#).unwrap();
        assert_eq!(config.default_target, "app.db");
        assert_eq!(config.namespace, DEFAULT_NAMESPACE);
    }

    #[test]
    fn test_json_unknown_key() {
        assert!(PodConfig::from_json_str(r#"{"nmespace": "x"}"#).is_err());
    }

    #[test]
    fn test_file_then_env() {
        let path = std::env::temp_dir().join(format!("sqlpod-config-{}.json", std::process::id()));
        std::fs::write(&path, r#"{"namespace": "from.file", "default_target": "f.db"}"#).unwrap();
        let path_str = path.to_string_lossy().to_string();

        let config = PodConfig::load_with(lookup(&[
            (ENV_CONFIG, path_str.as_str()),
            (ENV_DEFAULT_TARGET, "env.db"),
        ]))
        .unwrap();
        assert_eq!(config.namespace, "from.file");
        assert_eq!(config.default_target, "env.db");

        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn test_missing_file() {
        let err = PodConfig::load_with(lookup(&[(ENV_CONFIG, "/nonexistent/sqlpod.json")]))
            .unwrap_err();
        assert!(matches!(err, PodError::Config(_)));
    }
}
