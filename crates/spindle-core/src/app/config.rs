//! WorkerConfig - ワーカーの設定
//!
//! JSON ファイル（任意）→ 環境変数の順で上書きする。
//! `storage_conf` が無い、または `"null"` の場合は persistent storage 無効。

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::CallContext;

pub const ENV_STORAGE_CONF: &str = "SPINDLE_STORAGE_CONF";
pub const ENV_PROCESS_NAME: &str = "SPINDLE_PROCESS_NAME";
pub const ENV_LOG_LEVEL: &str = "SPINDLE_LOG_LEVEL";

const STORAGE_DISABLED: &str = "null";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config: {0}")]
    Parse(#[from] serde_json::Error),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkerConfig {
    pub process_name: String,
    pub storage_conf: Option<PathBuf>,
    pub tracing: bool,
    pub log_level: String,
    pub log_config: Option<PathBuf>,
    pub log_files: Option<(PathBuf, PathBuf)>,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            process_name: "spindle-worker".to_string(),
            storage_conf: None,
            tracing: false,
            log_level: "info".to_string(),
            log_config: None,
            log_files: None,
        }
    }
}

impl WorkerConfig {
    pub fn from_json_str(raw: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(raw)?)
    }

    pub fn from_json_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&raw)
    }

    /// Applies `SPINDLE_*` environment variables on top of this config.
    pub fn with_env_overrides(self) -> Self {
        self.with_overrides(|key| std::env::var(key).ok())
    }

    pub fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(conf) = lookup(ENV_STORAGE_CONF) {
            self.storage_conf = Some(PathBuf::from(conf));
        }
        if let Some(name) = lookup(ENV_PROCESS_NAME) {
            self.process_name = name;
        }
        if let Some(level) = lookup(ENV_LOG_LEVEL) {
            self.log_level = level;
        }
        self
    }

    /// Storage configuration path, if persistent storage is enabled.
    pub fn storage_conf(&self) -> Option<&Path> {
        self.storage_conf
            .as_deref()
            .filter(|p| !p.as_os_str().is_empty() && p.as_os_str() != STORAGE_DISABLED)
    }

    pub fn storage_enabled(&self) -> bool {
        self.storage_conf().is_some()
    }

    /// Auxiliary context handed to callables; invocation-specific fields are
    /// filled in by the decoder.
    pub fn call_context(&self) -> CallContext {
        CallContext {
            from_worker: true,
            tracing: self.tracing,
            process_name: self.process_name.clone(),
            storage_conf: self.storage_conf().map(Path::to_path_buf),
            return_length: 0,
            log_config: self.log_config.clone(),
            log_files: self.log_files.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn partial_json_falls_back_to_defaults() {
        let cfg = WorkerConfig::from_json_str(r#"{"process_name": "w-3", "tracing": true}"#).unwrap();
        assert_eq!(cfg.process_name, "w-3");
        assert!(cfg.tracing);
        assert_eq!(cfg.log_level, "info");
        assert!(!cfg.storage_enabled());
    }

    #[test]
    fn null_storage_conf_disables_storage() {
        let cfg = WorkerConfig::from_json_str(r#"{"storage_conf": "null"}"#).unwrap();
        assert!(!cfg.storage_enabled());
        assert!(cfg.call_context().storage_conf.is_none());

        let cfg = WorkerConfig::from_json_str(r#"{"storage_conf": "/etc/storage.cfg"}"#).unwrap();
        assert_eq!(cfg.storage_conf(), Some(Path::new("/etc/storage.cfg")));
    }

    #[test]
    fn overrides_win_over_file_values() {
        let env: HashMap<&str, &str> = HashMap::from([
            (ENV_PROCESS_NAME, "from-env"),
            (ENV_STORAGE_CONF, "/opt/storage.cfg"),
        ]);
        let cfg = WorkerConfig::default()
            .with_overrides(|key| env.get(key).map(|v| v.to_string()));

        assert_eq!(cfg.process_name, "from-env");
        assert!(cfg.storage_enabled());
        assert_eq!(cfg.log_level, "info");
    }

    #[test]
    fn call_context_carries_worker_settings() {
        let cfg = WorkerConfig {
            tracing: true,
            log_files: Some(("/tmp/out".into(), "/tmp/err".into())),
            ..WorkerConfig::default()
        };
        let ctx = cfg.call_context();
        assert!(ctx.from_worker);
        assert!(ctx.tracing);
        assert_eq!(ctx.process_name, "spindle-worker");
        assert!(ctx.log_files.is_some());
    }

    #[test]
    fn unreadable_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = WorkerConfig::from_json_file(&dir.path().join("missing.json")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
