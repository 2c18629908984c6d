//! TaskInvocation - デコード済みのリクエスト
//!
//! 1 回の実行につき 1 つ生成され、`parameters` 以外は不変。
//! receiver を持つ場合、materializer が `parameters` を並べ替える。

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::parameter::Parameter;

/// Execution context handed through, unchanged, to every invoked callable.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CallContext {
    /// Always `true` when the call comes from this worker (as opposed to
    /// the callable being invoked directly by user code).
    pub from_worker: bool,
    pub tracing: bool,
    pub process_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub storage_conf: Option<PathBuf>,
    pub return_length: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_config: Option<PathBuf>,
    /// `(stdout, stderr)` redirection targets, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_files: Option<(PathBuf, PathBuf)>,
}

/// The decoded request.
#[derive(Debug, Clone, PartialEq)]
pub struct TaskInvocation {
    pub target_path: String,
    pub method_name: String,
    /// 0 means no timeout.
    pub timeout_seconds: u64,
    pub slaves: Vec<String>,
    /// Computing-unit count as sent by the orchestrator; logged only.
    pub computing_units: String,
    pub has_receiver: bool,
    pub return_arity: usize,
    pub parameters: Vec<Parameter>,
    pub auxiliary: CallContext,
}

impl TaskInvocation {
    /// `path.method`, used in log lines.
    pub fn qualified_name(&self) -> String {
        format!("{}.{}", self.target_path, self.method_name)
    }
}
