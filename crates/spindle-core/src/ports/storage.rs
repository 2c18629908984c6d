//! PersistentStorage port - PSCO を管理するストレージ層
//!
//! # 契約
//! - `acquire_scope` / `release_scope` は 1 invocation につき厳密に 1 回ずつ
//! - `release_scope` はどの終端状態でも呼ばれる
//! - `lookup_by_id` は PSCO receiver の復元に使う
//! - `is_managed` が true の object は書き戻し不要（storage が自動で反映）

use std::path::Path;

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::TaskValue;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("persistent object not found: {0}")]
    NotFound(String),

    #[error("unknown scope handle: {0}")]
    UnknownScope(u64),

    #[error("storage backend error: {0}")]
    Backend(String),
}

/// Opaque handle for one opened execution scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ScopeHandle(pub u64);

/// What the storage layer learns when a scope closes.
#[derive(Debug, Clone, PartialEq)]
pub struct ScopeExit {
    pub succeeded: bool,
    /// Arguments as updated by the call, if it produced any.
    pub values: Option<Vec<TaskValue>>,
}

#[async_trait]
pub trait PersistentStorage: Send + Sync {
    async fn acquire_scope(
        &self,
        values: &[TaskValue],
        config_path: &Path,
    ) -> Result<ScopeHandle, StorageError>;

    async fn release_scope(&self, handle: ScopeHandle, exit: ScopeExit) -> Result<(), StorageError>;

    async fn lookup_by_id(&self, id: &str) -> Result<TaskValue, StorageError>;

    fn is_managed(&self, value: &TaskValue) -> bool;
}
