//! InMemoryStorage - プロセス内の PersistentStorage 実装
//!
//! PSCO を id で保持し、開いた scope の履歴を記録する。
//! scope が厳密に 1 回ずつ開閉されることをテストで確認するのに使う。

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::domain::{PersistentObject, TaskValue};
use crate::ports::{PersistentStorage, ScopeExit, ScopeHandle, StorageError};

/// One recorded scope lifecycle.
#[derive(Debug, Clone, PartialEq)]
pub struct ScopeRecord {
    pub handle: ScopeHandle,
    pub config_path: PathBuf,
    pub entry_values: Vec<TaskValue>,
    /// `None` while the scope is still open.
    pub exit: Option<ScopeExit>,
}

#[derive(Default)]
struct StorageState {
    objects: HashMap<String, PersistentObject>,
    scopes: Vec<ScopeRecord>,
    next_scope: u64,
}

#[derive(Default)]
pub struct InMemoryStorage {
    state: Mutex<StorageState>,
}

impl InMemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn put(&self, object: PersistentObject) {
        let mut state = self.state.lock().await;
        state.objects.insert(object.id.clone(), object);
    }

    pub async fn scopes(&self) -> Vec<ScopeRecord> {
        self.state.lock().await.scopes.clone()
    }

    pub async fn open_scopes(&self) -> usize {
        let state = self.state.lock().await;
        state.scopes.iter().filter(|s| s.exit.is_none()).count()
    }
}

#[async_trait]
impl PersistentStorage for InMemoryStorage {
    async fn acquire_scope(
        &self,
        values: &[TaskValue],
        config_path: &Path,
    ) -> Result<ScopeHandle, StorageError> {
        let mut state = self.state.lock().await;
        let handle = ScopeHandle(state.next_scope);
        state.next_scope += 1;
        state.scopes.push(ScopeRecord {
            handle,
            config_path: config_path.to_path_buf(),
            entry_values: values.to_vec(),
            exit: None,
        });
        Ok(handle)
    }

    async fn release_scope(&self, handle: ScopeHandle, exit: ScopeExit) -> Result<(), StorageError> {
        let mut state = self.state.lock().await;
        let record = state
            .scopes
            .iter_mut()
            .find(|s| s.handle == handle && s.exit.is_none())
            .ok_or(StorageError::UnknownScope(handle.0))?;
        record.exit = Some(exit);
        Ok(())
    }

    async fn lookup_by_id(&self, id: &str) -> Result<TaskValue, StorageError> {
        let state = self.state.lock().await;
        state
            .objects
            .get(id)
            .cloned()
            .map(TaskValue::Persistent)
            .ok_or_else(|| StorageError::NotFound(id.to_string()))
    }

    fn is_managed(&self, value: &TaskValue) -> bool {
        matches!(value, TaskValue::Persistent(_))
    }
}
