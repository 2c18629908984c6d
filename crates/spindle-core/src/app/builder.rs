//! WorkerBuilder - Worker の構築とワイヤリング
//!
//! # 学習ポイント
//! - Builder パターンの実装
//! - 起動時検証（Fail-fast 設計）
//! - 既定の実装（JsonCodec / SystemClock / ULID）を差し替え可能にする

use std::path::PathBuf;
use std::sync::Arc;

use super::config::WorkerConfig;
use super::materializer::ReceiverMaterializer;
use super::supervisor::ExecutionSupervisor;
use super::worker::Worker;
use crate::codec::InvocationDecoder;
use crate::impls::{JsonCodec, ModuleTable};
use crate::ports::{Clock, IdGenerator, ModuleLoader, ObjectCodec, PersistentStorage, SystemClock, UlidGenerator};
use crate::typed::{CallableResolver, Module};

/// WorkerBuilder は Worker を構築
///
/// # 使用例
/// ```ignore
/// let worker = WorkerBuilder::new()
///     .module(Module::new("app.tasks").with_function("add", add)?)
///     .expect_targets(&["app.tasks.add"])
///     .build()?;
/// ```
///
/// # Fail-fast 設計
/// - expect_targets() で `path.method` 形式の呼び出し対象を登録
/// - build() 時にすべて解決できるかチェック
/// - storage が設定で有効なのに backend が無ければエラー
pub struct WorkerBuilder {
    config: WorkerConfig,
    loader: Option<Arc<dyn ModuleLoader>>,
    modules: Vec<Module>,
    codec: Arc<dyn ObjectCodec>,
    storage: Option<Arc<dyn PersistentStorage>>,
    clock: Arc<dyn Clock>,
    ids: Arc<dyn IdGenerator>,
    expected_targets: Option<Vec<String>>,
}

/// BuildError は Worker 構築時のエラー
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error("Missing targets: {0:?}. These targets were expected but could not be resolved.")]
    MissingTargets(Vec<String>),

    #[error("persistent storage is enabled ({0}) but no storage backend was provided")]
    MissingStorage(PathBuf),
}

impl WorkerBuilder {
    pub fn new() -> Self {
        Self {
            config: WorkerConfig::default(),
            loader: None,
            modules: Vec::new(),
            codec: Arc::new(JsonCodec::new()),
            storage: None,
            clock: Arc::new(SystemClock),
            ids: Arc::new(UlidGenerator::new(SystemClock)),
            expected_targets: None,
        }
    }

    pub fn config(mut self, config: WorkerConfig) -> Self {
        self.config = config;
        self
    }

    /// Registers a module in the built-in `ModuleTable`. Ignored when a
    /// custom loader is set with [`WorkerBuilder::loader`].
    pub fn module(mut self, module: Module) -> Self {
        self.modules.push(module);
        self
    }

    pub fn loader(mut self, loader: Arc<dyn ModuleLoader>) -> Self {
        self.loader = Some(loader);
        self
    }

    pub fn codec(mut self, codec: Arc<dyn ObjectCodec>) -> Self {
        self.codec = codec;
        self
    }

    pub fn storage(mut self, storage: Arc<dyn PersistentStorage>) -> Self {
        self.storage = Some(storage);
        self
    }

    /// Clock used for outcome timing and invocation ids.
    pub fn clock<C: Clock + Clone + 'static>(mut self, clock: C) -> Self {
        self.ids = Arc::new(UlidGenerator::new(clock.clone()));
        self.clock = Arc::new(clock);
        self
    }

    /// `path.method` targets that must resolve at build time.
    pub fn expect_targets(mut self, targets: &[&str]) -> Self {
        self.expected_targets = Some(targets.iter().map(|t| t.to_string()).collect());
        self
    }

    pub fn build(self) -> Result<Worker, BuildError> {
        if let Some(conf) = self.config.storage_conf() {
            if self.storage.is_none() {
                return Err(BuildError::MissingStorage(conf.to_path_buf()));
            }
        }

        let loader = match self.loader {
            Some(loader) => loader,
            None => {
                let table = ModuleTable::new();
                for module in self.modules {
                    table.define(module);
                }
                Arc::new(table)
            }
        };
        let resolver = CallableResolver::new(loader);

        if let Some(expected) = &self.expected_targets {
            let missing: Vec<String> = expected
                .iter()
                .filter(|target| !resolves(&resolver, target))
                .cloned()
                .collect();
            if !missing.is_empty() {
                return Err(BuildError::MissingTargets(missing));
            }
        }

        let storage_conf = self.config.storage_conf().map(|p| p.to_path_buf());
        Ok(Worker {
            decoder: InvocationDecoder::new(Arc::clone(&self.codec)),
            resolver,
            materializer: ReceiverMaterializer::new(Arc::clone(&self.codec), self.storage.clone()),
            supervisor: ExecutionSupervisor::new(self.storage, storage_conf),
            clock: self.clock,
            ids: self.ids,
            config: self.config,
        })
    }
}

impl Default for WorkerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

fn resolves(resolver: &CallableResolver, target: &str) -> bool {
    target
        .rsplit_once('.')
        .is_some_and(|(path, method)| resolver.resolve(path, method, false).is_ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::TaskValue;
    use crate::impls::InMemoryStorage;
    use crate::typed::{CallEnvelope, CallOutput, ClassDef, callable_fn};

    fn noop() -> Arc<dyn crate::typed::TaskCallable> {
        callable_fn(|_args| async move {
            Ok(CallEnvelope::from(CallOutput::new(vec![], vec![TaskValue::Null])))
        })
    }

    fn modules() -> (Module, Module) {
        let tasks = Module::new("app.tasks").with_function("run", noop()).unwrap();
        let models = Module::new("app.models")
            .with_class(ClassDef::new("Counter").with_method("inc", noop()).unwrap())
            .unwrap();
        (tasks, models)
    }

    #[test]
    fn test_build_success() {
        let (tasks, models) = modules();
        let worker = WorkerBuilder::new()
            .module(tasks)
            .module(models)
            .expect_targets(&["app.tasks.run", "app.models.Counter.inc"])
            .build();
        assert!(worker.is_ok());
    }

    #[test]
    fn test_build_missing_targets() {
        let (tasks, _) = modules();
        let worker = WorkerBuilder::new()
            .module(tasks)
            .expect_targets(&["app.tasks.run", "app.tasks.gone", "nomethod"])
            .build();
        assert!(matches!(
            worker,
            Err(BuildError::MissingTargets(ref missing))
                if missing == &["app.tasks.gone".to_string(), "nomethod".to_string()]
        ));
    }

    #[test]
    fn test_build_requires_storage_when_enabled() {
        let config = WorkerConfig {
            storage_conf: Some(PathBuf::from("/etc/storage.cfg")),
            ..WorkerConfig::default()
        };

        let worker = WorkerBuilder::new().config(config.clone()).build();
        assert!(matches!(worker, Err(BuildError::MissingStorage(_))));

        let worker = WorkerBuilder::new()
            .config(config)
            .storage(Arc::new(InMemoryStorage::new()))
            .build()
            .unwrap();
        assert!(worker.storage_enabled());
    }

    #[test]
    fn test_null_storage_conf_needs_no_backend() {
        let config = WorkerConfig {
            storage_conf: Some(PathBuf::from("null")),
            ..WorkerConfig::default()
        };
        let worker = WorkerBuilder::new().config(config).build().unwrap();
        assert!(!worker.storage_enabled());
    }

    #[test]
    fn test_custom_loader_is_used() {
        let (tasks, _) = modules();
        let table = Arc::new(ModuleTable::new());
        table.define(tasks);

        let worker = WorkerBuilder::new()
            .loader(table.clone())
            .expect_targets(&["app.tasks.run"])
            .build()
            .unwrap();
        assert_eq!(worker.cached_modules(), vec!["app.tasks".to_string()]);
        assert_eq!(table.load_count("app.tasks"), 1);
    }
}
