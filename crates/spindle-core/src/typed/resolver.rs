//! CallableResolver - path + method 名から呼び出し対象を解決する
//!
//! # 解決順序
//! 1. `target_path` を Module として import → function を探す（FreeFunction）
//! 2. import できなければ `<module>.<ClassName>` と解釈し、
//!    `<module>` を import して ClassName を引く
//!    - receiver あり → InstanceMethod
//!    - receiver なし → ClassMethod
//!
//! import 済みの Module はキャッシュし、ワーカーの生存中は無効化しない。
//! 例外は interactive session のモジュールで、再定義されうるので毎回読み直す。

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

use thiserror::Error;
use tracing::debug;

use super::callable::TaskCallable;
use super::module::Module;
use crate::ports::{LoadError, ModuleLoader};

/// Path prefix of modules defined in an interactive session.
pub const INTERACTIVE_PREFIX: &str = "InteractiveMode";

#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("cannot import '{path}': {source}")]
    Import {
        path: String,
        #[source]
        source: LoadError,
    },

    #[error("module '{module}' has no class '{class}'")]
    ClassNotFound { module: String, class: String },

    #[error("'{target}' has no attribute '{method}'")]
    Attribute { target: String, method: String },
}

impl ResolveError {
    pub fn is_attribute(&self) -> bool {
        matches!(self, ResolveError::Attribute { .. })
    }
}

/// The resolved invocation target.
#[derive(Clone)]
pub enum ResolvedCallable {
    FreeFunction(Arc<dyn TaskCallable>),
    InstanceMethod {
        class: String,
        method: Arc<dyn TaskCallable>,
    },
    ClassMethod {
        class: String,
        method: Arc<dyn TaskCallable>,
    },
}

impl ResolvedCallable {
    pub fn callable(&self) -> Arc<dyn TaskCallable> {
        match self {
            ResolvedCallable::FreeFunction(f) => Arc::clone(f),
            ResolvedCallable::InstanceMethod { method, .. }
            | ResolvedCallable::ClassMethod { method, .. } => Arc::clone(method),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            ResolvedCallable::FreeFunction(_) => "free_function",
            ResolvedCallable::InstanceMethod { .. } => "instance_method",
            ResolvedCallable::ClassMethod { .. } => "class_method",
        }
    }
}

impl fmt::Debug for ResolvedCallable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResolvedCallable::FreeFunction(_) => f.write_str("FreeFunction"),
            ResolvedCallable::InstanceMethod { class, .. } => {
                f.debug_struct("InstanceMethod").field("class", class).finish()
            }
            ResolvedCallable::ClassMethod { class, .. } => {
                f.debug_struct("ClassMethod").field("class", class).finish()
            }
        }
    }
}

pub struct CallableResolver {
    loader: Arc<dyn ModuleLoader>,
    cache: Mutex<HashMap<String, Arc<Module>>>,
}

impl CallableResolver {
    pub fn new(loader: Arc<dyn ModuleLoader>) -> Self {
        Self {
            loader,
            cache: Mutex::new(HashMap::new()),
        }
    }

    pub fn resolve(
        &self,
        target_path: &str,
        method_name: &str,
        has_receiver: bool,
    ) -> Result<ResolvedCallable, ResolveError> {
        debug!(target_path, "trying to import the user module");
        match self.import(target_path) {
            Ok(module) => module
                .function(method_name)
                .map(ResolvedCallable::FreeFunction)
                .ok_or_else(|| ResolveError::Attribute {
                    target: target_path.to_string(),
                    method: method_name.to_string(),
                }),
            Err(LoadError::NotFound(_)) => {
                debug!(target_path, "could not import the module; method in class");
                self.resolve_in_class(target_path, method_name, has_receiver)
            }
            Err(source) => Err(ResolveError::Import {
                path: target_path.to_string(),
                source,
            }),
        }
    }

    fn resolve_in_class(
        &self,
        target_path: &str,
        method_name: &str,
        has_receiver: bool,
    ) -> Result<ResolvedCallable, ResolveError> {
        let (module_name, class_name) = target_path
            .rsplit_once('.')
            .unwrap_or((target_path, target_path));

        let module = self.import(module_name).map_err(|source| ResolveError::Import {
            path: module_name.to_string(),
            source,
        })?;
        let class = module
            .class(class_name)
            .ok_or_else(|| ResolveError::ClassNotFound {
                module: module_name.to_string(),
                class: class_name.to_string(),
            })?;
        let method = class
            .method(method_name)
            .ok_or_else(|| ResolveError::Attribute {
                target: target_path.to_string(),
                method: method_name.to_string(),
            })?;

        debug!(class = class_name, module = module_name, has_receiver, "method in class");
        let class = class_name.to_string();
        Ok(if has_receiver {
            ResolvedCallable::InstanceMethod { class, method }
        } else {
            ResolvedCallable::ClassMethod { class, method }
        })
    }

    fn import(&self, path: &str) -> Result<Arc<Module>, LoadError> {
        let interactive = path.starts_with(INTERACTIVE_PREFIX);
        if !interactive {
            let cache = self.cache.lock().unwrap_or_else(PoisonError::into_inner);
            if let Some(module) = cache.get(path) {
                return Ok(Arc::clone(module));
            }
        }

        let module = self.loader.load(path)?;
        if interactive {
            debug!(path, "reloaded interactive module");
        }
        self.cache
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(path.to_string(), Arc::clone(&module));
        Ok(module)
    }

    /// Paths currently held in the module cache, sorted.
    pub fn cached_paths(&self) -> Vec<String> {
        let cache = self.cache.lock().unwrap_or_else(PoisonError::into_inner);
        let mut paths: Vec<String> = cache.keys().cloned().collect();
        paths.sort();
        paths
    }
}
