//! ModuleTable - プロセス内に登録された Module を返す ModuleLoader

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use crate::ports::{LoadError, ModuleLoader};
use crate::typed::Module;

#[derive(Default)]
struct TableState {
    modules: HashMap<String, Arc<Module>>,
    loads: HashMap<String, usize>,
}

/// Loader backed by an in-process table of modules.
///
/// `define` replaces a module with the same path, which is how an
/// interactive session redefines its tasks.
#[derive(Default)]
pub struct ModuleTable {
    state: Mutex<TableState>,
}

impl ModuleTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn define(&self, module: Module) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        state
            .modules
            .insert(module.path().to_string(), Arc::new(module));
    }

    /// How many times `path` was successfully loaded.
    pub fn load_count(&self, path: &str) -> usize {
        let state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        state.loads.get(path).copied().unwrap_or(0)
    }

    pub fn paths(&self) -> Vec<String> {
        let state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        let mut paths: Vec<String> = state.modules.keys().cloned().collect();
        paths.sort();
        paths
    }
}

impl ModuleLoader for ModuleTable {
    fn load(&self, path: &str) -> Result<Arc<Module>, LoadError> {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        let module = state
            .modules
            .get(path)
            .cloned()
            .ok_or_else(|| LoadError::NotFound(path.to_string()))?;
        *state.loads.entry(path.to_string()).or_insert(0) += 1;
        Ok(module)
    }
}
