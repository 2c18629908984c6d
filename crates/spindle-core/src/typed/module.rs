//! Module / ClassDef - callable の登録と管理
//!
//! path 文字列で import される単位が `Module`。
//! instance method / class method は `ClassDef` に属する。

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use super::callable::TaskCallable;

/// RegistryError は Module / ClassDef への登録エラー
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("'{0}' is already registered")]
    AlreadyRegistered(String),
}

/// A class exposing methods callable either with a receiver (instance
/// method) or without one (class method).
pub struct ClassDef {
    name: String,
    methods: HashMap<String, Arc<dyn TaskCallable>>,
}

impl ClassDef {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            methods: HashMap::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn add_method(
        &mut self,
        name: impl Into<String>,
        callable: Arc<dyn TaskCallable>,
    ) -> Result<(), RegistryError> {
        let name = name.into();
        if self.methods.contains_key(&name) {
            return Err(RegistryError::AlreadyRegistered(format!("{}.{}", self.name, name)));
        }
        self.methods.insert(name, callable);
        Ok(())
    }

    pub fn with_method(
        mut self,
        name: impl Into<String>,
        callable: Arc<dyn TaskCallable>,
    ) -> Result<Self, RegistryError> {
        self.add_method(name, callable)?;
        Ok(self)
    }

    pub fn method(&self, name: &str) -> Option<Arc<dyn TaskCallable>> {
        self.methods.get(name).cloned()
    }
}

impl fmt::Debug for ClassDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut methods: Vec<&String> = self.methods.keys().collect();
        methods.sort();
        f.debug_struct("ClassDef")
            .field("name", &self.name)
            .field("methods", &methods)
            .finish()
    }
}

/// An importable unit: free functions plus classes, addressed by a dotted path.
pub struct Module {
    path: String,
    functions: HashMap<String, Arc<dyn TaskCallable>>,
    classes: HashMap<String, Arc<ClassDef>>,
}

impl Module {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            functions: HashMap::new(),
            classes: HashMap::new(),
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn add_function(
        &mut self,
        name: impl Into<String>,
        callable: Arc<dyn TaskCallable>,
    ) -> Result<(), RegistryError> {
        let name = name.into();
        if self.functions.contains_key(&name) {
            return Err(RegistryError::AlreadyRegistered(format!("{}.{}", self.path, name)));
        }
        self.functions.insert(name, callable);
        Ok(())
    }

    pub fn with_function(
        mut self,
        name: impl Into<String>,
        callable: Arc<dyn TaskCallable>,
    ) -> Result<Self, RegistryError> {
        self.add_function(name, callable)?;
        Ok(self)
    }

    pub fn add_class(&mut self, class: ClassDef) -> Result<(), RegistryError> {
        if self.classes.contains_key(class.name()) {
            return Err(RegistryError::AlreadyRegistered(format!(
                "{}.{}",
                self.path,
                class.name()
            )));
        }
        self.classes.insert(class.name().to_string(), Arc::new(class));
        Ok(())
    }

    pub fn with_class(mut self, class: ClassDef) -> Result<Self, RegistryError> {
        self.add_class(class)?;
        Ok(self)
    }

    pub fn function(&self, name: &str) -> Option<Arc<dyn TaskCallable>> {
        self.functions.get(name).cloned()
    }

    pub fn class(&self, name: &str) -> Option<Arc<ClassDef>> {
        self.classes.get(name).cloned()
    }
}

impl fmt::Debug for Module {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut functions: Vec<&String> = self.functions.keys().collect();
        functions.sort();
        let mut classes: Vec<&String> = self.classes.keys().collect();
        classes.sort();
        f.debug_struct("Module")
            .field("path", &self.path)
            .field("functions", &functions)
            .field("classes", &classes)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::typed::callable::{CallEnvelope, CallOutput, callable_fn};

    fn noop() -> Arc<dyn TaskCallable> {
        callable_fn(|_args| async { Ok(CallEnvelope::from(CallOutput::empty())) })
    }

    #[test]
    fn register_and_get() {
        let module = Module::new("app.tasks")
            .with_function("increment", noop())
            .unwrap()
            .with_class(ClassDef::new("Counter").with_method("add", noop()).unwrap())
            .unwrap();

        assert!(module.function("increment").is_some());
        assert!(module.function("missing").is_none());
        let class = module.class("Counter").unwrap();
        assert!(class.method("add").is_some());
    }

    #[test]
    fn double_registration_is_rejected() {
        let mut module = Module::new("app.tasks");
        module.add_function("f", noop()).unwrap();
        let result = module.add_function("f", noop());
        assert!(matches!(
            result,
            Err(RegistryError::AlreadyRegistered(name)) if name == "app.tasks.f"
        ));

        let mut class = ClassDef::new("C");
        class.add_method("m", noop()).unwrap();
        assert!(class.add_method("m", noop()).is_err());
    }

    #[test]
    fn debug_lists_names_sorted() {
        let module = Module::new("m")
            .with_function("b", noop())
            .unwrap()
            .with_function("a", noop())
            .unwrap();
        let dbg = format!("{module:?}");
        assert!(dbg.contains(r#"functions: ["a", "b"]"#));
    }
}
