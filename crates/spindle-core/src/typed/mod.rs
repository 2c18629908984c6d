//! Typed - callable の型付き表現と解決
//!
//! # 二層構造
//! - **表層**: `Module` / `ClassDef` に名前付きで `TaskCallable` を登録
//! - **内部**: `CallableResolver` が path + method 名から
//!   `ResolvedCallable`（FreeFunction / InstanceMethod / ClassMethod）を返す

pub mod callable;
pub mod module;
pub mod resolver;

pub use self::callable::{
    CallArgs, CallEnvelope, CallOutput, FnCallable, TaskCallable, callable_fn,
};
pub use self::module::{ClassDef, Module, RegistryError};
pub use self::resolver::{CallableResolver, INTERACTIVE_PREFIX, ResolveError, ResolvedCallable};
