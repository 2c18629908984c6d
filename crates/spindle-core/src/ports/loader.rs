//! ModuleLoader port - path 文字列から Module を読み込む
//!
//! 「import」に相当する。resolver がキャッシュを持つので、
//! loader 自体は毎回新しく読み込んでよい。

use std::sync::Arc;

use thiserror::Error;

use crate::typed::Module;

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("no module named '{0}'")]
    NotFound(String),

    #[error("failed to load module '{path}': {reason}")]
    Broken { path: String, reason: String },
}

pub trait ModuleLoader: Send + Sync {
    fn load(&self, path: &str) -> Result<Arc<Module>, LoadError>;
}
