//! ObjectCodec port - object <-> bytes/file の変換
//!
//! エンコード形式そのものは実装側の責務。
//! decoder は `decode_bytes` の失敗が「decode 系」かどうかだけを見て
//! STRING をテキストとして扱うか判断する。

use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::domain::TaskValue;

#[derive(Debug, Error)]
pub enum CodecError {
    /// The bytes are not a serialized object.
    #[error("not a serialized object: {0}")]
    Malformed(String),

    #[error("io error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot encode value: {0}")]
    Encode(String),
}

impl CodecError {
    /// Whether the failure means "these bytes are not an object" (as opposed
    /// to an environmental failure).
    pub fn is_decode(&self) -> bool {
        matches!(self, CodecError::Malformed(_))
    }
}

pub trait ObjectCodec: Send + Sync {
    fn decode_bytes(&self, bytes: &[u8]) -> Result<TaskValue, CodecError>;

    fn decode_file(&self, path: &Path) -> Result<TaskValue, CodecError>;

    fn encode_to_file(&self, value: &TaskValue, path: &Path) -> Result<(), CodecError>;
}
