//! JsonCodec - serde_json で TaskValue を読み書きする ObjectCodec
//!
//! 形式は TaskValue の tagged JSON（`{"kind": "...", "value": ...}`）。
//! タグを持たないバイト列（普通のテキストや素の JSON）は
//! `CodecError::Malformed` になり、decoder 側でテキスト扱いされる。

use std::fs;
use std::path::Path;

use crate::domain::TaskValue;
use crate::ports::{CodecError, ObjectCodec};

#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

impl JsonCodec {
    pub fn new() -> Self {
        Self
    }

    pub fn encode_bytes(&self, value: &TaskValue) -> Result<Vec<u8>, CodecError> {
        serde_json::to_vec(value).map_err(|e| CodecError::Encode(e.to_string()))
    }
}

impl ObjectCodec for JsonCodec {
    fn decode_bytes(&self, bytes: &[u8]) -> Result<TaskValue, CodecError> {
        serde_json::from_slice(bytes).map_err(|e| CodecError::Malformed(e.to_string()))
    }

    fn decode_file(&self, path: &Path) -> Result<TaskValue, CodecError> {
        let bytes = fs::read(path).map_err(|source| CodecError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        self.decode_bytes(&bytes)
    }

    fn encode_to_file(&self, value: &TaskValue, path: &Path) -> Result<(), CodecError> {
        let bytes = self.encode_bytes(value)?;
        fs::write(path, bytes).map_err(|source| CodecError::Io {
            path: path.to_path_buf(),
            source,
        })
    }
}
