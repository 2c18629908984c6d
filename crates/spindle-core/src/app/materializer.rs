//! ReceiverMaterializer - instance method の receiver を用意して書き戻す
//!
//! receiver の位置は `num_params - return_arity - 1`。
//! 取り出して先頭 (index 0) に移し、callable には常に `values[0]` で渡す。
//!
//! | 種別          | 取得                       | type slot     |
//! |---------------|----------------------------|---------------|
//! | EXTERNAL_PSCO | `storage.lookup_by_id`     | EXTERNAL_PSCO |
//! | それ以外      | 空なら `codec.decode_file` | OBJECT        |

use std::path::PathBuf;
use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, error};

use crate::domain::{ContentType, Direction, ExecutionOutcome, Parameter, TaskValue};
use crate::ports::{CodecError, ObjectCodec, PersistentStorage, StorageError};

#[derive(Debug, Error)]
pub enum MaterializeError {
    #[error("no receiver slot: {num_params} parameters with return arity {return_arity}")]
    NoReceiver {
        num_params: usize,
        return_arity: usize,
    },

    #[error("persistent receiver '{0}' requires persistent storage")]
    StorageDisabled(String),

    #[error("persistent receiver has no identifier")]
    MissingIdentifier,

    #[error("cannot look up persistent receiver: {0}")]
    Lookup(#[from] StorageError),

    #[error("receiver '{0}' has neither content nor a file to read")]
    MissingSource(String),

    #[error("cannot deserialize receiver: {0}")]
    Codec(#[from] CodecError),
}

/// Where the receiver came from; decides where it is written back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReceiverOrigin {
    Persistent,
    File(PathBuf),
    Inline,
}

pub fn receiver_index(num_params: usize, return_arity: usize) -> Option<usize> {
    num_params.checked_sub(return_arity)?.checked_sub(1)
}

pub struct ReceiverMaterializer {
    codec: Arc<dyn ObjectCodec>,
    storage: Option<Arc<dyn PersistentStorage>>,
}

impl ReceiverMaterializer {
    pub fn new(codec: Arc<dyn ObjectCodec>, storage: Option<Arc<dyn PersistentStorage>>) -> Self {
        Self { codec, storage }
    }

    /// Moves the receiver to position 0 with its content filled in.
    pub async fn materialize(
        &self,
        params: &mut Vec<Parameter>,
        return_arity: usize,
    ) -> Result<ReceiverOrigin, MaterializeError> {
        let index = receiver_index(params.len(), return_arity).ok_or(
            MaterializeError::NoReceiver {
                num_params: params.len(),
                return_arity,
            },
        )?;
        let mut receiver = params.remove(index);

        let origin = if receiver.content_type == ContentType::ExternalPsco {
            let value = self.lookup(&receiver).await?;
            receiver.content = Some(value);
            ReceiverOrigin::Persistent
        } else {
            let path = receiver
                .file_name
                .as_ref()
                .map(|f| f.original_path().to_path_buf());
            if receiver.has_empty_content() {
                let path = path
                    .clone()
                    .ok_or_else(|| MaterializeError::MissingSource(receiver.name.clone()))?;
                debug!(path = %path.display(), "deserializing self from file");
                receiver.content = Some(self.codec.decode_file(&path)?);
            }
            receiver.content_type = ContentType::Object;
            path.map_or(ReceiverOrigin::Inline, ReceiverOrigin::File)
        };

        debug!(index, origin = ?origin, "materialized receiver");
        params.insert(0, receiver);
        Ok(origin)
    }

    async fn lookup(&self, receiver: &Parameter) -> Result<TaskValue, MaterializeError> {
        let id = match &receiver.content {
            Some(TaskValue::Str(id)) if !id.is_empty() => id.clone(),
            Some(TaskValue::Persistent(obj)) => return Ok(TaskValue::Persistent(obj.clone())),
            _ => return Err(MaterializeError::MissingIdentifier),
        };
        let storage = self
            .storage
            .as_ref()
            .ok_or_else(|| MaterializeError::StorageDisabled(id.clone()))?;
        debug!(id = %id, "getting self from persistent storage");
        Ok(storage.lookup_by_id(&id).await?)
    }

    /// Writes the updated receiver back when its direction requires it.
    ///
    /// Objects managed by the storage layer are skipped. A failed write-back
    /// downgrades `outcome` to a failure but keeps its outputs.
    pub fn write_back(
        &self,
        origin: &ReceiverOrigin,
        receiver: &TaskValue,
        outcome: &mut ExecutionOutcome,
    ) {
        let direction = outcome
            .target_direction
            .as_ref()
            .and_then(|p| p.direction)
            .unwrap_or(Direction::In);
        if !direction.requires_write_back() {
            return;
        }
        if self.storage.as_ref().is_some_and(|s| s.is_managed(receiver)) {
            debug!("receiver is managed by persistent storage; skipping write-back");
            return;
        }

        match origin {
            ReceiverOrigin::File(path) => {
                debug!(path = %path.display(), "serializing self to file");
                if let Err(e) = self.codec.encode_to_file(receiver, path) {
                    error!(error = %e, path = %path.display(), "failed to write back receiver");
                    outcome.downgrade_to_failure();
                }
            }
            ReceiverOrigin::Persistent | ReceiverOrigin::Inline => {
                debug!(origin = ?origin, "receiver has no file to rewrite");
            }
        }
    }
}
