//! ParameterDecoder - 位置ベースの引数ベクタを Parameter 列に変換
//!
//! # レコード形式
//! `type, stream, prefix, name, extra_content_type, value` の 6 スロット。
//! - STRING: `value` は後続する部分文字列スロット数 k（空白で結合する）
//! - EXTERNAL_PSCO / EXTERNAL_STREAM: direction マーカーが 1 スロット追加
//!
//! STRING の値は base64 + 先頭 1 バイトの番兵。番兵を外した残りを
//! まず object として decode し、decode 系の失敗ならテキストとして扱う。

use std::sync::Arc;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use tracing::debug;

use super::wire::{DecodeError, WireReader};
use crate::domain::{ContentType, FileName, Parameter, StdStream, TaskValue};
use crate::ports::ObjectCodec;

/// Type codes as sent by the orchestrator.
mod type_code {
    pub const BOOLEAN: i32 = 0;
    pub const INT: i32 = 4;
    pub const LONG: i32 = 5;
    pub const FLOAT: i32 = 6;
    pub const DOUBLE: i32 = 7;
    pub const STRING: i32 = 8;
    pub const FILE: i32 = 9;
    pub const OBJECT: i32 = 10;
    pub const EXTERNAL_PSCO: i32 = 12;
    pub const COLLECTION: i32 = 28;
    pub const DICT_COLLECTION: i32 = 29;
    pub const EXTERNAL_STREAM: i32 = 30;
    pub const DIRECTORY: i32 = 31;
}

/// Wire-level type. `Double` exists only here; it decodes as FLOAT.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WireType {
    Content(ContentType),
    Double,
}

impl WireType {
    fn from_code(code: i32) -> Result<Self, DecodeError> {
        use type_code::*;
        let content_type = match code {
            BOOLEAN => ContentType::Boolean,
            INT => ContentType::Int,
            LONG => ContentType::Long,
            FLOAT => ContentType::Float,
            DOUBLE => return Ok(WireType::Double),
            STRING => ContentType::String,
            FILE => ContentType::File,
            OBJECT => ContentType::Object,
            EXTERNAL_PSCO => ContentType::ExternalPsco,
            COLLECTION => ContentType::Collection,
            DICT_COLLECTION => ContentType::DictCollection,
            EXTERNAL_STREAM => ContentType::ExternalStream,
            DIRECTORY => ContentType::Directory,
            other => return Err(DecodeError::UnknownType(other)),
        };
        Ok(WireType::Content(content_type))
    }
}

fn stream_from_code(code: i32) -> Result<StdStream, DecodeError> {
    match code {
        0 => Ok(StdStream::Stdin),
        1 => Ok(StdStream::Stdout),
        2 => Ok(StdStream::Stderr),
        3 => Ok(StdStream::None),
        other => Err(DecodeError::UnknownStream(other)),
    }
}

pub struct ParameterDecoder {
    codec: Arc<dyn ObjectCodec>,
}

impl ParameterDecoder {
    pub fn new(codec: Arc<dyn ObjectCodec>) -> Self {
        Self { codec }
    }

    /// Decodes exactly `num_params` records, advancing `reader` by however
    /// many slots they occupy.
    pub fn decode_parameters(
        &self,
        num_params: usize,
        reader: &mut WireReader<'_>,
    ) -> Result<Vec<Parameter>, DecodeError> {
        // count comes from the wire; every record needs at least one slot
        let mut params = Vec::with_capacity(num_params.min(reader.remaining()));
        for index in 0..num_params {
            let param = self.decode_one(reader)?;
            debug!(
                index,
                content_type = %param.content_type,
                stream = ?param.stream,
                name = %param.name,
                "decoded parameter"
            );
            params.push(param);
        }
        Ok(params)
    }

    /// Convenience for a vector holding only parameter records.
    pub fn decode_slots(
        &self,
        num_params: usize,
        slots: &[String],
    ) -> Result<Vec<Parameter>, DecodeError> {
        self.decode_parameters(num_params, &mut WireReader::new(slots))
    }

    fn decode_one(&self, reader: &mut WireReader<'_>) -> Result<Parameter, DecodeError> {
        let wire_type = WireType::from_code(reader.next_parsed("parameter type")?)?;
        let stream = stream_from_code(reader.next_parsed("parameter stream")?)?;
        let prefix = reader.next("parameter prefix")?.to_string();
        let name = reader.next("parameter name")?.to_string();
        let extra_content_type = reader.next("parameter content type")?.to_string();

        let content_type = match wire_type {
            WireType::Double => {
                debug!(name = %name, "changing type from DOUBLE to FLOAT");
                ContentType::Float
            }
            WireType::Content(t) => t,
        };

        let mut param = Parameter::new(name, content_type);
        param.stream = stream;
        param.prefix = prefix;
        param.extra_content_type = extra_content_type;

        match content_type {
            ContentType::File
            | ContentType::Directory
            | ContentType::Collection
            | ContentType::DictCollection => {
                param.file_name = Some(FileName::parse(reader.next("parameter value")?));
            }
            ContentType::ExternalStream => {
                param.file_name = Some(FileName::parse(reader.next("parameter value")?));
                reader.next("direction marker")?;
            }
            ContentType::ExternalPsco => {
                param.content = Some(TaskValue::Str(reader.next("parameter value")?.to_string()));
                reader.next("direction marker")?;
            }
            ContentType::String => {
                let count: usize = reader.next_parsed("substring count")?;
                let joined = reader.take(count, "string substrings")?.join(" ");
                param.content = Some(self.decode_string(&param.name, &joined)?);
            }
            ContentType::Int => {
                param.content = Some(TaskValue::Int(reader.next_parsed("int value")?));
            }
            ContentType::Long => {
                param.content = Some(narrow_long(reader.next_parsed("long value")?));
            }
            ContentType::Float => {
                param.content = Some(TaskValue::Float(reader.next_parsed("float value")?));
            }
            ContentType::Boolean => {
                param.content = Some(TaskValue::Bool(reader.next("boolean value")? == "true"));
            }
            ContentType::Object => {
                reader.next("parameter value")?;
            }
        }

        Ok(param)
    }

    fn decode_string(&self, name: &str, raw: &str) -> Result<TaskValue, DecodeError> {
        let bytes = STANDARD
            .decode(raw.as_bytes())
            .map_err(|source| DecodeError::Base64 {
                name: name.to_string(),
                source,
            })?;
        // first byte is the sentinel that keeps empty strings non-empty on the wire
        let payload = bytes.get(1..).unwrap_or_default();
        if payload.is_empty() {
            return Ok(TaskValue::Str(String::new()));
        }

        match self.codec.decode_bytes(payload) {
            Ok(value) => Ok(value),
            Err(e) if e.is_decode() => {
                Ok(TaskValue::Str(String::from_utf8_lossy(payload).into_owned()))
            }
            Err(source) => Err(DecodeError::Codec {
                name: name.to_string(),
                source,
            }),
        }
    }
}

/// LONG values that fit the native 32-bit lane are narrowed to it.
fn narrow_long(value: i64) -> TaskValue {
    match i32::try_from(value) {
        Ok(narrow) => TaskValue::Int(narrow),
        Err(_) => TaskValue::Long(value),
    }
}
