//! Codec - wire format との変換
//!
//! - **wire**: 位置ベースの引数ベクタを読む cursor と DecodeError
//! - **params**: Parameter レコードのデコード
//! - **invocation**: ヘッダ + パラメータ → TaskInvocation
//! - **result**: ExecutionOutcome → 6 要素の結果タプル

pub mod invocation;
pub mod params;
pub mod result;
pub mod wire;

pub use self::invocation::InvocationDecoder;
pub use self::params::ParameterDecoder;
pub use self::result::{ResultTuple, TaskResult, encode_result};
pub use self::wire::{DecodeError, WireReader};
