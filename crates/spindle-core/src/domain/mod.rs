//! Domain model (parameters, values, invocations, outcomes, errors, ids).
//!
//! この層は transport / storage / codec を一切知らない。
//! - parameter: Parameter と各種 enum（ContentType, StdStream, Direction）
//! - value: TaskValue（callable に渡る値・戻る値）
//! - invocation: TaskInvocation と CallContext（auxiliary bag）
//! - outcome: ExecutionOutcome と終端状態
//! - errors: TaskError（callable が返すエラー）
//! - ids: InvocationId

pub mod errors;
pub mod ids;
pub mod invocation;
pub mod outcome;
pub mod parameter;
pub mod value;

pub use self::errors::{DEFAULT_RAISED_MESSAGE, TaskError};
pub use self::ids::{Id, IdMarker, InvocationId};
pub use self::invocation::{CallContext, TaskInvocation};
pub use self::outcome::{ExecutionOutcome, ExitCode, TypeSlot, null_outputs};
pub use self::parameter::{ContentType, Direction, FileName, Parameter, StdStream};
pub use self::value::{PersistentObject, TaskValue};
