//! TaskCallable trait - ワーカーが呼び出す unit of work
//!
//! # 学習ポイント
//! - Object-safe な async trait（`Arc<dyn TaskCallable>` で保持）
//! - クロージャの type erasure（`FnCallable`）
//! - 戻り値の形を 1 つの envelope 型に固定する

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use async_trait::async_trait;

use crate::domain::{CallContext, Direction, Parameter, TaskError, TaskValue, TypeSlot};

/// Arguments of one call.
///
/// For instance methods `values[0]` is the materialized receiver.
#[derive(Debug, Clone, PartialEq)]
pub struct CallArgs {
    pub values: Vec<Parameter>,
    pub types: Vec<TypeSlot>,
    pub context: CallContext,
}

impl CallArgs {
    pub fn new(values: Vec<Parameter>, context: CallContext) -> Self {
        let types = values.iter().map(|p| Some(p.content_type)).collect();
        Self {
            values,
            types,
            context,
        }
    }

    /// Inline value of argument `index`, `Null` when absent.
    pub fn value(&self, index: usize) -> TaskValue {
        self.values.get(index).map(Parameter::value).unwrap_or_default()
    }
}

/// What a task produces: `(types, values, target_direction, updated_args)`.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CallOutput {
    pub types: Vec<TypeSlot>,
    pub values: Vec<TaskValue>,
    /// Receiver's resolved direction; only instance methods set it.
    pub target_direction: Option<Parameter>,
    /// Arguments after the call (receiver first for instance methods).
    pub updated_args: Option<Vec<TaskValue>>,
}

impl CallOutput {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn new(types: Vec<TypeSlot>, values: Vec<TaskValue>) -> Self {
        Self {
            types,
            values,
            target_direction: None,
            updated_args: None,
        }
    }

    pub fn with_target_direction(mut self, direction: Direction) -> Self {
        self.target_direction = Some(Parameter::target(direction));
        self
    }

    pub fn with_updated_args(mut self, args: Vec<TaskValue>) -> Self {
        self.updated_args = Some(args);
        self
    }
}

/// Result envelope returned by every callable.
///
/// When a layer wraps the task and appends its own results, those land in
/// `wrapped_extras`; only `output` is honored.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CallEnvelope {
    pub output: CallOutput,
    pub wrapped_extras: Option<Vec<TaskValue>>,
}

impl CallEnvelope {
    pub fn wrapped(output: CallOutput, extras: Vec<TaskValue>) -> Self {
        Self {
            output,
            wrapped_extras: Some(extras),
        }
    }
}

impl From<CallOutput> for CallEnvelope {
    fn from(output: CallOutput) -> Self {
        Self {
            output,
            wrapped_extras: None,
        }
    }
}

#[async_trait]
pub trait TaskCallable: Send + Sync {
    async fn call(&self, args: CallArgs) -> Result<CallEnvelope, TaskError>;
}

type BoxCallFuture = Pin<Box<dyn Future<Output = Result<CallEnvelope, TaskError>> + Send>>;

/// Adapts an async closure into a `TaskCallable`.
pub struct FnCallable {
    f: Arc<dyn Fn(CallArgs) -> BoxCallFuture + Send + Sync>,
}

impl FnCallable {
    pub fn new<F, Fut>(f: F) -> Self
    where
        F: Fn(CallArgs) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<CallEnvelope, TaskError>> + Send + 'static,
    {
        Self {
            f: Arc::new(move |args: CallArgs| Box::pin(f(args)) as BoxCallFuture),
        }
    }
}

#[async_trait]
impl TaskCallable for FnCallable {
    async fn call(&self, args: CallArgs) -> Result<CallEnvelope, TaskError> {
        (self.f)(args).await
    }
}

/// Shorthand for `Arc::new(FnCallable::new(f))`.
pub fn callable_fn<F, Fut>(f: F) -> Arc<dyn TaskCallable>
where
    F: Fn(CallArgs) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<CallEnvelope, TaskError>> + Send + 'static,
{
    Arc::new(FnCallable::new(f))
}
