//! ExecutionSupervisor - callable を timeout / cancel 付きで実行し分類する
//!
//! ```text
//! Ready → Running ─┬→ Succeeded   (exit 0)
//!                  ├→ AppException (exit 2, nulled outputs)
//!                  ├→ Failed      (exit 1, empty outputs)
//!                  └→ TimedOut    (exit 3, nulled outputs)
//! ```
//!
//! callable は `tokio::spawn` で走らせ、timeout / cancel 時は abort する。
//! panic も JoinError として拾い、exit 1 に分類する。
//! storage scope は呼び出しの前に開き、どの終端状態でも閉じる。
//! `run` の future 自体が drop された場合も、call は abort され scope は閉じる。

use std::any::Any;
use std::path::PathBuf;
use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::{debug, error, warn};

use super::interrupt::{InterruptContext, expire_after};
use crate::domain::{
    DEFAULT_RAISED_MESSAGE, ExecutionOutcome, Parameter, TaskError, TaskValue, TypeSlot,
};
use crate::ports::{PersistentStorage, ScopeExit, ScopeHandle, StorageError};
use crate::typed::{CallArgs, CallEnvelope, TaskCallable};

/// Terminal state of the supervised call, before classification.
#[derive(Debug)]
enum Termination {
    Returned(Result<CallEnvelope, TaskError>),
    Panicked(String),
    TimedOut,
    Cancelled,
}

/// Classified outcome plus the receiver as updated by the call.
#[derive(Debug)]
pub struct Supervised {
    pub outcome: ExecutionOutcome,
    pub updated_receiver: Option<TaskValue>,
}

pub struct ExecutionSupervisor {
    storage: Option<Arc<dyn PersistentStorage>>,
    storage_conf: Option<PathBuf>,
}

impl ExecutionSupervisor {
    /// Storage scopes are opened only when both `storage` and
    /// `storage_conf` are set.
    pub fn new(storage: Option<Arc<dyn PersistentStorage>>, storage_conf: Option<PathBuf>) -> Self {
        Self {
            storage,
            storage_conf,
        }
    }

    pub async fn run(
        &self,
        callable: Arc<dyn TaskCallable>,
        args: CallArgs,
        mut interrupts: InterruptContext,
    ) -> Supervised {
        let types = args.types.clone();
        let params = args.values.clone();

        let scope = match self.open_scope(&params).await {
            Ok(scope) => scope,
            Err(outcome) => {
                return Supervised {
                    outcome,
                    updated_receiver: None,
                };
            }
        };

        let timeout = interrupts.timeout();
        let mut call = AbortOnDrop(tokio::spawn(async move { callable.call(args).await }));

        let termination = tokio::select! {
            biased;
            joined = &mut call.0 => match joined {
                Ok(result) => Termination::Returned(result),
                Err(e) if e.is_panic() => Termination::Panicked(panic_message(e.into_panic())),
                Err(e) => Termination::Panicked(e.to_string()),
            },
            _ = expire_after(timeout) => Termination::TimedOut,
            _ = interrupts.cancelled() => Termination::Cancelled,
        };

        if matches!(termination, Termination::TimedOut | Termination::Cancelled) {
            call.0.abort();
            // abort 完了を待つ（JoinError::Cancelled は想定内）
            let _ = (&mut call.0).await;
        }
        drop(call);
        drop(interrupts);

        let (mut outcome, updated_args) = classify(termination, &types, &params, timeout);

        if let Some(scope) = scope {
            close_scope(scope, &mut outcome, updated_args.clone()).await;
        }

        Supervised {
            outcome,
            updated_receiver: updated_args.and_then(|args| args.into_iter().next()),
        }
    }

    async fn open_scope(&self, params: &[Parameter]) -> Result<Option<ScopeGuard>, ExecutionOutcome> {
        let (Some(storage), Some(conf)) = (&self.storage, &self.storage_conf) else {
            return Ok(None);
        };
        let values: Vec<TaskValue> = params.iter().map(Parameter::value).collect();
        match storage.acquire_scope(&values, conf).await {
            Ok(handle) => {
                debug!(scope = handle.0, "opened storage scope");
                Ok(Some(ScopeGuard {
                    storage: Arc::clone(storage),
                    handle,
                    released: false,
                }))
            }
            Err(e) => {
                error!(error = %e, "failed to open storage scope");
                Err(ExecutionOutcome::failed())
            }
        }
    }
}

/// Aborts the spawned call when dropped, so a dropped invocation never
/// leaves the callable running detached.
struct AbortOnDrop<T>(JoinHandle<T>);

impl<T> Drop for AbortOnDrop<T> {
    fn drop(&mut self) {
        self.0.abort();
    }
}

/// An open storage scope. Released explicitly on normal completion; if the
/// invocation is dropped first, `Drop` releases it from a spawned task as a
/// failed exit.
struct ScopeGuard {
    storage: Arc<dyn PersistentStorage>,
    handle: ScopeHandle,
    released: bool,
}

impl ScopeGuard {
    async fn release(mut self, exit: ScopeExit) -> Result<(), StorageError> {
        let result = self.storage.release_scope(self.handle, exit).await;
        self.released = true;
        result
    }
}

impl Drop for ScopeGuard {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        let handle = self.handle;
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            error!(scope = handle.0, "no runtime to release storage scope");
            return;
        };
        let storage = Arc::clone(&self.storage);
        warn!(scope = handle.0, "invocation dropped; releasing storage scope");
        runtime.spawn(async move {
            let exit = ScopeExit {
                succeeded: false,
                values: None,
            };
            if let Err(e) = storage.release_scope(handle, exit).await {
                error!(error = %e, scope = handle.0, "failed to close storage scope");
            }
        });
    }
}

async fn close_scope(
    scope: ScopeGuard,
    outcome: &mut ExecutionOutcome,
    updated_args: Option<Vec<TaskValue>>,
) {
    let handle = scope.handle;
    let exit = ScopeExit {
        succeeded: outcome.is_success(),
        values: updated_args,
    };
    match scope.release(exit).await {
        Ok(()) => debug!(scope = handle.0, "closed storage scope"),
        Err(e) => {
            error!(error = %e, scope = handle.0, "failed to close storage scope");
            outcome.downgrade_to_failure();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::interrupt::CancelSignal;
    use crate::domain::{CallContext, ContentType, Direction, ExitCode};
    use crate::impls::InMemoryStorage;
    use crate::typed::{CallOutput, callable_fn};
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::time::Duration;

    fn args(values: Vec<Parameter>) -> CallArgs {
        CallArgs::new(values, CallContext::default())
    }

    fn int(v: i32) -> Parameter {
        Parameter::new("i", ContentType::Int).with_content(TaskValue::Int(v))
    }

    fn psco(id: &str) -> Parameter {
        Parameter::new("p", ContentType::ExternalPsco).with_content(TaskValue::Str(id.into()))
    }

    fn supervisor() -> ExecutionSupervisor {
        ExecutionSupervisor::new(None, None)
    }

    #[tokio::test]
    async fn success_passes_outputs_through() {
        let task = callable_fn(|_args: CallArgs| async move {
            Ok(CallEnvelope::from(
                CallOutput::new(vec![Some(ContentType::Int)], vec![TaskValue::Int(5)])
                    .with_target_direction(Direction::InOut)
                    .with_updated_args(vec![TaskValue::Int(6)]),
            ))
        });

        let result = supervisor()
            .run(task, args(vec![int(1)]), InterruptContext::unbounded())
            .await;

        assert_eq!(result.outcome.exit_code, ExitCode::Success);
        assert_eq!(result.outcome.values, vec![TaskValue::Int(5)]);
        assert_eq!(
            result.outcome.target_direction.and_then(|p| p.direction),
            Some(Direction::InOut)
        );
        assert_eq!(result.updated_receiver, Some(TaskValue::Int(6)));
    }

    #[tokio::test]
    async fn wrapped_extras_are_discarded() {
        let task = callable_fn(|_args: CallArgs| async move {
            Ok(CallEnvelope::wrapped(
                CallOutput::new(vec![Some(ContentType::Int)], vec![TaskValue::Int(1)]),
                vec![TaskValue::Str("profiling".into())],
            ))
        });
        let result = supervisor()
            .run(task, args(vec![]), InterruptContext::unbounded())
            .await;
        assert_eq!(result.outcome.values, vec![TaskValue::Int(1)]);
    }

    #[tokio::test]
    async fn raised_error_nulls_outputs_and_keeps_message() {
        let task = callable_fn(|_args: CallArgs| async move {
            Err::<CallEnvelope, _>(TaskError::raised("bad input"))
        });
        let result = supervisor()
            .run(task, args(vec![int(1), psco("keep-me")]), InterruptContext::unbounded())
            .await;

        let outcome = result.outcome;
        assert_eq!(outcome.exit_code, ExitCode::Raised);
        assert_eq!(outcome.message, "bad input");
        assert_eq!(outcome.values, vec![TaskValue::Null, TaskValue::Str("keep-me".into())]);
        assert!(!outcome.timed_out);
    }

    #[tokio::test]
    async fn raised_without_message_uses_default() {
        let task = callable_fn(|_args: CallArgs| async move {
            Err::<CallEnvelope, _>(TaskError::raised_without_message())
        });
        let result = supervisor()
            .run(task, args(vec![]), InterruptContext::unbounded())
            .await;
        assert_eq!(result.outcome.message, "No message");
    }

    #[tokio::test]
    async fn attribute_and_generic_errors_have_empty_outputs() {
        for error in [TaskError::Attribute("no attr".into()), TaskError::failed("boom")] {
            let error = std::sync::Mutex::new(Some(error));
            let task = callable_fn(move |_args: CallArgs| {
                let e = error.lock().unwrap().take().unwrap();
                async move { Err::<CallEnvelope, _>(e) }
            });
            let result = supervisor()
                .run(task, args(vec![int(1)]), InterruptContext::unbounded())
                .await;
            assert_eq!(result.outcome.exit_code, ExitCode::Failure);
            assert!(result.outcome.types.is_empty());
            assert!(result.outcome.values.is_empty());
        }
    }

    #[tokio::test]
    async fn panic_is_a_failure() {
        let task = callable_fn(|_args: CallArgs| async move {
            if true {
                panic!("task exploded");
            }
            Ok(CallEnvelope::default())
        });
        let result = supervisor()
            .run(task, args(vec![]), InterruptContext::unbounded())
            .await;
        assert_eq!(result.outcome.exit_code, ExitCode::Failure);
    }

    #[tokio::test]
    async fn timeout_aborts_and_nulls_outputs() {
        let task = callable_fn(|_args: CallArgs| async move {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(CallEnvelope::default())
        });
        let started = std::time::Instant::now();
        let result = supervisor()
            .run(task, args(vec![psco("p-1"), int(2)]), InterruptContext::new(1, Default::default()))
            .await;

        assert!(started.elapsed() < Duration::from_secs(4));
        let outcome = result.outcome;
        assert_eq!(outcome.exit_code, ExitCode::TimedOut);
        assert!(outcome.timed_out);
        assert_eq!(outcome.values, vec![TaskValue::Str("p-1".into()), TaskValue::Null]);
    }

    #[tokio::test]
    async fn cancellation_is_a_failure_and_releases_listener() {
        let (handle, signal) = CancelSignal::pair();
        let task = callable_fn(|_args: CallArgs| async move {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(CallEnvelope::default())
        });

        let canceller = async {
            tokio::time::sleep(Duration::from_millis(50)).await;
            handle.cancel();
        };
        let supervisor = supervisor();
        let run = supervisor.run(task, args(vec![]), InterruptContext::new(0, signal));
        let (result, ()) = tokio::join!(run, canceller);

        assert_eq!(result.outcome.exit_code, ExitCode::Failure);
        assert!(!handle.is_listening());
    }

    #[tokio::test]
    async fn storage_scope_is_opened_and_closed_once() {
        let storage = Arc::new(InMemoryStorage::new());
        let supervisor = ExecutionSupervisor::new(
            Some(storage.clone()),
            Some(PathBuf::from("/etc/storage.cfg")),
        );
        let task = callable_fn(|_args: CallArgs| async move {
            Ok(CallEnvelope::from(
                CallOutput::empty().with_updated_args(vec![TaskValue::Int(8)]),
            ))
        });

        supervisor
            .run(task, args(vec![int(7)]), InterruptContext::unbounded())
            .await;

        let scopes = storage.scopes().await;
        assert_eq!(scopes.len(), 1);
        assert_eq!(scopes[0].entry_values, vec![TaskValue::Int(7)]);
        let exit = scopes[0].exit.clone().unwrap();
        assert!(exit.succeeded);
        assert_eq!(exit.values, Some(vec![TaskValue::Int(8)]));
    }

    #[tokio::test]
    async fn storage_scope_is_closed_after_timeout() {
        let storage = Arc::new(InMemoryStorage::new());
        let supervisor = ExecutionSupervisor::new(
            Some(storage.clone()),
            Some(PathBuf::from("/etc/storage.cfg")),
        );
        let task = callable_fn(|_args: CallArgs| async move {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(CallEnvelope::default())
        });

        let result = supervisor
            .run(task, args(vec![]), InterruptContext::new(1, Default::default()))
            .await;

        assert_eq!(result.outcome.exit_code, ExitCode::TimedOut);
        assert_eq!(storage.open_scopes().await, 0);
        assert!(!storage.scopes().await[0].exit.clone().unwrap().succeeded);
    }

    #[tokio::test]
    async fn dropped_run_aborts_call_and_releases_scope() {
        let storage = Arc::new(InMemoryStorage::new());
        let supervisor = ExecutionSupervisor::new(
            Some(storage.clone()),
            Some(PathBuf::from("/etc/storage.cfg")),
        );
        let finished = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&finished);
        let task = callable_fn(move |_args: CallArgs| {
            let flag = Arc::clone(&flag);
            async move {
                tokio::time::sleep(Duration::from_millis(200)).await;
                flag.store(true, Ordering::SeqCst);
                Ok(CallEnvelope::default())
            }
        });

        let run = supervisor.run(task, args(vec![int(1)]), InterruptContext::unbounded());
        assert!(tokio::time::timeout(Duration::from_millis(50), run).await.is_err());
        tokio::time::sleep(Duration::from_millis(400)).await;

        assert!(!finished.load(Ordering::SeqCst));
        assert_eq!(storage.open_scopes().await, 0);
        let exit = storage.scopes().await[0].exit.clone().unwrap();
        assert!(!exit.succeeded);
        assert!(exit.values.is_none());
    }

    #[tokio::test]
    async fn no_scope_without_storage_conf() {
        let storage = Arc::new(InMemoryStorage::new());
        let supervisor = ExecutionSupervisor::new(Some(storage.clone()), None);
        let task = callable_fn(|_args: CallArgs| async move { Ok(CallEnvelope::default()) });

        supervisor
            .run(task, args(vec![]), InterruptContext::unbounded())
            .await;
        assert!(storage.scopes().await.is_empty());
    }
}
