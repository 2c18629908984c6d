//! Worker - 1 invocation を decode → dispatch → supervise → encode する
//!
//! # フロー
//! 1. InvocationDecoder で引数ベクタを TaskInvocation に変換（失敗は Err）
//! 2. CallableResolver で呼び出し対象を解決（失敗は exit 1）
//! 3. instance method なら ReceiverMaterializer で receiver を先頭に用意
//! 4. ExecutionSupervisor で実行・分類
//! 5. 必要なら receiver を書き戻し、encode_result で 6 要素に整形
//!
//! ワーカーは同時に 1 invocation しか実行しない前提。
//! invocation をまたいで共有されるのは resolver の module キャッシュだけ。

use std::sync::Arc;

use thiserror::Error;
use tracing::{Instrument, debug, error, info, info_span, warn};

use super::config::WorkerConfig;
use super::interrupt::{CancelSignal, InterruptContext};
use super::materializer::ReceiverMaterializer;
use super::supervisor::ExecutionSupervisor;
use crate::codec::{DecodeError, InvocationDecoder, TaskResult, encode_result};
use crate::domain::{ExecutionOutcome, Parameter, TaskInvocation};
use crate::ports::{Clock, IdGenerator};
use crate::typed::{CallArgs, CallableResolver, ResolvedCallable};

#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("cannot decode invocation: {0}")]
    Decode(#[from] DecodeError),
}

pub struct Worker {
    pub(super) config: WorkerConfig,
    pub(super) decoder: InvocationDecoder,
    pub(super) resolver: CallableResolver,
    pub(super) materializer: ReceiverMaterializer,
    pub(super) supervisor: ExecutionSupervisor,
    pub(super) clock: Arc<dyn Clock>,
    pub(super) ids: Arc<dyn IdGenerator>,
}

impl Worker {
    pub fn config(&self) -> &WorkerConfig {
        &self.config
    }

    pub fn storage_enabled(&self) -> bool {
        self.config.storage_enabled()
    }

    /// Module paths currently held in the resolver cache.
    pub fn cached_modules(&self) -> Vec<String> {
        self.resolver.cached_paths()
    }

    pub async fn execute(&self, args: &[String]) -> Result<TaskResult, WorkerError> {
        self.execute_with_signal(args, CancelSignal::never()).await
    }

    /// Executes one invocation; `signal` aborts it from outside.
    pub async fn execute_with_signal(
        &self,
        args: &[String],
        signal: CancelSignal,
    ) -> Result<TaskResult, WorkerError> {
        let id = self.ids.generate_invocation_id();
        let span = info_span!("invocation", id = %id, process = %self.config.process_name);
        self.run_invocation(args, signal).instrument(span).await
    }

    async fn run_invocation(
        &self,
        args: &[String],
        signal: CancelSignal,
    ) -> Result<TaskResult, WorkerError> {
        let started_at = self.clock.now();
        let invocation = self
            .decoder
            .decode(args, self.config.call_context())
            .inspect_err(|e| error!(error = %e, "failed to decode invocation"))?;
        info!(task = %invocation.qualified_name(), "executing task");

        let outcome = self.dispatch(invocation, signal).await;
        if outcome.is_success() {
            debug!("task finished successfully");
        } else {
            debug!(exit_code = outcome.exit_code.code(), "task failed");
        }

        let finished_at = self.clock.now();
        Ok(encode_result(outcome.with_timing(started_at, finished_at)))
    }

    async fn dispatch(&self, invocation: TaskInvocation, signal: CancelSignal) -> ExecutionOutcome {
        let resolved = match self.resolver.resolve(
            &invocation.target_path,
            &invocation.method_name,
            invocation.has_receiver,
        ) {
            Ok(resolved) => resolved,
            Err(e) => {
                error!(error = %e, task = %invocation.qualified_name(), "cannot resolve task");
                if e.is_attribute() {
                    warn!("check that the task's module is imported by its absolute path");
                }
                return ExecutionOutcome::failed();
            }
        };
        debug!(kind = resolved.kind(), "resolved callable");

        let TaskInvocation {
            mut parameters,
            auxiliary,
            timeout_seconds,
            return_arity,
            ..
        } = invocation;
        let interrupts = InterruptContext::new(timeout_seconds, signal);
        let callable = resolved.callable();

        match resolved {
            ResolvedCallable::FreeFunction(_) => {
                let args = CallArgs::new(parameters, auxiliary);
                self.supervisor.run(callable, args, interrupts).await.outcome
            }
            ResolvedCallable::ClassMethod { class, .. } => {
                debug!(class = %class, "calling class method");
                let mut args = CallArgs::new(parameters, auxiliary);
                // class slot
                args.types.insert(0, None);
                self.supervisor.run(callable, args, interrupts).await.outcome
            }
            ResolvedCallable::InstanceMethod { class, .. } => {
                debug!(class = %class, "calling instance method");
                let origin = match self.materializer.materialize(&mut parameters, return_arity).await {
                    Ok(origin) => origin,
                    Err(e) => {
                        error!(error = %e, "cannot materialize receiver");
                        return ExecutionOutcome::failed();
                    }
                };
                let receiver = parameters.first().map(Parameter::value).unwrap_or_default();
                let args = CallArgs::new(parameters, auxiliary);

                let supervised = self.supervisor.run(callable, args, interrupts).await;
                let mut outcome = supervised.outcome;
                // scope release が失敗していれば書き戻さない
                if outcome.is_success() && outcome.target_direction.is_some() {
                    let updated = supervised.updated_receiver.unwrap_or(receiver);
                    self.materializer.write_back(&origin, &updated, &mut outcome);
                }
                outcome
            }
        }
    }
}
