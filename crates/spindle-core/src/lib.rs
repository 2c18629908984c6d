//! spindle-core
//!
//! Worker-side execution engine for distributed task invocations.
//!
//! # モジュール構成
//! - **domain**: ドメインモデル（Parameter, TaskValue, TaskInvocation, ExecutionOutcome, errors, ids）
//! - **ports**: 抽象化レイヤー（ObjectCodec, PersistentStorage, ModuleLoader, Clock, IdGenerator）
//! - **impls**: 実装（JsonCodec, InMemoryStorage, ModuleTable）
//! - **typed**: callable の登録と解決（TaskCallable, Module, CallableResolver）
//! - **codec**: wire format の decode と結果タプルの encode
//! - **app**: 実行パイプライン（WorkerBuilder, Worker, supervisor, materializer）

pub mod app;
pub mod codec;
pub mod domain;
pub mod impls;
pub mod ports;
pub mod typed;
