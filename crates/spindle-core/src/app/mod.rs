//! App - アプリケーション層
//!
//! このモジュールは、ports と codec / typed を組み合わせて
//! 1 invocation の実行パイプラインを実装します。
//!
//! # 主要コンポーネント
//! - **WorkerBuilder**: Worker の構築とワイヤリング（fail-fast 検証）
//! - **Worker**: decode → dispatch → supervise → encode
//! - **ReceiverMaterializer**: instance method の receiver の復元と書き戻し
//! - **ExecutionSupervisor**: timeout / cancel / storage scope 付きの実行と分類
//! - **InterruptContext**: invocation 単位の timeout と cancel signal
//! - **WorkerConfig**: 設定（JSON + 環境変数）

pub mod builder;
pub mod config;
pub mod interrupt;
pub mod materializer;
pub mod supervisor;
pub mod worker;

// 主要な型を再エクスポート
pub use self::builder::{BuildError, WorkerBuilder};
pub use self::config::{ConfigError, WorkerConfig};
pub use self::interrupt::{CancelHandle, CancelSignal, InterruptContext};
pub use self::materializer::{MaterializeError, ReceiverMaterializer, ReceiverOrigin};
pub use self::supervisor::{ExecutionSupervisor, Supervised};
pub use self::worker::{Worker, WorkerError};
