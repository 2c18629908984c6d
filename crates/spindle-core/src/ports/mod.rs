//! Ports - 抽象化レイヤー
//!
//! ワーカーが依存する外部コラボレータのインターフェース。
//! 実装の詳細（serialization 形式、storage backend、モジュールの出所）は隠蔽する。

pub mod clock;
pub mod codec;
pub mod id_generator;
pub mod loader;
pub mod storage;

pub use self::clock::{Clock, FixedClock, SystemClock};
pub use self::codec::{CodecError, ObjectCodec};
pub use self::id_generator::{IdGenerator, UlidGenerator};
pub use self::loader::{LoadError, ModuleLoader};
pub use self::storage::{PersistentStorage, ScopeExit, ScopeHandle, StorageError};
