//! Impls - ports の実装（in-process 用・テスト用）
//!
//! # 含まれる実装
//! - **JsonCodec**: serde_json ベースの ObjectCodec
//! - **InMemoryStorage**: PSCO と scope を記録する PersistentStorage
//! - **ModuleTable**: 登録済み Module を返す ModuleLoader
//!
//! 本番の storage backend はワーカーの外側に置く（このクレートでは trait のみ）。

pub mod inmem_storage;
pub mod json_codec;
pub mod module_table;

pub use self::inmem_storage::InMemoryStorage;
pub use self::json_codec::JsonCodec;
pub use self::module_table::ModuleTable;
