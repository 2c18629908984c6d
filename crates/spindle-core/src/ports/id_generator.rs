//! IdGenerator port - ID 生成の抽象化
//!
//! テスト容易性のために trait として抽象化しています。
//!
//! # 実装
//! - **UlidGenerator**: Clock の時刻 + ランダム部の ULID

use crate::domain::InvocationId;
use crate::ports::Clock;
use ulid::Ulid;

pub trait IdGenerator: Send + Sync {
    fn generate_invocation_id(&self) -> InvocationId;
}

/// UlidGenerator は ULID ベースの ID 生成器
///
/// FixedClock を渡すと timestamp 部分が決定的になる。
pub struct UlidGenerator<C> {
    clock: C,
}

impl<C: Clock> UlidGenerator<C> {
    pub fn new(clock: C) -> Self {
        Self { clock }
    }
}

impl<C: Clock> IdGenerator for UlidGenerator<C> {
    fn generate_invocation_id(&self) -> InvocationId {
        let timestamp_ms = self.clock.now().timestamp_millis() as u64;
        let ulid = Ulid::from_parts(timestamp_ms, rand::random());
        InvocationId::from(ulid)
    }
}
