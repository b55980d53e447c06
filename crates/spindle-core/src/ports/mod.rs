//! Ports - 抽象化レイヤー
//!
//! Hexagonal Architecture の「ポート」。store（永続化とその通知）、時刻、
//! ID 生成を trait として切り出し、実装の詳細を隠蔽します。

pub mod clock;
pub mod id_generator;
pub mod job_store;

pub use self::clock::{Clock, FixedClock, SystemClock};
pub use self::id_generator::{IdGenerator, UlidGenerator};
pub use self::job_store::JobStore;
