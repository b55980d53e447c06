//! App - アプリケーション層
//!
//! このモジュールは、ports を組み合わせてアプリケーションロジックを実装します。
//!
//! # 主要コンポーネント
//! - **AppBuilder / App**: task 登録、起動時検証、job の defer、worker の生成
//! - **Worker**: claim → resolve → execute → finish のループ
//! - **WorkerGroup**: N 個の worker をそれぞれの store session で並走させる
//! - **ReaperLoop**: stall した job の回収
//! - **GcLoop**: 終了済み job の削除

pub mod builder;
pub mod gc_loop;
pub mod reaper_loop;
pub mod worker_group;
pub mod worker_loop;

// 主要な型を再エクスポート
pub use self::builder::{App, AppBuilder, BuildError};
pub use self::gc_loop::{GcConfig, GcLoop};
pub use self::reaper_loop::{ReaperConfig, ReaperLoop, StalledAction};
pub use self::worker_group::{GroupStopHandle, WorkerGroup};
pub use self::worker_loop::{Step, StopHandle, Worker};
