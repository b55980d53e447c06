//! Task trait - 型付き Task の定義
//!
//! # 学習ポイント
//! - Associated Constants (`const NAME`, `const QUEUE`)
//! - Trait bounds の組み合わせ (Serialize + DeserializeOwned + Send + Sync + 'static)

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::domain::DEFAULT_QUEUE;

/// Task は task name と引数の型を対応付ける
///
/// The struct fields are the job's keyword arguments.
///
/// # 使用例
/// ```ignore
/// #[derive(Serialize, Deserialize)]
/// struct Add {
///     a: i64,
///     b: i64,
/// }
///
/// impl Task for Add {
///     const NAME: &'static str = "add";
/// }
/// ```
pub trait Task: Serialize + DeserializeOwned + Send + Sync + 'static {
    const NAME: &'static str;

    /// Queue used when deferring this task.
    const QUEUE: &'static str = DEFAULT_QUEUE;

    /// Lock to defer this task with, if any.
    fn lock(&self) -> Option<String> {
        None
    }
}
