//! Typed - 型付き Task API
//!
//! このモジュールは task name の typo を型で排除し、
//! Handler との対応付けを静的に保証します。
//!
//! # 二層構造
//! - **表層（Typed）**: `Task` trait, `Handler<T>` trait - 型安全
//! - **内部（Dyn）**: `DynHandler` trait - object-safe, type erasure
//!
//! Jobs enqueued by name only (or by another producer) go through the
//! dynamic layer directly.

pub mod codec;
pub mod handler;
pub mod registry;
pub mod resolver;
pub mod retry;
pub mod task;

// 主要な trait/型 を再エクスポート
pub use self::codec::{ArgsCodec, CodecError};
pub use self::handler::{DynHandler, Handler, handler_fn, handler_sync};
pub use self::registry::{NoLoader, RegisteredTask, RegistryError, TaskLoader, TaskRegistry};
pub use self::resolver::TaskResolver;
pub use self::retry::{ExponentialBackoff, FixedDelay, MAX_RETRY_DELAY, NoRetry, RetryPolicy};
pub use self::task::Task;
