//! spindle-core
//!
//! Core building blocks for the Spindle job queue: producers defer named tasks
//! into a shared store, workers claim, execute and finalize them.
//!
//! # モジュール構成
//! - **domain**: ドメインモデル（ids, job, queue filter, outcome, events, errors）
//! - **ports**: 抽象化レイヤー（JobStore, Clock, IdGenerator）
//! - **typed**: 型付き Task API（Task, Handler, TaskRegistry, TaskResolver, RetryPolicy, ArgsCodec）
//! - **app**: アプリケーションロジック（AppBuilder, Worker, WorkerGroup, ReaperLoop, GcLoop）
//! - **impls**: 実装（InMemoryJobStore）
//! - **config** / **error** / **observability**: worker 設定、crate エラー、job のログ context

pub mod app;
pub mod config;
pub mod domain;
pub mod error;
pub mod impls;
pub mod observability;
pub mod ports;
pub mod typed;

pub use app::{App, AppBuilder, Worker, WorkerGroup};
pub use config::WorkerConfig;
pub use domain::{Job, JobId, JobStatus, QueueFilter};
pub use error::SpindleError;
pub use impls::InMemoryJobStore;
pub use ports::JobStore;
pub use typed::{Handler, RegisteredTask, Task, TaskRegistry};
