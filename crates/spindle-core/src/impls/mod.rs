//! Impls - ports の実装
//!
//! # 含まれる実装
//! - **InMemoryJobStore**: プロセス内の JobStore（テスト・デモ用）
//!
//! Durable stores live in their own crates and must pass the same contract.

pub mod memory_store;

pub use self::memory_store::InMemoryJobStore;
