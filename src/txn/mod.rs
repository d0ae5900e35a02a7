// src/txn/mod.rs

//! 事务支持：每个连接一个 TxnSession 状态机，EXEC 经 executor 回放

pub mod executor;
pub mod session;

pub use session::TxnSession;
