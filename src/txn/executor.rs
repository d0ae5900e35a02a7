// src/txn/executor.rs

//! 事务队列回放：逐条走 engine 的同一条分发路径，保证入队执行
//! 和即时执行语义一致。
//!
//! 某条命令失败时，它的错误占住自己在结果序列里的位置，后续命令
//! 照常执行；调用方（engine 的 EXEC 分支）已持有独占屏障，这里
//! 不再加锁。

use crate::engine;
use crate::protocol::Reply;
use crate::store::Store;

pub fn exec_all(store: &Store, cmds: &[Vec<String>]) -> Vec<Reply> {
    let mut out = Vec::with_capacity(cmds.len());
    for parts in cmds {
        out.push(engine::dispatch_parts(parts, store));
    }
    out
}
