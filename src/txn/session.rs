// src/txn/session.rs

//! 单个连接的 MULTI 队列状态机：NORMAL ↔ QUEUING。
//!
//! QUEUING 期间除 EXEC / DISCARD 外的命令只入队不执行，回 QUEUED；
//! EXEC / DISCARD 不论成败都回到 NORMAL。

use crate::error::{CmdResult, CommandError};

#[derive(Debug)]
pub struct TxnSession {
    pub in_multi: bool,
    pub queue: Vec<Vec<String>>,
}

impl TxnSession {
    pub fn new() -> Self {
        TxnSession {
            in_multi: false,
            queue: Vec::new(),
        }
    }

    /// MULTI：进入 QUEUING。重复 MULTI 报嵌套错误，状态不变。
    pub fn begin(&mut self) -> CmdResult<()> {
        if self.in_multi {
            Err(CommandError::NestedMulti)
        } else {
            self.in_multi = true;
            self.queue.clear();
            Ok(())
        }
    }

    /// 入队一条命令（调用方保证处于 QUEUING）
    pub fn enqueue(&mut self, cmd: Vec<String>) {
        self.queue.push(cmd);
    }

    /// DISCARD：清空队列回到 NORMAL
    pub fn discard(&mut self) -> CmdResult<()> {
        if !self.in_multi {
            Err(CommandError::DiscardWithoutMulti)
        } else {
            self.in_multi = false;
            self.queue.clear();
            Ok(())
        }
    }

    /// EXEC 的前半段：取走队列并回到 NORMAL
    pub fn take_queue(&mut self) -> CmdResult<Vec<Vec<String>>> {
        if !self.in_multi {
            Err(CommandError::ExecWithoutMulti)
        } else {
            self.in_multi = false;
            Ok(std::mem::take(&mut self.queue))
        }
    }
}

impl Default for TxnSession {
    fn default() -> Self {
        TxnSession::new()
    }
}
