// src/expire.rs

//! 过期策略：每个 (类型, 键名) 一条绝对毫秒截止时间，类型之间互不影响。
//!
//! expire 树内两类条目（编码见 codec）：
//! - 点条目 't'：查 TTL / 惰性判活走这里
//! - 索引条目 'd'：按截止时间排序，后台清理按序扫描
//!
//! 两条路径（惰性 + 后台）共用 purge，purge 幂等，谁先清都一样。

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use tokio::time::{Duration, interval};

use crate::codec::{self, DataType};
use crate::error::CmdResult;
use crate::store::Store;

/// 当前 UNIX 毫秒
pub fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

/// 设置绝对截止时间（ms）。键存在返回 1，不存在返回 0（不报错）。
/// 截止时间已过（含非正值）则当场清除，仍返回 1。
pub fn expire_at_ms(store: &Store, ty: DataType, name: &str, deadline_ms: i64) -> CmdResult<i64> {
    remove_if_expired(store, ty, name)?;
    if !store.exists(ty, name)? {
        return Ok(0);
    }
    if deadline_ms <= 0 || (deadline_ms as u64) <= now_ms() {
        purge(store, ty, name)?;
        return Ok(1);
    }
    let deadline = deadline_ms as u64;
    let tree = store.expire_tree()?;
    let point = codec::ttl_point_key(ty, name);
    // 换掉旧索引条目，保证索引里每个键只有一条
    if let Some(old) = tree.get(&point)? {
        let mut b = [0u8; 8];
        b.copy_from_slice(&old);
        let old_deadline = u64::from_be_bytes(b);
        tree.remove(codec::ttl_index_key(old_deadline, ty, name))?;
    }
    tree.insert(point, &deadline.to_be_bytes())?;
    tree.insert(codec::ttl_index_key(deadline, ty, name), &[])?;
    Ok(1)
}

/// 设置相对过期（ms）。非正数立即清除（键存在时）。
pub fn expire_ms(store: &Store, ty: DataType, name: &str, ms: i64) -> CmdResult<i64> {
    if ms <= 0 {
        return expire_at_ms(store, ty, name, 0);
    }
    expire_at_ms(store, ty, name, (now_ms() as i64).saturating_add(ms))
}

/// 设置相对过期（秒）
pub fn expire_secs(store: &Store, ty: DataType, name: &str, secs: i64) -> CmdResult<i64> {
    expire_ms(store, ty, name, secs.saturating_mul(1000))
}

/// 设置绝对过期（UNIX 秒）
pub fn expire_at_secs(store: &Store, ty: DataType, name: &str, unix_secs: i64) -> CmdResult<i64> {
    expire_at_ms(store, ty, name, unix_secs.saturating_mul(1000))
}

/// 剩余毫秒。键不存在 -2，无过期 -1。
pub fn pttl(store: &Store, ty: DataType, name: &str) -> CmdResult<i64> {
    let tree = store.expire_tree()?;
    match tree.get(codec::ttl_point_key(ty, name))? {
        Some(iv) => {
            let mut b = [0u8; 8];
            b.copy_from_slice(&iv);
            let deadline = u64::from_be_bytes(b);
            let now = now_ms();
            if deadline <= now {
                // 惰性清理
                purge(store, ty, name)?;
                Ok(-2)
            } else {
                Ok((deadline - now) as i64)
            }
        }
        None => {
            if store.exists(ty, name)? {
                Ok(-1)
            } else {
                Ok(-2)
            }
        }
    }
}

/// 剩余秒数（向上取整）。哨兵值同 pttl。
pub fn ttl(store: &Store, ty: DataType, name: &str) -> CmdResult<i64> {
    let ms = pttl(store, ty, name)?;
    if ms < 0 { Ok(ms) } else { Ok((ms + 999) / 1000) }
}

/// 移除过期属性。移除了返回 1，键不存在或本无过期返回 0。
pub fn persist(store: &Store, ty: DataType, name: &str) -> CmdResult<i64> {
    remove_if_expired(store, ty, name)?;
    let tree = store.expire_tree()?;
    let point = codec::ttl_point_key(ty, name);
    match tree.get(&point)? {
        Some(iv) => {
            let mut b = [0u8; 8];
            b.copy_from_slice(&iv);
            let deadline = u64::from_be_bytes(b);
            tree.remove(&point)?;
            tree.remove(codec::ttl_index_key(deadline, ty, name))?;
            Ok(1)
        }
        None => Ok(0),
    }
}

/// 判活入口：每条访问路径进数据前先走一遍。
/// 截止时间已过则同步清除，本次操作视键为不存在。
pub fn remove_if_expired(store: &Store, ty: DataType, name: &str) -> CmdResult<()> {
    let tree = store.expire_tree()?;
    if let Some(iv) = tree.get(codec::ttl_point_key(ty, name))? {
        let mut b = [0u8; 8];
        b.copy_from_slice(&iv);
        if u64::from_be_bytes(b) <= now_ms() {
            purge(store, ty, name)?;
        }
    }
    Ok(())
}

/// 删掉实体本体和全部过期元数据。幂等：重复清除是 no-op。
pub fn purge(store: &Store, ty: DataType, name: &str) -> CmdResult<()> {
    let tree = store.expire_tree()?;
    let point = codec::ttl_point_key(ty, name);
    if let Some(iv) = tree.get(&point)? {
        let mut b = [0u8; 8];
        b.copy_from_slice(&iv);
        let deadline = u64::from_be_bytes(b);
        tree.remove(codec::ttl_index_key(deadline, ty, name))?;
        tree.remove(&point)?;
    }
    store.drop_data(ty, name)?;
    Ok(())
}

/// 扫一轮索引，最多处理 batch 个键。返回处理数。
/// 先收集再逐键加锁清理，扫描本身不持任何键锁。
pub fn sweep_once(store: &Store, batch: usize) -> CmdResult<usize> {
    let tree = store.expire_tree()?;
    let now = now_ms();
    let mut due = Vec::new();
    for entry in tree.scan_prefix(b"d") {
        let (k, _) = entry?;
        let Some((deadline, ty, name)) = codec::decode_ttl_index_key(&k) else {
            continue;
        };
        if deadline > now {
            // 索引有序，后面的都没到期
            break;
        }
        due.push((ty, name));
        if due.len() >= batch {
            break;
        }
    }
    let n = due.len();
    for (ty, name) in due {
        let lock = store.key_lock(ty, &name);
        let _barrier = store.shared();
        let _guard = lock.lock().unwrap_or_else(|e| e.into_inner());
        // 锁内复查截止时间，和惰性路径抢着清也只清一次
        remove_if_expired(store, ty, &name)?;
    }
    Ok(n)
}

/// 后台定时清理任务
pub async fn start_sweeper(store: Arc<Store>, interval_ms: u64, batch: usize) {
    let mut iv = interval(Duration::from_millis(interval_ms.max(1)));
    loop {
        iv.tick().await;
        match sweep_once(&store, batch) {
            Ok(0) => {}
            Ok(n) => tracing::debug!("sweeper purged {} expired keys", n),
            Err(e) => tracing::warn!("sweeper pass failed: {}", e),
        }
    }
}
