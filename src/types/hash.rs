// src/types/hash.rs

//! Hash 类型：每个 hash 一棵树，树名 "hash:<name>"。
//!
//! field 条目的值带 8 字节插入序头（meta 键 '!' 是计数器），
//! hkeys / hvals / hgetall 按首次插入顺序吐出；覆盖写不换位置。

use crate::codec::{self, DataType};
use crate::error::CmdResult;
use crate::expire;
use crate::protocol::Reply;
use crate::store::Store;

/// 取下一个插入序号并推进计数器
fn next_seq(tree: &sled::Tree) -> CmdResult<u64> {
    let seq = match tree.get(codec::HASH_META_KEY)? {
        Some(iv) => {
            let mut b = [0u8; 8];
            b.copy_from_slice(&iv);
            u64::from_be_bytes(b)
        }
        None => 0,
    };
    tree.insert(codec::HASH_META_KEY, &(seq + 1).to_be_bytes())?;
    Ok(seq)
}

/// 按插入序收集 (field, value)
fn entries_in_order(tree: &sled::Tree) -> CmdResult<Vec<(String, Vec<u8>)>> {
    let mut rows = Vec::new();
    for pair in tree.scan_prefix(codec::HASH_FIELD_PREFIX) {
        let (k, v) = pair?;
        let mut b = [0u8; 8];
        b.copy_from_slice(&v[..8]);
        let seq = u64::from_be_bytes(b);
        let field = String::from_utf8_lossy(codec::hash_field_from_key(&k)).into_owned();
        rows.push((seq, field, v[8..].to_vec()));
    }
    rows.sort_by_key(|(seq, _, _)| *seq);
    Ok(rows.into_iter().map(|(_, f, v)| (f, v)).collect())
}

/// HSET：新 field 返回 1，覆盖返回 0（插入序保持原位）
pub fn hset(store: &Store, key: &str, field: &str, value: &str) -> CmdResult<Reply> {
    expire::remove_if_expired(store, DataType::Hash, key)?;
    let tree = store.data_tree(DataType::Hash, key)?;
    let fk = codec::hash_field_key(field);
    match tree.get(&fk)? {
        Some(old) => {
            let mut buf = old[..8].to_vec();
            buf.extend_from_slice(value.as_bytes());
            tree.insert(fk, buf)?;
            Ok(Reply::Integer(0))
        }
        None => {
            let mut buf = next_seq(&tree)?.to_be_bytes().to_vec();
            buf.extend_from_slice(value.as_bytes());
            tree.insert(fk, buf)?;
            Ok(Reply::Integer(1))
        }
    }
}

/// HMSET：批量 hset，统一回 OK
pub fn hmset(store: &Store, key: &str, pairs: &[String]) -> CmdResult<Reply> {
    for chunk in pairs.chunks(2) {
        hset(store, key, &chunk[0], &chunk[1])?;
    }
    Ok(Reply::ok())
}

/// HGET：field 不存在返回 nil
pub fn hget(store: &Store, key: &str, field: &str) -> CmdResult<Reply> {
    expire::remove_if_expired(store, DataType::Hash, key)?;
    let tree = store.data_tree(DataType::Hash, key)?;
    match tree.get(codec::hash_field_key(field))? {
        Some(iv) => Ok(Reply::Bulk(iv[8..].to_vec())),
        None => Ok(Reply::Nil),
    }
}

/// HMGET：逐 field 取值
pub fn hmget(store: &Store, key: &str, fields: &[String]) -> CmdResult<Reply> {
    let mut out = Vec::with_capacity(fields.len());
    for f in fields {
        out.push(hget(store, key, f)?);
    }
    Ok(Reply::Array(out))
}

/// HEXISTS
pub fn hexists(store: &Store, key: &str, field: &str) -> CmdResult<Reply> {
    expire::remove_if_expired(store, DataType::Hash, key)?;
    let tree = store.data_tree(DataType::Hash, key)?;
    let found = tree.contains_key(codec::hash_field_key(field))?;
    Ok(Reply::Integer(if found { 1 } else { 0 }))
}

/// HDEL：返回实际删掉的 field 数；删空即销毁实体并清过期
pub fn hdel(store: &Store, key: &str, fields: &[String]) -> CmdResult<Reply> {
    expire::remove_if_expired(store, DataType::Hash, key)?;
    let tree = store.data_tree(DataType::Hash, key)?;
    let mut removed = 0;
    for f in fields {
        if tree.remove(codec::hash_field_key(f))?.is_some() {
            removed += 1;
        }
    }
    if removed > 0 && !store.exists(DataType::Hash, key)? {
        expire::purge(store, DataType::Hash, key)?;
    }
    Ok(Reply::Integer(removed))
}

/// HLEN
pub fn hlen(store: &Store, key: &str) -> CmdResult<Reply> {
    expire::remove_if_expired(store, DataType::Hash, key)?;
    let tree = store.data_tree(DataType::Hash, key)?;
    let n = tree.scan_prefix(codec::HASH_FIELD_PREFIX).count();
    Ok(Reply::Integer(n as i64))
}

/// HSTRLEN：field 值的字节长度，不存在为 0
pub fn hstrlen(store: &Store, key: &str, field: &str) -> CmdResult<Reply> {
    expire::remove_if_expired(store, DataType::Hash, key)?;
    let tree = store.data_tree(DataType::Hash, key)?;
    let len = tree
        .get(codec::hash_field_key(field))?
        .map(|iv| iv.len() - 8)
        .unwrap_or(0);
    Ok(Reply::Integer(len as i64))
}

/// HKEYS：按首次插入顺序
pub fn hkeys(store: &Store, key: &str) -> CmdResult<Reply> {
    expire::remove_if_expired(store, DataType::Hash, key)?;
    let tree = store.data_tree(DataType::Hash, key)?;
    let out = entries_in_order(&tree)?
        .into_iter()
        .map(|(f, _)| Reply::bulk(f))
        .collect();
    Ok(Reply::Array(out))
}

/// HVALS：按首次插入顺序
pub fn hvals(store: &Store, key: &str) -> CmdResult<Reply> {
    expire::remove_if_expired(store, DataType::Hash, key)?;
    let tree = store.data_tree(DataType::Hash, key)?;
    let out = entries_in_order(&tree)?
        .into_iter()
        .map(|(_, v)| Reply::Bulk(v))
        .collect();
    Ok(Reply::Array(out))
}

/// HGETALL：field1, value1, field2, value2 …
pub fn hgetall(store: &Store, key: &str) -> CmdResult<Reply> {
    expire::remove_if_expired(store, DataType::Hash, key)?;
    let tree = store.data_tree(DataType::Hash, key)?;
    let mut out = Vec::new();
    for (f, v) in entries_in_order(&tree)? {
        out.push(Reply::bulk(f));
        out.push(Reply::Bulk(v));
    }
    Ok(Reply::Array(out))
}

/// HCLEAR：整个实体连同过期元数据一起删，存在返回 1
pub fn hclear(store: &Store, key: &str) -> CmdResult<Reply> {
    expire::remove_if_expired(store, DataType::Hash, key)?;
    let existed = store.exists(DataType::Hash, key)?;
    expire::purge(store, DataType::Hash, key)?;
    Ok(Reply::Integer(if existed { 1 } else { 0 }))
}
