// src/types/string.rs

//! String 类型：默认树上的 "string:<name>" 条目。
//!
//! - SET 支持 EX/PX/NX/XX 修饰，过期和写入在同一次命令里生效
//! - INCR 族只在存量字节能解析成十进制 i64 时工作，否则报
//!   NotAnInteger，原值不动
//! - SETBIT/GETBIT/BITCOUNT 按位寻址，高位在前，越界自动补零字节
//!
//! 普通写入不清也不续已有的过期时间；显式 DEL 连带清掉过期元数据。

use crate::codec::{self, DataType};
use crate::error::{CmdResult, CommandError};
use crate::expire;
use crate::protocol::Reply;
use crate::store::Store;

/// SET 的修饰参数
#[derive(Debug, Default)]
pub struct SetOptions {
    pub ex: Option<i64>,
    pub px: Option<i64>,
    pub nx: bool,
    pub xx: bool,
}

impl SetOptions {
    /// 解析 SET key value 之后的尾部参数
    pub fn parse(args: &[String]) -> CmdResult<SetOptions> {
        let mut opts = SetOptions::default();
        let mut i = 0;
        while i < args.len() {
            match args[i].to_uppercase().as_str() {
                "NX" => opts.nx = true,
                "XX" => opts.xx = true,
                "EX" => {
                    i += 1;
                    let v = args.get(i).ok_or(CommandError::Syntax)?;
                    opts.ex = Some(v.parse().map_err(|_| CommandError::NotAnInteger)?);
                }
                "PX" => {
                    i += 1;
                    let v = args.get(i).ok_or(CommandError::Syntax)?;
                    opts.px = Some(v.parse().map_err(|_| CommandError::NotAnInteger)?);
                }
                _ => return Err(CommandError::Syntax),
            }
            i += 1;
        }
        if opts.nx && opts.xx {
            return Err(CommandError::Syntax);
        }
        Ok(opts)
    }
}

/// SET：写入字符串。NX/XX 条件不满足时返回 nil，不动存量。
pub fn set(store: &Store, key: &str, value: &str, opts: &SetOptions) -> CmdResult<Reply> {
    expire::remove_if_expired(store, DataType::String, key)?;
    let k = codec::string_key(key);
    let existed = store.db().contains_key(&k)?;
    if (opts.nx && existed) || (opts.xx && !existed) {
        return Ok(Reply::Nil);
    }
    store.db().insert(k, value.as_bytes())?;
    if let Some(ms) = opts.px {
        expire::expire_ms(store, DataType::String, key, ms)?;
    } else if let Some(secs) = opts.ex {
        expire::expire_secs(store, DataType::String, key, secs)?;
    }
    Ok(Reply::ok())
}

/// GET：键不存在返回 nil
pub fn get(store: &Store, key: &str) -> CmdResult<Reply> {
    expire::remove_if_expired(store, DataType::String, key)?;
    match store.db().get(codec::string_key(key))? {
        Some(iv) => Ok(Reply::Bulk(iv.to_vec())),
        None => Ok(Reply::Nil),
    }
}

/// DEL：逐键删除，返回实际删掉的个数，过期元数据一并清
pub fn del(store: &Store, keys: &[String]) -> CmdResult<Reply> {
    let mut removed = 0;
    for key in keys {
        expire::remove_if_expired(store, DataType::String, key)?;
        if store.exists(DataType::String, key)? {
            expire::purge(store, DataType::String, key)?;
            removed += 1;
        }
    }
    Ok(Reply::Integer(removed))
}

/// MGET：每个键各给一个 bulk 或 nil
pub fn mget(store: &Store, keys: &[String]) -> CmdResult<Reply> {
    let mut out = Vec::with_capacity(keys.len());
    for key in keys {
        out.push(get(store, key)?);
    }
    Ok(Reply::Array(out))
}

/// MSET：整批原子写入（sled batch），要么全进要么全不进
pub fn mset(store: &Store, pairs: &[String]) -> CmdResult<Reply> {
    // 先清掉各键残留的过期状态，新值不能继承旧截止时间
    for chunk in pairs.chunks(2) {
        expire::remove_if_expired(store, DataType::String, &chunk[0])?;
    }
    let mut batch = sled::Batch::default();
    for chunk in pairs.chunks(2) {
        batch.insert(codec::string_key(&chunk[0]), chunk[1].as_bytes());
    }
    store.db().apply_batch(batch)?;
    Ok(Reply::ok())
}

/// INCR/INCRBY/DECR/DECRBY 共用：对存量整数加 delta。
/// 键不存在按 0 起步；解析失败或溢出报 NotAnInteger，不写入。
pub fn incr_by(store: &Store, key: &str, delta: i64) -> CmdResult<Reply> {
    expire::remove_if_expired(store, DataType::String, key)?;
    let k = codec::string_key(key);
    let old = match store.db().get(&k)? {
        Some(iv) => std::str::from_utf8(&iv)
            .ok()
            .and_then(|s| s.parse::<i64>().ok())
            .ok_or(CommandError::NotAnInteger)?,
        None => 0,
    };
    let new = old.checked_add(delta).ok_or(CommandError::NotAnInteger)?;
    store.db().insert(k, new.to_string().as_bytes())?;
    Ok(Reply::Integer(new))
}

/// STRLEN：字节长度，键不存在为 0
pub fn strlen(store: &Store, key: &str) -> CmdResult<Reply> {
    expire::remove_if_expired(store, DataType::String, key)?;
    let len = store
        .db()
        .get(codec::string_key(key))?
        .map(|iv| iv.len())
        .unwrap_or(0);
    Ok(Reply::Integer(len as i64))
}

/// SETBIT：写第 offset 位（高位在前），返回旧位值。
/// 值不够长时补零字节。
pub fn setbit(store: &Store, key: &str, offset: u64, bit: u8) -> CmdResult<Reply> {
    expire::remove_if_expired(store, DataType::String, key)?;
    let k = codec::string_key(key);
    let mut val = store
        .db()
        .get(&k)?
        .map(|iv| iv.to_vec())
        .unwrap_or_default();
    let byte_idx = (offset / 8) as usize;
    let shift = 7 - (offset % 8) as u32;
    if val.len() <= byte_idx {
        val.resize(byte_idx + 1, 0);
    }
    let old = (val[byte_idx] >> shift) & 1;
    if bit == 1 {
        val[byte_idx] |= 1 << shift;
    } else {
        val[byte_idx] &= !(1 << shift);
    }
    store.db().insert(k, val)?;
    Ok(Reply::Integer(old as i64))
}

/// GETBIT：读第 offset 位，超出长度为 0
pub fn getbit(store: &Store, key: &str, offset: u64) -> CmdResult<Reply> {
    expire::remove_if_expired(store, DataType::String, key)?;
    let val = store.db().get(codec::string_key(key))?;
    let byte_idx = (offset / 8) as usize;
    let shift = 7 - (offset % 8) as u32;
    let bit = match val {
        Some(iv) if byte_idx < iv.len() => (iv[byte_idx] >> shift) & 1,
        _ => 0,
    };
    Ok(Reply::Integer(bit as i64))
}

/// BITCOUNT：整个值或 [start, end] 字节区间内的置位数。
/// 负下标从尾部数，越界截断，区间倒置得 0。
pub fn bitcount(store: &Store, key: &str, range: Option<(i64, i64)>) -> CmdResult<Reply> {
    expire::remove_if_expired(store, DataType::String, key)?;
    let val = match store.db().get(codec::string_key(key))? {
        Some(iv) => iv,
        None => return Ok(Reply::Integer(0)),
    };
    let len = val.len() as i64;
    let (start, end) = match range {
        Some((s, e)) => {
            let s = if s < 0 { (len + s).max(0) } else { s.min(len) };
            let e = if e < 0 { len + e } else { e.min(len - 1) };
            (s, e)
        }
        None => (0, len - 1),
    };
    if start > end || len == 0 {
        return Ok(Reply::Integer(0));
    }
    let count: u32 = val[start as usize..=end as usize]
        .iter()
        .map(|b| b.count_ones())
        .sum();
    Ok(Reply::Integer(count as i64))
}
