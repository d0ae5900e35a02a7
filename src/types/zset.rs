// src/types/zset.rs

//! # Sorted Set Type Support
//!
//! Each sorted set is one tree named `"zset:<name>"` with two keyspaces:
//!
//! - `'m' | member` → raw score bits, for point lookups
//! - `'s' | ordered-score(8) | member` → (), the range-scan index
//!
//! The score encoding (see `codec::score_to_bytes`) makes tree order equal
//! `(score, member)` order, so every range query is a prefix scan. Members
//! are unique: re-adding one moves its score index entry instead of
//! duplicating it.
//!
//! Lexicographic ranges scan the member keyspace instead, which orders by
//! raw member bytes; that is only meaningful when the callers keep all
//! members on one score, as with redis.

use crate::codec::{self, DataType};
use crate::error::{CmdResult, CommandError};
use crate::expire;
use crate::protocol::Reply;
use crate::store::Store;

/// Integral scores print without a decimal point, so `zadd k 3 m` reads
/// back as `3` rather than `3.0`.
pub fn fmt_score(score: f64) -> String {
    if score.is_finite() && score == score.trunc() && score.abs() < 9.0e15 {
        format!("{}", score as i64)
    } else {
        format!("{}", score)
    }
}

/// Parse a score argument, e.g. for ZADD / ZINCRBY.
pub fn parse_score(s: &str) -> CmdResult<f64> {
    match s.parse::<f64>() {
        Ok(v) if !v.is_nan() => Ok(v),
        _ => Err(CommandError::NotAFloat),
    }
}

/// Parse a score range bound: `-inf`, `+inf`, `(x` (exclusive) or `x`.
pub fn parse_score_bound(s: &str) -> CmdResult<(f64, bool)> {
    let (body, exclusive) = match s.strip_prefix('(') {
        Some(rest) => (rest, true),
        None => (s, false),
    };
    let value = match body {
        "-inf" | "-INF" => f64::NEG_INFINITY,
        "+inf" | "inf" | "+INF" | "INF" => f64::INFINITY,
        other => other.parse::<f64>().map_err(|_| CommandError::NotAFloat)?,
    };
    Ok((value, exclusive))
}

/// A lexicographic range bound: `[x` inclusive, `(x` exclusive, `-`/`+`
/// for the open ends. Anything else is a RangeError.
#[derive(Debug, Clone, PartialEq)]
pub enum LexBound {
    Min,
    Max,
    Inclusive(Vec<u8>),
    Exclusive(Vec<u8>),
}

pub fn parse_lex_bound(s: &str) -> CmdResult<LexBound> {
    if s == "-" {
        return Ok(LexBound::Min);
    }
    if s == "+" {
        return Ok(LexBound::Max);
    }
    match s.as_bytes().first() {
        Some(b'[') => Ok(LexBound::Inclusive(s.as_bytes()[1..].to_vec())),
        Some(b'(') => Ok(LexBound::Exclusive(s.as_bytes()[1..].to_vec())),
        _ => Err(CommandError::BadLexRange),
    }
}

impl LexBound {
    fn admits_from_below(&self, member: &[u8]) -> bool {
        match self {
            LexBound::Min => true,
            LexBound::Max => false,
            LexBound::Inclusive(b) => member >= b.as_slice(),
            LexBound::Exclusive(b) => member > b.as_slice(),
        }
    }

    fn admits_from_above(&self, member: &[u8]) -> bool {
        match self {
            LexBound::Max => true,
            LexBound::Min => false,
            LexBound::Inclusive(b) => member <= b.as_slice(),
            LexBound::Exclusive(b) => member < b.as_slice(),
        }
    }
}

fn decode_bits(iv: &[u8]) -> f64 {
    let mut b = [0u8; 8];
    b.copy_from_slice(&iv[..8]);
    f64::from_bits(u64::from_be_bytes(b))
}

/// All `(score, member)` rows in `(score, member)` order.
fn collect_ordered(tree: &sled::Tree) -> CmdResult<Vec<(f64, Vec<u8>)>> {
    let mut out = Vec::new();
    for item in tree.scan_prefix(codec::ZSET_SCORE_PREFIX) {
        let (k, _) = item?;
        let (score, member) = codec::zset_decode_score_key(&k);
        out.push((score, member.to_vec()));
    }
    Ok(out)
}

/// Pagination shared by the score and lex range queries; a negative
/// count means "to the end".
fn paginate<T>(rows: Vec<T>, limit: Option<(i64, i64)>) -> Vec<T> {
    match limit {
        None => rows,
        Some((offset, count)) => {
            let skip = offset.max(0) as usize;
            let it = rows.into_iter().skip(skip);
            if count < 0 {
                it.collect()
            } else {
                it.take(count as usize).collect()
            }
        }
    }
}

fn rows_to_reply(rows: Vec<(f64, Vec<u8>)>, withscores: bool) -> Reply {
    let mut out = Vec::with_capacity(rows.len() * if withscores { 2 } else { 1 });
    for (score, member) in rows {
        out.push(Reply::Bulk(member));
        if withscores {
            out.push(Reply::bulk(fmt_score(score)));
        }
    }
    Reply::Array(out)
}

/// ZADD: counts members newly inserted; updating an existing member's
/// score does not count.
pub fn zadd(store: &Store, key: &str, pairs: &[(f64, String)]) -> CmdResult<Reply> {
    expire::remove_if_expired(store, DataType::ZSet, key)?;
    let tree = store.data_tree(DataType::ZSet, key)?;
    let mut added = 0;
    for (score, member) in pairs {
        let mk = codec::zset_member_key(member);
        match tree.get(&mk)? {
            Some(old) => {
                let old_score = decode_bits(&old);
                if old_score != *score {
                    tree.remove(codec::zset_score_key(old_score, member))?;
                    tree.insert(codec::zset_score_key(*score, member), &[])?;
                    tree.insert(mk, &score.to_bits().to_be_bytes())?;
                }
            }
            None => {
                tree.insert(mk, &score.to_bits().to_be_bytes())?;
                tree.insert(codec::zset_score_key(*score, member), &[])?;
                added += 1;
            }
        }
    }
    Ok(Reply::Integer(added))
}

/// ZCARD
pub fn zcard(store: &Store, key: &str) -> CmdResult<Reply> {
    expire::remove_if_expired(store, DataType::ZSet, key)?;
    let tree = store.data_tree(DataType::ZSet, key)?;
    let n = tree.scan_prefix(codec::ZSET_MEMBER_PREFIX).count();
    Ok(Reply::Integer(n as i64))
}

/// ZSCORE: nil for a missing member.
pub fn zscore(store: &Store, key: &str, member: &str) -> CmdResult<Reply> {
    expire::remove_if_expired(store, DataType::ZSet, key)?;
    let tree = store.data_tree(DataType::ZSet, key)?;
    match tree.get(codec::zset_member_key(member))? {
        Some(iv) => Ok(Reply::bulk(fmt_score(decode_bits(&iv)))),
        None => Ok(Reply::Nil),
    }
}

/// ZINCRBY: add `delta` to the member's score, creating it at `delta`
/// when absent. Returns the resulting score.
pub fn zincrby(store: &Store, key: &str, delta: f64, member: &str) -> CmdResult<Reply> {
    expire::remove_if_expired(store, DataType::ZSet, key)?;
    let tree = store.data_tree(DataType::ZSet, key)?;
    let mk = codec::zset_member_key(member);
    let new = match tree.get(&mk)? {
        Some(iv) => {
            let old = decode_bits(&iv);
            tree.remove(codec::zset_score_key(old, member))?;
            old + delta
        }
        None => delta,
    };
    tree.insert(mk, &new.to_bits().to_be_bytes())?;
    tree.insert(codec::zset_score_key(new, member), &[])?;
    Ok(Reply::bulk(fmt_score(new)))
}

/// ZREM: count actually removed; draining the set destroys the entity.
pub fn zrem(store: &Store, key: &str, members: &[String]) -> CmdResult<Reply> {
    expire::remove_if_expired(store, DataType::ZSet, key)?;
    let tree = store.data_tree(DataType::ZSet, key)?;
    let mut removed = 0;
    for member in members {
        if let Some(iv) = tree.remove(codec::zset_member_key(member))? {
            tree.remove(codec::zset_score_key(decode_bits(&iv), member))?;
            removed += 1;
        }
    }
    if removed > 0 && !store.exists(DataType::ZSet, key)? {
        expire::purge(store, DataType::ZSet, key)?;
    }
    Ok(Reply::Integer(removed))
}

/// ZRANGE / ZREVRANGE: rank-indexed, inclusive bounds, negative ranks
/// from the far end.
pub fn zrange(
    store: &Store,
    key: &str,
    start: i64,
    stop: i64,
    withscores: bool,
    rev: bool,
) -> CmdResult<Reply> {
    expire::remove_if_expired(store, DataType::ZSet, key)?;
    let tree = store.data_tree(DataType::ZSet, key)?;
    let mut rows = collect_ordered(&tree)?;
    if rev {
        rows.reverse();
    }
    let total = rows.len() as i64;
    let s = (if start < 0 { total + start } else { start }).max(0);
    let e = (if stop < 0 { total + stop } else { stop }).min(total - 1);
    if s > e || s >= total {
        return Ok(Reply::Array(Vec::new()));
    }
    let slice = rows[s as usize..=e as usize].to_vec();
    Ok(rows_to_reply(slice, withscores))
}

fn score_matches(score: f64, min: (f64, bool), max: (f64, bool)) -> bool {
    let above_min = if min.1 { score > min.0 } else { score >= min.0 };
    let below_max = if max.1 { score < max.0 } else { score <= max.0 };
    above_min && below_max
}

/// ZRANGEBYSCORE / ZREVRANGEBYSCORE: score-bounded scan with optional
/// pagination. Inverted bounds simply match nothing.
pub fn zrange_by_score(
    store: &Store,
    key: &str,
    min: (f64, bool),
    max: (f64, bool),
    withscores: bool,
    limit: Option<(i64, i64)>,
    rev: bool,
) -> CmdResult<Reply> {
    expire::remove_if_expired(store, DataType::ZSet, key)?;
    let tree = store.data_tree(DataType::ZSet, key)?;
    let mut rows: Vec<(f64, Vec<u8>)> = collect_ordered(&tree)?
        .into_iter()
        .filter(|(score, _)| score_matches(*score, min, max))
        .collect();
    if rev {
        rows.reverse();
    }
    Ok(rows_to_reply(paginate(rows, limit), withscores))
}

/// ZCOUNT
pub fn zcount(store: &Store, key: &str, min: (f64, bool), max: (f64, bool)) -> CmdResult<Reply> {
    expire::remove_if_expired(store, DataType::ZSet, key)?;
    let tree = store.data_tree(DataType::ZSet, key)?;
    let n = collect_ordered(&tree)?
        .into_iter()
        .filter(|(score, _)| score_matches(*score, min, max))
        .count();
    Ok(Reply::Integer(n as i64))
}

/// Members admitted by a lex range, in member-byte order.
fn lex_matches(tree: &sled::Tree, min: &LexBound, max: &LexBound) -> CmdResult<Vec<Vec<u8>>> {
    let mut out = Vec::new();
    for item in tree.scan_prefix(codec::ZSET_MEMBER_PREFIX) {
        let (k, _) = item?;
        let member = codec::zset_member_from_key(&k);
        if min.admits_from_below(member) && max.admits_from_above(member) {
            out.push(member.to_vec());
        }
    }
    Ok(out)
}

/// ZRANGEBYLEX / ZREVRANGEBYLEX
pub fn zrange_by_lex(
    store: &Store,
    key: &str,
    min: &LexBound,
    max: &LexBound,
    limit: Option<(i64, i64)>,
    rev: bool,
) -> CmdResult<Reply> {
    expire::remove_if_expired(store, DataType::ZSet, key)?;
    let tree = store.data_tree(DataType::ZSet, key)?;
    let mut rows = lex_matches(&tree, min, max)?;
    if rev {
        rows.reverse();
    }
    Ok(Reply::Array(
        paginate(rows, limit).into_iter().map(Reply::Bulk).collect(),
    ))
}

/// ZLEXCOUNT
pub fn zlexcount(store: &Store, key: &str, min: &LexBound, max: &LexBound) -> CmdResult<Reply> {
    expire::remove_if_expired(store, DataType::ZSet, key)?;
    let tree = store.data_tree(DataType::ZSet, key)?;
    Ok(Reply::Integer(lex_matches(&tree, min, max)?.len() as i64))
}

/// ZREMRANGEBYSCORE: bulk removal, returns the count removed.
pub fn zremrange_by_score(
    store: &Store,
    key: &str,
    min: (f64, bool),
    max: (f64, bool),
) -> CmdResult<Reply> {
    expire::remove_if_expired(store, DataType::ZSet, key)?;
    let tree = store.data_tree(DataType::ZSet, key)?;
    let doomed: Vec<(f64, Vec<u8>)> = collect_ordered(&tree)?
        .into_iter()
        .filter(|(score, _)| score_matches(*score, min, max))
        .collect();
    let mut removed = 0;
    for (score, member) in doomed {
        let m = String::from_utf8_lossy(&member).into_owned();
        tree.remove(codec::zset_score_key(score, &m))?;
        tree.remove(codec::zset_member_key(&m))?;
        removed += 1;
    }
    if removed > 0 && !store.exists(DataType::ZSet, key)? {
        expire::purge(store, DataType::ZSet, key)?;
    }
    Ok(Reply::Integer(removed))
}

/// ZREMRANGEBYLEX
pub fn zremrange_by_lex(
    store: &Store,
    key: &str,
    min: &LexBound,
    max: &LexBound,
) -> CmdResult<Reply> {
    expire::remove_if_expired(store, DataType::ZSet, key)?;
    let tree = store.data_tree(DataType::ZSet, key)?;
    let doomed = lex_matches(&tree, min, max)?;
    let mut removed = 0;
    for member in doomed {
        let m = String::from_utf8_lossy(&member).into_owned();
        if let Some(iv) = tree.remove(codec::zset_member_key(&m))? {
            tree.remove(codec::zset_score_key(decode_bits(&iv), &m))?;
            removed += 1;
        }
    }
    if removed > 0 && !store.exists(DataType::ZSet, key)? {
        expire::purge(store, DataType::ZSet, key)?;
    }
    Ok(Reply::Integer(removed))
}

/// ZCLEAR: whole-entity delete, 1 when something was there.
pub fn zclear(store: &Store, key: &str) -> CmdResult<Reply> {
    expire::remove_if_expired(store, DataType::ZSet, key)?;
    let existed = store.exists(DataType::ZSet, key)?;
    expire::purge(store, DataType::ZSet, key)?;
    Ok(Reply::Integer(if existed { 1 } else { 0 }))
}
