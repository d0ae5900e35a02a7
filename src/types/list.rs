// src/types/list.rs

//! # List Type Support
//!
//! Redis-like lists on top of `sled`. Each list is stored as a separate
//! tree named `"list:<name>"`. Elements are keyed by big-endian bytes of
//! an `i64` sequence number with a sign-bit flip (see `codec`), so tree
//! iteration order equals list order and both ends can grow without
//! renumbering.
//!
//! Indices are zero-based from the head; negative indices address from
//! the tail (`-1` = last element). Popping the last element destroys the
//! entity and clears its expiration deadline.

use crate::codec::{self, DataType};
use crate::error::{CmdResult, CommandError};
use crate::expire;
use crate::protocol::Reply;
use crate::store::Store;

/// Current head and tail sequence numbers, or `None` for an empty list.
fn get_bounds(tree: &sled::Tree) -> CmdResult<Option<(i64, i64)>> {
    let first = match tree.first()? {
        Some((k, _)) => codec::key_to_seq(&k),
        None => return Ok(None),
    };
    let last = match tree.last()? {
        Some((k, _)) => codec::key_to_seq(&k),
        None => first,
    };
    Ok(Some((first, last)))
}

/// Normalize a possibly-negative index against `total` elements.
fn normalize(idx: i64, total: i64) -> i64 {
    if idx < 0 { total + idx } else { idx }
}

/// LPUSH: prepend values one by one, returning the new length.
/// Pushing `a`, `b` onto an empty list yields `b, a`.
pub fn lpush(store: &Store, key: &str, values: &[String]) -> CmdResult<Reply> {
    expire::remove_if_expired(store, DataType::List, key)?;
    let tree = store.data_tree(DataType::List, key)?;
    for value in values {
        let seq = match get_bounds(&tree)? {
            Some((head, _)) => head - 1,
            None => 0,
        };
        tree.insert(codec::seq_to_key(seq), value.as_bytes())?;
    }
    Ok(Reply::Integer(tree.len() as i64))
}

/// RPUSH: append values, returning the new length.
pub fn rpush(store: &Store, key: &str, values: &[String]) -> CmdResult<Reply> {
    expire::remove_if_expired(store, DataType::List, key)?;
    let tree = store.data_tree(DataType::List, key)?;
    for value in values {
        let seq = match get_bounds(&tree)? {
            Some((_, tail)) => tail + 1,
            None => 0,
        };
        tree.insert(codec::seq_to_key(seq), value.as_bytes())?;
    }
    Ok(Reply::Integer(tree.len() as i64))
}

fn pop(store: &Store, key: &str, from_head: bool) -> CmdResult<Reply> {
    expire::remove_if_expired(store, DataType::List, key)?;
    let tree = store.data_tree(DataType::List, key)?;
    let removed = if from_head { tree.pop_min()? } else { tree.pop_max()? };
    match removed {
        Some((_, iv)) => {
            if tree.is_empty() {
                expire::purge(store, DataType::List, key)?;
            }
            Ok(Reply::Bulk(iv.to_vec()))
        }
        None => Ok(Reply::Nil),
    }
}

/// LPOP: pop from the head, nil when empty or missing.
pub fn lpop(store: &Store, key: &str) -> CmdResult<Reply> {
    pop(store, key, true)
}

/// RPOP: pop from the tail, nil when empty or missing.
pub fn rpop(store: &Store, key: &str) -> CmdResult<Reply> {
    pop(store, key, false)
}

/// LLEN
pub fn llen(store: &Store, key: &str) -> CmdResult<Reply> {
    expire::remove_if_expired(store, DataType::List, key)?;
    let tree = store.data_tree(DataType::List, key)?;
    Ok(Reply::Integer(tree.len() as i64))
}

/// LINDEX: nil when the index falls outside the list.
pub fn lindex(store: &Store, key: &str, idx: i64) -> CmdResult<Reply> {
    expire::remove_if_expired(store, DataType::List, key)?;
    let tree = store.data_tree(DataType::List, key)?;
    let (head, tail) = match get_bounds(&tree)? {
        Some(b) => b,
        None => return Ok(Reply::Nil),
    };
    let total = tail - head + 1;
    let i = normalize(idx, total);
    if i < 0 || i >= total {
        return Ok(Reply::Nil);
    }
    match tree.get(codec::seq_to_key(head + i))? {
        Some(iv) => Ok(Reply::Bulk(iv.to_vec())),
        None => Ok(Reply::Nil),
    }
}

/// LRANGE: inclusive `[start, stop]`, negative indices from the tail,
/// clipped to the list bounds; empty when start ends up past stop.
pub fn lrange(store: &Store, key: &str, start: i64, stop: i64) -> CmdResult<Reply> {
    expire::remove_if_expired(store, DataType::List, key)?;
    let tree = store.data_tree(DataType::List, key)?;
    let (head, tail) = match get_bounds(&tree)? {
        Some(b) => b,
        None => return Ok(Reply::Array(Vec::new())),
    };
    let total = tail - head + 1;
    let s = normalize(start, total).max(0);
    let e = normalize(stop, total).min(total - 1);
    if s > e || s >= total {
        return Ok(Reply::Array(Vec::new()));
    }
    let mut out = Vec::with_capacity((e - s + 1) as usize);
    for i in s..=e {
        if let Some(iv) = tree.get(codec::seq_to_key(head + i))? {
            out.push(Reply::Bulk(iv.to_vec()));
        }
    }
    Ok(Reply::Array(out))
}

/// LSET: overwrite the element at `idx`, erroring when out of range.
pub fn lset(store: &Store, key: &str, idx: i64, value: &str) -> CmdResult<Reply> {
    expire::remove_if_expired(store, DataType::List, key)?;
    let tree = store.data_tree(DataType::List, key)?;
    let (head, tail) = get_bounds(&tree)?.ok_or(CommandError::IndexOutOfRange)?;
    let total = tail - head + 1;
    let i = normalize(idx, total);
    if i < 0 || i >= total {
        return Err(CommandError::IndexOutOfRange);
    }
    tree.insert(codec::seq_to_key(head + i), value.as_bytes())?;
    Ok(Reply::ok())
}

/// LTRIM: keep only the inclusive `[start, stop]` sub-range. Trimming
/// everything away destroys the entity.
pub fn ltrim(store: &Store, key: &str, start: i64, stop: i64) -> CmdResult<Reply> {
    expire::remove_if_expired(store, DataType::List, key)?;
    let tree = store.data_tree(DataType::List, key)?;
    let (head, tail) = match get_bounds(&tree)? {
        Some(b) => b,
        None => return Ok(Reply::ok()),
    };
    let total = tail - head + 1;
    let s = normalize(start, total).max(0);
    let e = normalize(stop, total).min(total - 1);
    if s > e || s >= total {
        expire::purge(store, DataType::List, key)?;
        return Ok(Reply::ok());
    }
    for i in 0..s {
        tree.remove(codec::seq_to_key(head + i))?;
    }
    for i in (e + 1)..total {
        tree.remove(codec::seq_to_key(head + i))?;
    }
    Ok(Reply::ok())
}

/// LDEL: whole-entity delete, 1 when something was there.
pub fn ldel(store: &Store, key: &str) -> CmdResult<Reply> {
    expire::remove_if_expired(store, DataType::List, key)?;
    let existed = store.exists(DataType::List, key)?;
    expire::purge(store, DataType::List, key)?;
    Ok(Reply::Integer(if existed { 1 } else { 0 }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;

    fn make_store() -> Store {
        Store::temporary().expect("failed to open temporary store")
    }

    fn one(v: &str) -> Vec<String> {
        vec![v.to_string()]
    }

    fn bulks(items: &[&str]) -> Reply {
        Reply::Array(items.iter().map(|s| Reply::bulk(*s)).collect())
    }

    #[test]
    fn test_list_basic() -> Result<()> {
        let store = make_store();

        assert_eq!(lpush(&store, "L", &one("a"))?, Reply::Integer(1));
        assert_eq!(lpush(&store, "L", &one("b"))?, Reply::Integer(2)); // b, a
        assert_eq!(rpush(&store, "L", &one("c"))?, Reply::Integer(3)); // b, a, c

        assert_eq!(lrange(&store, "L", 0, 2)?, bulks(&["b", "a", "c"]));
        assert_eq!(lrange(&store, "L", 1, 1)?, bulks(&["a"]));

        assert_eq!(lpop(&store, "L")?, Reply::bulk("b"));
        assert_eq!(rpop(&store, "L")?, Reply::bulk("c"));
        assert_eq!(lrange(&store, "L", 0, -1)?, bulks(&["a"]));

        // Exhaust and empty pops
        assert_eq!(lpop(&store, "L")?, Reply::bulk("a"));
        assert_eq!(lpop(&store, "L")?, Reply::Nil);
        assert_eq!(rpop(&store, "L")?, Reply::Nil);
        Ok(())
    }

    #[test]
    fn test_fifo_round_trip() -> Result<()> {
        let store = make_store();
        for i in 0..200 {
            rpush(&store, "L", &one(&i.to_string()))?;
        }
        for i in 0..200 {
            assert_eq!(lpop(&store, "L")?, Reply::bulk(i.to_string()));
        }
        assert_eq!(llen(&store, "L")?, Reply::Integer(0));
        Ok(())
    }

    #[test]
    fn test_lifo_round_trip() -> Result<()> {
        let store = make_store();
        for i in 0..50 {
            lpush(&store, "L", &one(&i.to_string()))?;
        }
        for i in 0..50 {
            assert_eq!(rpop(&store, "L")?, Reply::bulk(i.to_string()));
        }
        Ok(())
    }

    #[test]
    fn test_lindex() -> Result<()> {
        let store = make_store();
        rpush(
            &store,
            "L",
            &["a".to_string(), "b".to_string(), "c".to_string()],
        )?;
        assert_eq!(lindex(&store, "L", 0)?, Reply::bulk("a"));
        assert_eq!(lindex(&store, "L", 2)?, Reply::bulk("c"));
        assert_eq!(lindex(&store, "L", -1)?, Reply::bulk("c"));
        assert_eq!(lindex(&store, "L", -3)?, Reply::bulk("a"));
        assert_eq!(lindex(&store, "L", 3)?, Reply::Nil);
        assert_eq!(lindex(&store, "L", -4)?, Reply::Nil);
        Ok(())
    }

    #[test]
    fn test_lrange_clipping() -> Result<()> {
        let store = make_store();
        for i in 0..5 {
            rpush(&store, "L", &one(&i.to_string()))?;
        }
        assert_eq!(lrange(&store, "L", 1, 100)?, bulks(&["1", "2", "3", "4"]));
        assert_eq!(lrange(&store, "L", -2, -1)?, bulks(&["3", "4"]));
        // start beyond the end, and inverted range
        assert_eq!(lrange(&store, "L", 9, 12)?, Reply::Array(vec![]));
        assert_eq!(lrange(&store, "L", 3, 1)?, Reply::Array(vec![]));
        Ok(())
    }

    #[test]
    fn test_lset() -> Result<()> {
        let store = make_store();
        for i in 0..5 {
            rpush(&store, "L", &one(&i.to_string()))?;
        }
        assert_eq!(lset(&store, "L", 2, "hello")?, Reply::ok());
        assert_eq!(lindex(&store, "L", 2)?, Reply::bulk("hello"));
        assert_eq!(lset(&store, "L", -1, "tail")?, Reply::ok());
        assert_eq!(lindex(&store, "L", 4)?, Reply::bulk("tail"));

        assert_eq!(
            lset(&store, "L", 5, "x").unwrap_err(),
            CommandError::IndexOutOfRange
        );
        assert_eq!(
            lset(&store, "missing", 0, "x").unwrap_err(),
            CommandError::IndexOutOfRange
        );
        Ok(())
    }

    #[test]
    fn test_ltrim() -> Result<()> {
        let store = make_store();
        for i in 0..10 {
            rpush(&store, "L", &one(&i.to_string()))?;
        }
        assert_eq!(ltrim(&store, "L", 2, 5)?, Reply::ok());
        assert_eq!(lrange(&store, "L", 0, -1)?, bulks(&["2", "3", "4", "5"]));
        assert_eq!(llen(&store, "L")?, Reply::Integer(4));

        // Trimming to an empty range destroys the list
        assert_eq!(ltrim(&store, "L", 3, 1)?, Reply::ok());
        assert!(!store.exists(DataType::List, "L")?);
        Ok(())
    }

    #[test]
    fn test_drain_clears_ttl() -> Result<()> {
        let store = make_store();
        rpush(&store, "L", &one("only"))?;
        assert_eq!(expire::expire_secs(&store, DataType::List, "L", 100)?, 1);

        assert_eq!(lpop(&store, "L")?, Reply::bulk("only"));
        assert_eq!(expire::pttl(&store, DataType::List, "L")?, -2);
        Ok(())
    }

    #[test]
    fn test_ldel() -> Result<()> {
        let store = make_store();
        rpush(&store, "L", &one("a"))?;
        assert_eq!(ldel(&store, "L")?, Reply::Integer(1));
        assert_eq!(ldel(&store, "L")?, Reply::Integer(0));
        assert_eq!(llen(&store, "L")?, Reply::Integer(0));
        Ok(())
    }
}
