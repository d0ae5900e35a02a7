// src/types/set.rs

//! # Set Type Support
//!
//! Redis-like sets on top of `sled`. Each set is one tree named
//! `"set:<name>"`; members are the tree's keys with empty values, so
//! insertion, removal and membership checks are single tree operations.
//!
//! The algebra commands (`SDIFF`/`SUNION`/`SINTER`) never mutate their
//! inputs; the `*STORE` forms fully overwrite the destination entity,
//! deadline included.

use std::collections::BTreeSet;

use crate::codec::DataType;
use crate::error::CmdResult;
use crate::expire;
use crate::protocol::Reply;
use crate::store::Store;

/// SADD: returns how many members were newly added.
pub fn sadd(store: &Store, key: &str, members: &[String]) -> CmdResult<Reply> {
    expire::remove_if_expired(store, DataType::Set, key)?;
    let tree = store.data_tree(DataType::Set, key)?;
    let mut added = 0;
    for m in members {
        if tree.insert(m.as_bytes(), &[])?.is_none() {
            added += 1;
        }
    }
    Ok(Reply::Integer(added))
}

/// SCARD
pub fn scard(store: &Store, key: &str) -> CmdResult<Reply> {
    expire::remove_if_expired(store, DataType::Set, key)?;
    let tree = store.data_tree(DataType::Set, key)?;
    Ok(Reply::Integer(tree.len() as i64))
}

/// SISMEMBER
pub fn sismember(store: &Store, key: &str, member: &str) -> CmdResult<Reply> {
    expire::remove_if_expired(store, DataType::Set, key)?;
    let tree = store.data_tree(DataType::Set, key)?;
    let found = tree.contains_key(member.as_bytes())?;
    Ok(Reply::Integer(if found { 1 } else { 0 }))
}

/// SMEMBERS: all members; the order is not part of the contract.
pub fn smembers(store: &Store, key: &str) -> CmdResult<Reply> {
    expire::remove_if_expired(store, DataType::Set, key)?;
    let tree = store.data_tree(DataType::Set, key)?;
    let mut out = Vec::new();
    for item in tree.iter() {
        let (k, _) = item?;
        out.push(Reply::Bulk(k.to_vec()));
    }
    Ok(Reply::Array(out))
}

/// SREM: returns how many members were actually removed. Removing the
/// last member destroys the entity.
pub fn srem(store: &Store, key: &str, members: &[String]) -> CmdResult<Reply> {
    expire::remove_if_expired(store, DataType::Set, key)?;
    let tree = store.data_tree(DataType::Set, key)?;
    let mut removed = 0;
    for m in members {
        if tree.remove(m.as_bytes())?.is_some() {
            removed += 1;
        }
    }
    if removed > 0 && tree.is_empty() {
        expire::purge(store, DataType::Set, key)?;
    }
    Ok(Reply::Integer(removed))
}

/// Load one set's members after the liveness check.
fn load(store: &Store, key: &str) -> CmdResult<BTreeSet<Vec<u8>>> {
    expire::remove_if_expired(store, DataType::Set, key)?;
    let tree = store.data_tree(DataType::Set, key)?;
    let mut set = BTreeSet::new();
    for item in tree.iter() {
        let (k, _) = item?;
        set.insert(k.to_vec());
    }
    Ok(set)
}

#[derive(Clone, Copy)]
pub enum SetOp {
    Diff,
    Union,
    Inter,
}

/// Evaluate a set operator over `keys` without touching any of them.
fn evaluate(store: &Store, op: SetOp, keys: &[String]) -> CmdResult<BTreeSet<Vec<u8>>> {
    let mut acc = load(store, &keys[0])?;
    for key in &keys[1..] {
        let other = load(store, key)?;
        acc = match op {
            SetOp::Diff => acc.difference(&other).cloned().collect(),
            SetOp::Union => acc.union(&other).cloned().collect(),
            SetOp::Inter => acc.intersection(&other).cloned().collect(),
        };
    }
    Ok(acc)
}

/// SDIFF / SUNION / SINTER: computed member set as an array.
pub fn algebra(store: &Store, op: SetOp, keys: &[String]) -> CmdResult<Reply> {
    let members = evaluate(store, op, keys)?;
    Ok(Reply::Array(members.into_iter().map(Reply::Bulk).collect()))
}

/// SDIFFSTORE / SUNIONSTORE / SINTERSTORE: materialize the result into
/// `dest`, overwriting whatever entity (and deadline) was there. Returns
/// the resulting cardinality.
pub fn algebra_store(store: &Store, op: SetOp, dest: &str, keys: &[String]) -> CmdResult<Reply> {
    let members = evaluate(store, op, keys)?;
    expire::purge(store, DataType::Set, dest)?;
    let tree = store.data_tree(DataType::Set, dest)?;
    let n = members.len();
    for m in members {
        tree.insert(m, &[])?;
    }
    Ok(Reply::Integer(n as i64))
}

/// SCLEAR: whole-entity delete, 1 when something was there.
pub fn sclear(store: &Store, key: &str) -> CmdResult<Reply> {
    expire::remove_if_expired(store, DataType::Set, key)?;
    let existed = store.exists(DataType::Set, key)?;
    expire::purge(store, DataType::Set, key)?;
    Ok(Reply::Integer(if existed { 1 } else { 0 }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;

    fn make_store() -> Store {
        Store::temporary().expect("failed to open temporary store")
    }

    fn members(reply: Reply) -> Vec<String> {
        match reply {
            Reply::Array(items) => items
                .into_iter()
                .map(|r| match r {
                    Reply::Bulk(b) => String::from_utf8(b).unwrap(),
                    other => panic!("unexpected reply {:?}", other),
                })
                .collect(),
            other => panic!("unexpected reply {:?}", other),
        }
    }

    fn strs(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_set_basic() -> Result<()> {
        let store = make_store();

        assert_eq!(sadd(&store, "S", &strs(&["a"]))?, Reply::Integer(1));
        // already present
        assert_eq!(sadd(&store, "S", &strs(&["a"]))?, Reply::Integer(0));
        assert_eq!(sadd(&store, "S", &strs(&["b", "c", "a"]))?, Reply::Integer(2));
        assert_eq!(scard(&store, "S")?, Reply::Integer(3));

        assert_eq!(sismember(&store, "S", "a")?, Reply::Integer(1));
        assert_eq!(sismember(&store, "S", "x")?, Reply::Integer(0));

        let mut all = members(smembers(&store, "S")?);
        all.sort();
        assert_eq!(all, vec!["a", "b", "c"]);

        assert_eq!(srem(&store, "S", &strs(&["a", "x"]))?, Reply::Integer(1));
        assert_eq!(sismember(&store, "S", "a")?, Reply::Integer(0));
        Ok(())
    }

    #[test]
    fn test_algebra() -> Result<()> {
        let store = make_store();
        sadd(&store, "A", &strs(&["a", "b", "c", "d"]))?;
        sadd(&store, "B", &strs(&["c", "d", "e"]))?;

        assert_eq!(
            members(algebra(&store, SetOp::Diff, &strs(&["A", "B"]))?),
            vec!["a", "b"]
        );
        assert_eq!(
            members(algebra(&store, SetOp::Inter, &strs(&["A", "B"]))?),
            vec!["c", "d"]
        );
        assert_eq!(
            members(algebra(&store, SetOp::Union, &strs(&["A", "B"]))?),
            vec!["a", "b", "c", "d", "e"]
        );

        // Inputs untouched
        assert_eq!(scard(&store, "A")?, Reply::Integer(4));
        assert_eq!(scard(&store, "B")?, Reply::Integer(3));
        Ok(())
    }

    #[test]
    fn test_algebra_with_missing_key() -> Result<()> {
        let store = make_store();
        sadd(&store, "A", &strs(&["a", "b"]))?;
        assert_eq!(
            members(algebra(&store, SetOp::Diff, &strs(&["A", "missing"]))?),
            vec!["a", "b"]
        );
        assert_eq!(
            members(algebra(&store, SetOp::Inter, &strs(&["A", "missing"]))?),
            Vec::<String>::new()
        );
        Ok(())
    }

    #[test]
    fn test_algebra_store_overwrites_dest() -> Result<()> {
        let store = make_store();
        sadd(&store, "A", &strs(&["a", "b", "c"]))?;
        sadd(&store, "B", &strs(&["b"]))?;
        sadd(&store, "D", &strs(&["stale1", "stale2"]))?;
        assert_eq!(expire::expire_secs(&store, DataType::Set, "D", 100)?, 1);

        assert_eq!(
            algebra_store(&store, SetOp::Diff, "D", &strs(&["A", "B"]))?,
            Reply::Integer(2)
        );
        let mut all = members(smembers(&store, "D")?);
        all.sort();
        assert_eq!(all, vec!["a", "c"]);
        // Old destination deadline does not survive the overwrite
        assert_eq!(expire::pttl(&store, DataType::Set, "D")?, -1);
        Ok(())
    }

    #[test]
    fn test_srem_drain_destroys_entity() -> Result<()> {
        let store = make_store();
        sadd(&store, "S", &strs(&["only"]))?;
        assert_eq!(expire::expire_secs(&store, DataType::Set, "S", 100)?, 1);

        assert_eq!(srem(&store, "S", &strs(&["only"]))?, Reply::Integer(1));
        assert!(!store.exists(DataType::Set, "S")?);
        assert_eq!(expire::pttl(&store, DataType::Set, "S")?, -2);
        Ok(())
    }

    #[test]
    fn test_sclear() -> Result<()> {
        let store = make_store();
        sadd(&store, "S", &strs(&["a", "b"]))?;
        assert_eq!(sclear(&store, "S")?, Reply::Integer(1));
        assert_eq!(scard(&store, "S")?, Reply::Integer(0));
        assert_eq!(sclear(&store, "S")?, Reply::Integer(0));
        Ok(())
    }
}
