// src/engine/mod.rs

//! # 命令引擎
//!
//! 引擎是整个服务的核心入口。它：
//! - 从网络层接收已解析和分词的命令（`Vec<String>`，命令名大小写不敏感）。
//! - 处理事务命令（MULTI / EXEC / DISCARD）和 QUEUING 状态下的入队。
//! - 按命令选择锁域：单键命令拿共享屏障 + 键锁，多键命令和 EXEC 拿
//!   独占屏障，保证任何命令都观察不到别的命令的中间状态。
//! - 把业务委托给类型子模块（string / hash / list / set / zset）和
//!   expire 模块，返回类型化的 `Reply`，网络层原样编码。

use crate::codec::DataType;
use crate::error::{CmdResult, CommandError};
use crate::expire;
use crate::protocol::Reply;
use crate::store::Store;
use crate::txn::TxnSession;
use crate::txn::executor::exec_all;
use crate::types::set::SetOp;
use crate::types::string::SetOptions;
use crate::types::zset::{parse_lex_bound, parse_score, parse_score_bound};
use crate::types::{hash, list, set, string, zset};

/// 对指定 store 执行单个客户端命令
///
/// # 参数
///
/// * `parts` - 命令名及参数
/// * `store` - 注入的存储实例
/// * `session` - 本连接的事务会话状态
pub fn execute(parts: Vec<String>, store: &Store, session: &mut TxnSession) -> Reply {
    if parts.is_empty() {
        return Reply::Error("ERR empty command".to_string());
    }
    let cmd = parts[0].to_uppercase();

    // 事务命令在锁之外处理：EXEC 自己拿独占屏障
    match cmd.as_str() {
        "MULTI" => match session.begin() {
            Ok(()) => Reply::ok(),
            Err(e) => Reply::Error(e.reply_message()),
        },
        "EXEC" => match session.take_queue() {
            Ok(queue) => {
                if queue.is_empty() {
                    return Reply::Nil;
                }
                // 独占屏障下整批回放，别的会话插不进来
                let _barrier = store.exclusive();
                Reply::Array(exec_all(store, &queue))
            }
            Err(e) => Reply::Error(e.reply_message()),
        },
        "DISCARD" => match session.discard() {
            Ok(()) => Reply::ok(),
            Err(e) => Reply::Error(e.reply_message()),
        },
        _ => {
            if session.in_multi {
                // 事务模式下只入队，回 QUEUED 占位
                session.enqueue(parts);
                Reply::Simple("QUEUED".to_string())
            } else {
                run_locked(&cmd, &parts, store)
            }
        }
    }
}

/// 事务回放用的直通入口：不加锁（EXEC 分支已持独占屏障），
/// 和即时路径共用 dispatch，语义完全一致。
pub(crate) fn dispatch_parts(parts: &[String], store: &Store) -> Reply {
    if parts.is_empty() {
        return Reply::Error("ERR empty command".to_string());
    }
    let cmd = parts[0].to_uppercase();
    match dispatch(&cmd, parts, store) {
        Ok(reply) => reply,
        Err(e) => Reply::Error(e.reply_message()),
    }
}

/// 命令的锁域
enum Scope {
    /// 单键：共享屏障 + (类型, parts[1]) 键锁
    Key(DataType),
    /// 多键：独占屏障
    Global,
    /// 不碰键空间
    None,
}

fn lock_scope(cmd: &str) -> Scope {
    match cmd {
        "MGET" | "MSET" | "DEL" | "DELETE" | "SDIFF" | "SUNION" | "SINTER" | "SDIFFSTORE"
        | "SUNIONSTORE" | "SINTERSTORE" => Scope::Global,
        "PING" | "QUIT" => Scope::None,
        // S 开头既有 set 命令又有 string 命令，set 族列举
        "SADD" | "SCARD" | "SISMEMBER" | "SMEMBERS" | "SREM" | "SCLEAR" | "SEXPIRE"
        | "SPEXPIRE" | "SEXPIREAT" | "SPEXPIREAT" | "STTL" | "SPTTL" | "SPERSIST" => {
            Scope::Key(DataType::Set)
        }
        c if c.starts_with('H') => Scope::Key(DataType::Hash),
        c if c.starts_with('L') => Scope::Key(DataType::List),
        c if c.starts_with('Z') => Scope::Key(DataType::ZSet),
        _ => Scope::Key(DataType::String),
    }
}

fn run_locked(cmd: &str, parts: &[String], store: &Store) -> Reply {
    let result = match lock_scope(cmd) {
        Scope::Key(ty) if parts.len() >= 2 => {
            let lock = store.key_lock(ty, &parts[1]);
            let _barrier = store.shared();
            let _guard = lock.lock().unwrap_or_else(|e| e.into_inner());
            dispatch(cmd, parts, store)
        }
        Scope::Global => {
            let _barrier = store.exclusive();
            dispatch(cmd, parts, store)
        }
        _ => dispatch(cmd, parts, store),
    };
    match result {
        Ok(reply) => reply,
        Err(e) => Reply::Error(e.reply_message()),
    }
}

fn arity(cmd: &str) -> CommandError {
    CommandError::WrongArity(cmd.to_string())
}

fn int_arg(s: &str) -> CmdResult<i64> {
    s.parse::<i64>().map_err(|_| CommandError::NotAnInteger)
}

/// ZRANGEBYSCORE 族的尾参数：WITHSCORES / LIMIT offset count
fn parse_range_tail(args: &[String]) -> CmdResult<(bool, Option<(i64, i64)>)> {
    let mut withscores = false;
    let mut limit = None;
    let mut i = 0;
    while i < args.len() {
        match args[i].to_uppercase().as_str() {
            "WITHSCORES" => withscores = true,
            "LIMIT" => {
                if i + 2 >= args.len() {
                    return Err(CommandError::Syntax);
                }
                limit = Some((int_arg(&args[i + 1])?, int_arg(&args[i + 2])?));
                i += 2;
            }
            _ => return Err(CommandError::Syntax),
        }
        i += 1;
    }
    Ok((withscores, limit))
}

/// ZRANGEBYLEX 族的尾参数：只认 LIMIT
fn parse_lex_tail(args: &[String]) -> CmdResult<Option<(i64, i64)>> {
    let (withscores, limit) = parse_range_tail(args)?;
    if withscores {
        return Err(CommandError::Syntax);
    }
    Ok(limit)
}

/// 各类型共用的过期命令族。verb 是去掉类型前缀后的动词。
fn ttl_family(
    verb: &str,
    ty: DataType,
    cmd: &str,
    parts: &[String],
    store: &Store,
) -> CmdResult<Reply> {
    match verb {
        "EXPIRE" | "PEXPIRE" | "EXPIREAT" | "PEXPIREAT" => {
            if parts.len() != 3 {
                return Err(arity(cmd));
            }
            let n = int_arg(&parts[2])?;
            let r = match verb {
                "EXPIRE" => expire::expire_secs(store, ty, &parts[1], n)?,
                "PEXPIRE" => expire::expire_ms(store, ty, &parts[1], n)?,
                "EXPIREAT" => expire::expire_at_secs(store, ty, &parts[1], n)?,
                _ => expire::expire_at_ms(store, ty, &parts[1], n)?,
            };
            Ok(Reply::Integer(r))
        }
        "TTL" | "PTTL" => {
            if parts.len() != 2 {
                return Err(arity(cmd));
            }
            let r = if verb == "TTL" {
                expire::ttl(store, ty, &parts[1])?
            } else {
                expire::pttl(store, ty, &parts[1])?
            };
            Ok(Reply::Integer(r))
        }
        "PERSIST" => {
            if parts.len() != 2 {
                return Err(arity(cmd));
            }
            Ok(Reply::Integer(expire::persist(store, ty, &parts[1])?))
        }
        _ => Err(CommandError::UnknownCommand(cmd.to_string())),
    }
}

/// 非事务命令分发（入队回放也走这里）
fn dispatch(cmd: &str, parts: &[String], store: &Store) -> CmdResult<Reply> {
    match cmd {
        // --- String commands ---
        "SET" => {
            if parts.len() < 3 {
                return Err(arity(cmd));
            }
            let opts = SetOptions::parse(&parts[3..])?;
            string::set(store, &parts[1], &parts[2], &opts)
        }
        "GET" => {
            if parts.len() != 2 {
                return Err(arity(cmd));
            }
            string::get(store, &parts[1])
        }
        "DEL" | "DELETE" => {
            if parts.len() < 2 {
                return Err(arity(cmd));
            }
            string::del(store, &parts[1..])
        }
        "MGET" => {
            if parts.len() < 2 {
                return Err(arity(cmd));
            }
            string::mget(store, &parts[1..])
        }
        "MSET" => {
            if parts.len() < 3 || (parts.len() - 1) % 2 != 0 {
                return Err(arity(cmd));
            }
            string::mset(store, &parts[1..])
        }

        // 原子增减操作
        "INCR" => {
            if parts.len() != 2 {
                return Err(arity(cmd));
            }
            string::incr_by(store, &parts[1], 1)
        }
        "INCRBY" => {
            if parts.len() != 3 {
                return Err(arity(cmd));
            }
            string::incr_by(store, &parts[1], int_arg(&parts[2])?)
        }
        "DECR" => {
            if parts.len() != 2 {
                return Err(arity(cmd));
            }
            string::incr_by(store, &parts[1], -1)
        }
        "DECRBY" => {
            if parts.len() != 3 {
                return Err(arity(cmd));
            }
            let delta = int_arg(&parts[2])?
                .checked_neg()
                .ok_or(CommandError::NotAnInteger)?;
            string::incr_by(store, &parts[1], delta)
        }
        "STRLEN" => {
            if parts.len() != 2 {
                return Err(arity(cmd));
            }
            string::strlen(store, &parts[1])
        }
        "SETBIT" => {
            if parts.len() != 4 {
                return Err(arity(cmd));
            }
            let offset = parts[2]
                .parse::<u64>()
                .map_err(|_| CommandError::NotAnInteger)?;
            let bit = match parts[3].as_str() {
                "0" => 0,
                "1" => 1,
                _ => return Err(CommandError::NotAnInteger),
            };
            string::setbit(store, &parts[1], offset, bit)
        }
        "GETBIT" => {
            if parts.len() != 3 {
                return Err(arity(cmd));
            }
            let offset = parts[2]
                .parse::<u64>()
                .map_err(|_| CommandError::NotAnInteger)?;
            string::getbit(store, &parts[1], offset)
        }
        "BITCOUNT" => match parts.len() {
            2 => string::bitcount(store, &parts[1], None),
            4 => string::bitcount(
                store,
                &parts[1],
                Some((int_arg(&parts[2])?, int_arg(&parts[3])?)),
            ),
            _ => Err(arity(cmd)),
        },

        // --- Hash commands ---
        "HSET" => {
            if parts.len() != 4 {
                return Err(arity(cmd));
            }
            hash::hset(store, &parts[1], &parts[2], &parts[3])
        }
        "HMSET" => {
            if parts.len() < 4 || (parts.len() - 2) % 2 != 0 {
                return Err(arity(cmd));
            }
            hash::hmset(store, &parts[1], &parts[2..])
        }
        "HGET" => {
            if parts.len() != 3 {
                return Err(arity(cmd));
            }
            hash::hget(store, &parts[1], &parts[2])
        }
        "HMGET" => {
            if parts.len() < 3 {
                return Err(arity(cmd));
            }
            hash::hmget(store, &parts[1], &parts[2..])
        }
        "HEXISTS" => {
            if parts.len() != 3 {
                return Err(arity(cmd));
            }
            hash::hexists(store, &parts[1], &parts[2])
        }
        "HDEL" => {
            if parts.len() < 3 {
                return Err(arity(cmd));
            }
            hash::hdel(store, &parts[1], &parts[2..])
        }
        "HLEN" => {
            if parts.len() != 2 {
                return Err(arity(cmd));
            }
            hash::hlen(store, &parts[1])
        }
        "HSTRLEN" => {
            if parts.len() != 3 {
                return Err(arity(cmd));
            }
            hash::hstrlen(store, &parts[1], &parts[2])
        }
        "HKEYS" => {
            if parts.len() != 2 {
                return Err(arity(cmd));
            }
            hash::hkeys(store, &parts[1])
        }
        "HVALS" => {
            if parts.len() != 2 {
                return Err(arity(cmd));
            }
            hash::hvals(store, &parts[1])
        }
        "HGETALL" => {
            if parts.len() != 2 {
                return Err(arity(cmd));
            }
            hash::hgetall(store, &parts[1])
        }
        "HCLEAR" => {
            if parts.len() != 2 {
                return Err(arity(cmd));
            }
            hash::hclear(store, &parts[1])
        }

        // --- List commands ---
        "LPUSH" => {
            if parts.len() < 3 { Err(arity(cmd)) } else { list::lpush(store, &parts[1], &parts[2..]) }
        }
        "RPUSH" => {
            if parts.len() < 3 { Err(arity(cmd)) } else { list::rpush(store, &parts[1], &parts[2..]) }
        }
        "LPOP" => {
            if parts.len() != 2 { Err(arity(cmd)) } else { list::lpop(store, &parts[1]) }
        }
        "RPOP" => {
            if parts.len() != 2 { Err(arity(cmd)) } else { list::rpop(store, &parts[1]) }
        }
        "LLEN" => {
            if parts.len() != 2 { Err(arity(cmd)) } else { list::llen(store, &parts[1]) }
        }
        "LINDEX" => {
            if parts.len() != 3 { Err(arity(cmd)) } else { list::lindex(store, &parts[1], int_arg(&parts[2])?) }
        }
        "LRANGE" => {
            if parts.len() != 4 {
                return Err(arity(cmd));
            }
            list::lrange(store, &parts[1], int_arg(&parts[2])?, int_arg(&parts[3])?)
        }
        "LSET" => {
            if parts.len() != 4 {
                return Err(arity(cmd));
            }
            list::lset(store, &parts[1], int_arg(&parts[2])?, &parts[3])
        }
        "LTRIM" => {
            if parts.len() != 4 {
                return Err(arity(cmd));
            }
            list::ltrim(store, &parts[1], int_arg(&parts[2])?, int_arg(&parts[3])?)
        }
        "LDEL" => {
            if parts.len() != 2 { Err(arity(cmd)) } else { list::ldel(store, &parts[1]) }
        }

        // --- Set commands ---
        "SADD" => {
            if parts.len() < 3 { Err(arity(cmd)) } else { set::sadd(store, &parts[1], &parts[2..]) }
        }
        "SCARD" => {
            if parts.len() != 2 { Err(arity(cmd)) } else { set::scard(store, &parts[1]) }
        }
        "SISMEMBER" => {
            if parts.len() != 3 { Err(arity(cmd)) } else { set::sismember(store, &parts[1], &parts[2]) }
        }
        "SMEMBERS" => {
            if parts.len() != 2 { Err(arity(cmd)) } else { set::smembers(store, &parts[1]) }
        }
        "SREM" => {
            if parts.len() < 3 { Err(arity(cmd)) } else { set::srem(store, &parts[1], &parts[2..]) }
        }
        "SDIFF" | "SUNION" | "SINTER" => {
            if parts.len() < 2 {
                return Err(arity(cmd));
            }
            let op = match cmd {
                "SDIFF" => SetOp::Diff,
                "SUNION" => SetOp::Union,
                _ => SetOp::Inter,
            };
            set::algebra(store, op, &parts[1..])
        }
        "SDIFFSTORE" | "SUNIONSTORE" | "SINTERSTORE" => {
            if parts.len() < 3 {
                return Err(arity(cmd));
            }
            let op = match cmd {
                "SDIFFSTORE" => SetOp::Diff,
                "SUNIONSTORE" => SetOp::Union,
                _ => SetOp::Inter,
            };
            set::algebra_store(store, op, &parts[1], &parts[2..])
        }
        "SCLEAR" => {
            if parts.len() != 2 { Err(arity(cmd)) } else { set::sclear(store, &parts[1]) }
        }

        // --- SortedSet commands ---
        "ZADD" => {
            if parts.len() < 4 || (parts.len() - 2) % 2 != 0 {
                return Err(arity(cmd));
            }
            let mut pairs = Vec::with_capacity((parts.len() - 2) / 2);
            for chunk in parts[2..].chunks(2) {
                pairs.push((parse_score(&chunk[0])?, chunk[1].clone()));
            }
            zset::zadd(store, &parts[1], &pairs)
        }
        "ZCARD" => {
            if parts.len() != 2 { Err(arity(cmd)) } else { zset::zcard(store, &parts[1]) }
        }
        "ZSCORE" => {
            if parts.len() != 3 { Err(arity(cmd)) } else { zset::zscore(store, &parts[1], &parts[2]) }
        }
        "ZINCRBY" => {
            if parts.len() != 4 {
                return Err(arity(cmd));
            }
            zset::zincrby(store, &parts[1], parse_score(&parts[2])?, &parts[3])
        }
        "ZREM" => {
            if parts.len() < 3 { Err(arity(cmd)) } else { zset::zrem(store, &parts[1], &parts[2..]) }
        }
        "ZRANGE" | "ZREVRANGE" => {
            let withscores = match parts.len() {
                4 => false,
                5 if parts[4].to_uppercase() == "WITHSCORES" => true,
                5 => return Err(CommandError::Syntax),
                _ => return Err(arity(cmd)),
            };
            zset::zrange(
                store,
                &parts[1],
                int_arg(&parts[2])?,
                int_arg(&parts[3])?,
                withscores,
                cmd == "ZREVRANGE",
            )
        }
        "ZRANGEBYSCORE" | "ZREVRANGEBYSCORE" => {
            if parts.len() < 4 {
                return Err(arity(cmd));
            }
            let rev = cmd == "ZREVRANGEBYSCORE";
            let a = parse_score_bound(&parts[2])?;
            let b = parse_score_bound(&parts[3])?;
            // 逆序形式的参数是 max 在前
            let (min, max) = if rev { (b, a) } else { (a, b) };
            let (withscores, limit) = parse_range_tail(&parts[4..])?;
            zset::zrange_by_score(store, &parts[1], min, max, withscores, limit, rev)
        }
        "ZCOUNT" => {
            if parts.len() != 4 {
                return Err(arity(cmd));
            }
            zset::zcount(
                store,
                &parts[1],
                parse_score_bound(&parts[2])?,
                parse_score_bound(&parts[3])?,
            )
        }
        "ZRANGEBYLEX" | "ZREVRANGEBYLEX" => {
            if parts.len() < 4 {
                return Err(arity(cmd));
            }
            let rev = cmd == "ZREVRANGEBYLEX";
            let a = parse_lex_bound(&parts[2])?;
            let b = parse_lex_bound(&parts[3])?;
            let (min, max) = if rev { (b, a) } else { (a, b) };
            let limit = parse_lex_tail(&parts[4..])?;
            zset::zrange_by_lex(store, &parts[1], &min, &max, limit, rev)
        }
        "ZLEXCOUNT" => {
            if parts.len() != 4 {
                return Err(arity(cmd));
            }
            zset::zlexcount(
                store,
                &parts[1],
                &parse_lex_bound(&parts[2])?,
                &parse_lex_bound(&parts[3])?,
            )
        }
        "ZREMRANGEBYSCORE" => {
            if parts.len() != 4 {
                return Err(arity(cmd));
            }
            zset::zremrange_by_score(
                store,
                &parts[1],
                parse_score_bound(&parts[2])?,
                parse_score_bound(&parts[3])?,
            )
        }
        "ZREMRANGEBYLEX" => {
            if parts.len() != 4 {
                return Err(arity(cmd));
            }
            zset::zremrange_by_lex(
                store,
                &parts[1],
                &parse_lex_bound(&parts[2])?,
                &parse_lex_bound(&parts[3])?,
            )
        }
        "ZCLEAR" => {
            if parts.len() != 2 { Err(arity(cmd)) } else { zset::zclear(store, &parts[1]) }
        }

        // --- Expiration commands ---
        // String 不带前缀，其余类型按首字母前缀
        "EXPIRE" | "PEXPIRE" | "EXPIREAT" | "PEXPIREAT" | "TTL" | "PTTL" | "PERSIST" => {
            ttl_family(cmd, DataType::String, cmd, parts, store)
        }
        "HEXPIRE" | "HPEXPIRE" | "HEXPIREAT" | "HPEXPIREAT" | "HTTL" | "HPTTL" | "HPERSIST" => {
            ttl_family(&cmd[1..], DataType::Hash, cmd, parts, store)
        }
        "LEXPIRE" | "LPEXPIRE" | "LEXPIREAT" | "LPEXPIREAT" | "LTTL" | "LPTTL" | "LPERSIST" => {
            ttl_family(&cmd[1..], DataType::List, cmd, parts, store)
        }
        "SEXPIRE" | "SPEXPIRE" | "SEXPIREAT" | "SPEXPIREAT" | "STTL" | "SPTTL" | "SPERSIST" => {
            ttl_family(&cmd[1..], DataType::Set, cmd, parts, store)
        }
        "ZEXPIRE" | "ZPEXPIRE" | "ZEXPIREAT" | "ZPEXPIREAT" | "ZTTL" | "ZPTTL" | "ZPERSIST" => {
            ttl_family(&cmd[1..], DataType::ZSet, cmd, parts, store)
        }

        // --- Connection / Control commands ---
        "PING" => Ok(Reply::Simple("PONG".to_string())),
        "QUIT" => Ok(Reply::ok()),

        // --- Unknown command ---
        other => Err(CommandError::UnknownCommand(other.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// 创建临时 store 和事务会话，用于测试
    fn make_store_and_session() -> (Store, TxnSession) {
        (
            Store::temporary().expect("打开临时 store 失败"),
            TxnSession::new(),
        )
    }

    fn cmd(parts: &[&str]) -> Vec<String> {
        parts.iter().map(|s| s.to_string()).collect()
    }

    fn run(store: &Store, session: &mut TxnSession, parts: &[&str]) -> Reply {
        execute(cmd(parts), store, session)
    }

    // 事务状态机测试
    #[test]
    fn test_transaction_commands() {
        let (store, mut session) = make_store_and_session();

        // MULTI 进入 QUEUING
        assert_eq!(run(&store, &mut session, &["MULTI"]), Reply::ok());
        assert!(session.in_multi);

        // 命令入队，只回 QUEUED
        assert_eq!(
            run(&store, &mut session, &["SET", "tx_key", "tx_value"]),
            Reply::Simple("QUEUED".into())
        );
        assert_eq!(session.queue.len(), 1);
        // 入队的命令未执行
        let mut probe = TxnSession::new();
        assert_eq!(run(&store, &mut probe, &["GET", "tx_key"]), Reply::Nil);

        // DISCARD 丢弃队列
        assert_eq!(run(&store, &mut session, &["DISCARD"]), Reply::ok());
        assert!(!session.in_multi);
        assert!(session.queue.is_empty());
        assert_eq!(run(&store, &mut probe, &["GET", "tx_key"]), Reply::Nil);

        // EXEC 按序回放并返回各命令结果
        run(&store, &mut session, &["MULTI"]);
        run(&store, &mut session, &["SET", "tx_key", "tx_value"]);
        run(&store, &mut session, &["GET", "tx_key"]);
        assert_eq!(
            run(&store, &mut session, &["EXEC"]),
            Reply::Array(vec![Reply::ok(), Reply::bulk("tx_value")])
        );
        assert!(!session.in_multi);
        assert_eq!(
            run(&store, &mut session, &["GET", "tx_key"]),
            Reply::bulk("tx_value")
        );

        // 嵌套 MULTI
        run(&store, &mut session, &["MULTI"]);
        assert_eq!(
            run(&store, &mut session, &["MULTI"]),
            Reply::Error("ERR MULTI calls can not be nested".into())
        );
        run(&store, &mut session, &["DISCARD"]);

        // EXEC / DISCARD 无 MULTI
        assert_eq!(
            run(&store, &mut session, &["EXEC"]),
            Reply::Error("ERR EXEC without MULTI".into())
        );
        assert_eq!(
            run(&store, &mut session, &["DISCARD"]),
            Reply::Error("ERR DISCARD without MULTI".into())
        );
    }

    // 空事务：EXEC 回 nil
    #[test]
    fn test_empty_exec() {
        let (store, mut session) = make_store_and_session();
        assert_eq!(run(&store, &mut session, &["MULTI"]), Reply::ok());
        assert_eq!(run(&store, &mut session, &["EXEC"]), Reply::Nil);
    }

    // 队列中某条失败，其错误占位，后续照常执行
    #[test]
    fn test_exec_error_keeps_position() {
        let (store, mut session) = make_store_and_session();
        run(&store, &mut session, &["SET", "s", "value2"]);

        run(&store, &mut session, &["MULTI"]);
        run(&store, &mut session, &["INCR", "s"]);
        run(&store, &mut session, &["SET", "after", "yes"]);
        let result = run(&store, &mut session, &["EXEC"]);
        assert_eq!(
            result,
            Reply::Array(vec![
                Reply::Error("ERR value is not an integer or out of range".into()),
                Reply::ok(),
            ])
        );
        // 失败命令没有破坏状态，后续命令生效
        assert_eq!(run(&store, &mut session, &["GET", "s"]), Reply::bulk("value2"));
        assert_eq!(run(&store, &mut session, &["GET", "after"]), Reply::bulk("yes"));
    }

    // 字符串命令测试
    #[test]
    fn test_string_commands() {
        let (store, mut session) = make_store_and_session();

        assert_eq!(run(&store, &mut session, &["SET", "key1", "value1"]), Reply::ok());
        assert_eq!(run(&store, &mut session, &["GET", "key1"]), Reply::bulk("value1"));
        // GET 不存在的键回 nil
        assert_eq!(run(&store, &mut session, &["GET", "nonexistence"]), Reply::Nil);

        run(&store, &mut session, &["SET", "counter", "10"]);
        assert_eq!(run(&store, &mut session, &["INCR", "counter"]), Reply::Integer(11));
        assert_eq!(run(&store, &mut session, &["DECR", "counter"]), Reply::Integer(10));
        assert_eq!(
            run(&store, &mut session, &["INCRBY", "counter", "12345668"]),
            Reply::Integer(12345678)
        );
        assert_eq!(
            run(&store, &mut session, &["DECRBY", "counter", "8"]),
            Reply::Integer(12345670)
        );

        // INCR 非数字值
        assert_eq!(
            run(&store, &mut session, &["INCR", "key1"]),
            Reply::Error("ERR value is not an integer or out of range".into())
        );

        // DEL 返回删除个数
        assert_eq!(run(&store, &mut session, &["DEL", "key1"]), Reply::Integer(1));
        assert_eq!(run(&store, &mut session, &["DEL", "key1"]), Reply::Integer(0));
    }

    #[test]
    fn test_mset_mget_and_bits() {
        let (store, mut session) = make_store_and_session();

        assert_eq!(
            run(&store, &mut session, &["MSET", "k1", "v1", "k2", "v2"]),
            Reply::ok()
        );
        assert_eq!(
            run(&store, &mut session, &["MGET", "k1", "k2", "k3"]),
            Reply::Array(vec![Reply::bulk("v1"), Reply::bulk("v2"), Reply::Nil])
        );

        assert_eq!(run(&store, &mut session, &["SETBIT", "b", "0", "1"]), Reply::Integer(0));
        assert_eq!(run(&store, &mut session, &["GETBIT", "b", "0"]), Reply::Integer(1));
        run(&store, &mut session, &["SET", "words", "foobar"]);
        assert_eq!(
            run(&store, &mut session, &["BITCOUNT", "words"]),
            Reply::Integer(26)
        );
        assert_eq!(run(&store, &mut session, &["STRLEN", "words"]), Reply::Integer(6));
    }

    // 哈希命令测试
    #[test]
    fn test_hash_commands() {
        let (store, mut session) = make_store_and_session();

        assert_eq!(
            run(&store, &mut session, &["HSET", "user:1", "name", "Alice"]),
            Reply::Integer(1)
        );
        assert_eq!(
            run(&store, &mut session, &["HGET", "user:1", "name"]),
            Reply::bulk("Alice")
        );
        run(&store, &mut session, &["HSET", "user:1", "email", "alice@example.com"]);
        assert_eq!(
            run(&store, &mut session, &["HKEYS", "user:1"]),
            Reply::Array(vec![Reply::bulk("name"), Reply::bulk("email")])
        );
        assert_eq!(run(&store, &mut session, &["HLEN", "user:1"]), Reply::Integer(2));
        assert_eq!(
            run(&store, &mut session, &["HDEL", "user:1", "name"]),
            Reply::Integer(1)
        );
        assert_eq!(run(&store, &mut session, &["HCLEAR", "user:1"]), Reply::Integer(1));
        assert_eq!(run(&store, &mut session, &["HGETALL", "user:1"]), Reply::Array(vec![]));
    }

    // 列表命令测试
    #[test]
    fn test_list_commands() {
        let (store, mut session) = make_store_and_session();

        run(&store, &mut session, &["RPUSH", "mylist", "a", "b", "c"]);
        assert_eq!(run(&store, &mut session, &["LLEN", "mylist"]), Reply::Integer(3));
        assert_eq!(run(&store, &mut session, &["LPOP", "mylist"]), Reply::bulk("a"));
        assert_eq!(
            run(&store, &mut session, &["LRANGE", "mylist", "0", "-1"]),
            Reply::Array(vec![Reply::bulk("b"), Reply::bulk("c")])
        );
        assert_eq!(
            run(&store, &mut session, &["LSET", "mylist", "0", "B"]),
            Reply::ok()
        );
        assert_eq!(
            run(&store, &mut session, &["LINDEX", "mylist", "0"]),
            Reply::bulk("B")
        );
        // LSET 越界
        assert_eq!(
            run(&store, &mut session, &["LSET", "mylist", "9", "x"]),
            Reply::Error("ERR index out of range".into())
        );
        assert_eq!(run(&store, &mut session, &["LDEL", "mylist"]), Reply::Integer(1));
    }

    // 集合命令测试
    #[test]
    fn test_set_commands() {
        let (store, mut session) = make_store_and_session();

        run(&store, &mut session, &["SADD", "s1", "a", "b", "c"]);
        run(&store, &mut session, &["SADD", "s2", "b"]);
        assert_eq!(run(&store, &mut session, &["SCARD", "s1"]), Reply::Integer(3));
        assert_eq!(
            run(&store, &mut session, &["SISMEMBER", "s1", "a"]),
            Reply::Integer(1)
        );
        assert_eq!(
            run(&store, &mut session, &["SDIFF", "s1", "s2"]),
            Reply::Array(vec![Reply::bulk("a"), Reply::bulk("c")])
        );
        assert_eq!(
            run(&store, &mut session, &["SINTERSTORE", "dst", "s1", "s2"]),
            Reply::Integer(1)
        );
        assert_eq!(
            run(&store, &mut session, &["SMEMBERS", "dst"]),
            Reply::Array(vec![Reply::bulk("b")])
        );
        assert_eq!(run(&store, &mut session, &["SCLEAR", "dst"]), Reply::Integer(1));
    }

    // 有序集合命令测试
    #[test]
    fn test_zset_commands() {
        let (store, mut session) = make_store_and_session();

        assert_eq!(
            run(&store, &mut session, &["ZADD", "z", "1", "a", "2", "b"]),
            Reply::Integer(2)
        );
        assert_eq!(run(&store, &mut session, &["ZCARD", "z"]), Reply::Integer(2));
        assert_eq!(run(&store, &mut session, &["ZSCORE", "z", "b"]), Reply::bulk("2"));
        assert_eq!(
            run(&store, &mut session, &["ZINCRBY", "z", "10", "a"]),
            Reply::bulk("11")
        );
        assert_eq!(
            run(&store, &mut session, &["ZRANGE", "z", "0", "-1"]),
            Reply::Array(vec![Reply::bulk("b"), Reply::bulk("a")])
        );
        assert_eq!(
            run(&store, &mut session, &["ZREVRANGE", "z", "0", "-1", "WITHSCORES"]),
            Reply::Array(vec![
                Reply::bulk("a"),
                Reply::bulk("11"),
                Reply::bulk("b"),
                Reply::bulk("2"),
            ])
        );
        assert_eq!(
            run(&store, &mut session, &["ZCOUNT", "z", "-inf", "+inf"]),
            Reply::Integer(2)
        );
        assert_eq!(
            run(&store, &mut session, &["ZREM", "z", "a", "b"]),
            Reply::Integer(2)
        );
    }

    #[test]
    fn test_zrangebyscore_pagination() {
        let (store, mut session) = make_store_and_session();
        for i in 0..200 {
            let score = i.to_string();
            run(&store, &mut session, &["ZADD", "z", score.as_str(), score.as_str()]);
        }
        assert_eq!(
            run(
                &store,
                &mut session,
                &["ZRANGEBYSCORE", "z", "20", "30", "LIMIT", "2", "5"]
            ),
            Reply::Array(vec![
                Reply::bulk("22"),
                Reply::bulk("23"),
                Reply::bulk("24"),
                Reply::bulk("25"),
                Reply::bulk("26"),
            ])
        );
        // 倒置边界给空
        assert_eq!(
            run(&store, &mut session, &["ZRANGEBYSCORE", "z", "30", "20"]),
            Reply::Array(vec![])
        );
    }

    #[test]
    fn test_zrangebylex() {
        let (store, mut session) = make_store_and_session();
        for m in ["aaa", "aab", "abc", "bcd", "fff"] {
            run(&store, &mut session, &["ZADD", "z", "0", m]);
        }
        assert_eq!(
            run(&store, &mut session, &["ZRANGEBYLEX", "z", "(aaa", "[ccc"]),
            Reply::Array(vec![Reply::bulk("aab"), Reply::bulk("abc"), Reply::bulk("bcd")])
        );
        assert_eq!(
            run(&store, &mut session, &["ZLEXCOUNT", "z", "(aaa", "[ccc"]),
            Reply::Integer(3)
        );
        // 缺分隔符的边界
        assert_eq!(
            run(&store, &mut session, &["ZRANGEBYLEX", "z", "aaa", "[ccc"]),
            Reply::Error("ERR min or max not valid string range item".into())
        );
    }

    // 过期命令测试
    #[test]
    fn test_expire_commands() {
        let (store, mut session) = make_store_and_session();

        run(&store, &mut session, &["SET", "temp_key", "value"]);
        assert_eq!(
            run(&store, &mut session, &["EXPIRE", "temp_key", "60"]),
            Reply::Integer(1)
        );
        match run(&store, &mut session, &["TTL", "temp_key"]) {
            Reply::Integer(n) => assert!(n > 0 && n <= 60),
            other => panic!("unexpected reply {:?}", other),
        }
        assert_eq!(
            run(&store, &mut session, &["PERSIST", "temp_key"]),
            Reply::Integer(1)
        );
        assert_eq!(run(&store, &mut session, &["TTL", "temp_key"]), Reply::Integer(-1));

        // 对不存在的键设置过期是 no-op
        assert_eq!(
            run(&store, &mut session, &["EXPIRE", "ghost", "60"]),
            Reply::Integer(0)
        );
        assert_eq!(run(&store, &mut session, &["TTL", "ghost"]), Reply::Integer(-2));
    }

    // 类型前缀过期命令
    #[test]
    fn test_typed_expire_commands() {
        let (store, mut session) = make_store_and_session();

        run(&store, &mut session, &["HSET", "h", "f", "v"]);
        run(&store, &mut session, &["RPUSH", "l", "x"]);
        run(&store, &mut session, &["SADD", "s", "m"]);
        run(&store, &mut session, &["ZADD", "z", "1", "m"]);

        assert_eq!(run(&store, &mut session, &["HPEXPIRE", "h", "5000"]), Reply::Integer(1));
        assert_eq!(run(&store, &mut session, &["LEXPIRE", "l", "5"]), Reply::Integer(1));
        assert_eq!(run(&store, &mut session, &["SEXPIRE", "s", "5"]), Reply::Integer(1));
        assert_eq!(run(&store, &mut session, &["ZEXPIRE", "z", "5"]), Reply::Integer(1));

        match run(&store, &mut session, &["HPTTL", "h"]) {
            Reply::Integer(n) => assert!(n > 0 && n <= 5000),
            other => panic!("unexpected reply {:?}", other),
        }
        match run(&store, &mut session, &["STTL", "s"]) {
            Reply::Integer(n) => assert!(n > 0 && n <= 5),
            other => panic!("unexpected reply {:?}", other),
        }

        // 同名不同类型的过期互不影响
        assert_eq!(run(&store, &mut session, &["TTL", "h"]), Reply::Integer(-2));
    }

    // 五个类型命名空间互不串扰
    #[test]
    fn test_cross_type_independence() {
        let (store, mut session) = make_store_and_session();
        let name = "same_name";

        run(&store, &mut session, &["SET", name, "str"]);
        run(&store, &mut session, &["HSET", name, "f", "v"]);
        run(&store, &mut session, &["RPUSH", name, "e"]);
        run(&store, &mut session, &["SADD", name, "m"]);
        run(&store, &mut session, &["ZADD", name, "1", "m"]);

        assert_eq!(run(&store, &mut session, &["GET", name]), Reply::bulk("str"));
        assert_eq!(run(&store, &mut session, &["HLEN", name]), Reply::Integer(1));
        assert_eq!(run(&store, &mut session, &["LLEN", name]), Reply::Integer(1));
        assert_eq!(run(&store, &mut session, &["SCARD", name]), Reply::Integer(1));
        assert_eq!(run(&store, &mut session, &["ZCARD", name]), Reply::Integer(1));

        // 删掉 string 实体不影响其它类型
        assert_eq!(run(&store, &mut session, &["DEL", name]), Reply::Integer(1));
        assert_eq!(run(&store, &mut session, &["GET", name]), Reply::Nil);
        assert_eq!(run(&store, &mut session, &["HLEN", name]), Reply::Integer(1));
        assert_eq!(run(&store, &mut session, &["ZCARD", name]), Reply::Integer(1));
    }

    // 控制命令测试
    #[test]
    fn test_control_commands() {
        let (store, mut session) = make_store_and_session();
        assert_eq!(
            run(&store, &mut session, &["PING"]),
            Reply::Simple("PONG".into())
        );
        assert_eq!(run(&store, &mut session, &["QUIT"]), Reply::ok());
        // 命令名大小写不敏感
        assert_eq!(
            run(&store, &mut session, &["ping"]),
            Reply::Simple("PONG".into())
        );
    }

    // 错误参数测试
    #[test]
    fn test_argument_errors() {
        let (store, mut session) = make_store_and_session();

        assert_eq!(
            run(&store, &mut session, &["SET", "Key"]),
            Reply::Error("ERR wrong number of arguments for 'SET'".into())
        );
        assert_eq!(
            run(&store, &mut session, &["GET", "key", "extra"]),
            Reply::Error("ERR wrong number of arguments for 'GET'".into())
        );
        assert_eq!(
            run(&store, &mut session, &["INCR", "counter", "extra"]),
            Reply::Error("ERR wrong number of arguments for 'INCR'".into())
        );
        assert_eq!(
            run(&store, &mut session, &["NOSUCH", "x"]),
            Reply::Error("ERR unknown command 'NOSUCH'".into())
        );
    }
}
