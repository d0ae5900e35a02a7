// src/store.rs

//! 存储句柄：持有 sled 实例、按键锁表和会话间屏障。
//!
//! Store 是显式注入的对象（不是进程级单例），测试里用 `temporary()`
//! 各开各的实例即可互相隔离。
//!
//! 锁约定：
//! - 单键命令：共享屏障 + 该 (类型, 键名) 的互斥锁
//! - 多键命令 / EXEC：独占屏障
//! - 后台清理：逐键取锁，绝不横跨整轮扫描持锁

use std::sync::{Arc, Mutex, RwLock, RwLockReadGuard, RwLockWriteGuard};

use anyhow::Result;
use dashmap::DashMap;
use sled::Tree;

use crate::codec::{self, DataType};

const EXPIRE_TREE: &str = "expire";

pub struct Store {
    db: sled::Db,
    locks: DashMap<(u8, String), Arc<Mutex<()>>>,
    barrier: RwLock<()>,
}

impl Store {
    /// 打开（或创建）指定路径的存储
    pub fn open(path: &str) -> Result<Store> {
        Ok(Store::wrap(sled::open(path)?))
    }

    /// 临时存储，进程退出即销毁，测试用
    pub fn temporary() -> Result<Store> {
        Ok(Store::wrap(sled::Config::new().temporary(true).open()?))
    }

    fn wrap(db: sled::Db) -> Store {
        Store {
            db,
            locks: DashMap::new(),
            barrier: RwLock::new(()),
        }
    }

    pub fn db(&self) -> &sled::Db {
        &self.db
    }

    /// 过期元数据树
    pub fn expire_tree(&self) -> Result<Tree, sled::Error> {
        self.db.open_tree(EXPIRE_TREE)
    }

    /// 集合类实体的数据树
    pub fn data_tree(&self, ty: DataType, name: &str) -> Result<Tree, sled::Error> {
        self.db.open_tree(codec::tree_name(ty, name))
    }

    /// (类型, 键名) 是否有数据。String 查默认树；集合类查对应树内
    /// 是否残留数据条目（空树视同不存在，open_tree 会隐式建树）。
    pub fn exists(&self, ty: DataType, name: &str) -> Result<bool, sled::Error> {
        match ty {
            DataType::String => Ok(self.db.contains_key(codec::string_key(name))?),
            DataType::Hash => {
                let tree = self.data_tree(ty, name)?;
                Ok(tree.scan_prefix(codec::HASH_FIELD_PREFIX).next().is_some())
            }
            DataType::ZSet => {
                let tree = self.data_tree(ty, name)?;
                Ok(tree.scan_prefix(codec::ZSET_MEMBER_PREFIX).next().is_some())
            }
            DataType::List | DataType::Set => {
                let tree = self.data_tree(ty, name)?;
                Ok(!tree.is_empty())
            }
        }
    }

    /// 删掉实体本体。返回删除前是否有数据。
    pub fn drop_data(&self, ty: DataType, name: &str) -> Result<bool, sled::Error> {
        let existed = self.exists(ty, name)?;
        match ty {
            DataType::String => {
                self.db.remove(codec::string_key(name))?;
            }
            _ => {
                self.db.drop_tree(codec::tree_name(ty, name))?;
            }
        }
        Ok(existed)
    }

    /// 取 (类型, 键名) 的互斥锁句柄
    pub fn key_lock(&self, ty: DataType, name: &str) -> Arc<Mutex<()>> {
        self.locks
            .entry((ty.tag(), name.to_string()))
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// 共享屏障：单键命令持有
    pub fn shared(&self) -> RwLockReadGuard<'_, ()> {
        self.barrier.read().unwrap_or_else(|e| e.into_inner())
    }

    /// 独占屏障：EXEC 与多键命令持有
    pub fn exclusive(&self) -> RwLockWriteGuard<'_, ()> {
        self.barrier.write().unwrap_or_else(|e| e.into_inner())
    }
}
