// src/codec.rs

//! 键编码模块：把 (类型, 键名[, 子键]) 映射为底层 sled 的存储地址。
//!
//! 约定：
//! - String 数据放在默认树，键为 "string:<name>"
//! - 集合类实体各占一棵树，树名 "<prefix>:<name>"，五种类型互不碰撞
//! - expire 树内有两类条目：点查询键（'t'）和按截止时间排序的索引键（'d'）
//! - 树内子键的字节序即逻辑序（list 下标序 / zset (score, member) 序）
//!
//! 本模块只做纯转换，不产生错误。

/// 数据类型，同名键在不同类型下互为独立实体
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataType {
    String,
    Hash,
    List,
    Set,
    ZSet,
}

impl DataType {
    /// 单字节类型标记，expire 树编码使用
    pub fn tag(self) -> u8 {
        match self {
            DataType::String => b'k',
            DataType::Hash => b'h',
            DataType::List => b'l',
            DataType::Set => b's',
            DataType::ZSet => b'z',
        }
    }

    pub fn from_tag(tag: u8) -> Option<DataType> {
        match tag {
            b'k' => Some(DataType::String),
            b'h' => Some(DataType::Hash),
            b'l' => Some(DataType::List),
            b's' => Some(DataType::Set),
            b'z' => Some(DataType::ZSet),
            _ => None,
        }
    }

    /// 树名前缀
    pub fn prefix(self) -> &'static str {
        match self {
            DataType::String => "string",
            DataType::Hash => "hash",
            DataType::List => "list",
            DataType::Set => "set",
            DataType::ZSet => "zset",
        }
    }
}

/// String 数据键（默认树）："string:<name>"
pub fn string_key(name: &str) -> Vec<u8> {
    let mut k = Vec::with_capacity(7 + name.len());
    k.extend_from_slice(b"string:");
    k.extend_from_slice(name.as_bytes());
    k
}

/// 集合类实体的树名："hash:<name>" / "list:<name>" / ...
pub fn tree_name(ty: DataType, name: &str) -> String {
    format!("{}:{}", ty.prefix(), name)
}

// ---------- expire 树 ----------

/// 点查询键：'t' | tag | name → 截止时间（ms，8 字节大端）
pub fn ttl_point_key(ty: DataType, name: &str) -> Vec<u8> {
    let mut k = Vec::with_capacity(2 + name.len());
    k.push(b't');
    k.push(ty.tag());
    k.extend_from_slice(name.as_bytes());
    k
}

/// 索引键：'d' | deadline_be(8) | tag | name → ()
/// 字节序即截止时间序，后台清理按它扫描
pub fn ttl_index_key(deadline_ms: u64, ty: DataType, name: &str) -> Vec<u8> {
    let mut k = Vec::with_capacity(10 + name.len());
    k.push(b'd');
    k.extend_from_slice(&deadline_ms.to_be_bytes());
    k.push(ty.tag());
    k.extend_from_slice(name.as_bytes());
    k
}

/// 解出索引键里的 (截止时间, 类型, 键名)
pub fn decode_ttl_index_key(raw: &[u8]) -> Option<(u64, DataType, String)> {
    if raw.len() < 10 || raw[0] != b'd' {
        return None;
    }
    let mut b = [0u8; 8];
    b.copy_from_slice(&raw[1..9]);
    let deadline = u64::from_be_bytes(b);
    let ty = DataType::from_tag(raw[9])?;
    let name = String::from_utf8(raw[10..].to_vec()).ok()?;
    Some((deadline, ty, name))
}

// ---------- list 子键 ----------

/// i64 序号翻转符号位映射到 u64，使大端字节序与有符号序一致
fn seq_to_u64(seq: i64) -> u64 {
    (seq as u64) ^ (1 << 63)
}

fn u64_to_seq(u: u64) -> i64 {
    (u ^ (1 << 63)) as i64
}

/// 序号 → 8 字节大端子键
pub fn seq_to_key(seq: i64) -> [u8; 8] {
    seq_to_u64(seq).to_be_bytes()
}

/// 8 字节子键 → 序号
pub fn key_to_seq(k: &[u8]) -> i64 {
    let mut b = [0u8; 8];
    b.copy_from_slice(&k[0..8]);
    u64_to_seq(u64::from_be_bytes(b))
}

// ---------- hash 子键 ----------

/// 插入序计数器（树内单条 meta）
pub const HASH_META_KEY: &[u8] = b"!";
/// field 条目前缀，值为 插入序(8 字节大端) || payload
pub const HASH_FIELD_PREFIX: &[u8] = b"f";

pub fn hash_field_key(field: &str) -> Vec<u8> {
    let mut k = Vec::with_capacity(1 + field.len());
    k.push(b'f');
    k.extend_from_slice(field.as_bytes());
    k
}

/// 去掉前缀取回 field 本体
pub fn hash_field_from_key(k: &[u8]) -> &[u8] {
    &k[1..]
}

// ---------- zset 子键 ----------

/// member → score 条目前缀
pub const ZSET_MEMBER_PREFIX: &[u8] = b"m";
/// (score, member) 序索引前缀
pub const ZSET_SCORE_PREFIX: &[u8] = b"s";

pub fn zset_member_key(member: &str) -> Vec<u8> {
    let mut k = Vec::with_capacity(1 + member.len());
    k.push(b'm');
    k.extend_from_slice(member.as_bytes());
    k
}

pub fn zset_member_from_key(k: &[u8]) -> &[u8] {
    &k[1..]
}

pub fn zset_score_key(score: f64, member: &str) -> Vec<u8> {
    let mut k = Vec::with_capacity(9 + member.len());
    k.push(b's');
    k.extend_from_slice(&score_to_bytes(score));
    k.extend_from_slice(member.as_bytes());
    k
}

/// 索引键 → (score, member 字节)
pub fn zset_decode_score_key(k: &[u8]) -> (f64, &[u8]) {
    (bytes_to_score(&k[1..9]), &k[9..])
}

/// f64 → 保序 8 字节：非负数置符号位，负数按位取反。
/// 由此大端字节序与数值序一致，负数亦然。
pub fn score_to_bytes(score: f64) -> [u8; 8] {
    let bits = score.to_bits();
    let ordered = if bits >> 63 == 1 { !bits } else { bits ^ (1 << 63) };
    ordered.to_be_bytes()
}

pub fn bytes_to_score(b: &[u8]) -> f64 {
    let mut a = [0u8; 8];
    a.copy_from_slice(&b[0..8]);
    let u = u64::from_be_bytes(a);
    let bits = if u >> 63 == 1 { u ^ (1 << 63) } else { !u };
    f64::from_bits(bits)
}
