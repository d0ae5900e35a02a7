// src/config.rs

use std::{fs, path::Path};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// 进程启动后，从 config.json 读到的全局配置
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct Config {
    /// 监听地址
    pub listen_addr: String,
    /// sled 数据目录
    pub db_path: String,
    /// 后台过期清理周期（毫秒）
    pub sweep_interval_ms: u64,
    /// 每轮清理最多处理的键数
    pub sweep_batch: usize,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            listen_addr: "127.0.0.1:6380".to_string(),
            db_path: "rudis-data".to_string(),
            sweep_interval_ms: 1000,
            sweep_batch: 128,
        }
    }
}

/// 从指定路径读取并反序列化 JSON 配置；文件不存在时落一份默认配置
pub fn load<P: AsRef<Path>>(path: P) -> Result<Config> {
    let path_ref = path.as_ref();

    if !path_ref.exists() {
        let default_cfg = Config::default();
        let default_json = serde_json::to_string_pretty(&default_cfg)?;
        fs::write(path_ref, default_json)
            .with_context(|| format!("Failed to write default config to {:?}", path_ref))?;
        tracing::info!("config file not found, default created at {:?}", path_ref);
        return Ok(default_cfg);
    }

    let data = fs::read_to_string(path_ref)
        .with_context(|| format!("Failed to read config file {:?}", path_ref))?;
    let cfg: Config = serde_json::from_str(&data).context("Failed to parse config.json")?;
    Ok(cfg)
}
