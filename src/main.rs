// src/main.rs
use std::sync::Arc;

use clap::Parser;
use rudis::{config, expire, server, store::Store};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "rudis", about = "五类型键值服务")]
struct Args {
    /// 配置文件路径
    #[arg(short, long, default_value = "config.json")]
    config: String,

    /// 覆盖配置里的监听地址
    #[arg(short, long)]
    listen: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("rudis=info".parse()?))
        .init();

    let args = Args::parse();
    let mut cfg = config::load(&args.config)?;
    if let Some(listen) = args.listen {
        cfg.listen_addr = listen;
    }

    let store = Arc::new(Store::open(&cfg.db_path)?);

    // 后台过期清理
    tokio::spawn(expire::start_sweeper(
        store.clone(),
        cfg.sweep_interval_ms,
        cfg.sweep_batch,
    ));

    server::start(&cfg.listen_addr, store).await?;
    Ok(())
}
