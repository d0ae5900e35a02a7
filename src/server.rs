// src/server.rs
//! rudis 服务的网络层：
//! - 监听 TCP 连接
//! - 解码请求（文本 / RESP Array）
//! - 每个连接持有自己的事务会话，调度到 engine 执行
//! - 把类型化的 Reply 按 RESP 编码回写

use std::io::ErrorKind;
use std::sync::Arc;

use anyhow::Result;
use tokio::{
    io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader},
    net::{TcpListener, TcpStream},
};
use tracing::{error, info};

use crate::engine;
use crate::store::Store;
use crate::txn::TxnSession;

/// 启动服务：绑定地址后进入接受循环
pub async fn start(addr: &str, store: Arc<Store>) -> Result<()> {
    let listener = TcpListener::bind(addr).await?;
    info!("rudis server listening on {}", addr);
    serve(listener, store).await
}

/// 接受循环：不断 accept 新连接并 spawn 出异步任务
async fn serve(listener: TcpListener, store: Arc<Store>) -> Result<()> {
    loop {
        let (stream, peer) = listener.accept().await?;
        info!("accepted connection from {}", peer);

        let store = store.clone();
        tokio::spawn(async move {
            if let Err(err) = handle_connection(stream, store).await {
                error!("connection error: {}", err);
            }
        });
    }
}

/// 单个连接的处理逻辑
/// - 先读第一个字节，区分「RESP Array」或「简单文本」协议
/// - 解析成 Vec<String> parts
/// - 调 engine 执行业务（事务状态跟着连接走）
/// - 编码 Reply 回写；QUIT 应答后断开
async fn handle_connection(stream: TcpStream, store: Arc<Store>) -> Result<()> {
    let peer = stream.peer_addr()?;
    let (reader, mut writer) = stream.into_split();
    let mut reader = BufReader::new(reader);
    // 每个连接独立的事务会话
    let mut session = TxnSession::new();

    loop {
        // ----- 1) 先读一个字节，决定协议类型 -----
        let mut first = [0u8; 1];
        match reader.read_exact(&mut first).await {
            Ok(_) => {}
            // 客户端断开（EOF）或 RST
            Err(e) if e.kind() == ErrorKind::UnexpectedEof
                     || e.kind() == ErrorKind::ConnectionReset => {
                info!("{} disconnected", peer);
                break;
            }
            Err(e) => return Err(e.into()),
        }

        // ----- 2) 解析命令到 Vec<String> -----
        let parts: Vec<String> = if first[0] == b'*' {
            // --- RESP Array 分支 ---
            // 形如 *2\r\n$3\r\nGET\r\n$5\r\nmykey\r\n
            let mut line = String::new();
            reader.read_line(&mut line).await?;
            let count: usize = line.trim().parse()?;

            let mut parsed = Vec::with_capacity(count);
            for _ in 0..count {
                // "$<len>\r\n"
                line.clear();
                reader.read_line(&mut line).await?;
                let len: usize = line.trim_start_matches('$').trim().parse()?;

                // payload + 尾部 "\r\n"
                let mut buf = vec![0u8; len];
                reader.read_exact(&mut buf).await?;
                let mut crlf = [0u8; 2];
                reader.read_exact(&mut crlf).await?;

                parsed.push(String::from_utf8(buf)?);
            }
            parsed
        } else {
            // --- 简单文本协议分支 ---
            // 第一个字节已经读走，拼回整行后按空白拆分
            let mut line = String::new();
            reader.read_line(&mut line).await?;
            let mut full = String::new();
            full.push(first[0] as char);
            full.push_str(&line);
            full.trim_end().split_whitespace().map(str::to_string).collect()
        };

        if parts.is_empty() {
            continue;
        }
        let is_quit = parts[0].eq_ignore_ascii_case("QUIT");

        // ----- 3) 调度到 engine 执行业务 -----
        let reply = engine::execute(parts, &store, &mut session);

        // ----- 4) 按 RESP 编码回写 -----
        writer.write_all(&reply.to_bytes()).await?;

        if is_quit {
            break;
        }
    }

    Ok(())
}
