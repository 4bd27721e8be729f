#![allow(dead_code)]

use std::{net::SocketAddr, sync::Arc};

use anyhow::{Context, Result};
use relaygate::{
    config::ConsumerSettings, BrokerClients, Gateway, GatewaySettings, LoggingProcessor,
};
use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::TcpStream,
};

/// Настройки для тестов: эфемерный порт, таймаут остановки 1 секунда.
pub fn settings(topics: &[&str]) -> GatewaySettings {
    let mut s = GatewaySettings::default();
    s.server.address = "127.0.0.1:0".to_string();
    s.server.shutdown_timeout_secs = 1;
    if !topics.is_empty() {
        s.consumer = ConsumerSettings {
            enabled: true,
            group_id: "integration".to_string(),
            topics: topics.iter().map(|t| t.to_string()).collect(),
            ..Default::default()
        };
    }
    s
}

pub async fn start(
    settings: GatewaySettings,
    clients: BrokerClients,
) -> Result<Gateway> {
    Gateway::start_with(Arc::new(settings), clients, Arc::new(LoggingProcessor))
        .await
        .map_err(|e| anyhow::anyhow!("{e}"))
}

/// Ответ сервера: статус и тело.
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

impl HttpResponse {
    pub fn json(&self) -> Result<serde_json::Value> {
        serde_json::from_str(&self.body).with_context(|| format!("body: {}", self.body))
    }
}

/// Выполняет HTTP/1.1 запрос по сырому TCP с `Connection: close`.
pub async fn request(
    addr: SocketAddr,
    method: &str,
    path: &str,
    body: &str,
) -> Result<HttpResponse> {
    let mut stream = TcpStream::connect(addr).await?;
    let req = format!(
        "{method} {path} HTTP/1.1\r\nHost: {addr}\r\nContent-Type: application/json\r\n\
         Content-Length: {}\r\nConnection: close\r\n\r\n{body}",
        body.len()
    );
    stream.write_all(req.as_bytes()).await?;

    let mut raw = String::new();
    stream.read_to_string(&mut raw).await?;

    let (head, body) = raw
        .split_once("\r\n\r\n")
        .context("response without header terminator")?;
    let status = head
        .split_whitespace()
        .nth(1)
        .context("missing status code")?
        .parse()?;

    Ok(HttpResponse {
        status,
        body: body.to_string(),
    })
}

pub async fn publish(
    addr: SocketAddr,
    body: &str,
) -> Result<HttpResponse> {
    request(addr, "POST", "/publish", body).await
}
