use std::net::SocketAddr;

use atty::Stream;
use chrono::{DateTime, Local};
use owo_colors::OwoColorize;

use crate::config::{BrokerKind, GatewaySettings};

/// Данные для баннера запуска.
#[derive(Debug, Clone)]
pub struct BannerInfo {
    pub version: &'static str,
    pub listen: SocketAddr,
    pub broker: BrokerKind,
    pub topics: Vec<String>,
    pub pid: u32,
    pub git: &'static str,
    pub build_time: String,
}

impl BannerInfo {
    pub fn new(
        settings: &GatewaySettings,
        listen: SocketAddr,
    ) -> Self {
        let build_time_raw = option_env!("BUILD_TIME").unwrap_or("unknown");
        let build_time = match DateTime::parse_from_rfc3339(build_time_raw) {
            Ok(dt) => dt
                .with_timezone(&Local)
                .format("%d.%m.%Y %H:%M:%S")
                .to_string(),
            Err(_) => build_time_raw.to_string(),
        };

        Self {
            version: env!("CARGO_PKG_VERSION"),
            listen,
            broker: settings.broker.kind,
            topics: if settings.consumer.enabled {
                settings.consumer.topics.clone()
            } else {
                Vec::new()
            },
            pid: std::process::id(),
            git: option_env!("GIT_COMMIT").unwrap_or("unknown"),
            build_time,
        }
    }
}

/// Текст баннера без цветов.
pub fn render_banner(info: &BannerInfo) -> Vec<String> {
    let broker = match info.broker {
        BrokerKind::Memory => "memory",
        BrokerKind::Kafka => "kafka",
    };
    let consumer = if info.topics.is_empty() {
        "disabled".to_string()
    } else {
        info.topics.join(", ")
    };

    vec![
        format!("relaygate {}", info.version),
        "----------------------------------------------".to_string(),
        format!("Listening:        http://{}", info.listen),
        format!("Broker:           {broker}"),
        format!("Consuming:        {consumer}"),
        format!("PID:              {}", info.pid),
        format!("Build:            {} ({})", info.git, info.build_time),
    ]
}

/// Печатает баннер в stdout. Цвета только для терминала.
pub fn print_banner(info: &BannerInfo) {
    let color = atty::is(Stream::Stdout);
    println!();
    for (i, line) in render_banner(info).iter().enumerate() {
        if !color {
            println!("    {line}");
        } else if i == 0 {
            println!("    {}", line.bold().bright_blue());
        } else if line.starts_with("Build:") {
            println!("    {}", line.dimmed());
        } else if line.starts_with("PID:") {
            println!("    {}", line.magenta());
        } else {
            println!("    {line}");
        }
    }
    println!();
}
