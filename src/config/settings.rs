use std::{
    collections::HashSet,
    net::SocketAddr,
    path::Path,
    time::Duration,
};

use config::{Config, Environment, File, FileFormat};
use relaygate_error::ConfigError;
use serde::{Deserialize, Serialize};

use crate::logging::{filters, LogSettings};

/// Префикс переменных окружения: `RELAYGATE_SERVER__ADDRESS`.
pub const ENV_PREFIX: &str = "RELAYGATE";
pub const DEFAULT_CONFIG_PATH: &str = "config.yaml";
pub const DEFAULT_SHUTDOWN_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_CHANNEL_CAPACITY: usize = 1024;

/// Полный снимок настроек шлюза.
///
/// После [`GatewaySettings::load`] не изменяется и разделяется через `Arc`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewaySettings {
    /// Отладочное логирование клиента брокера.
    pub debug: bool,
    pub server: ServerSettings,
    pub broker: BrokerSettings,
    pub consumer: ConsumerSettings,
    pub log: LogSettings,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub address: String,
    pub shutdown_timeout_secs: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BrokerKind {
    Memory,
    Kafka,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BrokerSettings {
    pub kind: BrokerKind,
    pub addresses: Vec<String>,
    /// Размер буфера на топик для брокера в памяти.
    pub channel_capacity: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OffsetReset {
    Earliest,
    Latest,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConsumerSettings {
    pub enabled: bool,
    pub group_id: String,
    pub topics: Vec<String>,
    pub offset_reset: OffsetReset,
}

////////////////////////////////////////////////////////////////////////////////
// Собственные методы
////////////////////////////////////////////////////////////////////////////////

impl GatewaySettings {
    /// Загружает настройки из YAML-файла и переменных окружения, затем
    /// валидирует результат.
    ///
    /// Отсутствующий файл это ошибка `Load`: адрес сервера и адреса брокера
    /// не имеют значений по умолчанию.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let settings = Self::load_unvalidated(path.as_ref())?;
        settings.validate()?;
        Ok(settings)
    }

    fn load_unvalidated(path: &Path) -> Result<Self, ConfigError> {
        let cfg = Config::builder()
            .add_source(File::from(path).format(FileFormat::Yaml).required(true))
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("broker.addresses")
                    .with_list_parse_key("consumer.topics")
                    .try_parsing(true),
            )
            .build()
            .map_err(load_error)?;

        cfg.try_deserialize().map_err(load_error)
    }

    /// Проверяет согласованность настроек. Возвращает первую найденную
    /// ошибку.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.server.validate()?;
        self.broker.validate()?;
        self.consumer.validate()?;

        filters::parse_directive(&self.log.level)
            .map_err(|e| ConfigError::invalid("log.level", e.to_string()))?;

        Ok(())
    }

    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.server.shutdown_timeout_secs)
    }
}

impl ServerSettings {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.address.trim().is_empty() {
            return Err(ConfigError::invalid("server.address", "must not be empty"));
        }
        self.socket_addr()?;
        if self.shutdown_timeout_secs == 0 {
            return Err(ConfigError::invalid(
                "server.shutdown_timeout_secs",
                "must be greater than zero",
            ));
        }
        Ok(())
    }

    /// Адрес HTTP-слушателя в виде `SocketAddr`.
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        self.address
            .trim()
            .parse()
            .map_err(|e| ConfigError::invalid("server.address", format!("{e}")))
    }
}

impl BrokerSettings {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.addresses.is_empty() {
            return Err(ConfigError::invalid(
                "broker.addresses",
                "at least one address is required",
            ));
        }
        if self.addresses.iter().any(|a| a.trim().is_empty()) {
            return Err(ConfigError::invalid(
                "broker.addresses",
                "addresses must not be blank",
            ));
        }
        if self.channel_capacity == 0 {
            return Err(ConfigError::invalid(
                "broker.channel_capacity",
                "must be greater than zero",
            ));
        }
        if self.kind == BrokerKind::Kafka && !cfg!(feature = "kafka") {
            return Err(ConfigError::UnsupportedBroker {
                kind: "kafka".to_string(),
            });
        }
        Ok(())
    }
}

impl ConsumerSettings {
    fn validate(&self) -> Result<(), ConfigError> {
        if !self.enabled {
            return Ok(());
        }
        if self.group_id.trim().is_empty() {
            return Err(ConfigError::invalid(
                "consumer.group_id",
                "required when consumer is enabled",
            ));
        }
        if self.topics.is_empty() {
            return Err(ConfigError::invalid(
                "consumer.topics",
                "at least one topic is required when consumer is enabled",
            ));
        }

        let mut seen = HashSet::with_capacity(self.topics.len());
        for topic in &self.topics {
            if topic.trim().is_empty() {
                return Err(ConfigError::invalid(
                    "consumer.topics",
                    "topics must not be blank",
                ));
            }
            if !seen.insert(topic.as_str()) {
                return Err(ConfigError::invalid(
                    "consumer.topics",
                    format!("duplicate topic `{topic}`"),
                ));
            }
        }
        Ok(())
    }
}

fn load_error(err: config::ConfigError) -> ConfigError {
    ConfigError::Load {
        reason: err.to_string(),
    }
}

////////////////////////////////////////////////////////////////////////////////
// Общие реализации трейтов
////////////////////////////////////////////////////////////////////////////////

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            address: String::new(),
            shutdown_timeout_secs: DEFAULT_SHUTDOWN_TIMEOUT_SECS,
        }
    }
}

impl Default for BrokerSettings {
    fn default() -> Self {
        Self {
            kind: BrokerKind::Memory,
            addresses: Vec::new(),
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
        }
    }
}

impl Default for ConsumerSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            group_id: String::new(),
            topics: Vec::new(),
            offset_reset: OffsetReset::Earliest,
        }
    }
}

impl std::fmt::Display for OffsetReset {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        match self {
            Self::Earliest => write!(f, "earliest"),
            Self::Latest => write!(f, "latest"),
        }
    }
}

////////////////////////////////////////////////////////////////////////////////
// Тесты
////////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use std::{env, io::Write};

    use serial_test::serial;
    use tempfile::NamedTempFile;

    use super::*;

    fn valid_settings() -> GatewaySettings {
        let mut s = GatewaySettings::default();
        s.server.address = "127.0.0.1:8080".to_string();
        s.broker.addresses = vec!["localhost:9092".to_string()];
        s
    }

    fn consumer_settings() -> GatewaySettings {
        GatewaySettings {
            consumer: ConsumerSettings {
                enabled: true,
                group_id: "relaygate".to_string(),
                topics: vec!["orders".to_string(), "audit".to_string()],
                ..Default::default()
            },
            ..valid_settings()
        }
    }

    fn yaml_file(contents: &str) -> NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    fn invalid_field(settings: &GatewaySettings) -> String {
        match settings.validate() {
            Err(ConfigError::Invalid { field, .. }) => field,
            other => panic!("expected Invalid, got {other:?}"),
        }
    }

    /// Тест проверяет значения по умолчанию: обязательные адреса не
    /// заполняются, остальное проходит валидацию.
    #[test]
    fn test_defaults() {
        let mut settings = GatewaySettings::default();
        assert_eq!(invalid_field(&settings), "server.address");
        settings.server.address = "127.0.0.1:8080".to_string();
        assert_eq!(invalid_field(&settings), "broker.addresses");

        let settings = valid_settings();
        assert!(settings.validate().is_ok());
        assert_eq!(settings.shutdown_timeout(), Duration::from_secs(10));
        assert_eq!(settings.broker.kind, BrokerKind::Memory);
        assert_eq!(settings.consumer.offset_reset, OffsetReset::Earliest);
        assert!(consumer_settings().validate().is_ok());
    }

    /// Тест проверяет отказ для каждого некорректного значения сервера и
    /// брокера.
    #[test]
    fn test_rejects_invalid_server_and_broker() {
        let mut s = valid_settings();
        s.server.address = "  ".to_string();
        assert_eq!(invalid_field(&s), "server.address");

        let mut s = valid_settings();
        s.server.address = "not-an-address".to_string();
        assert_eq!(invalid_field(&s), "server.address");

        let mut s = valid_settings();
        s.server.shutdown_timeout_secs = 0;
        assert_eq!(invalid_field(&s), "server.shutdown_timeout_secs");

        let mut s = valid_settings();
        s.broker.addresses.clear();
        assert_eq!(invalid_field(&s), "broker.addresses");

        let mut s = valid_settings();
        s.broker.addresses.push(String::new());
        assert_eq!(invalid_field(&s), "broker.addresses");

        let mut s = valid_settings();
        s.broker.channel_capacity = 0;
        assert_eq!(invalid_field(&s), "broker.channel_capacity");
    }

    /// Тест проверяет отказ для некорректных настроек потребителя.
    #[test]
    fn test_rejects_invalid_consumer() {
        let mut s = consumer_settings();
        s.consumer.group_id.clear();
        assert_eq!(invalid_field(&s), "consumer.group_id");

        let mut s = consumer_settings();
        s.consumer.topics.clear();
        assert_eq!(invalid_field(&s), "consumer.topics");

        let mut s = consumer_settings();
        s.consumer.topics.push(" ".to_string());
        assert_eq!(invalid_field(&s), "consumer.topics");

        let mut s = consumer_settings();
        s.consumer.topics.push("orders".to_string());
        assert_eq!(invalid_field(&s), "consumer.topics");

        // Выключенный потребитель не проверяется.
        let mut s = consumer_settings();
        s.consumer.enabled = false;
        s.consumer.topics.clear();
        assert!(s.validate().is_ok());
    }

    #[test]
    fn test_rejects_invalid_log_level() {
        let mut s = valid_settings();
        s.log.level = "relaygate=notalevel".to_string();
        assert_eq!(invalid_field(&s), "log.level");
    }

    #[cfg(not(feature = "kafka"))]
    #[test]
    fn test_kafka_without_feature_is_unsupported() {
        let mut s = valid_settings();
        s.broker.kind = BrokerKind::Kafka;
        assert!(matches!(
            s.validate(),
            Err(ConfigError::UnsupportedBroker { .. })
        ));
    }

    /// Тест проверяет загрузку YAML-файла со всеми секциями.
    #[test]
    #[serial]
    fn test_load_from_yaml() {
        let file = yaml_file(
            r#"
debug: true
server:
  address: "0.0.0.0:9000"
  shutdown_timeout_secs: 3
broker:
  kind: memory
  addresses: ["broker-1:9092", "broker-2:9092"]
consumer:
  enabled: true
  group_id: gateway
  topics: [orders, audit]
  offset_reset: latest
log:
  stdout: false
  level: debug
  format: compact
"#,
        );

        let s = GatewaySettings::load(file.path()).unwrap();
        assert!(s.debug);
        assert_eq!(s.server.address, "0.0.0.0:9000");
        assert_eq!(s.shutdown_timeout(), Duration::from_secs(3));
        assert_eq!(s.broker.addresses.len(), 2);
        assert_eq!(s.broker.channel_capacity, DEFAULT_CHANNEL_CAPACITY);
        assert_eq!(s.consumer.topics, vec!["orders", "audit"]);
        assert_eq!(s.consumer.offset_reset, OffsetReset::Latest);
        assert!(!s.log.stdout);
        assert_eq!(s.log.level, "debug");
    }

    /// Тест проверяет, что отсутствующий файл это ошибка загрузки.
    #[test]
    #[serial]
    fn test_missing_file_is_load_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            GatewaySettings::load(dir.path().join("absent.yaml")),
            Err(ConfigError::Load { .. })
        ));
    }

    /// Тест проверяет, что файл без обязательных адресов не проходит
    /// валидацию.
    #[test]
    #[serial]
    fn test_required_addresses_must_be_present() {
        let file = yaml_file("consumer:\n  enabled: false\n");
        match GatewaySettings::load(file.path()) {
            Err(ConfigError::Invalid { field, .. }) => assert_eq!(field, "server.address"),
            other => panic!("expected Invalid, got {other:?}"),
        }

        let file = yaml_file("server:\n  address: \"127.0.0.1:7000\"\n");
        match GatewaySettings::load(file.path()) {
            Err(ConfigError::Invalid { field, .. }) => assert_eq!(field, "broker.addresses"),
            other => panic!("expected Invalid, got {other:?}"),
        }
    }

    /// Тест проверяет, что ошибка разбора файла сообщается как `Load`, а не
    /// маскируется валидацией.
    #[test]
    #[serial]
    fn test_load_error_is_reported_before_validation() {
        let file = yaml_file("server: [this, is, not, a, map\n");
        assert!(matches!(
            GatewaySettings::load(file.path()),
            Err(ConfigError::Load { .. })
        ));

        let file = yaml_file("broker:\n  kind: rabbit\n");
        assert!(matches!(
            GatewaySettings::load(file.path()),
            Err(ConfigError::Load { .. })
        ));
    }

    /// Тест проверяет переопределение значений переменными окружения.
    #[test]
    #[serial]
    fn test_env_overrides() {
        let file = yaml_file(
            "server:\n  address: \"127.0.0.1:7000\"\nbroker:\n  addresses: [\"localhost:9092\"]\n",
        );

        env::set_var("RELAYGATE_SERVER__ADDRESS", "127.0.0.1:7100");
        env::set_var("RELAYGATE_CONSUMER__ENABLED", "true");
        env::set_var("RELAYGATE_CONSUMER__GROUP_ID", "env-group");
        env::set_var("RELAYGATE_CONSUMER__TOPICS", "a,b,c");

        let result = GatewaySettings::load(file.path());

        env::remove_var("RELAYGATE_SERVER__ADDRESS");
        env::remove_var("RELAYGATE_CONSUMER__ENABLED");
        env::remove_var("RELAYGATE_CONSUMER__GROUP_ID");
        env::remove_var("RELAYGATE_CONSUMER__TOPICS");

        let s = result.unwrap();
        assert_eq!(s.server.address, "127.0.0.1:7100");
        assert!(s.consumer.enabled);
        assert_eq!(s.consumer.group_id, "env-group");
        assert_eq!(s.consumer.topics, vec!["a", "b", "c"]);
    }
}
