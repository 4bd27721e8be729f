use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Настройки логирования (секция `log`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogSettings {
    /// Писать ли логи в stdout.
    pub stdout: bool,
    /// Путь к файлу логов. Родительская директория создаётся при старте.
    pub file: Option<PathBuf>,
    /// Директива `EnvFilter`, например `info` или `info,relaygate=debug`.
    pub level: String,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Json,
    Pretty,
    Compact,
}

impl LogSettings {
    /// Итоговая директива фильтра. В режиме `debug` добавляется подробное
    /// логирование клиента брокера.
    pub fn filter_directive(
        &self,
        debug: bool,
    ) -> String {
        let base = self.level.trim();
        if debug {
            format!("{base},relaygate::broker=debug")
        } else {
            base.to_string()
        }
    }
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            stdout: true,
            file: None,
            level: "info".to_string(),
            format: LogFormat::Json,
        }
    }
}
