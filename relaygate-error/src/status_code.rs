use std::fmt;

use num_enum::TryFromPrimitive;

/// Коды статуса для категоризации ошибок шлюза.
///
/// # Диапазоны:
/// - 0xxx: Успех
/// - 1xxx: Общие ошибки
/// - 2xxx: Ошибки данных и валидации запроса
/// - 5xxx: Сериализация
/// - 6xxx: Сеть / IO
/// - 9xxx: Брокер и жизненный цикл процесса
///
/// `num_enum::TryFromPrimitive` даёт нативную реализацию `TryFrom<u32>`,
/// что позволяет восстановить код из числового поля `code` HTTP-ответа.
#[derive(Debug, Clone, Copy, PartialEq, Eq, TryFromPrimitive)]
#[repr(u32)]
#[non_exhaustive]
pub enum StatusCode {
    // === 0xxx: Успех ===
    Success = 0,

    // === 1xxx: Общие ошибки ===
    Unknown = 1000,
    Unsupported = 1001,
    Unexpected = 1002,
    Internal = 1003,
    InvalidArgs = 1004,

    // === 2xxx: Ошибки данных ===
    NotFound = 2000,
    InvalidValue = 2004,
    InvalidData = 2009,
    MissingField = 2010,

    // === 5xxx: Сериализация ===
    SerializationFailed = 5003,
    DeserializationFailed = 5004,

    // === 6xxx: Сеть/IO ===
    Io = 6000,
    ConnectionClosed = 6001,
    Timeout = 6002,
    ConnectionFailed = 6004,
    AddressInUse = 6008,

    // === 9xxx: Брокер / жизненный цикл ===
    PublishFailed = 9000,
    SubscribeFailed = 9001,
    AckFailed = 9002,
    BrokerClosed = 9003,
    BrokerUnavailable = 9004,
    ConfigInvalid = 9100,
    ShutdownTimeout = 9101,
    ServeFailed = 9102,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

////////////////////////////////////////////////////////////////////////////////
// Собственные методы
////////////////////////////////////////////////////////////////////////////////

impl StatusCode {
    /// Числовое представление кода статуса.
    pub const fn code(self) -> u32 {
        self as u32
    }

    /// Рекомендуемый уровень логирования для данного кода.
    pub fn log_level(&self) -> LogLevel {
        match self {
            Self::Success => LogLevel::Trace,
            Self::NotFound => LogLevel::Debug,
            Self::InvalidArgs | Self::InvalidValue | Self::InvalidData | Self::MissingField => {
                LogLevel::Info
            }
            Self::Timeout | Self::ConnectionClosed | Self::BrokerClosed | Self::AckFailed => {
                LogLevel::Warn
            }
            Self::Internal
            | Self::PublishFailed
            | Self::SubscribeFailed
            | Self::ConfigInvalid
            | Self::ShutdownTimeout
            | Self::ServeFailed => LogLevel::Error,
            _ => LogLevel::Warn,
        }
    }

    /// HTTP-статус, соответствующий коду статуса.
    ///
    /// Публикация отвечает только 200, 400 или 500: ошибки брокера и
    /// кодирования для клиента всегда внутренние.
    pub fn http_status(&self) -> u16 {
        match self {
            Self::Success => 200,
            Self::InvalidArgs | Self::InvalidValue | Self::InvalidData | Self::MissingField => 400,
            Self::NotFound => 404,
            _ => 500,
        }
    }
}

////////////////////////////////////////////////////////////////////////////////
// Общие реализации трейтов для StatusCode
////////////////////////////////////////////////////////////////////////////////

impl From<StatusCode> for u32 {
    fn from(c: StatusCode) -> Self {
        c.code()
    }
}

impl fmt::Display for StatusCode {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        write!(f, "{:?} ({})", self, self.code())
    }
}

////////////////////////////////////////////////////////////////////////////////
// Тесты
////////////////////////////////////////////////////////////////////////////////
