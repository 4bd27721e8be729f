use std::{any::Any, error::Error};

use crate::StatusCode;

/// Расширение для ошибок шлюза (object-safe).
///
/// Даёт статус-код ошибки и безопасное сообщение для HTTP-клиента.
pub trait ErrorExt: Error + Send + Sync + 'static {
    /// Статус ошибки. По умолчанию [`StatusCode::Internal`].
    fn status_code(&self) -> StatusCode {
        StatusCode::Internal
    }

    /// Возвращает ошибку как [`Any`](std::any::Any) для downcast.
    fn as_any(&self) -> &dyn Any;

    /// Безопасное сообщение для клиента.
    ///
    /// Для внутренних кодов возвращает `"Internal server error"`, чтобы не
    /// раскрывать детали реализации.
    fn client_message(&self) -> String {
        match self.status_code() {
            StatusCode::Unknown | StatusCode::Internal | StatusCode::Unexpected => {
                "Internal server error".to_string()
            }
            _ => self.to_string(),
        }
    }
}
