use bytes::Bytes;
use relaygate_error::EncodeError;
use serde_json::Value;
use uuid::Uuid;

/// Тело сообщения из запроса на публикацию.
#[derive(Debug, Clone, PartialEq)]
pub enum MessageBody {
    /// JSON-строка: отправляется как есть, без кавычек.
    Text(String),
    /// Любое другое JSON-значение.
    Structured(Value),
}

impl From<Value> for MessageBody {
    fn from(value: Value) -> Self {
        match value {
            Value::String(s) => Self::Text(s),
            other => Self::Structured(other),
        }
    }
}

/// Кодирует тело в полезную нагрузку брокера.
///
/// Строка превращается в свои UTF-8 байты, остальное в компактный JSON.
pub fn encode(body: &MessageBody) -> Result<Bytes, EncodeError> {
    match body {
        MessageBody::Text(s) => Ok(Bytes::copy_from_slice(s.as_bytes())),
        MessageBody::Structured(v) => Ok(Bytes::from(serde_json::to_vec(v)?)),
    }
}

/// Новый идентификатор попытки публикации (UUID v4).
pub fn new_message_id() -> String {
    Uuid::new_v4().to_string()
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use serde_json::json;

    use super::*;

    /// Тест проверяет, что строка кодируется в свои байты без кавычек и
    /// экранирования.
    #[test]
    fn test_text_is_literal() {
        let body = MessageBody::from(json!("hello \"world\"\n"));
        assert_eq!(body, MessageBody::Text("hello \"world\"\n".to_string()));
        assert_eq!(
            encode(&body).unwrap(),
            Bytes::from_static(b"hello \"world\"\n")
        );

        let empty = MessageBody::Text(String::new());
        assert!(encode(&empty).unwrap().is_empty());
    }

    /// Тест проверяет, что структурированное значение кодируется в компактный
    /// JSON и декодируется обратно в то же значение.
    #[test]
    fn test_structured_is_json() {
        let value = json!({"a": 1, "nested": {"list": [1, 2, 3]}});
        let payload = encode(&MessageBody::from(value.clone())).unwrap();
        assert!(!payload.contains(&b' '));
        let back: Value = serde_json::from_slice(&payload).unwrap();
        assert_eq!(back, value);
    }

    #[test]
    fn test_scalars_are_structured() {
        for (value, expected) in [
            (json!(42), "42"),
            (json!(true), "true"),
            (Value::Null, "null"),
            (json!([1, "x"]), "[1,\"x\"]"),
        ] {
            let body = MessageBody::from(value);
            assert!(matches!(body, MessageBody::Structured(_)));
            assert_eq!(encode(&body).unwrap(), Bytes::from(expected));
        }
    }

    #[test]
    fn test_message_ids_are_unique_uuids() {
        let ids: HashSet<String> = (0..1000).map(|_| new_message_id()).collect();
        assert_eq!(ids.len(), 1000);
        for id in ids.iter().take(10) {
            let parsed = Uuid::parse_str(id).unwrap();
            assert_eq!(parsed.get_version_num(), 4);
        }
    }
}
