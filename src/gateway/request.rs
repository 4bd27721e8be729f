use relaygate_error::RequestError;
use serde_json::Value;

use super::MessageBody;

/// Разобранный запрос `POST /publish`.
#[derive(Debug, Clone, PartialEq)]
pub struct PublishRequest {
    pub topic: String,
    pub message: MessageBody,
}

impl PublishRequest {
    /// Разбирает сырое тело запроса.
    ///
    /// Тело должно быть JSON-объектом с непустой строкой `topic`. Отсутствующее
    /// поле `message` равно `null`.
    pub fn from_slice(body: &[u8]) -> Result<Self, RequestError> {
        let value: Value =
            serde_json::from_slice(body).map_err(|e| RequestError::MalformedBody {
                reason: e.to_string(),
            })?;

        let Value::Object(mut fields) = value else {
            return Err(RequestError::MalformedBody {
                reason: "expected a JSON object".to_string(),
            });
        };

        let topic = match fields.remove("topic") {
            None | Some(Value::Null) => return Err(RequestError::MissingTopic),
            Some(Value::String(topic)) => topic,
            Some(_) => {
                return Err(RequestError::MalformedBody {
                    reason: "field `topic` must be a string".to_string(),
                })
            }
        };
        if topic.is_empty() {
            return Err(RequestError::MissingTopic);
        }

        let message = fields.remove("message").unwrap_or(Value::Null).into();
        Ok(Self { topic, message })
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_parse_text_and_structured() {
        let req = PublishRequest::from_slice(br#"{"topic":"t","message":"hello"}"#).unwrap();
        assert_eq!(req.topic, "t");
        assert_eq!(req.message, MessageBody::Text("hello".to_string()));

        let req = PublishRequest::from_slice(br#"{"topic":"t","message":{"a":1}}"#).unwrap();
        assert_eq!(req.message, MessageBody::Structured(json!({"a": 1})));
    }

    #[test]
    fn test_missing_message_is_null() {
        let req = PublishRequest::from_slice(br#"{"topic":"t"}"#).unwrap();
        assert_eq!(req.message, MessageBody::Structured(Value::Null));
    }

    /// Тест проверяет все варианты отказа при разборе тела.
    #[test]
    fn test_rejections() {
        assert_eq!(
            PublishRequest::from_slice(b"{}"),
            Err(RequestError::MissingTopic)
        );
        assert_eq!(
            PublishRequest::from_slice(br#"{"topic":"","message":"x"}"#),
            Err(RequestError::MissingTopic)
        );
        assert_eq!(
            PublishRequest::from_slice(br#"{"topic":null}"#),
            Err(RequestError::MissingTopic)
        );
        for body in [&b"not json"[..], b"", b"[1,2]", b"\"t\"", br#"{"topic":5}"#] {
            assert!(
                matches!(
                    PublishRequest::from_slice(body),
                    Err(RequestError::MalformedBody { .. })
                ),
                "body {:?}",
                String::from_utf8_lossy(body)
            );
        }
    }
}
