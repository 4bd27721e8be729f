use tracing_subscriber::EnvFilter;

use relaygate_error::LoggingError;

use crate::logging::config::LogSettings;

/// Разбирает директиву фильтра без обращения к `RUST_LOG`.
pub fn parse_directive(directive: &str) -> Result<EnvFilter, LoggingError> {
    if directive.trim().is_empty() {
        return Err(LoggingError::InvalidDirective {
            directive: directive.to_string(),
            reason: "empty directive".to_string(),
        });
    }

    EnvFilter::builder()
        .parse(directive)
        .map_err(|e| LoggingError::InvalidDirective {
            directive: directive.to_string(),
            reason: e.to_string(),
        })
}

/// Фильтр из `RUST_LOG`, если переменная задана и корректна, иначе из
/// настроек.
pub fn build_filter(
    settings: &LogSettings,
    debug: bool,
) -> Result<EnvFilter, LoggingError> {
    match EnvFilter::try_from_default_env() {
        Ok(env_filter) => Ok(env_filter),
        Err(_) => parse_directive(&settings.filter_directive(debug)),
    }
}

#[cfg(test)]
mod tests {
    use std::{
        env,
        sync::{Arc, Mutex},
    };

    use serial_test::serial;
    use tracing_subscriber::{fmt, prelude::*, registry::Registry};

    use super::*;

    // Мини-буферный writer для тестов
    #[derive(Clone)]
    struct VecMakeWriter(Arc<Mutex<Vec<u8>>>);

    impl<'a> fmt::MakeWriter<'a> for VecMakeWriter {
        type Writer = VecWriterGuard;

        fn make_writer(&'a self) -> Self::Writer {
            VecWriterGuard(self.0.clone())
        }
    }

    struct VecWriterGuard(Arc<Mutex<Vec<u8>>>);

    impl std::io::Write for VecWriterGuard {
        fn write(
            &mut self,
            buf: &[u8],
        ) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_parse_directive_rejects_garbage() {
        assert!(parse_directive("info").is_ok());
        assert!(parse_directive("warn,relaygate::consumer=debug").is_ok());
        assert!(matches!(
            parse_directive(""),
            Err(LoggingError::InvalidDirective { .. })
        ));
        assert!(matches!(
            parse_directive("relaygate=loud"),
            Err(LoggingError::InvalidDirective { .. })
        ));
    }

    /// Тест проверяет, что некорректная директива из настроек даёт ошибку,
    /// а не молча заменяется на `info`.
    #[test]
    #[serial]
    fn test_build_filter_invalid_settings() {
        env::remove_var("RUST_LOG");
        let settings = LogSettings {
            level: "relaygate=loud".to_string(),
            ..Default::default()
        };
        assert!(build_filter(&settings, false).is_err());
    }

    /// Тест проверяет поведение фильтра в runtime: при уровне `warn` события
    /// `info` отбрасываются, а `warn` проходят.
    #[test]
    #[serial]
    fn test_filter_drops_lower_levels() {
        env::remove_var("RUST_LOG");
        let settings = LogSettings {
            level: "warn".to_string(),
            ..Default::default()
        };
        let filter = build_filter(&settings, false).unwrap();

        let buffer = Arc::new(Mutex::new(Vec::new()));
        let layer = fmt::layer()
            .with_writer(VecMakeWriter(buffer.clone()))
            .with_ansi(false)
            .with_filter(filter);
        let subscriber = Registry::default().with(layer);

        tracing::subscriber::with_default(subscriber, || {
            tracing::info!("info message filtered out");
            tracing::warn!("warn message passes");
        });

        let out = buffer.lock().unwrap();
        let s = String::from_utf8_lossy(&out);
        assert!(s.contains("warn message passes"));
        assert!(!s.contains("info message filtered out"));
    }
}
