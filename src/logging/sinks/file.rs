use std::{fs, path::Path};

use relaygate_error::LoggingError;
use tracing_appender::{
    non_blocking,
    non_blocking::WorkerGuard,
    rolling::{RollingFileAppender, Rotation},
};
use tracing_subscriber::registry::LookupSpan;

use crate::logging::{
    config::LogFormat,
    formatter::{self, BoxedLayer},
};

/// File layer через неблокирующий writer. Родительская директория
/// создаётся, если её нет. Файл не ротируется.
pub fn layer<S>(
    path: &Path,
    format: LogFormat,
) -> Result<(BoxedLayer<S>, WorkerGuard), LoggingError>
where
    S: tracing::Subscriber + for<'a> LookupSpan<'a>,
{
    let file_error = |reason: String| LoggingError::File {
        path: path.display().to_string(),
        reason,
    };

    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| file_error("path has no file name".to_string()))?;

    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    fs::create_dir_all(dir).map_err(|e| file_error(e.to_string()))?;

    let appender = RollingFileAppender::builder()
        .rotation(Rotation::NEVER)
        .filename_prefix(file_name)
        .build(dir)
        .map_err(|e| file_error(e.to_string()))?;
    let (writer, guard) = non_blocking(appender);

    Ok((formatter::build_formatter(format, writer, false), guard))
}
