pub mod config;
pub mod filters;
pub mod formatter;
pub mod handle;
pub mod sinks;

pub use config::{LogFormat, LogSettings};
pub use handle::LoggingHandle;
use relaygate_error::LoggingError;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Устанавливает глобальный subscriber: фильтр, console и file слои.
///
/// Вызывается один раз на процесс. Возвращённый handle нужно закрыть через
/// [`LoggingHandle::shutdown`] перед выходом.
pub fn init_logging(
    settings: &LogSettings,
    debug: bool,
) -> Result<LoggingHandle, LoggingError> {
    let env_filter = filters::build_filter(settings, debug)?;
    let mut layers = Vec::new();

    if settings.stdout {
        layers.push(sinks::console::layer(settings));
    }

    let file_guard = match &settings.file {
        Some(path) => {
            let (file_layer, guard) = sinks::file::layer(path, settings.format)?;
            layers.push(file_layer);
            Some(guard)
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(layers)
        .try_init()
        .map_err(|_| LoggingError::AlreadyInitialized)?;

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        level = %settings.level,
        format = ?settings.format,
        stdout = settings.stdout,
        file = ?settings.file,
        "logging initialized"
    );

    Ok(LoggingHandle::new(file_guard))
}
