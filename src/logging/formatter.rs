use tracing_subscriber::{
    fmt::{self, time::ChronoUtc, MakeWriter},
    layer::Layer as LayerTrait,
    registry::LookupSpan,
};

use crate::logging::config::LogFormat;

/// Слой форматирования с стёртым типом.
pub type BoxedLayer<S> = Box<dyn LayerTrait<S> + Send + Sync>;

/// Собирает fmt-слой для выбранного формата и writer'а.
///
/// Время всегда в UTC (RFC3339). JSON пишет поля события на верхнем уровне
/// записи.
pub fn build_formatter<S, W>(
    format: LogFormat,
    writer: W,
    with_ansi: bool,
) -> BoxedLayer<S>
where
    S: tracing::Subscriber + for<'a> LookupSpan<'a>,
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    match format {
        LogFormat::Json => Box::new(
            fmt::layer()
                .json()
                .flatten_event(true)
                .with_current_span(true)
                .with_span_list(false)
                .with_timer(ChronoUtc::rfc_3339())
                .with_target(true)
                .with_writer(writer)
                .with_ansi(false),
        ),
        LogFormat::Pretty => Box::new(
            fmt::layer()
                .pretty()
                .with_timer(ChronoUtc::rfc_3339())
                .with_target(true)
                .with_line_number(true)
                .with_writer(writer)
                .with_ansi(with_ansi),
        ),
        LogFormat::Compact => Box::new(
            fmt::layer()
                .compact()
                .with_timer(ChronoUtc::rfc_3339())
                .with_target(true)
                .with_writer(writer)
                .with_ansi(with_ansi),
        ),
    }
}
