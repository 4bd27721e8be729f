use tracing_subscriber::registry::LookupSpan;

use crate::logging::{
    config::{LogFormat, LogSettings},
    formatter::{self, BoxedLayer},
};

/// Console layer в stdout. ANSI-цвета включаются только для терминала и не
/// для JSON.
pub fn layer<S>(settings: &LogSettings) -> BoxedLayer<S>
where
    S: tracing::Subscriber + for<'a> LookupSpan<'a>,
{
    let with_ansi = settings.format != LogFormat::Json && atty::is(atty::Stream::Stdout);
    formatter::build_formatter(
        settings.format,
        std::io::stdout as fn() -> std::io::Stdout,
        with_ansi,
    )
}
