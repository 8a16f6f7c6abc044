use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Initialize structured logging. `RUST_LOG` wins; otherwise `LOG_LEVEL`
/// (or "info") seeds the filter.
pub fn init_tracing(log_level: Option<&str>) {
    let default_level = log_level.unwrap_or("info");
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("{default_level},actix_web=info")));

    let fmt_layer = fmt::layer()
        .with_target(false)
        .with_file(false)
        .with_line_number(false)
        .with_thread_ids(false)
        .with_thread_names(false)
        .with_ansi(false)
        .json();

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .init();
}
