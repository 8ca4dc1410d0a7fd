use {
    crate::Config,
    std::{io::IsTerminal, panic::PanicHookInfo, sync::Once},
    time::macros::format_description,
    tracing::{Level, Metadata, level_filters::LevelFilter},
    tracing_subscriber::{
        EnvFilter,
        Layer,
        fmt::{time::UtcTime, writer::MakeWriterExt},
        prelude::*,
        util::SubscriberInitExt,
    },
};

/// Initializes the tracing setup shared by the binaries.
/// `env_filter` has similar syntax to env_logger. It is documented at
/// https://docs.rs/tracing-subscriber/latest/tracing_subscriber/filter/struct.EnvFilter.html
pub fn initialize(config: &Config) {
    set_tracing_subscriber(config);
    std::panic::set_hook(Box::new(tracing_panic_hook));
}

/// Like [`initialize`], but can be called multiple times in a row. Later calls
/// are ignored.
///
/// Useful for tests.
pub fn initialize_reentrant(env_filter: &str) {
    // The tracing subscriber below is a global object so initializing it again
    // in the same process by a different thread would fail.
    static ONCE: Once = Once::new();
    ONCE.call_once(|| {
        initialize(&Config::default().with_env_filter(env_filter));
    });
}

fn set_tracing_subscriber(config: &Config) {
    let stderr_threshold = config.stderr_threshold;
    let writer = MakeWriterExt::with_filter(std::io::stdout, move |meta: &Metadata<'_>| {
        writes_to_stdout(meta.level(), stderr_threshold)
    })
    .or_else(std::io::stderr);
    let timer = UtcTime::new(format_description!(
        "[year]-[month]-[day]T[hour]:[minute]:[second].[subsecond digits:3]Z"
    ));

    let fmt_layer = if config.use_json_format {
        tracing_subscriber::fmt::layer()
            .json()
            .with_writer(writer)
            .with_timer(timer)
            .boxed()
    } else {
        tracing_subscriber::fmt::layer()
            .with_writer(writer)
            .with_timer(timer)
            .with_ansi(std::io::stdout().is_terminal())
            .boxed()
    };

    tracing_subscriber::registry()
        .with(LevelFilter::TRACE)
        .with(fmt_layer.with_filter(EnvFilter::new(&config.env_filter)))
        .init();
}

/// Events at or above the threshold go to stderr, more verbose ones to stdout.
/// A `TRACE` threshold keeps stdout free of logs, `OFF` sends everything there.
fn writes_to_stdout(level: &Level, stderr_threshold: LevelFilter) -> bool {
    *level > stderr_threshold
}

/// Panic hook that prints roughly the same message as the default panic hook
/// but uses tracing:error instead of stderr.
fn tracing_panic_hook(panic: &PanicHookInfo) {
    let thread = std::thread::current();
    let name = thread.name().unwrap_or("<unnamed>");
    let backtrace = std::backtrace::Backtrace::force_capture();
    tracing::error!("thread '{name}' {panic}\nstack backtrace:\n{backtrace}");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn routes_events_by_threshold() {
        assert!(writes_to_stdout(&Level::DEBUG, LevelFilter::INFO));
        assert!(!writes_to_stdout(&Level::INFO, LevelFilter::INFO));
        assert!(!writes_to_stdout(&Level::ERROR, LevelFilter::INFO));

        for level in [Level::TRACE, Level::DEBUG, Level::INFO, Level::WARN, Level::ERROR] {
            assert!(!writes_to_stdout(&level, LevelFilter::TRACE), "{level}");
            assert!(writes_to_stdout(&level, LevelFilter::OFF), "{level}");
        }
    }
}
