use crate::config::toml::ConfigToml;
use crate::config::toml::log::{AppenderRollingFile, LoggingStyle};
use anyhow::Context as _;
use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::Layer;

/// Install the global subscriber.
///
/// `log_dir` is the resolved directory of the rolling file appender, if configured.
pub(crate) fn init(config: &mut ConfigToml, log_dir: Option<&Path>) -> Result<Guard, anyhow::Error> {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    let stderr = &mut config.log.stderr;
    let err_layer = if stderr.enabled {
        // EnvFilter missing Clone
        let env_filter = std::mem::take(&mut stderr.level).0;

        // Code repetition because of https://github.com/tokio-rs/tracing/issues/575
        Some(match stderr.style {
            LoggingStyle::Plain => tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(stderr.target)
                .with_span_events(stderr.span.into())
                .with_filter(env_filter)
                .boxed(),
            LoggingStyle::PlainCompact => tracing_subscriber::fmt::layer()
                .compact()
                .with_writer(std::io::stderr)
                .with_target(stderr.target)
                .with_span_events(stderr.span.into())
                .with_filter(env_filter)
                .boxed(),
            LoggingStyle::Json => tracing_subscriber::fmt::layer()
                .json()
                .with_writer(std::io::stderr)
                .with_target(stderr.target)
                .with_span_events(stderr.span.into())
                .with_filter(env_filter)
                .boxed(),
        })
    } else {
        None
    };

    let (file_layer, file_guard) = match (config.log.file.as_mut(), log_dir) {
        (Some(file), Some(log_dir)) => {
            let (writer, guard) = rolling_file_writer(file, log_dir)?;
            let env_filter = std::mem::take(&mut file.level).0;
            let layer = match file.style {
                LoggingStyle::Plain => tracing_subscriber::fmt::layer()
                    .with_ansi(false)
                    .with_writer(writer)
                    .with_target(file.target)
                    .with_span_events(file.span.into())
                    .with_filter(env_filter)
                    .boxed(),
                LoggingStyle::PlainCompact => tracing_subscriber::fmt::layer()
                    .compact()
                    .with_ansi(false)
                    .with_writer(writer)
                    .with_target(file.target)
                    .with_span_events(file.span.into())
                    .with_filter(env_filter)
                    .boxed(),
                LoggingStyle::Json => tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(writer)
                    .with_target(file.target)
                    .with_span_events(file.span.into())
                    .with_filter(env_filter)
                    .boxed(),
            };
            (Some(layer), Some(guard))
        }
        _ => (None, None),
    };

    tracing_subscriber::registry()
        .with(err_layer)
        .with(file_layer)
        .try_init()
        .context("cannot install the tracing subscriber")?;

    std::panic::set_hook(Box::new(utils::tracing_panic_hook));
    Ok(Guard {
        _file_guard: file_guard,
    })
}

fn rolling_file_writer(
    file: &AppenderRollingFile,
    log_dir: &Path,
) -> Result<
    (
        tracing_appender::non_blocking::NonBlocking,
        WorkerGuard,
    ),
    anyhow::Error,
> {
    let appender = tracing_appender::rolling::RollingFileAppender::builder()
        .rotation(file.rotation.into())
        .filename_prefix(&file.prefix)
        .build(log_dir)
        .with_context(|| format!("cannot create the rolling file appender in {log_dir:?}"))?;
    Ok(tracing_appender::non_blocking(appender))
}

/// Flushes the rolling file appender when dropped.
pub(crate) struct Guard {
    _file_guard: Option<WorkerGuard>,
}
