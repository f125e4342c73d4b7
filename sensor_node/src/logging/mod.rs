pub mod csv;

use anyhow::Result;
use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Diagnostics go to stderr (stdout is the output sink), plus a daily file
/// under `log_dir` when given. Keep the guard alive for the whole run or the
/// file writer stops flushing.
pub fn init_tracing(log_dir: Option<&Path>) -> Result<Option<WorkerGuard>> {
    let filter = EnvFilter::from_default_env()
        .add_directive("sensor_node=info".parse()?)
        .add_directive("sensor_protocol=info".parse()?)
        .add_directive("tokio=warn".parse()?);

    let Some(dir) = log_dir else {
        fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .compact()
            .try_init()
            .map_err(|e| anyhow::anyhow!(e))?;
        return Ok(None);
    };

    let (file_writer, guard) = tracing_appender::non_blocking(tracing_appender::rolling::daily(dir, "sensor_node.log"));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact().with_writer(std::io::stderr))
        .with(fmt::layer().with_ansi(false).with_writer(file_writer))
        .try_init()?;
    Ok(Some(guard))
}
