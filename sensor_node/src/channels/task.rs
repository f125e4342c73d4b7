use super::{Channel, Next};
use crate::{
    errors::NodeError,
    logging::csv::{AuditLog, CycleRecord},
    sink::OutputSink,
};
use sensor_protocol::{Mode, fault_line, sample_line};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant};
use tracing::{debug, warn};

/// Start the one sampling task `channel` may have.
pub fn spawn(
    channel: Arc<Channel>,
    sink: OutputSink,
    audit: Option<AuditLog>,
) -> Result<JoinHandle<()>, NodeError> {
    channel.attach_task()?;
    Ok(tokio::spawn(run(channel, sink, audit)))
}

/// Blocked → Sampling → Emitting → Decide, forever.
///
/// Continuous mode loops on the period without going back through the
/// signal; a stop is seen at the next Decide, after the current cycle has
/// emitted.
async fn run(channel: Arc<Channel>, sink: OutputSink, audit: Option<AuditLog>) {
    let mut seq = 0u64;

    loop {
        channel.signal().wait_and_consume().await;

        let mut last_start: Option<Instant> = None;
        loop {
            let seen = channel.observe();
            let mode = seen.mode();
            if mode == Mode::Idle {
                // stale wake, or stopped before we got here
                break;
            }

            let start = Instant::now();
            let ok = sample_and_emit(&channel, &sink).await;

            let ideal_ms = channel.period().as_secs_f64() * 1000.0;
            let (actual_ms, jitter_ms) = match last_start {
                Some(prev) => {
                    let actual = start.duration_since(prev).as_secs_f64() * 1000.0;
                    (actual, (actual - ideal_ms).abs())
                }
                None => (0.0, 0.0),
            };

            debug!(
                event = "sensor_sample",
                kind = channel.id(),
                seq = seq,
                mode = %mode,
                ok,
                actual_ms = format_args!("{:.3}", actual_ms),
                ideal_ms = format_args!("{:.3}", ideal_ms),
                jitter_ms = format_args!("{:.3}", jitter_ms),
            );

            if let Some(log) = &audit {
                log.log_cycle(CycleRecord {
                    channel: channel.id(),
                    seq,
                    mode,
                    ok,
                    actual_ms,
                    ideal_ms,
                    jitter_ms,
                })
                .await;
            }
            seq = seq.wrapping_add(1);

            match channel.complete_cycle(seen) {
                Next::Block => break,
                Next::Sleep => {
                    // already running; a raise from a promotion must not
                    // turn into an extra cycle later
                    channel.signal().clear();
                    time::sleep(channel.period()).await;
                    last_start = Some(start);
                }
            }
        }
    }
}

/// Returns whether a value (rather than a fault) was emitted.
async fn sample_and_emit(channel: &Channel, sink: &OutputSink) -> bool {
    let (line, ok) = match channel.sampler().sample() {
        Ok(v) => (sample_line(channel.label(), v, channel.precision()), true),
        Err(e) => {
            warn!(channel = channel.id(), error = %e, "sampling fault");
            (fault_line(channel.label(), &e), false)
        }
    };

    if let Err(e) = sink.emit(&line).await {
        warn!(?e, channel = channel.id(), "output sink write failed");
    }
    ok
}
