// node.rs: builds the registry, starts one task per channel, owns the dispatcher
use crate::{
    channels::{ChannelRegistry, task},
    commands::Dispatcher,
    config::Config,
    errors::NodeError,
    health::info::FactSource,
    logging::csv::AuditLog,
    sensors::{RawReader, adc::SimulatedAdc},
    sink::OutputSink,
};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{info, warn};

pub struct Node {
    registry: Arc<ChannelRegistry>,
    dispatcher: Dispatcher,
    tasks: Vec<JoinHandle<()>>,
}

impl Node {
    /// Everything that can fail at startup fails here, before any command is read.
    /// Must be called inside a tokio runtime.
    pub fn start(
        cfg: &Config,
        reader: Arc<dyn RawReader>,
        sink: OutputSink,
        facts: Arc<dyn FactSource>,
    ) -> Result<Self, NodeError> {
        let registry = Arc::new(ChannelRegistry::from_config(cfg, reader)?);
        let audit = cfg.csv_dir.as_ref().map(AuditLog::new);

        let tasks = spawn_all(&registry, &sink, &audit)?;
        let dispatcher = Dispatcher::new(registry.clone(), sink, facts).with_audit(audit);
        Ok(Self { registry, dispatcher, tasks })
    }

    pub fn registry(&self) -> &Arc<ChannelRegistry> {
        &self.registry
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    /// Abort every sampling task and wait for them to go.
    pub async fn shutdown(self) {
        for t in &self.tasks {
            t.abort();
        }
        futures::future::join_all(self.tasks).await;
    }
}

/// One task per channel. If any spawn fails, the ones already running are
/// aborted before the error is returned.
fn spawn_all(
    registry: &ChannelRegistry,
    sink: &OutputSink,
    audit: &Option<AuditLog>,
) -> Result<Vec<JoinHandle<()>>, NodeError> {
    let mut tasks = Vec::with_capacity(registry.len());
    for ch in registry.iter() {
        match task::spawn(ch.clone(), sink.clone(), audit.clone()) {
            Ok(h) => tasks.push(h),
            Err(e) => {
                warn!(channel = ch.id(), error = %e, "sampling task failed to start");
                for t in &tasks {
                    t.abort();
                }
                return Err(e);
            }
        }
        info!(
            channel = ch.id(),
            prefix = ch.prefix(),
            period_ms = ch.period().as_millis() as u64,
            "sampling task started"
        );
    }
    Ok(tasks)
}

/// ADC stand-in with a noise profile per configured channel.
pub fn simulated_adc(cfg: &Config) -> Result<SimulatedAdc, NodeError> {
    let mut adc = SimulatedAdc::new(cfg.seed);
    for c in &cfg.channels {
        adc.register(&c.id, c.kind)
            .map_err(|e| NodeError::Config(format!("channel '{}': {e}", c.id)))?;
    }
    Ok(adc)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::run_console;
    use crate::config::default_channels;
    use crate::health::info::testing::{FixedFacts, board};
    use crate::sink::testing::Capture;
    use sensor_protocol::Mode;
    use tokio::io::BufReader;
    use tokio::time::{self, Duration};

    fn cfg() -> Config {
        Config { channels: default_channels(100), seed: Some(1), log_dir: None, csv_dir: None }
    }

    fn start(cap: &Capture) -> Node {
        let cfg = cfg();
        let adc = simulated_adc(&cfg).unwrap();
        Node::start(&cfg, Arc::new(adc), OutputSink::new(cap.clone()), Arc::new(FixedFacts(board()))).unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn console_session_against_simulated_board() {
        let cap = Capture::default();
        let node = start(&cap);

        let input = tokio_test::io::Builder::new().read(b"info\ntm\nam 1\n").build();
        run_console(BufReader::new(input), node.dispatcher()).await.unwrap();
        time::sleep(Duration::from_millis(450)).await;

        let lines = cap.lines();
        assert_eq!(lines[0], "System information:");
        assert_eq!(cap.lines_starting_with("temperature: "), 1);
        assert!(cap.lines_starting_with("audio-level: ") >= 4);
        let temp: f64 = lines
            .iter()
            .find_map(|l| l.strip_prefix("temperature: "))
            .unwrap()
            .parse()
            .unwrap();
        assert!((0.0..50.0).contains(&temp), "simulated room temperature, got {temp}");

        assert_eq!(node.registry().by_prefix("tm").unwrap().mode(), Mode::Idle);
        assert_eq!(node.registry().by_prefix("am").unwrap().mode(), Mode::Continuous);
        node.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn failed_start_leaves_no_task_running() {
        let cfg = cfg();
        let registry = ChannelRegistry::from_config(&cfg, Arc::new(simulated_adc(&cfg).unwrap())).unwrap();
        // second channel already has its task
        registry.by_prefix("am").unwrap().attach_task().unwrap();

        let cap = Capture::default();
        let res = spawn_all(&registry, &OutputSink::new(cap.clone()), &None);
        assert!(matches!(res, Err(NodeError::TaskAlreadyAttached(id)) if id == "audio-level"));

        let tm = registry.by_prefix("tm").unwrap();
        assert!(tm.request_one_shot());
        time::sleep(Duration::from_millis(500)).await;
        assert!(cap.text().is_empty(), "an aborted task must not sample");
        assert_eq!(tm.mode(), Mode::OneShot);
    }

    #[tokio::test]
    async fn audit_files_follow_the_session() {
        let dir = std::env::temp_dir().join(format!("sensor-node-session-{}", std::process::id()));
        let cfg = Config { csv_dir: Some(dir.clone()), ..cfg() };
        let cap = Capture::default();
        let node = Node::start(
            &cfg,
            Arc::new(simulated_adc(&cfg).unwrap()),
            OutputSink::new(cap.clone()),
            Arc::new(FixedFacts(board())),
        )
        .unwrap();

        node.dispatcher().dispatch("tm").await.unwrap();
        node.dispatcher().dispatch("nope").await.unwrap();
        // the task clears OneShot only after its cycle row is written
        let tm = node.registry().by_prefix("tm").unwrap().clone();
        time::timeout(Duration::from_secs(2), async {
            while tm.mode() != Mode::Idle {
                time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .unwrap();
        node.shutdown().await;

        let commands = std::fs::read_to_string(dir.join("commands.csv")).unwrap();
        assert!(commands.contains(",tm,one_shot_requested"));
        assert!(commands.contains(",nope,rejected"));
        let cycles = std::fs::read_to_string(dir.join("cycles.csv")).unwrap();
        assert!(cycles.contains(",temperature,0,one_shot,ok,"));
        assert!(!cycles.contains("temperature: "), "values are not persisted");

        let _ = std::fs::remove_dir_all(&dir);
    }
}
