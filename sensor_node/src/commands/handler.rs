use crate::{
    channels::{Channel, ChannelRegistry},
    errors::NodeError,
    health::info::FactSource,
    logging::csv::AuditLog,
    sink::OutputSink,
};
use sensor_protocol::{ChannelAction, CommandError, Mode, PendingCommand, error_line};
use std::sync::Arc;
use tracing::{debug, info};

/// What a dispatched line did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Blank,
    Info,
    OneShotRequested,
    /// `<prefix>` while already sampling: ignored.
    AlreadySampling,
    ContinuousStarted,
    AlreadyContinuous,
    Stopped,
    AlreadyIdle,
    Rejected,
}

impl Outcome {
    pub fn as_str(self) -> &'static str {
        match self {
            Outcome::Blank => "blank",
            Outcome::Info => "info",
            Outcome::OneShotRequested => "one_shot_requested",
            Outcome::AlreadySampling => "already_sampling",
            Outcome::ContinuousStarted => "continuous_started",
            Outcome::AlreadyContinuous => "already_continuous",
            Outcome::Stopped => "stopped",
            Outcome::AlreadyIdle => "already_idle",
            Outcome::Rejected => "rejected",
        }
    }
}

enum Request {
    Info,
    Channel(Arc<Channel>, ChannelAction),
}

/// Turns command lines into mode changes. Runs on the main context; never
/// waits on a sampling task.
pub struct Dispatcher {
    registry: Arc<ChannelRegistry>,
    sink: OutputSink,
    facts: Arc<dyn FactSource>,
    audit: Option<AuditLog>,
}

impl Dispatcher {
    pub fn new(registry: Arc<ChannelRegistry>, sink: OutputSink, facts: Arc<dyn FactSource>) -> Self {
        Self { registry, sink, facts, audit: None }
    }

    pub fn with_audit(mut self, audit: Option<AuditLog>) -> Self {
        self.audit = audit;
        self
    }

    /// Handle one line. Only a sink write failure is an error; a bad command
    /// is answered with one `error:` line and `Outcome::Rejected`.
    pub async fn dispatch(&self, line: &str) -> Result<Outcome, NodeError> {
        let outcome = match self.classify(line) {
            Ok(None) => return Ok(Outcome::Blank),
            Ok(Some(Request::Info)) => {
                self.sink.emit_lines(self.facts.collect().lines()).await?;
                Outcome::Info
            }
            Ok(Some(Request::Channel(ch, action))) => {
                let outcome = apply(&ch, action);
                info!(channel = ch.id(), outcome = outcome.as_str(), mode = %ch.mode(), "command applied");
                outcome
            }
            Err(e) => {
                debug!(line = line.trim(), reason = %e, "command rejected");
                self.sink.emit(&error_line(&e)).await?;
                Outcome::Rejected
            }
        };

        if let Some(log) = &self.audit {
            log.log_command(line.trim(), outcome.as_str()).await;
        }
        Ok(outcome)
    }

    fn classify(&self, line: &str) -> Result<Option<Request>, CommandError> {
        let Some(cmd) = PendingCommand::parse(line)? else {
            return Ok(None);
        };

        if cmd.is_info() {
            return match cmd.arg {
                None => Ok(Some(Request::Info)),
                Some(_) => Err(CommandError::UnexpectedArgument { verb: cmd.verb.to_string() }),
            };
        }

        let ch = self
            .registry
            .by_prefix(cmd.verb)
            .ok_or_else(|| CommandError::UnknownVerb(cmd.verb.to_string()))?;
        let action = cmd.channel_action()?;
        Ok(Some(Request::Channel(ch.clone(), action)))
    }
}

fn apply(ch: &Channel, action: ChannelAction) -> Outcome {
    match action {
        ChannelAction::Sample => {
            if ch.request_one_shot() {
                Outcome::OneShotRequested
            } else {
                Outcome::AlreadySampling
            }
        }
        ChannelAction::Start => match ch.start_continuous() {
            Mode::Continuous => Outcome::AlreadyContinuous,
            _ => Outcome::ContinuousStarted,
        },
        ChannelAction::Stop => match ch.stop() {
            Mode::Idle => Outcome::AlreadyIdle,
            _ => Outcome::Stopped,
        },
    }
}
