// src/channels/mod.rs
pub mod signal;
pub mod task;

use crate::{
    config::Config,
    errors::NodeError,
    sensors::{self, RawReader, Sampler},
};
use sensor_protocol::Mode;
use signal::Signal;
use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use tokio::time::Duration;

/// What the task does after emitting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Next {
    Block,
    Sleep,
}

/// The mode word as the task saw it when a cycle began. Low byte is the
/// mode, the rest a stamp bumped on every transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Observed(u32);

impl Observed {
    pub(crate) fn mode(self) -> Mode {
        mode_of(self.0)
    }
}

fn mode_of(word: u32) -> Mode {
    // only ever stored from a `Mode`
    Mode::from_u8((word & 0xff) as u8).unwrap_or(Mode::Idle)
}

fn transition(word: u32, to: Mode) -> u32 {
    ((word >> 8).wrapping_add(1) << 8) | u32::from(to.as_u8())
}

/// One sensor: its sampling function, how it prints, and its mode.
///
/// Only the mode word changes after construction. The dispatcher writes it,
/// and the task clears a OneShot it has served, so an atomic is enough; no lock.
pub struct Channel {
    id: String,
    prefix: String,
    label: String,
    precision: usize,
    period: Duration,
    mode: AtomicU32,
    signal: Signal,
    sampler: Arc<dyn Sampler>,
    task_attached: AtomicBool,
}

impl Channel {
    pub fn new(
        id: impl Into<String>,
        prefix: impl Into<String>,
        period: Duration,
        sampler: Arc<dyn Sampler>,
    ) -> Self {
        let id = id.into();
        Self {
            label: id.clone(),
            id,
            prefix: prefix.into(),
            precision: 2,
            period,
            mode: AtomicU32::new(u32::from(Mode::Idle.as_u8())),
            signal: Signal::new(),
            sampler,
            task_attached: AtomicBool::new(false),
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    pub fn with_precision(mut self, precision: usize) -> Self {
        self.precision = precision;
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn precision(&self) -> usize {
        self.precision
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    pub fn sampler(&self) -> &dyn Sampler {
        self.sampler.as_ref()
    }

    pub(crate) fn signal(&self) -> &Signal {
        &self.signal
    }

    pub fn mode(&self) -> Mode {
        mode_of(self.mode.load(Ordering::Acquire))
    }

    pub(crate) fn observe(&self) -> Observed {
        Observed(self.mode.load(Ordering::Acquire))
    }

    /// Idle → OneShot and wake the task. Returns false (and changes nothing)
    /// if the channel is already sampling.
    pub fn request_one_shot(&self) -> bool {
        let won = self
            .mode
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |w| {
                (mode_of(w) == Mode::Idle).then(|| transition(w, Mode::OneShot))
            })
            .is_ok();
        if won {
            self.signal.raise();
        }
        won
    }

    /// Enter Continuous; wakes the task only on an actual transition.
    /// Returns the previous mode.
    pub fn start_continuous(&self) -> Mode {
        let prev = self.swap_mode(Mode::Continuous);
        if prev != Mode::Continuous {
            self.signal.raise();
        }
        prev
    }

    /// Back to Idle. An in-flight cycle finishes on its own. Returns the previous mode.
    pub fn stop(&self) -> Mode {
        self.swap_mode(Mode::Idle)
    }

    /// Called by the task after each emission, with the word it saw when the
    /// cycle began. Only the OneShot that cycle served is cleared; a request
    /// accepted after a mid-cycle stop stays set and its raise drives the
    /// next cycle.
    pub(crate) fn complete_cycle(&self, seen: Observed) -> Next {
        loop {
            let now = self.mode.load(Ordering::Acquire);
            match mode_of(now) {
                Mode::OneShot if now != seen.0 => return Next::Block,
                Mode::OneShot => {
                    if self
                        .mode
                        .compare_exchange(now, transition(now, Mode::Idle), Ordering::AcqRel, Ordering::Acquire)
                        .is_ok()
                    {
                        return Next::Block;
                    }
                    // changed under us; look again
                }
                Mode::Continuous => return Next::Sleep,
                Mode::Idle => return Next::Block,
            }
        }
    }

    /// Claim the single task slot.
    pub(crate) fn attach_task(&self) -> Result<(), NodeError> {
        if self.task_attached.swap(true, Ordering::AcqRel) {
            return Err(NodeError::TaskAlreadyAttached(self.id.clone()));
        }
        Ok(())
    }

    fn swap_mode(&self, m: Mode) -> Mode {
        let prev = self
            .mode
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |w| Some(transition(w, m)))
            .unwrap_or_else(|w| w);
        mode_of(prev)
    }
}

impl std::fmt::Debug for Channel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Channel")
            .field("id", &self.id)
            .field("prefix", &self.prefix)
            .field("mode", &self.mode())
            .field("period", &self.period)
            .finish()
    }
}

/// Every channel the node was started with. Built once, shared by `Arc`
/// with the dispatcher and the sampling tasks.
#[derive(Debug)]
pub struct ChannelRegistry {
    channels: Vec<Arc<Channel>>,
}

impl ChannelRegistry {
    pub fn new(channels: Vec<Channel>) -> Result<Self, NodeError> {
        {
            let mut ids = HashSet::new();
            let mut prefixes = HashSet::new();
            for c in &channels {
                if !ids.insert(c.id.as_str()) {
                    return Err(NodeError::Config(format!("duplicate channel id '{}'", c.id)));
                }
                if !prefixes.insert(c.prefix.as_str()) {
                    return Err(NodeError::Config(format!("duplicate channel prefix '{}'", c.prefix)));
                }
            }
        }
        Ok(Self { channels: channels.into_iter().map(Arc::new).collect() })
    }

    pub fn from_config(cfg: &Config, reader: Arc<dyn RawReader>) -> Result<Self, NodeError> {
        let channels = cfg
            .channels
            .iter()
            .map(|c| {
                let sampler = sensors::build_sampler(c.kind, &c.id, reader.clone());
                Channel::new(c.id.clone(), c.prefix.clone(), Duration::from_millis(c.period_ms), sampler)
                    .with_label(c.label.clone())
                    .with_precision(c.precision)
            })
            .collect();
        Self::new(channels)
    }

    pub fn by_prefix(&self, prefix: &str) -> Option<&Arc<Channel>> {
        self.channels.iter().find(|c| c.prefix == prefix)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<Channel>> {
        self.channels.iter()
    }

    pub fn len(&self) -> usize {
        self.channels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }
}
