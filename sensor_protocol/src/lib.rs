// lib.rs: Line protocol spoken between a console and the sensor node

use std::fmt;
use thiserror::Error;

// =============================== Common =====================================

/// Verb that dumps system facts instead of addressing a channel.
pub const INFO_VERB: &str = "info";

/// Sampling period used when a channel does not configure its own (1s, as on the board).
pub const DEFAULT_PERIOD_MS: u64 = 1000;

/// A command line is a verb plus at most one argument.
const MAX_TOKENS: usize = 2;

// =============================== Enums ======================================

/// Sampling mode of a channel.
///
/// Stored in an `AtomicU8` on the node, hence the explicit discriminants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(u8)]
pub enum Mode {
    #[default]
    Idle = 0,
    OneShot = 1,
    Continuous = 2,
}

impl Mode {
    #[inline]
    pub const fn as_u8(self) -> u8 {
        self as u8
    }

    pub const fn from_u8(v: u8) -> Option<Self> {
        match v {
            0 => Some(Mode::Idle),
            1 => Some(Mode::OneShot),
            2 => Some(Mode::Continuous),
            _ => None,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Mode::Idle => "idle",
            Mode::OneShot => "one_shot",
            Mode::Continuous => "continuous",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a `<prefix> [arg]` line asks a channel to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelAction {
    /// `<prefix>`: take one sample now.
    Sample,
    /// `<prefix> 1`: sample every period until stopped.
    Start,
    /// `<prefix> 0`: stop continuous sampling.
    Stop,
}

// =============================== Errors =====================================

/// Reasons a command line is rejected. The `Display` text is what the
/// operator sees after `error: `.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommandError {
    #[error("unrecognized command '{0}'")]
    UnknownVerb(String),
    #[error("'{verb}' takes at most one argument")]
    TooManyArguments { verb: String },
    #[error("'{verb}' argument '{arg}' is not an integer")]
    NotAnInteger { verb: String, arg: String },
    #[error("'{verb}' argument must be 0 or 1, got {arg}")]
    UnsupportedArgument { verb: String, arg: i64 },
    #[error("'{verb}' takes no argument")]
    UnexpectedArgument { verb: String },
}

// ============================ Pending command ===============================

/// One tokenized input line. Borrowed from the line; never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingCommand<'a> {
    pub verb: &'a str,
    pub arg: Option<i64>,
}

impl<'a> PendingCommand<'a> {
    /// Tokenize a line. Returns `Ok(None)` for a blank line.
    ///
    /// Surrounding whitespace is ignored; verbs are matched later, exactly and
    /// case-sensitively, against the node's vocabulary.
    pub fn parse(line: &'a str) -> Result<Option<Self>, CommandError> {
        let mut tokens: heapless::Vec<&'a str, MAX_TOKENS> = heapless::Vec::new();
        for tok in line.split_whitespace() {
            if tokens.push(tok).is_err() {
                return Err(CommandError::TooManyArguments {
                    verb: tokens[0].to_string(),
                });
            }
        }

        let Some(&verb) = tokens.first() else {
            return Ok(None);
        };

        let arg = match tokens.get(1) {
            None => None,
            Some(raw) => Some(raw.parse::<i64>().map_err(|_| CommandError::NotAnInteger {
                verb: verb.to_string(),
                arg: raw.to_string(),
            })?),
        };

        Ok(Some(Self { verb, arg }))
    }

    #[inline]
    pub fn is_info(&self) -> bool {
        self.verb == INFO_VERB
    }

    /// Interpret the argument as a channel action (`none`, `1`, `0`).
    pub fn channel_action(&self) -> Result<ChannelAction, CommandError> {
        match self.arg {
            None => Ok(ChannelAction::Sample),
            Some(1) => Ok(ChannelAction::Start),
            Some(0) => Ok(ChannelAction::Stop),
            Some(other) => Err(CommandError::UnsupportedArgument {
                verb: self.verb.to_string(),
                arg: other,
            }),
        }
    }
}

// ============================== Output lines ================================

/// `"<label>: <value>"` with a fixed number of decimals.
pub fn sample_line(label: &str, value: f64, precision: usize) -> String {
    format!("{label}: {value:.precision$}")
}

/// Emitted in place of a value when the sampling function fails.
pub fn fault_line(label: &str, reason: impl fmt::Display) -> String {
    format!("{label}: fault ({reason})")
}

/// Diagnostic for a rejected command line.
pub fn error_line(err: &CommandError) -> String {
    format!("error: {err}")
}

// =============================== Tests ======================================
