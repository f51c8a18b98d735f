//! Live commands typed while the monitor is running.
//!
//! One command per line. Configuration commands are applied straight to the
//! shared [`EngineConfig`] by [`apply`]; the rest go to the poll loop.

use std::fmt;

use crate::collector::ThreadId;
use crate::engine::{ConfigError, DetailMode, EngineConfig};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Print the command list.
    Help,
    /// Stop monitoring.
    Quit,
    /// Drop the history and start a new baseline.
    Reset,
    /// Switch the ranking metric.
    Mode(DetailMode),
    /// Change the number of threads shown.
    Limit(usize),
    /// Change the refresh interval in seconds.
    Interval(u64),
    /// Print one thread's call stack.
    Stack(ThreadId),
    /// List every thread.
    AllThreads,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandError {
    Empty,
    Unknown(String),
    MissingArgument(&'static str),
    InvalidArgument { command: &'static str, value: String },
    Config(ConfigError),
}

impl fmt::Display for CommandError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CommandError::Empty => write!(f, "empty command"),
            CommandError::Unknown(c) => write!(f, "unknown command '{}' (h for help)", c),
            CommandError::MissingArgument(c) => write!(f, "'{}' needs an argument", c),
            CommandError::InvalidArgument { command, value } => {
                write!(f, "invalid argument '{}' for '{}'", value, command)
            }
            CommandError::Config(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for CommandError {}

impl From<ConfigError> for CommandError {
    fn from(e: ConfigError) -> Self {
        CommandError::Config(e)
    }
}

/// Parses one input line such as `m 5`, `i 3` or `t 1234`.
pub fn parse_command(line: &str) -> Result<Command, CommandError> {
    let mut parts = line.split_whitespace();
    let Some(name) = parts.next() else {
        return Err(CommandError::Empty);
    };
    let arg = parts.next();

    match name {
        "h" | "help" => Ok(Command::Help),
        "q" | "quit" => Ok(Command::Quit),
        "r" | "reset" => Ok(Command::Reset),
        "a" | "all" => Ok(Command::AllThreads),
        "m" | "mode" => {
            let value = arg.ok_or(CommandError::MissingArgument("m"))?;
            value
                .parse()
                .map(Command::Mode)
                .map_err(|_| invalid("m", value))
        }
        "l" | "limit" => {
            let value = arg.ok_or(CommandError::MissingArgument("l"))?;
            value
                .parse()
                .map(Command::Limit)
                .map_err(|_| invalid("l", value))
        }
        "i" | "interval" => {
            let value = arg.ok_or(CommandError::MissingArgument("i"))?;
            value
                .parse()
                .map(Command::Interval)
                .map_err(|_| invalid("i", value))
        }
        "t" | "stack" => {
            let value = arg.ok_or(CommandError::MissingArgument("t"))?;
            value
                .parse()
                .map(Command::Stack)
                .map_err(|_| invalid("t", value))
        }
        other => Err(CommandError::Unknown(other.to_string())),
    }
}

fn invalid(command: &'static str, value: &str) -> CommandError {
    CommandError::InvalidArgument {
        command,
        value: value.to_string(),
    }
}

/// Applies configuration commands to `config`.
///
/// Returns `Ok(None)` when the command was fully handled here, or the command
/// itself when the poll loop has to act on it.
pub fn apply(command: Command, config: &EngineConfig) -> Result<Option<Command>, CommandError> {
    match command {
        Command::Mode(mode) => config.set_mode(mode),
        Command::Limit(limit) => config.set_limit(limit)?,
        Command::Interval(secs) => config.set_interval(secs)?,
        other => return Ok(Some(other)),
    }
    Ok(None)
}

pub fn help_text() -> String {
    let mut text = String::from(" Commands:\n");
    for (keys, what) in [
        ("m <1-6|name>", "order by cpu, syscpu, totalcpu, totalsyscpu, memory, totalmemory"),
        ("i <secs>", "change refresh interval"),
        ("l <n>", "change number of threads shown"),
        ("t <tid>", "print stack of a thread"),
        ("a", "list all threads"),
        ("r", "reset history"),
        ("h", "show this help"),
        ("q", "quit"),
    ] {
        text.push_str(&format!("   {:<14} {}\n", keys, what));
    }
    text
}
