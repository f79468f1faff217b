//! Statement tokenizer: one statement of text becomes a [`Command`], either to
//! run now or to hand to the delay scheduler.

use crate::config::Limits;
use crate::error::ParseError;
use crate::redirect::RedirectionSpec;
use std::num::IntErrorKind;
use std::time::{Duration, SystemTime};

pub const BACKGROUND: &str = "&";
pub const DELAY: &str = "delay";
pub const SEPARATOR: char = ';';

/// One tokenized command. Before pipeline construction `argv` still holds
/// pipe tokens; after it, each stage is its own `Command`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Command {
    pub argv: Vec<String>,
    pub redirect: RedirectionSpec,
    pub background: bool,
}

impl Command {
    pub fn new(argv: Vec<String>, background: bool) -> Self {
        let redirect = RedirectionSpec::scan(&argv);
        Command { argv, redirect, background }
    }

    pub fn program(&self) -> Option<&str> {
        self.argv.first().map(String::as_str)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Statement {
    Immediate(Command),
    Delayed { command: Command, due_at: SystemTime },
}

/// Splits a raw input line into its `;`-separated statements, in order.
pub fn split_statements(line: &str) -> impl Iterator<Item = &str> {
    line.split(SEPARATOR)
}

/// Tokenizes one statement on whitespace.
///
/// A trailing `&` is stripped first and marks the command as background; then a
/// leading `delay <seconds>` prefix is removed and turned into an absolute due
/// time relative to `now`. `delay 0` is accepted and due on the next tick.
pub fn parse_statement(text: &str, limits: &Limits, now: SystemTime) -> Result<Statement, ParseError> {
    let mut argv: Vec<String> = text.split_whitespace().map(str::to_string).collect();
    if argv.is_empty() {
        return Err(ParseError::EmptyCommand);
    }
    if argv.len() > limits.max_args {
        return Err(ParseError::TooManyArguments { max: limits.max_args });
    }
    let background = argv.last().is_some_and(|t| t == BACKGROUND);
    if background {
        argv.pop();
    }
    if argv.first().is_some_and(|t| t == DELAY) {
        let due_at = parse_delay(argv.get(1).map(String::as_str), now)?;
        argv.drain(..2);
        if argv.is_empty() {
            return Err(ParseError::MissingCommand);
        }
        return Ok(Statement::Delayed { command: Command::new(argv, background), due_at });
    }
    if argv.is_empty() {
        return Err(ParseError::MissingCommand);
    }
    Ok(Statement::Immediate(Command::new(argv, background)))
}

fn parse_delay(token: Option<&str>, now: SystemTime) -> Result<SystemTime, ParseError> {
    let token = token.ok_or(ParseError::InvalidDelaySpecification)?;
    let secs: i64 = token.parse().map_err(|e: std::num::ParseIntError| match e.kind() {
        IntErrorKind::PosOverflow | IntErrorKind::NegOverflow => ParseError::DelayOutOfRange,
        _ => ParseError::InvalidDelaySpecification,
    })?;
    if secs < 0 {
        return Err(ParseError::NegativeDelay);
    }
    now.checked_add(Duration::from_secs(secs as u64)).ok_or(ParseError::DelayOutOfRange)
}
