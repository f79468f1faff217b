//! Error types shared by the parser, the orchestrator and the delay queue.

use thiserror::Error;

/// A statement was rejected before any process was spawned.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    /// Blank statement; callers skip it silently.
    #[error("empty command")]
    EmptyCommand,

    /// Operators or a delay prefix were given but nothing is left to run.
    #[error("missing command")]
    MissingCommand,

    #[error("a pipe cannot begin or end a command")]
    InvalidPipePlacement,

    #[error("too many commands in pipeline (max {max})")]
    TooManyStages { max: usize },

    #[error("too many arguments (max {max})")]
    TooManyArguments { max: usize },

    #[error("delay: provide delay amount in seconds")]
    InvalidDelaySpecification,

    #[error("delay: amount cannot be less than 0")]
    NegativeDelay,

    #[error("delay: amount out of range")]
    DelayOutOfRange,

    #[error("missing file name after '{operator}'")]
    MissingRedirectTarget { operator: &'static str },

    #[error("cannot use pipes or redirection alongside a built-in command")]
    BuiltinInPipeline,
}

/// Failure raised in the interpreter process while setting up a pipeline.
///
/// Failures that happen inside a spawned child (unknown program, unreadable
/// redirection target) are reported by the child itself and never show up here.
#[derive(Debug, Error)]
pub enum ExecError {
    #[error("pipe failed: {0}")]
    Pipe(#[source] nix::Error),

    #[error("fork failed: {0}")]
    Fork(#[source] nix::Error),

    #[error("invalid argument {0:?}: contains a NUL byte")]
    InvalidArgument(String),
}

impl ExecError {
    /// Resource exhaustion ends the interpreter; anything else only skips the command.
    pub fn is_fatal(&self) -> bool {
        matches!(self, ExecError::Pipe(_) | ExecError::Fork(_))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueueError {
    #[error("delay queue is full ({capacity} pending commands)")]
    Full { capacity: usize },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CdError {
    #[error("cd: too many arguments")]
    TooManyArguments,

    #[error("cd: error finding home directory")]
    NoHome,

    #[error("cd: {0}: No such file or directory")]
    NotFound(String),
}
