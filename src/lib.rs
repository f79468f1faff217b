//! A line-oriented shell with pipelines, file redirection, background jobs and
//! commands scheduled to run after a delay.

pub mod builtin;
pub mod command;
pub mod config;
pub mod delay;
pub mod error;
pub mod exec;
pub mod pipeline;
pub mod reaper;
pub mod redirect;
pub mod shell;

pub use command::{parse_statement, split_statements, Command, Statement};
pub use config::{Config, Limits};
pub use delay::{DelayQueue, DelayedCommand, Scheduler};
pub use error::{CdError, ExecError, ParseError, QueueError};
pub use pipeline::Pipeline;
pub use redirect::RedirectionSpec;
pub use shell::Shell;
