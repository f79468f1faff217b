//! Line dispatch: statements run now go straight to the orchestrator, delayed
//! ones to the scheduler. The poller thread runs matured entries through the
//! same [`execute`] path.

use crate::command::{parse_statement, split_statements, Command, Statement};
use crate::config::{Config, Limits};
use crate::delay::Scheduler;
use crate::error::{ExecError, ParseError};
use crate::exec::{self, JobCounter};
use crate::pipeline::Pipeline;
use std::io::{BufRead, Write};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::SystemTime;

pub const BANNER: &str = "seashell: a small shell with delayed commands. `delay <secs> <cmd>` schedules, `exit` quits.";

pub struct Shell {
    limits: Limits,
    jobs: Arc<JobCounter>,
    scheduler: Scheduler,
}

impl Shell {
    pub fn new(cfg: &Config) -> Self {
        Shell {
            limits: cfg.limits,
            jobs: Arc::new(JobCounter::new()),
            scheduler: Scheduler::new(cfg.max_queue, cfg.tick),
        }
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    /// Starts the delay poller. A fatal error while running a matured command
    /// ends the whole interpreter, the same as on the interactive task.
    pub fn spawn_poller(&self) -> std::io::Result<JoinHandle<()>> {
        let limits = self.limits;
        let jobs = Arc::clone(&self.jobs);
        self.scheduler.spawn_poller(move |entry| {
            if let Err(e) = execute(&entry.command, &limits, &jobs) {
                eprintln!("seashell: {e}");
                if e.is_fatal() {
                    std::process::exit(1);
                }
            }
        })
    }

    /// Runs every `;`-separated statement of `line` in order. Only a fatal
    /// error is returned; everything else is reported and skipped.
    pub fn run_line(&self, line: &str) -> Result<(), ExecError> {
        for text in split_statements(line) {
            match self.run_statement(text, SystemTime::now()) {
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => eprintln!("seashell: {e}"),
                Ok(()) => {}
            }
        }
        Ok(())
    }

    fn run_statement(&self, text: &str, now: SystemTime) -> Result<(), ExecError> {
        match parse_statement(text, &self.limits, now) {
            Ok(Statement::Immediate(command)) => execute(&command, &self.limits, &self.jobs),
            Ok(Statement::Delayed { command, due_at }) => {
                // reject malformed pipelines now rather than when they mature
                if let Err(e) = Pipeline::build(&command, &self.limits) {
                    eprintln!("seashell: {e}");
                } else if let Err(e) = self.scheduler.enqueue(&command, due_at) {
                    eprintln!("seashell: {e}");
                }
                Ok(())
            }
            Err(ParseError::EmptyCommand) => Ok(()),
            Err(e) => {
                eprintln!("seashell: {e}");
                Ok(())
            }
        }
    }

    /// Reads lines until end of input. With `interactive` set, the prompt
    /// `seashell:<cwd>> ` is printed before every read.
    pub fn repl<R: BufRead>(&self, mut input: R, interactive: bool) -> anyhow::Result<()> {
        let mut buf: Vec<u8> = Vec::new();
        loop {
            if interactive {
                let cwd = std::env::current_dir().map(|p| p.display().to_string()).unwrap_or_default();
                let mut out = std::io::stdout().lock();
                write!(out, "seashell:{cwd}> ")?;
                out.flush()?;
            }
            buf.clear();
            if input.read_until(b'\n', &mut buf)? == 0 {
                if interactive {
                    println!();
                }
                return Ok(());
            }
            // undecodable bytes become U+FFFD
            let line = String::from_utf8_lossy(&buf);
            self.run_line(line.trim_end_matches(['\n', '\r']))?;
        }
    }

    /// Blocks until the poller has matured every queued command.
    pub fn drain(&self) {
        let pending = self.scheduler.pending();
        if pending > 0 {
            tracing::debug!(pending, "waiting for delayed commands");
        }
        self.scheduler.wait_idle();
    }
}

/// Builds and runs one command: builtins in-process, everything else through
/// the orchestrator. Parse errors are reported here; only [`ExecError`] escapes.
pub fn execute(command: &Command, limits: &Limits, jobs: &JobCounter) -> Result<(), ExecError> {
    let pipeline = match Pipeline::build(command, limits) {
        Ok(p) => p,
        Err(ParseError::EmptyCommand) => return Ok(()),
        Err(e) => {
            eprintln!("seashell: {e}");
            return Ok(());
        }
    };
    if let Some(builtin) = pipeline.builtin() {
        builtin.run(&pipeline.stages()[0].argv);
        return Ok(());
    }
    exec::run(&pipeline, jobs)
}
