//! Process orchestrator: wires a [`Pipeline`] into forked children connected
//! by pipes, then waits for them or reports them as background jobs.

use crate::command::Command;
use crate::error::ExecError;
use crate::pipeline::Pipeline;
use crate::redirect::{self, PreparedRedirect};
use nix::errno::Errno;
use nix::fcntl::OFlag;
use nix::sys::wait::{waitpid, WaitStatus};
use nix::unistd::{close, dup2, fork, pipe2, ForkResult, Pid};
use std::ffi::CString;
use std::io::Write;
use std::os::fd::IntoRawFd;
use std::os::unix::io::RawFd;
use std::sync::atomic::{AtomicUsize, Ordering};

const EXIT_NOT_FOUND: i32 = 127;
const EXIT_FAILURE: i32 = 1;

/// Monotonic job identifier shared by every task that can start background
/// processes. Numbers are never reused.
#[derive(Debug)]
pub struct JobCounter(AtomicUsize);

impl JobCounter {
    pub fn new() -> Self {
        JobCounter(AtomicUsize::new(1))
    }

    pub fn next(&self) -> usize {
        self.0.fetch_add(1, Ordering::SeqCst)
    }
}

impl Default for JobCounter {
    fn default() -> Self {
        Self::new()
    }
}

// Everything a child needs after fork, allocated beforehand.
struct PreparedStage {
    argv: Vec<CString>,
    // NULL-terminated, points into `argv`
    argv_ptrs: Vec<*const libc::c_char>,
    redirects: Vec<PreparedRedirect>,
    not_found: Vec<u8>,
}

impl PreparedStage {
    fn new(stage: &Command, first: bool, last: bool) -> Result<Self, ExecError> {
        let words = stage.redirect.exec_argv(&stage.argv);
        let argv = words
            .iter()
            .map(|w| CString::new(w.as_str()).map_err(|_| ExecError::InvalidArgument(w.clone())))
            .collect::<Result<Vec<_>, _>>()?;
        let redirects = stage
            .redirect
            .redirections(&stage.argv, first, last)
            .iter()
            .map(|r| r.prepare())
            .collect::<Result<Vec<_>, _>>()?;
        let argv_ptrs = argv.iter().map(|a| a.as_ptr()).chain(std::iter::once(std::ptr::null())).collect();
        let not_found = format!("{}: command not found\n", words.first().map(String::as_str).unwrap_or("")).into_bytes();
        Ok(PreparedStage { argv, argv_ptrs, redirects, not_found })
    }
}

/// Spawns one process per stage. Foreground pipelines are waited for; background
/// ones print `[job] pid` for every spawned process and return immediately.
///
/// Per-stage failures are reported by the child. Only failing to create a pipe
/// or a process is returned (both fatal, see [`ExecError::is_fatal`]), as is a
/// NUL byte in an argument, which is caught before anything is spawned.
pub fn run(pipeline: &Pipeline, jobs: &JobCounter) -> Result<(), ExecError> {
    let stages = pipeline.stages();
    let last = stages.len() - 1;
    let prepared = stages
        .iter()
        .enumerate()
        .map(|(i, s)| PreparedStage::new(s, i == 0, i == last))
        .collect::<Result<Vec<_>, _>>()?;

    let mut fds: Vec<(RawFd, RawFd)> = Vec::with_capacity(last);
    for _ in 0..last {
        // CLOEXEC so a fork on the other task never holds our pipes open
        match pipe2(OFlag::O_CLOEXEC) {
            Ok((r, w)) => fds.push((r.into_raw_fd(), w.into_raw_fd())),
            Err(e) => {
                close_all(&fds);
                return Err(ExecError::Pipe(e));
            }
        }
    }

    let _ = std::io::stdout().flush();
    let _ = std::io::stderr().flush();
    let mut pids: Vec<Pid> = Vec::with_capacity(prepared.len());
    for (i, stage) in prepared.iter().enumerate() {
        match unsafe { fork() } {
            Ok(ForkResult::Child) => exec_child(stage, i, &fds),
            Ok(ForkResult::Parent { child }) => {
                tracing::debug!(pid = %child, stage = i, argv = ?stages[i].argv, "spawned stage");
                pids.push(child);
            }
            Err(e) => {
                close_all(&fds);
                return Err(ExecError::Fork(e));
            }
        }
    }
    close_all(&fds);

    if pipeline.background() {
        let mut out = std::io::stdout().lock();
        for pid in &pids {
            let _ = writeln!(out, "[{}] {}", jobs.next(), pid);
        }
        let _ = out.flush();
    } else {
        for pid in pids {
            wait_for(pid);
        }
    }
    Ok(())
}

// Runs in the forked child; never returns into the caller's control flow.
fn exec_child(stage: &PreparedStage, index: usize, fds: &[(RawFd, RawFd)]) -> ! {
    if index > 0 {
        let (pr, _pw) = fds[index - 1];
        if let Err(e) = dup2(pr, libc::STDIN_FILENO) {
            child_exit(&[&b"seashell: dup2: "[..], e.desc().as_bytes(), &b"\n"[..]], EXIT_FAILURE);
        }
    }
    if index < fds.len() {
        let (_pr, pw) = fds[index];
        if let Err(e) = dup2(pw, libc::STDOUT_FILENO) {
            child_exit(&[&b"seashell: dup2: "[..], e.desc().as_bytes(), &b"\n"[..]], EXIT_FAILURE);
        }
    }
    close_all(fds);
    if let Err((r, e)) = redirect::apply(&stage.redirects) {
        child_exit(&[r.failure_prefix(), e.desc().as_bytes(), &b"\n"[..]], EXIT_FAILURE);
    }
    unsafe { libc::execvp(stage.argv[0].as_ptr(), stage.argv_ptrs.as_ptr()) };
    child_exit(&[stage.not_found.as_slice()], EXIT_NOT_FOUND)
}

fn child_exit(parts: &[&[u8]], code: i32) -> ! {
    for part in parts {
        let _ = write_all_fd(libc::STDERR_FILENO, part);
    }
    unsafe { libc::_exit(code) }
}

fn close_all(fds: &[(RawFd, RawFd)]) {
    for (r, w) in fds {
        let _ = close(*r);
        let _ = close(*w);
    }
}

fn wait_for(pid: Pid) {
    loop {
        match waitpid(pid, None) {
            Ok(WaitStatus::Exited(_, code)) => {
                tracing::debug!(%pid, code, "stage exited");
                return;
            }
            Ok(WaitStatus::Signaled(_, sig, _)) => {
                tracing::debug!(%pid, ?sig, "stage killed by signal");
                return;
            }
            Ok(_) => continue,
            Err(Errno::EINTR) => continue,
            // already collected by the SIGCHLD reaper
            Err(Errno::ECHILD) => return,
            Err(e) => {
                tracing::warn!(%pid, error = %e, "waitpid failed");
                return;
            }
        }
    }
}

// --- Low-level helpers ---
fn write_all_fd(fd: RawFd, mut buf: &[u8]) -> std::io::Result<()> {
    while !buf.is_empty() {
        let rc = unsafe { libc::write(fd, buf.as_ptr() as *const _, buf.len()) };
        if rc < 0 {
            let err = std::io::Error::last_os_error();
            if err.kind() == std::io::ErrorKind::Interrupted { continue; }
            return Err(err);
        }
        let written = rc as usize;
        if written == 0 { return Err(std::io::ErrorKind::WriteZero.into()); }
        buf = &buf[written..];
    }
    Ok(())
}
