//! Redirection resolver: finds `<`, `>` and `>>` in a stage's argv, builds the
//! argv actually passed to exec, and splices target files onto stdin/stdout
//! inside a forked child.

use crate::error::{ExecError, ParseError};
use nix::errno::Errno;
use nix::fcntl::{open, OFlag};
use nix::sys::stat::Mode;
use nix::unistd::{close, dup2};
use std::ffi::CString;
use std::os::unix::io::RawFd;

pub const INPUT: &str = "<";
pub const OUTPUT: &str = ">";
pub const APPEND: &str = ">>";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RedirectMode {
    Read,
    Truncate,
    Append,
}

impl RedirectMode {
    pub fn operator(self) -> &'static str {
        match self {
            RedirectMode::Read => INPUT,
            RedirectMode::Truncate => OUTPUT,
            RedirectMode::Append => APPEND,
        }
    }

    fn target_fd(self) -> RawFd {
        match self {
            RedirectMode::Read => libc::STDIN_FILENO,
            RedirectMode::Truncate | RedirectMode::Append => libc::STDOUT_FILENO,
        }
    }

    fn flags(self) -> OFlag {
        match self {
            RedirectMode::Read => OFlag::O_RDONLY,
            RedirectMode::Truncate => OFlag::O_CREAT | OFlag::O_WRONLY | OFlag::O_TRUNC,
            RedirectMode::Append => OFlag::O_CREAT | OFlag::O_WRONLY | OFlag::O_APPEND,
        }
    }
}

/// Position of the honoured operator token for each direction. A repeated
/// operator overwrites the earlier index (last one wins).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RedirectionSpec {
    pub input: Option<usize>,
    pub output: Option<usize>,
    pub append: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Redirection {
    pub mode: RedirectMode,
    pub path: String,
}

impl RedirectionSpec {
    /// Walks `argv` once; does not modify it.
    pub fn scan(argv: &[String]) -> Self {
        let mut spec = RedirectionSpec::default();
        for (i, tok) in argv.iter().enumerate() {
            match tok.as_str() {
                INPUT => spec.input = Some(i),
                OUTPUT => spec.output = Some(i),
                APPEND => spec.append = Some(i),
                _ => {}
            }
        }
        spec
    }

    pub fn is_empty(&self) -> bool {
        self.input.is_none() && self.output.is_none() && self.append.is_none()
    }

    // Application order: input, then output, then append (append wins stdout).
    fn entries(&self) -> impl Iterator<Item = (RedirectMode, usize)> {
        [(RedirectMode::Read, self.input), (RedirectMode::Truncate, self.output), (RedirectMode::Append, self.append)]
            .into_iter()
            .filter_map(|(mode, idx)| idx.map(|i| (mode, i)))
    }

    /// Every honoured operator must be followed by a file name that is not itself an operator.
    pub fn validate(&self, argv: &[String]) -> Result<(), ParseError> {
        for (mode, idx) in self.entries() {
            match argv.get(idx + 1).map(String::as_str) {
                None | Some(INPUT) | Some(OUTPUT) | Some(APPEND) => {
                    return Err(ParseError::MissingRedirectTarget { operator: mode.operator() })
                }
                Some(_) => {}
            }
        }
        Ok(())
    }

    /// Redirections to perform for a stage. Pipeline endpoints pass `false` for
    /// the direction the pipe already owns.
    pub fn redirections(&self, argv: &[String], with_input: bool, with_output: bool) -> Vec<Redirection> {
        self.entries()
            .filter(|(mode, _)| match mode {
                RedirectMode::Read => with_input,
                RedirectMode::Truncate | RedirectMode::Append => with_output,
            })
            .filter_map(|(mode, idx)| argv.get(idx + 1).map(|p| Redirection { mode, path: p.clone() }))
            .collect()
    }

    /// A fresh argv without the honoured operators and their file names.
    pub fn exec_argv(&self, argv: &[String]) -> Vec<String> {
        let skipped: Vec<usize> = self.entries().flat_map(|(_, i)| [i, i + 1]).collect();
        argv.iter()
            .enumerate()
            .filter(|(i, _)| !skipped.contains(i))
            .map(|(_, tok)| tok.clone())
            .collect()
    }
}

/// A redirection with every allocation done up front, ready for use after `fork`.
#[derive(Debug)]
pub struct PreparedRedirect {
    mode: RedirectMode,
    path: CString,
    failure: Vec<u8>,
}

impl PreparedRedirect {
    /// Diagnostic prefix (`seashell: <path>: `) written before the errno text.
    pub fn failure_prefix(&self) -> &[u8] {
        &self.failure
    }
}

impl Redirection {
    pub fn prepare(&self) -> Result<PreparedRedirect, ExecError> {
        let path = CString::new(self.path.as_str()).map_err(|_| ExecError::InvalidArgument(self.path.clone()))?;
        let failure = format!("seashell: {}: ", self.path).into_bytes();
        Ok(PreparedRedirect { mode: self.mode, path, failure })
    }
}

/// Opens each target and duplicates it onto stdin or stdout, closing the
/// original descriptor. This rewrites the calling process's descriptor table,
/// so it must only run in a child that is about to exec.
///
/// On failure returns the redirect that could not be set up and the errno.
pub fn apply(prepared: &[PreparedRedirect]) -> Result<(), (&PreparedRedirect, Errno)> {
    for r in prepared {
        let target = r.mode.target_fd();
        let fd = open(r.path.as_c_str(), r.mode.flags(), Mode::from_bits_truncate(0o666)).map_err(|e| (r, e))?;
        if fd != target {
            dup2(fd, target).map_err(|e| (r, e))?;
            let _ = close(fd);
        }
    }
    Ok(())
}
