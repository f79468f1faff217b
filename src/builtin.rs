//! Commands the interpreter runs in its own process.

use crate::error::CdError;
use std::env;
use std::io::Write;
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Builtin {
    Cd,
    Exit,
}

impl Builtin {
    pub fn lookup(name: &str) -> Option<Self> {
        match name {
            "cd" => Some(Builtin::Cd),
            "exit" => Some(Builtin::Exit),
            _ => None,
        }
    }

    /// Runs the builtin with its full argv (`argv[0]` is the builtin name).
    /// `exit` does not return.
    pub fn run(self, argv: &[String]) -> i32 {
        match self {
            Builtin::Cd => match cd(argv) {
                Ok(dir) => {
                    tracing::debug!(dir = %dir.display(), "changed directory");
                    0
                }
                Err(e) => {
                    eprintln!("seashell: {e}");
                    1
                }
            },
            Builtin::Exit => {
                let _ = std::io::stdout().flush();
                std::process::exit(0);
            }
        }
    }
}

/// `cd`, `cd ~` and `cd <dir>`. On error the working directory is unchanged.
pub fn cd(argv: &[String]) -> Result<PathBuf, CdError> {
    if argv.len() > 2 {
        return Err(CdError::TooManyArguments);
    }
    let target = match argv.get(1).map(String::as_str) {
        None | Some("~") => env::var_os("HOME").map(PathBuf::from).ok_or(CdError::NoHome)?,
        Some(dir) => PathBuf::from(dir),
    };
    env::set_current_dir(&target).map_err(|_| CdError::NotFound(target.display().to_string()))?;
    Ok(target)
}
