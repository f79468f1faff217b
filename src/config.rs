use anyhow::{anyhow, bail, Result};
use std::env;
use std::time::Duration;

pub const DEFAULT_TICK: Duration = Duration::from_secs(1);
pub const DEFAULT_MAX_ARGS: usize = 64;
pub const DEFAULT_MAX_STAGES: usize = 32;
pub const DEFAULT_MAX_QUEUE: usize = 32;

pub const USAGE: &str = "usage: seashell [-c line] [--tick-ms n] [--max-stages n] [--max-args n] [--max-queue n] [--no-banner]
       -c line         run one line (';' separates statements) instead of reading stdin
       --tick-ms n     delay scheduler poll interval in milliseconds (env SEASHELL_TICK_MS)
       --max-stages n  maximum commands in one pipeline
       --max-args n    maximum tokens in one statement
       --max-queue n   maximum pending delayed commands
       --no-banner     do not print the start-up banner on a terminal";

/// Bounds applied while turning a statement into a pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Limits {
    pub max_args: usize,
    pub max_stages: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Limits { max_args: DEFAULT_MAX_ARGS, max_stages: DEFAULT_MAX_STAGES }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub script: Option<String>,
    pub tick: Duration,
    pub limits: Limits,
    pub max_queue: usize,
    pub banner: bool,
    pub help: bool,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            script: None,
            tick: DEFAULT_TICK,
            limits: Limits::default(),
            max_queue: DEFAULT_MAX_QUEUE,
            banner: true,
            help: false,
        }
    }
}

impl Config {
    /// Parses the interpreter's arguments (without the program name).
    /// `SEASHELL_TICK_MS` supplies the tick when `--tick-ms` is absent.
    pub fn from_args<I: IntoIterator<Item = String>>(args: I) -> Result<Self> {
        let mut cfg = Config::default();
        if let Ok(v) = env::var("SEASHELL_TICK_MS") {
            cfg.tick = Duration::from_millis(parse_positive("SEASHELL_TICK_MS", &v)? as u64);
        }
        let mut args = args.into_iter();
        while let Some(a) = args.next() {
            match a.as_str() {
                "-c" => { cfg.script = Some(args.next().ok_or_else(|| anyhow!("missing line after -c"))?); }
                "--tick-ms" => { let v = value_of(&mut args, &a)?; cfg.tick = Duration::from_millis(parse_positive(&a, &v)? as u64); }
                "--max-stages" => { let v = value_of(&mut args, &a)?; cfg.limits.max_stages = parse_positive(&a, &v)?; }
                "--max-args" => { let v = value_of(&mut args, &a)?; cfg.limits.max_args = parse_positive(&a, &v)?; }
                "--max-queue" => { let v = value_of(&mut args, &a)?; cfg.max_queue = parse_positive(&a, &v)?; }
                "--no-banner" => cfg.banner = false,
                "-h" | "--help" => cfg.help = true,
                other => bail!("unknown arg: {other}"),
            }
        }
        Ok(cfg)
    }
}

fn value_of(args: &mut impl Iterator<Item = String>, flag: &str) -> Result<String> {
    args.next().ok_or_else(|| anyhow!("{flag} requires value"))
}

fn parse_positive(name: &str, v: &str) -> Result<usize> {
    match v.parse::<usize>() {
        Ok(n) if n > 0 => Ok(n),
        _ => bail!("invalid value for {name}: {v:?} (expected a positive integer)"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(v: &[&str]) -> Vec<String> {
        v.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn flags_override_defaults() {
        let cfg = Config::from_args(args(&["-c", "echo hi", "--tick-ms", "50", "--max-stages", "4", "--max-queue", "2", "--no-banner"])).unwrap();
        assert_eq!(cfg.script.as_deref(), Some("echo hi"));
        assert_eq!(cfg.tick, Duration::from_millis(50));
        assert_eq!(cfg.limits.max_stages, 4);
        assert_eq!(cfg.limits.max_args, DEFAULT_MAX_ARGS);
        assert_eq!(cfg.max_queue, 2);
        assert!(!cfg.banner);
    }

    #[test]
    fn rejects_unknown_and_zero() {
        assert!(Config::from_args(args(&["--bogus"])).is_err());
        assert!(Config::from_args(args(&["--max-queue", "0"])).is_err());
        assert!(Config::from_args(args(&["-c"])).is_err());
    }
}
