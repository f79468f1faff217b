use anyhow::{Context, Result};
use seashell::config::{Config, USAGE};
use seashell::reaper::install_child_reaper;
use seashell::shell::{Shell, BANNER};
use std::env;
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_env("SEASHELL_LOG").unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let cfg = Config::from_args(env::args().skip(1))?;
    if cfg.help {
        println!("{USAGE}");
        return Ok(());
    }

    install_child_reaper().context("install SIGCHLD handler")?;
    let shell = Shell::new(&cfg);
    shell.spawn_poller().context("spawn delay poller")?;
    tracing::debug!(tick_ms = cfg.tick.as_millis() as u64, max_queue = cfg.max_queue, "seashell starting");

    match &cfg.script {
        Some(line) => shell.run_line(line)?,
        None => {
            let interactive = atty::is(atty::Stream::Stdin);
            if interactive && cfg.banner {
                println!("{BANNER}");
            }
            shell.repl(std::io::stdin().lock(), interactive)?;
        }
    }
    shell.drain();
    Ok(())
}
