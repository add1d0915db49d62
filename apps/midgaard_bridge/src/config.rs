use std::net::SocketAddr;
use std::time::Duration;

use anyhow::Context;

const USAGE: &str = "midgaard_bridge

USAGE:
  midgaard_bridge [--bind HOST:PORT] [--host HOST:PORT] [--connect-command CMD]
                  [--poll-secs N] [--batch-ms N]

ENV:
  MIDGAARD_BIND     default 127.0.0.1:8080 (serves GET /api)
  MUSH_HOST         default 127.0.0.1:6250
  MUSH_CONNECT_CMD  default empty (e.g. \"connect Watcher hunter2\")
  POLL_SECS         default 30
  BATCH_MS          default 250 (quiet time that ends one server reply)
";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Config {
    pub bind: SocketAddr,
    pub host: String,
    pub connect_command: String,
    pub poll_interval: Duration,
    pub batch_window: Duration,
}

#[derive(Debug, PartialEq, Eq)]
pub enum Parsed {
    Run(Config),
    Help,
}

fn usage_and_exit() -> ! {
    eprintln!("{USAGE}");
    std::process::exit(2);
}

pub fn parse_args() -> Config {
    match parse_from(std::env::args().skip(1), |k| std::env::var(k).ok()) {
        Ok(Parsed::Run(cfg)) => cfg,
        Ok(Parsed::Help) => usage_and_exit(),
        Err(e) => {
            eprintln!("ERROR: {e:#}\n");
            usage_and_exit();
        }
    }
}

pub fn parse_from<I, E>(args: I, env: E) -> anyhow::Result<Parsed>
where
    I: IntoIterator<Item = String>,
    E: Fn(&str) -> Option<String>,
{
    let mut bind = env("MIDGAARD_BIND").unwrap_or_else(|| "127.0.0.1:8080".to_string());
    let mut host = env("MUSH_HOST").unwrap_or_else(|| "127.0.0.1:6250".to_string());
    let mut connect_command = env("MUSH_CONNECT_CMD").unwrap_or_default();
    let mut poll_secs = env("POLL_SECS").unwrap_or_else(|| "30".to_string());
    let mut batch_ms = env("BATCH_MS").unwrap_or_else(|| "250".to_string());

    let mut it = args.into_iter();
    while let Some(arg) = it.next() {
        let slot = match arg.as_str() {
            "--bind" | "-a" => &mut bind,
            "--host" | "-H" => &mut host,
            "--connect-command" | "-c" => &mut connect_command,
            "--poll-secs" => &mut poll_secs,
            "--batch-ms" => &mut batch_ms,
            "-h" | "--help" => return Ok(Parsed::Help),
            _ => anyhow::bail!("unknown argument {arg:?}"),
        };
        *slot = it
            .next()
            .with_context(|| format!("{arg} needs a value"))?;
    }

    let bind: SocketAddr = bind
        .parse()
        .with_context(|| format!("bad bind address {bind:?}"))?;
    if host.trim().is_empty() {
        anyhow::bail!("mush host is empty");
    }
    let poll_secs: u64 = poll_secs
        .parse()
        .with_context(|| format!("bad poll interval {poll_secs:?}"))?;
    let batch_ms: u64 = batch_ms
        .parse()
        .with_context(|| format!("bad batch window {batch_ms:?}"))?;

    Ok(Parsed::Run(Config {
        bind,
        host,
        connect_command,
        poll_interval: Duration::from_secs(poll_secs.max(1)),
        batch_window: Duration::from_millis(batch_ms.max(1)),
    }))
}
