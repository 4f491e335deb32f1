//! tank-ctl, the operator client for tankd.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};

use tank_core::conduit::ConduitProvider;
use tank_core::config::TankdConfig;
use tank_core::wire::InterleavedKeys;
use tank_services::client::request_session;

mod cmd;

/// Acceptance slower than this means another session holds the tank.
const BUSY_NOTICE_AFTER: Duration = Duration::from_millis(200);

fn print_usage() {
    println!("Usage: tank-ctl [--timeout <secs>] <tank-index> [command...]");
    println!();
    println!("Without a command, opens an interactive prompt on the tank.");
    println!("With a command, runs it once and prints the reply.");
    println!();
    println!("Options:");
    println!("  --timeout <secs>   Wait this long for the server to answer (0 = forever)");
}

// ── Arguments ─────────────────────────────────────────────────────────────────

#[derive(Debug, PartialEq, Eq)]
struct Args {
    timeout: Option<Option<Duration>>,
    tank: usize,
    command: Option<String>,
}

enum Parsed {
    Run(Args),
    Help,
}

fn parse_args(args: &[String]) -> Result<Parsed> {
    let mut timeout = None;
    let mut remaining: Vec<&str> = Vec::new();
    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--timeout" => {
                i += 1;
                let secs: u64 = args
                    .get(i)
                    .context("--timeout requires a value")?
                    .parse()
                    .context("--timeout must be a number of seconds")?;
                timeout = Some((secs > 0).then(|| Duration::from_secs(secs)));
            }
            "help" | "--help" | "-h" if remaining.is_empty() => return Ok(Parsed::Help),
            other => remaining.push(other),
        }
        i += 1;
    }

    let (index, words) = remaining
        .split_first()
        .context("missing tank index (see --help)")?;
    let tank = index
        .parse()
        .with_context(|| format!("tank index must be a non-negative integer, got {index:?}"))?;
    let command = (!words.is_empty()).then(|| words.join(" "));

    Ok(Parsed::Run(Args {
        timeout,
        tank,
        command,
    }))
}

// ── Entry point ───────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    let argv: Vec<String> = std::env::args().skip(1).collect();
    let args = match parse_args(&argv)? {
        Parsed::Run(args) => args,
        Parsed::Help => {
            print_usage();
            return Ok(());
        }
    };

    let config = TankdConfig::load().unwrap_or_else(|e| {
        tracing::warn!(error = %e, "failed to load config, using defaults");
        TankdConfig::default()
    });
    let timeout = args
        .timeout
        .unwrap_or_else(|| config.client.admission_timeout());

    #[cfg(target_os = "linux")]
    {
        let provider = tank_core::conduit::SysvQueues::new(config.server.ipc_mode);
        run(Arc::new(provider), args, timeout).await
    }
    #[cfg(not(target_os = "linux"))]
    {
        let _ = timeout;
        anyhow::bail!("tank-ctl needs SysV message queues, which this platform does not provide")
    }
}

#[cfg_attr(not(target_os = "linux"), allow(dead_code))]
async fn run<P: ConduitProvider>(
    provider: Arc<P>,
    args: Args,
    timeout: Option<Duration>,
) -> Result<()> {
    let tank = args.tank;
    let pending = request_session(provider.as_ref(), &InterleavedKeys, tank, timeout)
        .await
        .with_context(|| format!("could not open a session on tank {tank} (is tankd running?)"))?;
    let session_id = pending.session_id();

    let accepted = pending.accepted();
    tokio::pin!(accepted);
    let mut transport = tokio::select! {
        result = &mut accepted => result,
        _ = tokio::time::sleep(BUSY_NOTICE_AFTER) => {
            println!("the oil tank is busy, please wait...");
            accepted.await
        }
    }
    .context("session was not accepted")?;
    tracing::debug!(%session_id, tank, "session accepted");

    match args.command {
        Some(line) => cmd::session::one_shot(&mut transport, &line).await,
        None => cmd::session::interactive(&mut transport, tank, session_id).await,
    }
}
