//! Interactive volume bot.
//!
//! Reads `BACKPACK_API_SECRET` (a `.env` file is honoured), asks for the
//! token, initial balance and randomization level unless they come from
//! `--config <file>` or `BACKPACK_*` variables, then alternates buys and
//! sells until Ctrl-C or SIGTERM.

use std::{
    env,
    io::{self, BufRead, Write},
    path::PathBuf,
    process::ExitCode,
};

use anyhow::{bail, Context, Result};
use backpack_client::{
    backpack_client::API_SECRET_ENV,
    trading_helpers::format_currency,
    volume::{spawn_signal_listener, RandomizationLevel, VolumeLoop, VolumeSettings},
    BackpackClient,
};
use rust_decimal::Decimal;
use secrecy::SecretString;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,backpack_client=info")),
        )
        .with_target(false)
        .init();

    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!("{err:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<()> {
    let mut settings = match config_path()? {
        Some(path) => VolumeSettings::from_file(&path)
            .with_context(|| format!("failed to load {}", path.display()))?,
        None => VolumeSettings::from_env(),
    };

    let secret = required_env(API_SECRET_ENV)?;
    let mut builder = BackpackClient::builder().secret(SecretString::from(secret));
    if let Some(url) = settings.api_url.clone() {
        builder = builder.api_url(url);
    }
    let client = builder.build().context("failed to configure Backpack client")?;

    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();
    if settings.token.is_none() {
        settings.token = Some(prompt(&mut lines, "Enter token (e.g. BTC): ")?);
    }
    if settings.initial_balance.is_none() {
        let raw = prompt(&mut lines, "Enter initial balance: ")?;
        let balance = raw
            .trim()
            .parse::<Decimal>()
            .with_context(|| format!("initial balance {raw:?} is not a number"))?;
        settings.initial_balance = Some(balance);
    }
    if settings.randomization_level.is_none() {
        let raw = prompt(
            &mut lines,
            "Select randomization level (0-10, 0=none, 1=low, 10=high): ",
        )?;
        settings.randomization_level = Some(i64::from(RandomizationLevel::parse_lenient(&raw).get()));
    }
    drop(lines);

    let config = settings.resolve().context("invalid volume settings")?;

    let shutdown = CancellationToken::new();
    spawn_signal_listener(shutdown.clone()).context("failed to install signal handlers")?;

    let report = VolumeLoop::new(client, config, shutdown)
        .run()
        .await
        .context("volume loop stopped")?;

    tracing::info!(
        iterations = report.iterations,
        fills = report.fills,
        "Done: total volume {} ({})",
        report.volume,
        format_currency(report.notional)
    );
    Ok(())
}

fn config_path() -> Result<Option<PathBuf>> {
    let mut args = env::args().skip(1);
    let mut path = None;
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--config" | "-c" => {
                let value = args.next().context("--config needs a file path")?;
                path = Some(PathBuf::from(value));
            }
            other => {
                if let Some(value) = other.strip_prefix("--config=") {
                    path = Some(PathBuf::from(value));
                } else {
                    bail!("unknown argument {other:?}; usage: volume_bot [--config <file>]");
                }
            }
        }
    }
    Ok(path)
}

fn required_env(name: &str) -> Result<String> {
    env::var(name)
        .ok()
        .filter(|value| !value.trim().is_empty())
        .with_context(|| format!("{name} not found; set it in the environment or .env"))
}

fn prompt(lines: &mut impl Iterator<Item = io::Result<String>>, question: &str) -> Result<String> {
    let mut stdout = io::stdout();
    write!(stdout, "{question}")?;
    stdout.flush()?;
    match lines.next() {
        Some(line) => Ok(line?.trim().to_string()),
        None => bail!("stdin closed before answering {question:?}"),
    }
}
