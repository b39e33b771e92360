#![forbid(unsafe_code)]

mod api;
mod color_matcher;
mod color_policy;
mod config;
mod constants;
mod error;
mod monitor;
mod shutdown;
mod types;

use anyhow::{Context, Result};
use clap::Parser;
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::path::PathBuf;
use tracing::{Level as TraceLevel, info, info_span, warn};
use tracing_subscriber::FmtSubscriber;

use api::{ApiClient, HttpTransport, RetryPolicy, Session};
use config::Settings;
use error::KeeperError;
use monitor::{Monitor, MonitorSettings, Origin, SystemClock, TieBreak};
use shutdown::Shutdown;

/// Keep a pixel-art image painted on a shared FT-place board
#[derive(Debug, Parser)]
#[command(version, about)]
struct Args {
    /// Source image (any format the image crate decodes)
    image: PathBuf,

    /// Board x of the image's top-left pixel
    #[arg(allow_negative_numbers = true)]
    origin_x: i64,

    /// Board y of the image's top-left pixel
    #[arg(allow_negative_numbers = true)]
    origin_y: i64,

    /// Access token cookie (or PLACE_KEEPER_ACCESS_TOKEN / config file)
    access_token: Option<String>,

    /// Refresh token cookie (or PLACE_KEEPER_REFRESH_TOKEN / config file)
    refresh_token: Option<String>,

    #[arg(long)]
    base_url: Option<String>,

    /// Seconds to wait after an error before the next cycle
    #[arg(long)]
    check_interval: Option<f64>,

    /// Config file, defaults to <config_dir>/place-keeper/config.toml
    #[arg(long)]
    config: Option<PathBuf>,

    /// Fix equal-priority pixels in scan order instead of randomly
    #[arg(long)]
    stable_order: bool,
}

fn init_logging() -> Result<()> {
    let log_level = match std::env::var("LOG_LEVEL")
        .unwrap_or_else(|_| "info".to_string())
        .to_lowercase()
        .as_str()
    {
        "trace" => TraceLevel::TRACE,
        "debug" => TraceLevel::DEBUG,
        "warn" => TraceLevel::WARN,
        "error" => TraceLevel::ERROR,
        _ => TraceLevel::INFO,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;
    Ok(())
}

/// Config file and env first, then CLI on top
fn resolve_settings(args: &Args) -> Result<Settings> {
    let mut settings = Settings::load(args.config.as_deref())?;
    if let Some(base_url) = &args.base_url {
        settings.base_url = base_url.clone();
    }
    if let Some(interval) = args.check_interval {
        settings.check_interval_secs = interval;
    }
    if let Some(token) = &args.access_token {
        settings.access_token = Some(token.clone());
    }
    if let Some(token) = &args.refresh_token {
        settings.refresh_token = Some(token.clone());
    }
    if args.stable_order {
        settings.tie_break = TieBreak::Stable;
    }
    settings.validate_and_clamp();
    Ok(settings)
}

fn session_from(settings: &Settings) -> Result<Session, KeeperError> {
    match (&settings.access_token, &settings.refresh_token) {
        (Some(access), Some(refresh)) => Ok(Session::new(access.as_str(), refresh.as_str())),
        _ => Err(KeeperError::config(
            "both an access token and a refresh token are required",
        )),
    }
}

fn main() -> Result<()> {
    init_logging()?;
    let args = Args::parse();
    let settings = resolve_settings(&args)?;
    info!(
        base_url = %settings.base_url,
        retry_attempts = settings.retry_attempts,
        check_interval_secs = settings.check_interval_secs,
        tie_break = ?settings.tie_break,
        "Configuration loaded"
    );

    let shutdown = Shutdown::new();
    shutdown.install_signal_handlers()?;

    let transport = HttpTransport::new(
        settings.request_timeout(),
        RetryPolicy::new(settings.retry_attempts),
        shutdown.clone(),
    )?;
    let mut client = ApiClient::new(
        transport,
        session_from(&settings)?,
        &settings.base_url,
        info_span!("api"),
    );

    let profile = client
        .get_profile()?
        .ok_or_else(|| KeeperError::authentication("could not fetch profile, check the tokens"))?;
    info!(username = %profile.username, pixel_buffer = profile.pixel_buffer, "Connected as {}", profile.username);
    if profile.is_banned {
        warn!("Account is flagged as banned, placements will likely fail");
    }

    let board = client
        .get_board()?
        .context("could not fetch the board to read the palette")?;
    info!(
        colors = board.palette.len(),
        width = board.grid.width(),
        height = board.grid.height(),
        "Fetched palette"
    );

    let pixels = color_matcher::load(&args.image)?;
    let target = color_matcher::rasterize(&pixels, &board.palette)?;
    info!(
        image = %args.image.display(),
        width = target.width(),
        height = target.height(),
        origin_x = args.origin_x,
        origin_y = args.origin_y,
        "Target image ready"
    );

    let monitor_settings = MonitorSettings {
        origin: Origin { x: args.origin_x, y: args.origin_y },
        check_interval: settings.check_interval(),
        tie_break: settings.tie_break,
    };
    let mut monitor = Monitor::new(
        client,
        settings.policy,
        target,
        monitor_settings,
        SystemClock::new(shutdown.clone()),
        StdRng::from_entropy(),
        shutdown,
        info_span!("monitor"),
    );
    monitor.run()?;

    info!("Keeper stopped");
    Ok(())
}
