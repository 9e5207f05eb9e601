use std::env;

use chrono::Duration;
use dropship_common::helpers::parse_boolean_flag;
use log::*;

const DEFAULT_DSP_HOST: &str = "127.0.0.1";
const DEFAULT_DSP_PORT: u16 = 8380;
const DEFAULT_DATABASE_URL: &str = "sqlite://data/dropship.db";
const DEFAULT_MAX_CONNECTIONS: u32 = 25;
const DEFAULT_HOLD_TIMEOUT: Duration = Duration::hours(24);
const DEFAULT_AUTO_COMPLETE_TIMEOUT: Duration = Duration::hours(336);
const MAX_TIMEOUT: Duration = Duration::days(36_500);
const DEFAULT_SWEEP_INTERVAL: std::time::Duration = std::time::Duration::from_secs(3600);

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    pub max_connections: u32,
    /// Run the embedded database migrations on start-up.
    pub auto_migrate: bool,
    /// How long an on-hold order may wait for payment before the sweeper cancels it.
    pub hold_timeout: Duration,
    /// How long a shipped order may wait for the buyer's acknowledgement before the sweeper completes it.
    /// `None` disables auto-completion.
    pub auto_complete_timeout: Option<Duration>,
    /// Time between sweeper runs.
    pub sweep_interval: std::time::Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_DSP_HOST.to_string(),
            port: DEFAULT_DSP_PORT,
            database_url: DEFAULT_DATABASE_URL.to_string(),
            max_connections: DEFAULT_MAX_CONNECTIONS,
            auto_migrate: true,
            hold_timeout: DEFAULT_HOLD_TIMEOUT,
            auto_complete_timeout: Some(DEFAULT_AUTO_COMPLETE_TIMEOUT),
            sweep_interval: DEFAULT_SWEEP_INTERVAL,
        }
    }
}

impl ServerConfig {
    pub fn new(host: &str, port: u16) -> Self {
        Self { host: host.to_string(), port, ..Default::default() }
    }

    pub fn from_env_or_default() -> Self {
        let host = env::var("DSP_HOST").ok().unwrap_or_else(|| DEFAULT_DSP_HOST.into());
        let port = env::var("DSP_PORT")
            .map(|s| {
                s.parse::<u16>().unwrap_or_else(|e| {
                    error!(
                        "🪛️ {s} is not a valid port for DSP_PORT. {e} Using the default, {DEFAULT_DSP_PORT}, instead."
                    );
                    DEFAULT_DSP_PORT
                })
            })
            .ok()
            .unwrap_or(DEFAULT_DSP_PORT);
        let database_url = env::var("DSP_DATABASE_URL").ok().unwrap_or_else(|| {
            warn!("🪛️ DSP_DATABASE_URL is not set. Using the default, {DEFAULT_DATABASE_URL}.");
            DEFAULT_DATABASE_URL.to_string()
        });
        let max_connections = env::var("DSP_MAX_CONNECTIONS")
            .ok()
            .and_then(|s| {
                s.parse::<u32>()
                    .map_err(|e| warn!("🪛️ Invalid configuration value for DSP_MAX_CONNECTIONS. {e}"))
                    .ok()
                    .filter(|&n| n > 0)
            })
            .unwrap_or(DEFAULT_MAX_CONNECTIONS);
        let auto_migrate = parse_boolean_flag(env::var("DSP_AUTO_MIGRATE").ok(), true);
        let hold_timeout = hours_from_env("DSP_HOLD_TIMEOUT")
            .map(|v| v.unwrap_or(DEFAULT_HOLD_TIMEOUT))
            .unwrap_or_else(|| {
                info!(
                    "🪛️ DSP_HOLD_TIMEOUT is not set. Using the default value of {} hrs.",
                    DEFAULT_HOLD_TIMEOUT.num_hours()
                );
                DEFAULT_HOLD_TIMEOUT
            });
        let auto_complete_timeout = configure_auto_complete_timeout();
        let sweep_interval = env::var("DSP_SWEEP_INTERVAL")
            .ok()
            .and_then(|s| {
                s.parse::<u64>()
                    .map_err(|e| warn!("🪛️ Invalid configuration value for DSP_SWEEP_INTERVAL. {e}"))
                    .ok()
                    .filter(|&secs| secs > 0)
                    .map(std::time::Duration::from_secs)
            })
            .unwrap_or(DEFAULT_SWEEP_INTERVAL);
        Self {
            host,
            port,
            database_url,
            max_connections,
            auto_migrate,
            hold_timeout,
            auto_complete_timeout,
            sweep_interval,
        }
    }
}

/// Reads a whole number of hours from the environment.
///
/// Returns `None` if the variable is not set, and `Some(None)` if it is set to something that is not a positive number
/// of hours, or more than [`MAX_TIMEOUT`].
fn hours_from_env(name: &str) -> Option<Option<Duration>> {
    let s = env::var(name).ok()?;
    let hours = s
        .trim()
        .parse::<i64>()
        .map_err(|e| warn!("🪛️ Invalid configuration value for {name}. {e}"))
        .ok()
        .filter(|&h| h > 0)
        .and_then(|h| {
            Duration::try_hours(h).filter(|d| *d <= MAX_TIMEOUT).or_else(|| {
                warn!("🪛️ {h} hrs is out of range for {name}. The limit is {} hrs.", MAX_TIMEOUT.num_hours());
                None
            })
        });
    Some(hours)
}

fn configure_auto_complete_timeout() -> Option<Duration> {
    match env::var("DSP_AUTO_COMPLETE_TIMEOUT").map(|s| s.trim().to_lowercase()) {
        Ok(s) if s == "0" || s == "none" => {
            info!("🪛️ Auto-completion of shipped orders is disabled.");
            None
        },
        Ok(_) => hours_from_env("DSP_AUTO_COMPLETE_TIMEOUT")
            .flatten()
            .or(Some(DEFAULT_AUTO_COMPLETE_TIMEOUT)),
        Err(_) => {
            info!(
                "🪛️ DSP_AUTO_COMPLETE_TIMEOUT is not set. Using the default value of {} hrs.",
                DEFAULT_AUTO_COMPLETE_TIMEOUT.num_hours()
            );
            Some(DEFAULT_AUTO_COMPLETE_TIMEOUT)
        },
    }
}
