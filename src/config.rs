// =============================================================================
// config.rs - THE KNOBS
// =============================================================================
//
// Every tunable in the watcher lives here and is read once at startup.
// Nothing below this module touches the process environment; the pipeline,
// fetcher and notifiers all receive the values they need from `Config`.
//
// Defaults reproduce the cadence the job has always had against the ZDI site:
// three attempts, a minute between retries, one to five seconds of jitter
// after every request, and a minute of quiet before anything goes to Slack.
// =============================================================================

use std::env;
use std::time::Duration;

use url::Url;

/// Runtime configuration for one watcher invocation.
#[derive(Debug, Clone)]
pub struct Config {
    // =========================================================================
    // SOURCE SITE
    // =========================================================================

    /// Scheme + host of the advisories site. Detail links on the listing page
    /// are relative and get joined onto this.
    pub site_origin: String,

    /// Path of the published advisories listing, relative to `site_origin`.
    pub listing_path: String,

    // =========================================================================
    // FETCH POLICY
    // =========================================================================

    /// Total attempts per URL when the transport fails. Rejections (non-2xx)
    /// are never retried.
    pub retries: u32,

    /// Fixed wait between transport-failure retries.
    pub retry_delay: Duration,

    /// Lower bound of the randomized pause applied after every attempt.
    pub courtesy_delay_min: Duration,

    /// Upper bound of the randomized pause applied after every attempt.
    pub courtesy_delay_max: Duration,

    /// Hard timeout for a single HTTP request, connect through body.
    pub request_timeout: Duration,

    // =========================================================================
    // EXTRACTION
    // =========================================================================

    /// Size of the trailing publication window, in hours. Between 1 and
    /// `MAX_WINDOW_HOURS`.
    pub window_hours: u32,

    /// When set, one unparsable listing date fails the whole listing pass
    /// instead of dropping just that row.
    pub strict_dates: bool,

    // =========================================================================
    // NOTIFICATION
    // =========================================================================

    /// Pause between extracting the listing and the first notification.
    pub pre_notify_delay: Duration,

    /// Slack bot token. Without it (or without a channel) notifications are
    /// written to the log instead.
    pub slack_token: Option<String>,

    /// Slack channel id to post into.
    pub slack_channel: Option<String>,

    /// Image shown as the accessory of every Slack message.
    pub slack_image_url: Option<String>,

    /// `chat.postMessage` endpoint. Overridable so tests can point it at a
    /// local mock server.
    pub slack_api_url: String,

    // =========================================================================
    // LOGGING
    // =========================================================================

    /// Emit JSON log lines instead of the human-readable format.
    pub log_json: bool,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            site_origin: "https://www.zerodayinitiative.com".to_string(),
            listing_path: "/advisories/published/".to_string(),
            retries: 3,
            retry_delay: Duration::from_secs(60),
            courtesy_delay_min: Duration::from_millis(1000),
            courtesy_delay_max: Duration::from_millis(5000),
            request_timeout: Duration::from_secs(30),
            window_hours: 24,
            strict_dates: false,
            pre_notify_delay: Duration::from_secs(60),
            slack_token: None,
            slack_channel: None,
            slack_image_url: None,
            slack_api_url: "https://slack.com/api/chat.postMessage".to_string(),
            log_json: false,
        }
    }
}

impl Config {
    /// Load configuration from the environment (and `.env`, if present).
    ///
    /// Watcher settings use the `ZDI_WATCH_` prefix. The Slack settings keep
    /// the names existing deployments already export: `SLACK_API_KEY`,
    /// `CHANNEL_ID` and `IMAGE_URL`. Unparsable numbers fall back to the default.
    pub fn from_env() -> Self {
        let _ = dotenvy::dotenv();
        let defaults = Config::default();

        Config {
            site_origin: env_or_default("ZDI_WATCH_SITE_ORIGIN", &defaults.site_origin),
            listing_path: env_or_default("ZDI_WATCH_LISTING_PATH", &defaults.listing_path),

            retries: env_or_default("ZDI_WATCH_RETRIES", "3").parse().unwrap_or(3),
            retry_delay: Duration::from_secs(
                env_or_default("ZDI_WATCH_RETRY_DELAY_SECS", "60").parse().unwrap_or(60),
            ),
            courtesy_delay_min: Duration::from_millis(
                env_or_default("ZDI_WATCH_COURTESY_MIN_MS", "1000").parse().unwrap_or(1000),
            ),
            courtesy_delay_max: Duration::from_millis(
                env_or_default("ZDI_WATCH_COURTESY_MAX_MS", "5000").parse().unwrap_or(5000),
            ),
            request_timeout: Duration::from_secs(
                env_or_default("ZDI_WATCH_REQUEST_TIMEOUT_SECS", "30").parse().unwrap_or(30),
            ),

            window_hours: parse_window_hours(&env_or_default("ZDI_WATCH_WINDOW_HOURS", "24")),
            strict_dates: parse_flag(&env_or_default("ZDI_WATCH_STRICT_DATES", "false")),

            pre_notify_delay: Duration::from_secs(
                env_or_default("ZDI_WATCH_PRE_NOTIFY_DELAY_SECS", "60").parse().unwrap_or(60),
            ),
            slack_token: env_non_empty("SLACK_API_KEY"),
            slack_channel: env_non_empty("CHANNEL_ID"),
            slack_image_url: env_non_empty("IMAGE_URL"),
            slack_api_url: env_or_default("ZDI_WATCH_SLACK_API_URL", &defaults.slack_api_url),

            log_json: parse_flag(&env_or_default("ZDI_WATCH_LOG_JSON", "false")),
        }
    }

    /// Absolute URL of the published advisories listing.
    pub fn listing_url(&self) -> Result<Url, url::ParseError> {
        Url::parse(&self.site_origin)?.join(&self.listing_path)
    }

    /// The trailing publication window as a chrono duration.
    pub fn lookback_window(&self) -> chrono::Duration {
        chrono::Duration::hours(i64::from(self.window_hours))
    }

    /// True when both Slack credentials are present.
    pub fn slack_enabled(&self) -> bool {
        self.slack_token.is_some() && self.slack_channel.is_some()
    }

    /// A configuration with every delay zeroed and a short request timeout,
    /// pointed at a local origin. Test-only.
    #[cfg(test)]
    pub fn for_tests(origin: &str) -> Self {
        Config {
            site_origin: origin.to_string(),
            retry_delay: Duration::ZERO,
            courtesy_delay_min: Duration::ZERO,
            courtesy_delay_max: Duration::ZERO,
            request_timeout: Duration::from_millis(500),
            pre_notify_delay: Duration::ZERO,
            ..Config::default()
        }
    }
}

/// Upper bound for `window_hours`: one leap year.
pub const MAX_WINDOW_HOURS: u32 = 24 * 366;

/// Positive hours up to `MAX_WINDOW_HOURS`, else the 24h default.
fn parse_window_hours(value: &str) -> u32 {
    match value.trim().parse::<u32>() {
        Ok(hours) if (1..=MAX_WINDOW_HOURS).contains(&hours) => hours,
        _ => 24,
    }
}

fn env_or_default(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_non_empty(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn parse_flag(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}
