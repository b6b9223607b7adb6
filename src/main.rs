// ███████╗██████╗ ██╗    ██╗    ██╗ █████╗ ████████╗ ██████╗██╗  ██╗
// ╚══███╔╝██╔══██╗██║    ██║    ██║██╔══██╗╚══██╔══╝██╔════╝██║  ██║
//   ███╔╝ ██║  ██║██║    ██║ █╗ ██║███████║   ██║   ██║     ███████║
//  ███╔╝  ██║  ██║██║    ██║███╗██║██╔══██║   ██║   ██║     ██╔══██║
// ███████╗██████╔╝██║    ╚███╔███╔╝██║  ██║   ██║   ╚██████╗██║  ██║
// ╚══════╝╚═════╝ ╚═╝     ╚══╝╚══╝ ╚═╝  ╚═╝   ╚═╝    ╚═════╝╚═╝  ╚═╝
//
// One pass over the Zero Day Initiative's published advisories, then exit.
// Schedule it; it does not loop.

use anyhow::Context;
use tracing::{info, warn};
use tracing_subscriber::{fmt, EnvFilter};

use zdi_watch::config::Config;
use zdi_watch::fetcher::Fetcher;
use zdi_watch::notifier::{LogNotifier, Notifier, SlackNotifier};
use zdi_watch::pipeline::{Pipeline, RunResult};

fn print_banner() {
    let banner = r#"
    ╔══════════════════════════════════════════════════════════╗
    ║   ZDI WATCH                                              ║
    ║   Source:   zerodayinitiative.com / published advisories ║
    ║   Window:   trailing 24 hours                            ║
    ║   Output:   Slack (or the log, if Slack is not set up)   ║
    ╚══════════════════════════════════════════════════════════╝
    "#;
    println!("{}", banner);
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    if json {
        fmt()
            .json()
            .with_env_filter(filter)
            .with_target(true)
            .with_file(true)
            .with_line_number(true)
            .init();
    } else {
        fmt()
            .with_env_filter(filter)
            .with_target(true)
            .with_file(true)
            .with_line_number(true)
            .with_ansi(true)
            .init();
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env();
    init_tracing(config.log_json);
    if !config.log_json {
        print_banner();
    }

    let listing_url = config
        .listing_url()
        .context("invalid ZDI_WATCH_SITE_ORIGIN or ZDI_WATCH_LISTING_PATH")?;
    info!(
        listing_url = %listing_url,
        retries = config.retries,
        retry_delay_secs = config.retry_delay.as_secs(),
        window_hours = config.window_hours,
        strict_dates = config.strict_dates,
        slack = config.slack_enabled(),
        "Configuration loaded"
    );

    let fetcher = Fetcher::new(&config).context("failed to build the HTTP client")?;

    let notifier: Box<dyn Notifier> =
        match SlackNotifier::from_config(&config).context("failed to build the Slack client")? {
            Some(slack) => Box::new(slack),
            None => {
                warn!("SLACK_API_KEY or CHANNEL_ID not set, notifications will only be logged");
                Box::new(LogNotifier)
            }
        };

    let pipeline = Pipeline::new(config, fetcher)?;
    let report = pipeline
        .run(notifier.as_ref())
        .await
        .context("advisory run aborted")?;

    match &report.result {
        RunResult::NoAdvisories => info!(run_id = %report.run_id, "Run complete: no new advisories"),
        RunResult::Processed(outcomes) => info!(
            run_id = %report.run_id,
            found = outcomes.len(),
            delivered = report.delivered_count(),
            skipped = report.skipped_count(),
            "Run complete"
        ),
    }
    info!(
        attempts = report.fetch_stats.attempts,
        retries = report.fetch_stats.retries,
        transport_failures = report.fetch_stats.transport_failures,
        rejections = report.fetch_stats.rejections,
        pages = report.fetch_stats.pages_fetched,
        "Fetch statistics"
    );

    Ok(())
}
