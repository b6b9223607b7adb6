// =============================================================================
// error.rs - WHAT CAN GO WRONG
// =============================================================================
//
// Three layers of failure, matching the three places the job talks to the
// outside world: fetching pages, reading their markup, and handing results
// to the notifier. `AdvisoryError` is the per-advisory union the pipeline
// records when it skips an advisory and moves on.
// =============================================================================

use reqwest::StatusCode;
use thiserror::Error;

use crate::models::DetailField;

/// Failure to obtain a page.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Connection, DNS, timeout or body-read failure on every allowed attempt.
    #[error("transport failure fetching {url} after {attempts} attempt(s): {source}")]
    Transport {
        url: String,
        attempts: u32,
        #[source]
        source: reqwest::Error,
    },

    /// The server answered, but not with a 2xx. Never retried.
    #[error("{url} rejected the request with HTTP {status}")]
    Rejected { url: String, status: StatusCode },
}

impl FetchError {
    /// True for failures that came from the transport rather than the server.
    pub fn is_transport(&self) -> bool {
        matches!(self, FetchError::Transport { .. })
    }
}

/// The page was fetched but did not have the shape we read it by.
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("selector {css:?} does not parse: {reason}")]
    InvalidSelector { css: &'static str, reason: String },

    /// A container element on the path to the data is missing.
    #[error("page structure changed: no {0} found")]
    MissingElement(&'static str),

    /// One or more positional detail fields did not resolve.
    #[error("detail page is missing {} field(s): {}", .missing.len(), describe_fields(.missing))]
    MissingFields { missing: Vec<DetailField> },

    #[error("row {row}: published date {value:?} is not YYYY-MM-DD: {source}")]
    InvalidDate {
        row: usize,
        value: String,
        #[source]
        source: chrono::ParseError,
    },

    /// `now - window` falls outside the representable calendar.
    #[error("lookback window of {window_hours}h before {now} is out of range")]
    WindowOutOfRange {
        now: chrono::NaiveDateTime,
        window_hours: i64,
    },

    #[error("advisory link {href:?} cannot be joined onto {origin}: {source}")]
    InvalidLink {
        origin: String,
        href: String,
        #[source]
        source: url::ParseError,
    },
}

/// Failure to hand a payload to the notifier.
#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("notifier request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The endpoint answered but refused the message (Slack's `ok: false`).
    #[error("notifier API refused the message: {0}")]
    Api(String),

    #[error("could not encode notification payload: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Why a single advisory was skipped.
#[derive(Debug, Error)]
pub enum AdvisoryError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Extract(#[from] ExtractError),

    #[error("delivery failed: {0}")]
    Delivery(#[from] NotifyError),
}

/// Failures that end the run before any advisory is processed.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("listing URL is invalid: {0}")]
    ListingUrl(#[from] url::ParseError),

    #[error("could not fetch the advisory listing: {0}")]
    ListingFetch(#[source] FetchError),

    #[error("could not read the advisory listing: {0}")]
    ListingExtract(#[source] ExtractError),

    #[error("could not send the no-advisories notice: {0}")]
    NoticeDelivery(#[source] NotifyError),
}

fn describe_fields(fields: &[DetailField]) -> String {
    fields
        .iter()
        .map(|f| f.label())
        .collect::<Vec<_>>()
        .join(", ")
}
