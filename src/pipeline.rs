// =============================================================================
// pipeline.rs - ONE RUN, START TO FINISH
// =============================================================================
//
//   fetch listing ──> extract recent rows ──> pause ──┬─> none?  "no advisories"
//                                                     └─> each:  fetch detail
//                                                                extract detail
//                                                                notify
//
// The listing stage is all-or-nothing: without a listing there is nothing to
// iterate. After that, every advisory stands alone. A failure fetching,
// reading or delivering one advisory is recorded as that advisory's outcome
// and the loop moves on. Advisories are delivered as they complete, so a
// crash halfway through loses only what had not been sent yet.
//
// Everything is sequential. One request is in flight at a time.
// =============================================================================

use chrono::{Local, NaiveDateTime};
use tracing::{error, info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::config::Config;
use crate::error::{AdvisoryError, ExtractError, PipelineError};
use crate::extractors::{extract_detail, ListingExtractor};
use crate::fetcher::{FetchSnapshot, Fetcher};
use crate::models::{AdvisoryDetail, AdvisoryRecord, SkippedAdvisory};
use crate::notifier::Notifier;

/// What happened to one advisory from the listing.
#[derive(Debug)]
pub enum AdvisoryOutcome {
    Delivered {
        record: AdvisoryRecord,
        detail: AdvisoryDetail,
    },
    Skipped {
        record: AdvisoryRecord,
        reason: AdvisoryError,
    },
}

impl AdvisoryOutcome {
    pub fn record(&self) -> &AdvisoryRecord {
        match self {
            AdvisoryOutcome::Delivered { record, .. } | AdvisoryOutcome::Skipped { record, .. } => {
                record
            }
        }
    }
}

#[derive(Debug)]
pub enum RunResult {
    /// The listing had nothing inside the window.
    NoAdvisories,
    /// One outcome per recent advisory, in listing order.
    Processed(Vec<AdvisoryOutcome>),
}

/// The full account of a run.
#[derive(Debug)]
pub struct RunReport {
    pub run_id: Uuid,
    pub result: RunResult,
    pub fetch_stats: FetchSnapshot,
}

impl RunReport {
    fn outcomes(&self) -> &[AdvisoryOutcome] {
        match &self.result {
            RunResult::NoAdvisories => &[],
            RunResult::Processed(outcomes) => outcomes.as_slice(),
        }
    }

    /// The (record, detail) pairs that reached the notifier, in order.
    pub fn delivered(&self) -> impl Iterator<Item = (&AdvisoryRecord, &AdvisoryDetail)> {
        self.outcomes().iter().filter_map(|o| match o {
            AdvisoryOutcome::Delivered { record, detail } => Some((record, detail)),
            AdvisoryOutcome::Skipped { .. } => None,
        })
    }

    pub fn skipped(&self) -> Vec<SkippedAdvisory> {
        skipped_summary(self.outcomes())
    }

    pub fn delivered_count(&self) -> usize {
        self.delivered().count()
    }

    pub fn skipped_count(&self) -> usize {
        self.outcomes().len() - self.delivered_count()
    }
}

/// Drives one watcher run.
pub struct Pipeline {
    config: Config,
    fetcher: Fetcher,
    listing: ListingExtractor,
}

impl Pipeline {
    pub fn new(config: Config, fetcher: Fetcher) -> Result<Self, PipelineError> {
        let listing = ListingExtractor::from_config(&config)?;
        Ok(Self {
            config,
            fetcher,
            listing,
        })
    }

    /// Run against the local wall clock.
    pub async fn run(&self, notifier: &dyn Notifier) -> Result<RunReport, PipelineError> {
        self.run_at(notifier, Local::now().naive_local()).await
    }

    /// Run as if the local time were `now`.
    pub async fn run_at(
        &self,
        notifier: &dyn Notifier,
        now: NaiveDateTime,
    ) -> Result<RunReport, PipelineError> {
        let run_id = Uuid::new_v4();
        let result = self
            .execute(notifier, now)
            .instrument(info_span!("run", %run_id))
            .await?;

        Ok(RunReport {
            run_id,
            result,
            fetch_stats: self.fetcher.stats(),
        })
    }

    async fn execute(
        &self,
        notifier: &dyn Notifier,
        now: NaiveDateTime,
    ) -> Result<RunResult, PipelineError> {
        let records = self.fetch_listing(now).await?;
        info!(count = records.len(), "Recent advisories found");

        if !self.config.pre_notify_delay.is_zero() {
            info!(
                wait_secs = self.config.pre_notify_delay.as_secs(),
                "Pausing before notifying"
            );
            tokio::time::sleep(self.config.pre_notify_delay).await;
        }

        if records.is_empty() {
            notifier
                .no_advisories()
                .await
                .map_err(PipelineError::NoticeDelivery)?;
            return Ok(RunResult::NoAdvisories);
        }

        let mut outcomes = Vec::with_capacity(records.len());
        for record in records {
            let outcome = match self.process(&record, notifier).await {
                Ok(detail) => {
                    info!(zdi_id = %record.zdi_id, cve_id = %record.cve_id, "Advisory delivered");
                    AdvisoryOutcome::Delivered { record, detail }
                }
                Err(reason) => {
                    error!(
                        zdi_id = %record.zdi_id,
                        url = record.detail_url.as_deref().unwrap_or("-"),
                        error = %reason,
                        "Skipping advisory"
                    );
                    AdvisoryOutcome::Skipped { record, reason }
                }
            };
            outcomes.push(outcome);
        }

        let skipped = skipped_summary(&outcomes);
        if !skipped.is_empty() {
            if let Err(e) = notifier.skipped(&skipped).await {
                warn!(error = %e, count = skipped.len(), "Could not deliver the skipped-advisories summary");
            }
        }

        Ok(RunResult::Processed(outcomes))
    }

    async fn fetch_listing(&self, now: NaiveDateTime) -> Result<Vec<AdvisoryRecord>, PipelineError> {
        let url = self.config.listing_url()?;
        let document = self
            .fetcher
            .fetch(url.as_str())
            .await
            .map_err(PipelineError::ListingFetch)?;
        self.listing
            .extract_recent_advisories(&document, now)
            .map_err(PipelineError::ListingExtract)
    }

    /// Fetch, read and deliver one advisory.
    async fn process(
        &self,
        record: &AdvisoryRecord,
        notifier: &dyn Notifier,
    ) -> Result<AdvisoryDetail, AdvisoryError> {
        let detail = {
            let url = record
                .detail_url
                .as_deref()
                .ok_or(ExtractError::MissingElement("advisory detail link"))?;
            let document = self.fetcher.fetch(url).await?;
            extract_detail(&document)?
        };
        notifier.advisory(record, &detail).await?;
        Ok(detail)
    }
}

fn skipped_summary(outcomes: &[AdvisoryOutcome]) -> Vec<SkippedAdvisory> {
    outcomes
        .iter()
        .filter_map(|o| match o {
            AdvisoryOutcome::Skipped { record, reason } => Some(SkippedAdvisory {
                zdi_id: record.zdi_id.clone(),
                cve_id: record.cve_id.clone(),
                detail_url: record.detail_url.clone(),
                reason: reason.to_string(),
            }),
            AdvisoryOutcome::Delivered { .. } => None,
        })
        .collect()
}
