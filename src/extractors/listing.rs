// =============================================================================
// listing.rs - READING THE PUBLISHED ADVISORIES TABLE
// =============================================================================
//
// The listing is one big table, newest first. We keep the rows that:
//   - have exactly eight cells (header, spacer and promo rows do not),
//   - were published between `now - window` and today.
//
// A kept row without a usable detail link still becomes a record, with no
// `detail_url`. It fails later, on its own, when its detail page is needed.
//
// Publication dates have no time of day, so a row counts as published at
// local midnight of its date. With the default 24h window, that means a run
// at 00:00:00 still sees yesterday's advisories and a run one second later
// does not.
// =============================================================================

use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};
use scraper::{ElementRef, Html};
use tracing::{debug, info, warn};
use url::Url;

use super::selectors::{self, listing_cell};
use crate::config::Config;
use crate::error::ExtractError;
use crate::models::AdvisoryRecord;

/// Turns a listing page into the advisories published inside the window.
#[derive(Debug, Clone)]
pub struct ListingExtractor {
    origin: Url,
    window: Duration,
    strict_dates: bool,
}

impl ListingExtractor {
    pub fn new(origin: Url, window: Duration, strict_dates: bool) -> Self {
        Self {
            origin,
            window,
            strict_dates,
        }
    }

    pub fn from_config(config: &Config) -> Result<Self, url::ParseError> {
        Ok(Self::new(
            Url::parse(&config.site_origin)?,
            config.lookback_window(),
            config.strict_dates,
        ))
    }

    /// Every advisory in `document` published at or after `now - window`, in
    /// document order.
    ///
    /// An empty result is a quiet day, not an error. Errors mean the table
    /// itself could not be found, the window reaches outside the calendar,
    /// or (in strict mode) a row's date was unreadable.
    pub fn extract_recent_advisories(
        &self,
        document: &Html,
        now: NaiveDateTime,
    ) -> Result<Vec<AdvisoryRecord>, ExtractError> {
        let body = selectors::locate(document, selectors::LISTING_TABLE_BODY)?;
        let row_selector = selectors::parse(selectors::LISTING_ROW)?;
        let cell_selector = selectors::parse(selectors::LISTING_CELL)?;
        let cutoff = now
            .checked_sub_signed(self.window)
            .ok_or(ExtractError::WindowOutOfRange {
                now,
                window_hours: self.window.num_hours(),
            })?;

        let mut records = Vec::new();
        let mut rows_seen = 0usize;

        for (index, row) in body.select(&row_selector).enumerate() {
            rows_seen += 1;
            let cells: Vec<ElementRef<'_>> = row.select(&cell_selector).collect();
            if cells.len() != selectors::LISTING_CELL_COUNT {
                debug!(row = index, cells = cells.len(), "Ignoring non-advisory row");
                continue;
            }

            match self.read_row(index, &cells, cutoff, now) {
                Ok(Some(record)) => records.push(record),
                Ok(None) => {}
                Err(err @ ExtractError::InvalidDate { .. }) if self.strict_dates => return Err(err),
                Err(err) => warn!(row = index, error = %err, "Skipping unreadable listing row"),
            }
        }

        info!(
            rows = rows_seen,
            recent = records.len(),
            cutoff = %cutoff,
            "Listing extracted"
        );
        Ok(records)
    }

    /// `Ok(None)` for a well-formed row outside the window.
    fn read_row(
        &self,
        index: usize,
        cells: &[ElementRef<'_>],
        cutoff: NaiveDateTime,
        now: NaiveDateTime,
    ) -> Result<Option<AdvisoryRecord>, ExtractError> {
        let date_text = selectors::text_of(cells[listing_cell::PUBLISHED]);
        let published_date = NaiveDate::parse_from_str(&date_text, selectors::LISTING_DATE_FORMAT)
            .map_err(|source| ExtractError::InvalidDate {
                row: index,
                value: date_text.clone(),
                source,
            })?;

        if published_date.and_time(NaiveTime::MIN) < cutoff {
            return Ok(None);
        }
        if published_date > now.date() {
            debug!(row = index, %published_date, "Ignoring row dated in the future");
            return Ok(None);
        }

        let detail_url = match self.detail_url(cells[listing_cell::DESCRIPTION]) {
            Ok(Some(url)) => Some(url),
            Ok(None) => {
                warn!(row = index, "Listing row has no detail link");
                None
            }
            Err(err) => {
                warn!(row = index, error = %err, "Listing row has an unusable detail link");
                None
            }
        };

        Ok(Some(AdvisoryRecord {
            zdi_id: selectors::text_of(cells[listing_cell::ZDI_ID]),
            zdi_can: selectors::text_of(cells[listing_cell::ZDI_CAN]),
            vendor: selectors::text_of(cells[listing_cell::VENDOR]),
            cve_id: selectors::text_of(cells[listing_cell::CVE_ID]),
            cvss_score: selectors::text_of(cells[listing_cell::CVSS]),
            published_date,
            extra: selectors::text_of(cells[listing_cell::EXTRA]),
            description: selectors::text_of(cells[listing_cell::DESCRIPTION]),
            detail_url,
        }))
    }

    fn detail_url(&self, cell: ElementRef<'_>) -> Result<Option<String>, ExtractError> {
        let Some(href) = selectors::first_link(cell)? else {
            return Ok(None);
        };
        let url = self
            .origin
            .join(&href)
            .map_err(|source| ExtractError::InvalidLink {
                origin: self.origin.to_string(),
                href: href.clone(),
                source,
            })?;
        Ok(Some(url.to_string()))
    }
}
