// =============================================================================
// models.rs - THE SHAPES OF AN ADVISORY
// =============================================================================
//
// An advisory reaches us in two halves. The listing row gives identifiers,
// vendor, score and date; the detail page adds the prose. Both halves are
// built fresh each run, handed to the notifier and dropped.
// =============================================================================

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

/// One row of the published advisories table.
///
/// Only rows published inside the lookback window are ever turned into one of
/// these. `detail_url` is absolute, or `None` when the row has no usable link.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdvisoryRecord {
    /// ZDI's public identifier, e.g. `ZDI-24-512`.
    pub zdi_id: String,

    /// ZDI's internal candidate number, e.g. `ZDI-CAN-21871`.
    pub zdi_can: String,

    pub vendor: String,

    /// Empty or a placeholder when no CVE has been assigned yet.
    pub cve_id: String,

    /// Kept as text: the site mixes `7.8`, `7.8 (AV:L/...)` and blanks.
    pub cvss_score: String,

    pub published_date: NaiveDate,

    /// The free-text annotation column (updated dates, 0-day markers).
    pub extra: String,

    pub description: String,

    pub detail_url: Option<String>,
}

impl fmt::Display for AdvisoryRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ({}) {} CVSS {} published {}",
            self.zdi_id, self.cve_id, self.vendor, self.cvss_score, self.published_date
        )
    }
}

/// The fields read from an advisory's own page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdvisoryDetail {
    pub affected_products: String,
    pub vulnerability_details: String,
    pub additional_details: String,
    /// First link inside the additional details cell, usually the vendor fix.
    pub additional_details_link: Option<String>,
    pub disclosure_timeline: String,
}

/// The named fields of a detail page, in page order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DetailField {
    AffectedProducts,
    VulnerabilityDetails,
    AdditionalDetails,
    DisclosureTimeline,
}

impl DetailField {
    /// The row heading the site prints next to this field.
    pub fn label(&self) -> &'static str {
        match self {
            DetailField::AffectedProducts => "AFFECTED PRODUCTS",
            DetailField::VulnerabilityDetails => "VULNERABILITY DETAILS",
            DetailField::AdditionalDetails => "ADDITIONAL DETAILS",
            DetailField::DisclosureTimeline => "DISCLOSURE TIMELINE",
        }
    }
}

impl fmt::Display for DetailField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// An advisory that made it into the listing but not to the notifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedAdvisory {
    pub zdi_id: String,
    pub cve_id: String,
    pub detail_url: Option<String>,
    /// Rendered error, e.g. `transport failure fetching ... after 3 attempt(s)`.
    pub reason: String,
}
