// =============================================================================
// ZDI WATCH
// =============================================================================
//
// Checks the Zero Day Initiative's published advisories once, picks out what
// appeared in the last day, reads each advisory's page and hands the results
// to a notifier. Meant to be started by cron, a systemd timer or a CI
// schedule; it keeps no state between runs.
// =============================================================================

pub mod config;
pub mod error;
pub mod extractors;
pub mod fetcher;
pub mod models;
pub mod notifier;
pub mod pipeline;

#[cfg(test)]
mod fixtures;
