// =============================================================================
// notifier/mod.rs - WHERE ADVISORIES GO WHEN THEY'RE DONE
// =============================================================================
//
// The pipeline does not know about Slack. It knows a `Notifier` that accepts
// three kinds of news:
//   - an advisory, complete with its detail page,
//   - "nothing new today",
//   - a roll-call of advisories that were found but could not be processed.
//
// `SlackNotifier` is the real destination. `LogNotifier` stands in when no
// Slack credentials are configured, which is also handy for a dry run.
// =============================================================================

pub mod slack;

use async_trait::async_trait;
use serde::Serialize;
use tracing::{info, warn};

use crate::error::NotifyError;
use crate::models::{AdvisoryDetail, AdvisoryRecord, SkippedAdvisory};

pub use slack::SlackNotifier;

/// Receives the results of a run, one message at a time.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// One fully extracted advisory. Called as soon as it is ready.
    async fn advisory(
        &self,
        record: &AdvisoryRecord,
        detail: &AdvisoryDetail,
    ) -> Result<(), NotifyError>;

    /// Nothing was published inside the window.
    async fn no_advisories(&self) -> Result<(), NotifyError>;

    /// Advisories from the listing that never reached `advisory`.
    async fn skipped(&self, skipped: &[SkippedAdvisory]) -> Result<(), NotifyError>;
}

/// Both halves of an advisory, as one serializable payload.
#[derive(Debug, Serialize)]
pub struct AdvisoryPayload<'a> {
    pub record: &'a AdvisoryRecord,
    pub detail: &'a AdvisoryDetail,
}

/// Writes every notification to the log as JSON.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn advisory(
        &self,
        record: &AdvisoryRecord,
        detail: &AdvisoryDetail,
    ) -> Result<(), NotifyError> {
        let payload = serde_json::to_string(&AdvisoryPayload { record, detail })?;
        info!(
            zdi_id = %record.zdi_id,
            cve_id = %record.cve_id,
            payload = %payload,
            "New advisory"
        );
        Ok(())
    }

    async fn no_advisories(&self) -> Result<(), NotifyError> {
        info!("No new advisories in the lookback window");
        Ok(())
    }

    async fn skipped(&self, skipped: &[SkippedAdvisory]) -> Result<(), NotifyError> {
        let payload = serde_json::to_string(skipped)?;
        warn!(count = skipped.len(), payload = %payload, "Advisories skipped");
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! A notifier that remembers what it was told, and can be told to fail.

    use std::collections::HashSet;
    use std::sync::Mutex;
    use std::time::Instant;

    use super::*;

    #[derive(Debug, Clone, PartialEq, Eq)]
    pub enum Sent {
        Advisory(String),
        NoAdvisories,
        Skipped(Vec<String>),
    }

    #[derive(Default)]
    pub struct RecordingNotifier {
        pub sent: Mutex<Vec<Sent>>,
        pub first_sent_at: Mutex<Option<Instant>>,
        /// Advisory ids whose delivery should fail.
        pub refuse: HashSet<String>,
    }

    impl RecordingNotifier {
        pub fn refusing(ids: &[&str]) -> Self {
            Self {
                refuse: ids.iter().map(|s| s.to_string()).collect(),
                ..Self::default()
            }
        }

        pub fn sent(&self) -> Vec<Sent> {
            self.sent.lock().unwrap().clone()
        }

        pub fn first_sent_at(&self) -> Option<Instant> {
            *self.first_sent_at.lock().unwrap()
        }

        fn push(&self, sent: Sent) {
            self.first_sent_at
                .lock()
                .unwrap()
                .get_or_insert_with(Instant::now);
            self.sent.lock().unwrap().push(sent);
        }
    }

    #[async_trait]
    impl Notifier for RecordingNotifier {
        async fn advisory(
            &self,
            record: &AdvisoryRecord,
            _detail: &AdvisoryDetail,
        ) -> Result<(), NotifyError> {
            if self.refuse.contains(&record.zdi_id) {
                return Err(NotifyError::Api("rate_limited".to_string()));
            }
            self.push(Sent::Advisory(record.zdi_id.clone()));
            Ok(())
        }

        async fn no_advisories(&self) -> Result<(), NotifyError> {
            self.push(Sent::NoAdvisories);
            Ok(())
        }

        async fn skipped(&self, skipped: &[SkippedAdvisory]) -> Result<(), NotifyError> {
            self.push(Sent::Skipped(
                skipped.iter().map(|s| s.zdi_id.clone()).collect(),
            ));
            Ok(())
        }
    }
}
