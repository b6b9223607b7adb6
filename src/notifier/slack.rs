// =============================================================================
// slack.rs - POSTING TO THE CHANNEL
// =============================================================================
//
// One `chat.postMessage` per advisory. Each message carries a plain-text
// summary (what shows up in the notification banner) and a Block Kit section
// with the details, an optional image accessory, and a divider.
//
// Slack reports most failures as HTTP 200 with `{"ok": false, "error": ...}`,
// so the body is checked as well as the status.
// =============================================================================

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::info;

use super::Notifier;
use crate::config::Config;
use crate::error::NotifyError;
use crate::models::{AdvisoryDetail, AdvisoryRecord, SkippedAdvisory};

/// Characters of vulnerability text included in the notification summary.
const SUMMARY_DETAIL_CHARS: usize = 75;

const NO_ADVISORIES_TEXT: &str =
    ":large_green_circle: No new Zero Day advisories in the last 24 hours :large_green_circle:";

/// A rendered message: fallback text plus blocks.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SlackMessage {
    pub text: String,
    pub blocks: Vec<Value>,
}

#[derive(Debug, Serialize)]
struct PostMessage<'a> {
    channel: &'a str,
    text: &'a str,
    blocks: &'a [Value],
}

#[derive(Debug, Deserialize)]
struct PostMessageResponse {
    ok: bool,
    #[serde(default)]
    error: Option<String>,
}

pub struct SlackNotifier {
    client: reqwest::Client,
    api_url: String,
    token: String,
    channel: String,
    image_url: Option<String>,
}

impl SlackNotifier {
    pub fn new(
        client: reqwest::Client,
        api_url: impl Into<String>,
        token: impl Into<String>,
        channel: impl Into<String>,
        image_url: Option<String>,
    ) -> Self {
        Self {
            client,
            api_url: api_url.into(),
            token: token.into(),
            channel: channel.into(),
            image_url,
        }
    }

    /// `None` when the token or channel is not configured.
    pub fn from_config(config: &Config) -> Result<Option<Self>, reqwest::Error> {
        let (Some(token), Some(channel)) = (&config.slack_token, &config.slack_channel) else {
            return Ok(None);
        };
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()?;
        Ok(Some(Self::new(
            client,
            config.slack_api_url.clone(),
            token.clone(),
            channel.clone(),
            config.slack_image_url.clone(),
        )))
    }

    async fn post(&self, message: &SlackMessage) -> Result<(), NotifyError> {
        let response: PostMessageResponse = self
            .client
            .post(&self.api_url)
            .bearer_auth(&self.token)
            .json(&PostMessage {
                channel: &self.channel,
                text: &message.text,
                blocks: &message.blocks,
            })
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        if !response.ok {
            return Err(NotifyError::Api(
                response.error.unwrap_or_else(|| "unknown_error".to_string()),
            ));
        }

        info!(channel = %self.channel, "Posted message to Slack");
        Ok(())
    }
}

#[async_trait]
impl Notifier for SlackNotifier {
    async fn advisory(
        &self,
        record: &AdvisoryRecord,
        detail: &AdvisoryDetail,
    ) -> Result<(), NotifyError> {
        self.post(&advisory_message(record, detail, self.image_url.as_deref()))
            .await
    }

    async fn no_advisories(&self) -> Result<(), NotifyError> {
        self.post(&no_advisories_message(self.image_url.as_deref()))
            .await
    }

    async fn skipped(&self, skipped: &[SkippedAdvisory]) -> Result<(), NotifyError> {
        if skipped.is_empty() {
            return Ok(());
        }
        self.post(&skipped_message(skipped)).await
    }
}

pub fn advisory_message(
    record: &AdvisoryRecord,
    detail: &AdvisoryDetail,
    image_url: Option<&str>,
) -> SlackMessage {
    let excerpt: String = detail
        .vulnerability_details
        .chars()
        .take(SUMMARY_DETAIL_CHARS)
        .collect();
    let text = format!(":red_circle: CVE ID: {} - {}...", record.cve_id, excerpt);

    let body = format!(
        "*New Zero Day Vulnerability advisory :red_circle:*\n\n\
         *CVE ID:* {}\n\
         *CVSS SCORE:* {}\n\
         *AFFECTED VENDOR:* {}\n\
         *AFFECTED PRODUCTS:* {}\n\
         *VULNERABILITY DETAILS:* {}\n\
         *ADDITIONAL DETAILS:* {}\n",
        record.cve_id,
        record.cvss_score,
        record.vendor,
        detail.affected_products,
        detail.vulnerability_details,
        detail.additional_details,
    );

    SlackMessage {
        text,
        blocks: vec![section(&body, image_url), json!({ "type": "divider" })],
    }
}

pub fn no_advisories_message(image_url: Option<&str>) -> SlackMessage {
    SlackMessage {
        text: NO_ADVISORIES_TEXT.to_string(),
        blocks: vec![
            section(
                ":large_green_circle: No new Zero Day advisories in the last 24 hours\n",
                image_url,
            ),
            json!({ "type": "divider" }),
        ],
    }
}

pub fn skipped_message(skipped: &[SkippedAdvisory]) -> SlackMessage {
    let text = format!(
        ":warning: {} Zero Day advisor{} could not be processed",
        skipped.len(),
        if skipped.len() == 1 { "y" } else { "ies" }
    );
    let mut body = format!("*{text}*\n\n");
    for s in skipped {
        match &s.detail_url {
            Some(url) => body.push_str(&format!("*{}* ({}) <{}>\n", s.zdi_id, s.cve_id, url)),
            None => body.push_str(&format!("*{}* ({})\n", s.zdi_id, s.cve_id)),
        }
        body.push_str(&format!("_{}_\n", s.reason));
    }

    SlackMessage {
        text,
        blocks: vec![section(&body, None), json!({ "type": "divider" })],
    }
}

fn section(markdown: &str, image_url: Option<&str>) -> Value {
    let mut block = json!({
        "type": "section",
        "text": { "type": "mrkdwn", "text": markdown },
    });
    if let Some(url) = image_url {
        block["accessory"] = json!({
            "type": "image",
            "image_url": url,
            "alt_text": "CVE details",
        });
    }
    block
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn record() -> AdvisoryRecord {
        AdvisoryRecord {
            zdi_id: "ZDI-24-512".to_string(),
            zdi_can: "ZDI-CAN-21871".to_string(),
            vendor: "Ivanti".to_string(),
            cve_id: "CVE-2024-29205".to_string(),
            cvss_score: "7.8".to_string(),
            published_date: NaiveDate::from_ymd_opt(2024, 5, 22).unwrap(),
            extra: String::new(),
            description: "Ivanti Avalanche Heap-based Buffer Overflow".to_string(),
            detail_url: Some("https://www.zerodayinitiative.com/advisories/ZDI-24-512/".to_string()),
        }
    }

    fn detail() -> AdvisoryDetail {
        AdvisoryDetail {
            affected_products: "Avalanche".to_string(),
            vulnerability_details: "This vulnerability allows remote attackers to execute arbitrary code on affected installations of Ivanti Avalanche.".to_string(),
            additional_details: "Ivanti has issued an update.".to_string(),
            additional_details_link: Some("https://forums.ivanti.com/s/article/Avalanche-6-4-3".to_string()),
            disclosure_timeline: "2024-05-22 - Coordinated public release of advisory".to_string(),
        }
    }

    fn notifier(server: &MockServer) -> SlackNotifier {
        SlackNotifier::new(
            reqwest::Client::new(),
            format!("{}/api/chat.postMessage", server.uri()),
            "xoxb-test",
            "C0123456",
            Some("https://img.example/zdi.png".to_string()),
        )
    }

    #[test]
    fn test_advisory_summary_truncates_details() {
        let msg = advisory_message(&record(), &detail(), None);
        assert_eq!(
            msg.text,
            ":red_circle: CVE ID: CVE-2024-29205 - This vulnerability allows remote attackers to execute arbitrary code on aff..."
        );
        let body = msg.blocks[0]["text"]["text"].as_str().unwrap();
        assert!(body.contains("*CVSS SCORE:* 7.8\n"));
        assert!(body.contains("*AFFECTED VENDOR:* Ivanti\n"));
        assert!(body.contains("*AFFECTED PRODUCTS:* Avalanche\n"));
        assert_eq!(msg.blocks[1]["type"], "divider");
    }

    #[test]
    fn test_image_accessory_only_when_configured() {
        let with = advisory_message(&record(), &detail(), Some("https://img.example/zdi.png"));
        assert_eq!(with.blocks[0]["accessory"]["image_url"], "https://img.example/zdi.png");
        assert_eq!(with.blocks[0]["accessory"]["alt_text"], "CVE details");

        let without = no_advisories_message(None);
        assert!(without.blocks[0].get("accessory").is_none());
    }

    #[test]
    fn test_skipped_message_lists_each_advisory() {
        let msg = skipped_message(&[SkippedAdvisory {
            zdi_id: "ZDI-24-513".to_string(),
            cve_id: "CVE-2024-0001".to_string(),
            detail_url: Some("https://www.zerodayinitiative.com/advisories/ZDI-24-513/".to_string()),
            reason: "detail page is missing 1 field(s): DISCLOSURE TIMELINE".to_string(),
        }]);
        assert_eq!(msg.text, ":warning: 1 Zero Day advisory could not be processed");
        let body = msg.blocks[0]["text"]["text"].as_str().unwrap();
        assert!(body.contains("*ZDI-24-513* (CVE-2024-0001)"));
        assert!(body.contains("DISCLOSURE TIMELINE"));
    }

    #[test]
    fn test_skipped_message_without_link() {
        let msg = skipped_message(&[
            SkippedAdvisory {
                zdi_id: "ZDI-24-900".to_string(),
                cve_id: "CVE-2024-0900".to_string(),
                detail_url: None,
                reason: "page structure changed: no advisory detail link found".to_string(),
            },
            SkippedAdvisory {
                zdi_id: "ZDI-24-901".to_string(),
                cve_id: "CVE-2024-0901".to_string(),
                detail_url: Some("https://www.zerodayinitiative.com/advisories/ZDI-24-901/".to_string()),
                reason: "HTTP 404 Not Found".to_string(),
            },
        ]);
        assert_eq!(msg.text, ":warning: 2 Zero Day advisories could not be processed");
        let body = msg.blocks[0]["text"]["text"].as_str().unwrap();
        assert!(body.contains("*ZDI-24-900* (CVE-2024-0900)\n_page structure changed"));
        assert!(body.contains("*ZDI-24-901* (CVE-2024-0901) <https://www.zerodayinitiative.com/advisories/ZDI-24-901/>\n"));
    }

    #[tokio::test]
    async fn test_posts_with_token_and_channel() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/chat.postMessage"))
            .and(header("authorization", "Bearer xoxb-test"))
            .and(body_partial_json(json!({
                "channel": "C0123456",
                "text": NO_ADVISORIES_TEXT,
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "ok": true })))
            .expect(1)
            .mount(&server)
            .await;

        notifier(&server).no_advisories().await.unwrap();
    }

    #[tokio::test]
    async fn test_api_error_in_ok_response_is_reported() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({ "ok": false, "error": "channel_not_found" })),
            )
            .mount(&server)
            .await;

        let err = notifier(&server)
            .advisory(&record(), &detail())
            .await
            .unwrap_err();
        assert!(matches!(err, NotifyError::Api(ref e) if e == "channel_not_found"));
    }

    #[tokio::test]
    async fn test_empty_skip_list_posts_nothing() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "ok": true })))
            .expect(0)
            .mount(&server)
            .await;

        notifier(&server).skipped(&[]).await.unwrap();
    }

    #[test]
    fn test_from_config_requires_credentials() {
        let config = Config::default();
        assert!(SlackNotifier::from_config(&config).unwrap().is_none());

        let config = Config {
            slack_token: Some("xoxb-test".to_string()),
            slack_channel: Some("C0123456".to_string()),
            ..Config::default()
        };
        assert!(SlackNotifier::from_config(&config).unwrap().is_some());
    }
}
