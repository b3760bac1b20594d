use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use serde::Serialize;
use uuid::Uuid;

/// Webhook URL shipped in sample environments; treated as "not configured".
pub const PLACEHOLDER_WEBHOOK_URL: &str = "http://example.com";

const WEBHOOK_TIMEOUT: Duration = Duration::from_secs(10);

/// Context sent downstream whenever a failing check-in opens an intervention.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InterventionNotice {
    pub student_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub student_name: Option<String>,
    pub daily_log_id: Uuid,
    pub intervention_id: Uuid,
    pub quiz_score: i32,
    pub focus_minutes: i32,
}

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, notice: &InterventionNotice) -> anyhow::Result<()>;
}

pub struct WebhookNotifier {
    client: reqwest::Client,
    url: String,
}

impl WebhookNotifier {
    pub fn new(url: impl Into<String>) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(WEBHOOK_TIMEOUT)
            .build()
            .context("failed to build webhook client")?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    async fn send(&self, notice: &InterventionNotice) -> anyhow::Result<()> {
        self.client
            .post(&self.url)
            .json(notice)
            .send()
            .await
            .with_context(|| format!("webhook request to {} failed", self.url))?
            .error_for_status()
            .context("webhook rejected notice")?;
        Ok(())
    }
}

/// Returns `true` when `url` names a real endpoint rather than nothing or the placeholder.
pub fn is_webhook_enabled(url: Option<&str>) -> bool {
    match url.map(str::trim) {
        None | Some("") => false,
        Some(value) => value.trim_end_matches('/') != PLACEHOLDER_WEBHOOK_URL,
    }
}

pub fn webhook_from_url(url: Option<&str>) -> anyhow::Result<Option<Arc<dyn Notifier>>> {
    match url {
        Some(url) if is_webhook_enabled(Some(url)) => {
            let notifier: Arc<dyn Notifier> = Arc::new(WebhookNotifier::new(url.trim())?);
            Ok(Some(notifier))
        }
        _ => Ok(None),
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn sample_notice() -> InterventionNotice {
        InterventionNotice {
            student_id: "s2".to_string(),
            student_name: Some("Jules Moreno".to_string()),
            daily_log_id: Uuid::new_v4(),
            intervention_id: Uuid::new_v4(),
            quiz_score: 5,
            focus_minutes: 30,
        }
    }

    #[test]
    fn placeholder_and_blank_urls_disable_dispatch() {
        assert!(!is_webhook_enabled(None));
        assert!(!is_webhook_enabled(Some("")));
        assert!(!is_webhook_enabled(Some("   ")));
        assert!(!is_webhook_enabled(Some("http://example.com")));
        assert!(!is_webhook_enabled(Some("http://example.com/")));
        assert!(is_webhook_enabled(Some("https://hooks.groupscholar.com/interventions")));
    }

    #[test]
    fn builds_notifier_only_for_real_urls() {
        assert!(webhook_from_url(Some(PLACEHOLDER_WEBHOOK_URL)).unwrap().is_none());
        assert!(webhook_from_url(Some("http://localhost:5678/webhook")).unwrap().is_some());
    }

    #[test]
    fn omits_missing_student_name_from_payload() {
        let mut notice = sample_notice();
        notice.student_name = None;
        let value = serde_json::to_value(&notice).unwrap();
        assert!(value.get("student_name").is_none());
        assert_eq!(value["quiz_score"], 5);
        assert_eq!(value["focus_minutes"], 30);
    }

    #[tokio::test]
    async fn posts_notice_as_json() {
        let server = MockServer::start().await;
        let notice = sample_notice();

        Mock::given(method("POST"))
            .and(path("/webhook/interventions"))
            .and(body_json(serde_json::to_value(&notice).unwrap()))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let notifier =
            WebhookNotifier::new(format!("{}/webhook/interventions", server.uri())).unwrap();
        notifier.send(&notice).await.unwrap();
    }

    #[tokio::test]
    async fn reports_rejected_delivery() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let notifier = WebhookNotifier::new(server.uri()).unwrap();
        let err = notifier.send(&sample_notice()).await.unwrap_err();
        assert!(err.to_string().contains("webhook rejected notice"));
    }
}
