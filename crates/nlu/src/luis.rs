use async_trait::async_trait;
use luisbot_core::{Error, LuisService, Result};
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::{IntentScore, RecognitionResult, Recognizer};

const LUIS_HOST_SUFFIX: &str = "api.cognitive.microsoft.com";
const DEFAULT_REGION: &str = "westus";

/// HTTP client for one LUIS application, connected for the process
/// lifetime and reused by every turn.
pub struct LuisRecognizer {
    client: Client,
    app_id: String,
    subscription_key: String,
    api_base: String,
}

impl LuisRecognizer {
    pub fn new(service: &LuisService) -> Self {
        let region = if service.region.is_empty() {
            DEFAULT_REGION
        } else {
            &service.region
        };
        Self::with_api_base(service, &format!("https://{}.{}", region, LUIS_HOST_SUFFIX))
    }

    /// Point the recognizer at an explicit base URL (tests, sovereign
    /// clouds).
    pub fn with_api_base(service: &LuisService, api_base: &str) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .unwrap_or_else(|e| {
                warn!(error = %e, "Failed to build HTTP client, using default");
                Client::new()
            });
        Self {
            client,
            app_id: service.app_id.clone(),
            subscription_key: service.subscription_key.clone(),
            api_base: api_base.trim_end_matches('/').to_string(),
        }
    }

    fn query_url(&self) -> String {
        format!("{}/luis/v2.0/apps/{}", self.api_base, self.app_id)
    }
}

#[async_trait]
impl Recognizer for LuisRecognizer {
    async fn recognize(
        &self,
        text: &str,
        cancel: &CancellationToken,
    ) -> Result<RecognitionResult> {
        let url = self.query_url();
        info!(url = %url, "Calling LUIS recognition endpoint");

        let request = self
            .client
            .get(&url)
            .query(&[
                ("subscription-key", self.subscription_key.as_str()),
                ("verbose", "true"),
                ("timezoneOffset", "0"),
                ("q", text),
            ])
            .send();

        let response = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(Error::Cancelled),
            response = request => {
                response.map_err(|e| Error::Recognizer(format!("LUIS request failed: {}", e)))?
            }
        };

        let status = response.status();
        let raw_body = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(Error::Cancelled),
            body = response.text() => body.unwrap_or_default(),
        };

        if !status.is_success() {
            error!(status = %status, body = %raw_body, "LUIS API error");
            return Err(Error::Recognizer(format!(
                "LUIS API error {}: {}",
                status, raw_body
            )));
        }

        debug!(body_len = raw_body.len(), "LUIS raw response");

        let resp: LuisResponse = serde_json::from_str(&raw_body).map_err(|e| {
            Error::Recognizer(format!(
                "Failed to parse LUIS response: {}. Body: {}",
                e,
                &raw_body[..raw_body.len().min(500)]
            ))
        })?;

        Ok(resp.into())
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LuisResponse {
    #[serde(default)]
    query: String,
    #[serde(default)]
    top_scoring_intent: Option<IntentScore>,
    #[serde(default)]
    intents: Vec<IntentScore>,
}

impl From<LuisResponse> for RecognitionResult {
    fn from(resp: LuisResponse) -> Self {
        RecognitionResult {
            query: resp.query,
            intents: resp.intents,
            top_scoring_intent: resp.top_scoring_intent,
        }
    }
}
