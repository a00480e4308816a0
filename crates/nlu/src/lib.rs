pub mod luis;
pub mod registry;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use luisbot_core::Result;

/// One ranked intent as returned by the recognition service. The score is
/// carried exactly as received.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntentScore {
    pub intent: String,
    #[serde(default)]
    pub score: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecognitionResult {
    #[serde(default)]
    pub query: String,
    #[serde(default)]
    pub intents: Vec<IntentScore>,
    #[serde(default)]
    pub top_scoring_intent: Option<IntentScore>,
}

impl RecognitionResult {
    /// Sentinel intent name the service uses for "no actionable intent".
    pub const NONE_INTENT: &'static str = "None";

    /// The service-declared top entry when present, otherwise the
    /// best-scoring member of the ranked list.
    pub fn top_intent(&self) -> Option<&IntentScore> {
        self.top_scoring_intent.as_ref().or_else(|| {
            self.intents.iter().max_by(|a, b| {
                a.score
                    .partial_cmp(&b.score)
                    .unwrap_or(std::cmp::Ordering::Equal)
            })
        })
    }
}

#[async_trait]
pub trait Recognizer: Send + Sync {
    /// Run one utterance through the NLU service. The cancellation token
    /// aborts the in-flight call; single attempt, no retry.
    async fn recognize(&self, text: &str, cancel: &CancellationToken)
        -> Result<RecognitionResult>;
}

pub use luis::LuisRecognizer;
pub use registry::ServiceRegistry;
