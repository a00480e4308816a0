use std::sync::Arc;

use luisbot_core::{ActivityType, Error, Result};
use luisbot_nlu::{RecognitionResult, ServiceRegistry};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::TurnContext;

/// Logical service name the bot requires from the registry.
pub const LUIS_KEY: &str = "LuisBot";

const GREETING: &str = "HELLO!";

const HELP_TEXT: &str = "No LUIS intents were found.\n\
    This sample is about identifying two user intents:\n\
    'Calendar.Add'\n\
    'Calendar.Find'\n\
    Try typing 'Add Event' or 'Show me tomorrow'.";

/// One instance handles exactly one turn; no state survives the turn.
pub struct LuisBot {
    registry: Arc<ServiceRegistry>,
}

impl std::fmt::Debug for LuisBot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LuisBot").finish_non_exhaustive()
    }
}

impl LuisBot {
    /// Requires the registry to carry the [`LUIS_KEY`] recognizer. A
    /// registry without it is a configuration defect, surfaced here so
    /// the host can fail before any turn is processed.
    pub fn new(registry: Arc<ServiceRegistry>) -> Result<Self> {
        if !registry.contains(LUIS_KEY) {
            return Err(Error::Config(format!(
                "Service registry has no '{}' recognizer; check the bot file's luis services",
                LUIS_KEY
            )));
        }
        Ok(Self { registry })
    }

    /// Process one inbound activity, writing zero or more replies through
    /// the turn context. Recognition failures come back as typed errors
    /// with no reply sent; the caller decides user-visible behavior.
    pub async fn on_turn(
        &self,
        context: &mut TurnContext,
        cancel: &CancellationToken,
    ) -> Result<()> {
        match context.activity().activity_type.clone() {
            ActivityType::Message => self.on_message(context, cancel).await,
            ActivityType::ConversationUpdate => {
                context.send_activity(GREETING);
                Ok(())
            }
            ActivityType::Other(kind) => {
                if cancel.is_cancelled() {
                    return Err(Error::Cancelled);
                }
                context.send_activity(&format!("{} event detected", kind));
                Ok(())
            }
        }
    }

    async fn on_message(
        &self,
        context: &mut TurnContext,
        cancel: &CancellationToken,
    ) -> Result<()> {
        let text = context.activity().text.clone().unwrap_or_default();
        let recognizer = self.registry.recognizer(LUIS_KEY).ok_or_else(|| {
            Error::Config(format!("Service registry has no '{}' recognizer", LUIS_KEY))
        })?;

        // The turn's only suspension point.
        let result = recognizer.recognize(&text, cancel).await?;

        match result.top_intent() {
            Some(top) if top.intent != RecognitionResult::NONE_INTENT => {
                info!(intent = %top.intent, score = top.score, "Top scoring intent");
                context.send_activity(&format!(
                    "==>LUIS Top Scoring Intent: {}, Score: {}",
                    top.intent, top.score
                ));
            }
            _ => {
                debug!("No actionable intent recognized");
                context.send_activity(HELP_TEXT);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use luisbot_core::{Activity, EndpointService};
    use luisbot_nlu::{IntentScore, Recognizer};

    struct FixedRecognizer {
        result: RecognitionResult,
    }

    #[async_trait]
    impl Recognizer for FixedRecognizer {
        async fn recognize(
            &self,
            _text: &str,
            _cancel: &CancellationToken,
        ) -> Result<RecognitionResult> {
            Ok(self.result.clone())
        }
    }

    struct FailingRecognizer;

    #[async_trait]
    impl Recognizer for FailingRecognizer {
        async fn recognize(
            &self,
            _text: &str,
            _cancel: &CancellationToken,
        ) -> Result<RecognitionResult> {
            Err(Error::Recognizer("connection reset".to_string()))
        }
    }

    /// Blocks until the token fires, the way a real in-flight HTTP call
    /// behaves when the host shuts down mid-turn.
    struct PendingRecognizer;

    #[async_trait]
    impl Recognizer for PendingRecognizer {
        async fn recognize(
            &self,
            _text: &str,
            cancel: &CancellationToken,
        ) -> Result<RecognitionResult> {
            cancel.cancelled().await;
            Err(Error::Cancelled)
        }
    }

    fn endpoint() -> EndpointService {
        EndpointService {
            id: "1".to_string(),
            name: "development".to_string(),
            endpoint: "http://localhost:3978/api/messages".to_string(),
            app_id: String::new(),
            app_password: String::new(),
        }
    }

    fn registry_with(recognizer: Arc<dyn Recognizer>) -> Arc<ServiceRegistry> {
        let mut registry = ServiceRegistry::new(endpoint());
        registry.insert(LUIS_KEY, recognizer);
        Arc::new(registry)
    }

    fn recognition(intent: &str, score: f64) -> RecognitionResult {
        RecognitionResult {
            query: String::new(),
            intents: vec![IntentScore {
                intent: intent.to_string(),
                score,
            }],
            top_scoring_intent: Some(IntentScore {
                intent: intent.to_string(),
                score,
            }),
        }
    }

    #[test]
    fn test_construction_fails_without_luis_key() {
        let registry = Arc::new(ServiceRegistry::new(endpoint()));
        let err = LuisBot::new(registry).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[tokio::test]
    async fn test_message_replies_with_top_intent() {
        let registry = registry_with(Arc::new(FixedRecognizer {
            result: recognition("Calendar.Add", 0.91),
        }));
        let bot = LuisBot::new(registry).unwrap();

        let mut context = TurnContext::new(Activity::message("add event tomorrow"));
        bot.on_turn(&mut context, &CancellationToken::new())
            .await
            .unwrap();

        let replies = context.replies();
        assert_eq!(replies.len(), 1);
        assert_eq!(
            replies[0].text.as_deref(),
            Some("==>LUIS Top Scoring Intent: Calendar.Add, Score: 0.91")
        );
    }

    #[tokio::test]
    async fn test_none_intent_gets_help_message() {
        let registry = registry_with(Arc::new(FixedRecognizer {
            result: recognition("None", 1.0),
        }));
        let bot = LuisBot::new(registry).unwrap();

        let mut context = TurnContext::new(Activity::message("asdkjasd"));
        bot.on_turn(&mut context, &CancellationToken::new())
            .await
            .unwrap();

        let replies = context.replies();
        assert_eq!(replies.len(), 1);
        let text = replies[0].text.as_deref().unwrap();
        assert!(text.contains("Calendar.Add"));
        assert!(text.contains("Calendar.Find"));
    }

    #[tokio::test]
    async fn test_empty_recognition_gets_help_message() {
        let registry = registry_with(Arc::new(FixedRecognizer {
            result: RecognitionResult::default(),
        }));
        let bot = LuisBot::new(registry).unwrap();

        let mut context = TurnContext::new(Activity::message("asdkjasd"));
        bot.on_turn(&mut context, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(context.replies().len(), 1);
        assert!(context.replies()[0]
            .text
            .as_deref()
            .unwrap()
            .contains("Calendar.Find"));
    }

    #[tokio::test]
    async fn test_score_is_formatted_as_received() {
        let registry = registry_with(Arc::new(FixedRecognizer {
            result: recognition("Calendar.Find", 1.0),
        }));
        let bot = LuisBot::new(registry).unwrap();

        let mut context = TurnContext::new(Activity::message("show me tomorrow"));
        bot.on_turn(&mut context, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(
            context.replies()[0].text.as_deref(),
            Some("==>LUIS Top Scoring Intent: Calendar.Find, Score: 1")
        );
    }

    #[tokio::test]
    async fn test_conversation_update_greets() {
        let registry = registry_with(Arc::new(FixedRecognizer {
            result: RecognitionResult::default(),
        }));
        let bot = LuisBot::new(registry).unwrap();

        let mut activity = Activity::message("ignored");
        activity.activity_type = ActivityType::ConversationUpdate;
        activity.text = None;

        let mut context = TurnContext::new(activity);
        bot.on_turn(&mut context, &CancellationToken::new())
            .await
            .unwrap();

        let replies = context.replies();
        assert_eq!(replies.len(), 1);
        assert_eq!(replies[0].text.as_deref(), Some("HELLO!"));
    }

    #[tokio::test]
    async fn test_other_types_echo_the_wire_name() {
        let registry = registry_with(Arc::new(FixedRecognizer {
            result: RecognitionResult::default(),
        }));
        let bot = LuisBot::new(registry).unwrap();

        let mut activity = Activity::message("ignored");
        activity.activity_type = ActivityType::Other("typing".to_string());

        let mut context = TurnContext::new(activity);
        bot.on_turn(&mut context, &CancellationToken::new())
            .await
            .unwrap();

        let replies = context.replies();
        assert_eq!(replies.len(), 1);
        assert_eq!(replies[0].text.as_deref(), Some("typing event detected"));
    }

    #[tokio::test]
    async fn test_recognizer_failure_propagates_without_reply() {
        let registry = registry_with(Arc::new(FailingRecognizer));
        let bot = LuisBot::new(registry).unwrap();

        let mut context = TurnContext::new(Activity::message("add event"));
        let err = bot
            .on_turn(&mut context, &CancellationToken::new())
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Recognizer(_)));
        assert!(context.replies().is_empty());
    }

    #[tokio::test]
    async fn test_cancellation_aborts_recognition() {
        let registry = registry_with(Arc::new(PendingRecognizer));
        let bot = LuisBot::new(registry).unwrap();

        let cancel = CancellationToken::new();
        cancel.cancel();

        let mut context = TurnContext::new(Activity::message("add event"));
        let err = bot.on_turn(&mut context, &cancel).await.unwrap_err();

        assert!(matches!(err, Error::Cancelled));
        assert!(context.replies().is_empty());
    }

    #[tokio::test]
    async fn test_cancelled_token_suppresses_event_echo() {
        let registry = registry_with(Arc::new(FixedRecognizer {
            result: RecognitionResult::default(),
        }));
        let bot = LuisBot::new(registry).unwrap();

        let cancel = CancellationToken::new();
        cancel.cancel();

        let mut activity = Activity::message("ignored");
        activity.activity_type = ActivityType::Other("deleteUserData".to_string());

        let mut context = TurnContext::new(activity);
        let err = bot.on_turn(&mut context, &cancel).await.unwrap_err();

        assert!(matches!(err, Error::Cancelled));
        assert!(context.replies().is_empty());
    }
}
