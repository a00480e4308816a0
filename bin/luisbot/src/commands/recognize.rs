use std::sync::Arc;

use luisbot_agent::LUIS_KEY;
use luisbot_core::{BotConfiguration, Settings};
use luisbot_nlu::{RecognitionResult, ServiceRegistry};
use tokio_util::sync::CancellationToken;

/// One-shot recognition from the CLI, bypassing the HTTP endpoint.
pub async fn run(text: &str) -> anyhow::Result<()> {
    let settings = Settings::load()?;
    let config = BotConfiguration::load(
        &settings.bot_file_path(),
        settings.bot_file_secret.as_deref(),
    )?;
    let registry = Arc::new(ServiceRegistry::from_bot_config(
        &config,
        &settings.environment,
    )?);

    let recognizer = registry.recognizer(LUIS_KEY).ok_or_else(|| {
        anyhow::anyhow!("Bot file declares no '{}' luis service", LUIS_KEY)
    })?;

    let cancel = CancellationToken::new();
    let result = recognizer.recognize(text, &cancel).await?;

    match result.top_intent() {
        Some(top) if top.intent != RecognitionResult::NONE_INTENT => {
            println!("Top intent: {} (score {})", top.intent, top.score);
        }
        _ => {
            println!("No actionable intent recognized.");
        }
    }

    if !result.intents.is_empty() {
        println!();
        println!("All intents:");
        for intent in &result.intents {
            println!("  {:<24} {}", intent.intent, intent.score);
        }
    }

    Ok(())
}
