use luisbot_core::{BotConfiguration, Settings};

pub async fn run() -> anyhow::Result<()> {
    let settings = Settings::load()?;
    let bot_file = settings.bot_file_path();

    println!("luisbot status");
    println!("==============");
    println!();
    println!("Environment: {}", settings.environment);
    println!(
        "Bot file:    {} {}",
        bot_file.display(),
        if bot_file.exists() { "✓" } else { "✗ (not found)" }
    );
    println!(
        "Secret:      {}",
        if settings.bot_file_secret.is_some() {
            "configured"
        } else {
            "not set"
        }
    );

    if !bot_file.exists() {
        println!();
        println!("Run `luisbot init` to write starter configuration.");
        return Ok(());
    }

    let config = BotConfiguration::load(&bot_file, settings.bot_file_secret.as_deref())?;

    println!();
    println!("Services:");
    match config.endpoints().find(|e| e.name == settings.environment) {
        Some(endpoint) => {
            println!("  endpoint  {} -> {}", endpoint.name, endpoint.endpoint);
        }
        None => {
            println!(
                "  endpoint  ✗ none declared for environment '{}'",
                settings.environment
            );
        }
    }
    for luis in config.luis_services() {
        let configured = !luis.app_id.is_empty() && !luis.subscription_key.is_empty();
        println!(
            "  luis      {} {}",
            luis.name,
            if configured {
                "✓ configured"
            } else {
                "✗ appId/subscriptionKey not set"
            }
        );
    }

    Ok(())
}
