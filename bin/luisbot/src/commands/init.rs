use std::path::Path;

const APPSETTINGS: &str = r#"{
  "botFilePath": "./nlp-with-luis.bot",
  "environment": "development"
}
"#;

const BOT_FILE: &str = r#"{
  "name": "nlp-with-luis",
  "description": "",
  "services": [
    {
      "type": "endpoint",
      "id": "1",
      "name": "development",
      "endpoint": "http://localhost:3978/api/messages",
      "appId": "",
      "appPassword": ""
    },
    {
      "type": "luis",
      "id": "158",
      "name": "LuisBot",
      "appId": "<your-luis-app-id>",
      "subscriptionKey": "<your-luis-subscription-key>",
      "region": "westus",
      "version": "0.1"
    }
  ],
  "padlock": "",
  "version": "2.0"
}
"#;

const DEFAULT_HTM: &str = r#"<!DOCTYPE html>
<html>
<head>
  <title>luisbot</title>
</head>
<body>
  <h1>luisbot</h1>
  <p>The bot endpoint is listening at <code>/api/messages</code>.</p>
</body>
</html>
"#;

pub async fn run(force: bool) -> anyhow::Result<()> {
    write_if_absent("appsettings.json", APPSETTINGS, force)?;
    write_if_absent("nlp-with-luis.bot", BOT_FILE, force)?;
    std::fs::create_dir_all("wwwroot")?;
    write_if_absent("wwwroot/default.htm", DEFAULT_HTM, force)?;

    println!();
    println!("Fill in the LUIS appId/subscriptionKey in nlp-with-luis.bot,");
    println!("then run `luisbot serve`.");
    Ok(())
}

fn write_if_absent(path: &str, content: &str, force: bool) -> anyhow::Result<()> {
    let path = Path::new(path);
    if path.exists() && !force {
        println!("{} already exists (use --force to overwrite)", path.display());
        return Ok(());
    }
    std::fs::write(path, content)?;
    println!("Wrote {}", path.display());
    Ok(())
}
