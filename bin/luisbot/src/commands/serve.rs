use std::sync::Arc;

use luisbot_agent::{LuisBot, TurnContext};
use luisbot_core::{Activity, BotConfiguration, Error, Settings};
use luisbot_nlu::ServiceRegistry;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use axum::{
    extract::State,
    http::{header, Request, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::json;
use tower_http::{services::ServeDir, trace::TraceLayer};

const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 3978;
/// Content root for static assets (default.htm and friends).
const CONTENT_ROOT: &str = "wwwroot";

// ---------------------------------------------------------------------------
// Shared state passed to HTTP handlers
// ---------------------------------------------------------------------------

#[derive(Clone)]
struct BotState {
    registry: Arc<ServiceRegistry>,
    /// Credential check material from the endpoint descriptor. None means
    /// inbound authentication is disabled.
    app_password: Option<String>,
    /// Root token; cancelled on shutdown so in-flight turns abort.
    cancel: CancellationToken,
}

fn secure_eq(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut diff: u8 = 0;
    for (&x, &y) in a.as_bytes().iter().zip(b.as_bytes().iter()) {
        diff |= x ^ y;
    }
    diff == 0
}

// ---------------------------------------------------------------------------
// Bearer token authentication middleware
// ---------------------------------------------------------------------------

async fn auth_middleware(
    State(state): State<BotState>,
    req: Request<axum::body::Body>,
    next: Next,
) -> Response {
    let password = match &state.app_password {
        Some(p) if !p.is_empty() => p,
        _ => return next.run(req).await,
    };

    if req.uri().path() == "/api/health" {
        return next.run(req).await;
    }

    let auth_header = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok());

    let authorized = match auth_header {
        Some(h) if h.starts_with("Bearer ") => secure_eq(&h[7..], password.as_str()),
        _ => false,
    };

    if authorized {
        next.run(req).await
    } else {
        (
            StatusCode::UNAUTHORIZED,
            Json(json!({"error": "unauthorized"})),
        )
            .into_response()
    }
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

async fn health() -> impl IntoResponse {
    Json(json!({"status": "ok"}))
}

/// The inbound entry point: decode one activity, run one turn, answer
/// with the turn's collected replies.
async fn messages(State(state): State<BotState>, Json(activity): Json<Activity>) -> Response {
    let bot = match LuisBot::new(state.registry.clone()) {
        Ok(bot) => bot,
        Err(e) => {
            error!(error = %e, "Handler construction failed");
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({"error": e.to_string()})),
            )
                .into_response();
        }
    };

    let mut context = TurnContext::new(activity);
    let cancel = state.cancel.child_token();

    match bot.on_turn(&mut context, &cancel).await {
        Ok(()) => (StatusCode::OK, Json(context.into_replies())).into_response(),
        Err(Error::Cancelled) => {
            warn!("Turn cancelled during shutdown");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({"error": "turn cancelled"})),
            )
                .into_response()
        }
        Err(e) => {
            // No reply is sent for a failed turn; the caller gets the
            // transport-level failure instead.
            error!(error = %e, "Turn failed");
            (
                StatusCode::BAD_GATEWAY,
                Json(json!({"error": e.to_string()})),
            )
                .into_response()
        }
    }
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

pub async fn run(host: Option<String>, port: Option<u16>) -> anyhow::Result<()> {
    let settings = Settings::load()?;
    let bot_file = settings.bot_file_path();
    info!(
        bot_file = %bot_file.display(),
        environment = %settings.environment,
        "Loading bot configuration"
    );

    let config = BotConfiguration::load(&bot_file, settings.bot_file_secret.as_deref())?;
    let registry = Arc::new(ServiceRegistry::from_bot_config(
        &config,
        &settings.environment,
    )?);

    // Configuration-integrity check before the listener comes up: a
    // registry the handler cannot be built from must abort launch.
    LuisBot::new(registry.clone())?;

    let endpoint = registry.endpoint().clone();
    let app_password =
        (!endpoint.app_password.is_empty()).then(|| endpoint.app_password.clone());
    if app_password.is_none() {
        warn!("Endpoint has no appPassword; inbound authentication is disabled");
    }

    let cancel = CancellationToken::new();
    let state = BotState {
        registry,
        app_password,
        cancel: cancel.clone(),
    };

    let app = Router::new()
        .route("/api/messages", post(messages))
        .route("/api/health", get(health))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ))
        .fallback_service(ServeDir::new(CONTENT_ROOT).append_index_html_on_directories(true))
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let host = host.unwrap_or_else(|| DEFAULT_HOST.to_string());
    let port = port.unwrap_or(DEFAULT_PORT);
    let addr = format!("{}:{}", host, port);
    info!(addr = %addr, app_id = %endpoint.app_id, "Bot endpoint listening");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(cancel))
        .await?;

    Ok(())
}

async fn shutdown_signal(cancel: CancellationToken) {
    let _ = tokio::signal::ctrl_c().await;
    info!("Shutdown requested; cancelling in-flight turns");
    cancel.cancel();
}
