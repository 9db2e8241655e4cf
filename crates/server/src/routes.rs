//! HTTP surface for Slack and the operators.
//!
//! - `GET  /`                              landing page
//! - `GET  /grid?birkman_id=`              grid PNG for one profile
//! - `GET  /alastairs-comparative-graph`   comparison graph PNG for two profiles
//! - `GET|POST /slack-slash-command/`      Slack slash command callback
//! - `GET|POST /admin/users`               profile administration (see `admin`)
//! - `GET  /health`                        readiness probe (see `health`)

use std::sync::Arc;

use axum::{
    extract::{Form, Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{Html, IntoResponse, Response},
    routing::get,
    Router,
};
use serde::Deserialize;
use tera::{Context, Tera};
use tracing::{error, warn};
use uuid::Uuid;

use birkbot_core::domain::profile::BirkmanId;
use birkbot_db::{repositories::ProfileRepository, DbPool};
use birkbot_slack::{
    CommandError, ImageLinks, SlashCommandError, SlashCommandHandler, SlashCommandInvocation,
};

use crate::{admin, health};

#[derive(Clone)]
pub struct AppState {
    pub profiles: Arc<dyn ProfileRepository>,
    pub provider: Arc<dyn birkbot_core::AssessmentProvider>,
    pub slash_commands: Arc<SlashCommandHandler>,
    pub templates: Arc<Tera>,
    /// Fixed origin for image links; derived per request when `None`.
    pub public_links: Option<ImageLinks>,
}

const TEMPLATES: [(&str, &str); 2] = [
    ("index.html", include_str!("../../../templates/index.html")),
    ("admin_users.html", include_str!("../../../templates/admin_users.html")),
];

/// Loads templates from `templates/`, falling back to the copies built into the binary.
pub fn init_templates() -> Arc<Tera> {
    let mut tera = match Tera::new("templates/**/*.html") {
        Ok(tera) => tera,
        Err(e) => {
            warn!(error = %e, "failed to load templates from filesystem, using embedded templates");
            Tera::default()
        }
    };

    for (name, source) in TEMPLATES {
        if !tera.get_template_names().any(|loaded| loaded == name) {
            if let Err(e) = tera.add_raw_template(name, source) {
                error!(template = name, error = %e, "embedded template failed to parse");
            }
        }
    }

    Arc::new(tera)
}

pub fn router(state: AppState, db_pool: DbPool) -> Router {
    Router::new()
        .route("/", get(landing_page))
        .route("/grid", get(grid_image))
        .route("/alastairs-comparative-graph", get(comparative_graph))
        .route("/slack-slash-command/", get(slash_command_query).post(slash_command_form))
        .route("/admin/users", get(admin::list_users).post(admin::submit_users))
        .with_state(state)
        .merge(health::router(db_pool))
}

pub(crate) fn render(templates: &Tera, name: &str, context: &Context) -> Response {
    match templates.render(name, context) {
        Ok(html) => Html(html).into_response(),
        Err(e) => {
            error!(template = name, error = %e, "template rendering failed");
            (StatusCode::INTERNAL_SERVER_ERROR, "template rendering failed").into_response()
        }
    }
}

async fn landing_page(State(state): State<AppState>) -> Response {
    let summary = match state.profiles.list().await {
        Ok(profiles) if profiles.len() == 1 => "1 profile registered".to_owned(),
        Ok(profiles) => format!("{} profiles registered", profiles.len()),
        Err(e) => {
            warn!(error = %e, "could not count profiles for landing page");
            "Profile count unavailable".to_owned()
        }
    };

    let mut context = Context::new();
    context.insert("profile_summary", &summary);
    render(&state.templates, "index.html", &context)
}

// ---------------------------------------------------------------------------
// Images
// ---------------------------------------------------------------------------

#[derive(Debug, Default, Deserialize)]
pub struct GridQuery {
    pub birkman_id: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ComparativeGraphQuery {
    pub birkman_id_a: Option<String>,
    pub birkman_id_b: Option<String>,
}

fn required_id(value: Option<String>, name: &str) -> Result<BirkmanId, Response> {
    match value.map(|v| v.trim().to_owned()).filter(|v| !v.is_empty()) {
        Some(id) => Ok(BirkmanId(id)),
        None => Err((StatusCode::BAD_REQUEST, format!("missing query parameter `{name}`"))
            .into_response()),
    }
}

fn png(bytes: Vec<u8>) -> Response {
    ([(header::CONTENT_TYPE, "image/png")], bytes).into_response()
}

fn image_error(error: CommandError) -> Response {
    let status = match &error {
        CommandError::ProfileNotFound(_) => StatusCode::NOT_FOUND,
        CommandError::Provider(provider) if provider.is_upstream() => StatusCode::BAD_GATEWAY,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    warn!(
        event_name = "http.image.failed",
        status = status.as_u16(),
        error = %error,
        "image request failed"
    );
    (status, error.to_string()).into_response()
}

async fn grid_image(State(state): State<AppState>, Query(query): Query<GridQuery>) -> Response {
    let birkman_id = match required_id(query.birkman_id, "birkman_id") {
        Ok(id) => id,
        Err(response) => return response,
    };

    match state.slash_commands.dispatcher().grid_image(&birkman_id).await {
        Ok(bytes) => png(bytes),
        Err(error) => image_error(error),
    }
}

async fn comparative_graph(
    State(state): State<AppState>,
    Query(query): Query<ComparativeGraphQuery>,
) -> Response {
    let ids = required_id(query.birkman_id_a, "birkman_id_a")
        .and_then(|a| required_id(query.birkman_id_b, "birkman_id_b").map(|b| (a, b)));
    let (user_a, user_b) = match ids {
        Ok(ids) => ids,
        Err(response) => return response,
    };

    match state.slash_commands.dispatcher().comparative_graph(&user_a, &user_b).await {
        Ok(bytes) => png(bytes),
        Err(error) => image_error(error),
    }
}

// ---------------------------------------------------------------------------
// Slash command
// ---------------------------------------------------------------------------

/// Fields Slack sends with a slash command, as query string or form body.
#[derive(Debug, Default, Deserialize)]
pub struct SlashCommandParams {
    pub token: Option<String>,
    pub text: Option<String>,
    pub user_name: Option<String>,
    pub response_url: Option<String>,
}

async fn slash_command_query(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(params): Query<SlashCommandParams>,
) -> Response {
    run_slash_command(&state, &headers, params).await
}

async fn slash_command_form(
    State(state): State<AppState>,
    headers: HeaderMap,
    Form(params): Form<SlashCommandParams>,
) -> Response {
    run_slash_command(&state, &headers, params).await
}

/// Image link origin: configured base URL, else scheme and host of the request.
fn image_links(state: &AppState, headers: &HeaderMap) -> Option<ImageLinks> {
    if let Some(links) = &state.public_links {
        return Some(links.clone());
    }

    let scheme = headers
        .get("x-forwarded-proto")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(',').next())
        .map(str::trim)
        .filter(|value| *value == "http" || *value == "https")
        .unwrap_or("http");
    let host = headers
        .get(header::HOST)
        .and_then(|value| value.to_str().ok())
        .filter(|value| !value.is_empty())
        .unwrap_or("localhost");

    ImageLinks::from_request_origin(scheme, host).ok()
}

async fn run_slash_command(
    state: &AppState,
    headers: &HeaderMap,
    params: SlashCommandParams,
) -> Response {
    let invocation = SlashCommandInvocation {
        token: params.token,
        text: params.text.unwrap_or_default(),
        user_name: params.user_name.unwrap_or_default(),
        response_url: params.response_url.unwrap_or_default(),
        correlation_id: Uuid::new_v4().to_string(),
    };

    let Some(links) = image_links(state, headers) else {
        warn!(
            event_name = "slack.command.bad_host",
            correlation_id = %invocation.correlation_id,
            "cannot build image links from request host"
        );
        return (StatusCode::BAD_REQUEST, "invalid Host header").into_response();
    };

    match state.slash_commands.handle(&invocation, &links).await {
        Ok(()) => StatusCode::OK.into_response(),
        Err(SlashCommandError::Authentication) => {
            (StatusCode::FORBIDDEN, SlashCommandError::Authentication.to_string()).into_response()
        }
        Err(SlashCommandError::Command(error)) => {
            warn!(
                event_name = "slack.command.failed",
                correlation_id = %invocation.correlation_id,
                error = %error,
                "slash command failed"
            );
            (StatusCode::NOT_FOUND, error.to_string()).into_response()
        }
    }
}
