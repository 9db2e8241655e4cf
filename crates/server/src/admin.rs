use axum::{
    extract::{Form, State},
    response::{IntoResponse, Redirect, Response},
};
use serde::{Deserialize, Serialize};
use tera::Context;
use tracing::{info, warn};

use birkbot_core::domain::profile::{BirkmanId, Profile};

use crate::routes::{render, AppState};

const ADMIN_USERS_PATH: &str = "/admin/users";

#[derive(Debug, Serialize)]
struct UserRow {
    birkman_id: String,
    slack_username: String,
    name: Option<String>,
    updated_at: String,
}

impl From<&Profile> for UserRow {
    fn from(profile: &Profile) -> Self {
        Self {
            birkman_id: profile.birkman_id.to_string(),
            slack_username: profile.slack_username.clone(),
            name: profile.payload.name().map(str::to_owned),
            updated_at: profile.updated_at.format("%Y-%m-%d %H:%M UTC").to_string(),
        }
    }
}

/// Form posted by the admin page. The submit button's name selects the action.
#[derive(Debug, Default, Deserialize)]
pub struct AdminUserForm {
    pub birkman_id: Option<String>,
    pub slack_username: Option<String>,
    pub insert: Option<String>,
    pub update: Option<String>,
    pub refresh: Option<String>,
    pub delete: Option<String>,
}

#[derive(Debug, PartialEq, Eq)]
enum AdminAction {
    Insert { birkman_id: BirkmanId, slack_username: String },
    Update { birkman_id: BirkmanId, slack_username: String },
    Refresh { birkman_id: BirkmanId },
    Delete { birkman_id: BirkmanId },
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value.map(str::trim).filter(|value| !value.is_empty()).map(str::to_owned)
}

fn username(value: Option<&str>) -> Option<String> {
    non_empty(value.map(|raw| raw.trim().trim_start_matches('@')))
}

impl AdminUserForm {
    fn action(&self) -> Option<AdminAction> {
        let birkman_id = non_empty(self.birkman_id.as_deref()).map(BirkmanId)?;

        if self.insert.is_some() {
            let slack_username = username(self.slack_username.as_deref())?;
            Some(AdminAction::Insert { birkman_id, slack_username })
        } else if self.update.is_some() {
            let slack_username = username(self.slack_username.as_deref())?;
            Some(AdminAction::Update { birkman_id, slack_username })
        } else if self.refresh.is_some() {
            Some(AdminAction::Refresh { birkman_id })
        } else if self.delete.is_some() {
            Some(AdminAction::Delete { birkman_id })
        } else {
            None
        }
    }
}

pub async fn list_users(State(state): State<AppState>) -> Response {
    let users: Vec<UserRow> = match state.profiles.list().await {
        Ok(profiles) => profiles.iter().map(UserRow::from).collect(),
        Err(e) => {
            warn!(event_name = "admin.users.list_failed", error = %e, "failed to list profiles");
            Vec::new()
        }
    };

    let mut context = Context::new();
    context.insert("users", &users);
    render(&state.templates, "admin_users.html", &context)
}

pub async fn submit_users(
    State(state): State<AppState>,
    Form(form): Form<AdminUserForm>,
) -> Response {
    match form.action() {
        Some(action) => apply(&state, action).await,
        None => warn!(
            event_name = "admin.users.invalid_form",
            form = ?form,
            "ignoring incomplete admin form"
        ),
    }

    Redirect::to(ADMIN_USERS_PATH).into_response()
}

async fn apply(state: &AppState, action: AdminAction) {
    match action {
        AdminAction::Insert { birkman_id, slack_username } => {
            if let Err(e) = state.profiles.create(&birkman_id, &slack_username).await {
                warn!(
                    event_name = "admin.users.insert_failed",
                    birkman_id = %birkman_id,
                    error = %e,
                    "failed to create profile"
                );
                return;
            }
            info!(
                event_name = "admin.users.inserted",
                birkman_id = %birkman_id,
                slack_username = %slack_username,
                "profile created"
            );
            refresh_payload(state, &birkman_id).await;
        }
        AdminAction::Update { birkman_id, slack_username } => {
            match state.profiles.update_slack_username(&birkman_id, &slack_username).await {
                Ok(true) => info!(
                    event_name = "admin.users.updated",
                    birkman_id = %birkman_id,
                    slack_username = %slack_username,
                    "profile username changed"
                ),
                Ok(false) => warn!(
                    event_name = "admin.users.update_missing",
                    birkman_id = %birkman_id,
                    "no profile to update"
                ),
                Err(e) => warn!(
                    event_name = "admin.users.update_failed",
                    birkman_id = %birkman_id,
                    error = %e,
                    "failed to update profile"
                ),
            }
        }
        AdminAction::Refresh { birkman_id } => refresh_payload(state, &birkman_id).await,
        AdminAction::Delete { birkman_id } => match state.profiles.delete(&birkman_id).await {
            Ok(deleted) => info!(
                event_name = "admin.users.deleted",
                birkman_id = %birkman_id,
                deleted,
                "profile delete processed"
            ),
            Err(e) => warn!(
                event_name = "admin.users.delete_failed",
                birkman_id = %birkman_id,
                error = %e,
                "failed to delete profile"
            ),
        },
    }
}

/// Fetches core data for a profile and stores it. The profile keeps its old
/// payload when the provider call fails.
async fn refresh_payload(state: &AppState, birkman_id: &BirkmanId) {
    let payload = match state.provider.core_data(birkman_id).await {
        Ok(payload) => payload,
        Err(e) => {
            warn!(
                event_name = "admin.users.core_data_failed",
                birkman_id = %birkman_id,
                error = %e,
                "failed to fetch core data"
            );
            return;
        }
    };

    match state.profiles.update_payload(birkman_id, &payload).await {
        Ok(true) => info!(
            event_name = "admin.users.refreshed",
            birkman_id = %birkman_id,
            "profile core data stored"
        ),
        Ok(false) => warn!(
            event_name = "admin.users.refresh_missing",
            birkman_id = %birkman_id,
            "profile vanished before core data was stored"
        ),
        Err(e) => warn!(
            event_name = "admin.users.refresh_failed",
            birkman_id = %birkman_id,
            error = %e,
            "failed to store core data"
        ),
    }
}
