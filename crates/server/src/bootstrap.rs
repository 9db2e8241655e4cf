use std::sync::Arc;
use std::time::Duration;

use birkbot_assessment::BirkmanApiClient;
use birkbot_core::config::{AppConfig, ConfigError, LoadOptions};
use birkbot_core::errors::ProviderError;
use birkbot_db::{connect_with_settings, migrations, DbPool, SqlProfileRepository};
use birkbot_slack::{CommandDispatcher, ImageLinks, SlashCommandHandler, WebhookNotifier};
use thiserror::Error;
use tracing::info;

use crate::routes::{init_templates, AppState};

pub struct Application {
    pub config: AppConfig,
    pub db_pool: DbPool,
    pub state: AppState,
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("database connection failed: {0}")]
    DatabaseConnect(#[source] sqlx::Error),
    #[error("database migration failed: {0}")]
    Migration(#[source] sqlx::migrate::MigrateError),
    #[error("birkman api client setup failed: {0}")]
    Provider(#[source] ProviderError),
    #[error("slack notifier setup failed: {0}")]
    Notifier(#[source] reqwest::Error),
    #[error("invalid server.public_base_url: {0}")]
    PublicBaseUrl(String),
}

pub async fn bootstrap(options: LoadOptions) -> Result<Application, BootstrapError> {
    let config = AppConfig::load(options)?;
    bootstrap_with_config(config).await
}

pub async fn bootstrap_with_config(config: AppConfig) -> Result<Application, BootstrapError> {
    info!(
        event_name = "system.bootstrap.start",
        correlation_id = "bootstrap",
        "starting application bootstrap"
    );

    let db_pool = connect_with_settings(
        &config.database.url,
        config.database.max_connections,
        config.database.timeout_secs,
    )
    .await
    .map_err(BootstrapError::DatabaseConnect)?;
    info!(
        event_name = "system.bootstrap.database_connected",
        correlation_id = "bootstrap",
        "database connection established"
    );

    migrations::run_pending(&db_pool).await.map_err(BootstrapError::Migration)?;
    info!(
        event_name = "system.bootstrap.migrations_applied",
        correlation_id = "bootstrap",
        "database migrations applied"
    );

    let profiles = Arc::new(SqlProfileRepository::new(db_pool.clone()));
    let provider =
        Arc::new(BirkmanApiClient::from_config(&config.birkman).map_err(BootstrapError::Provider)?);
    let notifier = Arc::new(
        WebhookNotifier::new(Duration::from_secs(config.notifier.timeout_secs))
            .map_err(BootstrapError::Notifier)?,
    );
    let public_links = config
        .server
        .public_base_url
        .as_deref()
        .map(|base| ImageLinks::new(base).map_err(|e| BootstrapError::PublicBaseUrl(e.to_string())))
        .transpose()?;

    let dispatcher = CommandDispatcher::new(profiles.clone(), provider.clone());
    let slash_commands = Arc::new(SlashCommandHandler::new(
        config.slack.command_token.clone(),
        dispatcher,
        notifier,
    ));

    info!(
        event_name = "system.bootstrap.services_ready",
        correlation_id = "bootstrap",
        birkman_base_url = %config.birkman.base_url,
        public_base_url = config.server.public_base_url.as_deref().unwrap_or("<from request>"),
        "slash command services initialized"
    );

    let state = AppState {
        profiles,
        provider,
        slash_commands,
        templates: init_templates(),
        public_links,
    };

    Ok(Application { config, db_pool, state })
}

#[cfg(test)]
mod tests {
    use birkbot_core::config::{ConfigOverrides, LoadOptions};

    use crate::bootstrap::bootstrap;

    fn overrides(command_token: &str) -> LoadOptions {
        LoadOptions {
            overrides: ConfigOverrides {
                database_url: Some("sqlite::memory:".to_string()),
                slack_command_token: Some(command_token.to_string()),
                birkman_api_key: Some("birkman-test-key".to_string()),
                ..ConfigOverrides::default()
            },
            ..LoadOptions::default()
        }
    }

    #[tokio::test]
    async fn bootstrap_fails_fast_without_command_token() {
        let result = bootstrap(overrides("   ")).await;

        assert!(result.is_err());
        let message = result.err().expect("error").to_string();
        assert!(message.contains("slack.command_token"));
    }

    #[tokio::test]
    async fn bootstrap_migrates_and_wires_services() {
        let app =
            bootstrap(overrides("xyz-command-token")).await.expect("bootstrap should succeed");

        let (table_count,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = 'profile'",
        )
        .fetch_one(&app.db_pool)
        .await
        .expect("profile table should exist after bootstrap");
        assert_eq!(table_count, 1);

        assert!(app.state.profiles.list().await.expect("list").is_empty());
        assert_eq!(app.state.provider.component_label("esteem"), "Esteem");

        app.db_pool.close().await;
    }
}
