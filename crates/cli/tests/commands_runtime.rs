use std::env;
use std::sync::{Mutex, OnceLock};

use birkbot_cli::commands::{config, doctor, migrate, refresh};
use birkbot_core::BirkmanId;
use birkbot_db::{connect, migrations, ProfileRepository, SqlProfileRepository};
use serde_json::Value;

const REQUIRED: [(&str, &str); 2] =
    [("BIRKBOT_SLACK_COMMAND_TOKEN", "command-token"), ("BIRKBOT_BIRKMAN_API_KEY", "api-key")];

#[test]
fn migrate_returns_success_with_valid_env() {
    with_env(&[REQUIRED[0], REQUIRED[1], ("BIRKBOT_DATABASE_URL", "sqlite::memory:")], || {
        let result = migrate::run();
        assert_eq!(result.exit_code, 0, "expected successful migrate run");

        let payload = parse_payload(&result.output);
        assert_eq!(payload["command"], "migrate");
        assert_eq!(payload["status"], "ok");
    });
}

#[test]
fn migrate_returns_config_failure_without_tokens() {
    with_env(&[], || {
        let result = migrate::run();
        assert_eq!(result.exit_code, 2, "expected config validation failure code");

        let payload = parse_payload(&result.output);
        assert_eq!(payload["status"], "error");
        assert_eq!(payload["error_class"], "config_validation");
        assert!(payload["message"].as_str().unwrap_or_default().contains("slack.command_token"));
    });
}

#[test]
fn config_output_redacts_secrets_and_names_sources() {
    with_env(
        &[
            ("SLACK_TOKEN", "legacy-command-token-value"),
            ("BIRKBOT_BIRKMAN_API_KEY", "api-key"),
            ("BIRKBOT_DATABASE_URL", "sqlite::memory:"),
        ],
        || {
            let output = config::run();

            assert!(output.contains("- slack.command_token = lega*** (source: env (SLACK_TOKEN))"));
            assert!(output.contains("- birkman.api_key = <redacted>"));
            assert!(!output.contains("legacy-command-token-value"));
            assert!(output.contains("- server.port = 8080 (source: default)"));
        },
    );
}

#[test]
fn doctor_json_reports_each_check() {
    with_env(&[REQUIRED[0], REQUIRED[1], ("BIRKBOT_DATABASE_URL", "sqlite::memory:")], || {
        let result = doctor::run(true);
        let payload = parse_payload(&result.output);

        let names: Vec<&str> = payload["checks"]
            .as_array()
            .expect("checks should be an array")
            .iter()
            .map(|check| check["name"].as_str().unwrap_or_default())
            .collect();
        assert_eq!(
            names,
            ["config_validation", "image_links", "database_connectivity", "profile_schema"]
        );

        // A fresh in-memory database has no profile table yet.
        assert_eq!(result.exit_code, 1);
        assert_eq!(payload["overall_status"], "fail");
        assert_eq!(payload["checks"][3]["status"], "fail");
    });
}

#[test]
fn doctor_passes_against_migrated_database() {
    let dir = tempfile::tempdir().expect("temp dir");
    let database_url = format!("sqlite://{}", dir.path().join("doctor.db").display());

    with_env(&[REQUIRED[0], REQUIRED[1], ("BIRKBOT_DATABASE_URL", &database_url)], || {
        assert_eq!(migrate::run().exit_code, 0);

        let result = doctor::run(false);
        assert_eq!(result.exit_code, 0, "doctor output: {}", result.output);
        assert!(result.output.contains("- [ok] profile_schema: 0 profiles stored"));
    });
}

#[test]
fn doctor_skips_database_checks_when_config_is_invalid() {
    with_env(&[], || {
        let result = doctor::run(true);
        assert_eq!(result.exit_code, 1);

        let payload = parse_payload(&result.output);
        assert_eq!(payload["checks"][0]["status"], "fail");
        assert_eq!(payload["checks"][2]["status"], "skipped");
    });
}

#[test]
fn refresh_with_no_profiles_is_a_noop() {
    let dir = tempfile::tempdir().expect("temp dir");
    let database_url = format!("sqlite://{}", dir.path().join("refresh.db").display());

    with_env(&[REQUIRED[0], REQUIRED[1], ("BIRKBOT_DATABASE_URL", &database_url)], || {
        assert_eq!(migrate::run().exit_code, 0);

        let result = refresh::run(None);
        assert_eq!(result.exit_code, 0);

        let payload = parse_payload(&result.output);
        assert_eq!(payload["command"], "refresh");
        assert_eq!(payload["message"], "refreshed 0 profiles");
    });
}

#[test]
fn refresh_of_unknown_profile_is_not_found() {
    let dir = tempfile::tempdir().expect("temp dir");
    let database_url = format!("sqlite://{}", dir.path().join("refresh.db").display());

    with_env(&[REQUIRED[0], REQUIRED[1], ("BIRKBOT_DATABASE_URL", &database_url)], || {
        assert_eq!(migrate::run().exit_code, 0);

        let result = refresh::run(Some("NOPE01"));
        assert_eq!(result.exit_code, 7);

        let payload = parse_payload(&result.output);
        assert_eq!(payload["error_class"], "not_found");
        assert!(payload["message"].as_str().unwrap_or_default().contains("NOPE01"));
    });
}

#[test]
fn refresh_reports_provider_failures() {
    let dir = tempfile::tempdir().expect("temp dir");
    let database_url = format!("sqlite://{}", dir.path().join("refresh.db").display());

    with_env(
        &[
            REQUIRED[0],
            REQUIRED[1],
            ("BIRKBOT_DATABASE_URL", &database_url),
            ("BIRKBOT_BIRKMAN_BASE_URL", "http://127.0.0.1:9"),
            ("BIRKBOT_BIRKMAN_TIMEOUT_SECS", "1"),
        ],
        || {
            assert_eq!(migrate::run().exit_code, 0);
            seed_profile(&database_url, "GTW013", "alice");

            let result = refresh::run(Some("GTW013"));
            assert_eq!(result.exit_code, 6, "refresh output: {}", result.output);

            let payload = parse_payload(&result.output);
            assert_eq!(payload["error_class"], "provider");
        },
    );
}

fn seed_profile(database_url: &str, birkman_id: &str, slack_username: &str) {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .expect("runtime should build");
    runtime.block_on(async {
        let pool = connect(database_url).await.expect("connect");
        migrations::run_pending(&pool).await.expect("migrations");
        SqlProfileRepository::new(pool.clone())
            .create(&BirkmanId(birkman_id.to_string()), slack_username)
            .await
            .expect("profile should be created");
        pool.close().await;
    });
}

fn parse_payload(output: &str) -> Value {
    serde_json::from_str(output).expect("command output should be valid JSON")
}

fn with_env(vars: &[(&str, &str)], test_fn: impl FnOnce()) {
    static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();
    let _guard =
        ENV_LOCK.get_or_init(|| Mutex::new(())).lock().expect("env mutex should not be poisoned");

    let keys = [
        "BIRKBOT_DATABASE_URL",
        "BIRKBOT_DATABASE_MAX_CONNECTIONS",
        "BIRKBOT_DATABASE_TIMEOUT_SECS",
        "BIRKBOT_SLACK_COMMAND_TOKEN",
        "BIRKBOT_BIRKMAN_API_KEY",
        "BIRKBOT_BIRKMAN_BASE_URL",
        "BIRKBOT_BIRKMAN_TIMEOUT_SECS",
        "BIRKBOT_NOTIFIER_TIMEOUT_SECS",
        "BIRKBOT_SERVER_BIND_ADDRESS",
        "BIRKBOT_SERVER_PORT",
        "BIRKBOT_SERVER_PUBLIC_BASE_URL",
        "BIRKBOT_SERVER_GRACEFUL_SHUTDOWN_SECS",
        "BIRKBOT_LOGGING_LEVEL",
        "BIRKBOT_LOGGING_FORMAT",
        "BIRKBOT_LOG_LEVEL",
        "BIRKBOT_LOG_FORMAT",
        "SLACK_TOKEN",
        "BIRKMAN_API_KEY",
        "DATABASE_URL",
        "PORT",
    ];

    let previous_values: Vec<(&str, Option<String>)> =
        keys.iter().map(|key| (*key, env::var(key).ok())).collect();

    for key in &keys {
        env::remove_var(key);
    }
    for (key, value) in vars {
        env::set_var(key, value);
    }

    test_fn();

    for (key, value) in previous_values {
        if let Some(value) = value {
            env::set_var(key, value);
        } else {
            env::remove_var(key);
        }
    }
}
