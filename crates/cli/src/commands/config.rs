use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use birkbot_core::config::{resolve_config_path, AppConfig, LoadOptions};
use secrecy::ExposeSecret;
use toml::Value;

struct ConfigLine {
    key: &'static str,
    value: String,
    env_keys: &'static [&'static str],
}

impl ConfigLine {
    fn new(key: &'static str, value: impl Into<String>, env_keys: &'static [&'static str]) -> Self {
        Self { key, value: value.into(), env_keys }
    }
}

pub fn run() -> String {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => return format!("config validation failed: {error}"),
    };

    let file_path = resolve_config_path(None);
    let file_doc = load_config_file_doc(file_path.as_deref());

    let mut lines = vec!["effective config (source precedence: env > file > default):".to_string()];
    for line in effective_lines(&config) {
        let source = field_source(&line, file_doc.as_ref(), file_path.as_deref());
        lines.push(format!("- {} = {} (source: {source})", line.key, line.value));
    }

    lines.join("\n")
}

fn effective_lines(config: &AppConfig) -> Vec<ConfigLine> {
    vec![
        ConfigLine::new(
            "database.url",
            &config.database.url,
            &["BIRKBOT_DATABASE_URL", "DATABASE_URL"],
        ),
        ConfigLine::new(
            "database.max_connections",
            config.database.max_connections.to_string(),
            &["BIRKBOT_DATABASE_MAX_CONNECTIONS"],
        ),
        ConfigLine::new(
            "database.timeout_secs",
            config.database.timeout_secs.to_string(),
            &["BIRKBOT_DATABASE_TIMEOUT_SECS"],
        ),
        ConfigLine::new(
            "slack.command_token",
            redact_secret(config.slack.command_token.expose_secret()),
            &["BIRKBOT_SLACK_COMMAND_TOKEN", "SLACK_TOKEN"],
        ),
        ConfigLine::new(
            "birkman.api_key",
            redact_secret(config.birkman.api_key.expose_secret()),
            &["BIRKBOT_BIRKMAN_API_KEY", "BIRKMAN_API_KEY"],
        ),
        ConfigLine::new(
            "birkman.base_url",
            &config.birkman.base_url,
            &["BIRKBOT_BIRKMAN_BASE_URL"],
        ),
        ConfigLine::new(
            "birkman.timeout_secs",
            config.birkman.timeout_secs.to_string(),
            &["BIRKBOT_BIRKMAN_TIMEOUT_SECS"],
        ),
        ConfigLine::new(
            "notifier.timeout_secs",
            config.notifier.timeout_secs.to_string(),
            &["BIRKBOT_NOTIFIER_TIMEOUT_SECS"],
        ),
        ConfigLine::new(
            "server.bind_address",
            &config.server.bind_address,
            &["BIRKBOT_SERVER_BIND_ADDRESS"],
        ),
        ConfigLine::new(
            "server.port",
            config.server.port.to_string(),
            &["BIRKBOT_SERVER_PORT", "PORT"],
        ),
        ConfigLine::new(
            "server.public_base_url",
            config.server.public_base_url.as_deref().unwrap_or("<from request Host>"),
            &["BIRKBOT_SERVER_PUBLIC_BASE_URL"],
        ),
        ConfigLine::new(
            "server.graceful_shutdown_secs",
            config.server.graceful_shutdown_secs.to_string(),
            &["BIRKBOT_SERVER_GRACEFUL_SHUTDOWN_SECS"],
        ),
        ConfigLine::new(
            "logging.level",
            &config.logging.level,
            &["BIRKBOT_LOGGING_LEVEL", "BIRKBOT_LOG_LEVEL"],
        ),
        ConfigLine::new(
            "logging.format",
            format!("{:?}", config.logging.format).to_ascii_lowercase(),
            &["BIRKBOT_LOGGING_FORMAT", "BIRKBOT_LOG_FORMAT"],
        ),
    ]
}

fn load_config_file_doc(path: Option<&Path>) -> Option<Value> {
    let raw = fs::read_to_string(path?).ok()?;
    raw.parse::<Value>().ok()
}

fn field_source(line: &ConfigLine, file_doc: Option<&Value>, file_path: Option<&Path>) -> String {
    if let Some(env_key) = line.env_keys.iter().find(|key| env::var_os(key).is_some()) {
        return format!("env ({env_key})");
    }

    if file_doc.is_some_and(|doc| contains_path(doc, line.key)) {
        let file_path = file_path
            .map(PathBuf::from)
            .map(|path| path.display().to_string())
            .unwrap_or_else(|| "config file".to_string());
        return format!("file ({file_path})");
    }

    "default".to_string()
}

fn contains_path(root: &Value, key_path: &str) -> bool {
    let mut current = root;
    for key in key_path.split('.') {
        let Some(next) = current.get(key) else {
            return false;
        };
        current = next;
    }
    true
}

/// Keeps the first four characters of long secrets so operators can tell keys apart.
fn redact_secret(secret: &str) -> String {
    let trimmed = secret.trim();
    if trimmed.is_empty() {
        return "<empty>".to_string();
    }
    if trimmed.chars().count() < 12 {
        return "<redacted>".to_string();
    }

    let prefix: String = trimmed.chars().take(4).collect();
    format!("{prefix}***")
}

#[cfg(test)]
mod tests {
    use super::redact_secret;

    #[test]
    fn secrets_are_redacted() {
        assert_eq!(redact_secret(""), "<empty>");
        assert_eq!(redact_secret("short"), "<redacted>");
        assert_eq!(redact_secret("abcd-efgh-ijkl-mnop"), "abcd***");
    }
}
