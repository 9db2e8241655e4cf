use std::time::Duration;

use async_trait::async_trait;
use base64::{engine::general_purpose, Engine};
use reqwest::{Client, Response};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, warn};
use url::Url;

use birkbot_core::assessment::AssessmentProvider;
use birkbot_core::config::BirkmanConfig;
use birkbot_core::domain::profile::{BirkmanId, ProfilePayload};
use birkbot_core::domain::report::{ComparativeReport, CriticalComponent};
use birkbot_core::errors::ProviderError;

use crate::grid::GridRenderer;
use crate::labels::component_label;

const API_KEY_HEADER: &str = "X-Api-Key";
const MAX_ERROR_BODY: usize = 512;

/// HTTP client for the Birkman API.
pub struct BirkmanApiClient {
    client: Client,
    base_url: Url,
    api_key: SecretString,
    renderer: GridRenderer,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ComparativeResponse {
    #[serde(default)]
    critical_components: Vec<CriticalComponent>,
    graph_img: String,
}

impl BirkmanApiClient {
    pub fn from_config(config: &BirkmanConfig) -> Result<Self, ProviderError> {
        Self::new(
            &config.base_url,
            config.api_key.clone(),
            Duration::from_secs(config.timeout_secs),
        )
    }

    pub fn new(
        base_url: &str,
        api_key: SecretString,
        timeout: Duration,
    ) -> Result<Self, ProviderError> {
        let base_url = Url::parse(base_url)
            .map_err(|error| ProviderError::Transport(format!("invalid base url: {error}")))?;
        if base_url.cannot_be_a_base() {
            return Err(ProviderError::Transport(format!("invalid base url: {base_url}")));
        }
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|error| ProviderError::Transport(error.to_string()))?;

        Ok(Self { client, base_url, api_key, renderer: GridRenderer })
    }

    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    async fn read_json(response: Response) -> Result<Value, ProviderError> {
        let status = response.status();
        if !status.is_success() {
            let mut body = response.text().await.unwrap_or_default();
            if body.len() > MAX_ERROR_BODY {
                let cut =
                    (0..=MAX_ERROR_BODY).rev().find(|i| body.is_char_boundary(*i)).unwrap_or(0);
                body.truncate(cut);
            }
            warn!(
                event_name = "birkman.api.status",
                status = status.as_u16(),
                "birkman api returned an error status"
            );
            return Err(ProviderError::Status { status: status.as_u16(), body });
        }

        response.json::<Value>().await.map_err(|error| ProviderError::Decode(error.to_string()))
    }
}

fn decode_graph(encoded: &str) -> Result<Vec<u8>, ProviderError> {
    let trimmed = encoded.trim();
    let data = match trimmed.split_once("base64,") {
        Some((prefix, data)) if prefix.starts_with("data:") => data,
        _ => trimmed,
    };
    general_purpose::STANDARD
        .decode(data)
        .map_err(|error| ProviderError::Decode(format!("graphImg: {error}")))
}

fn transport(error: reqwest::Error) -> ProviderError {
    ProviderError::Transport(error.to_string())
}

#[async_trait]
impl AssessmentProvider for BirkmanApiClient {
    async fn core_data(&self, birkman_id: &BirkmanId) -> Result<ProfilePayload, ProviderError> {
        let url = self.endpoint(&["users", birkman_id.as_str(), "core-data"]);
        debug!(
            event_name = "birkman.api.core_data",
            birkman_id = %birkman_id,
            "fetching core data"
        );

        let response = self
            .client
            .get(url)
            .header(API_KEY_HEADER, self.api_key.expose_secret())
            .send()
            .await
            .map_err(transport)?;

        Ok(ProfilePayload::new(Self::read_json(response).await?))
    }

    async fn comparative_report(
        &self,
        user_a: &ProfilePayload,
        user_b: &ProfilePayload,
    ) -> Result<ComparativeReport, ProviderError> {
        let url = self.endpoint(&["reports", "comparative"]);
        debug!(event_name = "birkman.api.comparative_report", "requesting comparative report");

        let response = self
            .client
            .post(url)
            .header(API_KEY_HEADER, self.api_key.expose_secret())
            .json(&json!({ "user_a": user_a.as_value(), "user_b": user_b.as_value() }))
            .send()
            .await
            .map_err(transport)?;

        let body = Self::read_json(response).await?;
        let parsed: ComparativeResponse =
            serde_json::from_value(body).map_err(|error| ProviderError::Decode(error.to_string()))?;

        Ok(ComparativeReport {
            critical_components: parsed.critical_components,
            graph_png: decode_graph(&parsed.graph_img)?,
        })
    }

    fn render_grid(&self, payload: &ProfilePayload) -> Result<Vec<u8>, ProviderError> {
        self.renderer.render(payload)
    }

    fn component_label(&self, component: &str) -> String {
        component_label(component)
    }
}
