use url::Url;

use birkbot_core::domain::profile::BirkmanId;

pub const GRID_PATH: &str = "grid";
pub const COMPARATIVE_GRAPH_PATH: &str = "alastairs-comparative-graph";

/// Builds the absolute image URLs that Slack fetches when it renders an attachment.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ImageLinks {
    base: Url,
}

impl ImageLinks {
    pub fn new(base_url: &str) -> Result<Self, url::ParseError> {
        Ok(Self { base: Url::parse(base_url)? })
    }

    /// Base URL as seen by the caller of the current request. A trailing `:80`
    /// on the host is dropped whatever the scheme.
    pub fn from_request_origin(scheme: &str, host: &str) -> Result<Self, url::ParseError> {
        let host = host.strip_suffix(":80").unwrap_or(host);
        Self::new(&format!("{scheme}://{host}"))
    }

    pub fn base(&self) -> &Url {
        &self.base
    }

    pub fn grid(&self, birkman_id: &BirkmanId) -> String {
        self.endpoint(GRID_PATH, &[("birkman_id", birkman_id.as_str())])
    }

    pub fn comparative_graph(&self, user_a: &BirkmanId, user_b: &BirkmanId) -> String {
        self.endpoint(
            COMPARATIVE_GRAPH_PATH,
            &[("birkman_id_a", user_a.as_str()), ("birkman_id_b", user_b.as_str())],
        )
    }

    fn endpoint(&self, path: &str, query: &[(&str, &str)]) -> String {
        let mut url = self.base.clone();
        let prefix = url.path().trim_end_matches('/').to_owned();
        url.set_path(&format!("{prefix}/{path}"));
        url.set_fragment(None);
        url.query_pairs_mut().clear().extend_pairs(query.iter().copied());
        url.to_string()
    }
}
