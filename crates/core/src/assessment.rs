use async_trait::async_trait;

use crate::domain::profile::{BirkmanId, ProfilePayload};
use crate::domain::report::ComparativeReport;
use crate::errors::ProviderError;

/// The external Birkman assessment service.
///
/// Remote calls are async; grid rendering works purely on a stored payload and
/// must be deterministic so repeated image fetches return identical bytes.
#[async_trait]
pub trait AssessmentProvider: Send + Sync {
    async fn core_data(&self, birkman_id: &BirkmanId) -> Result<ProfilePayload, ProviderError>;

    async fn comparative_report(
        &self,
        user_a: &ProfilePayload,
        user_b: &ProfilePayload,
    ) -> Result<ComparativeReport, ProviderError>;

    fn render_grid(&self, payload: &ProfilePayload) -> Result<Vec<u8>, ProviderError>;

    /// Human label for a component id, falling back to the id itself.
    fn component_label(&self, component: &str) -> String;
}
