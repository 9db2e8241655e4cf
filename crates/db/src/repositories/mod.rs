use async_trait::async_trait;
use thiserror::Error;

use birkbot_core::domain::profile::{BirkmanId, Profile, ProfilePayload};

pub mod memory;
pub mod profile;

pub use memory::InMemoryProfileRepository;
pub use profile::SqlProfileRepository;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("decode error: {0}")]
    Decode(String),
    #[error("conflict: {0}")]
    Conflict(String),
}

/// Storage for the Birkman id ↔ Slack username mapping and cached core data.
///
/// Slack usernames are not unique. When several profiles share one, lookups
/// return the most recently created profile.
#[async_trait]
pub trait ProfileRepository: Send + Sync {
    async fn find_by_birkman_id(
        &self,
        birkman_id: &BirkmanId,
    ) -> Result<Option<Profile>, RepositoryError>;

    async fn find_by_slack_username(
        &self,
        slack_username: &str,
    ) -> Result<Option<Profile>, RepositoryError>;

    /// All profiles ordered by Slack username, then Birkman id.
    async fn list(&self) -> Result<Vec<Profile>, RepositoryError>;

    /// Inserts a profile with an empty payload. Fails with `Conflict` when the
    /// Birkman id is already taken.
    async fn create(
        &self,
        birkman_id: &BirkmanId,
        slack_username: &str,
    ) -> Result<Profile, RepositoryError>;

    /// Returns `false` when no profile has this Birkman id.
    async fn update_slack_username(
        &self,
        birkman_id: &BirkmanId,
        slack_username: &str,
    ) -> Result<bool, RepositoryError>;

    async fn update_payload(
        &self,
        birkman_id: &BirkmanId,
        payload: &ProfilePayload,
    ) -> Result<bool, RepositoryError>;

    async fn delete(&self, birkman_id: &BirkmanId) -> Result<bool, RepositoryError>;
}
