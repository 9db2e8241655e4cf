use chrono::Utc;
use tokio::sync::RwLock;

use birkbot_core::domain::profile::{BirkmanId, Profile, ProfilePayload};

use super::{ProfileRepository, RepositoryError};

/// Profiles kept in creation order, so the last username match is the newest.
#[derive(Default)]
pub struct InMemoryProfileRepository {
    profiles: RwLock<Vec<Profile>>,
}

impl InMemoryProfileRepository {
    pub fn with_profiles(profiles: Vec<Profile>) -> Self {
        Self { profiles: RwLock::new(profiles) }
    }
}

#[async_trait::async_trait]
impl ProfileRepository for InMemoryProfileRepository {
    async fn find_by_birkman_id(
        &self,
        birkman_id: &BirkmanId,
    ) -> Result<Option<Profile>, RepositoryError> {
        let profiles = self.profiles.read().await;
        Ok(profiles.iter().find(|profile| &profile.birkman_id == birkman_id).cloned())
    }

    async fn find_by_slack_username(
        &self,
        slack_username: &str,
    ) -> Result<Option<Profile>, RepositoryError> {
        let profiles = self.profiles.read().await;
        Ok(profiles.iter().rev().find(|profile| profile.slack_username == slack_username).cloned())
    }

    async fn list(&self) -> Result<Vec<Profile>, RepositoryError> {
        let mut profiles = self.profiles.read().await.clone();
        profiles.sort_by(|left, right| {
            left.slack_username
                .cmp(&right.slack_username)
                .then_with(|| left.birkman_id.0.cmp(&right.birkman_id.0))
        });
        Ok(profiles)
    }

    async fn create(
        &self,
        birkman_id: &BirkmanId,
        slack_username: &str,
    ) -> Result<Profile, RepositoryError> {
        let mut profiles = self.profiles.write().await;
        if profiles.iter().any(|profile| &profile.birkman_id == birkman_id) {
            return Err(RepositoryError::Conflict(format!("profile {birkman_id} already exists")));
        }

        let now = Utc::now();
        let profile = Profile {
            birkman_id: birkman_id.clone(),
            slack_username: slack_username.to_owned(),
            payload: ProfilePayload::empty(),
            created_at: now,
            updated_at: now,
        };
        profiles.push(profile.clone());
        Ok(profile)
    }

    async fn update_slack_username(
        &self,
        birkman_id: &BirkmanId,
        slack_username: &str,
    ) -> Result<bool, RepositoryError> {
        let mut profiles = self.profiles.write().await;
        match profiles.iter_mut().find(|profile| &profile.birkman_id == birkman_id) {
            Some(profile) => {
                profile.slack_username = slack_username.to_owned();
                profile.updated_at = Utc::now();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn update_payload(
        &self,
        birkman_id: &BirkmanId,
        payload: &ProfilePayload,
    ) -> Result<bool, RepositoryError> {
        let mut profiles = self.profiles.write().await;
        match profiles.iter_mut().find(|profile| &profile.birkman_id == birkman_id) {
            Some(profile) => {
                profile.payload = payload.clone();
                profile.updated_at = Utc::now();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete(&self, birkman_id: &BirkmanId) -> Result<bool, RepositoryError> {
        let mut profiles = self.profiles.write().await;
        let before = profiles.len();
        profiles.retain(|profile| &profile.birkman_id != birkman_id);
        Ok(profiles.len() != before)
    }
}
