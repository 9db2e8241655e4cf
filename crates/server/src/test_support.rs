use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::Router;
use chrono::Utc;
use secrecy::SecretString;
use serde_json::json;

use birkbot_assessment::{component_label, GridRenderer};
use birkbot_core::assessment::AssessmentProvider;
use birkbot_core::domain::profile::{BirkmanId, Profile, ProfilePayload};
use birkbot_core::domain::report::{ComparativeReport, CriticalComponent};
use birkbot_core::errors::ProviderError;
use birkbot_db::repositories::{InMemoryProfileRepository, ProfileRepository, RepositoryError};
use birkbot_db::{connect_with_settings, DbPool};
use birkbot_slack::{
    CommandDispatcher, ImageLinks, NotificationMessage, Notifier, SlashCommandHandler,
};

use crate::routes::{init_templates, router, AppState};

pub const TOKEN: &str = "test-command-token";

/// In-memory profiles that count every repository call.
pub struct CountingProfiles {
    inner: InMemoryProfileRepository,
    calls: AtomicUsize,
}

impl CountingProfiles {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn tick(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl ProfileRepository for CountingProfiles {
    async fn find_by_birkman_id(
        &self,
        birkman_id: &BirkmanId,
    ) -> Result<Option<Profile>, RepositoryError> {
        self.tick();
        self.inner.find_by_birkman_id(birkman_id).await
    }

    async fn find_by_slack_username(
        &self,
        slack_username: &str,
    ) -> Result<Option<Profile>, RepositoryError> {
        self.tick();
        self.inner.find_by_slack_username(slack_username).await
    }

    async fn list(&self) -> Result<Vec<Profile>, RepositoryError> {
        self.tick();
        self.inner.list().await
    }

    async fn create(
        &self,
        birkman_id: &BirkmanId,
        slack_username: &str,
    ) -> Result<Profile, RepositoryError> {
        self.tick();
        self.inner.create(birkman_id, slack_username).await
    }

    async fn update_slack_username(
        &self,
        birkman_id: &BirkmanId,
        slack_username: &str,
    ) -> Result<bool, RepositoryError> {
        self.tick();
        self.inner.update_slack_username(birkman_id, slack_username).await
    }

    async fn update_payload(
        &self,
        birkman_id: &BirkmanId,
        payload: &ProfilePayload,
    ) -> Result<bool, RepositoryError> {
        self.tick();
        self.inner.update_payload(birkman_id, payload).await
    }

    async fn delete(&self, birkman_id: &BirkmanId) -> Result<bool, RepositoryError> {
        self.tick();
        self.inner.delete(birkman_id).await
    }
}

/// Provider double: canned core data and report, real grid rasterizer.
#[derive(Default)]
pub struct FakeProvider {
    calls: AtomicUsize,
    failing_reports: AtomicBool,
}

impl FakeProvider {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn fail_reports(&self) {
        self.failing_reports.store(true, Ordering::SeqCst);
    }
}

fn grid_payload(name: &str) -> ProfilePayload {
    ProfilePayload::new(json!({
        "name": name,
        "grid": {
            "interests": { "x": 30, "y": 70 },
            "usual": { "x": 65, "y": 40 },
            "need": { "x": 55, "y": 20 }
        }
    }))
}

#[async_trait]
impl AssessmentProvider for FakeProvider {
    async fn core_data(&self, birkman_id: &BirkmanId) -> Result<ProfilePayload, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(grid_payload(&format!("Core {birkman_id}")))
    }

    async fn comparative_report(
        &self,
        _user_a: &ProfilePayload,
        _user_b: &ProfilePayload,
    ) -> Result<ComparativeReport, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.failing_reports.load(Ordering::SeqCst) {
            return Err(ProviderError::Status { status: 503, body: "maintenance".to_owned() });
        }
        Ok(ComparativeReport {
            critical_components: vec![CriticalComponent {
                component: "esteem".to_owned(),
                diff: 35.into(),
                your_usual: 20.into(),
                their_need: 55.into(),
                your_usual_explanation: "Plain spoken".to_owned(),
                their_need_explanation: "Wants recognition".to_owned(),
            }],
            graph_png: b"\x89PNG-graph".to_vec(),
        })
    }

    fn render_grid(&self, payload: &ProfilePayload) -> Result<Vec<u8>, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        GridRenderer.render(payload)
    }

    fn component_label(&self, component: &str) -> String {
        component_label(component)
    }
}

#[derive(Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<(String, NotificationMessage)>>,
}

impl RecordingNotifier {
    pub fn sent(&self) -> Vec<(String, NotificationMessage)> {
        self.sent.lock().expect("lock").clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify(&self, response_url: &str, message: &NotificationMessage) {
        self.sent.lock().expect("lock").push((response_url.to_owned(), message.clone()));
    }
}

pub struct TestApp {
    pub profiles: Arc<CountingProfiles>,
    pub provider: Arc<FakeProvider>,
    pub notifier: Arc<RecordingNotifier>,
    state: AppState,
    db_pool: DbPool,
}

impl TestApp {
    pub async fn new() -> Self {
        Self::build(None).await
    }

    pub async fn with_public_base_url(base_url: &str) -> Self {
        Self::build(Some(ImageLinks::new(base_url).expect("base url"))).await
    }

    async fn build(public_links: Option<ImageLinks>) -> Self {
        let now = Utc::now();
        let seeded = vec![
            Profile {
                birkman_id: BirkmanId("GTW013".to_owned()),
                slack_username: "alice".to_owned(),
                payload: grid_payload("Alice Example"),
                created_at: now,
                updated_at: now,
            },
            Profile {
                birkman_id: BirkmanId("BOB777".to_owned()),
                slack_username: "bob".to_owned(),
                payload: grid_payload("Bob Builder"),
                created_at: now,
                updated_at: now,
            },
        ];

        let profiles = Arc::new(CountingProfiles {
            inner: InMemoryProfileRepository::with_profiles(seeded),
            calls: AtomicUsize::new(0),
        });
        let provider = Arc::new(FakeProvider::default());
        let notifier = Arc::new(RecordingNotifier::default());

        let dispatcher = CommandDispatcher::new(profiles.clone(), provider.clone());
        let slash_commands = Arc::new(SlashCommandHandler::new(
            SecretString::from(TOKEN.to_owned()),
            dispatcher,
            notifier.clone(),
        ));

        let state = AppState {
            profiles: profiles.clone(),
            provider: provider.clone(),
            slash_commands,
            templates: init_templates(),
            public_links,
        };
        let db_pool = connect_with_settings("sqlite::memory:", 1, 5).await.expect("pool");

        Self { profiles, provider, notifier, state, db_pool }
    }

    pub fn router(&self) -> Router {
        router(self.state.clone(), self.db_pool.clone())
    }

    /// Looks a profile up without counting the call.
    pub async fn find(&self, birkman_id: &str) -> Option<Profile> {
        self.profiles
            .inner
            .find_by_birkman_id(&BirkmanId(birkman_id.to_owned()))
            .await
            .expect("lookup")
    }
}
