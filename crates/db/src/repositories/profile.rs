use chrono::{DateTime, SecondsFormat, Utc};
use sqlx::Row;

use birkbot_core::domain::profile::{BirkmanId, Profile, ProfilePayload};

use super::{ProfileRepository, RepositoryError};
use crate::DbPool;

const PROFILE_COLUMNS: &str =
    "birkman_id, slack_username, birkman_data, created_at, updated_at";

pub struct SqlProfileRepository {
    pool: DbPool,
}

impl SqlProfileRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn timestamp(value: DateTime<Utc>) -> String {
    value.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_timestamp(column: &str, raw: &str) -> Result<DateTime<Utc>, RepositoryError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| RepositoryError::Decode(format!("{column}: {e}")))
}

fn row_to_profile(row: &sqlx::sqlite::SqliteRow) -> Result<Profile, RepositoryError> {
    let birkman_id: String =
        row.try_get("birkman_id").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let slack_username: String =
        row.try_get("slack_username").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let birkman_data: String =
        row.try_get("birkman_data").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let created_at: String =
        row.try_get("created_at").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let updated_at: String =
        row.try_get("updated_at").map_err(|e| RepositoryError::Decode(e.to_string()))?;

    let payload = ProfilePayload::from_json_str(&birkman_data)
        .map_err(|e| RepositoryError::Decode(format!("birkman_data for {birkman_id}: {e}")))?;

    Ok(Profile {
        birkman_id: BirkmanId(birkman_id),
        slack_username,
        payload,
        created_at: parse_timestamp("created_at", &created_at)?,
        updated_at: parse_timestamp("updated_at", &updated_at)?,
    })
}

#[async_trait::async_trait]
impl ProfileRepository for SqlProfileRepository {
    async fn find_by_birkman_id(
        &self,
        birkman_id: &BirkmanId,
    ) -> Result<Option<Profile>, RepositoryError> {
        let sql = format!("SELECT {PROFILE_COLUMNS} FROM profile WHERE birkman_id = ?");
        let row = sqlx::query(&sql)
            .bind(&birkman_id.0)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(row_to_profile).transpose()
    }

    async fn find_by_slack_username(
        &self,
        slack_username: &str,
    ) -> Result<Option<Profile>, RepositoryError> {
        let row = sqlx::query(&format!(
            "SELECT {PROFILE_COLUMNS} FROM profile
             WHERE slack_username = ?
             ORDER BY created_at DESC, rowid DESC
             LIMIT 1"
        ))
        .bind(slack_username)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(row_to_profile).transpose()
    }

    async fn list(&self) -> Result<Vec<Profile>, RepositoryError> {
        let rows = sqlx::query(&format!(
            "SELECT {PROFILE_COLUMNS} FROM profile ORDER BY slack_username ASC, birkman_id ASC"
        ))
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_profile).collect()
    }

    async fn create(
        &self,
        birkman_id: &BirkmanId,
        slack_username: &str,
    ) -> Result<Profile, RepositoryError> {
        let now = Utc::now();
        let payload = ProfilePayload::empty();

        let result = sqlx::query(
            "INSERT INTO profile (birkman_id, slack_username, birkman_data, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&birkman_id.0)
        .bind(slack_username)
        .bind(payload.to_json_string())
        .bind(timestamp(now))
        .bind(timestamp(now))
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(Profile {
                birkman_id: birkman_id.clone(),
                slack_username: slack_username.to_owned(),
                payload,
                created_at: now,
                updated_at: now,
            }),
            Err(sqlx::Error::Database(db_error)) if db_error.is_unique_violation() => Err(
                RepositoryError::Conflict(format!("profile {birkman_id} already exists")),
            ),
            Err(error) => Err(error.into()),
        }
    }

    async fn update_slack_username(
        &self,
        birkman_id: &BirkmanId,
        slack_username: &str,
    ) -> Result<bool, RepositoryError> {
        let result = sqlx::query(
            "UPDATE profile SET slack_username = ?, updated_at = ? WHERE birkman_id = ?",
        )
        .bind(slack_username)
        .bind(timestamp(Utc::now()))
        .bind(&birkman_id.0)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn update_payload(
        &self,
        birkman_id: &BirkmanId,
        payload: &ProfilePayload,
    ) -> Result<bool, RepositoryError> {
        let result =
            sqlx::query("UPDATE profile SET birkman_data = ?, updated_at = ? WHERE birkman_id = ?")
                .bind(payload.to_json_string())
                .bind(timestamp(Utc::now()))
                .bind(&birkman_id.0)
                .execute(&self.pool)
                .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn delete(&self, birkman_id: &BirkmanId) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM profile WHERE birkman_id = ?")
            .bind(&birkman_id.0)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use birkbot_core::domain::profile::{BirkmanId, ProfilePayload};

    use super::SqlProfileRepository;
    use crate::repositories::{ProfileRepository, RepositoryError};
    use crate::{connect_with_settings, migrations};

    async fn repository() -> SqlProfileRepository {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        migrations::run_pending(&pool).await.expect("migrations");
        SqlProfileRepository::new(pool)
    }

    #[tokio::test]
    async fn create_then_find_by_id_and_username() {
        let repo = repository().await;
        let id = BirkmanId("GTW013".to_string());

        let created = repo.create(&id, "alice").await.expect("create");
        assert!(created.payload.is_empty());

        let by_id = repo.find_by_birkman_id(&id).await.expect("find by id").expect("present");
        assert_eq!(by_id.slack_username, "alice");
        assert_eq!(by_id.birkman_id, id);

        let by_username =
            repo.find_by_slack_username("alice").await.expect("find by username").expect("present");
        assert_eq!(by_username.birkman_id, id);

        assert!(repo.find_by_slack_username("nobody").await.expect("lookup").is_none());
        assert!(repo
            .find_by_birkman_id(&BirkmanId("missing".to_string()))
            .await
            .expect("lookup")
            .is_none());
    }

    #[tokio::test]
    async fn duplicate_birkman_id_is_a_conflict() {
        let repo = repository().await;
        let id = BirkmanId("GTW013".to_string());
        repo.create(&id, "alice").await.expect("first create");

        let error = repo.create(&id, "bob").await.expect_err("duplicate must fail");
        assert!(matches!(error, RepositoryError::Conflict(_)), "got {error:?}");
    }

    #[tokio::test]
    async fn duplicate_username_resolves_to_most_recent_profile() {
        let repo = repository().await;
        repo.create(&BirkmanId("OLD001".to_string()), "shared").await.expect("create old");
        repo.create(&BirkmanId("NEW002".to_string()), "shared").await.expect("create new");

        let found =
            repo.find_by_slack_username("shared").await.expect("lookup").expect("present");
        assert_eq!(found.birkman_id.0, "NEW002");
    }

    #[tokio::test]
    async fn payload_and_username_updates_persist() {
        let repo = repository().await;
        let id = BirkmanId("GTW013".to_string());
        repo.create(&id, "alice").await.expect("create");

        let payload = ProfilePayload::new(json!({ "name": "Alice Example", "scores": [1, 2] }));
        assert!(repo.update_payload(&id, &payload).await.expect("update payload"));
        assert!(repo.update_slack_username(&id, "alice.e").await.expect("update username"));

        let stored = repo.find_by_birkman_id(&id).await.expect("find").expect("present");
        assert_eq!(stored.payload, payload);
        assert_eq!(stored.slack_username, "alice.e");
        assert!(stored.updated_at >= stored.created_at);

        let missing = BirkmanId("missing".to_string());
        assert!(!repo.update_payload(&missing, &payload).await.expect("update missing"));
        assert!(!repo.update_slack_username(&missing, "x").await.expect("update missing"));
    }

    #[tokio::test]
    async fn list_is_ordered_and_delete_removes() {
        let repo = repository().await;
        repo.create(&BirkmanId("B2".to_string()), "zed").await.expect("create");
        repo.create(&BirkmanId("A1".to_string()), "amy").await.expect("create");

        let usernames: Vec<String> =
            repo.list().await.expect("list").into_iter().map(|p| p.slack_username).collect();
        assert_eq!(usernames, vec!["amy".to_string(), "zed".to_string()]);

        assert!(repo.delete(&BirkmanId("A1".to_string())).await.expect("delete"));
        assert!(!repo.delete(&BirkmanId("A1".to_string())).await.expect("delete again"));
        assert_eq!(repo.list().await.expect("list").len(), 1);
    }
}
