use birkbot_assessment::BirkmanApiClient;
use birkbot_core::{AssessmentProvider, BirkmanId, Profile};
use birkbot_db::{connect_with_settings, ProfileRepository, SqlProfileRepository};

use crate::commands::{load_config, runtime, CommandResult, ErrorClass};

/// Re-fetches core data for one profile, or for every stored profile when no
/// id is given. Stops at the first failure so a broken provider is not hammered.
pub fn run(birkman_id: Option<&str>) -> CommandResult {
    let config = match load_config("refresh") {
        Ok(config) => config,
        Err(result) => return result,
    };
    let runtime = match runtime("refresh") {
        Ok(runtime) => runtime,
        Err(result) => return result,
    };

    let result = runtime.block_on(async {
        let pool = connect_with_settings(
            &config.database.url,
            config.database.max_connections,
            config.database.timeout_secs,
        )
        .await
        .map_err(|error| (ErrorClass::DbConnectivity, error.to_string()))?;
        let profiles = SqlProfileRepository::new(pool.clone());

        let targets = select_targets(&profiles, birkman_id).await;
        let refreshed = match targets {
            Ok(targets) if targets.is_empty() => Ok(0),
            Ok(targets) => {
                let provider = BirkmanApiClient::from_config(&config.birkman)
                    .map_err(|error| (ErrorClass::Provider, error.to_string()))?;
                refresh_all(&profiles, &provider, &targets).await
            }
            Err(failure) => Err(failure),
        };

        pool.close().await;
        refreshed
    });

    match result {
        Ok(1) => CommandResult::success("refresh", "refreshed 1 profile"),
        Ok(count) => CommandResult::success("refresh", format!("refreshed {count} profiles")),
        Err((class, message)) => class.into_result("refresh", message),
    }
}

async fn select_targets(
    profiles: &SqlProfileRepository,
    birkman_id: Option<&str>,
) -> Result<Vec<Profile>, (ErrorClass, String)> {
    let Some(raw_id) = birkman_id.map(str::trim) else {
        return profiles.list().await.map_err(|error| (ErrorClass::Store, error.to_string()));
    };

    let id = BirkmanId(raw_id.to_string());
    match profiles.find_by_birkman_id(&id).await {
        Ok(Some(profile)) => Ok(vec![profile]),
        Ok(None) => Err((ErrorClass::NotFound, format!("no profile stored for birkman id `{id}`"))),
        Err(error) => Err((ErrorClass::Store, error.to_string())),
    }
}

async fn refresh_all(
    profiles: &SqlProfileRepository,
    provider: &dyn AssessmentProvider,
    targets: &[Profile],
) -> Result<usize, (ErrorClass, String)> {
    let mut refreshed = 0;
    for profile in targets {
        let payload = provider.core_data(&profile.birkman_id).await.map_err(|error| {
            (ErrorClass::Provider, format!("{}: {error}", profile.birkman_id))
        })?;
        let updated = profiles
            .update_payload(&profile.birkman_id, &payload)
            .await
            .map_err(|error| (ErrorClass::Store, error.to_string()))?;
        if updated {
            refreshed += 1;
        }
    }
    Ok(refreshed)
}
