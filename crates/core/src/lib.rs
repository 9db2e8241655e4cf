pub mod assessment;
pub mod config;
pub mod domain;
pub mod errors;

pub use assessment::AssessmentProvider;
pub use domain::profile::{BirkmanId, GridPoint, GridScores, Profile, ProfilePayload};
pub use domain::report::{ComparativeReport, CriticalComponent};
pub use errors::ProviderError;
