use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BirkmanId(pub String);

impl BirkmanId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BirkmanId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Stored assessment record linking one Birkman id to a Slack username.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    pub birkman_id: BirkmanId,
    pub slack_username: String,
    pub payload: ProfilePayload,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Profile {
    /// Name shown in Slack messages: the assessed person's name when the payload
    /// carries one, otherwise the Slack username.
    pub fn display_name(&self) -> &str {
        self.payload.name().unwrap_or(&self.slack_username)
    }
}

/// Core data returned by the assessment provider, stored as-is.
///
/// Only `name` and `grid` are read by this crate; everything else passes
/// through untouched to the comparative report endpoint.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProfilePayload(Value);

impl Default for ProfilePayload {
    fn default() -> Self {
        Self::empty()
    }
}

impl ProfilePayload {
    pub fn empty() -> Self {
        Self(Value::Object(serde_json::Map::new()))
    }

    pub fn new(value: Value) -> Self {
        Self(value)
    }

    pub fn as_value(&self) -> &Value {
        &self.0
    }

    pub fn into_value(self) -> Value {
        self.0
    }

    pub fn is_empty(&self) -> bool {
        match &self.0 {
            Value::Null => true,
            Value::Object(map) => map.is_empty(),
            _ => false,
        }
    }

    pub fn name(&self) -> Option<&str> {
        self.0.get("name").and_then(Value::as_str).map(str::trim).filter(|name| !name.is_empty())
    }

    pub fn grid_scores(&self) -> Option<GridScores> {
        let grid = self.0.get("grid")?;
        serde_json::from_value(grid.clone()).ok()
    }

    pub fn to_json_string(&self) -> String {
        self.0.to_string()
    }

    pub fn from_json_str(raw: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(raw).map(Self)
    }
}

/// A position on the Birkman grid, both axes on a 0..=100 scale.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct GridPoint {
    pub x: f64,
    pub y: f64,
}

impl GridPoint {
    pub fn clamped(self) -> Self {
        Self { x: clamp_score(self.x), y: clamp_score(self.y) }
    }
}

fn clamp_score(value: f64) -> f64 {
    if value.is_nan() {
        50.0
    } else {
        value.clamp(0.0, 100.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct GridScores {
    pub interests: GridPoint,
    pub usual: GridPoint,
    pub need: GridPoint,
}
