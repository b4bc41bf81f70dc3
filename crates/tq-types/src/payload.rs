use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::event::EventType;

/// Typed ledger payload, tagged by `event_type`.
///
/// Serializes to the map stored in `payload_json` (minus the `version`
/// stamp, which the ledger adds on append).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event_type", rename_all = "snake_case")]
pub enum EventPayload {
    Genesis(GenesisRecord),
    ActivitySubmission(ActivitySubmission),
    ActivityScored(ActivityScore),
    Completion(CompletionRecord),
    CampaignGenerated(Campaign),
}

impl EventPayload {
    pub fn event_type(&self) -> EventType {
        match self {
            Self::Genesis(_) => EventType::Genesis,
            Self::ActivitySubmission(_) => EventType::ActivitySubmission,
            Self::ActivityScored(_) => EventType::ActivityScored,
            Self::Completion(_) => EventType::Completion,
            Self::CampaignGenerated(_) => EventType::CampaignGenerated,
        }
    }

    /// Check every field constraint of the variant.
    pub fn validate(&self) -> Result<(), ValidationError> {
        match self {
            Self::Genesis(g) => require_text("note", &g.note),
            Self::ActivitySubmission(s) => s.activity.validate(),
            Self::ActivityScored(s) => s.validate(),
            Self::Completion(c) => c.validate(),
            Self::CampaignGenerated(c) => c.validate(),
        }
    }
}

/// Payload of the height-0 block.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenesisRecord {
    pub version: u32,
    pub note: String,
}

/// A user-submitted activity.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Activity {
    /// Fresh UUID assigned by the ledger.
    pub id: String,
    pub name: String,
    pub description: String,
    /// Seconds since the UNIX epoch.
    pub time_posted: i64,
    pub user_who_posted: String,
    /// Typically 0.0 - 10.0.
    pub difficulty_rating: f64,
    pub points: u64,
}

impl Activity {
    pub fn validate(&self) -> Result<(), ValidationError> {
        require_text("id", &self.id)?;
        require_text("name", &self.name)?;
        require_text("description", &self.description)?;
        require_text("user_who_posted", &self.user_who_posted)?;
        require_finite("difficulty_rating", self.difficulty_rating)
    }

    /// Campaign tier this activity falls into by difficulty.
    pub fn tier(&self) -> CampaignTier {
        CampaignTier::for_difficulty(self.difficulty_rating)
    }
}

/// `activity_submission` payload body.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ActivitySubmission {
    pub activity: Activity,
}

/// `activity_scored` payload body.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ActivityScore {
    pub activity_id: String,
    pub difficulty_score: f64,
    pub points: u64,
    pub risk_level: String,
}

impl ActivityScore {
    pub fn validate(&self) -> Result<(), ValidationError> {
        require_text("activity_id", &self.activity_id)?;
        require_finite("difficulty_score", self.difficulty_score)?;
        require_text("risk_level", &self.risk_level)
    }
}

/// `completion` payload body.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletionRecord {
    pub user_id: String,
    pub activity_id: String,
    /// Seconds since the UNIX epoch.
    pub completed_at: i64,
}

impl CompletionRecord {
    pub fn validate(&self) -> Result<(), ValidationError> {
        require_text("user_id", &self.user_id)?;
        require_text("activity_id", &self.activity_id)
    }
}

/// Difficulty band used to group activities into campaigns.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CampaignTier {
    Easy,
    Medium,
    Hard,
    Extreme,
}

impl CampaignTier {
    /// Bands: easy below 3, medium below 6, hard below 8, extreme above.
    pub fn for_difficulty(difficulty: f64) -> Self {
        if difficulty < 3.0 {
            Self::Easy
        } else if difficulty < 6.0 {
            Self::Medium
        } else if difficulty < 8.0 {
            Self::Hard
        } else {
            Self::Extreme
        }
    }
}

impl fmt::Display for CampaignTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Easy => "easy",
            Self::Medium => "medium",
            Self::Hard => "hard",
            Self::Extreme => "extreme",
        };
        f.write_str(s)
    }
}

/// `campaign_generated` payload body.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Campaign {
    pub title: String,
    pub description: String,
    pub tier: CampaignTier,
    pub total_points: u64,
    /// Ids of the grouped activities.
    pub activities: Vec<String>,
}

impl Campaign {
    pub fn validate(&self) -> Result<(), ValidationError> {
        require_text("title", &self.title)?;
        require_text("description", &self.description)?;
        if self.activities.iter().any(|id| id.trim().is_empty()) {
            return Err(ValidationError::new("activities", "must not contain blank ids"));
        }
        Ok(())
    }
}

fn require_text(field: &str, value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::required(field));
    }
    Ok(())
}

fn require_finite(field: &str, value: f64) -> Result<(), ValidationError> {
    if !value.is_finite() {
        return Err(ValidationError::new(field, "must be a number"));
    }
    Ok(())
}
