use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// Longest tag accepted for an event type.
const MAX_TAG_LEN: usize = 64;

/// Tag identifying the schema of a block's payload.
///
/// Tags are restricted to `[a-z0-9_]` so they can never contain the field
/// separator used by the block hasher.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum EventType {
    /// The height-0 anchor block.
    Genesis,
    /// A user submitted a new activity.
    ActivitySubmission,
    /// An activity was scored (difficulty, points, risk).
    ActivityScored,
    /// A user completed an activity.
    Completion,
    /// A campaign grouping activities was generated.
    CampaignGenerated,
    /// Any other well-formed tag, written through the generic append path.
    Custom(String),
}

impl EventType {
    /// The wire tag stored in the `event_type` column.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Genesis => "genesis",
            Self::ActivitySubmission => "activity_submission",
            Self::ActivityScored => "activity_scored",
            Self::Completion => "completion",
            Self::CampaignGenerated => "campaign_generated",
            Self::Custom(tag) => tag,
        }
    }

    /// Parse a tag, mapping known tags onto their variants.
    pub fn parse(tag: &str) -> Result<Self, TypeError> {
        let known = match tag {
            "genesis" => Some(Self::Genesis),
            "activity_submission" => Some(Self::ActivitySubmission),
            "activity_scored" => Some(Self::ActivityScored),
            "completion" => Some(Self::Completion),
            "campaign_generated" => Some(Self::CampaignGenerated),
            _ => None,
        };
        if let Some(kind) = known {
            return Ok(kind);
        }

        let well_formed = !tag.is_empty()
            && tag.len() <= MAX_TAG_LEN
            && tag
                .bytes()
                .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'_');
        if !well_formed {
            return Err(TypeError::InvalidEventType(tag.to_string()));
        }
        Ok(Self::Custom(tag.to_string()))
    }

    /// Returns `true` for tags with a typed payload schema.
    pub fn is_known(&self) -> bool {
        !matches!(self, Self::Custom(_))
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventType {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for EventType {
    type Error = TypeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<EventType> for String {
    fn from(value: EventType) -> Self {
        match value {
            EventType::Custom(tag) => tag,
            other => other.as_str().to_string(),
        }
    }
}
