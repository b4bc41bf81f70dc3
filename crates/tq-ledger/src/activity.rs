use serde::{Deserialize, Serialize};
use serde_json::Value;
use tq_types::{Activity, ValidationError};

/// An activity as submitted by a user, before validation.
///
/// `id` is assigned by the ledger; `time_posted` defaults to the append time.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NewActivity {
    pub name: String,
    pub description: String,
    pub user_who_posted: String,
    pub difficulty_rating: f64,
    pub points: i64,
    #[serde(default)]
    pub time_posted: Option<i64>,
}

impl NewActivity {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        user_who_posted: impl Into<String>,
        difficulty_rating: f64,
        points: i64,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            user_who_posted: user_who_posted.into(),
            difficulty_rating,
            points,
            time_posted: None,
        }
    }

    pub fn posted_at(mut self, time_posted: i64) -> Self {
        self.time_posted = Some(time_posted);
        self
    }

    /// Read a submission from an untyped JSON body, naming the first field
    /// that is missing or has the wrong shape.
    pub fn from_json(body: &Value) -> Result<Self, ValidationError> {
        let text = |field: &str| -> Result<String, ValidationError> {
            body.get(field)
                .and_then(Value::as_str)
                .map(str::to_string)
                .ok_or_else(|| ValidationError::required(field))
        };

        let name = text("name")?;
        let description = text("description")?;
        let user_who_posted = text("user_who_posted")?;

        let difficulty_rating = body
            .get("difficulty_rating")
            .and_then(Value::as_f64)
            .ok_or_else(|| ValidationError::new("difficulty_rating", "must be a number"))?;

        let points = body
            .get("points")
            .and_then(whole_number)
            .ok_or_else(|| ValidationError::new("points", "must be a non-negative integer"))?;

        let time_posted = match body.get("time_posted") {
            None | Some(Value::Null) => None,
            Some(v) => Some(
                whole_number(v)
                    .ok_or_else(|| ValidationError::new("time_posted", "must be an integer"))?,
            ),
        };

        Ok(Self {
            name,
            description,
            user_who_posted,
            difficulty_rating,
            points,
            time_posted,
        })
    }

    /// Validate and normalize into the stored activity record.
    pub fn into_activity(self, id: String, now: i64) -> Result<Activity, ValidationError> {
        let name = required("name", &self.name)?;
        let description = required("description", &self.description)?;
        let user_who_posted = required("user_who_posted", &self.user_who_posted)?;

        if self.points < 0 {
            return Err(ValidationError::new("points", "must be a non-negative integer"));
        }
        if !self.difficulty_rating.is_finite() {
            return Err(ValidationError::new("difficulty_rating", "must be a number"));
        }

        Ok(Activity {
            id,
            name,
            description,
            time_posted: self.time_posted.unwrap_or(now),
            user_who_posted,
            difficulty_rating: self.difficulty_rating,
            points: self.points as u64,
        })
    }
}

fn required(field: &str, value: &str) -> Result<String, ValidationError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::required(field));
    }
    Ok(trimmed.to_string())
}

/// Integer value of a JSON number, accepting floats with no fractional part.
fn whole_number(value: &Value) -> Option<i64> {
    if let Some(n) = value.as_i64() {
        return Some(n);
    }
    let f = value.as_f64()?;
    if f.is_finite() && f.fract() == 0.0 && f.abs() < i64::MAX as f64 {
        Some(f as i64)
    } else {
        None
    }
}
