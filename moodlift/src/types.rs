use serde::{Deserialize, Serialize};
use std::fmt;
use time::OffsetDateTime;

// =============================================================================
// REFERENCE DATA
// =============================================================================

/// A named, colored emotional state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Mood {
    pub id: i64,
    pub name: String,
    /// Hex color code, e.g. "#FFD700"
    pub color: String,
}

impl Mood {
    /// Parses `color` as `#RRGGBB` or `#RGB`.
    #[must_use]
    pub fn rgb(&self) -> Option<(u8, u8, u8)> {
        let hex = self.color.trim().strip_prefix('#')?;
        if !hex.is_ascii() {
            return None;
        }
        match hex.len() {
            6 => Some((
                u8::from_str_radix(&hex[0..2], 16).ok()?,
                u8::from_str_radix(&hex[2..4], 16).ok()?,
                u8::from_str_radix(&hex[4..6], 16).ok()?,
            )),
            3 => {
                let channel = |i: usize| u8::from_str_radix(&hex[i..=i], 16).ok();
                Some((channel(0)? * 17, channel(1)? * 17, channel(2)? * 17))
            }
            _ => None,
        }
    }
}

/// Body for creating a mood (admin).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewMood {
    pub name: String,
    pub color: String,
}

impl NewMood {
    #[must_use]
    pub fn new(name: impl Into<String>, color: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            color: color.into(),
        }
    }
}

/// Partial update for a mood; unset fields are left untouched server-side.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MoodUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

impl MoodUpdate {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    #[must_use]
    pub fn with_color(mut self, color: impl Into<String>) -> Self {
        self.color = Some(color.into());
        self
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.name.is_none() && self.color.is_none()
    }
}

// =============================================================================
// TRANSITIONS
// =============================================================================

/// A recorded move from one mood to another, owned by the user who created it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transition {
    pub id: i64,
    pub initial_mood: Mood,
    pub target_mood: Mood,
    #[serde(with = "timestamp")]
    pub timestamp: OffsetDateTime,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct NewTransition {
    pub initial_mood_id: i64,
    pub target_mood_id: i64,
}

/// How often the current user moved between a pair of moods.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransitionStat {
    pub initial_mood: Mood,
    pub target_mood: Mood,
    pub count: u64,
}

// =============================================================================
// ACCOUNTS
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub username: String,
    pub email: String,
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(default)]
    pub is_active: Option<bool>,
    #[serde(default, with = "timestamp::option")]
    pub created_at: Option<OffsetDateTime>,
}

#[derive(Clone, Serialize)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub password: String,
}

impl fmt::Debug for NewUser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NewUser")
            .field("username", &self.username)
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Login response. The token itself is opaque to the client.
#[derive(Clone, Deserialize)]
pub struct AccessToken {
    pub access_token: String,
    #[serde(default = "default_token_type")]
    pub token_type: String,
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccessToken")
            .field("access_token", &"<redacted>")
            .field("token_type", &self.token_type)
            .finish()
    }
}

fn default_token_type() -> String {
    "bearer".to_string()
}

// =============================================================================
// PLAYLISTS
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaylistRequest {
    pub initial_mood_id: i64,
    pub target_mood_id: i64,
    pub transition_id: i64,
}

impl From<&Transition> for PlaylistRequest {
    fn from(transition: &Transition) -> Self {
        Self {
            initial_mood_id: transition.initial_mood.id,
            target_mood_id: transition.target_mood.id,
            transition_id: transition.id,
        }
    }
}

/// A playlist generated on the external service for a transition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Playlist {
    pub playlist_url: String,
    #[serde(default)]
    pub track_count: Option<u32>,
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(default)]
    pub transition_id: Option<i64>,
    #[serde(default)]
    pub spotify_id: Option<String>,
    #[serde(default, with = "timestamp::option")]
    pub created_at: Option<OffsetDateTime>,
}

/// Profile of the linked external music account.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpotifyProfile {
    #[serde(default)]
    pub success: bool,
    pub id: String,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub profile_url: Option<String>,
}

// =============================================================================
// SERDE HELPERS
// =============================================================================

/// Timestamps arrive as naive ISO-8601 (no offset, UTC implied) or RFC 3339.
/// They are always written back as RFC 3339.
pub mod timestamp {
    use serde::{de, Deserialize, Deserializer, Serializer};
    use time::format_description::well_known::{Iso8601, Rfc3339};
    use time::{OffsetDateTime, PrimitiveDateTime};

    pub fn parse(value: &str) -> Option<OffsetDateTime> {
        OffsetDateTime::parse(value, &Rfc3339)
            .ok()
            .or_else(|| {
                PrimitiveDateTime::parse(value, &Iso8601::DEFAULT)
                    .ok()
                    .map(PrimitiveDateTime::assume_utc)
            })
    }

    pub fn serialize<S: Serializer>(
        value: &OffsetDateTime,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        let text = value.format(&Rfc3339).map_err(serde::ser::Error::custom)?;
        serializer.serialize_str(&text)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<OffsetDateTime, D::Error> {
        let text = String::deserialize(deserializer)?;
        parse(&text).ok_or_else(|| de::Error::custom(format!("invalid timestamp '{text}'")))
    }

    pub mod option {
        use serde::{Deserialize, Deserializer, Serializer};
        use time::OffsetDateTime;

        pub fn serialize<S: Serializer>(
            value: &Option<OffsetDateTime>,
            serializer: S,
        ) -> Result<S::Ok, S::Error> {
            match value {
                Some(value) => super::serialize(value, serializer),
                None => serializer.serialize_none(),
            }
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(
            deserializer: D,
        ) -> Result<Option<OffsetDateTime>, D::Error> {
            let text = Option::<String>::deserialize(deserializer)?;
            text.map(|text| {
                super::parse(&text).ok_or_else(|| {
                    serde::de::Error::custom(format!("invalid timestamp '{text}'"))
                })
            })
            .transpose()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mood(color: &str) -> Mood {
        Mood {
            id: 1,
            name: "Happy".to_string(),
            color: color.to_string(),
        }
    }

    #[test]
    fn parses_long_and_short_hex_colors() {
        assert_eq!(mood("#FFD700").rgb(), Some((255, 215, 0)));
        assert_eq!(mood("#fff").rgb(), Some((255, 255, 255)));
        assert_eq!(mood("FFD700").rgb(), None);
        assert_eq!(mood("#GGHHII").rgb(), None);
    }

    #[test]
    fn transition_accepts_naive_timestamps() {
        let json = r##"{
            "id": 42,
            "initial_mood_id": 1,
            "target_mood_id": 3,
            "initial_mood": {"id": 1, "name": "Happy", "color": "#FFD700"},
            "target_mood": {"id": 3, "name": "Sad", "color": "#4169E1"},
            "timestamp": "2025-03-01T09:30:15.123456"
        }"##;
        let transition: Transition = serde_json::from_str(json).unwrap();
        assert_eq!(transition.id, 42);
        assert_eq!(transition.timestamp.offset(), time::UtcOffset::UTC);
        assert_eq!(transition.timestamp.hour(), 9);
    }

    #[test]
    fn transition_accepts_rfc3339_timestamps() {
        let parsed = timestamp::parse("2025-03-01T09:30:15+02:00").unwrap();
        assert_eq!(parsed.unix_timestamp(), 1_740_814_215);
    }

    #[test]
    fn mood_update_skips_unset_fields() {
        let update = MoodUpdate::new().with_color("#000000");
        let json = serde_json::to_value(&update).unwrap();
        assert_eq!(json, serde_json::json!({"color": "#000000"}));
    }

    #[test]
    fn secrets_are_not_debug_printed() {
        let user = NewUser {
            username: "alice".to_string(),
            email: "alice@example.com".to_string(),
            password: "hunter2".to_string(),
        };
        assert!(!format!("{user:?}").contains("hunter2"));
    }
}
