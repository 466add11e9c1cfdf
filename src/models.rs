//! Server-owned records passed through the client.
//!
//! Each record wraps the JSON object the server sent, untouched. Getters
//! read the fields callers care about and tolerate whatever type the server
//! chose for them, so a record never fails to decode because of one field.

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Body of `/auth/register` and `/auth/login`.
#[derive(Debug, Clone, Serialize)]
pub struct Credentials<'a> {
    pub email: &'a str,
    pub password: &'a str,
}

fn str_field<'a>(fields: &'a Map<String, Value>, key: &str) -> Option<&'a str> {
    fields.get(key).and_then(Value::as_str)
}

/// Strings as sent, numbers and booleans rendered as text.
fn text_field(fields: &Map<String, Value>, key: &str) -> Option<String> {
    match fields.get(key)? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Response of `/auth/register` and `/auth/login`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AuthResponse(Map<String, Value>);

impl AuthResponse {
    /// Any field, as sent.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Session token, when the server issued one.
    pub fn token(&self) -> Option<&str> {
        str_field(&self.0, "token").filter(|t| !t.is_empty())
    }

    pub fn user(&self) -> Option<UserProfile> {
        match self.0.get("user") {
            Some(Value::Object(user)) => Some(UserProfile(user.clone())),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserProfile(Map<String, Value>);

impl UserProfile {
    /// Any field, as sent.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// `_id`
    pub fn id(&self) -> Option<String> {
        text_field(&self.0, "_id")
    }

    pub fn email(&self) -> Option<&str> {
        str_field(&self.0, "email")
    }

    pub fn name(&self) -> Option<&str> {
        str_field(&self.0, "name")
    }

    pub fn phone_number(&self) -> Option<String> {
        text_field(&self.0, "phoneNumber")
    }

    /// `null` until onboarding picks a role.
    pub fn role(&self) -> Option<&str> {
        str_field(&self.0, "role")
    }

    /// Onboarding is finished once a role has been chosen.
    pub fn needs_onboarding(&self) -> bool {
        self.role().map_or(true, str::is_empty)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Recording(Map<String, Value>);

impl Recording {
    /// Any field, as sent.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn id(&self) -> Option<String> {
        text_field(&self.0, "_id")
    }

    pub fn title(&self) -> Option<&str> {
        str_field(&self.0, "title")
    }

    /// `mm:ss`
    pub fn duration(&self) -> Option<&str> {
        str_field(&self.0, "duration")
    }

    pub fn original_audio_url(&self) -> Option<&str> {
        str_field(&self.0, "originalAudioUrl")
    }

    /// `createdAt` as RFC 3339 text or epoch milliseconds.
    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        match self.0.get("createdAt")? {
            Value::String(s) => DateTime::parse_from_rfc3339(s)
                .ok()
                .map(|t| t.with_timezone(&Utc)),
            Value::Number(n) => n
                .as_i64()
                .and_then(|ms| Utc.timestamp_millis_opt(ms).single()),
            _ => None,
        }
    }

    pub fn display_title(&self) -> &str {
        self.title()
            .filter(|t| !t.is_empty())
            .unwrap_or("Untitled Recording")
    }

    pub fn display_duration(&self) -> &str {
        self.duration().unwrap_or("0:00")
    }
}

/// Onboarding role choices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Creator,
    Podcaster,
    Gamer,
    Other,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Creator => "creator",
            Role::Podcaster => "podcaster",
            Role::Gamer => "gamer",
            Role::Other => "other",
        }
    }
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "creator" => Ok(Role::Creator),
            "podcaster" => Ok(Role::Podcaster),
            "gamer" => Ok(Role::Gamer),
            "other" => Ok(Role::Other),
            other => Err(format!("unknown role: {}", other)),
        }
    }
}

/// What the user mostly records. Serialized as the display id the backend stores.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ContentCategory {
    Marketing,
    YouTube,
    Education,
    #[serde(rename = "Social Media")]
    SocialMedia,
    Podcasts,
    #[serde(rename = "Personal Only")]
    PersonalOnly,
    Other,
}

impl ContentCategory {
    pub const ALL: [ContentCategory; 7] = [
        ContentCategory::Marketing,
        ContentCategory::YouTube,
        ContentCategory::Education,
        ContentCategory::SocialMedia,
        ContentCategory::Podcasts,
        ContentCategory::PersonalOnly,
        ContentCategory::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ContentCategory::Marketing => "Marketing",
            ContentCategory::YouTube => "YouTube",
            ContentCategory::Education => "Education",
            ContentCategory::SocialMedia => "Social Media",
            ContentCategory::Podcasts => "Podcasts",
            ContentCategory::PersonalOnly => "Personal Only",
            ContentCategory::Other => "Other",
        }
    }
}

impl std::str::FromStr for ContentCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|c| c.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown content type: {}", s))
    }
}
