use serde::{Deserialize, Serialize};
use std::fmt;

/// An authenticated user, as returned by the login endpoint
#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq)]
pub struct User {
    pub username: String,
}

impl User {
    #[cfg(test)]
    pub fn new(username: impl Into<String>) -> Self {
        Self {
            username: username.into(),
        }
    }
}

/// Server-assigned identifier of a history entry.
///
/// The backend is free to use numeric or string keys; both are kept verbatim.
#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq, Hash)]
#[serde(untagged)]
pub enum EntryId {
    Number(i64),
    Text(String),
}

impl fmt::Display for EntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntryId::Number(n) => write!(f, "{}", n),
            EntryId::Text(s) => f.write_str(s),
        }
    }
}

impl From<i64> for EntryId {
    fn from(n: i64) -> Self {
        EntryId::Number(n)
    }
}

impl From<&str> for EntryId {
    fn from(s: &str) -> Self {
        EntryId::Text(s.to_string())
    }
}

/// A persisted BTU calculation
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HistoryEntry {
    pub id: EntryId,

    /// Human-readable summary of the calculation
    pub action: String,

    /// Optional free-text observation
    #[serde(default)]
    pub obs: Option<String>,

    /// ISO-8601 timestamp of creation or last edit
    #[serde(default)]
    pub timestamp: String,

    /// Soft-deleted entries stay in the list but are not shown
    #[serde(default)]
    pub hidden: bool,
}

impl HistoryEntry {
    /// Build a visible entry stamped with the current time
    pub fn new(id: EntryId, action: String, obs: Option<String>) -> Self {
        Self {
            id,
            action,
            obs,
            timestamp: now_timestamp(),
            hidden: false,
        }
    }

    /// Timestamp rendered in local time, or verbatim if it does not parse
    pub fn local_time(&self) -> String {
        match chrono::DateTime::parse_from_rfc3339(&self.timestamp) {
            Ok(ts) => ts
                .with_timezone(&chrono::Local)
                .format("%Y-%m-%d %H:%M:%S")
                .to_string(),
            Err(_) => self.timestamp.clone(),
        }
    }

    /// Observation, if it carries any text
    pub fn observation(&self) -> Option<&str> {
        self.obs.as_deref().filter(|o| !o.is_empty())
    }
}

/// Current UTC time as RFC 3339
pub fn now_timestamp() -> String {
    chrono::Utc::now().to_rfc3339()
}

/// Body of POST /history and PUT /history/:id
#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq)]
pub struct EntryPayload {
    pub action: String,
    pub obs: String,
}

impl EntryPayload {
    pub fn new(action: impl Into<String>, obs: Option<&str>) -> Self {
        Self {
            action: action.into(),
            obs: obs.unwrap_or_default().to_string(),
        }
    }
}

/// Body of POST /login and POST /register
#[derive(Debug, Clone, Serialize)]
pub struct Credentials<'a> {
    pub username: &'a str,
    pub password: &'a str,
}

/// Successful GET /history
#[derive(Debug, Deserialize)]
pub struct HistoryResponse {
    #[serde(default)]
    pub history: Vec<HistoryEntry>,
}

/// Successful POST /history
#[derive(Debug, Deserialize)]
pub struct CreatedResponse {
    pub id: EntryId,
}

/// Successful POST /login: either `{ user: {...} }` or the user object itself
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum LoginResponse {
    Wrapped { user: User },
    Bare(User),
}

impl LoginResponse {
    pub fn into_user(self) -> User {
        match self {
            LoginResponse::Wrapped { user } => user,
            LoginResponse::Bare(user) => user,
        }
    }
}

/// Failure body shared by every endpoint
#[derive(Debug, Default, Deserialize)]
pub struct ErrorBody {
    #[serde(default)]
    pub message: Option<String>,
}
