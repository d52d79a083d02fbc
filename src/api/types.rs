//! Ticketdesk API request and response types.
//!
//! Response types keep any field they do not model in `extra`, so nothing the
//! server sends is lost when a value is decoded and printed again.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Tokens returned by `POST /token/`.
#[derive(Clone, Serialize, Deserialize, PartialEq)]
pub struct TokenPair {
    /// Short-lived bearer token.
    pub access: String,
    /// Long-lived refresh token.
    pub refresh: String,
    /// Anything else the token endpoint returned.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl fmt::Debug for TokenPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenPair")
            .field("access", &"<redacted>")
            .field("refresh", &"<redacted>")
            .field("extra", &self.extra)
            .finish()
    }
}

/// Ticket workflow state.
///
/// Values the client does not know are kept verbatim in `Other`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum TicketStatus {
    Open,
    InProgress,
    Resolved,
    Closed,
    Other(String),
}

impl TicketStatus {
    /// The value the API uses on the wire and in filters.
    pub fn as_api_str(&self) -> &str {
        match self {
            TicketStatus::Open => "abierto",
            TicketStatus::InProgress => "en_progreso",
            TicketStatus::Resolved => "resuelto",
            TicketStatus::Closed => "cerrado",
            TicketStatus::Other(value) => value,
        }
    }

    /// Neither resolved nor closed.
    pub fn is_open(&self) -> bool {
        matches!(self, TicketStatus::Open | TicketStatus::InProgress)
    }
}

impl From<String> for TicketStatus {
    fn from(value: String) -> Self {
        match value.as_str() {
            "abierto" => TicketStatus::Open,
            "en_progreso" => TicketStatus::InProgress,
            "resuelto" => TicketStatus::Resolved,
            "cerrado" => TicketStatus::Closed,
            _ => TicketStatus::Other(value),
        }
    }
}

impl From<TicketStatus> for String {
    fn from(status: TicketStatus) -> Self {
        match status {
            TicketStatus::Other(value) => value,
            known => known.as_api_str().to_string(),
        }
    }
}

impl fmt::Display for TicketStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TicketStatus::Open => write!(f, "Open"),
            TicketStatus::InProgress => write!(f, "In progress"),
            TicketStatus::Resolved => write!(f, "Resolved"),
            TicketStatus::Closed => write!(f, "Closed"),
            TicketStatus::Other(value) => write!(f, "{}", value),
        }
    }
}

/// Ticket priority. Unknown values are kept in `Other`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Priority {
    Critical,
    High,
    Medium,
    Low,
    Other(String),
}

impl Priority {
    /// The value the API uses on the wire and in filters.
    pub fn as_api_str(&self) -> &str {
        match self {
            Priority::Critical => "critica",
            Priority::High => "alta",
            Priority::Medium => "media",
            Priority::Low => "baja",
            Priority::Other(value) => value,
        }
    }
}

impl From<String> for Priority {
    fn from(value: String) -> Self {
        match value.as_str() {
            "critica" => Priority::Critical,
            "alta" => Priority::High,
            "media" => Priority::Medium,
            "baja" => Priority::Low,
            _ => Priority::Other(value),
        }
    }
}

impl From<Priority> for String {
    fn from(priority: Priority) -> Self {
        match priority {
            Priority::Other(value) => value,
            known => known.as_api_str().to_string(),
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Priority::Critical => write!(f, "Critical"),
            Priority::High => write!(f, "High"),
            Priority::Medium => write!(f, "Medium"),
            Priority::Low => write!(f, "Low"),
            Priority::Other(value) => write!(f, "{}", value),
        }
    }
}

/// A user reference: either a bare id or an embedded user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum UserRef {
    Id(u64),
    User(User),
}

impl UserRef {
    /// The referenced user's id.
    pub fn id(&self) -> u64 {
        match self {
            UserRef::Id(id) => *id,
            UserRef::User(user) => user.id,
        }
    }
}

/// A user account. Returned by `GET /users/`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: u64,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A support ticket.
///
/// Only `id` is required; a server that names its fields differently still
/// decodes, with those fields kept in `extra`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ticket {
    pub id: u64,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<TicketStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<Priority>,
    #[serde(default)]
    pub created_by: Option<UserRef>,
    #[serde(default)]
    pub assigned_to: Option<UserRef>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
    #[serde(default)]
    pub closed_at: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Ticket {
    /// Whether the ticket is closed.
    pub fn is_closed(&self) -> bool {
        self.status == Some(TicketStatus::Closed)
    }
}

/// A comment on a ticket.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comment {
    pub id: u64,
    #[serde(default)]
    pub ticket: Option<u64>,
    #[serde(default)]
    pub author: Option<UserRef>,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub attachment: Option<String>,
    #[serde(default)]
    pub is_internal: bool,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Extended profile of a user. Returned by `GET /profiles/me/`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    #[serde(default)]
    pub user: Option<UserRef>,
    #[serde(default)]
    pub department: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub avatar: Option<String>,
    #[serde(default)]
    pub is_support_staff: bool,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A list response, paginated or not.
///
/// The server answers list endpoints with a bare array unless pagination is
/// enabled, in which case it wraps the page in `{count, next, previous, results}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Listing<T> {
    Page {
        count: u64,
        #[serde(default)]
        next: Option<String>,
        #[serde(default)]
        previous: Option<String>,
        results: Vec<T>,
    },
    Plain(Vec<T>),
}

impl<T> Listing<T> {
    /// The items of this page.
    pub fn items(&self) -> &[T] {
        match self {
            Listing::Page { results, .. } => results,
            Listing::Plain(items) => items,
        }
    }

    /// Consume the listing and return its items.
    pub fn into_items(self) -> Vec<T> {
        match self {
            Listing::Page { results, .. } => results,
            Listing::Plain(items) => items,
        }
    }

    /// Total number of matching items on the server, when known.
    pub fn total(&self) -> usize {
        match self {
            Listing::Page { count, .. } => *count as usize,
            Listing::Plain(items) => items.len(),
        }
    }

    /// Whether more pages follow.
    pub fn has_next(&self) -> bool {
        matches!(self, Listing::Page { next: Some(_), .. })
    }
}

/// Payload for `POST /tickets/`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewTicket {
    pub title: String,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<Priority>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assigned_to: Option<u64>,
}

impl NewTicket {
    /// A new ticket with the server's default priority and no assignee.
    pub fn new(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            priority: None,
            assigned_to: None,
        }
    }
}

/// Partial update for `PATCH /tickets/{id}/`. Unset fields are not sent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TicketUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<TicketStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<Priority>,
    /// `Some(None)` unassigns the ticket.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "double_option"
    )]
    pub assigned_to: Option<Option<u64>>,
}

impl TicketUpdate {
    /// Whether the update would send no fields.
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }
}

/// Payload for `POST /comments/`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewComment {
    pub ticket: u64,
    pub content: String,
    #[serde(default)]
    pub is_internal: bool,
}

impl NewComment {
    /// A public comment on a ticket.
    pub fn new(ticket: u64, content: impl Into<String>) -> Self {
        Self {
            ticket,
            content: content.into(),
            is_internal: false,
        }
    }
}

/// Query filters for `GET /tickets/`.
///
/// Keys map directly to query parameters; setting a key twice keeps the last
/// value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TicketFilters {
    params: BTreeMap<String, String>,
}

impl TicketFilters {
    /// No filters.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set an arbitrary query parameter.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }

    pub fn status(self, status: impl Into<String>) -> Self {
        self.with("status", status)
    }

    pub fn priority(self, priority: impl Into<String>) -> Self {
        self.with("priority", priority)
    }

    pub fn created_by(self, user_id: u64) -> Self {
        self.with("created_by", user_id.to_string())
    }

    pub fn assigned_to(self, user_id: u64) -> Self {
        self.with("assigned_to", user_id.to_string())
    }

    /// Free-text search over title, description, and id.
    pub fn search(self, text: impl Into<String>) -> Self {
        self.with("search", text)
    }

    /// Sort field, prefixed with `-` for descending.
    pub fn ordering(self, field: impl Into<String>) -> Self {
        self.with("ordering", field)
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    /// The filters as query pairs, sorted by key.
    pub fn to_query(&self) -> Vec<(String, String)> {
        self.params
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for TicketFilters {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            params: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

/// Serde helpers telling "absent" apart from "explicit null".
mod double_option {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S, T>(value: &Option<Option<T>>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
        T: Serialize,
    {
        match value {
            Some(inner) => inner.serialize(serializer),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
    where
        D: Deserializer<'de>,
        T: Deserialize<'de>,
    {
        Option::<T>::deserialize(deserializer).map(Some)
    }
}
