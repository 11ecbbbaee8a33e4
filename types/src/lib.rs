//! Core domain types for Taskboard.
//!
//! This crate contains pure domain types with no IO, no async, and minimal dependencies.
//! Everything here can be used from any layer of the application: the store backends,
//! the proxy client, and the HTTP server all speak in these types.

// Pedantic lint configuration - these are intentional design choices
#![allow(clippy::missing_errors_doc)] // Result-returning functions are self-explanatory

mod error;
pub mod ordering;

pub use error::{Error, Result};
pub use ordering::{OrderingKey, plan_reorder, sort_records, status_rank};

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// Unique identifier for a stored record.
pub type ItemId = i64;

// ============================================================================
// NonEmpty String Types
// ============================================================================

/// A string guaranteed to be non-empty after trimming. Holds the trimmed value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NonEmptyString(String);

impl NonEmptyString {
    /// `field` names the input in the validation message.
    pub fn new(field: &str, value: impl AsRef<str>) -> Result<Self> {
        let trimmed = value.as_ref().trim();
        if trimmed.is_empty() {
            Err(Error::Validation(format!("{field} must not be empty")))
        } else {
            Ok(Self(trimmed.to_string()))
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl std::ops::Deref for NonEmptyString {
    type Target = str;

    fn deref(&self) -> &Self::Target {
        self.as_str()
    }
}

impl AsRef<str> for NonEmptyString {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

/// Validated input for `create`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewItem {
    pub title: NonEmptyString,
    pub description: NonEmptyString,
}

impl NewItem {
    /// Both fields are required; blank after trimming is a validation error.
    pub fn new(title: &str, description: &str) -> Result<Self> {
        if title.trim().is_empty() || description.trim().is_empty() {
            return Err(Error::Validation(
                "Title and description are required".to_string(),
            ));
        }
        Ok(Self {
            title: NonEmptyString::new("title", title)?,
            description: NonEmptyString::new("description", description)?,
        })
    }
}

// ============================================================================
// Status
// ============================================================================

/// Workflow status of a record.
///
/// Unknown strings are kept verbatim in [`Status::Other`] and sort after every
/// known status.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub enum Status {
    #[default]
    Todo,
    Progress,
    Completed,
    Other(String),
}

impl Status {
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        match raw {
            "todo" => Status::Todo,
            "progress" => Status::Progress,
            "completed" => Status::Completed,
            other => Status::Other(other.to_string()),
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Status::Todo => "todo",
            Status::Progress => "progress",
            Status::Completed => "completed",
            Status::Other(raw) => raw,
        }
    }

    /// The `resolved` flag a direct status-set derives.
    #[must_use]
    pub fn implies_resolved(&self) -> bool {
        matches!(self, Status::Completed)
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for Status {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Status {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(Status::parse(&raw))
    }
}

// ============================================================================
// Record
// ============================================================================

/// One tracked item.
///
/// `resolved` and `status` are stored independently: resolve/unresolve set both,
/// a direct status-set derives `resolved`, and nothing reconciles them afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    pub id: ItemId,
    pub title: String,
    pub description: String,
    pub status: Status,
    pub resolved: bool,
    #[serde(rename = "order_index")]
    pub position: i64,
    #[serde(with = "rfc3339_millis")]
    pub created_at: DateTime<Utc>,
}

/// Current time truncated to millisecond precision, the resolution records are stored at.
#[must_use]
pub fn now_millis() -> DateTime<Utc> {
    DateTime::from_timestamp_millis(Utc::now().timestamp_millis()).unwrap_or_default()
}

mod rfc3339_millis {
    use super::{DateTime, SecondsFormat, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&value.to_rfc3339_opts(SecondsFormat::Millis, true))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(deserializer)?;
        DateTime::parse_from_rfc3339(&raw)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(serde::de::Error::custom)
    }
}

// ============================================================================
// Deployment mode
// ============================================================================

/// Process-wide capability set, fixed at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Mode {
    Combined,
    ApiOnly,
    UiProxy,
}

impl Mode {
    pub fn parse(raw: &str) -> Result<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "combined" => Ok(Mode::Combined),
            "api-only" | "api_only" | "api" => Ok(Mode::ApiOnly),
            "ui-proxy" | "ui_proxy" | "ui" => Ok(Mode::UiProxy),
            other => Err(Error::Configuration(format!(
                "invalid mode {other:?} (expected combined, api-only or ui-proxy)"
            ))),
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Mode::Combined => "combined",
            Mode::ApiOnly => "api-only",
            Mode::UiProxy => "ui-proxy",
        }
    }

    /// Whether item operations run against a local store.
    #[must_use]
    pub const fn serves_local_data(self) -> bool {
        matches!(self, Mode::Combined | Mode::ApiOnly)
    }

    #[must_use]
    pub const fn serves_ui(self) -> bool {
        matches!(self, Mode::Combined | Mode::UiProxy)
    }

    #[must_use]
    pub fn all() -> &'static [Mode] {
        &[Mode::Combined, Mode::ApiOnly, Mode::UiProxy]
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Wire types
// ============================================================================

/// Body of `POST /api/items`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreateRequest {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
}

/// Body of `POST /api/items/:id/status`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusRequest {
    pub status: String,
}

/// Body of `POST /api/items/:id/position`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PositionRequest {
    pub position: i64,
}

/// Body of `POST /api/items/reorder`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReorderRequest {
    pub dragged_id: ItemId,
    pub target_id: ItemId,
}

/// Success envelope returned by every mutating operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ack {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<ItemId>,
}

impl Ack {
    #[must_use]
    pub const fn ok() -> Self {
        Self {
            success: true,
            id: None,
        }
    }

    #[must_use]
    pub const fn created(id: ItemId) -> Self {
        Self {
            success: true,
            id: Some(id),
        }
    }
}

/// Failure envelope: `{success: false, error}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub success: bool,
    pub error: String,
}

impl ErrorBody {
    #[must_use]
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: error.into(),
        }
    }
}

/// `GET /health` payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthReport {
    pub status: String,
    pub timestamp: String,
    pub hostname: String,
    pub version: String,
    pub mode: String,
    pub database_type: String,
    pub api_base_url: String,
}

/// Placeholder used in health output for fields that do not apply to the mode.
pub const NOT_APPLICABLE: &str = "N/A";

/// Format a timestamp the way every wire payload does.
#[must_use]
pub fn format_timestamp(value: DateTime<Utc>) -> String {
    value.to_rfc3339_opts(SecondsFormat::Millis, true)
}
