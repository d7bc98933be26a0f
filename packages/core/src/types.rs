use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// One named phase of a project's fulfillment workflow.
///
/// Variant order is the canonical order: it drives both the progress
/// percentage and the cascade rule in `kitflow-tracker`. Older documents
/// used generic stage names; those are accepted as aliases on input and
/// written back under the canonical names.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum StageKey {
    #[serde(alias = "requirements")]
    ComponentsCollected,
    #[serde(alias = "design")]
    CircuitDesign,
    #[serde(alias = "development")]
    Programming,
    Testing,
    Shipping,
    Completed,
}

impl StageKey {
    /// Every stage in canonical order.
    pub const ALL: [StageKey; 6] = [
        StageKey::ComponentsCollected,
        StageKey::CircuitDesign,
        StageKey::Programming,
        StageKey::Testing,
        StageKey::Shipping,
        StageKey::Completed,
    ];

    /// Position of this stage in canonical order.
    pub fn index(&self) -> usize {
        Self::ALL.iter().position(|k| k == self).unwrap_or(0)
    }

    /// Stage name as shown to customers.
    pub fn label(&self) -> &'static str {
        match self {
            StageKey::ComponentsCollected => "Components Collected",
            StageKey::CircuitDesign => "Circuit Design",
            StageKey::Programming => "Programming",
            StageKey::Testing => "Testing",
            StageKey::Shipping => "Shipping",
            StageKey::Completed => "Completed",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            StageKey::ComponentsCollected => "components_collected",
            StageKey::CircuitDesign => "circuit_design",
            StageKey::Programming => "programming",
            StageKey::Testing => "testing",
            StageKey::Shipping => "shipping",
            StageKey::Completed => "completed",
        }
    }

    /// Parses a stage name, accepting both canonical and legacy names.
    pub fn parse(value: &str) -> Option<StageKey> {
        match value {
            "components_collected" | "requirements" => Some(StageKey::ComponentsCollected),
            "circuit_design" | "design" => Some(StageKey::CircuitDesign),
            "programming" | "development" => Some(StageKey::Programming),
            "testing" => Some(StageKey::Testing),
            "shipping" => Some(StageKey::Shipping),
            "completed" => Some(StageKey::Completed),
            _ => None,
        }
    }
}

impl fmt::Display for StageKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Status of a single stage.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum StageStatus {
    Pending,
    InProgress,
    Completed,
}

impl Default for StageStatus {
    fn default() -> Self {
        StageStatus::Pending
    }
}

impl fmt::Display for StageStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StageStatus::Pending => write!(f, "pending"),
            StageStatus::InProgress => write!(f, "in progress"),
            StageStatus::Completed => write!(f, "completed"),
        }
    }
}

/// Per-stage record: status, when it was reached, operator notes, and an
/// optional photo of the work (e.g. the assembled circuit).
///
/// An absent timestamp means the stage has not been reached yet.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Stage {
    #[serde(default)]
    pub status: StageStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default, rename = "imageUrl", skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

impl Stage {
    pub fn pending() -> Self {
        Stage {
            status: StageStatus::Pending,
            timestamp: None,
            notes: None,
            image_url: None,
        }
    }
}

/// A customer's project moving through the fulfillment workflow.
///
/// `stages` holds an entry for every `StageKey`; the map is ordered so
/// serialized documents list stages canonically.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TrackedProject {
    #[serde(rename = "projectId")]
    pub project_id: String,
    #[serde(rename = "userId")]
    pub user_id: String,
    #[serde(rename = "userEmail")]
    pub user_email: String,
    pub title: String,
    #[serde(rename = "currentStage")]
    pub current_stage: StageKey,
    pub stages: BTreeMap<StageKey, Stage>,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
    #[serde(rename = "updatedAt")]
    pub updated_at: DateTime<Utc>,
}

/// What kind of custom work a request asks for.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RequestKind {
    Project,
    Presentation,
}

impl fmt::Display for RequestKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RequestKind::Project => write!(f, "project"),
            RequestKind::Presentation => write!(f, "presentation"),
        }
    }
}

/// A customer-submitted, not-yet-approved ask for a custom project or
/// presentation. Terminal outcomes are approval (converted into a
/// `TrackedProject`) or decline; either way the request is deleted.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProjectRequest {
    pub id: String,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
    pub kind: RequestKind,
    pub name: String,
    pub email: String,

    // Project requests
    #[serde(rename = "projectTitle", skip_serializing_if = "Option::is_none")]
    pub project_title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub microcontroller: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub components: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub budget: Option<String>,

    // Presentation requests
    #[serde(skip_serializing_if = "Option::is_none")]
    pub topic: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audience: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub purpose: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub style: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instructions: Option<String>,
}

impl ProjectRequest {
    /// Human-readable subject line for this request: the project title
    /// for project requests, the topic for presentation requests.
    pub fn display_title(&self) -> &str {
        self.project_title
            .as_deref()
            .or(self.topic.as_deref())
            .unwrap_or("Untitled request")
    }
}

/// Input for submitting a new request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestCreateInput {
    pub kind: RequestKind,
    pub name: String,
    pub email: String,
    #[serde(rename = "projectTitle")]
    pub project_title: Option<String>,
    pub microcontroller: Option<String>,
    pub components: Option<String>,
    pub description: Option<String>,
    pub budget: Option<String>,
    pub topic: Option<String>,
    pub audience: Option<String>,
    pub purpose: Option<String>,
    pub style: Option<String>,
    pub instructions: Option<String>,
}

/// Authorization role stored on the user record.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Customer,
    Admin,
}

impl Default for Role {
    fn default() -> Self {
        Role::Customer
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Customer => write!(f, "customer"),
            Role::Admin => write!(f, "admin"),
        }
    }
}

/// A signed-in user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub email: String,
    pub name: String,
    #[serde(rename = "photoUrl")]
    pub photo_url: Option<String>,
    #[serde(default)]
    pub role: Role,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
    #[serde(rename = "updatedAt")]
    pub updated_at: DateTime<Utc>,
    #[serde(rename = "lastLoginAt")]
    pub last_login_at: Option<DateTime<Utc>>,
}

/// Profile fields a user may update themselves.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserProfileInput {
    pub name: Option<String>,
    #[serde(rename = "photoUrl")]
    pub photo_url: Option<String>,
}

/// A contact-form message. Never persisted; validated and relayed to the
/// shop inbox.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContactInput {
    pub name: String,
    pub email: String,
    pub subject: Option<String>,
    pub message: String,
}
