use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::{fmt, str::FromStr};
use ts_rs::TS;
use utoipa::ToSchema;

// --- Roles ---

/// Role
///
/// The closed set of officer roles. Stored as kebab-case text in `officers.role`.
/// Only `Admin` has cross-station visibility; the other roles are scoped to their thana.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS, ToSchema)]
#[serde(rename_all = "kebab-case")]
#[ts(export)]
pub enum Role {
    Admin,
    StationAdmin,
    Viewer,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::StationAdmin => "station-admin",
            Role::Viewer => "viewer",
        }
    }

    /// Full visibility across every station.
    pub fn is_administrative(&self) -> bool {
        matches!(self, Role::Admin)
    }

    /// May register property, append status entries and manage storage metadata.
    pub fn can_write(&self) -> bool {
        matches!(self, Role::Admin | Role::StationAdmin)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownRole(pub String);

impl FromStr for Role {
    type Err = UnknownRole;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "admin" => Ok(Role::Admin),
            "station-admin" => Ok(Role::StationAdmin),
            "viewer" => Ok(Role::Viewer),
            other => Err(UnknownRole(other.to_string())),
        }
    }
}

// --- Registry Rows ---

/// Officer
///
/// A row of the officer registry (`officers`), keyed by email. This is the source of truth
/// for role and station on every gated request.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default, PartialEq)]
#[ts(export)]
pub struct Officer {
    pub email: String,
    pub name: String,
    // Kebab-case role text; parsed into `Role` by the verifier.
    pub role: String,
    // Thana name this officer belongs to.
    pub station: String,
}

/// Station
///
/// Police station (thana) metadata. `name` is the key every scoped row refers to.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default, PartialEq)]
#[ts(export)]
pub struct Station {
    pub name: String,
    pub district: Option<String>,
    pub address: Option<String>,
    pub phone: Option<String>,
}

/// Rack
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default, PartialEq)]
#[ts(export)]
pub struct Rack {
    pub id: i64,
    pub station: String,
    pub label: String,
}

/// StorageBox
///
/// A box on a rack. The station is inherited from the rack.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default, PartialEq)]
#[ts(export)]
pub struct StorageBox {
    pub id: i64,
    pub rack_id: i64,
    pub label: String,
}

/// PropertyRecord
///
/// A seized-property case file (`properties`). Created as an empty slot when its QR label is
/// generated (`qr_id` only) and completed at submission, when `property_id` is assigned.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default, PartialEq)]
#[ts(export)]
pub struct PropertyRecord {
    // Full landing URL printed on the label.
    pub qr_id: String,
    // Durable identifier; `None` until the submission form is completed.
    pub property_id: Option<String>,
    pub station: String,
    pub fir_number: Option<String>,
    pub offence_category: Option<String>,
    pub investigating_officer: Option<String>,
    pub description: Option<String>,
    #[ts(type = "string | null")]
    pub seized_at: Option<DateTime<Utc>>,
    pub rack_id: Option<i64>,
    pub box_id: Option<i64>,
    // Object keys of uploaded photographs.
    pub photo_keys: Vec<String>,
    pub current_status: Option<String>,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    #[ts(type = "string | null")]
    pub submitted_at: Option<DateTime<Utc>>,
}

impl PropertyRecord {
    /// A record is complete, and resolvable from its QR label, once it holds a non-empty id.
    pub fn completed_id(&self) -> Option<&str> {
        self.property_id.as_deref().filter(|id| !id.is_empty())
    }
}

/// StatusLogEntry
///
/// One custody/status transition. The log is append-only.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default, PartialEq)]
#[ts(export)]
pub struct StatusLogEntry {
    pub id: i64,
    pub property_id: String,
    pub status: String,
    pub remarks: Option<String>,
    // Acting officer.
    pub officer_email: String,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
}

/// CustodyStatus
///
/// Accepted values for a status transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS, ToSchema)]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum CustodyStatus {
    Deposited,
    SentToCourt,
    SentToFsl,
    ReturnedToOwner,
    ReleasedOnBail,
    Disposed,
    Transferred,
    Other,
}

impl CustodyStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CustodyStatus::Deposited => "deposited",
            CustodyStatus::SentToCourt => "sent_to_court",
            CustodyStatus::SentToFsl => "sent_to_fsl",
            CustodyStatus::ReturnedToOwner => "returned_to_owner",
            CustodyStatus::ReleasedOnBail => "released_on_bail",
            CustodyStatus::Disposed => "disposed",
            CustodyStatus::Transferred => "transferred",
            CustodyStatus::Other => "other",
        }
    }
}

// --- Request Payloads ---

/// SignInRequest
///
/// The password is only forwarded to the identity provider, never stored or logged.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct SignInRequest {
    pub email: String,
    pub password: String,
}

/// CreateOfficerRequest
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct CreateOfficerRequest {
    pub email: String,
    pub name: String,
    pub role: Role,
    pub station: String,
}

/// UpdateOfficerRequest
///
/// Partial update; absent fields keep their current value.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct UpdateOfficerRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub station: Option<String>,
}

/// UpdateStationRequest
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct UpdateStationRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub district: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
}

/// CreateLabelRequest
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct CreateLabelRequest {
    pub station: String,
    pub count: u32,
}

/// QrLabel
///
/// A printable label; `url` is what gets encoded in the QR code and becomes the row's `qr_id`.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, PartialEq)]
#[ts(export)]
pub struct QrLabel {
    pub url: String,
    pub station: String,
}

/// SubmitPropertyRequest
///
/// Completes the pre-generated row addressed by `qr_id`.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct SubmitPropertyRequest {
    pub qr_id: String,
    pub fir_number: Option<String>,
    pub offence_category: Option<String>,
    pub investigating_officer: Option<String>,
    pub description: Option<String>,
    #[ts(type = "string | null")]
    pub seized_at: Option<DateTime<Utc>>,
    pub rack_id: Option<i64>,
    pub box_id: Option<i64>,
}

/// AppendStatusRequest
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct AppendStatusRequest {
    pub status: CustodyStatus,
    pub remarks: Option<String>,
}

/// NewStatusEntry
///
/// Insert payload for the status log; the repository assigns `id` and `created_at`.
#[derive(Debug, Clone)]
pub struct NewStatusEntry {
    pub property_id: String,
    pub status: String,
    pub remarks: Option<String>,
    pub officer_email: String,
}

/// CreateRackRequest
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct CreateRackRequest {
    pub label: String,
}

/// CreateBoxRequest
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct CreateBoxRequest {
    pub label: String,
}

/// PhotoUploadRequest
#[derive(Debug, Clone, Deserialize, Serialize, ToSchema, TS, Default)]
#[ts(export)]
pub struct PhotoUploadRequest {
    #[schema(example = "seized_phone.jpg")]
    pub filename: String,
    #[schema(example = "image/jpeg")]
    pub file_type: String,
}

/// PhotoUploadResponse
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, TS, Default)]
#[ts(export)]
pub struct PhotoUploadResponse {
    pub upload_url: String,
    pub resource_key: String,
}

// --- Output Schemas ---

/// DashboardStats
///
/// Counters for the landing dashboards. Scoped to the caller's station unless admin.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default, PartialEq)]
#[ts(export)]
pub struct DashboardStats {
    pub total_properties: i64,
    // QR labels printed but not yet submitted.
    pub pending_labels: i64,
    pub status_entries: i64,
}
