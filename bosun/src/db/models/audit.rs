//! Database models for the append-only audit log.

use crate::types::{UserId, VesselId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    Create,
    Update,
    SoftDelete,
    Restore,
    Purge,
    Close,
    Reopen,
    Transfer,
    Login,
}

#[derive(Debug, Clone)]
pub struct AuditEntryCreateDBRequest {
    pub vessel_id: Option<VesselId>,
    pub user_id: UserId,
    pub entity_type: String,
    pub entity_id: String,
    pub action: AuditAction,
    /// Pre-serialized JSON detail payload
    pub detail: Option<String>,
}

#[derive(Debug, Clone)]
pub struct AuditEntryDBResponse {
    pub id: Uuid,
    pub vessel_id: Option<VesselId>,
    pub user_id: UserId,
    pub entity_type: String,
    pub entity_id: String,
    pub action: AuditAction,
    pub detail: Option<String>,
    pub created_at: DateTime<Utc>,
}
