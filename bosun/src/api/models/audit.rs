//! API models for the audit log.

use super::pagination::Pagination;
use crate::db::models::audit::{AuditAction, AuditEntryDBResponse};
use crate::types::{UserId, VesselId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AuditEntryResponse {
    #[schema(value_type = String, format = "uuid")]
    pub id: Uuid,
    #[schema(value_type = Option<String>, format = "uuid")]
    pub vessel_id: Option<VesselId>,
    #[schema(value_type = String, format = "uuid")]
    pub user_id: UserId,
    pub entity_type: String,
    pub entity_id: String,
    pub action: AuditAction,
    #[schema(value_type = Option<Object>)]
    pub detail: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
}

impl From<AuditEntryDBResponse> for AuditEntryResponse {
    fn from(db: AuditEntryDBResponse) -> Self {
        // Detail rows are written by this application, so parse failures only
        // happen on hand-edited data; degrade to a raw string in that case.
        let detail = db.detail.map(|raw| {
            serde_json::from_str(&raw).unwrap_or(serde_json::Value::String(raw))
        });
        Self {
            id: db.id,
            vessel_id: db.vessel_id,
            user_id: db.user_id,
            entity_type: db.entity_type,
            entity_id: db.entity_id,
            action: db.action,
            detail,
            created_at: db.created_at,
        }
    }
}

#[derive(Debug, Default, Deserialize, IntoParams, ToSchema)]
pub struct ListAuditQuery {
    #[serde(flatten)]
    #[param(inline)]
    pub pagination: Pagination,

    pub entity_type: Option<String>,
    pub action: Option<AuditAction>,
}
