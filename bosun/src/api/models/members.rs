//! API request/response models for vessel membership.

use crate::db::models::crew::MemberDBResponse;
use crate::types::{PositionId, UserId, VesselId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Role of a user on a particular vessel.
///
/// Every permission check resolves the caller's role for the vessel in the
/// request path and looks it up in the static grant table
/// ([`crate::auth::permissions`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum VesselRole {
    Owner,
    Manager,
    Accountant,
    Skipper,
    Crew,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct MemberCreate {
    #[schema(value_type = String, format = "uuid")]
    pub user_id: UserId,
    pub role: VesselRole,
    #[schema(value_type = Option<String>, format = "uuid")]
    pub position_id: Option<PositionId>,
    /// Share units used when dividing a crew pool
    #[serde(default = "default_parts")]
    pub parts: i64,
}

fn default_parts() -> i64 {
    1
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct MemberUpdate {
    pub role: Option<VesselRole>,
    #[schema(value_type = Option<Option<String>>)]
    pub position_id: Option<Option<PositionId>>,
    pub parts: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct MemberResponse {
    #[schema(value_type = String, format = "uuid")]
    pub vessel_id: VesselId,
    #[schema(value_type = String, format = "uuid")]
    pub user_id: UserId,
    pub role: VesselRole,
    #[schema(value_type = Option<String>, format = "uuid")]
    pub position_id: Option<PositionId>,
    pub parts: i64,
    pub user_name: String,
    pub user_email: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<MemberDBResponse> for MemberResponse {
    fn from(db: MemberDBResponse) -> Self {
        Self {
            vessel_id: db.vessel_id,
            user_id: db.user_id,
            role: db.role,
            position_id: db.position_id,
            parts: db.parts,
            user_name: db.user_name,
            user_email: db.user_email,
            created_at: db.created_at,
            updated_at: db.updated_at,
        }
    }
}
