//! Database request/response models for crew positions and vessel membership.

use crate::api::models::members::VesselRole;
use crate::types::{PositionId, UserId, VesselId};
use chrono::{DateTime, Utc};

#[derive(Debug, Clone)]
pub struct PositionCreateDBRequest {
    pub vessel_id: VesselId,
    pub name: String,
    pub default_parts: i64,
}

#[derive(Debug, Clone, Default)]
pub struct PositionUpdateDBRequest {
    pub name: Option<String>,
    pub default_parts: Option<i64>,
}

#[derive(Debug, Clone)]
pub struct PositionDBResponse {
    pub id: PositionId,
    pub vessel_id: VesselId,
    pub name: String,
    pub default_parts: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct MemberCreateDBRequest {
    pub vessel_id: VesselId,
    pub user_id: UserId,
    pub role: VesselRole,
    pub position_id: Option<PositionId>,
    pub parts: i64,
}

#[derive(Debug, Clone, Default)]
pub struct MemberUpdateDBRequest {
    pub role: Option<VesselRole>,
    pub position_id: Option<Option<PositionId>>,
    pub parts: Option<i64>,
}

/// Membership row joined with the user it links.
#[derive(Debug, Clone)]
pub struct MemberDBResponse {
    pub vessel_id: VesselId,
    pub user_id: UserId,
    pub role: VesselRole,
    pub position_id: Option<PositionId>,
    pub parts: i64,
    pub user_name: String,
    pub user_email: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
