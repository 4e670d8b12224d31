//! API request/response models for crew positions.

use crate::db::models::crew::PositionDBResponse;
use crate::types::{PositionId, VesselId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PositionCreate {
    pub name: String,
    #[serde(default = "default_parts")]
    pub default_parts: i64,
}

fn default_parts() -> i64 {
    1
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct PositionUpdate {
    pub name: Option<String>,
    pub default_parts: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PositionResponse {
    #[schema(value_type = String, format = "uuid")]
    pub id: PositionId,
    #[schema(value_type = String, format = "uuid")]
    pub vessel_id: VesselId,
    pub name: String,
    pub default_parts: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<PositionDBResponse> for PositionResponse {
    fn from(db: PositionDBResponse) -> Self {
        Self {
            id: db.id,
            vessel_id: db.vessel_id,
            name: db.name,
            default_parts: db.default_parts,
            created_at: db.created_at,
            updated_at: db.updated_at,
        }
    }
}
