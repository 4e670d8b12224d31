//! API request/response models for transaction categories.

use crate::db::models::categories::{CategoryDBResponse, CategoryKind};
use crate::types::{CategoryId, VesselId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CategoryCreate {
    pub name: String,
    pub kind: CategoryKind,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct CategoryUpdate {
    pub name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CategoryResponse {
    #[schema(value_type = String, format = "uuid")]
    pub id: CategoryId,
    #[schema(value_type = String, format = "uuid")]
    pub vessel_id: VesselId,
    pub name: String,
    pub kind: CategoryKind,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<CategoryDBResponse> for CategoryResponse {
    fn from(db: CategoryDBResponse) -> Self {
        Self {
            id: db.id,
            vessel_id: db.vessel_id,
            name: db.name,
            kind: db.kind,
            created_at: db.created_at,
            updated_at: db.updated_at,
        }
    }
}
