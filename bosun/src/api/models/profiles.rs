//! API request/response models for distribution profiles and items.

use crate::db::models::profiles::{
    ItemDBResponse, ItemOperation, ItemSource, ProfileDBResponse, ValueKind,
};
use crate::types::{ProfileId, VesselId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ProfileCreate {
    pub name: String,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct ProfileUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ProfileResponse {
    #[schema(value_type = String, format = "uuid")]
    pub id: ProfileId,
    #[schema(value_type = String, format = "uuid")]
    pub vessel_id: VesselId,
    pub name: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<ProfileDBResponse> for ProfileResponse {
    fn from(db: ProfileDBResponse) -> Self {
        Self {
            id: db.id,
            vessel_id: db.vessel_id,
            name: db.name,
            description: db.description,
            created_at: db.created_at,
            updated_at: db.updated_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ItemCreate {
    pub order_index: i64,
    pub label: String,
    pub operation: ItemOperation,
    pub source: ItemSource,
    pub ref_order_index: Option<i64>,
    pub value_kind: ValueKind,
    pub value: i64,
    #[serde(default)]
    pub is_payout: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct ItemUpdate {
    pub label: Option<String>,
    pub operation: Option<ItemOperation>,
    pub source: Option<ItemSource>,
    pub ref_order_index: Option<Option<i64>>,
    pub value_kind: Option<ValueKind>,
    pub value: Option<i64>,
    pub is_payout: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ItemResponse {
    #[schema(value_type = String, format = "uuid")]
    pub id: Uuid,
    #[schema(value_type = String, format = "uuid")]
    pub profile_id: ProfileId,
    pub order_index: i64,
    pub label: String,
    pub operation: ItemOperation,
    pub source: ItemSource,
    pub ref_order_index: Option<i64>,
    pub value_kind: ValueKind,
    pub value: i64,
    pub is_payout: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<ItemDBResponse> for ItemResponse {
    fn from(db: ItemDBResponse) -> Self {
        Self {
            id: db.id,
            profile_id: db.profile_id,
            order_index: db.order_index,
            label: db.label,
            operation: db.operation,
            source: db.source,
            ref_order_index: db.ref_order_index,
            value_kind: db.value_kind,
            value: db.value,
            is_payout: db.is_payout,
            created_at: db.created_at,
            updated_at: db.updated_at,
        }
    }
}
