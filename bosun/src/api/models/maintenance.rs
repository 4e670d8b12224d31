//! API request/response models for maintenance records.

use super::pagination::Pagination;
use crate::db::models::maintenance::MaintenanceDBResponse;
use crate::types::{SupplierId, VesselId};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct MaintenanceCreate {
    #[schema(value_type = Option<String>, format = "uuid")]
    pub supplier_id: Option<SupplierId>,
    pub title: String,
    pub description: Option<String>,
    pub performed_on: NaiveDate,
    #[serde(default)]
    pub cost_cents: i64,
    pub next_due_on: Option<NaiveDate>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct MaintenanceUpdate {
    #[schema(value_type = Option<Option<String>>)]
    pub supplier_id: Option<Option<SupplierId>>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub performed_on: Option<NaiveDate>,
    pub cost_cents: Option<i64>,
    #[schema(value_type = Option<Option<String>>, format = "date")]
    pub next_due_on: Option<Option<NaiveDate>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct MaintenanceResponse {
    #[schema(value_type = String, format = "uuid")]
    pub id: Uuid,
    #[schema(value_type = String, format = "uuid")]
    pub vessel_id: VesselId,
    #[schema(value_type = Option<String>, format = "uuid")]
    pub supplier_id: Option<SupplierId>,
    pub title: String,
    pub description: Option<String>,
    pub performed_on: NaiveDate,
    pub cost_cents: i64,
    pub next_due_on: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<MaintenanceDBResponse> for MaintenanceResponse {
    fn from(db: MaintenanceDBResponse) -> Self {
        Self {
            id: db.id,
            vessel_id: db.vessel_id,
            supplier_id: db.supplier_id,
            title: db.title,
            description: db.description,
            performed_on: db.performed_on,
            cost_cents: db.cost_cents,
            next_due_on: db.next_due_on,
            created_at: db.created_at,
            updated_at: db.updated_at,
        }
    }
}

#[derive(Debug, Default, Deserialize, IntoParams, ToSchema)]
pub struct ListMaintenanceQuery {
    #[serde(flatten)]
    #[param(inline)]
    pub pagination: Pagination,
}
