//! API request/response models for suppliers.

use crate::db::models::suppliers::SupplierDBResponse;
use crate::types::{SupplierId, VesselId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SupplierCreate {
    pub name: String,
    pub tax_id: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct SupplierUpdate {
    pub name: Option<String>,
    pub tax_id: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SupplierResponse {
    #[schema(value_type = String, format = "uuid")]
    pub id: SupplierId,
    #[schema(value_type = String, format = "uuid")]
    pub vessel_id: VesselId,
    pub name: String,
    pub tax_id: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<SupplierDBResponse> for SupplierResponse {
    fn from(db: SupplierDBResponse) -> Self {
        Self {
            id: db.id,
            vessel_id: db.vessel_id,
            name: db.name,
            tax_id: db.tax_id,
            email: db.email,
            phone: db.phone,
            notes: db.notes,
            created_at: db.created_at,
            updated_at: db.updated_at,
        }
    }
}
