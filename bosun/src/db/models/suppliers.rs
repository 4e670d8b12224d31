//! Database request/response models for suppliers.

use crate::types::{SupplierId, VesselId};
use chrono::{DateTime, Utc};

#[derive(Debug, Clone)]
pub struct SupplierCreateDBRequest {
    pub vessel_id: VesselId,
    pub name: String,
    pub tax_id: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct SupplierUpdateDBRequest {
    pub name: Option<String>,
    pub tax_id: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone)]
pub struct SupplierDBResponse {
    pub id: SupplierId,
    pub vessel_id: VesselId,
    pub name: String,
    pub tax_id: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
