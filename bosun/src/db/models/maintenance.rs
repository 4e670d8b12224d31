//! Database request/response models for maintenance records.

use crate::types::{SupplierId, VesselId};
use chrono::{DateTime, NaiveDate, Utc};
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct MaintenanceCreateDBRequest {
    pub vessel_id: VesselId,
    pub supplier_id: Option<SupplierId>,
    pub title: String,
    pub description: Option<String>,
    pub performed_on: NaiveDate,
    pub cost_cents: i64,
    pub next_due_on: Option<NaiveDate>,
}

#[derive(Debug, Clone, Default)]
pub struct MaintenanceUpdateDBRequest {
    pub supplier_id: Option<Option<SupplierId>>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub performed_on: Option<NaiveDate>,
    pub cost_cents: Option<i64>,
    pub next_due_on: Option<Option<NaiveDate>>,
}

#[derive(Debug, Clone)]
pub struct MaintenanceDBResponse {
    pub id: Uuid,
    pub vessel_id: VesselId,
    pub supplier_id: Option<SupplierId>,
    pub title: String,
    pub description: Option<String>,
    pub performed_on: NaiveDate,
    pub cost_cents: i64,
    pub next_due_on: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
