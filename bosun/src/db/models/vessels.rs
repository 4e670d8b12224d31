//! Database request/response models for vessels and their settings.

use crate::types::{ProfileId, VesselId};
use chrono::{DateTime, Utc};

#[derive(Debug, Clone)]
pub struct VesselCreateDBRequest {
    pub name: String,
    pub registration_number: Option<String>,
    pub home_port: Option<String>,
    pub vessel_type: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct VesselUpdateDBRequest {
    pub name: Option<String>,
    pub registration_number: Option<String>,
    pub home_port: Option<String>,
    pub vessel_type: Option<String>,
}

#[derive(Debug, Clone)]
pub struct VesselDBResponse {
    pub id: VesselId,
    pub name: String,
    pub registration_number: Option<String>,
    pub home_port: Option<String>,
    pub vessel_type: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct VesselSettingsDBResponse {
    pub vessel_id: VesselId,
    pub currency: String,
    pub default_vat_rate_bp: i64,
    pub default_profile_id: Option<ProfileId>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default)]
pub struct VesselSettingsUpdateDBRequest {
    pub currency: Option<String>,
    pub default_vat_rate_bp: Option<i64>,
    pub default_profile_id: Option<Option<ProfileId>>,
}
