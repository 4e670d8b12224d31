//! API request/response models for vessels and their settings.

use super::pagination::Pagination;
use crate::db::models::vessels::{VesselDBResponse, VesselSettingsDBResponse};
use crate::types::{ProfileId, VesselId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct VesselCreate {
    pub name: String,
    pub registration_number: Option<String>,
    pub home_port: Option<String>,
    pub vessel_type: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct VesselUpdate {
    pub name: Option<String>,
    pub registration_number: Option<String>,
    pub home_port: Option<String>,
    pub vessel_type: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct VesselResponse {
    #[schema(value_type = String, format = "uuid")]
    pub id: VesselId,
    pub name: String,
    pub registration_number: Option<String>,
    pub home_port: Option<String>,
    pub vessel_type: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<VesselDBResponse> for VesselResponse {
    fn from(db: VesselDBResponse) -> Self {
        Self {
            id: db.id,
            name: db.name,
            registration_number: db.registration_number,
            home_port: db.home_port,
            vessel_type: db.vessel_type,
            created_at: db.created_at,
            updated_at: db.updated_at,
        }
    }
}

#[derive(Debug, Default, Deserialize, IntoParams, ToSchema)]
pub struct ListVesselsQuery {
    #[serde(flatten)]
    #[param(inline)]
    pub pagination: Pagination,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct VesselSettingsResponse {
    #[schema(value_type = String, format = "uuid")]
    pub vessel_id: VesselId,
    /// ISO 4217 currency code used for display
    pub currency: String,
    pub default_vat_rate_bp: i64,
    #[schema(value_type = Option<String>, format = "uuid")]
    pub default_profile_id: Option<ProfileId>,
    pub updated_at: DateTime<Utc>,
}

impl From<VesselSettingsDBResponse> for VesselSettingsResponse {
    fn from(db: VesselSettingsDBResponse) -> Self {
        Self {
            vessel_id: db.vessel_id,
            currency: db.currency,
            default_vat_rate_bp: db.default_vat_rate_bp,
            default_profile_id: db.default_profile_id,
            updated_at: db.updated_at,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct VesselSettingsUpdate {
    pub currency: Option<String>,
    pub default_vat_rate_bp: Option<i64>,
    #[schema(value_type = Option<Option<String>>)]
    pub default_profile_id: Option<Option<ProfileId>>,
}
