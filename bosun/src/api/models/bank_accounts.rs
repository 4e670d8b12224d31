//! API request/response models for bank accounts.

use crate::db::models::bank_accounts::AccountDBResponse;
use crate::types::{AccountId, VesselId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AccountCreate {
    pub name: String,
    pub iban: Option<String>,
    #[serde(default)]
    pub opening_balance_cents: i64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct AccountUpdate {
    pub name: Option<String>,
    pub iban: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AccountResponse {
    #[schema(value_type = String, format = "uuid")]
    pub id: AccountId,
    #[schema(value_type = String, format = "uuid")]
    pub vessel_id: VesselId,
    pub name: String,
    pub iban: Option<String>,
    pub opening_balance_cents: i64,
    /// Opening balance plus the signed sum of all live movements
    pub balance_cents: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<AccountDBResponse> for AccountResponse {
    fn from(db: AccountDBResponse) -> Self {
        Self {
            id: db.id,
            vessel_id: db.vessel_id,
            name: db.name,
            iban: db.iban,
            opening_balance_cents: db.opening_balance_cents,
            balance_cents: db.balance_cents,
            created_at: db.created_at,
            updated_at: db.updated_at,
        }
    }
}
