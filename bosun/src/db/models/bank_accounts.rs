//! Database request/response models for bank accounts.

use crate::types::{AccountId, VesselId};
use chrono::{DateTime, Utc};

#[derive(Debug, Clone)]
pub struct AccountCreateDBRequest {
    pub vessel_id: VesselId,
    pub name: String,
    pub iban: Option<String>,
    pub opening_balance_cents: i64,
}

#[derive(Debug, Clone, Default)]
pub struct AccountUpdateDBRequest {
    pub name: Option<String>,
    pub iban: Option<String>,
}

/// Account row with its derived balance (opening balance plus the signed sum
/// of all live movements on the account).
#[derive(Debug, Clone)]
pub struct AccountDBResponse {
    pub id: AccountId,
    pub vessel_id: VesselId,
    pub name: String,
    pub iban: Option<String>,
    pub opening_balance_cents: i64,
    pub balance_cents: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
