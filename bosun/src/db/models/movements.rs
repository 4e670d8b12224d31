//! Database request/response models for movements (transactions).

use crate::types::{AccountId, CategoryId, MareaId, MovementId, SupplierId, UserId, VesselId};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// The four movement kinds. Transfers always come in `TransferOut` /
/// `TransferIn` pairs sharing a `transfer_group`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum MovementKind {
    Income,
    Expense,
    TransferIn,
    TransferOut,
}

impl MovementKind {
    /// Whether this kind adds to the account balance
    pub fn is_credit(self) -> bool {
        matches!(self, MovementKind::Income | MovementKind::TransferIn)
    }
}

#[derive(Debug, Clone)]
pub struct MovementCreateDBRequest {
    pub vessel_id: VesselId,
    pub account_id: AccountId,
    pub category_id: Option<CategoryId>,
    pub supplier_id: Option<SupplierId>,
    pub marea_id: Option<MareaId>,
    pub kind: MovementKind,
    pub transfer_group: Option<Uuid>,
    pub occurred_on: NaiveDate,
    pub description: String,
    pub amount_cents: i64,
    pub vat_rate_bp: i64,
    pub vat_amount_cents: i64,
    pub created_by: UserId,
}

#[derive(Debug, Clone, Default)]
pub struct MovementUpdateDBRequest {
    pub account_id: Option<AccountId>,
    pub category_id: Option<Option<CategoryId>>,
    pub supplier_id: Option<Option<SupplierId>>,
    pub marea_id: Option<Option<MareaId>>,
    pub occurred_on: Option<NaiveDate>,
    pub description: Option<String>,
    pub amount_cents: Option<i64>,
    pub vat_rate_bp: Option<i64>,
    pub vat_amount_cents: Option<i64>,
}

#[derive(Debug, Clone)]
pub struct MovementDBResponse {
    pub id: MovementId,
    pub vessel_id: VesselId,
    pub account_id: AccountId,
    pub category_id: Option<CategoryId>,
    pub supplier_id: Option<SupplierId>,
    pub marea_id: Option<MareaId>,
    pub kind: MovementKind,
    pub transfer_group: Option<Uuid>,
    pub occurred_on: NaiveDate,
    pub description: String,
    pub amount_cents: i64,
    pub vat_rate_bp: i64,
    pub vat_amount_cents: i64,
    pub created_by: UserId,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
