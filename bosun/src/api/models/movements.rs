//! API request/response models for movements.

use super::pagination::Pagination;
use crate::db::handlers::movements::MovementFilter;
use crate::db::models::movements::{MovementDBResponse, MovementKind};
use crate::types::{AccountId, CategoryId, MareaId, MovementId, SupplierId, UserId, VesselId};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

/// Kinds accepted when creating a movement directly; transfer legs are only
/// created through the transfer endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum MovementCreateKind {
    Income,
    Expense,
}

impl From<MovementCreateKind> for MovementKind {
    fn from(kind: MovementCreateKind) -> Self {
        match kind {
            MovementCreateKind::Income => MovementKind::Income,
            MovementCreateKind::Expense => MovementKind::Expense,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct MovementCreate {
    pub kind: MovementCreateKind,
    #[schema(value_type = String, format = "uuid")]
    pub account_id: AccountId,
    #[schema(value_type = Option<String>, format = "uuid")]
    pub category_id: Option<CategoryId>,
    #[schema(value_type = Option<String>, format = "uuid")]
    pub supplier_id: Option<SupplierId>,
    #[schema(value_type = Option<String>, format = "uuid")]
    pub marea_id: Option<MareaId>,
    pub occurred_on: NaiveDate,
    pub description: String,
    /// Gross amount in cents (VAT inclusive)
    pub amount_cents: i64,
    /// VAT rate in basis points; defaults to the vessel's configured rate
    pub vat_rate_bp: Option<i64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct MovementUpdate {
    #[schema(value_type = Option<String>, format = "uuid")]
    pub account_id: Option<AccountId>,
    #[schema(value_type = Option<Option<String>>)]
    pub category_id: Option<Option<CategoryId>>,
    #[schema(value_type = Option<Option<String>>)]
    pub supplier_id: Option<Option<SupplierId>>,
    #[schema(value_type = Option<Option<String>>)]
    pub marea_id: Option<Option<MareaId>>,
    pub occurred_on: Option<NaiveDate>,
    pub description: Option<String>,
    pub amount_cents: Option<i64>,
    pub vat_rate_bp: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TransferCreate {
    #[schema(value_type = String, format = "uuid")]
    pub from_account_id: AccountId,
    #[schema(value_type = String, format = "uuid")]
    pub to_account_id: AccountId,
    pub occurred_on: NaiveDate,
    pub description: String,
    pub amount_cents: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct MovementResponse {
    #[schema(value_type = String, format = "uuid")]
    pub id: MovementId,
    #[schema(value_type = String, format = "uuid")]
    pub vessel_id: VesselId,
    #[schema(value_type = String, format = "uuid")]
    pub account_id: AccountId,
    #[schema(value_type = Option<String>, format = "uuid")]
    pub category_id: Option<CategoryId>,
    #[schema(value_type = Option<String>, format = "uuid")]
    pub supplier_id: Option<SupplierId>,
    #[schema(value_type = Option<String>, format = "uuid")]
    pub marea_id: Option<MareaId>,
    pub kind: MovementKind,
    #[schema(value_type = Option<String>, format = "uuid")]
    pub transfer_group: Option<Uuid>,
    pub occurred_on: NaiveDate,
    pub description: String,
    pub amount_cents: i64,
    pub vat_rate_bp: i64,
    pub vat_amount_cents: i64,
    #[schema(value_type = String, format = "uuid")]
    pub created_by: UserId,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<MovementDBResponse> for MovementResponse {
    fn from(db: MovementDBResponse) -> Self {
        Self {
            id: db.id,
            vessel_id: db.vessel_id,
            account_id: db.account_id,
            category_id: db.category_id,
            supplier_id: db.supplier_id,
            marea_id: db.marea_id,
            kind: db.kind,
            transfer_group: db.transfer_group,
            occurred_on: db.occurred_on,
            description: db.description,
            amount_cents: db.amount_cents,
            vat_rate_bp: db.vat_rate_bp,
            vat_amount_cents: db.vat_amount_cents,
            created_by: db.created_by,
            created_at: db.created_at,
            updated_at: db.updated_at,
        }
    }
}

/// Query parameters for listing movements
#[derive(Debug, Default, Deserialize, IntoParams, ToSchema)]
pub struct ListMovementsQuery {
    #[serde(flatten)]
    #[param(inline)]
    pub pagination: Pagination,

    pub kind: Option<MovementKind>,
    #[param(value_type = Option<String>)]
    #[schema(value_type = Option<String>)]
    pub category_id: Option<CategoryId>,
    #[param(value_type = Option<String>)]
    #[schema(value_type = Option<String>)]
    pub account_id: Option<AccountId>,
    #[param(value_type = Option<String>)]
    #[schema(value_type = Option<String>)]
    pub supplier_id: Option<SupplierId>,
    #[param(value_type = Option<String>)]
    #[schema(value_type = Option<String>)]
    pub marea_id: Option<MareaId>,
    /// Inclusive start of the date range
    pub from: Option<NaiveDate>,
    /// Inclusive end of the date range
    pub to: Option<NaiveDate>,
    /// Case-insensitive substring match on the description
    pub search: Option<String>,
}

impl ListMovementsQuery {
    pub fn to_filter(&self, vessel_id: VesselId) -> MovementFilter {
        MovementFilter {
            vessel_id,
            skip: self.pagination.skip(),
            limit: self.pagination.limit(),
            kind: self.kind,
            category_id: self.category_id,
            account_id: self.account_id,
            supplier_id: self.supplier_id,
            marea_id: self.marea_id,
            from: self.from,
            to: self.to,
            search: self.search.clone(),
        }
    }
}
