//! API request/response models for mareas and their distribution results.

use super::pagination::Pagination;
use crate::db::models::mareas::{MareaDBResponse, MareaStatus, MareaTotalsDBResponse};
use crate::distribution::DistributionOutcome;
use crate::types::{MareaId, ProfileId, VesselId};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct MareaCreate {
    pub name: String,
    pub departure_date: NaiveDate,
    pub return_date: Option<NaiveDate>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct MareaUpdate {
    pub name: Option<String>,
    pub departure_date: Option<NaiveDate>,
    #[schema(value_type = Option<Option<String>>, format = "date")]
    pub return_date: Option<Option<NaiveDate>>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct MareaResponse {
    #[schema(value_type = String, format = "uuid")]
    pub id: MareaId,
    #[schema(value_type = String, format = "uuid")]
    pub vessel_id: VesselId,
    pub name: String,
    pub departure_date: NaiveDate,
    pub return_date: Option<NaiveDate>,
    pub status: MareaStatus,
    pub closed_at: Option<DateTime<Utc>>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<MareaDBResponse> for MareaResponse {
    fn from(db: MareaDBResponse) -> Self {
        Self {
            id: db.id,
            vessel_id: db.vessel_id,
            name: db.name,
            departure_date: db.departure_date,
            return_date: db.return_date,
            status: db.status,
            closed_at: db.closed_at,
            notes: db.notes,
            created_at: db.created_at,
            updated_at: db.updated_at,
        }
    }
}

#[derive(Debug, Default, Deserialize, IntoParams, ToSchema)]
pub struct ListMareasQuery {
    #[serde(flatten)]
    #[param(inline)]
    pub pagination: Pagination,

    pub status: Option<MareaStatus>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct MareaTotalsResponse {
    #[schema(value_type = String, format = "uuid")]
    pub marea_id: MareaId,
    pub gross_income_cents: i64,
    pub total_expense_cents: i64,
    pub net_result_cents: i64,
    pub movement_count: i64,
}

impl MareaTotalsResponse {
    pub fn from_totals(marea_id: MareaId, totals: MareaTotalsDBResponse) -> Self {
        Self {
            marea_id,
            gross_income_cents: totals.gross_income_cents,
            total_expense_cents: totals.total_expense_cents,
            net_result_cents: totals.net_result_cents(),
            movement_count: totals.movement_count,
        }
    }
}

/// Query parameters for the distribution endpoint.
#[derive(Debug, Default, Deserialize, IntoParams, ToSchema)]
pub struct DistributionQuery {
    /// Profile to apply; falls back to the vessel's default profile
    #[param(value_type = Option<String>)]
    #[schema(value_type = Option<String>)]
    pub profile_id: Option<ProfileId>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct DistributionLineResponse {
    pub order_index: i64,
    pub label: String,
    pub amount_cents: i64,
    pub is_payout: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct DistributionResponse {
    #[schema(value_type = String, format = "uuid")]
    pub marea_id: MareaId,
    #[schema(value_type = String, format = "uuid")]
    pub profile_id: ProfileId,
    pub gross_income_cents: i64,
    pub total_expense_cents: i64,
    pub net_result_cents: i64,
    pub lines: Vec<DistributionLineResponse>,
}

impl DistributionResponse {
    pub fn from_outcome(marea_id: MareaId, profile_id: ProfileId, outcome: DistributionOutcome) -> Self {
        Self {
            marea_id,
            profile_id,
            gross_income_cents: outcome.gross_income_cents,
            total_expense_cents: outcome.total_expense_cents,
            net_result_cents: outcome.net_result_cents,
            lines: outcome
                .lines
                .into_iter()
                .map(|line| DistributionLineResponse {
                    order_index: line.order_index,
                    label: line.label,
                    amount_cents: line.amount_cents,
                    is_payout: line.is_payout,
                })
                .collect(),
        }
    }
}
