//! Database request/response models for mareas (fishing voyages).

use crate::types::{MareaId, VesselId};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum MareaStatus {
    Open,
    Closed,
}

#[derive(Debug, Clone)]
pub struct MareaCreateDBRequest {
    pub vessel_id: VesselId,
    pub name: String,
    pub departure_date: NaiveDate,
    pub return_date: Option<NaiveDate>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct MareaUpdateDBRequest {
    pub name: Option<String>,
    pub departure_date: Option<NaiveDate>,
    pub return_date: Option<Option<NaiveDate>>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone)]
pub struct MareaDBResponse {
    pub id: MareaId,
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

/// Movement totals of a marea, the base figures of every distribution run.
#[derive(Debug, Clone, Copy, Default)]
pub struct MareaTotalsDBResponse {
    pub gross_income_cents: i64,
    pub total_expense_cents: i64,
    pub movement_count: i64,
}

impl MareaTotalsDBResponse {
    pub fn net_result_cents(&self) -> i64 {
        self.gross_income_cents - self.total_expense_cents
    }
}
