//! API response models for financial reports.

use crate::db::models::categories::CategoryKind;
use crate::db::models::mareas::MareaStatus;
use crate::types::{CategoryId, MareaId};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

/// Date range for report endpoints; both ends inclusive, both optional.
#[derive(Debug, Default, Deserialize, IntoParams, ToSchema)]
pub struct ReportQuery {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CategoryBreakdown {
    #[schema(value_type = Option<String>, format = "uuid")]
    pub category_id: Option<CategoryId>,
    /// None for uncategorized movements
    pub category_name: Option<String>,
    pub kind: CategoryKind,
    pub amount_cents: i64,
    pub vat_amount_cents: i64,
    pub movement_count: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SummaryReportResponse {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    pub gross_income_cents: i64,
    pub total_expense_cents: i64,
    pub net_result_cents: i64,
    pub categories: Vec<CategoryBreakdown>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct VatLine {
    pub vat_rate_bp: i64,
    pub kind: CategoryKind,
    /// Gross amount (VAT inclusive) booked at this rate
    pub gross_cents: i64,
    /// VAT portion extracted from the gross amount
    pub vat_cents: i64,
    pub movement_count: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct VatReportResponse {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    pub lines: Vec<VatLine>,
    /// VAT collected on income minus VAT paid on expenses
    pub vat_balance_cents: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct MareaReportLine {
    #[schema(value_type = String, format = "uuid")]
    pub marea_id: MareaId,
    pub name: String,
    pub status: MareaStatus,
    pub departure_date: NaiveDate,
    pub return_date: Option<NaiveDate>,
    pub gross_income_cents: i64,
    pub total_expense_cents: i64,
    pub net_result_cents: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct MareaReportResponse {
    pub mareas: Vec<MareaReportLine>,
}
