//! HTTP handlers for financial reports.

use axum::{
    Json,
    extract::{Query, State},
};

use crate::{
    AppState,
    api::models::reports::{
        CategoryBreakdown, MareaReportLine, MareaReportResponse, ReportQuery, SummaryReportResponse,
        VatLine, VatReportResponse,
    },
    auth::permissions::VesselCtx,
    db::{
        handlers::{Reports, reports::ReportRange},
        models::categories::CategoryKind,
    },
    errors::{Error, Result},
    types::{Operation, Resource},
};

fn to_range(query: &ReportQuery) -> Result<ReportRange> {
    if let (Some(from), Some(to)) = (query.from, query.to) {
        if to < from {
            return Err(Error::BadRequest {
                message: "'to' cannot precede 'from'".to_string(),
            });
        }
    }
    Ok(ReportRange {
        from: query.from,
        to: query.to,
    })
}

/// Income/expense summary with per-category breakdown
#[utoipa::path(
    get,
    path = "/api/v1/vessels/{vessel_id}/reports/summary",
    tag = "reports",
    params(("vessel_id" = String, Path, description = "Vessel ID"), ReportQuery),
    responses(
        (status = 200, description = "Financial summary", body = SummaryReportResponse),
        (status = 404, description = "Vessel not found"),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn summary_report(
    State(state): State<AppState>,
    ctx: VesselCtx,
    Query(query): Query<ReportQuery>,
) -> Result<Json<SummaryReportResponse>> {
    ctx.require(Resource::Reports, Operation::Read)?;
    let range = to_range(&query)?;

    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let rows = Reports::new(&mut conn).category_totals(ctx.vessel_id, range).await?;

    let gross_income_cents: i64 = rows
        .iter()
        .filter(|row| row.kind == CategoryKind::Income)
        .map(|row| row.amount_cents)
        .sum();
    let total_expense_cents: i64 = rows
        .iter()
        .filter(|row| row.kind == CategoryKind::Expense)
        .map(|row| row.amount_cents)
        .sum();

    Ok(Json(SummaryReportResponse {
        from: query.from,
        to: query.to,
        gross_income_cents,
        total_expense_cents,
        net_result_cents: gross_income_cents - total_expense_cents,
        categories: rows
            .into_iter()
            .map(|row| CategoryBreakdown {
                category_id: row.category_id,
                category_name: row.category_name,
                kind: row.kind,
                amount_cents: row.amount_cents,
                vat_amount_cents: row.vat_amount_cents,
                movement_count: row.movement_count,
            })
            .collect(),
    }))
}

/// VAT totals per rate
#[utoipa::path(
    get,
    path = "/api/v1/vessels/{vessel_id}/reports/vat",
    tag = "reports",
    params(("vessel_id" = String, Path, description = "Vessel ID"), ReportQuery),
    responses(
        (status = 200, description = "VAT report", body = VatReportResponse),
        (status = 404, description = "Vessel not found"),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn vat_report(
    State(state): State<AppState>,
    ctx: VesselCtx,
    Query(query): Query<ReportQuery>,
) -> Result<Json<VatReportResponse>> {
    ctx.require(Resource::Reports, Operation::Read)?;
    let range = to_range(&query)?;

    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let rows = Reports::new(&mut conn).vat_totals(ctx.vessel_id, range).await?;

    // Collected on sales minus deductible on purchases
    let vat_balance_cents: i64 = rows
        .iter()
        .map(|row| match row.kind {
            CategoryKind::Income => row.vat_cents,
            CategoryKind::Expense => -row.vat_cents,
        })
        .sum();

    Ok(Json(VatReportResponse {
        from: query.from,
        to: query.to,
        lines: rows
            .into_iter()
            .map(|row| VatLine {
                vat_rate_bp: row.vat_rate_bp,
                kind: row.kind,
                gross_cents: row.gross_cents,
                vat_cents: row.vat_cents,
                movement_count: row.movement_count,
            })
            .collect(),
        vat_balance_cents,
    }))
}

/// Profitability per marea
#[utoipa::path(
    get,
    path = "/api/v1/vessels/{vessel_id}/reports/mareas",
    tag = "reports",
    params(("vessel_id" = String, Path, description = "Vessel ID")),
    responses(
        (status = 200, description = "Per-marea profitability", body = MareaReportResponse),
        (status = 404, description = "Vessel not found"),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn marea_report(
    State(state): State<AppState>,
    ctx: VesselCtx,
) -> Result<Json<MareaReportResponse>> {
    ctx.require(Resource::Reports, Operation::Read)?;

    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let rows = Reports::new(&mut conn).marea_totals(ctx.vessel_id).await?;

    Ok(Json(MareaReportResponse {
        mareas: rows
            .into_iter()
            .map(|row| MareaReportLine {
                marea_id: row.marea_id,
                name: row.name,
                status: row.status,
                departure_date: row.departure_date,
                return_date: row.return_date,
                gross_income_cents: row.gross_income_cents,
                total_expense_cents: row.total_expense_cents,
                net_result_cents: row.gross_income_cents - row.total_expense_cents,
            })
            .collect(),
    }))
}

#[cfg(test)]
mod tests {
    use crate::api::models::reports::{SummaryReportResponse, VatReportResponse};
    use crate::test_utils::{
        auth_header, create_test_account_http, create_test_app, create_test_user,
        create_test_vessel,
    };
    use serde_json::json;

    #[test_log::test(tokio::test)]
    async fn test_summary_and_vat_reports() {
        let (app, pool) = create_test_app().await;
        let owner = create_test_user(&pool, "owner@example.com", false).await;
        let vessel = create_test_vessel(&app, &owner).await;
        let account = create_test_account_http(&app, &owner, vessel).await;
        let (name, value) = auth_header(&owner);

        // 123.00 income at 23% VAT, 50.00 expense without VAT
        for body in [
            json!({ "kind": "income", "account_id": account, "occurred_on": "2026-06-01",
                    "description": "sale", "amount_cents": 12_300, "vat_rate_bp": 2300 }),
            json!({ "kind": "expense", "account_id": account, "occurred_on": "2026-06-02",
                    "description": "ice", "amount_cents": 5_000, "vat_rate_bp": 0 }),
        ] {
            app.post(&format!("/api/v1/vessels/{vessel}/movements"))
                .add_header(name.clone(), value.clone())
                .json(&body)
                .await
                .assert_status(axum::http::StatusCode::CREATED);
        }

        let response = app
            .get(&format!("/api/v1/vessels/{vessel}/reports/summary"))
            .add_header(name.clone(), value.clone())
            .await;
        response.assert_status_ok();
        let summary: SummaryReportResponse = response.json();
        assert_eq!(summary.gross_income_cents, 12_300);
        assert_eq!(summary.total_expense_cents, 5_000);
        assert_eq!(summary.net_result_cents, 7_300);

        let response = app
            .get(&format!("/api/v1/vessels/{vessel}/reports/vat"))
            .add_header(name, value)
            .await;
        response.assert_status_ok();
        let vat: VatReportResponse = response.json();
        // Only income carried VAT: balance = collected 23.00
        assert_eq!(vat.vat_balance_cents, 2_300);
    }

    #[test_log::test(tokio::test)]
    async fn test_reversed_range_rejected() {
        let (app, pool) = create_test_app().await;
        let owner = create_test_user(&pool, "owner@example.com", false).await;
        let vessel = create_test_vessel(&app, &owner).await;

        let (name, value) = auth_header(&owner);
        let response = app
            .get(&format!(
                "/api/v1/vessels/{vessel}/reports/summary?from=2026-06-30&to=2026-06-01"
            ))
            .add_header(name, value)
            .await;
        response.assert_status_bad_request();
    }
}
