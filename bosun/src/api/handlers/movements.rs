//! HTTP handlers for movements: income, expenses, and account transfers.

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use rust_decimal::{Decimal, RoundingStrategy, prelude::ToPrimitive};
use uuid::Uuid;

use crate::{
    AppState,
    api::models::{
        movements::{
            ListMovementsQuery, MovementCreate, MovementResponse, MovementUpdate, TransferCreate,
        },
        pagination::PaginatedResponse,
    },
    auth::permissions::VesselCtx,
    db::{
        handlers::{Movements, Repository, Vessels, movements::TransferCreateDBRequest},
        models::{
            audit::AuditAction,
            categories::CategoryKind,
            mareas::MareaStatus,
            movements::{MovementCreateDBRequest, MovementKind, MovementUpdateDBRequest},
        },
    },
    errors::{Error, Result},
    types::{MovementId, Operation, Resource},
};

/// Extract the VAT portion of a gross (VAT-inclusive) amount.
///
/// `vat = gross * rate / (10_000 + rate)`, banker's-rounded to cents.
pub fn extract_vat_cents(gross_cents: i64, vat_rate_bp: i64) -> i64 {
    if vat_rate_bp == 0 {
        return 0;
    }
    let vat = Decimal::from(gross_cents) * Decimal::from(vat_rate_bp)
        / Decimal::from(10_000 + vat_rate_bp);
    vat.round_dp_with_strategy(0, RoundingStrategy::MidpointNearestEven)
        .to_i64()
        .unwrap_or(0)
}

fn validate_amount(amount_cents: i64) -> Result<()> {
    if amount_cents <= 0 {
        return Err(Error::BadRequest {
            message: "Amount must be greater than zero".to_string(),
        });
    }
    Ok(())
}

fn validate_vat_rate(vat_rate_bp: i64) -> Result<()> {
    if !(0..=10_000).contains(&vat_rate_bp) {
        return Err(Error::BadRequest {
            message: "vat_rate_bp must be between 0 and 10000".to_string(),
        });
    }
    Ok(())
}

/// Check every reference of a movement write against the vessel.
async fn validate_references(
    repo: &mut Movements<'_>,
    ctx: &VesselCtx,
    kind: MovementKind,
    account_id: Uuid,
    category_id: Option<Uuid>,
    supplier_id: Option<Uuid>,
    marea_id: Option<Uuid>,
) -> Result<()> {
    if !repo.account_exists(ctx.vessel_id, account_id).await? {
        return Err(Error::BadRequest {
            message: "Unknown bank account".to_string(),
        });
    }

    if let Some(category_id) = category_id {
        let category_kind = repo
            .category_kind(ctx.vessel_id, category_id)
            .await?
            .ok_or_else(|| Error::BadRequest {
                message: "Unknown category".to_string(),
            })?;
        let matches = matches!(
            (kind, category_kind),
            (MovementKind::Income, CategoryKind::Income)
                | (MovementKind::Expense, CategoryKind::Expense)
        );
        if !matches {
            return Err(Error::BadRequest {
                message: "Category kind does not match the movement kind".to_string(),
            });
        }
    }

    if let Some(supplier_id) = supplier_id {
        if !repo.supplier_exists(ctx.vessel_id, supplier_id).await? {
            return Err(Error::BadRequest {
                message: "Unknown supplier".to_string(),
            });
        }
    }

    if let Some(marea_id) = marea_id {
        match repo.marea_status(ctx.vessel_id, marea_id).await? {
            Some(MareaStatus::Open) => {}
            Some(MareaStatus::Closed) => {
                return Err(Error::BadRequest {
                    message: "Marea is closed; reopen it to attach movements".to_string(),
                });
            }
            None => {
                return Err(Error::BadRequest {
                    message: "Unknown marea".to_string(),
                });
            }
        }
    }

    Ok(())
}

/// List movements
#[utoipa::path(
    get,
    path = "/api/v1/vessels/{vessel_id}/movements",
    tag = "movements",
    params(("vessel_id" = String, Path, description = "Vessel ID"), ListMovementsQuery),
    responses(
        (status = 200, description = "Paginated list of movements", body = PaginatedResponse<MovementResponse>),
        (status = 404, description = "Vessel not found"),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn list_movements(
    State(state): State<AppState>,
    ctx: VesselCtx,
    Query(query): Query<ListMovementsQuery>,
) -> Result<Json<PaginatedResponse<MovementResponse>>> {
    ctx.require(Resource::Movements, Operation::Read)?;

    let filter = query.to_filter(ctx.vessel_id);
    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = Movements::new(&mut conn);
    let movements = repo.list(&filter).await?;
    let total_count = repo.count(&filter).await?;

    Ok(Json(PaginatedResponse::new(
        movements.into_iter().map(MovementResponse::from).collect(),
        total_count,
        filter.skip,
        filter.limit,
    )))
}

/// Record an income or expense movement
#[utoipa::path(
    post,
    path = "/api/v1/vessels/{vessel_id}/movements",
    tag = "movements",
    params(("vessel_id" = String, Path, description = "Vessel ID")),
    request_body = MovementCreate,
    responses(
        (status = 201, description = "Movement recorded", body = MovementResponse),
        (status = 400, description = "Validation failure"),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn create_movement(
    State(state): State<AppState>,
    ctx: VesselCtx,
    Json(data): Json<MovementCreate>,
) -> Result<(StatusCode, Json<MovementResponse>)> {
    ctx.require(Resource::Movements, Operation::Create)?;
    validate_amount(data.amount_cents)?;

    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;

    // Default VAT rate comes from the vessel settings
    let vat_rate_bp = match data.vat_rate_bp {
        Some(rate) => rate,
        None => Vessels::new(&mut conn)
            .get_settings(ctx.vessel_id)
            .await?
            .map(|settings| settings.default_vat_rate_bp)
            .unwrap_or(0),
    };
    validate_vat_rate(vat_rate_bp)?;

    let kind = MovementKind::from(data.kind);
    let mut repo = Movements::new(&mut conn);
    validate_references(
        &mut repo,
        &ctx,
        kind,
        data.account_id,
        data.category_id,
        data.supplier_id,
        data.marea_id,
    )
    .await?;

    let movement = repo
        .create(&MovementCreateDBRequest {
            vessel_id: ctx.vessel_id,
            account_id: data.account_id,
            category_id: data.category_id,
            supplier_id: data.supplier_id,
            marea_id: data.marea_id,
            kind,
            transfer_group: None,
            occurred_on: data.occurred_on,
            description: data.description,
            amount_cents: data.amount_cents,
            vat_rate_bp,
            vat_amount_cents: extract_vat_cents(data.amount_cents, vat_rate_bp),
            created_by: ctx.user.id,
        })
        .await?;

    super::record_audit(
        &mut conn,
        Some(ctx.vessel_id),
        ctx.user.id,
        "movement",
        movement.id.to_string(),
        AuditAction::Create,
        Some(serde_json::json!({
            "kind": movement.kind,
            "amount_cents": movement.amount_cents,
        })),
    )
    .await?;

    Ok((StatusCode::CREATED, Json(MovementResponse::from(movement))))
}

/// Move money between two of the vessel's accounts
#[utoipa::path(
    post,
    path = "/api/v1/vessels/{vessel_id}/movements/transfer",
    tag = "movements",
    params(("vessel_id" = String, Path, description = "Vessel ID")),
    request_body = TransferCreate,
    responses(
        (status = 201, description = "Both transfer legs", body = [MovementResponse]),
        (status = 400, description = "Validation failure"),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn create_transfer(
    State(state): State<AppState>,
    ctx: VesselCtx,
    Json(data): Json<TransferCreate>,
) -> Result<(StatusCode, Json<Vec<MovementResponse>>)> {
    ctx.require(Resource::Movements, Operation::Create)?;
    validate_amount(data.amount_cents)?;

    if data.from_account_id == data.to_account_id {
        return Err(Error::BadRequest {
            message: "Cannot transfer to the same account".to_string(),
        });
    }

    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = Movements::new(&mut conn);

    for account_id in [data.from_account_id, data.to_account_id] {
        if !repo.account_exists(ctx.vessel_id, account_id).await? {
            return Err(Error::BadRequest {
                message: "Unknown bank account".to_string(),
            });
        }
    }

    let (out_leg, in_leg) = repo
        .create_transfer(&TransferCreateDBRequest {
            vessel_id: ctx.vessel_id,
            from_account_id: data.from_account_id,
            to_account_id: data.to_account_id,
            occurred_on: data.occurred_on,
            description: data.description,
            amount_cents: data.amount_cents,
            created_by: ctx.user.id,
        })
        .await?;

    super::record_audit(
        &mut conn,
        Some(ctx.vessel_id),
        ctx.user.id,
        "movement",
        out_leg.id.to_string(),
        AuditAction::Transfer,
        Some(serde_json::json!({
            "amount_cents": out_leg.amount_cents,
            "counterpart": in_leg.id,
        })),
    )
    .await?;

    Ok((
        StatusCode::CREATED,
        Json(vec![MovementResponse::from(out_leg), MovementResponse::from(in_leg)]),
    ))
}

/// Get a movement
#[utoipa::path(
    get,
    path = "/api/v1/vessels/{vessel_id}/movements/{movement_id}",
    tag = "movements",
    params(
        ("vessel_id" = String, Path, description = "Vessel ID"),
        ("movement_id" = String, Path, description = "Movement ID"),
    ),
    responses(
        (status = 200, description = "Movement details", body = MovementResponse),
        (status = 404, description = "Movement not found"),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn get_movement(
    State(state): State<AppState>,
    ctx: VesselCtx,
    Path((_vessel_id, movement_id)): Path<(Uuid, MovementId)>,
) -> Result<Json<MovementResponse>> {
    ctx.require(Resource::Movements, Operation::Read)?;

    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let movement = Movements::new(&mut conn)
        .get_by_id((ctx.vessel_id, movement_id))
        .await?
        .ok_or_else(|| movement_not_found(movement_id))?;

    Ok(Json(MovementResponse::from(movement)))
}

/// Update a movement
#[utoipa::path(
    patch,
    path = "/api/v1/vessels/{vessel_id}/movements/{movement_id}",
    tag = "movements",
    params(
        ("vessel_id" = String, Path, description = "Vessel ID"),
        ("movement_id" = String, Path, description = "Movement ID"),
    ),
    request_body = MovementUpdate,
    responses(
        (status = 200, description = "Movement updated", body = MovementResponse),
        (status = 400, description = "Validation failure, or the movement is a transfer leg"),
        (status = 404, description = "Movement not found"),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn update_movement(
    State(state): State<AppState>,
    ctx: VesselCtx,
    Path((_vessel_id, movement_id)): Path<(Uuid, MovementId)>,
    Json(data): Json<MovementUpdate>,
) -> Result<Json<MovementResponse>> {
    ctx.require(Resource::Movements, Operation::Update)?;

    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = Movements::new(&mut conn);

    let existing = repo
        .get_by_id((ctx.vessel_id, movement_id))
        .await?
        .ok_or_else(|| movement_not_found(movement_id))?;

    // Transfer legs stay immutable so the pair can never drift apart;
    // delete the transfer and record a new one instead.
    if existing.transfer_group.is_some() {
        return Err(Error::BadRequest {
            message: "Transfer legs cannot be edited; delete and re-create the transfer".to_string(),
        });
    }

    if let Some(amount_cents) = data.amount_cents {
        validate_amount(amount_cents)?;
    }
    if let Some(vat_rate_bp) = data.vat_rate_bp {
        validate_vat_rate(vat_rate_bp)?;
    }

    validate_references(
        &mut repo,
        &ctx,
        existing.kind,
        data.account_id.unwrap_or(existing.account_id),
        data.category_id.unwrap_or(existing.category_id),
        data.supplier_id.unwrap_or(existing.supplier_id),
        data.marea_id.unwrap_or(existing.marea_id),
    )
    .await?;

    // Re-derive the VAT amount when either input changed
    let amount_cents = data.amount_cents.unwrap_or(existing.amount_cents);
    let vat_rate_bp = data.vat_rate_bp.unwrap_or(existing.vat_rate_bp);
    let vat_amount_cents = extract_vat_cents(amount_cents, vat_rate_bp);

    let movement = repo
        .update(
            (ctx.vessel_id, movement_id),
            &MovementUpdateDBRequest {
                account_id: data.account_id,
                category_id: data.category_id,
                supplier_id: data.supplier_id,
                marea_id: data.marea_id,
                occurred_on: data.occurred_on,
                description: data.description,
                amount_cents: data.amount_cents,
                vat_rate_bp: data.vat_rate_bp,
                vat_amount_cents: Some(vat_amount_cents),
            },
        )
        .await?;

    super::record_audit(
        &mut conn,
        Some(ctx.vessel_id),
        ctx.user.id,
        "movement",
        movement_id.to_string(),
        AuditAction::Update,
        None,
    )
    .await?;

    Ok(Json(MovementResponse::from(movement)))
}

/// Soft-delete a movement (both legs, for transfers)
#[utoipa::path(
    delete,
    path = "/api/v1/vessels/{vessel_id}/movements/{movement_id}",
    tag = "movements",
    params(
        ("vessel_id" = String, Path, description = "Vessel ID"),
        ("movement_id" = String, Path, description = "Movement ID"),
    ),
    responses(
        (status = 204, description = "Movement deleted"),
        (status = 404, description = "Movement not found"),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn delete_movement(
    State(state): State<AppState>,
    ctx: VesselCtx,
    Path((_vessel_id, movement_id)): Path<(Uuid, MovementId)>,
) -> Result<StatusCode> {
    ctx.require(Resource::Movements, Operation::Delete)?;

    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let deleted = Movements::new(&mut conn)
        .delete((ctx.vessel_id, movement_id))
        .await?;
    if !deleted {
        return Err(movement_not_found(movement_id));
    }

    super::record_audit(
        &mut conn,
        Some(ctx.vessel_id),
        ctx.user.id,
        "movement",
        movement_id.to_string(),
        AuditAction::SoftDelete,
        None,
    )
    .await?;

    Ok(StatusCode::NO_CONTENT)
}

fn movement_not_found(movement_id: MovementId) -> Error {
    Error::NotFound {
        resource: "Movement".to_string(),
        id: movement_id.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::extract_vat_cents;
    use crate::api::models::movements::MovementResponse;
    use crate::test_utils::{
        auth_header, create_test_account_http, create_test_app, create_test_user,
        create_test_vessel,
    };
    use serde_json::json;

    #[test]
    fn test_extract_vat_cents() {
        // 23% VAT on 123.00 gross -> 23.00 VAT
        assert_eq!(extract_vat_cents(12_300, 2_300), 2_300);
        // 6% VAT on 106.00 gross -> 6.00 VAT
        assert_eq!(extract_vat_cents(10_600, 600), 600);
        assert_eq!(extract_vat_cents(10_000, 0), 0);
        // Rounding: 23% on 100.00 gross = 18.699... -> 18.70
        assert_eq!(extract_vat_cents(10_000, 2_300), 1_870);
    }

    #[test_log::test(tokio::test)]
    async fn test_create_movement_applies_default_vat() {
        let (app, pool) = create_test_app().await;
        let owner = create_test_user(&pool, "owner@example.com", false).await;
        let vessel = create_test_vessel(&app, &owner).await;
        let account = create_test_account_http(&app, &owner, vessel).await;

        // Set a default VAT rate on the vessel
        let (name, value) = auth_header(&owner);
        app.put(&format!("/api/v1/vessels/{vessel}/settings"))
            .add_header(name.clone(), value.clone())
            .json(&json!({ "default_vat_rate_bp": 2300 }))
            .await
            .assert_status_ok();

        let response = app
            .post(&format!("/api/v1/vessels/{vessel}/movements"))
            .add_header(name, value)
            .json(&json!({
                "kind": "income",
                "account_id": account,
                "occurred_on": "2026-06-01",
                "description": "catch sale",
                "amount_cents": 12_300
            }))
            .await;
        response.assert_status(axum::http::StatusCode::CREATED);
        let movement: MovementResponse = response.json();
        assert_eq!(movement.vat_rate_bp, 2300);
        assert_eq!(movement.vat_amount_cents, 2300);
    }

    #[test_log::test(tokio::test)]
    async fn test_zero_amount_rejected() {
        let (app, pool) = create_test_app().await;
        let owner = create_test_user(&pool, "owner@example.com", false).await;
        let vessel = create_test_vessel(&app, &owner).await;
        let account = create_test_account_http(&app, &owner, vessel).await;

        let (name, value) = auth_header(&owner);
        let response = app
            .post(&format!("/api/v1/vessels/{vessel}/movements"))
            .add_header(name, value)
            .json(&json!({
                "kind": "expense",
                "account_id": account,
                "occurred_on": "2026-06-01",
                "description": "nothing",
                "amount_cents": 0
            }))
            .await;
        response.assert_status_bad_request();
    }

    #[test_log::test(tokio::test)]
    async fn test_transfer_to_same_account_rejected() {
        let (app, pool) = create_test_app().await;
        let owner = create_test_user(&pool, "owner@example.com", false).await;
        let vessel = create_test_vessel(&app, &owner).await;
        let account = create_test_account_http(&app, &owner, vessel).await;

        let (name, value) = auth_header(&owner);
        let response = app
            .post(&format!("/api/v1/vessels/{vessel}/movements/transfer"))
            .add_header(name, value)
            .json(&json!({
                "from_account_id": account,
                "to_account_id": account,
                "occurred_on": "2026-06-01",
                "description": "round trip",
                "amount_cents": 1000
            }))
            .await;
        response.assert_status_bad_request();
    }
}
