//! HTTP handlers for mareas, their totals and profit distribution.

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use uuid::Uuid;

use crate::{
    AppState,
    api::models::{
        mareas::{
            DistributionQuery, DistributionResponse, ListMareasQuery, MareaCreate, MareaResponse,
            MareaTotalsResponse, MareaUpdate,
        },
        pagination::PaginatedResponse,
    },
    auth::permissions::VesselCtx,
    db::{
        handlers::{Mareas, Profiles, Repository, Vessels, mareas::MareaFilter},
        models::{
            audit::AuditAction,
            mareas::{MareaCreateDBRequest, MareaUpdateDBRequest},
        },
    },
    distribution::{self, DistributionInput},
    errors::{Error, Result},
    types::{MareaId, Operation, ProfileId, Resource},
};

/// List mareas
#[utoipa::path(
    get,
    path = "/api/v1/vessels/{vessel_id}/mareas",
    tag = "mareas",
    params(("vessel_id" = String, Path, description = "Vessel ID"), ListMareasQuery),
    responses(
        (status = 200, description = "Paginated list of mareas", body = PaginatedResponse<MareaResponse>),
        (status = 404, description = "Vessel not found"),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn list_mareas(
    State(state): State<AppState>,
    ctx: VesselCtx,
    Query(query): Query<ListMareasQuery>,
) -> Result<Json<PaginatedResponse<MareaResponse>>> {
    ctx.require(Resource::Mareas, Operation::Read)?;

    let (skip, limit) = (query.pagination.skip(), query.pagination.limit());
    let filter = MareaFilter {
        vessel_id: ctx.vessel_id,
        skip,
        limit,
        status: query.status,
    };

    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = Mareas::new(&mut conn);
    let mareas = repo.list(&filter).await?;
    let total_count = repo.count(&filter).await?;

    Ok(Json(PaginatedResponse::new(
        mareas.into_iter().map(MareaResponse::from).collect(),
        total_count,
        skip,
        limit,
    )))
}

/// Open a new marea
#[utoipa::path(
    post,
    path = "/api/v1/vessels/{vessel_id}/mareas",
    tag = "mareas",
    params(("vessel_id" = String, Path, description = "Vessel ID")),
    request_body = MareaCreate,
    responses(
        (status = 201, description = "Marea created", body = MareaResponse),
        (status = 400, description = "Return date precedes departure"),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn create_marea(
    State(state): State<AppState>,
    ctx: VesselCtx,
    Json(data): Json<MareaCreate>,
) -> Result<(StatusCode, Json<MareaResponse>)> {
    ctx.require(Resource::Mareas, Operation::Create)?;

    if let Some(return_date) = data.return_date {
        if return_date < data.departure_date {
            return Err(Error::BadRequest {
                message: "return_date cannot precede departure_date".to_string(),
            });
        }
    }

    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let marea = Mareas::new(&mut conn)
        .create(&MareaCreateDBRequest {
            vessel_id: ctx.vessel_id,
            name: data.name,
            departure_date: data.departure_date,
            return_date: data.return_date,
            notes: data.notes,
        })
        .await?;

    super::record_audit(
        &mut conn,
        Some(ctx.vessel_id),
        ctx.user.id,
        "marea",
        marea.id.to_string(),
        AuditAction::Create,
        None,
    )
    .await?;

    Ok((StatusCode::CREATED, Json(MareaResponse::from(marea))))
}

/// Get a marea
#[utoipa::path(
    get,
    path = "/api/v1/vessels/{vessel_id}/mareas/{marea_id}",
    tag = "mareas",
    params(
        ("vessel_id" = String, Path, description = "Vessel ID"),
        ("marea_id" = String, Path, description = "Marea ID"),
    ),
    responses(
        (status = 200, description = "Marea details", body = MareaResponse),
        (status = 404, description = "Marea not found"),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn get_marea(
    State(state): State<AppState>,
    ctx: VesselCtx,
    Path((_vessel_id, marea_id)): Path<(Uuid, MareaId)>,
) -> Result<Json<MareaResponse>> {
    ctx.require(Resource::Mareas, Operation::Read)?;

    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let marea = Mareas::new(&mut conn)
        .get_by_id((ctx.vessel_id, marea_id))
        .await?
        .ok_or_else(|| marea_not_found(marea_id))?;

    Ok(Json(MareaResponse::from(marea)))
}

/// Update a marea
#[utoipa::path(
    patch,
    path = "/api/v1/vessels/{vessel_id}/mareas/{marea_id}",
    tag = "mareas",
    params(
        ("vessel_id" = String, Path, description = "Vessel ID"),
        ("marea_id" = String, Path, description = "Marea ID"),
    ),
    request_body = MareaUpdate,
    responses(
        (status = 200, description = "Marea updated", body = MareaResponse),
        (status = 404, description = "Marea not found"),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn update_marea(
    State(state): State<AppState>,
    ctx: VesselCtx,
    Path((_vessel_id, marea_id)): Path<(Uuid, MareaId)>,
    Json(data): Json<MareaUpdate>,
) -> Result<Json<MareaResponse>> {
    ctx.require(Resource::Mareas, Operation::Update)?;

    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let marea = Mareas::new(&mut conn)
        .update(
            (ctx.vessel_id, marea_id),
            &MareaUpdateDBRequest {
                name: data.name,
                departure_date: data.departure_date,
                return_date: data.return_date,
                notes: data.notes,
            },
        )
        .await?;

    super::record_audit(
        &mut conn,
        Some(ctx.vessel_id),
        ctx.user.id,
        "marea",
        marea_id.to_string(),
        AuditAction::Update,
        None,
    )
    .await?;

    Ok(Json(MareaResponse::from(marea)))
}

/// Soft-delete a marea
#[utoipa::path(
    delete,
    path = "/api/v1/vessels/{vessel_id}/mareas/{marea_id}",
    tag = "mareas",
    params(
        ("vessel_id" = String, Path, description = "Vessel ID"),
        ("marea_id" = String, Path, description = "Marea ID"),
    ),
    responses(
        (status = 204, description = "Marea deleted"),
        (status = 400, description = "Marea still has live movements"),
        (status = 404, description = "Marea not found"),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn delete_marea(
    State(state): State<AppState>,
    ctx: VesselCtx,
    Path((_vessel_id, marea_id)): Path<(Uuid, MareaId)>,
) -> Result<StatusCode> {
    ctx.require(Resource::Mareas, Operation::Delete)?;

    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = Mareas::new(&mut conn);

    let totals = repo.totals(ctx.vessel_id, marea_id).await?;
    if totals.movement_count > 0 {
        return Err(Error::BadRequest {
            message: format!(
                "Marea still has {} live movements; detach or delete them first",
                totals.movement_count
            ),
        });
    }

    let deleted = repo.delete((ctx.vessel_id, marea_id)).await?;
    if !deleted {
        return Err(marea_not_found(marea_id));
    }

    super::record_audit(
        &mut conn,
        Some(ctx.vessel_id),
        ctx.user.id,
        "marea",
        marea_id.to_string(),
        AuditAction::SoftDelete,
        None,
    )
    .await?;

    Ok(StatusCode::NO_CONTENT)
}

/// Close a marea; movements can no longer be attached
#[utoipa::path(
    post,
    path = "/api/v1/vessels/{vessel_id}/mareas/{marea_id}/close",
    tag = "mareas",
    params(
        ("vessel_id" = String, Path, description = "Vessel ID"),
        ("marea_id" = String, Path, description = "Marea ID"),
    ),
    request_body = MareaUpdate,
    responses(
        (status = 200, description = "Marea closed", body = MareaResponse),
        (status = 400, description = "No return date, or marea already closed"),
        (status = 404, description = "Marea not found"),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn close_marea(
    State(state): State<AppState>,
    ctx: VesselCtx,
    Path((_vessel_id, marea_id)): Path<(Uuid, MareaId)>,
    Json(data): Json<MareaUpdate>,
) -> Result<Json<MareaResponse>> {
    ctx.require(Resource::Mareas, Operation::Update)?;

    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = Mareas::new(&mut conn);

    let existing = repo
        .get_by_id((ctx.vessel_id, marea_id))
        .await?
        .ok_or_else(|| marea_not_found(marea_id))?;

    let return_date = data.return_date.flatten();
    if existing.return_date.is_none() && return_date.is_none() {
        return Err(Error::BadRequest {
            message: "A marea needs a return_date before it can be closed".to_string(),
        });
    }
    if let Some(return_date) = return_date {
        if return_date < existing.departure_date {
            return Err(Error::BadRequest {
                message: "return_date cannot precede departure_date".to_string(),
            });
        }
    }

    let marea = repo
        .close(ctx.vessel_id, marea_id, return_date)
        .await
        .map_err(|err| match err {
            crate::db::errors::DbError::NotFound => Error::BadRequest {
                message: "Marea is already closed".to_string(),
            },
            other => Error::Database(other),
        })?;

    super::record_audit(
        &mut conn,
        Some(ctx.vessel_id),
        ctx.user.id,
        "marea",
        marea_id.to_string(),
        AuditAction::Close,
        None,
    )
    .await?;

    Ok(Json(MareaResponse::from(marea)))
}

/// Reopen a closed marea
#[utoipa::path(
    post,
    path = "/api/v1/vessels/{vessel_id}/mareas/{marea_id}/reopen",
    tag = "mareas",
    params(
        ("vessel_id" = String, Path, description = "Vessel ID"),
        ("marea_id" = String, Path, description = "Marea ID"),
    ),
    responses(
        (status = 200, description = "Marea reopened", body = MareaResponse),
        (status = 400, description = "Marea is not closed"),
        (status = 404, description = "Marea not found"),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn reopen_marea(
    State(state): State<AppState>,
    ctx: VesselCtx,
    Path((_vessel_id, marea_id)): Path<(Uuid, MareaId)>,
) -> Result<Json<MareaResponse>> {
    ctx.require(Resource::Mareas, Operation::Update)?;

    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = Mareas::new(&mut conn);

    if repo.get_by_id((ctx.vessel_id, marea_id)).await?.is_none() {
        return Err(marea_not_found(marea_id));
    }

    let marea = repo
        .reopen(ctx.vessel_id, marea_id)
        .await
        .map_err(|err| match err {
            crate::db::errors::DbError::NotFound => Error::BadRequest {
                message: "Marea is not closed".to_string(),
            },
            other => Error::Database(other),
        })?;

    super::record_audit(
        &mut conn,
        Some(ctx.vessel_id),
        ctx.user.id,
        "marea",
        marea_id.to_string(),
        AuditAction::Reopen,
        None,
    )
    .await?;

    Ok(Json(MareaResponse::from(marea)))
}

/// Income/expense totals of the marea
#[utoipa::path(
    get,
    path = "/api/v1/vessels/{vessel_id}/mareas/{marea_id}/totals",
    tag = "mareas",
    params(
        ("vessel_id" = String, Path, description = "Vessel ID"),
        ("marea_id" = String, Path, description = "Marea ID"),
    ),
    responses(
        (status = 200, description = "Marea totals", body = MareaTotalsResponse),
        (status = 404, description = "Marea not found"),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn get_totals(
    State(state): State<AppState>,
    ctx: VesselCtx,
    Path((_vessel_id, marea_id)): Path<(Uuid, MareaId)>,
) -> Result<Json<MareaTotalsResponse>> {
    ctx.require(Resource::Mareas, Operation::Read)?;

    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = Mareas::new(&mut conn);

    if repo.get_by_id((ctx.vessel_id, marea_id)).await?.is_none() {
        return Err(marea_not_found(marea_id));
    }
    let totals = repo.totals(ctx.vessel_id, marea_id).await?;

    Ok(Json(MareaTotalsResponse::from_totals(marea_id, totals)))
}

/// Evaluate a distribution profile against the marea's totals
#[utoipa::path(
    get,
    path = "/api/v1/vessels/{vessel_id}/mareas/{marea_id}/distribution",
    tag = "mareas",
    params(
        ("vessel_id" = String, Path, description = "Vessel ID"),
        ("marea_id" = String, Path, description = "Marea ID"),
        DistributionQuery,
    ),
    responses(
        (status = 200, description = "Distribution result", body = DistributionResponse),
        (status = 400, description = "No profile given and no vessel default, or the profile is invalid"),
        (status = 404, description = "Marea or profile not found"),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn get_distribution(
    State(state): State<AppState>,
    ctx: VesselCtx,
    Path((_vessel_id, marea_id)): Path<(Uuid, MareaId)>,
    Query(query): Query<DistributionQuery>,
) -> Result<Json<DistributionResponse>> {
    ctx.require(Resource::Mareas, Operation::Read)?;

    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut mareas = Mareas::new(&mut conn);

    if mareas.get_by_id((ctx.vessel_id, marea_id)).await?.is_none() {
        return Err(marea_not_found(marea_id));
    }
    let totals = mareas.totals(ctx.vessel_id, marea_id).await?;

    // Explicit profile, or the vessel's configured default
    let profile_id: ProfileId = match query.profile_id {
        Some(profile_id) => profile_id,
        None => Vessels::new(&mut conn)
            .get_settings(ctx.vessel_id)
            .await?
            .and_then(|settings| settings.default_profile_id)
            .ok_or_else(|| Error::BadRequest {
                message: "No profile_id given and the vessel has no default profile".to_string(),
            })?,
    };

    let mut profiles = Profiles::new(&mut conn);
    if profiles.get_by_id((ctx.vessel_id, profile_id)).await?.is_none() {
        return Err(Error::NotFound {
            resource: "Distribution profile".to_string(),
            id: profile_id.to_string(),
        });
    }
    let items = profiles.list_items(profile_id).await?;

    let outcome = distribution::evaluate(
        &items,
        DistributionInput {
            gross_income_cents: totals.gross_income_cents,
            total_expense_cents: totals.total_expense_cents,
        },
    )
    .map_err(|err| Error::BadRequest {
        message: format!("Profile cannot be evaluated: {err}"),
    })?;

    Ok(Json(DistributionResponse::from_outcome(marea_id, profile_id, outcome)))
}

fn marea_not_found(marea_id: MareaId) -> Error {
    Error::NotFound {
        resource: "Marea".to_string(),
        id: marea_id.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use crate::api::models::mareas::{DistributionResponse, MareaResponse, MareaTotalsResponse};
    use crate::test_utils::{
        auth_header, create_test_account_http, create_test_app, create_test_user,
        create_test_vessel,
    };
    use serde_json::json;

    async fn post_movement(
        app: &axum_test::TestServer,
        user: &crate::test_utils::TestUser,
        vessel: uuid::Uuid,
        account: uuid::Uuid,
        marea: uuid::Uuid,
        kind: &str,
        amount_cents: i64,
    ) {
        let (name, value) = auth_header(user);
        app.post(&format!("/api/v1/vessels/{vessel}/movements"))
            .add_header(name, value)
            .json(&json!({
                "kind": kind,
                "account_id": account,
                "marea_id": marea,
                "occurred_on": "2026-05-03",
                "description": "m",
                "amount_cents": amount_cents,
                "vat_rate_bp": 0
            }))
            .await
            .assert_status(axum::http::StatusCode::CREATED);
    }

    #[test_log::test(tokio::test)]
    async fn test_marea_lifecycle_and_totals() {
        let (app, pool) = create_test_app().await;
        let owner = create_test_user(&pool, "owner@example.com", false).await;
        let vessel = create_test_vessel(&app, &owner).await;
        let account = create_test_account_http(&app, &owner, vessel).await;

        let (name, value) = auth_header(&owner);
        let response = app
            .post(&format!("/api/v1/vessels/{vessel}/mareas"))
            .add_header(name.clone(), value.clone())
            .json(&json!({ "name": "Spring trip", "departure_date": "2026-05-01" }))
            .await;
        response.assert_status(axum::http::StatusCode::CREATED);
        let marea: MareaResponse = response.json();

        post_movement(&app, &owner, vessel, account, marea.id, "income", 100_000).await;
        post_movement(&app, &owner, vessel, account, marea.id, "expense", 40_000).await;

        let response = app
            .get(&format!("/api/v1/vessels/{vessel}/mareas/{}/totals", marea.id))
            .add_header(name.clone(), value.clone())
            .await;
        response.assert_status_ok();
        let totals: MareaTotalsResponse = response.json();
        assert_eq!(totals.gross_income_cents, 100_000);
        assert_eq!(totals.total_expense_cents, 40_000);
        assert_eq!(totals.net_result_cents, 60_000);

        // Close without a return date fails; with one it succeeds
        let response = app
            .post(&format!("/api/v1/vessels/{vessel}/mareas/{}/close", marea.id))
            .add_header(name.clone(), value.clone())
            .json(&json!({}))
            .await;
        response.assert_status_bad_request();

        let response = app
            .post(&format!("/api/v1/vessels/{vessel}/mareas/{}/close", marea.id))
            .add_header(name.clone(), value.clone())
            .json(&json!({ "return_date": "2026-05-10" }))
            .await;
        response.assert_status_ok();

        // Closed mareas reject new movement attachments
        let response = app
            .post(&format!("/api/v1/vessels/{vessel}/movements"))
            .add_header(name, value)
            .json(&json!({
                "kind": "income",
                "account_id": account,
                "marea_id": marea.id,
                "occurred_on": "2026-05-11",
                "description": "late",
                "amount_cents": 1000
            }))
            .await;
        response.assert_status_bad_request();
    }

    #[test_log::test(tokio::test)]
    async fn test_distribution_end_to_end() {
        let (app, pool) = create_test_app().await;
        let owner = create_test_user(&pool, "owner@example.com", false).await;
        let vessel = create_test_vessel(&app, &owner).await;
        let account = create_test_account_http(&app, &owner, vessel).await;
        let (name, value) = auth_header(&owner);

        let marea: MareaResponse = app
            .post(&format!("/api/v1/vessels/{vessel}/mareas"))
            .add_header(name.clone(), value.clone())
            .json(&json!({ "name": "Trip", "departure_date": "2026-05-01" }))
            .await
            .json();
        post_movement(&app, &owner, vessel, account, marea.id, "income", 1_000_000).await;
        post_movement(&app, &owner, vessel, account, marea.id, "expense", 400_000).await;

        // Profile: net result, halved for the crew pool, split into 3 parts
        let profile: crate::api::models::profiles::ProfileResponse = app
            .post(&format!("/api/v1/vessels/{vessel}/profiles"))
            .add_header(name.clone(), value.clone())
            .json(&json!({ "name": "Thirds" }))
            .await
            .json();
        for body in [
            json!({ "order_index": 1, "label": "net", "operation": "set", "source": "net_result", "value_kind": "amount", "value": 0 }),
            json!({ "order_index": 2, "label": "crew pool", "operation": "multiply", "source": "net_result", "value_kind": "factor", "value": 5000, "is_payout": true }),
            json!({ "order_index": 3, "label": "per part", "operation": "divide", "source": "net_result", "value_kind": "factor", "value": 3, "is_payout": true }),
        ] {
            let response = app
                .post(&format!("/api/v1/vessels/{vessel}/profiles/{}/items", profile.id))
                .add_header(name.clone(), value.clone())
                .json(&body)
                .await;
            response.assert_status(axum::http::StatusCode::CREATED);
        }

        let response = app
            .get(&format!(
                "/api/v1/vessels/{vessel}/mareas/{}/distribution?profile_id={}",
                marea.id, profile.id
            ))
            .add_header(name, value)
            .await;
        response.assert_status_ok();
        let distribution: DistributionResponse = response.json();
        assert_eq!(distribution.net_result_cents, 600_000);
        assert_eq!(distribution.lines.len(), 3);
        assert_eq!(distribution.lines[1].amount_cents, 300_000);
        assert_eq!(distribution.lines[2].amount_cents, 100_000);
        assert!(distribution.lines[2].is_payout);
    }
}
