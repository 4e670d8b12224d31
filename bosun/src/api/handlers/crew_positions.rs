//! HTTP handlers for crew positions.

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use uuid::Uuid;

use crate::{
    AppState,
    api::models::{
        crew::{PositionCreate, PositionResponse, PositionUpdate},
        pagination::{PaginatedResponse, Pagination},
    },
    auth::permissions::VesselCtx,
    db::{
        handlers::{CrewPositions, Repository, crew_positions::PositionFilter},
        models::{audit::AuditAction, crew::{PositionCreateDBRequest, PositionUpdateDBRequest}},
    },
    errors::{Error, Result},
    types::{Operation, PositionId, Resource},
};

/// List crew positions
#[utoipa::path(
    get,
    path = "/api/v1/vessels/{vessel_id}/crew-positions",
    tag = "crew-positions",
    params(("vessel_id" = String, Path, description = "Vessel ID"), Pagination),
    responses(
        (status = 200, description = "Paginated list of positions", body = PaginatedResponse<PositionResponse>),
        (status = 404, description = "Vessel not found"),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn list_positions(
    State(state): State<AppState>,
    ctx: VesselCtx,
    Query(pagination): Query<Pagination>,
) -> Result<Json<PaginatedResponse<PositionResponse>>> {
    ctx.require(Resource::CrewPositions, Operation::Read)?;

    let (skip, limit) = (pagination.skip(), pagination.limit());
    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = CrewPositions::new(&mut conn);
    let positions = repo
        .list(&PositionFilter {
            vessel_id: ctx.vessel_id,
            skip,
            limit,
        })
        .await?;
    let total_count = repo.count(ctx.vessel_id).await?;

    Ok(Json(PaginatedResponse::new(
        positions.into_iter().map(PositionResponse::from).collect(),
        total_count,
        skip,
        limit,
    )))
}

/// Create a crew position
#[utoipa::path(
    post,
    path = "/api/v1/vessels/{vessel_id}/crew-positions",
    tag = "crew-positions",
    params(("vessel_id" = String, Path, description = "Vessel ID")),
    request_body = PositionCreate,
    responses(
        (status = 201, description = "Position created", body = PositionResponse),
        (status = 409, description = "Name already in use"),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn create_position(
    State(state): State<AppState>,
    ctx: VesselCtx,
    Json(data): Json<PositionCreate>,
) -> Result<(StatusCode, Json<PositionResponse>)> {
    ctx.require(Resource::CrewPositions, Operation::Create)?;

    if data.default_parts < 0 {
        return Err(Error::BadRequest {
            message: "default_parts must not be negative".to_string(),
        });
    }

    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let position = CrewPositions::new(&mut conn)
        .create(&PositionCreateDBRequest {
            vessel_id: ctx.vessel_id,
            name: data.name,
            default_parts: data.default_parts,
        })
        .await?;

    super::record_audit(
        &mut conn,
        Some(ctx.vessel_id),
        ctx.user.id,
        "crew_position",
        position.id.to_string(),
        AuditAction::Create,
        None,
    )
    .await?;

    Ok((StatusCode::CREATED, Json(PositionResponse::from(position))))
}

/// Get a crew position
#[utoipa::path(
    get,
    path = "/api/v1/vessels/{vessel_id}/crew-positions/{position_id}",
    tag = "crew-positions",
    params(
        ("vessel_id" = String, Path, description = "Vessel ID"),
        ("position_id" = String, Path, description = "Position ID"),
    ),
    responses(
        (status = 200, description = "Position details", body = PositionResponse),
        (status = 404, description = "Position not found"),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn get_position(
    State(state): State<AppState>,
    ctx: VesselCtx,
    Path((_vessel_id, position_id)): Path<(Uuid, PositionId)>,
) -> Result<Json<PositionResponse>> {
    ctx.require(Resource::CrewPositions, Operation::Read)?;

    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let position = CrewPositions::new(&mut conn)
        .get_by_id((ctx.vessel_id, position_id))
        .await?
        .ok_or_else(|| position_not_found(position_id))?;

    Ok(Json(PositionResponse::from(position)))
}

/// Update a crew position
#[utoipa::path(
    patch,
    path = "/api/v1/vessels/{vessel_id}/crew-positions/{position_id}",
    tag = "crew-positions",
    params(
        ("vessel_id" = String, Path, description = "Vessel ID"),
        ("position_id" = String, Path, description = "Position ID"),
    ),
    request_body = PositionUpdate,
    responses(
        (status = 200, description = "Position updated", body = PositionResponse),
        (status = 404, description = "Position not found"),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn update_position(
    State(state): State<AppState>,
    ctx: VesselCtx,
    Path((_vessel_id, position_id)): Path<(Uuid, PositionId)>,
    Json(data): Json<PositionUpdate>,
) -> Result<Json<PositionResponse>> {
    ctx.require(Resource::CrewPositions, Operation::Update)?;

    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let position = CrewPositions::new(&mut conn)
        .update(
            (ctx.vessel_id, position_id),
            &PositionUpdateDBRequest {
                name: data.name,
                default_parts: data.default_parts,
            },
        )
        .await?;

    super::record_audit(
        &mut conn,
        Some(ctx.vessel_id),
        ctx.user.id,
        "crew_position",
        position_id.to_string(),
        AuditAction::Update,
        None,
    )
    .await?;

    Ok(Json(PositionResponse::from(position)))
}

/// Soft-delete a crew position
#[utoipa::path(
    delete,
    path = "/api/v1/vessels/{vessel_id}/crew-positions/{position_id}",
    tag = "crew-positions",
    params(
        ("vessel_id" = String, Path, description = "Vessel ID"),
        ("position_id" = String, Path, description = "Position ID"),
    ),
    responses(
        (status = 204, description = "Position deleted"),
        (status = 404, description = "Position not found"),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn delete_position(
    State(state): State<AppState>,
    ctx: VesselCtx,
    Path((_vessel_id, position_id)): Path<(Uuid, PositionId)>,
) -> Result<StatusCode> {
    ctx.require(Resource::CrewPositions, Operation::Delete)?;

    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let deleted = CrewPositions::new(&mut conn)
        .delete((ctx.vessel_id, position_id))
        .await?;
    if !deleted {
        return Err(position_not_found(position_id));
    }

    super::record_audit(
        &mut conn,
        Some(ctx.vessel_id),
        ctx.user.id,
        "crew_position",
        position_id.to_string(),
        AuditAction::SoftDelete,
        None,
    )
    .await?;

    Ok(StatusCode::NO_CONTENT)
}

fn position_not_found(position_id: PositionId) -> Error {
    Error::NotFound {
        resource: "Crew position".to_string(),
        id: position_id.to_string(),
    }
}
