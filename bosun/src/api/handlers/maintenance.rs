//! HTTP handlers for maintenance records.

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use uuid::Uuid;

use crate::{
    AppState,
    api::models::{
        maintenance::{
            ListMaintenanceQuery, MaintenanceCreate, MaintenanceResponse, MaintenanceUpdate,
        },
        pagination::PaginatedResponse,
    },
    auth::permissions::VesselCtx,
    db::{
        handlers::{Maintenance, Movements, Repository, maintenance::MaintenanceFilter},
        models::{
            audit::AuditAction,
            maintenance::{MaintenanceCreateDBRequest, MaintenanceUpdateDBRequest},
        },
    },
    errors::{Error, Result},
    types::{Operation, Resource},
};

async fn validate_supplier(
    conn: &mut sqlx::SqliteConnection,
    ctx: &VesselCtx,
    supplier_id: Option<Uuid>,
) -> Result<()> {
    if let Some(supplier_id) = supplier_id {
        if !Movements::new(conn).supplier_exists(ctx.vessel_id, supplier_id).await? {
            return Err(Error::BadRequest {
                message: "Unknown supplier".to_string(),
            });
        }
    }
    Ok(())
}

/// List maintenance records
#[utoipa::path(
    get,
    path = "/api/v1/vessels/{vessel_id}/maintenance",
    tag = "maintenance",
    params(("vessel_id" = String, Path, description = "Vessel ID"), ListMaintenanceQuery),
    responses(
        (status = 200, description = "Paginated list of records", body = PaginatedResponse<MaintenanceResponse>),
        (status = 404, description = "Vessel not found"),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn list_maintenance(
    State(state): State<AppState>,
    ctx: VesselCtx,
    Query(query): Query<ListMaintenanceQuery>,
) -> Result<Json<PaginatedResponse<MaintenanceResponse>>> {
    ctx.require(Resource::Maintenance, Operation::Read)?;

    let (skip, limit) = (query.pagination.skip(), query.pagination.limit());
    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = Maintenance::new(&mut conn);
    let records = repo
        .list(&MaintenanceFilter {
            vessel_id: ctx.vessel_id,
            skip,
            limit,
        })
        .await?;
    let total_count = repo.count(ctx.vessel_id).await?;

    Ok(Json(PaginatedResponse::new(
        records.into_iter().map(MaintenanceResponse::from).collect(),
        total_count,
        skip,
        limit,
    )))
}

/// Record maintenance work
#[utoipa::path(
    post,
    path = "/api/v1/vessels/{vessel_id}/maintenance",
    tag = "maintenance",
    params(("vessel_id" = String, Path, description = "Vessel ID")),
    request_body = MaintenanceCreate,
    responses(
        (status = 201, description = "Record created", body = MaintenanceResponse),
        (status = 400, description = "Validation failure"),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn create_maintenance(
    State(state): State<AppState>,
    ctx: VesselCtx,
    Json(data): Json<MaintenanceCreate>,
) -> Result<(StatusCode, Json<MaintenanceResponse>)> {
    ctx.require(Resource::Maintenance, Operation::Create)?;

    if data.cost_cents < 0 {
        return Err(Error::BadRequest {
            message: "cost_cents must not be negative".to_string(),
        });
    }

    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    validate_supplier(&mut conn, &ctx, data.supplier_id).await?;

    let record = Maintenance::new(&mut conn)
        .create(&MaintenanceCreateDBRequest {
            vessel_id: ctx.vessel_id,
            supplier_id: data.supplier_id,
            title: data.title,
            description: data.description,
            performed_on: data.performed_on,
            cost_cents: data.cost_cents,
            next_due_on: data.next_due_on,
        })
        .await?;

    super::record_audit(
        &mut conn,
        Some(ctx.vessel_id),
        ctx.user.id,
        "maintenance_record",
        record.id.to_string(),
        AuditAction::Create,
        None,
    )
    .await?;

    Ok((StatusCode::CREATED, Json(MaintenanceResponse::from(record))))
}

/// Get a maintenance record
#[utoipa::path(
    get,
    path = "/api/v1/vessels/{vessel_id}/maintenance/{record_id}",
    tag = "maintenance",
    params(
        ("vessel_id" = String, Path, description = "Vessel ID"),
        ("record_id" = String, Path, description = "Record ID"),
    ),
    responses(
        (status = 200, description = "Record details", body = MaintenanceResponse),
        (status = 404, description = "Record not found"),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn get_maintenance(
    State(state): State<AppState>,
    ctx: VesselCtx,
    Path((_vessel_id, record_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<MaintenanceResponse>> {
    ctx.require(Resource::Maintenance, Operation::Read)?;

    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let record = Maintenance::new(&mut conn)
        .get_by_id((ctx.vessel_id, record_id))
        .await?
        .ok_or_else(|| record_not_found(record_id))?;

    Ok(Json(MaintenanceResponse::from(record)))
}

/// Update a maintenance record
#[utoipa::path(
    patch,
    path = "/api/v1/vessels/{vessel_id}/maintenance/{record_id}",
    tag = "maintenance",
    params(
        ("vessel_id" = String, Path, description = "Vessel ID"),
        ("record_id" = String, Path, description = "Record ID"),
    ),
    request_body = MaintenanceUpdate,
    responses(
        (status = 200, description = "Record updated", body = MaintenanceResponse),
        (status = 404, description = "Record not found"),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn update_maintenance(
    State(state): State<AppState>,
    ctx: VesselCtx,
    Path((_vessel_id, record_id)): Path<(Uuid, Uuid)>,
    Json(data): Json<MaintenanceUpdate>,
) -> Result<Json<MaintenanceResponse>> {
    ctx.require(Resource::Maintenance, Operation::Update)?;

    if let Some(cost_cents) = data.cost_cents {
        if cost_cents < 0 {
            return Err(Error::BadRequest {
                message: "cost_cents must not be negative".to_string(),
            });
        }
    }

    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    if let Some(supplier_id) = data.supplier_id {
        validate_supplier(&mut conn, &ctx, supplier_id).await?;
    }

    let record = Maintenance::new(&mut conn)
        .update(
            (ctx.vessel_id, record_id),
            &MaintenanceUpdateDBRequest {
                supplier_id: data.supplier_id,
                title: data.title,
                description: data.description,
                performed_on: data.performed_on,
                cost_cents: data.cost_cents,
                next_due_on: data.next_due_on,
            },
        )
        .await?;

    super::record_audit(
        &mut conn,
        Some(ctx.vessel_id),
        ctx.user.id,
        "maintenance_record",
        record_id.to_string(),
        AuditAction::Update,
        None,
    )
    .await?;

    Ok(Json(MaintenanceResponse::from(record)))
}

/// Soft-delete a maintenance record
#[utoipa::path(
    delete,
    path = "/api/v1/vessels/{vessel_id}/maintenance/{record_id}",
    tag = "maintenance",
    params(
        ("vessel_id" = String, Path, description = "Vessel ID"),
        ("record_id" = String, Path, description = "Record ID"),
    ),
    responses(
        (status = 204, description = "Record deleted"),
        (status = 404, description = "Record not found"),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn delete_maintenance(
    State(state): State<AppState>,
    ctx: VesselCtx,
    Path((_vessel_id, record_id)): Path<(Uuid, Uuid)>,
) -> Result<StatusCode> {
    ctx.require(Resource::Maintenance, Operation::Delete)?;

    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let deleted = Maintenance::new(&mut conn)
        .delete((ctx.vessel_id, record_id))
        .await?;
    if !deleted {
        return Err(record_not_found(record_id));
    }

    super::record_audit(
        &mut conn,
        Some(ctx.vessel_id),
        ctx.user.id,
        "maintenance_record",
        record_id.to_string(),
        AuditAction::SoftDelete,
        None,
    )
    .await?;

    Ok(StatusCode::NO_CONTENT)
}

fn record_not_found(record_id: Uuid) -> Error {
    Error::NotFound {
        resource: "Maintenance record".to_string(),
        id: record_id.to_string(),
    }
}
