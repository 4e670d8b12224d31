//! HTTP handler for reading the audit log.

use axum::{
    Json,
    extract::{Query, State},
};

use crate::{
    AppState,
    api::models::{
        audit::{AuditEntryResponse, ListAuditQuery},
        pagination::PaginatedResponse,
    },
    auth::permissions::VesselCtx,
    db::handlers::{AuditLog, audit::AuditFilter},
    errors::{Error, Result},
    types::{Operation, Resource},
};

/// List the vessel's audit trail, newest first
#[utoipa::path(
    get,
    path = "/api/v1/vessels/{vessel_id}/audit-log",
    tag = "audit",
    params(("vessel_id" = String, Path, description = "Vessel ID"), ListAuditQuery),
    responses(
        (status = 200, description = "Paginated audit entries", body = PaginatedResponse<AuditEntryResponse>),
        (status = 403, description = "Insufficient permissions"),
        (status = 404, description = "Vessel not found"),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn list_audit_log(
    State(state): State<AppState>,
    ctx: VesselCtx,
    Query(query): Query<ListAuditQuery>,
) -> Result<Json<PaginatedResponse<AuditEntryResponse>>> {
    ctx.require(Resource::AuditLog, Operation::Read)?;

    let (skip, limit) = (query.pagination.skip(), query.pagination.limit());
    let filter = AuditFilter {
        vessel_id: ctx.vessel_id,
        skip,
        limit,
        entity_type: query.entity_type,
        action: query.action,
    };

    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = AuditLog::new(&mut conn);
    let entries = repo.list(&filter).await?;
    let total_count = repo.count(&filter).await?;

    Ok(Json(PaginatedResponse::new(
        entries.into_iter().map(AuditEntryResponse::from).collect(),
        total_count,
        skip,
        limit,
    )))
}
