//! HTTP handlers for the recycle bin.

use axum::{
    Json,
    extract::{Query, State},
    http::StatusCode,
};

use crate::{
    AppState,
    api::models::{
        pagination::PaginatedResponse,
        recycle_bin::{
            DeletedEntityResponse, ListRecycleBinQuery, RecycleBinRequest,
        },
    },
    auth::permissions::VesselCtx,
    db::handlers::RecycleBin,
    db::models::audit::AuditAction,
    errors::{Error, Result},
    types::{Operation, Resource},
};

/// List soft-deleted rows across all entity types
#[utoipa::path(
    get,
    path = "/api/v1/vessels/{vessel_id}/recycle-bin",
    tag = "recycle-bin",
    params(("vessel_id" = String, Path, description = "Vessel ID"), ListRecycleBinQuery),
    responses(
        (status = 200, description = "Deleted rows, newest first", body = PaginatedResponse<DeletedEntityResponse>),
        (status = 404, description = "Vessel not found"),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn list_recycle_bin(
    State(state): State<AppState>,
    ctx: VesselCtx,
    Query(query): Query<ListRecycleBinQuery>,
) -> Result<Json<PaginatedResponse<DeletedEntityResponse>>> {
    ctx.require(Resource::RecycleBin, Operation::Read)?;

    let (skip, limit) = (query.pagination.skip(), query.pagination.limit());
    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = RecycleBin::new(&mut conn);
    let rows = repo.list(ctx.vessel_id, skip, limit).await?;
    let total_count = repo.count(ctx.vessel_id).await?;

    let data = rows
        .into_iter()
        .map(|row| DeletedEntityResponse {
            entity_type: row.entity_type,
            id: row.id,
            label: row.label,
            deleted_at: row.deleted_at,
        })
        .collect();

    Ok(Json(PaginatedResponse::new(data, total_count, skip, limit)))
}

/// Restore a soft-deleted row
#[utoipa::path(
    post,
    path = "/api/v1/vessels/{vessel_id}/recycle-bin/restore",
    tag = "recycle-bin",
    params(("vessel_id" = String, Path, description = "Vessel ID")),
    request_body = RecycleBinRequest,
    responses(
        (status = 200, description = "Row restored"),
        (status = 400, description = "A parent row is still deleted"),
        (status = 404, description = "Nothing to restore"),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn restore_entity(
    State(state): State<AppState>,
    ctx: VesselCtx,
    Json(request): Json<RecycleBinRequest>,
) -> Result<StatusCode> {
    ctx.require(Resource::RecycleBin, Operation::Restore)?;

    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let restored = RecycleBin::new(&mut conn)
        .restore(ctx.vessel_id, request.entity_type, request.id)
        .await?;
    if !restored {
        return Err(Error::NotFound {
            resource: "Deleted entity".to_string(),
            id: request.id.to_string(),
        });
    }

    super::record_audit(
        &mut conn,
        Some(ctx.vessel_id),
        ctx.user.id,
        entity_type_name(&request),
        request.id.to_string(),
        AuditAction::Restore,
        None,
    )
    .await?;

    Ok(StatusCode::OK)
}

/// Hard-delete a soft-deleted row
#[utoipa::path(
    post,
    path = "/api/v1/vessels/{vessel_id}/recycle-bin/purge",
    tag = "recycle-bin",
    params(("vessel_id" = String, Path, description = "Vessel ID")),
    request_body = RecycleBinRequest,
    responses(
        (status = 204, description = "Row purged"),
        (status = 400, description = "Row still referenced by live data"),
        (status = 404, description = "Nothing to purge"),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn purge_entity(
    State(state): State<AppState>,
    ctx: VesselCtx,
    Json(request): Json<RecycleBinRequest>,
) -> Result<StatusCode> {
    ctx.require(Resource::RecycleBin, Operation::Delete)?;

    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let purged = RecycleBin::new(&mut conn)
        .purge(ctx.vessel_id, request.entity_type, request.id)
        .await?;
    if !purged {
        return Err(Error::NotFound {
            resource: "Deleted entity".to_string(),
            id: request.id.to_string(),
        });
    }

    super::record_audit(
        &mut conn,
        Some(ctx.vessel_id),
        ctx.user.id,
        entity_type_name(&request),
        request.id.to_string(),
        AuditAction::Purge,
        None,
    )
    .await?;

    Ok(StatusCode::NO_CONTENT)
}

fn entity_type_name(request: &RecycleBinRequest) -> &'static str {
    // Audit entries use the singular table-row name, same as the other handlers
    match request.entity_type {
        crate::api::models::recycle_bin::DeletedEntityType::Supplier => "supplier",
        crate::api::models::recycle_bin::DeletedEntityType::BankAccount => "bank_account",
        crate::api::models::recycle_bin::DeletedEntityType::Category => "category",
        crate::api::models::recycle_bin::DeletedEntityType::Movement => "movement",
        crate::api::models::recycle_bin::DeletedEntityType::Marea => "marea",
        crate::api::models::recycle_bin::DeletedEntityType::DistributionProfile => "distribution_profile",
        crate::api::models::recycle_bin::DeletedEntityType::MaintenanceRecord => "maintenance_record",
        crate::api::models::recycle_bin::DeletedEntityType::CrewPosition => "crew_position",
    }
}

#[cfg(test)]
mod tests {
    use crate::api::models::{
        pagination::PaginatedResponse, recycle_bin::DeletedEntityResponse,
        suppliers::SupplierResponse,
    };
    use crate::test_utils::{auth_header, create_test_app, create_test_user, create_test_vessel};
    use serde_json::json;

    #[test_log::test(tokio::test)]
    async fn test_delete_restore_roundtrip_over_http() {
        let (app, pool) = create_test_app().await;
        let owner = create_test_user(&pool, "owner@example.com", false).await;
        let vessel = create_test_vessel(&app, &owner).await;
        let (name, value) = auth_header(&owner);

        let supplier: SupplierResponse = app
            .post(&format!("/api/v1/vessels/{vessel}/suppliers"))
            .add_header(name.clone(), value.clone())
            .json(&json!({ "name": "Comeback" }))
            .await
            .json();

        app.delete(&format!("/api/v1/vessels/{vessel}/suppliers/{}", supplier.id))
            .add_header(name.clone(), value.clone())
            .await
            .assert_status(axum::http::StatusCode::NO_CONTENT);

        let bin: PaginatedResponse<DeletedEntityResponse> = app
            .get(&format!("/api/v1/vessels/{vessel}/recycle-bin"))
            .add_header(name.clone(), value.clone())
            .await
            .json();
        assert_eq!(bin.total_count, 1);

        app.post(&format!("/api/v1/vessels/{vessel}/recycle-bin/restore"))
            .add_header(name.clone(), value.clone())
            .json(&json!({ "entity_type": "supplier", "id": supplier.id }))
            .await
            .assert_status_ok();

        // The supplier is reachable again
        let response = app
            .get(&format!("/api/v1/vessels/{vessel}/suppliers/{}", supplier.id))
            .add_header(name, value)
            .await;
        response.assert_status_ok();
    }
}
