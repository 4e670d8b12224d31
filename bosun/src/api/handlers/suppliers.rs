//! HTTP handlers for suppliers.

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::{
    AppState,
    api::models::{
        pagination::{PaginatedResponse, Pagination},
        suppliers::{SupplierCreate, SupplierResponse, SupplierUpdate},
    },
    auth::permissions::VesselCtx,
    db::{
        handlers::{Repository, Suppliers, suppliers::SupplierFilter},
        models::{audit::AuditAction, suppliers::{SupplierCreateDBRequest, SupplierUpdateDBRequest}},
    },
    errors::{Error, Result},
    types::{Operation, Resource, SupplierId},
};

#[derive(Debug, Default, Deserialize, IntoParams, ToSchema)]
pub struct ListSuppliersQuery {
    #[serde(flatten)]
    #[param(inline)]
    pub pagination: Pagination,

    /// Case-insensitive substring match on the name
    pub search: Option<String>,
}

/// List suppliers
#[utoipa::path(
    get,
    path = "/api/v1/vessels/{vessel_id}/suppliers",
    tag = "suppliers",
    params(("vessel_id" = String, Path, description = "Vessel ID"), ListSuppliersQuery),
    responses(
        (status = 200, description = "Paginated list of suppliers", body = PaginatedResponse<SupplierResponse>),
        (status = 404, description = "Vessel not found"),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn list_suppliers(
    State(state): State<AppState>,
    ctx: VesselCtx,
    Query(query): Query<ListSuppliersQuery>,
) -> Result<Json<PaginatedResponse<SupplierResponse>>> {
    ctx.require(Resource::Suppliers, Operation::Read)?;

    let (skip, limit) = (query.pagination.skip(), query.pagination.limit());
    let filter = SupplierFilter {
        vessel_id: ctx.vessel_id,
        skip,
        limit,
        search: query.search,
    };

    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = Suppliers::new(&mut conn);
    let suppliers = repo.list(&filter).await?;
    let total_count = repo.count(&filter).await?;

    Ok(Json(PaginatedResponse::new(
        suppliers.into_iter().map(SupplierResponse::from).collect(),
        total_count,
        skip,
        limit,
    )))
}

/// Create a supplier
#[utoipa::path(
    post,
    path = "/api/v1/vessels/{vessel_id}/suppliers",
    tag = "suppliers",
    params(("vessel_id" = String, Path, description = "Vessel ID")),
    request_body = SupplierCreate,
    responses(
        (status = 201, description = "Supplier created", body = SupplierResponse),
        (status = 409, description = "Name already in use"),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn create_supplier(
    State(state): State<AppState>,
    ctx: VesselCtx,
    Json(data): Json<SupplierCreate>,
) -> Result<(StatusCode, Json<SupplierResponse>)> {
    ctx.require(Resource::Suppliers, Operation::Create)?;

    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let supplier = Suppliers::new(&mut conn)
        .create(&SupplierCreateDBRequest {
            vessel_id: ctx.vessel_id,
            name: data.name,
            tax_id: data.tax_id,
            email: data.email,
            phone: data.phone,
            notes: data.notes,
        })
        .await?;

    super::record_audit(
        &mut conn,
        Some(ctx.vessel_id),
        ctx.user.id,
        "supplier",
        supplier.id.to_string(),
        AuditAction::Create,
        None,
    )
    .await?;

    Ok((StatusCode::CREATED, Json(SupplierResponse::from(supplier))))
}

/// Get a supplier
#[utoipa::path(
    get,
    path = "/api/v1/vessels/{vessel_id}/suppliers/{supplier_id}",
    tag = "suppliers",
    params(
        ("vessel_id" = String, Path, description = "Vessel ID"),
        ("supplier_id" = String, Path, description = "Supplier ID"),
    ),
    responses(
        (status = 200, description = "Supplier details", body = SupplierResponse),
        (status = 404, description = "Supplier not found"),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn get_supplier(
    State(state): State<AppState>,
    ctx: VesselCtx,
    Path((_vessel_id, supplier_id)): Path<(Uuid, SupplierId)>,
) -> Result<Json<SupplierResponse>> {
    ctx.require(Resource::Suppliers, Operation::Read)?;

    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let supplier = Suppliers::new(&mut conn)
        .get_by_id((ctx.vessel_id, supplier_id))
        .await?
        .ok_or_else(|| supplier_not_found(supplier_id))?;

    Ok(Json(SupplierResponse::from(supplier)))
}

/// Update a supplier
#[utoipa::path(
    patch,
    path = "/api/v1/vessels/{vessel_id}/suppliers/{supplier_id}",
    tag = "suppliers",
    params(
        ("vessel_id" = String, Path, description = "Vessel ID"),
        ("supplier_id" = String, Path, description = "Supplier ID"),
    ),
    request_body = SupplierUpdate,
    responses(
        (status = 200, description = "Supplier updated", body = SupplierResponse),
        (status = 404, description = "Supplier not found"),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn update_supplier(
    State(state): State<AppState>,
    ctx: VesselCtx,
    Path((_vessel_id, supplier_id)): Path<(Uuid, SupplierId)>,
    Json(data): Json<SupplierUpdate>,
) -> Result<Json<SupplierResponse>> {
    ctx.require(Resource::Suppliers, Operation::Update)?;

    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let supplier = Suppliers::new(&mut conn)
        .update(
            (ctx.vessel_id, supplier_id),
            &SupplierUpdateDBRequest {
                name: data.name,
                tax_id: data.tax_id,
                email: data.email,
                phone: data.phone,
                notes: data.notes,
            },
        )
        .await?;

    super::record_audit(
        &mut conn,
        Some(ctx.vessel_id),
        ctx.user.id,
        "supplier",
        supplier_id.to_string(),
        AuditAction::Update,
        None,
    )
    .await?;

    Ok(Json(SupplierResponse::from(supplier)))
}

/// Soft-delete a supplier
#[utoipa::path(
    delete,
    path = "/api/v1/vessels/{vessel_id}/suppliers/{supplier_id}",
    tag = "suppliers",
    params(
        ("vessel_id" = String, Path, description = "Vessel ID"),
        ("supplier_id" = String, Path, description = "Supplier ID"),
    ),
    responses(
        (status = 204, description = "Supplier deleted"),
        (status = 404, description = "Supplier not found"),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn delete_supplier(
    State(state): State<AppState>,
    ctx: VesselCtx,
    Path((_vessel_id, supplier_id)): Path<(Uuid, SupplierId)>,
) -> Result<StatusCode> {
    ctx.require(Resource::Suppliers, Operation::Delete)?;

    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let deleted = Suppliers::new(&mut conn)
        .delete((ctx.vessel_id, supplier_id))
        .await?;
    if !deleted {
        return Err(supplier_not_found(supplier_id));
    }

    super::record_audit(
        &mut conn,
        Some(ctx.vessel_id),
        ctx.user.id,
        "supplier",
        supplier_id.to_string(),
        AuditAction::SoftDelete,
        None,
    )
    .await?;

    Ok(StatusCode::NO_CONTENT)
}

fn supplier_not_found(supplier_id: SupplierId) -> Error {
    Error::NotFound {
        resource: "Supplier".to_string(),
        id: supplier_id.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use crate::api::models::suppliers::SupplierResponse;
    use crate::test_utils::{
        add_member, auth_header, create_test_app, create_test_user, create_test_vessel,
    };
    use serde_json::json;

    #[test_log::test(tokio::test)]
    async fn test_crew_cannot_touch_suppliers() {
        let (app, pool) = create_test_app().await;
        let owner = create_test_user(&pool, "owner@example.com", false).await;
        let deckhand = create_test_user(&pool, "deck@example.com", false).await;
        let vessel = create_test_vessel(&app, &owner).await;
        add_member(&app, &owner, vessel, &deckhand, "crew").await;

        let (name, value) = auth_header(&deckhand);
        let response = app
            .post(&format!("/api/v1/vessels/{vessel}/suppliers"))
            .add_header(name, value)
            .json(&json!({ "name": "Chandlery" }))
            .await;
        response.assert_status_forbidden();
    }

    #[test_log::test(tokio::test)]
    async fn test_accountant_can_manage_suppliers() {
        let (app, pool) = create_test_app().await;
        let owner = create_test_user(&pool, "owner@example.com", false).await;
        let accountant = create_test_user(&pool, "books@example.com", false).await;
        let vessel = create_test_vessel(&app, &owner).await;
        add_member(&app, &owner, vessel, &accountant, "accountant").await;

        let (name, value) = auth_header(&accountant);
        let response = app
            .post(&format!("/api/v1/vessels/{vessel}/suppliers"))
            .add_header(name.clone(), value.clone())
            .json(&json!({ "name": "Chandlery", "tax_id": "500100200" }))
            .await;
        response.assert_status(axum::http::StatusCode::CREATED);
        let supplier: SupplierResponse = response.json();

        let response = app
            .delete(&format!("/api/v1/vessels/{vessel}/suppliers/{}", supplier.id))
            .add_header(name, value)
            .await;
        response.assert_status(axum::http::StatusCode::NO_CONTENT);
    }
}
