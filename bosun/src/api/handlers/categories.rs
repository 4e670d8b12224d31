//! HTTP handlers for transaction categories.

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
        categories::{CategoryCreate, CategoryResponse, CategoryUpdate},
        pagination::{PaginatedResponse, Pagination},
    },
    auth::permissions::VesselCtx,
    db::{
        handlers::{Categories, Repository, categories::CategoryFilter},
        models::{
            audit::AuditAction,
            categories::{CategoryCreateDBRequest, CategoryKind, CategoryUpdateDBRequest},
        },
    },
    errors::{Error, Result},
    types::{CategoryId, Operation, Resource},
};

#[derive(Debug, Default, Deserialize, IntoParams, ToSchema)]
pub struct ListCategoriesQuery {
    #[serde(flatten)]
    #[param(inline)]
    pub pagination: Pagination,

    pub kind: Option<CategoryKind>,
}

/// List categories
#[utoipa::path(
    get,
    path = "/api/v1/vessels/{vessel_id}/categories",
    tag = "categories",
    params(("vessel_id" = String, Path, description = "Vessel ID"), ListCategoriesQuery),
    responses(
        (status = 200, description = "Paginated list of categories", body = PaginatedResponse<CategoryResponse>),
        (status = 404, description = "Vessel not found"),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn list_categories(
    State(state): State<AppState>,
    ctx: VesselCtx,
    Query(query): Query<ListCategoriesQuery>,
) -> Result<Json<PaginatedResponse<CategoryResponse>>> {
    ctx.require(Resource::Categories, Operation::Read)?;

    let (skip, limit) = (query.pagination.skip(), query.pagination.limit());
    let filter = CategoryFilter {
        vessel_id: ctx.vessel_id,
        skip,
        limit,
        kind: query.kind,
    };

    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = Categories::new(&mut conn);
    let categories = repo.list(&filter).await?;
    let total_count = repo.count(&filter).await?;

    Ok(Json(PaginatedResponse::new(
        categories.into_iter().map(CategoryResponse::from).collect(),
        total_count,
        skip,
        limit,
    )))
}

/// Create a category
#[utoipa::path(
    post,
    path = "/api/v1/vessels/{vessel_id}/categories",
    tag = "categories",
    params(("vessel_id" = String, Path, description = "Vessel ID")),
    request_body = CategoryCreate,
    responses(
        (status = 201, description = "Category created", body = CategoryResponse),
        (status = 409, description = "Name already in use for this kind"),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn create_category(
    State(state): State<AppState>,
    ctx: VesselCtx,
    Json(data): Json<CategoryCreate>,
) -> Result<(StatusCode, Json<CategoryResponse>)> {
    ctx.require(Resource::Categories, Operation::Create)?;

    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let category = Categories::new(&mut conn)
        .create(&CategoryCreateDBRequest {
            vessel_id: ctx.vessel_id,
            name: data.name,
            kind: data.kind,
        })
        .await?;

    super::record_audit(
        &mut conn,
        Some(ctx.vessel_id),
        ctx.user.id,
        "category",
        category.id.to_string(),
        AuditAction::Create,
        None,
    )
    .await?;

    Ok((StatusCode::CREATED, Json(CategoryResponse::from(category))))
}

/// Get a category
#[utoipa::path(
    get,
    path = "/api/v1/vessels/{vessel_id}/categories/{category_id}",
    tag = "categories",
    params(
        ("vessel_id" = String, Path, description = "Vessel ID"),
        ("category_id" = String, Path, description = "Category ID"),
    ),
    responses(
        (status = 200, description = "Category details", body = CategoryResponse),
        (status = 404, description = "Category not found"),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn get_category(
    State(state): State<AppState>,
    ctx: VesselCtx,
    Path((_vessel_id, category_id)): Path<(Uuid, CategoryId)>,
) -> Result<Json<CategoryResponse>> {
    ctx.require(Resource::Categories, Operation::Read)?;

    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let category = Categories::new(&mut conn)
        .get_by_id((ctx.vessel_id, category_id))
        .await?
        .ok_or_else(|| category_not_found(category_id))?;

    Ok(Json(CategoryResponse::from(category)))
}

/// Rename a category (the kind is immutable)
#[utoipa::path(
    patch,
    path = "/api/v1/vessels/{vessel_id}/categories/{category_id}",
    tag = "categories",
    params(
        ("vessel_id" = String, Path, description = "Vessel ID"),
        ("category_id" = String, Path, description = "Category ID"),
    ),
    request_body = CategoryUpdate,
    responses(
        (status = 200, description = "Category updated", body = CategoryResponse),
        (status = 404, description = "Category not found"),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn update_category(
    State(state): State<AppState>,
    ctx: VesselCtx,
    Path((_vessel_id, category_id)): Path<(Uuid, CategoryId)>,
    Json(data): Json<CategoryUpdate>,
) -> Result<Json<CategoryResponse>> {
    ctx.require(Resource::Categories, Operation::Update)?;

    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let category = Categories::new(&mut conn)
        .update(
            (ctx.vessel_id, category_id),
            &CategoryUpdateDBRequest { name: data.name },
        )
        .await?;

    super::record_audit(
        &mut conn,
        Some(ctx.vessel_id),
        ctx.user.id,
        "category",
        category_id.to_string(),
        AuditAction::Update,
        None,
    )
    .await?;

    Ok(Json(CategoryResponse::from(category)))
}

/// Soft-delete a category
#[utoipa::path(
    delete,
    path = "/api/v1/vessels/{vessel_id}/categories/{category_id}",
    tag = "categories",
    params(
        ("vessel_id" = String, Path, description = "Vessel ID"),
        ("category_id" = String, Path, description = "Category ID"),
    ),
    responses(
        (status = 204, description = "Category deleted"),
        (status = 404, description = "Category not found"),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn delete_category(
    State(state): State<AppState>,
    ctx: VesselCtx,
    Path((_vessel_id, category_id)): Path<(Uuid, CategoryId)>,
) -> Result<StatusCode> {
    ctx.require(Resource::Categories, Operation::Delete)?;

    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let deleted = Categories::new(&mut conn)
        .delete((ctx.vessel_id, category_id))
        .await?;
    if !deleted {
        return Err(category_not_found(category_id));
    }

    super::record_audit(
        &mut conn,
        Some(ctx.vessel_id),
        ctx.user.id,
        "category",
        category_id.to_string(),
        AuditAction::SoftDelete,
        None,
    )
    .await?;

    Ok(StatusCode::NO_CONTENT)
}

fn category_not_found(category_id: CategoryId) -> Error {
    Error::NotFound {
        resource: "Category".to_string(),
        id: category_id.to_string(),
    }
}
