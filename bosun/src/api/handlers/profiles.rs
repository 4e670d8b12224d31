//! HTTP handlers for distribution profiles and their items.
//!
//! Item writes are validated with the same rules the evaluator enforces, so a
//! profile that was accepted here always evaluates.

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use uuid::Uuid;

use crate::{
    AppState,
    api::models::{
        pagination::{PaginatedResponse, Pagination},
        profiles::{
            ItemCreate, ItemResponse, ItemUpdate, ProfileCreate, ProfileResponse, ProfileUpdate,
        },
    },
    auth::permissions::VesselCtx,
    db::{
        handlers::{Profiles, Repository, profiles::ProfileFilter},
        models::{
            audit::AuditAction,
            profiles::{
                ItemCreateDBRequest, ItemDBResponse, ItemUpdateDBRequest, ProfileCreateDBRequest,
                ProfileUpdateDBRequest,
            },
        },
    },
    distribution,
    errors::{Error, Result},
    types::{Operation, ProfileId, Resource},
};

/// List distribution profiles
#[utoipa::path(
    get,
    path = "/api/v1/vessels/{vessel_id}/profiles",
    tag = "profiles",
    params(("vessel_id" = String, Path, description = "Vessel ID"), Pagination),
    responses(
        (status = 200, description = "Paginated list of profiles", body = PaginatedResponse<ProfileResponse>),
        (status = 404, description = "Vessel not found"),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn list_profiles(
    State(state): State<AppState>,
    ctx: VesselCtx,
    Query(pagination): Query<Pagination>,
) -> Result<Json<PaginatedResponse<ProfileResponse>>> {
    ctx.require(Resource::Profiles, Operation::Read)?;

    let (skip, limit) = (pagination.skip(), pagination.limit());
    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = Profiles::new(&mut conn);
    let profiles = repo
        .list(&ProfileFilter {
            vessel_id: ctx.vessel_id,
            skip,
            limit,
        })
        .await?;
    let total_count = repo.count(ctx.vessel_id).await?;

    Ok(Json(PaginatedResponse::new(
        profiles.into_iter().map(ProfileResponse::from).collect(),
        total_count,
        skip,
        limit,
    )))
}

/// Create a distribution profile
#[utoipa::path(
    post,
    path = "/api/v1/vessels/{vessel_id}/profiles",
    tag = "profiles",
    params(("vessel_id" = String, Path, description = "Vessel ID")),
    request_body = ProfileCreate,
    responses(
        (status = 201, description = "Profile created", body = ProfileResponse),
        (status = 409, description = "Name already in use"),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn create_profile(
    State(state): State<AppState>,
    ctx: VesselCtx,
    Json(data): Json<ProfileCreate>,
) -> Result<(StatusCode, Json<ProfileResponse>)> {
    ctx.require(Resource::Profiles, Operation::Create)?;

    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let profile = Profiles::new(&mut conn)
        .create(&ProfileCreateDBRequest {
            vessel_id: ctx.vessel_id,
            name: data.name,
            description: data.description,
        })
        .await?;

    super::record_audit(
        &mut conn,
        Some(ctx.vessel_id),
        ctx.user.id,
        "distribution_profile",
        profile.id.to_string(),
        AuditAction::Create,
        None,
    )
    .await?;

    Ok((StatusCode::CREATED, Json(ProfileResponse::from(profile))))
}

/// Get a distribution profile
#[utoipa::path(
    get,
    path = "/api/v1/vessels/{vessel_id}/profiles/{profile_id}",
    tag = "profiles",
    params(
        ("vessel_id" = String, Path, description = "Vessel ID"),
        ("profile_id" = String, Path, description = "Profile ID"),
    ),
    responses(
        (status = 200, description = "Profile details", body = ProfileResponse),
        (status = 404, description = "Profile not found"),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn get_profile(
    State(state): State<AppState>,
    ctx: VesselCtx,
    Path((_vessel_id, profile_id)): Path<(Uuid, ProfileId)>,
) -> Result<Json<ProfileResponse>> {
    ctx.require(Resource::Profiles, Operation::Read)?;

    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let profile = Profiles::new(&mut conn)
        .get_by_id((ctx.vessel_id, profile_id))
        .await?
        .ok_or_else(|| profile_not_found(profile_id))?;

    Ok(Json(ProfileResponse::from(profile)))
}

/// Update a distribution profile
#[utoipa::path(
    patch,
    path = "/api/v1/vessels/{vessel_id}/profiles/{profile_id}",
    tag = "profiles",
    params(
        ("vessel_id" = String, Path, description = "Vessel ID"),
        ("profile_id" = String, Path, description = "Profile ID"),
    ),
    request_body = ProfileUpdate,
    responses(
        (status = 200, description = "Profile updated", body = ProfileResponse),
        (status = 404, description = "Profile not found"),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn update_profile(
    State(state): State<AppState>,
    ctx: VesselCtx,
    Path((_vessel_id, profile_id)): Path<(Uuid, ProfileId)>,
    Json(data): Json<ProfileUpdate>,
) -> Result<Json<ProfileResponse>> {
    ctx.require(Resource::Profiles, Operation::Update)?;

    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let profile = Profiles::new(&mut conn)
        .update(
            (ctx.vessel_id, profile_id),
            &ProfileUpdateDBRequest {
                name: data.name,
                description: data.description,
            },
        )
        .await?;

    super::record_audit(
        &mut conn,
        Some(ctx.vessel_id),
        ctx.user.id,
        "distribution_profile",
        profile_id.to_string(),
        AuditAction::Update,
        None,
    )
    .await?;

    Ok(Json(ProfileResponse::from(profile)))
}

/// Soft-delete a distribution profile
#[utoipa::path(
    delete,
    path = "/api/v1/vessels/{vessel_id}/profiles/{profile_id}",
    tag = "profiles",
    params(
        ("vessel_id" = String, Path, description = "Vessel ID"),
        ("profile_id" = String, Path, description = "Profile ID"),
    ),
    responses(
        (status = 204, description = "Profile deleted"),
        (status = 404, description = "Profile not found"),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn delete_profile(
    State(state): State<AppState>,
    ctx: VesselCtx,
    Path((_vessel_id, profile_id)): Path<(Uuid, ProfileId)>,
) -> Result<StatusCode> {
    ctx.require(Resource::Profiles, Operation::Delete)?;

    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let deleted = Profiles::new(&mut conn)
        .delete((ctx.vessel_id, profile_id))
        .await?;
    if !deleted {
        return Err(profile_not_found(profile_id));
    }

    super::record_audit(
        &mut conn,
        Some(ctx.vessel_id),
        ctx.user.id,
        "distribution_profile",
        profile_id.to_string(),
        AuditAction::SoftDelete,
        None,
    )
    .await?;

    Ok(StatusCode::NO_CONTENT)
}

/// List the profile's items in evaluation order
#[utoipa::path(
    get,
    path = "/api/v1/vessels/{vessel_id}/profiles/{profile_id}/items",
    tag = "profiles",
    params(
        ("vessel_id" = String, Path, description = "Vessel ID"),
        ("profile_id" = String, Path, description = "Profile ID"),
    ),
    responses(
        (status = 200, description = "Profile items", body = [ItemResponse]),
        (status = 404, description = "Profile not found"),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn list_items(
    State(state): State<AppState>,
    ctx: VesselCtx,
    Path((_vessel_id, profile_id)): Path<(Uuid, ProfileId)>,
) -> Result<Json<Vec<ItemResponse>>> {
    ctx.require(Resource::Profiles, Operation::Read)?;

    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = Profiles::new(&mut conn);

    if repo.get_by_id((ctx.vessel_id, profile_id)).await?.is_none() {
        return Err(profile_not_found(profile_id));
    }
    let items = repo.list_items(profile_id).await?;

    Ok(Json(items.into_iter().map(ItemResponse::from).collect()))
}

/// Add an item to the profile
#[utoipa::path(
    post,
    path = "/api/v1/vessels/{vessel_id}/profiles/{profile_id}/items",
    tag = "profiles",
    params(
        ("vessel_id" = String, Path, description = "Vessel ID"),
        ("profile_id" = String, Path, description = "Profile ID"),
    ),
    request_body = ItemCreate,
    responses(
        (status = 201, description = "Item created", body = ItemResponse),
        (status = 400, description = "Rule validation failure"),
        (status = 404, description = "Profile not found"),
        (status = 409, description = "order_index already taken"),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn create_item(
    State(state): State<AppState>,
    ctx: VesselCtx,
    Path((_vessel_id, profile_id)): Path<(Uuid, ProfileId)>,
    Json(data): Json<ItemCreate>,
) -> Result<(StatusCode, Json<ItemResponse>)> {
    ctx.require(Resource::Profiles, Operation::Update)?;

    if data.order_index < 1 {
        return Err(Error::BadRequest {
            message: "order_index must be positive".to_string(),
        });
    }

    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = Profiles::new(&mut conn);

    if repo.get_by_id((ctx.vessel_id, profile_id)).await?.is_none() {
        return Err(profile_not_found(profile_id));
    }

    // Validate against the rules the evaluator will apply, with the existing
    // items as the set of legal references
    let existing = repo.list_items(profile_id).await?;
    let preceding: Vec<i64> = existing
        .iter()
        .map(|item| item.order_index)
        .filter(|&order_index| order_index < data.order_index)
        .collect();
    let candidate = candidate_item(profile_id, &data);
    distribution::validate_item(&candidate, &preceding).map_err(|err| Error::BadRequest {
        message: err.to_string(),
    })?;

    let item = repo
        .create_item(&ItemCreateDBRequest {
            profile_id,
            order_index: data.order_index,
            label: data.label,
            operation: data.operation,
            source: data.source,
            ref_order_index: data.ref_order_index,
            value_kind: data.value_kind,
            value: data.value,
            is_payout: data.is_payout,
        })
        .await?;

    super::record_audit(
        &mut conn,
        Some(ctx.vessel_id),
        ctx.user.id,
        "distribution_item",
        item.id.to_string(),
        AuditAction::Create,
        None,
    )
    .await?;

    Ok((StatusCode::CREATED, Json(ItemResponse::from(item))))
}

/// Update a profile item
#[utoipa::path(
    patch,
    path = "/api/v1/vessels/{vessel_id}/profiles/{profile_id}/items/{item_id}",
    tag = "profiles",
    params(
        ("vessel_id" = String, Path, description = "Vessel ID"),
        ("profile_id" = String, Path, description = "Profile ID"),
        ("item_id" = String, Path, description = "Item ID"),
    ),
    request_body = ItemUpdate,
    responses(
        (status = 200, description = "Item updated", body = ItemResponse),
        (status = 400, description = "Rule validation failure"),
        (status = 404, description = "Item not found"),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn update_item(
    State(state): State<AppState>,
    ctx: VesselCtx,
    Path((_vessel_id, profile_id, item_id)): Path<(Uuid, ProfileId, Uuid)>,
    Json(data): Json<ItemUpdate>,
) -> Result<Json<ItemResponse>> {
    ctx.require(Resource::Profiles, Operation::Update)?;

    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = Profiles::new(&mut conn);

    if repo.get_by_id((ctx.vessel_id, profile_id)).await?.is_none() {
        return Err(profile_not_found(profile_id));
    }
    let existing = repo
        .get_item(profile_id, item_id)
        .await?
        .ok_or_else(|| Error::NotFound {
            resource: "Profile item".to_string(),
            id: item_id.to_string(),
        })?;

    // Build the post-update picture of the item and validate it whole
    let merged = ItemDBResponse {
        label: data.label.clone().unwrap_or_else(|| existing.label.clone()),
        operation: data.operation.unwrap_or(existing.operation),
        source: data.source.unwrap_or(existing.source),
        ref_order_index: data.ref_order_index.unwrap_or(existing.ref_order_index),
        value_kind: data.value_kind.unwrap_or(existing.value_kind),
        value: data.value.unwrap_or(existing.value),
        is_payout: data.is_payout.unwrap_or(existing.is_payout),
        ..existing.clone()
    };
    let all_items = repo.list_items(profile_id).await?;
    let preceding: Vec<i64> = all_items
        .iter()
        .map(|item| item.order_index)
        .filter(|&order_index| order_index < existing.order_index)
        .collect();
    distribution::validate_item(&merged, &preceding).map_err(|err| Error::BadRequest {
        message: err.to_string(),
    })?;

    let item = repo
        .update_item(
            profile_id,
            item_id,
            &ItemUpdateDBRequest {
                label: data.label,
                operation: data.operation,
                source: data.source,
                ref_order_index: data.ref_order_index,
                value_kind: data.value_kind,
                value: data.value,
                is_payout: data.is_payout,
            },
        )
        .await?;

    super::record_audit(
        &mut conn,
        Some(ctx.vessel_id),
        ctx.user.id,
        "distribution_item",
        item_id.to_string(),
        AuditAction::Update,
        None,
    )
    .await?;

    Ok(Json(ItemResponse::from(item)))
}

/// Remove a profile item
#[utoipa::path(
    delete,
    path = "/api/v1/vessels/{vessel_id}/profiles/{profile_id}/items/{item_id}",
    tag = "profiles",
    params(
        ("vessel_id" = String, Path, description = "Vessel ID"),
        ("profile_id" = String, Path, description = "Profile ID"),
        ("item_id" = String, Path, description = "Item ID"),
    ),
    responses(
        (status = 204, description = "Item removed"),
        (status = 400, description = "Item is referenced by a later item"),
        (status = 404, description = "Item not found"),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn delete_item(
    State(state): State<AppState>,
    ctx: VesselCtx,
    Path((_vessel_id, profile_id, item_id)): Path<(Uuid, ProfileId, Uuid)>,
) -> Result<StatusCode> {
    ctx.require(Resource::Profiles, Operation::Update)?;

    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = Profiles::new(&mut conn);

    if repo.get_by_id((ctx.vessel_id, profile_id)).await?.is_none() {
        return Err(profile_not_found(profile_id));
    }
    let existing = repo
        .get_item(profile_id, item_id)
        .await?
        .ok_or_else(|| Error::NotFound {
            resource: "Profile item".to_string(),
            id: item_id.to_string(),
        })?;

    // Later items referencing this one would dangle
    let all_items = repo.list_items(profile_id).await?;
    if all_items
        .iter()
        .any(|item| item.ref_order_index == Some(existing.order_index))
    {
        return Err(Error::BadRequest {
            message: format!(
                "Item {} is referenced by another item; remove the reference first",
                existing.order_index
            ),
        });
    }

    repo.delete_item(profile_id, item_id).await?;

    super::record_audit(
        &mut conn,
        Some(ctx.vessel_id),
        ctx.user.id,
        "distribution_item",
        item_id.to_string(),
        AuditAction::Purge,
        None,
    )
    .await?;

    Ok(StatusCode::NO_CONTENT)
}

fn profile_not_found(profile_id: ProfileId) -> Error {
    Error::NotFound {
        resource: "Profile".to_string(),
        id: profile_id.to_string(),
    }
}

/// Shape an incoming create request as an item row for validation
fn candidate_item(profile_id: ProfileId, data: &ItemCreate) -> ItemDBResponse {
    ItemDBResponse {
        id: Uuid::nil(),
        profile_id,
        order_index: data.order_index,
        label: data.label.clone(),
        operation: data.operation,
        source: data.source,
        ref_order_index: data.ref_order_index,
        value_kind: data.value_kind,
        value: data.value,
        is_payout: data.is_payout,
        created_at: chrono::Utc::now(),
        updated_at: chrono::Utc::now(),
    }
}

#[cfg(test)]
mod tests {
    use crate::api::models::profiles::ProfileResponse;
    use crate::test_utils::{auth_header, create_test_app, create_test_user, create_test_vessel};
    use serde_json::json;

    #[test_log::test(tokio::test)]
    async fn test_forward_reference_rejected_at_write() {
        let (app, pool) = create_test_app().await;
        let owner = create_test_user(&pool, "owner@example.com", false).await;
        let vessel = create_test_vessel(&app, &owner).await;
        let (name, value) = auth_header(&owner);

        let profile: ProfileResponse = app
            .post(&format!("/api/v1/vessels/{vessel}/profiles"))
            .add_header(name.clone(), value.clone())
            .json(&json!({ "name": "Bad refs" }))
            .await
            .json();

        // Item 1 referencing item 2 (not yet existing, and forward anyway)
        let response = app
            .post(&format!("/api/v1/vessels/{vessel}/profiles/{}/items", profile.id))
            .add_header(name, value)
            .json(&json!({
                "order_index": 1,
                "label": "broken",
                "operation": "set",
                "source": "item",
                "ref_order_index": 2,
                "value_kind": "amount",
                "value": 0
            }))
            .await;
        response.assert_status_bad_request();
    }

    #[test_log::test(tokio::test)]
    async fn test_referenced_item_cannot_be_deleted() {
        let (app, pool) = create_test_app().await;
        let owner = create_test_user(&pool, "owner@example.com", false).await;
        let vessel = create_test_vessel(&app, &owner).await;
        let (name, value) = auth_header(&owner);

        let profile: ProfileResponse = app
            .post(&format!("/api/v1/vessels/{vessel}/profiles"))
            .add_header(name.clone(), value.clone())
            .json(&json!({ "name": "Chained" }))
            .await
            .json();

        let first: crate::api::models::profiles::ItemResponse = app
            .post(&format!("/api/v1/vessels/{vessel}/profiles/{}/items", profile.id))
            .add_header(name.clone(), value.clone())
            .json(&json!({
                "order_index": 1, "label": "net", "operation": "set",
                "source": "net_result", "value_kind": "amount", "value": 0
            }))
            .await
            .json();
        app.post(&format!("/api/v1/vessels/{vessel}/profiles/{}/items", profile.id))
            .add_header(name.clone(), value.clone())
            .json(&json!({
                "order_index": 2, "label": "copy", "operation": "set",
                "source": "item", "ref_order_index": 1, "value_kind": "amount", "value": 0
            }))
            .await
            .assert_status(axum::http::StatusCode::CREATED);

        let response = app
            .delete(&format!(
                "/api/v1/vessels/{vessel}/profiles/{}/items/{}",
                profile.id, first.id
            ))
            .add_header(name, value)
            .await;
        response.assert_status_bad_request();
    }
}
