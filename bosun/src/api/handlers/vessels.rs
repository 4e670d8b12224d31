//! HTTP handlers for vessels and their settings.

use axum::{
    Json,
    extract::{Query, State},
    http::StatusCode,
};

use crate::{
    AppState,
    api::models::{
        members::VesselRole,
        pagination::PaginatedResponse,
        users::CurrentUser,
        vessels::{
            ListVesselsQuery, VesselCreate, VesselResponse, VesselSettingsResponse,
            VesselSettingsUpdate, VesselUpdate,
        },
    },
    auth::permissions::VesselCtx,
    db::{
        handlers::{Members, Repository, Vessels, vessels::VesselFilter},
        models::{
            audit::AuditAction,
            crew::MemberCreateDBRequest,
            vessels::{VesselCreateDBRequest, VesselSettingsUpdateDBRequest, VesselUpdateDBRequest},
        },
    },
    errors::{Error, Result},
    types::{Operation, Resource},
};

/// List vessels the caller can see
#[utoipa::path(
    get,
    path = "/api/v1/vessels",
    tag = "vessels",
    params(ListVesselsQuery),
    responses(
        (status = 200, description = "Paginated list of vessels", body = PaginatedResponse<VesselResponse>),
        (status = 401, description = "Unauthorized"),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn list_vessels(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Query(query): Query<ListVesselsQuery>,
) -> Result<Json<PaginatedResponse<VesselResponse>>> {
    let (skip, limit) = (query.pagination.skip(), query.pagination.limit());
    let filter = VesselFilter {
        skip,
        limit,
        // Admins see the whole fleet
        member_user_id: (!current_user.is_admin).then_some(current_user.id),
    };

    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = Vessels::new(&mut conn);
    let vessels = repo.list(&filter).await?;
    let total_count = repo.count(&filter).await?;

    Ok(Json(PaginatedResponse::new(
        vessels.into_iter().map(VesselResponse::from).collect(),
        total_count,
        skip,
        limit,
    )))
}

/// Register a vessel; the caller becomes its owner
#[utoipa::path(
    post,
    path = "/api/v1/vessels",
    tag = "vessels",
    request_body = VesselCreate,
    responses(
        (status = 201, description = "Vessel created", body = VesselResponse),
        (status = 401, description = "Unauthorized"),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn create_vessel(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(data): Json<VesselCreate>,
) -> Result<(StatusCode, Json<VesselResponse>)> {
    let mut tx = state.db.begin().await.map_err(|e| Error::Database(e.into()))?;

    let vessel = Vessels::new(&mut tx)
        .create(&VesselCreateDBRequest {
            name: data.name,
            registration_number: data.registration_number,
            home_port: data.home_port,
            vessel_type: data.vessel_type,
        })
        .await?;

    Members::new(&mut tx)
        .create(&MemberCreateDBRequest {
            vessel_id: vessel.id,
            user_id: current_user.id,
            role: VesselRole::Owner,
            position_id: None,
            parts: 1,
        })
        .await?;

    super::record_audit(
        &mut tx,
        Some(vessel.id),
        current_user.id,
        "vessel",
        vessel.id.to_string(),
        AuditAction::Create,
        Some(serde_json::json!({ "name": vessel.name })),
    )
    .await?;

    tx.commit().await.map_err(|e| Error::Database(e.into()))?;

    Ok((StatusCode::CREATED, Json(VesselResponse::from(vessel))))
}

/// Get a vessel
#[utoipa::path(
    get,
    path = "/api/v1/vessels/{vessel_id}",
    tag = "vessels",
    params(("vessel_id" = String, Path, description = "Vessel ID")),
    responses(
        (status = 200, description = "Vessel details", body = VesselResponse),
        (status = 404, description = "Vessel not found"),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn get_vessel(State(state): State<AppState>, ctx: VesselCtx) -> Result<Json<VesselResponse>> {
    ctx.require(Resource::Vessels, Operation::Read)?;

    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let vessel = Vessels::new(&mut conn)
        .get_by_id(ctx.vessel_id)
        .await?
        .ok_or_else(|| Error::NotFound {
            resource: "Vessel".to_string(),
            id: ctx.vessel_id.to_string(),
        })?;

    Ok(Json(VesselResponse::from(vessel)))
}

/// Update a vessel
#[utoipa::path(
    patch,
    path = "/api/v1/vessels/{vessel_id}",
    tag = "vessels",
    params(("vessel_id" = String, Path, description = "Vessel ID")),
    request_body = VesselUpdate,
    responses(
        (status = 200, description = "Vessel updated", body = VesselResponse),
        (status = 403, description = "Insufficient permissions"),
        (status = 404, description = "Vessel not found"),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn update_vessel(
    State(state): State<AppState>,
    ctx: VesselCtx,
    Json(data): Json<VesselUpdate>,
) -> Result<Json<VesselResponse>> {
    ctx.require(Resource::Vessels, Operation::Update)?;

    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let vessel = Vessels::new(&mut conn)
        .update(
            ctx.vessel_id,
            &VesselUpdateDBRequest {
                name: data.name,
                registration_number: data.registration_number,
                home_port: data.home_port,
                vessel_type: data.vessel_type,
            },
        )
        .await?;

    super::record_audit(
        &mut conn,
        Some(ctx.vessel_id),
        ctx.user.id,
        "vessel",
        ctx.vessel_id.to_string(),
        AuditAction::Update,
        None,
    )
    .await?;

    Ok(Json(VesselResponse::from(vessel)))
}

/// Soft-delete a vessel
#[utoipa::path(
    delete,
    path = "/api/v1/vessels/{vessel_id}",
    tag = "vessels",
    params(("vessel_id" = String, Path, description = "Vessel ID")),
    responses(
        (status = 204, description = "Vessel deleted"),
        (status = 403, description = "Owner only"),
        (status = 404, description = "Vessel not found"),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn delete_vessel(State(state): State<AppState>, ctx: VesselCtx) -> Result<StatusCode> {
    ctx.require(Resource::Vessels, Operation::Delete)?;

    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let deleted = Vessels::new(&mut conn).delete(ctx.vessel_id).await?;
    if !deleted {
        return Err(Error::NotFound {
            resource: "Vessel".to_string(),
            id: ctx.vessel_id.to_string(),
        });
    }

    super::record_audit(
        &mut conn,
        Some(ctx.vessel_id),
        ctx.user.id,
        "vessel",
        ctx.vessel_id.to_string(),
        AuditAction::SoftDelete,
        None,
    )
    .await?;

    Ok(StatusCode::NO_CONTENT)
}

/// Get the vessel's settings
#[utoipa::path(
    get,
    path = "/api/v1/vessels/{vessel_id}/settings",
    tag = "vessels",
    params(("vessel_id" = String, Path, description = "Vessel ID")),
    responses(
        (status = 200, description = "Vessel settings", body = VesselSettingsResponse),
        (status = 404, description = "Vessel not found"),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn get_settings(State(state): State<AppState>, ctx: VesselCtx) -> Result<Json<VesselSettingsResponse>> {
    ctx.require(Resource::Settings, Operation::Read)?;

    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let settings = Vessels::new(&mut conn)
        .get_settings(ctx.vessel_id)
        .await?
        .ok_or_else(|| Error::NotFound {
            resource: "Vessel settings".to_string(),
            id: ctx.vessel_id.to_string(),
        })?;

    Ok(Json(VesselSettingsResponse::from(settings)))
}

/// Update the vessel's settings
#[utoipa::path(
    put,
    path = "/api/v1/vessels/{vessel_id}/settings",
    tag = "vessels",
    params(("vessel_id" = String, Path, description = "Vessel ID")),
    request_body = VesselSettingsUpdate,
    responses(
        (status = 200, description = "Settings updated", body = VesselSettingsResponse),
        (status = 400, description = "Unknown default profile"),
        (status = 403, description = "Insufficient permissions"),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn update_settings(
    State(state): State<AppState>,
    ctx: VesselCtx,
    Json(data): Json<VesselSettingsUpdate>,
) -> Result<Json<VesselSettingsResponse>> {
    ctx.require(Resource::Settings, Operation::Update)?;

    if let Some(rate) = data.default_vat_rate_bp {
        if !(0..=10_000).contains(&rate) {
            return Err(Error::BadRequest {
                message: "default_vat_rate_bp must be between 0 and 10000".to_string(),
            });
        }
    }

    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;

    // A default profile must be one of this vessel's live profiles
    if let Some(Some(profile_id)) = data.default_profile_id {
        use crate::db::handlers::Profiles;
        if Profiles::new(&mut conn)
            .get_by_id((ctx.vessel_id, profile_id))
            .await?
            .is_none()
        {
            return Err(Error::BadRequest {
                message: "default_profile_id does not name a profile of this vessel".to_string(),
            });
        }
    }

    let settings = Vessels::new(&mut conn)
        .update_settings(
            ctx.vessel_id,
            &VesselSettingsUpdateDBRequest {
                currency: data.currency,
                default_vat_rate_bp: data.default_vat_rate_bp,
                default_profile_id: data.default_profile_id,
            },
        )
        .await?;

    super::record_audit(
        &mut conn,
        Some(ctx.vessel_id),
        ctx.user.id,
        "vessel_settings",
        ctx.vessel_id.to_string(),
        AuditAction::Update,
        None,
    )
    .await?;

    Ok(Json(VesselSettingsResponse::from(settings)))
}

#[cfg(test)]
mod tests {
    use crate::api::models::{pagination::PaginatedResponse, vessels::VesselResponse};
    use crate::test_utils::{auth_header, create_test_app, create_test_user};
    use serde_json::json;

    #[test_log::test(tokio::test)]
    async fn test_create_vessel_makes_caller_owner() {
        let (app, pool) = create_test_app().await;
        let user = create_test_user(&pool, "owner@example.com", false).await;

        let (name, value) = auth_header(&user);
        let response = app
            .post("/api/v1/vessels")
            .add_header(name.clone(), value.clone())
            .json(&json!({ "name": "Boa Sorte" }))
            .await;
        response.assert_status(axum::http::StatusCode::CREATED);
        let vessel: VesselResponse = response.json();

        // Owner can immediately delete
        let response = app
            .delete(&format!("/api/v1/vessels/{}", vessel.id))
            .add_header(name, value)
            .await;
        response.assert_status(axum::http::StatusCode::NO_CONTENT);
    }

    #[test_log::test(tokio::test)]
    async fn test_non_members_cannot_see_vessel() {
        let (app, pool) = create_test_app().await;
        let owner = create_test_user(&pool, "owner@example.com", false).await;
        let stranger = create_test_user(&pool, "stranger@example.com", false).await;

        let (owner_h, owner_v) = auth_header(&owner);
        let response = app
            .post("/api/v1/vessels")
            .add_header(owner_h, owner_v)
            .json(&json!({ "name": "Private" }))
            .await;
        let vessel: VesselResponse = response.json();

        // 404, not 403: tenants are not enumerable
        let (name, value) = auth_header(&stranger);
        let response = app
            .get(&format!("/api/v1/vessels/{}", vessel.id))
            .add_header(name.clone(), value.clone())
            .await;
        response.assert_status_not_found();

        // And the stranger's vessel list is empty
        let response = app
            .get("/api/v1/vessels")
            .add_header(name, value)
            .await;
        response.assert_status_ok();
        let list: PaginatedResponse<VesselResponse> = response.json();
        assert_eq!(list.total_count, 0);
    }
}
