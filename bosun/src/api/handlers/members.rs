//! HTTP handlers for vessel membership.

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use uuid::Uuid;

use crate::{
    AppState,
    api::models::{
        members::{MemberCreate, MemberResponse, MemberUpdate, VesselRole},
        pagination::{PaginatedResponse, Pagination},
    },
    auth::permissions::VesselCtx,
    db::{
        handlers::{Members, Repository, Users, members::MemberFilter},
        models::{audit::AuditAction, crew::{MemberCreateDBRequest, MemberUpdateDBRequest}},
    },
    errors::{Error, Result},
    types::{Operation, Resource, UserId},
};

/// Only owners hand out or revoke the Owner role.
fn guard_owner_role(ctx: &VesselCtx, touched_role: Option<VesselRole>) -> Result<()> {
    if touched_role == Some(VesselRole::Owner)
        && !ctx.user.is_admin
        && ctx.role != Some(VesselRole::Owner)
    {
        return Err(Error::InsufficientPermissions {
            required: crate::types::Permission::Allow(Resource::Members, Operation::Update),
            action: Operation::Update,
            resource: "owner role assignments".to_string(),
        });
    }
    Ok(())
}

/// List the vessel's members
#[utoipa::path(
    get,
    path = "/api/v1/vessels/{vessel_id}/members",
    tag = "members",
    params(("vessel_id" = String, Path, description = "Vessel ID"), Pagination),
    responses(
        (status = 200, description = "Paginated list of members", body = PaginatedResponse<MemberResponse>),
        (status = 404, description = "Vessel not found"),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn list_members(
    State(state): State<AppState>,
    ctx: VesselCtx,
    Query(pagination): Query<Pagination>,
) -> Result<Json<PaginatedResponse<MemberResponse>>> {
    ctx.require(Resource::Members, Operation::Read)?;

    let (skip, limit) = (pagination.skip(), pagination.limit());
    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = Members::new(&mut conn);
    let members = repo
        .list(&MemberFilter {
            vessel_id: ctx.vessel_id,
            skip,
            limit,
        })
        .await?;
    let total_count = repo.count(ctx.vessel_id).await?;

    Ok(Json(PaginatedResponse::new(
        members.into_iter().map(MemberResponse::from).collect(),
        total_count,
        skip,
        limit,
    )))
}

/// Add a user to the vessel
#[utoipa::path(
    post,
    path = "/api/v1/vessels/{vessel_id}/members",
    tag = "members",
    params(("vessel_id" = String, Path, description = "Vessel ID")),
    request_body = MemberCreate,
    responses(
        (status = 201, description = "Member added", body = MemberResponse),
        (status = 400, description = "Unknown user or crew position"),
        (status = 409, description = "Already a member"),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn add_member(
    State(state): State<AppState>,
    ctx: VesselCtx,
    Json(data): Json<MemberCreate>,
) -> Result<(StatusCode, Json<MemberResponse>)> {
    ctx.require(Resource::Members, Operation::Create)?;
    guard_owner_role(&ctx, Some(data.role))?;

    if data.parts < 0 {
        return Err(Error::BadRequest {
            message: "parts must not be negative".to_string(),
        });
    }

    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;

    if Users::new(&mut conn).get_by_id(data.user_id).await?.is_none() {
        return Err(Error::BadRequest {
            message: "Unknown user".to_string(),
        });
    }
    if let Some(position_id) = data.position_id {
        use crate::db::handlers::CrewPositions;
        if CrewPositions::new(&mut conn)
            .get_by_id((ctx.vessel_id, position_id))
            .await?
            .is_none()
        {
            return Err(Error::BadRequest {
                message: "Unknown crew position".to_string(),
            });
        }
    }

    let member = Members::new(&mut conn)
        .create(&MemberCreateDBRequest {
            vessel_id: ctx.vessel_id,
            user_id: data.user_id,
            role: data.role,
            position_id: data.position_id,
            parts: data.parts,
        })
        .await?;

    super::record_audit(
        &mut conn,
        Some(ctx.vessel_id),
        ctx.user.id,
        "vessel_member",
        data.user_id.to_string(),
        AuditAction::Create,
        Some(serde_json::json!({ "role": data.role })),
    )
    .await?;

    Ok((StatusCode::CREATED, Json(MemberResponse::from(member))))
}

/// Update a member's role, position or parts
#[utoipa::path(
    patch,
    path = "/api/v1/vessels/{vessel_id}/members/{user_id}",
    tag = "members",
    params(
        ("vessel_id" = String, Path, description = "Vessel ID"),
        ("user_id" = String, Path, description = "User ID"),
    ),
    request_body = MemberUpdate,
    responses(
        (status = 200, description = "Member updated", body = MemberResponse),
        (status = 400, description = "Would leave the vessel without an owner"),
        (status = 404, description = "Member not found"),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn update_member(
    State(state): State<AppState>,
    ctx: VesselCtx,
    Path((_vessel_id, user_id)): Path<(Uuid, UserId)>,
    Json(data): Json<MemberUpdate>,
) -> Result<Json<MemberResponse>> {
    ctx.require(Resource::Members, Operation::Update)?;
    guard_owner_role(&ctx, data.role)?;

    if let Some(parts) = data.parts {
        if parts < 0 {
            return Err(Error::BadRequest {
                message: "parts must not be negative".to_string(),
            });
        }
    }

    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = Members::new(&mut conn);

    let existing = repo
        .get_by_id((ctx.vessel_id, user_id))
        .await?
        .ok_or_else(|| member_not_found(user_id))?;

    // Demoting the last owner would orphan the vessel
    if existing.role == VesselRole::Owner
        && matches!(data.role, Some(role) if role != VesselRole::Owner)
        && repo.count_owners(ctx.vessel_id).await? <= 1
    {
        return Err(Error::BadRequest {
            message: "A vessel must keep at least one owner".to_string(),
        });
    }
    guard_owner_role(&ctx, Some(existing.role))?;

    if let Some(Some(position_id)) = data.position_id {
        use crate::db::handlers::CrewPositions;
        if CrewPositions::new(&mut conn)
            .get_by_id((ctx.vessel_id, position_id))
            .await?
            .is_none()
        {
            return Err(Error::BadRequest {
                message: "Unknown crew position".to_string(),
            });
        }
    }

    let member = Members::new(&mut conn)
        .update(
            (ctx.vessel_id, user_id),
            &MemberUpdateDBRequest {
                role: data.role,
                position_id: data.position_id,
                parts: data.parts,
            },
        )
        .await?;

    super::record_audit(
        &mut conn,
        Some(ctx.vessel_id),
        ctx.user.id,
        "vessel_member",
        user_id.to_string(),
        AuditAction::Update,
        None,
    )
    .await?;

    Ok(Json(MemberResponse::from(member)))
}

/// Remove a member from the vessel
#[utoipa::path(
    delete,
    path = "/api/v1/vessels/{vessel_id}/members/{user_id}",
    tag = "members",
    params(
        ("vessel_id" = String, Path, description = "Vessel ID"),
        ("user_id" = String, Path, description = "User ID"),
    ),
    responses(
        (status = 204, description = "Member removed"),
        (status = 400, description = "Would leave the vessel without an owner"),
        (status = 404, description = "Member not found"),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn remove_member(
    State(state): State<AppState>,
    ctx: VesselCtx,
    Path((_vessel_id, user_id)): Path<(Uuid, UserId)>,
) -> Result<StatusCode> {
    ctx.require(Resource::Members, Operation::Delete)?;

    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = Members::new(&mut conn);

    let existing = repo
        .get_by_id((ctx.vessel_id, user_id))
        .await?
        .ok_or_else(|| member_not_found(user_id))?;
    guard_owner_role(&ctx, Some(existing.role))?;

    if existing.role == VesselRole::Owner && repo.count_owners(ctx.vessel_id).await? <= 1 {
        return Err(Error::BadRequest {
            message: "A vessel must keep at least one owner".to_string(),
        });
    }

    repo.delete((ctx.vessel_id, user_id)).await?;

    super::record_audit(
        &mut conn,
        Some(ctx.vessel_id),
        ctx.user.id,
        "vessel_member",
        user_id.to_string(),
        AuditAction::SoftDelete,
        None,
    )
    .await?;

    Ok(StatusCode::NO_CONTENT)
}

fn member_not_found(user_id: UserId) -> Error {
    Error::NotFound {
        resource: "Member".to_string(),
        id: user_id.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use crate::api::models::members::MemberResponse;
    use crate::test_utils::{auth_header, create_test_app, create_test_user, create_test_vessel};
    use serde_json::json;

    #[test_log::test(tokio::test)]
    async fn test_add_and_remove_member() {
        let (app, pool) = create_test_app().await;
        let owner = create_test_user(&pool, "owner@example.com", false).await;
        let hand = create_test_user(&pool, "hand@example.com", false).await;
        let vessel = create_test_vessel(&app, &owner).await;

        let (name, value) = auth_header(&owner);
        let response = app
            .post(&format!("/api/v1/vessels/{vessel}/members"))
            .add_header(name.clone(), value.clone())
            .json(&json!({ "user_id": hand.id, "role": "crew", "parts": 2 }))
            .await;
        response.assert_status(axum::http::StatusCode::CREATED);
        let member: MemberResponse = response.json();
        assert_eq!(member.parts, 2);

        // Adding twice conflicts
        let response = app
            .post(&format!("/api/v1/vessels/{vessel}/members"))
            .add_header(name.clone(), value.clone())
            .json(&json!({ "user_id": hand.id, "role": "crew" }))
            .await;
        response.assert_status(axum::http::StatusCode::CONFLICT);

        let response = app
            .delete(&format!("/api/v1/vessels/{vessel}/members/{}", hand.id))
            .add_header(name, value)
            .await;
        response.assert_status(axum::http::StatusCode::NO_CONTENT);
    }

    #[test_log::test(tokio::test)]
    async fn test_last_owner_cannot_be_removed() {
        let (app, pool) = create_test_app().await;
        let owner = create_test_user(&pool, "owner@example.com", false).await;
        let vessel = create_test_vessel(&app, &owner).await;

        let (name, value) = auth_header(&owner);
        let response = app
            .delete(&format!("/api/v1/vessels/{vessel}/members/{}", owner.id))
            .add_header(name, value)
            .await;
        response.assert_status_bad_request();
    }

    #[test_log::test(tokio::test)]
    async fn test_manager_cannot_mint_owners() {
        let (app, pool) = create_test_app().await;
        let owner = create_test_user(&pool, "owner@example.com", false).await;
        let manager = create_test_user(&pool, "manager@example.com", false).await;
        let mate = create_test_user(&pool, "mate@example.com", false).await;
        let vessel = create_test_vessel(&app, &owner).await;

        let (owner_h, owner_v) = auth_header(&owner);
        app.post(&format!("/api/v1/vessels/{vessel}/members"))
            .add_header(owner_h, owner_v)
            .json(&json!({ "user_id": manager.id, "role": "manager" }))
            .await
            .assert_status(axum::http::StatusCode::CREATED);

        let (name, value) = auth_header(&manager);
        let response = app
            .post(&format!("/api/v1/vessels/{vessel}/members"))
            .add_header(name, value)
            .json(&json!({ "user_id": mate.id, "role": "owner" }))
            .await;
        response.assert_status_forbidden();
    }
}
