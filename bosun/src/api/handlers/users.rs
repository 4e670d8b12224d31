//! HTTP handlers for platform user management.
//!
//! User administration is platform-admin territory; the only exceptions are
//! self-read and self-update of harmless fields.

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};

use crate::{
    AppState,
    api::models::{
        pagination::PaginatedResponse,
        users::{CurrentUser, ListUsersQuery, UserCreate, UserResponse, UserUpdate},
    },
    auth::password,
    db::{
        handlers::{Repository, Users, users::UserFilter},
        models::{audit::AuditAction, users::{UserCreateDBRequest, UserUpdateDBRequest}},
    },
    errors::{Error, Result},
    types::UserId,
};

fn require_admin(current_user: &CurrentUser) -> Result<()> {
    if current_user.is_admin {
        Ok(())
    } else {
        Err(Error::InsufficientPermissions {
            required: crate::types::Permission::Allow(
                crate::types::Resource::Users,
                crate::types::Operation::Update,
            ),
            action: crate::types::Operation::Update,
            resource: "users".to_string(),
        })
    }
}

/// List users
#[utoipa::path(
    get,
    path = "/api/v1/users",
    tag = "users",
    params(ListUsersQuery),
    responses(
        (status = 200, description = "Paginated list of users", body = PaginatedResponse<UserResponse>),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Admin only"),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn list_users(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Query(query): Query<ListUsersQuery>,
) -> Result<Json<PaginatedResponse<UserResponse>>> {
    require_admin(&current_user)?;

    let (skip, limit) = (query.pagination.skip(), query.pagination.limit());
    let filter = UserFilter {
        skip,
        limit,
        search: query.search,
    };

    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = Users::new(&mut conn);
    let users = repo.list(&filter).await?;
    let total_count = repo.count(&filter).await?;

    Ok(Json(PaginatedResponse::new(
        users.into_iter().map(UserResponse::from).collect(),
        total_count,
        skip,
        limit,
    )))
}

/// Create a user account
#[utoipa::path(
    post,
    path = "/api/v1/users",
    tag = "users",
    request_body = UserCreate,
    responses(
        (status = 201, description = "User created", body = UserResponse),
        (status = 403, description = "Admin only"),
        (status = 409, description = "Email already registered"),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn create_user(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(data): Json<UserCreate>,
) -> Result<(StatusCode, Json<UserResponse>)> {
    require_admin(&current_user)?;

    let password_hash = match &data.password {
        Some(plain) => {
            let policy = &state.config.auth.native.password;
            if plain.len() < policy.min_length {
                return Err(Error::BadRequest {
                    message: format!("Password must be at least {} characters", policy.min_length),
                });
            }
            let plain = plain.clone();
            Some(
                tokio::task::spawn_blocking(move || password::hash_string(&plain))
                    .await
                    .map_err(|e| Error::Internal {
                        operation: format!("spawn password hashing task: {e}"),
                    })??,
            )
        }
        None => None,
    };

    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = Users::new(&mut conn);
    let user = repo
        .create(&UserCreateDBRequest {
            name: data.name,
            email: data.email,
            phone: data.phone,
            is_admin: data.is_admin,
            active: true,
            password_hash,
        })
        .await?;

    super::record_audit(
        &mut conn,
        None,
        current_user.id,
        "user",
        user.id.to_string(),
        AuditAction::Create,
        Some(serde_json::json!({ "email": user.email })),
    )
    .await?;

    Ok((StatusCode::CREATED, Json(UserResponse::from(user))))
}

/// Get a user
#[utoipa::path(
    get,
    path = "/api/v1/users/{id}",
    tag = "users",
    params(("id" = String, Path, description = "User ID")),
    responses(
        (status = 200, description = "User details", body = UserResponse),
        (status = 404, description = "User not found"),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn get_user(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(id): Path<UserId>,
) -> Result<Json<UserResponse>> {
    if id != current_user.id {
        require_admin(&current_user)?;
    }

    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let user = Users::new(&mut conn)
        .get_by_id(id)
        .await?
        .ok_or_else(|| Error::NotFound {
            resource: "User".to_string(),
            id: id.to_string(),
        })?;

    Ok(Json(UserResponse::from(user)))
}

/// Update a user
#[utoipa::path(
    patch,
    path = "/api/v1/users/{id}",
    tag = "users",
    params(("id" = String, Path, description = "User ID")),
    request_body = UserUpdate,
    responses(
        (status = 200, description = "User updated", body = UserResponse),
        (status = 403, description = "Admin only (except self name/phone)"),
        (status = 404, description = "User not found"),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn update_user(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(id): Path<UserId>,
    Json(data): Json<UserUpdate>,
) -> Result<Json<UserResponse>> {
    // Users may rename themselves; toggling `active` stays admin-only
    if id != current_user.id || data.active.is_some() {
        require_admin(&current_user)?;
    }

    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = Users::new(&mut conn);
    let user = repo
        .update(
            id,
            &UserUpdateDBRequest {
                name: data.name,
                phone: data.phone,
                active: data.active,
                password_hash: None,
            },
        )
        .await?;

    super::record_audit(
        &mut conn,
        None,
        current_user.id,
        "user",
        id.to_string(),
        AuditAction::Update,
        None,
    )
    .await?;

    Ok(Json(UserResponse::from(user)))
}

/// Delete a user account
#[utoipa::path(
    delete,
    path = "/api/v1/users/{id}",
    tag = "users",
    params(("id" = String, Path, description = "User ID")),
    responses(
        (status = 204, description = "User deleted"),
        (status = 400, description = "User still referenced by bookkeeping data"),
        (status = 403, description = "Admin only"),
        (status = 404, description = "User not found"),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn delete_user(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(id): Path<UserId>,
) -> Result<StatusCode> {
    require_admin(&current_user)?;
    if id == current_user.id {
        return Err(Error::BadRequest {
            message: "You cannot delete your own account".to_string(),
        });
    }

    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let deleted = Users::new(&mut conn).delete(id).await?;
    if !deleted {
        return Err(Error::NotFound {
            resource: "User".to_string(),
            id: id.to_string(),
        });
    }

    super::record_audit(
        &mut conn,
        None,
        current_user.id,
        "user",
        id.to_string(),
        AuditAction::Purge,
        None,
    )
    .await?;

    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use crate::api::models::users::UserResponse;
    use crate::test_utils::{auth_header, create_test_app, create_test_user};
    use serde_json::json;

    #[test_log::test(tokio::test)]
    async fn test_admin_can_create_user() {
        let (app, pool) = create_test_app().await;
        let admin = create_test_user(&pool, "admin@example.com", true).await;

        let (name, value) = auth_header(&admin);
        let response = app
            .post("/api/v1/users")
            .add_header(name, value)
            .json(&json!({ "name": "New Hand", "email": "hand@example.com" }))
            .await;

        response.assert_status(axum::http::StatusCode::CREATED);
        let user: UserResponse = response.json();
        assert_eq!(user.email, "hand@example.com");
        assert!(!user.is_admin);
    }

    #[test_log::test(tokio::test)]
    async fn test_non_admin_cannot_create_user() {
        let (app, pool) = create_test_app().await;
        let user = create_test_user(&pool, "pleb@example.com", false).await;

        let (name, value) = auth_header(&user);
        let response = app
            .post("/api/v1/users")
            .add_header(name, value)
            .json(&json!({ "name": "X", "email": "x@example.com" }))
            .await;

        response.assert_status_forbidden();
    }

    #[test_log::test(tokio::test)]
    async fn test_user_can_read_self_but_not_others() {
        let (app, pool) = create_test_app().await;
        let alice = create_test_user(&pool, "alice@example.com", false).await;
        let bob = create_test_user(&pool, "bob@example.com", false).await;

        let (name, value) = auth_header(&alice);
        let response = app
            .get(&format!("/api/v1/users/{}", alice.id))
            .add_header(name.clone(), value.clone())
            .await;
        response.assert_status_ok();

        let response = app
            .get(&format!("/api/v1/users/{}", bob.id))
            .add_header(name, value)
            .await;
        response.assert_status_forbidden();
    }

    #[test_log::test(tokio::test)]
    async fn test_self_cannot_toggle_active() {
        let (app, pool) = create_test_app().await;
        let user = create_test_user(&pool, "self@example.com", false).await;

        let (name, value) = auth_header(&user);
        let response = app
            .patch(&format!("/api/v1/users/{}", user.id))
            .add_header(name, value)
            .json(&json!({ "active": false }))
            .await;

        response.assert_status_forbidden();
    }
}
