//! HTTP handlers for authentication.

use axum::{Json, extract::State};

use crate::{
    AppState,
    api::models::{
        auth::{
            AuthResponse, AuthSuccessResponse, ChangePasswordRequest, LoginRequest, LoginResponse,
            LogoutResponse,
        },
        users::{CurrentUser, UserResponse},
    },
    auth::{password, session},
    db::{
        handlers::{Repository, Users},
        models::audit::AuditAction,
        models::users::UserUpdateDBRequest,
    },
    errors::Error,
};

/// Login with email and password
#[utoipa::path(
    post,
    path = "/api/v1/auth/login",
    request_body = LoginRequest,
    tag = "auth",
    responses(
        (status = 200, description = "Login successful", body = AuthResponse),
        (status = 401, description = "Invalid credentials"),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn login(State(state): State<AppState>, Json(request): Json<LoginRequest>) -> Result<LoginResponse, Error> {
    if !state.config.auth.native.enabled {
        return Err(Error::BadRequest {
            message: "Native authentication is disabled".to_string(),
        });
    }
    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;

    let mut user_repo = Users::new(&mut conn);

    let user = user_repo
        .get_user_by_email(&request.email)
        .await?
        .ok_or_else(invalid_credentials)?;

    if !user.active {
        return Err(Error::Unauthenticated {
            message: Some("Account is deactivated".to_string()),
        });
    }

    let password_hash = user.password_hash.clone().ok_or_else(invalid_credentials)?;

    // Verify password on a blocking thread to avoid stalling the runtime
    let candidate = request.password.clone();
    let is_valid = tokio::task::spawn_blocking(move || password::verify_string(&candidate, &password_hash))
        .await
        .map_err(|e| Error::Internal {
            operation: format!("spawn password verification task: {e}"),
        })??;

    if !is_valid {
        return Err(invalid_credentials());
    }

    let user_response = UserResponse::from(user);
    let current_user = CurrentUser {
        id: user_response.id,
        name: user_response.name.clone(),
        email: user_response.email.clone(),
        is_admin: user_response.is_admin,
    };
    let token = session::create_session_token(&current_user, &state.config)?;
    let cookie = session::create_session_cookie(&token, &state.config);

    super::record_audit(
        &mut conn,
        None,
        current_user.id,
        "user",
        current_user.id.to_string(),
        AuditAction::Login,
        None,
    )
    .await?;

    Ok(LoginResponse {
        auth_response: AuthResponse {
            user: user_response,
            message: "Login successful".to_string(),
        },
        cookie,
    })
}

/// Logout (clear the session cookie)
#[utoipa::path(
    post,
    path = "/api/v1/auth/logout",
    tag = "auth",
    responses(
        (status = 200, description = "Logout successful", body = AuthSuccessResponse),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn logout(State(state): State<AppState>) -> LogoutResponse {
    LogoutResponse {
        auth_response: AuthSuccessResponse {
            message: "Logout successful".to_string(),
        },
        cookie: session::clear_session_cookie(&state.config),
    }
}

/// The authenticated caller's identity
#[utoipa::path(
    get,
    path = "/api/v1/auth/me",
    tag = "auth",
    responses(
        (status = 200, description = "Current user", body = CurrentUser),
        (status = 401, description = "Unauthorized"),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn me(current_user: CurrentUser) -> Json<CurrentUser> {
    Json(current_user)
}

/// Change the caller's password
#[utoipa::path(
    post,
    path = "/api/v1/auth/password-change",
    request_body = ChangePasswordRequest,
    tag = "auth",
    responses(
        (status = 200, description = "Password changed", body = AuthSuccessResponse),
        (status = 400, description = "Password policy violation"),
        (status = 401, description = "Wrong current password"),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn change_password(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(request): Json<ChangePasswordRequest>,
) -> Result<Json<AuthSuccessResponse>, Error> {
    let policy = &state.config.auth.native.password;
    if request.new_password.len() < policy.min_length {
        return Err(Error::BadRequest {
            message: format!("Password must be at least {} characters", policy.min_length),
        });
    }
    if request.new_password.len() > policy.max_length {
        return Err(Error::BadRequest {
            message: format!("Password must be no more than {} characters", policy.max_length),
        });
    }

    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut user_repo = Users::new(&mut conn);

    let user = user_repo
        .get_by_id(current_user.id)
        .await?
        .ok_or_else(|| Error::NotFound {
            resource: "User".to_string(),
            id: current_user.id.to_string(),
        })?;

    let stored_hash = user.password_hash.ok_or_else(|| Error::BadRequest {
        message: "Account has no password set".to_string(),
    })?;

    let current = request.current_password.clone();
    let is_valid = tokio::task::spawn_blocking(move || password::verify_string(&current, &stored_hash))
        .await
        .map_err(|e| Error::Internal {
            operation: format!("spawn password verification task: {e}"),
        })??;
    if !is_valid {
        return Err(Error::Unauthenticated {
            message: Some("Current password is incorrect".to_string()),
        });
    }

    let new_password = request.new_password.clone();
    let new_hash = tokio::task::spawn_blocking(move || password::hash_string(&new_password))
        .await
        .map_err(|e| Error::Internal {
            operation: format!("spawn password hashing task: {e}"),
        })??;

    user_repo
        .update(
            current_user.id,
            &UserUpdateDBRequest {
                password_hash: Some(new_hash),
                ..Default::default()
            },
        )
        .await?;

    super::record_audit(
        &mut conn,
        None,
        current_user.id,
        "user",
        current_user.id.to_string(),
        AuditAction::Update,
        Some(serde_json::json!({ "password_changed": true })),
    )
    .await?;

    Ok(Json(AuthSuccessResponse {
        message: "Password changed".to_string(),
    }))
}

fn invalid_credentials() -> Error {
    Error::Unauthenticated {
        message: Some("Invalid email or password".to_string()),
    }
}

#[cfg(test)]
mod tests {
    use crate::test_utils::{create_test_app, create_test_user_with_password};
    use serde_json::json;

    #[test_log::test(tokio::test)]
    async fn test_login_sets_cookie() {
        let (app, pool) = create_test_app().await;
        create_test_user_with_password(&pool, "skip@example.com", "seaworthy-pass", false).await;

        let response = app
            .post("/api/v1/auth/login")
            .json(&json!({ "email": "skip@example.com", "password": "seaworthy-pass" }))
            .await;

        response.assert_status_ok();
        let cookie = response
            .headers()
            .get("set-cookie")
            .expect("login should set a cookie")
            .to_str()
            .unwrap();
        assert!(cookie.starts_with("bosun_session="));
    }

    #[test_log::test(tokio::test)]
    async fn test_login_wrong_password_is_401() {
        let (app, pool) = create_test_app().await;
        create_test_user_with_password(&pool, "skip@example.com", "seaworthy-pass", false).await;

        let response = app
            .post("/api/v1/auth/login")
            .json(&json!({ "email": "skip@example.com", "password": "landlubber" }))
            .await;

        response.assert_status_unauthorized();
    }

    #[test_log::test(tokio::test)]
    async fn test_me_requires_auth() {
        let (app, _pool) = create_test_app().await;
        let response = app.get("/api/v1/auth/me").await;
        response.assert_status_unauthorized();
    }
}
