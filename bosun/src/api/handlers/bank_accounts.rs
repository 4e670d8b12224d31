//! HTTP handlers for bank accounts.

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use uuid::Uuid;

use crate::{
    AppState,
    api::models::{
        bank_accounts::{AccountCreate, AccountResponse, AccountUpdate},
        pagination::{PaginatedResponse, Pagination},
    },
    auth::permissions::VesselCtx,
    db::{
        handlers::{BankAccounts, Repository, bank_accounts::AccountFilter},
        models::{
            audit::AuditAction,
            bank_accounts::{AccountCreateDBRequest, AccountUpdateDBRequest},
        },
    },
    errors::{Error, Result},
    types::{AccountId, Operation, Resource},
};

/// List bank accounts with their derived balances
#[utoipa::path(
    get,
    path = "/api/v1/vessels/{vessel_id}/accounts",
    tag = "accounts",
    params(("vessel_id" = String, Path, description = "Vessel ID"), Pagination),
    responses(
        (status = 200, description = "Paginated list of accounts", body = PaginatedResponse<AccountResponse>),
        (status = 404, description = "Vessel not found"),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn list_accounts(
    State(state): State<AppState>,
    ctx: VesselCtx,
    Query(pagination): Query<Pagination>,
) -> Result<Json<PaginatedResponse<AccountResponse>>> {
    ctx.require(Resource::BankAccounts, Operation::Read)?;

    let (skip, limit) = (pagination.skip(), pagination.limit());
    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = BankAccounts::new(&mut conn);
    let accounts = repo
        .list(&AccountFilter {
            vessel_id: ctx.vessel_id,
            skip,
            limit,
        })
        .await?;
    let total_count = repo.count(ctx.vessel_id).await?;

    Ok(Json(PaginatedResponse::new(
        accounts.into_iter().map(AccountResponse::from).collect(),
        total_count,
        skip,
        limit,
    )))
}

/// Create a bank account
#[utoipa::path(
    post,
    path = "/api/v1/vessels/{vessel_id}/accounts",
    tag = "accounts",
    params(("vessel_id" = String, Path, description = "Vessel ID")),
    request_body = AccountCreate,
    responses(
        (status = 201, description = "Account created", body = AccountResponse),
        (status = 409, description = "Name already in use"),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn create_account(
    State(state): State<AppState>,
    ctx: VesselCtx,
    Json(data): Json<AccountCreate>,
) -> Result<(StatusCode, Json<AccountResponse>)> {
    ctx.require(Resource::BankAccounts, Operation::Create)?;

    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let account = BankAccounts::new(&mut conn)
        .create(&AccountCreateDBRequest {
            vessel_id: ctx.vessel_id,
            name: data.name,
            iban: data.iban,
            opening_balance_cents: data.opening_balance_cents,
        })
        .await?;

    super::record_audit(
        &mut conn,
        Some(ctx.vessel_id),
        ctx.user.id,
        "bank_account",
        account.id.to_string(),
        AuditAction::Create,
        None,
    )
    .await?;

    Ok((StatusCode::CREATED, Json(AccountResponse::from(account))))
}

/// Get a bank account
#[utoipa::path(
    get,
    path = "/api/v1/vessels/{vessel_id}/accounts/{account_id}",
    tag = "accounts",
    params(
        ("vessel_id" = String, Path, description = "Vessel ID"),
        ("account_id" = String, Path, description = "Account ID"),
    ),
    responses(
        (status = 200, description = "Account details", body = AccountResponse),
        (status = 404, description = "Account not found"),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn get_account(
    State(state): State<AppState>,
    ctx: VesselCtx,
    Path((_vessel_id, account_id)): Path<(Uuid, AccountId)>,
) -> Result<Json<AccountResponse>> {
    ctx.require(Resource::BankAccounts, Operation::Read)?;

    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let account = BankAccounts::new(&mut conn)
        .get_by_id((ctx.vessel_id, account_id))
        .await?
        .ok_or_else(|| account_not_found(account_id))?;

    Ok(Json(AccountResponse::from(account)))
}

/// Update a bank account
#[utoipa::path(
    patch,
    path = "/api/v1/vessels/{vessel_id}/accounts/{account_id}",
    tag = "accounts",
    params(
        ("vessel_id" = String, Path, description = "Vessel ID"),
        ("account_id" = String, Path, description = "Account ID"),
    ),
    request_body = AccountUpdate,
    responses(
        (status = 200, description = "Account updated", body = AccountResponse),
        (status = 404, description = "Account not found"),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn update_account(
    State(state): State<AppState>,
    ctx: VesselCtx,
    Path((_vessel_id, account_id)): Path<(Uuid, AccountId)>,
    Json(data): Json<AccountUpdate>,
) -> Result<Json<AccountResponse>> {
    ctx.require(Resource::BankAccounts, Operation::Update)?;

    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let account = BankAccounts::new(&mut conn)
        .update(
            (ctx.vessel_id, account_id),
            &AccountUpdateDBRequest {
                name: data.name,
                iban: data.iban,
            },
        )
        .await?;

    super::record_audit(
        &mut conn,
        Some(ctx.vessel_id),
        ctx.user.id,
        "bank_account",
        account_id.to_string(),
        AuditAction::Update,
        None,
    )
    .await?;

    Ok(Json(AccountResponse::from(account)))
}

/// Soft-delete a bank account
#[utoipa::path(
    delete,
    path = "/api/v1/vessels/{vessel_id}/accounts/{account_id}",
    tag = "accounts",
    params(
        ("vessel_id" = String, Path, description = "Vessel ID"),
        ("account_id" = String, Path, description = "Account ID"),
    ),
    responses(
        (status = 204, description = "Account deleted"),
        (status = 400, description = "Account still holds live movements"),
        (status = 404, description = "Account not found"),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn delete_account(
    State(state): State<AppState>,
    ctx: VesselCtx,
    Path((_vessel_id, account_id)): Path<(Uuid, AccountId)>,
) -> Result<StatusCode> {
    ctx.require(Resource::BankAccounts, Operation::Delete)?;

    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;

    // An account with live movements cannot disappear from the books
    let live_movements: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM movements WHERE account_id = ? AND deleted_at IS NULL",
    )
    .bind(account_id)
    .fetch_one(&mut *conn)
    .await
    .map_err(|e| Error::Database(e.into()))?;
    if live_movements > 0 {
        return Err(Error::BadRequest {
            message: format!("Account still has {live_movements} live movements"),
        });
    }

    let deleted = BankAccounts::new(&mut conn)
        .delete((ctx.vessel_id, account_id))
        .await?;
    if !deleted {
        return Err(account_not_found(account_id));
    }

    super::record_audit(
        &mut conn,
        Some(ctx.vessel_id),
        ctx.user.id,
        "bank_account",
        account_id.to_string(),
        AuditAction::SoftDelete,
        None,
    )
    .await?;

    Ok(StatusCode::NO_CONTENT)
}

fn account_not_found(account_id: AccountId) -> Error {
    Error::NotFound {
        resource: "Bank account".to_string(),
        id: account_id.to_string(),
    }
}
