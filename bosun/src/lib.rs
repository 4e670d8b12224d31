//! # bosun: vessel bookkeeping and crew management back office
//!
//! `bosun` is a multi-tenant back office for small fishing operations. Every
//! piece of business data (crew, suppliers, bank accounts, movements,
//! voyages, maintenance) belongs to exactly one vessel, and every request is
//! authorized against the caller's role on that vessel.
//!
//! ## Overview
//!
//! The application is a single binary: an [Axum](https://github.com/tokio-rs/axum)
//! JSON API over an embedded SQLite database. A vessel owner registers their
//! boat, invites crew and office staff with per-vessel roles, and the books
//! live under `/api/v1/vessels/{vessel_id}/...`.
//!
//! ### Request Flow
//!
//! A request first authenticates through the [`auth`] layer (bearer token or
//! session cookie, both carrying the same JWT). Handlers for vessel-scoped
//! routes then extract a [`auth::permissions::VesselCtx`], which resolves the
//! caller's role on the vessel in the path and checks the static
//! role→permission grant table. Authorized handlers call into the repository
//! layer ([`db`]), which owns all SQL, and map the repository models into the
//! HTTP DTOs in [`api::models`]. Every successful mutation appends an entry to
//! the vessel's audit log.
//!
//! ### Core Components
//!
//! - the **API layer** ([`api`]): RESTful CRUD handlers plus reporting,
//!   recycle bin, and the marea distribution endpoint
//! - the **authentication layer** ([`auth`]): Argon2id passwords, JWT
//!   sessions, role-based vessel permissions
//! - the **database layer** ([`db`]): repository pattern over SQLite with
//!   soft deletes and embedded migrations
//! - the **distribution engine** ([`distribution`]): pure evaluation of
//!   ordered profit-sharing rules against a marea's totals
//!
//! ## Quick Start
//!
//! ```no_run
//! use clap::Parser;
//! use bosun::{Application, Config};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let args = bosun::config::Args::parse();
//!     let config = Config::load(&args)?;
//!
//!     bosun::telemetry::init_telemetry()?;
//!
//!     let app = Application::new(config).await?;
//!     app.serve(async {
//!         tokio::signal::ctrl_c().await.expect("Failed to listen for Ctrl+C");
//!     })
//!     .await?;
//!
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod auth;
pub mod config;
pub mod db;
pub mod distribution;
pub mod errors;
mod openapi;
pub mod telemetry;
mod types;

#[cfg(test)]
pub mod test_utils;

use crate::{
    auth::password,
    db::handlers::{Repository, Users},
    db::models::users::{UserCreateDBRequest, UserUpdateDBRequest},
    openapi::ApiDoc,
};
use axum::{
    Json, Router,
    http::HeaderValue,
    routing::{delete, get, patch, post, put},
};
use bon::Builder;
pub use config::Config;
use sqlx::SqlitePool;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::{Level, info, instrument};
use utoipa::OpenApi;
use utoipa_scalar::{Scalar, Servable};

pub use types::{
    AccountId, CategoryId, MareaId, MovementId, PositionId, ProfileId, SupplierId, UserId, VesselId,
};

/// Application state shared across all request handlers.
#[derive(Clone, Builder)]
pub struct AppState {
    pub db: SqlitePool,
    pub config: Config,
}

/// Get the bosun database migrator
pub fn migrator() -> sqlx::migrate::Migrator {
    sqlx::migrate!("./migrations")
}

/// Create the initial admin user if it doesn't exist.
///
/// Idempotent: an existing account keeps its data and only gets its password
/// refreshed when one is configured. Called on every startup so there is
/// always a way into a fresh installation.
#[instrument(skip_all)]
pub async fn create_initial_admin_user(
    email: &str,
    password: Option<&str>,
    db: &SqlitePool,
) -> anyhow::Result<UserId> {
    let password_hash = password.map(password::hash_string).transpose().map_err(|e| {
        anyhow::anyhow!("Failed to hash admin password: {e}")
    })?;

    let mut conn = db.acquire().await?;
    let mut user_repo = Users::new(&mut conn);

    if let Some(existing) = user_repo
        .get_user_by_email(email)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to check existing admin user: {e}"))?
    {
        if password_hash.is_some() {
            user_repo
                .update(
                    existing.id,
                    &UserUpdateDBRequest {
                        password_hash,
                        ..Default::default()
                    },
                )
                .await
                .map_err(|e| anyhow::anyhow!("Failed to update admin password: {e}"))?;
        }
        return Ok(existing.id);
    }

    let created = user_repo
        .create(&UserCreateDBRequest {
            name: "Administrator".to_string(),
            email: email.to_string(),
            phone: None,
            is_admin: true,
            active: true,
            password_hash,
        })
        .await
        .map_err(|e| anyhow::anyhow!("Failed to create admin user: {e}"))?;

    info!("Created initial admin user {}", created.email);
    Ok(created.id)
}

/// Create CORS layer from configuration, if any origins are allowed
fn create_cors_layer(config: &Config) -> anyhow::Result<Option<CorsLayer>> {
    let cors_config = &config.auth.security.cors;
    if cors_config.allowed_origins.is_empty() {
        return Ok(None);
    }

    let mut cors = CorsLayer::new().allow_methods(Any).allow_headers(Any);
    if cors_config.allowed_origins.iter().any(|origin| origin == "*") {
        cors = cors.allow_origin(Any);
    } else {
        let mut origins = Vec::new();
        for origin in &cors_config.allowed_origins {
            origins.push(origin.parse::<HeaderValue>()?);
        }
        cors = cors.allow_origin(origins);
        if cors_config.allow_credentials {
            cors = cors.allow_credentials(true);
        }
    }

    Ok(Some(cors))
}

/// Build the application router with all endpoints and middleware.
pub fn build_router(state: AppState) -> anyhow::Result<Router> {
    use crate::api::handlers;

    let cors = create_cors_layer(&state.config)?;

    let api_routes = Router::new()
        // Authentication
        .route("/auth/login", post(handlers::auth::login))
        .route("/auth/logout", post(handlers::auth::logout))
        .route("/auth/me", get(handlers::auth::me))
        .route("/auth/password-change", post(handlers::auth::change_password))
        // Platform users
        .route("/users", get(handlers::users::list_users))
        .route("/users", post(handlers::users::create_user))
        .route("/users/{id}", get(handlers::users::get_user))
        .route("/users/{id}", patch(handlers::users::update_user))
        .route("/users/{id}", delete(handlers::users::delete_user))
        // Vessels and settings
        .route("/vessels", get(handlers::vessels::list_vessels))
        .route("/vessels", post(handlers::vessels::create_vessel))
        .route("/vessels/{vessel_id}", get(handlers::vessels::get_vessel))
        .route("/vessels/{vessel_id}", patch(handlers::vessels::update_vessel))
        .route("/vessels/{vessel_id}", delete(handlers::vessels::delete_vessel))
        .route("/vessels/{vessel_id}/settings", get(handlers::vessels::get_settings))
        .route("/vessels/{vessel_id}/settings", put(handlers::vessels::update_settings))
        // Membership
        .route("/vessels/{vessel_id}/members", get(handlers::members::list_members))
        .route("/vessels/{vessel_id}/members", post(handlers::members::add_member))
        .route(
            "/vessels/{vessel_id}/members/{user_id}",
            patch(handlers::members::update_member),
        )
        .route(
            "/vessels/{vessel_id}/members/{user_id}",
            delete(handlers::members::remove_member),
        )
        // Crew positions
        .route(
            "/vessels/{vessel_id}/crew-positions",
            get(handlers::crew_positions::list_positions),
        )
        .route(
            "/vessels/{vessel_id}/crew-positions",
            post(handlers::crew_positions::create_position),
        )
        .route(
            "/vessels/{vessel_id}/crew-positions/{position_id}",
            get(handlers::crew_positions::get_position),
        )
        .route(
            "/vessels/{vessel_id}/crew-positions/{position_id}",
            patch(handlers::crew_positions::update_position),
        )
        .route(
            "/vessels/{vessel_id}/crew-positions/{position_id}",
            delete(handlers::crew_positions::delete_position),
        )
        // Suppliers
        .route("/vessels/{vessel_id}/suppliers", get(handlers::suppliers::list_suppliers))
        .route("/vessels/{vessel_id}/suppliers", post(handlers::suppliers::create_supplier))
        .route(
            "/vessels/{vessel_id}/suppliers/{supplier_id}",
            get(handlers::suppliers::get_supplier),
        )
        .route(
            "/vessels/{vessel_id}/suppliers/{supplier_id}",
            patch(handlers::suppliers::update_supplier),
        )
        .route(
            "/vessels/{vessel_id}/suppliers/{supplier_id}",
            delete(handlers::suppliers::delete_supplier),
        )
        // Bank accounts
        .route("/vessels/{vessel_id}/accounts", get(handlers::bank_accounts::list_accounts))
        .route("/vessels/{vessel_id}/accounts", post(handlers::bank_accounts::create_account))
        .route(
            "/vessels/{vessel_id}/accounts/{account_id}",
            get(handlers::bank_accounts::get_account),
        )
        .route(
            "/vessels/{vessel_id}/accounts/{account_id}",
            patch(handlers::bank_accounts::update_account),
        )
        .route(
            "/vessels/{vessel_id}/accounts/{account_id}",
            delete(handlers::bank_accounts::delete_account),
        )
        // Categories
        .route("/vessels/{vessel_id}/categories", get(handlers::categories::list_categories))
        .route("/vessels/{vessel_id}/categories", post(handlers::categories::create_category))
        .route(
            "/vessels/{vessel_id}/categories/{category_id}",
            get(handlers::categories::get_category),
        )
        .route(
            "/vessels/{vessel_id}/categories/{category_id}",
            patch(handlers::categories::update_category),
        )
        .route(
            "/vessels/{vessel_id}/categories/{category_id}",
            delete(handlers::categories::delete_category),
        )
        // Movements
        .route("/vessels/{vessel_id}/movements", get(handlers::movements::list_movements))
        .route("/vessels/{vessel_id}/movements", post(handlers::movements::create_movement))
        .route(
            "/vessels/{vessel_id}/movements/transfer",
            post(handlers::movements::create_transfer),
        )
        .route(
            "/vessels/{vessel_id}/movements/{movement_id}",
            get(handlers::movements::get_movement),
        )
        .route(
            "/vessels/{vessel_id}/movements/{movement_id}",
            patch(handlers::movements::update_movement),
        )
        .route(
            "/vessels/{vessel_id}/movements/{movement_id}",
            delete(handlers::movements::delete_movement),
        )
        // Mareas
        .route("/vessels/{vessel_id}/mareas", get(handlers::mareas::list_mareas))
        .route("/vessels/{vessel_id}/mareas", post(handlers::mareas::create_marea))
        .route("/vessels/{vessel_id}/mareas/{marea_id}", get(handlers::mareas::get_marea))
        .route("/vessels/{vessel_id}/mareas/{marea_id}", patch(handlers::mareas::update_marea))
        .route(
            "/vessels/{vessel_id}/mareas/{marea_id}",
            delete(handlers::mareas::delete_marea),
        )
        .route(
            "/vessels/{vessel_id}/mareas/{marea_id}/close",
            post(handlers::mareas::close_marea),
        )
        .route(
            "/vessels/{vessel_id}/mareas/{marea_id}/reopen",
            post(handlers::mareas::reopen_marea),
        )
        .route(
            "/vessels/{vessel_id}/mareas/{marea_id}/totals",
            get(handlers::mareas::get_totals),
        )
        .route(
            "/vessels/{vessel_id}/mareas/{marea_id}/distribution",
            get(handlers::mareas::get_distribution),
        )
        // Distribution profiles
        .route("/vessels/{vessel_id}/profiles", get(handlers::profiles::list_profiles))
        .route("/vessels/{vessel_id}/profiles", post(handlers::profiles::create_profile))
        .route(
            "/vessels/{vessel_id}/profiles/{profile_id}",
            get(handlers::profiles::get_profile),
        )
        .route(
            "/vessels/{vessel_id}/profiles/{profile_id}",
            patch(handlers::profiles::update_profile),
        )
        .route(
            "/vessels/{vessel_id}/profiles/{profile_id}",
            delete(handlers::profiles::delete_profile),
        )
        .route(
            "/vessels/{vessel_id}/profiles/{profile_id}/items",
            get(handlers::profiles::list_items),
        )
        .route(
            "/vessels/{vessel_id}/profiles/{profile_id}/items",
            post(handlers::profiles::create_item),
        )
        .route(
            "/vessels/{vessel_id}/profiles/{profile_id}/items/{item_id}",
            patch(handlers::profiles::update_item),
        )
        .route(
            "/vessels/{vessel_id}/profiles/{profile_id}/items/{item_id}",
            delete(handlers::profiles::delete_item),
        )
        // Maintenance
        .route("/vessels/{vessel_id}/maintenance", get(handlers::maintenance::list_maintenance))
        .route(
            "/vessels/{vessel_id}/maintenance",
            post(handlers::maintenance::create_maintenance),
        )
        .route(
            "/vessels/{vessel_id}/maintenance/{record_id}",
            get(handlers::maintenance::get_maintenance),
        )
        .route(
            "/vessels/{vessel_id}/maintenance/{record_id}",
            patch(handlers::maintenance::update_maintenance),
        )
        .route(
            "/vessels/{vessel_id}/maintenance/{record_id}",
            delete(handlers::maintenance::delete_maintenance),
        )
        // Reports
        .route("/vessels/{vessel_id}/reports/summary", get(handlers::reports::summary_report))
        .route("/vessels/{vessel_id}/reports/vat", get(handlers::reports::vat_report))
        .route("/vessels/{vessel_id}/reports/mareas", get(handlers::reports::marea_report))
        // Audit log
        .route("/vessels/{vessel_id}/audit-log", get(handlers::audit::list_audit_log))
        // Recycle bin
        .route("/vessels/{vessel_id}/recycle-bin", get(handlers::recycle_bin::list_recycle_bin))
        .route(
            "/vessels/{vessel_id}/recycle-bin/restore",
            post(handlers::recycle_bin::restore_entity),
        )
        .route(
            "/vessels/{vessel_id}/recycle-bin/purge",
            post(handlers::recycle_bin::purge_entity),
        );

    let mut router = Router::new()
        .route("/healthz", get(|| async { "OK" }))
        .route(
            "/api-docs/openapi.json",
            get(|| async { Json(ApiDoc::openapi()) }),
        )
        .merge(Scalar::with_url("/docs", ApiDoc::openapi()))
        .nest("/api/v1", api_routes)
        .layer(
            ServiceBuilder::new().layer(
                TraceLayer::new_for_http()
                    .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                    .on_request(DefaultOnRequest::new().level(Level::DEBUG))
                    .on_response(DefaultOnResponse::new().level(Level::DEBUG)),
            ),
        );

    if let Some(cors) = cors {
        router = router.layer(cors);
    }

    Ok(router.with_state(state))
}

/// The running application: database set up, router built, ready to serve.
pub struct Application {
    router: Router,
    host: String,
    port: u16,
}

impl Application {
    /// Connect to the database, run migrations, ensure the admin user exists,
    /// and build the router.
    #[instrument(skip_all)]
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        if config.database.is_ephemeral() {
            info!("Using in-memory database; data will be lost on shutdown");
        }

        let pool = sqlx::sqlite::SqlitePoolOptions::new()
            .max_connections(if config.database.is_ephemeral() { 1 } else { 5 })
            .connect_with(config.database.connect_options())
            .await?;

        migrator().run(&pool).await?;

        create_initial_admin_user(&config.admin_email, config.admin_password.as_deref(), &pool)
            .await?;

        let host = config.host.clone();
        let port = config.port;
        let state = AppState::builder().db(pool).config(config).build();
        let router = build_router(state)?;

        Ok(Self { router, host, port })
    }

    /// Serve until the shutdown future resolves.
    pub async fn serve(self, shutdown: impl Future<Output = ()> + Send + 'static) -> anyhow::Result<()> {
        let listener = TcpListener::bind((self.host.as_str(), self.port)).await?;
        info!("Listening on {}", listener.local_addr()?);

        axum::serve(listener, self.router)
            .with_graceful_shutdown(shutdown)
            .await?;

        Ok(())
    }
}
