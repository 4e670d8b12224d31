//! HTTP handlers, one module per resource.

pub mod audit;
pub mod auth;
pub mod bank_accounts;
pub mod categories;
pub mod crew_positions;
pub mod maintenance;
pub mod mareas;
pub mod members;
pub mod movements;
pub mod profiles;
pub mod recycle_bin;
pub mod reports;
pub mod suppliers;
pub mod users;
pub mod vessels;

use crate::{
    db::{
        handlers::AuditLog,
        models::audit::{AuditAction, AuditEntryCreateDBRequest},
    },
    errors::{Error, Result},
    types::{UserId, VesselId},
};
use sqlx::SqliteConnection;

/// Append an audit entry for a completed mutation.
///
/// Called after the mutation succeeded, on the same connection, so a failed
/// operation never leaves a phantom trail entry.
pub(crate) async fn record_audit(
    conn: &mut SqliteConnection,
    vessel_id: Option<VesselId>,
    user_id: UserId,
    entity_type: &str,
    entity_id: String,
    action: AuditAction,
    detail: Option<serde_json::Value>,
) -> Result<()> {
    AuditLog::new(conn)
        .record(&AuditEntryCreateDBRequest {
            vessel_id,
            user_id,
            entity_type: entity_type.to_string(),
            entity_id,
            action,
            detail: detail.map(|value| value.to_string()),
        })
        .await
        .map_err(Error::Database)
}
