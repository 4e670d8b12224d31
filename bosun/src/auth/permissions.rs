//! Permission checking and vessel-scoped access control.
//!
//! Authorization is a static configuration lookup: each vessel role maps to a
//! fixed set of `(Resource, Operation)` grants. The caller's role for the
//! vessel in the request path is resolved from `vessel_members`, then checked
//! against the grant table. Platform admins (`is_admin`) bypass vessel role
//! resolution entirely.
//!
//! A caller with no membership on the requested vessel gets 404 rather than
//! 403, so tenants cannot be enumerated by probing IDs.

use crate::{
    AppState,
    api::models::members::VesselRole,
    api::models::users::CurrentUser,
    db::errors::DbError,
    errors::{Error, Result},
    types::{Operation, Permission, Resource, VesselId},
};
use axum::{RequestPartsExt, extract::FromRequestParts, extract::Path, http::request::Parts};
use once_cell::sync::Lazy;
use std::collections::{HashMap, HashSet};
use tracing::instrument;
use uuid::Uuid;

/// The permission configuration. Owner is not listed: owners hold every grant
/// on their vessel.
static GRANTS: Lazy<HashMap<VesselRole, HashSet<(Resource, Operation)>>> = Lazy::new(|| {
    use Operation::*;
    use Resource::*;

    let all_ops = [Create, Read, Update, Delete, Restore];
    let mut grants = HashMap::new();

    // Manager: full run of the vessel except deleting it
    let mut manager = HashSet::new();
    for resource in [
        Settings,
        Members,
        CrewPositions,
        Suppliers,
        BankAccounts,
        Categories,
        Movements,
        Mareas,
        Profiles,
        Maintenance,
        Reports,
        AuditLog,
        RecycleBin,
    ] {
        for op in all_ops {
            manager.insert((resource, op));
        }
    }
    manager.insert((Vessels, Read));
    manager.insert((Vessels, Update));
    grants.insert(VesselRole::Manager, manager);

    // Accountant: the money side, plus read access to the rest
    let mut accountant = HashSet::new();
    for resource in [Suppliers, BankAccounts, Categories, Movements, RecycleBin] {
        for op in all_ops {
            accountant.insert((resource, op));
        }
    }
    for resource in [
        Vessels,
        Settings,
        Members,
        CrewPositions,
        Mareas,
        Profiles,
        Maintenance,
        Reports,
        AuditLog,
    ] {
        accountant.insert((resource, Read));
    }
    grants.insert(VesselRole::Accountant, accountant);

    // Skipper: runs voyages and the boat, records costs at sea
    let mut skipper = HashSet::new();
    for resource in [Mareas, Maintenance, CrewPositions] {
        for op in [Create, Read, Update, Delete] {
            skipper.insert((resource, op));
        }
    }
    skipper.insert((Movements, Create));
    skipper.insert((Movements, Read));
    for resource in [
        Vessels,
        Settings,
        Members,
        Suppliers,
        BankAccounts,
        Categories,
        Profiles,
        Reports,
    ] {
        skipper.insert((resource, Read));
    }
    grants.insert(VesselRole::Skipper, skipper);

    // Crew: read-only view of the boat and its voyages
    let mut crew = HashSet::new();
    for resource in [Vessels, Members, CrewPositions, Mareas, Maintenance] {
        crew.insert((resource, Read));
    }
    grants.insert(VesselRole::Crew, crew);

    grants
});

/// Check a role against the static grant table
pub fn has_permission(role: VesselRole, resource: Resource, operation: Operation) -> bool {
    if role == VesselRole::Owner {
        return true;
    }
    GRANTS
        .get(&role)
        .is_some_and(|set| set.contains(&(resource, operation)))
}

/// Vessel-scoped request context: the authenticated caller plus their role on
/// the vessel named in the path.
///
/// Extraction fails with 404 when the vessel does not exist (or is deleted),
/// and for non-admin callers without a membership row.
#[derive(Debug, Clone)]
pub struct VesselCtx {
    pub user: CurrentUser,
    pub vessel_id: VesselId,
    /// None for platform admins without an explicit membership
    pub role: Option<VesselRole>,
}

impl VesselCtx {
    /// Authorize `operation` on `resource` for this caller.
    pub fn require(&self, resource: Resource, operation: Operation) -> Result<()> {
        if self.user.is_admin {
            return Ok(());
        }
        match self.role {
            Some(role) if has_permission(role, resource, operation) => Ok(()),
            _ => Err(Error::InsufficientPermissions {
                required: Permission::Allow(resource, operation),
                action: operation,
                resource: resource.to_string(),
            }),
        }
    }
}

fn vessel_not_found(vessel_id: VesselId) -> Error {
    Error::NotFound {
        resource: "Vessel".to_string(),
        id: vessel_id.to_string(),
    }
}

impl FromRequestParts<AppState> for VesselCtx {
    type Rejection = Error;

    #[instrument(skip(parts, state))]
    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self> {
        let user = CurrentUser::from_request_parts(parts, state).await?;

        let Path(params) = parts
            .extract::<Path<HashMap<String, String>>>()
            .await
            .map_err(|e| Error::BadRequest {
                message: format!("Invalid path parameters: {e}"),
            })?;
        let vessel_id = params
            .get("vessel_id")
            .and_then(|raw| Uuid::parse_str(raw).ok())
            .ok_or_else(|| Error::BadRequest {
                message: "Invalid vessel id".to_string(),
            })?;

        let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;

        let vessel_exists: Option<i64> =
            sqlx::query_scalar("SELECT 1 FROM vessels WHERE id = ? AND deleted_at IS NULL")
                .bind(vessel_id)
                .fetch_optional(&mut *conn)
                .await
                .map_err(|e| Error::Database(DbError::from(e)))?;
        if vessel_exists.is_none() {
            return Err(vessel_not_found(vessel_id));
        }

        let role: Option<VesselRole> = sqlx::query_scalar(
            "SELECT role FROM vessel_members WHERE vessel_id = ? AND user_id = ? AND deleted_at IS NULL",
        )
        .bind(vessel_id)
        .bind(user.id)
        .fetch_optional(&mut *conn)
        .await
        .map_err(|e| Error::Database(DbError::from(e)))?;

        if role.is_none() && !user.is_admin {
            // Hide the vessel's existence from non-members
            return Err(vessel_not_found(vessel_id));
        }

        Ok(VesselCtx {
            user,
            vessel_id,
            role,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx_with_role(role: Option<VesselRole>, is_admin: bool) -> VesselCtx {
        VesselCtx {
            user: CurrentUser {
                id: Uuid::new_v4(),
                name: "t".to_string(),
                email: "t@example.com".to_string(),
                is_admin,
            },
            vessel_id: Uuid::new_v4(),
            role,
        }
    }

    #[test]
    fn test_owner_has_everything() {
        for resource in [Resource::Vessels, Resource::Movements, Resource::RecycleBin] {
            for op in [
                Operation::Create,
                Operation::Read,
                Operation::Update,
                Operation::Delete,
                Operation::Restore,
            ] {
                assert!(has_permission(VesselRole::Owner, resource, op));
            }
        }
    }

    #[test]
    fn test_manager_cannot_delete_vessel() {
        assert!(has_permission(VesselRole::Manager, Resource::Vessels, Operation::Update));
        assert!(!has_permission(VesselRole::Manager, Resource::Vessels, Operation::Delete));
        assert!(has_permission(VesselRole::Manager, Resource::Members, Operation::Delete));
    }

    #[test]
    fn test_accountant_grants() {
        assert!(has_permission(VesselRole::Accountant, Resource::Movements, Operation::Create));
        assert!(has_permission(VesselRole::Accountant, Resource::RecycleBin, Operation::Restore));
        assert!(has_permission(VesselRole::Accountant, Resource::Reports, Operation::Read));
        assert!(!has_permission(VesselRole::Accountant, Resource::Mareas, Operation::Create));
        assert!(!has_permission(VesselRole::Accountant, Resource::Members, Operation::Update));
    }

    #[test]
    fn test_skipper_grants() {
        assert!(has_permission(VesselRole::Skipper, Resource::Mareas, Operation::Create));
        assert!(has_permission(VesselRole::Skipper, Resource::Movements, Operation::Create));
        assert!(!has_permission(VesselRole::Skipper, Resource::Movements, Operation::Delete));
        assert!(!has_permission(VesselRole::Skipper, Resource::AuditLog, Operation::Read));
    }

    #[test]
    fn test_crew_is_read_only() {
        assert!(has_permission(VesselRole::Crew, Resource::Mareas, Operation::Read));
        assert!(!has_permission(VesselRole::Crew, Resource::Mareas, Operation::Update));
        assert!(!has_permission(VesselRole::Crew, Resource::Movements, Operation::Read));
    }

    #[test]
    fn test_require_admin_bypass() {
        let ctx = ctx_with_role(None, true);
        assert!(ctx.require(Resource::Vessels, Operation::Delete).is_ok());
    }

    #[test]
    fn test_require_denies_without_role() {
        let ctx = ctx_with_role(None, false);
        let err = ctx.require(Resource::Movements, Operation::Read).unwrap_err();
        assert!(matches!(err, Error::InsufficientPermissions { .. }));
    }

    #[test]
    fn test_require_checks_grant_table() {
        let ctx = ctx_with_role(Some(VesselRole::Crew), false);
        assert!(ctx.require(Resource::Mareas, Operation::Read).is_ok());
        assert!(ctx.require(Resource::Movements, Operation::Create).is_err());
    }
}
