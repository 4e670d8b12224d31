//! Common type definitions and permission system types.
//!
//! All entity IDs are UUIDs wrapped in type aliases for better type safety.
//! The permission system is based on three core types:
//!
//! - [`Resource`]: what entity type is being accessed (Movements, Mareas, ...)
//! - [`Operation`]: what action is being performed
//! - [`Permission`]: authorization requirement combining resource and operation
//!
//! Vessel roles are resolved per request from the `vessel_members` table and
//! checked against the static grant table in [`crate::auth::permissions`].

use std::fmt;
use uuid::Uuid;

// Type aliases for IDs
pub type UserId = Uuid;
pub type VesselId = Uuid;
pub type AccountId = Uuid;
pub type CategoryId = Uuid;
pub type SupplierId = Uuid;
pub type MovementId = Uuid;
pub type MareaId = Uuid;
pub type ProfileId = Uuid;
pub type PositionId = Uuid;

/// Abbreviate a UUID to its first 8 characters for more readable logs and traces
/// Example: "550e8400-e29b-41d4-a716-446655440000" -> "550e8400"
pub fn abbrev_uuid(uuid: &Uuid) -> String {
    uuid.to_string().chars().take(8).collect()
}

// Operations that can be performed on resources
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Create,
    Read,
    Update,
    Delete,
    Restore,
}

// Resources that can be operated on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Resource {
    Users,
    Vessels,
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
}

// Permission types for authorization
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Permission {
    /// Simple permission: (Resource, Operation)
    Allow(Resource, Operation),
    /// Logical combinator: any of the contained permissions suffices
    Any(Vec<Permission>),
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operation::Create => write!(f, "Create"),
            Operation::Read => write!(f, "Read"),
            Operation::Update => write!(f, "Update"),
            Operation::Delete => write!(f, "Delete"),
            Operation::Restore => write!(f, "Restore"),
        }
    }
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Resource::Users => "users",
            Resource::Vessels => "vessels",
            Resource::Settings => "settings",
            Resource::Members => "members",
            Resource::CrewPositions => "crew positions",
            Resource::Suppliers => "suppliers",
            Resource::BankAccounts => "bank accounts",
            Resource::Categories => "categories",
            Resource::Movements => "movements",
            Resource::Mareas => "mareas",
            Resource::Profiles => "distribution profiles",
            Resource::Maintenance => "maintenance records",
            Resource::Reports => "reports",
            Resource::AuditLog => "audit log",
            Resource::RecycleBin => "recycle bin",
        };
        write!(f, "{name}")
    }
}
