//! API models for the recycle bin (soft-deleted rows).

use super::pagination::Pagination;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

/// Entity types that support soft delete and can appear in the recycle bin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum DeletedEntityType {
    Supplier,
    BankAccount,
    Category,
    Movement,
    Marea,
    DistributionProfile,
    MaintenanceRecord,
    CrewPosition,
}

impl DeletedEntityType {
    /// Table the entity lives in
    pub fn table(self) -> &'static str {
        match self {
            DeletedEntityType::Supplier => "suppliers",
            DeletedEntityType::BankAccount => "bank_accounts",
            DeletedEntityType::Category => "categories",
            DeletedEntityType::Movement => "movements",
            DeletedEntityType::Marea => "mareas",
            DeletedEntityType::DistributionProfile => "distribution_profiles",
            DeletedEntityType::MaintenanceRecord => "maintenance_records",
            DeletedEntityType::CrewPosition => "crew_positions",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct DeletedEntityResponse {
    pub entity_type: DeletedEntityType,
    #[schema(value_type = String, format = "uuid")]
    pub id: Uuid,
    /// Human-readable identification of the row (name or description)
    pub label: String,
    pub deleted_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RecycleBinRequest {
    pub entity_type: DeletedEntityType,
    #[schema(value_type = String, format = "uuid")]
    pub id: Uuid,
}

#[derive(Debug, Default, Deserialize, IntoParams, ToSchema)]
pub struct ListRecycleBinQuery {
    #[serde(flatten)]
    #[param(inline)]
    pub pagination: Pagination,
}
