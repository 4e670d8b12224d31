//! Database repository for maintenance records.

use crate::db::{
    errors::{DbError, Result},
    handlers::repository::Repository,
    models::maintenance::{
        MaintenanceCreateDBRequest, MaintenanceDBResponse, MaintenanceUpdateDBRequest,
    },
};
use crate::types::{VesselId, abbrev_uuid};
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{FromRow, SqliteConnection};
use tracing::instrument;
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct MaintenanceFilter {
    pub vessel_id: VesselId,
    pub skip: i64,
    pub limit: i64,
}

#[derive(Debug, Clone, FromRow)]
struct MaintenanceRecord {
    pub id: Uuid,
    pub vessel_id: VesselId,
    pub supplier_id: Option<Uuid>,
    pub title: String,
    pub description: Option<String>,
    pub performed_on: NaiveDate,
    pub cost_cents: i64,
    pub next_due_on: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<MaintenanceRecord> for MaintenanceDBResponse {
    fn from(row: MaintenanceRecord) -> Self {
        Self {
            id: row.id,
            vessel_id: row.vessel_id,
            supplier_id: row.supplier_id,
            title: row.title,
            description: row.description,
            performed_on: row.performed_on,
            cost_cents: row.cost_cents,
            next_due_on: row.next_due_on,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

const MAINTENANCE_COLUMNS: &str = "id, vessel_id, supplier_id, title, description, performed_on, \
     cost_cents, next_due_on, created_at, updated_at";

pub struct Maintenance<'c> {
    db: &'c mut SqliteConnection,
}

impl<'c> Maintenance<'c> {
    pub fn new(db: &'c mut SqliteConnection) -> Self {
        Self { db }
    }

    #[instrument(skip(self), fields(vessel_id = %abbrev_uuid(&vessel_id)), err)]
    pub async fn count(&mut self, vessel_id: VesselId) -> Result<i64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM maintenance_records WHERE vessel_id = ? AND deleted_at IS NULL",
        )
        .bind(vessel_id)
        .fetch_one(&mut *self.db)
        .await?;
        Ok(count)
    }
}

#[async_trait::async_trait]
impl<'c> Repository for Maintenance<'c> {
    type CreateRequest = MaintenanceCreateDBRequest;
    type UpdateRequest = MaintenanceUpdateDBRequest;
    type Response = MaintenanceDBResponse;
    type Id = (VesselId, Uuid);
    type Filter = MaintenanceFilter;

    #[instrument(skip(self, request), fields(title = %request.title), err)]
    async fn create(&mut self, request: &Self::CreateRequest) -> Result<Self::Response> {
        let now = Utc::now();
        let sql = format!(
            "INSERT INTO maintenance_records
                 (id, vessel_id, supplier_id, title, description, performed_on, cost_cents,
                  next_due_on, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
             RETURNING {MAINTENANCE_COLUMNS}"
        );
        let row = sqlx::query_as::<_, MaintenanceRecord>(&sql)
            .bind(Uuid::new_v4())
            .bind(request.vessel_id)
            .bind(request.supplier_id)
            .bind(&request.title)
            .bind(&request.description)
            .bind(request.performed_on)
            .bind(request.cost_cents)
            .bind(request.next_due_on)
            .bind(now)
            .bind(now)
            .fetch_one(&mut *self.db)
            .await?;

        Ok(MaintenanceDBResponse::from(row))
    }

    #[instrument(skip(self), fields(record_id = %abbrev_uuid(&id.1)), err)]
    async fn get_by_id(&mut self, id: Self::Id) -> Result<Option<Self::Response>> {
        let sql = format!(
            "SELECT {MAINTENANCE_COLUMNS} FROM maintenance_records
             WHERE vessel_id = ? AND id = ? AND deleted_at IS NULL"
        );
        let row = sqlx::query_as::<_, MaintenanceRecord>(&sql)
            .bind(id.0)
            .bind(id.1)
            .fetch_optional(&mut *self.db)
            .await?;

        Ok(row.map(MaintenanceDBResponse::from))
    }

    #[instrument(skip(self, filter), fields(vessel_id = %abbrev_uuid(&filter.vessel_id)), err)]
    async fn list(&mut self, filter: &Self::Filter) -> Result<Vec<Self::Response>> {
        let sql = format!(
            "SELECT {MAINTENANCE_COLUMNS} FROM maintenance_records
             WHERE vessel_id = ? AND deleted_at IS NULL
             ORDER BY performed_on DESC LIMIT ? OFFSET ?"
        );
        let rows = sqlx::query_as::<_, MaintenanceRecord>(&sql)
            .bind(filter.vessel_id)
            .bind(filter.limit)
            .bind(filter.skip)
            .fetch_all(&mut *self.db)
            .await?;

        Ok(rows.into_iter().map(MaintenanceDBResponse::from).collect())
    }

    #[instrument(skip(self, request), fields(record_id = %abbrev_uuid(&id.1)), err)]
    async fn update(&mut self, id: Self::Id, request: &Self::UpdateRequest) -> Result<Self::Response> {
        let sql = format!(
            "UPDATE maintenance_records SET
                 supplier_id = CASE WHEN ? THEN ? ELSE supplier_id END,
                 title = COALESCE(?, title),
                 description = COALESCE(?, description),
                 performed_on = COALESCE(?, performed_on),
                 cost_cents = COALESCE(?, cost_cents),
                 next_due_on = CASE WHEN ? THEN ? ELSE next_due_on END,
                 updated_at = ?
             WHERE vessel_id = ? AND id = ? AND deleted_at IS NULL
             RETURNING {MAINTENANCE_COLUMNS}"
        );
        let row = sqlx::query_as::<_, MaintenanceRecord>(&sql)
            .bind(request.supplier_id.is_some())
            .bind(request.supplier_id.flatten())
            .bind(&request.title)
            .bind(&request.description)
            .bind(request.performed_on)
            .bind(request.cost_cents)
            .bind(request.next_due_on.is_some())
            .bind(request.next_due_on.flatten())
            .bind(Utc::now())
            .bind(id.0)
            .bind(id.1)
            .fetch_optional(&mut *self.db)
            .await?
            .ok_or(DbError::NotFound)?;

        Ok(MaintenanceDBResponse::from(row))
    }

    #[instrument(skip(self), fields(record_id = %abbrev_uuid(&id.1)), err)]
    async fn delete(&mut self, id: Self::Id) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE maintenance_records SET deleted_at = ?, updated_at = ?
             WHERE vessel_id = ? AND id = ? AND deleted_at IS NULL",
        )
        .bind(Utc::now())
        .bind(Utc::now())
        .bind(id.0)
        .bind(id.1)
        .execute(&mut *self.db)
        .await?;

        Ok(result.rows_affected() > 0)
    }
}
