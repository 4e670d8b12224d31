//! Database repository for suppliers.

use crate::db::{
    errors::{DbError, Result},
    handlers::repository::Repository,
    models::suppliers::{SupplierCreateDBRequest, SupplierDBResponse, SupplierUpdateDBRequest},
};
use crate::types::{SupplierId, VesselId, abbrev_uuid};
use chrono::{DateTime, Utc};
use sqlx::{FromRow, SqliteConnection};
use tracing::instrument;
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct SupplierFilter {
    pub vessel_id: VesselId,
    pub skip: i64,
    pub limit: i64,
    pub search: Option<String>,
}

#[derive(Debug, Clone, FromRow)]
struct Supplier {
    pub id: SupplierId,
    pub vessel_id: VesselId,
    pub name: String,
    pub tax_id: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Supplier> for SupplierDBResponse {
    fn from(row: Supplier) -> Self {
        Self {
            id: row.id,
            vessel_id: row.vessel_id,
            name: row.name,
            tax_id: row.tax_id,
            email: row.email,
            phone: row.phone,
            notes: row.notes,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

const SUPPLIER_COLUMNS: &str =
    "id, vessel_id, name, tax_id, email, phone, notes, created_at, updated_at";

pub struct Suppliers<'c> {
    db: &'c mut SqliteConnection,
}

impl<'c> Suppliers<'c> {
    pub fn new(db: &'c mut SqliteConnection) -> Self {
        Self { db }
    }

    #[instrument(skip(self, filter), fields(vessel_id = %abbrev_uuid(&filter.vessel_id)), err)]
    pub async fn count(&mut self, filter: &SupplierFilter) -> Result<i64> {
        let pattern = filter.search.as_ref().map(|s| format!("%{s}%"));
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM suppliers
             WHERE vessel_id = ? AND deleted_at IS NULL AND (? IS NULL OR name LIKE ?)",
        )
        .bind(filter.vessel_id)
        .bind(&pattern)
        .bind(&pattern)
        .fetch_one(&mut *self.db)
        .await?;
        Ok(count)
    }
}

#[async_trait::async_trait]
impl<'c> Repository for Suppliers<'c> {
    type CreateRequest = SupplierCreateDBRequest;
    type UpdateRequest = SupplierUpdateDBRequest;
    type Response = SupplierDBResponse;
    type Id = (VesselId, SupplierId);
    type Filter = SupplierFilter;

    #[instrument(skip(self, request), fields(name = %request.name), err)]
    async fn create(&mut self, request: &Self::CreateRequest) -> Result<Self::Response> {
        let now = Utc::now();
        let sql = format!(
            "INSERT INTO suppliers (id, vessel_id, name, tax_id, email, phone, notes, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
             RETURNING {SUPPLIER_COLUMNS}"
        );
        let row = sqlx::query_as::<_, Supplier>(&sql)
            .bind(Uuid::new_v4())
            .bind(request.vessel_id)
            .bind(&request.name)
            .bind(&request.tax_id)
            .bind(&request.email)
            .bind(&request.phone)
            .bind(&request.notes)
            .bind(now)
            .bind(now)
            .fetch_one(&mut *self.db)
            .await?;

        Ok(SupplierDBResponse::from(row))
    }

    #[instrument(skip(self), fields(supplier_id = %abbrev_uuid(&id.1)), err)]
    async fn get_by_id(&mut self, id: Self::Id) -> Result<Option<Self::Response>> {
        let sql = format!(
            "SELECT {SUPPLIER_COLUMNS} FROM suppliers
             WHERE vessel_id = ? AND id = ? AND deleted_at IS NULL"
        );
        let row = sqlx::query_as::<_, Supplier>(&sql)
            .bind(id.0)
            .bind(id.1)
            .fetch_optional(&mut *self.db)
            .await?;

        Ok(row.map(SupplierDBResponse::from))
    }

    #[instrument(skip(self, filter), fields(vessel_id = %abbrev_uuid(&filter.vessel_id)), err)]
    async fn list(&mut self, filter: &Self::Filter) -> Result<Vec<Self::Response>> {
        let pattern = filter.search.as_ref().map(|s| format!("%{s}%"));
        let sql = format!(
            "SELECT {SUPPLIER_COLUMNS} FROM suppliers
             WHERE vessel_id = ? AND deleted_at IS NULL AND (? IS NULL OR name LIKE ?)
             ORDER BY name LIMIT ? OFFSET ?"
        );
        let rows = sqlx::query_as::<_, Supplier>(&sql)
            .bind(filter.vessel_id)
            .bind(&pattern)
            .bind(&pattern)
            .bind(filter.limit)
            .bind(filter.skip)
            .fetch_all(&mut *self.db)
            .await?;

        Ok(rows.into_iter().map(SupplierDBResponse::from).collect())
    }

    #[instrument(skip(self, request), fields(supplier_id = %abbrev_uuid(&id.1)), err)]
    async fn update(&mut self, id: Self::Id, request: &Self::UpdateRequest) -> Result<Self::Response> {
        let sql = format!(
            "UPDATE suppliers SET
                 name = COALESCE(?, name),
                 tax_id = COALESCE(?, tax_id),
                 email = COALESCE(?, email),
                 phone = COALESCE(?, phone),
                 notes = COALESCE(?, notes),
                 updated_at = ?
             WHERE vessel_id = ? AND id = ? AND deleted_at IS NULL
             RETURNING {SUPPLIER_COLUMNS}"
        );
        let row = sqlx::query_as::<_, Supplier>(&sql)
            .bind(&request.name)
            .bind(&request.tax_id)
            .bind(&request.email)
            .bind(&request.phone)
            .bind(&request.notes)
            .bind(Utc::now())
            .bind(id.0)
            .bind(id.1)
            .fetch_optional(&mut *self.db)
            .await?
            .ok_or(DbError::NotFound)?;

        Ok(SupplierDBResponse::from(row))
    }

    #[instrument(skip(self), fields(supplier_id = %abbrev_uuid(&id.1)), err)]
    async fn delete(&mut self, id: Self::Id) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE suppliers SET deleted_at = ?, updated_at = ?
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
