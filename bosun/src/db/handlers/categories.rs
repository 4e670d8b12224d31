//! Database repository for transaction categories.

use crate::db::{
    errors::{DbError, Result},
    handlers::repository::Repository,
    models::categories::{
        CategoryCreateDBRequest, CategoryDBResponse, CategoryKind, CategoryUpdateDBRequest,
    },
};
use crate::types::{CategoryId, VesselId, abbrev_uuid};
use chrono::{DateTime, Utc};
use sqlx::{FromRow, SqliteConnection};
use tracing::instrument;
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct CategoryFilter {
    pub vessel_id: VesselId,
    pub skip: i64,
    pub limit: i64,
    pub kind: Option<CategoryKind>,
}

#[derive(Debug, Clone, FromRow)]
struct Category {
    pub id: CategoryId,
    pub vessel_id: VesselId,
    pub name: String,
    pub kind: CategoryKind,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Category> for CategoryDBResponse {
    fn from(row: Category) -> Self {
        Self {
            id: row.id,
            vessel_id: row.vessel_id,
            name: row.name,
            kind: row.kind,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

const CATEGORY_COLUMNS: &str = "id, vessel_id, name, kind, created_at, updated_at";

pub struct Categories<'c> {
    db: &'c mut SqliteConnection,
}

impl<'c> Categories<'c> {
    pub fn new(db: &'c mut SqliteConnection) -> Self {
        Self { db }
    }

    #[instrument(skip(self, filter), fields(vessel_id = %abbrev_uuid(&filter.vessel_id)), err)]
    pub async fn count(&mut self, filter: &CategoryFilter) -> Result<i64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM categories
             WHERE vessel_id = ? AND deleted_at IS NULL AND (? IS NULL OR kind = ?)",
        )
        .bind(filter.vessel_id)
        .bind(filter.kind)
        .bind(filter.kind)
        .fetch_one(&mut *self.db)
        .await?;
        Ok(count)
    }
}

#[async_trait::async_trait]
impl<'c> Repository for Categories<'c> {
    type CreateRequest = CategoryCreateDBRequest;
    type UpdateRequest = CategoryUpdateDBRequest;
    type Response = CategoryDBResponse;
    type Id = (VesselId, CategoryId);
    type Filter = CategoryFilter;

    #[instrument(skip(self, request), fields(name = %request.name), err)]
    async fn create(&mut self, request: &Self::CreateRequest) -> Result<Self::Response> {
        let now = Utc::now();
        let sql = format!(
            "INSERT INTO categories (id, vessel_id, name, kind, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?)
             RETURNING {CATEGORY_COLUMNS}"
        );
        let row = sqlx::query_as::<_, Category>(&sql)
            .bind(Uuid::new_v4())
            .bind(request.vessel_id)
            .bind(&request.name)
            .bind(request.kind)
            .bind(now)
            .bind(now)
            .fetch_one(&mut *self.db)
            .await?;

        Ok(CategoryDBResponse::from(row))
    }

    #[instrument(skip(self), fields(category_id = %abbrev_uuid(&id.1)), err)]
    async fn get_by_id(&mut self, id: Self::Id) -> Result<Option<Self::Response>> {
        let sql = format!(
            "SELECT {CATEGORY_COLUMNS} FROM categories
             WHERE vessel_id = ? AND id = ? AND deleted_at IS NULL"
        );
        let row = sqlx::query_as::<_, Category>(&sql)
            .bind(id.0)
            .bind(id.1)
            .fetch_optional(&mut *self.db)
            .await?;

        Ok(row.map(CategoryDBResponse::from))
    }

    #[instrument(skip(self, filter), fields(vessel_id = %abbrev_uuid(&filter.vessel_id)), err)]
    async fn list(&mut self, filter: &Self::Filter) -> Result<Vec<Self::Response>> {
        let sql = format!(
            "SELECT {CATEGORY_COLUMNS} FROM categories
             WHERE vessel_id = ? AND deleted_at IS NULL AND (? IS NULL OR kind = ?)
             ORDER BY kind, name LIMIT ? OFFSET ?"
        );
        let rows = sqlx::query_as::<_, Category>(&sql)
            .bind(filter.vessel_id)
            .bind(filter.kind)
            .bind(filter.kind)
            .bind(filter.limit)
            .bind(filter.skip)
            .fetch_all(&mut *self.db)
            .await?;

        Ok(rows.into_iter().map(CategoryDBResponse::from).collect())
    }

    #[instrument(skip(self, request), fields(category_id = %abbrev_uuid(&id.1)), err)]
    async fn update(&mut self, id: Self::Id, request: &Self::UpdateRequest) -> Result<Self::Response> {
        // The kind is immutable: changing it would silently flip every
        // movement booked against the category between income and expense.
        let sql = format!(
            "UPDATE categories SET
                 name = COALESCE(?, name),
                 updated_at = ?
             WHERE vessel_id = ? AND id = ? AND deleted_at IS NULL
             RETURNING {CATEGORY_COLUMNS}"
        );
        let row = sqlx::query_as::<_, Category>(&sql)
            .bind(&request.name)
            .bind(Utc::now())
            .bind(id.0)
            .bind(id.1)
            .fetch_optional(&mut *self.db)
            .await?
            .ok_or(DbError::NotFound)?;

        Ok(CategoryDBResponse::from(row))
    }

    #[instrument(skip(self), fields(category_id = %abbrev_uuid(&id.1)), err)]
    async fn delete(&mut self, id: Self::Id) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE categories SET deleted_at = ?, updated_at = ?
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{create_test_pool, insert_test_vessel};

    #[test_log::test(tokio::test)]
    async fn test_category_kind_filter() {
        let pool = create_test_pool().await;
        let mut conn = pool.acquire().await.unwrap();
        let vessel = insert_test_vessel(&mut conn).await;

        let mut repo = Categories::new(&mut conn);
        for (name, kind) in [
            ("Fish sales", CategoryKind::Income),
            ("Fuel", CategoryKind::Expense),
            ("Ice", CategoryKind::Expense),
        ] {
            repo.create(&CategoryCreateDBRequest {
                vessel_id: vessel,
                name: name.to_string(),
                kind,
            })
            .await
            .unwrap();
        }

        let expenses = repo
            .list(&CategoryFilter {
                vessel_id: vessel,
                skip: 0,
                limit: 10,
                kind: Some(CategoryKind::Expense),
            })
            .await
            .unwrap();
        assert_eq!(expenses.len(), 2);
        assert!(expenses.iter().all(|c| c.kind == CategoryKind::Expense));
    }

    #[test_log::test(tokio::test)]
    async fn test_same_name_allowed_across_kinds() {
        let pool = create_test_pool().await;
        let mut conn = pool.acquire().await.unwrap();
        let vessel = insert_test_vessel(&mut conn).await;

        let mut repo = Categories::new(&mut conn);
        for kind in [CategoryKind::Income, CategoryKind::Expense] {
            repo.create(&CategoryCreateDBRequest {
                vessel_id: vessel,
                name: "Adjustments".to_string(),
                kind,
            })
            .await
            .unwrap();
        }
    }
}
