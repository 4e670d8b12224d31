//! Database repository for crew positions.

use crate::db::{
    errors::{DbError, Result},
    handlers::repository::Repository,
    models::crew::{PositionCreateDBRequest, PositionDBResponse, PositionUpdateDBRequest},
};
use crate::types::{PositionId, VesselId, abbrev_uuid};
use chrono::{DateTime, Utc};
use sqlx::{FromRow, SqliteConnection};
use tracing::instrument;
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct PositionFilter {
    pub vessel_id: VesselId,
    pub skip: i64,
    pub limit: i64,
}

#[derive(Debug, Clone, FromRow)]
struct Position {
    pub id: PositionId,
    pub vessel_id: VesselId,
    pub name: String,
    pub default_parts: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Position> for PositionDBResponse {
    fn from(row: Position) -> Self {
        Self {
            id: row.id,
            vessel_id: row.vessel_id,
            name: row.name,
            default_parts: row.default_parts,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

const POSITION_COLUMNS: &str = "id, vessel_id, name, default_parts, created_at, updated_at";

pub struct CrewPositions<'c> {
    db: &'c mut SqliteConnection,
}

impl<'c> CrewPositions<'c> {
    pub fn new(db: &'c mut SqliteConnection) -> Self {
        Self { db }
    }

    #[instrument(skip(self), fields(vessel_id = %abbrev_uuid(&vessel_id)), err)]
    pub async fn count(&mut self, vessel_id: VesselId) -> Result<i64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM crew_positions WHERE vessel_id = ? AND deleted_at IS NULL",
        )
        .bind(vessel_id)
        .fetch_one(&mut *self.db)
        .await?;
        Ok(count)
    }
}

#[async_trait::async_trait]
impl<'c> Repository for CrewPositions<'c> {
    type CreateRequest = PositionCreateDBRequest;
    type UpdateRequest = PositionUpdateDBRequest;
    type Response = PositionDBResponse;
    type Id = (VesselId, PositionId);
    type Filter = PositionFilter;

    #[instrument(skip(self, request), fields(name = %request.name), err)]
    async fn create(&mut self, request: &Self::CreateRequest) -> Result<Self::Response> {
        let now = Utc::now();
        let sql = format!(
            "INSERT INTO crew_positions (id, vessel_id, name, default_parts, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?)
             RETURNING {POSITION_COLUMNS}"
        );
        let row = sqlx::query_as::<_, Position>(&sql)
            .bind(Uuid::new_v4())
            .bind(request.vessel_id)
            .bind(&request.name)
            .bind(request.default_parts)
            .bind(now)
            .bind(now)
            .fetch_one(&mut *self.db)
            .await?;

        Ok(PositionDBResponse::from(row))
    }

    #[instrument(skip(self), fields(position_id = %abbrev_uuid(&id.1)), err)]
    async fn get_by_id(&mut self, id: Self::Id) -> Result<Option<Self::Response>> {
        let sql = format!(
            "SELECT {POSITION_COLUMNS} FROM crew_positions
             WHERE vessel_id = ? AND id = ? AND deleted_at IS NULL"
        );
        let row = sqlx::query_as::<_, Position>(&sql)
            .bind(id.0)
            .bind(id.1)
            .fetch_optional(&mut *self.db)
            .await?;

        Ok(row.map(PositionDBResponse::from))
    }

    #[instrument(skip(self, filter), fields(vessel_id = %abbrev_uuid(&filter.vessel_id)), err)]
    async fn list(&mut self, filter: &Self::Filter) -> Result<Vec<Self::Response>> {
        let sql = format!(
            "SELECT {POSITION_COLUMNS} FROM crew_positions
             WHERE vessel_id = ? AND deleted_at IS NULL
             ORDER BY name LIMIT ? OFFSET ?"
        );
        let rows = sqlx::query_as::<_, Position>(&sql)
            .bind(filter.vessel_id)
            .bind(filter.limit)
            .bind(filter.skip)
            .fetch_all(&mut *self.db)
            .await?;

        Ok(rows.into_iter().map(PositionDBResponse::from).collect())
    }

    #[instrument(skip(self, request), fields(position_id = %abbrev_uuid(&id.1)), err)]
    async fn update(&mut self, id: Self::Id, request: &Self::UpdateRequest) -> Result<Self::Response> {
        let sql = format!(
            "UPDATE crew_positions SET
                 name = COALESCE(?, name),
                 default_parts = COALESCE(?, default_parts),
                 updated_at = ?
             WHERE vessel_id = ? AND id = ? AND deleted_at IS NULL
             RETURNING {POSITION_COLUMNS}"
        );
        let row = sqlx::query_as::<_, Position>(&sql)
            .bind(&request.name)
            .bind(request.default_parts)
            .bind(Utc::now())
            .bind(id.0)
            .bind(id.1)
            .fetch_optional(&mut *self.db)
            .await?
            .ok_or(DbError::NotFound)?;

        Ok(PositionDBResponse::from(row))
    }

    #[instrument(skip(self), fields(position_id = %abbrev_uuid(&id.1)), err)]
    async fn delete(&mut self, id: Self::Id) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE crew_positions SET deleted_at = ?, updated_at = ?
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
    async fn test_position_crud_is_vessel_scoped() {
        let pool = create_test_pool().await;
        let mut conn = pool.acquire().await.unwrap();
        let vessel_a = insert_test_vessel(&mut conn).await;
        let vessel_b = insert_test_vessel(&mut conn).await;

        let mut repo = CrewPositions::new(&mut conn);
        let position = repo
            .create(&PositionCreateDBRequest {
                vessel_id: vessel_a,
                name: "Skipper".to_string(),
                default_parts: 2,
            })
            .await
            .unwrap();

        // Visible in its own vessel, invisible from another tenant
        assert!(repo.get_by_id((vessel_a, position.id)).await.unwrap().is_some());
        assert!(repo.get_by_id((vessel_b, position.id)).await.unwrap().is_none());
    }

    #[test_log::test(tokio::test)]
    async fn test_name_unique_until_deleted() {
        let pool = create_test_pool().await;
        let mut conn = pool.acquire().await.unwrap();
        let vessel = insert_test_vessel(&mut conn).await;

        let mut repo = CrewPositions::new(&mut conn);
        let request = PositionCreateDBRequest {
            vessel_id: vessel,
            name: "Cook".to_string(),
            default_parts: 1,
        };
        let first = repo.create(&request).await.unwrap();
        assert!(matches!(
            repo.create(&request).await.unwrap_err(),
            DbError::UniqueViolation { .. }
        ));

        // The partial unique index frees the name after soft delete
        repo.delete((vessel, first.id)).await.unwrap();
        repo.create(&request).await.unwrap();
    }
}
