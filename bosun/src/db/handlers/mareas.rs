//! Database repository for mareas (fishing voyages).

use crate::db::{
    errors::{DbError, Result},
    handlers::repository::Repository,
    models::mareas::{
        MareaCreateDBRequest, MareaDBResponse, MareaStatus, MareaTotalsDBResponse,
        MareaUpdateDBRequest,
    },
};
use crate::types::{MareaId, VesselId, abbrev_uuid};
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{FromRow, SqliteConnection};
use tracing::instrument;
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct MareaFilter {
    pub vessel_id: VesselId,
    pub skip: i64,
    pub limit: i64,
    pub status: Option<MareaStatus>,
}

#[derive(Debug, Clone, FromRow)]
struct Marea {
    pub id: MareaId,
    pub vessel_id: VesselId,
    pub name: String,
    pub departure_date: NaiveDate,
    pub return_date: Option<NaiveDate>,
    pub status: MareaStatus,
    pub closed_at: Option<DateTime<Utc>>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Marea> for MareaDBResponse {
    fn from(row: Marea) -> Self {
        Self {
            id: row.id,
            vessel_id: row.vessel_id,
            name: row.name,
            departure_date: row.departure_date,
            return_date: row.return_date,
            status: row.status,
            closed_at: row.closed_at,
            notes: row.notes,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

const MAREA_COLUMNS: &str = "id, vessel_id, name, departure_date, return_date, status, closed_at, \
     notes, created_at, updated_at";

pub struct Mareas<'c> {
    db: &'c mut SqliteConnection,
}

impl<'c> Mareas<'c> {
    pub fn new(db: &'c mut SqliteConnection) -> Self {
        Self { db }
    }

    #[instrument(skip(self, filter), fields(vessel_id = %abbrev_uuid(&filter.vessel_id)), err)]
    pub async fn count(&mut self, filter: &MareaFilter) -> Result<i64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM mareas
             WHERE vessel_id = ? AND deleted_at IS NULL AND (? IS NULL OR status = ?)",
        )
        .bind(filter.vessel_id)
        .bind(filter.status)
        .bind(filter.status)
        .fetch_one(&mut *self.db)
        .await?;
        Ok(count)
    }

    /// Sum the live income/expense movements attached to a marea.
    /// Transfer legs never carry a marea, so only the two real kinds appear.
    #[instrument(skip(self), fields(marea_id = %abbrev_uuid(&marea_id)), err)]
    pub async fn totals(&mut self, vessel_id: VesselId, marea_id: MareaId) -> Result<MareaTotalsDBResponse> {
        let row: (i64, i64, i64) = sqlx::query_as(
            r#"
            SELECT
                COALESCE(SUM(CASE WHEN kind = 'income' THEN amount_cents ELSE 0 END), 0),
                COALESCE(SUM(CASE WHEN kind = 'expense' THEN amount_cents ELSE 0 END), 0),
                COUNT(*)
            FROM movements
            WHERE vessel_id = ? AND marea_id = ? AND deleted_at IS NULL
            "#,
        )
        .bind(vessel_id)
        .bind(marea_id)
        .fetch_one(&mut *self.db)
        .await?;

        Ok(MareaTotalsDBResponse {
            gross_income_cents: row.0,
            total_expense_cents: row.1,
            movement_count: row.2,
        })
    }

    /// Close a marea. Requires a return date (either already set or supplied
    /// here); fails with NotFound if the marea is missing or already closed.
    #[instrument(skip(self), fields(marea_id = %abbrev_uuid(&marea_id)), err)]
    pub async fn close(
        &mut self,
        vessel_id: VesselId,
        marea_id: MareaId,
        return_date: Option<NaiveDate>,
    ) -> Result<MareaDBResponse> {
        let sql = format!(
            "UPDATE mareas SET
                 status = 'closed',
                 closed_at = ?,
                 return_date = COALESCE(?, return_date),
                 updated_at = ?
             WHERE vessel_id = ? AND id = ? AND status = 'open' AND deleted_at IS NULL
             RETURNING {MAREA_COLUMNS}"
        );
        let now = Utc::now();
        let row = sqlx::query_as::<_, Marea>(&sql)
            .bind(now)
            .bind(return_date)
            .bind(now)
            .bind(vessel_id)
            .bind(marea_id)
            .fetch_optional(&mut *self.db)
            .await?
            .ok_or(DbError::NotFound)?;

        Ok(MareaDBResponse::from(row))
    }

    /// Reopen a closed marea
    #[instrument(skip(self), fields(marea_id = %abbrev_uuid(&marea_id)), err)]
    pub async fn reopen(&mut self, vessel_id: VesselId, marea_id: MareaId) -> Result<MareaDBResponse> {
        let sql = format!(
            "UPDATE mareas SET status = 'open', closed_at = NULL, updated_at = ?
             WHERE vessel_id = ? AND id = ? AND status = 'closed' AND deleted_at IS NULL
             RETURNING {MAREA_COLUMNS}"
        );
        let row = sqlx::query_as::<_, Marea>(&sql)
            .bind(Utc::now())
            .bind(vessel_id)
            .bind(marea_id)
            .fetch_optional(&mut *self.db)
            .await?
            .ok_or(DbError::NotFound)?;

        Ok(MareaDBResponse::from(row))
    }
}

#[async_trait::async_trait]
impl<'c> Repository for Mareas<'c> {
    type CreateRequest = MareaCreateDBRequest;
    type UpdateRequest = MareaUpdateDBRequest;
    type Response = MareaDBResponse;
    type Id = (VesselId, MareaId);
    type Filter = MareaFilter;

    #[instrument(skip(self, request), fields(name = %request.name), err)]
    async fn create(&mut self, request: &Self::CreateRequest) -> Result<Self::Response> {
        let now = Utc::now();
        let sql = format!(
            "INSERT INTO mareas
                 (id, vessel_id, name, departure_date, return_date, status, closed_at, notes, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, 'open', NULL, ?, ?, ?)
             RETURNING {MAREA_COLUMNS}"
        );
        let row = sqlx::query_as::<_, Marea>(&sql)
            .bind(Uuid::new_v4())
            .bind(request.vessel_id)
            .bind(&request.name)
            .bind(request.departure_date)
            .bind(request.return_date)
            .bind(&request.notes)
            .bind(now)
            .bind(now)
            .fetch_one(&mut *self.db)
            .await?;

        Ok(MareaDBResponse::from(row))
    }

    #[instrument(skip(self), fields(marea_id = %abbrev_uuid(&id.1)), err)]
    async fn get_by_id(&mut self, id: Self::Id) -> Result<Option<Self::Response>> {
        let sql = format!(
            "SELECT {MAREA_COLUMNS} FROM mareas
             WHERE vessel_id = ? AND id = ? AND deleted_at IS NULL"
        );
        let row = sqlx::query_as::<_, Marea>(&sql)
            .bind(id.0)
            .bind(id.1)
            .fetch_optional(&mut *self.db)
            .await?;

        Ok(row.map(MareaDBResponse::from))
    }

    #[instrument(skip(self, filter), fields(vessel_id = %abbrev_uuid(&filter.vessel_id)), err)]
    async fn list(&mut self, filter: &Self::Filter) -> Result<Vec<Self::Response>> {
        let sql = format!(
            "SELECT {MAREA_COLUMNS} FROM mareas
             WHERE vessel_id = ? AND deleted_at IS NULL AND (? IS NULL OR status = ?)
             ORDER BY departure_date DESC LIMIT ? OFFSET ?"
        );
        let rows = sqlx::query_as::<_, Marea>(&sql)
            .bind(filter.vessel_id)
            .bind(filter.status)
            .bind(filter.status)
            .bind(filter.limit)
            .bind(filter.skip)
            .fetch_all(&mut *self.db)
            .await?;

        Ok(rows.into_iter().map(MareaDBResponse::from).collect())
    }

    #[instrument(skip(self, request), fields(marea_id = %abbrev_uuid(&id.1)), err)]
    async fn update(&mut self, id: Self::Id, request: &Self::UpdateRequest) -> Result<Self::Response> {
        let sql = format!(
            "UPDATE mareas SET
                 name = COALESCE(?, name),
                 departure_date = COALESCE(?, departure_date),
                 return_date = CASE WHEN ? THEN ? ELSE return_date END,
                 notes = COALESCE(?, notes),
                 updated_at = ?
             WHERE vessel_id = ? AND id = ? AND deleted_at IS NULL
             RETURNING {MAREA_COLUMNS}"
        );
        let row = sqlx::query_as::<_, Marea>(&sql)
            .bind(&request.name)
            .bind(request.departure_date)
            .bind(request.return_date.is_some())
            .bind(request.return_date.flatten())
            .bind(&request.notes)
            .bind(Utc::now())
            .bind(id.0)
            .bind(id.1)
            .fetch_optional(&mut *self.db)
            .await?
            .ok_or(DbError::NotFound)?;

        Ok(MareaDBResponse::from(row))
    }

    #[instrument(skip(self), fields(marea_id = %abbrev_uuid(&id.1)), err)]
    async fn delete(&mut self, id: Self::Id) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE mareas SET deleted_at = ?, updated_at = ?
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
    use crate::db::models::movements::{MovementCreateDBRequest, MovementKind};
    use crate::db::handlers::movements::Movements;
    use crate::test_utils::{
        create_test_pool, insert_test_account, insert_test_user, insert_test_vessel,
    };

    fn date(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    async fn create_marea(conn: &mut SqliteConnection, vessel_id: VesselId) -> MareaDBResponse {
        Mareas::new(conn)
            .create(&MareaCreateDBRequest {
                vessel_id,
                name: "Marea 12".to_string(),
                departure_date: date("2026-05-02"),
                return_date: None,
                notes: None,
            })
            .await
            .unwrap()
    }

    #[test_log::test(tokio::test)]
    async fn test_close_requires_open_marea() {
        let pool = create_test_pool().await;
        let mut conn = pool.acquire().await.unwrap();
        let vessel = insert_test_vessel(&mut conn).await;
        let marea = create_marea(&mut conn, vessel).await;

        let mut repo = Mareas::new(&mut conn);
        let closed = repo.close(vessel, marea.id, Some(date("2026-05-12"))).await.unwrap();
        assert_eq!(closed.status, MareaStatus::Closed);
        assert!(closed.closed_at.is_some());
        assert_eq!(closed.return_date, Some(date("2026-05-12")));

        // Closing again fails
        assert!(matches!(
            repo.close(vessel, marea.id, None).await.unwrap_err(),
            DbError::NotFound
        ));

        let reopened = repo.reopen(vessel, marea.id).await.unwrap();
        assert_eq!(reopened.status, MareaStatus::Open);
        assert!(reopened.closed_at.is_none());
    }

    #[test_log::test(tokio::test)]
    async fn test_totals_only_count_live_marea_movements() {
        let pool = create_test_pool().await;
        let mut conn = pool.acquire().await.unwrap();
        let vessel = insert_test_vessel(&mut conn).await;
        let user = insert_test_user(&mut conn, "totals@example.com", false).await;
        let account = insert_test_account(&mut conn, vessel).await;
        let marea = create_marea(&mut conn, vessel).await;

        let mut movements = Movements::new(&mut conn);
        let base = MovementCreateDBRequest {
            vessel_id: vessel,
            account_id: account,
            category_id: None,
            supplier_id: None,
            marea_id: Some(marea.id),
            kind: MovementKind::Income,
            transfer_group: None,
            occurred_on: date("2026-05-03"),
            description: "hake".to_string(),
            amount_cents: 80_000,
            vat_rate_bp: 0,
            vat_amount_cents: 0,
            created_by: user,
        };
        movements.create(&base).await.unwrap();
        movements
            .create(&MovementCreateDBRequest {
                kind: MovementKind::Expense,
                amount_cents: 30_000,
                description: "fuel".to_string(),
                ..base.clone()
            })
            .await
            .unwrap();
        // A movement deleted afterwards must not count
        let doomed = movements
            .create(&MovementCreateDBRequest {
                amount_cents: 99_000,
                ..base.clone()
            })
            .await
            .unwrap();
        movements.delete((vessel, doomed.id)).await.unwrap();

        let totals = Mareas::new(&mut conn).totals(vessel, marea.id).await.unwrap();
        assert_eq!(totals.gross_income_cents, 80_000);
        assert_eq!(totals.total_expense_cents, 30_000);
        assert_eq!(totals.net_result_cents(), 50_000);
        assert_eq!(totals.movement_count, 2);
    }
}
