//! Database repository for movements (income, expense and transfer legs).

use crate::db::{
    errors::{DbError, Result},
    handlers::repository::Repository,
    models::{
        categories::CategoryKind,
        mareas::MareaStatus,
        movements::{
            MovementCreateDBRequest, MovementDBResponse, MovementKind, MovementUpdateDBRequest,
        },
    },
};
use crate::types::{
    AccountId, CategoryId, MareaId, MovementId, SupplierId, VesselId, abbrev_uuid,
};
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{Connection, FromRow, QueryBuilder, Sqlite, SqliteConnection};
use tracing::instrument;
use uuid::Uuid;

/// Filter for listing movements
#[derive(Debug, Clone, Default)]
pub struct MovementFilter {
    pub vessel_id: VesselId,
    pub skip: i64,
    pub limit: i64,
    pub kind: Option<MovementKind>,
    pub category_id: Option<CategoryId>,
    pub account_id: Option<AccountId>,
    pub supplier_id: Option<SupplierId>,
    pub marea_id: Option<MareaId>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    pub search: Option<String>,
}

#[derive(Debug, Clone, FromRow)]
struct Movement {
    pub id: MovementId,
    pub vessel_id: VesselId,
    pub account_id: AccountId,
    pub category_id: Option<CategoryId>,
    pub supplier_id: Option<SupplierId>,
    pub marea_id: Option<MareaId>,
    pub kind: MovementKind,
    pub transfer_group: Option<Uuid>,
    pub occurred_on: NaiveDate,
    pub description: String,
    pub amount_cents: i64,
    pub vat_rate_bp: i64,
    pub vat_amount_cents: i64,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Movement> for MovementDBResponse {
    fn from(row: Movement) -> Self {
        Self {
            id: row.id,
            vessel_id: row.vessel_id,
            account_id: row.account_id,
            category_id: row.category_id,
            supplier_id: row.supplier_id,
            marea_id: row.marea_id,
            kind: row.kind,
            transfer_group: row.transfer_group,
            occurred_on: row.occurred_on,
            description: row.description,
            amount_cents: row.amount_cents,
            vat_rate_bp: row.vat_rate_bp,
            vat_amount_cents: row.vat_amount_cents,
            created_by: row.created_by,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

const MOVEMENT_COLUMNS: &str = "id, vessel_id, account_id, category_id, supplier_id, marea_id, \
     kind, transfer_group, occurred_on, description, amount_cents, vat_rate_bp, vat_amount_cents, \
     created_by, created_at, updated_at";

pub struct Movements<'c> {
    db: &'c mut SqliteConnection,
}

impl<'c> Movements<'c> {
    pub fn new(db: &'c mut SqliteConnection) -> Self {
        Self { db }
    }

    /// Check that an account belongs to the vessel and is live
    #[instrument(skip(self), err)]
    pub async fn account_exists(&mut self, vessel_id: VesselId, account_id: AccountId) -> Result<bool> {
        let found: Option<i64> = sqlx::query_scalar(
            "SELECT 1 FROM bank_accounts WHERE id = ? AND vessel_id = ? AND deleted_at IS NULL",
        )
        .bind(account_id)
        .bind(vessel_id)
        .fetch_optional(&mut *self.db)
        .await?;
        Ok(found.is_some())
    }

    /// Look up a live category of the vessel, returning its kind
    #[instrument(skip(self), err)]
    pub async fn category_kind(
        &mut self,
        vessel_id: VesselId,
        category_id: CategoryId,
    ) -> Result<Option<CategoryKind>> {
        let kind: Option<CategoryKind> = sqlx::query_scalar(
            "SELECT kind FROM categories WHERE id = ? AND vessel_id = ? AND deleted_at IS NULL",
        )
        .bind(category_id)
        .bind(vessel_id)
        .fetch_optional(&mut *self.db)
        .await?;
        Ok(kind)
    }

    /// Check that a supplier belongs to the vessel and is live
    #[instrument(skip(self), err)]
    pub async fn supplier_exists(&mut self, vessel_id: VesselId, supplier_id: SupplierId) -> Result<bool> {
        let found: Option<i64> = sqlx::query_scalar(
            "SELECT 1 FROM suppliers WHERE id = ? AND vessel_id = ? AND deleted_at IS NULL",
        )
        .bind(supplier_id)
        .bind(vessel_id)
        .fetch_optional(&mut *self.db)
        .await?;
        Ok(found.is_some())
    }

    /// Look up a live marea of the vessel, returning its status
    #[instrument(skip(self), err)]
    pub async fn marea_status(
        &mut self,
        vessel_id: VesselId,
        marea_id: MareaId,
    ) -> Result<Option<MareaStatus>> {
        let status: Option<MareaStatus> = sqlx::query_scalar(
            "SELECT status FROM mareas WHERE id = ? AND vessel_id = ? AND deleted_at IS NULL",
        )
        .bind(marea_id)
        .bind(vessel_id)
        .fetch_optional(&mut *self.db)
        .await?;
        Ok(status)
    }

    #[instrument(skip(self, filter), fields(vessel_id = %abbrev_uuid(&filter.vessel_id)), err)]
    pub async fn count(&mut self, filter: &MovementFilter) -> Result<i64> {
        let mut builder = QueryBuilder::<Sqlite>::new("SELECT COUNT(*) FROM movements WHERE 1 = 1");
        push_filters(&mut builder, filter);

        let count: i64 = builder.build_query_scalar().fetch_one(&mut *self.db).await?;
        Ok(count)
    }

    /// Create the two legs of an account-to-account transfer atomically.
    /// Returns (outgoing leg, incoming leg).
    #[instrument(skip(self, request), err)]
    pub async fn create_transfer(
        &mut self,
        request: &TransferCreateDBRequest,
    ) -> Result<(MovementDBResponse, MovementDBResponse)> {
        let transfer_group = Uuid::new_v4();
        let now = Utc::now();
        let sql = format!(
            "INSERT INTO movements
                 (id, vessel_id, account_id, category_id, supplier_id, marea_id, kind,
                  transfer_group, occurred_on, description, amount_cents, vat_rate_bp,
                  vat_amount_cents, created_by, created_at, updated_at)
             VALUES (?, ?, ?, NULL, NULL, NULL, ?, ?, ?, ?, ?, 0, 0, ?, ?, ?)
             RETURNING {MOVEMENT_COLUMNS}"
        );

        let mut tx = self.db.begin().await?;

        let mut legs = Vec::with_capacity(2);
        for (kind, account_id) in [
            (MovementKind::TransferOut, request.from_account_id),
            (MovementKind::TransferIn, request.to_account_id),
        ] {
            let leg = sqlx::query_as::<_, Movement>(&sql)
                .bind(Uuid::new_v4())
                .bind(request.vessel_id)
                .bind(account_id)
                .bind(kind)
                .bind(transfer_group)
                .bind(request.occurred_on)
                .bind(&request.description)
                .bind(request.amount_cents)
                .bind(request.created_by)
                .bind(now)
                .bind(now)
                .fetch_one(&mut *tx)
                .await?;
            legs.push(leg);
        }

        tx.commit().await?;

        let in_leg = legs.pop().ok_or(DbError::NotFound)?;
        let out_leg = legs.pop().ok_or(DbError::NotFound)?;
        Ok((MovementDBResponse::from(out_leg), MovementDBResponse::from(in_leg)))
    }
}

/// Inputs for a two-leg transfer
#[derive(Debug, Clone)]
pub struct TransferCreateDBRequest {
    pub vessel_id: VesselId,
    pub from_account_id: AccountId,
    pub to_account_id: AccountId,
    pub occurred_on: NaiveDate,
    pub description: String,
    pub amount_cents: i64,
    pub created_by: Uuid,
}

fn push_filters(builder: &mut QueryBuilder<'_, Sqlite>, filter: &MovementFilter) {
    builder.push(" AND vessel_id = ").push_bind(filter.vessel_id);
    builder.push(" AND deleted_at IS NULL");
    if let Some(kind) = filter.kind {
        builder.push(" AND kind = ").push_bind(kind);
    }
    if let Some(category_id) = filter.category_id {
        builder.push(" AND category_id = ").push_bind(category_id);
    }
    if let Some(account_id) = filter.account_id {
        builder.push(" AND account_id = ").push_bind(account_id);
    }
    if let Some(supplier_id) = filter.supplier_id {
        builder.push(" AND supplier_id = ").push_bind(supplier_id);
    }
    if let Some(marea_id) = filter.marea_id {
        builder.push(" AND marea_id = ").push_bind(marea_id);
    }
    if let Some(from) = filter.from {
        builder.push(" AND occurred_on >= ").push_bind(from);
    }
    if let Some(to) = filter.to {
        builder.push(" AND occurred_on <= ").push_bind(to);
    }
    if let Some(search) = &filter.search {
        builder
            .push(" AND description LIKE ")
            .push_bind(format!("%{search}%"));
    }
}

#[async_trait::async_trait]
impl<'c> Repository for Movements<'c> {
    type CreateRequest = MovementCreateDBRequest;
    type UpdateRequest = MovementUpdateDBRequest;
    type Response = MovementDBResponse;
    type Id = (VesselId, MovementId);
    type Filter = MovementFilter;

    #[instrument(skip(self, request), fields(vessel_id = %abbrev_uuid(&request.vessel_id)), err)]
    async fn create(&mut self, request: &Self::CreateRequest) -> Result<Self::Response> {
        let now = Utc::now();
        let sql = format!(
            "INSERT INTO movements
                 (id, vessel_id, account_id, category_id, supplier_id, marea_id, kind,
                  transfer_group, occurred_on, description, amount_cents, vat_rate_bp,
                  vat_amount_cents, created_by, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
             RETURNING {MOVEMENT_COLUMNS}"
        );
        let row = sqlx::query_as::<_, Movement>(&sql)
            .bind(Uuid::new_v4())
            .bind(request.vessel_id)
            .bind(request.account_id)
            .bind(request.category_id)
            .bind(request.supplier_id)
            .bind(request.marea_id)
            .bind(request.kind)
            .bind(request.transfer_group)
            .bind(request.occurred_on)
            .bind(&request.description)
            .bind(request.amount_cents)
            .bind(request.vat_rate_bp)
            .bind(request.vat_amount_cents)
            .bind(request.created_by)
            .bind(now)
            .bind(now)
            .fetch_one(&mut *self.db)
            .await?;

        Ok(MovementDBResponse::from(row))
    }

    #[instrument(skip(self), fields(movement_id = %abbrev_uuid(&id.1)), err)]
    async fn get_by_id(&mut self, id: Self::Id) -> Result<Option<Self::Response>> {
        let sql = format!(
            "SELECT {MOVEMENT_COLUMNS} FROM movements
             WHERE vessel_id = ? AND id = ? AND deleted_at IS NULL"
        );
        let row = sqlx::query_as::<_, Movement>(&sql)
            .bind(id.0)
            .bind(id.1)
            .fetch_optional(&mut *self.db)
            .await?;

        Ok(row.map(MovementDBResponse::from))
    }

    #[instrument(skip(self, filter), fields(vessel_id = %abbrev_uuid(&filter.vessel_id)), err)]
    async fn list(&mut self, filter: &Self::Filter) -> Result<Vec<Self::Response>> {
        let mut builder = QueryBuilder::<Sqlite>::new(format!(
            "SELECT {MOVEMENT_COLUMNS} FROM movements WHERE 1 = 1"
        ));
        push_filters(&mut builder, filter);
        builder.push(" ORDER BY occurred_on DESC, created_at DESC");
        builder.push(" LIMIT ").push_bind(filter.limit);
        builder.push(" OFFSET ").push_bind(filter.skip);

        let rows: Vec<Movement> = builder.build_query_as().fetch_all(&mut *self.db).await?;
        Ok(rows.into_iter().map(MovementDBResponse::from).collect())
    }

    #[instrument(skip(self, request), fields(movement_id = %abbrev_uuid(&id.1)), err)]
    async fn update(&mut self, id: Self::Id, request: &Self::UpdateRequest) -> Result<Self::Response> {
        let sql = format!(
            "UPDATE movements SET
                 account_id = COALESCE(?, account_id),
                 category_id = CASE WHEN ? THEN ? ELSE category_id END,
                 supplier_id = CASE WHEN ? THEN ? ELSE supplier_id END,
                 marea_id = CASE WHEN ? THEN ? ELSE marea_id END,
                 occurred_on = COALESCE(?, occurred_on),
                 description = COALESCE(?, description),
                 amount_cents = COALESCE(?, amount_cents),
                 vat_rate_bp = COALESCE(?, vat_rate_bp),
                 vat_amount_cents = COALESCE(?, vat_amount_cents),
                 updated_at = ?
             WHERE vessel_id = ? AND id = ? AND deleted_at IS NULL
             RETURNING {MOVEMENT_COLUMNS}"
        );
        let row = sqlx::query_as::<_, Movement>(&sql)
            .bind(request.account_id)
            .bind(request.category_id.is_some())
            .bind(request.category_id.flatten())
            .bind(request.supplier_id.is_some())
            .bind(request.supplier_id.flatten())
            .bind(request.marea_id.is_some())
            .bind(request.marea_id.flatten())
            .bind(request.occurred_on)
            .bind(&request.description)
            .bind(request.amount_cents)
            .bind(request.vat_rate_bp)
            .bind(request.vat_amount_cents)
            .bind(Utc::now())
            .bind(id.0)
            .bind(id.1)
            .fetch_optional(&mut *self.db)
            .await?
            .ok_or(DbError::NotFound)?;

        Ok(MovementDBResponse::from(row))
    }

    /// Soft delete. Transfer legs always go together: deleting either leg
    /// deletes the whole transfer group.
    #[instrument(skip(self), fields(movement_id = %abbrev_uuid(&id.1)), err)]
    async fn delete(&mut self, id: Self::Id) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE movements SET deleted_at = ?, updated_at = ?
            WHERE vessel_id = ? AND deleted_at IS NULL
              AND (id = ? OR transfer_group = (
                  SELECT transfer_group FROM movements
                  WHERE vessel_id = ? AND id = ? AND transfer_group IS NOT NULL))
            "#,
        )
        .bind(Utc::now())
        .bind(Utc::now())
        .bind(id.0)
        .bind(id.1)
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
    use crate::test_utils::{
        create_test_pool, insert_test_account, insert_test_user, insert_test_vessel,
    };
    use chrono::NaiveDate;

    fn date(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    fn income(
        vessel_id: VesselId,
        account_id: AccountId,
        created_by: Uuid,
        amount_cents: i64,
        occurred_on: &str,
    ) -> MovementCreateDBRequest {
        MovementCreateDBRequest {
            vessel_id,
            account_id,
            category_id: None,
            supplier_id: None,
            marea_id: None,
            kind: MovementKind::Income,
            transfer_group: None,
            occurred_on: date(occurred_on),
            description: "catch sale".to_string(),
            amount_cents,
            vat_rate_bp: 0,
            vat_amount_cents: 0,
            created_by,
        }
    }

    #[test_log::test(tokio::test)]
    async fn test_create_and_filter_by_date() {
        let pool = create_test_pool().await;
        let mut conn = pool.acquire().await.unwrap();
        let vessel = insert_test_vessel(&mut conn).await;
        let user = insert_test_user(&mut conn, "m@example.com", false).await;
        let account = insert_test_account(&mut conn, vessel).await;

        let mut repo = Movements::new(&mut conn);
        repo.create(&income(vessel, account, user, 10_000, "2026-03-01")).await.unwrap();
        repo.create(&income(vessel, account, user, 20_000, "2026-03-15")).await.unwrap();
        repo.create(&income(vessel, account, user, 30_000, "2026-04-01")).await.unwrap();

        let filter = MovementFilter {
            vessel_id: vessel,
            skip: 0,
            limit: 10,
            from: Some(date("2026-03-01")),
            to: Some(date("2026-03-31")),
            ..Default::default()
        };
        let march = repo.list(&filter).await.unwrap();
        assert_eq!(march.len(), 2);
        assert_eq!(repo.count(&filter).await.unwrap(), 2);
    }

    #[test_log::test(tokio::test)]
    async fn test_transfer_legs_share_group_and_delete_together() {
        let pool = create_test_pool().await;
        let mut conn = pool.acquire().await.unwrap();
        let vessel = insert_test_vessel(&mut conn).await;
        let user = insert_test_user(&mut conn, "t@example.com", false).await;
        let checking = insert_test_account(&mut conn, vessel).await;
        let savings = insert_test_account(&mut conn, vessel).await;

        let mut repo = Movements::new(&mut conn);
        let (out_leg, in_leg) = repo
            .create_transfer(&TransferCreateDBRequest {
                vessel_id: vessel,
                from_account_id: checking,
                to_account_id: savings,
                occurred_on: date("2026-02-01"),
                description: "top up savings".to_string(),
                amount_cents: 50_000,
                created_by: user,
            })
            .await
            .unwrap();

        assert_eq!(out_leg.kind, MovementKind::TransferOut);
        assert_eq!(in_leg.kind, MovementKind::TransferIn);
        assert_eq!(out_leg.transfer_group, in_leg.transfer_group);
        assert!(out_leg.transfer_group.is_some());

        // Deleting one leg removes both
        assert!(repo.delete((vessel, in_leg.id)).await.unwrap());
        assert!(repo.get_by_id((vessel, out_leg.id)).await.unwrap().is_none());
        assert!(repo.get_by_id((vessel, in_leg.id)).await.unwrap().is_none());
    }

    #[test_log::test(tokio::test)]
    async fn test_cross_vessel_lookup_misses() {
        let pool = create_test_pool().await;
        let mut conn = pool.acquire().await.unwrap();
        let vessel_a = insert_test_vessel(&mut conn).await;
        let vessel_b = insert_test_vessel(&mut conn).await;
        let user = insert_test_user(&mut conn, "x@example.com", false).await;
        let account = insert_test_account(&mut conn, vessel_a).await;

        let mut repo = Movements::new(&mut conn);
        let movement = repo
            .create(&income(vessel_a, account, user, 5_000, "2026-01-10"))
            .await
            .unwrap();

        assert!(repo.get_by_id((vessel_b, movement.id)).await.unwrap().is_none());
    }

    #[test_log::test(tokio::test)]
    async fn test_update_can_clear_marea_link() {
        let pool = create_test_pool().await;
        let mut conn = pool.acquire().await.unwrap();
        let vessel = insert_test_vessel(&mut conn).await;
        let user = insert_test_user(&mut conn, "u@example.com", false).await;
        let account = insert_test_account(&mut conn, vessel).await;

        let mut repo = Movements::new(&mut conn);
        let movement = repo
            .create(&income(vessel, account, user, 5_000, "2026-01-10"))
            .await
            .unwrap();

        let updated = repo
            .update(
                (vessel, movement.id),
                &MovementUpdateDBRequest {
                    description: Some("corrected".to_string()),
                    marea_id: Some(None),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.description, "corrected");
        assert!(updated.marea_id.is_none());
        assert_eq!(updated.amount_cents, 5_000);
    }
}
