//! Aggregation queries for the reporting endpoints.
//!
//! Reports are pure SUM/GROUP BY over live movements; VAT figures were
//! extracted when each movement was written, so no rate math happens here.

use crate::db::{errors::Result, models::categories::CategoryKind, models::mareas::MareaStatus};
use crate::types::{CategoryId, MareaId, VesselId, abbrev_uuid};
use chrono::NaiveDate;
use sqlx::{FromRow, SqliteConnection};
use tracing::instrument;

#[derive(Debug, Clone, Copy)]
pub struct ReportRange {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

#[derive(Debug, Clone, FromRow)]
pub struct CategoryTotalsRow {
    pub category_id: Option<CategoryId>,
    pub category_name: Option<String>,
    pub kind: CategoryKind,
    pub amount_cents: i64,
    pub vat_amount_cents: i64,
    pub movement_count: i64,
}

#[derive(Debug, Clone, FromRow)]
pub struct VatTotalsRow {
    pub vat_rate_bp: i64,
    pub kind: CategoryKind,
    pub gross_cents: i64,
    pub vat_cents: i64,
    pub movement_count: i64,
}

#[derive(Debug, Clone, FromRow)]
pub struct MareaTotalsRow {
    pub marea_id: MareaId,
    pub name: String,
    pub status: MareaStatus,
    pub departure_date: NaiveDate,
    pub return_date: Option<NaiveDate>,
    pub gross_income_cents: i64,
    pub total_expense_cents: i64,
}

pub struct Reports<'c> {
    db: &'c mut SqliteConnection,
}

impl<'c> Reports<'c> {
    pub fn new(db: &'c mut SqliteConnection) -> Self {
        Self { db }
    }

    /// Per-category totals within the range. Transfer legs are excluded; they
    /// move money between accounts without being income or expense.
    #[instrument(skip(self, range), fields(vessel_id = %abbrev_uuid(&vessel_id)), err)]
    pub async fn category_totals(
        &mut self,
        vessel_id: VesselId,
        range: ReportRange,
    ) -> Result<Vec<CategoryTotalsRow>> {
        let rows = sqlx::query_as::<_, CategoryTotalsRow>(
            r#"
            SELECT m.category_id,
                   c.name AS category_name,
                   m.kind AS kind,
                   SUM(m.amount_cents) AS amount_cents,
                   SUM(m.vat_amount_cents) AS vat_amount_cents,
                   COUNT(*) AS movement_count
            FROM movements m
            LEFT JOIN categories c ON c.id = m.category_id
            WHERE m.vessel_id = ? AND m.deleted_at IS NULL
              AND m.kind IN ('income', 'expense')
              AND (? IS NULL OR m.occurred_on >= ?)
              AND (? IS NULL OR m.occurred_on <= ?)
            GROUP BY m.category_id, c.name, m.kind
            ORDER BY m.kind, amount_cents DESC
            "#,
        )
        .bind(vessel_id)
        .bind(range.from)
        .bind(range.from)
        .bind(range.to)
        .bind(range.to)
        .fetch_all(&mut *self.db)
        .await?;

        Ok(rows)
    }

    /// Per-rate VAT totals within the range, split by income/expense side.
    #[instrument(skip(self, range), fields(vessel_id = %abbrev_uuid(&vessel_id)), err)]
    pub async fn vat_totals(
        &mut self,
        vessel_id: VesselId,
        range: ReportRange,
    ) -> Result<Vec<VatTotalsRow>> {
        let rows = sqlx::query_as::<_, VatTotalsRow>(
            r#"
            SELECT vat_rate_bp,
                   kind,
                   SUM(amount_cents) AS gross_cents,
                   SUM(vat_amount_cents) AS vat_cents,
                   COUNT(*) AS movement_count
            FROM movements
            WHERE vessel_id = ? AND deleted_at IS NULL
              AND kind IN ('income', 'expense')
              AND (? IS NULL OR occurred_on >= ?)
              AND (? IS NULL OR occurred_on <= ?)
            GROUP BY vat_rate_bp, kind
            ORDER BY vat_rate_bp, kind
            "#,
        )
        .bind(vessel_id)
        .bind(range.from)
        .bind(range.from)
        .bind(range.to)
        .bind(range.to)
        .fetch_all(&mut *self.db)
        .await?;

        Ok(rows)
    }

    /// Profitability of every live marea of the vessel.
    #[instrument(skip(self), fields(vessel_id = %abbrev_uuid(&vessel_id)), err)]
    pub async fn marea_totals(&mut self, vessel_id: VesselId) -> Result<Vec<MareaTotalsRow>> {
        let rows = sqlx::query_as::<_, MareaTotalsRow>(
            r#"
            SELECT ma.id AS marea_id,
                   ma.name,
                   ma.status,
                   ma.departure_date,
                   ma.return_date,
                   COALESCE(SUM(CASE WHEN m.kind = 'income' THEN m.amount_cents ELSE 0 END), 0) AS gross_income_cents,
                   COALESCE(SUM(CASE WHEN m.kind = 'expense' THEN m.amount_cents ELSE 0 END), 0) AS total_expense_cents
            FROM mareas ma
            LEFT JOIN movements m
                ON m.marea_id = ma.id AND m.deleted_at IS NULL
            WHERE ma.vessel_id = ? AND ma.deleted_at IS NULL
            GROUP BY ma.id, ma.name, ma.status, ma.departure_date, ma.return_date
            ORDER BY ma.departure_date DESC
            "#,
        )
        .bind(vessel_id)
        .fetch_all(&mut *self.db)
        .await?;

        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::handlers::{Categories, Movements, Repository};
    use crate::db::models::categories::CategoryCreateDBRequest;
    use crate::db::models::movements::{MovementCreateDBRequest, MovementKind};
    use crate::test_utils::{
        create_test_pool, insert_test_account, insert_test_user, insert_test_vessel,
    };
    use uuid::Uuid;

    async fn movement(
        conn: &mut SqliteConnection,
        vessel: VesselId,
        account: Uuid,
        user: Uuid,
        kind: MovementKind,
        category_id: Option<Uuid>,
        amount_cents: i64,
        vat_rate_bp: i64,
        vat_amount_cents: i64,
        occurred_on: &str,
    ) {
        Movements::new(conn)
            .create(&MovementCreateDBRequest {
                vessel_id: vessel,
                account_id: account,
                category_id,
                supplier_id: None,
                marea_id: None,
                kind,
                transfer_group: None,
                occurred_on: occurred_on.parse().unwrap(),
                description: "r".to_string(),
                amount_cents,
                vat_rate_bp,
                vat_amount_cents,
                created_by: user,
            })
            .await
            .unwrap();
    }

    #[test_log::test(tokio::test)]
    async fn test_category_totals_groups_and_ranges() {
        let pool = create_test_pool().await;
        let mut conn = pool.acquire().await.unwrap();
        let vessel = insert_test_vessel(&mut conn).await;
        let user = insert_test_user(&mut conn, "r@example.com", false).await;
        let account = insert_test_account(&mut conn, vessel).await;

        let fuel = Categories::new(&mut conn)
            .create(&CategoryCreateDBRequest {
                vessel_id: vessel,
                name: "Fuel".to_string(),
                kind: CategoryKind::Expense,
            })
            .await
            .unwrap();

        movement(&mut conn, vessel, account, user, MovementKind::Income, None, 100_000, 0, 0, "2026-06-01").await;
        movement(&mut conn, vessel, account, user, MovementKind::Expense, Some(fuel.id), 20_000, 2300, 3_740, "2026-06-02").await;
        movement(&mut conn, vessel, account, user, MovementKind::Expense, Some(fuel.id), 10_000, 2300, 1_870, "2026-06-03").await;
        // Outside the range
        movement(&mut conn, vessel, account, user, MovementKind::Expense, Some(fuel.id), 99_000, 0, 0, "2026-07-15").await;

        let mut reports = Reports::new(&mut conn);
        let rows = reports
            .category_totals(
                vessel,
                ReportRange {
                    from: Some("2026-06-01".parse().unwrap()),
                    to: Some("2026-06-30".parse().unwrap()),
                },
            )
            .await
            .unwrap();

        assert_eq!(rows.len(), 2);
        let fuel_row = rows.iter().find(|r| r.category_id == Some(fuel.id)).unwrap();
        assert_eq!(fuel_row.amount_cents, 30_000);
        assert_eq!(fuel_row.vat_amount_cents, 5_610);
        assert_eq!(fuel_row.movement_count, 2);
        assert_eq!(fuel_row.category_name.as_deref(), Some("Fuel"));

        let uncategorized = rows.iter().find(|r| r.category_id.is_none()).unwrap();
        assert_eq!(uncategorized.kind, CategoryKind::Income);
        assert_eq!(uncategorized.amount_cents, 100_000);
    }

    #[test_log::test(tokio::test)]
    async fn test_vat_totals_split_by_rate_and_kind() {
        let pool = create_test_pool().await;
        let mut conn = pool.acquire().await.unwrap();
        let vessel = insert_test_vessel(&mut conn).await;
        let user = insert_test_user(&mut conn, "v@example.com", false).await;
        let account = insert_test_account(&mut conn, vessel).await;

        movement(&mut conn, vessel, account, user, MovementKind::Income, None, 123_000, 2300, 23_000, "2026-06-01").await;
        movement(&mut conn, vessel, account, user, MovementKind::Expense, None, 61_500, 2300, 11_500, "2026-06-02").await;
        movement(&mut conn, vessel, account, user, MovementKind::Income, None, 50_000, 0, 0, "2026-06-03").await;

        let mut reports = Reports::new(&mut conn);
        let rows = reports
            .vat_totals(vessel, ReportRange { from: None, to: None })
            .await
            .unwrap();

        assert_eq!(rows.len(), 3);
        let income_23 = rows
            .iter()
            .find(|r| r.vat_rate_bp == 2300 && r.kind == CategoryKind::Income)
            .unwrap();
        assert_eq!(income_23.vat_cents, 23_000);
        assert_eq!(income_23.gross_cents, 123_000);
    }
}
