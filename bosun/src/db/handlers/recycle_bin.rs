//! Recycle bin: listing, restoring and purging soft-deleted rows.
//!
//! The listing is a UNION over every soft-deletable table, tagged with its
//! entity type. Restore puts `deleted_at` back to NULL; purge removes the row
//! for good (foreign keys permitting).

use crate::api::models::recycle_bin::DeletedEntityType;
use crate::db::errors::{DbError, Result};
use crate::types::{VesselId, abbrev_uuid};
use chrono::{DateTime, Utc};
use sqlx::{Connection, FromRow, SqliteConnection};
use tracing::instrument;
use uuid::Uuid;

#[derive(Debug, Clone, FromRow)]
pub struct DeletedRow {
    pub entity_type: DeletedEntityType,
    pub id: Uuid,
    pub label: String,
    pub deleted_at: DateTime<Utc>,
}

// One branch per soft-deletable table; 'label' picks the most recognizable
// column of each.
const BIN_UNION: &str = r#"
    SELECT 'supplier' AS entity_type, id, name AS label, deleted_at, vessel_id FROM suppliers
    UNION ALL
    SELECT 'bank_account', id, name, deleted_at, vessel_id FROM bank_accounts
    UNION ALL
    SELECT 'category', id, name, deleted_at, vessel_id FROM categories
    UNION ALL
    SELECT 'movement', id, description, deleted_at, vessel_id FROM movements
    UNION ALL
    SELECT 'marea', id, name, deleted_at, vessel_id FROM mareas
    UNION ALL
    SELECT 'distribution_profile', id, name, deleted_at, vessel_id FROM distribution_profiles
    UNION ALL
    SELECT 'maintenance_record', id, title, deleted_at, vessel_id FROM maintenance_records
    UNION ALL
    SELECT 'crew_position', id, name, deleted_at, vessel_id FROM crew_positions
"#;

pub struct RecycleBin<'c> {
    db: &'c mut SqliteConnection,
}

impl<'c> RecycleBin<'c> {
    pub fn new(db: &'c mut SqliteConnection) -> Self {
        Self { db }
    }

    #[instrument(skip(self), fields(vessel_id = %abbrev_uuid(&vessel_id)), err)]
    pub async fn list(&mut self, vessel_id: VesselId, skip: i64, limit: i64) -> Result<Vec<DeletedRow>> {
        let sql = format!(
            "SELECT entity_type, id, label, deleted_at FROM ({BIN_UNION})
             WHERE vessel_id = ? AND deleted_at IS NOT NULL
             ORDER BY deleted_at DESC
             LIMIT ? OFFSET ?"
        );
        let rows = sqlx::query_as::<_, DeletedRow>(&sql)
            .bind(vessel_id)
            .bind(limit)
            .bind(skip)
            .fetch_all(&mut *self.db)
            .await?;

        Ok(rows)
    }

    #[instrument(skip(self), fields(vessel_id = %abbrev_uuid(&vessel_id)), err)]
    pub async fn count(&mut self, vessel_id: VesselId) -> Result<i64> {
        let sql = format!(
            "SELECT COUNT(*) FROM ({BIN_UNION}) WHERE vessel_id = ? AND deleted_at IS NOT NULL"
        );
        let count: i64 = sqlx::query_scalar(&sql)
            .bind(vessel_id)
            .fetch_one(&mut *self.db)
            .await?;
        Ok(count)
    }

    /// Restore a soft-deleted row. Movements restore their transfer partner
    /// along with them; a movement whose account or category is itself still
    /// deleted cannot come back.
    #[instrument(skip(self), fields(entity = ?entity_type, id = %abbrev_uuid(&id)), err)]
    pub async fn restore(
        &mut self,
        vessel_id: VesselId,
        entity_type: DeletedEntityType,
        id: Uuid,
    ) -> Result<bool> {
        if entity_type == DeletedEntityType::Movement {
            return self.restore_movement(vessel_id, id).await;
        }

        let sql = format!(
            "UPDATE {table} SET deleted_at = NULL, updated_at = ?
             WHERE vessel_id = ? AND id = ? AND deleted_at IS NOT NULL",
            table = entity_type.table()
        );
        let result = sqlx::query(&sql)
            .bind(Utc::now())
            .bind(vessel_id)
            .bind(id)
            .execute(&mut *self.db)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn restore_movement(&mut self, vessel_id: VesselId, id: Uuid) -> Result<bool> {
        let mut tx = self.db.begin().await?;

        // The referenced account (and category, if any) must be live again
        // before the movement can reappear in listings and balances.
        let restorable: Option<i64> = sqlx::query_scalar(
            r#"
            SELECT 1
            FROM movements m
            INNER JOIN bank_accounts a ON a.id = m.account_id
            LEFT JOIN categories c ON c.id = m.category_id
            WHERE m.vessel_id = ? AND m.id = ? AND m.deleted_at IS NOT NULL
              AND a.deleted_at IS NULL
              AND (m.category_id IS NULL OR c.deleted_at IS NULL)
            "#,
        )
        .bind(vessel_id)
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?;

        if restorable.is_none() {
            // Distinguish "gone" from "parent still deleted" for the caller
            let exists: Option<i64> = sqlx::query_scalar(
                "SELECT 1 FROM movements WHERE vessel_id = ? AND id = ? AND deleted_at IS NOT NULL",
            )
            .bind(vessel_id)
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?;
            if exists.is_some() {
                return Err(DbError::CheckViolation {
                    constraint: Some("movement_parent_live".to_string()),
                    message: "the movement's account or category is still deleted".to_string(),
                });
            }
            return Ok(false);
        }

        let result = sqlx::query(
            r#"
            UPDATE movements SET deleted_at = NULL, updated_at = ?
            WHERE vessel_id = ? AND deleted_at IS NOT NULL
              AND (id = ? OR transfer_group = (
                  SELECT transfer_group FROM movements
                  WHERE vessel_id = ? AND id = ? AND transfer_group IS NOT NULL))
            "#,
        )
        .bind(Utc::now())
        .bind(vessel_id)
        .bind(id)
        .bind(vessel_id)
        .bind(id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(result.rows_affected() > 0)
    }

    /// Hard delete a soft-deleted row. Fails with a foreign key violation if
    /// live rows still reference it.
    #[instrument(skip(self), fields(entity = ?entity_type, id = %abbrev_uuid(&id)), err)]
    pub async fn purge(
        &mut self,
        vessel_id: VesselId,
        entity_type: DeletedEntityType,
        id: Uuid,
    ) -> Result<bool> {
        if entity_type == DeletedEntityType::Movement {
            let result = sqlx::query(
                r#"
                DELETE FROM movements
                WHERE vessel_id = ? AND deleted_at IS NOT NULL
                  AND (id = ? OR transfer_group = (
                      SELECT transfer_group FROM movements
                      WHERE vessel_id = ? AND id = ? AND transfer_group IS NOT NULL))
                "#,
            )
            .bind(vessel_id)
            .bind(id)
            .bind(vessel_id)
            .bind(id)
            .execute(&mut *self.db)
            .await?;
            return Ok(result.rows_affected() > 0);
        }

        let sql = format!(
            "DELETE FROM {table} WHERE vessel_id = ? AND id = ? AND deleted_at IS NOT NULL",
            table = entity_type.table()
        );
        let result = sqlx::query(&sql)
            .bind(vessel_id)
            .bind(id)
            .execute(&mut *self.db)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::handlers::{BankAccounts, Movements, Repository, Suppliers};
    use crate::db::models::bank_accounts::AccountCreateDBRequest;
    use crate::db::models::movements::{MovementCreateDBRequest, MovementKind};
    use crate::db::models::suppliers::SupplierCreateDBRequest;
    use crate::test_utils::{
        create_test_pool, insert_test_account, insert_test_user, insert_test_vessel,
    };

    #[test_log::test(tokio::test)]
    async fn test_deleted_supplier_shows_up_and_restores() {
        let pool = create_test_pool().await;
        let mut conn = pool.acquire().await.unwrap();
        let vessel = insert_test_vessel(&mut conn).await;

        let supplier = Suppliers::new(&mut conn)
            .create(&SupplierCreateDBRequest {
                vessel_id: vessel,
                name: "Lota".to_string(),
                tax_id: None,
                email: None,
                phone: None,
                notes: None,
            })
            .await
            .unwrap();
        Suppliers::new(&mut conn).delete((vessel, supplier.id)).await.unwrap();

        let mut bin = RecycleBin::new(&mut conn);
        let rows = bin.list(vessel, 0, 10).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].entity_type, DeletedEntityType::Supplier);
        assert_eq!(rows[0].label, "Lota");

        assert!(bin.restore(vessel, DeletedEntityType::Supplier, supplier.id).await.unwrap());
        assert_eq!(bin.count(vessel).await.unwrap(), 0);
        assert!(
            Suppliers::new(&mut conn)
                .get_by_id((vessel, supplier.id))
                .await
                .unwrap()
                .is_some()
        );
    }

    #[test_log::test(tokio::test)]
    async fn test_movement_restore_blocked_by_deleted_account() {
        let pool = create_test_pool().await;
        let mut conn = pool.acquire().await.unwrap();
        let vessel = insert_test_vessel(&mut conn).await;
        let user = insert_test_user(&mut conn, "bin@example.com", false).await;

        let account = BankAccounts::new(&mut conn)
            .create(&AccountCreateDBRequest {
                vessel_id: vessel,
                name: "Doomed".to_string(),
                iban: None,
                opening_balance_cents: 0,
            })
            .await
            .unwrap();

        let movement = Movements::new(&mut conn)
            .create(&MovementCreateDBRequest {
                vessel_id: vessel,
                account_id: account.id,
                category_id: None,
                supplier_id: None,
                marea_id: None,
                kind: MovementKind::Income,
                transfer_group: None,
                occurred_on: "2026-02-02".parse().unwrap(),
                description: "sale".to_string(),
                amount_cents: 1_000,
                vat_rate_bp: 0,
                vat_amount_cents: 0,
                created_by: user,
            })
            .await
            .unwrap();

        Movements::new(&mut conn).delete((vessel, movement.id)).await.unwrap();
        BankAccounts::new(&mut conn).delete((vessel, account.id)).await.unwrap();

        let mut bin = RecycleBin::new(&mut conn);
        let err = bin
            .restore(vessel, DeletedEntityType::Movement, movement.id)
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::CheckViolation { .. }));

        // Restore the account first, then the movement comes back
        assert!(bin.restore(vessel, DeletedEntityType::BankAccount, account.id).await.unwrap());
        assert!(bin.restore(vessel, DeletedEntityType::Movement, movement.id).await.unwrap());
    }

    #[test_log::test(tokio::test)]
    async fn test_purge_removes_for_good() {
        let pool = create_test_pool().await;
        let mut conn = pool.acquire().await.unwrap();
        let vessel = insert_test_vessel(&mut conn).await;
        let _account = insert_test_account(&mut conn, vessel).await;

        let supplier = Suppliers::new(&mut conn)
            .create(&SupplierCreateDBRequest {
                vessel_id: vessel,
                name: "Temporary".to_string(),
                tax_id: None,
                email: None,
                phone: None,
                notes: None,
            })
            .await
            .unwrap();
        Suppliers::new(&mut conn).delete((vessel, supplier.id)).await.unwrap();

        let mut bin = RecycleBin::new(&mut conn);
        assert!(bin.purge(vessel, DeletedEntityType::Supplier, supplier.id).await.unwrap());
        assert_eq!(bin.count(vessel).await.unwrap(), 0);
        // Purging twice is a no-op
        assert!(!bin.purge(vessel, DeletedEntityType::Supplier, supplier.id).await.unwrap());
    }
}
