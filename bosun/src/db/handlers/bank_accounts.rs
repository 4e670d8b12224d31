//! Database repository for bank accounts.
//!
//! Account balances are derived, never stored: opening balance plus the
//! signed sum of live movements on the account.

use crate::db::{
    errors::{DbError, Result},
    handlers::repository::Repository,
    models::bank_accounts::{AccountCreateDBRequest, AccountDBResponse, AccountUpdateDBRequest},
};
use crate::types::{AccountId, VesselId, abbrev_uuid};
use chrono::{DateTime, Utc};
use sqlx::{FromRow, SqliteConnection};
use tracing::instrument;
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct AccountFilter {
    pub vessel_id: VesselId,
    pub skip: i64,
    pub limit: i64,
}

#[derive(Debug, Clone, FromRow)]
struct Account {
    pub id: AccountId,
    pub vessel_id: VesselId,
    pub name: String,
    pub iban: Option<String>,
    pub opening_balance_cents: i64,
    pub balance_cents: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Account> for AccountDBResponse {
    fn from(row: Account) -> Self {
        Self {
            id: row.id,
            vessel_id: row.vessel_id,
            name: row.name,
            iban: row.iban,
            opening_balance_cents: row.opening_balance_cents,
            balance_cents: row.balance_cents,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

// Balance subquery shared by every select on this table
const ACCOUNT_SELECT: &str = r#"
    SELECT a.id, a.vessel_id, a.name, a.iban, a.opening_balance_cents,
           a.opening_balance_cents + COALESCE((
               SELECT SUM(CASE WHEN m.kind IN ('income', 'transfer_in')
                               THEN m.amount_cents ELSE -m.amount_cents END)
               FROM movements m
               WHERE m.account_id = a.id AND m.deleted_at IS NULL
           ), 0) AS balance_cents,
           a.created_at, a.updated_at
    FROM bank_accounts a
"#;

pub struct BankAccounts<'c> {
    db: &'c mut SqliteConnection,
}

impl<'c> BankAccounts<'c> {
    pub fn new(db: &'c mut SqliteConnection) -> Self {
        Self { db }
    }

    #[instrument(skip(self), fields(vessel_id = %abbrev_uuid(&vessel_id)), err)]
    pub async fn count(&mut self, vessel_id: VesselId) -> Result<i64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM bank_accounts WHERE vessel_id = ? AND deleted_at IS NULL",
        )
        .bind(vessel_id)
        .fetch_one(&mut *self.db)
        .await?;
        Ok(count)
    }
}

#[async_trait::async_trait]
impl<'c> Repository for BankAccounts<'c> {
    type CreateRequest = AccountCreateDBRequest;
    type UpdateRequest = AccountUpdateDBRequest;
    type Response = AccountDBResponse;
    type Id = (VesselId, AccountId);
    type Filter = AccountFilter;

    #[instrument(skip(self, request), fields(name = %request.name), err)]
    async fn create(&mut self, request: &Self::CreateRequest) -> Result<Self::Response> {
        let account_id = Uuid::new_v4();
        let now = Utc::now();

        sqlx::query(
            "INSERT INTO bank_accounts (id, vessel_id, name, iban, opening_balance_cents, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(account_id)
        .bind(request.vessel_id)
        .bind(&request.name)
        .bind(&request.iban)
        .bind(request.opening_balance_cents)
        .bind(now)
        .bind(now)
        .execute(&mut *self.db)
        .await?;

        self.get_by_id((request.vessel_id, account_id))
            .await?
            .ok_or(DbError::NotFound)
    }

    #[instrument(skip(self), fields(account_id = %abbrev_uuid(&id.1)), err)]
    async fn get_by_id(&mut self, id: Self::Id) -> Result<Option<Self::Response>> {
        let sql = format!("{ACCOUNT_SELECT} WHERE a.vessel_id = ? AND a.id = ? AND a.deleted_at IS NULL");
        let row = sqlx::query_as::<_, Account>(&sql)
            .bind(id.0)
            .bind(id.1)
            .fetch_optional(&mut *self.db)
            .await?;

        Ok(row.map(AccountDBResponse::from))
    }

    #[instrument(skip(self, filter), fields(vessel_id = %abbrev_uuid(&filter.vessel_id)), err)]
    async fn list(&mut self, filter: &Self::Filter) -> Result<Vec<Self::Response>> {
        let sql = format!(
            "{ACCOUNT_SELECT} WHERE a.vessel_id = ? AND a.deleted_at IS NULL
             ORDER BY a.name LIMIT ? OFFSET ?"
        );
        let rows = sqlx::query_as::<_, Account>(&sql)
            .bind(filter.vessel_id)
            .bind(filter.limit)
            .bind(filter.skip)
            .fetch_all(&mut *self.db)
            .await?;

        Ok(rows.into_iter().map(AccountDBResponse::from).collect())
    }

    #[instrument(skip(self, request), fields(account_id = %abbrev_uuid(&id.1)), err)]
    async fn update(&mut self, id: Self::Id, request: &Self::UpdateRequest) -> Result<Self::Response> {
        let result = sqlx::query(
            "UPDATE bank_accounts SET
                 name = COALESCE(?, name),
                 iban = COALESCE(?, iban),
                 updated_at = ?
             WHERE vessel_id = ? AND id = ? AND deleted_at IS NULL",
        )
        .bind(&request.name)
        .bind(&request.iban)
        .bind(Utc::now())
        .bind(id.0)
        .bind(id.1)
        .execute(&mut *self.db)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::NotFound);
        }

        self.get_by_id(id).await?.ok_or(DbError::NotFound)
    }

    #[instrument(skip(self), fields(account_id = %abbrev_uuid(&id.1)), err)]
    async fn delete(&mut self, id: Self::Id) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE bank_accounts SET deleted_at = ?, updated_at = ?
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
    async fn test_new_account_balance_is_opening_balance() {
        let pool = create_test_pool().await;
        let mut conn = pool.acquire().await.unwrap();
        let vessel = insert_test_vessel(&mut conn).await;

        let mut repo = BankAccounts::new(&mut conn);
        let account = repo
            .create(&AccountCreateDBRequest {
                vessel_id: vessel,
                name: "Operating".to_string(),
                iban: Some("PT50000201231234567890154".to_string()),
                opening_balance_cents: 150_000,
            })
            .await
            .unwrap();

        assert_eq!(account.opening_balance_cents, 150_000);
        assert_eq!(account.balance_cents, 150_000);
    }
}
