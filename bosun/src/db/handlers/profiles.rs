//! Database repository for distribution profiles and their items.

use crate::db::{
    errors::{DbError, Result},
    handlers::repository::Repository,
    models::profiles::{
        ItemCreateDBRequest, ItemDBResponse, ItemOperation, ItemSource, ProfileCreateDBRequest,
        ProfileDBResponse, ProfileUpdateDBRequest, ItemUpdateDBRequest, ValueKind,
    },
};
use crate::types::{ProfileId, VesselId, abbrev_uuid};
use chrono::{DateTime, Utc};
use sqlx::{FromRow, SqliteConnection};
use tracing::instrument;
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct ProfileFilter {
    pub vessel_id: VesselId,
    pub skip: i64,
    pub limit: i64,
}

#[derive(Debug, Clone, FromRow)]
struct Profile {
    pub id: ProfileId,
    pub vessel_id: VesselId,
    pub name: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Profile> for ProfileDBResponse {
    fn from(row: Profile) -> Self {
        Self {
            id: row.id,
            vessel_id: row.vessel_id,
            name: row.name,
            description: row.description,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, Clone, FromRow)]
struct Item {
    pub id: Uuid,
    pub profile_id: ProfileId,
    pub order_index: i64,
    pub label: String,
    pub operation: ItemOperation,
    pub source: ItemSource,
    pub ref_order_index: Option<i64>,
    pub value_kind: ValueKind,
    pub value: i64,
    pub is_payout: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Item> for ItemDBResponse {
    fn from(row: Item) -> Self {
        Self {
            id: row.id,
            profile_id: row.profile_id,
            order_index: row.order_index,
            label: row.label,
            operation: row.operation,
            source: row.source,
            ref_order_index: row.ref_order_index,
            value_kind: row.value_kind,
            value: row.value,
            is_payout: row.is_payout,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

const PROFILE_COLUMNS: &str = "id, vessel_id, name, description, created_at, updated_at";
const ITEM_COLUMNS: &str = "id, profile_id, order_index, label, operation, source, \
     ref_order_index, value_kind, value, is_payout, created_at, updated_at";

pub struct Profiles<'c> {
    db: &'c mut SqliteConnection,
}

impl<'c> Profiles<'c> {
    pub fn new(db: &'c mut SqliteConnection) -> Self {
        Self { db }
    }

    #[instrument(skip(self), fields(vessel_id = %abbrev_uuid(&vessel_id)), err)]
    pub async fn count(&mut self, vessel_id: VesselId) -> Result<i64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM distribution_profiles WHERE vessel_id = ? AND deleted_at IS NULL",
        )
        .bind(vessel_id)
        .fetch_one(&mut *self.db)
        .await?;
        Ok(count)
    }

    /// All items of a profile, ordered for evaluation
    #[instrument(skip(self), fields(profile_id = %abbrev_uuid(&profile_id)), err)]
    pub async fn list_items(&mut self, profile_id: ProfileId) -> Result<Vec<ItemDBResponse>> {
        let sql = format!(
            "SELECT {ITEM_COLUMNS} FROM distribution_items
             WHERE profile_id = ? ORDER BY order_index"
        );
        let rows = sqlx::query_as::<_, Item>(&sql)
            .bind(profile_id)
            .fetch_all(&mut *self.db)
            .await?;

        Ok(rows.into_iter().map(ItemDBResponse::from).collect())
    }

    #[instrument(skip(self), fields(item_id = %abbrev_uuid(&item_id)), err)]
    pub async fn get_item(&mut self, profile_id: ProfileId, item_id: Uuid) -> Result<Option<ItemDBResponse>> {
        let sql = format!(
            "SELECT {ITEM_COLUMNS} FROM distribution_items WHERE profile_id = ? AND id = ?"
        );
        let row = sqlx::query_as::<_, Item>(&sql)
            .bind(profile_id)
            .bind(item_id)
            .fetch_optional(&mut *self.db)
            .await?;

        Ok(row.map(ItemDBResponse::from))
    }

    #[instrument(skip(self, request), fields(profile_id = %abbrev_uuid(&request.profile_id)), err)]
    pub async fn create_item(&mut self, request: &ItemCreateDBRequest) -> Result<ItemDBResponse> {
        let now = Utc::now();
        let sql = format!(
            "INSERT INTO distribution_items
                 (id, profile_id, order_index, label, operation, source, ref_order_index,
                  value_kind, value, is_payout, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
             RETURNING {ITEM_COLUMNS}"
        );
        let row = sqlx::query_as::<_, Item>(&sql)
            .bind(Uuid::new_v4())
            .bind(request.profile_id)
            .bind(request.order_index)
            .bind(&request.label)
            .bind(request.operation)
            .bind(request.source)
            .bind(request.ref_order_index)
            .bind(request.value_kind)
            .bind(request.value)
            .bind(request.is_payout)
            .bind(now)
            .bind(now)
            .fetch_one(&mut *self.db)
            .await?;

        Ok(ItemDBResponse::from(row))
    }

    #[instrument(skip(self, request), fields(item_id = %abbrev_uuid(&item_id)), err)]
    pub async fn update_item(
        &mut self,
        profile_id: ProfileId,
        item_id: Uuid,
        request: &ItemUpdateDBRequest,
    ) -> Result<ItemDBResponse> {
        let sql = format!(
            "UPDATE distribution_items SET
                 label = COALESCE(?, label),
                 operation = COALESCE(?, operation),
                 source = COALESCE(?, source),
                 ref_order_index = CASE WHEN ? THEN ? ELSE ref_order_index END,
                 value_kind = COALESCE(?, value_kind),
                 value = COALESCE(?, value),
                 is_payout = COALESCE(?, is_payout),
                 updated_at = ?
             WHERE profile_id = ? AND id = ?
             RETURNING {ITEM_COLUMNS}"
        );
        let row = sqlx::query_as::<_, Item>(&sql)
            .bind(&request.label)
            .bind(request.operation)
            .bind(request.source)
            .bind(request.ref_order_index.is_some())
            .bind(request.ref_order_index.flatten())
            .bind(request.value_kind)
            .bind(request.value)
            .bind(request.is_payout)
            .bind(Utc::now())
            .bind(profile_id)
            .bind(item_id)
            .fetch_optional(&mut *self.db)
            .await?
            .ok_or(DbError::NotFound)?;

        Ok(ItemDBResponse::from(row))
    }

    #[instrument(skip(self), fields(item_id = %abbrev_uuid(&item_id)), err)]
    pub async fn delete_item(&mut self, profile_id: ProfileId, item_id: Uuid) -> Result<bool> {
        let result = sqlx::query("DELETE FROM distribution_items WHERE profile_id = ? AND id = ?")
            .bind(profile_id)
            .bind(item_id)
            .execute(&mut *self.db)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

#[async_trait::async_trait]
impl<'c> Repository for Profiles<'c> {
    type CreateRequest = ProfileCreateDBRequest;
    type UpdateRequest = ProfileUpdateDBRequest;
    type Response = ProfileDBResponse;
    type Id = (VesselId, ProfileId);
    type Filter = ProfileFilter;

    #[instrument(skip(self, request), fields(name = %request.name), err)]
    async fn create(&mut self, request: &Self::CreateRequest) -> Result<Self::Response> {
        let now = Utc::now();
        let sql = format!(
            "INSERT INTO distribution_profiles (id, vessel_id, name, description, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?)
             RETURNING {PROFILE_COLUMNS}"
        );
        let row = sqlx::query_as::<_, Profile>(&sql)
            .bind(Uuid::new_v4())
            .bind(request.vessel_id)
            .bind(&request.name)
            .bind(&request.description)
            .bind(now)
            .bind(now)
            .fetch_one(&mut *self.db)
            .await?;

        Ok(ProfileDBResponse::from(row))
    }

    #[instrument(skip(self), fields(profile_id = %abbrev_uuid(&id.1)), err)]
    async fn get_by_id(&mut self, id: Self::Id) -> Result<Option<Self::Response>> {
        let sql = format!(
            "SELECT {PROFILE_COLUMNS} FROM distribution_profiles
             WHERE vessel_id = ? AND id = ? AND deleted_at IS NULL"
        );
        let row = sqlx::query_as::<_, Profile>(&sql)
            .bind(id.0)
            .bind(id.1)
            .fetch_optional(&mut *self.db)
            .await?;

        Ok(row.map(ProfileDBResponse::from))
    }

    #[instrument(skip(self, filter), fields(vessel_id = %abbrev_uuid(&filter.vessel_id)), err)]
    async fn list(&mut self, filter: &Self::Filter) -> Result<Vec<Self::Response>> {
        let sql = format!(
            "SELECT {PROFILE_COLUMNS} FROM distribution_profiles
             WHERE vessel_id = ? AND deleted_at IS NULL
             ORDER BY name LIMIT ? OFFSET ?"
        );
        let rows = sqlx::query_as::<_, Profile>(&sql)
            .bind(filter.vessel_id)
            .bind(filter.limit)
            .bind(filter.skip)
            .fetch_all(&mut *self.db)
            .await?;

        Ok(rows.into_iter().map(ProfileDBResponse::from).collect())
    }

    #[instrument(skip(self, request), fields(profile_id = %abbrev_uuid(&id.1)), err)]
    async fn update(&mut self, id: Self::Id, request: &Self::UpdateRequest) -> Result<Self::Response> {
        let sql = format!(
            "UPDATE distribution_profiles SET
                 name = COALESCE(?, name),
                 description = COALESCE(?, description),
                 updated_at = ?
             WHERE vessel_id = ? AND id = ? AND deleted_at IS NULL
             RETURNING {PROFILE_COLUMNS}"
        );
        let row = sqlx::query_as::<_, Profile>(&sql)
            .bind(&request.name)
            .bind(&request.description)
            .bind(Utc::now())
            .bind(id.0)
            .bind(id.1)
            .fetch_optional(&mut *self.db)
            .await?
            .ok_or(DbError::NotFound)?;

        Ok(ProfileDBResponse::from(row))
    }

    #[instrument(skip(self), fields(profile_id = %abbrev_uuid(&id.1)), err)]
    async fn delete(&mut self, id: Self::Id) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE distribution_profiles SET deleted_at = ?, updated_at = ?
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

    async fn create_profile(conn: &mut SqliteConnection, vessel_id: VesselId) -> ProfileDBResponse {
        Profiles::new(conn)
            .create(&ProfileCreateDBRequest {
                vessel_id,
                name: "Standard split".to_string(),
                description: None,
            })
            .await
            .unwrap()
    }

    fn item_request(profile_id: ProfileId, order_index: i64) -> ItemCreateDBRequest {
        ItemCreateDBRequest {
            profile_id,
            order_index,
            label: format!("step {order_index}"),
            operation: ItemOperation::Set,
            source: ItemSource::NetResult,
            ref_order_index: None,
            value_kind: ValueKind::Amount,
            value: 0,
            is_payout: false,
        }
    }

    #[test_log::test(tokio::test)]
    async fn test_items_are_ordered() {
        let pool = create_test_pool().await;
        let mut conn = pool.acquire().await.unwrap();
        let vessel = insert_test_vessel(&mut conn).await;
        let profile = create_profile(&mut conn, vessel).await;

        let mut repo = Profiles::new(&mut conn);
        for order_index in [3, 1, 2] {
            repo.create_item(&item_request(profile.id, order_index)).await.unwrap();
        }

        let items = repo.list_items(profile.id).await.unwrap();
        let indices: Vec<i64> = items.iter().map(|i| i.order_index).collect();
        assert_eq!(indices, vec![1, 2, 3]);
    }

    #[test_log::test(tokio::test)]
    async fn test_duplicate_order_index_rejected() {
        let pool = create_test_pool().await;
        let mut conn = pool.acquire().await.unwrap();
        let vessel = insert_test_vessel(&mut conn).await;
        let profile = create_profile(&mut conn, vessel).await;

        let mut repo = Profiles::new(&mut conn);
        repo.create_item(&item_request(profile.id, 1)).await.unwrap();
        assert!(matches!(
            repo.create_item(&item_request(profile.id, 1)).await.unwrap_err(),
            DbError::UniqueViolation { .. }
        ));
    }
}
