//! Database repository for vessel membership.

use crate::api::models::members::VesselRole;
use crate::db::{
    errors::{DbError, Result},
    handlers::repository::Repository,
    models::crew::{MemberCreateDBRequest, MemberDBResponse, MemberUpdateDBRequest},
};
use crate::types::{UserId, VesselId, abbrev_uuid};
use chrono::{DateTime, Utc};
use sqlx::{FromRow, SqliteConnection};
use tracing::instrument;

#[derive(Debug, Clone)]
pub struct MemberFilter {
    pub vessel_id: VesselId,
    pub skip: i64,
    pub limit: i64,
}

#[derive(Debug, Clone, FromRow)]
struct MemberRow {
    pub vessel_id: VesselId,
    pub user_id: UserId,
    pub role: VesselRole,
    pub position_id: Option<uuid::Uuid>,
    pub parts: i64,
    pub user_name: String,
    pub user_email: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<MemberRow> for MemberDBResponse {
    fn from(row: MemberRow) -> Self {
        Self {
            vessel_id: row.vessel_id,
            user_id: row.user_id,
            role: row.role,
            position_id: row.position_id,
            parts: row.parts,
            user_name: row.user_name,
            user_email: row.user_email,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

const MEMBER_SELECT: &str = r#"
    SELECT m.vessel_id, m.user_id, m.role, m.position_id, m.parts,
           u.name AS user_name, u.email AS user_email,
           m.created_at, m.updated_at
    FROM vessel_members m
    INNER JOIN users u ON u.id = m.user_id
"#;

pub struct Members<'c> {
    db: &'c mut SqliteConnection,
}

impl<'c> Members<'c> {
    pub fn new(db: &'c mut SqliteConnection) -> Self {
        Self { db }
    }

    #[instrument(skip(self), fields(vessel_id = %abbrev_uuid(&vessel_id)), err)]
    pub async fn count(&mut self, vessel_id: VesselId) -> Result<i64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM vessel_members WHERE vessel_id = ? AND deleted_at IS NULL",
        )
        .bind(vessel_id)
        .fetch_one(&mut *self.db)
        .await?;
        Ok(count)
    }

    /// Number of live owners on the vessel. Used to guard against removing or
    /// demoting the last one.
    #[instrument(skip(self), fields(vessel_id = %abbrev_uuid(&vessel_id)), err)]
    pub async fn count_owners(&mut self, vessel_id: VesselId) -> Result<i64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM vessel_members
             WHERE vessel_id = ? AND role = 'owner' AND deleted_at IS NULL",
        )
        .bind(vessel_id)
        .fetch_one(&mut *self.db)
        .await?;
        Ok(count)
    }
}

#[async_trait::async_trait]
impl<'c> Repository for Members<'c> {
    type CreateRequest = MemberCreateDBRequest;
    type UpdateRequest = MemberUpdateDBRequest;
    type Response = MemberDBResponse;
    type Id = (VesselId, UserId);
    type Filter = MemberFilter;

    #[instrument(skip(self, request), fields(user_id = %abbrev_uuid(&request.user_id)), err)]
    async fn create(&mut self, request: &Self::CreateRequest) -> Result<Self::Response> {
        let now = Utc::now();

        if self.get_by_id((request.vessel_id, request.user_id)).await?.is_some() {
            return Err(DbError::UniqueViolation {
                constraint: Some("vessel_members_pkey".to_string()),
                message: "user is already a member of this vessel".to_string(),
            });
        }

        // A soft-deleted membership is revived in place so the primary key
        // stays stable across leave/rejoin cycles.
        sqlx::query(
            r#"
            INSERT INTO vessel_members (vessel_id, user_id, role, position_id, parts, created_at, updated_at, deleted_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, NULL)
            ON CONFLICT (vessel_id, user_id) DO UPDATE SET
                role = excluded.role,
                position_id = excluded.position_id,
                parts = excluded.parts,
                updated_at = excluded.updated_at,
                deleted_at = NULL
            WHERE vessel_members.deleted_at IS NOT NULL
            "#,
        )
        .bind(request.vessel_id)
        .bind(request.user_id)
        .bind(request.role)
        .bind(request.position_id)
        .bind(request.parts)
        .bind(now)
        .bind(now)
        .execute(&mut *self.db)
        .await?;

        self.get_by_id((request.vessel_id, request.user_id))
            .await?
            .ok_or(DbError::NotFound)
    }

    #[instrument(skip(self), fields(vessel_id = %abbrev_uuid(&id.0), user_id = %abbrev_uuid(&id.1)), err)]
    async fn get_by_id(&mut self, id: Self::Id) -> Result<Option<Self::Response>> {
        let (vessel_id, user_id) = id;
        let sql = format!("{MEMBER_SELECT} WHERE m.vessel_id = ? AND m.user_id = ? AND m.deleted_at IS NULL");
        let row = sqlx::query_as::<_, MemberRow>(&sql)
            .bind(vessel_id)
            .bind(user_id)
            .fetch_optional(&mut *self.db)
            .await?;

        Ok(row.map(MemberDBResponse::from))
    }

    #[instrument(skip(self, filter), fields(vessel_id = %abbrev_uuid(&filter.vessel_id)), err)]
    async fn list(&mut self, filter: &Self::Filter) -> Result<Vec<Self::Response>> {
        let sql = format!(
            "{MEMBER_SELECT} WHERE m.vessel_id = ? AND m.deleted_at IS NULL
             ORDER BY u.name LIMIT ? OFFSET ?"
        );
        let rows = sqlx::query_as::<_, MemberRow>(&sql)
            .bind(filter.vessel_id)
            .bind(filter.limit)
            .bind(filter.skip)
            .fetch_all(&mut *self.db)
            .await?;

        Ok(rows.into_iter().map(MemberDBResponse::from).collect())
    }

    #[instrument(skip(self, request), fields(vessel_id = %abbrev_uuid(&id.0), user_id = %abbrev_uuid(&id.1)), err)]
    async fn update(&mut self, id: Self::Id, request: &Self::UpdateRequest) -> Result<Self::Response> {
        let (vessel_id, user_id) = id;
        let result = sqlx::query(
            r#"
            UPDATE vessel_members SET
                role = COALESCE(?, role),
                position_id = CASE WHEN ? THEN ? ELSE position_id END,
                parts = COALESCE(?, parts),
                updated_at = ?
            WHERE vessel_id = ? AND user_id = ? AND deleted_at IS NULL
            "#,
        )
        .bind(request.role)
        .bind(request.position_id.is_some())
        .bind(request.position_id.flatten())
        .bind(request.parts)
        .bind(Utc::now())
        .bind(vessel_id)
        .bind(user_id)
        .execute(&mut *self.db)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::NotFound);
        }

        self.get_by_id(id).await?.ok_or(DbError::NotFound)
    }

    #[instrument(skip(self), fields(vessel_id = %abbrev_uuid(&id.0), user_id = %abbrev_uuid(&id.1)), err)]
    async fn delete(&mut self, id: Self::Id) -> Result<bool> {
        let (vessel_id, user_id) = id;
        let result = sqlx::query(
            "UPDATE vessel_members SET deleted_at = ?, updated_at = ?
             WHERE vessel_id = ? AND user_id = ? AND deleted_at IS NULL",
        )
        .bind(Utc::now())
        .bind(Utc::now())
        .bind(vessel_id)
        .bind(user_id)
        .execute(&mut *self.db)
        .await?;

        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{create_test_pool, insert_test_user, insert_test_vessel};

    #[test_log::test(tokio::test)]
    async fn test_membership_lifecycle() {
        let pool = create_test_pool().await;
        let mut conn = pool.acquire().await.unwrap();
        let user = insert_test_user(&mut conn, "hand@example.com", false).await;
        let vessel = insert_test_vessel(&mut conn).await;

        let mut repo = Members::new(&mut conn);
        let member = repo
            .create(&MemberCreateDBRequest {
                vessel_id: vessel,
                user_id: user,
                role: VesselRole::Crew,
                position_id: None,
                parts: 2,
            })
            .await
            .unwrap();
        assert_eq!(member.role, VesselRole::Crew);
        assert_eq!(member.parts, 2);
        assert_eq!(member.user_email, "hand@example.com");

        // Promote and then remove
        let promoted = repo
            .update(
                (vessel, user),
                &MemberUpdateDBRequest {
                    role: Some(VesselRole::Skipper),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(promoted.role, VesselRole::Skipper);

        assert!(repo.delete((vessel, user)).await.unwrap());
        assert!(repo.get_by_id((vessel, user)).await.unwrap().is_none());

        // Rejoining revives the row
        let revived = repo
            .create(&MemberCreateDBRequest {
                vessel_id: vessel,
                user_id: user,
                role: VesselRole::Accountant,
                position_id: None,
                parts: 1,
            })
            .await
            .unwrap();
        assert_eq!(revived.role, VesselRole::Accountant);
    }

    #[test_log::test(tokio::test)]
    async fn test_count_owners() {
        let pool = create_test_pool().await;
        let mut conn = pool.acquire().await.unwrap();
        let owner = insert_test_user(&mut conn, "owner@example.com", false).await;
        let crew = insert_test_user(&mut conn, "deck@example.com", false).await;
        let vessel = insert_test_vessel(&mut conn).await;

        let mut repo = Members::new(&mut conn);
        for (user, role) in [(owner, VesselRole::Owner), (crew, VesselRole::Crew)] {
            repo.create(&MemberCreateDBRequest {
                vessel_id: vessel,
                user_id: user,
                role,
                position_id: None,
                parts: 1,
            })
            .await
            .unwrap();
        }

        assert_eq!(repo.count_owners(vessel).await.unwrap(), 1);
        assert_eq!(repo.count(vessel).await.unwrap(), 2);
    }
}
