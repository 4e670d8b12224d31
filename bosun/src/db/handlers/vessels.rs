//! Database repository for vessels and their settings.

use crate::db::{
    errors::{DbError, Result},
    handlers::repository::Repository,
    models::vessels::{
        VesselCreateDBRequest, VesselDBResponse, VesselSettingsDBResponse,
        VesselSettingsUpdateDBRequest, VesselUpdateDBRequest,
    },
};
use crate::types::{UserId, VesselId, abbrev_uuid};
use chrono::{DateTime, Utc};
use sqlx::{Connection, FromRow, SqliteConnection};
use tracing::instrument;
use uuid::Uuid;

/// Filter for listing vessels: non-admin callers only see vessels they are a
/// member of.
#[derive(Debug, Clone)]
pub struct VesselFilter {
    pub skip: i64,
    pub limit: i64,
    /// When set, restrict to vessels this user is a member of
    pub member_user_id: Option<UserId>,
}

#[derive(Debug, Clone, FromRow)]
struct Vessel {
    pub id: VesselId,
    pub name: String,
    pub registration_number: Option<String>,
    pub home_port: Option<String>,
    pub vessel_type: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Vessel> for VesselDBResponse {
    fn from(vessel: Vessel) -> Self {
        Self {
            id: vessel.id,
            name: vessel.name,
            registration_number: vessel.registration_number,
            home_port: vessel.home_port,
            vessel_type: vessel.vessel_type,
            created_at: vessel.created_at,
            updated_at: vessel.updated_at,
        }
    }
}

#[derive(Debug, Clone, FromRow)]
struct VesselSettings {
    pub vessel_id: VesselId,
    pub currency: String,
    pub default_vat_rate_bp: i64,
    pub default_profile_id: Option<Uuid>,
    pub updated_at: DateTime<Utc>,
}

impl From<VesselSettings> for VesselSettingsDBResponse {
    fn from(settings: VesselSettings) -> Self {
        Self {
            vessel_id: settings.vessel_id,
            currency: settings.currency,
            default_vat_rate_bp: settings.default_vat_rate_bp,
            default_profile_id: settings.default_profile_id,
            updated_at: settings.updated_at,
        }
    }
}

pub struct Vessels<'c> {
    db: &'c mut SqliteConnection,
}

impl<'c> Vessels<'c> {
    pub fn new(db: &'c mut SqliteConnection) -> Self {
        Self { db }
    }

    #[instrument(skip(self, filter), err)]
    pub async fn count(&mut self, filter: &VesselFilter) -> Result<i64> {
        let count: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM vessels v
            WHERE v.deleted_at IS NULL
              AND (? IS NULL OR EXISTS (
                  SELECT 1 FROM vessel_members m
                  WHERE m.vessel_id = v.id AND m.user_id = ? AND m.deleted_at IS NULL))
            "#,
        )
        .bind(filter.member_user_id)
        .bind(filter.member_user_id)
        .fetch_one(&mut *self.db)
        .await?;
        Ok(count)
    }

    #[instrument(skip(self), fields(vessel_id = %abbrev_uuid(&vessel_id)), err)]
    pub async fn get_settings(&mut self, vessel_id: VesselId) -> Result<Option<VesselSettingsDBResponse>> {
        let settings = sqlx::query_as::<_, VesselSettings>(
            "SELECT * FROM vessel_settings WHERE vessel_id = ?",
        )
        .bind(vessel_id)
        .fetch_optional(&mut *self.db)
        .await?;

        Ok(settings.map(VesselSettingsDBResponse::from))
    }

    #[instrument(skip(self, request), fields(vessel_id = %abbrev_uuid(&vessel_id)), err)]
    pub async fn update_settings(
        &mut self,
        vessel_id: VesselId,
        request: &VesselSettingsUpdateDBRequest,
    ) -> Result<VesselSettingsDBResponse> {
        let settings = sqlx::query_as::<_, VesselSettings>(
            r#"
            UPDATE vessel_settings SET
                currency = COALESCE(?, currency),
                default_vat_rate_bp = COALESCE(?, default_vat_rate_bp),
                default_profile_id = CASE WHEN ? THEN ? ELSE default_profile_id END,
                updated_at = ?
            WHERE vessel_id = ?
            RETURNING *
            "#,
        )
        .bind(&request.currency)
        .bind(request.default_vat_rate_bp)
        .bind(request.default_profile_id.is_some())
        .bind(request.default_profile_id.flatten())
        .bind(Utc::now())
        .bind(vessel_id)
        .fetch_optional(&mut *self.db)
        .await?
        .ok_or(DbError::NotFound)?;

        Ok(VesselSettingsDBResponse::from(settings))
    }
}

#[async_trait::async_trait]
impl<'c> Repository for Vessels<'c> {
    type CreateRequest = VesselCreateDBRequest;
    type UpdateRequest = VesselUpdateDBRequest;
    type Response = VesselDBResponse;
    type Id = VesselId;
    type Filter = VesselFilter;

    #[instrument(skip(self, request), fields(name = %request.name), err)]
    async fn create(&mut self, request: &Self::CreateRequest) -> Result<Self::Response> {
        let vessel_id = Uuid::new_v4();
        let now = Utc::now();

        let mut tx = self.db.begin().await?;

        let vessel = sqlx::query_as::<_, Vessel>(
            r#"
            INSERT INTO vessels (id, name, registration_number, home_port, vessel_type, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            RETURNING id, name, registration_number, home_port, vessel_type, created_at, updated_at
            "#,
        )
        .bind(vessel_id)
        .bind(&request.name)
        .bind(&request.registration_number)
        .bind(&request.home_port)
        .bind(&request.vessel_type)
        .bind(now)
        .bind(now)
        .fetch_one(&mut *tx)
        .await?;

        // Every vessel gets a settings row immediately
        sqlx::query(
            "INSERT INTO vessel_settings (vessel_id, currency, default_vat_rate_bp, default_profile_id, updated_at)
             VALUES (?, 'EUR', 0, NULL, ?)",
        )
        .bind(vessel_id)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(VesselDBResponse::from(vessel))
    }

    #[instrument(skip(self), fields(vessel_id = %abbrev_uuid(&id)), err)]
    async fn get_by_id(&mut self, id: Self::Id) -> Result<Option<Self::Response>> {
        let vessel = sqlx::query_as::<_, Vessel>(
            "SELECT id, name, registration_number, home_port, vessel_type, created_at, updated_at
             FROM vessels WHERE id = ? AND deleted_at IS NULL",
        )
        .bind(id)
        .fetch_optional(&mut *self.db)
        .await?;

        Ok(vessel.map(VesselDBResponse::from))
    }

    #[instrument(skip(self, filter), fields(limit = filter.limit, skip = filter.skip), err)]
    async fn list(&mut self, filter: &Self::Filter) -> Result<Vec<Self::Response>> {
        let vessels = sqlx::query_as::<_, Vessel>(
            r#"
            SELECT v.id, v.name, v.registration_number, v.home_port, v.vessel_type, v.created_at, v.updated_at
            FROM vessels v
            WHERE v.deleted_at IS NULL
              AND (? IS NULL OR EXISTS (
                  SELECT 1 FROM vessel_members m
                  WHERE m.vessel_id = v.id AND m.user_id = ? AND m.deleted_at IS NULL))
            ORDER BY v.name
            LIMIT ? OFFSET ?
            "#,
        )
        .bind(filter.member_user_id)
        .bind(filter.member_user_id)
        .bind(filter.limit)
        .bind(filter.skip)
        .fetch_all(&mut *self.db)
        .await?;

        Ok(vessels.into_iter().map(VesselDBResponse::from).collect())
    }

    #[instrument(skip(self, request), fields(vessel_id = %abbrev_uuid(&id)), err)]
    async fn update(&mut self, id: Self::Id, request: &Self::UpdateRequest) -> Result<Self::Response> {
        let vessel = sqlx::query_as::<_, Vessel>(
            r#"
            UPDATE vessels SET
                name = COALESCE(?, name),
                registration_number = COALESCE(?, registration_number),
                home_port = COALESCE(?, home_port),
                vessel_type = COALESCE(?, vessel_type),
                updated_at = ?
            WHERE id = ? AND deleted_at IS NULL
            RETURNING id, name, registration_number, home_port, vessel_type, created_at, updated_at
            "#,
        )
        .bind(&request.name)
        .bind(&request.registration_number)
        .bind(&request.home_port)
        .bind(&request.vessel_type)
        .bind(Utc::now())
        .bind(id)
        .fetch_optional(&mut *self.db)
        .await?
        .ok_or(DbError::NotFound)?;

        Ok(VesselDBResponse::from(vessel))
    }

    #[instrument(skip(self), fields(vessel_id = %abbrev_uuid(&id)), err)]
    async fn delete(&mut self, id: Self::Id) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE vessels SET deleted_at = ?, updated_at = ? WHERE id = ? AND deleted_at IS NULL",
        )
        .bind(Utc::now())
        .bind(Utc::now())
        .bind(id)
        .execute(&mut *self.db)
        .await?;

        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::create_test_pool;

    #[test_log::test(tokio::test)]
    async fn test_create_vessel_creates_settings() {
        let pool = create_test_pool().await;
        let mut conn = pool.acquire().await.unwrap();
        let mut repo = Vessels::new(&mut conn);

        let vessel = repo
            .create(&VesselCreateDBRequest {
                name: "Nova Esperanca".to_string(),
                registration_number: Some("PT-1234".to_string()),
                home_port: Some("Peniche".to_string()),
                vessel_type: Some("trawler".to_string()),
            })
            .await
            .unwrap();

        let settings = repo.get_settings(vessel.id).await.unwrap().unwrap();
        assert_eq!(settings.currency, "EUR");
        assert_eq!(settings.default_vat_rate_bp, 0);
        assert!(settings.default_profile_id.is_none());
    }

    #[test_log::test(tokio::test)]
    async fn test_soft_delete_hides_vessel() {
        let pool = create_test_pool().await;
        let mut conn = pool.acquire().await.unwrap();
        let mut repo = Vessels::new(&mut conn);

        let vessel = repo
            .create(&VesselCreateDBRequest {
                name: "Gone".to_string(),
                registration_number: None,
                home_port: None,
                vessel_type: None,
            })
            .await
            .unwrap();

        assert!(repo.delete(vessel.id).await.unwrap());
        assert!(repo.get_by_id(vessel.id).await.unwrap().is_none());
        // Second delete is a no-op
        assert!(!repo.delete(vessel.id).await.unwrap());
    }

    #[test_log::test(tokio::test)]
    async fn test_settings_update_can_clear_profile() {
        let pool = create_test_pool().await;
        let mut conn = pool.acquire().await.unwrap();
        let mut repo = Vessels::new(&mut conn);

        let vessel = repo
            .create(&VesselCreateDBRequest {
                name: "Config".to_string(),
                registration_number: None,
                home_port: None,
                vessel_type: None,
            })
            .await
            .unwrap();

        let updated = repo
            .update_settings(
                vessel.id,
                &VesselSettingsUpdateDBRequest {
                    currency: Some("USD".to_string()),
                    default_vat_rate_bp: Some(2300),
                    default_profile_id: None,
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.currency, "USD");
        assert_eq!(updated.default_vat_rate_bp, 2300);

        // Explicit None clears, absent leaves untouched
        let cleared = repo
            .update_settings(
                vessel.id,
                &VesselSettingsUpdateDBRequest {
                    default_profile_id: Some(None),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(cleared.currency, "USD");
        assert!(cleared.default_profile_id.is_none());
    }
}
