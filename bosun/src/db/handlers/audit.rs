//! Append-only audit log repository.
//!
//! Every successful mutating operation writes one entry. The log is never
//! updated or deleted through the application.

use crate::db::{
    errors::Result,
    models::audit::{AuditAction, AuditEntryCreateDBRequest, AuditEntryDBResponse},
};
use crate::types::{UserId, VesselId, abbrev_uuid};
use chrono::{DateTime, Utc};
use sqlx::{FromRow, QueryBuilder, Sqlite, SqliteConnection};
use tracing::instrument;
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct AuditFilter {
    pub vessel_id: VesselId,
    pub skip: i64,
    pub limit: i64,
    pub entity_type: Option<String>,
    pub action: Option<AuditAction>,
}

#[derive(Debug, Clone, FromRow)]
struct AuditEntry {
    pub id: Uuid,
    pub vessel_id: Option<VesselId>,
    pub user_id: UserId,
    pub entity_type: String,
    pub entity_id: String,
    pub action: AuditAction,
    pub detail: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<AuditEntry> for AuditEntryDBResponse {
    fn from(row: AuditEntry) -> Self {
        Self {
            id: row.id,
            vessel_id: row.vessel_id,
            user_id: row.user_id,
            entity_type: row.entity_type,
            entity_id: row.entity_id,
            action: row.action,
            detail: row.detail,
            created_at: row.created_at,
        }
    }
}

pub struct AuditLog<'c> {
    db: &'c mut SqliteConnection,
}

impl<'c> AuditLog<'c> {
    pub fn new(db: &'c mut SqliteConnection) -> Self {
        Self { db }
    }

    #[instrument(skip(self, request), fields(entity = %request.entity_type, action = ?request.action), err)]
    pub async fn record(&mut self, request: &AuditEntryCreateDBRequest) -> Result<()> {
        sqlx::query(
            "INSERT INTO audit_log (id, vessel_id, user_id, entity_type, entity_id, action, detail, created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(Uuid::new_v4())
        .bind(request.vessel_id)
        .bind(request.user_id)
        .bind(&request.entity_type)
        .bind(&request.entity_id)
        .bind(request.action)
        .bind(&request.detail)
        .bind(Utc::now())
        .execute(&mut *self.db)
        .await?;

        Ok(())
    }

    #[instrument(skip(self, filter), fields(vessel_id = %abbrev_uuid(&filter.vessel_id)), err)]
    pub async fn list(&mut self, filter: &AuditFilter) -> Result<Vec<AuditEntryDBResponse>> {
        let mut builder = QueryBuilder::<Sqlite>::new(
            "SELECT id, vessel_id, user_id, entity_type, entity_id, action, detail, created_at
             FROM audit_log WHERE 1 = 1",
        );
        push_filters(&mut builder, filter);
        builder.push(" ORDER BY created_at DESC");
        builder.push(" LIMIT ").push_bind(filter.limit);
        builder.push(" OFFSET ").push_bind(filter.skip);

        let rows: Vec<AuditEntry> = builder.build_query_as().fetch_all(&mut *self.db).await?;
        Ok(rows.into_iter().map(AuditEntryDBResponse::from).collect())
    }

    #[instrument(skip(self, filter), fields(vessel_id = %abbrev_uuid(&filter.vessel_id)), err)]
    pub async fn count(&mut self, filter: &AuditFilter) -> Result<i64> {
        let mut builder = QueryBuilder::<Sqlite>::new("SELECT COUNT(*) FROM audit_log WHERE 1 = 1");
        push_filters(&mut builder, filter);

        let count: i64 = builder.build_query_scalar().fetch_one(&mut *self.db).await?;
        Ok(count)
    }
}

fn push_filters(builder: &mut QueryBuilder<'_, Sqlite>, filter: &AuditFilter) {
    builder.push(" AND vessel_id = ").push_bind(filter.vessel_id);
    if let Some(entity_type) = &filter.entity_type {
        builder.push(" AND entity_type = ").push_bind(entity_type.clone());
    }
    if let Some(action) = filter.action {
        builder.push(" AND action = ").push_bind(action);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{create_test_pool, insert_test_user, insert_test_vessel};

    #[test_log::test(tokio::test)]
    async fn test_record_and_filter() {
        let pool = create_test_pool().await;
        let mut conn = pool.acquire().await.unwrap();
        let vessel = insert_test_vessel(&mut conn).await;
        let user = insert_test_user(&mut conn, "audit@example.com", false).await;

        let mut repo = AuditLog::new(&mut conn);
        for (entity_type, action) in [
            ("movement", AuditAction::Create),
            ("movement", AuditAction::SoftDelete),
            ("supplier", AuditAction::Create),
        ] {
            repo.record(&AuditEntryCreateDBRequest {
                vessel_id: Some(vessel),
                user_id: user,
                entity_type: entity_type.to_string(),
                entity_id: Uuid::new_v4().to_string(),
                action,
                detail: Some(r#"{"amount_cents":1000}"#.to_string()),
            })
            .await
            .unwrap();
        }

        let all = AuditFilter {
            vessel_id: vessel,
            skip: 0,
            limit: 10,
            entity_type: None,
            action: None,
        };
        assert_eq!(repo.count(&all).await.unwrap(), 3);

        let movements_only = AuditFilter {
            entity_type: Some("movement".to_string()),
            ..all.clone()
        };
        assert_eq!(repo.count(&movements_only).await.unwrap(), 2);

        let creates_only = AuditFilter {
            action: Some(AuditAction::Create),
            ..all
        };
        let entries = repo.list(&creates_only).await.unwrap();
        assert_eq!(entries.len(), 2);
        assert!(entries.iter().all(|e| e.action == AuditAction::Create));
    }
}
