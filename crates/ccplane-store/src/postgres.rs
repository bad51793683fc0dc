use async_trait::async_trait;
use ccplane_domain::{
    ApplicationService, ApprovalDecision, ApprovalRequest, Criteria, DriftEvent, GranteeType,
    IamTeam, IamUser, InstanceId, ServiceId, ServiceInstance, ServiceShare, TeamId, UserId,
};
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::StoreError;
use crate::ports::{
    ApplicationServiceRepository, ApprovalRepository, DriftEventRepository, IamRepository,
    ServiceInstanceRepository, ServiceShareRepository,
};

// DDL — idempotent; run at every startup via migrate(). Indexes follow
// spec.md §6's required-index list exactly.
const MIGRATIONS: &str = r#"
CREATE TABLE IF NOT EXISTS application_services (
    id           TEXT PRIMARY KEY,
    display_name TEXT NOT NULL UNIQUE,
    state        JSONB NOT NULL,
    updated_at   TIMESTAMPTZ NOT NULL DEFAULT NOW()
);

CREATE TABLE IF NOT EXISTS service_instances (
    service_id   TEXT NOT NULL,
    instance_id  TEXT NOT NULL,
    state        JSONB NOT NULL,
    last_seen_at TIMESTAMPTZ NOT NULL,
    PRIMARY KEY (service_id, instance_id)
);
CREATE INDEX IF NOT EXISTS idx_service_instances_last_seen ON service_instances (last_seen_at);

CREATE TABLE IF NOT EXISTS drift_events (
    id          UUID PRIMARY KEY,
    service_id  TEXT NOT NULL,
    instance_id TEXT NOT NULL,
    status      TEXT NOT NULL,
    state       JSONB NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_drift_events_lookup ON drift_events (service_id, instance_id, status);

CREATE TABLE IF NOT EXISTS service_shares (
    id            UUID PRIMARY KEY,
    service_id    TEXT NOT NULL,
    grantee_type  TEXT NOT NULL,
    grantee_id    TEXT NOT NULL,
    state         JSONB NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_service_shares_lookup ON service_shares (service_id, grantee_type, grantee_id);

CREATE TABLE IF NOT EXISTS approval_requests (
    id         UUID PRIMARY KEY,
    version    BIGINT NOT NULL,
    status     TEXT NOT NULL,
    target_team_id TEXT NOT NULL,
    state      JSONB NOT NULL
);

CREATE TABLE IF NOT EXISTS approval_decisions (
    request_id        UUID NOT NULL,
    approver_user_id  TEXT NOT NULL,
    gate              TEXT NOT NULL,
    state             JSONB NOT NULL,
    PRIMARY KEY (request_id, approver_user_id, gate)
);

CREATE TABLE IF NOT EXISTS iam_users (
    user_id TEXT PRIMARY KEY,
    state   JSONB NOT NULL
);

CREATE TABLE IF NOT EXISTS iam_teams (
    team_id TEXT PRIMARY KEY,
    state   JSONB NOT NULL
);
"#;

/// Persistent implementation of every repository port, backed by Postgres.
/// Grounded on the teacher's `PostgresStore`: JSONB payload columns, a few
/// indexed scalar columns for the queries that need them, and
/// migrate-on-connect via `CREATE TABLE IF NOT EXISTS`.
#[derive(Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    pub async fn connect(url: &str) -> Result<Self, StoreError> {
        let pool = PgPool::connect(url).await.map_err(|e| StoreError::Internal(format!("postgres connect: {e}")))?;
        let store = Self { pool };
        store.migrate().await?;
        Ok(store)
    }

    async fn migrate(&self) -> Result<(), StoreError> {
        sqlx::query(MIGRATIONS)
            .execute(&self.pool)
            .await
            .map_err(|e| StoreError::Internal(format!("migration: {e}")))?;
        Ok(())
    }
}

fn to_json<T: serde::Serialize>(v: &T) -> Result<serde_json::Value, StoreError> {
    serde_json::to_value(v).map_err(StoreError::Serialization)
}

fn from_json<T: serde::de::DeserializeOwned>(v: serde_json::Value) -> Result<T, StoreError> {
    serde_json::from_value(v).map_err(StoreError::Serialization)
}

#[async_trait]
impl ApplicationServiceRepository for PostgresStore {
    async fn get(&self, id: &ServiceId) -> Result<Option<ApplicationService>, StoreError> {
        let row: Option<(serde_json::Value,)> =
            sqlx::query_as("SELECT state FROM application_services WHERE id = $1")
                .bind(id.as_str())
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| StoreError::Internal(e.to_string()))?;
        row.map(|(v,)| from_json(v)).transpose()
    }

    async fn get_by_display_name(&self, display_name: &str) -> Result<Option<ApplicationService>, StoreError> {
        let row: Option<(serde_json::Value,)> =
            sqlx::query_as("SELECT state FROM application_services WHERE display_name = $1")
                .bind(display_name)
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| StoreError::Internal(e.to_string()))?;
        row.map(|(v,)| from_json(v)).transpose()
    }

    async fn upsert(&self, service: &ApplicationService) -> Result<(), StoreError> {
        let json = to_json(service)?;
        sqlx::query(
            "INSERT INTO application_services (id, display_name, state, updated_at)
             VALUES ($1, $2, $3::jsonb, NOW())
             ON CONFLICT (id) DO UPDATE SET display_name = EXCLUDED.display_name, state = EXCLUDED.state, updated_at = NOW()",
        )
        .bind(service.id.as_str())
        .bind(&service.display_name)
        .bind(&json)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if e.as_database_error().map(|d| d.is_unique_violation()).unwrap_or(false) {
                StoreError::AlreadyExists(service.display_name.clone())
            } else {
                StoreError::Internal(e.to_string())
            }
        })?;
        Ok(())
    }

    async fn delete(&self, id: &ServiceId) -> Result<(), StoreError> {
        sqlx::query("DELETE FROM application_services WHERE id = $1")
            .bind(id.as_str())
            .execute(&self.pool)
            .await
            .map_err(|e| StoreError::Internal(e.to_string()))?;
        Ok(())
    }

    async fn list(&self, criteria: &Criteria) -> Result<Vec<ApplicationService>, StoreError> {
        let rows: Vec<(serde_json::Value,)> = sqlx::query_as("SELECT state FROM application_services ORDER BY id")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| StoreError::Internal(e.to_string()))?;
        let all: Vec<ApplicationService> = rows.into_iter().map(|(v,)| from_json(v)).collect::<Result<_, _>>()?;
        Ok(all.into_iter().filter(|s| criteria.matches_service(&s.id, s.owner_team_id.as_ref())).collect())
    }
}

#[async_trait]
impl ServiceInstanceRepository for PostgresStore {
    async fn get(&self, service_id: &ServiceId, instance_id: &InstanceId) -> Result<Option<ServiceInstance>, StoreError> {
        let row: Option<(serde_json::Value,)> =
            sqlx::query_as("SELECT state FROM service_instances WHERE service_id = $1 AND instance_id = $2")
                .bind(service_id.as_str())
                .bind(instance_id.as_str())
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| StoreError::Internal(e.to_string()))?;
        row.map(|(v,)| from_json(v)).transpose()
    }

    async fn upsert(&self, instance: &ServiceInstance) -> Result<(), StoreError> {
        let json = to_json(instance)?;
        sqlx::query(
            "INSERT INTO service_instances (service_id, instance_id, state, last_seen_at)
             VALUES ($1, $2, $3::jsonb, $4)
             ON CONFLICT (service_id, instance_id)
             DO UPDATE SET state = EXCLUDED.state, last_seen_at = EXCLUDED.last_seen_at",
        )
        .bind(instance.service_id.as_str())
        .bind(instance.instance_id.as_str())
        .bind(&json)
        .bind(instance.last_seen_at)
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::Internal(e.to_string()))?;
        Ok(())
    }

    async fn delete(&self, service_id: &ServiceId, instance_id: &InstanceId) -> Result<(), StoreError> {
        sqlx::query("DELETE FROM service_instances WHERE service_id = $1 AND instance_id = $2")
            .bind(service_id.as_str())
            .bind(instance_id.as_str())
            .execute(&self.pool)
            .await
            .map_err(|e| StoreError::Internal(e.to_string()))?;
        Ok(())
    }

    async fn list_for_service(&self, service_id: &ServiceId) -> Result<Vec<ServiceInstance>, StoreError> {
        let rows: Vec<(serde_json::Value,)> =
            sqlx::query_as("SELECT state FROM service_instances WHERE service_id = $1")
                .bind(service_id.as_str())
                .fetch_all(&self.pool)
                .await
                .map_err(|e| StoreError::Internal(e.to_string()))?;
        rows.into_iter().map(|(v,)| from_json(v)).collect()
    }

    async fn list_stale(&self, cutoff: DateTime<Utc>) -> Result<Vec<ServiceInstance>, StoreError> {
        let rows: Vec<(serde_json::Value,)> =
            sqlx::query_as("SELECT state FROM service_instances WHERE last_seen_at < $1")
                .bind(cutoff)
                .fetch_all(&self.pool)
                .await
                .map_err(|e| StoreError::Internal(e.to_string()))?;
        rows.into_iter().map(|(v,)| from_json(v)).collect()
    }
}

#[async_trait]
impl DriftEventRepository for PostgresStore {
    async fn get(&self, id: Uuid) -> Result<Option<DriftEvent>, StoreError> {
        let row: Option<(serde_json::Value,)> = sqlx::query_as("SELECT state FROM drift_events WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| StoreError::Internal(e.to_string()))?;
        row.map(|(v,)| from_json(v)).transpose()
    }

    async fn find_open(&self, service_id: &ServiceId, instance_id: &InstanceId) -> Result<Option<DriftEvent>, StoreError> {
        let rows: Vec<(serde_json::Value,)> = sqlx::query_as(
            "SELECT state FROM drift_events WHERE service_id = $1 AND instance_id = $2
             AND status NOT IN ('RESOLVED', 'IGNORED')",
        )
        .bind(service_id.as_str())
        .bind(instance_id.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StoreError::Internal(e.to_string()))?;
        rows.into_iter().next().map(|(v,)| from_json(v)).transpose()
    }

    async fn upsert(&self, event: &DriftEvent) -> Result<(), StoreError> {
        let json = to_json(event)?;
        let status = format!("{:?}", event.status).to_uppercase();
        sqlx::query(
            "INSERT INTO drift_events (id, service_id, instance_id, status, state)
             VALUES ($1, $2, $3, $4, $5::jsonb)
             ON CONFLICT (id) DO UPDATE SET status = EXCLUDED.status, state = EXCLUDED.state",
        )
        .bind(event.id)
        .bind(event.service_id.as_str())
        .bind(event.instance_id.as_str())
        .bind(status)
        .bind(&json)
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::Internal(e.to_string()))?;
        Ok(())
    }

    async fn list_for_service(&self, service_id: &ServiceId) -> Result<Vec<DriftEvent>, StoreError> {
        let rows: Vec<(serde_json::Value,)> = sqlx::query_as("SELECT state FROM drift_events WHERE service_id = $1")
            .bind(service_id.as_str())
            .fetch_all(&self.pool)
            .await
            .map_err(|e| StoreError::Internal(e.to_string()))?;
        rows.into_iter().map(|(v,)| from_json(v)).collect()
    }

    async fn list_open(&self) -> Result<Vec<DriftEvent>, StoreError> {
        let rows: Vec<(serde_json::Value,)> =
            sqlx::query_as("SELECT state FROM drift_events WHERE status NOT IN ('RESOLVED', 'IGNORED')")
                .fetch_all(&self.pool)
                .await
                .map_err(|e| StoreError::Internal(e.to_string()))?;
        rows.into_iter().map(|(v,)| from_json(v)).collect()
    }

    async fn list_all(&self) -> Result<Vec<DriftEvent>, StoreError> {
        let rows: Vec<(serde_json::Value,)> = sqlx::query_as("SELECT state FROM drift_events")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| StoreError::Internal(e.to_string()))?;
        rows.into_iter().map(|(v,)| from_json(v)).collect()
    }
}

#[async_trait]
impl ServiceShareRepository for PostgresStore {
    async fn get(&self, id: Uuid) -> Result<Option<ServiceShare>, StoreError> {
        let row: Option<(serde_json::Value,)> = sqlx::query_as("SELECT state FROM service_shares WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| StoreError::Internal(e.to_string()))?;
        row.map(|(v,)| from_json(v)).transpose()
    }

    async fn upsert(&self, share: &ServiceShare) -> Result<(), StoreError> {
        let json = to_json(share)?;
        let grantee_type = format!("{:?}", share.grantee_type).to_uppercase();
        sqlx::query(
            "INSERT INTO service_shares (id, service_id, grantee_type, grantee_id, state)
             VALUES ($1, $2, $3, $4, $5::jsonb)
             ON CONFLICT (id) DO UPDATE SET state = EXCLUDED.state",
        )
        .bind(share.id)
        .bind(share.service_id.as_str())
        .bind(grantee_type)
        .bind(&share.grantee_id)
        .bind(&json)
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::Internal(e.to_string()))?;
        Ok(())
    }

    async fn delete(&self, id: Uuid) -> Result<(), StoreError> {
        sqlx::query("DELETE FROM service_shares WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| StoreError::Internal(e.to_string()))?;
        Ok(())
    }

    async fn list_for_service(&self, service_id: &ServiceId) -> Result<Vec<ServiceShare>, StoreError> {
        let rows: Vec<(serde_json::Value,)> = sqlx::query_as("SELECT state FROM service_shares WHERE service_id = $1")
            .bind(service_id.as_str())
            .fetch_all(&self.pool)
            .await
            .map_err(|e| StoreError::Internal(e.to_string()))?;
        rows.into_iter().map(|(v,)| from_json(v)).collect()
    }

    async fn list_for_grantee(&self, grantee_type: GranteeType, grantee_id: &str) -> Result<Vec<ServiceShare>, StoreError> {
        let gt = format!("{grantee_type:?}").to_uppercase();
        let rows: Vec<(serde_json::Value,)> =
            sqlx::query_as("SELECT state FROM service_shares WHERE grantee_type = $1 AND grantee_id = $2")
                .bind(gt)
                .bind(grantee_id)
                .fetch_all(&self.pool)
                .await
                .map_err(|e| StoreError::Internal(e.to_string()))?;
        rows.into_iter().map(|(v,)| from_json(v)).collect()
    }

    async fn list_all(&self) -> Result<Vec<ServiceShare>, StoreError> {
        let rows: Vec<(serde_json::Value,)> = sqlx::query_as("SELECT state FROM service_shares")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| StoreError::Internal(e.to_string()))?;
        rows.into_iter().map(|(v,)| from_json(v)).collect()
    }
}

#[async_trait]
impl ApprovalRepository for PostgresStore {
    async fn get(&self, id: Uuid) -> Result<Option<ApprovalRequest>, StoreError> {
        let row: Option<(serde_json::Value,)> = sqlx::query_as("SELECT state FROM approval_requests WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| StoreError::Internal(e.to_string()))?;
        row.map(|(v,)| from_json(v)).transpose()
    }

    async fn cas_update(&self, request: &ApprovalRequest, expected_version: u64) -> Result<(), StoreError> {
        let json = to_json(request)?;
        let result = sqlx::query(
            "UPDATE approval_requests SET version = $1, status = $2, state = $3::jsonb
             WHERE id = $4 AND version = $5",
        )
        .bind(request.version as i64)
        .bind(format!("{:?}", request.status).to_uppercase())
        .bind(&json)
        .bind(request.id)
        .bind(expected_version as i64)
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::Internal(e.to_string()))?;
        if result.rows_affected() == 0 {
            return Err(StoreError::VersionConflict(request.id.to_string()));
        }
        Ok(())
    }

    async fn insert(&self, request: &ApprovalRequest) -> Result<(), StoreError> {
        let json = to_json(request)?;
        sqlx::query(
            "INSERT INTO approval_requests (id, version, status, target_team_id, state)
             VALUES ($1, $2, $3, $4, $5::jsonb)",
        )
        .bind(request.id)
        .bind(request.version as i64)
        .bind(format!("{:?}", request.status).to_uppercase())
        .bind(request.target_team_id.as_str())
        .bind(&json)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if e.as_database_error().map(|d| d.is_unique_violation()).unwrap_or(false) {
                StoreError::AlreadyExists(request.id.to_string())
            } else {
                StoreError::Internal(e.to_string())
            }
        })?;
        Ok(())
    }

    async fn append_decision(&self, decision: &ApprovalDecision) -> Result<(), StoreError> {
        let json = to_json(decision)?;
        sqlx::query(
            "INSERT INTO approval_decisions (request_id, approver_user_id, gate, state)
             VALUES ($1, $2, $3, $4::jsonb)",
        )
        .bind(decision.request_id)
        .bind(decision.approver_user_id.as_str())
        .bind(decision.gate.to_string())
        .bind(&json)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if e.as_database_error().map(|d| d.is_unique_violation()).unwrap_or(false) {
                StoreError::AlreadyExists(format!("duplicate decision for {}", decision.request_id))
            } else {
                StoreError::Internal(e.to_string())
            }
        })?;
        Ok(())
    }

    async fn list_decisions(&self, request_id: Uuid) -> Result<Vec<ApprovalDecision>, StoreError> {
        let rows: Vec<(serde_json::Value,)> = sqlx::query_as("SELECT state FROM approval_decisions WHERE request_id = $1")
            .bind(request_id)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| StoreError::Internal(e.to_string()))?;
        rows.into_iter().map(|(v,)| from_json(v)).collect()
    }

    async fn list_pending_for_target_team(&self, team_id: &TeamId) -> Result<Vec<ApprovalRequest>, StoreError> {
        let rows: Vec<(serde_json::Value,)> = sqlx::query_as(
            "SELECT state FROM approval_requests WHERE target_team_id = $1 AND status = 'PENDING'",
        )
        .bind(team_id.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StoreError::Internal(e.to_string()))?;
        rows.into_iter().map(|(v,)| from_json(v)).collect()
    }
}

#[async_trait]
impl IamRepository for PostgresStore {
    async fn get_user(&self, id: &UserId) -> Result<Option<IamUser>, StoreError> {
        let row: Option<(serde_json::Value,)> = sqlx::query_as("SELECT state FROM iam_users WHERE user_id = $1")
            .bind(id.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| StoreError::Internal(e.to_string()))?;
        row.map(|(v,)| from_json(v)).transpose()
    }

    async fn upsert_user(&self, user: &IamUser) -> Result<(), StoreError> {
        let json = to_json(user)?;
        sqlx::query(
            "INSERT INTO iam_users (user_id, state) VALUES ($1, $2::jsonb)
             ON CONFLICT (user_id) DO UPDATE SET state = EXCLUDED.state",
        )
        .bind(user.user_id.as_str())
        .bind(&json)
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::Internal(e.to_string()))?;
        Ok(())
    }

    async fn get_team(&self, id: &TeamId) -> Result<Option<IamTeam>, StoreError> {
        let row: Option<(serde_json::Value,)> = sqlx::query_as("SELECT state FROM iam_teams WHERE team_id = $1")
            .bind(id.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| StoreError::Internal(e.to_string()))?;
        row.map(|(v,)| from_json(v)).transpose()
    }

    async fn upsert_team(&self, team: &IamTeam) -> Result<(), StoreError> {
        let json = to_json(team)?;
        sqlx::query(
            "INSERT INTO iam_teams (team_id, state) VALUES ($1, $2::jsonb)
             ON CONFLICT (team_id) DO UPDATE SET state = EXCLUDED.state",
        )
        .bind(team.team_id.as_str())
        .bind(&json)
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::Internal(e.to_string()))?;
        Ok(())
    }

    async fn list_users_in_team(&self, team_id: &TeamId) -> Result<Vec<IamUser>, StoreError> {
        let rows: Vec<(serde_json::Value,)> = sqlx::query_as("SELECT state FROM iam_users")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| StoreError::Internal(e.to_string()))?;
        let all: Vec<IamUser> = rows.into_iter().map(|(v,)| from_json(v)).collect::<Result<_, _>>()?;
        Ok(all.into_iter().filter(|u| u.team_ids.contains(team_id)).collect())
    }
}
