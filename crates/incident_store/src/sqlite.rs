//! SQLite-backed store.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use entities::{Incident, IncidentStatus, Role, User};
use sqlx::{FromRow, Pool, Sqlite, sqlite::SqlitePoolOptions};
use uuid::Uuid;

use crate::{IncidentFilter, IncidentStore, StoreError, StoreResult, UserFilter, UserStore};

/// Schema applied on connect. Every statement is idempotent.
const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS users (
    id TEXT PRIMARY KEY NOT NULL,
    email TEXT NOT NULL UNIQUE,
    name TEXT,
    role TEXT NOT NULL,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS incidents (
    id TEXT PRIMARY KEY NOT NULL,
    title TEXT NOT NULL,
    description TEXT NOT NULL,
    reporter_id TEXT NOT NULL,
    technician_id TEXT,
    status TEXT NOT NULL,
    resolution_notes TEXT,
    version INTEGER NOT NULL,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    resolved_at TEXT
);

CREATE INDEX IF NOT EXISTS idx_incidents_reporter ON incidents(reporter_id);
CREATE INDEX IF NOT EXISTS idx_incidents_technician ON incidents(technician_id);
CREATE INDEX IF NOT EXISTS idx_incidents_status ON incidents(status);
"#;

const INCIDENT_COLUMNS: &str = "id, title, description, reporter_id, technician_id, status, \
                                resolution_notes, version, created_at, updated_at, resolved_at";

/// Database row for User
#[derive(Debug, FromRow)]
struct UserRow {
    id: String,
    email: String,
    name: Option<String>,
    role: String,
    created_at: String,
    updated_at: String,
}

impl TryFrom<UserRow> for User {
    type Error = StoreError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        Ok(User {
            id: parse_uuid("User", &row.id)?,
            email: row.email,
            name: row.name,
            role: Role::parse(&row.role)
                .ok_or_else(|| StoreError::corrupt_row("User", format!("role {}", row.role)))?,
            created_at: parse_timestamp("User", &row.created_at)?,
            updated_at: parse_timestamp("User", &row.updated_at)?,
        })
    }
}

/// Database row for Incident
#[derive(Debug, FromRow)]
struct IncidentRow {
    id: String,
    title: String,
    description: String,
    reporter_id: String,
    technician_id: Option<String>,
    status: String,
    resolution_notes: Option<String>,
    version: i64,
    created_at: String,
    updated_at: String,
    resolved_at: Option<String>,
}

impl TryFrom<IncidentRow> for Incident {
    type Error = StoreError;

    fn try_from(row: IncidentRow) -> Result<Self, Self::Error> {
        Ok(Incident {
            id: parse_uuid("Incident", &row.id)?,
            title: row.title,
            description: row.description,
            reporter_id: parse_uuid("Incident", &row.reporter_id)?,
            technician_id: row
                .technician_id
                .as_deref()
                .map(|id| parse_uuid("Incident", id))
                .transpose()?,
            status: IncidentStatus::parse(&row.status).ok_or_else(|| {
                StoreError::corrupt_row("Incident", format!("status {}", row.status))
            })?,
            resolution_notes: row.resolution_notes,
            version: u64::try_from(row.version).map_err(|_| {
                StoreError::corrupt_row("Incident", format!("version {}", row.version))
            })?,
            created_at: parse_timestamp("Incident", &row.created_at)?,
            updated_at: parse_timestamp("Incident", &row.updated_at)?,
            resolved_at: row
                .resolved_at
                .as_deref()
                .map(|ts| parse_timestamp("Incident", ts))
                .transpose()?,
        })
    }
}

fn parse_uuid(entity_type: &'static str, value: &str) -> StoreResult<Uuid> {
    value
        .parse()
        .map_err(|_| StoreError::corrupt_row(entity_type, format!("id {value}")))
}

fn parse_timestamp(entity_type: &'static str, value: &str) -> StoreResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|_| StoreError::corrupt_row(entity_type, format!("timestamp {value}")))
}

fn version_to_i64(version: u64) -> StoreResult<i64> {
    i64::try_from(version)
        .map_err(|_| StoreError::corrupt_row("Incident", format!("version {version}")))
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db) if db.is_unique_violation())
}

/// Store backed by a SQLite connection pool.
#[derive(Debug, Clone)]
pub struct SqliteIncidentStore {
    pool: Pool<Sqlite>,
}

impl SqliteIncidentStore {
    /// Connects to `database_url` and applies the schema.
    ///
    /// In-memory databases are held on a single connection that is never
    /// recycled, since each SQLite connection sees its own database.
    pub async fn connect(database_url: &str) -> StoreResult<Self> {
        let options = if database_url.contains(":memory:") {
            SqlitePoolOptions::new()
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            SqlitePoolOptions::new().max_connections(5)
        };

        let pool = options.connect(database_url).await?;

        let store = Self { pool };
        store.run_migrations().await?;

        tracing::info!(database_url = %database_url, "Connected to SQLite store");
        Ok(store)
    }

    async fn run_migrations(&self) -> StoreResult<()> {
        sqlx::raw_sql(SCHEMA_SQL).execute(&self.pool).await?;
        Ok(())
    }

    async fn stored_version(&self, id: Uuid) -> StoreResult<Option<u64>> {
        let version: Option<i64> = sqlx::query_scalar("SELECT version FROM incidents WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await?;

        version
            .map(|v| {
                u64::try_from(v)
                    .map_err(|_| StoreError::corrupt_row("Incident", format!("version {v}")))
            })
            .transpose()
    }

    async fn insert_incident(&self, incident: &Incident, version: i64) -> StoreResult<()> {
        let result = sqlx::query(
            "INSERT INTO incidents (id, title, description, reporter_id, technician_id, status,
                                    resolution_notes, version, created_at, updated_at, resolved_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(incident.id.to_string())
        .bind(&incident.title)
        .bind(&incident.description)
        .bind(incident.reporter_id.to_string())
        .bind(incident.technician_id.map(|id| id.to_string()))
        .bind(incident.status.as_str())
        .bind(&incident.resolution_notes)
        .bind(version)
        .bind(incident.created_at.to_rfc3339())
        .bind(incident.updated_at.to_rfc3339())
        .bind(incident.resolved_at.map(|ts| ts.to_rfc3339()))
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(()),
            Err(e) if is_unique_violation(&e) => {
                let actual = self.stored_version(incident.id).await?.unwrap_or_default();
                Err(StoreError::conflict(
                    "Incident",
                    incident.id.to_string(),
                    0,
                    actual,
                ))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn update_incident(
        &self,
        incident: &Incident,
        expected_version: u64,
        version: i64,
    ) -> StoreResult<()> {
        // reporter_id and created_at are never rewritten.
        let result = sqlx::query(
            "UPDATE incidents
             SET title = ?, description = ?, technician_id = ?, status = ?,
                 resolution_notes = ?, version = ?, updated_at = ?, resolved_at = ?
             WHERE id = ? AND version = ?",
        )
        .bind(&incident.title)
        .bind(&incident.description)
        .bind(incident.technician_id.map(|id| id.to_string()))
        .bind(incident.status.as_str())
        .bind(&incident.resolution_notes)
        .bind(version)
        .bind(incident.updated_at.to_rfc3339())
        .bind(incident.resolved_at.map(|ts| ts.to_rfc3339()))
        .bind(incident.id.to_string())
        .bind(version_to_i64(expected_version)?)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() > 0 {
            return Ok(());
        }

        match self.stored_version(incident.id).await? {
            None => Err(StoreError::not_found("Incident", incident.id.to_string())),
            Some(actual) => Err(StoreError::conflict(
                "Incident",
                incident.id.to_string(),
                expected_version,
                actual,
            )),
        }
    }
}

fn limit_param(limit: Option<u32>) -> i64 {
    // SQLite treats a negative LIMIT as unbounded.
    limit.map(i64::from).unwrap_or(-1)
}

#[async_trait]
impl UserStore for SqliteIncidentStore {
    async fn create_user(&self, user: User) -> StoreResult<User> {
        let result = sqlx::query(
            "INSERT INTO users (id, email, name, role, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(user.id.to_string())
        .bind(&user.email)
        .bind(&user.name)
        .bind(user.role.as_str())
        .bind(user.created_at.to_rfc3339())
        .bind(user.updated_at.to_rfc3339())
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(user),
            Err(e) if is_unique_violation(&e) => {
                Err(StoreError::already_exists("User", user.email.clone()))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn get_user(&self, id: Uuid) -> StoreResult<Option<User>> {
        let row: Option<UserRow> = sqlx::query_as(
            "SELECT id, email, name, role, created_at, updated_at
             FROM users
             WHERE id = ?",
        )
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await?;

        row.map(User::try_from).transpose()
    }

    async fn get_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        let row: Option<UserRow> = sqlx::query_as(
            "SELECT id, email, name, role, created_at, updated_at
             FROM users
             WHERE email = ?",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        row.map(User::try_from).transpose()
    }

    async fn list_users(&self, filter: UserFilter) -> StoreResult<(Vec<User>, u32)> {
        let role = filter.role.map(|r| r.as_str());

        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE (? IS NULL OR role = ?)")
            .bind(role)
            .bind(role)
            .fetch_one(&self.pool)
            .await?;

        let rows: Vec<UserRow> = sqlx::query_as(
            "SELECT id, email, name, role, created_at, updated_at
             FROM users
             WHERE (? IS NULL OR role = ?)
             ORDER BY email
             LIMIT ? OFFSET ?",
        )
        .bind(role)
        .bind(role)
        .bind(limit_param(filter.limit))
        .bind(i64::from(filter.offset.unwrap_or(0)))
        .fetch_all(&self.pool)
        .await?;

        let users = rows
            .into_iter()
            .map(User::try_from)
            .collect::<StoreResult<Vec<_>>>()?;
        Ok((users, total as u32))
    }
}

#[async_trait]
impl IncidentStore for SqliteIncidentStore {
    async fn get_incident(&self, id: Uuid) -> StoreResult<Option<Incident>> {
        let row: Option<IncidentRow> = sqlx::query_as(&format!(
            "SELECT {INCIDENT_COLUMNS} FROM incidents WHERE id = ?"
        ))
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await?;

        row.map(Incident::try_from).transpose()
    }

    async fn save_incident(
        &self,
        mut incident: Incident,
        expected_version: u64,
    ) -> StoreResult<Incident> {
        let next_version = expected_version + 1;
        let version = version_to_i64(next_version)?;

        if expected_version == 0 {
            self.insert_incident(&incident, version).await?;
        } else {
            self.update_incident(&incident, expected_version, version)
                .await?;
        }

        incident.version = next_version;
        Ok(incident)
    }

    async fn list_incidents(&self, filter: IncidentFilter) -> StoreResult<(Vec<Incident>, u32)> {
        let status = filter.status.map(|s| s.as_str());
        let reporter_id = filter.reporter_id.map(|id| id.to_string());
        let reporter_id = reporter_id.as_deref();
        let technician_id = filter.technician_id.map(|id| id.to_string());
        let technician_id = technician_id.as_deref();

        const WHERE_CLAUSE: &str = "WHERE (? IS NULL OR status = ?)
               AND (? IS NULL OR reporter_id = ?)
               AND (? IS NULL OR technician_id = ?)";

        let total: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM incidents {WHERE_CLAUSE}"))
            .bind(status)
            .bind(status)
            .bind(reporter_id)
            .bind(reporter_id)
            .bind(technician_id)
            .bind(technician_id)
            .fetch_one(&self.pool)
            .await?;

        let rows: Vec<IncidentRow> = sqlx::query_as(&format!(
            "SELECT {INCIDENT_COLUMNS} FROM incidents {WHERE_CLAUSE}
             ORDER BY created_at DESC
             LIMIT ? OFFSET ?"
        ))
        .bind(status)
        .bind(status)
        .bind(reporter_id)
        .bind(reporter_id)
        .bind(technician_id)
        .bind(technician_id)
        .bind(limit_param(filter.limit))
        .bind(i64::from(filter.offset.unwrap_or(0)))
        .fetch_all(&self.pool)
        .await?;

        let incidents = rows
            .into_iter()
            .map(Incident::try_from)
            .collect::<StoreResult<Vec<_>>>()?;
        Ok((incidents, total as u32))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn memory_store() -> SqliteIncidentStore {
        SqliteIncidentStore::connect("sqlite::memory:").await.unwrap()
    }

    #[tokio::test]
    async fn test_user_roundtrip() {
        let store = memory_store().await;
        let user = User::new("bob@example.com", Role::Technician).with_name("Bob");
        store.create_user(user.clone()).await.unwrap();

        let fetched = store.get_user(user.id).await.unwrap().unwrap();
        assert_eq!(fetched.email, "bob@example.com");
        assert_eq!(fetched.role, Role::Technician);
        assert_eq!(fetched.name.as_deref(), Some("Bob"));

        let by_email = store.get_user_by_email("bob@example.com").await.unwrap();
        assert_eq!(by_email.map(|u| u.id), Some(user.id));

        let duplicate = store
            .create_user(User::new("bob@example.com", Role::Admin))
            .await;
        assert!(matches!(duplicate, Err(StoreError::AlreadyExists { .. })));
    }

    #[tokio::test]
    async fn test_incident_versioned_save() {
        let store = memory_store().await;
        let incident = Incident::new(Uuid::new_v4(), "Disk full", "/var at 100%");

        let saved = store.save_incident(incident, 0).await.unwrap();
        assert_eq!(saved.version, 1);

        let mut assigned = saved.clone();
        assigned.status = IncidentStatus::Assigned;
        assigned.technician_id = Some(Uuid::new_v4());
        let assigned = store.save_incident(assigned, 1).await.unwrap();
        assert_eq!(assigned.version, 2);

        let fetched = store.get_incident(saved.id).await.unwrap().unwrap();
        assert_eq!(fetched.status, IncidentStatus::Assigned);
        assert_eq!(fetched.technician_id, assigned.technician_id);
        assert_eq!(fetched.version, 2);

        let stale = store.save_incident(saved.clone(), 1).await;
        assert!(matches!(
            stale,
            Err(StoreError::Conflict {
                expected: 1,
                actual: 2,
                ..
            })
        ));

        let duplicate = store.save_incident(saved, 0).await;
        assert!(matches!(
            duplicate,
            Err(StoreError::Conflict {
                expected: 0,
                actual: 2,
                ..
            })
        ));
    }

    #[tokio::test]
    async fn test_update_missing_incident() {
        let store = memory_store().await;
        let incident = Incident::new(Uuid::new_v4(), "Ghost", "never saved");

        let result = store.save_incident(incident, 1).await;
        assert!(matches!(result, Err(StoreError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_list_incidents_filters() {
        let store = memory_store().await;
        let reporter = Uuid::new_v4();

        store
            .save_incident(Incident::new(reporter, "One", "first"), 0)
            .await
            .unwrap();
        store
            .save_incident(Incident::new(reporter, "Two", "second"), 0)
            .await
            .unwrap();
        store
            .save_incident(Incident::new(Uuid::new_v4(), "Other", "third"), 0)
            .await
            .unwrap();

        let filter = IncidentFilter {
            reporter_id: Some(reporter),
            ..Default::default()
        };
        let (incidents, total) = store.list_incidents(filter).await.unwrap();
        assert_eq!(total, 2);
        assert!(incidents.iter().all(|i| i.reporter_id == reporter));

        let filter = IncidentFilter {
            status: Some(IncidentStatus::Open),
            limit: Some(1),
            offset: Some(1),
            ..Default::default()
        };
        let (page, total) = store.list_incidents(filter).await.unwrap();
        assert_eq!(total, 3);
        assert_eq!(page.len(), 1);

        let filter = IncidentFilter {
            status: Some(IncidentStatus::Resolved),
            ..Default::default()
        };
        let (resolved, total) = store.list_incidents(filter).await.unwrap();
        assert_eq!(total, 0);
        assert!(resolved.is_empty());
    }
}
