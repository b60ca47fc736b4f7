//! In-memory store implementation.

use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use entities::{Incident, User};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::{IncidentFilter, IncidentStore, StoreError, StoreResult, UserFilter, UserStore};

/// In-memory store, used for tests and for running without a database.
#[derive(Debug, Default, Clone)]
pub struct MemoryIncidentStore {
    users: Arc<RwLock<HashMap<Uuid, User>>>,
    incidents: Arc<RwLock<HashMap<Uuid, Incident>>>,
}

impl MemoryIncidentStore {
    /// Creates a new in-memory store.
    pub fn new() -> Self {
        Self::default()
    }
}

fn paginate<T>(mut items: Vec<T>, offset: Option<u32>, limit: Option<u32>) -> Vec<T> {
    if let Some(offset) = offset {
        items = items.into_iter().skip(offset as usize).collect();
    }
    if let Some(limit) = limit {
        items.truncate(limit as usize);
    }
    items
}

#[async_trait]
impl UserStore for MemoryIncidentStore {
    async fn create_user(&self, user: User) -> StoreResult<User> {
        let mut users = self.users.write().await;
        if users.contains_key(&user.id) {
            return Err(StoreError::already_exists("User", user.id.to_string()));
        }
        if users.values().any(|u| u.email == user.email) {
            return Err(StoreError::already_exists("User", user.email.clone()));
        }
        users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn get_user(&self, id: Uuid) -> StoreResult<Option<User>> {
        let users = self.users.read().await;
        Ok(users.get(&id).cloned())
    }

    async fn get_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        let users = self.users.read().await;
        Ok(users.values().find(|u| u.email == email).cloned())
    }

    async fn list_users(&self, filter: UserFilter) -> StoreResult<(Vec<User>, u32)> {
        let users = self.users.read().await;
        let mut result: Vec<User> = users
            .values()
            .filter(|u| filter.role.is_none_or(|role| u.role == role))
            .cloned()
            .collect();
        result.sort_by(|a, b| a.email.cmp(&b.email));

        let total = result.len() as u32;
        Ok((paginate(result, filter.offset, filter.limit), total))
    }
}

#[async_trait]
impl IncidentStore for MemoryIncidentStore {
    async fn get_incident(&self, id: Uuid) -> StoreResult<Option<Incident>> {
        let incidents = self.incidents.read().await;
        Ok(incidents.get(&id).cloned())
    }

    async fn save_incident(
        &self,
        mut incident: Incident,
        expected_version: u64,
    ) -> StoreResult<Incident> {
        // The version check and the write happen under one write guard.
        let mut incidents = self.incidents.write().await;

        match incidents.get(&incident.id) {
            None if expected_version == 0 => {}
            None => return Err(StoreError::not_found("Incident", incident.id.to_string())),
            Some(stored) if stored.version != expected_version => {
                return Err(StoreError::conflict(
                    "Incident",
                    incident.id.to_string(),
                    expected_version,
                    stored.version,
                ));
            }
            Some(_) => {}
        }

        incident.version = expected_version + 1;
        incidents.insert(incident.id, incident.clone());
        Ok(incident)
    }

    async fn list_incidents(&self, filter: IncidentFilter) -> StoreResult<(Vec<Incident>, u32)> {
        let incidents = self.incidents.read().await;
        let mut result: Vec<Incident> = incidents
            .values()
            .filter(|i| filter.matches(i))
            .cloned()
            .collect();
        result.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        let total = result.len() as u32;
        Ok((paginate(result, filter.offset, filter.limit), total))
    }
}

#[cfg(test)]
mod tests {
    use entities::{IncidentStatus, Role};

    use super::*;

    #[tokio::test]
    async fn test_user_crud() {
        let store = MemoryIncidentStore::new();

        let user = User::new("alice@example.com", Role::Reporter).with_name("Alice");
        let created = store.create_user(user.clone()).await.unwrap();
        assert_eq!(created.email, "alice@example.com");

        let fetched = store.get_user(created.id).await.unwrap().unwrap();
        assert_eq!(fetched.name, Some("Alice".to_string()));

        let by_email = store
            .get_user_by_email("alice@example.com")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(by_email.id, created.id);

        assert!(store.get_user(Uuid::new_v4()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_duplicate_email_rejected() {
        let store = MemoryIncidentStore::new();
        store
            .create_user(User::new("bob@example.com", Role::Technician))
            .await
            .unwrap();

        let result = store
            .create_user(User::new("bob@example.com", Role::Admin))
            .await;
        assert!(matches!(result, Err(StoreError::AlreadyExists { .. })));
    }

    #[tokio::test]
    async fn test_list_users_by_role() {
        let store = MemoryIncidentStore::new();
        store
            .create_user(User::new("a@example.com", Role::Technician))
            .await
            .unwrap();
        store
            .create_user(User::new("b@example.com", Role::Reporter))
            .await
            .unwrap();
        store
            .create_user(User::new("c@example.com", Role::Technician))
            .await
            .unwrap();

        let filter = UserFilter {
            role: Some(Role::Technician),
            ..Default::default()
        };
        let (users, total) = store.list_users(filter).await.unwrap();
        assert_eq!(total, 2);
        assert_eq!(users[0].email, "a@example.com");
        assert_eq!(users[1].email, "c@example.com");
    }

    #[tokio::test]
    async fn test_save_bumps_version() {
        let store = MemoryIncidentStore::new();
        let incident = Incident::new(Uuid::new_v4(), "Disk full", "/var at 100%");

        let saved = store.save_incident(incident, 0).await.unwrap();
        assert_eq!(saved.version, 1);

        let mut changed = saved.clone();
        changed.title = "Disk full on db-1".to_string();
        let saved = store.save_incident(changed, 1).await.unwrap();
        assert_eq!(saved.version, 2);

        let fetched = store.get_incident(saved.id).await.unwrap().unwrap();
        assert_eq!(fetched.title, "Disk full on db-1");
        assert_eq!(fetched.version, 2);
    }

    #[tokio::test]
    async fn test_stale_version_conflicts() {
        let store = MemoryIncidentStore::new();
        let incident = Incident::new(Uuid::new_v4(), "Disk full", "/var at 100%");
        let saved = store.save_incident(incident, 0).await.unwrap();

        let first = saved.clone();
        let second = saved.clone();
        store.save_incident(first, 1).await.unwrap();

        let result = store.save_incident(second, 1).await;
        match result {
            Err(StoreError::Conflict {
                expected, actual, ..
            }) => {
                assert_eq!(expected, 1);
                assert_eq!(actual, 2);
            }
            other => panic!("expected conflict, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_insert_existing_and_update_missing() {
        let store = MemoryIncidentStore::new();
        let incident = Incident::new(Uuid::new_v4(), "Disk full", "/var at 100%");
        let saved = store.save_incident(incident, 0).await.unwrap();

        let result = store.save_incident(saved, 0).await;
        assert!(matches!(
            result,
            Err(StoreError::Conflict {
                expected: 0,
                actual: 1,
                ..
            })
        ));
        assert!(result.unwrap_err().is_conflict());

        let missing = Incident::new(Uuid::new_v4(), "Ghost", "never saved");
        let result = store.save_incident(missing, 3).await;
        assert!(matches!(result, Err(StoreError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_list_incidents_filter_and_pagination() {
        let store = MemoryIncidentStore::new();
        let reporter = Uuid::new_v4();
        let technician = Uuid::new_v4();

        for n in 0..3 {
            let incident = Incident::new(reporter, format!("Incident {n}"), "details");
            store.save_incident(incident, 0).await.unwrap();
        }
        let mut assigned = Incident::new(Uuid::new_v4(), "Assigned one", "details");
        assigned.status = IncidentStatus::Assigned;
        assigned.technician_id = Some(technician);
        store.save_incident(assigned, 0).await.unwrap();

        let (all, total) = store
            .list_incidents(IncidentFilter::default())
            .await
            .unwrap();
        assert_eq!(total, 4);
        assert_eq!(all.len(), 4);

        let filter = IncidentFilter {
            reporter_id: Some(reporter),
            limit: Some(2),
            ..Default::default()
        };
        let (page, total) = store.list_incidents(filter).await.unwrap();
        assert_eq!(total, 3);
        assert_eq!(page.len(), 2);

        let filter = IncidentFilter {
            technician_id: Some(technician),
            status: Some(IncidentStatus::Assigned),
            ..Default::default()
        };
        let (mine, total) = store.list_incidents(filter).await.unwrap();
        assert_eq!(total, 1);
        assert_eq!(mine[0].title, "Assigned one");
    }
}
