//! Application persistence. Every call is scoped to an owner: a record that
//! belongs to someone else is reported as missing.

use async_trait::async_trait;
use dashmap::DashMap;
use grantcraft_core::{Application, ApplicationId, GrantError, Result, UserId};

pub type Mutation<'a> = Box<dyn FnOnce(&mut Application) -> Result<()> + Send + 'a>;

#[async_trait]
pub trait ApplicationStore: Send + Sync {
    /// Most recently updated first.
    async fn list(&self, owner: UserId) -> Vec<Application>;
    async fn get(&self, owner: UserId, id: ApplicationId) -> Result<Application>;
    async fn insert(&self, application: Application) -> Result<Application>;
    /// Applies `mutation` atomically. On error the record is left unchanged.
    async fn update(
        &self,
        owner: UserId,
        id: ApplicationId,
        mutation: Mutation<'_>,
    ) -> Result<Application>;
    async fn delete(&self, owner: UserId, id: ApplicationId) -> Result<()>;
}

fn not_found(id: ApplicationId) -> GrantError {
    GrantError::NotFound(format!("application {}", id))
}

#[derive(Debug, Default)]
pub struct InMemoryStore {
    applications: DashMap<ApplicationId, Application>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.applications.len()
    }

    pub fn is_empty(&self) -> bool {
        self.applications.is_empty()
    }
}

#[async_trait]
impl ApplicationStore for InMemoryStore {
    async fn list(&self, owner: UserId) -> Vec<Application> {
        let mut owned: Vec<Application> = self
            .applications
            .iter()
            .filter(|entry| entry.owner_id == owner)
            .map(|entry| entry.value().clone())
            .collect();
        owned.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        owned
    }

    async fn get(&self, owner: UserId, id: ApplicationId) -> Result<Application> {
        self.applications
            .get(&id)
            .filter(|app| app.owner_id == owner)
            .map(|app| app.value().clone())
            .ok_or_else(|| not_found(id))
    }

    async fn insert(&self, application: Application) -> Result<Application> {
        if self.applications.contains_key(&application.id) {
            return Err(GrantError::Validation(format!(
                "application {} already exists",
                application.id
            )));
        }
        self.applications.insert(application.id, application.clone());
        Ok(application)
    }

    async fn update(
        &self,
        owner: UserId,
        id: ApplicationId,
        mutation: Mutation<'_>,
    ) -> Result<Application> {
        let mut entry = self
            .applications
            .get_mut(&id)
            .filter(|app| app.owner_id == owner)
            .ok_or_else(|| not_found(id))?;

        let mut draft = entry.value().clone();
        mutation(&mut draft)?;
        draft.touch();
        *entry = draft.clone();
        Ok(draft)
    }

    async fn delete(&self, owner: UserId, id: ApplicationId) -> Result<()> {
        self.applications
            .remove_if(&id, |_, app| app.owner_id == owner)
            .map(|_| ())
            .ok_or_else(|| not_found(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use grantcraft_core::MechanismId;
    use uuid::Uuid;

    #[tokio::test]
    async fn records_are_owner_scoped() {
        let store = InMemoryStore::new();
        let alice = Uuid::new_v4();
        let bob = Uuid::new_v4();
        let app = store
            .insert(Application::new(alice, "Cardiac aging", MechanismId::R01))
            .await
            .unwrap();

        assert!(store.get(alice, app.id).await.is_ok());
        assert!(matches!(store.get(bob, app.id).await, Err(GrantError::NotFound(_))));
        assert!(store.list(bob).await.is_empty());
        assert!(store.delete(bob, app.id).await.is_err());
        assert_eq!(store.len(), 1);

        store.delete(alice, app.id).await.unwrap();
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn failed_mutation_leaves_record_untouched() {
        let store = InMemoryStore::new();
        let owner = Uuid::new_v4();
        let app = store
            .insert(Application::new(owner, "Original", MechanismId::R21))
            .await
            .unwrap();

        let result = store
            .update(
                owner,
                app.id,
                Box::new(|app: &mut Application| {
                    app.title = "Changed".into();
                    Err(GrantError::Validation("nope".into()))
                }),
            )
            .await;
        assert!(result.is_err());
        assert_eq!(store.get(owner, app.id).await.unwrap().title, "Original");

        let updated = store
            .update(
                owner,
                app.id,
                Box::new(|app: &mut Application| {
                    app.title = "Changed".into();
                    Ok(())
                }),
            )
            .await
            .unwrap();
        assert_eq!(updated.title, "Changed");
        assert!(updated.updated_at >= app.updated_at);
    }

    #[tokio::test]
    async fn list_is_most_recent_first() {
        let store = InMemoryStore::new();
        let owner = Uuid::new_v4();
        let first = store
            .insert(Application::new(owner, "First", MechanismId::R01))
            .await
            .unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        store
            .insert(Application::new(owner, "Second", MechanismId::R01))
            .await
            .unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        store
            .update(owner, first.id, Box::new(|_: &mut Application| Ok(())))
            .await
            .unwrap();

        let titles: Vec<String> = store.list(owner).await.into_iter().map(|a| a.title).collect();
        assert_eq!(titles, vec!["First", "Second"]);
    }
}
