use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{Database, TaskStore, UserStore};
use crate::auth::credentials::DUPLICATE_ACCOUNT;
use crate::error::AppError;
use crate::models::{
    NewUser, Task, TaskChanges, TaskQuery, TaskStatus, User, UserCredentials,
};

/// Process-local store with the same contract as the Postgres backend.
#[derive(Debug, Default)]
pub struct MemoryDatabase {
    users: RwLock<HashMap<Uuid, UserCredentials>>,
    /// Kept in insertion order, which is creation order.
    tasks: RwLock<Vec<Task>>,
}

impl MemoryDatabase {
    pub fn new() -> Self {
        Self::default()
    }

    /// Removes a user and the tasks they own.
    pub async fn remove_user(&self, id: Uuid) {
        self.users.write().await.remove(&id);
        self.tasks.write().await.retain(|task| task.user_id != id);
    }
}

#[async_trait]
impl UserStore for MemoryDatabase {
    async fn find_user_by_id(&self, id: Uuid) -> Result<Option<User>, AppError> {
        Ok(self.users.read().await.get(&id).map(|c| c.user.clone()))
    }

    async fn find_credentials(
        &self,
        identifier: &str,
    ) -> Result<Option<UserCredentials>, AppError> {
        let email = identifier.to_lowercase();
        Ok(self
            .users
            .read()
            .await
            .values()
            .find(|c| c.user.username == identifier || c.user.email == email)
            .cloned())
    }

    async fn user_exists(&self, username: &str, email: &str) -> Result<bool, AppError> {
        Ok(self
            .users
            .read()
            .await
            .values()
            .any(|c| c.user.username == username || c.user.email == email))
    }

    async fn insert_user(&self, new_user: NewUser) -> Result<User, AppError> {
        let mut users = self.users.write().await;
        let taken = users
            .values()
            .any(|c| c.user.username == new_user.username || c.user.email == new_user.email);
        if taken {
            return Err(AppError::BadRequest(DUPLICATE_ACCOUNT.into()));
        }
        let credentials = new_user.into_credentials();
        let user = credentials.user.clone();
        users.insert(user.id, credentials);
        Ok(user)
    }
}

#[async_trait]
impl TaskStore for MemoryDatabase {
    async fn list_tasks(&self, owner: Uuid, query: &TaskQuery) -> Result<Vec<Task>, AppError> {
        Ok(self
            .tasks
            .read()
            .await
            .iter()
            .rev()
            .filter(|task| task.user_id == owner && task.matches(query))
            .cloned()
            .collect())
    }

    async fn find_task(&self, owner: Uuid, id: Uuid) -> Result<Option<Task>, AppError> {
        Ok(self
            .tasks
            .read()
            .await
            .iter()
            .find(|task| task.id == id && task.user_id == owner)
            .cloned())
    }

    async fn insert_task(&self, task: Task) -> Result<Task, AppError> {
        if !self.users.read().await.contains_key(&task.user_id) {
            return Err(AppError::DatabaseError(format!(
                "task owner {} does not exist",
                task.user_id
            )));
        }
        self.tasks.write().await.push(task.clone());
        Ok(task)
    }

    async fn update_task(
        &self,
        owner: Uuid,
        id: Uuid,
        changes: &TaskChanges,
    ) -> Result<Option<Task>, AppError> {
        let mut tasks = self.tasks.write().await;
        Ok(tasks
            .iter_mut()
            .find(|task| task.id == id && task.user_id == owner)
            .map(|task| {
                task.apply(changes);
                task.clone()
            }))
    }

    async fn delete_task(&self, owner: Uuid, id: Uuid) -> Result<bool, AppError> {
        let mut tasks = self.tasks.write().await;
        let before = tasks.len();
        tasks.retain(|task| !(task.id == id && task.user_id == owner));
        Ok(tasks.len() < before)
    }

    async fn task_counts(&self) -> Result<Vec<(TaskStatus, i64)>, AppError> {
        let tasks = self.tasks.read().await;
        Ok(TaskStatus::ALL
            .iter()
            .map(|status| {
                let count = tasks.iter().filter(|t| t.status == *status).count();
                (*status, count as i64)
            })
            .collect())
    }
}

#[async_trait]
impl Database for MemoryDatabase {
    async fn ping(&self) -> bool {
        true
    }

    fn pool_connections(&self) -> u32 {
        0
    }
}
