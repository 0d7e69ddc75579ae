use async_trait::async_trait;
use std::sync::Arc;

use crate::users::dto::{UserRegister, UserUpdatePassword};
use crate::users::repo::UserRepository;
use crate::users::repo_types::User;

#[async_trait]
pub trait UserService: Send + Sync {
    async fn register(&self, user: &UserRegister) -> anyhow::Result<()>;
    async fn update_password(&self, user: &UserUpdatePassword) -> anyhow::Result<()>;
    async fn list(&self) -> anyhow::Result<Vec<User>>;
}

/// Forwards every call to the repository unchanged.
#[derive(Clone)]
pub struct UserServiceImpl {
    repo: Arc<dyn UserRepository>,
}

impl UserServiceImpl {
    pub fn new(repo: Arc<dyn UserRepository>) -> Self {
        Self { repo }
    }
}

#[async_trait]
impl UserService for UserServiceImpl {
    async fn register(&self, user: &UserRegister) -> anyhow::Result<()> {
        self.repo.create(user).await
    }

    async fn update_password(&self, user: &UserUpdatePassword) -> anyhow::Result<()> {
        self.repo.update_password(user).await
    }

    async fn list(&self) -> anyhow::Result<Vec<User>> {
        self.repo.list().await
    }
}
