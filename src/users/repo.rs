use argon2::{
    password_hash::{PasswordHasher, SaltString},
    Argon2,
};
use async_trait::async_trait;
use rand::rngs::OsRng;
use sqlx::SqlitePool;

use crate::users::dto::{UserRegister, UserUpdatePassword};
use crate::users::repo_types::User;

/// Persistence for the `users` table. Driver errors are returned as-is.
#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn create(&self, user: &UserRegister) -> anyhow::Result<()>;
    /// Matching zero rows is not an error.
    async fn update_password(&self, user: &UserUpdatePassword) -> anyhow::Result<()>;
    async fn list(&self) -> anyhow::Result<Vec<User>>;
}

/// Passwords are stored as Argon2 PHC strings with a fresh salt per write.
fn password_digest(plain: &str) -> anyhow::Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(plain.as_bytes(), &salt)
        .map(|digest| digest.to_string())
        .map_err(|e| anyhow::anyhow!("hashing password: {e}"))
}

#[derive(Clone)]
pub struct SqliteUserRepository {
    db: SqlitePool,
}

impl SqliteUserRepository {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl UserRepository for SqliteUserRepository {
    async fn create(&self, user: &UserRegister) -> anyhow::Result<()> {
        let password = password_digest(&user.password)?;
        sqlx::query(
            r#"
            INSERT INTO users (username, email, password)
            VALUES (?, ?, ?)
            "#,
        )
        .bind(&user.username)
        .bind(&user.email)
        .bind(password)
        .execute(&self.db)
        .await?;
        Ok(())
    }

    async fn update_password(&self, user: &UserUpdatePassword) -> anyhow::Result<()> {
        let password = password_digest(&user.new_password)?;
        let result = sqlx::query(
            r#"
            UPDATE users SET username = ?, password = ?
            WHERE username = ?
            "#,
        )
        .bind(&user.username)
        .bind(password)
        .bind(&user.username)
        .execute(&self.db)
        .await?;
        tracing::debug!(username = %user.username, rows = result.rows_affected(), "password updated");
        Ok(())
    }

    async fn list(&self) -> anyhow::Result<Vec<User>> {
        let users = sqlx::query_as::<_, User>(
            r#"
            SELECT username, email, created_at, updated_at FROM users
            "#,
        )
        .fetch_all(&self.db)
        .await?;
        Ok(users)
    }
}
