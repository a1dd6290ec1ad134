//! Account repository

use crate::db::DynDatabasePool;
use crate::models::Account;
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::Row;
use std::sync::Arc;

/// Account repository trait
#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn create(&self, account: &Account) -> Result<Account>;

    async fn get_by_id(&self, id: i64) -> Result<Option<Account>>;

    /// Case-insensitive lookup
    async fn get_by_username(&self, username: &str) -> Result<Option<Account>>;

    async fn list(&self) -> Result<Vec<Account>>;

    async fn update_password(&self, id: i64, password_hash: &str) -> Result<()>;

    async fn record_login(&self, id: i64, ip: Option<&str>, at: DateTime<Utc>) -> Result<()>;

    async fn delete(&self, id: i64) -> Result<()>;

    async fn count(&self) -> Result<i64>;
}

/// SQLx-based account repository
pub struct SqlxUserRepository {
    pool: DynDatabasePool,
}

impl SqlxUserRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn UserRepository> {
        Arc::new(Self::new(pool))
    }
}

const ACCOUNT_COLUMNS: &str = "id, username, password_hash, last_login_ip, last_login_time, created_at";

#[async_trait]
impl UserRepository for SqlxUserRepository {
    async fn create(&self, account: &Account) -> Result<Account> {
        let result = sqlx::query("INSERT INTO users (username, password_hash, created_at) VALUES (?, ?, ?)")
            .bind(&account.username)
            .bind(&account.password_hash)
            .bind(account.created_at)
            .execute(self.pool.sqlite())
            .await
            .context("Failed to create account")?;

        Ok(Account {
            id: result.last_insert_rowid(),
            ..account.clone()
        })
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<Account>> {
        let sql = format!("SELECT {} FROM users WHERE id = ?", ACCOUNT_COLUMNS);
        let row = sqlx::query(&sql)
            .bind(id)
            .fetch_optional(self.pool.sqlite())
            .await
            .context("Failed to get account by ID")?;
        row.map(|r| row_to_account(&r)).transpose()
    }

    async fn get_by_username(&self, username: &str) -> Result<Option<Account>> {
        let sql = format!("SELECT {} FROM users WHERE username = ? COLLATE NOCASE", ACCOUNT_COLUMNS);
        let row = sqlx::query(&sql)
            .bind(username)
            .fetch_optional(self.pool.sqlite())
            .await
            .context("Failed to get account by username")?;
        row.map(|r| row_to_account(&r)).transpose()
    }

    async fn list(&self) -> Result<Vec<Account>> {
        let sql = format!("SELECT {} FROM users ORDER BY id", ACCOUNT_COLUMNS);
        let rows = sqlx::query(&sql)
            .fetch_all(self.pool.sqlite())
            .await
            .context("Failed to list accounts")?;
        rows.iter().map(row_to_account).collect()
    }

    async fn update_password(&self, id: i64, password_hash: &str) -> Result<()> {
        sqlx::query("UPDATE users SET password_hash = ? WHERE id = ?")
            .bind(password_hash)
            .bind(id)
            .execute(self.pool.sqlite())
            .await
            .context("Failed to update password")?;
        Ok(())
    }

    async fn record_login(&self, id: i64, ip: Option<&str>, at: DateTime<Utc>) -> Result<()> {
        sqlx::query("UPDATE users SET last_login_ip = ?, last_login_time = ? WHERE id = ?")
            .bind(ip)
            .bind(at)
            .bind(id)
            .execute(self.pool.sqlite())
            .await
            .context("Failed to record login")?;
        Ok(())
    }

    async fn delete(&self, id: i64) -> Result<()> {
        sqlx::query("DELETE FROM users WHERE id = ?")
            .bind(id)
            .execute(self.pool.sqlite())
            .await
            .context("Failed to delete account")?;
        Ok(())
    }

    async fn count(&self) -> Result<i64> {
        sqlx::query_scalar("SELECT COUNT(*) FROM users")
            .fetch_one(self.pool.sqlite())
            .await
            .context("Failed to count accounts")
    }
}

fn row_to_account(row: &SqliteRow) -> Result<Account> {
    Ok(Account {
        id: row.try_get("id")?,
        username: row.try_get("username")?,
        password_hash: row.try_get("password_hash")?,
        last_login_ip: row.try_get("last_login_ip")?,
        last_login_time: row.try_get("last_login_time")?,
        created_at: row.try_get("created_at")?,
    })
}
