//! Author repository
//!
//! Database operations for catalog authors.

use crate::config::DatabaseDriver;
use crate::db::DynDatabasePool;
use crate::models::Author;
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{MySqlPool, Row, SqlitePool};
use std::sync::Arc;

/// Author repository trait
#[async_trait]
pub trait AuthorRepository: Send + Sync {
    /// Create a new author
    async fn create(&self, author: &Author) -> Result<Author>;

    /// Get author by ID
    async fn get_by_id(&self, id: i64) -> Result<Option<Author>>;

    /// List authors, optionally filtered by a name fragment
    async fn list(&self, name_contains: Option<&str>) -> Result<Vec<Author>>;

    /// Update an author
    async fn update(&self, author: &Author) -> Result<Author>;

    /// Delete an author (books cascade at the storage layer)
    async fn delete(&self, id: i64) -> Result<()>;
}

/// SQLx-based author repository implementation
pub struct SqlxAuthorRepository {
    pool: DynDatabasePool,
}

impl SqlxAuthorRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn AuthorRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl AuthorRepository for SqlxAuthorRepository {
    async fn create(&self, author: &Author) -> Result<Author> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => create_sqlite(self.pool.as_sqlite().unwrap(), author).await,
            DatabaseDriver::Mysql => create_mysql(self.pool.as_mysql().unwrap(), author).await,
        }
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<Author>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => get_by_id_sqlite(self.pool.as_sqlite().unwrap(), id).await,
            DatabaseDriver::Mysql => get_by_id_mysql(self.pool.as_mysql().unwrap(), id).await,
        }
    }

    async fn list(&self, name_contains: Option<&str>) -> Result<Vec<Author>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                list_sqlite(self.pool.as_sqlite().unwrap(), name_contains).await
            }
            DatabaseDriver::Mysql => list_mysql(self.pool.as_mysql().unwrap(), name_contains).await,
        }
    }

    async fn update(&self, author: &Author) -> Result<Author> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => update_sqlite(self.pool.as_sqlite().unwrap(), author).await,
            DatabaseDriver::Mysql => update_mysql(self.pool.as_mysql().unwrap(), author).await,
        }
    }

    async fn delete(&self, id: i64) -> Result<()> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => delete_sqlite(self.pool.as_sqlite().unwrap(), id).await,
            DatabaseDriver::Mysql => delete_mysql(self.pool.as_mysql().unwrap(), id).await,
        }
    }
}

// ============================================================================
// SQLite implementations
// ============================================================================

async fn create_sqlite(pool: &SqlitePool, author: &Author) -> Result<Author> {
    let now = Utc::now();

    let result = sqlx::query("INSERT INTO authors (name, created_at) VALUES (?, ?)")
        .bind(&author.name)
        .bind(now)
        .execute(pool)
        .await
        .context("Failed to create author")?;

    Ok(Author {
        id: result.last_insert_rowid(),
        name: author.name.clone(),
        created_at: now,
    })
}

async fn get_by_id_sqlite(pool: &SqlitePool, id: i64) -> Result<Option<Author>> {
    let row = sqlx::query("SELECT id, name, created_at FROM authors WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("Failed to get author by ID")?;

    Ok(row.map(|row| row_to_author_sqlite(&row)))
}

async fn list_sqlite(pool: &SqlitePool, name_contains: Option<&str>) -> Result<Vec<Author>> {
    let rows = match name_contains {
        Some(fragment) => {
            let pattern = format!("%{}%", fragment);
            sqlx::query("SELECT id, name, created_at FROM authors WHERE name LIKE ? ORDER BY id")
                .bind(pattern)
                .fetch_all(pool)
                .await
        }
        None => {
            sqlx::query("SELECT id, name, created_at FROM authors ORDER BY id")
                .fetch_all(pool)
                .await
        }
    }
    .context("Failed to list authors")?;

    Ok(rows.iter().map(row_to_author_sqlite).collect())
}

async fn update_sqlite(pool: &SqlitePool, author: &Author) -> Result<Author> {
    sqlx::query("UPDATE authors SET name = ? WHERE id = ?")
        .bind(&author.name)
        .bind(author.id)
        .execute(pool)
        .await
        .context("Failed to update author")?;

    get_by_id_sqlite(pool, author.id)
        .await?
        .ok_or_else(|| anyhow::anyhow!("Author not found after update"))
}

async fn delete_sqlite(pool: &SqlitePool, id: i64) -> Result<()> {
    sqlx::query("DELETE FROM authors WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await
        .context("Failed to delete author")?;

    Ok(())
}

// ============================================================================
// MySQL implementations
// ============================================================================

async fn create_mysql(pool: &MySqlPool, author: &Author) -> Result<Author> {
    let now = Utc::now();

    let result = sqlx::query("INSERT INTO authors (name, created_at) VALUES (?, ?)")
        .bind(&author.name)
        .bind(now)
        .execute(pool)
        .await
        .context("Failed to create author")?;

    Ok(Author {
        id: result.last_insert_id() as i64,
        name: author.name.clone(),
        created_at: now,
    })
}

async fn get_by_id_mysql(pool: &MySqlPool, id: i64) -> Result<Option<Author>> {
    let row = sqlx::query("SELECT id, name, created_at FROM authors WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("Failed to get author by ID")?;

    Ok(row.map(|row| row_to_author_mysql(&row)))
}

async fn list_mysql(pool: &MySqlPool, name_contains: Option<&str>) -> Result<Vec<Author>> {
    let rows = match name_contains {
        Some(fragment) => {
            let pattern = format!("%{}%", fragment);
            sqlx::query("SELECT id, name, created_at FROM authors WHERE name LIKE ? ORDER BY id")
                .bind(pattern)
                .fetch_all(pool)
                .await
        }
        None => {
            sqlx::query("SELECT id, name, created_at FROM authors ORDER BY id")
                .fetch_all(pool)
                .await
        }
    }
    .context("Failed to list authors")?;

    Ok(rows.iter().map(row_to_author_mysql).collect())
}

async fn update_mysql(pool: &MySqlPool, author: &Author) -> Result<Author> {
    sqlx::query("UPDATE authors SET name = ? WHERE id = ?")
        .bind(&author.name)
        .bind(author.id)
        .execute(pool)
        .await
        .context("Failed to update author")?;

    get_by_id_mysql(pool, author.id)
        .await?
        .ok_or_else(|| anyhow::anyhow!("Author not found after update"))
}

async fn delete_mysql(pool: &MySqlPool, id: i64) -> Result<()> {
    sqlx::query("DELETE FROM authors WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await
        .context("Failed to delete author")?;

    Ok(())
}

fn row_to_author_sqlite(row: &sqlx::sqlite::SqliteRow) -> Author {
    Author {
        id: row.get("id"),
        name: row.get("name"),
        created_at: row.get("created_at"),
    }
}

fn row_to_author_mysql(row: &sqlx::mysql::MySqlRow) -> Author {
    Author {
        id: row.get("id"),
        name: row.get("name"),
        created_at: row.get("created_at"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{create_test_pool, migrations};

    async fn setup_test_repo() -> SqlxAuthorRepository {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");
        SqlxAuthorRepository::new(pool)
    }

    #[tokio::test]
    async fn test_create_author() {
        let repo = setup_test_repo().await;

        let created = repo
            .create(&Author::new("J.K. Rowling".to_string()))
            .await
            .expect("Failed to create author");

        assert!(created.id > 0);
        assert_eq!(created.name, "J.K. Rowling");
    }

    #[tokio::test]
    async fn test_get_by_id() {
        let repo = setup_test_repo().await;
        let created = repo
            .create(&Author::new("George Orwell".to_string()))
            .await
            .expect("Failed to create author");

        let found = repo
            .get_by_id(created.id)
            .await
            .expect("Failed to get author")
            .expect("Author not found");

        assert_eq!(found.name, "George Orwell");
    }

    #[tokio::test]
    async fn test_get_by_id_not_found() {
        let repo = setup_test_repo().await;

        let found = repo.get_by_id(999).await.expect("Failed to get author");
        assert!(found.is_none());
    }

    #[tokio::test]
    async fn test_list_authors() {
        let repo = setup_test_repo().await;
        for name in ["Ursula K. Le Guin", "Terry Pratchett", "Ursula Vernon"] {
            repo.create(&Author::new(name.to_string()))
                .await
                .expect("Failed to create author");
        }

        let all = repo.list(None).await.expect("Failed to list");
        assert_eq!(all.len(), 3);

        let ursulas = repo.list(Some("Ursula")).await.expect("Failed to list");
        assert_eq!(ursulas.len(), 2);
    }

    #[tokio::test]
    async fn test_update_author() {
        let repo = setup_test_repo().await;
        let mut created = repo
            .create(&Author::new("Typo Name".to_string()))
            .await
            .expect("Failed to create author");

        created.name = "Fixed Name".to_string();
        let updated = repo.update(&created).await.expect("Failed to update");

        assert_eq!(updated.name, "Fixed Name");
    }

    #[tokio::test]
    async fn test_delete_author() {
        let repo = setup_test_repo().await;
        let created = repo
            .create(&Author::new("Ephemeral".to_string()))
            .await
            .expect("Failed to create author");

        repo.delete(created.id).await.expect("Failed to delete");

        let found = repo.get_by_id(created.id).await.expect("Failed to get");
        assert!(found.is_none());
    }
}
