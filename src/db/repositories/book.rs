//! Book repository
//!
//! Database operations for catalog books, including the declarative
//! query-parameter filter set (`BookQuery`): title match, publication
//! year ranges, author id/name, free-text search across title and author
//! name, and a whitelisted ordering.

use crate::config::DatabaseDriver;
use crate::db::DynDatabasePool;
use crate::models::Book;
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{MySqlPool, Row, SqlitePool};
use std::str::FromStr;
use std::sync::Arc;

/// Declarative filter over the book listing.
///
/// Every field maps one query-string parameter onto one SQL predicate;
/// unset fields contribute nothing.
#[derive(Debug, Clone, Default)]
pub struct BookQuery {
    /// Case-insensitive exact title match
    pub title: Option<String>,
    /// Case-insensitive title fragment
    pub title_icontains: Option<String>,
    /// Exact publication year
    pub publication_year: Option<i32>,
    /// Published in or after this year
    pub publication_year_gte: Option<i32>,
    /// Published in or before this year
    pub publication_year_lte: Option<i32>,
    /// Catalog author id
    pub author: Option<i64>,
    /// Case-insensitive author name fragment
    pub author_name: Option<String>,
    /// Case-insensitive exact author name
    pub author_name_iexact: Option<String>,
    /// Fragment matched against title OR author name
    pub search: Option<String>,
    /// Result ordering
    pub order: BookOrder,
}

/// Whitelisted ordering fields for the book listing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BookOrderField {
    #[default]
    Id,
    Title,
    PublicationYear,
    AuthorName,
}

impl BookOrderField {
    fn sql(self) -> &'static str {
        match self {
            Self::Id => "b.id",
            Self::Title => "b.title",
            Self::PublicationYear => "b.publication_year",
            Self::AuthorName => "a.name",
        }
    }
}

/// Ordering directive, parsed from an `ordering` query parameter.
///
/// A leading `-` flips the direction (`-publication_year` = newest
/// first). Unknown fields are rejected rather than silently ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BookOrder {
    pub field: BookOrderField,
    pub descending: bool,
}

impl FromStr for BookOrder {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (descending, name) = match s.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, s),
        };

        let field = match name {
            "id" => BookOrderField::Id,
            "title" => BookOrderField::Title,
            "publication_year" => BookOrderField::PublicationYear,
            "author_name" => BookOrderField::AuthorName,
            other => return Err(format!("Cannot order by '{}'", other)),
        };

        Ok(Self { field, descending })
    }
}

impl BookOrder {
    fn sql(self) -> String {
        let direction = if self.descending { "DESC" } else { "ASC" };
        // Secondary id sort keeps pagination stable for equal keys
        format!("{} {}, b.id ASC", self.field.sql(), direction)
    }
}

/// Book repository trait
#[async_trait]
pub trait BookRepository: Send + Sync {
    /// Create a new book
    async fn create(&self, book: &Book) -> Result<Book>;

    /// Get book by ID
    async fn get_by_id(&self, id: i64) -> Result<Option<Book>>;

    /// List books matching a filter
    async fn list(&self, query: &BookQuery) -> Result<Vec<Book>>;

    /// List all books of one author, oldest first
    async fn list_by_author(&self, author_id: i64) -> Result<Vec<Book>>;

    /// Update a book
    async fn update(&self, book: &Book) -> Result<Book>;

    /// Delete a book
    async fn delete(&self, id: i64) -> Result<()>;
}

/// SQLx-based book repository implementation
pub struct SqlxBookRepository {
    pool: DynDatabasePool,
}

impl SqlxBookRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn BookRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl BookRepository for SqlxBookRepository {
    async fn create(&self, book: &Book) -> Result<Book> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => create_sqlite(self.pool.as_sqlite().unwrap(), book).await,
            DatabaseDriver::Mysql => create_mysql(self.pool.as_mysql().unwrap(), book).await,
        }
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<Book>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => get_by_id_sqlite(self.pool.as_sqlite().unwrap(), id).await,
            DatabaseDriver::Mysql => get_by_id_mysql(self.pool.as_mysql().unwrap(), id).await,
        }
    }

    async fn list(&self, query: &BookQuery) -> Result<Vec<Book>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => list_sqlite(self.pool.as_sqlite().unwrap(), query).await,
            DatabaseDriver::Mysql => list_mysql(self.pool.as_mysql().unwrap(), query).await,
        }
    }

    async fn list_by_author(&self, author_id: i64) -> Result<Vec<Book>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                list_by_author_sqlite(self.pool.as_sqlite().unwrap(), author_id).await
            }
            DatabaseDriver::Mysql => {
                list_by_author_mysql(self.pool.as_mysql().unwrap(), author_id).await
            }
        }
    }

    async fn update(&self, book: &Book) -> Result<Book> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => update_sqlite(self.pool.as_sqlite().unwrap(), book).await,
            DatabaseDriver::Mysql => update_mysql(self.pool.as_mysql().unwrap(), book).await,
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
// Filter SQL assembly (shared between drivers; both use `?` placeholders)
// ============================================================================

/// A bind value for the dynamically assembled filter query
enum FilterBind {
    Text(String),
    Int(i64),
}

fn build_list_sql(query: &BookQuery) -> (String, Vec<FilterBind>) {
    let mut conditions: Vec<&'static str> = Vec::new();
    let mut binds: Vec<FilterBind> = Vec::new();

    if let Some(title) = &query.title {
        conditions.push("LOWER(b.title) = LOWER(?)");
        binds.push(FilterBind::Text(title.clone()));
    }
    if let Some(fragment) = &query.title_icontains {
        conditions.push("b.title LIKE ?");
        binds.push(FilterBind::Text(format!("%{}%", fragment)));
    }
    if let Some(year) = query.publication_year {
        conditions.push("b.publication_year = ?");
        binds.push(FilterBind::Int(year as i64));
    }
    if let Some(year) = query.publication_year_gte {
        conditions.push("b.publication_year >= ?");
        binds.push(FilterBind::Int(year as i64));
    }
    if let Some(year) = query.publication_year_lte {
        conditions.push("b.publication_year <= ?");
        binds.push(FilterBind::Int(year as i64));
    }
    if let Some(author_id) = query.author {
        conditions.push("b.author_id = ?");
        binds.push(FilterBind::Int(author_id));
    }
    if let Some(fragment) = &query.author_name {
        conditions.push("a.name LIKE ?");
        binds.push(FilterBind::Text(format!("%{}%", fragment)));
    }
    if let Some(name) = &query.author_name_iexact {
        conditions.push("LOWER(a.name) = LOWER(?)");
        binds.push(FilterBind::Text(name.clone()));
    }
    if let Some(term) = &query.search {
        conditions.push("(b.title LIKE ? OR a.name LIKE ?)");
        let pattern = format!("%{}%", term);
        binds.push(FilterBind::Text(pattern.clone()));
        binds.push(FilterBind::Text(pattern));
    }

    let mut sql = String::from(
        "SELECT b.id, b.title, b.publication_year, b.author_id, b.created_at, b.updated_at \
         FROM books b JOIN authors a ON a.id = b.author_id",
    );
    if !conditions.is_empty() {
        sql.push_str(" WHERE ");
        sql.push_str(&conditions.join(" AND "));
    }
    sql.push_str(" ORDER BY ");
    sql.push_str(&query.order.sql());

    (sql, binds)
}

// ============================================================================
// SQLite implementations
// ============================================================================

async fn create_sqlite(pool: &SqlitePool, book: &Book) -> Result<Book> {
    let now = Utc::now();

    let result = sqlx::query(
        r#"
        INSERT INTO books (title, publication_year, author_id, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?)
        "#,
    )
    .bind(&book.title)
    .bind(book.publication_year)
    .bind(book.author)
    .bind(now)
    .bind(now)
    .execute(pool)
    .await
    .context("Failed to create book")?;

    Ok(Book {
        id: result.last_insert_rowid(),
        title: book.title.clone(),
        publication_year: book.publication_year,
        author: book.author,
        created_at: now,
        updated_at: now,
    })
}

async fn get_by_id_sqlite(pool: &SqlitePool, id: i64) -> Result<Option<Book>> {
    let row = sqlx::query(
        r#"
        SELECT id, title, publication_year, author_id, created_at, updated_at
        FROM books
        WHERE id = ?
        "#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await
    .context("Failed to get book by ID")?;

    Ok(row.map(|row| row_to_book_sqlite(&row)))
}

async fn list_sqlite(pool: &SqlitePool, query: &BookQuery) -> Result<Vec<Book>> {
    let (sql, binds) = build_list_sql(query);

    let mut q = sqlx::query(&sql);
    for bind in &binds {
        q = match bind {
            FilterBind::Text(s) => q.bind(s),
            FilterBind::Int(i) => q.bind(i),
        };
    }

    let rows = q.fetch_all(pool).await.context("Failed to list books")?;

    Ok(rows.iter().map(row_to_book_sqlite).collect())
}

async fn list_by_author_sqlite(pool: &SqlitePool, author_id: i64) -> Result<Vec<Book>> {
    let rows = sqlx::query(
        r#"
        SELECT id, title, publication_year, author_id, created_at, updated_at
        FROM books
        WHERE author_id = ?
        ORDER BY id
        "#,
    )
    .bind(author_id)
    .fetch_all(pool)
    .await
    .context("Failed to list books by author")?;

    Ok(rows.iter().map(row_to_book_sqlite).collect())
}

async fn update_sqlite(pool: &SqlitePool, book: &Book) -> Result<Book> {
    let now = Utc::now();

    sqlx::query(
        r#"
        UPDATE books
        SET title = ?, publication_year = ?, author_id = ?, updated_at = ?
        WHERE id = ?
        "#,
    )
    .bind(&book.title)
    .bind(book.publication_year)
    .bind(book.author)
    .bind(now)
    .bind(book.id)
    .execute(pool)
    .await
    .context("Failed to update book")?;

    get_by_id_sqlite(pool, book.id)
        .await?
        .ok_or_else(|| anyhow::anyhow!("Book not found after update"))
}

async fn delete_sqlite(pool: &SqlitePool, id: i64) -> Result<()> {
    sqlx::query("DELETE FROM books WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await
        .context("Failed to delete book")?;

    Ok(())
}

fn row_to_book_sqlite(row: &sqlx::sqlite::SqliteRow) -> Book {
    Book {
        id: row.get("id"),
        title: row.get("title"),
        publication_year: row.get("publication_year"),
        author: row.get("author_id"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

// ============================================================================
// MySQL implementations
// ============================================================================

async fn create_mysql(pool: &MySqlPool, book: &Book) -> Result<Book> {
    let now = Utc::now();

    let result = sqlx::query(
        r#"
        INSERT INTO books (title, publication_year, author_id, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?)
        "#,
    )
    .bind(&book.title)
    .bind(book.publication_year)
    .bind(book.author)
    .bind(now)
    .bind(now)
    .execute(pool)
    .await
    .context("Failed to create book")?;

    Ok(Book {
        id: result.last_insert_id() as i64,
        title: book.title.clone(),
        publication_year: book.publication_year,
        author: book.author,
        created_at: now,
        updated_at: now,
    })
}

async fn get_by_id_mysql(pool: &MySqlPool, id: i64) -> Result<Option<Book>> {
    let row = sqlx::query(
        r#"
        SELECT id, title, publication_year, author_id, created_at, updated_at
        FROM books
        WHERE id = ?
        "#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await
    .context("Failed to get book by ID")?;

    Ok(row.map(|row| row_to_book_mysql(&row)))
}

async fn list_mysql(pool: &MySqlPool, query: &BookQuery) -> Result<Vec<Book>> {
    let (sql, binds) = build_list_sql(query);

    let mut q = sqlx::query(&sql);
    for bind in &binds {
        q = match bind {
            FilterBind::Text(s) => q.bind(s),
            FilterBind::Int(i) => q.bind(i),
        };
    }

    let rows = q.fetch_all(pool).await.context("Failed to list books")?;

    Ok(rows.iter().map(row_to_book_mysql).collect())
}

async fn list_by_author_mysql(pool: &MySqlPool, author_id: i64) -> Result<Vec<Book>> {
    let rows = sqlx::query(
        r#"
        SELECT id, title, publication_year, author_id, created_at, updated_at
        FROM books
        WHERE author_id = ?
        ORDER BY id
        "#,
    )
    .bind(author_id)
    .fetch_all(pool)
    .await
    .context("Failed to list books by author")?;

    Ok(rows.iter().map(row_to_book_mysql).collect())
}

async fn update_mysql(pool: &MySqlPool, book: &Book) -> Result<Book> {
    let now = Utc::now();

    sqlx::query(
        r#"
        UPDATE books
        SET title = ?, publication_year = ?, author_id = ?, updated_at = ?
        WHERE id = ?
        "#,
    )
    .bind(&book.title)
    .bind(book.publication_year)
    .bind(book.author)
    .bind(now)
    .bind(book.id)
    .execute(pool)
    .await
    .context("Failed to update book")?;

    get_by_id_mysql(pool, book.id)
        .await?
        .ok_or_else(|| anyhow::anyhow!("Book not found after update"))
}

async fn delete_mysql(pool: &MySqlPool, id: i64) -> Result<()> {
    sqlx::query("DELETE FROM books WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await
        .context("Failed to delete book")?;

    Ok(())
}

fn row_to_book_mysql(row: &sqlx::mysql::MySqlRow) -> Book {
    Book {
        id: row.get("id"),
        title: row.get("title"),
        publication_year: row.get("publication_year"),
        author: row.get("author_id"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::{AuthorRepository, SqlxAuthorRepository};
    use crate::db::{create_test_pool, migrations};
    use crate::models::Author;

    async fn setup() -> (SqlxAuthorRepository, SqlxBookRepository) {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");
        (
            SqlxAuthorRepository::new(pool.clone()),
            SqlxBookRepository::new(pool),
        )
    }

    async fn seed_author(authors: &SqlxAuthorRepository, name: &str) -> Author {
        authors
            .create(&Author::new(name.to_string()))
            .await
            .expect("Failed to create author")
    }

    async fn seed_book(
        books: &SqlxBookRepository,
        title: &str,
        year: i32,
        author_id: i64,
    ) -> Book {
        books
            .create(&Book::new(title.to_string(), year, author_id))
            .await
            .expect("Failed to create book")
    }

    #[tokio::test]
    async fn test_create_and_get_book() {
        let (authors, books) = setup().await;
        let rowling = seed_author(&authors, "J.K. Rowling").await;

        let created = seed_book(&books, "HP1", 1997, rowling.id).await;
        assert!(created.id > 0);

        let found = books
            .get_by_id(created.id)
            .await
            .expect("Failed to get book")
            .expect("Book not found");
        assert_eq!(found.title, "HP1");
        assert_eq!(found.publication_year, 1997);
        assert_eq!(found.author, rowling.id);
    }

    #[tokio::test]
    async fn test_get_book_not_found() {
        let (_authors, books) = setup().await;
        assert!(books.get_by_id(999).await.expect("query").is_none());
    }

    #[tokio::test]
    async fn test_list_unfiltered_ordered_by_id() {
        let (authors, books) = setup().await;
        let a = seed_author(&authors, "A").await;
        seed_book(&books, "Third", 2003, a.id).await;
        seed_book(&books, "First", 2001, a.id).await;

        let all = books.list(&BookQuery::default()).await.expect("list");
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].title, "Third"); // insertion order == id order
    }

    #[tokio::test]
    async fn test_filter_title_iexact() {
        let (authors, books) = setup().await;
        let a = seed_author(&authors, "Orwell").await;
        seed_book(&books, "Animal Farm", 1945, a.id).await;
        seed_book(&books, "1984", 1949, a.id).await;

        let query = BookQuery {
            title: Some("animal farm".to_string()),
            ..Default::default()
        };
        let found = books.list(&query).await.expect("list");
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].title, "Animal Farm");
    }

    #[tokio::test]
    async fn test_filter_title_icontains() {
        let (authors, books) = setup().await;
        let a = seed_author(&authors, "Orwell").await;
        seed_book(&books, "Animal Farm", 1945, a.id).await;
        seed_book(&books, "1984", 1949, a.id).await;

        let query = BookQuery {
            title_icontains: Some("farm".to_string()),
            ..Default::default()
        };
        let found = books.list(&query).await.expect("list");
        assert_eq!(found.len(), 1);
    }

    #[tokio::test]
    async fn test_filter_publication_year_range() {
        let (authors, books) = setup().await;
        let a = seed_author(&authors, "Prolific").await;
        for (title, year) in [("Early", 1990), ("Middle", 2000), ("Late", 2010)] {
            seed_book(&books, title, year, a.id).await;
        }

        let query = BookQuery {
            publication_year_gte: Some(1995),
            publication_year_lte: Some(2005),
            ..Default::default()
        };
        let found = books.list(&query).await.expect("list");
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].title, "Middle");

        let exact = BookQuery {
            publication_year: Some(2010),
            ..Default::default()
        };
        let found = books.list(&exact).await.expect("list");
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].title, "Late");
    }

    #[tokio::test]
    async fn test_filter_by_author_id_and_name() {
        let (authors, books) = setup().await;
        let rowling = seed_author(&authors, "J.K. Rowling").await;
        let orwell = seed_author(&authors, "George Orwell").await;
        seed_book(&books, "HP1", 1997, rowling.id).await;
        seed_book(&books, "1984", 1949, orwell.id).await;

        let by_id = BookQuery {
            author: Some(rowling.id),
            ..Default::default()
        };
        let found = books.list(&by_id).await.expect("list");
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].title, "HP1");

        let by_name = BookQuery {
            author_name: Some("orwell".to_string()),
            ..Default::default()
        };
        let found = books.list(&by_name).await.expect("list");
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].title, "1984");
    }

    #[tokio::test]
    async fn test_search_title_or_author_name() {
        let (authors, books) = setup().await;
        let rowling = seed_author(&authors, "J.K. Rowling").await;
        let orwell = seed_author(&authors, "George Orwell").await;
        seed_book(&books, "HP1", 1997, rowling.id).await;
        seed_book(&books, "1984", 1949, orwell.id).await;
        seed_book(&books, "Rowling: A Biography", 2005, orwell.id).await;

        let query = BookQuery {
            search: Some("Rowling".to_string()),
            ..Default::default()
        };
        let found = books.list(&query).await.expect("list");
        // Matches the biography by title AND HP1 by author name
        assert_eq!(found.len(), 2);
    }

    #[tokio::test]
    async fn test_ordering() {
        let (authors, books) = setup().await;
        let zeta = seed_author(&authors, "Zeta").await;
        let alpha = seed_author(&authors, "Alpha").await;
        seed_book(&books, "B-Book", 2005, zeta.id).await;
        seed_book(&books, "A-Book", 2010, alpha.id).await;

        let by_title = BookQuery {
            order: "title".parse().expect("ordering"),
            ..Default::default()
        };
        let found = books.list(&by_title).await.expect("list");
        assert_eq!(found[0].title, "A-Book");

        let by_year_desc = BookQuery {
            order: "-publication_year".parse().expect("ordering"),
            ..Default::default()
        };
        let found = books.list(&by_year_desc).await.expect("list");
        assert_eq!(found[0].publication_year, 2010);

        let by_author_name = BookQuery {
            order: "author_name".parse().expect("ordering"),
            ..Default::default()
        };
        let found = books.list(&by_author_name).await.expect("list");
        assert_eq!(found[0].title, "A-Book"); // Alpha before Zeta
    }

    #[tokio::test]
    async fn test_ordering_rejects_unknown_field() {
        assert!("created_at; DROP TABLE books".parse::<BookOrder>().is_err());
        assert!("content".parse::<BookOrder>().is_err());
    }

    #[tokio::test]
    async fn test_update_book() {
        let (authors, books) = setup().await;
        let a = seed_author(&authors, "A").await;
        let b = seed_author(&authors, "B").await;
        let mut book = seed_book(&books, "Old Title", 2000, a.id).await;

        book.title = "New Title".to_string();
        book.author = b.id;
        let updated = books.update(&book).await.expect("update");

        assert_eq!(updated.title, "New Title");
        assert_eq!(updated.author, b.id);
        assert!(updated.updated_at >= book.created_at);
    }

    #[tokio::test]
    async fn test_delete_book() {
        let (authors, books) = setup().await;
        let a = seed_author(&authors, "A").await;
        let book = seed_book(&books, "Gone", 2000, a.id).await;

        books.delete(book.id).await.expect("delete");
        assert!(books.get_by_id(book.id).await.expect("get").is_none());
    }

    #[tokio::test]
    async fn test_author_delete_cascades_books() {
        let (authors, books) = setup().await;
        let a = seed_author(&authors, "Doomed").await;
        seed_book(&books, "One", 2000, a.id).await;
        seed_book(&books, "Two", 2001, a.id).await;

        authors.delete(a.id).await.expect("delete author");

        let remaining = books.list(&BookQuery::default()).await.expect("list");
        assert!(remaining.is_empty());
    }

    #[tokio::test]
    async fn test_create_book_with_missing_author_fails() {
        let (_authors, books) = setup().await;

        let result = books.create(&Book::new("Orphan".to_string(), 2000, 42)).await;
        assert!(result.is_err(), "FK violation expected");
    }
}
