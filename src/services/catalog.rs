//! Catalog service
//!
//! Business logic for the public book/author catalog. Reads are open;
//! writes require authentication but carry no ownership rule: any
//! authenticated user may edit any book or author.

use crate::db::repositories::{AuthorRepository, BookQuery, BookRepository};
use crate::models::{
    Author, Book, CreateAuthorInput, CreateBookInput, UpdateAuthorInput, UpdateBookInput,
};
use anyhow::Context;
use std::sync::Arc;

/// Minimum length for book titles and author names
const MIN_NAME_LENGTH: usize = 3;

/// Earliest accepted publication year
const MIN_PUBLICATION_YEAR: i32 = 1900;

/// Error types for catalog operations
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    /// Invalid input; `field` keys the error in the response body
    #[error("{message}")]
    Validation { field: &'static str, message: String },

    /// Referenced entity does not exist
    #[error("{0} not found")]
    NotFound(&'static str),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

fn validation(field: &'static str, message: impl Into<String>) -> CatalogError {
    CatalogError::Validation {
        field,
        message: message.into(),
    }
}

/// Catalog service for authors and books
pub struct CatalogService {
    author_repo: Arc<dyn AuthorRepository>,
    book_repo: Arc<dyn BookRepository>,
}

impl CatalogService {
    pub fn new(author_repo: Arc<dyn AuthorRepository>, book_repo: Arc<dyn BookRepository>) -> Self {
        Self {
            author_repo,
            book_repo,
        }
    }

    // ========================================================================
    // Authors
    // ========================================================================

    /// Create an author
    pub async fn create_author(&self, input: CreateAuthorInput) -> Result<Author, CatalogError> {
        let name = validate_name(input.name)?;

        Ok(self
            .author_repo
            .create(&Author::new(name))
            .await
            .context("Failed to create author")?)
    }

    /// Get an author by id
    pub async fn get_author(&self, id: i64) -> Result<Option<Author>, CatalogError> {
        Ok(self
            .author_repo
            .get_by_id(id)
            .await
            .context("Failed to get author")?)
    }

    /// Get an author together with all their books (nested detail view)
    pub async fn get_author_with_books(
        &self,
        id: i64,
    ) -> Result<Option<(Author, Vec<Book>)>, CatalogError> {
        let author = match self
            .author_repo
            .get_by_id(id)
            .await
            .context("Failed to get author")?
        {
            Some(author) => author,
            None => return Ok(None),
        };

        let books = self
            .book_repo
            .list_by_author(id)
            .await
            .context("Failed to list author books")?;

        Ok(Some((author, books)))
    }

    /// List authors, optionally filtered by a name fragment
    pub async fn list_authors(
        &self,
        name_contains: Option<&str>,
    ) -> Result<Vec<Author>, CatalogError> {
        Ok(self
            .author_repo
            .list(name_contains)
            .await
            .context("Failed to list authors")?)
    }

    /// Update an author
    pub async fn update_author(
        &self,
        id: i64,
        input: UpdateAuthorInput,
    ) -> Result<Author, CatalogError> {
        let mut author = self
            .author_repo
            .get_by_id(id)
            .await
            .context("Failed to get author")?
            .ok_or(CatalogError::NotFound("Author"))?;

        if let Some(name) = input.name {
            author.name = validate_name(name)?;
        }

        Ok(self
            .author_repo
            .update(&author)
            .await
            .context("Failed to update author")?)
    }

    /// Delete an author; their books cascade away with them
    pub async fn delete_author(&self, id: i64) -> Result<(), CatalogError> {
        if self
            .author_repo
            .get_by_id(id)
            .await
            .context("Failed to get author")?
            .is_none()
        {
            return Err(CatalogError::NotFound("Author"));
        }

        self.author_repo
            .delete(id)
            .await
            .context("Failed to delete author")?;
        Ok(())
    }

    // ========================================================================
    // Books
    // ========================================================================

    /// Create a book
    pub async fn create_book(&self, input: CreateBookInput) -> Result<Book, CatalogError> {
        let title = validate_title(input.title)?;
        validate_year(input.publication_year)?;
        self.require_author(input.author).await?;

        Ok(self
            .book_repo
            .create(&Book::new(title, input.publication_year, input.author))
            .await
            .context("Failed to create book")?)
    }

    /// Get a book by id
    pub async fn get_book(&self, id: i64) -> Result<Option<Book>, CatalogError> {
        Ok(self
            .book_repo
            .get_by_id(id)
            .await
            .context("Failed to get book")?)
    }

    /// List books matching the filter set
    pub async fn list_books(&self, query: &BookQuery) -> Result<Vec<Book>, CatalogError> {
        Ok(self
            .book_repo
            .list(query)
            .await
            .context("Failed to list books")?)
    }

    /// Update a book (partial; absent fields keep their value)
    pub async fn update_book(
        &self,
        id: i64,
        input: UpdateBookInput,
    ) -> Result<Book, CatalogError> {
        let mut book = self
            .book_repo
            .get_by_id(id)
            .await
            .context("Failed to get book")?
            .ok_or(CatalogError::NotFound("Book"))?;

        if let Some(title) = input.title {
            book.title = validate_title(title)?;
        }
        if let Some(year) = input.publication_year {
            validate_year(year)?;
            book.publication_year = year;
        }
        if let Some(author_id) = input.author {
            self.require_author(author_id).await?;
            book.author = author_id;
        }

        Ok(self
            .book_repo
            .update(&book)
            .await
            .context("Failed to update book")?)
    }

    /// Delete a book
    pub async fn delete_book(&self, id: i64) -> Result<(), CatalogError> {
        if self
            .book_repo
            .get_by_id(id)
            .await
            .context("Failed to get book")?
            .is_none()
        {
            return Err(CatalogError::NotFound("Book"));
        }

        self.book_repo
            .delete(id)
            .await
            .context("Failed to delete book")?;
        Ok(())
    }

    async fn require_author(&self, author_id: i64) -> Result<(), CatalogError> {
        if self
            .author_repo
            .get_by_id(author_id)
            .await
            .context("Failed to check author")?
            .is_none()
        {
            return Err(validation("author", "Author does not exist"));
        }
        Ok(())
    }
}

fn validate_title(title: String) -> Result<String, CatalogError> {
    let title = title.trim().to_string();
    if title.is_empty() {
        return Err(validation("title", "Title is required"));
    }
    if title.len() < MIN_NAME_LENGTH {
        return Err(validation(
            "title",
            format!("Title must be at least {} characters long", MIN_NAME_LENGTH),
        ));
    }
    Ok(title)
}

fn validate_name(name: String) -> Result<String, CatalogError> {
    let name = name.trim().to_string();
    if name.len() < MIN_NAME_LENGTH {
        return Err(validation(
            "name",
            format!("Name must be at least {} characters long", MIN_NAME_LENGTH),
        ));
    }
    Ok(name)
}

fn validate_year(year: i32) -> Result<(), CatalogError> {
    if year < MIN_PUBLICATION_YEAR {
        return Err(validation(
            "publication_year",
            format!("Publication year must be {} or later", MIN_PUBLICATION_YEAR),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::{SqlxAuthorRepository, SqlxBookRepository};
    use crate::db::{create_test_pool, migrations};

    async fn setup_service() -> CatalogService {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");

        CatalogService::new(
            SqlxAuthorRepository::boxed(pool.clone()),
            SqlxBookRepository::boxed(pool),
        )
    }

    fn author_input(name: &str) -> CreateAuthorInput {
        CreateAuthorInput {
            name: name.to_string(),
        }
    }

    #[tokio::test]
    async fn test_create_author_and_nested_books() {
        let service = setup_service().await;

        let author = service
            .create_author(author_input("J.K. Rowling"))
            .await
            .expect("Failed to create author");

        let book = service
            .create_book(CreateBookInput {
                title: "HP1".to_string(),
                publication_year: 1997,
                author: author.id,
            })
            .await
            .expect("Failed to create book");

        let (found, books) = service
            .get_author_with_books(author.id)
            .await
            .expect("query")
            .expect("Author should exist");

        assert_eq!(found.name, "J.K. Rowling");
        assert_eq!(books.len(), 1);
        assert_eq!(books[0].id, book.id);
        assert_eq!(books[0].author, author.id);
    }

    #[tokio::test]
    async fn test_create_author_name_too_short() {
        let service = setup_service().await;

        let result = service.create_author(author_input("Al")).await;
        assert!(matches!(
            result,
            Err(CatalogError::Validation { field: "name", .. })
        ));
    }

    #[tokio::test]
    async fn test_create_book_validations() {
        let service = setup_service().await;
        let author = service
            .create_author(author_input("Author Name"))
            .await
            .expect("Failed to create author");

        // Title too short
        let result = service
            .create_book(CreateBookInput {
                title: "ab".to_string(),
                publication_year: 2000,
                author: author.id,
            })
            .await;
        assert!(matches!(
            result,
            Err(CatalogError::Validation { field: "title", .. })
        ));

        // Year before the floor
        let result = service
            .create_book(CreateBookInput {
                title: "Fine Title".to_string(),
                publication_year: 1850,
                author: author.id,
            })
            .await;
        assert!(matches!(
            result,
            Err(CatalogError::Validation {
                field: "publication_year",
                ..
            })
        ));

        // Unknown author
        let result = service
            .create_book(CreateBookInput {
                title: "Fine Title".to_string(),
                publication_year: 2000,
                author: 999,
            })
            .await;
        assert!(matches!(
            result,
            Err(CatalogError::Validation { field: "author", .. })
        ));
    }

    #[tokio::test]
    async fn test_update_book_partial() {
        let service = setup_service().await;
        let author = service
            .create_author(author_input("Author Name"))
            .await
            .expect("create author");
        let book = service
            .create_book(CreateBookInput {
                title: "Original".to_string(),
                publication_year: 2000,
                author: author.id,
            })
            .await
            .expect("create book");

        let updated = service
            .update_book(
                book.id,
                UpdateBookInput {
                    title: Some("Renamed".to_string()),
                    publication_year: None,
                    author: None,
                },
            )
            .await
            .expect("update book");

        assert_eq!(updated.title, "Renamed");
        assert_eq!(updated.publication_year, 2000);
        assert_eq!(updated.author, author.id);
    }

    #[tokio::test]
    async fn test_update_missing_book_not_found() {
        let service = setup_service().await;

        let result = service.update_book(404, UpdateBookInput::default()).await;
        assert!(matches!(result, Err(CatalogError::NotFound("Book"))));
    }

    #[tokio::test]
    async fn test_delete_book_and_missing_delete() {
        let service = setup_service().await;
        let author = service
            .create_author(author_input("Author Name"))
            .await
            .expect("create author");
        let book = service
            .create_book(CreateBookInput {
                title: "Doomed".to_string(),
                publication_year: 2000,
                author: author.id,
            })
            .await
            .expect("create book");

        service.delete_book(book.id).await.expect("delete book");
        assert!(service.get_book(book.id).await.expect("query").is_none());

        let result = service.delete_book(book.id).await;
        assert!(matches!(result, Err(CatalogError::NotFound("Book"))));
    }

    #[tokio::test]
    async fn test_delete_author_cascades_books() {
        let service = setup_service().await;
        let author = service
            .create_author(author_input("Doomed Author"))
            .await
            .expect("create author");
        let book = service
            .create_book(CreateBookInput {
                title: "Orphaned".to_string(),
                publication_year: 2000,
                author: author.id,
            })
            .await
            .expect("create book");

        service
            .delete_author(author.id)
            .await
            .expect("delete author");

        assert!(service.get_book(book.id).await.expect("query").is_none());
    }

    #[tokio::test]
    async fn test_list_books_filters_delegate() {
        let service = setup_service().await;
        let author = service
            .create_author(author_input("Filter Author"))
            .await
            .expect("create author");
        service
            .create_book(CreateBookInput {
                title: "Alpha".to_string(),
                publication_year: 2001,
                author: author.id,
            })
            .await
            .expect("create");
        service
            .create_book(CreateBookInput {
                title: "Beta".to_string(),
                publication_year: 2002,
                author: author.id,
            })
            .await
            .expect("create");

        let query = BookQuery {
            title_icontains: Some("alp".to_string()),
            ..Default::default()
        };
        let found = service.list_books(&query).await.expect("list");
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].title, "Alpha");
    }

    #[tokio::test]
    async fn test_titles_are_trimmed() {
        let service = setup_service().await;
        let author = service
            .create_author(author_input("Author Name"))
            .await
            .expect("create author");

        let book = service
            .create_book(CreateBookInput {
                title: "  Padded Title  ".to_string(),
                publication_year: 2000,
                author: author.id,
            })
            .await
            .expect("create book");

        assert_eq!(book.title, "Padded Title");
    }
}
