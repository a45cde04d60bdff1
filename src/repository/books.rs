//! Books repository: sole owner of the `books` table.

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;

use crate::{
    error::{AppError, AppResult},
    models::Book,
};

#[derive(Clone)]
pub struct BooksRepository {
    pool: SqlitePool,
}

impl BooksRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Insert a new book; `created_at` and `updated_at` are assigned here.
    /// A duplicate ISBN trips the unique constraint and surfaces as a
    /// database error.
    pub async fn create(
        &self,
        title: String,
        author: String,
        isbn: String,
        published: DateTime<Utc>,
    ) -> AppResult<Book> {
        let now = Utc::now();
        let result = sqlx::query(
            r#"
            INSERT INTO books (title, author, isbn, published, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&title)
        .bind(&author)
        .bind(&isbn)
        .bind(published)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await?;

        let id = result.last_insert_rowid();
        tracing::debug!("Created book {} ({})", id, isbn);

        Ok(Book {
            id,
            title,
            author,
            isbn,
            published,
            created_at: now,
            updated_at: now,
        })
    }

    /// Fetch a book by id. A missing row is `None`, not an error.
    pub async fn get(&self, id: i64) -> AppResult<Option<Book>> {
        let book = sqlx::query_as::<_, Book>(
            r#"
            SELECT id, title, author, isbn, published, created_at, updated_at
            FROM books
            WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(book)
    }

    /// Rewrite all mutable fields of an existing book and refresh
    /// `updated_at`. `created_at` is never touched. Rejects an ISBN already
    /// held by a different record.
    pub async fn update(
        &self,
        id: i64,
        title: &str,
        author: &str,
        isbn: &str,
        published: DateTime<Utc>,
    ) -> AppResult<()> {
        let others: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM books WHERE isbn = ? AND id != ?")
                .bind(isbn)
                .bind(id)
                .fetch_one(&self.pool)
                .await?;
        if others > 0 {
            return Err(AppError::Internal(format!(
                "a book with ISBN {} already exists",
                isbn
            )));
        }

        let now = Utc::now();
        let result = sqlx::query(
            r#"
            UPDATE books
            SET title = ?, author = ?, isbn = ?, published = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(title)
        .bind(author)
        .bind(isbn)
        .bind(published)
        .bind(now)
        .bind(id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Book not found".to_string()));
        }

        tracing::debug!("Updated book {}", id);
        Ok(())
    }

    /// Delete a book by id; `NotFound` when no row was removed.
    pub async fn delete(&self, id: i64) -> AppResult<()> {
        let result = sqlx::query("DELETE FROM books WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Book not found".to_string()));
        }

        tracing::debug!("Deleted book {}", id);
        Ok(())
    }

    /// Return one page of books (newest first) plus the total row count.
    /// Pagination inputs are trusted; clamping happens in the handlers.
    pub async fn list(&self, page: i64, page_size: i64) -> AppResult<(Vec<Book>, i64)> {
        let offset = (page - 1) * page_size;

        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM books")
            .fetch_one(&self.pool)
            .await?;

        let books = sqlx::query_as::<_, Book>(
            r#"
            SELECT id, title, author, isbn, published, created_at, updated_at
            FROM books
            ORDER BY created_at DESC
            LIMIT ? OFFSET ?
            "#,
        )
        .bind(page_size)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        Ok((books, total))
    }

    /// Return one page of books whose title, author or ISBN contains `query`
    /// as a case-sensitive substring (the pool enables the
    /// `case_sensitive_like` pragma), plus the matching total.
    pub async fn search(
        &self,
        query: &str,
        page: i64,
        page_size: i64,
    ) -> AppResult<(Vec<Book>, i64)> {
        let offset = (page - 1) * page_size;
        let pattern = format!("%{}%", query);

        let total: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM books WHERE title LIKE ? OR author LIKE ? OR isbn LIKE ?",
        )
        .bind(&pattern)
        .bind(&pattern)
        .bind(&pattern)
        .fetch_one(&self.pool)
        .await?;

        let books = sqlx::query_as::<_, Book>(
            r#"
            SELECT id, title, author, isbn, published, created_at, updated_at
            FROM books
            WHERE title LIKE ? OR author LIKE ? OR isbn LIKE ?
            ORDER BY created_at DESC
            LIMIT ? OFFSET ?
            "#,
        )
        .bind(&pattern)
        .bind(&pattern)
        .bind(&pattern)
        .bind(page_size)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        Ok((books, total))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
    use std::str::FromStr;

    // A single connection so every test statement sees the same in-memory
    // database.
    async fn test_repo() -> BooksRepository {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")
            .unwrap()
            .pragma("case_sensitive_like", "true");
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await
            .unwrap();
        sqlx::migrate!("./migrations").run(&pool).await.unwrap();
        BooksRepository::new(pool)
    }

    fn past(hours: i64) -> DateTime<Utc> {
        Utc::now() - Duration::hours(hours)
    }

    #[tokio::test]
    async fn test_create_assigns_id_and_timestamps() {
        let repo = test_repo().await;
        let book = repo
            .create(
                "Dune".into(),
                "Herbert".into(),
                "978-0-441-01359-3".into(),
                past(24),
            )
            .await
            .unwrap();

        assert!(book.id > 0);
        assert_eq!(book.created_at, book.updated_at);

        let fetched = repo.get(book.id).await.unwrap().unwrap();
        assert_eq!(fetched.title, "Dune");
        assert_eq!(fetched.isbn, "978-0-441-01359-3");
    }

    #[tokio::test]
    async fn test_create_rejects_duplicate_isbn() {
        let repo = test_repo().await;
        repo.create("A".into(), "X".into(), "978-0-441-01359-3".into(), past(1))
            .await
            .unwrap();
        let err = repo
            .create("B".into(), "Y".into(), "978-0-441-01359-3".into(), past(1))
            .await;
        assert!(err.is_err());
    }

    #[tokio::test]
    async fn test_get_missing_returns_none() {
        let repo = test_repo().await;
        assert!(repo.get(42).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_update_refreshes_updated_at_only() {
        let repo = test_repo().await;
        let book = repo
            .create("A".into(), "X".into(), "978-0-441-01359-3".into(), past(24))
            .await
            .unwrap();

        repo.update(book.id, "A2", "X", "978-0-441-01359-3", past(24))
            .await
            .unwrap();

        let updated = repo.get(book.id).await.unwrap().unwrap();
        assert_eq!(updated.title, "A2");
        assert_eq!(updated.created_at, book.created_at);
        assert!(updated.updated_at >= book.updated_at);
    }

    #[tokio::test]
    async fn test_update_rejects_isbn_of_other_record() {
        let repo = test_repo().await;
        repo.create("A".into(), "X".into(), "978-0-441-01359-3".into(), past(1))
            .await
            .unwrap();
        let b = repo
            .create("B".into(), "Y".into(), "978-0-451-52493-5".into(), past(1))
            .await
            .unwrap();

        let err = repo
            .update(b.id, "B", "Y", "978-0-441-01359-3", past(1))
            .await;
        assert!(err.is_err());

        // keeping its own ISBN is fine
        repo.update(b.id, "B", "Y", "978-0-451-52493-5", past(1))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_update_and_delete_missing_report_not_found() {
        let repo = test_repo().await;
        assert!(matches!(
            repo.update(99, "T", "A", "978-0-441-01359-3", past(1)).await,
            Err(AppError::NotFound(_))
        ));
        assert!(matches!(repo.delete(99).await, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_delete_then_get_returns_none() {
        let repo = test_repo().await;
        let book = repo
            .create("A".into(), "X".into(), "978-0-441-01359-3".into(), past(1))
            .await
            .unwrap();
        repo.delete(book.id).await.unwrap();
        assert!(repo.get(book.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_list_orders_newest_first() {
        let repo = test_repo().await;
        // Insert with explicit created_at to make the ordering deterministic.
        for (title, isbn, age) in [
            ("Oldest", "978-0-441-01359-3", 3),
            ("Middle", "978-0-451-52493-5", 2),
            ("Newest", "978-0-306-40615-7", 1),
        ] {
            sqlx::query(
                "INSERT INTO books (title, author, isbn, published, created_at, updated_at)
                 VALUES (?, 'X', ?, ?, ?, ?)",
            )
            .bind(title)
            .bind(isbn)
            .bind(past(24))
            .bind(past(age))
            .bind(past(age))
            .execute(&repo.pool)
            .await
            .unwrap();
        }

        let (books, total) = repo.list(1, 10).await.unwrap();
        assert_eq!(total, 3);
        let titles: Vec<_> = books.iter().map(|b| b.title.as_str()).collect();
        assert_eq!(titles, ["Newest", "Middle", "Oldest"]);
    }

    #[tokio::test]
    async fn test_search_matches_substring_case_sensitively() {
        let repo = test_repo().await;
        repo.create(
            "Dune".into(),
            "Frank Herbert".into(),
            "978-0-441-01359-3".into(),
            past(1),
        )
        .await
        .unwrap();
        repo.create(
            "Neuromancer".into(),
            "William Gibson".into(),
            "978-0-451-52493-5".into(),
            past(1),
        )
        .await
        .unwrap();

        let (books, total) = repo.search("Herbert", 1, 10).await.unwrap();
        assert_eq!(total, 1);
        assert_eq!(books[0].title, "Dune");

        // substring match on ISBN
        let (_, total) = repo.search("01359", 1, 10).await.unwrap();
        assert_eq!(total, 1);

        // case-sensitive: lowercase query does not match
        let (_, total) = repo.search("herbert", 1, 10).await.unwrap();
        assert_eq!(total, 0);
    }
}
