//! Books repository for PostgreSQL

use async_trait::async_trait;
use sqlx::{Pool, Postgres};

use crate::{error::AppResult, models::BookEntity};

use super::BookStore;

#[derive(Clone)]
pub struct PgBookStore {
    pool: Pool<Postgres>,
}

impl PgBookStore {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl BookStore for PgBookStore {
    async fn find_by_isbn(&self, isbn: &str) -> AppResult<Option<BookEntity>> {
        let row = sqlx::query_as::<_, BookEntity>(
            r#"
            SELECT isbn, title, author, publication_year, available_copies
            FROM books
            WHERE isbn = $1
            "#,
        )
        .bind(isbn)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }

    async fn find_all_by_author(&self, author: Option<String>) -> AppResult<Vec<BookEntity>> {
        // A NULL parameter matches every row
        let rows = sqlx::query_as::<_, BookEntity>(
            r#"
            SELECT isbn, title, author, publication_year, available_copies
            FROM books
            WHERE ($1::TEXT IS NULL OR author = $1)
            ORDER BY isbn
            "#,
        )
        .bind(author)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    async fn save(&self, entity: BookEntity) -> AppResult<BookEntity> {
        let saved = sqlx::query_as::<_, BookEntity>(
            r#"
            INSERT INTO books (isbn, title, author, publication_year, available_copies)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (isbn) DO UPDATE SET
                title = EXCLUDED.title,
                author = EXCLUDED.author,
                publication_year = EXCLUDED.publication_year,
                available_copies = EXCLUDED.available_copies
            RETURNING isbn, title, author, publication_year, available_copies
            "#,
        )
        .bind(&entity.isbn)
        .bind(&entity.title)
        .bind(&entity.author)
        .bind(entity.publication_year)
        .bind(entity.available_copies)
        .fetch_one(&self.pool)
        .await?;

        Ok(saved)
    }

    async fn delete(&self, entity: &BookEntity) -> AppResult<()> {
        sqlx::query("DELETE FROM books WHERE isbn = $1")
            .bind(&entity.isbn)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn ping(&self) -> AppResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
