//! PostgreSQL-backed [`BookStore`].

use std::time::Duration;

use async_trait::async_trait;
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Row};
use tracing::warn;

use observer_core::{Book, BookDraft};

use crate::store::{BookStore, StoreError};

/// How many times to retry the initial connection before giving up.
const CONNECT_ATTEMPTS: u32 = 5;

/// Delay between connection attempts.
const CONNECT_BACKOFF: Duration = Duration::from_secs(5);

/// PostgreSQL implementation of [`BookStore`] using a `sqlx` pool.
pub struct PostgresBookStore {
    pool: PgPool,
}

impl PostgresBookStore {
    /// Connect to `url`, retrying on startup, and ensure the books table
    /// exists.
    pub async fn new(url: &str, pool_size: u32) -> Result<Self, StoreError> {
        let mut last_err = None;
        let mut pool = None;
        for attempt in 1..=CONNECT_ATTEMPTS {
            match PgPoolOptions::new()
                .max_connections(pool_size)
                .connect(url)
                .await
            {
                Ok(connected) => {
                    pool = Some(connected);
                    break;
                }
                Err(e) => {
                    warn!(error = %e, attempt, "postgres connection failed, retrying");
                    last_err = Some(e);
                    tokio::time::sleep(CONNECT_BACKOFF).await;
                }
            }
        }
        let pool = pool.ok_or_else(|| {
            StoreError::Connection(
                last_err
                    .map(|e| e.to_string())
                    .unwrap_or_else(|| "no connection attempt made".to_owned()),
            )
        })?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS books (
                id BIGSERIAL PRIMARY KEY,
                title TEXT NOT NULL,
                author TEXT NOT NULL,
                price DOUBLE PRECISION NOT NULL,
                description TEXT NOT NULL DEFAULT '',
                author_bio TEXT NOT NULL DEFAULT ''
            )",
        )
        .execute(&pool)
        .await
        .map_err(|e| StoreError::Backend(e.to_string()))?;

        Ok(Self { pool })
    }
}

#[async_trait]
impl BookStore for PostgresBookStore {
    async fn get(&self, id: i64) -> Result<Option<Book>, StoreError> {
        let row = sqlx::query(
            "SELECT id, title, author, price, description, author_bio
             FROM books WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| StoreError::Backend(e.to_string()))?;

        Ok(row.map(|row| Book {
            id: row.get("id"),
            details: BookDraft {
                title: row.get("title"),
                author: row.get("author"),
                price: row.get("price"),
                description: row.get("description"),
                author_bio: row.get("author_bio"),
            },
        }))
    }

    async fn insert(&self, draft: BookDraft) -> Result<i64, StoreError> {
        let row = sqlx::query(
            "INSERT INTO books (title, author, price, description, author_bio)
             VALUES ($1, $2, $3, $4, $5) RETURNING id",
        )
        .bind(&draft.title)
        .bind(&draft.author)
        .bind(draft.price)
        .bind(&draft.description)
        .bind(&draft.author_bio)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| StoreError::Backend(e.to_string()))?;

        Ok(row.get("id"))
    }
}
