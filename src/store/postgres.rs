//! Postgres store backed by a sqlx connection pool.

use anyhow::Context;
use async_trait::async_trait;
use sqlx::{PgPool, Row, postgres::PgPoolOptions, postgres::PgRow};
use std::time::Duration;
use tracing::{Instrument, info_span};
use uuid::Uuid;

use super::{SessionRecord, Store, StoreError, StoreResult, User};

const SCHEMA_SQL: &str = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/sql/schema.sql"));

#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connect to the database and make sure the schema exists.
    ///
    /// # Errors
    /// Returns an error if the connection fails or a schema statement is rejected.
    pub async fn connect(dsn: &str) -> anyhow::Result<Self> {
        let pool = PgPoolOptions::new()
            .min_connections(1)
            .max_connections(5)
            .max_lifetime(Duration::from_secs(60 * 2))
            .test_before_acquire(true)
            .connect(dsn)
            .await
            .context("Failed to connect to database")?;

        let store = Self::new(pool);
        store.apply_schema().await?;
        Ok(store)
    }

    async fn apply_schema(&self) -> anyhow::Result<()> {
        for (index, statement) in split_sql_statements(SCHEMA_SQL).iter().enumerate() {
            sqlx::query(statement)
                .execute(&self.pool)
                .await
                .with_context(|| format!("failed to execute schema statement {}", index + 1))?;
        }
        Ok(())
    }
}

fn split_sql_statements(sql: &str) -> Vec<String> {
    let mut statements = Vec::new();
    let mut current = String::new();

    for line in sql.lines() {
        let trimmed = line.trim();
        if trimmed.starts_with("--") {
            continue;
        }
        current.push_str(line);
        current.push('\n');

        if trimmed.ends_with(';') {
            let statement = current.trim();
            if !statement.is_empty() {
                statements.push(statement.to_string());
            }
            current.clear();
        }
    }

    let leftover = current.trim();
    if !leftover.is_empty() {
        statements.push(leftover.to_string());
    }

    statements
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db_err) => db_err.code().is_some_and(|code| code.as_ref() == "23505"),
        _ => false,
    }
}

fn query_span(operation: &'static str, statement: &'static str) -> tracing::Span {
    info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = operation,
        db.statement = statement
    )
}

fn user_from_row(row: &PgRow) -> User {
    User {
        id: row.get("id"),
        email: row.get("email"),
        password_hash: row.get("password_hash"),
        reset_token_hash: row.get("reset_token_hash"),
        created_at: row.get("created_at"),
    }
}

#[async_trait]
impl Store for PgStore {
    fn backend(&self) -> &'static str {
        "postgres"
    }

    async fn ping(&self) -> StoreResult<()> {
        let span = info_span!("db.ping", db.system = "postgresql", db.operation = "PING");
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .instrument(span)
            .await
            .context("failed to ping database")?;
        Ok(())
    }

    async fn create_user(&self, email: &str, password_hash: &str) -> StoreResult<User> {
        let query = r"
            INSERT INTO users (id, email, password_hash)
            VALUES ($1, $2, $3)
            RETURNING id, email, password_hash, reset_token_hash, created_at
        ";
        let result = sqlx::query(query)
            .bind(Uuid::new_v4())
            .bind(email)
            .bind(password_hash)
            .fetch_one(&self.pool)
            .instrument(query_span("INSERT", query))
            .await;

        match result {
            Ok(row) => Ok(user_from_row(&row)),
            Err(err) if is_unique_violation(&err) => Err(StoreError::Conflict),
            Err(err) => Err(anyhow::Error::new(err)
                .context("failed to insert user")
                .into()),
        }
    }

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        let query = r"
            SELECT id, email, password_hash, reset_token_hash, created_at
            FROM users
            WHERE email = $1
        ";
        let row = sqlx::query(query)
            .bind(email)
            .fetch_optional(&self.pool)
            .instrument(query_span("SELECT", query))
            .await
            .context("failed to lookup user by email")?;
        Ok(row.as_ref().map(user_from_row))
    }

    async fn find_user_by_id(&self, id: Uuid) -> StoreResult<Option<User>> {
        let query = r"
            SELECT id, email, password_hash, reset_token_hash, created_at
            FROM users
            WHERE id = $1
        ";
        let row = sqlx::query(query)
            .bind(id)
            .fetch_optional(&self.pool)
            .instrument(query_span("SELECT", query))
            .await
            .context("failed to lookup user by id")?;
        Ok(row.as_ref().map(user_from_row))
    }

    async fn set_reset_token(&self, user_id: Uuid, token_hash: &[u8]) -> StoreResult<()> {
        let query = "UPDATE users SET reset_token_hash = $2 WHERE id = $1";
        let result = sqlx::query(query)
            .bind(user_id)
            .bind(token_hash)
            .execute(&self.pool)
            .instrument(query_span("UPDATE", query))
            .await
            .context("failed to store reset token")?;
        if result.rows_affected() == 0 {
            return Err(anyhow::anyhow!("user {user_id} not found").into());
        }
        Ok(())
    }

    async fn consume_reset_token(
        &self,
        user_id: Uuid,
        token_hash: &[u8],
        password_hash: &str,
    ) -> StoreResult<bool> {
        let query = r"
            UPDATE users
            SET password_hash = $3, reset_token_hash = NULL
            WHERE id = $1 AND reset_token_hash = $2
        ";
        let result = sqlx::query(query)
            .bind(user_id)
            .bind(token_hash)
            .bind(password_hash)
            .execute(&self.pool)
            .instrument(query_span("UPDATE", query))
            .await
            .context("failed to consume reset token")?;
        Ok(result.rows_affected() == 1)
    }

    async fn insert_session(&self, token_hash: &[u8], user_id: Uuid) -> StoreResult<()> {
        let query = "INSERT INTO user_sessions (session_hash, user_id) VALUES ($1, $2)";
        let result = sqlx::query(query)
            .bind(token_hash)
            .bind(user_id)
            .execute(&self.pool)
            .instrument(query_span("INSERT", query))
            .await;

        match result {
            Ok(_) => Ok(()),
            Err(err) if is_unique_violation(&err) => Err(StoreError::Conflict),
            Err(err) => Err(anyhow::Error::new(err)
                .context("failed to insert session")
                .into()),
        }
    }

    async fn lookup_session(&self, token_hash: &[u8]) -> StoreResult<Option<SessionRecord>> {
        let query = r"
            SELECT users.id, users.email, user_sessions.created_at
            FROM user_sessions
            JOIN users ON users.id = user_sessions.user_id
            WHERE user_sessions.session_hash = $1
            LIMIT 1
        ";
        let row = sqlx::query(query)
            .bind(token_hash)
            .fetch_optional(&self.pool)
            .instrument(query_span("SELECT", query))
            .await
            .context("failed to lookup session")?;

        Ok(row.map(|row| SessionRecord {
            user_id: row.get("id"),
            email: row.get("email"),
            created_at: row.get("created_at"),
        }))
    }

    async fn delete_session(&self, token_hash: &[u8]) -> StoreResult<bool> {
        let query = "DELETE FROM user_sessions WHERE session_hash = $1";
        let result = sqlx::query(query)
            .bind(token_hash)
            .execute(&self.pool)
            .instrument(query_span("DELETE", query))
            .await
            .context("failed to delete session")?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_user_sessions(&self, user_id: Uuid) -> StoreResult<u64> {
        let query = "DELETE FROM user_sessions WHERE user_id = $1";
        let result = sqlx::query(query)
            .bind(user_id)
            .execute(&self.pool)
            .instrument(query_span("DELETE", query))
            .await
            .context("failed to delete user sessions")?;
        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_sql_statements_skips_comments() {
        let statements = split_sql_statements(SCHEMA_SQL);
        assert_eq!(statements.len(), 3);
        assert!(statements[0].starts_with("CREATE TABLE IF NOT EXISTS users"));
        assert!(statements.iter().all(|s| s.ends_with(';')));
    }

    #[test]
    fn split_sql_statements_keeps_trailing_statement() {
        let statements = split_sql_statements("SELECT 1;\nSELECT 2");
        assert_eq!(statements, vec!["SELECT 1;".to_string(), "SELECT 2".to_string()]);
    }

    #[test]
    fn is_unique_violation_ignores_other_errors() {
        assert!(!is_unique_violation(&sqlx::Error::RowNotFound));
    }
}
