use std::path::Path;

use chrono::{DateTime, Utc};
use sqlx::{Row, SqlitePool};
use tracing::info;

use crate::errors::{AppError, Result};
use crate::models::document::{KycDocument, VerificationStatus};
use crate::models::user::{Role, User};

#[derive(Debug)]
pub struct SqliteDatabase {
    pool: SqlitePool,
}

impl SqliteDatabase {
    pub async fn new(database_path: &str) -> Result<Self> {
        if let Some(parent) = Path::new(database_path).parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                AppError::DatabaseError(format!("Failed to create database directory: {}", e))
            })?;
        }
        if !Path::new(database_path).exists() {
            std::fs::File::create(database_path).map_err(|e| {
                AppError::DatabaseError(format!("Failed to create database file: {}", e))
            })?;
        }

        let database_url = format!("sqlite:{}", database_path);
        let pool = SqlitePool::connect(&database_url)
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to connect to database: {}", e)))?;

        let db = Self { pool };
        db.create_tables().await?;
        info!(action = "database_connected", path = %database_path);
        Ok(db)
    }

    /// In-memory database, used by the test suites. A single connection is
    /// enforced because every new `:memory:` connection is a fresh database.
    pub async fn in_memory() -> Result<Self> {
        let pool = sqlx::sqlite::SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to open in-memory db: {}", e)))?;
        let db = Self { pool };
        db.create_tables().await?;
        Ok(db)
    }

    async fn create_tables(&self) -> Result<()> {
        let query = r#"
            CREATE TABLE IF NOT EXISTS users (
                user_id INTEGER PRIMARY KEY AUTOINCREMENT,
                username TEXT UNIQUE NOT NULL,
                role TEXT NOT NULL,
                password_hash TEXT,
                enabled BOOLEAN NOT NULL DEFAULT TRUE,
                created_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS kyc_documents (
                document_id INTEGER PRIMARY KEY AUTOINCREMENT,
                customer_id INTEGER NOT NULL,
                document_name TEXT NOT NULL,
                document_type TEXT NOT NULL,
                content_type TEXT NOT NULL DEFAULT 'application/octet-stream',
                content BLOB NOT NULL,
                status TEXT NOT NULL,
                message TEXT NOT NULL DEFAULT '',
                reviewed_by TEXT,
                uploaded_at TEXT NOT NULL,
                reviewed_at TEXT
            );

            CREATE INDEX IF NOT EXISTS idx_kyc_documents_customer
                ON kyc_documents (customer_id);
            CREATE INDEX IF NOT EXISTS idx_kyc_documents_status
                ON kyc_documents (status);
        "#;

        sqlx::query(query)
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to create tables: {}", e)))?;
        Ok(())
    }

    // ===== users =====

    pub async fn get_user_by_username(&self, username: &str) -> Result<Option<User>> {
        let row = sqlx::query("SELECT * FROM users WHERE username = ?1")
            .bind(username)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to fetch user: {}", e)))?;

        row.map(Self::row_to_user).transpose()
    }

    pub async fn create_user(
        &self,
        username: &str,
        role: Role,
        password_hash: Option<&str>,
    ) -> Result<i64> {
        let result = sqlx::query(
            r#"
            INSERT INTO users (username, role, password_hash, enabled, created_at)
            VALUES (?1, ?2, ?3, TRUE, ?4)
            "#,
        )
        .bind(username)
        .bind(role.as_str())
        .bind(password_hash)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(format!("Failed to create user: {}", e)))?;

        Ok(result.last_insert_rowid())
    }

    // ===== documents =====

    pub async fn insert_document(
        &self,
        customer_id: i64,
        document_name: &str,
        document_type: &str,
        content_type: &str,
        content: &[u8],
        uploaded_at: DateTime<Utc>,
    ) -> Result<i64> {
        let result = sqlx::query(
            r#"
            INSERT INTO kyc_documents
                (customer_id, document_name, document_type, content_type, content, status, message, reviewed_by, uploaded_at, reviewed_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, '', NULL, ?7, NULL)
            "#,
        )
        .bind(customer_id)
        .bind(document_name)
        .bind(document_type)
        .bind(content_type)
        .bind(content)
        .bind(VerificationStatus::Pending.as_str())
        .bind(uploaded_at.to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(format!("Failed to insert document: {}", e)))?;

        Ok(result.last_insert_rowid())
    }

    pub async fn get_document(&self, document_id: i64) -> Result<Option<KycDocument>> {
        let row = sqlx::query("SELECT * FROM kyc_documents WHERE document_id = ?1")
            .bind(document_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to fetch document: {}", e)))?;

        row.map(Self::row_to_document).transpose()
    }

    /// Owner column only, so ownership checks never pull the blob.
    pub async fn get_document_owner(&self, document_id: i64) -> Result<Option<i64>> {
        let row = sqlx::query("SELECT customer_id FROM kyc_documents WHERE document_id = ?1")
            .bind(document_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to fetch document owner: {}", e)))?;

        Ok(row.map(|r| r.get("customer_id")))
    }

    pub async fn documents_by_customer(&self, customer_id: i64) -> Result<Vec<KycDocument>> {
        let rows = sqlx::query(
            "SELECT * FROM kyc_documents WHERE customer_id = ?1 ORDER BY uploaded_at DESC",
        )
        .bind(customer_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(format!("Failed to list documents: {}", e)))?;

        rows.into_iter().map(Self::row_to_document).collect()
    }

    pub async fn documents_by_status(
        &self,
        status: VerificationStatus,
    ) -> Result<Vec<KycDocument>> {
        let rows =
            sqlx::query("SELECT * FROM kyc_documents WHERE status = ?1 ORDER BY uploaded_at ASC")
                .bind(status.as_str())
                .fetch_all(&self.pool)
                .await
                .map_err(|e| AppError::DatabaseError(format!("Failed to list documents: {}", e)))?;

        rows.into_iter().map(Self::row_to_document).collect()
    }

    pub async fn update_review(
        &self,
        document_id: i64,
        status: VerificationStatus,
        message: &str,
        reviewed_by: &str,
        reviewed_at: DateTime<Utc>,
    ) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE kyc_documents
            SET status = ?1, message = ?2, reviewed_by = ?3, reviewed_at = ?4
            WHERE document_id = ?5
            "#,
        )
        .bind(status.as_str())
        .bind(message)
        .bind(reviewed_by)
        .bind(reviewed_at.to_rfc3339())
        .bind(document_id)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(format!("Failed to update document review: {}", e)))?;
        Ok(())
    }

    pub async fn delete_document(&self, document_id: i64) -> Result<()> {
        sqlx::query("DELETE FROM kyc_documents WHERE document_id = ?1")
            .bind(document_id)
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to delete document: {}", e)))?;
        Ok(())
    }

    pub async fn count_documents(&self) -> Result<i64> {
        let row = sqlx::query("SELECT COUNT(*) AS n FROM kyc_documents")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to count documents: {}", e)))?;
        Ok(row.get::<i64, _>("n"))
    }

    pub async fn count_documents_by_status(&self, status: VerificationStatus) -> Result<i64> {
        let row = sqlx::query("SELECT COUNT(*) AS n FROM kyc_documents WHERE status = ?1")
            .bind(status.as_str())
            .fetch_one(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to count documents: {}", e)))?;
        Ok(row.get::<i64, _>("n"))
    }

    // ===== row mapping =====

    fn row_to_user(row: sqlx::sqlite::SqliteRow) -> Result<User> {
        Ok(User {
            user_id: row.get("user_id"),
            username: row.get("username"),
            role: row.get::<String, _>("role").parse()?,
            password_hash: row.get("password_hash"),
            enabled: row.get("enabled"),
            created_at: parse_timestamp(&row.get::<String, _>("created_at"))?,
        })
    }

    fn row_to_document(row: sqlx::sqlite::SqliteRow) -> Result<KycDocument> {
        Ok(KycDocument {
            document_id: row.get("document_id"),
            customer_id: row.get("customer_id"),
            document_name: row.get("document_name"),
            document_type: row.get("document_type"),
            content_type: row.get("content_type"),
            content: row.get("content"),
            status: row.get::<String, _>("status").parse()?,
            message: row.get("message"),
            reviewed_by: row.get("reviewed_by"),
            uploaded_at: parse_timestamp(&row.get::<String, _>("uploaded_at"))?,
            reviewed_at: row
                .get::<Option<String>, _>("reviewed_at")
                .map(|s| parse_timestamp(&s))
                .transpose()?,
        })
    }
}

fn parse_timestamp(s: &str) -> Result<DateTime<Utc>> {
    s.parse::<DateTime<Utc>>()
        .map_err(|e| AppError::DatabaseError(format!("Invalid timestamp '{}': {}", s, e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn insert_and_fetch_document() {
        let db = SqliteDatabase::in_memory().await.unwrap();
        let id = db
            .insert_document(42, "id-card.png", "AADHAR", "image/png", b"bytes", Utc::now())
            .await
            .unwrap();

        let doc = db.get_document(id).await.unwrap().unwrap();
        assert_eq!(doc.customer_id, 42);
        assert_eq!(doc.status, VerificationStatus::Pending);
        assert_eq!(doc.message, "");
        assert!(doc.reviewed_by.is_none());
        assert!(doc.reviewed_at.is_none());
        assert_eq!(doc.content, b"bytes");
    }

    #[tokio::test]
    async fn counts_track_status_updates() {
        let db = SqliteDatabase::in_memory().await.unwrap();
        let a = db
            .insert_document(1, "a", "PAN", "image/png", b"a", Utc::now())
            .await
            .unwrap();
        db.insert_document(1, "b", "PHOTO", "image/png", b"b", Utc::now())
            .await
            .unwrap();

        db.update_review(a, VerificationStatus::Verified, "ok", "admin", Utc::now())
            .await
            .unwrap();

        assert_eq!(db.count_documents().await.unwrap(), 2);
        assert_eq!(
            db.count_documents_by_status(VerificationStatus::Verified)
                .await
                .unwrap(),
            1
        );
        assert_eq!(
            db.count_documents_by_status(VerificationStatus::Pending)
                .await
                .unwrap(),
            1
        );
    }

    #[tokio::test]
    async fn user_round_trip_preserves_role() {
        let db = SqliteDatabase::in_memory().await.unwrap();
        db.create_user("admin", Role::Admin, Some("hash"))
            .await
            .unwrap();

        let user = db.get_user_by_username("admin").await.unwrap().unwrap();
        assert_eq!(user.role, Role::Admin);
        assert!(user.enabled);
        assert_eq!(user.password_hash.as_deref(), Some("hash"));
        assert!(db.get_user_by_username("nobody").await.unwrap().is_none());
    }
}
