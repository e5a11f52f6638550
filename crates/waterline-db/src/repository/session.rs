//! # Session Repository
//!
//! Persists technician sessions created by a successful upstream login.
//! Sessions are insert-only here; token expiry is the upstream's concern.

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::debug;

use crate::error::DbResult;
use waterline_core::Session;

/// Repository for technician sessions.
#[derive(Debug, Clone)]
pub struct SessionRepository {
    pool: SqlitePool,
}

impl SessionRepository {
    /// Creates a new SessionRepository.
    pub fn new(pool: SqlitePool) -> Self {
        SessionRepository { pool }
    }

    /// Stores a session row for an authenticated technician.
    pub async fn insert(&self, session: &Session) -> DbResult<()> {
        debug!(user_id = session.user_id, username = %session.username, "Storing session");

        sqlx::query(
            "INSERT INTO sessions \
             (user_id, trongate_user_id, trongate_token, username, employee_name, user_role_id, created_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        )
        .bind(session.user_id)
        .bind(session.trongate_user_id)
        .bind(&session.trongate_token)
        .bind(&session.username)
        .bind(&session.employee_name)
        .bind(session.user_role_id)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};

    #[tokio::test]
    async fn test_insert_session() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.sessions();

        repo.insert(&Session {
            user_id: 7,
            trongate_user_id: 12,
            trongate_token: "tok-123".to_string(),
            username: "jdoe".to_string(),
            employee_name: "J. Doe".to_string(),
            user_role_id: 3,
        })
        .await
        .unwrap();

        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM sessions")
            .fetch_one(db.pool())
            .await
            .unwrap();
        assert_eq!(count, 1);
    }
}
