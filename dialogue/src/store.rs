use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use nutrichat_core::error::SessionLookupFailed;
use nutrichat_core::session::{ClarificationSession, SessionStatus, pick_oldest_pending};
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use tokio::sync::RwLock;

/// Read side of the clarification session table, keyed by user id.
///
/// Called once per turn and never cached: a second client may have advanced
/// the session since the last turn.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// The user's single pending session, if any.
    async fn find_pending(
        &self,
        user_id: &str,
    ) -> Result<Option<ClarificationSession>, SessionLookupFailed>;

    /// One session by id, whatever its status. Scoped to the owner.
    async fn find_session(
        &self,
        user_id: &str,
        clarification_id: &str,
    ) -> Result<Option<ClarificationSession>, SessionLookupFailed>;
}

/// Reduce whatever the backend returned to one session, flagging duplicates.
fn select_pending(
    user_id: &str,
    sessions: Vec<ClarificationSession>,
) -> Option<ClarificationSession> {
    let pending = sessions.iter().filter(|s| s.is_pending()).count();
    let picked = pick_oldest_pending(sessions);
    if pending > 1 {
        tracing::warn!(
            user_id,
            pending,
            picked = ?picked.as_ref().map(|s| s.id.as_str()),
            "multiple pending clarification sessions; using the oldest"
        );
    }
    picked
}

/// Postgres-backed store. Read-only: the interpreter backend owns every write.
///
/// Expects a `clarification_sessions` table with
/// `id`, `user_id`, `status`, `answers text[]`, `current_index integer`, `created_at timestamptz`.
#[derive(Clone)]
pub struct PgSessionStore {
    db: PgPool,
}

impl PgSessionStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Pool that connects on first use, so an unreachable database surfaces as a
    /// lookup failure on the turn (and fails open) instead of blocking startup.
    pub fn connect_lazy(database_url: &str) -> Result<Self, SessionLookupFailed> {
        let db = PgPoolOptions::new()
            .max_connections(5)
            .acquire_timeout(Duration::from_secs(5))
            .connect_lazy(database_url)
            .map_err(lookup_failed)?;
        Ok(Self::new(db))
    }
}

/// Internal row type for sqlx mapping
#[derive(sqlx::FromRow)]
struct ClarificationSessionRow {
    id: String,
    user_id: String,
    status: String,
    answers: Option<Vec<String>>,
    current_index: Option<i32>,
    created_at: DateTime<Utc>,
}

impl ClarificationSessionRow {
    /// `None` for rows whose status this client does not understand.
    fn into_session(self) -> Option<ClarificationSession> {
        let status = SessionStatus::parse(&self.status)?;
        Some(ClarificationSession {
            id: self.id,
            user_id: self.user_id,
            status,
            answers: self.answers.unwrap_or_default(),
            current_index: self.current_index.unwrap_or(0).max(0) as usize,
            created_at: self.created_at,
        })
    }
}

fn lookup_failed(err: sqlx::Error) -> SessionLookupFailed {
    SessionLookupFailed(err.to_string())
}

#[async_trait]
impl SessionStore for PgSessionStore {
    async fn find_pending(
        &self,
        user_id: &str,
    ) -> Result<Option<ClarificationSession>, SessionLookupFailed> {
        let mut tx = self.db.begin().await.map_err(lookup_failed)?;
        scope_to_user(&mut tx, user_id).await?;

        let rows = sqlx::query_as::<_, ClarificationSessionRow>(
            r#"
            SELECT id::text AS id, user_id::text AS user_id, status::text AS status,
                   answers, current_index, created_at
            FROM clarification_sessions
            WHERE user_id::text = $1 AND status = 'pending'
            ORDER BY created_at ASC, id ASC
            "#,
        )
        .bind(user_id)
        .fetch_all(&mut *tx)
        .await
        .map_err(lookup_failed)?;

        tx.commit().await.map_err(lookup_failed)?;

        let sessions = rows
            .into_iter()
            .filter_map(ClarificationSessionRow::into_session)
            .collect();
        Ok(select_pending(user_id, sessions))
    }

    async fn find_session(
        &self,
        user_id: &str,
        clarification_id: &str,
    ) -> Result<Option<ClarificationSession>, SessionLookupFailed> {
        let mut tx = self.db.begin().await.map_err(lookup_failed)?;
        scope_to_user(&mut tx, user_id).await?;

        let row = sqlx::query_as::<_, ClarificationSessionRow>(
            r#"
            SELECT id::text AS id, user_id::text AS user_id, status::text AS status,
                   answers, current_index, created_at
            FROM clarification_sessions
            WHERE user_id::text = $1 AND id::text = $2
            "#,
        )
        .bind(user_id)
        .bind(clarification_id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(lookup_failed)?;

        tx.commit().await.map_err(lookup_failed)?;

        Ok(row.and_then(ClarificationSessionRow::into_session))
    }
}

/// Row-level security reads the owner from this setting.
async fn scope_to_user(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    user_id: &str,
) -> Result<(), SessionLookupFailed> {
    sqlx::query("SELECT set_config('nutrichat.current_user_id', $1, true)")
        .bind(user_id)
        .execute(&mut **tx)
        .await
        .map_err(lookup_failed)?;
    Ok(())
}

/// In-process store. Used when no database is configured, and in tests.
#[derive(Default)]
pub struct MemorySessionStore {
    sessions: RwLock<Vec<ClarificationSession>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, session: ClarificationSession) {
        self.sessions.write().await.push(session);
    }

    /// Mark a session resolved. Returns false when the id is unknown.
    pub async fn resolve(&self, id: &str) -> bool {
        let mut sessions = self.sessions.write().await;
        match sessions.iter_mut().find(|s| s.id == id) {
            Some(session) => {
                session.status = SessionStatus::Resolved;
                true
            }
            None => false,
        }
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn find_pending(
        &self,
        user_id: &str,
    ) -> Result<Option<ClarificationSession>, SessionLookupFailed> {
        let owned: Vec<ClarificationSession> = self
            .sessions
            .read()
            .await
            .iter()
            .filter(|s| s.user_id == user_id)
            .cloned()
            .collect();
        Ok(select_pending(user_id, owned))
    }

    async fn find_session(
        &self,
        user_id: &str,
        clarification_id: &str,
    ) -> Result<Option<ClarificationSession>, SessionLookupFailed> {
        Ok(self
            .sessions
            .read()
            .await
            .iter()
            .find(|s| s.user_id == user_id && s.id == clarification_id)
            .cloned())
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;

    fn pending(id: &str, user_id: &str, age_minutes: i64) -> ClarificationSession {
        ClarificationSession {
            id: id.to_string(),
            user_id: user_id.to_string(),
            status: SessionStatus::Pending,
            answers: vec![],
            current_index: 0,
            created_at: Utc::now() - Duration::minutes(age_minutes),
        }
    }

    #[tokio::test]
    async fn memory_store_scopes_lookup_to_user() {
        let store = MemorySessionStore::new();
        store.insert(pending("c1", "alice", 1)).await;

        assert_eq!(store.find_pending("alice").await.unwrap().unwrap().id, "c1");
        assert!(store.find_pending("bob").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn memory_store_picks_oldest_of_duplicates() {
        let store = MemorySessionStore::new();
        store.insert(pending("newer", "alice", 1)).await;
        store.insert(pending("older", "alice", 10)).await;

        assert_eq!(
            store.find_pending("alice").await.unwrap().unwrap().id,
            "older"
        );
    }

    #[tokio::test]
    async fn resolved_sessions_are_not_found() {
        let store = MemorySessionStore::new();
        store.insert(pending("c1", "alice", 1)).await;

        assert!(store.resolve("c1").await);
        assert!(!store.resolve("missing").await);
        assert!(store.find_pending("alice").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn find_session_reads_by_id_behind_an_older_duplicate() {
        let store = MemorySessionStore::new();
        store.insert(pending("old", "alice", 60)).await;
        let mut live = pending("c1", "alice", 1);
        live.answers = vec!["chicken".to_string()];
        live.current_index = 1;
        store.insert(live).await;

        assert_eq!(store.find_pending("alice").await.unwrap().unwrap().id, "old");

        let found = store.find_session("alice", "c1").await.unwrap().unwrap();
        assert_eq!(found.answers, vec!["chicken"]);
        assert_eq!(found.current_index, 1);
    }

    #[tokio::test]
    async fn find_session_is_scoped_to_owner_and_keeps_status() {
        let store = MemorySessionStore::new();
        store.insert(pending("c1", "alice", 1)).await;
        store.resolve("c1").await;

        assert!(store.find_session("bob", "c1").await.unwrap().is_none());
        let found = store.find_session("alice", "c1").await.unwrap().unwrap();
        assert_eq!(found.status, SessionStatus::Resolved);
        assert!(store.find_session("alice", "missing").await.unwrap().is_none());
    }

    #[test]
    fn row_conversion_clamps_index_and_defaults_answers() {
        let row = ClarificationSessionRow {
            id: "c1".to_string(),
            user_id: "alice".to_string(),
            status: "pending".to_string(),
            answers: None,
            current_index: Some(-3),
            created_at: Utc::now(),
        };
        let session = row.into_session().unwrap();
        assert!(session.answers.is_empty());
        assert_eq!(session.current_index, 0);
    }

    #[test]
    fn row_conversion_drops_unknown_status() {
        let row = ClarificationSessionRow {
            id: "c1".to_string(),
            user_id: "alice".to_string(),
            status: "archived".to_string(),
            answers: Some(vec!["chicken".to_string()]),
            current_index: Some(1),
            created_at: Utc::now(),
        };
        assert!(row.into_session().is_none());
    }
}
