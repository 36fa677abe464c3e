//! services/api/src/adapters/db.rs
//!
//! This module contains the database adapter, which is the concrete
//! implementation of the `DatabaseService` port from the `core` crate. It
//! handles all interactions with the PostgreSQL database using `sqlx`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use diary_core::domain::{
    Entry, EntryPage, EntryPatch, EntryQuery, EntryStats, NewEntry, User, UserCredentials,
};
use diary_core::ports::{DatabaseService, PortError, PortResult};

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// A database adapter that implements the `DatabaseService` port.
#[derive(Clone)]
pub struct DbAdapter {
    pool: PgPool,
}

impl DbAdapter {
    /// Creates a new `DbAdapter`.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// A helper function to run database migrations at startup.
    pub async fn run_migrations(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }
}

const ENTRY_COLUMNS: &str =
    "id, user_id, title, content, tags, mood, passcode_hash, created_at, updated_at";

/// Escapes LIKE metacharacters so search terms match literally.
fn escape_like(term: &str) -> String {
    term.replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}

fn map_db_err(e: sqlx::Error) -> PortError {
    match &e {
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            PortError::Conflict("Email is already registered".to_string())
        }
        _ => PortError::Unexpected(e.to_string()),
    }
}

/// Appends the owner scope and the combined search/tag filter to a query.
/// The original listing semantics OR all search and tag clauses together.
fn push_entry_filters(qb: &mut QueryBuilder<'_, Postgres>, user_id: Uuid, query: &EntryQuery) {
    qb.push(" WHERE user_id = ").push_bind(user_id);

    let search_pattern = query
        .search
        .as_deref()
        .filter(|s| !s.trim().is_empty())
        .map(|s| format!("%{}%", escape_like(s.trim())));
    let tag_patterns: Vec<String> = query
        .tags
        .iter()
        .map(|t| format!("%{}%", escape_like(t)))
        .collect();

    if search_pattern.is_none() && tag_patterns.is_empty() {
        return;
    }

    qb.push(" AND (");
    let mut first = true;
    if let Some(pattern) = search_pattern {
        qb.push("title ILIKE ").push_bind(pattern.clone());
        qb.push(" OR content ILIKE ").push_bind(pattern);
        first = false;
    }
    for pattern in tag_patterns {
        if !first {
            qb.push(" OR ");
        }
        qb.push("tags ILIKE ").push_bind(pattern);
        first = false;
    }
    qb.push(")");
}

//=========================================================================================
// "Impure" Database Record Structs
//=========================================================================================

#[derive(FromRow)]
struct UserRecord {
    id: Uuid,
    email: String,
}
impl UserRecord {
    fn to_domain(self) -> User {
        User {
            user_id: self.id,
            email: self.email,
        }
    }
}

#[derive(FromRow)]
struct CredentialsRecord {
    id: Uuid,
    email: String,
    hashed_password: String,
}
impl CredentialsRecord {
    fn to_domain(self) -> UserCredentials {
        UserCredentials {
            user_id: self.id,
            email: self.email,
            hashed_password: self.hashed_password,
        }
    }
}

#[derive(FromRow)]
struct EntryRecord {
    id: Uuid,
    user_id: Uuid,
    title: String,
    content: String,
    tags: Option<String>,
    mood: Option<String>,
    passcode_hash: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}
impl EntryRecord {
    fn to_domain(self) -> Entry {
        Entry {
            id: self.id,
            user_id: self.user_id,
            title: self.title,
            content: self.content,
            tags: self.tags,
            mood: self.mood,
            passcode_hash: self.passcode_hash,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

//=========================================================================================
// `DatabaseService` Trait Implementation
//=========================================================================================

#[async_trait]
impl DatabaseService for DbAdapter {
    async fn create_user_with_email(
        &self,
        email: &str,
        hashed_password: &str,
    ) -> PortResult<User> {
        let record = sqlx::query_as::<_, UserRecord>(
            "INSERT INTO users (id, email, hashed_password) VALUES ($1, $2, $3) \
             RETURNING id, email",
        )
        .bind(Uuid::new_v4())
        .bind(email)
        .bind(hashed_password)
        .fetch_one(&self.pool)
        .await
        .map_err(map_db_err)?;

        Ok(record.to_domain())
    }

    async fn get_user_by_email(&self, email: &str) -> PortResult<UserCredentials> {
        let record = sqlx::query_as::<_, CredentialsRecord>(
            "SELECT id, email, hashed_password FROM users WHERE email = $1",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_db_err)?
        .ok_or_else(|| PortError::NotFound(format!("No user with email {email}")))?;

        Ok(record.to_domain())
    }

    async fn create_auth_session(
        &self,
        session_id: &str,
        user_id: Uuid,
        expires_at: DateTime<Utc>,
    ) -> PortResult<()> {
        sqlx::query("INSERT INTO auth_sessions (id, user_id, expires_at) VALUES ($1, $2, $3)")
            .bind(session_id)
            .bind(user_id)
            .bind(expires_at)
            .execute(&self.pool)
            .await
            .map_err(map_db_err)?;
        Ok(())
    }

    async fn validate_auth_session(&self, session_id: &str) -> PortResult<Uuid> {
        let user_id: Option<Uuid> = sqlx::query_scalar(
            "SELECT user_id FROM auth_sessions WHERE id = $1 AND expires_at > NOW()",
        )
        .bind(session_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_db_err)?;

        user_id.ok_or_else(|| PortError::NotFound("Auth session not found or expired".to_string()))
    }

    async fn delete_auth_session(&self, session_id: &str) -> PortResult<()> {
        sqlx::query("DELETE FROM auth_sessions WHERE id = $1")
            .bind(session_id)
            .execute(&self.pool)
            .await
            .map_err(map_db_err)?;
        Ok(())
    }

    async fn create_entry(&self, user_id: Uuid, new_entry: NewEntry) -> PortResult<Entry> {
        let sql = format!(
            "INSERT INTO diary_entries (id, user_id, title, content, tags, mood, passcode_hash) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) RETURNING {ENTRY_COLUMNS}"
        );
        let record = sqlx::query_as::<_, EntryRecord>(&sql)
            .bind(Uuid::new_v4())
            .bind(user_id)
            .bind(&new_entry.title)
            .bind(&new_entry.content)
            .bind(&new_entry.tags)
            .bind(&new_entry.mood)
            .bind(&new_entry.passcode_hash)
            .fetch_one(&self.pool)
            .await
            .map_err(map_db_err)?;

        Ok(record.to_domain())
    }

    async fn get_entry(&self, user_id: Uuid, entry_id: Uuid) -> PortResult<Entry> {
        let sql =
            format!("SELECT {ENTRY_COLUMNS} FROM diary_entries WHERE id = $1 AND user_id = $2");
        let record = sqlx::query_as::<_, EntryRecord>(&sql)
            .bind(entry_id)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_db_err)?
            .ok_or_else(|| PortError::NotFound(format!("Entry {entry_id} not found")))?;

        Ok(record.to_domain())
    }

    async fn list_entries(&self, user_id: Uuid, query: &EntryQuery) -> PortResult<EntryPage> {
        // The sort column and direction come from allow-listed enums, never
        // from raw request strings.
        let mut qb = QueryBuilder::<Postgres>::new(format!(
            "SELECT {ENTRY_COLUMNS} FROM diary_entries"
        ));
        push_entry_filters(&mut qb, user_id, query);
        qb.push(format!(
            " ORDER BY {} {}",
            query.sort_by.column(),
            query.sort_order.keyword()
        ));
        qb.push(" LIMIT ").push_bind(query.limit as i64);
        qb.push(" OFFSET ").push_bind(query.offset() as i64);

        let records = qb
            .build_query_as::<EntryRecord>()
            .fetch_all(&self.pool)
            .await
            .map_err(map_db_err)?;

        let mut count_qb = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM diary_entries");
        push_entry_filters(&mut count_qb, user_id, query);
        let total: i64 = count_qb
            .build_query_scalar()
            .fetch_one(&self.pool)
            .await
            .map_err(map_db_err)?;

        Ok(EntryPage {
            entries: records.into_iter().map(|r| r.to_domain()).collect(),
            total: total as u64,
        })
    }

    async fn update_entry(
        &self,
        user_id: Uuid,
        entry_id: Uuid,
        patch: EntryPatch,
    ) -> PortResult<Entry> {
        // Owner-scoped read first; a foreign id fails here as NotFound.
        let current = self.get_entry(user_id, entry_id).await?;

        let title = patch.title.unwrap_or(current.title);
        let content = patch.content.unwrap_or(current.content);
        let tags = patch.tags.unwrap_or(current.tags);
        let mood = patch.mood.unwrap_or(current.mood);
        let passcode_hash = patch.passcode_hash.unwrap_or(current.passcode_hash);

        let sql = format!(
            "UPDATE diary_entries \
             SET title = $1, content = $2, tags = $3, mood = $4, passcode_hash = $5, \
                 updated_at = NOW() \
             WHERE id = $6 AND user_id = $7 RETURNING {ENTRY_COLUMNS}"
        );
        let record = sqlx::query_as::<_, EntryRecord>(&sql)
            .bind(&title)
            .bind(&content)
            .bind(&tags)
            .bind(&mood)
            .bind(&passcode_hash)
            .bind(entry_id)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_db_err)?
            .ok_or_else(|| PortError::NotFound(format!("Entry {entry_id} not found")))?;

        Ok(record.to_domain())
    }

    async fn delete_entry(&self, user_id: Uuid, entry_id: Uuid) -> PortResult<()> {
        let result = sqlx::query("DELETE FROM diary_entries WHERE id = $1 AND user_id = $2")
            .bind(entry_id)
            .bind(user_id)
            .execute(&self.pool)
            .await
            .map_err(map_db_err)?;

        if result.rows_affected() == 0 {
            return Err(PortError::NotFound(format!("Entry {entry_id} not found")));
        }
        Ok(())
    }

    async fn get_entries_by_ids(
        &self,
        user_id: Uuid,
        entry_ids: &[Uuid],
    ) -> PortResult<Vec<Entry>> {
        let sql = format!(
            "SELECT {ENTRY_COLUMNS} FROM diary_entries \
             WHERE user_id = $1 AND id = ANY($2) ORDER BY created_at DESC"
        );
        let records = sqlx::query_as::<_, EntryRecord>(&sql)
            .bind(user_id)
            .bind(entry_ids.to_vec())
            .fetch_all(&self.pool)
            .await
            .map_err(map_db_err)?;

        Ok(records.into_iter().map(|r| r.to_domain()).collect())
    }

    async fn entry_stats(&self, user_id: Uuid) -> PortResult<EntryStats> {
        let total: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM diary_entries WHERE user_id = $1")
                .bind(user_id)
                .fetch_one(&self.pool)
                .await
                .map_err(map_db_err)?;

        let this_month: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM diary_entries \
             WHERE user_id = $1 AND created_at >= date_trunc('month', NOW())",
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await
        .map_err(map_db_err)?;

        let today: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM diary_entries \
             WHERE user_id = $1 AND created_at >= date_trunc('day', NOW())",
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await
        .map_err(map_db_err)?;

        let last_entry_date: Option<DateTime<Utc>> =
            sqlx::query_scalar("SELECT MAX(created_at) FROM diary_entries WHERE user_id = $1")
                .bind(user_id)
                .fetch_one(&self.pool)
                .await
                .map_err(map_db_err)?;

        Ok(EntryStats {
            total_entries: total as u64,
            this_month_entries: this_month as u64,
            today_entries: today as u64,
            last_entry_date,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn like_escaping_neutralizes_metacharacters() {
        assert_eq!(escape_like("50%_done"), "50\\%\\_done");
        assert_eq!(escape_like(r"back\slash"), r"back\\slash");
        assert_eq!(escape_like("plain"), "plain");
    }

    fn filtered_sql(query: &EntryQuery) -> String {
        let mut qb = QueryBuilder::<Postgres>::new("SELECT 1 FROM diary_entries");
        push_entry_filters(&mut qb, Uuid::new_v4(), query);
        qb.sql().to_string()
    }

    #[test]
    fn listing_filters_or_combine_search_and_tags_case_insensitively() {
        let sql = filtered_sql(&EntryQuery {
            search: Some("Rain".into()),
            tags: vec!["Travel".into(), "food".into()],
            ..EntryQuery::default()
        });
        // Every term is a bound parameter, matched with the
        // case-insensitive operator, and the clauses are OR-combined.
        assert!(sql.contains("WHERE user_id = $1"));
        assert!(sql.contains(
            "(title ILIKE $2 OR content ILIKE $3 OR tags ILIKE $4 OR tags ILIKE $5)"
        ));
        assert!(!sql.contains("Rain"));
        assert!(!sql.contains("Travel"));
    }

    #[test]
    fn listing_filters_tags_only_when_no_search_is_given() {
        let sql = filtered_sql(&EntryQuery {
            tags: vec!["travel".into()],
            ..EntryQuery::default()
        });
        assert!(sql.contains("(tags ILIKE $2)"));
        assert!(!sql.contains("title ILIKE"));
    }

    #[test]
    fn listing_without_filters_scopes_to_the_owner_only() {
        let sql = filtered_sql(&EntryQuery::default());
        assert!(sql.ends_with("WHERE user_id = $1"));
    }
}
