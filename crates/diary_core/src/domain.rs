//! crates/diary_core/src/domain.rs
//!
//! Defines the pure, core data structures for the application.
//! These structs are independent of any database or serialization format.

use chrono::{DateTime, Utc};
use uuid::Uuid;

/// A single diary entry owned by exactly one user.
///
/// `passcode_hash` holds the argon2 PHC string for passcode-protected
/// entries. It must never leave the server; the web layer is responsible
/// for keeping it out of every response shape.
#[derive(Debug, Clone)]
pub struct Entry {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub content: String,
    pub tags: Option<String>,
    pub mood: Option<String>,
    pub passcode_hash: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Entry {
    /// Whether reading this entry's content requires presenting a passcode.
    pub fn is_protected(&self) -> bool {
        self.passcode_hash.is_some()
    }
}

/// The validated payload for creating an entry. The passcode, when given,
/// is already hashed by the time it reaches the persistence port.
#[derive(Debug, Clone)]
pub struct NewEntry {
    pub title: String,
    pub content: String,
    pub tags: Option<String>,
    pub mood: Option<String>,
    pub passcode_hash: Option<String>,
}

/// A partial update to an entry. `None` fields are left unchanged.
///
/// The optional fields use a nested `Option`: the outer level distinguishes
/// "not mentioned" from "mentioned", the inner level "set" from "cleared".
#[derive(Debug, Clone, Default)]
pub struct EntryPatch {
    pub title: Option<String>,
    pub content: Option<String>,
    pub tags: Option<Option<String>>,
    pub mood: Option<Option<String>>,
    pub passcode_hash: Option<Option<String>>,
}

impl EntryPatch {
    /// True when the patch carries no changes at all.
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.content.is_none()
            && self.tags.is_none()
            && self.mood.is_none()
            && self.passcode_hash.is_none()
    }
}

/// The column an entry listing may be sorted by. Parsed from the wire
/// against this closed set so user input never reaches query construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortField {
    CreatedAt,
    UpdatedAt,
    Title,
}

impl SortField {
    /// Parses the camelCase wire name used by the HTTP API.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "createdAt" => Some(Self::CreatedAt),
            "updatedAt" => Some(Self::UpdatedAt),
            "title" => Some(Self::Title),
            _ => None,
        }
    }

    /// The column name this sort field maps to. Only ever returns values
    /// from this fixed set, which is what makes it safe to splice into SQL.
    pub fn column(&self) -> &'static str {
        match self {
            Self::CreatedAt => "created_at",
            Self::UpdatedAt => "updated_at",
            Self::Title => "title",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Asc,
    Desc,
}

impl SortOrder {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "asc" => Some(Self::Asc),
            "desc" => Some(Self::Desc),
            _ => None,
        }
    }

    pub fn keyword(&self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }
}

/// A validated listing query: free-text search, tag filters, pagination
/// and an allow-listed sort.
#[derive(Debug, Clone)]
pub struct EntryQuery {
    pub search: Option<String>,
    pub tags: Vec<String>,
    pub page: u32,
    pub limit: u32,
    pub sort_by: SortField,
    pub sort_order: SortOrder,
}

impl Default for EntryQuery {
    fn default() -> Self {
        Self {
            search: None,
            tags: Vec::new(),
            page: 1,
            limit: 10,
            sort_by: SortField::CreatedAt,
            sort_order: SortOrder::Desc,
        }
    }
}

impl EntryQuery {
    /// The row offset implied by `page` and `limit`.
    pub fn offset(&self) -> u32 {
        self.page.saturating_sub(1).saturating_mul(self.limit)
    }

    /// Splits a comma-delimited tag filter into trimmed, non-empty terms.
    pub fn split_tags(raw: &str) -> Vec<String> {
        raw.split(',')
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .collect()
    }
}

/// One page of a listing plus the total match count for pagination.
#[derive(Debug, Clone)]
pub struct EntryPage {
    pub entries: Vec<Entry>,
    pub total: u64,
}

/// Aggregate counts for the stats endpoint.
#[derive(Debug, Clone)]
pub struct EntryStats {
    pub total_entries: u64,
    pub this_month_entries: u64,
    pub today_entries: u64,
    pub last_entry_date: Option<DateTime<Utc>>,
}

// Represents a user - used throughout the app.
#[derive(Debug, Clone)]
pub struct User {
    pub user_id: Uuid,
    pub email: String,
}

// Only used internally for login/signup - contains sensitive data.
#[derive(Debug, Clone)]
pub struct UserCredentials {
    pub user_id: Uuid,
    pub email: String,
    pub hashed_password: String,
}

// Represents a browser login session (auth cookie).
#[derive(Debug, Clone)]
pub struct AuthSession {
    pub id: String,
    pub user_id: Uuid,
    pub expires_at: DateTime<Utc>,
}
