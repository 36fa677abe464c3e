//! crates/diary_core/src/ports.rs
//!
//! Defines the service contracts (traits) for the application's core logic.
//! These traits form the boundary of the hexagonal architecture, allowing the
//! core to be independent of specific external implementations like the
//! database or the PDF rendering engine.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::{
    Entry, EntryPage, EntryPatch, EntryQuery, EntryStats, NewEntry, User, UserCredentials,
};

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// A generic error type for all port operations.
/// This abstracts away the specific errors from external services.
#[derive(Debug, thiserror::Error)]
pub enum PortError {
    #[error("Item not found: {0}")]
    NotFound(String),
    #[error("Conflict: {0}")]
    Conflict(String),
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

//=========================================================================================
// Persistence Port
//=========================================================================================

#[async_trait]
pub trait DatabaseService: Send + Sync {
    // --- Auth ---
    async fn create_user_with_email(
        &self,
        email: &str,
        hashed_password: &str,
    ) -> PortResult<User>;

    async fn get_user_by_email(&self, email: &str) -> PortResult<UserCredentials>;

    async fn create_auth_session(
        &self,
        session_id: &str,
        user_id: Uuid,
        expires_at: DateTime<Utc>,
    ) -> PortResult<()>;

    async fn validate_auth_session(&self, session_id: &str) -> PortResult<Uuid>;

    async fn delete_auth_session(&self, session_id: &str) -> PortResult<()>;

    // --- Entries ---
    //
    // Every entry operation is scoped by the owning user inside the query
    // itself. An id that exists but belongs to another user surfaces as
    // `NotFound`, indistinguishable from a missing row.

    async fn create_entry(&self, user_id: Uuid, new_entry: NewEntry) -> PortResult<Entry>;

    async fn get_entry(&self, user_id: Uuid, entry_id: Uuid) -> PortResult<Entry>;

    async fn list_entries(&self, user_id: Uuid, query: &EntryQuery) -> PortResult<EntryPage>;

    async fn update_entry(
        &self,
        user_id: Uuid,
        entry_id: Uuid,
        patch: EntryPatch,
    ) -> PortResult<Entry>;

    async fn delete_entry(&self, user_id: Uuid, entry_id: Uuid) -> PortResult<()>;

    /// Fetches the subset of `entry_ids` owned by `user_id`, most recent
    /// first. Non-owned and unknown ids are silently dropped.
    async fn get_entries_by_ids(&self, user_id: Uuid, entry_ids: &[Uuid]) -> PortResult<Vec<Entry>>;

    async fn entry_stats(&self, user_id: Uuid) -> PortResult<EntryStats>;
}

//=========================================================================================
// Passcode Port
//=========================================================================================

/// Hashing and verification of per-entry passcodes.
///
/// `verify` must compare in constant time; the argon2 adapter satisfies
/// this by construction.
pub trait PasscodeHasher: Send + Sync {
    fn hash(&self, passcode: &str) -> PortResult<String>;
    fn verify(&self, candidate: &str, stored_hash: &str) -> bool;
}

//=========================================================================================
// PDF Rendering Port
//=========================================================================================

/// The distinct failure modes of the render pipeline. All are recoverable
/// at the request level; none may leak the engine instance.
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("Failed to launch the rendering engine: {0}")]
    Launch(String),
    #[error("Timed out after {0}s waiting for the document to load")]
    LoadTimeout(u64),
    #[error("Rendered output is implausibly small ({size} bytes, minimum {min})")]
    UndersizedOutput { size: usize, min: usize },
    #[error("Rendering engine error: {0}")]
    Engine(String),
}

#[async_trait]
pub trait PdfRenderService: Send + Sync {
    /// Renders a complete HTML document into a PDF byte buffer.
    async fn render(&self, html: &str) -> Result<Vec<u8>, RenderError>;
}
