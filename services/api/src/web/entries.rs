//! services/api/src/web/entries.rs
//!
//! Axum handlers for the diary entry CRUD, search and stats endpoints,
//! plus the response shapes they share with the export endpoints.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Extension, Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::error::{ApiError, FieldError};
use crate::web::middleware::AuthUser;
use crate::web::state::AppState;
use diary_core::access::{authorize, AccessDecision};
use diary_core::domain::{Entry, EntryPatch, EntryQuery, NewEntry, SortField, SortOrder};

const TITLE_MAX_CHARS: usize = 200;
const LIMIT_MAX: u32 = 100;

//=========================================================================================
// API Response and Payload Structs
//=========================================================================================

/// The wire shape of an entry. The passcode hash never appears here in any
/// form; protected entries only expose the `requiresPasscode` flag.
#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct EntryResponse {
    pub id: Uuid,
    pub title: String,
    pub content: String,
    pub tags: Option<String>,
    pub mood: Option<String>,
    pub requires_passcode: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl EntryResponse {
    /// Full view, for contexts where the access gate has already granted
    /// content access (or the entry is unprotected).
    pub fn unlocked(entry: Entry) -> Self {
        Self::build(entry, false)
    }

    /// Listing view: protected entries keep their metadata but lose their
    /// content, which stays behind the gate.
    pub fn listed(entry: Entry) -> Self {
        let redact = entry.is_protected();
        Self::build(entry, redact)
    }

    fn build(entry: Entry, redact_content: bool) -> Self {
        Self {
            id: entry.id,
            title: entry.title,
            content: if redact_content {
                String::new()
            } else {
                entry.content
            },
            tags: entry.tags,
            mood: entry.mood,
            requires_passcode: entry.passcode_hash.is_some(),
            created_at: entry.created_at,
            updated_at: entry.updated_at,
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct Pagination {
    pub page: u32,
    pub limit: u32,
    pub total: u64,
    pub pages: u64,
}

#[derive(Serialize, ToSchema)]
pub struct ListEntriesResponse {
    pub entries: Vec<EntryResponse>,
    pub pagination: Pagination,
}

#[derive(Serialize, ToSchema)]
pub struct EntryEnvelope {
    pub entry: EntryResponse,
}

#[derive(Serialize, ToSchema)]
pub struct MessageEnvelope {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entry: Option<EntryResponse>,
}

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StatsResponse {
    pub total_entries: u64,
    pub this_month_entries: u64,
    pub today_entries: u64,
    pub last_entry_date: Option<DateTime<Utc>>,
}

#[derive(Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
pub struct ListParams {
    pub search: Option<String>,
    /// Comma-separated tag filter, OR-combined with the search terms.
    pub tags: Option<String>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
    pub sort_by: Option<String>,
    pub sort_order: Option<String>,
}

#[derive(Deserialize, IntoParams)]
pub struct PasscodeParam {
    pub passcode: Option<String>,
}

#[derive(Deserialize, ToSchema)]
pub struct CreateEntryRequest {
    pub title: String,
    pub content: String,
    pub tags: Option<String>,
    pub mood: Option<String>,
    pub passcode: Option<String>,
}

/// Partial update. Absent fields are unchanged; sending an empty string
/// for tags, mood or passcode clears the field.
#[derive(Deserialize, ToSchema)]
pub struct UpdateEntryRequest {
    pub title: Option<String>,
    pub content: Option<String>,
    pub tags: Option<String>,
    pub mood: Option<String>,
    pub passcode: Option<String>,
}

//=========================================================================================
// Validation Helpers
//=========================================================================================

fn validate_title(title: &str, errors: &mut Vec<FieldError>) -> Option<String> {
    let trimmed = title.trim();
    if trimmed.is_empty() {
        errors.push(FieldError::new("title", "Title is required"));
        return None;
    }
    if trimmed.chars().count() > TITLE_MAX_CHARS {
        errors.push(FieldError::new(
            "title",
            "Title must be at most 200 characters",
        ));
        return None;
    }
    Some(trimmed.to_string())
}

fn validate_content(content: &str, errors: &mut Vec<FieldError>) -> Option<String> {
    let trimmed = content.trim();
    if trimmed.is_empty() {
        errors.push(FieldError::new("content", "Content is required"));
        return None;
    }
    Some(trimmed.to_string())
}

/// Normalizes an optional free-text field: whitespace-only becomes absent.
fn normalize_optional(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn build_query(params: ListParams) -> Result<EntryQuery, ApiError> {
    let mut errors = Vec::new();

    let sort_by = match params.sort_by.as_deref() {
        None => SortField::CreatedAt,
        Some(raw) => match SortField::parse(raw) {
            Some(field) => field,
            None => {
                errors.push(FieldError::new(
                    "sortBy",
                    "Must be one of createdAt, updatedAt, title",
                ));
                SortField::CreatedAt
            }
        },
    };

    let sort_order = match params.sort_order.as_deref() {
        None => SortOrder::Desc,
        Some(raw) => match SortOrder::parse(raw) {
            Some(order) => order,
            None => {
                errors.push(FieldError::new("sortOrder", "Must be asc or desc"));
                SortOrder::Desc
            }
        },
    };

    if !errors.is_empty() {
        return Err(ApiError::Validation(errors));
    }

    Ok(EntryQuery {
        search: normalize_optional(params.search),
        tags: params
            .tags
            .as_deref()
            .map(EntryQuery::split_tags)
            .unwrap_or_default(),
        page: params.page.unwrap_or(1).max(1),
        limit: params.limit.unwrap_or(10).clamp(1, LIMIT_MAX),
        sort_by,
        sort_order,
    })
}

//=========================================================================================
// Handlers
//=========================================================================================

/// List entries with search, tag filtering, sorting and pagination.
#[utoipa::path(
    get,
    path = "/entries",
    params(ListParams),
    responses(
        (status = 200, description = "One page of entries", body = ListEntriesResponse),
        (status = 400, description = "Invalid sort parameters"),
        (status = 401, description = "Not authenticated")
    )
)]
pub async fn list_entries_handler(
    State(state): State<Arc<AppState>>,
    Extension(AuthUser(user_id)): Extension<AuthUser>,
    Query(params): Query<ListParams>,
) -> Result<Json<ListEntriesResponse>, ApiError> {
    let query = build_query(params)?;
    let page = state.db.list_entries(user_id, &query).await?;

    let pages = page.total.div_ceil(query.limit as u64);
    Ok(Json(ListEntriesResponse {
        entries: page.entries.into_iter().map(EntryResponse::listed).collect(),
        pagination: Pagination {
            page: query.page,
            limit: query.limit,
            total: page.total,
            pages,
        },
    }))
}

/// Fetch a single entry, passing the passcode gate when one is set.
#[utoipa::path(
    get,
    path = "/entries/{id}",
    params(("id" = Uuid, Path, description = "Entry id"), PasscodeParam),
    responses(
        (status = 200, description = "The entry", body = EntryEnvelope),
        (status = 403, description = "Passcode required"),
        (status = 404, description = "Not found (or not yours, or wrong passcode)")
    )
)]
pub async fn get_entry_handler(
    State(state): State<Arc<AppState>>,
    Extension(AuthUser(user_id)): Extension<AuthUser>,
    Path(id): Path<Uuid>,
    Query(params): Query<PasscodeParam>,
) -> Result<Json<EntryEnvelope>, ApiError> {
    let entry = state.db.get_entry(user_id, id).await?;

    match authorize(
        &entry,
        user_id,
        params.passcode.as_deref(),
        state.passcodes.as_ref(),
    ) {
        AccessDecision::Granted => Ok(Json(EntryEnvelope {
            entry: EntryResponse::unlocked(entry),
        })),
        AccessDecision::PasscodeRequired => Err(ApiError::PasscodeRequired),
        AccessDecision::Forbidden => Err(ApiError::NotFound),
    }
}

/// Create a new entry.
#[utoipa::path(
    post,
    path = "/entries",
    request_body = CreateEntryRequest,
    responses(
        (status = 201, description = "Entry created", body = MessageEnvelope),
        (status = 400, description = "Validation failed")
    )
)]
pub async fn create_entry_handler(
    State(state): State<Arc<AppState>>,
    Extension(AuthUser(user_id)): Extension<AuthUser>,
    Json(req): Json<CreateEntryRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let mut errors = Vec::new();
    let title = validate_title(&req.title, &mut errors);
    let content = validate_content(&req.content, &mut errors);
    if !errors.is_empty() {
        return Err(ApiError::Validation(errors));
    }
    // Both are present when no validation error was recorded.
    let (title, content) = match (title, content) {
        (Some(t), Some(c)) => (t, c),
        _ => return Err(ApiError::Internal("validation invariant broken".into())),
    };

    let passcode_hash = match normalize_optional(req.passcode) {
        Some(passcode) => Some(state.passcodes.hash(&passcode)?),
        None => None,
    };

    let entry = state
        .db
        .create_entry(
            user_id,
            NewEntry {
                title,
                content,
                tags: normalize_optional(req.tags),
                mood: normalize_optional(req.mood),
                passcode_hash,
            },
        )
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(MessageEnvelope {
            message: "Entry created successfully".to_string(),
            entry: Some(EntryResponse::unlocked(entry)),
        }),
    ))
}

/// Update any subset of an entry's fields.
#[utoipa::path(
    put,
    path = "/entries/{id}",
    params(("id" = Uuid, Path, description = "Entry id")),
    request_body = UpdateEntryRequest,
    responses(
        (status = 200, description = "Entry updated", body = MessageEnvelope),
        (status = 400, description = "Validation failed"),
        (status = 404, description = "Not found")
    )
)]
pub async fn update_entry_handler(
    State(state): State<Arc<AppState>>,
    Extension(AuthUser(user_id)): Extension<AuthUser>,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateEntryRequest>,
) -> Result<Json<MessageEnvelope>, ApiError> {
    let mut errors = Vec::new();
    let title = req.title.as_deref().map(|t| validate_title(t, &mut errors));
    let content = req
        .content
        .as_deref()
        .map(|c| validate_content(c, &mut errors));
    if !errors.is_empty() {
        return Err(ApiError::Validation(errors));
    }

    let passcode_hash = match req.passcode {
        None => None,
        Some(raw) => Some(match normalize_optional(Some(raw)) {
            Some(passcode) => Some(state.passcodes.hash(&passcode)?),
            // Empty string removes the passcode.
            None => None,
        }),
    };

    let patch = EntryPatch {
        title: title.flatten(),
        content: content.flatten(),
        tags: req.tags.map(|t| normalize_optional(Some(t))),
        mood: req.mood.map(|m| normalize_optional(Some(m))),
        passcode_hash,
    };

    let entry = if patch.is_empty() {
        // Nothing to change; do not bump updated_at.
        state.db.get_entry(user_id, id).await?
    } else {
        state.db.update_entry(user_id, id, patch).await?
    };

    Ok(Json(MessageEnvelope {
        message: "Entry updated successfully".to_string(),
        entry: Some(EntryResponse::unlocked(entry)),
    }))
}

/// Delete an entry permanently.
#[utoipa::path(
    delete,
    path = "/entries/{id}",
    params(("id" = Uuid, Path, description = "Entry id")),
    responses(
        (status = 200, description = "Entry deleted", body = MessageEnvelope),
        (status = 404, description = "Not found")
    )
)]
pub async fn delete_entry_handler(
    State(state): State<Arc<AppState>>,
    Extension(AuthUser(user_id)): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> Result<Json<MessageEnvelope>, ApiError> {
    state.db.delete_entry(user_id, id).await?;
    Ok(Json(MessageEnvelope {
        message: "Entry deleted successfully".to_string(),
        entry: None,
    }))
}

/// Aggregate statistics for the authenticated user's diary.
#[utoipa::path(
    get,
    path = "/entries/stats/summary",
    responses(
        (status = 200, description = "Entry statistics", body = StatsResponse),
        (status = 401, description = "Not authenticated")
    )
)]
pub async fn stats_handler(
    State(state): State<Arc<AppState>>,
    Extension(AuthUser(user_id)): Extension<AuthUser>,
) -> Result<Json<StatsResponse>, ApiError> {
    let stats = state.db.entry_stats(user_id).await?;
    Ok(Json(StatsResponse {
        total_entries: stats.total_entries,
        this_month_entries: stats.this_month_entries,
        today_entries: stats.today_entries,
        last_entry_date: stats.last_entry_date,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use async_trait::async_trait;
    use chrono::{DateTime, Utc};
    use diary_core::domain::{EntryPage, EntryStats, User, UserCredentials};
    use diary_core::ports::{
        DatabaseService, PasscodeHasher, PdfRenderService, PortError, PortResult, RenderError,
    };
    use std::sync::Mutex;
    use tracing::Level;

    fn sample_entry(passcode_hash: Option<&str>) -> Entry {
        let now = Utc::now();
        Entry {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            title: "T".into(),
            content: "<p>C</p>".into(),
            tags: Some("a,b".into()),
            mood: Some("😊".into()),
            passcode_hash: passcode_hash.map(String::from),
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn listed_view_redacts_protected_content_only() {
        let open = EntryResponse::listed(sample_entry(None));
        assert_eq!(open.content, "<p>C</p>");
        assert!(!open.requires_passcode);

        let locked = EntryResponse::listed(sample_entry(Some("hash")));
        assert_eq!(locked.content, "");
        assert!(locked.requires_passcode);
        // Metadata survives redaction.
        assert_eq!(locked.title, "T");
        assert_eq!(locked.tags.as_deref(), Some("a,b"));
    }

    #[test]
    fn responses_never_carry_the_passcode_hash() {
        let resp = EntryResponse::unlocked(sample_entry(Some("phc$hash$value")));
        let json = serde_json::to_string(&resp).expect("serializes");
        assert!(!json.contains("phc$hash$value"));
        assert!(!json.to_lowercase().contains("hash"));
    }

    #[test]
    fn title_validation_enforces_bounds() {
        let mut errors = Vec::new();
        assert_eq!(validate_title("  hi  ", &mut errors), Some("hi".into()));
        assert!(errors.is_empty());

        assert!(validate_title("   ", &mut errors).is_none());
        assert_eq!(errors.len(), 1);

        errors.clear();
        let long = "x".repeat(TITLE_MAX_CHARS + 1);
        assert!(validate_title(&long, &mut errors).is_none());
        assert_eq!(errors[0].field, "title");

        errors.clear();
        let exactly = "x".repeat(TITLE_MAX_CHARS);
        assert!(validate_title(&exactly, &mut errors).is_some());
        assert!(errors.is_empty());
    }

    #[test]
    fn query_building_rejects_unknown_sorts() {
        let params = ListParams {
            search: None,
            tags: None,
            page: None,
            limit: None,
            sort_by: Some("created_at; DROP TABLE".into()),
            sort_order: Some("sideways".into()),
        };
        match build_query(params) {
            Err(ApiError::Validation(errors)) => {
                assert_eq!(errors.len(), 2);
            }
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn query_building_applies_defaults_and_clamps() {
        let params = ListParams {
            search: Some("  rain  ".into()),
            tags: Some("a, ,b".into()),
            page: Some(0),
            limit: Some(10_000),
            sort_by: None,
            sort_order: None,
        };
        let q = build_query(params).expect("valid");
        assert_eq!(q.search.as_deref(), Some("rain"));
        assert_eq!(q.tags, vec!["a", "b"]);
        assert_eq!(q.page, 1);
        assert_eq!(q.limit, LIMIT_MAX);
        assert_eq!(q.sort_by, SortField::CreatedAt);
        assert_eq!(q.sort_order, SortOrder::Desc);
    }

    //-----------------------------------------------------------------------------
    // Handler flows against an in-memory store
    //-----------------------------------------------------------------------------

    /// Enough of the store to create, fetch and list: entries live in a
    /// vector, search and tag filters match case-insensitive substrings
    /// the way the ILIKE patterns do.
    #[derive(Default)]
    struct MemStore {
        entries: Mutex<Vec<Entry>>,
    }

    #[async_trait]
    impl DatabaseService for MemStore {
        async fn create_user_with_email(&self, _: &str, _: &str) -> PortResult<User> {
            unimplemented!()
        }
        async fn get_user_by_email(&self, _: &str) -> PortResult<UserCredentials> {
            unimplemented!()
        }
        async fn create_auth_session(
            &self,
            _: &str,
            _: Uuid,
            _: DateTime<Utc>,
        ) -> PortResult<()> {
            unimplemented!()
        }
        async fn validate_auth_session(&self, _: &str) -> PortResult<Uuid> {
            unimplemented!()
        }
        async fn delete_auth_session(&self, _: &str) -> PortResult<()> {
            unimplemented!()
        }

        async fn create_entry(&self, user_id: Uuid, new: NewEntry) -> PortResult<Entry> {
            let now = Utc::now();
            let entry = Entry {
                id: Uuid::new_v4(),
                user_id,
                title: new.title,
                content: new.content,
                tags: new.tags,
                mood: new.mood,
                passcode_hash: new.passcode_hash,
                created_at: now,
                updated_at: now,
            };
            self.entries.lock().expect("store lock").push(entry.clone());
            Ok(entry)
        }

        async fn get_entry(&self, user_id: Uuid, entry_id: Uuid) -> PortResult<Entry> {
            self.entries
                .lock()
                .expect("store lock")
                .iter()
                .find(|e| e.id == entry_id && e.user_id == user_id)
                .cloned()
                .ok_or_else(|| PortError::NotFound(format!("Entry {entry_id} not found")))
        }

        async fn list_entries(&self, user_id: Uuid, query: &EntryQuery) -> PortResult<EntryPage> {
            let search = query.search.as_deref().map(str::to_lowercase);
            let tags: Vec<String> = query.tags.iter().map(|t| t.to_lowercase()).collect();
            let mut hits: Vec<Entry> = self
                .entries
                .lock()
                .expect("store lock")
                .iter()
                .filter(|e| e.user_id == user_id)
                .filter(|e| {
                    if search.is_none() && tags.is_empty() {
                        return true;
                    }
                    let text_hit = search.as_deref().is_some_and(|s| {
                        e.title.to_lowercase().contains(s) || e.content.to_lowercase().contains(s)
                    });
                    let entry_tags = e.tags.as_deref().unwrap_or("").to_lowercase();
                    let tag_hit = tags.iter().any(|t| entry_tags.contains(t));
                    text_hit || tag_hit
                })
                .cloned()
                .collect();
            hits.sort_by(|a, b| b.created_at.cmp(&a.created_at));
            let total = hits.len() as u64;
            let entries = hits
                .into_iter()
                .skip(query.offset() as usize)
                .take(query.limit as usize)
                .collect();
            Ok(EntryPage { entries, total })
        }

        async fn update_entry(&self, _: Uuid, _: Uuid, _: EntryPatch) -> PortResult<Entry> {
            unimplemented!()
        }
        async fn delete_entry(&self, _: Uuid, _: Uuid) -> PortResult<()> {
            unimplemented!()
        }
        async fn get_entries_by_ids(&self, _: Uuid, _: &[Uuid]) -> PortResult<Vec<Entry>> {
            unimplemented!()
        }
        async fn entry_stats(&self, _: Uuid) -> PortResult<EntryStats> {
            unimplemented!()
        }
    }

    struct NoRender;

    #[async_trait]
    impl PdfRenderService for NoRender {
        async fn render(&self, _: &str) -> Result<Vec<u8>, RenderError> {
            unimplemented!()
        }
    }

    struct PlainHasher;

    impl PasscodeHasher for PlainHasher {
        fn hash(&self, passcode: &str) -> PortResult<String> {
            Ok(passcode.to_string())
        }
        fn verify(&self, candidate: &str, stored_hash: &str) -> bool {
            candidate == stored_hash
        }
    }

    fn mem_state(store: Arc<MemStore>) -> Arc<AppState> {
        Arc::new(AppState {
            db: store,
            config: Arc::new(Config {
                bind_address: "127.0.0.1:0".parse().expect("addr"),
                database_url: String::new(),
                log_level: Level::INFO,
                cors_origin: "http://localhost:3000".to_string(),
                chrome_path: None,
                render_timeout_secs: 30,
            }),
            pdf_renderer: Arc::new(NoRender),
            passcodes: Arc::new(PlainHasher),
        })
    }

    fn list_params(search: Option<&str>, tags: Option<&str>) -> ListParams {
        ListParams {
            search: search.map(String::from),
            tags: tags.map(String::from),
            page: None,
            limit: None,
            sort_by: None,
            sort_order: None,
        }
    }

    #[tokio::test]
    async fn created_entry_fetches_back_with_equal_timestamps() {
        let store = Arc::new(MemStore::default());
        let state = mem_state(store.clone());
        let user = Uuid::new_v4();

        let created = create_entry_handler(
            State(state.clone()),
            Extension(AuthUser(user)),
            Json(CreateEntryRequest {
                title: "  Rainy Day  ".into(),
                content: "<p>it rained all day</p>".into(),
                tags: Some("weather".into()),
                mood: Some("calm".into()),
                passcode: None,
            }),
        )
        .await
        .expect("creates")
        .into_response();
        assert_eq!(created.status(), StatusCode::CREATED);

        let id = store.entries.lock().expect("store lock")[0].id;
        let Json(envelope) = get_entry_handler(
            State(state),
            Extension(AuthUser(user)),
            Path(id),
            Query(PasscodeParam { passcode: None }),
        )
        .await
        .expect("fetches back");

        assert_eq!(envelope.entry.title, "Rainy Day");
        assert_eq!(envelope.entry.content, "<p>it rained all day</p>");
        assert_eq!(envelope.entry.tags.as_deref(), Some("weather"));
        assert_eq!(envelope.entry.created_at, envelope.entry.updated_at);
    }

    #[tokio::test]
    async fn listing_matches_search_and_tags_regardless_of_case() {
        let store = Arc::new(MemStore::default());
        let state = mem_state(store);
        let user = Uuid::new_v4();

        for (title, content, tags) in [
            ("Rainy Day", "stayed inside", Some("Weather,Home")),
            ("Beach trip", "so much RAIN on the drive", Some("Travel")),
            ("Quiet evening", "tea and a book", None),
        ] {
            create_entry_handler(
                State(state.clone()),
                Extension(AuthUser(user)),
                Json(CreateEntryRequest {
                    title: title.into(),
                    content: content.into(),
                    tags: tags.map(String::from),
                    mood: None,
                    passcode: None,
                }),
            )
            .await
            .expect("creates");
        }

        // Search terms match titles and content in any case.
        let Json(by_search) = list_entries_handler(
            State(state.clone()),
            Extension(AuthUser(user)),
            Query(list_params(Some("rAIn"), None)),
        )
        .await
        .expect("lists");
        assert_eq!(by_search.pagination.total, 2);

        // Tag filters match the stored tag list in any case.
        let Json(by_tag) = list_entries_handler(
            State(state.clone()),
            Extension(AuthUser(user)),
            Query(list_params(None, Some("weather"))),
        )
        .await
        .expect("lists");
        assert_eq!(by_tag.pagination.total, 1);
        assert_eq!(by_tag.entries[0].title, "Rainy Day");

        let Json(no_hit) = list_entries_handler(
            State(state),
            Extension(AuthUser(user)),
            Query(list_params(Some("snow"), None)),
        )
        .await
        .expect("lists");
        assert_eq!(no_hit.pagination.total, 0);
    }
}
