//! services/api/src/web/export.rs
//!
//! The PDF export endpoints: access gate, sanitization, document
//! composition and the render pipeline, streamed back as an attachment.
//! The orchestration lives in `export_single`/`export_bulk` so it can be
//! exercised against fake ports without a browser or a database.

use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Extension, Json,
};
use chrono::Utc;
use serde::Deserialize;
use std::sync::Arc;
use tracing::info;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::error::{ApiError, FieldError};
use crate::web::entries::PasscodeParam;
use crate::web::middleware::AuthUser;
use crate::web::state::AppState;
use diary_core::access::{authorize, AccessDecision};
use diary_core::compose::{compose_bulk, compose_single};

//=========================================================================================
// Payloads and Attachment Plumbing
//=========================================================================================

/// A body without `entryIds` deserializes to an empty list, so both the
/// missing and the empty case hit the same 400.
#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BulkExportRequest {
    #[serde(default)]
    pub entry_ids: Vec<String>,
}

/// A rendered PDF plus the filename it should download as.
#[derive(Debug)]
pub struct PdfAttachment {
    pub filename: String,
    pub bytes: Vec<u8>,
}

/// Builds the binary response: explicit length, attachment disposition,
/// and no caching.
fn pdf_response(attachment: PdfAttachment) -> Response {
    (
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "application/pdf".to_string()),
            (header::CONTENT_LENGTH, attachment.bytes.len().to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", attachment.filename),
            ),
            (header::CACHE_CONTROL, "no-store".to_string()),
        ],
        attachment.bytes,
    )
        .into_response()
}

/// Reduces an entry title to a safe download filename stem: lowercased,
/// every non-alphanumeric run replaced by a single underscore.
pub fn sanitize_filename(title: &str) -> String {
    let mut stem = String::with_capacity(title.len());
    let mut last_was_sep = true;
    for c in title.to_lowercase().chars() {
        if c.is_ascii_alphanumeric() {
            stem.push(c);
            last_was_sep = false;
        } else if !last_was_sep {
            stem.push('_');
            last_was_sep = true;
        }
    }
    let stem = stem.trim_matches('_');
    if stem.is_empty() {
        "entry".to_string()
    } else {
        stem.to_string()
    }
}

//=========================================================================================
// Orchestration
//=========================================================================================

/// Runs the full pipeline for one entry: gate, sanitize+compose, render.
pub async fn export_single(
    state: &AppState,
    user_id: Uuid,
    entry_id: Uuid,
    passcode: Option<&str>,
) -> Result<PdfAttachment, ApiError> {
    let entry = state.db.get_entry(user_id, entry_id).await?;

    match authorize(&entry, user_id, passcode, state.passcodes.as_ref()) {
        AccessDecision::Granted => {}
        AccessDecision::PasscodeRequired => return Err(ApiError::PasscodeRequired),
        AccessDecision::Forbidden => return Err(ApiError::NotFound),
    }

    let html = compose_single(&entry, Utc::now());
    let bytes = state.pdf_renderer.render(&html).await?;

    info!(entry_id = %entry.id, bytes = bytes.len(), "exported entry");
    Ok(PdfAttachment {
        filename: format!("{}.pdf", sanitize_filename(&entry.title)),
        bytes,
    })
}

/// Runs the pipeline over the caller's subset of the requested ids.
/// Non-owned and unknown ids are dropped silently; an empty remainder is
/// NotFound.
pub async fn export_bulk(
    state: &AppState,
    user_id: Uuid,
    entry_ids: &[Uuid],
) -> Result<PdfAttachment, ApiError> {
    let entries = state.db.get_entries_by_ids(user_id, entry_ids).await?;
    if entries.is_empty() {
        return Err(ApiError::NotFound);
    }

    let html = compose_bulk(&entries, Utc::now());
    let bytes = state.pdf_renderer.render(&html).await?;

    info!(
        requested = entry_ids.len(),
        exported = entries.len(),
        bytes = bytes.len(),
        "bulk exported entries"
    );
    Ok(PdfAttachment {
        filename: format!("diary_entries_{}.pdf", Utc::now().format("%Y-%m-%d")),
        bytes,
    })
}

//=========================================================================================
// Handlers
//=========================================================================================

/// Export one entry as a PDF attachment.
#[utoipa::path(
    get,
    path = "/entries/{id}/export",
    params(("id" = Uuid, Path, description = "Entry id"), PasscodeParam),
    responses(
        (status = 200, description = "PDF document", body = Vec<u8>, content_type = "application/pdf"),
        (status = 403, description = "Passcode required"),
        (status = 404, description = "Not found"),
        (status = 500, description = "Rendering failed")
    )
)]
pub async fn export_entry_handler(
    State(state): State<Arc<AppState>>,
    Extension(AuthUser(user_id)): Extension<AuthUser>,
    Path(id): Path<Uuid>,
    Query(params): Query<PasscodeParam>,
) -> Result<Response, ApiError> {
    let attachment = export_single(&state, user_id, id, params.passcode.as_deref()).await?;
    Ok(pdf_response(attachment))
}

/// Export several entries as one PDF document.
#[utoipa::path(
    post,
    path = "/entries/export-bulk",
    request_body = BulkExportRequest,
    responses(
        (status = 200, description = "PDF document", body = Vec<u8>, content_type = "application/pdf"),
        (status = 400, description = "Missing or empty entryIds"),
        (status = 404, description = "None of the ids belong to the caller"),
        (status = 500, description = "Rendering failed")
    )
)]
pub async fn export_bulk_handler(
    State(state): State<Arc<AppState>>,
    Extension(AuthUser(user_id)): Extension<AuthUser>,
    Json(req): Json<BulkExportRequest>,
) -> Result<Response, ApiError> {
    if req.entry_ids.is_empty() {
        return Err(ApiError::Validation(vec![FieldError::new(
            "entryIds",
            "entryIds must be a non-empty array",
        )]));
    }

    // Ids that do not parse cannot belong to the caller; drop them like
    // any other non-owned id.
    let ids: Vec<Uuid> = req
        .entry_ids
        .iter()
        .filter_map(|raw| Uuid::parse_str(raw).ok())
        .collect();

    let attachment = export_bulk(&state, user_id, &ids).await?;
    Ok(pdf_response(attachment))
}
