pub mod auth;
pub mod entries;
pub mod export;
pub mod middleware;
pub mod state;

pub use middleware::require_auth;

use utoipa::OpenApi;

//=========================================================================================
// OpenAPI Master Definition
//=========================================================================================

#[derive(OpenApi)]
#[openapi(
    paths(
        auth::signup_handler,
        auth::login_handler,
        auth::logout_handler,
        entries::list_entries_handler,
        entries::get_entry_handler,
        entries::create_entry_handler,
        entries::update_entry_handler,
        entries::delete_entry_handler,
        entries::stats_handler,
        export::export_entry_handler,
        export::export_bulk_handler,
    ),
    components(
        schemas(
            auth::SignupRequest,
            auth::LoginRequest,
            auth::AuthResponse,
            entries::EntryResponse,
            entries::Pagination,
            entries::ListEntriesResponse,
            entries::EntryEnvelope,
            entries::MessageEnvelope,
            entries::StatsResponse,
            entries::CreateEntryRequest,
            entries::UpdateEntryRequest,
            export::BulkExportRequest,
            crate::error::FieldError,
        )
    ),
    tags(
        (name = "Diary API", description = "API endpoints for the personal diary: entries, search, stats, and PDF export.")
    )
)]
pub struct ApiDoc;
