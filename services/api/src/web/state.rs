//! services/api/src/web/state.rs
//!
//! Defines the application's shared state.

use std::sync::Arc;

use crate::config::Config;
use diary_core::ports::{DatabaseService, PasscodeHasher, PdfRenderService};

/// The shared application state, created once at startup and passed to all
/// handlers. The persistence client lives here for the process lifetime;
/// the PDF renderer, by contrast, acquires its engine per request.
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<dyn DatabaseService>,
    pub config: Arc<Config>,
    pub pdf_renderer: Arc<dyn PdfRenderService>,
    pub passcodes: Arc<dyn PasscodeHasher>,
}
