//! HTTP handler modules and the shared state they receive.

pub mod file_handlers;
pub mod folder_handlers;
pub mod health_handlers;
pub mod media_handlers;

use crate::{auth::TokenVerifier, services::drive_service::DriveService};
use axum::extract::FromRef;

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub drive: DriveService,
    pub verifier: TokenVerifier,
}

impl FromRef<AppState> for TokenVerifier {
    fn from_ref(state: &AppState) -> Self {
        state.verifier.clone()
    }
}
