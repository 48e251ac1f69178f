//! REST endpoint handlers organized by resource.

pub mod domain;
pub mod operation;
pub mod permission;
pub mod system;

use axum::Router;

use crate::app_state::AppState;

/// Composes all resource routes under `/api/v1`.
pub fn routes() -> Router<AppState> {
    Router::new()
        .merge(permission::routes())
        .merge(domain::routes())
        .merge(operation::routes())
}
