// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Local HTTP surface: OAuth callback and player controls.

pub mod http;

use std::sync::Arc;

use axum::routing::get;
use axum::Router;
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// Static action menu returned by every player endpoint.
pub const MENU_HTML: &str = include_str!("../web/menu.html");

/// Build the axum `Router` with all routes.
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/callback", get(http::callback))
        .route("/player/{action}", get(http::player))
        .fallback(http::fallback)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
