pub mod reveal;
pub mod routes;
pub mod sweeper;

use std::sync::Arc;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;

use docfind_common::config::ServerAppConfig;
use docfind_content_store::FileStore;
use docfind_extract_dispatch::Dispatcher;

use crate::reveal::Revealer;

pub struct AppState {
    pub config: ServerAppConfig,
    pub store: Arc<FileStore>,
    pub dispatcher: Arc<Dispatcher>,
    pub revealer: Revealer,
}

impl AppState {
    pub fn new(config: ServerAppConfig) -> Self {
        let store = Arc::new(FileStore::new(config.store.retention()));
        let dispatcher = Arc::new(Dispatcher::from_settings(&config.extract));
        Self { config, store, dispatcher, revealer: Revealer::detect() }
    }
}

pub fn build_router(state: Arc<AppState>) -> Router {
    let body_limit = state.config.server.max_upload_mb.saturating_mul(1024 * 1024);

    Router::new()
        .route("/upload_for_view",  post(routes::upload_for_view))
        .route("/store_file_temp",  post(routes::store_file_temp))
        .route("/get_file/{id}",    get(routes::get_file))
        .route("/open_browser",     get(routes::open_browser))
        .route("/search_upload",    post(routes::search_upload))
        .route("/search/{id}",      get(routes::search_stored))
        .route("/open_folder/{id}", post(routes::open_folder))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
