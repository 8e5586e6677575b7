use aprassist_core::locale::REPORT_SECTIONS;
use axum::body::Body;
use axum::http::{Response, StatusCode};
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;

use crate::http::chat_route::{chat_handler, method_not_allowed, AppState};
use crate::http::responses::{json_response, text_response};

pub(crate) const CHAT_PATH: &str = "/api/chat";
pub(crate) const SECTIONS_PATH: &str = "/api/sections";
pub(crate) const SHUTDOWN_PATH: &str = "/__shutdown";

async fn sections_handler() -> Response<Body> {
    json_response(StatusCode::OK, &REPORT_SECTIONS)
}

async fn shutdown_handler() -> Response<Body> {
    log::info!("event=service_shutdown_requested");
    crate::mark_shutdown_requested();
    text_response(StatusCode::OK, "ok")
}

pub(crate) fn build_router(state: AppState) -> Router {
    Router::new()
        .route(CHAT_PATH, post(chat_handler).fallback(method_not_allowed))
        .route(SECTIONS_PATH, get(sections_handler))
        .route(SHUTDOWN_PATH, get(shutdown_handler))
        // 中文注释：浏览器界面与服务不同源，预检请求由 CORS 层直接应答。
        .layer(CorsLayer::permissive())
        .with_state(state)
}
