use std::sync::Arc;

use axum::{
    Json,
    extract::State,
    http::{HeaderMap, HeaderValue, header},
    response::{Html, IntoResponse},
};

use crate::{
    coordinator::CoordinatorSnapshot,
    sdk::{AccountEvent, ModalEvent, NetworkEvent},
    wallet_browser::{
        app::contents,
        state::BrowserWalletState,
        types::{ActionRequest, BridgeCommand, BridgeResponse, CommandResponse, PageConfig},
    },
};

const TARGET: &str = "trontrust::bridge";

/// Serves the connect page with this run's session token filled in.
pub(crate) async fn serve_index(State(state): State<Arc<BrowserWalletState>>) -> impl IntoResponse {
    let mut headers = HeaderMap::new();
    headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("text/html; charset=utf-8"));
    headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-store"));
    let page = contents::INDEX_HTML.replace(contents::TOKEN_PLACEHOLDER, &state.session_token());
    (headers, Html(page))
}

pub(crate) async fn get_next_command(
    State(state): State<Arc<BrowserWalletState>>,
) -> Json<BridgeResponse<BridgeCommand>> {
    match state.read_next_command() {
        Some(command) => Json(BridgeResponse::ok(command)),
        None => Json(BridgeResponse::error("No pending command")),
    }
}

pub(crate) async fn post_command_response(
    State(state): State<Arc<BrowserWalletState>>,
    Json(response): Json<CommandResponse>,
) -> Json<BridgeResponse<()>> {
    if !state.has_command(&response.id) {
        return Json(BridgeResponse::error("Unknown command id"));
    }
    debug!(target: TARGET, id = %response.id, error = ?response.error, "page answered command");
    state.add_command_response(response);
    Json(BridgeResponse::ok(()))
}

pub(crate) async fn post_account_event(
    State(state): State<Arc<BrowserWalletState>>,
    Json(event): Json<AccountEvent>,
) -> Json<BridgeResponse<()>> {
    debug!(target: TARGET, ?event, "account event");
    state.events().emit_account(event);
    Json(BridgeResponse::ok(()))
}

pub(crate) async fn post_network_event(
    State(state): State<Arc<BrowserWalletState>>,
    Json(event): Json<NetworkEvent>,
) -> Json<BridgeResponse<()>> {
    debug!(target: TARGET, ?event, "network event");
    state.events().emit_network(event);
    Json(BridgeResponse::ok(()))
}

pub(crate) async fn post_modal_event(
    State(state): State<Arc<BrowserWalletState>>,
    Json(event): Json<ModalEvent>,
) -> Json<BridgeResponse<()>> {
    trace!(target: TARGET, ?event, "modal event");
    state.events().emit_modal(event);
    Json(BridgeResponse::ok(()))
}

pub(crate) async fn get_state(
    State(state): State<Arc<BrowserWalletState>>,
) -> Json<BridgeResponse<CoordinatorSnapshot>> {
    Json(BridgeResponse::ok(state.snapshot()))
}

pub(crate) async fn post_action(
    State(state): State<Arc<BrowserWalletState>>,
    Json(request): Json<ActionRequest>,
) -> Json<BridgeResponse<()>> {
    if state.send_action(request.action) {
        Json(BridgeResponse::ok(()))
    } else {
        Json(BridgeResponse::error("Coordinator is not running"))
    }
}

pub(crate) async fn get_page_config(
    State(state): State<Arc<BrowserWalletState>>,
) -> Json<BridgeResponse<PageConfig>> {
    Json(BridgeResponse::ok(state.page().clone()))
}
