//! Application router configuration.

use axum::{
    Router,
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::{delete, get, post},
};
use tower_http::services::ServeDir;

use crate::{
    AppState,
    dashboard::{get_events, post_filter, post_refresh},
    endpoints,
    html::error_view,
    identity::{post_auth, post_federated_sign_in, post_sign_out},
    not_found::get_404_not_found,
    transaction::{
        delete_transaction_endpoint, edit_transaction_endpoint, reset_form_endpoint,
        submit_transaction_endpoint,
    },
    workspace_page::get_workspace_page,
};

/// Return a router with all the app's routes.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route(endpoints::ROOT, get(get_workspace_page))
        .route(endpoints::AUTH, post(post_auth))
        .route(endpoints::FEDERATED_AUTH, post(post_federated_sign_in))
        .route(endpoints::SIGN_OUT, post(post_sign_out))
        .route(
            endpoints::TRANSACTIONS_API,
            post(submit_transaction_endpoint),
        )
        .route(endpoints::RESET_FORM, post(reset_form_endpoint))
        .route(endpoints::TRANSACTION, delete(delete_transaction_endpoint))
        .route(
            endpoints::EDIT_TRANSACTION,
            post(edit_transaction_endpoint),
        )
        .route(endpoints::FILTER, post(post_filter))
        .route(endpoints::REFRESH, post(post_refresh))
        .route(endpoints::EVENTS, get(get_events))
        .nest_service(endpoints::STATIC, ServeDir::new("static/"))
        .fallback(get_404_not_found)
        .with_state(state)
}

/// Return a router that answers every request with the configuration error
/// `message`.
///
/// The server uses this instead of [build_router] when its credentials are
/// incomplete, so nothing touches the database.
pub fn config_error_router(message: String) -> Router {
    Router::new().fallback(move || {
        let message = message.clone();
        async move { config_error_response(&message) }
    })
}

fn config_error_response(message: &str) -> Response {
    (
        StatusCode::SERVICE_UNAVAILABLE,
        Html(
            error_view(
                "Configuratiefout",
                "503",
                message,
                "Vul de ontbrekende instellingen in en start de server opnieuw.",
            )
            .into_string(),
        ),
    )
        .into_response()
}
