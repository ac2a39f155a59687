use axum::{
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};

use crate::html::error_view;

pub async fn get_404_not_found() -> Response {
    get_404_not_found_response()
}

pub fn get_404_not_found_response() -> Response {
    (
        StatusCode::NOT_FOUND,
        Html(
            error_view(
                "Niet gevonden",
                "404",
                "Deze pagina bestaat niet.",
                "Controleer het adres of ga terug naar het kasboek.",
            )
            .into_string(),
        ),
    )
        .into_response()
}
