use axum::{
    extract::{Path, Query, State},
    response::{IntoResponse, Response},
};
use axum_extra::extract::PrivateCookieJar;
use serde::Deserialize;

use crate::{AppState, Error};

use super::{core::TransactionId, form::form_response_view};

#[derive(Debug, Deserialize)]
pub struct DeleteParams {
    /// Set by the browser once the user has agreed to the confirmation dialog.
    #[serde(default)]
    confirmed: bool,
}

/// A route handler for deleting a transaction.
///
/// Responds with the form and the status. The row disappears when the live
/// query delivers the next snapshot.
pub async fn delete_transaction_endpoint(
    State(state): State<AppState>,
    jar: PrivateCookieJar,
    Path(transaction_id): Path<TransactionId>,
    Query(params): Query<DeleteParams>,
) -> Result<Response, Error> {
    let (jar, session) = state.sessions.session_for_jar(jar)?;

    session.delete(transaction_id, params.confirmed).await?;
    let fragment = session.read(form_response_view)?;

    Ok((jar, fragment).into_response())
}
