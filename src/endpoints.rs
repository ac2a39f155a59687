//! The API endpoints URIs.
//!
//! For endpoints that take a parameter, e.g., '/api/transactions/{transaction_id}/edit', use
//! [format_endpoint].

/// The root route which serves the whole app.
pub const ROOT: &str = "/";
/// The route for static files.
pub const STATIC: &str = "/static";

/// The route for signing in or registering with email and password.
pub const AUTH: &str = "/api/auth";
/// The route for signing in with a federated identity provider.
pub const FEDERATED_AUTH: &str = "/api/auth/federated/{provider}";
/// The route for signing out.
pub const SIGN_OUT: &str = "/api/auth/sign_out";
/// The route for submitting the transaction form.
pub const TRANSACTIONS_API: &str = "/api/transactions";
/// The route for resetting the transaction form.
pub const RESET_FORM: &str = "/api/transactions/reset";
/// The route for deleting a transaction.
pub const TRANSACTION: &str = "/api/transactions/{transaction_id}";
/// The route for loading a transaction into the form for editing.
pub const EDIT_TRANSACTION: &str = "/api/transactions/{transaction_id}/edit";
/// The route for changing the table filter.
pub const FILTER: &str = "/api/filter";
/// The route for the one-shot reload of the transactions.
pub const REFRESH: &str = "/api/refresh";
/// The server-sent events stream that pushes rendered fragments to the browser.
pub const EVENTS: &str = "/api/events";

/// Replace the parameter in `endpoint_path` with `id`.
///
/// A parameter is a string that starts with a left brace, followed by
/// lowercase letters or underscores, and ends with a right brace.
/// For example, in the endpoint path '/api/transactions/{transaction_id}', '{transaction_id}'
/// is the parameter.
///
/// If no parameter is found in `endpoint_path`, the function returns the
/// the original `endpoint_path`.
pub fn format_endpoint(endpoint_path: &str, id: &str) -> String {
    let Some(param_start) = endpoint_path.find('{') else {
        return endpoint_path.to_owned();
    };

    let param_end = endpoint_path[param_start..]
        .find('}')
        .map(|end| param_start + end + 1)
        .unwrap_or(endpoint_path.len());

    format!(
        "{}{}{}",
        &endpoint_path[..param_start],
        id,
        &endpoint_path[param_end..]
    )
}

// These tests are here so that we know when we call `Uri::from_shared` it will not panic.
#[cfg(test)]
mod endpoints_tests {
    use axum::http::Uri;

    use crate::endpoints;

    use super::format_endpoint;

    fn assert_endpoint_is_valid_uri(uri: &str) {
        assert!(uri.parse::<Uri>().is_ok());
    }

    #[test]
    fn endpoints_are_valid_uris() {
        assert_endpoint_is_valid_uri(endpoints::ROOT);
        assert_endpoint_is_valid_uri(endpoints::STATIC);
        assert_endpoint_is_valid_uri(endpoints::AUTH);
        assert_endpoint_is_valid_uri(endpoints::SIGN_OUT);
        assert_endpoint_is_valid_uri(endpoints::TRANSACTIONS_API);
        assert_endpoint_is_valid_uri(endpoints::RESET_FORM);
        assert_endpoint_is_valid_uri(endpoints::FILTER);
        assert_endpoint_is_valid_uri(endpoints::REFRESH);
        assert_endpoint_is_valid_uri(endpoints::EVENTS);
        assert_endpoint_is_valid_uri(&format_endpoint(endpoints::FEDERATED_AUTH, "google"));
        assert_endpoint_is_valid_uri(&format_endpoint(endpoints::TRANSACTION, "abc123"));
        assert_endpoint_is_valid_uri(&format_endpoint(endpoints::EDIT_TRANSACTION, "abc123"));
    }

    #[test]
    fn format_endpoint_replaces_parameter() {
        assert_eq!(
            format_endpoint(endpoints::EDIT_TRANSACTION, "Xy7Lk2"),
            "/api/transactions/Xy7Lk2/edit"
        );
    }

    #[test]
    fn format_endpoint_without_parameter_is_unchanged() {
        assert_eq!(format_endpoint(endpoints::FILTER, "42"), endpoints::FILTER);
    }
}
