#![allow(missing_docs)]

pub(crate) mod fixtures;
pub(crate) mod form;
pub(crate) mod html;
pub(crate) mod http;

pub(crate) use fixtures::{
    RecordingStore, TEST_EMAIL, TEST_PASSWORD, TEST_PASSWORD_COST, TEST_TIMEZONE,
    create_test_transaction, get_test_app_state, get_test_connection, get_test_identity,
    get_test_store, new_client_jar, signed_in_jar,
};
pub(crate) use form::{
    assert_form_input, assert_form_input_with_value, assert_form_submit_button_with_text,
    assert_hx_endpoint, must_get_form,
};
pub(crate) use html::{assert_valid_html, parse_html_document, parse_html_fragment};
pub(crate) use http::{assert_content_type, assert_status_ok, get_header};
