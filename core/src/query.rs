//! URL construction.
//!
//! The final URL is the configured base URL followed by the request path and,
//! when query parameters are given, `?` and the encoded pairs. The path is
//! not inspected: a path that already carries a query string gets a second
//! `?` appended after it.

use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};

use crate::types::QueryValue;

/// Characters left unescaped in a query component: ALPHA / DIGIT / `-_.!~*'()`.
const QUERY_COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

pub fn encode_component(s: &str) -> String {
    utf8_percent_encode(s, QUERY_COMPONENT).to_string()
}

pub fn encode_query(params: &[(String, QueryValue)]) -> String {
    params
        .iter()
        .map(|(key, value)| {
            format!(
                "{}={}",
                encode_component(key),
                encode_component(&value.to_string())
            )
        })
        .collect::<Vec<_>>()
        .join("&")
}

pub fn build_url(base_url: Option<&str>, path: &str, params: &[(String, QueryValue)]) -> String {
    let mut url = format!("{}{path}", base_url.unwrap_or(""));
    if !params.is_empty() {
        url.push('?');
        url.push_str(&encode_query(params));
    }
    url
}
