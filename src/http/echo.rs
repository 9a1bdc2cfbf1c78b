//! Diagnostic echo of an authenticated request.

use std::fmt::Write as _;

use axum::http::Method;

use crate::http::request::{HeaderTable, IncomingRequest};

/// Method token printed in the echo; anything outside the four core verbs is
/// `OTHER`.
pub fn method_token(method: &Method) -> &'static str {
    [
        (Method::GET, "GET"),
        (Method::POST, "POST"),
        (Method::PUT, "PUT"),
        (Method::DELETE, "DELETE"),
    ]
    .into_iter()
    .find(|(known, _)| known == method)
    .map(|(_, token)| token)
    .unwrap_or("OTHER")
}

/// Render the echo body for `method`, `path` and `headers`.
///
/// The request entity body is never included.
pub fn render(method: &Method, path: &str, headers: &HeaderTable) -> String {
    let mut body = String::new();
    body.push_str("Echo Response\n");
    body.push_str("=============\n");
    // Writing to a String cannot fail.
    let _ = writeln!(body, "Method: {}", method_token(method));
    let _ = writeln!(body, "URL: {path}");
    body.push_str("Headers:\n");
    for (name, value) in headers.iter() {
        let _ = writeln!(body, "  {name}: {value}");
    }
    body
}

/// Render the echo body for a request snapshot.
pub fn render_request(request: &IncomingRequest) -> String {
    render(&request.method, &request.path, &request.headers)
}
