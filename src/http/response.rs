//! Outgoing responses.
//!
//! # Responsibilities
//! - Build the two canonical shapes: the 401 Negotiate challenge and the 200
//!   echo
//! - Keep `Content-Length` equal to the body length
//! - Convert to an axum response at the front end
//!
//! # Design Decisions
//! - Responses are plain data so queue test doubles can inspect them
//! - The challenge never carries a continuation token

use axum::body::Body;
use axum::http::{HeaderName, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};

/// Body of the 401 challenge.
pub const CHALLENGE_BODY: &str = "Authentication required";

/// Body of the 503 returned when the queue cannot take a request.
pub const UNAVAILABLE_BODY: &str = "Service unavailable";

/// Status, reason, headers and body of one response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingResponse {
    pub status: u16,
    pub reason: &'static str,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl OutgoingResponse {
    fn with_body(status: u16, reason: &'static str, body: Vec<u8>) -> Self {
        Self {
            status,
            reason,
            headers: vec![("Content-Length".to_string(), body.len().to_string())],
            body,
        }
    }

    /// `401 Unauthorized` with `WWW-Authenticate: Negotiate`.
    pub fn challenge() -> Self {
        Self::with_body(401, "Unauthorized", CHALLENGE_BODY.as_bytes().to_vec())
            .header("WWW-Authenticate", "Negotiate")
    }

    /// `200 OK` carrying an echo body.
    pub fn echo(body: String) -> Self {
        Self::with_body(200, "OK", body.into_bytes()).header("Content-Type", "text/plain")
    }

    /// `503 Service Unavailable`.
    pub fn unavailable() -> Self {
        Self::with_body(503, "Service Unavailable", UNAVAILABLE_BODY.as_bytes().to_vec())
    }

    /// Append a header.
    pub fn header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_string(), value.to_string()));
        self
    }

    /// First value of a header, ignoring name case.
    pub fn header_value(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

impl IntoResponse for OutgoingResponse {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let mut response = Response::new(Body::from(self.body));
        *response.status_mut() = status;

        let headers = response.headers_mut();
        for (name, value) in &self.headers {
            match (
                HeaderName::from_bytes(name.as_bytes()),
                HeaderValue::from_str(value),
            ) {
                (Ok(name), Ok(value)) => {
                    headers.append(name, value);
                }
                _ => tracing::warn!(header = %name, "Dropping unrepresentable response header"),
            }
        }
        response
    }
}
