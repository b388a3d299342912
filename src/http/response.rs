//! Response logging and error translation.
//!
//! # Responsibilities
//! - Render a buffered response as raw HTTP/1.1 text for the response log
//! - Map backend failures to client-visible responses
//!
//! # Design Decisions
//! - Every backend failure becomes `403 Forbidden` carrying the error text;
//!   existing clients depend on that status

use bytes::Bytes;
use hyper::header::{HeaderValue, CONTENT_TYPE};
use hyper::{Response, StatusCode};
use std::fmt::Write;

use crate::backend::BackendError;

const TEXT_PLAIN: &str = "text/plain; charset=utf-8";

/// Render the status line, headers and body exactly as produced.
pub fn render_response(response: &Response<Bytes>) -> String {
    let mut out = String::with_capacity(128 + response.body().len());
    let _ = write!(out, "{:?} {}\r\n", response.version(), response.status());
    super::write_headers(&mut out, response.headers());
    out.push_str(&String::from_utf8_lossy(response.body()));
    out
}

/// Plain-text response with the given status.
pub fn text_response(status: StatusCode, message: String) -> Response<Bytes> {
    let mut response = Response::new(Bytes::from(message));
    *response.status_mut() = status;
    response
        .headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static(TEXT_PLAIN));
    response
}

/// Translate a backend failure into the response the client sees.
pub fn forbidden(error: &BackendError) -> Response<Bytes> {
    text_response(StatusCode::FORBIDDEN, error.to_string())
}
